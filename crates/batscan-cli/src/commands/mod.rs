//! CLI command implementations.

pub mod analyze;
pub mod generate;
pub mod info;
