//! Configuration layer for the batscan pipeline.
//!
//! Analysis parameters travel as an explicit [`AnalysisSettings`] struct
//! passed into each entry point; nothing in the pipeline reads ambient
//! global state. The struct round-trips through a small TOML file so a
//! survey run can be reproduced from its settings file alone.

mod error;
mod settings;
mod validation;

pub use error::ConfigError;
pub use settings::{AnalysisSettings, EnvelopeSettings, SpectrumSettings};
pub use validation::{ValidationError, ValidationResult};
