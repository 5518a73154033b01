//! Batscan Model - pulse aggregation and classification
//!
//! The aggregation half of the batscan pipeline:
//!
//! - [`pulse`] - One call: a time-domain peak paired with its spectrum
//! - [`pass`] - Bounded time windows of pulses with cached aggregate
//!   statistics and the iterative mean-interval estimate
//! - [`outliers`] - Variance-driven pulse removal
//! - [`segment`] - Recordings, labelled segments and pass splitting
//! - [`classify`] - Template scoring and FM-shape labelling
//!
//! Ownership runs strictly downward: a [`segment::Recording`] owns
//! [`segment::Segment`]s, a segment owns [`pass::Pass`]es, a pass owns
//! [`pulse::Pulse`]s. Nothing holds an owning reference back up the chain.

pub mod classify;
pub mod outliers;
pub mod pass;
pub mod pulse;
pub mod segment;

pub use classify::{CallTemplate, ParameterBand, classify, fm_shape, reference_templates};
pub use outliers::{delete_extreme_pulses, remove_outliers};
pub use pass::{ParameterStats, Pass, PassStats, compute_statistics, estimate_mean_interval};
pub use pulse::Pulse;
pub use segment::{MAX_PASS_S, NOMINAL_PASS_S, Recording, Segment};
