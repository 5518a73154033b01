//! Batscan Core - DSP primitives for ultrasonic bat-call analysis
//!
//! This crate provides the time-domain building blocks of the batscan
//! pipeline. Everything here operates on plain `&[f32]` mono sample buffers
//! and is free of I/O.
//!
//! # Components
//!
//! - [`Biquad`] - Second-order IIR filter with RBJ cookbook low/high-pass
//!   coefficients, used to isolate the ultrasonic band before envelope
//!   extraction
//! - [`EnvelopeExtractor`] - Band-limits, rectifies, smooths and decimates a
//!   raw sample buffer into a coarse amplitude envelope
//! - [`stats`] - Mean/SD helpers with the under-populated-sample fallback
//!   rules used throughout pass statistics, plus the minimum-variance block
//!   scan that anchors adaptive thresholding
//!
//! # Design Principles
//!
//! - **Degenerate input is normal**: empty or too-short buffers produce empty
//!   or zero results, never panics
//! - **NaN never propagates**: non-finite filter output is excluded from
//!   running means instead of poisoning them
//! - **No ambient state**: every knob arrives as an explicit config struct

pub mod biquad;
pub mod envelope;
pub mod stats;

pub use biquad::Biquad;
pub use envelope::{EnvelopeConfig, EnvelopeExtractor};
pub use stats::{mean, min_variance_block, smooth, std_dev, variance};
