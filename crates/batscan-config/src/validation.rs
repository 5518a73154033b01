//! Analysis configuration validation.

use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A numeric setting is out of its allowed range.
    #[error("setting '{setting}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the setting.
        setting: String,
        /// The value that was out of range.
        value: f32,
        /// Minimum allowed value.
        min: f32,
        /// Maximum allowed value.
        max: f32,
    },

    /// The FFT size must be a power of two.
    #[error("fft_size {0} is not a power of two")]
    NotPowerOfTwo(usize),

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

pub(crate) fn check_range(
    setting: &str,
    value: f32,
    min: f32,
    max: f32,
    errors: &mut Vec<ValidationError>,
) {
    if !(min..=max).contains(&value) || !value.is_finite() {
        errors.push(ValidationError::OutOfRange {
            setting: setting.to_string(),
            value,
            min,
            max,
        });
    }
}

pub(crate) fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_check_accepts_bounds() {
        let mut errors = Vec::new();
        check_range("x", 1.0, 1.0, 2.0, &mut errors);
        check_range("x", 2.0, 1.0, 2.0, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn range_check_rejects_nan() {
        let mut errors = Vec::new();
        check_range("x", f32::NAN, 0.0, 1.0, &mut errors);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn multiple_errors_joined_in_display() {
        let err = ValidationError::Multiple(vec![
            ValidationError::NotPowerOfTwo(1000),
            ValidationError::NotPowerOfTwo(3),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("1000") && msg.contains("; "), "got: {msg}");
    }
}
