use thiserror::Error;

/// Errors produced while loading calibration or resolving regions.
#[derive(Debug, Error)]
pub enum Error {
    /// A calibration value violates a precondition. Fatal for that calibration.
    #[error("invalid calibration: {field}: {reason}")]
    InvalidCalibration { field: &'static str, reason: String },

    /// Inversion requested through a zero coefficient.
    #[error("division by zero: {field} is 0")]
    DivisionByZero { field: &'static str },

    /// A single region carries unusable numbers. Other regions are unaffected.
    #[error("invalid region '{region}': {field}: {reason}")]
    InvalidRegionInput {
        region: String,
        field: &'static str,
        reason: String,
    },

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn calibration(field: &'static str, reason: impl Into<String>) -> Error {
        Error::InvalidCalibration {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn region(region: &str, field: &'static str, reason: impl Into<String>) -> Error {
        Error::InvalidRegionInput {
            region: region.to_string(),
            field,
            reason: reason.into(),
        }
    }

    /// True for faults that lie in the calibration rather than the job.
    pub fn is_calibration_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidCalibration { .. } | Error::DivisionByZero { .. }
        )
    }

    /// Name of the offending region, if the error is region scoped.
    pub fn region_name(&self) -> Option<&str> {
        match self {
            Error::InvalidRegionInput { region, .. } => Some(region),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[test]
fn test_error_classification() {
    let e = Error::DivisionByZero {
        field: "focusCoefficient",
    };
    assert!(e.is_calibration_error());
    assert_eq!(e.region_name(), None);

    let e = Error::region("upskin_hatch", "speedMmPerSec", "must be > 0");
    assert!(!e.is_calibration_error());
    assert_eq!(e.region_name(), Some("upskin_hatch"));
    assert_eq!(
        e.to_string(),
        "invalid region 'upskin_hatch': speedMmPerSec: must be > 0"
    );
}
