//! Error type shared by every module of the processing core.

/// Result alias used throughout `huestack-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the processing core.
///
/// Format and range errors are detected at the boundary (file read,
/// parameter setter) before any state is touched. Computation errors such as
/// a singular sensor matrix are never recovered here; the caller decides on
/// a fallback.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed LUT file or stack script.
    #[error("format error: {0}")]
    Format(String),

    /// A slider or parameter value outside its declared domain.
    #[error("{what} out of range: {value} not in [{min}, {max}]")]
    Range {
        what: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Pixel buffer shape mismatch for a conversion.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Operation requested on a stack or context in the wrong state.
    #[error("invalid state: {0}")]
    State(String),

    /// Matrix inversion failed.
    #[error("singular matrix (determinant {0:e})")]
    SingularMatrix(f64),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub(crate) fn conversion(msg: impl Into<String>) -> Self {
        Self::Conversion(msg.into())
    }

    /// Checks that `value` lies in `[min, max]`.
    pub(crate) fn check_range(what: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
        if value.is_finite() && value >= min && value <= max {
            Ok(())
        } else {
            Err(Self::Range {
                what,
                value,
                min,
                max,
            })
        }
    }
}
