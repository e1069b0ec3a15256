use thiserror::Error;

/// Errors raised when a caller violates a function's input contract.
///
/// Mathematically degenerate inputs (zero variance, singular design
/// matrices, too few observations) are not errors; they are reported through
/// [`crate::stats::Outcome::Degenerate`] so that callers can still render a
/// neutral result.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No data: {0}")]
    EmptyData(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Length mismatch: expected {expected}, actual {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Unbalanced design: {0}")]
    UnbalancedDesign(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error")]
    Io(#[source] std::io::Error),

    #[error("JSON error")]
    Json(#[source] serde_json::Error),

    #[error("YAML error")]
    Yaml(#[source] serde_yaml::Error),

    #[error("TOML error")]
    Toml(#[source] toml::de::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

/// Checks that a significance level lies strictly inside (0, 1).
pub(crate) fn check_alpha(alpha: f64) -> Result<()> {
    if alpha > 0.0 && alpha < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidValue(format!(
            "significance level must be in (0, 1), got {}",
            alpha
        )))
    }
}
