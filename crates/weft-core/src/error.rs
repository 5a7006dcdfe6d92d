//! Error types for the stream evaluator

use core::fmt;

/// Result type for evaluator operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors surfaced to the consumer of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A producer continuation signalled a failure
    Producer(String),

    /// A producer panicked on a worker thread
    ProducerPanic(String),

    /// Evaluator configuration was rejected at SVar creation
    Config(ConfigError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::Producer(msg) => write!(f, "producer failed: {}", msg),
            EvalError::ProducerPanic(msg) => write!(f, "producer panicked: {}", msg),
            EvalError::Config(e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl std::error::Error for EvalError {}

/// Configuration errors, rejected when an SVar is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_rate` requires a strictly positive target
    NonPositiveRate,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositiveRate => write!(f, "rate target must be positive"),
        }
    }
}

impl From<ConfigError> for EvalError {
    fn from(e: ConfigError) -> Self {
        EvalError::Config(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = EvalError::Producer("boom".to_string());
        assert_eq!(format!("{}", e), "producer failed: boom");

        let e = EvalError::Config(ConfigError::NonPositiveRate);
        assert_eq!(
            format!("{}", e),
            "invalid configuration: rate target must be positive"
        );
    }

    #[test]
    fn test_error_conversion() {
        let cfg_err = ConfigError::NonPositiveRate;
        let eval_err: EvalError = cfg_err.into();
        assert!(matches!(
            eval_err,
            EvalError::Config(ConfigError::NonPositiveRate)
        ));
    }
}
