//! Error types for the meta-analysis core.

use thiserror::Error;

/// Errors raised by the statistical core.
///
/// There is a single kind: the input collection cannot be pooled.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetaError {
    /// Empty study collection, or a study with an unusable standard error.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias for results from the core.
pub type MetaResult<T> = Result<T, MetaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MetaError::InvalidInput("no studies supplied".to_string());
        assert_eq!(err.to_string(), "Invalid input: no studies supplied");
    }
}
