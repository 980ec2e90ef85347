// ABOUTME: Error types for the scrubber pipeline including ErrorCode enum and ScrubError struct.
// ABOUTME: Provides categorized errors with convenience constructors, item tagging and boolean helpers.

use std::convert::Infallible;
use std::fmt;

/// Error codes representing the categories of per-item failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Required input missing (empty `htmlContent`).
    Validation,
    /// A sanitization stage could not be applied (e.g. an unparsable selector).
    Stage,
    /// The extraction or markdown collaborator failed.
    Collaborator,
    /// The per-item deadline expired.
    Timeout,
}

impl ErrorCode {
    /// Stable name written to the `error` field of an isolated failure record.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ErrorCode::Validation => "ValidationError",
            ErrorCode::Stage => "StageExecutionError",
            ErrorCode::Collaborator => "CollaboratorError",
            ErrorCode::Timeout => "TimeoutError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Validation => "validation error",
            ErrorCode::Stage => "stage execution error",
            ErrorCode::Collaborator => "collaborator error",
            ErrorCode::Timeout => "timeout",
        };
        write!(f, "{}", s)
    }
}

/// The main error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub struct ScrubError {
    pub code: ErrorCode,
    /// Position of the failing item in its batch, once known.
    pub index: Option<usize>,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ScrubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scrubber: ")?;
        if let Some(index) = self.index {
            write!(f, "item {} ", index)?;
        }
        write!(f, "{}: {}", self.op, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ScrubError {
    fn new(code: ErrorCode, op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self {
            code,
            index: None,
            op: op.into(),
            source,
        }
    }

    /// Create a Validation error.
    pub fn validation(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Validation, op, source)
    }

    /// Create a Stage error.
    pub fn stage(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Stage, op, source)
    }

    /// Create a Collaborator error.
    pub fn collaborator(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Collaborator, op, source)
    }

    /// Create a Timeout error.
    pub fn timeout(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self::new(ErrorCode::Timeout, op, source)
    }

    /// Tag the error with the batch position of the item that raised it.
    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Returns true if this is a Validation error.
    pub fn is_validation(&self) -> bool {
        self.code == ErrorCode::Validation
    }

    /// Returns true if this is a Stage error.
    pub fn is_stage(&self) -> bool {
        self.code == ErrorCode::Stage
    }

    /// Returns true if this is a Collaborator error.
    pub fn is_collaborator(&self) -> bool {
        self.code == ErrorCode::Collaborator
    }

    /// Returns true if this is a Timeout error.
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::Timeout
    }
}

impl From<Infallible> for ScrubError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_index_op_and_source() {
        let err = ScrubError::stage(
            "ExcludedSelectors",
            Some(anyhow::anyhow!("invalid selector `[[`")),
        )
        .at_index(2);

        assert_eq!(
            err.to_string(),
            "scrubber: item 2 ExcludedSelectors: stage execution error: invalid selector `[[`"
        );
    }

    #[test]
    fn display_without_index_or_source() {
        let err = ScrubError::validation("Validate", None);
        assert_eq!(err.to_string(), "scrubber: Validate: validation error");
    }

    #[test]
    fn predicates_match_code() {
        assert!(ScrubError::validation("x", None).is_validation());
        assert!(ScrubError::stage("x", None).is_stage());
        assert!(ScrubError::collaborator("x", None).is_collaborator());
        assert!(ScrubError::timeout("x", None).is_timeout());
        assert!(!ScrubError::timeout("x", None).is_stage());
    }

    #[test]
    fn wire_names_are_stable() {
        assert_eq!(ErrorCode::Validation.wire_name(), "ValidationError");
        assert_eq!(ErrorCode::Stage.wire_name(), "StageExecutionError");
        assert_eq!(ErrorCode::Collaborator.wire_name(), "CollaboratorError");
        assert_eq!(ErrorCode::Timeout.wire_name(), "TimeoutError");
    }
}
