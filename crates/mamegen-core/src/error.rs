use thiserror::Error;

/// Classification of a [`DslError`], independent of line and message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DslErrorKind {
    Parse,
    UnexpectedToken,
    UnknownColumn,
    InvalidRule,
}

/// Errors raised while reading a mamegen spec.
///
/// Every variant carries the 1-based source line the problem was detected on
/// so callers can surface it verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DslError {
    /// Generic syntax or structural problem (empty input, malformed array).
    #[error("[line {line}] {message}")]
    Parse { line: usize, message: String },
    /// A required token or brace is missing on the expected line.
    #[error("[line {line}] {message}")]
    UnexpectedToken { line: usize, message: String },
    /// A name or selector refers to a column absent from `HEADER`.
    #[error("[line {line}] {message}")]
    UnknownColumn { line: usize, message: String },
    /// A rule argument or a cross-cutting constraint is invalid.
    #[error("[line {line}] {message}")]
    InvalidRule { line: usize, message: String },
}

impl DslError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn unexpected_token(line: usize, message: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            line,
            message: message.into(),
        }
    }

    pub fn unknown_column(line: usize, message: impl Into<String>) -> Self {
        Self::UnknownColumn {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_rule(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            line,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> DslErrorKind {
        match self {
            Self::Parse { .. } => DslErrorKind::Parse,
            Self::UnexpectedToken { .. } => DslErrorKind::UnexpectedToken,
            Self::UnknownColumn { .. } => DslErrorKind::UnknownColumn,
            Self::InvalidRule { .. } => DslErrorKind::InvalidRule,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Self::Parse { line, .. }
            | Self::UnexpectedToken { line, .. }
            | Self::UnknownColumn { line, .. }
            | Self::InvalidRule { line, .. } => *line,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Parse { message, .. }
            | Self::UnexpectedToken { message, .. }
            | Self::UnknownColumn { message, .. }
            | Self::InvalidRule { message, .. } => message,
        }
    }
}

/// Convenience alias for results returned while parsing.
pub type Result<T> = std::result::Result<T, DslError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_line_number() {
        let err = DslError::invalid_rule(7, "step must be > 0");
        assert_eq!(err.to_string(), "[line 7] step must be > 0");
        assert_eq!(err.line(), 7);
        assert_eq!(err.kind(), DslErrorKind::InvalidRule);
        assert_eq!(err.message(), "step must be > 0");
    }
}
