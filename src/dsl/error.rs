//! Errors produced while compiling a filter query.

use super::value::Coercer;

/// A rejected filter query. Every variant is a client input error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("incorrect parenthesis query at offset {offset}")]
    UnbalancedParenthesis { offset: usize },

    #[error("empty query")]
    EmptyQuery,

    #[error("unknown term '{term}'")]
    UnknownTerm { term: String },

    #[error("unknown operand '{token}'")]
    UnknownOperand { token: String },

    #[error("invalid expression: {reason}")]
    InvalidExpression { reason: &'static str },

    #[error("invalid value '{value}' for {expected} field")]
    InvalidValue { value: String, expected: Coercer },
}

impl CompileError {
    /// Stable identifier for callers that map errors onto their own codes.
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UnbalancedParenthesis { .. } => "unbalanced_parenthesis",
            CompileError::EmptyQuery => "empty_query",
            CompileError::UnknownTerm { .. } => "unknown_term",
            CompileError::UnknownOperand { .. } => "unknown_operand",
            CompileError::InvalidExpression { .. } => "invalid_expression",
            CompileError::InvalidValue { .. } => "invalid_value",
        }
    }

    pub(crate) fn invalid(reason: &'static str) -> Self {
        CompileError::InvalidExpression { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offending_token() {
        let err = CompileError::UnknownTerm {
            term: "bogus".into(),
        };
        assert_eq!(err.to_string(), "unknown term 'bogus'");
        assert_eq!(err.code(), "unknown_term");

        let err = CompileError::InvalidValue {
            value: "soon".into(),
            expected: Coercer::Duration,
        };
        assert_eq!(err.to_string(), "invalid value 'soon' for duration field");
    }
}
