//! Evaluation errors

use thiserror::Error;

/// Failure while evaluating an expression tree.
///
/// Always fatal to the enclosing evaluation: a malformed value cannot
/// produce a partial catalog.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("{op} operand '{value}' is not a number")]
    NotANumber { op: String, value: String },

    #[error("Division by zero in '{left} {op} {right}'")]
    DivisionByZero {
        op: &'static str,
        left: String,
        right: String,
    },

    #[error("Integer overflow in '{left} {op} {right}'")]
    Overflow {
        op: &'static str,
        left: String,
        right: String,
    },

    #[error("Cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("Cannot reassign variable '{name}'")]
    Reassignment { name: String },

    #[error("Unknown scope #{0}")]
    UnknownScope(usize),
}

pub type EvalResult<T> = Result<T, EvalError>;
