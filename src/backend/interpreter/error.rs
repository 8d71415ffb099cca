use thiserror::Error;

/// Typed errors produced by the tree-walking interpreter backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Unknown class '{name}'")]
    UnknownClass { name: String },
    #[error("Method '{method}' not found on class '{class_name}'")]
    MethodNotFound { method: String, class_name: String },
    #[error("Cannot access member '{member}' on {type_name}")]
    InvalidReceiver { member: String, type_name: String },
    #[error("Unsupported operands for '{op}': {left} and {right}")]
    UnsupportedOperands {
        op: &'static str,
        left: String,
        right: String,
    },
    #[error("Unsupported operand for unary '{op}': {type_name}")]
    UnsupportedUnary { op: &'static str, type_name: String },
    #[error("Condition must be an int or bool, got {type_name}")]
    InvalidCondition { type_name: String },
    #[error("Invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("Can only call 'print' or methods")]
    InvalidCallTarget,
    #[error("'super' is not supported in this position")]
    UnsupportedSuper,
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Return outside of method")]
    ReturnOutsideMethod,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
