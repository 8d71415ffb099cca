use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("Unexpected character '{character}'")]
    UnexpectedCharacter {
        character: char,
        line: usize,
        column: usize,
    },
    #[error("Unterminated string literal")]
    UnterminatedString { line: usize, column: usize },
    #[error("Invalid integer literal '{literal}'")]
    InvalidIntegerLiteral {
        literal: String,
        line: usize,
        column: usize,
    },
}

impl LexError {
    /// 1-based position the error points at.
    pub fn position(&self) -> (usize, usize) {
        match self {
            LexError::UnexpectedCharacter { line, column, .. }
            | LexError::UnterminatedString { line, column }
            | LexError::InvalidIntegerLiteral { line, column, .. } => (*line, *column),
        }
    }
}

pub type LexResult<T> = Result<T, LexError>;
