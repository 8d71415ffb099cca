//! Positioned error rendering for the driver.
//!
//! Stage errors stay typed (`LexError`, `ParseError`, `TypeError`,
//! `RuntimeError`); at the driver boundary they convert into `Diagnostic`s
//! that carry the original source text and render the caret template:
//!
//! ```text
//! error at line L, column C:
//!   L | <that source line>
//!     |     ^
//!   <message>
//!   hint: <hint>
//! ```

use std::fmt;

use crate::lexer::{LexError, Span};
use crate::parser::ParseError;
use crate::typecheck::TypeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    pub location: Option<Location>,
    pub source: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub start: Span,
    pub end: Option<Span>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            source: source.into(),
            hint: None,
        }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some(Location {
            start: Span { line, column },
            end: None,
        });
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn from_lex(error: &LexError, source: &str) -> Self {
        let (line, column) = error.position();
        Self::new(error.to_string(), source).at(line, column)
    }

    pub fn from_parse(error: &ParseError, source: &str) -> Self {
        let (line, column) = error.position();
        Self::new(error.to_string(), source).at(line, column)
    }

    pub fn from_type(error: &TypeError, source: &str) -> Self {
        // Declaration-level checks carry no source position.
        Self::new(error.to_string(), source)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(location) = self.location else {
            writeln!(f, "error:")?;
            write!(f, "  {}", self.message)?;
            if let Some(hint) = &self.hint {
                write!(f, "\n  hint: {hint}")?;
            }
            return Ok(());
        };

        let Span { line, column } = location.start;
        writeln!(f, "error at line {line}, column {column}:")?;

        if let Some(text) = self.source.lines().nth(line.saturating_sub(1)) {
            let number = line.to_string();
            writeln!(f, "  {number} | {text}")?;
            writeln!(
                f,
                "  {blank} | {pad}^",
                blank = " ".repeat(number.len()),
                pad = " ".repeat(column.saturating_sub(1)),
            )?;
        }
        write!(f, "  {}", self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  hint: {hint}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

/// Aggregates diagnostics; renders them separated by blank lines.
#[derive(Debug, Default)]
pub struct Collector {
    diagnostics: Vec<Diagnostic>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }
}

impl fmt::Display for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.diagnostics.iter().enumerate() {
            if index > 0 {
                write!(f, "\n\n")?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}
