//! Diagnostics shared by every phase of the pipeline.
//!
//! A diagnostic carries the phase that produced it, the source position it
//! points at, and a message. The rendered form is line-oriented and stable
//! so tests can compare it by string.

use std::fmt;

use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lexical,
    Syntactic,
    Semantic,
    Runtime,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Lexical => "Lexical",
            Phase::Syntactic => "Syntactic",
            Phase::Semantic => "Semantic",
            Phase::Runtime => "Runtime",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub phase: Phase,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(phase: Phase, span: Span, message: impl Into<String>) -> Self {
        Self {
            phase,
            line: span.line,
            column: span.column,
            message: message.into(),
        }
    }

    pub fn lexical(span: Span, message: impl Into<String>) -> Self {
        Self::new(Phase::Lexical, span, message)
    }

    pub fn syntactic(span: Span, message: impl Into<String>) -> Self {
        Self::new(Phase::Syntactic, span, message)
    }

    pub fn semantic(span: Span, message: impl Into<String>) -> Self {
        Self::new(Phase::Semantic, span, message)
    }

    pub fn runtime(span: Span, message: impl Into<String>) -> Self {
        Self::new(Phase::Runtime, span, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error at line {}, column {}: {}",
            self.phase, self.line, self.column, self.message
        )
    }
}

impl std::error::Error for Diagnostic {}
