use thiserror::Error;

/// A fatal format error. Every failure carries the 1-based source line and
/// the name of the violated rule; the run aborts on the first one.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {rule}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub rule: &'static str,
    pub message: String,
}

impl ParseError {
    pub fn new(line: usize, rule: &'static str, message: impl Into<String>) -> Self {
        ParseError {
            line,
            rule,
            message: message.into(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
