//! Error taxonomy of the interpreter.
//!
//! Builtins raise a bare [`ErrorKind`]; the statement executor stamps the
//! line number on its way out, so every error that reaches the REPL knows
//! where it came from.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Unresolved reference \"{0}\"")]
    UnresolvedReference(String),

    #[error("Subscript out of range for \"{array}\" (index: {index}, len: {len})")]
    SubscriptOutOfRange { array: String, index: i64, len: usize },

    #[error("Out of DATA")]
    OutOfData,

    #[error("NEXT {}without FOR", .0.as_deref().map(|v| format!("'{v}' ")).unwrap_or_default())]
    NextWithoutFor(Option<String>),

    #[error("RETURN without GOSUB")]
    NoGosubToReturn,

    #[error("Duplicate definition on {0}")]
    DuplicateDefinition(String),

    #[error("Trying to modify constant \"{0}\"")]
    AssignmentToConstant(String),

    #[error("Out of memory")]
    OutOfMemory,

    #[error("Illegal function call: {0}")]
    BadFunctionCall(String),

    #[error("Illegal number format: {0}")]
    NumberFormat(String),

    #[error("Recursion limit of {0} exceeded")]
    RecursionLimit(usize),

    #[error("No such file: {0}")]
    NoSuchFile(String),

    #[error("I/O error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}{}", .line.map(|l| format!(" in {l}")).unwrap_or_default())]
pub struct Error {
    pub kind: ErrorKind,
    pub line: Option<usize>,
}

impl Error {
    pub fn at(kind: ErrorKind, line: usize) -> Self {
        Self { kind, line: Some(line) }
    }

    /// Attaches `line` unless the error already carries one.
    pub fn or_line(mut self, line: usize) -> Self {
        self.line.get_or_insert(line);
        self
    }

    pub fn without_line(mut self) -> Self {
        self.line = None;
        self
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind, line: None }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        ErrorKind::Io(err.to_string()).into()
    }
}

pub(crate) fn syntax(reason: impl Into<String>) -> Error {
    ErrorKind::Syntax(reason.into()).into()
}

pub(crate) fn mismatch(detail: impl Into<String>) -> Error {
    ErrorKind::TypeMismatch(detail.into()).into()
}

pub(crate) fn bad_call(reason: impl Into<String>) -> Error {
    ErrorKind::BadFunctionCall(reason.into()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_line_context() {
        let test_cases = vec![
            (Error::at(ErrorKind::DivisionByZero, 10), "Division by zero in 10"),
            (ErrorKind::OutOfData.into(), "Out of DATA"),
            (
                Error::at(ErrorKind::NextWithoutFor(Some("I".into())), 30),
                "NEXT 'I' without FOR in 30",
            ),
            (Error::at(ErrorKind::NextWithoutFor(None), 5), "NEXT without FOR in 5"),
            (
                Error::at(
                    ErrorKind::SubscriptOutOfRange { array: "A".into(), index: 5, len: 3 },
                    20,
                ),
                "Subscript out of range for \"A\" (index: 5, len: 3) in 20",
            ),
        ];

        for (err, expected) in test_cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn or_line_keeps_the_first_line() {
        let err = Error::at(ErrorKind::OutOfData, 10).or_line(99);
        assert_eq!(err.line, Some(10));
        let err = Error::from(ErrorKind::OutOfData).or_line(99);
        assert_eq!(err.line, Some(99));
    }
}
