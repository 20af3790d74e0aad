use std::error::Error;
use std::fmt;

#[derive(Debug, PartialEq, Clone)]
pub enum ParserErrorKind {
    UnexpectedEOF,
    UnexpectedToken(String, String),
    InvalidCharacter(char),
    InvalidToken(String),
    InvalidStringEscape(String),
    InvalidNumber(String),
    UnsupportedBase(String),
    TrailingInput,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ParserError {
    pub line: usize,
    pub column: usize,
    pub kind: ParserErrorKind,
}

impl ParserError {
    /// True when the input ended in the middle of a datum.
    /// Interactive front ends use this to ask for another line.
    pub fn is_incomplete(&self) -> bool {
        self.kind == ParserErrorKind::UnexpectedEOF
    }
}

impl fmt::Display for ParserErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParserErrorKind::UnexpectedEOF => write!(f, "unexpected end of input"),
            ParserErrorKind::UnexpectedToken(ref tok, ref expected) =>
                write!(f, "unexpected token {}, expected {}", tok, expected),
            ParserErrorKind::InvalidCharacter(c) => write!(f, "invalid character {:?}", c),
            ParserErrorKind::InvalidToken(ref tok) => write!(f, "invalid token {}", tok),
            ParserErrorKind::InvalidStringEscape(ref esc) => write!(f, "invalid string escape \\{}", esc),
            ParserErrorKind::InvalidNumber(ref rep) => write!(f, "invalid number literal {}", rep),
            ParserErrorKind::UnsupportedBase(ref rep) => write!(f, "unsupported base in {}", rep),
            ParserErrorKind::TrailingInput => write!(f, "unexpected input after datum"),
        }
    }
}

impl fmt::Display for ParserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.kind)
    }
}

impl Error for ParserError {}

/// Possible runtime error types
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum RuntimeErrorKind {
    /// Reference to, or assignment of, a variable bound nowhere in the environment chain
    UnboundVariable,
    /// Number of arguments did not match
    NumArgs,
    /// Argument type did not match
    InvalidType,
    /// Divisor was an exact or inexact zero
    DivideByZero,
    /// Argument was of the right type but outside the operation's domain
    Domain,
    /// Malformed special form
    BadSyntax,
    /// Raised by the `error` procedure
    UserError,
    /// Non-tail call depth exceeded the configured limit
    StackOverflow,
    /// The virtual machine reached an inconsistent state
    Internal,
}

impl RuntimeErrorKind {
    pub fn is_domain_error(self) -> bool {
        matches!(self, RuntimeErrorKind::Domain | RuntimeErrorKind::DivideByZero)
    }

    fn name(self) -> &'static str {
        match self {
            RuntimeErrorKind::UnboundVariable => "unbound variable",
            RuntimeErrorKind::NumArgs => "wrong number of arguments",
            RuntimeErrorKind::InvalidType => "wrong type",
            RuntimeErrorKind::DivideByZero => "division by zero",
            RuntimeErrorKind::Domain => "domain error",
            RuntimeErrorKind::BadSyntax => "bad syntax",
            RuntimeErrorKind::UserError => "error",
            RuntimeErrorKind::StackOverflow => "stack overflow",
            RuntimeErrorKind::Internal => "internal error",
        }
    }
}

/// Errors raised in runtime
#[derive(Debug, PartialEq, Clone)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub desc: String,
}

impl RuntimeError {
    pub fn new<S: Into<String>>(kind: RuntimeErrorKind, desc: S) -> RuntimeError {
        RuntimeError { kind: kind, desc: desc.into() }
    }

    pub fn invalid_type<S: Into<String>>(desc: S) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::InvalidType, desc)
    }

    pub fn domain<S: Into<String>>(desc: S) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::Domain, desc)
    }

    pub fn bad_syntax<S: Into<String>>(desc: S) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::BadSyntax, desc)
    }

    pub fn internal<S: Into<String>>(desc: S) -> RuntimeError {
        RuntimeError::new(RuntimeErrorKind::Internal, desc)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.desc)
    }
}

impl Error for RuntimeError {}

/// Failure of an API that both reads and evaluates source text
#[derive(Debug, PartialEq, Clone)]
pub enum EvalError {
    Parser(ParserError),
    Runtime(RuntimeError),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            EvalError::Parser(ref e) => write!(f, "read error at {}", e),
            EvalError::Runtime(ref e) => e.fmt(f),
        }
    }
}

impl Error for EvalError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            EvalError::Parser(ref e) => Some(e),
            EvalError::Runtime(ref e) => Some(e),
        }
    }
}

impl From<ParserError> for EvalError {
    fn from(err: ParserError) -> EvalError {
        EvalError::Parser(err)
    }
}

impl From<RuntimeError> for EvalError {
    fn from(err: RuntimeError) -> EvalError {
        EvalError::Runtime(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_domain_classification() {
        assert!(RuntimeErrorKind::DivideByZero.is_domain_error());
        assert!(RuntimeErrorKind::Domain.is_domain_error());
        assert!(!RuntimeErrorKind::InvalidType.is_domain_error());
    }

    #[test]
    fn test_display() {
        let err = RuntimeError::new(RuntimeErrorKind::UnboundVariable, "foo");
        assert_eq!(err.to_string(), "unbound variable: foo");

        let err = ParserError { line: 3, column: 7, kind: ParserErrorKind::UnexpectedEOF };
        assert_eq!(EvalError::from(err).to_string(), "read error at 3:7: unexpected end of input");
    }
}
