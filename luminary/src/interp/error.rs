//! Runtime errors and control-flow interrupts for the interpreter

use super::Value;
use crate::ast::Span;
use std::fmt;

/// Runtime error during interpretation
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Location of the node being evaluated, attached by the evaluator
    pub span: Option<Span>,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation applied to a value of the wrong type
    TypeError,
    /// Division or remainder by zero
    DivisionByZero,
    /// Undefined variable (only with `strict_variables`)
    UndefinedVariable,
    /// Argument count mismatch
    ArityMismatch,
    /// Index out of bounds
    IndexOutOfBounds,
    /// Calling something that is not a function
    NotCallable,
    /// Call depth limit reached
    StackOverflow,
    /// `break`/`continue`/`return` with nothing to catch it
    InvalidControlFlow,
    /// Console I/O failure
    IoError,
    /// Result would exceed a size limit
    TooLarge,
    /// `exit(code)` was called
    Exit(i32),
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        RuntimeError {
            kind,
            message: message.into(),
            span: None,
        }
    }

    /// Attach a location unless a more precise one is already set
    pub fn at(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// `Invalid '-' operation on a string`
    pub fn invalid_operation(op: &str, type_name: &str) -> Self {
        Self::type_error(format!("Invalid '{op}' operation on a {type_name}"))
    }

    pub fn expected_number() -> Self {
        Self::type_error("Expected a number")
    }

    pub fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero, "Can't divide by zero")
    }

    pub fn undefined_variable(name: &str) -> Self {
        Self::new(ErrorKind::UndefinedVariable, format!("Undefined variable '{name}'"))
    }

    pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> Self {
        Self::new(
            ErrorKind::ArityMismatch,
            format!("Expected {expected} argument(s) for {name}, got {got}"),
        )
    }

    pub fn index_out_of_bounds(index: f64, len: usize) -> Self {
        Self::new(
            ErrorKind::IndexOutOfBounds,
            format!("Index out of range ({index}) with length of {len}"),
        )
    }

    pub fn not_callable(type_name: &str) -> Self {
        Self::new(ErrorKind::NotCallable, format!("Can't call a {type_name} value"))
    }

    pub fn stack_overflow(limit: usize) -> Self {
        Self::new(
            ErrorKind::StackOverflow,
            format!("Maximum call depth exceeded ({limit})"),
        )
    }

    pub fn invalid_control_flow(keyword: &str, context: &str) -> Self {
        Self::new(
            ErrorKind::InvalidControlFlow,
            format!("'{keyword}' outside of {context}"),
        )
    }

    pub fn string_too_large(limit: usize) -> Self {
        Self::new(
            ErrorKind::TooLarge,
            format!("String would exceed the maximum length ({limit} bytes)"),
        )
    }

    pub fn io_error(msg: &str) -> Self {
        Self::new(ErrorKind::IoError, format!("IO error: {msg}"))
    }

    pub fn exit(code: i32) -> Self {
        Self::new(ErrorKind::Exit(code), format!("exit({code})"))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.span {
            Some(span) => write!(f, "Runtime error at {span}: {}", self.message),
            None => write!(f, "Runtime error: {}", self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for value operations and built-ins
pub type InterpResult<T> = Result<T, RuntimeError>;

/// Anything that stops a node from producing a plain value
#[derive(Debug, Clone)]
pub enum Interrupt {
    /// `return`, caught by the nearest function call
    Return(Value),
    /// `break`, caught by the nearest loop
    Break(Span),
    /// `continue`, caught by the nearest loop
    Continue(Span),
    Error(RuntimeError),
}

impl Interrupt {
    /// Turn a signal nobody caught into an error
    pub fn into_error(self) -> RuntimeError {
        match self {
            Interrupt::Error(err) => err,
            Interrupt::Break(span) => RuntimeError::invalid_control_flow("break", "a loop").at(span),
            Interrupt::Continue(span) => {
                RuntimeError::invalid_control_flow("continue", "a loop").at(span)
            }
            Interrupt::Return(_) => RuntimeError::invalid_control_flow("return", "a function"),
        }
    }
}

impl From<RuntimeError> for Interrupt {
    fn from(err: RuntimeError) -> Self {
        Interrupt::Error(err)
    }
}

/// Result of evaluating one node
pub type EvalResult = Result<Value, Interrupt>;
