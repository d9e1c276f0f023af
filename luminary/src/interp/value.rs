//! Runtime values for the interpreter

use super::builtins::Builtin;
use super::error::{InterpResult, RuntimeError};
use crate::ast::FnDef;
use std::fmt;
use std::rc::Rc;

/// Runtime value
///
/// Strings and lists are shared and never mutated in place; operations that
/// "change" them build a new value.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Null,
    /// User-defined function
    Function(Rc<FnDef>),
    /// Native function from the built-in catalogue
    Builtin(&'static Builtin),
}

/// Comparison operators that can fail on mismatched types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Gt,
    Ge,
    Lt,
    Le,
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }

    pub fn bool(b: bool) -> Self {
        Value::Number(if b { 1.0 } else { 0.0 })
    }

    /// Check if value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(_) => true,
            Value::Null => false,
            Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    /// Get type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Null => "null",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin function",
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_))
    }

    /// Error for an arithmetic operator this value doesn't support
    fn unsupported(&self, op: &str) -> RuntimeError {
        match self {
            Value::Number(_) | Value::Str(_) => RuntimeError::expected_number(),
            Value::List(_) => RuntimeError::invalid_operation(op, "list"),
            Value::Null => RuntimeError::invalid_operation(op, "null value"),
            Value::Function(_) | Value::Builtin(_) => RuntimeError::invalid_operation(op, "function"),
        }
    }

    pub fn add(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Number(_), Value::Str(b)) => Ok(Value::string(format!("{self}{b}"))),
            (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
            (Value::Str(a), Value::Number(_)) => Ok(Value::string(format!("{a}{other}"))),
            (Value::List(a), Value::List(b)) => {
                let mut items = Vec::with_capacity(a.len() + b.len());
                items.extend(a.iter().cloned());
                items.extend(b.iter().cloned());
                Ok(Value::list(items))
            }
            (Value::List(_), _) => Err(RuntimeError::type_error(
                "Only lists can be concatenated with a list",
            )),
            _ => Err(self.unsupported("+")),
        }
    }

    pub fn sub(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
            (Value::Str(_), _) => Err(RuntimeError::invalid_operation("-", "string")),
            _ => Err(self.unsupported("-")),
        }
    }

    pub fn mul(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
            (Value::Str(s), Value::Number(n)) | (Value::Number(n), Value::Str(s)) => {
                let count = repeat_count(*n);
                if s.is_empty() || count == 0 {
                    return Ok(Value::string(""));
                }
                match s.len().checked_mul(count) {
                    Some(len) if len <= MAX_STRING_LEN => Ok(Value::string(s.repeat(count))),
                    _ => Err(RuntimeError::string_too_large(MAX_STRING_LEN)),
                }
            }
            _ => Err(self.unsupported("*")),
        }
    }

    pub fn div(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(_), Value::Number(b)) if *b == 0.0 => {
                Err(RuntimeError::division_by_zero())
            }
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
            (Value::Str(_), _) => Err(RuntimeError::invalid_operation("/", "string")),
            _ => Err(self.unsupported("/")),
        }
    }

    pub fn rem(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(_), Value::Number(b)) if *b == 0.0 => {
                Err(RuntimeError::division_by_zero())
            }
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a % b)),
            (Value::Str(_), _) => Err(RuntimeError::invalid_operation("%", "string")),
            _ => Err(self.unsupported("%")),
        }
    }

    pub fn pow(&self, other: &Value) -> InterpResult<Value> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a.powf(*b))),
            (Value::Str(_), _) => Err(RuntimeError::invalid_operation("^", "string")),
            _ => Err(self.unsupported("^")),
        }
    }

    /// Structural equality; never fails, mismatched types are unequal
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }

    /// Ordering comparison, defined for number pairs and string pairs only
    pub fn compare(&self, other: &Value, cmp: Comparison) -> InterpResult<bool> {
        let ordering = match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::List(_), _) => return Err(RuntimeError::type_error("Can't compare lists")),
            (Value::Null, _) => return Err(RuntimeError::type_error("Can't compare null values")),
            (Value::Function(_) | Value::Builtin(_), _) => {
                return Err(RuntimeError::type_error("Can't compare functions"));
            }
            _ => {
                return Err(RuntimeError::type_error(
                    "Can't compare values of different types",
                ));
            }
        };
        // NaN compares false both ways
        let Some(ordering) = ordering else {
            return Ok(false);
        };
        Ok(match cmp {
            Comparison::Gt => ordering.is_gt(),
            Comparison::Ge => ordering.is_ge(),
            Comparison::Lt => ordering.is_lt(),
            Comparison::Le => ordering.is_le(),
        })
    }

    /// `and`: the right operand when both are truthy, else 0
    pub fn and(&self, other: &Value) -> Value {
        if self.is_truthy() && other.is_truthy() {
            other.clone()
        } else {
            Value::Number(0.0)
        }
    }

    /// `or`: the first truthy operand, else 0
    pub fn or(&self, other: &Value) -> Value {
        if self.is_truthy() {
            self.clone()
        } else if other.is_truthy() {
            other.clone()
        } else {
            Value::Number(0.0)
        }
    }

    pub fn not(&self) -> Value {
        Value::bool(!self.is_truthy())
    }

    /// Positional access into a string (by character) or list
    pub fn index(&self, index: &Value) -> InterpResult<Value> {
        let len = match self {
            Value::List(items) => items.len(),
            Value::Str(s) => s.chars().count(),
            _ => {
                return Err(RuntimeError::type_error(format!(
                    "Can't index a {} value",
                    self.type_name()
                )));
            }
        };
        let Value::Number(i) = index else {
            return Err(RuntimeError::expected_number());
        };
        if i.fract() != 0.0 {
            return Err(RuntimeError::type_error(format!(
                "Index must be a whole number, got {i}"
            )));
        }
        if *i < 0.0 || *i >= len as f64 {
            return Err(RuntimeError::index_out_of_bounds(*i, len));
        }
        let i = *i as usize;
        match self {
            Value::List(items) => Ok(items[i].clone()),
            Value::Str(s) => Ok(s
                .chars()
                .nth(i)
                .map(|c| Value::string(c.to_string()))
                .unwrap_or(Value::Null)),
            _ => Ok(Value::Null),
        }
    }
}

/// Longest string, in bytes, that `string * n` may produce
pub const MAX_STRING_LEN: usize = 1 << 28;

/// Number of repetitions for `string * n`: `n` rounded up, never negative
///
/// Counts beyond `usize::MAX` saturate.
fn repeat_count(n: f64) -> usize {
    if n.is_nan() || n <= 0.0 {
        0
    } else {
        n.ceil() as usize
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Null => write!(f, "(null)"),
            Value::Function(def) => write!(f, "{}({})", def.display_name(), def.params.join(", ")),
            Value::Builtin(b) => write!(f, "builtin:{}({})", b.name, b.params.join(", ")),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}
