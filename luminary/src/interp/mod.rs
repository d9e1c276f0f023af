//! Tree-walking interpreter

mod builtins;
mod env;
mod error;
mod eval;
mod value;

#[cfg(test)]
pub(crate) mod test_support;

pub use builtins::{Builtin, BuiltinFn, BUILTINS};
pub use env::{child_env, EnvRef, Environment};
pub use error::{ErrorKind, EvalResult, InterpResult, Interrupt, RuntimeError};
pub use eval::Interpreter;
pub use value::{Comparison, Value};
