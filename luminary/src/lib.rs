//! Luminary: a small dynamically typed scripting language
//!
//! Source text flows through [`lexer::tokenize`], [`parser::parse`] and the
//! tree-walking [`interp::Interpreter`]. [`run`] does all three.

pub mod ast;
pub mod config;
pub mod error;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod repl;

pub use ast::Span;
pub use config::Config;
pub use error::{Result, ScriptError};
pub use interp::{Interpreter, Value};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Environment variable holding the log filter; `RUST_LOG` also works
pub const LOG_ENV: &str = "LUMINARY_LOG";

/// Install a tracing subscriber if a log filter is set in the environment
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = if std::env::var(LOG_ENV).is_ok() {
            EnvFilter::from_env(LOG_ENV)
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}

/// Run `source` in `interpreter`'s global environment
///
/// Convenience wrapper over [`Interpreter::run`]. `name` is used for logging
/// only; see [`error::report_error`] for rendering failures against it.
pub fn run(interpreter: &mut Interpreter, source: &str, name: &str) -> Result<Value> {
    interpreter.run(source, name)
}
