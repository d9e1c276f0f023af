//! Abstract Syntax Tree definitions

mod expr;
mod span;

pub use expr::*;
pub use span::*;

use serde::{Deserialize, Serialize};

/// A parsed program: the top-level statement block
pub type Program = Spanned<Expr>;

/// Function definition
///
/// Shared between the tree and the function values created from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDef {
    /// `None` for anonymous functions
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Spanned<Expr>,
    /// `fun f(x) = x + 1` returns its body's value directly
    pub expr_body: bool,
}

impl FnDef {
    /// Name used in messages and display
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("anonymous")
    }
}
