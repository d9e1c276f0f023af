//! Expression AST nodes

use super::{FnDef, Spanned};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Expression
///
/// Statements are expressions too: every node evaluates to a value, and
/// `return`/`break`/`continue` are nodes that interrupt the surrounding
/// evaluation instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Number literal
    Number(f64),
    /// String literal (escapes already resolved)
    Str(String),
    /// `null`
    Null,
    /// List literal: [a, b, c]
    List(Vec<Spanned<Expr>>),

    /// Variable reference
    Var(String),

    /// Assignment: set name = value
    Assign {
        name: String,
        value: Box<Spanned<Expr>>,
    },

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Conditional expression: cond ? then_branch : else_branch
    Ternary {
        cond: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Box<Spanned<Expr>>,
    },

    /// Element access: target[index]
    Index {
        target: Box<Spanned<Expr>>,
        index: Box<Spanned<Expr>>,
    },

    /// if/elif/else chain
    If {
        cases: Vec<IfCase>,
        else_branch: Option<Box<Spanned<Expr>>>,
    },

    /// while cond { body }
    While {
        cond: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },

    /// for var = from : to by step { body }
    For {
        var: String,
        from: Box<Spanned<Expr>>,
        to: Box<Spanned<Expr>>,
        by: Option<Box<Spanned<Expr>>>,
        body: Box<Spanned<Expr>>,
    },

    /// Function literal, named or anonymous
    Fn(Rc<FnDef>),

    /// Function call
    Call {
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },

    /// return, with an optional value
    Return(Option<Box<Spanned<Expr>>>),
    Break,
    Continue,

    /// Statement sequence; evaluates to the last statement's value
    Block(Vec<Spanned<Expr>>),
}

impl Expr {
    /// Move every direct child into `out`, leaving `Null` in its place
    fn take_children(&mut self, out: &mut Vec<Expr>) {
        fn take(child: &mut Spanned<Expr>, out: &mut Vec<Expr>) {
            out.push(std::mem::replace(&mut child.node, Expr::Null));
        }

        match self {
            Expr::Number(_)
            | Expr::Str(_)
            | Expr::Null
            | Expr::Var(_)
            | Expr::Break
            | Expr::Continue
            | Expr::Return(None) => {}
            Expr::List(items) | Expr::Block(items) => {
                for item in items {
                    take(item, out);
                }
            }
            Expr::Assign { value: child, .. }
            | Expr::Unary { expr: child, .. }
            | Expr::Return(Some(child)) => take(child, out),
            Expr::Binary { left, right, .. } => {
                take(left, out);
                take(right, out);
            }
            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                take(cond, out);
                take(then_branch, out);
                take(else_branch, out);
            }
            Expr::Index { target, index } => {
                take(target, out);
                take(index, out);
            }
            Expr::If { cases, else_branch } => {
                for case in cases {
                    take(&mut case.cond, out);
                    take(&mut case.body, out);
                }
                if let Some(else_branch) = else_branch {
                    take(else_branch, out);
                }
            }
            Expr::While { cond, body } => {
                take(cond, out);
                take(body, out);
            }
            Expr::For {
                from, to, by, body, ..
            } => {
                take(from, out);
                take(to, out);
                if let Some(by) = by {
                    take(by, out);
                }
                take(body, out);
            }
            // A definition still referenced by a function value is dropped
            // later, through the same path
            Expr::Fn(def) => {
                if let Some(def) = Rc::get_mut(def) {
                    take(&mut def.body, out);
                }
            }
            Expr::Call { callee, args } => {
                take(callee, out);
                for arg in args {
                    take(arg, out);
                }
            }
        }
    }
}

/// Long operator chains nest one node per operand, so the tree is torn
/// down from a work list instead of by recursion
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.take_children(&mut pending);
        }
    }
}

/// One `if`/`elif` arm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfCase {
    pub cond: Spanned<Expr>,
    pub body: Spanned<Expr>,
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // Logical
    And,
    Or,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Pow => write!(f, "^"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
            BinOp::And => write!(f, "and"),
            BinOp::Or => write!(f, "or"),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Unary plus (+), a no-op on numbers
    Plus,
    /// Logical not
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Plus => write!(f, "+"),
            UnOp::Not => write!(f, "not"),
        }
    }
}
