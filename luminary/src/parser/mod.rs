//! Recursive-descent parser
//!
//! Precedence, lowest first: `set`/ternary/`and`/`or`, `not` and comparisons,
//! `+ -`, `* / %`, unary sign, `^`, postfix calls and indexing, atoms.
//! Every binary level goes through [`Parser::bin_op`], a left fold over one
//! operand rule for the first operand and one for the rest.

mod snapshot;


use crate::ast::{BinOp, Expr, FnDef, IfCase, Program, Span, Spanned, UnOp};
use crate::error::{Result, ScriptError};
use crate::lexer::{Keyword, Op, Token};
use std::rc::Rc;

/// Stack growth parameters for deeply nested input
const STACK_RED_ZONE: usize = 64 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

type Rule = fn(&mut Parser) -> Result<Spanned<Expr>>;

/// Parse tokens into AST
///
/// `tokens` must end with [`Token::Eof`], as produced by
/// [`crate::lexer::tokenize`].
#[tracing::instrument(level = "debug", skip_all, fields(tokens = tokens.len()))]
pub fn parse(tokens: Vec<(Token, Span)>) -> Result<Program> {
    let mut parser = Parser::new(tokens);
    let program = parser.program()?;
    tracing::debug!(span = %program.span, "parsed");
    Ok(program)
}

/// Parser state
pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    /// Failure of the last trailing statement that was given up on,
    /// and whether it got past its first token
    abandoned: Option<(ScriptError, bool)>,
}

impl Parser {
    pub fn new(mut tokens: Vec<(Token, Span)>) -> Self {
        if !matches!(tokens.last(), Some((Token::Eof, _))) {
            let span = tokens
                .last()
                .map(|(_, s)| Span::new(s.end, s.end))
                .unwrap_or_else(|| {
                    let start = crate::ast::Position::start();
                    Span::new(start, start)
                });
            tokens.push((Token::Eof, span));
        }
        Parser {
            tokens,
            pos: 0,
            abandoned: None,
        }
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    fn current(&self) -> &Token {
        &self.tokens[self.pos].0
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].1
    }

    /// Span of the most recently consumed token
    fn prev_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].1
    }

    fn advance(&mut self) -> (Token, Span) {
        let tok = self.tokens[self.pos].clone();
        if !matches!(tok.0, Token::Eof) {
            self.pos += 1;
        }
        tok
    }

    fn at_op(&self, op: Op) -> bool {
        self.current().is_op(op)
    }

    fn at_keyword(&self, kw: Keyword) -> bool {
        self.current().is_keyword(kw)
    }

    fn at_eof(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::invalid_syntax(message, self.current_span())
    }

    fn expect_op(&mut self, op: Op, message: &str) -> Result<Span> {
        if self.at_op(op) {
            Ok(self.advance().1)
        } else {
            Err(self.error(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<String> {
        match self.current() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn program(&mut self) -> Result<Program> {
        let start = self.current_span();
        let stmts = self.statements(None)?;
        if !self.at_eof() {
            return Err(self.leftover_error("Unexpected token"));
        }
        let span = match (stmts.first(), stmts.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => start,
        };
        Ok(Spanned::new(Expr::Block(stmts), span))
    }

    /// Error for a sequence that stopped before its terminator
    fn leftover_error(&mut self, message: &str) -> ScriptError {
        match self.abandoned.take() {
            Some((err, true)) => err,
            _ => self.error(message),
        }
    }

    /// Statement sequence up to `terminator` (or EOF)
    ///
    /// Only the first statement is mandatory. Each later one is parsed
    /// speculatively: if it fails the cursor is rewound and the sequence
    /// ends there.
    fn statements(&mut self, terminator: Option<Op>) -> Result<Vec<Spanned<Expr>>> {
        let mut stmts = Vec::new();
        if self.at_sequence_end(terminator) {
            return Ok(stmts);
        }
        stmts.push(self.statement()?);

        while !self.at_sequence_end(terminator) {
            let snapshot = self.snapshot();
            match self.statement() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    let progressed = self.pos > snapshot.cursor_pos;
                    tracing::trace!(at = snapshot.cursor_pos, error = %err, "statement abandoned");
                    self.restore(snapshot);
                    self.abandoned = Some((err, progressed));
                    break;
                }
            }
        }
        Ok(stmts)
    }

    fn at_sequence_end(&self, terminator: Option<Op>) -> bool {
        self.at_eof() || terminator.is_some_and(|op| self.at_op(op))
    }

    fn statement(&mut self) -> Result<Spanned<Expr>> {
        let start = self.current_span();

        if self.at_keyword(Keyword::Return) {
            self.advance();
            let value = self.try_parse(Parser::exp);
            let span = match &value {
                Some(v) => start.merge(v.span),
                None => start,
            };
            return Ok(Spanned::new(Expr::Return(value.map(Box::new)), span));
        }
        if self.at_keyword(Keyword::Continue) {
            self.advance();
            return Ok(Spanned::new(Expr::Continue, start));
        }
        if self.at_keyword(Keyword::Break) {
            self.advance();
            return Ok(Spanned::new(Expr::Break, start));
        }

        self.exp()
    }

    /// `{ statements }`
    fn block(&mut self) -> Result<Spanned<Expr>> {
        let open = self.expect_op(Op::LBrace, "Expected '{'")?;
        self.abandoned = None;
        let stmts = self.statements(Some(Op::RBrace))?;
        if !self.at_op(Op::RBrace) {
            return Err(self.leftover_error("Expected '}'"));
        }
        let close = self.advance().1;
        Ok(Spanned::new(Expr::Block(stmts), open.merge(close)))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn exp(&mut self) -> Result<Spanned<Expr>> {
        self.nested(Parser::exp_inner)
    }

    /// Run a rule that may recurse without passing through `exp`
    fn nested(&mut self, rule: Rule) -> Result<Spanned<Expr>> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || rule(self))
    }

    fn exp_inner(&mut self) -> Result<Spanned<Expr>> {
        if self.at_keyword(Keyword::Set) {
            let start = self.advance().1;
            let name = self.expect_ident("Expected identifier")?;
            self.expect_op(Op::Assign, "Expected '='")?;
            let value = self.exp()?;
            let span = start.merge(value.span);
            return Ok(Spanned::new(
                Expr::Assign {
                    name,
                    value: Box::new(value),
                },
                span,
            ));
        }

        let node = self.bin_op(Parser::comp_exp, Parser::comp_exp, |tok| match tok {
            Token::Keyword(Keyword::And) => Some(BinOp::And),
            Token::Keyword(Keyword::Or) => Some(BinOp::Or),
            _ => None,
        })?;

        if !self.at_op(Op::Question) {
            return Ok(node);
        }
        self.advance();
        let then_branch = self.exp()?;
        self.expect_op(Op::Colon, "Expected ':'")?;
        let else_branch = self.exp()?;
        let span = node.span.merge(else_branch.span);
        Ok(Spanned::new(
            Expr::Ternary {
                cond: Box::new(node),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            },
            span,
        ))
    }

    fn comp_exp(&mut self) -> Result<Spanned<Expr>> {
        if self.at_keyword(Keyword::Not) {
            let start = self.advance().1;
            let expr = self.nested(Parser::comp_exp)?;
            let span = start.merge(expr.span);
            return Ok(Spanned::new(
                Expr::Unary {
                    op: UnOp::Not,
                    expr: Box::new(expr),
                },
                span,
            ));
        }

        self.bin_op(Parser::arith_exp, Parser::arith_exp, |tok| match tok {
            Token::Op(Op::EqEq) => Some(BinOp::Eq),
            Token::Op(Op::NotEq) => Some(BinOp::Ne),
            Token::Op(Op::Gt) => Some(BinOp::Gt),
            Token::Op(Op::Ge) => Some(BinOp::Ge),
            Token::Op(Op::Lt) => Some(BinOp::Lt),
            Token::Op(Op::Le) => Some(BinOp::Le),
            _ => None,
        })
    }

    fn arith_exp(&mut self) -> Result<Spanned<Expr>> {
        self.bin_op(Parser::term, Parser::term, |tok| match tok {
            Token::Op(Op::Plus) => Some(BinOp::Add),
            Token::Op(Op::Minus) => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn term(&mut self) -> Result<Spanned<Expr>> {
        self.bin_op(Parser::factor, Parser::factor, |tok| match tok {
            Token::Op(Op::Star) => Some(BinOp::Mul),
            Token::Op(Op::Slash) => Some(BinOp::Div),
            Token::Op(Op::Percent) => Some(BinOp::Mod),
            _ => None,
        })
    }

    fn factor(&mut self) -> Result<Spanned<Expr>> {
        let op = match self.current() {
            Token::Op(Op::Plus) => UnOp::Plus,
            Token::Op(Op::Minus) => UnOp::Neg,
            _ => return self.power(),
        };
        let start = self.advance().1;
        let expr = self.nested(Parser::factor)?;
        let span = start.merge(expr.span);
        Ok(Spanned::new(
            Expr::Unary {
                op,
                expr: Box::new(expr),
            },
            span,
        ))
    }

    /// `^` takes a factor on the right, which recurses back into `power`,
    /// so chains associate to the right
    fn power(&mut self) -> Result<Spanned<Expr>> {
        self.bin_op(Parser::call, |p| p.nested(Parser::factor), |tok| match tok {
            Token::Op(Op::Caret) => Some(BinOp::Pow),
            _ => None,
        })
    }

    /// Left fold of `first (op rest)*`
    fn bin_op(
        &mut self,
        first: Rule,
        rest: Rule,
        accept: fn(&Token) -> Option<BinOp>,
    ) -> Result<Spanned<Expr>> {
        let mut left = first(self)?;
        while let Some(op) = accept(self.current()) {
            self.advance();
            let right = rest(self)?;
            let span = left.span.merge(right.span);
            left = Spanned::new(
                Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    /// Atom followed by any number of `(args)` and `[index]` suffixes
    fn call(&mut self) -> Result<Spanned<Expr>> {
        let mut expr = self.atom()?;
        loop {
            if self.at_op(Op::LParen) {
                self.advance();
                let args = self.comma_list(Op::RParen, "Expected ',' or ')'")?;
                let span = expr.span.merge(self.prev_span());
                expr = Spanned::new(
                    Expr::Call {
                        callee: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else if self.at_op(Op::LBracket) {
                self.advance();
                let index = self.exp()?;
                let close = self.expect_op(Op::RBracket, "Expected ']'")?;
                let span = expr.span.merge(close);
                expr = Spanned::new(
                    Expr::Index {
                        target: Box::new(expr),
                        index: Box::new(index),
                    },
                    span,
                );
            } else {
                return Ok(expr);
            }
        }
    }

    /// `exp (',' exp)* close`, or just `close`; the opener is already consumed
    fn comma_list(&mut self, close: Op, message: &str) -> Result<Vec<Spanned<Expr>>> {
        let mut items = Vec::new();
        if self.at_op(close) {
            self.advance();
            return Ok(items);
        }
        loop {
            items.push(self.exp()?);
            if self.at_op(Op::Comma) {
                self.advance();
            } else {
                self.expect_op(close, message)?;
                return Ok(items);
            }
        }
    }

    fn atom(&mut self) -> Result<Spanned<Expr>> {
        let span = self.current_span();
        let node = match self.current() {
            Token::Number(n) => Expr::Number(*n),
            Token::Str(s) => Expr::Str(s.clone()),
            Token::Ident(name) => Expr::Var(name.clone()),
            Token::Keyword(Keyword::Null) => Expr::Null,
            Token::Op(Op::LParen) => {
                self.advance();
                let mut inner = self.exp()?;
                let close = self.expect_op(Op::RParen, "Expected ')'")?;
                inner.span = span.merge(close);
                return Ok(inner);
            }
            Token::Op(Op::LBracket) => {
                self.advance();
                let elements = self.comma_list(Op::RBracket, "Expected ',' or ']'")?;
                return Ok(Spanned::new(
                    Expr::List(elements),
                    span.merge(self.prev_span()),
                ));
            }
            Token::Keyword(Keyword::If) => return self.if_exp(),
            Token::Keyword(Keyword::While) => return self.while_exp(),
            Token::Keyword(Keyword::For) => return self.for_exp(),
            Token::Keyword(Keyword::Fun) => return self.fun_def(),
            _ => return Err(self.error("Unexpected token")),
        };
        self.advance();
        Ok(Spanned::new(node, span))
    }

    fn if_exp(&mut self) -> Result<Spanned<Expr>> {
        let start = self.advance().1;
        let mut cases = Vec::new();

        let cond = self.exp()?;
        let body = self.block()?;
        cases.push(IfCase { cond, body });

        while self.at_keyword(Keyword::Elif) {
            self.advance();
            let cond = self.exp()?;
            let body = self.block()?;
            cases.push(IfCase { cond, body });
        }

        let else_branch = if self.at_keyword(Keyword::Else) {
            self.advance();
            Some(Box::new(self.block()?))
        } else {
            None
        };

        Ok(Spanned::new(
            Expr::If { cases, else_branch },
            start.merge(self.prev_span()),
        ))
    }

    fn while_exp(&mut self) -> Result<Spanned<Expr>> {
        let start = self.advance().1;
        let cond = self.exp()?;
        let body = self.block()?;
        let span = start.merge(body.span);
        Ok(Spanned::new(
            Expr::While {
                cond: Box::new(cond),
                body: Box::new(body),
            },
            span,
        ))
    }

    fn for_exp(&mut self) -> Result<Spanned<Expr>> {
        let start = self.advance().1;
        let var = self.expect_ident("Expected identifier")?;
        self.expect_op(Op::Assign, "Expected '='")?;
        let from = self.exp()?;
        self.expect_op(Op::Colon, "Expected ':'")?;
        let to = self.exp()?;
        let by = if self.at_keyword(Keyword::By) {
            self.advance();
            Some(Box::new(self.exp()?))
        } else {
            None
        };
        let body = self.block()?;
        let span = start.merge(body.span);
        Ok(Spanned::new(
            Expr::For {
                var,
                from: Box::new(from),
                to: Box::new(to),
                by,
                body: Box::new(body),
            },
            span,
        ))
    }

    /// `fun name? (params) = exp` or `fun name? (params) { statements }`
    fn fun_def(&mut self) -> Result<Spanned<Expr>> {
        let start = self.advance().1;

        let name = match self.current() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        if name.is_some() {
            self.expect_op(Op::LParen, "Expected '('")?;
        } else {
            self.expect_op(Op::LParen, "Expected identifier or '('")?;
        }

        let mut params = Vec::new();
        if !self.at_op(Op::RParen) {
            params.push(self.expect_ident("Expected identifier or ')'")?);
            while self.at_op(Op::Comma) {
                self.advance();
                params.push(self.expect_ident("Expected identifier")?);
            }
        }
        self.expect_op(Op::RParen, "Expected ',' or ')'")?;

        let (body, expr_body) = if self.at_op(Op::Assign) {
            self.advance();
            (self.exp()?, true)
        } else if self.at_op(Op::LBrace) {
            (self.block()?, false)
        } else {
            return Err(self.error("Expected '{' or '='"));
        };

        let span = start.merge(body.span);
        let def = FnDef {
            name,
            params,
            body,
            expr_body,
        };
        Ok(Spanned::new(Expr::Fn(Rc::new(def)), span))
    }
}
