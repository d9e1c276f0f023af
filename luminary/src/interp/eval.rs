//! Expression evaluator

use super::builtins;
use super::env::{child_env, EnvRef, Environment};
use super::error::{EvalResult, InterpResult, Interrupt, RuntimeError};
use super::value::{Comparison, Value};
use crate::ast::{BinOp, Expr, FnDef, Program, Spanned, UnOp};
use crate::config::Config;
use crate::error::ScriptError;
use crate::lexer::tokenize;
use crate::parser::parse;
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

/// Stack growth parameters for deeply nested evaluation
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// The interpreter
///
/// Owns the global environment, so definitions persist across calls to
/// [`Interpreter::run`]. One interpreter serves one thread.
pub struct Interpreter {
    /// Global environment
    global_env: EnvRef,
    config: Config,
    /// Current depth of user function calls
    call_depth: usize,
    /// Console used by `print`, `println` and `scan`
    output: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Interpreter {
    /// Create a new interpreter with default settings on stdin/stdout
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let mut globals = Environment::new();
        builtins::install(&mut globals);
        Interpreter {
            global_env: globals.into_ref(),
            config,
            call_depth: 0,
            output: Box::new(io::stdout()),
            input: Box::new(BufReader::new(io::stdin())),
        }
    }

    /// Replace the console streams
    pub fn with_io(mut self, input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        self.input = Box::new(input);
        self.output = Box::new(output);
        self
    }

    pub fn global_env(&self) -> &EnvRef {
        &self.global_env
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Look up a global binding
    pub fn global(&self, name: &str) -> Option<Value> {
        self.global_env.borrow().get(name)
    }

    /// Tokenize, parse and evaluate `source` in the global environment
    ///
    /// Returns the value of the last top-level statement. `name` only labels
    /// the tracing span for this run. Errors carry spans but not the source
    /// name, so callers pass the same name to [`crate::error::report_error`]
    /// when rendering them.
    #[tracing::instrument(level = "debug", skip(self, source), fields(len = source.len()))]
    pub fn run(&mut self, source: &str, name: &str) -> Result<Value, ScriptError> {
        let tokens = tokenize(source)?;
        let program = parse(tokens)?;
        self.run_program(&program)
    }

    /// Evaluate an already parsed program in the global environment
    pub fn run_program(&mut self, program: &Program) -> Result<Value, ScriptError> {
        self.call_depth = 0;
        let env = Rc::clone(&self.global_env);
        match self.eval(program, &env) {
            Ok(value) => Ok(value),
            Err(interrupt) => {
                let err = interrupt.into_error().at(program.span);
                tracing::debug!(error = %err, "program failed");
                Err(err.into())
            }
        }
    }

    /// Evaluate one node
    pub fn eval(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> EvalResult {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(expr, env))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> EvalResult {
        let span = expr.span;
        match &expr.node {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::string(s.as_str())),
            Expr::Null => Ok(Value::Null),

            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, env)?);
                }
                Ok(Value::list(values))
            }

            Expr::Var(name) => {
                let value = env.borrow().get(name);
                match value {
                    Some(value) => Ok(value),
                    None if self.config.strict_variables => {
                        Err(RuntimeError::undefined_variable(name).at(span).into())
                    }
                    None => Ok(Value::Null),
                }
            }

            Expr::Assign { name, value } => {
                let value = self.eval(value, env)?;
                env.borrow_mut().define(name.as_str(), value.clone());
                Ok(value)
            }

            Expr::Binary { left, op, right } => {
                // Right operand first
                let rhs = self.eval(right, env)?;
                let lhs = self.eval(left, env)?;
                Ok(eval_binary(*op, &lhs, &rhs).map_err(|e| e.at(span))?)
            }

            Expr::Unary { op, expr: operand } => {
                let value = self.eval(operand, env)?;
                match op {
                    UnOp::Neg => Ok(value.mul(&Value::Number(-1.0)).map_err(|e| e.at(span))?),
                    UnOp::Plus => Ok(value),
                    UnOp::Not => Ok(value.not()),
                }
            }

            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond, env)?.is_truthy() {
                    self.eval(then_branch, env)
                } else {
                    self.eval(else_branch, env)
                }
            }

            Expr::Index { target, index } => {
                let target = self.eval(target, env)?;
                let index = self.eval(index, env)?;
                Ok(target.index(&index).map_err(|e| e.at(span))?)
            }

            Expr::If { cases, else_branch } => {
                for case in cases {
                    if self.eval(&case.cond, env)?.is_truthy() {
                        return self.eval(&case.body, env);
                    }
                }
                match else_branch {
                    Some(body) => self.eval(body, env),
                    None => Ok(Value::Null),
                }
            }

            Expr::While { cond, body } => {
                while self.eval(cond, env)?.is_truthy() {
                    match self.eval(body, env) {
                        Ok(_) | Err(Interrupt::Continue(_)) => continue,
                        Err(Interrupt::Break(_)) => break,
                        Err(e) => return Err(e),
                    }
                }
                Ok(Value::Null)
            }

            Expr::For {
                var,
                from,
                to,
                by,
                body,
            } => {
                let from = self.eval_number(from, env)?;
                let to = self.eval_number(to, env)?;
                let step = match by {
                    Some(by) => self.eval_number(by, env)?,
                    None => 1.0,
                };
                if step == 0.0 {
                    return Err(RuntimeError::type_error("Step of a for loop can't be zero")
                        .at(span)
                        .into());
                }
                let result = self.eval_for(var, from, to, step, body, env);
                env.borrow_mut().remove(var);
                result
            }

            Expr::Fn(def) => {
                let function = Value::Function(Rc::clone(def));
                if let Some(name) = &def.name {
                    env.borrow_mut().define(name.as_str(), function.clone());
                }
                Ok(function)
            }

            Expr::Call { callee, args } => {
                let callee = self.eval(callee, env)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, env)?);
                }
                Ok(self.call_value(&callee, values, env).map_err(|e| e.at(span))?)
            }

            Expr::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value, env)?,
                    None => Value::Null,
                };
                Err(Interrupt::Return(value))
            }
            Expr::Break => Err(Interrupt::Break(span)),
            Expr::Continue => Err(Interrupt::Continue(span)),

            Expr::Block(stmts) => {
                let mut last = Value::Null;
                for stmt in stmts {
                    last = self.eval(stmt, env)?;
                }
                Ok(last)
            }
        }
    }

    /// Evaluate a `for` bound, which must be a number
    fn eval_number(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> Result<f64, Interrupt> {
        match self.eval(expr, env)? {
            Value::Number(n) => Ok(n),
            _ => Err(RuntimeError::expected_number().at(expr.span).into()),
        }
    }

    /// Counting loop: `var` takes each value from `from` toward `to`, inclusive
    fn eval_for(
        &mut self,
        var: &str,
        from: f64,
        to: f64,
        step: f64,
        body: &Spanned<Expr>,
        env: &EnvRef,
    ) -> EvalResult {
        let mut i = from;
        while (step > 0.0 && i <= to) || (step < 0.0 && i >= to) {
            env.borrow_mut().define(var, Value::Number(i));
            i += step;
            match self.eval(body, env) {
                Ok(_) | Err(Interrupt::Continue(_)) => continue,
                Err(Interrupt::Break(_)) => break,
                Err(e) => return Err(e),
            }
        }
        Ok(Value::Null)
    }

    /// Call a function or built-in with already evaluated arguments
    ///
    /// `env` is the caller's environment; a user function's scope is a
    /// child of it.
    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>, env: &EnvRef) -> InterpResult<Value> {
        match callee {
            Value::Function(def) => self.call_function(def, args, env),
            Value::Builtin(builtin) => {
                tracing::trace!(name = builtin.name, args = args.len(), "builtin call");
                (builtin.func)(self, args, env)
            }
            other => Err(RuntimeError::not_callable(other.type_name())),
        }
    }

    fn call_function(&mut self, def: &Rc<FnDef>, args: Vec<Value>, caller: &EnvRef) -> InterpResult<Value> {
        if args.len() != def.params.len() {
            return Err(RuntimeError::arity_mismatch(
                def.display_name(),
                def.params.len(),
                args.len(),
            ));
        }
        if self.call_depth >= self.config.max_call_depth {
            return Err(RuntimeError::stack_overflow(self.config.max_call_depth));
        }

        let scope = child_env(caller);
        {
            let mut scope = scope.borrow_mut();
            for (param, arg) in def.params.iter().zip(args) {
                scope.define(param.as_str(), arg);
            }
        }

        tracing::trace!(name = def.display_name(), depth = self.call_depth, "call");
        self.call_depth += 1;
        let result = self.eval(&def.body, &scope);
        self.call_depth -= 1;

        match result {
            Ok(value) if def.expr_body => Ok(value),
            Ok(_) => Ok(Value::Null),
            Err(Interrupt::Return(value)) => Ok(value),
            Err(interrupt) => Err(interrupt.into_error()),
        }
    }

    /// Write console output and flush it
    pub(crate) fn write_output(&mut self, text: &str) -> InterpResult<()> {
        self.output
            .write_all(text.as_bytes())
            .and_then(|()| self.output.flush())
            .map_err(|e| RuntimeError::io_error(&e.to_string()))
    }

    /// Read one console line without its line terminator; `None` at end of input
    pub(crate) fn read_line(&mut self) -> InterpResult<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| RuntimeError::io_error(&e.to_string()))?;
        if read == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn eval_binary(op: BinOp, lhs: &Value, rhs: &Value) -> InterpResult<Value> {
    match op {
        BinOp::Add => lhs.add(rhs),
        BinOp::Sub => lhs.sub(rhs),
        BinOp::Mul => lhs.mul(rhs),
        BinOp::Div => lhs.div(rhs),
        BinOp::Mod => lhs.rem(rhs),
        BinOp::Pow => lhs.pow(rhs),
        BinOp::Eq => Ok(Value::bool(lhs.equals(rhs))),
        BinOp::Ne => Ok(Value::bool(!lhs.equals(rhs))),
        BinOp::Lt => compare(lhs, rhs, Comparison::Lt),
        BinOp::Gt => compare(lhs, rhs, Comparison::Gt),
        BinOp::Le => compare(lhs, rhs, Comparison::Le),
        BinOp::Ge => compare(lhs, rhs, Comparison::Ge),
        BinOp::And => Ok(lhs.and(rhs)),
        BinOp::Or => Ok(lhs.or(rhs)),
    }
}

fn compare(lhs: &Value, rhs: &Value, cmp: Comparison) -> InterpResult<Value> {
    lhs.compare(rhs, cmp).map(Value::bool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::test_support::{interpreter_with_config, interpreter_with_input};
    use crate::interp::ErrorKind;

    fn eval(source: &str) -> Value {
        let (mut interp, _) = interpreter_with_input("");
        interp.run(source, "<test>").unwrap()
    }

    fn eval_err(source: &str) -> RuntimeError {
        let (mut interp, _) = interpreter_with_input("");
        match interp.run(source, "<test>") {
            Err(ScriptError::Runtime(err)) => err,
            other => panic!("expected runtime error, got {other:?}"),
        }
    }

    fn output_of(source: &str) -> String {
        let (mut interp, out) = interpreter_with_input("");
        interp.run(source, "<test>").unwrap();
        out.contents()
    }

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_eval_literals() {
        assert_eq!(eval("42"), num(42.0));
        assert_eq!(eval("\"hi\""), Value::string("hi"));
        assert_eq!(eval("null"), Value::Null);
        assert_eq!(eval("[1, \"a\"]"), Value::list(vec![num(1.0), Value::string("a")]));
    }

    #[test]
    fn test_eval_arithmetic() {
        assert_eq!(eval("2 + 3 * 4"), num(14.0));
        assert_eq!(eval("(2 + 3) * 4"), num(20.0));
        assert_eq!(eval("2 ^ 3 ^ 2"), num(512.0));
        assert_eq!(eval("-2 ^ 2"), num(-4.0));
        assert_eq!(eval("7 % 4"), num(3.0));
        assert_eq!(eval("10 - 4 - 3"), num(3.0));
    }

    #[test]
    fn test_eval_comparison_and_logic() {
        assert_eq!(eval("1 < 2"), num(1.0));
        assert_eq!(eval("\"b\" >= \"a\""), num(1.0));
        assert_eq!(eval("[1, 2] == [1, 2]"), num(1.0));
        assert_eq!(eval("1 == \"1\""), num(0.0));
        assert_eq!(eval("2 and 3"), num(3.0));
        assert_eq!(eval("0 or \"x\""), Value::string("x"));
        assert_eq!(eval("not 0"), num(1.0));
    }

    #[test]
    fn test_eval_strings() {
        assert_eq!(eval("\"ab\" + 1"), Value::string("ab1"));
        assert_eq!(eval("\"ab\" * 2"), Value::string("abab"));
        assert_eq!(eval("\"héllo\"[1]"), Value::string("é"));
    }

    #[test]
    fn test_eval_ternary_and_if() {
        assert_eq!(eval("1 ? \"yes\" : \"no\""), Value::string("yes"));
        assert_eq!(eval("if 0 { 1 } elif 1 { 2 } else { 3 }"), num(2.0));
        assert_eq!(eval("if 0 { 1 }"), Value::Null);
    }

    #[test]
    fn test_assignment_yields_value() {
        assert_eq!(eval("set x = set y = 4 x + y"), num(8.0));
    }

    #[test]
    fn test_while_loop() {
        let source = "set i = 0 set total = 0 while i < 5 { set i = i + 1 set total = total + i } total";
        assert_eq!(eval(source), num(15.0));
    }

    #[test]
    fn test_while_break_and_continue() {
        let source = r#"
set i = 0
set seen = []
while 1 {
    set i = i + 1
    if i == 2 { continue }
    if i > 4 { break }
    set seen = append(seen, i)
}
seen
"#;
        assert_eq!(eval(source), Value::list(vec![num(1.0), num(3.0), num(4.0)]));
    }

    #[test]
    fn test_for_loop_inclusive_and_cleanup() {
        let source = "set out = [] for i = 1 : 3 { set out = append(out, i) } append([out], i)";
        assert_eq!(
            eval(source),
            Value::list(vec![
                Value::list(vec![num(1.0), num(2.0), num(3.0)]),
                Value::Null
            ])
        );
    }

    #[test]
    fn test_for_loop_negative_step() {
        let source = "set out = [] for i = 5 : 1 by -2 { set out = append(out, i) } out";
        assert_eq!(eval(source), Value::list(vec![num(5.0), num(3.0), num(1.0)]));
    }

    #[test]
    fn test_for_loop_break_removes_variable() {
        let source = "for i = 0 : 10 { if i == 3 { break } } i";
        assert_eq!(eval(source), Value::Null);
    }

    #[test]
    fn test_for_loop_errors() {
        assert_eq!(eval_err("for i = 0 : 3 by 0 { }").kind, ErrorKind::TypeError);
        assert_eq!(eval_err("for i = \"a\" : 3 { }").message, "Expected a number");
    }

    #[test]
    fn test_recursive_function() {
        let source = r#"
fun fib(n) {
    if n < 2 { return n }
    return fib(n - 1) + fib(n - 2)
}
fib(15)
"#;
        assert_eq!(eval(source), num(610.0));
    }

    #[test]
    fn test_expression_bodied_function() {
        assert_eq!(eval("fun sq(x) = x * x sq(7)"), num(49.0));
        assert_eq!(eval("(fun (a, b) = a - b)(5, 3)"), num(2.0));
    }

    #[test]
    fn test_block_function_without_return_yields_null() {
        assert_eq!(eval("fun f() { 42 } f()"), Value::Null);
        assert_eq!(eval("fun f() { return } f()"), Value::Null);
    }

    #[test]
    fn test_function_display() {
        assert_eq!(eval("fun add(a, b) = a + b str(add)"), Value::string("add(a, b)"));
        assert_eq!(eval("str(fun () = 1)"), Value::string("anonymous()"));
    }

    #[test]
    fn test_scoping_follows_the_caller() {
        let source = r#"
set x = 1
fun show() = x
fun shadow() {
    set x = 2
    return show()
}
set result = [shadow(), show(), x]
result
"#;
        assert_eq!(eval(source), Value::list(vec![num(2.0), num(1.0), num(1.0)]));
    }

    #[test]
    fn test_returned_function_does_not_capture() {
        let source = r#"
fun make() {
    set hidden = 5
    return fun () = hidden
}
set f = make()
f()
"#;
        assert_eq!(eval(source), Value::Null);
    }

    #[test]
    fn test_map_and_reduce_with_user_functions() {
        assert_eq!(
            eval("map([1, 2, 3], fun (x) = x * 10)"),
            Value::list(vec![num(10.0), num(20.0), num(30.0)])
        );
        assert_eq!(eval("reduce([1, 2, 3], fun (acc, x) = acc + x, 0)"), num(6.0));
    }

    #[test]
    fn test_arity_mismatch() {
        let err = eval_err("fun f(a) = a f(1, 2)");
        assert_eq!(err.kind, ErrorKind::ArityMismatch);
        assert!(err.message.contains('f'));
    }

    #[test]
    fn test_not_callable() {
        let err = eval_err("set x = 3 x()");
        assert_eq!(err.kind, ErrorKind::NotCallable);
        assert_eq!(err.message, "Can't call a number value");
    }

    #[test]
    fn test_runtime_error_has_span() {
        let err = eval_err("set a = 1\nset b = a / 0");
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        let span = err.span.unwrap();
        assert_eq!(span.start.line, 2);
        assert_eq!(span.start.column, 8);
    }

    #[test]
    fn test_right_operand_evaluated_first() {
        let source = "fun l() = print(\"l\") fun r() = print(\"r\") l() + r()";
        let (mut interp, out) = interpreter_with_input("");
        let err = interp.run(source, "<test>").unwrap_err();
        assert!(matches!(err, ScriptError::Runtime(_)));
        assert_eq!(out.contents(), "rl");
    }

    #[test]
    fn test_undefined_variable_is_null() {
        assert_eq!(eval("missing"), Value::Null);
    }

    #[test]
    fn test_strict_variables() {
        let (mut interp, _) =
            interpreter_with_config(Config::default().strict_variables(true), "");
        let err = interp.run("missing + 1", "<test>").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Runtime(RuntimeError { kind: ErrorKind::UndefinedVariable, .. })
        ));
    }

    #[test]
    fn test_call_depth_limit() {
        let (mut interp, _) = interpreter_with_config(Config::default().max_call_depth(50), "");
        let err = interp.run("fun down(n) = down(n + 1) down(0)", "<test>").unwrap_err();
        assert!(matches!(
            err,
            ScriptError::Runtime(RuntimeError { kind: ErrorKind::StackOverflow, .. })
        ));
        // The interpreter is usable again afterwards
        assert_eq!(interp.run("fun one() = 1 one()", "<test>").unwrap(), num(1.0));
    }

    #[test]
    fn test_deep_recursion_within_limit() {
        let source = "fun count(n) = n == 0 ? 0 : 1 + count(n - 1) count(3000)";
        assert_eq!(eval(source), num(3000.0));
    }

    #[test]
    fn test_long_prefix_and_operator_chains() {
        assert_eq!(eval(&format!("{}1", "-".repeat(3001))), num(-1.0));
        assert_eq!(eval(&format!("{}1", "not ".repeat(20_000))), num(1.0));
        assert_eq!(eval(&vec!["1"; 50_000].join(" + ")), num(50_000.0));
    }

    #[test]
    fn test_stray_control_flow() {
        assert_eq!(eval_err("break").message, "'break' outside of a loop");
        assert_eq!(eval_err("continue").kind, ErrorKind::InvalidControlFlow);
        assert_eq!(eval_err("return 1").message, "'return' outside of a function");
        assert_eq!(
            eval_err("fun f() { break } while 1 { f() }").kind,
            ErrorKind::InvalidControlFlow
        );
    }

    #[test]
    fn test_return_inside_loop_leaves_function() {
        let source = "fun first() { while 1 { for i = 0 : 9 { return i + 100 } } } first()";
        assert_eq!(eval(source), num(100.0));
    }

    #[test]
    fn test_globals_persist_between_runs() {
        let (mut interp, _) = interpreter_with_input("");
        interp.run("set counter = 10", "<repl>").unwrap();
        interp.run("set counter = counter + 1", "<repl>").unwrap();
        assert_eq!(interp.global("counter"), Some(num(11.0)));
    }

    #[test]
    fn test_print_output() {
        assert_eq!(output_of("println(\"a\", 1, [2])"), "a 1 [2]\n");
        assert_eq!(output_of("print(1, 2) print(\"!\")"), "1 2!");
    }

    #[test]
    fn test_scan_from_input() {
        let (mut interp, out) = interpreter_with_input("World\n");
        let greeting = interp.run("\"Hello, \" + scan(\"name: \")", "<test>").unwrap();
        assert_eq!(greeting, Value::string("Hello, World"));
        assert_eq!(out.contents(), "name: ");
    }

    #[test]
    fn test_exit_surfaces_code() {
        let (mut interp, out) = interpreter_with_input("");
        let err = interp.run("println(1) exit(2) println(3)", "<test>").unwrap_err();
        assert_eq!(err.exit_code(), Some(2));
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn test_empty_program() {
        assert_eq!(eval(""), Value::Null);
        assert_eq!(eval("   \n\t"), Value::Null);
    }
}
