//! Built-in functions and the global names installed at startup

use super::env::{child_env, EnvRef, Environment};
use super::error::{ErrorKind, InterpResult, RuntimeError};
use super::eval::Interpreter;
use super::value::Value;
use std::fmt;

/// Native implementation of a built-in
///
/// Receives the evaluated arguments and the caller's environment.
pub type BuiltinFn = fn(&mut Interpreter, Vec<Value>, &EnvRef) -> InterpResult<Value>;

/// Entry of the built-in catalogue
pub struct Builtin {
    pub name: &'static str,
    /// Parameter names, shown when the function is printed
    pub params: &'static [&'static str],
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

macro_rules! builtin {
    ($name:literal, [$($param:literal),*], $func:path) => {
        Builtin {
            name: $name,
            params: &[$($param),*],
            func: $func,
        }
    };
}

/// Every built-in, in installation order
pub static BUILTINS: [Builtin; 17] = [
    builtin!("print", ["...values"], builtin_print),
    builtin!("println", ["...values"], builtin_println),
    builtin!("scan", ["prompt"], builtin_scan),
    builtin!("len", ["value"], builtin_len),
    builtin!("append", ["list", "...el"], builtin_append),
    builtin!("prepend", ["list", "...el"], builtin_prepend),
    builtin!("pop", ["list"], builtin_pop),
    builtin!("shift", ["list"], builtin_shift),
    builtin!("str", ["value"], builtin_str),
    builtin!("num", ["value"], builtin_num),
    builtin!("trim", ["str"], builtin_trim),
    builtin!("upper", ["str"], builtin_upper),
    builtin!("lower", ["str"], builtin_lower),
    builtin!("replace", ["str", "old", "new"], builtin_replace),
    builtin!("map", ["list", "fun"], builtin_map),
    builtin!("reduce", ["list", "fun", "initial"], builtin_reduce),
    builtin!("exit", ["code"], builtin_exit),
];

/// Install `true`, `false` and the built-ins into a root environment
pub(crate) fn install(env: &mut Environment) {
    env.define("true", Value::Number(1.0));
    env.define("false", Value::Number(0.0));
    for builtin in &BUILTINS {
        env.define(builtin.name, Value::Builtin(builtin));
    }
}

fn expect_args(name: &str, args: &[Value], count: usize) -> InterpResult<()> {
    if args.len() != count {
        return Err(RuntimeError::arity_mismatch(name, count, args.len()));
    }
    Ok(())
}

fn expect_string<'a>(name: &str, value: &'a Value) -> InterpResult<&'a str> {
    value.as_str().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "{name}() expects a string, got a {}",
            value.type_name()
        ))
    })
}

fn expect_list<'a>(name: &str, value: &'a Value) -> InterpResult<&'a [Value]> {
    value.as_list().ok_or_else(|| {
        RuntimeError::type_error(format!(
            "{name}() expects a list, got a {}",
            value.type_name()
        ))
    })
}

/// Operands are separated by a space unless one side is a string
fn print_text(args: &[Value]) -> String {
    let mut text = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 && !matches!(args[i - 1], Value::Str(_)) && !matches!(arg, Value::Str(_)) {
            text.push(' ');
        }
        text.push_str(&arg.to_string());
    }
    text
}

fn builtin_print(interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    interp.write_output(&print_text(&args))?;
    Ok(Value::Null)
}

fn builtin_println(interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    let mut line = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    line.push('\n');
    interp.write_output(&line)?;
    Ok(Value::Null)
}

/// scan(prompt = "> ") -> string
fn builtin_scan(interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    let prompt = match args.as_slice() {
        [] => "> ",
        [prompt] => expect_string("scan", prompt)?,
        _ => return Err(RuntimeError::arity_mismatch("scan", 1, args.len())),
    };
    interp.write_output(prompt)?;
    let line = interp
        .read_line()?
        .ok_or_else(|| RuntimeError::io_error("end of input"))?;
    Ok(Value::string(line))
}

fn builtin_len(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    expect_args("len", &args, 1)?;
    match &args[0] {
        Value::List(items) => Ok(Value::Number(items.len() as f64)),
        Value::Str(s) => Ok(Value::Number(s.chars().count() as f64)),
        other => Err(RuntimeError::type_error(format!(
            "len() only works for strings or lists, got a {}",
            other.type_name()
        ))),
    }
}

/// Split `(list, ...el)` for append/prepend
fn list_and_rest<'a>(name: &str, args: &'a [Value]) -> InterpResult<(&'a [Value], &'a [Value])> {
    let Some((list, rest)) = args.split_first().filter(|(_, rest)| !rest.is_empty()) else {
        return Err(RuntimeError::new(
            ErrorKind::ArityMismatch,
            format!("Expected at least 2 arguments for {name}, got {}", args.len()),
        ));
    };
    Ok((expect_list(name, list)?, rest))
}

fn builtin_append(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    let (list, rest) = list_and_rest("append", &args)?;
    let mut items = Vec::with_capacity(list.len() + rest.len());
    items.extend_from_slice(list);
    items.extend_from_slice(rest);
    Ok(Value::list(items))
}

fn builtin_prepend(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    let (list, rest) = list_and_rest("prepend", &args)?;
    let mut items = Vec::with_capacity(list.len() + rest.len());
    items.extend_from_slice(rest);
    items.extend_from_slice(list);
    Ok(Value::list(items))
}

fn non_empty_list<'a>(name: &str, args: &'a [Value]) -> InterpResult<&'a [Value]> {
    expect_args(name, args, 1)?;
    let list = expect_list(name, &args[0])?;
    if list.is_empty() {
        return Err(RuntimeError::new(
            ErrorKind::IndexOutOfBounds,
            format!("{name}() on an empty list"),
        ));
    }
    Ok(list)
}

/// pop(list) -> list without its last element
fn builtin_pop(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    let list = non_empty_list("pop", &args)?;
    Ok(Value::list(list[..list.len() - 1].to_vec()))
}

/// shift(list) -> list without its first element
fn builtin_shift(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    let list = non_empty_list("shift", &args)?;
    Ok(Value::list(list[1..].to_vec()))
}

fn builtin_str(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    expect_args("str", &args, 1)?;
    match &args[0] {
        Value::Str(_) => Ok(args[0].clone()),
        other => Ok(Value::string(other.to_string())),
    }
}

fn builtin_num(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    expect_args("num", &args, 1)?;
    match &args[0] {
        Value::Number(_) => Ok(args[0].clone()),
        Value::Str(s) => s.parse::<f64>().map(Value::Number).map_err(|_| {
            RuntimeError::type_error(format!("Can't convert \"{s}\" into a number"))
        }),
        other => Err(RuntimeError::type_error(format!(
            "num() only converts strings, got a {}",
            other.type_name()
        ))),
    }
}

fn map_string(
    name: &str,
    args: &[Value],
    f: impl FnOnce(&str) -> String,
) -> InterpResult<Value> {
    expect_args(name, args, 1)?;
    Ok(Value::string(f(expect_string(name, &args[0])?)))
}

fn builtin_trim(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    map_string("trim", &args, |s| s.trim().to_string())
}

fn builtin_upper(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    map_string("upper", &args, str::to_uppercase)
}

fn builtin_lower(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    map_string("lower", &args, str::to_lowercase)
}

/// replace(str, old, new): every occurrence
fn builtin_replace(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    expect_args("replace", &args, 3)?;
    let s = expect_string("replace", &args[0])?;
    let old = expect_string("replace", &args[1])?;
    let new = expect_string("replace", &args[2])?;
    if old.is_empty() {
        return Ok(args[0].clone());
    }
    Ok(Value::string(s.replace(old, new)))
}

fn expect_callable(name: &str, value: &Value) -> InterpResult<()> {
    if !value.is_callable() {
        return Err(RuntimeError::type_error(format!(
            "{name}() expects a function, got a {}",
            value.type_name()
        )));
    }
    Ok(())
}

/// map(list, fun) -> new list of fun(el)
fn builtin_map(interp: &mut Interpreter, args: Vec<Value>, env: &EnvRef) -> InterpResult<Value> {
    expect_args("map", &args, 2)?;
    let list = expect_list("map", &args[0])?;
    expect_callable("map", &args[1])?;
    let scope = child_env(env);
    let mut mapped = Vec::with_capacity(list.len());
    for item in list {
        mapped.push(interp.call_value(&args[1], vec![item.clone()], &scope)?);
    }
    Ok(Value::list(mapped))
}

/// reduce(list, fun, initial) -> fun(...fun(fun(initial, l0), l1)..., ln)
fn builtin_reduce(interp: &mut Interpreter, args: Vec<Value>, env: &EnvRef) -> InterpResult<Value> {
    expect_args("reduce", &args, 3)?;
    let list = expect_list("reduce", &args[0])?;
    expect_callable("reduce", &args[1])?;
    let scope = child_env(env);
    let mut acc = args[2].clone();
    for item in list {
        acc = interp.call_value(&args[1], vec![acc, item.clone()], &scope)?;
    }
    Ok(acc)
}

/// exit(code = 0)
fn builtin_exit(_interp: &mut Interpreter, args: Vec<Value>, _env: &EnvRef) -> InterpResult<Value> {
    let code = match args.first() {
        Some(Value::Number(n)) => *n as i32,
        _ => 0,
    };
    Err(RuntimeError::exit(code))
}
