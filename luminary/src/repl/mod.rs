//! REPL (Read-Eval-Print Loop) for Luminary

use crate::config::Config;
use crate::error::report_error;
use crate::interp::{Interpreter, Value};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::path::PathBuf;

const SOURCE_NAME: &str = "<stdin>";

/// REPL state
pub struct Repl {
    editor: DefaultEditor,
    interpreter: Interpreter,
    prompt: String,
    history_path: Option<PathBuf>,
}

impl Repl {
    /// Create a REPL on the process console
    pub fn new(config: Config) -> RlResult<Self> {
        let interpreter = Interpreter::with_config(config.clone());
        Self::with_interpreter(config, interpreter)
    }

    /// Create a REPL around an existing interpreter
    pub fn with_interpreter(config: Config, interpreter: Interpreter) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = config.history_path(dirs_home().as_deref());

        let mut repl = Repl {
            editor,
            interpreter,
            prompt: config.prompt,
            history_path,
        };

        if let Some(ref path) = repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run until `:quit`, end of input or `exit()`
    ///
    /// Returns the process exit code.
    pub fn run(&mut self) -> RlResult<i32> {
        println!("Luminary {}", env!("CARGO_PKG_VERSION"));
        println!("Type :help for help, :quit to exit.\n");

        let mut code = 0;
        loop {
            match self.editor.readline(&self.prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    if let Some(exit) = self.eval_line(line) {
                        code = exit;
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("Error: {err}");
                    code = 1;
                    break;
                }
            }
        }

        if let Some(ref path) = self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(code)
    }

    /// Handle REPL commands (starting with :); `true` means quit
    fn handle_command(&mut self, cmd: &str) -> bool {
        match cmd {
            ":quit" | ":q" | ":exit" => true,
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            ":vars" => {
                let listing = self.vars_listing();
                self.emit(&listing);
                false
            }
            _ => {
                println!("Unknown command: {cmd}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn print_help(&self) {
        println!("Commands:");
        println!("  :help, :h, :?   Show this help");
        println!("  :quit, :q       Exit the REPL");
        println!("  :clear          Clear the screen");
        println!("  :vars           List global variables");
        println!();
        println!("Examples:");
        println!("  set x = 2 ^ 10");
        println!("  fun square(n) = n * n");
        println!("  for i = 1 : 3 {{ println(i, square(i)) }}");
        println!("  map([1, 2, 3], fun (n) = n * 2)");
    }

    /// User-defined globals, one `name = value` per line, sorted
    fn vars_listing(&self) -> String {
        let env = self.interpreter.global_env().borrow();
        let mut vars: Vec<_> = env
            .bindings()
            .iter()
            .filter(|(_, value)| !matches!(value, Value::Builtin(_)))
            .map(|(name, value)| format!("{name} = {value}\n"))
            .collect();
        vars.sort();
        vars.concat()
    }

    /// Evaluate one line, echoing a non-null result
    ///
    /// Returns the exit code if the line called `exit()`.
    fn eval_line(&mut self, line: &str) -> Option<i32> {
        match self.interpreter.run(line, SOURCE_NAME) {
            Ok(Value::Null) => None,
            Ok(value) => {
                self.emit(&format!("{value}\n"));
                None
            }
            Err(err) => {
                if let Some(code) = err.exit_code() {
                    return Some(code);
                }
                report_error(SOURCE_NAME, line, &err);
                None
            }
        }
    }

    fn emit(&mut self, text: &str) {
        if let Err(err) = self.interpreter.write_output(text) {
            eprintln!("{err}");
        }
    }
}

/// Get home directory
fn dirs_home() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::test_support::{interpreter_with_input, SharedOutput};

    fn repl() -> (Repl, SharedOutput) {
        let (interp, out) = interpreter_with_input("");
        let config = Config::default().history_file(None);
        (Repl::with_interpreter(config, interp).unwrap(), out)
    }

    #[test]
    fn test_prompt_from_config() {
        let (interp, _) = interpreter_with_input("");
        let config = Config::default().prompt("lum> ").history_file(None);
        let repl = Repl::with_interpreter(config, interp).unwrap();
        assert_eq!(repl.prompt, "lum> ");
        assert!(repl.history_path.is_none());
    }

    #[test]
    fn test_handle_command_quit() {
        let (mut repl, _) = repl();
        assert!(repl.handle_command(":quit"));
        assert!(repl.handle_command(":q"));
        assert!(repl.handle_command(":exit"));
    }

    #[test]
    fn test_handle_command_non_quit() {
        let (mut repl, _) = repl();
        assert!(!repl.handle_command(":help"));
        assert!(!repl.handle_command(":clear"));
        assert!(!repl.handle_command(":vars"));
        assert!(!repl.handle_command(":unknown"));
    }

    #[test]
    fn test_eval_line_echoes_non_null() {
        let (mut repl, out) = repl();
        assert_eq!(repl.eval_line("1 + 2"), None);
        assert_eq!(repl.eval_line("null"), None);
        assert_eq!(repl.eval_line("[1, \"a\"]"), None);
        assert_eq!(out.contents(), "3\n[1, a]\n");
    }

    #[test]
    fn test_definitions_persist_between_lines() {
        let (mut repl, out) = repl();
        repl.eval_line("fun double(n) = n * 2");
        repl.eval_line("set x = 21");
        repl.eval_line("double(x)");
        assert!(out.contents().ends_with("42\n"));
    }

    #[test]
    fn test_errors_do_not_stop_the_session() {
        let (mut repl, out) = repl();
        assert_eq!(repl.eval_line("1 / 0"), None);
        assert_eq!(repl.eval_line("@"), None);
        assert_eq!(repl.eval_line("5"), None);
        assert_eq!(out.contents(), "5\n");
    }

    #[test]
    fn test_exit_returns_code() {
        let (mut repl, _) = repl();
        assert_eq!(repl.eval_line("exit(7)"), Some(7));
    }

    #[test]
    fn test_vars_lists_user_globals() {
        let (mut repl, out) = repl();
        repl.eval_line("set b = 2");
        repl.eval_line("set a = \"x\"");
        let before = out.contents();
        repl.handle_command(":vars");
        let listing = out.contents()[before.len()..].to_string();
        assert!(listing.contains("a = x\n"));
        assert!(listing.contains("b = 2\n"));
        assert!(listing.contains("true = 1\n"));
        assert!(!listing.contains("println"));
    }
}
