//! Luminary CLI

use clap::{Parser, Subcommand};
use luminary::config::Config;
use luminary::error::report_error;
use luminary::interp::Interpreter;
use luminary::repl::Repl;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "luminary", version, about = "Luminary scripting language")]
struct Cli {
    /// Settings file (defaults to the nearest luminary.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script
    Run {
        /// Source file to run
        file: PathBuf,
    },
    /// Start the interactive prompt (default)
    Repl,
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Parse and dump the syntax tree as JSON (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    luminary::init_tracing();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Repl) {
        Command::Run { file } => run_file(&file, config),
        Command::Repl => run_repl(config),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Parse { file } => parse_file(&file),
    };

    match result {
        Ok(code) => exit_code(code),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<Config, luminary::config::ConfigError> {
    match explicit {
        Some(path) => Config::load(path),
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            Config::discover(&cwd)
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

type CliResult = Result<i32, Box<dyn std::error::Error>>;

fn run_file(path: &Path, config: Config) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let mut interpreter = Interpreter::with_config(config);
    match interpreter.run(&source, &filename) {
        Ok(_) => Ok(0),
        Err(err) => {
            if let Some(code) = err.exit_code() {
                return Ok(code);
            }
            report_error(&filename, &source, &err);
            Ok(1)
        }
    }
}

fn run_repl(config: Config) -> CliResult {
    let mut repl = Repl::new(config)?;
    Ok(repl.run()?)
}

fn tokenize_file(path: &Path) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let tokens = match luminary::lexer::tokenize(&source) {
        Ok(tokens) => tokens,
        Err(err) => {
            report_error(&filename, &source, &err);
            return Ok(1);
        }
    };
    for (tok, span) in &tokens {
        println!("{:<10} {:<12} @ {}", format!("{:?}", tok.kind()), tok.to_string(), span);
    }
    Ok(0)
}

fn parse_file(path: &Path) -> CliResult {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let parsed = luminary::lexer::tokenize(&source).and_then(luminary::parser::parse);
    match parsed {
        Ok(ast) => {
            println!("{}", serde_json::to_string_pretty(&ast)?);
            Ok(0)
        }
        Err(err) => {
            report_error(&filename, &source, &err);
            Ok(1)
        }
    }
}
