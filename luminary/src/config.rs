//! Interpreter and REPL settings (`luminary.toml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for by [`Config::discover`]
pub const CONFIG_FILE: &str = "luminary.toml";

const DEFAULT_PROMPT: &str = "Luminary % ";
const DEFAULT_HISTORY_FILE: &str = ".luminary_history";
const DEFAULT_MAX_CALL_DEPTH: usize = 10_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Settings
///
/// Every field is optional in the file; missing ones keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// REPL prompt
    pub prompt: String,
    /// REPL history file, relative to the home directory unless absolute
    pub history_file: Option<PathBuf>,
    /// Maximum nesting of user function calls
    pub max_call_depth: usize,
    /// Reading an undefined variable is an error instead of `null`
    pub strict_variables: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT.to_string(),
            history_file: Some(PathBuf::from(DEFAULT_HISTORY_FILE)),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            strict_variables: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the REPL prompt
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set or disable the history file
    pub fn history_file(mut self, path: Option<PathBuf>) -> Self {
        self.history_file = path;
        self
    }

    /// Set the call depth limit
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Make undefined variables an error
    pub fn strict_variables(mut self, strict: bool) -> Self {
        self.strict_variables = strict;
        self
    }

    /// Parse settings from TOML text
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from an explicit file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Search for `luminary.toml` starting from `dir` and walking up
    ///
    /// Falls back to defaults when no file is found.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let mut current = dir.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILE);
            if candidate.is_file() {
                tracing::debug!(path = %candidate.display(), "loading config");
                return Self::load(&candidate);
            }
            if !current.pop() {
                return Ok(Self::default());
            }
        }
    }

    /// History file resolved against `home`
    pub fn history_path(&self, home: Option<&Path>) -> Option<PathBuf> {
        let file = self.history_file.as_ref()?;
        if file.is_absolute() {
            Some(file.clone())
        } else {
            home.map(|h| h.join(file))
        }
    }
}
