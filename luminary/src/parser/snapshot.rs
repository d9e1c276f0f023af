//! Parser snapshots for speculative parsing.
//!
//! The grammar is ambiguous at one token of lookahead in two places: a
//! trailing statement in a sequence, and the optional value after `return`.
//! Both are parsed by taking a snapshot, attempting the parse, and rolling
//! back if it fails.

use super::Parser;
use crate::error::Result;

/// Saved cursor position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserSnapshot {
    pub(super) cursor_pos: usize,
}

impl Parser {
    pub(super) fn snapshot(&self) -> ParserSnapshot {
        ParserSnapshot {
            cursor_pos: self.pos,
        }
    }

    pub(super) fn restore(&mut self, snapshot: ParserSnapshot) {
        self.pos = snapshot.cursor_pos;
    }

    /// Run `f`, rolling the cursor back if it fails
    pub(super) fn try_parse<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Option<T> {
        let snapshot = self.snapshot();
        match f(self) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::trace!(at = snapshot.cursor_pos, error = %err, "speculative parse rolled back");
                self.restore(snapshot);
                None
            }
        }
    }
}
