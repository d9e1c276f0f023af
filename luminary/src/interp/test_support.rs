//! Helpers for driving an interpreter with in-memory console streams

use super::Interpreter;
use crate::config::Config;
use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

/// Output sink whose contents stay readable after the interpreter owns it
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn interpreter_with_input(input: &str) -> (Interpreter, SharedOutput) {
    interpreter_with_config(Config::default(), input)
}

pub(crate) fn interpreter_with_config(config: Config, input: &str) -> (Interpreter, SharedOutput) {
    let output = SharedOutput::default();
    let interp = Interpreter::with_config(config)
        .with_io(Cursor::new(input.as_bytes().to_vec()), output.clone());
    (interp, output)
}
