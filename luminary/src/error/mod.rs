//! Error types and reporting

use crate::ast::Span;
use crate::interp::RuntimeError;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Any error produced while running a piece of source text
#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    #[error("Illegal Character at {span}: {message}")]
    IllegalChar { message: String, span: Span },

    #[error("Invalid Syntax at {span}: {message}")]
    InvalidSyntax { message: String, span: Span },

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ScriptError {
    pub fn illegal_char(message: impl Into<String>, span: Span) -> Self {
        Self::IllegalChar {
            message: message.into(),
            span,
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, span: Span) -> Self {
        Self::InvalidSyntax {
            message: message.into(),
            span,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::IllegalChar { span, .. } => Some(*span),
            Self::InvalidSyntax { span, .. } => Some(*span),
            Self::Runtime(err) => err.span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::IllegalChar { message, .. } => message,
            Self::InvalidSyntax { message, .. } => message,
            Self::Runtime(err) => &err.message,
        }
    }

    /// Heading used in rendered reports
    pub fn title(&self) -> &'static str {
        match self {
            Self::IllegalChar { .. } => "Illegal Character",
            Self::InvalidSyntax { .. } => "Invalid Syntax",
            Self::Runtime(_) => "Runtime Error",
        }
    }

    /// Exit code requested through the `exit` built-in
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Runtime(RuntimeError {
                kind: crate::interp::ErrorKind::Exit(code),
                ..
            }) => Some(*code),
            _ => None,
        }
    }
}

/// Render an error with ariadne into `out`
pub fn write_report<W: std::io::Write>(
    filename: &str,
    source: &str,
    error: &ScriptError,
    color: bool,
    out: W,
) -> std::io::Result<()> {
    use ariadne::{Color, Config, Label, Report, ReportKind, Source};

    // The EOF token ends one past the source
    let len = source.len();
    let range = match error.span() {
        Some(span) => span.start.index.min(len)..span.end.index.min(len),
        None => 0..0,
    };

    let mut report = Report::build(ReportKind::Error, (filename, range.clone()))
        .with_config(Config::default().with_color(color))
        .with_message(error.title());

    if error.span().is_some() {
        report = report.with_label(
            Label::new((filename, range))
                .with_message(error.message())
                .with_color(Color::Red),
        );
    } else {
        report = report.with_note(error.message());
    }

    report.finish().write((filename, Source::from(source)), out)
}

/// Report error with ariadne on stderr
pub fn report_error(filename: &str, source: &str, error: &ScriptError) {
    if write_report(filename, source, error, true, std::io::stderr()).is_err() {
        eprintln!("{error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Position;

    fn span(start: usize, end: usize) -> Span {
        Span::new(Position::new(start, 1, start), Position::new(end, 1, end))
    }

    #[test]
    fn test_error_display() {
        let err = ScriptError::illegal_char("'@'", span(2, 3));
        assert_eq!(err.to_string(), "Illegal Character at 1:3: '@'");
    }

    #[test]
    fn test_span_and_message() {
        let err = ScriptError::invalid_syntax("Expected ')'", span(0, 1));
        assert_eq!(err.span(), Some(span(0, 1)));
        assert_eq!(err.message(), "Expected ')'");
        assert_eq!(err.title(), "Invalid Syntax");
    }

    #[test]
    fn test_runtime_error_passthrough() {
        let err: ScriptError = RuntimeError::division_by_zero().into();
        assert_eq!(err.message(), "Can't divide by zero");
        assert_eq!(err.span(), None);
        assert_eq!(err.exit_code(), None);
    }

    #[test]
    fn test_exit_code() {
        let err: ScriptError = RuntimeError::exit(4).into();
        assert_eq!(err.exit_code(), Some(4));
    }

    #[test]
    fn test_write_report_contains_message() {
        let source = "1 + @";
        let err = ScriptError::illegal_char("'@'", span(4, 5));
        let mut out = Vec::new();
        write_report("test.lum", source, &err, false, &mut out).unwrap();
        let rendered = String::from_utf8(out).unwrap();
        assert!(rendered.contains("Illegal Character"));
        assert!(rendered.contains("'@'"));
        assert!(rendered.contains("test.lum"));
    }

    #[test]
    fn test_write_report_clamps_eof_span() {
        let source = "(1";
        let err = ScriptError::invalid_syntax("Expected ')'", span(2, 3));
        let mut out = Vec::new();
        assert!(write_report("test.lum", source, &err, false, &mut out).is_ok());
    }
}
