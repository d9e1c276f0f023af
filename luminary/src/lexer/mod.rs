//! Lexer implementation using logos

mod token;

pub use token::{Keyword, Op, Token, TokenKind};

use crate::ast::{Position, Span};
use crate::error::{Result, ScriptError};
use logos::Logos;
use token::{LexErrorKind, RawToken};

/// Converts logos byte offsets into line/column positions
struct PositionTracker<'src> {
    source: &'src str,
    pos: Position,
}

impl<'src> PositionTracker<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            source,
            pos: Position::start(),
        }
    }

    /// Advance to `offset`, which must not be behind the current position
    fn seek(&mut self, offset: usize) -> Position {
        if offset > self.pos.index {
            for ch in self.source[self.pos.index..offset].chars() {
                self.pos.advance(ch);
            }
        }
        self.pos
    }

    fn span(&mut self, range: std::ops::Range<usize>) -> Span {
        let start = self.seek(range.start);
        let end = self.seek(range.end);
        Span::new(start, end)
    }
}

/// Tokenize source code
///
/// The returned stream always ends with [`Token::Eof`].
#[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);
    let mut tracker = PositionTracker::new(source);

    while let Some(result) = lexer.next() {
        let span = tracker.span(lexer.span());
        let token = match result {
            Ok(RawToken::Number(n)) => Token::Number(n),
            Ok(RawToken::Str(s)) => Token::Str(s),
            Ok(RawToken::Ident(name)) => match Keyword::from_ident(&name) {
                Some(kw) => Token::Keyword(kw),
                None => Token::Ident(name),
            },
            Ok(RawToken::Op(op)) => Token::Op(op),
            Ok(RawToken::Bang) => {
                return Err(ScriptError::invalid_syntax("Expected '=' after '!'", span));
            }
            Err(LexErrorKind::UnterminatedString) => {
                return Err(ScriptError::invalid_syntax("Expected '\"'", span));
            }
            Err(LexErrorKind::InvalidEscape) => {
                return Err(ScriptError::invalid_syntax(
                    "Expected 'n', 't', '\"' or '\\' after '\\'",
                    span,
                ));
            }
            Err(LexErrorKind::IllegalChar) => {
                return Err(ScriptError::illegal_char(
                    format!("'{}'", lexer.slice()),
                    span,
                ));
            }
        };
        tokens.push((token, span));
    }

    let end = tracker.seek(source.len());
    let eof_end = Position::new(end.index + 1, end.line, end.column + 1);
    tokens.push((Token::Eof, Span::new(end, eof_end)));

    tracing::debug!(count = tokens.len(), "tokenized");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_tokenize_empty() {
        let tokens = tokenize("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].0, Token::Eof);
    }

    #[test]
    fn test_tokenize_keywords() {
        assert_eq!(
            kinds("set fun elif by null"),
            vec![
                Token::Keyword(Keyword::Set),
                Token::Keyword(Keyword::Fun),
                Token::Keyword(Keyword::Elif),
                Token::Keyword(Keyword::By),
                Token::Keyword(Keyword::Null),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_truth_names_are_identifiers() {
        assert_eq!(
            kinds("true false"),
            vec![
                Token::Ident("true".into()),
                Token::Ident("false".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_tokenize_identifier_with_digits_and_underscore() {
        assert_eq!(kinds("a_1b"), vec![Token::Ident("a_1b".into()), Token::Eof]);
        assert_eq!(kinds("setx"), vec![Token::Ident("setx".into()), Token::Eof]);
    }

    #[test]
    fn test_tokenize_numbers() {
        let tokens = kinds("42 1.5 3.");
        assert!(matches!(tokens[0], Token::Number(n) if n == 42.0));
        assert!(matches!(tokens[1], Token::Number(n) if n == 1.5));
        assert!(matches!(tokens[2], Token::Number(n) if n == 3.0));
    }

    #[test]
    fn test_tokenize_negative_number_is_minus_then_number() {
        assert_eq!(
            kinds("-5"),
            vec![Token::Op(Op::Minus), Token::Number(5.0), Token::Eof]
        );
    }

    #[test]
    fn test_tokenize_string_with_escapes() {
        let tokens = kinds(r#""a\n\t\"\\b""#);
        assert_eq!(tokens[0], Token::Str("a\n\t\"\\b".to_string()));
    }

    #[test]
    fn test_tokenize_operators() {
        assert_eq!(
            kinds("+ - * / % ^ ( ) { } ? : , [ ] = == != > >= < <="),
            vec![
                Token::Op(Op::Plus),
                Token::Op(Op::Minus),
                Token::Op(Op::Star),
                Token::Op(Op::Slash),
                Token::Op(Op::Percent),
                Token::Op(Op::Caret),
                Token::Op(Op::LParen),
                Token::Op(Op::RParen),
                Token::Op(Op::LBrace),
                Token::Op(Op::RBrace),
                Token::Op(Op::Question),
                Token::Op(Op::Colon),
                Token::Op(Op::Comma),
                Token::Op(Op::LBracket),
                Token::Op(Op::RBracket),
                Token::Op(Op::Assign),
                Token::Op(Op::EqEq),
                Token::Op(Op::NotEq),
                Token::Op(Op::Gt),
                Token::Op(Op::Ge),
                Token::Op(Op::Lt),
                Token::Op(Op::Le),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_spans_track_lines() {
        let tokens = tokenize("set x = 1\n  x").unwrap();
        let (tok, span) = &tokens[4];
        assert_eq!(*tok, Token::Ident("x".into()));
        assert_eq!(span.start.line, 2);
        assert_eq!(span.start.column, 2);
        assert_eq!(span.start.index, 12);
        assert_eq!(span.end.index, 13);
    }

    #[test]
    fn test_tokenize_eof_span_is_one_past_end() {
        let tokens = tokenize("ab").unwrap();
        let (tok, span) = tokens.last().unwrap();
        assert_eq!(*tok, Token::Eof);
        assert_eq!(span.start.index, 2);
        assert_eq!(span.end.index, 3);
        assert_eq!(span.end.column, span.start.column + 1);
    }

    #[test]
    fn test_tokenize_illegal_char() {
        let err = tokenize("1 + @").unwrap_err();
        assert!(matches!(err, ScriptError::IllegalChar { .. }));
        assert_eq!(err.message(), "'@'");
        let span = err.span().unwrap();
        assert_eq!(span.start.index, 4);
        assert_eq!(span.end.index, 5);
    }

    #[test]
    fn test_tokenize_lone_bang() {
        let err = tokenize("!x").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidSyntax { .. }));
        assert_eq!(err.message(), "Expected '=' after '!'");
    }

    #[test]
    fn test_tokenize_unterminated_string_starts_at_quote() {
        let err = tokenize("x \"abc").unwrap_err();
        assert!(matches!(err, ScriptError::InvalidSyntax { .. }));
        assert_eq!(err.message(), "Expected '\"'");
        assert_eq!(err.span().unwrap().start.index, 2);
    }

    #[test]
    fn test_tokenize_invalid_escape_starts_at_quote() {
        let err = tokenize(r#"  "a\qb""#).unwrap_err();
        assert!(matches!(err, ScriptError::InvalidSyntax { .. }));
        assert_eq!(err.span().unwrap().start.index, 2);
    }

    #[test]
    fn test_tokenize_display_round_trip() {
        let source = r#"set greeting = "hi\n\"there\"" + 12.5 ^ x_1 >= 3"#;
        let tokens = tokenize(source).unwrap();
        for (tok, _) in tokens.iter().filter(|(t, _)| *t != Token::Eof) {
            let relexed = tokenize(&tok.to_string()).unwrap();
            assert_eq!(relexed.len(), 2, "{tok} should lex to one token");
            assert_eq!(&relexed[0].0, tok);
        }
    }
}
