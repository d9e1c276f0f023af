//! Token definitions

use logos::Logos;
use serde::{Deserialize, Serialize};

/// Luminary token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    Number(f64),
    /// String literal with escapes resolved
    Str(String),
    Ident(String),
    Keyword(Keyword),
    Op(Op),
    Eof,
}

/// Token category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    Identifier,
    Keyword,
    Operator,
    Eof,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Number(_) => TokenKind::Number,
            Token::Str(_) => TokenKind::String,
            Token::Ident(_) => TokenKind::Identifier,
            Token::Keyword(_) => TokenKind::Keyword,
            Token::Op(_) => TokenKind::Operator,
            Token::Eof => TokenKind::Eof,
        }
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(self, Token::Keyword(k) if *k == kw)
    }

    pub fn is_op(&self, op: Op) -> bool {
        matches!(self, Token::Op(o) if *o == op)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Str(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Token::Ident(s) => write!(f, "{s}"),
            Token::Keyword(k) => write!(f, "{k}"),
            Token::Op(op) => write!(f, "{op}"),
            Token::Eof => write!(f, "<eof>"),
        }
    }
}

/// Reserved words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Keyword {
    Set,
    And,
    Or,
    Not,
    If,
    Else,
    Elif,
    While,
    For,
    By,
    Fun,
    Return,
    Continue,
    Break,
    Null,
}

impl Keyword {
    pub fn from_ident(ident: &str) -> Option<Keyword> {
        let kw = match ident {
            "set" => Keyword::Set,
            "and" => Keyword::And,
            "or" => Keyword::Or,
            "not" => Keyword::Not,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "elif" => Keyword::Elif,
            "while" => Keyword::While,
            "for" => Keyword::For,
            "by" => Keyword::By,
            "fun" => Keyword::Fun,
            "return" => Keyword::Return,
            "continue" => Keyword::Continue,
            "break" => Keyword::Break,
            "null" => Keyword::Null,
            _ => return None,
        };
        Some(kw)
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Keyword::Set => "set",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::Elif => "elif",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::By => "by",
            Keyword::Fun => "fun",
            Keyword::Return => "return",
            Keyword::Continue => "continue",
            Keyword::Break => "break",
            Keyword::Null => "null",
        };
        write!(f, "{s}")
    }
}

/// Operators and punctuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Question,
    Colon,
    Comma,
    Assign,
    EqEq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Op::Plus => "+",
            Op::Minus => "-",
            Op::Star => "*",
            Op::Slash => "/",
            Op::Percent => "%",
            Op::Caret => "^",
            Op::LParen => "(",
            Op::RParen => ")",
            Op::LBrace => "{",
            Op::RBrace => "}",
            Op::LBracket => "[",
            Op::RBracket => "]",
            Op::Question => "?",
            Op::Colon => ":",
            Op::Comma => ",",
            Op::Assign => "=",
            Op::EqEq => "==",
            Op::NotEq => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
        };
        write!(f, "{s}")
    }
}

/// Why logos rejected a slice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) enum LexErrorKind {
    #[default]
    IllegalChar,
    UnterminatedString,
    InvalidEscape,
}

/// Raw logos token, converted into [`Token`] by the lexer
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(error = LexErrorKind)]
pub(super) enum RawToken {
    #[regex(r"[0-9]+(\.[0-9]*)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[token("\"", lex_string)]
    Str(String),

    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("+", |_| Op::Plus)]
    #[token("-", |_| Op::Minus)]
    #[token("*", |_| Op::Star)]
    #[token("/", |_| Op::Slash)]
    #[token("%", |_| Op::Percent)]
    #[token("^", |_| Op::Caret)]
    #[token("(", |_| Op::LParen)]
    #[token(")", |_| Op::RParen)]
    #[token("{", |_| Op::LBrace)]
    #[token("}", |_| Op::RBrace)]
    #[token("[", |_| Op::LBracket)]
    #[token("]", |_| Op::RBracket)]
    #[token("?", |_| Op::Question)]
    #[token(":", |_| Op::Colon)]
    #[token(",", |_| Op::Comma)]
    #[token("=", |_| Op::Assign)]
    #[token("==", |_| Op::EqEq)]
    #[token("!=", |_| Op::NotEq)]
    #[token(">", |_| Op::Gt)]
    #[token(">=", |_| Op::Ge)]
    #[token("<", |_| Op::Lt)]
    #[token("<=", |_| Op::Le)]
    Op(Op),

    /// A `!` that is not part of `!=`
    #[token("!")]
    Bang,
}

/// Scan the rest of a string literal after its opening quote
fn lex_string(lex: &mut logos::Lexer<RawToken>) -> Result<String, LexErrorKind> {
    let mut value = String::new();
    let mut chars = lex.remainder().char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                lex.bump(i + 1);
                return Ok(value);
            }
            '\\' => match chars.next() {
                Some((j, esc)) => {
                    let resolved = match esc {
                        'n' => '\n',
                        't' => '\t',
                        '"' => '"',
                        '\\' => '\\',
                        _ => {
                            lex.bump(j + esc.len_utf8());
                            return Err(LexErrorKind::InvalidEscape);
                        }
                    };
                    value.push(resolved);
                }
                None => break,
            },
            c => value.push(c),
        }
    }

    lex.bump(lex.remainder().len());
    Err(LexErrorKind::UnterminatedString)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keywords() {
        assert_eq!(format!("{}", Token::Keyword(Keyword::Set)), "set");
        assert_eq!(format!("{}", Token::Keyword(Keyword::Elif)), "elif");
        assert_eq!(format!("{}", Token::Keyword(Keyword::Null)), "null");
    }

    #[test]
    fn test_display_operators() {
        assert_eq!(format!("{}", Token::Op(Op::Ge)), ">=");
        assert_eq!(format!("{}", Token::Op(Op::NotEq)), "!=");
        assert_eq!(format!("{}", Token::Op(Op::Caret)), "^");
    }

    #[test]
    fn test_display_literals() {
        assert_eq!(format!("{}", Token::Number(42.0)), "42");
        assert_eq!(format!("{}", Token::Number(1.5)), "1.5");
        assert_eq!(format!("{}", Token::Ident("foo".to_string())), "foo");
    }

    #[test]
    fn test_display_string_reescapes() {
        let tok = Token::Str("a\"b\\c\nd\te".to_string());
        assert_eq!(format!("{tok}"), r#""a\"b\\c\nd\te""#);
    }

    #[test]
    fn test_keyword_from_ident() {
        assert_eq!(Keyword::from_ident("fun"), Some(Keyword::Fun));
        assert_eq!(Keyword::from_ident("by"), Some(Keyword::By));
        assert_eq!(Keyword::from_ident("true"), None);
        assert_eq!(Keyword::from_ident("Fun"), None);
    }

    #[test]
    fn test_token_kind() {
        assert_eq!(Token::Number(1.0).kind(), TokenKind::Number);
        assert_eq!(Token::Str(String::new()).kind(), TokenKind::String);
        assert_eq!(Token::Ident("x".into()).kind(), TokenKind::Identifier);
        assert_eq!(Token::Keyword(Keyword::If).kind(), TokenKind::Keyword);
        assert_eq!(Token::Op(Op::Plus).kind(), TokenKind::Operator);
        assert_eq!(Token::Eof.kind(), TokenKind::Eof);
    }

    #[test]
    fn test_raw_lexer_longest_match() {
        let raw: Vec<_> = RawToken::lexer("<= < == =").collect();
        assert_eq!(
            raw,
            vec![
                Ok(RawToken::Op(Op::Le)),
                Ok(RawToken::Op(Op::Lt)),
                Ok(RawToken::Op(Op::EqEq)),
                Ok(RawToken::Op(Op::Assign)),
            ]
        );
    }
}
