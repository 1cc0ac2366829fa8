use jlc_lex::{LexError, Token};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Syntax error: {expected} expected! Got \"{got}\" instead (line {line})")]
    Unexpected {
        expected: String,
        got: String,
        line: u32,
    },
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl ParseError {
    pub fn unexpected(expected: &str, token: &Token) -> Self {
        ParseError::Unexpected {
            expected: expected.to_string(),
            got: token.lexeme(),
            line: token.line,
        }
    }
}
