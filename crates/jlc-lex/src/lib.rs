//! Hand-written lexer with a single-token lookahead cache.

mod cursor;
mod token;

pub use token::{Token, TokenKind};

use cursor::Cursor;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Malformed integer literal (line {line})")]
    MalformedInteger { line: u32 },
    #[error("Unterminated string literal (line {line})")]
    UnterminatedString { line: u32 },
}

/// Tokenizes a single source file. `peek()` buffers the next token in a
/// single-slot cache so it never re-lexes; `next()` drains that cache first.
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    peeked: Option<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            cursor: Cursor::new(source),
            peeked: None,
        }
    }

    pub fn next(&mut self) -> Result<Token, LexError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }
        self.lex_token()
    }

    pub fn peek(&mut self) -> Result<&Token, LexError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lex_token()?);
        }
        Ok(self.peeked.as_ref().unwrap())
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.current() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.cursor.advance();
                }
                Some(b'/') if self.cursor.peek_at(1) == Some(b'/') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    while !matches!(self.cursor.current(), None | Some(b'\n')) {
                        self.cursor.advance();
                    }
                }
                Some(b'/') if self.cursor.peek_at(1) == Some(b'*') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    loop {
                        match self.cursor.current() {
                            None => break,
                            Some(b'*') if self.cursor.peek_at(1) == Some(b'/') => {
                                self.cursor.advance();
                                self.cursor.advance();
                                break;
                            }
                            _ => {
                                self.cursor.advance();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();

        let line = self.cursor.line();
        let Some(c) = self.cursor.current() else {
            return Ok(Token::terminator(line));
        };

        if token::is_operator(c) {
            self.cursor.advance();
            return Ok(Token::byte_token(TokenKind::Operator, c, line));
        }
        if token::is_punctuator(c) {
            self.cursor.advance();
            return Ok(Token::byte_token(TokenKind::Punctuator, c, line));
        }
        if c.is_ascii_digit() {
            return self.lex_integer(line);
        }
        if c == b'"' {
            return self.lex_string(line);
        }
        self.lex_word(line)
    }

    fn lex_integer(&mut self, line: u32) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(c) = self.cursor.current() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c as char);
            self.cursor.advance();
        }
        if let Some(c) = self.cursor.current() {
            if !token::is_operator(c) && !token::is_punctuator(c) && !c.is_ascii_whitespace() {
                return Err(LexError::MalformedInteger { line });
            }
        }
        Ok(Token::text_token(TokenKind::Integer, text, line))
    }

    fn lex_string(&mut self, line: u32) -> Result<Token, LexError> {
        self.cursor.advance();
        let mut text = String::from("\"");
        loop {
            match self.cursor.current() {
                None | Some(b'\n') => return Err(LexError::UnterminatedString { line }),
                Some(b'"') => {
                    self.cursor.advance();
                    text.push('"');
                    break;
                }
                Some(c) => {
                    text.push(c as char);
                    self.cursor.advance();
                }
            }
        }
        Ok(Token::text_token(TokenKind::String, text, line))
    }

    fn lex_word(&mut self, line: u32) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(c) = self.cursor.current() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                text.push(c as char);
                self.cursor.advance();
            } else {
                break;
            }
        }
        let kind = if token::is_keyword(&text) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Ok(Token::text_token(kind, text, line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next().unwrap();
            if token.kind == TokenKind::Terminator {
                break;
            }
            tokens.push(token);
        }
        tokens
    }

    #[test]
    fn lexes_class_skeleton() {
        let tokens = lex_all("class Main { }");
        assert_eq!(tokens.len(), 4);
        assert!(tokens[0].is_keyword("class"));
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert!(tokens[2].is_punctuator('{'));
        assert!(tokens[3].is_punctuator('}'));
    }

    #[test]
    fn peek_does_not_consume() {
        let mut lexer = Lexer::new("let x");
        let peeked = lexer.peek().unwrap().clone();
        let next = lexer.next().unwrap();
        assert_eq!(peeked, next);
        assert!(next.is_keyword("let"));
    }

    #[test]
    fn skips_line_and_block_comments() {
        let tokens = lex_all("// comment\nlet /* inline */ x;");
        assert!(tokens[0].is_keyword("let"));
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert!(tokens[2].is_punctuator(';'));
    }

    #[test]
    fn unterminated_block_comment_reaches_eof_silently() {
        let tokens = lex_all("let x; /* never closed");
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn string_literal_keeps_surrounding_quotes() {
        let tokens = lex_all("\"hi\"");
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "\"hi\"");
    }

    #[test]
    fn unterminated_string_is_lex_error() {
        let mut lexer = Lexer::new("\"hi");
        assert_eq!(
            lexer.next(),
            Err(LexError::UnterminatedString { line: 1 })
        );
    }

    #[test]
    fn malformed_integer_suffix_is_lex_error() {
        let mut lexer = Lexer::new("123abc");
        assert_eq!(lexer.next(), Err(LexError::MalformedInteger { line: 1 }));
    }

    #[test]
    fn line_numbers_track_newlines() {
        let tokens = lex_all("let x;\nlet y;");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[4].line, 2);
    }
}
