use thiserror::Error;

use crate::ast::Token;

/// Character offset into the formula text.
pub type Position = usize;

/// A lexical error with the character offset where it was detected.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct LexError {
    pub message: String,
    pub position: Position,
}

impl LexError {
    fn new(message: impl Into<String>, position: Position) -> Self {
        LexError {
            message: message.into(),
            position,
        }
    }
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    token_start: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            token_start: 0,
        }
    }

    /// Offset of the first character of the most recently returned token.
    pub fn token_start(&self) -> Position {
        self.token_start
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some(other) => result.push(other),
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::new("Unterminated string literal", start))
    }

    /// Reads a braced name: `{Unit Price}`. The opening brace is current.
    fn read_braced_name(&mut self) -> Result<String, LexError> {
        let start = self.position;
        self.advance(); // '{'

        let mut name = String::new();
        while let Some(ch) = self.current_char() {
            if ch == '}' {
                self.advance();
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(LexError::new("Empty field reference", start));
                }
                return Ok(name);
            }
            name.push(ch);
            self.advance();
        }

        Err(LexError::new("Unterminated field reference", start))
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if !is_float && let Ok(n) = number.parse::<i64>() {
            return Ok(Token::Integer(n));
        }
        number
            .parse::<f64>()
            .map(Token::Float)
            .map_err(|_| LexError::new(format!("Invalid number '{}'", number), start))
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        self.token_start = self.position;

        let token = match self.current_char() {
            None => Token::Eof,
            Some('{') => Token::FieldRef(self.read_braced_name()?),
            Some('#') => {
                self.advance();
                match self.current_char() {
                    Some('{') => Token::NodeRef(self.read_braced_name()?),
                    Some(c) if c.is_alphanumeric() || c == '_' => {
                        Token::NodeRef(self.read_identifier())
                    }
                    _ => {
                        return Err(LexError::new(
                            "Expected a name after '#'",
                            self.token_start,
                        ));
                    }
                }
            }
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('/') => {
                self.advance();
                Token::Slash
            }
            Some('%') => {
                self.advance();
                Token::Percent
            }
            Some('^') => {
                self.advance();
                Token::Caret
            }
            Some('=') => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                }
                Token::Eq
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::NotEq
                } else {
                    return Err(LexError::new(
                        "Unexpected '!' (did you mean '!='?)",
                        self.position,
                    ));
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::GtEq
                } else {
                    self.advance();
                    Token::Gt
                }
            }
            Some('<') => match self.peek_char(1) {
                Some('=') => {
                    self.advance();
                    self.advance();
                    Token::LtEq
                }
                Some('>') => {
                    self.advance();
                    self.advance();
                    Token::NotEq
                }
                _ => {
                    self.advance();
                    Token::Lt
                }
            },
            Some('"') => Token::String(self.read_string('"')?),
            Some('\'') => Token::String(self.read_string('\'')?),
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some('[') => {
                self.advance();
                Token::LBracket
            }
            Some(']') => {
                self.advance();
                Token::RBracket
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();

                match ident.to_ascii_lowercase().as_str() {
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" => Token::Null,
                    _ => Token::Identifier(ident),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => {
                return Err(LexError::new(
                    format!("Unexpected character '{}'", ch),
                    self.position,
                ));
            }
        };

        Ok(token)
    }
}
