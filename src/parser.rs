use std::mem;

use thiserror::Error;

use crate::{
    ast::{AggregationMode, BinOp, Condition, ConditionOp, DataType, Expr, Token, UnaryOp},
    lexer::{LexError, Lexer, Position},
    value::Value,
};

/// A grammar violation, with the character offset where parsing stopped.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    pub position: Position,
}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            position: e.position,
        }
    }
}

/// Deepest nesting of groups, calls and unary operators a formula may use.
pub const MAX_NESTING: usize = 64;

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    current_position: Position,
    depth: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let current_token = lexer.next_token()?;
        let current_position = lexer.token_start();
        Ok(Parser {
            lexer,
            current_token,
            current_position,
            depth: 0,
        })
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current_token = self.lexer.next_token()?;
        self.current_position = self.lexer.token_start();
        Ok(())
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError {
            message: message.into(),
            position: self.current_position,
        })
    }

    fn unexpected<T>(&self, context: &str) -> Result<T, ParseError> {
        match self.current_token {
            Token::Eof => self.error(format!("Unexpected end of input {}", context)),
            ref token => self.error(format!("Unexpected {} {}", token.describe(), context)),
        }
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if mem::discriminant(&self.current_token) != mem::discriminant(&expected) {
            return self.error(format!(
                "Expected {}, got {}",
                expected.describe(),
                self.current_token.describe()
            ));
        }
        self.advance()
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    /// Parse a complete formula; trailing tokens are an error.
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        if !self.check(&Token::Eof) {
            return self.unexpected("after end of expression");
        }
        Ok(expr)
    }

    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;

        if let Some(op) = match &self.current_token {
            Token::Eq => Some(BinOp::Equal),
            Token::NotEq => Some(BinOp::NotEqual),
            Token::Lt => Some(BinOp::LessThan),
            Token::Gt => Some(BinOp::GreaterThan),
            Token::LtEq => Some(BinOp::LessEqual),
            Token::GtEq => Some(BinOp::GreaterEqual),
            _ => None,
        } {
            self.advance()?;
            let right = self.parse_additive()?;

            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match &self.current_token {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Subtract,
                _ => break,
            };

            self.advance()?;
            let right = self.parse_multiplicative()?;

            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match &self.current_token {
                Token::Star => BinOp::Multiply,
                Token::Slash => BinOp::Divide,
                Token::Percent => BinOp::Modulo,
                _ => break,
            };

            self.advance()?;
            let right = self.parse_unary()?;

            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    // Every nested group, call argument, exponent and negation passes
    // through here, so this is where recursion depth is bounded.
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.depth >= MAX_NESTING {
            return self.error("Expression nested too deeply");
        }
        self.depth += 1;
        let result = self.parse_negation();
        self.depth -= 1;
        result
    }

    fn parse_negation(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Minus) {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(operand),
            });
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;

        if self.check(&Token::Caret) {
            self.advance()?;
            // Right-associative, and `2 ^ -1` is allowed
            let exponent = self.parse_unary()?;
            return Ok(Expr::Binary {
                op: BinOp::Power,
                left: Box::new(base),
                right: Box::new(exponent),
            });
        }
        Ok(base)
    }

    /// Parse the `.` chain: property access, aggregation suffixes and
    /// method-style function calls.
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        while self.check(&Token::Dot) {
            self.advance()?; // consume '.'

            let name = match mem::replace(&mut self.current_token, Token::Eof) {
                Token::Identifier(n) | Token::FieldRef(n) => n,
                other => {
                    self.current_token = other;
                    return self.unexpected("after '.'");
                }
            };
            self.advance()?;

            if self.check(&Token::LParen) {
                if let Some(mode) = AggregationMode::from_name(&name) {
                    let (property, separator) = self.parse_aggregation_args()?;
                    expr = Expr::Aggregation {
                        source: Box::new(expr),
                        mode,
                        property,
                        separator,
                    };
                } else {
                    let mut args = vec![expr];
                    args.extend(self.parse_call_args()?);
                    expr = Expr::Function { name, args };
                }
            } else {
                expr = Expr::Property {
                    source: Box::new(expr),
                    name,
                };
            }
        }
        Ok(expr)
    }

    /// Parse primary expressions: literals, references, calls and groups
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Float(n) => {
                self.advance()?;
                Ok(Expr::Literal {
                    value: Value::Float(n),
                    data_type: DataType::Number,
                })
            }
            Token::Integer(n) => {
                self.advance()?;
                Ok(Expr::number(n))
            }
            Token::String(s) => {
                self.advance()?;
                Ok(Expr::text(s))
            }
            Token::Boolean(b) => {
                self.advance()?;
                Ok(Expr::Literal {
                    value: Value::Boolean(b),
                    data_type: DataType::Boolean,
                })
            }
            Token::Null => {
                self.advance()?;
                Ok(Expr::Literal {
                    value: Value::Null,
                    data_type: DataType::Null,
                })
            }
            Token::FieldRef(name) => {
                self.advance()?;
                let filter = self.parse_optional_filter()?;
                Ok(Expr::Field { name, filter })
            }
            Token::NodeRef(name) => {
                self.advance()?;
                let filter = self.parse_optional_filter()?;
                Ok(Expr::NodeRef { name, filter })
            }
            Token::Identifier(name) => {
                self.advance()?;
                if self.check(&Token::LParen) {
                    let args = self.parse_call_args()?;
                    Ok(Expr::Function { name, args })
                } else {
                    // Bare identifier: an unbraced field reference
                    let filter = self.parse_optional_filter()?;
                    Ok(Expr::Field { name, filter })
                }
            }
            Token::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            token => {
                self.current_token = token;
                self.unexpected("in expression")
            }
        }
    }

    /// `( expr, expr, ... )` with the opening parenthesis current.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(Token::LParen)?;
        let mut args = vec![];

        if self.check(&Token::RParen) {
            self.advance()?;
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            if self.check(&Token::Comma) {
                self.advance()?;
            } else {
                break;
            }
        }

        self.expect(Token::RParen)?;
        Ok(args)
    }

    /// Aggregation arguments: a property name to project and/or a string
    /// separator, in any order: `.SUM(Amount)`, `.CONCAT(Name, " | ")`.
    fn parse_aggregation_args(&mut self) -> Result<(Option<String>, Option<String>), ParseError> {
        self.expect(Token::LParen)?;
        let mut property = None;
        let mut separator = None;

        while !self.check(&Token::RParen) {
            match mem::replace(&mut self.current_token, Token::Eof) {
                Token::Identifier(name) | Token::FieldRef(name) if property.is_none() => {
                    property = Some(name);
                }
                Token::String(s) if separator.is_none() => {
                    separator = Some(s);
                }
                other => {
                    self.current_token = other;
                    return self.unexpected("in aggregation arguments");
                }
            }
            self.advance()?;

            if self.check(&Token::Comma) {
                self.advance()?;
            } else if !self.check(&Token::RParen) {
                return self.unexpected("in aggregation arguments");
            }
        }

        self.advance()?; // ')'
        Ok((property, separator))
    }

    fn parse_optional_filter(&mut self) -> Result<Option<Condition>, ParseError> {
        if self.check(&Token::LBracket) {
            Ok(Some(self.parse_filter()?))
        } else {
            Ok(None)
        }
    }

    /// `[field OP value]`
    fn parse_filter(&mut self) -> Result<Condition, ParseError> {
        self.expect(Token::LBracket)?;

        let field = match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Identifier(n) | Token::String(n) | Token::FieldRef(n) => n,
            other => {
                self.current_token = other;
                return self.unexpected("where a filter field was expected");
            }
        };
        self.advance()?;

        let op = match &self.current_token {
            Token::Eq => ConditionOp::Eq,
            Token::NotEq => ConditionOp::Ne,
            Token::Lt => ConditionOp::Lt,
            Token::LtEq => ConditionOp::Le,
            Token::Gt => ConditionOp::Gt,
            Token::GtEq => ConditionOp::Ge,
            Token::Identifier(word) => match ConditionOp::from_word(word) {
                Some(op) => op,
                None => return self.unexpected("where a filter operator was expected"),
            },
            _ => return self.unexpected("where a filter operator was expected"),
        };
        self.advance()?;

        let value = if op.takes_value() {
            self.parse_filter_value()?
        } else {
            Value::Null
        };

        self.expect(Token::RBracket)?;
        Ok(Condition { field, op, value })
    }

    fn parse_filter_value(&mut self) -> Result<Value, ParseError> {
        let negative = if self.check(&Token::Minus) {
            self.advance()?;
            true
        } else {
            false
        };

        let value = match (&self.current_token, negative) {
            (Token::Integer(n), _) => Value::Integer(if negative { -n } else { *n }),
            (Token::Float(n), _) => Value::Float(if negative { -n } else { *n }),
            (Token::String(s), false) => Value::String(s.clone()),
            (Token::Boolean(b), false) => Value::Boolean(*b),
            (Token::Null, false) => Value::Null,
            (Token::Identifier(s), false) => Value::String(s.clone()),
            _ => return self.unexpected("where a filter value was expected"),
        };
        self.advance()?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<Expr, ParseError> {
        Parser::new(Lexer::new(input))?.parse()
    }

    #[test]
    fn test_trailing_operator_reports_offset() {
        let err = parse("{Amount} +").unwrap_err();
        assert_eq!(err.position, 10);
        assert!(err.message.contains("end of input"));
    }

    #[test]
    fn test_nesting_limit() {
        let depth = MAX_NESTING - 1;
        assert!(parse(&format!("{}1{}", "(".repeat(depth), ")".repeat(depth))).is_ok());

        let err = parse(&format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING))).unwrap_err();
        assert_eq!(err.message, "Expression nested too deeply");
        assert_eq!(err.position, MAX_NESTING);
    }

    #[test]
    fn test_unknown_suffix_is_a_method_call() {
        let expr = parse("{Name}.UPPER()").unwrap();
        match expr {
            Expr::Function { name, args } => {
                assert_eq!(name, "UPPER");
                assert_eq!(args, vec![Expr::field("Name")]);
            }
            other => panic!("Expected function call, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_filter_value() {
        let expr = parse("#Moves[Delta < -5]").unwrap();
        match expr {
            Expr::NodeRef {
                filter: Some(condition),
                ..
            } => {
                assert_eq!(condition.op, ConditionOp::Lt);
                assert_eq!(condition.value, Value::Integer(-5));
            }
            other => panic!("Expected filtered node reference, got {:?}", other),
        }
    }
}
