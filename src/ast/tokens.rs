/// Lexical tokens produced by the [`Lexer`](crate::lexer::Lexer).
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 0.5
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 7
    /// ```
    Integer(i64),

    /// String literal enclosed in double or single quotes
    ///
    /// # Examples
    /// ```text
    /// "open"
    /// 'line\nbreak'
    /// ```
    String(String),

    /// Boolean values (case-insensitive)
    ///
    /// # Examples
    /// ```text
    /// true
    /// FALSE
    /// ```
    Boolean(bool),

    /// Null value (case-insensitive)
    Null,

    // References
    /// Braced field reference. Everything up to the closing brace is the name.
    ///
    /// # Examples
    /// ```text
    /// {Amount}
    /// {Unit Price}
    /// ```
    FieldRef(String),

    /// Node or relational-set reference
    ///
    /// # Examples
    /// ```text
    /// #Orders
    /// #{Line Items}
    /// ```
    NodeRef(String),

    /// Bare identifier: function name, property, aggregation mode or an
    /// unbraced field reference.
    ///
    /// # Examples
    /// ```text
    /// IF
    /// Amount
    /// SUM
    /// ```
    Identifier(String),

    // Comparison
    /// Equality (`=` or `==`)
    Eq,

    /// Inequality (`!=` or `<>`)
    NotEq,

    /// Less than
    Lt,

    /// Greater than
    Gt,

    /// Less than or equal
    LtEq,

    /// Greater than or equal
    GtEq,

    // Arithmetic
    /// Addition or string concatenation
    Plus,

    /// Subtraction or unary minus
    Minus,

    /// Multiplication
    Star,

    /// Division
    Slash,

    /// Modulo
    Percent,

    /// Exponentiation
    Caret,

    // Delimiters
    /// Left bracket opening a filter
    LBracket,

    /// Right bracket
    RBracket,

    /// Left parenthesis for grouping or call arguments
    LParen,

    /// Right parenthesis
    RParen,

    /// Dot for property, aggregation and method access
    Dot,

    /// Comma separating arguments
    Comma,

    /// End of input
    Eof,
}

impl Token {
    /// Short description used in syntax error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Float(n) => n.to_string(),
            Token::Integer(n) => n.to_string(),
            Token::String(s) => format!("\"{}\"", s),
            Token::Boolean(b) => b.to_string(),
            Token::Null => "null".to_string(),
            Token::FieldRef(name) => format!("{{{}}}", name),
            Token::NodeRef(name) => format!("#{}", name),
            Token::Identifier(name) => name.clone(),
            Token::Eq => "'='".to_string(),
            Token::NotEq => "'!='".to_string(),
            Token::Lt => "'<'".to_string(),
            Token::Gt => "'>'".to_string(),
            Token::LtEq => "'<='".to_string(),
            Token::GtEq => "'>='".to_string(),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::Caret => "'^'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}
