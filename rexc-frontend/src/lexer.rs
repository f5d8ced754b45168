//! REX Lexer
//!
//! Tokenizes REX source code into a stream of tokens.
//! Handles keywords, literals, identifiers, punctuation, and comments.

use log::trace;
use rexc_common::{CompilerError, SourceLocation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// REX token types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenType {
    // Literals
    IntLiteral(i64),
    StringLiteral(String),

    // Identifiers
    Identifier(String),

    // Keywords
    Extern,
    Fn,
    Parallel,
    For,
    In,
    Step,
    Int,
    Index,
    Str,

    // Punctuation
    LeftParen,  // (
    RightParen, // )
    LeftBrace,  // {
    RightBrace, // }
    Comma,      // ,
    Colon,      // :
    Semicolon,  // ;
    DotDot,     // ..

    // Special
    EndOfFile,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::IntLiteral(n) => write!(f, "{}", n),
            TokenType::StringLiteral(s) => write!(f, "{:?}", s),
            TokenType::Identifier(s) => write!(f, "{}", s),
            TokenType::Extern => write!(f, "extern"),
            TokenType::Fn => write!(f, "fn"),
            TokenType::Parallel => write!(f, "parallel"),
            TokenType::For => write!(f, "for"),
            TokenType::In => write!(f, "in"),
            TokenType::Step => write!(f, "step"),
            TokenType::Int => write!(f, "int"),
            TokenType::Index => write!(f, "index"),
            TokenType::Str => write!(f, "str"),
            TokenType::LeftParen => write!(f, "("),
            TokenType::RightParen => write!(f, ")"),
            TokenType::LeftBrace => write!(f, "{{"),
            TokenType::RightBrace => write!(f, "}}"),
            TokenType::Comma => write!(f, ","),
            TokenType::Colon => write!(f, ":"),
            TokenType::Semicolon => write!(f, ";"),
            TokenType::DotDot => write!(f, ".."),
            TokenType::EndOfFile => write!(f, "<eof>"),
        }
    }
}

/// A token with its source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token_type: TokenType,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(token_type: TokenType, location: SourceLocation) -> Self {
        Self {
            token_type,
            location,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token_type)
    }
}

/// REX lexer
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    filename: String,
    line: u32,
    column: u32,
    keywords: HashMap<String, TokenType>,
}

impl Lexer {
    /// Create a new lexer
    pub fn new(input: &str, filename: &str) -> Self {
        let mut lexer = Self {
            input: input.chars().collect(),
            position: 0,
            filename: filename.to_string(),
            line: 1,
            column: 1,
            keywords: HashMap::new(),
        };

        lexer.initialize_keywords();
        lexer
    }

    /// Initialize keyword map
    fn initialize_keywords(&mut self) {
        let keywords = [
            ("extern", TokenType::Extern),
            ("fn", TokenType::Fn),
            ("parallel", TokenType::Parallel),
            ("for", TokenType::For),
            ("in", TokenType::In),
            ("step", TokenType::Step),
            ("int", TokenType::Int),
            ("index", TokenType::Index),
            ("str", TokenType::Str),
        ];

        for (keyword, token_type) in keywords {
            self.keywords.insert(keyword.to_string(), token_type);
        }
    }

    /// Get current character
    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        if let Some(ch) = self.current_char() {
            self.position += 1;
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            Some(ch)
        } else {
            None
        }
    }

    /// Get current location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(&self.filename, self.line, self.column)
    }

    /// Skip whitespace and `//` comments
    fn skip_trivia(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek_char(1) == Some('/') {
                while let Some(c) = self.current_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    /// Tokenize an identifier or keyword
    fn tokenize_identifier(&mut self) -> TokenType {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match self.keywords.get(&identifier) {
            Some(token_type) => token_type.clone(),
            None => TokenType::Identifier(identifier),
        }
    }

    /// Tokenize an integer literal
    fn tokenize_integer(&mut self) -> Result<TokenType, CompilerError> {
        let location = self.current_location();
        let mut digits = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        digits.parse::<i64>().map(TokenType::IntLiteral).map_err(|_| {
            CompilerError::lex_error(format!("Integer literal out of range: {}", digits), location)
        })
    }

    /// Tokenize a string literal
    fn tokenize_string_literal(&mut self) -> Result<TokenType, CompilerError> {
        self.advance(); // Skip opening quote
        let mut string = String::new();

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(TokenType::StringLiteral(string));
                }
                '\\' => {
                    self.advance(); // Skip backslash
                    match self.current_char() {
                        Some('n') => {
                            string.push('\n');
                            self.advance();
                        }
                        Some('t') => {
                            string.push('\t');
                            self.advance();
                        }
                        Some('\\') => {
                            string.push('\\');
                            self.advance();
                        }
                        Some('"') => {
                            string.push('"');
                            self.advance();
                        }
                        Some(c) => {
                            return Err(CompilerError::lex_error(
                                format!("Invalid escape sequence: \\{}", c),
                                self.current_location(),
                            ));
                        }
                        None => {
                            return Err(CompilerError::lex_error(
                                "Unterminated string literal".to_string(),
                                self.current_location(),
                            ));
                        }
                    }
                }
                _ => {
                    string.push(ch);
                    self.advance();
                }
            }
        }

        Err(CompilerError::lex_error(
            "Unterminated string literal".to_string(),
            self.current_location(),
        ))
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token, CompilerError> {
        self.skip_trivia();

        let location = self.current_location();

        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenType::EndOfFile, location));
        };

        let token_type = match ch {
            '(' => {
                self.advance();
                TokenType::LeftParen
            }
            ')' => {
                self.advance();
                TokenType::RightParen
            }
            '{' => {
                self.advance();
                TokenType::LeftBrace
            }
            '}' => {
                self.advance();
                TokenType::RightBrace
            }
            ',' => {
                self.advance();
                TokenType::Comma
            }
            ':' => {
                self.advance();
                TokenType::Colon
            }
            ';' => {
                self.advance();
                TokenType::Semicolon
            }
            '.' => {
                if self.peek_char(1) == Some('.') {
                    self.advance();
                    self.advance();
                    TokenType::DotDot
                } else {
                    return Err(CompilerError::lex_error(
                        "Unexpected character: '.'".to_string(),
                        location,
                    ));
                }
            }
            '"' => self.tokenize_string_literal()?,
            c if c.is_ascii_digit() => self.tokenize_integer()?,
            c if c.is_alphabetic() || c == '_' => self.tokenize_identifier(),
            c => {
                return Err(CompilerError::lex_error(
                    format!("Unexpected character: {:?}", c),
                    location,
                ));
            }
        };

        Ok(Token::new(token_type, location))
    }

    /// Tokenize the whole input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompilerError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.token_type == TokenType::EndOfFile;
            tokens.push(token);
            if done {
                break;
            }
        }

        trace!("lexed {} tokens from {}", tokens.len(), self.filename);
        Ok(tokens)
    }
}
