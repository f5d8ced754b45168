//! REX Recursive Descent Parser
//!
//! Parses REX tokens into an Abstract Syntax Tree (AST).
//!
//! Grammar:
//! ```text
//! program   := item* EOF
//! item      := extern | function
//! extern    := 'extern' 'fn' IDENT '(' param_types? ')' ';'
//! function  := 'fn' IDENT '(' params? ')' block
//! block     := '{' statement* '}'
//! statement := call | parallel | for
//! call      := IDENT '(' exprs? ')' ';'
//! parallel  := 'parallel' expr block
//! for       := 'for' IDENT 'in' expr '..' expr 'step' expr block
//! expr      := INT | STRING | IDENT
//! ```

use crate::ast::*;
use crate::lexer::{Token, TokenType};
use log::debug;
use rexc_common::{CompilerError, SourceLocation};
use std::collections::VecDeque;
use thiserror::Error;

/// Parse error types specific to the parser
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("Expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: Token },
    #[error("Unexpected end of file, expected {expected}")]
    UnexpectedEndOfFile { expected: String },
}

impl From<ParseError> for CompilerError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnexpectedToken { expected, found } => CompilerError::parse_error(
                format!("Expected {}, found {}", expected, found.token_type),
                found.location,
            ),
            ParseError::UnexpectedEndOfFile { expected } => CompilerError::parse_error(
                format!("Unexpected end of file, expected {}", expected),
                SourceLocation::unknown(),
            ),
        }
    }
}

/// REX parser
pub struct Parser {
    tokens: VecDeque<Token>,
}

impl Parser {
    /// Create a new parser
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into(),
        }
    }

    /// Peek at current token without consuming
    fn peek(&self) -> Option<&Token> {
        self.tokens.front()
    }

    /// Get current token and advance
    fn advance(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    /// Check if current token matches expected type (by discriminant)
    fn check(&self, token_type: &TokenType) -> bool {
        if let Some(token) = self.peek() {
            std::mem::discriminant(&token.token_type) == std::mem::discriminant(token_type)
        } else {
            false
        }
    }

    /// Consume the current token if it matches, reporting what was expected otherwise
    fn expect(&mut self, token_type: TokenType, context: &str) -> Result<Token, ParseError> {
        if self.check(&token_type) {
            Ok(self.advance().unwrap())
        } else {
            match self.peek() {
                Some(token) => Err(ParseError::UnexpectedToken {
                    expected: format!("{} ({})", token_type, context),
                    found: token.clone(),
                }),
                None => Err(ParseError::UnexpectedEndOfFile {
                    expected: format!("{} ({})", token_type, context),
                }),
            }
        }
    }

    /// Current location for error reporting
    fn current_location(&self) -> SourceLocation {
        self.peek()
            .map(|t| t.location.clone())
            .unwrap_or_else(SourceLocation::unknown)
    }

    /// Parse a whole program
    pub fn parse_program(&mut self) -> Result<Program, CompilerError> {
        let mut items = Vec::new();

        while let Some(token) = self.peek() {
            match token.token_type {
                TokenType::EndOfFile => break,
                TokenType::Extern => items.push(Item::Extern(self.parse_extern()?)),
                TokenType::Fn => items.push(Item::Function(self.parse_function()?)),
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "`extern` or `fn`".to_string(),
                        found: token.clone(),
                    }
                    .into());
                }
            }
        }

        debug!("parsed {} top-level items", items.len());
        Ok(Program { items })
    }

    /// Parse `extern fn name(types);`
    fn parse_extern(&mut self) -> Result<ExternDecl, CompilerError> {
        let location = self.current_location();
        self.expect(TokenType::Extern, "extern declaration")?;
        self.expect(TokenType::Fn, "extern declaration")?;
        let name = self.parse_identifier("extern function name")?;

        self.expect(TokenType::LeftParen, "extern parameter list")?;
        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                params.push(self.parse_param_type()?);
                if !self.check(&TokenType::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenType::RightParen, "extern parameter list")?;
        self.expect(TokenType::Semicolon, "extern declaration")?;

        Ok(ExternDecl {
            name,
            params,
            location,
        })
    }

    /// Parse `fn name(params) { ... }`
    fn parse_function(&mut self) -> Result<FunctionDef, CompilerError> {
        let location = self.current_location();
        self.expect(TokenType::Fn, "function definition")?;
        let name = self.parse_identifier("function name")?;

        self.expect(TokenType::LeftParen, "parameter list")?;
        let mut params = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                let param_name = self.parse_identifier("parameter name")?;
                self.expect(TokenType::Colon, "parameter type annotation")?;
                let param_type = self.parse_param_type()?;
                params.push((param_name, param_type));
                if !self.check(&TokenType::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenType::RightParen, "parameter list")?;

        let body = self.parse_block()?;

        Ok(FunctionDef {
            name,
            params,
            body,
            location,
        })
    }

    /// Parse a parameter type keyword
    fn parse_param_type(&mut self) -> Result<ParamType, CompilerError> {
        match self.advance() {
            Some(Token {
                token_type: TokenType::Int,
                ..
            }) => Ok(ParamType::Int),
            Some(Token {
                token_type: TokenType::Index,
                ..
            }) => Ok(ParamType::Index),
            Some(Token {
                token_type: TokenType::Str,
                ..
            }) => Ok(ParamType::Str),
            Some(token) => Err(ParseError::UnexpectedToken {
                expected: "parameter type (`int`, `index` or `str`)".to_string(),
                found: token,
            }
            .into()),
            None => Err(ParseError::UnexpectedEndOfFile {
                expected: "parameter type".to_string(),
            }
            .into()),
        }
    }

    /// Parse a braced statement list
    fn parse_block(&mut self) -> Result<Vec<Statement>, CompilerError> {
        self.expect(TokenType::LeftBrace, "block")?;
        let mut statements = Vec::new();
        while !self.check(&TokenType::RightBrace) {
            if self.peek().is_none() || self.check(&TokenType::EndOfFile) {
                return Err(ParseError::UnexpectedEndOfFile {
                    expected: "`}`".to_string(),
                }
                .into());
            }
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenType::RightBrace, "block")?;
        Ok(statements)
    }

    /// Parse a single statement
    fn parse_statement(&mut self) -> Result<Statement, CompilerError> {
        let location = self.current_location();
        let kind = match self.peek().map(|t| &t.token_type) {
            Some(TokenType::Parallel) => self.parse_parallel_statement()?,
            Some(TokenType::For) => self.parse_for_statement()?,
            Some(TokenType::Identifier(_)) => self.parse_call_statement()?,
            _ => {
                return Err(match self.peek() {
                    Some(token) => ParseError::UnexpectedToken {
                        expected: "statement".to_string(),
                        found: token.clone(),
                    },
                    None => ParseError::UnexpectedEndOfFile {
                        expected: "statement".to_string(),
                    },
                }
                .into());
            }
        };
        Ok(Statement { kind, location })
    }

    /// Parse `parallel <expr> { ... }`
    fn parse_parallel_statement(&mut self) -> Result<StatementKind, CompilerError> {
        self.expect(TokenType::Parallel, "parallel statement")?;
        let threads = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StatementKind::Parallel { threads, body })
    }

    /// Parse `for i in <expr> .. <expr> step <expr> { ... }`
    fn parse_for_statement(&mut self) -> Result<StatementKind, CompilerError> {
        self.expect(TokenType::For, "for statement")?;
        let var = self.parse_identifier("loop variable")?;
        self.expect(TokenType::In, "for statement")?;
        let lower = self.parse_expression()?;
        self.expect(TokenType::DotDot, "loop bounds")?;
        let upper = self.parse_expression()?;
        self.expect(TokenType::Step, "for statement")?;
        let step = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(StatementKind::For {
            var,
            lower,
            upper,
            step,
            body,
        })
    }

    /// Parse `callee(args);`
    fn parse_call_statement(&mut self) -> Result<StatementKind, CompilerError> {
        let callee = self.parse_identifier("call target")?;
        self.expect(TokenType::LeftParen, "call arguments")?;
        let mut args = Vec::new();
        if !self.check(&TokenType::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.check(&TokenType::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenType::RightParen, "call arguments")?;
        self.expect(TokenType::Semicolon, "call statement")?;
        Ok(StatementKind::Call { callee, args })
    }

    /// Parse an expression (literals and identifiers only)
    fn parse_expression(&mut self) -> Result<Expression, CompilerError> {
        match self.advance() {
            Some(Token {
                token_type: TokenType::IntLiteral(value),
                location,
            }) => Ok(Expression {
                kind: ExpressionKind::IntLiteral(value),
                location,
            }),
            Some(Token {
                token_type: TokenType::StringLiteral(value),
                location,
            }) => Ok(Expression {
                kind: ExpressionKind::StrLiteral(value),
                location,
            }),
            Some(Token {
                token_type: TokenType::Identifier(name),
                location,
            }) => Ok(Expression {
                kind: ExpressionKind::Identifier(name),
                location,
            }),
            Some(token) => Err(ParseError::UnexpectedToken {
                expected: "expression".to_string(),
                found: token,
            }
            .into()),
            None => Err(ParseError::UnexpectedEndOfFile {
                expected: "expression".to_string(),
            }
            .into()),
        }
    }

    /// Parse an identifier token
    fn parse_identifier(&mut self, context: &str) -> Result<String, CompilerError> {
        match self.advance() {
            Some(Token {
                token_type: TokenType::Identifier(name),
                ..
            }) => Ok(name),
            Some(token) => Err(ParseError::UnexpectedToken {
                expected: format!("identifier ({})", context),
                found: token,
            }
            .into()),
            None => Err(ParseError::UnexpectedEndOfFile {
                expected: format!("identifier ({})", context),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Result<Program, CompilerError> {
        let mut lexer = Lexer::new(source, "test.rex");
        let tokens = lexer.tokenize()?;
        Parser::new(tokens).parse_program()
    }

    #[test]
    fn test_parse_extern() {
        let program = parse("extern fn printf(str);").unwrap();
        assert_eq!(program.items.len(), 1);
        match &program.items[0] {
            Item::Extern(decl) => {
                assert_eq!(decl.name, "printf");
                assert_eq!(decl.params, vec![ParamType::Str]);
            }
            other => panic!("expected extern, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_function() {
        let program = parse("fn foo() {}").unwrap();
        match &program.items[0] {
            Item::Function(func) => {
                assert_eq!(func.name, "foo");
                assert!(func.params.is_empty());
                assert!(func.body.is_empty());
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_params() {
        let program = parse("fn bar(n: int, label: str) {}").unwrap();
        match &program.items[0] {
            Item::Function(func) => {
                assert_eq!(
                    func.params,
                    vec![
                        ("n".to_string(), ParamType::Int),
                        ("label".to_string(), ParamType::Str),
                    ]
                );
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_statements() {
        let source = r#"
            extern fn printf(str);

            fn foo() {
                parallel 6 {
                    for i in 0 .. 10 step 1 {
                        printf("This is a test.\n");
                    }
                }
            }
        "#;
        let program = parse(source).unwrap();
        assert_eq!(program.items.len(), 2);

        let func = match &program.items[1] {
            Item::Function(func) => func,
            other => panic!("expected function, got {:?}", other),
        };
        let parallel = match &func.body[0].kind {
            StatementKind::Parallel { threads, body } => {
                assert_eq!(threads.kind, ExpressionKind::IntLiteral(6));
                body
            }
            other => panic!("expected parallel, got {:?}", other),
        };
        let for_body = match &parallel[0].kind {
            StatementKind::For {
                var, lower, upper, step, body,
            } => {
                assert_eq!(var, "i");
                assert_eq!(lower.kind, ExpressionKind::IntLiteral(0));
                assert_eq!(upper.kind, ExpressionKind::IntLiteral(10));
                assert_eq!(step.kind, ExpressionKind::IntLiteral(1));
                body
            }
            other => panic!("expected for, got {:?}", other),
        };
        match &for_body[0].kind {
            StatementKind::Call { callee, args } => {
                assert_eq!(callee, "printf");
                assert_eq!(
                    args[0].kind,
                    ExpressionKind::StrLiteral("This is a test.\n".to_string())
                );
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_reports_location() {
        let err = parse("fn foo( {}").unwrap_err();
        match err {
            CompilerError::ParseError { location, .. } => {
                assert_eq!(location.line, 1);
                assert_eq!(location.column, 9);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_top_level_token() {
        let err = parse("parallel 6 {}").unwrap_err();
        assert!(matches!(err, CompilerError::ParseError { .. }));
    }
}
