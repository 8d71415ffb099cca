//! Recursive-descent parser over the token stream.
//!
//! Single-token lookahead, first syntax error wins. Semicolons are consumed
//! wherever they appear but never required. All binary operators share one
//! precedence tier and associate left, as written.

pub mod ast;
mod error;

pub use error::{ParseError, ParseResult};

use crate::lexer::{Span, Token, TokenKind};
use ast::{
    BinaryOperator, ClassDecl, ClassMember, Expression, MethodDecl, Param, Program, Statement,
    UnaryOperator,
};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    current: Token,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, Span::default()));
        }
        let current = tokens[0].clone();
        Self {
            tokens,
            pos: 0,
            current,
        }
    }

    pub fn parse_program(mut self) -> ParseResult<Program> {
        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::Eof) {
            statements.push(self.parse_top_level()?);
        }
        Ok(Program { statements })
    }

    fn parse_top_level(&mut self) -> ParseResult<Statement> {
        match self.current.kind {
            TokenKind::Import => self.parse_import(),
            TokenKind::Class => self.parse_class(),
            TokenKind::Let => self.parse_var_decl(),
            _ => {
                let expr = self.parse_expression()?;
                self.eat_semicolon();
                Ok(Statement::Expr(expr))
            }
        }
    }

    fn parse_import(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::Import)?;
        let module = self.expect_identifier()?;
        let alias = if matches!(self.current.kind, TokenKind::As) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.eat_semicolon();
        Ok(Statement::Import { module, alias })
    }

    fn parse_class(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::Class)?;
        let name = self.expect_identifier()?;
        let super_name = if matches!(self.current.kind, TokenKind::Extends) {
            self.advance();
            Some(self.expect_identifier()?)
        } else {
            None
        };
        self.expect(TokenKind::LBrace)?;

        let mut members = Vec::new();
        while !matches!(self.current.kind, TokenKind::RBrace | TokenKind::Eof) {
            members.push(self.parse_member()?);
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Statement::ClassDecl(ClassDecl {
            name,
            super_name,
            members,
        }))
    }

    fn parse_member(&mut self) -> ParseResult<ClassMember> {
        if matches!(self.current.kind, TokenKind::Constructor) {
            self.advance();
            self.expect(TokenKind::LParen)?;
            let params = self.parse_params()?;
            self.expect(TokenKind::RParen)?;
            let body = self.parse_block()?;
            return Ok(ClassMember::Constructor { params, body });
        }

        let name = self.expect_identifier()?;
        match self.current.kind {
            TokenKind::Colon => {
                self.advance();
                let type_name = self.expect_identifier()?;
                self.eat_semicolon();
                Ok(ClassMember::Field { name, type_name })
            }
            TokenKind::LParen => {
                self.advance();
                let params = self.parse_params()?;
                self.expect(TokenKind::RParen)?;
                self.expect(TokenKind::Colon)?;
                let return_type = self.expect_identifier()?;
                let body = self.parse_block()?;
                Ok(ClassMember::Method(MethodDecl {
                    name,
                    params,
                    return_type,
                    body,
                }))
            }
            _ => Err(self.error("':' or '('")),
        }
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param>> {
        let mut params = Vec::new();
        if matches!(self.current.kind, TokenKind::RParen) {
            return Ok(params);
        }
        loop {
            let name = self.expect_identifier()?;
            self.expect(TokenKind::Colon)?;
            let type_name = self.expect_identifier()?;
            params.push(Param { name, type_name });
            if !matches!(self.current.kind, TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(params)
    }

    fn parse_block(&mut self) -> ParseResult<Vec<Statement>> {
        self.expect(TokenKind::LBrace)?;
        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::RBrace | TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        match self.current.kind {
            TokenKind::Let => self.parse_var_decl(),
            TokenKind::If => self.parse_if(),
            TokenKind::Return => self.parse_return(),
            _ => {
                let expr = self.parse_expression()?;
                self.eat_semicolon();
                Ok(Statement::Expr(expr))
            }
        }
    }

    fn parse_var_decl(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::Let)?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Colon)?;
        let type_name = self.expect_identifier()?;
        let init = if matches!(self.current.kind, TokenKind::Equal) {
            self.advance();
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.eat_semicolon();
        Ok(Statement::VarDecl {
            name,
            type_name,
            init,
        })
    }

    fn parse_if(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let then_body = self.parse_block()?;
        let else_body = if matches!(self.current.kind, TokenKind::Else) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(Statement::If {
            condition,
            then_body,
            else_body,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::Return)?;
        // A bare `return` ends at the statement boundary.
        if matches!(
            self.current.kind,
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) {
            self.eat_semicolon();
            return Ok(Statement::Return(None));
        }
        let value = self.parse_expression()?;
        self.eat_semicolon();
        Ok(Statement::Return(Some(value)))
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<Expression> {
        let target = self.parse_binary()?;
        if !matches!(self.current.kind, TokenKind::Equal) {
            return Ok(target);
        }

        let equals_span = self.current.span;
        if !matches!(
            target,
            Expression::Identifier(_) | Expression::FieldAccess { .. }
        ) {
            return Err(ParseError::InvalidAssignmentTarget {
                line: equals_span.line,
                column: equals_span.column,
            });
        }
        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expression::Assignment {
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn parse_binary(&mut self) -> ParseResult<Expression> {
        // All binary operators share one precedence tier, left to right.
        let mut expr = self.parse_unary()?;
        while let Some(op) = self.current_binary_operator() {
            self.advance();
            let right = self.parse_unary()?;
            expr = Expression::BinaryOp {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn current_binary_operator(&self) -> Option<BinaryOperator> {
        match self.current.kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Sub),
            TokenKind::Star => Some(BinaryOperator::Mul),
            TokenKind::Slash => Some(BinaryOperator::Div),
            TokenKind::EqualEqual => Some(BinaryOperator::Eq),
            TokenKind::BangEqual => Some(BinaryOperator::NotEq),
            TokenKind::Less => Some(BinaryOperator::Less),
            TokenKind::Greater => Some(BinaryOperator::Greater),
            TokenKind::LessEqual => Some(BinaryOperator::LessEq),
            TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEq),
            _ => None,
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        let op = match self.current.kind {
            TokenKind::Plus => Some(UnaryOperator::Plus),
            TokenKind::Minus => Some(UnaryOperator::Minus),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let expr = self.parse_unary()?;
            return Ok(Expression::UnaryOp {
                op,
                expr: Box::new(expr),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match &self.current.kind {
            TokenKind::Integer(value) => {
                let value = *value;
                self.advance();
                Ok(Expression::Integer(value))
            }
            TokenKind::Str(value) => {
                let value = value.clone();
                self.advance();
                Ok(Expression::String(value))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Boolean(false))
            }
            TokenKind::This => {
                self.advance();
                self.parse_suffixes(Expression::This)
            }
            TokenKind::Super => {
                self.advance();
                self.parse_suffixes(Expression::Super { method: None })
            }
            TokenKind::New => {
                self.advance();
                let class_name = self.expect_identifier()?;
                self.expect(TokenKind::LParen)?;
                let args = self.parse_args()?;
                Ok(Expression::New { class_name, args })
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                self.parse_suffixes(Expression::Identifier(name))
            }
            _ => Err(self.error("expression")),
        }
    }

    /// Zero-or-more `.name` / `(args)` suffixes. Only `this`, `super` and
    /// identifiers accept suffixes; `super.name` folds into the `Super`
    /// node itself.
    fn parse_suffixes(&mut self, base: Expression) -> ParseResult<Expression> {
        let mut expr = base;
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_identifier()?;
                    expr = match expr {
                        Expression::Super { method: None } => Expression::Super {
                            method: Some(name),
                        },
                        object => Expression::FieldAccess {
                            object: Box::new(object),
                            name,
                        },
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_args()?;
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// Comma-separated argument list; consumes the closing `)`.
    fn parse_args(&mut self) -> ParseResult<Vec<Expression>> {
        let mut args = Vec::new();
        if matches!(self.current.kind, TokenKind::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            match self.current.kind {
                TokenKind::Comma => self.advance(),
                TokenKind::RParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => return Err(self.error("',' or ')'")),
            }
        }
    }

    fn eat_semicolon(&mut self) {
        if matches!(self.current.kind, TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.current.kind == kind {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&kind.describe()))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error("identifier"))
        }
    }

    fn advance(&mut self) {
        let next = self
            .tokens
            .get(self.pos + 1)
            .cloned()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, self.current.span));
        self.pos = self.pos.saturating_add(1);
        self.current = next;
    }

    fn error(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current.kind.describe(),
            line: self.current.span.line,
            column: self.current.span.column,
        }
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> ParseResult<Program> {
    Parser::new(tokens).parse_program()
}
