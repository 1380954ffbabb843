//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including error types, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: Parsing struct, global and function declarations
//! - `statements`: Parsing statements (if, while, for, etc.)
//! - `expressions`: Parsing expressions, one method per precedence level
//!
//! Names are resolved while parsing: the parser owns the [`SymbolTable`] and
//! fills it in as declarations are seen, so every variable node already
//! carries its type and storage and every member node its offset.
//!
//! # Implementation
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token};
use crate::symbols::SymbolTable;
use log::debug;
use snafu::Snafu;

/// Parser error type
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ParseError {
    #[snafu(transparent)]
    Lex { source: LexError },

    #[snafu(display("Parse error at {location}: {message}, found {found}"))]
    Expected {
        message: String,
        found: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: undefined variable '{name}'"))]
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: undefined struct '{name}'"))]
    UndefinedStruct {
        name: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: struct '{struct_name}' has no member '{member}'"))]
    UndefinedMember {
        struct_name: String,
        member: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: member access on non-struct type '{ty}'"))]
    NotAStruct {
        ty: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: expression is not assignable"))]
    NotAnLvalue { location: SourceLocation },

    #[snafu(display("Parse error at {location}: array size must be a positive integer constant"))]
    InvalidArraySize { location: SourceLocation },

    #[snafu(display("Parse error at {location}: '{name}' is too large for a 32-bit target"))]
    ObjectTooLarge {
        name: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: stack frame too large to hold local '{name}'"))]
    FrameTooLarge {
        name: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: redefinition of {kind} '{name}'"))]
    Redefinition {
        kind: &'static str,
        name: String,
        location: SourceLocation,
    },

    #[snafu(display(
        "Parse error at {location}: '{name}' redeclared as '{ty}', previously '{previous}'"
    ))]
    ConflictingDeclaration {
        name: String,
        previous: String,
        ty: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: variable '{name}' declared void"))]
    VoidVariable {
        name: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: '{name}' cannot be a struct passed or returned by value"))]
    StructByValue {
        name: String,
        location: SourceLocation,
    },

    #[snafu(display(
        "Parse error at {location}: initializer of global '{name}' is not an integer constant"
    ))]
    NonConstantInitializer {
        name: String,
        location: SourceLocation,
    },

    #[snafu(display("Parse error at {location}: aggregate '{name}' cannot have an initializer"))]
    AggregateInitializer {
        name: String,
        location: SourceLocation,
    },

    #[snafu(display(
        "Parse error at {location}: '{name}' expects {expected} argument(s), got {found}"
    ))]
    BuiltinArity {
        name: &'static str,
        expected: String,
        found: usize,
        location: SourceLocation,
    },
}

impl ParseError {
    pub fn location(&self) -> SourceLocation {
        match self {
            ParseError::Lex { source } => source.location(),
            ParseError::Expected { location, .. }
            | ParseError::UndefinedVariable { location, .. }
            | ParseError::UndefinedStruct { location, .. }
            | ParseError::UndefinedMember { location, .. }
            | ParseError::NotAStruct { location, .. }
            | ParseError::NotAnLvalue { location }
            | ParseError::InvalidArraySize { location }
            | ParseError::ObjectTooLarge { location, .. }
            | ParseError::FrameTooLarge { location, .. }
            | ParseError::Redefinition { location, .. }
            | ParseError::ConflictingDeclaration { location, .. }
            | ParseError::VoidVariable { location, .. }
            | ParseError::StructByValue { location, .. }
            | ParseError::NonConstantInitializer { location, .. }
            | ParseError::AggregateInitializer { location, .. }
            | ParseError::BuiltinArity { location, .. } => *location,
        }
    }
}

/// Recursive descent parser for C subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    pub(crate) symbols: SymbolTable,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize()?;
        debug!("lexed {} tokens", tokens.len());
        Ok(Self {
            tokens,
            position: 0,
            symbols: SymbolTable::new(),
        })
    }

    /// Parse the entire program (top-level declarations)
    ///
    /// Struct and global declarations only update the symbol table; each
    /// function definition becomes one node of the returned [`Program`].
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            if let Some(function) = self.parse_top_level_declaration()? {
                program.nodes.push(function);
            }
        }

        program.symbols = std::mem::take(&mut self.symbols);
        debug!(
            "parsed {} functions, {} globals, {} structs",
            program.nodes.len(),
            program.symbols.globals.len(),
            program.symbols.structs.len()
        );
        Ok(program)
    }

    // ===== Helper methods =====

    pub(crate) fn is_type_keyword(&self) -> bool {
        matches!(
            self.peek(),
            Token::Int(_) | Token::Char(_) | Token::Void(_) | Token::Struct(_)
        )
    }

    pub(crate) fn match_token(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::Eof(_))
    }

    pub(crate) fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof and `advance`
        // never moves past it.
        &self.tokens[self.position]
    }

    pub(crate) fn peek_token(&self) -> Token {
        self.peek().clone()
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.position + n)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn previous_location(&self) -> SourceLocation {
        self.previous().location()
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location()
    }

    pub(crate) fn expect_token(&mut self, token: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            ExpectedSnafu {
                message,
                found: self.peek().to_string(),
                location: self.current_location(),
            }
            .fail()
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::LParen(self.current_location()),
            &format!("Expected '(' {ctx}"),
        )
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RParen(self.current_location()),
            &format!("Expected ')' {ctx}"),
        )
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::LBrace(self.current_location()),
            &format!("Expected '{{' {ctx}"),
        )
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RBrace(self.current_location()),
            &format!("Expected '}}' {ctx}"),
        )
    }

    pub(crate) fn expect_rbracket(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::RBracket(self.current_location()),
            &format!("Expected ']' {ctx}"),
        )
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(
            &Token::Semicolon(self.current_location()),
            &format!("Expected ';' {ctx}"),
        )
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let Token::Ident(name, _) = self.peek_token() {
            self.advance();
            Ok(name)
        } else {
            ExpectedSnafu {
                message: "Expected identifier",
                found: self.peek().to_string(),
                location: self.current_location(),
            }
            .fail()
        }
    }
}

/// Evaluate an integer constant expression built from literals and
/// arithmetic. Returns `None` for anything else, including division by zero.
pub(crate) fn fold_constant(node: &AstNode) -> Option<i32> {
    match node {
        AstNode::IntLiteral(n, _) => Some(*n),
        AstNode::BinaryOp {
            op, left, right, ..
        } => {
            let l = fold_constant(left)?;
            let r = fold_constant(right)?;
            match op {
                BinOp::Add => Some(l.wrapping_add(r)),
                BinOp::Sub => Some(l.wrapping_sub(r)),
                BinOp::Mul => Some(l.wrapping_mul(r)),
                BinOp::Div => l.checked_div(r),
                BinOp::Mod => l.checked_rem(r),
                BinOp::Eq => Some((l == r) as i32),
                BinOp::Ne => Some((l != r) as i32),
                BinOp::Lt => Some((l < r) as i32),
                BinOp::Le => Some((l <= r) as i32),
                BinOp::Gt => Some((l > r) as i32),
                BinOp::Ge => Some((l >= r) as i32),
            }
        }
        _ => None,
    }
}
