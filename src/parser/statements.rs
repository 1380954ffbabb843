//! Statement parsing implementation
//!
//! This module handles parsing of all C statement types:
//!
//! - Variable declarations: `int x = 42, *p, buf[8];`
//! - Control flow: `if`, `while`, `for`
//! - Jump statements: `return`, `break`, `continue`
//! - Compound statements: `{ ... }` and the empty statement `;`
//! - Expression statements: function calls, assignments
//!
//! # Grammar
//!
//! ```text
//! statement ::= var_decl | if_stmt | while_stmt | for_stmt
//!             | return_stmt | break_stmt | continue_stmt
//!             | block | expr_stmt | ";"
//! ```
//!
//! Locals live in one flat namespace per function: a name declared in an
//! inner block stays visible, with the same frame slot, for the rest of the
//! function. Redeclaring it with the same type reuses the slot.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::*;
use snafu::OptionExt;

impl Parser {
    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        // Check for keywords first
        if self.match_token(&Token::Return(loc)) {
            return self.parse_return_statement();
        }

        if self.match_token(&Token::If(loc)) {
            return self.parse_if_statement();
        }

        if self.match_token(&Token::While(loc)) {
            return self.parse_while_statement();
        }

        if self.match_token(&Token::For(loc)) {
            return self.parse_for_statement();
        }

        if self.match_token(&Token::Break(loc)) {
            self.expect_semicolon("after 'break'")?;
            return Ok(AstNode::Break { location: loc });
        }

        if self.match_token(&Token::Continue(loc)) {
            self.expect_semicolon("after 'continue'")?;
            return Ok(AstNode::Continue { location: loc });
        }

        if self.match_token(&Token::LBrace(loc)) {
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after block")?;
            return Ok(AstNode::Block {
                statements,
                location: loc,
            });
        }

        // Empty statement
        if self.match_token(&Token::Semicolon(loc)) {
            return Ok(AstNode::Block {
                statements: Vec::new(),
                location: loc,
            });
        }

        // Check for variable declaration (type followed by identifier)
        if self.is_type_keyword() {
            return self.parse_variable_declaration();
        }

        // Otherwise, it's an expression statement
        let expr = self.parse_expression()?;
        self.expect_semicolon("after expression")?;
        Ok(AstNode::ExpressionStatement {
            expr: Box::new(expr),
            location: loc,
        })
    }

    /// Parse return statement
    fn parse_return_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        let expr = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect_semicolon(if expr.is_some() {
            "after return value"
        } else {
            "after 'return'"
        })?;

        Ok(AstNode::Return {
            expr,
            location: loc,
        })
    }

    /// Parse if statement
    fn parse_if_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'if'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after if condition")?;

        let then_branch = Box::new(self.parse_statement()?);

        let else_branch = if self.match_token(&Token::Else(self.current_location())) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(AstNode::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    /// Parse while statement
    fn parse_while_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'while'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after while condition")?;

        let body = Box::new(self.parse_statement()?);

        Ok(AstNode::While {
            condition,
            body,
            location: loc,
        })
    }

    /// Parse for statement
    fn parse_for_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'for'")?;

        // Init (optional)
        let init = if self.match_token(&Token::Semicolon(self.current_location())) {
            None
        } else if self.is_type_keyword() {
            // Declaration includes semicolon, so don't expect another
            Some(Box::new(self.parse_variable_declaration()?))
        } else {
            let init_loc = self.current_location();
            let expr = self.parse_expression()?;
            self.expect_semicolon("after for init")?;
            Some(Box::new(AstNode::ExpressionStatement {
                expr: Box::new(expr),
                location: init_loc,
            }))
        };

        // Condition (optional)
        let condition = if self.check(&Token::Semicolon(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_semicolon("after for condition")?;

        // Increment (optional)
        let increment = if self.check(&Token::RParen(self.current_location())) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect_rparen("after for clauses")?;

        let body = Box::new(self.parse_statement()?);

        Ok(AstNode::For {
            init,
            condition,
            increment,
            body,
            location: loc,
        })
    }

    /// Parse variable declaration: type declarator [= init] (, declarator [= init])* ;
    ///
    /// Each declarator becomes a [`AstNode::VarDecl`] whose initializer, if
    /// any, is already the assignment to the new local. A list of several
    /// declarators is returned as a block.
    pub(crate) fn parse_variable_declaration(&mut self) -> Result<AstNode, ParseError> {
        let decl_loc = self.current_location();
        let base = self.parse_base_type()?;
        let mut decls = Vec::new();

        loop {
            let (name, var_type, loc) = self.parse_declarator(&base)?;
            self.check_object_type(&name, &var_type, loc)?;

            let var = match self.symbols.find_local(&name) {
                Some(existing) if existing.ty == var_type => existing.clone(),
                Some(existing) => {
                    return ConflictingDeclarationSnafu {
                        name,
                        previous: existing.ty.to_string(),
                        ty: var_type.to_string(),
                        location: loc,
                    }
                    .fail()
                }
                None => self
                    .symbols
                    .declare_local(&name, var_type)
                    .context(FrameTooLargeSnafu {
                        name: &name,
                        location: loc,
                    })?,
            };

            let init = if self.match_token(&Token::Eq(self.current_location())) {
                let eq_loc = self.previous_location();
                let rhs = self.parse_expression()?;
                Some(Box::new(AstNode::Assignment {
                    lhs: Box::new(AstNode::local(&var, loc)),
                    rhs: Box::new(rhs),
                    location: eq_loc,
                }))
            } else {
                None
            };

            decls.push(AstNode::VarDecl {
                name,
                init,
                location: loc,
            });

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        self.expect_semicolon("after variable declaration")?;

        if decls.len() == 1 {
            Ok(decls.remove(0))
        } else {
            Ok(AstNode::Block {
                statements: decls,
                location: decl_loc,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{ParseError, Parser};
    use crate::type_system::Type;

    fn body_of(source: &str) -> Vec<AstNode> {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        match program.nodes.into_iter().next() {
            Some(AstNode::FunctionDef { body, .. }) => body,
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_if_else() {
        let body = body_of("int main() { int x; if (x > 0) return 1; else return 0; }");

        match &body[1] {
            AstNode::If {
                condition,
                else_branch,
                ..
            } => {
                assert!(matches!(
                    **condition,
                    AstNode::BinaryOp { op: BinOp::Gt, .. }
                ));
                assert!(else_branch.is_some());
            }
            other => panic!("Expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_declaration_initializer_is_assignment() {
        let body = body_of("int main() { char c = 'a'; return c; }");

        match &body[0] {
            AstNode::VarDecl {
                name,
                init: Some(init),
                ..
            } => {
                assert_eq!(name, "c");
                match &**init {
                    AstNode::Assignment { lhs, rhs, .. } => {
                        assert!(matches!(
                            **lhs,
                            AstNode::LocalVar { ty: Type::Char, offset: -4, .. }
                        ));
                        assert!(matches!(**rhs, AstNode::IntLiteral(97, _)));
                    }
                    other => panic!("Expected assignment, got {:?}", other),
                }
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_declarator_list() {
        let body = body_of("int main() { int a, *p, b[4]; return 0; }");

        match &body[0] {
            AstNode::Block { statements, .. } => assert_eq!(statements.len(), 3),
            other => panic!("Expected block of declarations, got {:?}", other),
        }
    }

    #[test]
    fn test_for_with_declaration() {
        let body = body_of("int main() { for (int i = 0; i < 3; i++) ; return 0; }");

        match &body[0] {
            AstNode::For {
                init,
                condition,
                increment,
                ..
            } => {
                assert!(matches!(init.as_deref(), Some(AstNode::VarDecl { .. })));
                assert!(condition.is_some());
                assert!(matches!(
                    increment.as_deref(),
                    Some(AstNode::IncDec {
                        kind: IncDec::PostInc,
                        ..
                    })
                ));
            }
            other => panic!("Expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn test_flat_namespace_keeps_inner_names() {
        // `y` is declared inside the block and still visible after it
        let body = body_of("int main() { { int y; y = 1; } return y; }");

        match &body[1] {
            AstNode::Return { expr: Some(expr), .. } => {
                assert!(matches!(**expr, AstNode::LocalVar { offset: -4, .. }));
            }
            other => panic!("Expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_redeclaration_same_type_reuses_slot() {
        let source = "int main() { { int i; } { int i; i = 2; } return 0; }";
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        match &program.nodes[0] {
            AstNode::FunctionDef { locals, .. } => assert_eq!(locals.len(), 1),
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_conflicting_redeclaration() {
        let err = Parser::new("int main() { int i; char *i; return 0; }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(matches!(err, ParseError::ConflictingDeclaration { .. }));
        assert_eq!(
            err.to_string(),
            "Parse error at line 1, column 27: 'i' redeclared as 'char*', previously 'int'"
        );
    }

    #[test]
    fn test_missing_paren() {
        let err = Parser::new("int main() { while (1 { } }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(matches!(err, ParseError::Expected { .. }));
    }
}
