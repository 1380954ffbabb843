//! Expression parsing implementation
//!
//! This module handles parsing of C expressions by recursive descent, one
//! method per precedence level.
//!
//! # Supported Expressions
//!
//! - Literals: integers, characters (as their code), strings
//! - Variables, resolved to locals first and globals second
//! - Binary operators: arithmetic, comparison, logical `&&`/`||`
//! - Unary operators: `-`, `+`, `!`, `&`, `*`, `++`, `--`
//! - Postfix: `[]`, `.`, `->`, `++`, `--`
//! - Ternary: `? :`
//! - Calls to user functions and to the inline builtins
//! - `sizeof`, folded to an integer literal here
//!
//! # Desugaring
//!
//! A few forms are rewritten so the code generator has one path each:
//! - `a[i]` becomes `*(a + i)`
//! - `p->m` becomes `(*p).m`
//! - `-x` becomes `0 - x`
//!
//! # Precedence
//!
//! Low to high: assignment, ternary, `||`, `&&`, equality, relational,
//! additive, multiplicative, unary, postfix, primary.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::codegen::constants::MAX_OBJECT_SIZE;
use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::*;
use crate::type_system::inference::get_type;
use crate::type_system::Type;
use snafu::ensure;

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        self.parse_assignment()
    }

    /// Parse assignment or ternary (right-associative)
    fn parse_assignment(&mut self) -> Result<AstNode, ParseError> {
        let expr = self.parse_ternary()?;

        // Check for assignment operators
        let loc = self.current_location();
        if self.match_token(&Token::Eq(loc)) {
            ensure_lvalue(&expr)?;
            let rhs = Box::new(self.parse_assignment()?);
            return Ok(AstNode::Assignment {
                lhs: Box::new(expr),
                rhs,
                location: loc,
            });
        }

        // Compound assignments
        let compound_op = if self.match_token(&Token::PlusEq(loc)) {
            Some(BinOp::Add)
        } else if self.match_token(&Token::MinusEq(loc)) {
            Some(BinOp::Sub)
        } else if self.match_token(&Token::StarEq(loc)) {
            Some(BinOp::Mul)
        } else if self.match_token(&Token::SlashEq(loc)) {
            Some(BinOp::Div)
        } else {
            None
        };

        if let Some(op) = compound_op {
            ensure_lvalue(&expr)?;
            let rhs = Box::new(self.parse_assignment()?);
            return Ok(AstNode::CompoundAssignment {
                op,
                lhs: Box::new(expr),
                rhs,
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Parse ternary: condition ? true_expr : false_expr
    fn parse_ternary(&mut self) -> Result<AstNode, ParseError> {
        let expr = self.parse_logical_or()?;

        if self.match_token(&Token::Question(self.current_location())) {
            let loc = self.previous_location();
            let true_expr = Box::new(self.parse_expression()?);
            self.expect_token(
                &Token::Colon(self.current_location()),
                "Expected ':' in ternary expression",
            )?;
            let false_expr = Box::new(self.parse_ternary()?);

            return Ok(AstNode::TernaryOp {
                condition: Box::new(expr),
                true_expr,
                false_expr,
                location: loc,
            });
        }

        Ok(expr)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.match_token(&Token::OrOr(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_logical_and()?);
            left = AstNode::LogicalOp {
                op: LogicalOp::Or,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_equality()?;

        while self.match_token(&Token::AndAnd(self.current_location())) {
            let loc = self.previous_location();
            let right = Box::new(self.parse_equality()?);
            left = AstNode::LogicalOp {
                op: LogicalOp::And,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse equality (== !=)
    fn parse_equality(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_relational()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::EqEq(loc)) {
                BinOp::Eq
            } else if self.match_token(&Token::NotEq(loc)) {
                BinOp::Ne
            } else {
                break;
            };

            let right = self.parse_relational()?;
            left = AstNode::binary(op, left, right, loc);
        }

        Ok(left)
    }

    /// Parse relational (< <= > >=)
    fn parse_relational(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Lt(loc)) {
                BinOp::Lt
            } else if self.match_token(&Token::Le(loc)) {
                BinOp::Le
            } else if self.match_token(&Token::Gt(loc)) {
                BinOp::Gt
            } else if self.match_token(&Token::Ge(loc)) {
                BinOp::Ge
            } else {
                break;
            };

            let right = self.parse_additive()?;
            left = AstNode::binary(op, left, right, loc);
        }

        Ok(left)
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Plus(loc)) {
                BinOp::Add
            } else if self.match_token(&Token::Minus(loc)) {
                BinOp::Sub
            } else {
                break;
            };

            let right = self.parse_multiplicative()?;
            left = AstNode::binary(op, left, right, loc);
        }

        Ok(left)
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let loc = self.current_location();
            let op = if self.match_token(&Token::Star(loc)) {
                BinOp::Mul
            } else if self.match_token(&Token::Slash(loc)) {
                BinOp::Div
            } else if self.match_token(&Token::Percent(loc)) {
                BinOp::Mod
            } else {
                break;
            };

            let right = self.parse_unary()?;
            left = AstNode::binary(op, left, right, loc);
        }

        Ok(left)
    }

    /// Parse unary (! - + & * ++ --)
    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        if self.match_token(&Token::Bang(loc)) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(AstNode::Not {
                operand,
                location: loc,
            });
        }

        if self.match_token(&Token::Minus(loc)) {
            let operand = self.parse_unary()?;
            return Ok(AstNode::binary(
                BinOp::Sub,
                AstNode::int(0, loc),
                operand,
                loc,
            ));
        }

        if self.match_token(&Token::Plus(loc)) {
            // Unary plus: just return the operand
            return self.parse_unary();
        }

        if self.match_token(&Token::Amp(loc)) {
            let operand = self.parse_unary()?;
            ensure_lvalue(&operand)?;
            return Ok(AstNode::AddrOf {
                operand: Box::new(operand),
                location: loc,
            });
        }

        if self.match_token(&Token::Star(loc)) {
            let operand = self.parse_unary()?;
            return Ok(AstNode::deref(operand, loc));
        }

        if self.match_token(&Token::PlusPlus(loc)) {
            return self.inc_dec(IncDec::PreInc, loc);
        }

        if self.match_token(&Token::MinusMinus(loc)) {
            return self.inc_dec(IncDec::PreDec, loc);
        }

        self.parse_postfix()
    }

    fn inc_dec(&mut self, kind: IncDec, loc: SourceLocation) -> Result<AstNode, ParseError> {
        let operand = self.parse_unary()?;
        ensure_lvalue(&operand)?;
        Ok(AstNode::IncDec {
            kind,
            operand: Box::new(operand),
            location: loc,
        })
    }

    /// Parse postfix (++ -- [] . ->)
    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            if self.match_token(&Token::PlusPlus(loc)) {
                ensure_lvalue(&expr)?;
                expr = AstNode::IncDec {
                    kind: IncDec::PostInc,
                    operand: Box::new(expr),
                    location: loc,
                };
            } else if self.match_token(&Token::MinusMinus(loc)) {
                ensure_lvalue(&expr)?;
                expr = AstNode::IncDec {
                    kind: IncDec::PostDec,
                    operand: Box::new(expr),
                    location: loc,
                };
            } else if self.match_token(&Token::LBracket(loc)) {
                let index = self.parse_expression()?;
                self.expect_rbracket("after array index")?;
                expr = AstNode::deref(AstNode::binary(BinOp::Add, expr, index, loc), loc);
            } else if self.match_token(&Token::Dot(loc)) {
                let member = self.expect_identifier()?;
                expr = self.member_access(expr, &member, loc)?;
            } else if self.match_token(&Token::Arrow(loc)) {
                let member = self.expect_identifier()?;
                expr = self.member_access(AstNode::deref(expr, loc), &member, loc)?;
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Resolve `object.member` against the struct table
    fn member_access(
        &self,
        object: AstNode,
        member: &str,
        location: SourceLocation,
    ) -> Result<AstNode, ParseError> {
        let object_type = get_type(&object);
        let Some(struct_name) = object_type.struct_name() else {
            return NotAStructSnafu {
                ty: object_type.to_string(),
                location,
            }
            .fail();
        };

        let Some(def) = self.symbols.find_struct(struct_name) else {
            return UndefinedStructSnafu {
                name: struct_name,
                location,
            }
            .fail();
        };

        let Some(resolved) = def.find_member(member) else {
            return UndefinedMemberSnafu {
                struct_name,
                member,
                location,
            }
            .fail();
        };

        Ok(AstNode::MemberAccess {
            member: resolved.clone(),
            object: Box::new(object),
            location,
        })
    }

    /// Parse argument list: (expr, expr, ...)
    fn parse_argument_list(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut args = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse `sizeof ( type | expr )`, producing the size as a literal
    fn parse_sizeof(&mut self, loc: SourceLocation) -> Result<AstNode, ParseError> {
        self.expect_lparen("after 'sizeof'")?;

        let ty = if self.is_type_keyword() {
            let type_loc = self.current_location();
            let base = self.parse_base_type()?;
            let ty = self.parse_pointers(base);
            let ty = self.parse_array_dims(ty)?;
            if let Some(name) = self.symbols.undefined_struct_in(&ty) {
                return UndefinedStructSnafu {
                    name,
                    location: type_loc,
                }
                .fail();
            }
            ty
        } else {
            get_type(&self.parse_expression()?)
        };

        self.expect_rparen("after sizeof operand")?;

        let size = self.symbols.size_of(&ty);
        ensure!(
            size <= MAX_OBJECT_SIZE,
            ObjectTooLargeSnafu {
                name: ty.to_string(),
                location: loc,
            }
        );
        Ok(AstNode::int(size as i32, loc))
    }

    /// Parse primary (literals, variables, calls, sizeof, parenthesized expressions)
    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        match self.peek_token() {
            Token::IntLiteral(n, loc) | Token::CharLiteral(n, loc) => {
                self.advance();
                Ok(AstNode::IntLiteral(n, loc))
            }

            Token::StringLiteral(s, loc) => {
                self.advance();
                Ok(AstNode::StringLiteral(s, loc))
            }

            Token::Sizeof(loc) => {
                self.advance();
                self.parse_sizeof(loc)
            }

            Token::Ident(name, loc) => {
                self.advance();
                if self.match_token(&Token::LParen(self.current_location())) {
                    let args = self.parse_argument_list()?;
                    self.expect_rparen("after function arguments")?;
                    let ty = self
                        .symbols
                        .functions
                        .get(&name)
                        .map_or(Type::Int, |sig| sig.return_type.clone());
                    return call(name, args, ty, loc);
                }
                self.resolve_variable(&name, loc)
            }

            Token::LParen(_) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                Ok(expr)
            }

            _ => ExpectedSnafu {
                message: "Expected expression",
                found: self.peek().to_string(),
                location: loc,
            }
            .fail(),
        }
    }

    /// Look a name up: locals of the current function first, then globals
    fn resolve_variable(&self, name: &str, location: SourceLocation) -> Result<AstNode, ParseError> {
        if let Some(var) = self.symbols.find_local(name) {
            return Ok(AstNode::local(var, location));
        }
        if let Some(var) = self.symbols.find_global(name) {
            return Ok(AstNode::global(var, location));
        }
        UndefinedVariableSnafu { name, location }.fail()
    }
}

/// Build a call node. Builtin names always win over user functions and have
/// their argument count checked here; user calls are checked once every
/// function is known.
fn call(
    name: String,
    args: Vec<AstNode>,
    ty: Type,
    location: SourceLocation,
) -> Result<AstNode, ParseError> {
    let Some(builtin) = Builtin::from_name(&name) else {
        return Ok(AstNode::FunctionCall {
            name,
            args,
            ty,
            location,
        });
    };

    let (min, max) = builtin.arity();
    let accepted = args.len() >= min && max.map_or(true, |max| args.len() <= max);
    if !accepted {
        let expected = match max {
            Some(max) if max == min => min.to_string(),
            Some(max) => format!("{min} to {max}"),
            None => format!("at least {min}"),
        };
        return BuiltinAritySnafu {
            name: builtin.name(),
            expected,
            found: args.len(),
            location,
        }
        .fail();
    }

    Ok(AstNode::BuiltinCall {
        builtin,
        args,
        location,
    })
}

/// Only variables, dereferences and members have an address
fn ensure_lvalue(node: &AstNode) -> Result<(), ParseError> {
    match node {
        AstNode::LocalVar { .. }
        | AstNode::GlobalVar { .. }
        | AstNode::Deref { .. }
        | AstNode::MemberAccess { .. } => Ok(()),
        _ => NotAnLvalueSnafu {
            location: node.location(),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::{ParseError, Parser};
    use crate::type_system::inference::get_type;
    use crate::type_system::Type;

    /// Parse `source` as the body of `main` after `prelude` and return the
    /// expression of the last statement.
    fn last_expr(prelude: &str, body: &str) -> Result<AstNode, ParseError> {
        let source = format!("{prelude} int main() {{ {body} }}");
        let mut program = Parser::new(&source)?.parse_program()?;
        match program.nodes.pop() {
            Some(AstNode::FunctionDef { mut body, .. }) => match body.pop() {
                Some(AstNode::ExpressionStatement { expr, .. }) => Ok(*expr),
                Some(AstNode::Return { expr: Some(expr), .. }) => Ok(*expr),
                other => panic!("Expected expression statement, got {:?}", other),
            },
            other => panic!("Expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = last_expr("", "return 1 + 2 * 3;").unwrap();
        match expr {
            AstNode::BinaryOp {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(*right, AstNode::BinaryOp { op: BinOp::Mul, .. })),
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_index_desugars_to_deref_of_add() {
        let expr = last_expr("", "int a[3]; a[1];").unwrap();
        match expr {
            AstNode::Deref { operand, .. } => match *operand {
                AstNode::BinaryOp {
                    op: BinOp::Add,
                    left,
                    right,
                    ..
                } => {
                    assert!(matches!(*left, AstNode::LocalVar { .. }));
                    assert!(matches!(*right, AstNode::IntLiteral(1, _)));
                }
                other => panic!("Expected addition, got {:?}", other),
            },
            other => panic!("Expected dereference, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_desugars_to_member_of_deref() {
        let prelude = "struct P { int x; int y; };";
        let expr = last_expr(prelude, "struct P *p; p->y;").unwrap();
        match expr {
            AstNode::MemberAccess { object, member, .. } => {
                assert_eq!(member.offset, 4);
                assert!(matches!(*object, AstNode::Deref { .. }));
            }
            other => panic!("Expected member access, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_minus() {
        let expr = last_expr("", "return -5;").unwrap();
        assert!(matches!(
            expr,
            AstNode::BinaryOp { op: BinOp::Sub, ref left, .. } if matches!(**left, AstNode::IntLiteral(0, _))
        ));
    }

    #[test]
    fn test_sizeof_folds() {
        let prelude = "struct P { int x; char c; };";
        let cases = [
            ("return sizeof(int);", 4),
            ("return sizeof(char);", 1),
            ("return sizeof(int*);", 4),
            ("return sizeof(struct P);", 8),
            ("int a[5]; return sizeof(a);", 20),
            ("int a[5]; return sizeof(a[0]);", 4),
            ("char c; return sizeof(c + 1);", 4),
        ];

        for (body, size) in cases {
            let expr = last_expr(prelude, body).unwrap();
            assert!(
                matches!(expr, AstNode::IntLiteral(n, _) if n == size),
                "{body} should fold to {size}, got {:?}",
                expr
            );
        }
    }

    #[test]
    fn test_local_shadows_global() {
        let expr = last_expr("int x;", "char x; x;").unwrap();
        assert!(matches!(expr, AstNode::LocalVar { ty: Type::Char, .. }));

        let expr = last_expr("int g;", "g;").unwrap();
        assert!(matches!(expr, AstNode::GlobalVar { .. }));
    }

    #[test]
    fn test_builtin_and_user_calls() {
        let expr = last_expr("", "putchar(65);").unwrap();
        assert!(matches!(
            expr,
            AstNode::BuiltinCall {
                builtin: Builtin::Putchar,
                ..
            }
        ));

        let expr = last_expr("int f(int a) { return a; }", "f(1);").unwrap();
        assert!(matches!(expr, AstNode::FunctionCall { ref name, .. } if name == "f"));
    }

    #[test]
    fn test_call_takes_declared_return_type() {
        let expr = last_expr("char *name() { return \"x\"; }", "name();").unwrap();
        assert_eq!(get_type(&expr), Type::pointer_to(Type::Char));

        let expr = last_expr("char *name() { return \"x\"; }", "name() + 1;").unwrap();
        assert_eq!(get_type(&expr), Type::pointer_to(Type::Char));

        // Defined after the caller: nothing is known yet
        let source = "int main() { return later(); } char *later() { return 0; }";
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let AstNode::FunctionDef { body, .. } = &program.nodes[0] else {
            panic!("Expected function definition");
        };
        let AstNode::Return { expr: Some(call), .. } = &body[0] else {
            panic!("Expected return");
        };
        assert_eq!(get_type(call), Type::Int);
    }

    #[test]
    fn test_arrow_on_call_result() {
        let prelude = "struct P { int x; int y; }; struct P s; struct P *f() { return &s; }";
        let expr = last_expr(prelude, "f()->y;").unwrap();
        match expr {
            AstNode::MemberAccess { object, member, .. } => {
                assert_eq!(member.offset, 4);
                assert!(matches!(*object, AstNode::Deref { .. }));
            }
            other => panic!("Expected member access, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_arity() {
        let err = last_expr("", "strcmp(\"a\");").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Parse error at line 1, column 15: 'strcmp' expects 2 argument(s), got 1"
        );
        assert!(matches!(
            last_expr("", "printf();"),
            Err(ParseError::BuiltinArity { .. })
        ));
    }

    #[test]
    fn test_member_errors() {
        let prelude = "struct P { int x; };";
        assert!(matches!(
            last_expr(prelude, "struct P p; p.z;"),
            Err(ParseError::UndefinedMember { .. })
        ));
        assert!(matches!(
            last_expr(prelude, "int n; n.x;"),
            Err(ParseError::NotAStruct { .. })
        ));
        assert!(matches!(
            last_expr("", "struct Q *q; q->x;"),
            Err(ParseError::UndefinedStruct { .. })
        ));
    }

    #[test]
    fn test_not_an_lvalue() {
        assert!(matches!(
            last_expr("", "int x; x + 1 = 2;"),
            Err(ParseError::NotAnLvalue { .. })
        ));
        assert!(matches!(
            last_expr("", "3++;"),
            Err(ParseError::NotAnLvalue { .. })
        ));
    }

    #[test]
    fn test_ternary_and_logical() {
        let expr = last_expr("", "int a; int b; a && b ? 1 : a || b;").unwrap();
        match expr {
            AstNode::TernaryOp {
                condition,
                false_expr,
                ..
            } => {
                assert!(matches!(
                    *condition,
                    AstNode::LogicalOp {
                        op: LogicalOp::And,
                        ..
                    }
                ));
                assert!(matches!(
                    *false_expr,
                    AstNode::LogicalOp {
                        op: LogicalOp::Or,
                        ..
                    }
                ));
            }
            other => panic!("Expected ternary, got {:?}", other),
        }
    }
}
