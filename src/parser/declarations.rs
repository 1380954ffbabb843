//! Declaration parsing implementation
//!
//! This module handles parsing of top-level declarations in C programs:
//!
//! - Struct definitions: `struct Name { ... };`
//! - Global variables: `int g, *p, buf[16];`, scalars may take `= constant`
//! - Function definitions: `type name(params) { ... }`
//! - Type parsing: base types, pointers, array dimensions
//!
//! # Grammar
//!
//! ```text
//! declaration  ::= struct_def | global_decl | function_def
//! struct_def   ::= "struct" identifier "{" (base_type declarator ("," declarator)* ";")* "}" ";"
//! global_decl  ::= base_type declarator ("=" constant)? ("," declarator ("=" constant)?)* ";"
//! function_def ::= base_type "*"* identifier "(" params ")" "{" statements "}"
//! declarator   ::= "*"* identifier ("[" constant "]")*
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::codegen::constants::MAX_OBJECT_SIZE;
use crate::parser::ast::*;
use crate::parser::lexer::Token;
use crate::parser::parse::*;
use crate::symbols::{FunctionSig, LVar};
use crate::type_system::Type;
use snafu::{ensure, OptionExt};

impl Parser {
    /// Parse a top-level declaration
    ///
    /// Returns the function node for a function definition. Struct and global
    /// declarations are recorded in the symbol table and yield `None`.
    pub(crate) fn parse_top_level_declaration(&mut self) -> Result<Option<AstNode>, ParseError> {
        // struct Name { ... };           <- struct definition
        // struct Name var; / func(...)   <- declaration using the struct type
        if self.check(&Token::Struct(self.current_location()))
            && matches!(self.peek_ahead(1), Some(Token::Ident(_, _)))
            && matches!(self.peek_ahead(2), Some(Token::LBrace(_)))
        {
            self.advance(); // consume 'struct'
            self.parse_struct_definition()?;
            return Ok(None);
        }

        // Parse the type prefix and the first name, then decide between a
        // function and a variable by the next token.
        let start = self.position;
        let base = self.parse_base_type()?;
        let (name, ty, loc) = self.parse_declarator_name(&base)?;

        if self.check(&Token::LParen(self.current_location())) {
            self.position = start;
            return self.parse_function_definition().map(Some);
        }

        self.parse_global_declaration(&base, name, ty, loc)?;
        Ok(None)
    }

    /// Parse struct definition: struct Name { fields };
    pub(crate) fn parse_struct_definition(&mut self) -> Result<(), ParseError> {
        let name = self.expect_identifier()?;
        let loc = self.previous_location();

        if self.symbols.find_struct(&name).is_some() {
            return RedefinitionSnafu {
                kind: "struct",
                name,
                location: loc,
            }
            .fail();
        }

        self.expect_lbrace("after struct name")?;

        let mut fields: Vec<(String, Type)> = Vec::new();
        while !self.check(&Token::RBrace(self.current_location())) && !self.is_at_end() {
            let base = self.parse_base_type()?;
            loop {
                let (field_name, field_type, field_loc) = self.parse_declarator(&base)?;
                self.check_object_type(&field_name, &field_type, field_loc)?;

                if fields.iter().any(|(existing, _)| *existing == field_name) {
                    return RedefinitionSnafu {
                        kind: "member",
                        name: field_name,
                        location: field_loc,
                    }
                    .fail();
                }
                fields.push((field_name, field_type));

                if !self.match_token(&Token::Comma(self.current_location())) {
                    break;
                }
            }
            self.expect_semicolon("after struct member")?;
        }

        self.expect_rbrace("after struct members")?;
        self.expect_semicolon("after struct definition")?;

        let size = self.symbols.define_struct(&name, fields);
        ensure!(
            size <= MAX_OBJECT_SIZE,
            ObjectTooLargeSnafu {
                name: format!("struct {name}"),
                location: loc,
            }
        );
        Ok(())
    }

    /// Parse the rest of a global declaration whose first declarator has
    /// already been read up to (not including) its array dimensions.
    fn parse_global_declaration(
        &mut self,
        base: &Type,
        mut name: String,
        mut ty: Type,
        mut loc: SourceLocation,
    ) -> Result<(), ParseError> {
        loop {
            ty = self.parse_array_dims(ty)?;
            self.check_object_type(&name, &ty, loc)?;

            if self.symbols.find_global(&name).is_some()
                || self.symbols.functions.contains_key(&name)
            {
                return RedefinitionSnafu {
                    kind: "global",
                    name,
                    location: loc,
                }
                .fail();
            }

            let init = if self.match_token(&Token::Eq(self.current_location())) {
                let init_loc = self.current_location();
                if ty.is_aggregate() {
                    return AggregateInitializerSnafu {
                        name,
                        location: init_loc,
                    }
                    .fail();
                }
                let expr = self.parse_expression()?;
                match fold_constant(&expr) {
                    Some(value) => Some(value),
                    None => {
                        return NonConstantInitializerSnafu {
                            name,
                            location: init_loc,
                        }
                        .fail()
                    }
                }
            } else {
                None
            };

            self.symbols.declare_global(&name, ty, init);

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
            (name, ty, loc) = self.parse_declarator_name(base)?;
        }

        self.expect_semicolon("after global declaration")
    }

    /// Parse function definition: type name(params) { body }
    pub(crate) fn parse_function_definition(&mut self) -> Result<AstNode, ParseError> {
        let base = self.parse_base_type()?;
        let return_type = self.parse_pointers(base);
        let name = self.expect_identifier()?;
        let loc = self.previous_location();

        if return_type.struct_name().is_some() {
            return StructByValueSnafu {
                name,
                location: loc,
            }
            .fail();
        }
        if self.symbols.functions.contains_key(&name) || self.symbols.find_global(&name).is_some()
        {
            return RedefinitionSnafu {
                kind: "function",
                name,
                location: loc,
            }
            .fail();
        }

        self.expect_lparen("after function name")?;

        self.symbols.begin_function();
        let params = self.parse_parameter_list()?;

        self.expect_rparen("after parameters")?;

        // Registered before the body so that the function may call itself
        self.symbols.functions.insert(
            name.clone(),
            FunctionSig {
                param_count: params.len(),
                return_type,
            },
        );

        self.expect_lbrace("before function body")?;
        let body = self.parse_block_statements()?;
        self.expect_rbrace("after function body")?;

        let locals = self.symbols.end_function();

        Ok(AstNode::FunctionDef {
            name,
            params,
            body,
            locals,
            location: loc,
        })
    }

    /// Parse parameter list: (type name, type name, ...)
    ///
    /// Each parameter is declared as a local, so parameters take the first
    /// frame slots in order.
    pub(crate) fn parse_parameter_list(&mut self) -> Result<Vec<LVar>, ParseError> {
        let mut params = Vec::new();

        if self.check(&Token::RParen(self.current_location())) {
            return Ok(params);
        }

        // Special case: (void) means no parameters in C
        if self.check(&Token::Void(self.current_location()))
            && matches!(self.peek_ahead(1), Some(Token::RParen(_)))
        {
            self.advance(); // consume 'void'
            return Ok(params);
        }

        loop {
            let base = self.parse_base_type()?;
            let (param_name, param_type, param_loc) = self.parse_declarator_name(&base)?;
            let param_type = self.parse_parameter_dims(param_type)?;

            if param_type == Type::Void {
                return VoidVariableSnafu {
                    name: param_name,
                    location: param_loc,
                }
                .fail();
            }
            if param_type.struct_name().is_some() {
                return StructByValueSnafu {
                    name: param_name,
                    location: param_loc,
                }
                .fail();
            }
            if self.symbols.find_local(&param_name).is_some() {
                return RedefinitionSnafu {
                    kind: "parameter",
                    name: param_name,
                    location: param_loc,
                }
                .fail();
            }

            let param = self
                .symbols
                .declare_local(&param_name, param_type)
                .context(FrameTooLargeSnafu {
                    name: &param_name,
                    location: param_loc,
                })?;
            params.push(param);

            if !self.match_token(&Token::Comma(self.current_location())) {
                break;
            }
        }

        Ok(params)
    }

    /// Parse a base type: int | char | void | struct Name
    pub(crate) fn parse_base_type(&mut self) -> Result<Type, ParseError> {
        if self.match_token(&Token::Int(self.current_location())) {
            Ok(Type::Int)
        } else if self.match_token(&Token::Char(self.current_location())) {
            Ok(Type::Char)
        } else if self.match_token(&Token::Void(self.current_location())) {
            Ok(Type::Void)
        } else if self.match_token(&Token::Struct(self.current_location())) {
            let name = self.expect_identifier()?;
            Ok(Type::Struct(name))
        } else {
            ExpectedSnafu {
                message: "Expected type",
                found: self.peek().to_string(),
                location: self.current_location(),
            }
            .fail()
        }
    }

    /// Wrap `ty` in one pointer level per `*`
    pub(crate) fn parse_pointers(&mut self, mut ty: Type) -> Type {
        while self.match_token(&Token::Star(self.current_location())) {
            ty = Type::pointer_to(ty);
        }
        ty
    }

    /// Parse `*`* identifier, stopping before any array dimensions
    pub(crate) fn parse_declarator_name(
        &mut self,
        base: &Type,
    ) -> Result<(String, Type, SourceLocation), ParseError> {
        let ty = self.parse_pointers(base.clone());
        let name = self.expect_identifier()?;
        Ok((name, ty, self.previous_location()))
    }

    /// Parse a complete declarator: `*`* identifier [N]*
    pub(crate) fn parse_declarator(
        &mut self,
        base: &Type,
    ) -> Result<(String, Type, SourceLocation), ParseError> {
        let (name, ty, loc) = self.parse_declarator_name(base)?;
        let ty = self.parse_array_dims(ty)?;
        Ok((name, ty, loc))
    }

    /// Parse trailing [N][M]... dimensions; `int m[2][3]` is an array of two
    /// `int[3]`.
    pub(crate) fn parse_array_dims(&mut self, ty: Type) -> Result<Type, ParseError> {
        let mut dims = Vec::new();
        while self.match_token(&Token::LBracket(self.current_location())) {
            dims.push(self.parse_array_size()?);
        }

        Ok(dims
            .into_iter()
            .rev()
            .fold(ty, |element, len| Type::array_of(element, len)))
    }

    /// Parameter dimensions: the first may be empty, and the outermost array
    /// decays to a pointer either way.
    fn parse_parameter_dims(&mut self, ty: Type) -> Result<Type, ParseError> {
        if !self.match_token(&Token::LBracket(self.current_location())) {
            return Ok(ty);
        }

        if !self.match_token(&Token::RBracket(self.current_location())) {
            self.parse_array_size()?;
        }

        let element = self.parse_array_dims(ty)?;
        Ok(Type::pointer_to(element))
    }

    /// Parse a constant array length and the closing `]`
    fn parse_array_size(&mut self) -> Result<usize, ParseError> {
        let loc = self.current_location();
        let size_expr = self.parse_expression()?;
        let len = match fold_constant(&size_expr) {
            Some(n) if n > 0 => n as usize,
            _ => return InvalidArraySizeSnafu { location: loc }.fail(),
        };
        self.expect_rbracket("after array size")?;
        Ok(len)
    }

    /// Reject object types that cannot be allocated: plain `void`, structs
    /// that are not defined yet and anything too big to address.
    pub(crate) fn check_object_type(
        &self,
        name: &str,
        ty: &Type,
        location: SourceLocation,
    ) -> Result<(), ParseError> {
        if *ty == Type::Void {
            return VoidVariableSnafu { name, location }.fail();
        }
        if let Some(struct_name) = self.symbols.undefined_struct_in(ty) {
            return UndefinedStructSnafu {
                name: struct_name,
                location,
            }
            .fail();
        }
        ensure!(
            self.symbols.size_of(ty) <= MAX_OBJECT_SIZE,
            ObjectTooLargeSnafu { name, location }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::AstNode;
    use crate::parser::parse::{ParseError, Parser};
    use crate::type_system::Type;

    fn parse(source: &str) -> Result<crate::parser::ast::Program, ParseError> {
        Parser::new(source)?.parse_program()
    }

    #[test]
    fn test_parameters_take_first_slots() {
        let program = parse("int f(int a, char c, int *p) { int x; return a; }").unwrap();

        match &program.nodes[0] {
            AstNode::FunctionDef { params, locals, .. } => {
                let offsets: Vec<i32> = params.iter().map(|p| p.offset).collect();
                assert_eq!(offsets, vec![-4, -8, -12]);
                assert_eq!(params[2].ty, Type::pointer_to(Type::Int));
                assert_eq!(locals.len(), 4);
                assert_eq!(locals[3].offset, -16);
            }
            _ => panic!("Expected function definition"),
        }
        assert_eq!(program.symbols.functions["f"].param_count, 3);
    }

    #[test]
    fn test_array_parameters_decay() {
        let program = parse("int sum(int a[], int m[][3], int n) { return n; }").unwrap();

        match &program.nodes[0] {
            AstNode::FunctionDef { params, .. } => {
                assert_eq!(params[0].ty, Type::pointer_to(Type::Int));
                assert_eq!(
                    params[1].ty,
                    Type::pointer_to(Type::array_of(Type::Int, 3))
                );
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_void_parameter_list() {
        let program = parse("int main(void) { return 0; }").unwrap();
        assert_eq!(program.symbols.functions["main"].param_count, 0);
    }

    #[test]
    fn test_multidimensional_global() {
        let program = parse("int m[2][3];").unwrap();
        let ty = &program.symbols.globals[0].ty;
        assert_eq!(*ty, Type::array_of(Type::array_of(Type::Int, 3), 2));
        assert_eq!(program.symbols.size_of(ty), 24);
    }

    #[test]
    fn test_self_referential_struct() {
        let program = parse("struct Node { int value; struct Node *next; };").unwrap();
        let node = program.symbols.find_struct("Node").unwrap();
        assert_eq!(node.size, 8);
        assert_eq!(node.find_member("next").map(|m| m.offset), Some(4));
    }

    #[test]
    fn test_struct_by_value_member_must_be_defined() {
        let err = parse("struct A { struct B b; };").unwrap_err();
        assert!(matches!(err, ParseError::UndefinedStruct { ref name, .. } if name == "B"));
    }

    #[test]
    fn test_global_initializer_must_be_constant() {
        let err = parse("int a = 1; int b = a;").unwrap_err();
        assert!(matches!(err, ParseError::NonConstantInitializer { ref name, .. } if name == "b"));
    }

    #[test]
    fn test_invalid_array_size() {
        let err = parse("int a[0];").unwrap_err();
        assert!(matches!(err, ParseError::InvalidArraySize { .. }));
    }

    #[test]
    fn test_objects_must_fit_the_target() {
        let err = parse("int a[2147483647][2147483647][2147483647];").unwrap_err();
        assert!(matches!(err, ParseError::ObjectTooLarge { ref name, .. } if name == "a"));

        let err = parse("int main() { int a[1073741824]; int x; x = 1; return x; }").unwrap_err();
        assert!(matches!(err, ParseError::ObjectTooLarge { ref name, .. } if name == "a"));

        let err = parse("struct S { char a[2000000000]; char b[2000000000]; };").unwrap_err();
        assert!(matches!(err, ParseError::ObjectTooLarge { ref name, .. } if name == "struct S"));

        let err = parse("int main() { return sizeof(int[1073741824]); }").unwrap_err();
        assert!(matches!(err, ParseError::ObjectTooLarge { .. }));
    }

    #[test]
    fn test_frame_must_fit_the_target() {
        let err = parse("int main() { char a[2000000000]; char b[2000000000]; return 0; }")
            .unwrap_err();
        assert!(matches!(err, ParseError::FrameTooLarge { ref name, .. } if name == "b"));

        // Large but addressable
        let program = parse("char big[2000000000]; int main() { char a[2000000000]; return 0; }")
            .unwrap();
        assert_eq!(program.symbols.size_of(&program.symbols.globals[0].ty), 2000000000);
    }

    #[test]
    fn test_void_variable() {
        let err = parse("void v;").unwrap_err();
        assert!(matches!(err, ParseError::VoidVariable { .. }));
    }

    #[test]
    fn test_duplicate_global() {
        let err = parse("int x; char x;").unwrap_err();
        assert!(matches!(err, ParseError::Redefinition { kind: "global", .. }));
    }
}
