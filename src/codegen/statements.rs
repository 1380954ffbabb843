//! Statement lowering
//!
//! Every statement leaves the operand stack exactly as it found it:
//! expression values are popped once they are no longer needed.
//!
//! Loops and the jumps that target them live in [`super::loops`].

use crate::codegen::errors::{CodegenError, UnexpectedNodeSnafu};
use crate::codegen::generator::CodeGenerator;
use crate::parser::ast::AstNode;
use log::trace;

impl CodeGenerator<'_> {
    pub(crate) fn gen_statement(&mut self, stmt: &AstNode) -> Result<(), CodegenError> {
        trace!("statement at {}", stmt.location());

        match stmt {
            AstNode::VarDecl { init, .. } => {
                // Storage was reserved in the prologue; only the initializer runs here
                if let Some(init) = init {
                    self.gen_expr(init)?;
                    self.pop("$t0");
                }
                Ok(())
            }

            AstNode::ExpressionStatement { expr, .. } => {
                self.gen_expr(expr)?;
                self.pop("$t0");
                Ok(())
            }

            AstNode::Block { statements, .. } => {
                for stmt in statements {
                    self.gen_statement(stmt)?;
                }
                Ok(())
            }

            AstNode::Return { expr, .. } => {
                match expr {
                    Some(expr) => {
                        self.gen_expr(expr)?;
                        self.pop("$v0");
                    }
                    None => self.emit("li $v0, 0"),
                }
                self.emit_epilogue();
                Ok(())
            }

            AstNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => self.gen_if(condition, then_branch, else_branch.as_deref()),

            AstNode::While {
                condition, body, ..
            } => self.gen_while(condition, body),

            AstNode::For {
                init,
                condition,
                increment,
                body,
                ..
            } => self.gen_for(
                init.as_deref(),
                condition.as_deref(),
                increment.as_deref(),
                body,
            ),

            AstNode::Break { location } => self.gen_break(*location),
            AstNode::Continue { location } => self.gen_continue(*location),

            AstNode::FunctionDef { location, .. } => UnexpectedNodeSnafu {
                location: *location,
            }
            .fail(),

            // A bare expression in statement position
            expr => {
                self.gen_expr(expr)?;
                self.pop("$t0");
                Ok(())
            }
        }
    }

    fn gen_if(
        &mut self,
        condition: &AstNode,
        then_branch: &AstNode,
        else_branch: Option<&AstNode>,
    ) -> Result<(), CodegenError> {
        let seq = self.next_label();

        self.gen_expr(condition)?;
        self.pop("$t0");

        match else_branch {
            Some(else_branch) => {
                self.emit(format!("beq $t0, $zero, .L_else_{seq}"));
                self.gen_statement(then_branch)?;
                self.emit(format!("j .L_end_{seq}"));
                self.emit_label(format!(".L_else_{seq}"));
                self.gen_statement(else_branch)?;
            }
            None => {
                self.emit(format!("beq $t0, $zero, .L_end_{seq}"));
                self.gen_statement(then_branch)?;
            }
        }

        self.emit_label(format!(".L_end_{seq}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::generator::CodeGenerator;
    use crate::parser::Parser;

    fn compile(source: &str) -> String {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        CodeGenerator::new(&program.symbols)
            .generate(&program)
            .unwrap()
    }

    #[test]
    fn test_if_else_labels() {
        let asm = compile("int main() { int x; if (x) x = 1; else x = 2; return x; }");
        assert!(asm.contains("\tbeq $t0, $zero, .L_else_0\n"));
        assert!(asm.contains("\tj .L_end_0\n.L_else_0:\n"));
        assert!(asm.contains(".L_end_0:\n"));
    }

    #[test]
    fn test_if_without_else_branches_to_end() {
        let asm = compile("int main() { int x; if (x) x = 1; return x; }");
        assert!(asm.contains("\tbeq $t0, $zero, .L_end_0\n"));
        assert!(!asm.contains(".L_else_"));
    }

    #[test]
    fn test_return_without_value() {
        let asm = compile("void f() { return; } int main() { f(); return 0; }");
        let f = asm.split("f:\n").nth(1).unwrap();
        assert!(f.contains("\tli $v0, 0\n\tlw $ra, 4($s8)\n"));
    }

    #[test]
    fn test_declaration_without_initializer_emits_nothing() {
        let with_decl = compile("int main() { int x; return 0; }");
        let without = compile("int main() { return 0; }");
        // Only the frame size differs
        assert_eq!(with_decl.lines().count(), without.lines().count());
    }

    #[test]
    fn test_statements_balance_the_operand_stack() {
        let asm = compile("int main() { int x; x = 1; x + 2; { x = x * 3; } return x; }");
        let body = asm.split("main:\n").nth(1).unwrap();
        let pushes = body.matches("addiu $sp, $sp, -4\n").count();
        let pops = body.matches("addiu $sp, $sp, 4\n").count();
        assert_eq!(pushes, pops);
    }
}
