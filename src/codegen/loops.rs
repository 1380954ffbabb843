//! Loop lowering (`while`, `for`) and the `break`/`continue` jumps.
//!
//! Each loop pushes its [`LoopLabels`] before lowering its body and pops them
//! afterwards, so `break` and `continue` always target the innermost loop.
//!
//! Label shapes:
//!
//! ```text
//! while:  .L_begin_N: .LcontinueN:  cond  body  j .L_begin_N  .LbreakN:
//! for:    init  .L_begin_N:  cond  body  .LcontinueM:  incr  j .L_begin_N  .LbreakN:
//! ```

use crate::codegen::errors::{
    BreakOutsideLoopSnafu, CodegenError, ContinueOutsideLoopSnafu, LoopStackUnderflowSnafu,
};
use crate::codegen::generator::{CodeGenerator, LoopLabels};
use crate::parser::ast::{AstNode, SourceLocation};
use snafu::OptionExt;

impl CodeGenerator<'_> {
    pub(crate) fn gen_while(
        &mut self,
        condition: &AstNode,
        body: &AstNode,
    ) -> Result<(), CodegenError> {
        let seq = self.next_label();
        self.loop_labels.push(LoopLabels {
            break_label: seq,
            continue_label: seq,
        });

        self.emit_label(format!(".L_begin_{seq}"));
        self.emit_label(format!(".Lcontinue{seq}"));
        self.gen_expr(condition)?;
        self.pop("$t0");
        self.emit(format!("beq $t0, $zero, .Lbreak{seq}"));

        self.gen_statement(body)?;
        self.emit(format!("j .L_begin_{seq}"));
        self.emit_label(format!(".Lbreak{seq}"));

        self.exit_loop()
    }

    /// `continue` in a `for` body must still run the increment, so it gets
    /// its own label id.
    pub(crate) fn gen_for(
        &mut self,
        init: Option<&AstNode>,
        condition: Option<&AstNode>,
        increment: Option<&AstNode>,
        body: &AstNode,
    ) -> Result<(), CodegenError> {
        let seq = self.next_label();
        let cont = self.next_label();
        self.loop_labels.push(LoopLabels {
            break_label: seq,
            continue_label: cont,
        });

        if let Some(init) = init {
            self.gen_statement(init)?;
        }

        self.emit_label(format!(".L_begin_{seq}"));
        if let Some(condition) = condition {
            self.gen_expr(condition)?;
            self.pop("$t0");
            self.emit(format!("beq $t0, $zero, .Lbreak{seq}"));
        }

        self.gen_statement(body)?;

        self.emit_label(format!(".Lcontinue{cont}"));
        if let Some(increment) = increment {
            self.gen_expr(increment)?;
            self.pop("$t0");
        }
        self.emit(format!("j .L_begin_{seq}"));
        self.emit_label(format!(".Lbreak{seq}"));

        self.exit_loop()
    }

    pub(crate) fn gen_break(&mut self, location: SourceLocation) -> Result<(), CodegenError> {
        let labels = self
            .loop_labels
            .last()
            .copied()
            .context(BreakOutsideLoopSnafu { location })?;
        self.emit(format!("j .Lbreak{}", labels.break_label));
        Ok(())
    }

    pub(crate) fn gen_continue(&mut self, location: SourceLocation) -> Result<(), CodegenError> {
        let labels = self
            .loop_labels
            .last()
            .copied()
            .context(ContinueOutsideLoopSnafu { location })?;
        self.emit(format!("j .Lcontinue{}", labels.continue_label));
        Ok(())
    }

    fn exit_loop(&mut self) -> Result<(), CodegenError> {
        self.loop_labels.pop().context(LoopStackUnderflowSnafu)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::errors::CodegenError;
    use crate::codegen::generator::CodeGenerator;
    use crate::parser::Parser;

    fn compile(source: &str) -> Result<String, CodegenError> {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        CodeGenerator::new(&program.symbols).generate(&program)
    }

    #[test]
    fn test_while_layout() {
        let asm = compile("int main() { int i; while (i < 3) i++; return i; }").unwrap();
        assert!(asm.contains(".L_begin_0:\n.Lcontinue0:\n"));
        assert!(asm.contains("\tbeq $t0, $zero, .Lbreak0\n"));
        assert!(asm.contains("\tj .L_begin_0\n.Lbreak0:\n"));
    }

    #[test]
    fn test_for_continue_runs_increment() {
        let asm = compile(
            "int main() { int s; for (int i = 0; i < 5; i++) { if (i == 2) continue; s += i; } return s; }",
        )
        .unwrap();

        // Loop takes ids 0 and 1, the if takes 2
        assert!(asm.contains("\tj .Lcontinue1\n"));
        let cont = asm.find(".Lcontinue1:\n").unwrap();
        let back = asm.find("\tj .L_begin_0\n").unwrap();
        let jump = asm.find("\tj .Lcontinue1\n").unwrap();
        assert!(jump < cont && cont < back);
        assert!(asm.contains("\tj .L_begin_0\n.Lbreak0:\n"));
    }

    #[test]
    fn test_for_without_condition() {
        let asm = compile("int main() { for (;;) break; return 0; }").unwrap();
        assert!(asm.contains(".L_begin_0:\n\tj .Lbreak0\n.Lcontinue1:\n\tj .L_begin_0\n.Lbreak0:\n"));
    }

    #[test]
    fn test_break_targets_innermost_loop() {
        let asm = compile(
            "int main() { while (1) { while (1) { break; } break; } return 0; }",
        )
        .unwrap();
        let inner = asm.find(".L_begin_1:").unwrap();
        let inner_end = asm.find(".Lbreak1:").unwrap();
        let inner_break = asm.find("\tj .Lbreak1\n").unwrap();
        assert!(inner < inner_break && inner_break < inner_end);
        // The outer break comes after the inner loop closes
        let outer_break = asm.find("\tj .Lbreak0\n").unwrap();
        assert!(outer_break > inner_end);
    }

    #[test]
    fn test_break_outside_loop_is_internal_error() {
        use crate::parser::ast::{AstNode, SourceLocation};
        use crate::symbols::SymbolTable;

        let symbols = SymbolTable::new();
        let mut generator = CodeGenerator::new(&symbols);
        let err = generator
            .gen_statement(&AstNode::Break {
                location: SourceLocation::new(2, 5, 10),
            })
            .unwrap_err();
        assert!(matches!(err, CodegenError::BreakOutsideLoop { .. }));
        assert!(err.is_internal());
    }
}
