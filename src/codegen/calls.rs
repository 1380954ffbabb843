//! Calls to user-defined functions
//!
//! Arguments are evaluated left to right onto the operand stack, then loaded
//! into `$a0`..`$a3` in the same order and dropped before the `jal`. The
//! callee's result comes back in `$v0` and is pushed like any other value.

use crate::codegen::constants::{ARG_REGS, MAX_REG_ARGS, WORD_SIZE};
use crate::codegen::errors::{
    ArgumentCountMismatchSnafu, CodegenError, TooManyArgumentsSnafu, UndefinedFunctionSnafu,
};
use crate::codegen::generator::CodeGenerator;
use crate::parser::ast::{AstNode, SourceLocation};
use snafu::{ensure, OptionExt};

impl CodeGenerator<'_> {
    pub(crate) fn gen_call(
        &mut self,
        name: &str,
        args: &[AstNode],
        location: SourceLocation,
    ) -> Result<(), CodegenError> {
        let symbols = self.symbols;
        let sig = symbols
            .functions
            .get(name)
            .context(UndefinedFunctionSnafu { name, location })?;

        let argc = args.len();
        ensure!(
            argc <= MAX_REG_ARGS,
            TooManyArgumentsSnafu {
                function: name,
                count: argc,
                location,
            }
        );
        ensure!(
            argc == sig.param_count,
            ArgumentCountMismatchSnafu {
                function: name,
                expected: sig.param_count,
                got: argc,
                location,
            }
        );

        for arg in args {
            self.gen_expr(arg)?;
        }

        // The first argument is the deepest on the stack
        for (i, reg) in ARG_REGS.iter().enumerate().take(argc) {
            self.emit(format!("lw {reg}, {}($sp)", (argc - 1 - i) * WORD_SIZE));
        }
        if argc > 0 {
            self.emit(format!("addiu $sp, $sp, {}", argc * WORD_SIZE));
        }

        self.emit(format!("jal {name}"));
        self.emit("nop");
        self.push("$v0");
        Ok(())
    }
}
