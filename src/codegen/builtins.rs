//! Inline runtime for the built-in library routines
//!
//! `putchar`, `getchar`, `puts`, `strlen`, `strcmp`, `strcpy` and `printf`
//! are expanded at each call site into raw syscall sequences; nothing is
//! linked in.
//!
//! # Register use
//!
//! A `syscall` clobbers `$v0`, `$a0`..`$a3` and the `$t` registers, so
//! anything that must survive one lives in `$s0`..`$s4` or on the operand
//! stack. Bytes written to stdout are always staged with `sb` and written
//! from their own address, which keeps the output independent of byte order.
//!
//! # printf
//!
//! Only literal characters and `%d` are supported. A `%d` value is printed
//! by repeated `divu` by 10, pushing each digit on the operand stack and
//! then writing them back in reverse. Zero and negative values are handled
//! before the digit loop.

use crate::codegen::constants::{STDIN_FD, STDOUT_FD, SYS_READ, SYS_WRITE, WORD_SIZE};
use crate::codegen::errors::CodegenError;
use crate::codegen::generator::CodeGenerator;
use crate::parser::ast::{AstNode, Builtin};
use log::trace;

impl CodeGenerator<'_> {
    /// Evaluate the arguments left to right, then expand the routine. Leaves
    /// exactly one result word on the stack.
    pub(crate) fn gen_builtin(
        &mut self,
        builtin: Builtin,
        args: &[AstNode],
    ) -> Result<(), CodegenError> {
        for arg in args {
            self.gen_expr(arg)?;
        }

        let id = self.next_label();
        trace!("inline {} #{id}", builtin.name());

        match builtin {
            Builtin::Putchar => self.emit_putchar(),
            Builtin::Getchar => self.emit_getchar(id),
            Builtin::Puts => self.emit_puts(id),
            Builtin::Strlen => self.emit_strlen(id),
            Builtin::Strcmp => self.emit_strcmp(id),
            Builtin::Strcpy => self.emit_strcpy(id),
            Builtin::Printf => self.emit_printf(id, args.len()),
        }
        Ok(())
    }

    /// `$a0 = fd`, `$a1 = buf`, then the syscall. `$a2` must already hold
    /// the byte count.
    fn emit_io_syscall(&mut self, code: i32, fd: i32, buf: &str) {
        self.emit(format!("li $a0, {fd}"));
        self.emit(format!("move $a1, {buf}"));
        self.emit(format!("li $v0, {code}"));
        self.emit("syscall");
    }

    /// Write the single byte at `0(buf)` to stdout
    fn emit_write_byte(&mut self, buf: &str) {
        self.emit("li $a2, 1");
        self.emit_io_syscall(SYS_WRITE, STDOUT_FD, buf);
    }

    /// Write the low byte of `reg` through a temporary stack slot
    fn emit_write_reg_byte(&mut self, reg: &str) {
        self.emit("addiu $sp, $sp, -4");
        self.emit(format!("sb {reg}, 0($sp)"));
        self.emit_write_byte("$sp");
        self.emit("addiu $sp, $sp, 4");
    }

    /// Result: the character written
    fn emit_putchar(&mut self) {
        self.emit("lw $s0, 0($sp)");
        self.emit("sb $s0, 0($sp)");
        self.emit_write_byte("$sp");
        self.emit("sw $s0, 0($sp)");
    }

    /// Result: the byte read, or -1 on end of input or error
    fn emit_getchar(&mut self, id: usize) {
        self.push("$zero");
        self.emit("li $a2, 1");
        self.emit_io_syscall(SYS_READ, STDIN_FD, "$sp");
        self.emit(format!("bnez $a3, .L_getchar_eof_{id}"));
        self.emit(format!("blez $v0, .L_getchar_eof_{id}"));
        self.emit("lbu $t0, 0($sp)");
        self.emit(format!("j .L_getchar_end_{id}"));
        self.emit_label(format!(".L_getchar_eof_{id}"));
        self.emit("li $t0, -1");
        self.emit_label(format!(".L_getchar_end_{id}"));
        self.emit("sw $t0, 0($sp)");
    }

    /// Scan `$s1` forward from `$s0` to the terminating NUL
    fn emit_scan_to_nul(&mut self, routine: &str, id: usize) {
        self.emit("move $s1, $s0");
        self.emit_label(format!(".L_{routine}_scan_{id}"));
        self.emit("lbu $t0, 0($s1)");
        self.emit(format!("beqz $t0, .L_{routine}_found_{id}"));
        self.emit("addiu $s1, $s1, 1");
        self.emit(format!("j .L_{routine}_scan_{id}"));
        self.emit_label(format!(".L_{routine}_found_{id}"));
    }

    /// Writes the string and a newline. Result: 0
    fn emit_puts(&mut self, id: usize) {
        self.emit("lw $s0, 0($sp)");
        self.emit_scan_to_nul("puts", id);
        self.emit("subu $a2, $s1, $s0");
        self.emit_io_syscall(SYS_WRITE, STDOUT_FD, "$s0");

        self.emit("li $t0, 10");
        self.emit("sb $t0, 0($sp)");
        self.emit_write_byte("$sp");
        self.emit("sw $zero, 0($sp)");
    }

    fn emit_strlen(&mut self, id: usize) {
        self.emit("lw $s0, 0($sp)");
        self.emit_scan_to_nul("strlen", id);
        self.emit("subu $t0, $s1, $s0");
        self.emit("sw $t0, 0($sp)");
    }

    /// Result: difference of the first mismatching bytes, 0 when equal
    fn emit_strcmp(&mut self, id: usize) {
        self.emit("lw $s1, 0($sp)");
        self.emit("lw $s0, 4($sp)");
        self.emit("addiu $sp, $sp, 4");
        self.emit_label(format!(".L_strcmp_loop_{id}"));
        self.emit("lbu $t0, 0($s0)");
        self.emit("lbu $t1, 0($s1)");
        self.emit(format!("bne $t0, $t1, .L_strcmp_end_{id}"));
        self.emit(format!("beqz $t0, .L_strcmp_end_{id}"));
        self.emit("addiu $s0, $s0, 1");
        self.emit("addiu $s1, $s1, 1");
        self.emit(format!("j .L_strcmp_loop_{id}"));
        self.emit_label(format!(".L_strcmp_end_{id}"));
        self.emit("subu $t0, $t0, $t1");
        self.emit("sw $t0, 0($sp)");
    }

    /// Copies including the NUL. Result: the destination
    fn emit_strcpy(&mut self, id: usize) {
        self.emit("lw $s0, 0($sp)");
        self.emit("lw $s1, 4($sp)");
        self.emit("addiu $sp, $sp, 4");
        self.emit("move $s2, $s1");
        self.emit_label(format!(".L_strcpy_loop_{id}"));
        self.emit("lbu $t0, 0($s0)");
        self.emit("sb $t0, 0($s2)");
        self.emit("addiu $s0, $s0, 1");
        self.emit("addiu $s2, $s2, 1");
        self.emit(format!("bnez $t0, .L_strcpy_loop_{id}"));
        self.emit("sw $s1, 0($sp)");
    }

    /// `argc` words are on the stack, the format string deepest.
    ///
    /// `$s0` walks the format, `$s1` marks the argument block, `$s2` points
    /// at the next `%d` value, `$s3` holds the value being printed and `$s4`
    /// counts its pending digits. Result: 0
    fn emit_printf(&mut self, id: usize, argc: usize) {
        let word = WORD_SIZE as isize;
        let argc = argc as isize;

        self.emit("move $s1, $sp");
        self.emit(format!("lw $s0, {}($s1)", (argc - 1) * word));
        self.emit(format!("addiu $s2, $s1, {}", (argc - 2) * word));

        self.emit_label(format!(".L_printf_loop_{id}"));
        self.emit("lbu $t0, 0($s0)");
        self.emit(format!("beqz $t0, .L_printf_end_{id}"));
        self.emit(format!("li $t1, {}", b'%'));
        self.emit(format!("bne $t0, $t1, .L_printf_char_{id}"));
        self.emit("lbu $t1, 1($s0)");
        self.emit(format!("li $t2, {}", b'd'));
        self.emit(format!("bne $t1, $t2, .L_printf_char_{id}"));

        // %d
        self.emit("addiu $s0, $s0, 2");
        self.emit("lw $s3, 0($s2)");
        self.emit(format!("addiu $s2, $s2, -{WORD_SIZE}"));
        self.emit(format!("bnez $s3, .L_printf_nonzero_{id}"));
        self.emit(format!("li $t0, {}", b'0'));
        self.emit_write_reg_byte("$t0");
        self.emit(format!("j .L_printf_loop_{id}"));

        self.emit_label(format!(".L_printf_nonzero_{id}"));
        self.emit(format!("bgez $s3, .L_printf_digits_{id}"));
        self.emit(format!("li $t0, {}", b'-'));
        self.emit_write_reg_byte("$t0");
        self.emit("subu $s3, $zero, $s3");

        self.emit_label(format!(".L_printf_digits_{id}"));
        self.emit("li $s4, 0");
        self.emit_label(format!(".L_printf_divide_{id}"));
        self.emit("li $t1, 10");
        self.emit("divu $s3, $t1");
        self.emit("mfhi $t0");
        self.emit("mflo $s3");
        self.emit(format!("addiu $t0, $t0, {}", b'0'));
        self.emit("addiu $sp, $sp, -4");
        self.emit("sb $t0, 0($sp)");
        self.emit("addiu $s4, $s4, 1");
        self.emit(format!("bnez $s3, .L_printf_divide_{id}"));

        self.emit_label(format!(".L_printf_emit_{id}"));
        self.emit_write_byte("$sp");
        self.emit("addiu $sp, $sp, 4");
        self.emit("addiu $s4, $s4, -1");
        self.emit(format!("bnez $s4, .L_printf_emit_{id}"));
        self.emit(format!("j .L_printf_loop_{id}"));

        self.emit_label(format!(".L_printf_char_{id}"));
        self.emit_write_byte("$s0");
        self.emit("addiu $s0, $s0, 1");
        self.emit(format!("j .L_printf_loop_{id}"));

        self.emit_label(format!(".L_printf_end_{id}"));
        self.emit(format!("addiu $sp, $s1, {}", argc * word));
        self.push("$zero");
    }
}
