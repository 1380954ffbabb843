// Code generator state and emission helpers

use crate::codegen::constants::{
    ARG_REGS, FRAME_ALIGN, FRAME_HEADER_SIZE, MAX_REG_ARGS, STACK_REGION_SIZE, SYS_EXIT,
};
use crate::codegen::errors::{CodegenError, MissingMainSnafu, TooManyParametersSnafu};
use crate::parser::ast::{AstNode, Program};
use crate::symbols::{local_area_size, SymbolTable};
use crate::type_system::{align_to, size_of, Type};
use log::{debug, trace};
use snafu::ensure;
use std::fmt::Display;

/// Break and continue targets of one enclosing loop
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopLabels {
    pub(crate) break_label: usize,
    pub(crate) continue_label: usize,
}

/// Frame of the function being generated
#[derive(Debug, Default)]
pub(crate) struct Frame {
    pub(crate) name: String,
    pub(crate) size: usize,
}

/// Lowers one [`Program`] to MIPS assembly text
pub struct CodeGenerator<'a> {
    /// Tables filled in by the parser
    pub(crate) symbols: &'a SymbolTable,

    /// Assembly emitted so far
    out: String,

    /// String literal pool; a literal's id is its index
    strings: Vec<String>,

    /// Next label id, shared by every construct
    label_count: usize,

    /// Innermost loop last
    pub(crate) loop_labels: Vec<LoopLabels>,

    pub(crate) frame: Frame,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(symbols: &'a SymbolTable) -> Self {
        CodeGenerator {
            symbols,
            out: String::new(),
            strings: Vec::new(),
            label_count: 0,
            loop_labels: Vec::new(),
            frame: Frame::default(),
        }
    }

    /// Generate the complete assembly file for `program`
    pub fn generate(mut self, program: &Program) -> Result<String, CodegenError> {
        ensure!(self.symbols.functions.contains_key("main"), MissingMainSnafu);

        self.emit_data_section();
        self.emit_entry_point();

        for function in program.functions() {
            self.gen_function(function)?;
        }

        self.emit_string_pool();
        debug!(
            "generated {} bytes of assembly, {} labels, {} string literals",
            self.out.len(),
            self.label_count,
            self.strings.len()
        );
        Ok(self.out)
    }

    // ===== Sections =====

    fn emit_data_section(&mut self) {
        self.out.push_str(".data\n");
        self.out
            .push_str(&format!("stack: .space {STACK_REGION_SIZE}\n"));

        let symbols = self.symbols;
        for global in &symbols.globals {
            self.emit(".align 2");
            let line = match global.init {
                Some(value) if global.ty.is_byte() => format!("{}: .byte {}", global.name, value),
                Some(value) => format!("{}: .word {}", global.name, value),
                None => format!(
                    "{}: .space {}",
                    global.name,
                    size_of(&global.ty, &symbols.structs)
                ),
            };
            self.out.push_str(&line);
            self.out.push('\n');
        }
    }

    /// `__start` sets up the frame pointer and scratch stack, calls `main`
    /// and exits with its return value.
    fn emit_entry_point(&mut self) {
        self.out.push_str(".text\n");
        self.out.push_str(".globl main\n");
        self.out.push_str(".globl __start\n");
        self.emit_label("__start");
        self.emit("addi $s8, $sp, 0");
        self.emit(format!("addi $sp, $sp, -{STACK_REGION_SIZE}"));
        self.emit("jal main");
        self.emit("nop");
        self.emit("move $a0, $v0");
        self.emit(format!("li $v0, {SYS_EXIT}"));
        self.emit("syscall");
    }

    fn emit_string_pool(&mut self) {
        if self.strings.is_empty() {
            return;
        }

        self.out.push_str(".data\n");
        for (id, content) in self.strings.iter().enumerate() {
            self.out.push_str(&format!(
                ".L_str_{}: .asciiz \"{}\"\n",
                id,
                escape_asm_string(content)
            ));
        }
    }

    // ===== Functions =====

    /// Prologue, body, and the fallback epilogue when the body does not end
    /// in a `return`
    fn gen_function(&mut self, node: &AstNode) -> Result<(), CodegenError> {
        let AstNode::FunctionDef {
            name,
            params,
            body,
            locals,
            location,
            ..
        } = node
        else {
            return Ok(());
        };

        ensure!(
            params.len() <= MAX_REG_ARGS,
            TooManyParametersSnafu {
                function: name.as_str(),
                count: params.len(),
                location: *location,
            }
        );

        let size = align_to(FRAME_HEADER_SIZE + local_area_size(locals), FRAME_ALIGN);
        self.frame = Frame {
            name: name.clone(),
            size,
        };
        debug!(
            "function '{}': {} params, {} locals, frame {} bytes",
            name,
            params.len(),
            locals.len(),
            size
        );

        self.emit_label(name);
        self.emit(format!("addiu $sp, $sp, -{size}"));
        self.emit(format!("sw $ra, {}($sp)", size - 4));
        self.emit(format!("sw $s8, {}($sp)", size - 8));
        self.emit(format!("addiu $s8, $sp, {}", size - 8));
        for (param, reg) in params.iter().zip(ARG_REGS) {
            let store = store_instr(&param.ty);
            self.emit(format!("{store} {reg}, {}($s8)", param.offset));
        }

        for stmt in body {
            self.gen_statement(stmt)?;
        }

        if !matches!(body.last(), Some(AstNode::Return { .. })) {
            self.emit_label(format!(".L_func_end_{name}"));
            self.emit("li $v0, 0");
            self.emit_epilogue();
        }

        Ok(())
    }

    /// Restore `$ra` and the caller's frame pointer, drop the frame and return
    pub(crate) fn emit_epilogue(&mut self) {
        let size = self.frame.size;
        self.emit("lw $ra, 4($s8)");
        self.emit("lw $s8, 0($s8)");
        self.emit(format!("addiu $sp, $sp, {size}"));
        self.emit("jr $ra");
        self.emit("nop");
    }

    // ===== Emission helpers =====

    /// Emit one tab-indented instruction or directive
    pub(crate) fn emit(&mut self, instr: impl AsRef<str>) {
        self.out.push('\t');
        self.out.push_str(instr.as_ref());
        self.out.push('\n');
    }

    pub(crate) fn emit_label(&mut self, label: impl Display) {
        trace!("label {label}");
        self.out.push_str(&format!("{label}:\n"));
    }

    /// Push `reg` onto the operand stack
    pub(crate) fn push(&mut self, reg: &str) {
        self.emit("addiu $sp, $sp, -4");
        self.emit(format!("sw {reg}, 0($sp)"));
    }

    /// Pop the top of the operand stack into `reg`
    pub(crate) fn pop(&mut self, reg: &str) {
        self.emit(format!("lw {reg}, 0($sp)"));
        self.emit("addiu $sp, $sp, 4");
    }

    /// Load a value of type `ty` from `0(addr)` into `dst`. Aggregates are
    /// never loaded; their address is their value.
    pub(crate) fn load(&mut self, ty: &Type, dst: &str, addr: &str) {
        if ty.is_aggregate() {
            if dst != addr {
                self.emit(format!("move {dst}, {addr}"));
            }
            return;
        }
        self.emit(format!("{} {dst}, 0({addr})", load_instr(ty)));
    }

    /// Store `value` as type `ty` at `0(addr)`
    pub(crate) fn store(&mut self, ty: &Type, value: &str, addr: &str) {
        self.emit(format!("{} {value}, 0({addr})", store_instr(ty)));
    }

    /// Narrow `reg` to what a store of type `ty` kept, so an assignment's
    /// value matches the stored object. Only `char` needs it.
    pub(crate) fn truncate(&mut self, ty: &Type, reg: &str) {
        if ty.is_byte() {
            self.emit(format!("sll {reg}, {reg}, 24"));
            self.emit(format!("sra {reg}, {reg}, 24"));
        }
    }

    /// Multiply `reg` by `size` in place; a no-op for sizes 0 and 1
    pub(crate) fn scale(&mut self, reg: &str, size: usize) {
        if size > 1 {
            self.emit(format!("li $t2, {size}"));
            self.emit(format!("mul {reg}, {reg}, $t2"));
        }
    }

    /// Reserve a fresh label id
    pub(crate) fn next_label(&mut self) -> usize {
        let id = self.label_count;
        self.label_count += 1;
        id
    }

    /// Add a literal to the pool and return its id
    pub(crate) fn intern_string(&mut self, content: &str) -> usize {
        self.strings.push(content.to_string());
        self.strings.len() - 1
    }

    pub(crate) fn size_of(&self, ty: &Type) -> usize {
        size_of(ty, &self.symbols.structs)
    }
}

pub(crate) fn load_instr(ty: &Type) -> &'static str {
    if ty.is_byte() {
        "lb"
    } else {
        "lw"
    }
}

pub(crate) fn store_instr(ty: &Type) -> &'static str {
    if ty.is_byte() {
        "sb"
    } else {
        "sw"
    }
}

/// Render `content` for an `.asciiz` directive
pub(crate) fn escape_asm_string(content: &str) -> String {
    let mut escaped = String::with_capacity(content.len());
    for byte in content.bytes() {
        match byte {
            b'\n' => escaped.push_str("\\n"),
            b'\t' => escaped.push_str("\\t"),
            b'\r' => escaped.push_str("\\r"),
            b'\\' => escaped.push_str("\\\\"),
            b'"' => escaped.push_str("\\\""),
            0 => escaped.push_str("\\0"),
            0x20..=0x7e => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\{:03o}", byte)),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn compile(source: &str) -> Result<String, CodegenError> {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        CodeGenerator::new(&program.symbols).generate(&program)
    }

    #[test]
    fn test_escape_asm_string() {
        assert_eq!(escape_asm_string("a\"b\\c\n\t\r"), "a\\\"b\\\\c\\n\\t\\r");
        assert_eq!(escape_asm_string("\0\u{7}"), "\\0\\007");
        assert_eq!(escape_asm_string("é"), "\\303\\251");
    }

    #[test]
    fn test_minimal_program_layout() {
        let asm = compile("int main() { return 42; }").unwrap();
        let expected = "\
.data
stack: .space 4096
.text
.globl main
.globl __start
__start:
\taddi $s8, $sp, 0
\taddi $sp, $sp, -4096
\tjal main
\tnop
\tmove $a0, $v0
\tli $v0, 4001
\tsyscall
main:
\taddiu $sp, $sp, -8
\tsw $ra, 4($sp)
\tsw $s8, 0($sp)
\taddiu $s8, $sp, 0
\tli $t0, 42
\taddiu $sp, $sp, -4
\tsw $t0, 0($sp)
\tlw $v0, 0($sp)
\taddiu $sp, $sp, 4
\tlw $ra, 4($s8)
\tlw $s8, 0($s8)
\taddiu $sp, $sp, 8
\tjr $ra
\tnop
";
        assert_eq!(asm, expected);
    }

    #[test]
    fn test_globals_in_declaration_order() {
        let asm = compile("int a; char c = 'x'; int m[2][3]; int *p = 0; int main() { return 0; }")
            .unwrap();
        let data: Vec<&str> = asm.lines().take_while(|l| *l != ".text").collect();
        assert_eq!(
            data,
            vec![
                ".data",
                "stack: .space 4096",
                "\t.align 2",
                "a: .space 4",
                "\t.align 2",
                "c: .byte 120",
                "\t.align 2",
                "m: .space 24",
                "\t.align 2",
                "p: .word 0",
            ]
        );
    }

    #[test]
    fn test_frame_size_and_parameter_spills() {
        let asm = compile(
            "int f(int a, char c, int *p) { int x; int buf[3]; return a; } \
             int main() { return 0; }",
        )
        .unwrap();

        // 8 header bytes + 12 parameter bytes + 16 local bytes = 36, rounded to 40
        assert!(asm.contains("f:\n\taddiu $sp, $sp, -40\n\tsw $ra, 36($sp)\n\tsw $s8, 32($sp)\n\taddiu $s8, $sp, 32\n"));
        assert!(asm.contains("\tsw $a0, -4($s8)\n\tsb $a1, -8($s8)\n\tsw $a2, -12($s8)\n"));
        assert!(!asm.contains("$a3"));
    }

    #[test]
    fn test_fallback_epilogue() {
        let asm = compile("int f() { } int main() { f(); return 0; }").unwrap();
        assert_eq!(asm.matches(".L_func_end_f:").count(), 1);
        assert!(!asm.contains(".L_func_end_main"));

        // A return nested in an if is not the last statement
        let asm = compile("int main() { if (1) return 1; }").unwrap();
        assert!(asm.contains(".L_func_end_main:\n\tli $v0, 0\n"));
    }

    #[test]
    fn test_missing_main() {
        let err = compile("int f() { return 0; }").unwrap_err();
        assert!(matches!(err, CodegenError::MissingMain));
        assert!(err.location().is_none());
    }

    #[test]
    fn test_too_many_parameters() {
        let err = compile("int f(int a, int b, int c, int d, int e) { return a; } int main() { return 0; }")
            .unwrap_err();
        assert!(matches!(err, CodegenError::TooManyParameters { count: 5, .. }));
    }

    #[test]
    fn test_string_pool_in_id_order() {
        let asm = compile("int main() { puts(\"one\"); puts(\"two\\n\"); return 0; }").unwrap();
        let tail = asm.rsplit(".data\n").next().unwrap();
        assert_eq!(
            tail,
            ".L_str_0: .asciiz \"one\"\n.L_str_1: .asciiz \"two\\n\"\n"
        );
    }
}
