//! # Introduction
//!
//! mipscc compiles a subset of C to MIPS32 assembly for the GNU assembler in
//! a single pass: names and types are resolved while the tree is built, and
//! the tree is lowered straight to a stack-machine instruction stream.
//!
//! ## Compilation pipeline
//!
//! ```text
//! Source → Lexer → Parser (+ symbols, types) → AST → Code generator → Assembly
//! ```
//!
//! 1. [`parser`]: tokenises the source and builds an AST whose variable
//!    references already carry their frame offset or global label.
//! 2. [`symbols`]: locals, globals, function signatures and struct layouts
//!    collected by the parser.
//! 3. [`type_system`]: sizes, struct layout and static expression types.
//! 4. [`codegen`]: stack frames, control flow labels, pointer scaling and the
//!    inline runtime for the built-in library routines.
//!
//! ## Supported C subset
//!
//! Types: `int`, `char`, `void`, structs, pointers, fixed-size arrays.
//! Control flow: `if/else`, `while`, `for`, `break`, `continue`, `return`.
//! Built-ins: `printf` (`%d` only), `puts`, `putchar`, `getchar`, `strlen`,
//! `strcmp`, `strcpy`, `sizeof`.

pub mod codegen;
pub mod errors;
pub mod parser;
pub mod symbols;
pub mod type_system;

pub use errors::CompileError;

use codegen::CodeGenerator;
use parser::Parser;

/// Compile one translation unit to assembly text.
///
/// Stops at the first error.
pub fn compile(source: &str) -> Result<String, CompileError> {
    let program = Parser::new(source)?.parse_program()?;
    let asm = CodeGenerator::new(&program.symbols).generate(&program)?;
    Ok(asm)
}
