//! MIPS32 code generation
//!
//! This module lowers a parsed [`Program`](crate::parser::ast::Program) to
//! GNU `as` assembly text:
//! - [`generator`]: generator state, sections, prologue/epilogue
//! - [`errors`]: code generation error types
//! - [`constants`]: fixed target parameters
//!
//! # Execution Model
//!
//! Generated code is a stack machine. Every expression pushes exactly one
//! word on the operand stack (`$sp`) and every statement leaves the stack as
//! it found it. `$t0`..`$t2` are scratch within a single node, `$s8` is the
//! frame pointer, and up to four arguments travel in `$a0`..`$a3`.
//!
//! # Built-in Functions
//!
//! The library routines (`printf`, `puts`, `putchar`, `getchar`, `strlen`,
//! `strcmp`, `strcpy`) are expanded inline at each call site and talk to
//! the host through syscalls 4001 (exit), 4003 (read) and 4004 (write).

mod builtins;
mod calls;
pub mod constants;
pub mod errors;
mod expressions;
pub mod generator;
mod loops;
mod statements;

pub use errors::CodegenError;
pub use generator::CodeGenerator;
