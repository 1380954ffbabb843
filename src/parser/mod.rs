//! C source code parser
//!
//! This module transforms C source text into a typed Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens)
//! - [`parse`]: Parsing (tokens → AST), resolving names as it goes
//! - [`ast`]: AST node definitions
//!
//! # Supported C Subset
//!
//! - Types: `int`, `char`, `void`, structs, pointers, arrays (also multi-dimensional)
//! - Statements: declarations with initializers, `if`/`else`, `while`, `for`,
//!   `break`, `continue`, `return`, blocks
//! - Expressions: arithmetic, comparison, short-circuit logic, ternary,
//!   assignment and compound assignment, `++`/`--`, `&`, `*`, `[]`, `.`, `->`,
//!   `sizeof`, function calls
//! - No preprocessor, typedefs, unions, enums, casts or function pointers
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser, one method per precedence level.
//! No external parser generator dependencies.

pub mod ast;
mod declarations;
mod expressions;
pub mod lexer;
pub mod parse;
mod statements;

pub use parse::{ParseError, Parser};
