//! Code generation error types
//!
//! This module defines [`CodegenError`]: checks that need the whole program
//! (calls to functions defined later, a missing `main`), limits of the
//! calling convention, and internal invariant violations.
//!
//! Internal errors mean the parser produced a tree the generator cannot
//! lower. They abort compilation like any other error but are reported
//! differently, see [`CodegenError::is_internal`].

use crate::codegen::constants::MAX_REG_ARGS;
use crate::parser::ast::SourceLocation;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CodegenError {
    #[snafu(display("Codegen error: no 'main' function defined"))]
    MissingMain,

    #[snafu(display("Codegen error at {location}: undefined function '{name}'"))]
    UndefinedFunction {
        name: String,
        location: SourceLocation,
    },

    #[snafu(display(
        "Codegen error at {location}: '{function}' expects {expected} argument(s), got {got}"
    ))]
    ArgumentCountMismatch {
        function: String,
        expected: usize,
        got: usize,
        location: SourceLocation,
    },

    #[snafu(display(
        "Codegen error at {location}: call to '{function}' passes {count} arguments, at most {} are supported",
        MAX_REG_ARGS
    ))]
    TooManyArguments {
        function: String,
        count: usize,
        location: SourceLocation,
    },

    #[snafu(display(
        "Codegen error at {location}: '{function}' declares {count} parameters, at most {} are supported",
        MAX_REG_ARGS
    ))]
    TooManyParameters {
        function: String,
        count: usize,
        location: SourceLocation,
    },

    #[snafu(display("Codegen error at {location}: cannot assign to a value of type '{ty}'"))]
    AggregateAssignment {
        ty: String,
        location: SourceLocation,
    },

    #[snafu(display("Codegen error at {location}: expression is not assignable"))]
    NotAnLvalue { location: SourceLocation },

    #[snafu(display("Internal error at {location}: 'break' outside of a loop"))]
    BreakOutsideLoop { location: SourceLocation },

    #[snafu(display("Internal error at {location}: 'continue' outside of a loop"))]
    ContinueOutsideLoop { location: SourceLocation },

    #[snafu(display("Internal error: loop label stack underflow"))]
    LoopStackUnderflow,

    #[snafu(display("Internal error at {location}: statement used where a value is required"))]
    UnexpectedNode { location: SourceLocation },
}

impl CodegenError {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            CodegenError::UndefinedFunction { location, .. }
            | CodegenError::ArgumentCountMismatch { location, .. }
            | CodegenError::TooManyArguments { location, .. }
            | CodegenError::TooManyParameters { location, .. }
            | CodegenError::AggregateAssignment { location, .. }
            | CodegenError::NotAnLvalue { location }
            | CodegenError::BreakOutsideLoop { location }
            | CodegenError::ContinueOutsideLoop { location }
            | CodegenError::UnexpectedNode { location } => Some(*location),
            CodegenError::MissingMain | CodegenError::LoopStackUnderflow => None,
        }
    }

    /// True for generator/parser inconsistencies rather than user mistakes
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            CodegenError::BreakOutsideLoop { .. }
                | CodegenError::ContinueOutsideLoop { .. }
                | CodegenError::LoopStackUnderflow
                | CodegenError::UnexpectedNode { .. }
        )
    }
}
