//! Top-level compilation error
//!
//! [`CompileError`] is what [`crate::compile`] returns: the first lexical,
//! syntactic, semantic or internal error of the run. Stage errors convert
//! into it with `?`.

use crate::codegen::CodegenError;
use crate::parser::ast::SourceLocation;
use crate::parser::ParseError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
pub enum CompileError {
    #[snafu(transparent)]
    Parse { source: ParseError },

    #[snafu(transparent)]
    Codegen { source: CodegenError },
}

impl CompileError {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            CompileError::Parse { source } => Some(source.location()),
            CompileError::Codegen { source } => source.location(),
        }
    }

    /// True when the error points at a compiler bug rather than bad input
    pub fn is_internal(&self) -> bool {
        matches!(self, CompileError::Codegen { source } if source.is_internal())
    }

    /// The message followed, when the error has a location, by the offending
    /// source line and a caret under the column:
    ///
    /// ```text
    /// Parse error at line 2, column 12: undefined variable 'y'
    ///       return y;
    ///              ^
    /// ```
    pub fn render(&self, source: &str) -> String {
        let mut out = self.to_string();
        let Some(location) = self.location() else {
            return out;
        };
        let Some(line) = location
            .line
            .checked_sub(1)
            .and_then(|index| source.lines().nth(index))
        else {
            return out;
        };

        let caret_pad = location.column.saturating_sub(1);
        // Keep tabs so the caret lines up with the echoed line
        let padding: String = line
            .chars()
            .take(caret_pad)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        out.push_str(&format!("\n  {line}\n  {padding}^"));
        out
    }
}
