// AST (Abstract Syntax Tree) definitions for the compiler
//
// The parser resolves names and types while it builds the tree, so variable
// references already carry their frame offset or global label and member
// accesses carry the resolved member.

use crate::symbols::{GVar, LVar, SymbolTable};
use crate::type_system::{Member, Type};
use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    /// Character offset from the start of the source.
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Short-circuit operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And, // &&
    Or,  // ||
}

/// Increment/decrement forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDec {
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
}

impl IncDec {
    pub fn is_prefix(self) -> bool {
        matches!(self, IncDec::PreInc | IncDec::PreDec)
    }

    pub fn delta(self) -> i32 {
        match self {
            IncDec::PreInc | IncDec::PostInc => 1,
            IncDec::PreDec | IncDec::PostDec => -1,
        }
    }
}

/// Library routines compiled inline at the call site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Putchar,
    Getchar,
    Puts,
    Strlen,
    Strcmp,
    Strcpy,
    Printf,
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "putchar" => Some(Builtin::Putchar),
            "getchar" => Some(Builtin::Getchar),
            "puts" => Some(Builtin::Puts),
            "strlen" => Some(Builtin::Strlen),
            "strcmp" => Some(Builtin::Strcmp),
            "strcpy" => Some(Builtin::Strcpy),
            "printf" => Some(Builtin::Printf),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Putchar => "putchar",
            Builtin::Getchar => "getchar",
            Builtin::Puts => "puts",
            Builtin::Strlen => "strlen",
            Builtin::Strcmp => "strcmp",
            Builtin::Strcpy => "strcpy",
            Builtin::Printf => "printf",
        }
    }

    /// Accepted argument counts as `(min, max)`; `printf` is variadic.
    pub fn arity(self) -> (usize, Option<usize>) {
        match self {
            Builtin::Getchar => (0, Some(0)),
            Builtin::Putchar | Builtin::Puts | Builtin::Strlen => (1, Some(1)),
            Builtin::Strcmp | Builtin::Strcpy => (2, Some(2)),
            Builtin::Printf => (1, None),
        }
    }
}

/// AST nodes representing statements and expressions
#[derive(Debug, Clone)]
pub enum AstNode {
    // Top-level declarations
    FunctionDef {
        name: String,
        params: Vec<LVar>,
        body: Vec<AstNode>,
        /// Every local of the function, parameters first.
        locals: Vec<LVar>,
        location: SourceLocation,
    },

    // Statements
    VarDecl {
        name: String,
        /// Assignment of the initial value to the new variable.
        init: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    ExpressionStatement {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    If {
        condition: Box<AstNode>,
        then_branch: Box<AstNode>,
        else_branch: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    While {
        condition: Box<AstNode>,
        body: Box<AstNode>,
        location: SourceLocation,
    },
    For {
        /// A declaration or expression statement.
        init: Option<Box<AstNode>>,
        condition: Option<Box<AstNode>>,
        increment: Option<Box<AstNode>>,
        body: Box<AstNode>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },

    // Expressions
    IntLiteral(i32, SourceLocation),
    StringLiteral(String, SourceLocation),
    LocalVar {
        name: String,
        ty: Type,
        offset: i32,
        location: SourceLocation,
    },
    GlobalVar {
        name: String,
        ty: Type,
        location: SourceLocation,
    },
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    LogicalOp {
        op: LogicalOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    Not {
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    Assignment {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    /// `+=`, `-=`, `*=`, `/=`; `op` is the arithmetic part.
    CompoundAssignment {
        op: BinOp,
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    IncDec {
        kind: IncDec,
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    AddrOf {
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    Deref {
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    MemberAccess {
        object: Box<AstNode>,
        member: Member,
        location: SourceLocation,
    },
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
        /// Declared return type, or `int` when the callee is defined later.
        ty: Type,
        location: SourceLocation,
    },
    BuiltinCall {
        builtin: Builtin,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    TernaryOp {
        condition: Box<AstNode>,
        true_expr: Box<AstNode>,
        false_expr: Box<AstNode>,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> SourceLocation {
        match self {
            AstNode::FunctionDef { location, .. }
            | AstNode::VarDecl { location, .. }
            | AstNode::ExpressionStatement { location, .. }
            | AstNode::Block { location, .. }
            | AstNode::Return { location, .. }
            | AstNode::If { location, .. }
            | AstNode::While { location, .. }
            | AstNode::For { location, .. }
            | AstNode::Break { location }
            | AstNode::Continue { location }
            | AstNode::LocalVar { location, .. }
            | AstNode::GlobalVar { location, .. }
            | AstNode::BinaryOp { location, .. }
            | AstNode::LogicalOp { location, .. }
            | AstNode::Not { location, .. }
            | AstNode::Assignment { location, .. }
            | AstNode::CompoundAssignment { location, .. }
            | AstNode::IncDec { location, .. }
            | AstNode::AddrOf { location, .. }
            | AstNode::Deref { location, .. }
            | AstNode::MemberAccess { location, .. }
            | AstNode::FunctionCall { location, .. }
            | AstNode::BuiltinCall { location, .. }
            | AstNode::TernaryOp { location, .. } => *location,
            AstNode::IntLiteral(_, loc) | AstNode::StringLiteral(_, loc) => *loc,
        }
    }

    pub fn int(value: i32, location: SourceLocation) -> Self {
        AstNode::IntLiteral(value, location)
    }

    pub fn binary(
        op: BinOp,
        left: AstNode,
        right: AstNode,
        location: SourceLocation,
    ) -> Self {
        AstNode::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
            location,
        }
    }

    pub fn deref(operand: AstNode, location: SourceLocation) -> Self {
        AstNode::Deref {
            operand: Box::new(operand),
            location,
        }
    }

    pub fn local(var: &LVar, location: SourceLocation) -> Self {
        AstNode::LocalVar {
            name: var.name.clone(),
            ty: var.ty.clone(),
            offset: var.offset,
            location,
        }
    }

    pub fn global(var: &GVar, location: SourceLocation) -> Self {
        AstNode::GlobalVar {
            name: var.name.clone(),
            ty: var.ty.clone(),
            location,
        }
    }
}

/// A parsed translation unit: one tree per function definition plus the
/// tables the parser filled in along the way.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<AstNode>, // FunctionDef nodes in source order
    pub symbols: SymbolTable,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    pub fn functions(&self) -> impl Iterator<Item = &AstNode> {
        self.nodes
            .iter()
            .filter(|node| matches!(node, AstNode::FunctionDef { .. }))
    }
}
