//! Static type of an expression
//!
//! Used by the parser to fold `sizeof(expr)` and to resolve `.`/`->`
//! members, and by the code generator to pick load widths and pointer
//! scaling.
//!
//! # Inference Rules
//!
//! - Arithmetic, comparison and logical results are `int`
//! - `p + n`, `n + p`, `p - n` keep the pointer type (arrays decay)
//! - `p - q` between two pointers is `int`
//! - `&x` is pointer-to-type-of-`x`
//! - `*p` is the pointee of `p`; dereferencing a non-pointer yields `int`
//! - Variables and members carry their declared type
//! - Calls to user functions have the callee's return type when it is
//!   defined earlier in the file, `int` otherwise

use crate::parser::ast::{AstNode, BinOp, Builtin};
use crate::type_system::Type;

/// Infer the type of `node`. Never fails and caches nothing.
pub fn get_type(node: &AstNode) -> Type {
    match node {
        AstNode::IntLiteral(_, _) => Type::Int,

        AstNode::StringLiteral(_, _) => Type::pointer_to(Type::Char),

        AstNode::LocalVar { ty, .. } | AstNode::GlobalVar { ty, .. } => ty.clone(),

        AstNode::BinaryOp {
            op, left, right, ..
        } => match op {
            BinOp::Add => {
                let left_type = get_type(left);
                if left_type.is_pointer_like() {
                    return left_type.decay();
                }
                let right_type = get_type(right);
                if right_type.is_pointer_like() {
                    return right_type.decay();
                }
                Type::Int
            }
            BinOp::Sub => {
                let left_type = get_type(left);
                if left_type.is_pointer_like() && !get_type(right).is_pointer_like() {
                    left_type.decay()
                } else {
                    Type::Int
                }
            }
            _ => Type::Int,
        },

        AstNode::LogicalOp { .. } | AstNode::Not { .. } => Type::Int,

        AstNode::Assignment { lhs, .. }
        | AstNode::CompoundAssignment { lhs, .. } => get_type(lhs),

        AstNode::IncDec { operand, .. } => get_type(operand),

        AstNode::AddrOf { operand, .. } => Type::pointer_to(get_type(operand)),

        AstNode::Deref { operand, .. } => match get_type(operand) {
            Type::Ptr(base) | Type::Array(base, _) => *base,
            _ => Type::Int,
        },

        AstNode::MemberAccess { member, .. } => member.ty.clone(),

        AstNode::TernaryOp { true_expr, .. } => get_type(true_expr).decay(),

        AstNode::BuiltinCall { builtin, .. } => match builtin {
            Builtin::Strcpy => Type::pointer_to(Type::Char),
            _ => Type::Int,
        },

        AstNode::FunctionCall { ty, .. } => ty.clone(),

        // Statements have no value
        AstNode::FunctionDef { .. }
        | AstNode::VarDecl { .. }
        | AstNode::ExpressionStatement { .. }
        | AstNode::Block { .. }
        | AstNode::Return { .. }
        | AstNode::If { .. }
        | AstNode::While { .. }
        | AstNode::For { .. }
        | AstNode::Break { .. }
        | AstNode::Continue { .. } => Type::Void,
    }
}
