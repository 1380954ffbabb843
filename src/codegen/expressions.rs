//! Expression lowering
//!
//! Every expression pushes exactly one word onto the operand stack. For
//! scalars the word is the value; for arrays and structs it is the address
//! of the object.
//!
//! Assignable expressions also have an address path, [`CodeGenerator::gen_addr`],
//! which pushes the address of the object instead of its value.

use crate::codegen::errors::{
    AggregateAssignmentSnafu, CodegenError, NotAnLvalueSnafu, UnexpectedNodeSnafu,
};
use crate::codegen::generator::{load_instr, CodeGenerator};
use crate::parser::ast::{AstNode, BinOp, IncDec, LogicalOp};
use crate::parser::parse::fold_constant;
use crate::type_system::inference::get_type;
use crate::type_system::Type;

impl CodeGenerator<'_> {
    /// Push the address of an lvalue
    pub(crate) fn gen_addr(&mut self, node: &AstNode) -> Result<(), CodegenError> {
        match node {
            AstNode::LocalVar { offset, .. } => {
                self.emit(format!("addiu $t0, $s8, {offset}"));
                self.push("$t0");
            }
            AstNode::GlobalVar { name, .. } => {
                self.emit(format!("la $t0, {name}"));
                self.push("$t0");
            }
            // The pointer value is the address
            AstNode::Deref { operand, .. } => self.gen_expr(operand)?,
            AstNode::MemberAccess { object, member, .. } => {
                self.gen_addr(object)?;
                if member.offset != 0 {
                    self.emit("lw $t0, 0($sp)");
                    self.emit(format!("addiu $t0, $t0, {}", member.offset));
                    self.emit("sw $t0, 0($sp)");
                }
            }
            other => {
                return NotAnLvalueSnafu {
                    location: other.location(),
                }
                .fail()
            }
        }
        Ok(())
    }

    /// Push the value of an expression
    pub(crate) fn gen_expr(&mut self, node: &AstNode) -> Result<(), CodegenError> {
        match node {
            AstNode::IntLiteral(value, _) => {
                self.emit(format!("li $t0, {value}"));
                self.push("$t0");
            }

            AstNode::StringLiteral(content, _) => {
                let id = self.intern_string(content);
                self.emit(format!("la $t0, .L_str_{id}"));
                self.push("$t0");
            }

            AstNode::LocalVar { ty, offset, .. } => {
                if ty.is_aggregate() {
                    self.emit(format!("addiu $t0, $s8, {offset}"));
                } else {
                    self.emit(format!("{} $t0, {offset}($s8)", load_instr(ty)));
                }
                self.push("$t0");
            }

            AstNode::GlobalVar { name, ty, .. } => {
                self.emit(format!("la $t0, {name}"));
                self.load(ty, "$t0", "$t0");
                self.push("$t0");
            }

            AstNode::Deref { operand, .. } => {
                self.gen_expr(operand)?;
                self.load_top(&get_type(node));
            }

            AstNode::MemberAccess { member, .. } => {
                self.gen_addr(node)?;
                self.load_top(&member.ty);
            }

            AstNode::AddrOf { operand, .. } => self.gen_addr(operand)?,

            AstNode::Assignment { lhs, rhs, location } => {
                let ty = get_type(lhs);
                if ty.is_aggregate() {
                    return AggregateAssignmentSnafu {
                        ty: ty.to_string(),
                        location: *location,
                    }
                    .fail();
                }

                self.gen_addr(lhs)?;
                self.gen_expr(rhs)?;
                self.pop("$t1");
                self.pop("$t0");
                self.store(&ty, "$t1", "$t0");
                self.truncate(&ty, "$t1");
                self.push("$t1");
            }

            AstNode::CompoundAssignment {
                op,
                lhs,
                rhs,
                location,
            } => {
                let ty = get_type(lhs);
                if ty.is_aggregate() {
                    return AggregateAssignmentSnafu {
                        ty: ty.to_string(),
                        location: *location,
                    }
                    .fail();
                }

                // Address twice: one copy is replaced by the current value
                self.gen_addr(lhs)?;
                self.gen_addr(lhs)?;
                self.emit("lw $t0, 0($sp)");
                self.load(&ty, "$t0", "$t0");
                self.emit("sw $t0, 0($sp)");
                self.gen_expr(rhs)?;
                self.pop("$t1");
                self.pop("$t0");
                self.gen_arith(*op, &ty, &get_type(rhs));
                self.pop("$t1");
                self.store(&ty, "$t0", "$t1");
                self.truncate(&ty, "$t0");
                self.push("$t0");
            }

            AstNode::IncDec { kind, operand, .. } => self.gen_inc_dec(*kind, operand)?,

            AstNode::BinaryOp {
                op, left, right, ..
            } => {
                self.gen_expr(left)?;
                self.gen_expr(right)?;
                self.pop("$t1");
                self.pop("$t0");
                self.gen_arith(*op, &get_type(left), &get_type(right));
                self.push("$t0");
            }

            AstNode::LogicalOp {
                op, left, right, ..
            } => self.gen_logical(*op, left, right)?,

            AstNode::Not { operand, .. } => {
                self.gen_expr(operand)?;
                self.emit("lw $t0, 0($sp)");
                self.emit("sltiu $t0, $t0, 1");
                self.emit("sw $t0, 0($sp)");
            }

            AstNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                ..
            } => {
                let label = self.next_label();
                self.gen_expr(condition)?;
                self.pop("$t0");
                self.emit(format!("beqz $t0, .Lelse{label}"));
                self.gen_expr(true_expr)?;
                self.emit(format!("j .Lend{label}"));
                self.emit_label(format!(".Lelse{label}"));
                self.gen_expr(false_expr)?;
                self.emit_label(format!(".Lend{label}"));
            }

            AstNode::FunctionCall {
                name,
                args,
                location,
                ..
            } => self.gen_call(name, args, *location)?,

            AstNode::BuiltinCall { builtin, args, .. } => self.gen_builtin(*builtin, args)?,

            AstNode::FunctionDef { location, .. }
            | AstNode::VarDecl { location, .. }
            | AstNode::ExpressionStatement { location, .. }
            | AstNode::Block { location, .. }
            | AstNode::Return { location, .. }
            | AstNode::If { location, .. }
            | AstNode::While { location, .. }
            | AstNode::For { location, .. }
            | AstNode::Break { location }
            | AstNode::Continue { location } => {
                return UnexpectedNodeSnafu {
                    location: *location,
                }
                .fail()
            }
        }
        Ok(())
    }

    /// Replace the address on top of the stack with the value it points to
    fn load_top(&mut self, ty: &Type) {
        if ty.is_aggregate() {
            return;
        }
        self.emit("lw $t0, 0($sp)");
        self.load(ty, "$t0", "$t0");
        self.emit("sw $t0, 0($sp)");
    }

    /// `$t0 = $t0 op $t1`, scaling the integer side of pointer arithmetic.
    /// Clobbers `$t2`.
    fn gen_arith(&mut self, op: BinOp, left: &Type, right: &Type) {
        match op {
            BinOp::Add => {
                match (left.base(), right.base()) {
                    (Some(base), None) => {
                        let size = self.size_of(base);
                        self.scale("$t1", size);
                    }
                    (None, Some(base)) => {
                        let size = self.size_of(base);
                        self.scale("$t0", size);
                    }
                    _ => {}
                }
                self.emit("addu $t0, $t0, $t1");
            }
            BinOp::Sub => match (left.base(), right.is_pointer_like()) {
                // Element distance between two pointers
                (Some(base), true) => {
                    let size = self.size_of(base);
                    self.emit("subu $t0, $t0, $t1");
                    if size > 1 {
                        self.emit(format!("li $t2, {size}"));
                        self.emit("div $t0, $t2");
                        self.emit("mflo $t0");
                    }
                }
                (Some(base), false) => {
                    let size = self.size_of(base);
                    self.scale("$t1", size);
                    self.emit("subu $t0, $t0, $t1");
                }
                (None, _) => self.emit("subu $t0, $t0, $t1"),
            },
            BinOp::Mul => self.emit("mul $t0, $t0, $t1"),
            BinOp::Div => {
                self.emit("div $t0, $t1");
                self.emit("mflo $t0");
            }
            BinOp::Mod => {
                self.emit("div $t0, $t1");
                self.emit("mfhi $t0");
            }
            BinOp::Eq => self.emit("seq $t0, $t0, $t1"),
            BinOp::Ne => self.emit("sne $t0, $t0, $t1"),
            BinOp::Lt => self.emit("slt $t0, $t0, $t1"),
            BinOp::Le => self.emit("sle $t0, $t0, $t1"),
            // Operands swapped in the instruction, not in evaluation order
            BinOp::Gt => self.emit("slt $t0, $t1, $t0"),
            BinOp::Ge => self.emit("sle $t0, $t1, $t0"),
        }
    }

    fn gen_logical(
        &mut self,
        op: LogicalOp,
        left: &AstNode,
        right: &AstNode,
    ) -> Result<(), CodegenError> {
        // A constant left operand that decides the result drops the right
        // operand entirely, calls included
        let decided = match (op, fold_constant(left)) {
            (LogicalOp::And, Some(0)) => Some(0),
            (LogicalOp::Or, Some(value)) if value != 0 => Some(1),
            _ => None,
        };
        if let Some(value) = decided {
            self.emit(format!("li $t0, {value}"));
            self.push("$t0");
            return Ok(());
        }

        let label = self.next_label();
        let (skip_branch, skip_label, skip_value) = match op {
            LogicalOp::And => ("beqz", format!(".Lfalse{label}"), 0),
            LogicalOp::Or => ("bnez", format!(".Ltrue{label}"), 1),
        };

        self.gen_expr(left)?;
        self.pop("$t0");
        self.emit(format!("{skip_branch} $t0, {skip_label}"));
        self.gen_expr(right)?;
        self.pop("$t0");
        self.emit("sltu $t0, $zero, $t0");
        self.emit(format!("j .Lend{label}"));
        self.emit_label(&skip_label);
        self.emit(format!("li $t0, {skip_value}"));
        self.emit_label(format!(".Lend{label}"));
        self.push("$t0");
        Ok(())
    }

    /// Pre-forms leave the updated value, post-forms the original one.
    /// Pointers step by their pointee size.
    fn gen_inc_dec(&mut self, kind: IncDec, operand: &AstNode) -> Result<(), CodegenError> {
        let ty = get_type(operand);
        let step = match ty.base() {
            Some(base) if ty.is_pointer_like() => self.size_of(base) as i32,
            _ => 1,
        };
        let delta = kind.delta() * step;

        self.gen_addr(operand)?;
        self.emit("lw $t0, 0($sp)");
        self.load(&ty, "$t1", "$t0");

        if kind.is_prefix() {
            self.emit(format!("addiu $t1, $t1, {delta}"));
            self.store(&ty, "$t1", "$t0");
            self.truncate(&ty, "$t1");
        } else {
            self.emit(format!("addiu $t2, $t1, {delta}"));
            self.store(&ty, "$t2", "$t0");
        }
        self.emit("sw $t1, 0($sp)");
        Ok(())
    }
}
