//! Types, sizes and struct layout
//!
//! This module answers every size/layout question the parser and code
//! generator ask:
//! - [`Type`]: the closed set of value types (`void`, `int`, `char`, pointer,
//!   array, struct)
//! - [`StructDef`] / [`Member`]: laid-out struct definitions
//! - [`size_of`] / [`slot_size`]: byte sizes for data and frame allocation
//! - [`inference`]: static type of an expression node
//!
//! # Type Sizes
//!
//! The target is a 32-bit machine with one word per value:
//! - `int`, pointers: 4 bytes
//! - `char`, `void`: 1 byte (`void` only so that `void*` arithmetic is defined)
//! - arrays: element size × element count
//! - structs: sum of member slots, each slot at least one word
//!
//! # Struct Layout
//!
//! Members keep declaration order and are placed back to back. Every member
//! occupies a whole number of words (at least one), so a `char` member still
//! takes 4 bytes and word loads of `int` members are always aligned.

pub mod inference;

use crate::codegen::constants::WORD_SIZE;
use rustc_hash::FxHashMap;
use std::fmt;

/// Struct definitions indexed by tag name.
pub type StructTable = FxHashMap<String, StructDef>;

/// A value type.
///
/// Structs are referenced by tag so that a struct may hold a pointer to
/// itself; the tag is resolved against a [`StructTable`] when a size or a
/// member is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Void,
    Int,
    Char,
    Ptr(Box<Type>),
    Array(Box<Type>, usize),
    Struct(String),
}

impl Type {
    pub fn pointer_to(base: Type) -> Self {
        Type::Ptr(Box::new(base))
    }

    pub fn array_of(element: Type, len: usize) -> Self {
        Type::Array(Box::new(element), len)
    }

    /// Pointee of a pointer, or element of an array.
    pub fn base(&self) -> Option<&Type> {
        match self {
            Type::Ptr(base) | Type::Array(base, _) => Some(base),
            _ => None,
        }
    }

    /// True for operands that take part in scaled pointer arithmetic.
    pub fn is_pointer_like(&self) -> bool {
        matches!(self, Type::Ptr(_) | Type::Array(_, _))
    }

    /// Arrays and structs are never loaded into a register; an expression of
    /// such a type evaluates to its address.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Array(_, _) | Type::Struct(_))
    }

    /// True when loads and stores of this type move a single byte.
    pub fn is_byte(&self) -> bool {
        matches!(self, Type::Char)
    }

    /// Array-to-pointer decay; every other type is returned unchanged.
    pub fn decay(&self) -> Type {
        match self {
            Type::Array(element, _) => Type::Ptr(element.clone()),
            other => other.clone(),
        }
    }

    /// Name of the struct this type refers to, looking through no pointers.
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            Type::Struct(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Int => write!(f, "int"),
            Type::Char => write!(f, "char"),
            Type::Ptr(base) => write!(f, "{}*", base),
            Type::Array(element, len) => write!(f, "{}[{}]", element, len),
            Type::Struct(name) => write!(f, "struct {}", name),
        }
    }
}

/// A struct member with its resolved byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub ty: Type,
    pub offset: usize,
}

/// A laid-out struct definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: String,
    pub members: Vec<Member>,
    pub size: usize,
}

impl StructDef {
    /// Lay out `fields` in declaration order.
    ///
    /// Offsets are assigned sequentially; each member takes
    /// [`slot_size`] bytes. `structs` must already contain every struct a
    /// member embeds by value.
    pub fn layout(
        name: &str,
        fields: Vec<(String, Type)>,
        structs: &StructTable,
    ) -> Self {
        let mut offset = 0;
        let mut members = Vec::with_capacity(fields.len());

        for (field_name, ty) in fields {
            let slot = slot_size(&ty, structs);
            members.push(Member {
                name: field_name,
                ty,
                offset,
            });
            offset = offset.saturating_add(slot);
        }

        StructDef {
            name: name.to_string(),
            members,
            size: offset,
        }
    }

    pub fn find_member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Size of a value of type `ty` in bytes.
///
/// An unknown struct tag has size 0; the parser rejects declarations that
/// would need the size of an undefined struct before this can matter.
/// Sizes saturate at `usize::MAX` instead of wrapping; the parser rejects
/// anything above [`crate::codegen::constants::MAX_OBJECT_SIZE`].
pub fn size_of(ty: &Type, structs: &StructTable) -> usize {
    match ty {
        Type::Void | Type::Char => 1,
        Type::Int | Type::Ptr(_) => WORD_SIZE,
        Type::Array(element, len) => size_of(element, structs).saturating_mul(*len),
        Type::Struct(name) => structs.get(name).map_or(0, |def| def.size),
    }
}

/// Bytes reserved for a variable or member of type `ty`: its size rounded
/// up to a whole number of words, never less than one word.
pub fn slot_size(ty: &Type, structs: &StructTable) -> usize {
    align_to(size_of(ty, structs).max(WORD_SIZE), WORD_SIZE)
}

/// Round `n` up to the next multiple of `align`, saturating.
pub fn align_to(n: usize, align: usize) -> usize {
    n.div_ceil(align).saturating_mul(align)
}
