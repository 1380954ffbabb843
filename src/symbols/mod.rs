//! Symbol tables filled in by the parser and read by the code generator
//!
//! - Locals: one flat list per function. A name declared anywhere in the
//!   body, including an inner block, stays visible for the rest of the
//!   function and keeps its frame slot.
//! - Globals: kept in declaration order, which is also emission order.
//! - Functions: signatures only; bodies are owned by the AST.
//! - Structs: laid-out definitions, see [`crate::type_system::StructDef`].

use crate::codegen::constants::{FRAME_ALIGN, FRAME_HEADER_SIZE, MAX_OBJECT_SIZE};
use crate::type_system::{align_to, size_of, slot_size, StructDef, StructTable, Type};
use rustc_hash::FxHashMap;

/// A local variable or parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LVar {
    pub name: String,
    pub ty: Type,
    /// Offset of the lowest byte of the slot relative to the frame pointer.
    pub offset: i32,
}

/// A global variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GVar {
    pub name: String,
    pub ty: Type,
    /// Constant initializer for scalar globals.
    pub init: Option<i32>,
}

/// What a call site needs to know about a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSig {
    pub param_count: usize,
    pub return_type: Type,
}

/// All tables of one compilation.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    pub locals: Vec<LVar>,
    pub globals: Vec<GVar>,
    pub functions: FxHashMap<String, FunctionSig>,
    pub structs: StructTable,
    /// Bytes of frame already handed out to `locals`.
    local_area: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look a local up by exact name.
    pub fn find_local(&self, name: &str) -> Option<&LVar> {
        self.locals.iter().find(|var| var.name == name)
    }

    pub fn find_global(&self, name: &str) -> Option<&GVar> {
        self.globals.iter().find(|var| var.name == name)
    }

    /// Allocate a frame slot for a new local.
    ///
    /// Slots grow downward from the frame pointer: the first local ends just
    /// below it. Offsets are never reused within a function. Returns `None`
    /// when the frame would outgrow [`MAX_OBJECT_SIZE`].
    pub fn declare_local(&mut self, name: &str, ty: Type) -> Option<LVar> {
        let area = self
            .local_area
            .checked_add(slot_size(&ty, &self.structs))?;
        let frame = align_to(FRAME_HEADER_SIZE.checked_add(area)?, FRAME_ALIGN);
        if frame > MAX_OBJECT_SIZE {
            return None;
        }

        self.local_area = area;
        let var = LVar {
            name: name.to_string(),
            ty,
            offset: -(area as i32),
        };
        self.locals.push(var.clone());
        Some(var)
    }

    pub fn declare_global(&mut self, name: &str, ty: Type, init: Option<i32>) {
        self.globals.push(GVar {
            name: name.to_string(),
            ty,
            init,
        });
    }

    /// Start a fresh local list for the next function body.
    pub fn begin_function(&mut self) {
        self.locals.clear();
        self.local_area = 0;
    }

    /// Hand the finished function's locals over to its AST node.
    pub fn end_function(&mut self) -> Vec<LVar> {
        self.local_area = 0;
        std::mem::take(&mut self.locals)
    }

    /// Lay out and record a struct; returns its size.
    pub fn define_struct(&mut self, name: &str, fields: Vec<(String, Type)>) -> usize {
        let def = StructDef::layout(name, fields, &self.structs);
        let size = def.size;
        self.structs.insert(name.to_string(), def);
        size
    }

    pub fn find_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    pub fn size_of(&self, ty: &Type) -> usize {
        size_of(ty, &self.structs)
    }

    /// Whether `ty` can be allocated: every struct it holds by value must be
    /// defined. Structs behind a pointer may still be incomplete.
    pub fn undefined_struct_in<'a>(&self, ty: &'a Type) -> Option<&'a str> {
        match ty {
            Type::Struct(name) if !self.structs.contains_key(name) => Some(name),
            Type::Array(element, _) => self.undefined_struct_in(element),
            _ => None,
        }
    }
}

/// Size of the local area described by `locals`.
pub fn local_area_size(locals: &[LVar]) -> usize {
    locals
        .iter()
        .map(|var| var.offset.unsigned_abs() as usize)
        .max()
        .unwrap_or(0)
}
