//! Symbol model (C2): value and function entities.
//!
//! Grounded in `examples/original_source/src/semantic/` (`sym::Variable`,
//! `sym::Function`) and the teacher's `ast.rs` style for plain data structs
//! with doc comments on each field rather than on the struct as a whole.

use std::rc::Rc;

use crate::source::Position;
use crate::types::TypeRef;

/// Discriminates what kind of entity a [`Value`] names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    /// A user-declared variable. `formal` is set for function parameters.
    Local { formal: bool },
    /// A compiler-introduced temporary: always immutable, always
    /// initialized at birth.
    Temporary,
    /// A literal integer or boolean constant; `name` is its textual form
    /// (`"1"`, `"true"`), which doubles as its symbol-table key so that
    /// repeated occurrences of the same literal share one entity.
    Constant,
}

/// A named value entity (C2). Every expression's result, once a place is
/// needed for it, resolves to one of these.
#[derive(Debug, Clone)]
pub struct Value {
    pub name: String,
    pub ty: TypeRef,
    pub pos: Position,
    pub mutable: bool,
    pub initialized: bool,
    pub kind: ValueKind,
}

pub type ValueRef = Rc<std::cell::RefCell<Value>>;

impl Value {
    pub fn new_local(
        name: impl Into<String>,
        ty: TypeRef,
        pos: Position,
        mutable: bool,
        formal: bool,
    ) -> ValueRef {
        Rc::new(std::cell::RefCell::new(Value {
            name: name.into(),
            ty,
            pos,
            mutable,
            initialized: formal,
            kind: ValueKind::Local { formal },
        }))
    }

    pub fn new_temporary(name: impl Into<String>, ty: TypeRef, pos: Position) -> ValueRef {
        Rc::new(std::cell::RefCell::new(Value {
            name: name.into(),
            ty,
            pos,
            mutable: false,
            initialized: true,
            kind: ValueKind::Temporary,
        }))
    }

    pub fn new_constant(text: impl Into<String>, ty: TypeRef, pos: Position) -> ValueRef {
        Rc::new(std::cell::RefCell::new(Value {
            name: text.into(),
            ty,
            pos,
            mutable: false,
            initialized: true,
            kind: ValueKind::Constant,
        }))
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ValueKind::Constant)
    }

    pub fn is_formal(&self) -> bool {
        matches!(self.kind, ValueKind::Local { formal: true })
    }

    /// The textual name used as a symbol-table / register-allocator key.
    pub fn key(&self) -> &str {
        &self.name
    }
}

/// A function entity (C2): name, declaration position, ordered formal
/// parameters, and return type.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub pos: Position,
    pub params: Vec<ValueRef>,
    pub ret: TypeRef,
}

pub type FunctionRef = Rc<Function>;

impl Function {
    /// `unknown` must come from the same [`crate::types::TypeRegistry`] the
    /// rest of the compile uses, so that pointer-identity equality later
    /// holds before the return type is inferred/declared.
    pub fn new(name: impl Into<String>, pos: Position, unknown: TypeRef) -> Self {
        Function {
            name: name.into(),
            pos,
            params: Vec::new(),
            ret: unknown,
        }
    }
}
