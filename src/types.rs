//! Type registry (C1).
//!
//! A type is one of the variants of [`TypeKind`]. Primitives are process-wide
//! singletons; arrays and tuples are interned by structural key so that two
//! independent requests for the same shape return the identical handle.
//! Structural equality is then just `Rc::ptr_eq` — see [`TypeRegistry::equals`].
//!
//! Grounded in the teacher's `types.rs` (tagged enum, singleton primitives)
//! and in `examples/original_source/src/type/` for the exact field set
//! (`memory`, `iterable`) spec.md §3/§4.1 require.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A type, before or after interning. Comparisons should go through
/// [`TypeRegistry::equals`] rather than `==`/structural `PartialEq`, which
/// would walk the whole shape instead of comparing handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Pre-inference placeholder; never reaches code generation.
    Unknown,
    /// Error-recovery sentinel. Never escapes a successful pipeline: the
    /// checker coerces it to `Unit` wherever a user-visible type is
    /// synthesized (§4.5, `BracketExpr`/`IfExpr`/break-type rules).
    Any,
    Unit,
    Int32,
    Bool,
    Array { size: usize, elem: TypeRef },
    Tuple { elems: Vec<TypeRef> },
}

pub type TypeRef = Rc<TypeKind>;

/// Interning registry for the compile. Owned by [`crate::context::SemanticContext`].
pub struct TypeRegistry {
    unknown: TypeRef,
    any: TypeRef,
    unit: TypeRef,
    int: TypeRef,
    bool_: TypeRef,
    arrays: HashMap<(usize, TypeRef), TypeRef>,
    tuples: HashMap<Vec<TypeRef>, TypeRef>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            unknown: Rc::new(TypeKind::Unknown),
            any: Rc::new(TypeKind::Any),
            unit: Rc::new(TypeKind::Unit),
            int: Rc::new(TypeKind::Int32),
            bool_: Rc::new(TypeKind::Bool),
            arrays: HashMap::new(),
            tuples: HashMap::new(),
        }
    }

    pub fn unknown_type(&self) -> TypeRef {
        Rc::clone(&self.unknown)
    }

    pub fn any_type(&self) -> TypeRef {
        Rc::clone(&self.any)
    }

    pub fn unit_type(&self) -> TypeRef {
        Rc::clone(&self.unit)
    }

    pub fn int_type(&self) -> TypeRef {
        Rc::clone(&self.int)
    }

    pub fn bool_type(&self) -> TypeRef {
        Rc::clone(&self.bool_)
    }

    pub fn array(&mut self, size: usize, elem: TypeRef) -> TypeRef {
        let key = (size, elem.clone());
        if let Some(existing) = self.arrays.get(&key) {
            return Rc::clone(existing);
        }
        let handle: TypeRef = Rc::new(TypeKind::Array { size, elem });
        self.arrays.insert(key, Rc::clone(&handle));
        handle
    }

    pub fn tuple(&mut self, elems: Vec<TypeRef>) -> TypeRef {
        if let Some(existing) = self.tuples.get(&elems) {
            return Rc::clone(existing);
        }
        let handle: TypeRef = Rc::new(TypeKind::Tuple {
            elems: elems.clone(),
        });
        self.tuples.insert(elems, Rc::clone(&handle));
        handle
    }

    /// Two references name the same type iff they point at the same
    /// interned allocation. Sound because primitives are singletons and
    /// arrays/tuples are interned by structural key.
    pub fn equals(&self, a: &TypeRef, b: &TypeRef) -> bool {
        Rc::ptr_eq(a, b)
    }

    /// Size in bytes on the stack. `Bool` is declared as 1 byte by the
    /// language but is allocated as 4 to match the 4-byte `sw`/`lw` width
    /// code generation uses uniformly (spec.md §9, open question 4).
    pub fn memory(&self, t: &TypeRef) -> usize {
        match &**t {
            TypeKind::Unknown | TypeKind::Any | TypeKind::Unit => 0,
            TypeKind::Int32 => 4,
            TypeKind::Bool => 4,
            TypeKind::Array { size, elem } => size * self.memory(elem),
            TypeKind::Tuple { elems } => elems.iter().map(|e| self.memory(e)).sum(),
        }
    }

    pub fn iterable(&self, t: &TypeRef) -> bool {
        matches!(&**t, TypeKind::Array { .. })
    }

    /// Canonical source-language spelling.
    pub fn str(&self, t: &TypeRef) -> String {
        match &**t {
            TypeKind::Unknown => "?".to_string(),
            TypeKind::Any => "any".to_string(),
            TypeKind::Unit => "()".to_string(),
            TypeKind::Int32 => "i32".to_string(),
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Array { size, elem } => format!("[{}; {}]", self.str(elem), size),
            TypeKind::Tuple { elems } => {
                if elems.len() == 1 {
                    format!("({},)", self.str(&elems[0]))
                } else {
                    let parts: Vec<String> = elems.iter().map(|e| self.str(e)).collect();
                    format!("({})", parts.join(", "))
                }
            }
        }
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("arrays_interned", &self.arrays.len())
            .field("tuples_interned", &self.tuples.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_singletons() {
        let reg = TypeRegistry::new();
        assert!(reg.equals(&reg.int_type(), &reg.int_type()));
        assert!(!reg.equals(&reg.int_type(), &reg.bool_type()));
    }

    #[test]
    fn arrays_are_interned_by_structural_key() {
        let mut reg = TypeRegistry::new();
        let a1 = reg.array(3, reg.int_type());
        let a2 = reg.array(3, reg.int_type());
        assert!(reg.equals(&a1, &a2));
        let a3 = reg.array(4, reg.int_type());
        assert!(!reg.equals(&a1, &a3));
    }

    #[test]
    fn tuples_are_interned_by_structural_key() {
        let mut reg = TypeRegistry::new();
        let t1 = reg.tuple(vec![reg.int_type(), reg.bool_type()]);
        let t2 = reg.tuple(vec![reg.int_type(), reg.bool_type()]);
        assert!(reg.equals(&t1, &t2));
    }

    #[test]
    fn memory_sizes() {
        let mut reg = TypeRegistry::new();
        assert_eq!(reg.memory(&reg.int_type()), 4);
        assert_eq!(reg.memory(&reg.bool_type()), 4);
        assert_eq!(reg.memory(&reg.unit_type()), 0);
        let arr = reg.array(3, reg.int_type());
        assert_eq!(reg.memory(&arr), 12);
        let tup = reg.tuple(vec![reg.int_type(), reg.bool_type()]);
        assert_eq!(reg.memory(&tup), 8);
    }

    #[test]
    fn display_strings() {
        let mut reg = TypeRegistry::new();
        assert_eq!(reg.str(&reg.int_type()), "i32");
        assert_eq!(reg.str(&reg.unit_type()), "()");
        let arr = reg.array(5, reg.int_type());
        assert_eq!(reg.str(&arr), "[i32; 5]");
        let single = reg.tuple(vec![reg.int_type()]);
        assert_eq!(reg.str(&single), "(i32,)");
        let pair = reg.tuple(vec![reg.int_type(), reg.bool_type()]);
        assert_eq!(reg.str(&pair), "(i32, bool)");
    }
}
