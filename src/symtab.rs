//! Symbol table (C3): scoped value lookup, flat function/constant tables.
//!
//! Grounded in `examples/original_source/src/semantic/semantic_context.hpp`
//! (`enterScope`/`exitScope`, qualified scope names via `::`) and spec.md
//! §4.2.

use std::collections::HashMap;

use crate::symbol::{FunctionRef, ValueRef};

/// One scope's local bindings, keyed by identifier.
#[derive(Default)]
struct Scope {
    bindings: HashMap<String, ValueRef>,
}

/// Scoped symbol table. The global scope is named `"global"`; nested scopes
/// append `::name` segments. Re-entering a previously-created scope name
/// (used by the IR builder, which re-walks the AST after the checker) finds
/// the same bindings rather than starting fresh.
pub struct SymbolTable {
    qualified: Vec<String>,
    scopes: HashMap<String, Scope>,
    functions: HashMap<String, FunctionRef>,
    constants: HashMap<String, ValueRef>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut scopes = HashMap::new();
        scopes.insert("global".to_string(), Scope::default());
        SymbolTable {
            qualified: vec!["global".to_string()],
            scopes,
            functions: HashMap::new(),
            constants: HashMap::new(),
        }
    }

    /// Current fully-qualified scope name, e.g. `"global::main::L1"`.
    pub fn current_scope_name(&self) -> String {
        self.qualified.join("::")
    }

    /// Append a `::name` segment. If `create` is true and the scope does
    /// not yet exist, it is created empty; otherwise (re-entry) the
    /// existing bindings are reused.
    pub fn enter_scope(&mut self, name: &str, create: bool) {
        self.qualified.push(name.to_string());
        let qualified = self.current_scope_name();
        if create {
            self.scopes.entry(qualified).or_default();
        } else {
            assert!(
                self.scopes.contains_key(&qualified),
                "re-entering scope `{}` that was never created",
                qualified
            );
        }
    }

    pub fn exit_scope(&mut self) {
        assert!(
            self.qualified.len() > 1,
            "exit_scope called with an empty scope stack (cannot pop the global scope)"
        );
        self.qualified.pop();
    }

    /// Insert into the current scope, overwriting any existing binding for
    /// `name` in that scope only (shadowing is legal within the same scope).
    pub fn declare_value(&mut self, name: &str, value: ValueRef) {
        let qualified = self.current_scope_name();
        self.scopes
            .entry(qualified)
            .or_default()
            .bindings
            .insert(name.to_string(), value);
    }

    /// Walk outward from the current scope to `global`, returning the first
    /// binding found for `name`.
    pub fn lookup_value(&self, name: &str) -> Option<ValueRef> {
        for depth in (0..self.qualified.len()).rev() {
            let qualified = self.qualified[..=depth].join("::");
            if let Some(scope) = self.scopes.get(&qualified) {
                if let Some(v) = scope.bindings.get(name) {
                    return Some(v.clone());
                }
            }
        }
        None
    }

    /// `duplicate-function` is the caller's responsibility to report; this
    /// returns `false` instead of inserting when the name already exists.
    pub fn declare_function(&mut self, name: &str, func: FunctionRef) -> bool {
        if self.functions.contains_key(name) {
            return false;
        }
        self.functions.insert(name.to_string(), func);
        true
    }

    pub fn lookup_function(&self, name: &str) -> Option<FunctionRef> {
        self.functions.get(name).cloned()
    }

    pub fn all_functions(&self) -> impl Iterator<Item = &FunctionRef> {
        self.functions.values()
    }

    /// Idempotent on exact literal match: the same textual literal always
    /// shares one constant entity.
    pub fn declare_constant(&mut self, text: &str, make: impl FnOnce() -> ValueRef) -> ValueRef {
        self.constants
            .entry(text.to_string())
            .or_insert_with(make)
            .clone()
    }

    pub fn lookup_constant(&self, text: &str) -> Option<ValueRef> {
        self.constants.get(text).cloned()
    }

    /// Bindings declared directly in the current scope (not the outward
    /// chain). Used by the auto-type-inference check on scope exit (§4.2).
    pub fn current_scope_bindings(&self) -> Vec<ValueRef> {
        let qualified = self.current_scope_name();
        self.scopes
            .get(&qualified)
            .map(|s| s.bindings.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Position;
    use crate::types::TypeRegistry;

    #[test]
    fn lookup_walks_outward_to_global() {
        let mut reg = TypeRegistry::new();
        let mut tab = SymbolTable::new();
        let g = crate::symbol::Value::new_local("x", reg.int_type(), Position::default(), false, false);
        tab.declare_value("x", g);

        tab.enter_scope("f", true);
        tab.enter_scope("L1", true);
        assert!(tab.lookup_value("x").is_some());

        let inner = crate::symbol::Value::new_local("y", reg.bool_type(), Position::default(), true, false);
        tab.declare_value("y", inner);
        assert!(tab.lookup_value("y").is_some());

        tab.exit_scope();
        assert!(tab.lookup_value("y").is_none());
        tab.exit_scope();
        assert!(tab.lookup_value("x").is_some());
    }

    #[test]
    fn shadowing_within_a_scope_overwrites() {
        let mut reg = TypeRegistry::new();
        let mut tab = SymbolTable::new();
        let v1 = crate::symbol::Value::new_local("x", reg.int_type(), Position::default(), true, false);
        tab.declare_value("x", v1);
        let v2 = crate::symbol::Value::new_local("x", reg.bool_type(), Position::default(), true, false);
        tab.declare_value("x", v2);
        let found = tab.lookup_value("x").unwrap();
        assert!(reg.equals(&found.borrow().ty, &reg.bool_type()));
    }

    #[test]
    fn constants_are_idempotent_on_exact_match() {
        let mut reg = TypeRegistry::new();
        let mut tab = SymbolTable::new();
        let int_ty = reg.int_type();
        let a = tab.declare_constant("1", || {
            crate::symbol::Value::new_constant("1", int_ty.clone(), Position::default())
        });
        let b = tab.declare_constant("1", || {
            crate::symbol::Value::new_constant("1", int_ty.clone(), Position::default())
        });
        assert!(rc_ptr_eq(&a, &b));
    }

    fn rc_ptr_eq(a: &ValueRef, b: &ValueRef) -> bool {
        std::rc::Rc::ptr_eq(a, b)
    }
}
