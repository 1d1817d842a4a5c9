//! Semantic context (C4): the runtime companion to [`crate::symtab::SymbolTable`].
//!
//! Tracks the current function, a scope stack with kinds, the per-function
//! temporary counter, and lookup helpers for loop/if frames. Grounded in
//! `examples/original_source/src/semantic/semantic_context.hpp`
//! (`enterFunc`/`enterIf`/`enterLoop`/.../`scopestack`), extended with the
//! `Else`/`BlockExpr` kinds and the yielded-value slot spec.md §3 requires.

use crate::reporter::{Reporter, SemErrorKind};
use crate::source::Position;
use crate::symbol::{Function, FunctionRef, Value, ValueRef};
use crate::symtab::SymbolTable;
use crate::types::{TypeKind, TypeRegistry};

/// Scope-stack frame kind (§3, "Scope stack").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Func,
    If,
    Else,
    BlockExpr,
    Loop,
    While,
    For,
}

/// One frame of the scope stack. `If` frames hold the yielded-temporary so
/// `else` branches assign into it; `Loop` frames hold the temporary yielded
/// by `break <value>`.
pub struct ScopeFrame {
    pub kind: ScopeKind,
    pub name: String,
    pub yield_symbol: Option<ValueRef>,
}

pub struct SemanticContext {
    pub types: TypeRegistry,
    pub symtab: SymbolTable,
    pub current_function: Option<FunctionRef>,
    scope_stack: Vec<ScopeFrame>,
    temp_counter: usize,
    block_counter: usize,
}

impl Default for SemanticContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticContext {
    pub fn new() -> Self {
        SemanticContext {
            types: TypeRegistry::new(),
            symtab: SymbolTable::new(),
            current_function: None,
            scope_stack: Vec::new(),
            temp_counter: 0,
            block_counter: 0,
        }
    }

    /// Allocates a fresh function entity, declares it, enters its scope,
    /// and resets the per-function temp/block counters.
    pub fn enter_function(&mut self, name: &str, pos: Position) -> FunctionRef {
        let unknown = self.types.unknown_type();
        let func = std::rc::Rc::new(Function::new(name, pos, unknown));
        self.current_function = Some(func.clone());
        self.symtab.enter_scope(name, true);
        self.temp_counter = 0;
        self.block_counter = 0;
        self.scope_stack.push(ScopeFrame {
            kind: ScopeKind::Func,
            name: name.to_string(),
            yield_symbol: None,
        });
        func
    }

    /// Like [`Self::enter_function`], but for a function entity already
    /// declared (by a forward pass over every `FuncDef` so calls can
    /// reference functions declared later in the source).
    pub fn enter_function_with(&mut self, func: FunctionRef) {
        self.current_function = Some(func.clone());
        self.symtab.enter_scope(&func.name, true);
        self.temp_counter = 0;
        self.block_counter = 0;
        self.scope_stack.push(ScopeFrame {
            kind: ScopeKind::Func,
            name: func.name.clone(),
            yield_symbol: None,
        });
    }

    fn enter_numbered(&mut self, kind: ScopeKind, create: bool) {
        self.block_counter += 1;
        let name = format!("L{}", self.block_counter);
        self.symtab.enter_scope(&name, create);
        self.scope_stack.push(ScopeFrame {
            kind,
            name,
            yield_symbol: None,
        });
    }

    pub fn enter_if(&mut self, create: bool) {
        self.enter_numbered(ScopeKind::If, create);
    }

    pub fn enter_else(&mut self, create: bool) {
        self.enter_numbered(ScopeKind::Else, create);
    }

    pub fn enter_loop(&mut self, create: bool) {
        self.enter_numbered(ScopeKind::Loop, create);
    }

    pub fn enter_while(&mut self, create: bool) {
        self.enter_numbered(ScopeKind::While, create);
    }

    pub fn enter_for(&mut self, create: bool) {
        self.enter_numbered(ScopeKind::For, create);
    }

    pub fn enter_block(&mut self, create: bool) {
        self.enter_numbered(ScopeKind::BlockExpr, create);
    }

    /// Runs the auto-type-inference check (§4.2) against the scope about to
    /// be exited, then pops both the symbol table scope and the scope
    /// stack frame. Returns the popped frame so callers (e.g. the checker,
    /// for `If`, and the IR builder, for `Loop`) can read its yield symbol.
    pub fn exit_scope(&mut self, reporter: &mut Reporter, scope_name_for_errors: &str) -> ScopeFrame {
        for value in self.symtab.current_scope_bindings() {
            let (name, pos, is_unknown) = {
                let v = value.borrow();
                (
                    v.name.clone(),
                    v.pos,
                    matches!(*v.ty, TypeKind::Unknown),
                )
            };
            if is_unknown {
                reporter.report(
                    SemErrorKind::TypeInferenceFailure,
                    format!("type of `{}` could not be inferred", name),
                    pos,
                    scope_name_for_errors,
                );
            }
        }
        self.symtab.exit_scope();
        self.scope_stack
            .pop()
            .expect("exit_scope called with an empty scope stack")
    }

    pub fn in_loop_context(&self) -> bool {
        self.scope_stack.iter().any(|f| {
            matches!(f.kind, ScopeKind::Loop | ScopeKind::While | ScopeKind::For)
        })
    }

    pub fn current_loop_frame(&self) -> Option<&ScopeFrame> {
        self.scope_stack
            .iter()
            .rev()
            .find(|f| matches!(f.kind, ScopeKind::Loop | ScopeKind::While | ScopeKind::For))
    }

    pub fn current_loop_frame_mut(&mut self) -> Option<&mut ScopeFrame> {
        self.scope_stack
            .iter_mut()
            .rev()
            .find(|f| matches!(f.kind, ScopeKind::Loop | ScopeKind::While | ScopeKind::For))
    }

    pub fn current_if_frame_mut(&mut self) -> Option<&mut ScopeFrame> {
        self.scope_stack
            .iter_mut()
            .rev()
            .find(|f| matches!(f.kind, ScopeKind::If))
    }

    pub fn current_scope_name(&self) -> String {
        self.symtab.current_scope_name()
    }

    /// Creates a temporary named `%<counter>` and increments the counter.
    pub fn produce_temp(&mut self, pos: Position, ty: crate::types::TypeRef) -> ValueRef {
        let name = format!("%{}", self.temp_counter);
        self.temp_counter += 1;
        Value::new_temporary(name, ty, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_context_detection() {
        let mut ctx = SemanticContext::new();
        ctx.enter_function("f", Position::default());
        assert!(!ctx.in_loop_context());
        ctx.enter_while(true);
        assert!(ctx.in_loop_context());
        assert!(ctx.current_if_frame_mut().is_none());
    }

    #[test]
    fn temp_counter_resets_per_function() {
        let mut ctx = SemanticContext::new();
        ctx.enter_function("f", Position::default());
        let t0 = ctx.produce_temp(Position::default(), ctx.types.int_type());
        assert_eq!(t0.borrow().name, "%0");
        let t1 = ctx.produce_temp(Position::default(), ctx.types.int_type());
        assert_eq!(t1.borrow().name, "%1");

        ctx.enter_function("g", Position::default());
        let t2 = ctx.produce_temp(Position::default(), ctx.types.int_type());
        assert_eq!(t2.borrow().name, "%0");
    }
}
