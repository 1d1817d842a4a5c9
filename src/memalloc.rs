//! Memory/value allocator (C12): the façade [`crate::codegen`] actually
//! calls. Tracks which [`regalloc::Symbol`] backs each live value and
//! drives load/spill traffic between [`RegAllocator`] and
//! [`StackAllocator`] on its behalf.
//!
//! Grounded in `examples/original_source/src/codegen/{mem_alloc.hpp,
//! mem_alloc.cpp}`: `alloc` (spill-if-reassigned-while-shared, then
//! load-or-create), `reuseReg` (bind a value to a register no instruction
//! was needed to populate, e.g. a call's `a0` result), and `allocArgv`,
//! which hands formal parameters their registers through the ordinary
//! `alloc` path and relies on first-empty-slot allocation landing them in
//! `a0, a1, a2, ...` in order rather than special-casing the binding.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::rc::Rc;

use crate::error::CompileError;
use crate::regalloc::{to_reg, Register, RegAllocator, Symbol, SymbolRef};
use crate::stackalloc::StackAllocator;
use crate::symbol::ValueRef;
use crate::types::TypeRegistry;

#[derive(Default)]
pub struct MemAllocator {
    symtab: HashMap<String, SymbolRef>,
}

impl MemAllocator {
    pub fn new() -> Self {
        MemAllocator::default()
    }

    pub fn reset(&mut self) {
        self.symtab.clear();
    }

    pub fn lookup(&self, val: &ValueRef) -> Option<SymbolRef> {
        self.symtab.get(val.borrow().key()).cloned()
    }

    /// Returns the register holding `val`, loading or allocating one if
    /// needed. `be_assigned` marks the value as about to be written, which
    /// forces any other register's aliasing copy out first and marks the
    /// stack copy stale.
    pub fn alloc(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        regalloc: &mut RegAllocator,
        types: &TypeRegistry,
        val: ValueRef,
        be_assigned: bool,
    ) -> Result<Register, CompileError> {
        assert!(!val.borrow().is_constant(), "constants never occupy a register");
        let key = val.borrow().key().to_string();

        if let Some(symbol) = self.symtab.get(&key).cloned() {
            let in_reg = symbol.borrow().in_reg;
            if in_reg && be_assigned {
                regalloc.spill_except(out, stackalloc, types, symbol.clone())?;
            }
            self.load(out, stackalloc, regalloc, types, &symbol)?;
            if symbol.borrow().on_stack && be_assigned {
                symbol.borrow_mut().dirty = true;
            }
            let regloc = symbol.borrow().regloc;
            tracing::debug!(%key, %regloc, "memalloc: alloc (tracked)");
            return Ok(regloc);
        }

        let symbol: SymbolRef = Rc::new(std::cell::RefCell::new(Symbol {
            val,
            on_stack: false,
            in_reg: true,
            dirty: false,
            stackloc: 0,
            regloc: Register::A0,
        }));
        let reg = regalloc.alloc(out, stackalloc, types, symbol.clone())?;
        symbol.borrow_mut().regloc = reg;
        self.symtab.insert(key, symbol);
        tracing::debug!(%reg, "memalloc: alloc (new)");
        Ok(reg)
    }

    fn load(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        regalloc: &mut RegAllocator,
        types: &TypeRegistry,
        symbol: &SymbolRef,
    ) -> Result<(), CompileError> {
        if symbol.borrow().in_reg {
            return Ok(());
        }
        assert!(symbol.borrow().on_stack, "a value not in a register must already be on the stack");
        let reg = regalloc.alloc(out, stackalloc, types, symbol.clone())?;
        let stackloc = symbol.borrow().stackloc;
        writeln!(out, "  lw {}, {}(sp)", reg, stackalloc.offset_from_sp(stackloc)).map_err(fmt_err)?;
        let mut s = symbol.borrow_mut();
        s.in_reg = true;
        s.dirty = false;
        s.regloc = reg;
        Ok(())
    }

    /// Binds `val` to `reg` with no load/store emitted — used for a call's
    /// return value, which the `call` instruction already left in `a0`.
    pub fn reuse_reg(
        &mut self,
        out: &mut String,
        stackalloc: &StackAllocator,
        regalloc: &mut RegAllocator,
        reg: Register,
        val: ValueRef,
    ) -> Result<(), CompileError> {
        let key = val.borrow().key().to_string();
        if let Some(symbol) = self.symtab.get(&key).cloned() {
            if symbol.borrow().in_reg {
                regalloc.free_symbol(out, stackalloc, &symbol)?;
            }
            if symbol.borrow().on_stack {
                symbol.borrow_mut().dirty = true;
            }
            {
                let mut s = symbol.borrow_mut();
                s.in_reg = true;
                s.regloc = reg;
            }
            regalloc.reuse(reg, symbol);
        } else {
            let symbol: SymbolRef = Rc::new(std::cell::RefCell::new(Symbol {
                val,
                on_stack: false,
                in_reg: true,
                dirty: false,
                stackloc: 0,
                regloc: reg,
            }));
            self.symtab.insert(key, symbol.clone());
            regalloc.reuse(reg, symbol);
        }
        Ok(())
    }

    /// Loads the formals for a `call`'s arguments into `a0, a1, ...` ahead
    /// of the `call` instruction; constants are materialized with `li`.
    pub fn prepare_params(&self, out: &mut String, stackalloc: &StackAllocator, params: &[ValueRef]) -> Result<(), CompileError> {
        assert!(params.len() <= 8, "RISC-V calling convention passes at most 8 register arguments");
        for (idx, val) in params.iter().enumerate() {
            let reg = to_reg(idx);
            if val.borrow().is_constant() {
                writeln!(out, "  li {}, {}", reg, val.borrow().key()).map_err(fmt_err)?;
            } else {
                let symbol = self
                    .symtab
                    .get(val.borrow().key())
                    .cloned()
                    .expect("call argument must already be tracked by alloc");
                let s = symbol.borrow();
                assert!(s.on_stack, "a prepared param must be resident on the stack");
                writeln!(out, "  lw {}, {}(sp)", reg, stackalloc.offset_from_sp(s.stackloc)).map_err(fmt_err)?;
            }
        }
        Ok(())
    }

    /// Binds a function's formal parameters to `a0, a1, ...` on entry.
    /// Goes through the ordinary `alloc` path (not a special no-op bypass)
    /// so that first-empty-register-in-index-order allocation naturally
    /// lands the first formal in `a0`, the second in `a1`, and so on.
    pub fn alloc_argv(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        regalloc: &mut RegAllocator,
        types: &TypeRegistry,
        argv: &[ValueRef],
    ) -> Result<(), CompileError> {
        assert!(argv.len() <= 8, "RISC-V calling convention passes at most 8 register arguments");
        for (idx, arg) in argv.iter().enumerate() {
            let reg = self.alloc(out, stackalloc, regalloc, types, arg.clone(), true)?;
            debug_assert_eq!(
                reg,
                to_reg(idx),
                "formal parameters must land in sequential a-registers on a fresh register file"
            );
        }
        Ok(())
    }
}

fn fmt_err(e: fmt::Error) -> CompileError {
    CompileError::from(e)
}
