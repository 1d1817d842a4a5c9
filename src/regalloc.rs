//! Register allocator (C11): tracks which value lives in which RISC-V
//! register, spilling to the stack on pressure.
//!
//! Grounded in `examples/original_source/src/codegen/{riscv_reg.hpp,
//! reg_alloc.hpp,reg_alloc.cpp}`: the same 27-register file split into
//! caller-saved (`a0-a7`, `t0-t6`) and callee-saved (`s0-s11`) pools, the
//! same first-empty-slot allocation with callee-saved registers paying an
//! 8-byte save on first use, and the same round-robin victim selection
//! once every pool slot is occupied. Stack interaction goes through an
//! explicit `&mut StackAllocator` parameter rather than a stored
//! reference, since Rust structs can't hold a sibling field's reference
//! the way the original's constructor-captured reference does.

use std::collections::HashMap;
use std::fmt::{self, Write};
use std::rc::Rc;

use crate::error::CompileError;
use crate::stackalloc::StackAllocator;
use crate::symbol::ValueRef;
use crate::types::TypeRegistry;

pub const CALLER_SAVED_REG_CNT: usize = 15;
pub const CALLEE_SAVED_REG_CNT: usize = 12;
pub const AVAILABLE_REG_CNT: usize = CALLER_SAVED_REG_CNT + CALLEE_SAVED_REG_CNT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    A0, A1, A2, A3, A4, A5, A6, A7,
    T0, T1, T2, T3, T4, T5, T6,
    S0, S1, S2, S3, S4, S5, S6, S7, S8, S9, S10, S11,
}

use Register::*;

const ORDER: [Register; AVAILABLE_REG_CNT] = [
    A0, A1, A2, A3, A4, A5, A6, A7,
    T0, T1, T2, T3, T4, T5, T6,
    S0, S1, S2, S3, S4, S5, S6, S7, S8, S9, S10, S11,
];

pub const CALLER_SAVED_REGS: [Register; CALLER_SAVED_REG_CNT] = [
    A0, A1, A2, A3, A4, A5, A6, A7, T0, T1, T2, T3, T4, T5, T6,
];

pub const CALLEE_SAVED_REGS: [Register; CALLEE_SAVED_REG_CNT] = [
    S0, S1, S2, S3, S4, S5, S6, S7, S8, S9, S10, S11,
];

pub fn to_index(reg: Register) -> usize {
    ORDER.iter().position(|r| *r == reg).expect("register is always in ORDER")
}

pub fn to_reg(index: usize) -> Register {
    ORDER[index]
}

pub fn is_caller(reg: Register) -> bool {
    CALLER_SAVED_REGS.contains(&reg)
}

pub fn is_callee(reg: Register) -> bool {
    CALLEE_SAVED_REGS.contains(&reg)
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            A0 => "a0", A1 => "a1", A2 => "a2", A3 => "a3",
            A4 => "a4", A5 => "a5", A6 => "a6", A7 => "a7",
            T0 => "t0", T1 => "t1", T2 => "t2", T3 => "t3",
            T4 => "t4", T5 => "t5", T6 => "t6",
            S0 => "s0", S1 => "s1", S2 => "s2", S3 => "s3",
            S4 => "s4", S5 => "s5", S6 => "s6", S7 => "s7",
            S8 => "s8", S9 => "s9", S10 => "s10", S11 => "s11",
        };
        write!(f, "{}", s)
    }
}

/// A value's residency: which register or stack slot holds it, and
/// whether the stack copy is stale (`dirty` means the register copy is
/// newer than what's on the stack, or there's no stack copy at all yet).
pub struct Symbol {
    pub val: ValueRef,
    pub on_stack: bool,
    pub in_reg: bool,
    pub dirty: bool,
    pub stackloc: i32,
    pub regloc: Register,
}

pub type SymbolRef = Rc<std::cell::RefCell<Symbol>>;

struct SavedCallee {
    stackloc: i32,
}

#[derive(Default)]
pub struct RegAllocator {
    regpool: Vec<HashMap<String, SymbolRef>>,
    spill_reg_idx: usize,
    used_callee: HashMap<Register, SavedCallee>,
}

impl RegAllocator {
    pub fn new() -> Self {
        let mut ra = RegAllocator::default();
        ra.reset();
        ra
    }

    pub fn reset(&mut self) {
        self.regpool = (0..AVAILABLE_REG_CNT).map(|_| HashMap::new()).collect();
        self.spill_reg_idx = 0;
        self.used_callee.clear();
    }

    pub fn alloc(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        types: &TypeRegistry,
        symbol: SymbolRef,
    ) -> Result<Register, CompileError> {
        let reg = self.alloc_reg(out, stackalloc, types)?;
        let key = symbol.borrow().val.borrow().key().to_string();
        self.regpool[to_index(reg)].insert(key, symbol);
        Ok(reg)
    }

    /// Inserts `symbol` into `reg`'s pool without emitting an instruction,
    /// used when a call's return value is already sitting in `a0`.
    pub fn reuse(&mut self, reg: Register, symbol: SymbolRef) {
        let key = symbol.borrow().val.borrow().key().to_string();
        self.regpool[to_index(reg)].insert(key, symbol);
    }

    fn alloc_reg(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        types: &TypeRegistry,
    ) -> Result<Register, CompileError> {
        for idx in 0..AVAILABLE_REG_CNT {
            if self.regpool[idx].is_empty() {
                let reg = to_reg(idx);
                if is_callee(reg) && !self.used_callee.contains_key(&reg) {
                    self.spill_reg_to_stack(out, stackalloc, reg)?;
                }
                return Ok(reg);
            }
        }
        self.spill(out, stackalloc, types)
    }

    fn spill_reg_to_stack(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        reg: Register,
    ) -> Result<(), CompileError> {
        let stackloc = stackalloc.alloc(out, 8, 8)?;
        writeln!(out, "  sd {}, {}(sp)", reg, stackalloc.offset_from_sp(stackloc)).map_err(fmt_err)?;
        self.used_callee.insert(reg, SavedCallee { stackloc });
        Ok(())
    }

    /// Evicts the rotating victim register, advancing the rotation.
    pub fn spill(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        types: &TypeRegistry,
    ) -> Result<Register, CompileError> {
        let victim = to_reg(self.spill_reg_idx);
        self.spill_symbol_in(out, stackalloc, types, victim)?;
        self.spill_reg_idx = (self.spill_reg_idx + 1) % AVAILABLE_REG_CNT;
        Ok(victim)
    }

    fn spill_symbol_in(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        types: &TypeRegistry,
        reg: Register,
    ) -> Result<(), CompileError> {
        let idx = to_index(reg);
        for symbol in self.regpool[idx].values() {
            let (on_stack, dirty) = {
                let s = symbol.borrow();
                (s.on_stack, s.dirty)
            };
            if on_stack && !dirty {
                continue;
            }
            if !on_stack {
                let mem = types.memory(&symbol.borrow().val.borrow().ty);
                let loc = stackalloc.spill(out, mem)?;
                let mut s = symbol.borrow_mut();
                s.stackloc = loc;
                s.on_stack = true;
            }
            let stackloc = symbol.borrow().stackloc;
            tracing::debug!(%reg, stackloc, "regalloc: spill");
            writeln!(out, "  sw {}, {}(sp)", reg, stackalloc.offset_from_sp(stackloc)).map_err(fmt_err)?;
            let mut s = symbol.borrow_mut();
            s.dirty = false;
            s.in_reg = false;
        }
        self.regpool[idx].clear();
        Ok(())
    }

    /// Spills every symbol in `reg`'s pool except `keep`, which is
    /// reinserted afterwards with no instruction emitted.
    pub fn spill_except(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        types: &TypeRegistry,
        keep: SymbolRef,
    ) -> Result<(), CompileError> {
        let reg = keep.borrow().regloc;
        self.spill_symbol_in(out, stackalloc, types, reg)?;
        self.reuse(reg, keep);
        Ok(())
    }

    pub fn spill_caller(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        types: &TypeRegistry,
    ) -> Result<(), CompileError> {
        for reg in CALLER_SAVED_REGS {
            self.spill_symbol_in(out, stackalloc, types, reg)?;
        }
        Ok(())
    }

    pub fn restore_used_callee(&self, out: &mut String, stackalloc: &StackAllocator) -> Result<(), CompileError> {
        for (reg, saved) in &self.used_callee {
            writeln!(out, "  ld {}, {}(sp)", reg, stackalloc.offset_from_sp(saved.stackloc)).map_err(fmt_err)?;
        }
        Ok(())
    }

    pub fn free_reg(
        &mut self,
        out: &mut String,
        stackalloc: &mut StackAllocator,
        types: &TypeRegistry,
        reg: Register,
    ) -> Result<(), CompileError> {
        self.spill_symbol_in(out, stackalloc, types, reg)
    }

    pub fn free_symbol(&mut self, out: &mut String, stackalloc: &StackAllocator, symbol: &SymbolRef) -> Result<(), CompileError> {
        let (in_reg, on_stack, dirty, regloc, stackloc) = {
            let s = symbol.borrow();
            (s.in_reg, s.on_stack, s.dirty, s.regloc, s.stackloc)
        };
        if !in_reg {
            return Ok(());
        }
        if on_stack && dirty {
            writeln!(out, "  sw {}, {}(sp)", regloc, stackalloc.offset_from_sp(stackloc)).map_err(fmt_err)?;
        }
        let key = symbol.borrow().val.borrow().key().to_string();
        self.regpool[to_index(regloc)].remove(&key);
        Ok(())
    }
}

fn fmt_err(e: fmt::Error) -> CompileError {
    CompileError::from(e)
}
