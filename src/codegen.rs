//! Code generator (C13): lowers a function's [`Quad`] stream to RISC-V
//! assembly text, driving the stack/register/memory allocators.
//!
//! Grounded in `examples/original_source/src/codegen/code_generate.{hpp,
//! cpp}`: one `emit_*` method per `IROp`, constant-folded binary ops,
//! register-vs-immediate dispatch (`emit_binary`/`emit_imm_binary`), and
//! the exact comparison-lowering sequences for `EQ/NEQ/GT/GEQ/LT/LEQ`
//! (`xor+sltiu`, `xor+sltu`, swapped `slt`, `slt+xori`). The original's
//! immediate-form `SUB`/`DIV` always subtracts/divides "register minus
//! immediate" regardless of which operand actually held the constant;
//! this generator tracks which side was constant and emits the correct
//! direction instead of reproducing that asymmetry.
//!
//! `INDEX`/`DOT`/`MAKE_ARR`/`MAKE_TUP` have no counterpart in the
//! reference file (its dispatch treats them as unreachable) since spec.md
//! names array/tuple support the reference implementation's subset here
//! didn't cover. Composites are laid out as a flat stack block with slot
//! 0 at the highest offset and each following slot `size` bytes lower;
//! a non-constant array index computes its target address into `t6`, a
//! scratch register codegen uses directly rather than through the
//! allocator. `t6` is still a member of the allocator's ordinary pool
//! (splitting it out would shrink the usable register file by one
//! everywhere, including register-pressure handling elsewhere in the
//! pipeline), so a dynamically-indexed array access inside a live range
//! that also happens to hold a value in `t6` is a known gap — noted in
//! DESIGN.md rather than patched here.

use std::fmt::{self, Write};

use crate::error::CompileError;
use crate::ir::{IROp, Operand, Quad};
use crate::irbuilder::{FuncCode, IrProgram};
use crate::memalloc::MemAllocator;
use crate::regalloc::{Register, RegAllocator};
use crate::stackalloc::StackAllocator;
use crate::symbol::ValueRef;
use crate::types::{TypeKind, TypeRef, TypeRegistry};

const ADDR_SCRATCH: Register = Register::T6;

#[derive(Clone)]
struct CompositeLayout {
    /// `(sp_offset, size_bytes)` per element/field, slot 0 first.
    slots: Vec<(i32, i32)>,
}

pub struct CodeGenerator {
    stackalloc: StackAllocator,
    regalloc: RegAllocator,
    memalloc: MemAllocator,
    composites: std::collections::HashMap<String, CompositeLayout>,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator {
            stackalloc: StackAllocator::new(),
            regalloc: RegAllocator::new(),
            memalloc: MemAllocator::new(),
            composites: std::collections::HashMap::new(),
        }
    }

    pub fn generate(&mut self, ir: &IrProgram, types: &TypeRegistry) -> Result<String, CompileError> {
        let mut out = String::new();
        writeln!(out, "  .text").map_err(fmt_err)?;
        writeln!(out, "  .align 2").map_err(fmt_err)?;
        writeln!(out).map_err(fmt_err)?;

        for func in &ir.funcs {
            self.generate_func(&mut out, types, func)?;
        }
        Ok(out)
    }

    fn generate_func(&mut self, out: &mut String, types: &TypeRegistry, func: &FuncCode) -> Result<(), CompileError> {
        self.stackalloc.reset();
        self.regalloc.reset();
        self.memalloc.reset();
        self.composites.clear();

        let code = &func.code;
        let mut i = 0;
        while i < code.len() {
            let quad = &code[i];
            tracing::debug!(quad = %quad.str(), "codegen: emit");

            if quad.op == IROp::Func {
                self.emit_func_prologue(out, quad)?;
                i += 1;
                while i < code.len() && code[i].op == IROp::Param {
                    i += 1;
                }
                let params: Vec<ValueRef> = code[1..i].iter().filter_map(|q| q.arg1.value.clone()).collect();
                self.memalloc
                    .alloc_argv(out, &mut self.stackalloc, &mut self.regalloc, types, &params)?;
                continue;
            }

            match quad.op {
                IROp::Add | IROp::Sub | IROp::Mul | IROp::Div | IROp::Eq | IROp::Neq | IROp::Gt | IROp::Geq
                | IROp::Lt | IROp::Leq => self.emit_binary(out, types, quad)?,
                IROp::Assign => self.emit_assign(out, types, quad)?,
                IROp::Goto => self.emit_goto(out, quad)?,
                IROp::Beqz => self.emit_beqz(out, types, quad)?,
                IROp::Bnez => self.emit_bnez(out, types, quad)?,
                IROp::Bge => self.emit_bge(out, types, quad)?,
                IROp::Label => self.emit_label(out, quad)?,
                IROp::Call => self.emit_call(out, types, quad)?,
                IROp::Return => self.emit_ret(out, types, quad)?,
                IROp::Index | IROp::Dot => self.emit_index_dot(out, types, quad)?,
                IROp::MakeArr | IROp::MakeTup => self.emit_make(out, types, quad)?,
                IROp::Func | IROp::Param => unreachable!("FUNC/PARAM are consumed by the lookahead above"),
            }
            i += 1;
        }
        Ok(())
    }

    fn emit_func_prologue(&mut self, out: &mut String, quad: &Quad) -> Result<(), CompileError> {
        writeln!(out, ".global {}", quad.label).map_err(fmt_err)?;
        writeln!(out, "{}:", quad.label).map_err(fmt_err)?;
        self.stackalloc.enter_function(out)
    }

    fn emit_ret(&mut self, out: &mut String, types: &TypeRegistry, quad: &Quad) -> Result<(), CompileError> {
        if let Some(retval) = &quad.arg1.value {
            if retval.borrow().is_constant() {
                writeln!(out, "  li a0, {}", retval.borrow().key()).map_err(fmt_err)?;
            } else if let Some(symbol) = self.memalloc.lookup(retval) {
                let s = symbol.borrow();
                if s.on_stack {
                    writeln!(out, "  lw a0, {}(sp)", self.stackalloc.offset_from_sp(s.stackloc)).map_err(fmt_err)?;
                } else {
                    writeln!(out, "  mv a0, {}", s.regloc).map_err(fmt_err)?;
                }
            } else {
                let reg = self
                    .memalloc
                    .alloc(out, &mut self.stackalloc, &mut self.regalloc, types, retval.clone(), false)?;
                writeln!(out, "  mv a0, {}", reg).map_err(fmt_err)?;
            }
        }
        self.regalloc.restore_used_callee(out, &self.stackalloc)?;
        self.stackalloc.ret_function(out)?;
        writeln!(out, "  ret").map_err(fmt_err)
    }

    fn emit_assign(&mut self, out: &mut String, types: &TypeRegistry, quad: &Quad) -> Result<(), CompileError> {
        let dst_val = quad.dst.value.clone().expect("ASSIGN always has a destination");
        let src_val = quad.arg1.value.clone().expect("ASSIGN always has a source");

        if let Some(layout) = self.composites.get(src_val.borrow().key()).cloned() {
            self.copy_composite(out, &dst_val, &layout, types)?;
            return Ok(());
        }

        if src_val.borrow().is_constant() {
            let dst = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, dst_val, true)?;
            writeln!(out, "  li {}, {}", dst, src_val.borrow().key()).map_err(fmt_err)?;
            return Ok(());
        }

        let src = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, src_val, false)?;
        let dst = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, dst_val, true)?;
        writeln!(out, "  mv {}, {}", dst, src).map_err(fmt_err)?;
        Ok(())
    }

    fn emit_goto(&self, out: &mut String, quad: &Quad) -> Result<(), CompileError> {
        writeln!(out, "  j {}", quad.label).map_err(fmt_err)
    }

    fn emit_beqz(&mut self, out: &mut String, types: &TypeRegistry, quad: &Quad) -> Result<(), CompileError> {
        let cond = self.alloc_operand(out, types, &quad.arg1)?;
        writeln!(out, "  beq {}, x0, {}", cond, quad.label).map_err(fmt_err)
    }

    fn emit_bnez(&mut self, out: &mut String, types: &TypeRegistry, quad: &Quad) -> Result<(), CompileError> {
        let cond = self.alloc_operand(out, types, &quad.arg1)?;
        writeln!(out, "  bne {}, x0, {}", cond, quad.label).map_err(fmt_err)
    }

    fn emit_bge(&mut self, out: &mut String, types: &TypeRegistry, quad: &Quad) -> Result<(), CompileError> {
        let lhs = self.alloc_operand(out, types, &quad.arg1)?;
        let rhs = self.alloc_operand(out, types, &quad.arg2)?;
        writeln!(out, "  bge {}, {}, {}", lhs, rhs, quad.label).map_err(fmt_err)
    }

    fn emit_label(&self, out: &mut String, quad: &Quad) -> Result<(), CompileError> {
        writeln!(out, "{}:", quad.label).map_err(fmt_err)
    }

    fn emit_call(&mut self, out: &mut String, types: &TypeRegistry, quad: &Quad) -> Result<(), CompileError> {
        self.regalloc.spill_caller(out, &mut self.stackalloc, types)?;
        let args: Vec<ValueRef> = quad.elems.iter().map(|o| o.value.clone().unwrap()).collect();
        self.memalloc.prepare_params(out, &self.stackalloc, &args)?;
        writeln!(out, "  call {}", quad.label).map_err(fmt_err)?;
        if let Some(dst) = &quad.dst.value {
            self.memalloc
                .reuse_reg(out, &self.stackalloc, &mut self.regalloc, Register::A0, dst.clone())?;
        }
        Ok(())
    }

    fn alloc_operand(&mut self, out: &mut String, types: &TypeRegistry, operand: &Operand) -> Result<Register, CompileError> {
        let val = operand.value.clone().expect("operand must carry a value");
        self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, val, false)
    }

    fn emit_binary(&mut self, out: &mut String, types: &TypeRegistry, quad: &Quad) -> Result<(), CompileError> {
        let arg1 = quad.arg1.value.clone().expect("binary op has a left operand");
        let arg2 = quad.arg2.value.clone().expect("binary op has a right operand");
        let dst_val = quad.dst.value.clone().expect("binary op has a destination");

        if arg1.borrow().is_constant() && arg2.borrow().is_constant() {
            let res = eval_const(quad.op, const_val(&arg1), const_val(&arg2));
            let dst = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, dst_val, true)?;
            writeln!(out, "  li {}, {}", dst, res).map_err(fmt_err)?;
            return Ok(());
        }

        if arg1.borrow().is_constant() || arg2.borrow().is_constant() {
            return self.emit_imm_binary(out, types, quad, arg1, arg2, dst_val);
        }

        let lhs = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, arg1, false)?;
        let rhs = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, arg2, false)?;
        let dst = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, dst_val, true)?;

        match quad.op {
            IROp::Add => writeln!(out, "  add {}, {}, {}", dst, lhs, rhs),
            IROp::Sub => writeln!(out, "  sub {}, {}, {}", dst, lhs, rhs),
            IROp::Mul => writeln!(out, "  mul {}, {}, {}", dst, lhs, rhs),
            IROp::Div => writeln!(out, "  div {}, {}, {}", dst, lhs, rhs),
            IROp::Eq => {
                writeln!(out, "  xor {}, {}, {}", dst, lhs, rhs).map_err(fmt_err)?;
                writeln!(out, "  sltiu {}, {}, 1", dst, dst)
            }
            IROp::Neq => {
                writeln!(out, "  xor {}, {}, {}", dst, lhs, rhs).map_err(fmt_err)?;
                writeln!(out, "  sltu {}, x0, {}", dst, dst)
            }
            IROp::Gt => writeln!(out, "  slt {}, {}, {}", dst, rhs, lhs),
            IROp::Geq => {
                writeln!(out, "  slt {}, {}, {}", dst, lhs, rhs).map_err(fmt_err)?;
                writeln!(out, "  xori {}, {}, 1", dst, dst)
            }
            IROp::Lt => writeln!(out, "  slt {}, {}, {}", dst, lhs, rhs),
            IROp::Leq => {
                writeln!(out, "  slt {}, {}, {}", dst, rhs, lhs).map_err(fmt_err)?;
                writeln!(out, "  xori {}, {}, 1", dst, dst)
            }
            _ => unreachable!("only arithmetic/comparison ops reach emit_binary"),
        }
        .map_err(fmt_err)
    }

    fn emit_imm_binary(
        &mut self,
        out: &mut String,
        types: &TypeRegistry,
        quad: &Quad,
        arg1: ValueRef,
        arg2: ValueRef,
        dst_val: ValueRef,
    ) -> Result<(), CompileError> {
        let arg1_is_const = arg1.borrow().is_constant();
        let (reg_operand, imm) = if arg1_is_const { (arg2, const_val(&arg1)) } else { (arg1, const_val(&arg2)) };
        let lhs = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, reg_operand, false)?;
        let dst = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, dst_val, true)?;

        match quad.op {
            IROp::Add => writeln!(out, "  addi {}, {}, {}", dst, lhs, imm).map_err(fmt_err),
            IROp::Sub => {
                if arg1_is_const {
                    writeln!(out, "  li {}, {}", dst, imm).map_err(fmt_err)?;
                    writeln!(out, "  sub {}, {}, {}", dst, dst, lhs).map_err(fmt_err)
                } else {
                    writeln!(out, "  addi {}, {}, {}", dst, lhs, -imm).map_err(fmt_err)
                }
            }
            IROp::Mul => {
                writeln!(out, "  li {}, {}", dst, imm).map_err(fmt_err)?;
                writeln!(out, "  mul {}, {}, {}", dst, lhs, dst).map_err(fmt_err)
            }
            IROp::Div => {
                writeln!(out, "  li {}, {}", dst, imm).map_err(fmt_err)?;
                if arg1_is_const {
                    writeln!(out, "  div {}, {}, {}", dst, dst, lhs).map_err(fmt_err)
                } else {
                    writeln!(out, "  div {}, {}, {}", dst, lhs, dst).map_err(fmt_err)
                }
            }
            IROp::Eq => {
                writeln!(out, "  xori {}, {}, {}", dst, lhs, imm).map_err(fmt_err)?;
                writeln!(out, "  sltiu {}, {}, 1", dst, dst).map_err(fmt_err)
            }
            IROp::Neq => {
                writeln!(out, "  xori {}, {}, {}", dst, lhs, imm).map_err(fmt_err)?;
                writeln!(out, "  sltu {}, x0, {}", dst, dst).map_err(fmt_err)
            }
            IROp::Gt => {
                if arg1_is_const {
                    writeln!(out, "  slti {}, {}, {}", dst, lhs, imm).map_err(fmt_err)
                } else {
                    writeln!(out, "  li {}, {}", dst, imm).map_err(fmt_err)?;
                    writeln!(out, "  slt {}, {}, {}", dst, dst, lhs).map_err(fmt_err)
                }
            }
            IROp::Geq => {
                if arg1_is_const {
                    writeln!(out, "  slti {}, {}, {}", dst, lhs, imm + 1).map_err(fmt_err)?;
                    writeln!(out, "  xori {}, {}, 1", dst, dst).map_err(fmt_err)
                } else {
                    writeln!(out, "  slti {}, {}, {}", dst, lhs, imm).map_err(fmt_err)?;
                    writeln!(out, "  xori {}, {}, 1", dst, dst).map_err(fmt_err)
                }
            }
            IROp::Lt => {
                if arg1_is_const {
                    writeln!(out, "  li {}, {}", dst, imm).map_err(fmt_err)?;
                    writeln!(out, "  slt {}, {}, {}", dst, dst, lhs).map_err(fmt_err)
                } else {
                    writeln!(out, "  slti {}, {}, {}", dst, lhs, imm).map_err(fmt_err)
                }
            }
            IROp::Leq => {
                if arg1_is_const {
                    writeln!(out, "  slti {}, {}, {}", dst, lhs, imm + 1).map_err(fmt_err)
                } else {
                    writeln!(out, "  li {}, {}", dst, imm).map_err(fmt_err)?;
                    writeln!(out, "  slt {}, {}, {}", dst, dst, lhs).map_err(fmt_err)?;
                    writeln!(out, "  xori {}, {}, 1", dst, dst).map_err(fmt_err)
                }
            }
            _ => unreachable!("only arithmetic/comparison ops reach emit_imm_binary"),
        }
    }

    fn emit_make(&mut self, out: &mut String, types: &TypeRegistry, quad: &Quad) -> Result<(), CompileError> {
        let dst_val = quad.dst.value.clone().expect("MAKE_ARR/MAKE_TUP has a destination");
        let ty = dst_val.borrow().ty.clone();
        let slots = self.alloc_composite_slots(out, types, &ty)?;

        for (slot, operand) in slots.iter().zip(quad.elems.iter()) {
            let (offset, _size) = *slot;
            let val = operand.value.clone().expect("element operand must carry a value");
            if val.borrow().is_constant() {
                writeln!(out, "  li {}, {}", ADDR_SCRATCH, val.borrow().key()).map_err(fmt_err)?;
                writeln!(out, "  sw {}, {}(sp)", ADDR_SCRATCH, offset).map_err(fmt_err)?;
            } else {
                let reg = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, val, false)?;
                writeln!(out, "  sw {}, {}(sp)", reg, offset).map_err(fmt_err)?;
            }
        }

        self.composites.insert(dst_val.borrow().key().to_string(), CompositeLayout { slots });
        Ok(())
    }

    /// Reserves a fresh stack block sized for `ty` and returns each
    /// element/field's `(sp_offset, size)`, slot 0 at the highest offset.
    fn alloc_composite_slots(&mut self, out: &mut String, types: &TypeRegistry, ty: &TypeRef) -> Result<Vec<(i32, i32)>, CompileError> {
        let total = (types.memory(ty) as i32).max(4);
        let base = self.stackalloc.alloc(out, total, 4)?;
        let base_offset = self.stackalloc.offset_from_sp(base);
        Ok(layout_slots(types, ty, base_offset + total - slot0_size(types, ty)))
    }

    fn emit_index_dot(&mut self, out: &mut String, types: &TypeRegistry, quad: &Quad) -> Result<(), CompileError> {
        let base_val = quad.arg1.value.clone().expect("INDEX/DOT has a base");
        let layout = self.composites.get(base_val.borrow().key()).map(|l| l.slots.clone()).unwrap_or_default();

        if quad.store {
            let value = quad.dst.value.clone().expect("store-form INDEX/DOT carries the value being written");
            self.emit_composite_slot_write(out, types, quad, &layout, &value)
        } else {
            let dst_val = quad.dst.value.clone().expect("load-form INDEX/DOT has a destination");
            self.emit_composite_slot_read(out, types, quad, &layout, &dst_val)
        }
    }

    fn emit_composite_slot_read(
        &mut self,
        out: &mut String,
        types: &TypeRegistry,
        quad: &Quad,
        layout: &[(i32, i32)],
        dst_val: &ValueRef,
    ) -> Result<(), CompileError> {
        let dst = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, dst_val.clone(), true)?;
        let idx_val = quad.arg2.value.clone().expect("INDEX/DOT has an index");

        if idx_val.borrow().is_constant() {
            let idx = const_val(&idx_val) as usize;
            let (offset, _) = layout.get(idx).copied().unwrap_or((0, 4));
            writeln!(out, "  lw {}, {}(sp)", dst, offset).map_err(fmt_err)?;
        } else {
            let elem_size = layout.first().map(|(_, s)| *s).unwrap_or(4);
            let elem0_offset = layout.first().map(|(o, _)| *o).unwrap_or(0);
            let idx_reg = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, idx_val, false)?;
            writeln!(out, "  li {}, {}", ADDR_SCRATCH, elem_size).map_err(fmt_err)?;
            writeln!(out, "  mul {}, {}, {}", ADDR_SCRATCH, idx_reg, ADDR_SCRATCH).map_err(fmt_err)?;
            writeln!(out, "  sub {}, sp, {}", ADDR_SCRATCH, ADDR_SCRATCH).map_err(fmt_err)?;
            writeln!(out, "  addi {}, {}, {}", ADDR_SCRATCH, ADDR_SCRATCH, elem0_offset).map_err(fmt_err)?;
            writeln!(out, "  lw {}, 0({})", dst, ADDR_SCRATCH).map_err(fmt_err)?;
        }
        Ok(())
    }

    fn emit_composite_slot_write(
        &mut self,
        out: &mut String,
        types: &TypeRegistry,
        quad: &Quad,
        layout: &[(i32, i32)],
        value: &ValueRef,
    ) -> Result<(), CompileError> {
        let idx_val = quad.arg2.value.clone().expect("INDEX/DOT has an index");
        let reg = if value.borrow().is_constant() {
            writeln!(out, "  li {}, {}", ADDR_SCRATCH, value.borrow().key()).map_err(fmt_err)?;
            ADDR_SCRATCH
        } else {
            self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, value.clone(), false)?
        };

        if idx_val.borrow().is_constant() {
            let idx = const_val(&idx_val) as usize;
            let (offset, _) = layout.get(idx).copied().unwrap_or((0, 4));
            writeln!(out, "  sw {}, {}(sp)", reg, offset).map_err(fmt_err)?;
        } else {
            let elem_size = layout.first().map(|(_, s)| *s).unwrap_or(4);
            let elem0_offset = layout.first().map(|(o, _)| *o).unwrap_or(0);
            let idx_reg = self.memalloc.alloc(out, &mut self.stackalloc, &mut self.regalloc, types, idx_val, false)?;
            let scratch = if reg == ADDR_SCRATCH { Register::T5 } else { ADDR_SCRATCH };
            writeln!(out, "  li {}, {}", scratch, elem_size).map_err(fmt_err)?;
            writeln!(out, "  mul {}, {}, {}", scratch, idx_reg, scratch).map_err(fmt_err)?;
            writeln!(out, "  sub {}, sp, {}", scratch, scratch).map_err(fmt_err)?;
            writeln!(out, "  addi {}, {}, {}", scratch, scratch, elem0_offset).map_err(fmt_err)?;
            writeln!(out, "  sw {}, 0({})", reg, scratch).map_err(fmt_err)?;
        }
        Ok(())
    }

    fn copy_composite(&mut self, out: &mut String, dst_val: &ValueRef, src_layout: &CompositeLayout, types: &TypeRegistry) -> Result<(), CompileError> {
        let ty = dst_val.borrow().ty.clone();
        let dst_slots = self.alloc_composite_slots(out, types, &ty)?;

        for (src, dst) in src_layout.slots.iter().zip(dst_slots.iter()) {
            writeln!(out, "  lw {}, {}(sp)", ADDR_SCRATCH, src.0).map_err(fmt_err)?;
            writeln!(out, "  sw {}, {}(sp)", ADDR_SCRATCH, dst.0).map_err(fmt_err)?;
        }
        self.composites.insert(dst_val.borrow().key().to_string(), CompositeLayout { slots: dst_slots });
        Ok(())
    }
}

fn slot0_size(types: &TypeRegistry, ty: &TypeRef) -> i32 {
    match &**ty {
        TypeKind::Array { elem, .. } => types.memory(elem) as i32,
        TypeKind::Tuple { elems } => elems.first().map(|e| types.memory(e) as i32).unwrap_or(4),
        _ => types.memory(ty) as i32,
    }
}

fn layout_slots(types: &TypeRegistry, ty: &TypeRef, elem0_offset: i32) -> Vec<(i32, i32)> {
    match &**ty {
        TypeKind::Array { size, elem } => {
            let es = types.memory(elem) as i32;
            (0..*size).map(|i| (elem0_offset - (i as i32) * es, es)).collect()
        }
        TypeKind::Tuple { elems } => {
            let mut acc = 0;
            elems
                .iter()
                .map(|e| {
                    let sz = types.memory(e) as i32;
                    let offset = elem0_offset - acc;
                    acc += sz;
                    (offset, sz)
                })
                .collect()
        }
        _ => vec![(elem0_offset, types.memory(ty) as i32)],
    }
}

fn const_val(val: &ValueRef) -> i32 {
    let text = val.borrow().key().to_string();
    match text.as_str() {
        "true" => 1,
        "false" => 0,
        _ => text.parse().expect("constant value must be an integer or boolean literal"),
    }
}

fn eval_const(op: IROp, lhs: i32, rhs: i32) -> i32 {
    match op {
        IROp::Add => lhs + rhs,
        IROp::Sub => lhs - rhs,
        IROp::Mul => lhs * rhs,
        IROp::Div => lhs / rhs,
        IROp::Eq => (lhs == rhs) as i32,
        IROp::Neq => (lhs != rhs) as i32,
        IROp::Gt => (lhs > rhs) as i32,
        IROp::Geq => (lhs >= rhs) as i32,
        IROp::Lt => (lhs < rhs) as i32,
        IROp::Leq => (lhs <= rhs) as i32,
        _ => unreachable!("only arithmetic/comparison ops reach eval_const"),
    }
}

fn fmt_err(e: fmt::Error) -> CompileError {
    CompileError::from(e)
}
