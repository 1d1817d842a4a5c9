//! IR builder (C9): lowers a checked AST into linear [`Quad`] sequences.
//!
//! Grounded in `examples/original_source/src/ir/ir_quad.hpp`'s factory
//! idiom and spec.md §4.6 ("each node's quad list is the concatenation of
//! its children's lists plus any quads it adds itself"): every `build_*`
//! method returns the flattened `Vec<Quad>` for the subtree it covers,
//! built bottom-up from its children's returned lists, rather than
//! maintaining a second `NodeId`-keyed side table alongside the checker's.
//! Variable/literal/temporary places are read straight out of the
//! checker's `attrs` table (C7) instead of being re-resolved through the
//! symbol table, since `attrs` already carries the exact entity each
//! expression's check pass bound.

use crate::ast::*;
use crate::checker::CheckOutcome;
use crate::ir::{IROp, Quad};
use crate::symbol::ValueRef;

/// One function's lowered code.
pub struct FuncCode {
    pub name: String,
    pub code: Vec<Quad>,
}

pub struct IrProgram {
    pub funcs: Vec<FuncCode>,
}

/// Lowers every function in `program` using the side tables `outcome`
/// carries from the check pass. Assumes `outcome` is free of semantic
/// errors; the driver never calls this otherwise (§7).
pub fn build_program(program: &Program, outcome: &CheckOutcome) -> IrProgram {
    let mut funcs = Vec::with_capacity(program.functions.len());
    for (fdef, func) in program.functions.iter().zip(outcome.functions.iter()) {
        let mut builder = IrBuilder {
            outcome,
            label_counter: 0,
            loops: Vec::new(),
            current_func: fdef.name.clone(),
        };
        let mut code = vec![Quad::make_func(&fdef.name)];
        for p in &func.params {
            code.push(Quad::make_param(p.clone()));
        }
        let (body_code, yielded) = builder.build_block(&fdef.body);
        code.extend(body_code);

        let implicit_return = !flow_block_returns(&fdef.body);
        if implicit_return {
            match yielded {
                Some(v) => code.push(Quad::make_ret(v, &fdef.name)),
                None => code.push(Quad::make_ret_void(&fdef.name)),
            }
        }
        funcs.push(FuncCode { name: fdef.name.clone(), code });
    }
    IrProgram { funcs }
}

fn flow_block_returns(block: &Block) -> bool {
    crate::flow::block_returns(block)
}

struct LoopFrame {
    continue_label: String,
    break_label: String,
    yield_symbol: Option<ValueRef>,
}

struct IrBuilder<'a> {
    outcome: &'a CheckOutcome,
    label_counter: usize,
    loops: Vec<LoopFrame>,
    current_func: String,
}

impl<'a> IrBuilder<'a> {
    fn fresh_label(&mut self, tag: &str) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!(".L{}_{}", tag, n)
    }

    fn attrs(&self, id: NodeId) -> &crate::checker::ExprAttrs {
        self.outcome
            .attrs
            .get(&id)
            .expect("every expression node is checked before IR building")
    }

    fn symbol_of(&self, id: NodeId) -> ValueRef {
        self.attrs(id)
            .symbol
            .clone()
            .expect("expression node has no place to hold its value")
    }

    /// Builds a block, returning its code and (if the block is
    /// expression-valued — its last statement a semicolon-less expression)
    /// the value that block yields.
    fn build_block(&mut self, block: &Block) -> (Vec<Quad>, Option<ValueRef>) {
        let mut code = Vec::new();
        let n = block.stmts.len();
        let mut yielded = None;
        for (i, stmt) in block.stmts.iter().enumerate() {
            match &stmt.kind {
                StmtKind::Let { init, .. } => {
                    code.extend(self.build_expr(init));
                    let var = self
                        .outcome
                        .let_vars
                        .get(&stmt.id)
                        .cloned()
                        .expect("let statement has a recorded variable entity");
                    let init_sym = self.symbol_of(init.id);
                    code.push(Quad::make_assign(var, init_sym));
                }
                StmtKind::Expr { expr, has_semi } => {
                    code.extend(self.build_expr(expr));
                    if i + 1 == n && !has_semi {
                        yielded = self.attrs(expr.id).symbol.clone();
                    }
                }
            }
        }
        (code, yielded)
    }

    /// Builds an expression's quads. The expression's own result (if any)
    /// is always left in `attrs(expr.id).symbol` by the time this returns.
    fn build_expr(&mut self, expr: &Expr) -> Vec<Quad> {
        match &expr.kind {
            ExprKind::Number(_) | ExprKind::Bool(_) => Vec::new(),
            ExprKind::Variable(_) => Vec::new(),
            ExprKind::ArrAcc { base, idx } => {
                let mut code = self.build_expr(base);
                code.extend(self.build_expr(idx));
                let dst = self.symbol_of(expr.id);
                code.push(Quad::make_index(dst, self.symbol_of(base.id), self.symbol_of(idx.id)));
                code
            }
            ExprKind::TupAcc { base, idx } => {
                let mut code = self.build_expr(base);
                let idx_sym = self.literal_index(*idx, base.pos);
                let dst = self.symbol_of(expr.id);
                code.push(Quad::make_dot(dst, self.symbol_of(base.id), idx_sym));
                code
            }
            ExprKind::Assign { lval, rval } => self.build_assign(lval, rval),
            ExprKind::Cmp { op, lhs, rhs } => {
                let mut code = self.build_expr(lhs);
                code.extend(self.build_expr(rhs));
                let dst = self.symbol_of(expr.id);
                code.push(Quad::make_binary((*op).into(), dst, self.symbol_of(lhs.id), self.symbol_of(rhs.id)));
                code
            }
            ExprKind::Ari { op, lhs, rhs } => {
                let mut code = self.build_expr(lhs);
                code.extend(self.build_expr(rhs));
                let dst = self.symbol_of(expr.id);
                code.push(Quad::make_binary((*op).into(), dst, self.symbol_of(lhs.id), self.symbol_of(rhs.id)));
                code
            }
            ExprKind::ArrElems(elems) => {
                let mut code = Vec::new();
                let mut syms = Vec::with_capacity(elems.len());
                for e in elems {
                    code.extend(self.build_expr(e));
                    syms.push(self.symbol_of(e.id));
                }
                let dst = self.symbol_of(expr.id);
                code.push(Quad::make_elems(IROp::MakeArr, dst, syms));
                code
            }
            ExprKind::TupElems(elems) => {
                let mut code = Vec::new();
                let mut syms = Vec::with_capacity(elems.len());
                for e in elems {
                    code.extend(self.build_expr(e));
                    syms.push(self.symbol_of(e.id));
                }
                let dst = self.symbol_of(expr.id);
                code.push(Quad::make_elems(IROp::MakeTup, dst, syms));
                code
            }
            ExprKind::Block(b) => {
                let (code, yielded) = self.build_block(b);
                if let Some(dst) = self.attrs(expr.id).symbol.clone() {
                    let mut code = code;
                    if let Some(y) = yielded {
                        code.push(Quad::make_assign(dst, y));
                    }
                    return code;
                }
                code
            }
            ExprKind::Call { callee, args } => {
                let mut code = Vec::new();
                let mut syms = Vec::with_capacity(args.len());
                for a in args {
                    code.extend(self.build_expr(a));
                    syms.push(self.symbol_of(a.id));
                }
                let dst = self.attrs(expr.id).symbol.clone();
                code.push(Quad::make_call(dst, callee.clone(), syms));
                code
            }
            ExprKind::If { cond, body, else_ } => self.build_if(expr.id, cond, body, else_),
            ExprKind::While { cond, body } => self.build_while(cond, body),
            ExprKind::For { var: _, source, body } => self.build_for(expr.id, source, body),
            ExprKind::Loop { body } => self.build_loop(expr.id, body),
            ExprKind::Return(value) => {
                let mut code = Vec::new();
                let func_name = self.current_func.clone();
                match value {
                    Some(v) => {
                        code.extend(self.build_expr(v));
                        code.push(Quad::make_ret(self.symbol_of(v.id), func_name));
                    }
                    None => code.push(Quad::make_ret_void(func_name)),
                }
                code
            }
            ExprKind::Break(value) => {
                let mut code = Vec::new();
                let frame_yield = self.loops.last().and_then(|f| f.yield_symbol.clone());
                if let Some(v) = value {
                    code.extend(self.build_expr(v));
                    if let Some(dst) = frame_yield {
                        code.push(Quad::make_assign(dst, self.symbol_of(v.id)));
                    }
                }
                let label = self
                    .loops
                    .last()
                    .expect("break only appears inside a loop, enforced by the checker")
                    .break_label
                    .clone();
                code.push(Quad::make_goto(label));
                code
            }
            ExprKind::Continue => {
                let label = self
                    .loops
                    .last()
                    .expect("continue only appears inside a loop, enforced by the checker")
                    .continue_label
                    .clone();
                vec![Quad::make_goto(label)]
            }
        }
    }

    /// A constant entity naming a literal tuple index (`.0`, `.1`, ...).
    fn literal_index(&mut self, idx: usize, pos: crate::source::Position) -> ValueRef {
        let ty = self.int_type();
        crate::symbol::Value::new_constant(idx.to_string(), ty, pos)
    }

    fn int_type(&self) -> crate::types::TypeRef {
        self.outcome.ctx.types.int_type()
    }

    fn build_assign(&mut self, lval: &Expr, rval: &Expr) -> Vec<Quad> {
        let mut code = self.build_expr(rval);
        let rhs = self.symbol_of(rval.id);
        match &lval.kind {
            ExprKind::Variable(_) => {
                let var = self
                    .attrs(lval.id)
                    .symbol
                    .clone()
                    .expect("assignment target variable is recorded by the checker");
                code.push(Quad::make_assign(var, rhs));
            }
            ExprKind::ArrAcc { base, idx } => {
                code.extend(self.build_expr(base));
                code.extend(self.build_expr(idx));
                code.push(Quad::make_store_index(self.symbol_of(base.id), self.symbol_of(idx.id), rhs));
            }
            ExprKind::TupAcc { base, idx } => {
                code.extend(self.build_expr(base));
                let idx_sym = self.literal_index(*idx, base.pos);
                code.push(Quad::make_store_dot(self.symbol_of(base.id), idx_sym, rhs));
            }
            _ => unreachable!("checker rejects any other assignment target"),
        }
        code
    }

    fn build_if(
        &mut self,
        id: NodeId,
        cond: &Expr,
        body: &Block,
        else_: &Option<Box<ElseClause>>,
    ) -> Vec<Quad> {
        let mut code = self.build_expr(cond);
        let cond_sym = self.symbol_of(cond.id);
        let else_label = self.fresh_label("else");
        let end_label = self.fresh_label("endif");
        let dst = self.attrs(id).symbol.clone();

        code.push(Quad::make_beqz(cond_sym, else_label.clone()));
        let (then_code, then_yield) = self.build_block(body);
        code.extend(then_code);
        if let (Some(d), Some(y)) = (&dst, &then_yield) {
            code.push(Quad::make_assign(d.clone(), y.clone()));
        }
        code.push(Quad::make_goto(end_label.clone()));
        code.push(Quad::make_label(else_label));

        match else_ {
            None => {}
            Some(clause) => match clause.as_ref() {
                ElseClause::Else(eb) => {
                    let (else_code, else_yield) = self.build_block(eb);
                    code.extend(else_code);
                    if let (Some(d), Some(y)) = (&dst, &else_yield) {
                        code.push(Quad::make_assign(d.clone(), y.clone()));
                    }
                }
                ElseClause::ElseIf(nested) => {
                    code.extend(self.build_expr(nested));
                    if let Some(d) = &dst {
                        code.push(Quad::make_assign(d.clone(), self.symbol_of(nested.id)));
                    }
                }
            },
        }
        code.push(Quad::make_label(end_label));
        code
    }

    fn build_while(&mut self, cond: &Expr, body: &Block) -> Vec<Quad> {
        let start_label = self.fresh_label("while");
        let end_label = self.fresh_label("endwhile");

        self.loops.push(LoopFrame {
            continue_label: start_label.clone(),
            break_label: end_label.clone(),
            yield_symbol: None,
        });

        let mut code = vec![Quad::make_label(start_label.clone())];
        code.extend(self.build_expr(cond));
        code.push(Quad::make_beqz(self.symbol_of(cond.id), end_label.clone()));
        let (body_code, _) = self.build_block(body);
        code.extend(body_code);
        code.push(Quad::make_goto(start_label));
        code.push(Quad::make_label(end_label));

        self.loops.pop();
        code
    }

    fn build_for(&mut self, id: NodeId, source: &ForSource, body: &Block) -> Vec<Quad> {
        let var = self
            .outcome
            .for_vars
            .get(&id)
            .cloned()
            .expect("for loop has a recorded induction variable");

        let mut code = Vec::new();
        let one = crate::symbol::Value::new_constant("1", self.int_type(), crate::source::Position::default());

        match source {
            ForSource::Range { start, end } => {
                code.extend(self.build_expr(start));
                code.push(Quad::make_assign(var.clone(), self.symbol_of(start.id)));
                code.extend(self.build_expr(end));
                let end_sym = self.symbol_of(end.id);

                let start_label = self.fresh_label("for");
                let inc_label = self.fresh_label("forinc");
                let end_label = self.fresh_label("endfor");
                self.loops.push(LoopFrame {
                    continue_label: inc_label.clone(),
                    break_label: end_label.clone(),
                    yield_symbol: None,
                });

                code.push(Quad::make_label(start_label.clone()));
                code.push(Quad::make_bge(var.clone(), end_sym, end_label.clone()));
                let (body_code, _) = self.build_block(body);
                code.extend(body_code);
                code.push(Quad::make_label(inc_label));
                code.push(Quad::make_binary(IROp::Add, var.clone(), var, one));
                code.push(Quad::make_goto(start_label));
                code.push(Quad::make_label(end_label));
                self.loops.pop();
            }
            ForSource::Iterable(value) => {
                code.extend(self.build_expr(value));
                let arr = self.symbol_of(value.id);
                let len = match &*self.attrs(value.id).ty {
                    crate::types::TypeKind::Array { size, .. } => *size,
                    _ => 0,
                };
                let len_const = crate::symbol::Value::new_constant(
                    len.to_string(),
                    self.int_type(),
                    crate::source::Position::default(),
                );
                let idx = crate::symbol::Value::new_temporary(
                    format!("%forIdx{}", id.0),
                    self.int_type(),
                    crate::source::Position::default(),
                );
                let zero = crate::symbol::Value::new_constant("0", self.int_type(), crate::source::Position::default());
                code.push(Quad::make_assign(idx.clone(), zero));

                let start_label = self.fresh_label("for");
                let inc_label = self.fresh_label("forinc");
                let end_label = self.fresh_label("endfor");
                self.loops.push(LoopFrame {
                    continue_label: inc_label.clone(),
                    break_label: end_label.clone(),
                    yield_symbol: None,
                });

                code.push(Quad::make_label(start_label.clone()));
                code.push(Quad::make_bge(idx.clone(), len_const, end_label.clone()));
                code.push(Quad::make_index(var.clone(), arr, idx.clone()));
                let (body_code, _) = self.build_block(body);
                code.extend(body_code);
                code.push(Quad::make_label(inc_label));
                code.push(Quad::make_binary(IROp::Add, idx.clone(), idx, one));
                code.push(Quad::make_goto(start_label));
                code.push(Quad::make_label(end_label));
                self.loops.pop();
            }
        }
        code
    }

    fn build_loop(&mut self, id: NodeId, body: &Block) -> Vec<Quad> {
        let start_label = self.fresh_label("loop");
        let end_label = self.fresh_label("endloop");
        let yield_symbol = self.attrs(id).symbol.clone();

        self.loops.push(LoopFrame {
            continue_label: start_label.clone(),
            break_label: end_label.clone(),
            yield_symbol,
        });

        let mut code = vec![Quad::make_label(start_label.clone())];
        let (body_code, _) = self.build_block(body);
        code.extend(body_code);
        code.push(Quad::make_goto(start_label));
        code.push(Quad::make_label(end_label));

        self.loops.pop();
        code
    }
}
