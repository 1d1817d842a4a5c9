//! Semantic checker (C7): AST-walking type checker and validator.
//!
//! Grounded in `examples/original_source/src/semantic/semantic_checker.hpp`
//! (one check method per node shape, a shared error reporter and symbol
//! table) and spec.md §4.5. Rather than mutating AST nodes in place (the
//! original attaches a `type` field directly to each node), this walk
//! writes into a `NodeId`-keyed side table of [`ExprAttrs`] so the tree
//! built by `parser.rs` stays immutable; `irbuilder.rs` reads the same
//! table back out.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::*;
use crate::context::{ScopeKind, SemanticContext};
use crate::flow;
use crate::reporter::{Reporter, SemErrorKind};
use crate::source::Position;
use crate::symbol::{Function, FunctionRef, Value, ValueRef};
use crate::types::{TypeKind, TypeRef};

/// Per-node results attached by the checker (§4.5): the node's type, the
/// value entity that names its result (absent for pure-statement shapes),
/// whether that result can be used as a mutable place, and whether the
/// node is itself a bare variable reference.
#[derive(Clone)]
pub struct ExprAttrs {
    pub ty: TypeRef,
    pub symbol: Option<ValueRef>,
    pub res_mut: bool,
    pub is_var: bool,
}

/// Everything downstream stages need after checking: the annotated side
/// table, the semantic context (its symbol table and scope-name counters
/// are re-entered by the IR builder), and the functions in declaration
/// order (so codegen emits them in source order).
pub struct CheckOutcome {
    pub ctx: SemanticContext,
    pub attrs: HashMap<NodeId, ExprAttrs>,
    pub functions: Vec<FunctionRef>,
    /// The value entity a `let` statement declares, keyed by the
    /// statement's own `NodeId` (a `let` has no `Expr` node of its own for
    /// `attrs` to key on). `irbuilder.rs` reads this to emit the
    /// initializer-to-variable `ASSIGN` quad.
    pub let_vars: HashMap<NodeId, ValueRef>,
    /// The induction variable a `for` loop declares, keyed by the `for`
    /// expression's own `NodeId`. Same rationale as `let_vars`.
    pub for_vars: HashMap<NodeId, ValueRef>,
}

pub fn check_program(program: &Program, reporter: &mut Reporter) -> CheckOutcome {
    let mut checker = Checker {
        ctx: SemanticContext::new(),
        attrs: HashMap::new(),
        let_vars: HashMap::new(),
        for_vars: HashMap::new(),
    };
    checker.run(program, reporter)
}

struct Checker {
    ctx: SemanticContext,
    attrs: HashMap<NodeId, ExprAttrs>,
    let_vars: HashMap<NodeId, ValueRef>,
    for_vars: HashMap<NodeId, ValueRef>,
}

impl Checker {
    fn run(mut self, program: &Program, reporter: &mut Reporter) -> CheckOutcome {
        let mut functions = Vec::new();
        for fdef in &program.functions {
            let ret = match &fdef.ret {
                Some(te) => self.resolve_type(te),
                None => self.ctx.types.unit_type(),
            };
            let mut func = Function::new(&fdef.name, fdef.pos, ret);
            for p in &fdef.params {
                let ty = self.resolve_type(&p.type_name);
                func.params.push(Value::new_local(&p.name, ty, p.pos, p.mutable, true));
            }
            let func: FunctionRef = Rc::new(func);
            if !self.ctx.symtab.declare_function(&fdef.name, func.clone()) {
                reporter.report(
                    SemErrorKind::DuplicateFunction,
                    format!("function `{}` is already declared", fdef.name),
                    fdef.pos,
                    "global",
                );
            }
            functions.push(func);
        }

        for (fdef, func) in program.functions.iter().zip(functions.iter()) {
            self.check_function(fdef, func.clone(), reporter);
        }

        CheckOutcome {
            ctx: self.ctx,
            attrs: self.attrs,
            functions,
            let_vars: self.let_vars,
            for_vars: self.for_vars,
        }
    }

    fn resolve_type(&mut self, te: &TypeExpr) -> TypeRef {
        match te {
            TypeExpr::Int32 => self.ctx.types.int_type(),
            TypeExpr::Bool => self.ctx.types.bool_type(),
            TypeExpr::Unit => self.ctx.types.unit_type(),
            TypeExpr::Array(elem, size) => {
                let elem_ty = self.resolve_type(elem);
                self.ctx.types.array(*size, elem_ty)
            }
            TypeExpr::Tuple(elems) => {
                let tys: Vec<TypeRef> = elems.iter().map(|e| self.resolve_type(e)).collect();
                self.ctx.types.tuple(tys)
            }
        }
    }

    fn is_any(&self, t: &TypeRef) -> bool {
        matches!(**t, TypeKind::Any)
    }

    fn is_unit(&self, t: &TypeRef) -> bool {
        self.ctx.types.equals(t, &self.ctx.types.unit_type())
    }

    fn set(&mut self, id: NodeId, ty: TypeRef, symbol: Option<ValueRef>, res_mut: bool, is_var: bool) {
        self.attrs.insert(id, ExprAttrs { ty, symbol, res_mut, is_var });
    }

    fn check_function(&mut self, fdef: &FuncDef, func: FunctionRef, reporter: &mut Reporter) {
        self.ctx.enter_function_with(func.clone());
        for p in &func.params {
            let name = p.borrow().name.clone();
            self.ctx.symtab.declare_value(&name, p.clone());
        }

        let body_ty = self.check_block_value(&fdef.body, reporter);
        let body_returns = flow::block_returns(&fdef.body);
        let ret = func.ret.clone();

        if !body_returns {
            if !self.ctx.types.equals(&body_ty, &ret) {
                if self.is_unit(&ret) {
                    reporter.report(
                        SemErrorKind::MissingRetval,
                        format!("function `{}` returns `()` but its body yields `{}`", fdef.name, self.ctx.types.str(&body_ty)),
                        fdef.pos,
                        self.ctx.current_scope_name(),
                    );
                } else {
                    reporter.report(
                        SemErrorKind::RetTypeMismatch,
                        format!(
                            "function `{}` declares return type `{}` but its body yields `{}`",
                            fdef.name,
                            self.ctx.types.str(&ret),
                            self.ctx.types.str(&body_ty)
                        ),
                        fdef.pos,
                        self.ctx.current_scope_name(),
                    );
                }
            }
        }

        let scope = self.ctx.current_scope_name();
        self.ctx.exit_scope(reporter, &scope);
    }

    fn check_block_value(&mut self, block: &Block, reporter: &mut Reporter) -> TypeRef {
        let scope = self.ctx.current_scope_name();
        flow::report_unreachable(block, reporter, &scope);

        let mut last_ty = self.ctx.types.unit_type();
        let n = block.stmts.len();
        for (i, stmt) in block.stmts.iter().enumerate() {
            match &stmt.kind {
                StmtKind::Let { name, mutable, type_ann, init } => {
                    let init_attrs = self.check_expr(init, reporter);
                    let declared = type_ann.as_ref().map(|te| self.resolve_type(te));
                    let var_ty = match &declared {
                        Some(dt) => {
                            if !self.is_any(&init_attrs.ty) && !self.ctx.types.equals(dt, &init_attrs.ty) {
                                reporter.report(
                                    SemErrorKind::TypeMismatch,
                                    format!(
                                        "let `{}` declared as `{}` but initialized with `{}`",
                                        name,
                                        self.ctx.types.str(dt),
                                        self.ctx.types.str(&init_attrs.ty)
                                    ),
                                    stmt.pos,
                                    scope.clone(),
                                );
                            }
                            dt.clone()
                        }
                        None => init_attrs.ty.clone(),
                    };
                    let value = Value::new_local(name, var_ty, stmt.pos, *mutable, false);
                    value.borrow_mut().initialized = true;
                    self.ctx.symtab.declare_value(name, value.clone());
                    self.let_vars.insert(stmt.id, value);
                    last_ty = self.ctx.types.unit_type();
                }
                StmtKind::Expr { expr, has_semi } => {
                    let attrs = self.check_expr(expr, reporter);
                    last_ty = if i + 1 == n && !has_semi {
                        attrs.ty
                    } else {
                        self.ctx.types.unit_type()
                    };
                }
            }
        }
        if self.is_any(&last_ty) {
            self.ctx.types.unit_type()
        } else {
            last_ty
        }
    }

    fn check_expr(&mut self, expr: &Expr, reporter: &mut Reporter) -> ExprAttrs {
        let scope = self.ctx.current_scope_name();
        let result = match &expr.kind {
            ExprKind::Number(n) => {
                let ty = self.ctx.types.int_type();
                let sym = self.ctx.symtab.declare_constant(&n.to_string(), || {
                    Value::new_constant(n.to_string(), ty.clone(), expr.pos)
                });
                ExprAttrs { ty, symbol: Some(sym), res_mut: false, is_var: false }
            }
            ExprKind::Bool(b) => {
                let ty = self.ctx.types.bool_type();
                let text = if *b { "true" } else { "false" };
                let sym = self.ctx.symtab.declare_constant(text, || {
                    Value::new_constant(text, ty.clone(), expr.pos)
                });
                ExprAttrs { ty, symbol: Some(sym), res_mut: false, is_var: false }
            }
            ExprKind::Variable(name) => self.check_variable(name, expr.pos, &scope, reporter),
            ExprKind::ArrAcc { base, idx } => self.check_arr_acc(base, idx, expr.pos, &scope, reporter),
            ExprKind::TupAcc { base, idx } => self.check_tup_acc(base, *idx, expr.pos, &scope, reporter),
            ExprKind::Assign { lval, rval } => self.check_assign(lval, rval, expr.pos, &scope, reporter),
            ExprKind::Cmp { op, lhs, rhs } => self.check_cmp(*op, lhs, rhs, expr.pos, &scope, reporter),
            ExprKind::Ari { op, lhs, rhs } => self.check_ari(*op, lhs, rhs, expr.pos, &scope, reporter),
            ExprKind::ArrElems(elems) => self.check_arr_elems(elems, expr.pos, &scope, reporter),
            ExprKind::TupElems(elems) => self.check_tup_elems(elems, expr.pos, reporter),
            ExprKind::Block(b) => self.check_bracket(b, expr.pos, reporter),
            ExprKind::Call { callee, args } => self.check_call(callee, args, expr.pos, &scope, reporter),
            ExprKind::If { cond, body, else_ } => self.check_if(cond, body, else_, expr.pos, reporter),
            ExprKind::While { cond, body } => self.check_while(cond, body, expr.pos, &scope, reporter),
            ExprKind::For { var, source, body } => self.check_for(expr.id, var, source, body, expr.pos, &scope, reporter),
            ExprKind::Loop { body } => self.check_loop(body, expr.pos, reporter),
            ExprKind::Return(value) => self.check_return(value, expr.pos, &scope, reporter),
            ExprKind::Break(value) => self.check_break(value, expr.pos, &scope, reporter),
            ExprKind::Continue => self.check_continue(expr.pos, &scope, reporter),
        };
        self.set(expr.id, result.ty.clone(), result.symbol.clone(), result.res_mut, result.is_var);
        result
    }

    fn check_variable(&mut self, name: &str, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        match self.ctx.symtab.lookup_value(name) {
            None => {
                reporter.report(
                    SemErrorKind::UndeclaredVar,
                    format!("undeclared variable `{}`", name),
                    pos,
                    scope,
                );
                ExprAttrs { ty: self.ctx.types.any_type(), symbol: None, res_mut: true, is_var: true }
            }
            Some(v) => {
                let (ty, mutable, initialized) = {
                    let b = v.borrow();
                    (b.ty.clone(), b.mutable, b.initialized)
                };
                if !initialized {
                    reporter.report(
                        SemErrorKind::UninitializedVar,
                        format!("use of possibly-uninitialized variable `{}`", name),
                        pos,
                        scope,
                    );
                }
                ExprAttrs { ty, symbol: Some(v), res_mut: mutable, is_var: true }
            }
        }
    }

    fn check_arr_acc(&mut self, base: &Expr, idx: &Expr, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        let base_attrs = self.check_expr(base, reporter);
        let idx_attrs = self.check_expr(idx, reporter);
        if !self.is_any(&idx_attrs.ty) && !self.ctx.types.equals(&idx_attrs.ty, &self.ctx.types.int_type()) {
            reporter.report(
                SemErrorKind::TypeMismatch,
                format!("array index must be `i32`, found `{}`", self.ctx.types.str(&idx_attrs.ty)),
                idx.pos,
                scope,
            );
        }
        let elem_ty = match &*base_attrs.ty {
            TypeKind::Array { elem, .. } => elem.clone(),
            TypeKind::Any => self.ctx.types.any_type(),
            _ => {
                reporter.report(
                    SemErrorKind::UnexpectedExprType,
                    format!("indexing requires an array, found `{}`", self.ctx.types.str(&base_attrs.ty)),
                    base.pos,
                    scope,
                );
                self.ctx.types.any_type()
            }
        };
        let symbol = if self.is_any(&elem_ty) {
            None
        } else {
            Some(self.ctx.produce_temp(pos, elem_ty.clone()))
        };
        ExprAttrs { ty: elem_ty, symbol, res_mut: base_attrs.res_mut, is_var: false }
    }

    fn check_tup_acc(&mut self, base: &Expr, idx: usize, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        let base_attrs = self.check_expr(base, reporter);
        let elem_ty = match &*base_attrs.ty {
            TypeKind::Tuple { elems } => {
                if idx >= elems.len() {
                    reporter.report(
                        SemErrorKind::OutOfBoundsAccess,
                        format!("tuple index {} out of range for `{}`", idx, self.ctx.types.str(&base_attrs.ty)),
                        pos,
                        scope,
                    );
                    self.ctx.types.any_type()
                } else {
                    elems[idx].clone()
                }
            }
            TypeKind::Any => self.ctx.types.any_type(),
            _ => {
                reporter.report(
                    SemErrorKind::UnexpectedExprType,
                    format!("`.{}` requires a tuple, found `{}`", idx, self.ctx.types.str(&base_attrs.ty)),
                    base.pos,
                    scope,
                );
                self.ctx.types.any_type()
            }
        };
        let symbol = if self.is_any(&elem_ty) {
            None
        } else {
            Some(self.ctx.produce_temp(pos, elem_ty.clone()))
        };
        ExprAttrs { ty: elem_ty, symbol, res_mut: base_attrs.res_mut, is_var: false }
    }

    fn check_assign(&mut self, lval: &Expr, rval: &Expr, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        let rval_attrs = self.check_expr(rval, reporter);

        if let ExprKind::Variable(name) = &lval.kind {
            let mut lval_var: Option<ValueRef> = None;
            match self.ctx.symtab.lookup_value(name) {
                None => {
                    reporter.report(
                        SemErrorKind::UndeclaredVar,
                        format!("undeclared variable `{}`", name),
                        lval.pos,
                        scope,
                    );
                }
                Some(v) => {
                    let (cur_ty, mutable, initialized) = {
                        let b = v.borrow();
                        (b.ty.clone(), b.mutable, b.initialized)
                    };
                    let is_unknown = matches!(*cur_ty, TypeKind::Unknown);
                    if is_unknown {
                        v.borrow_mut().ty = rval_attrs.ty.clone();
                    } else if !self.is_any(&rval_attrs.ty) && !self.ctx.types.equals(&cur_ty, &rval_attrs.ty) {
                        reporter.report(
                            SemErrorKind::AssignMismatch,
                            format!(
                                "cannot assign `{}` to `{}` of type `{}`",
                                self.ctx.types.str(&rval_attrs.ty),
                                name,
                                self.ctx.types.str(&cur_ty)
                            ),
                            pos,
                            scope,
                        );
                    }
                    if initialized && !mutable {
                        reporter.report(
                            SemErrorKind::AssignImmutable,
                            format!("cannot assign twice to immutable variable `{}`", name),
                            pos,
                            scope,
                        );
                    }
                    v.borrow_mut().initialized = true;
                    lval_var = Some(v);
                }
            }
            self.set(lval.id, rval_attrs.ty.clone(), lval_var, true, true);
        } else {
            let lval_attrs = self.check_expr(lval, reporter);
            if !lval_attrs.res_mut {
                reporter.report(
                    SemErrorKind::AssignImmutable,
                    "left-hand side of assignment is not a mutable place",
                    pos,
                    scope,
                );
            }
            if !self.is_any(&lval_attrs.ty) && !self.is_any(&rval_attrs.ty) && !self.ctx.types.equals(&lval_attrs.ty, &rval_attrs.ty) {
                reporter.report(
                    SemErrorKind::AssignMismatch,
                    format!(
                        "cannot assign `{}` into a place of type `{}`",
                        self.ctx.types.str(&rval_attrs.ty),
                        self.ctx.types.str(&lval_attrs.ty)
                    ),
                    pos,
                    scope,
                );
            }
        }

        ExprAttrs { ty: self.ctx.types.unit_type(), symbol: None, res_mut: false, is_var: false }
    }

    fn check_cmp(&mut self, op: CmpOp, lhs: &Expr, rhs: &Expr, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        let l = self.check_expr(lhs, reporter);
        let r = self.check_expr(rhs, reporter);
        let int_ty = self.ctx.types.int_type();
        if (!self.is_any(&l.ty) && !self.ctx.types.equals(&l.ty, &int_ty))
            || (!self.is_any(&r.ty) && !self.ctx.types.equals(&r.ty, &int_ty))
        {
            reporter.report(
                SemErrorKind::IncomparableTypes,
                format!(
                    "cannot compare `{}` {:?} `{}`",
                    self.ctx.types.str(&l.ty),
                    op,
                    self.ctx.types.str(&r.ty)
                ),
                pos,
                scope,
            );
        }
        let ty = self.ctx.types.bool_type();
        let symbol = Some(self.ctx.produce_temp(pos, ty.clone()));
        ExprAttrs { ty, symbol, res_mut: false, is_var: false }
    }

    fn check_ari(&mut self, op: AriOp, lhs: &Expr, rhs: &Expr, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        let l = self.check_expr(lhs, reporter);
        let r = self.check_expr(rhs, reporter);
        let int_ty = self.ctx.types.int_type();
        if (!self.is_any(&l.ty) && !self.ctx.types.equals(&l.ty, &int_ty))
            || (!self.is_any(&r.ty) && !self.ctx.types.equals(&r.ty, &int_ty))
        {
            reporter.report(
                SemErrorKind::NonComputableTypes,
                format!(
                    "cannot apply {:?} to `{}` and `{}`",
                    op,
                    self.ctx.types.str(&l.ty),
                    self.ctx.types.str(&r.ty)
                ),
                pos,
                scope,
            );
        }
        let symbol = Some(self.ctx.produce_temp(pos, int_ty.clone()));
        ExprAttrs { ty: int_ty, symbol, res_mut: false, is_var: false }
    }

    fn check_arr_elems(&mut self, elems: &[Expr], pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        if elems.is_empty() {
            let unknown = self.ctx.types.unknown_type();
            let ty = self.ctx.types.array(0, unknown);
            let symbol = Some(self.ctx.produce_temp(pos, ty.clone()));
            return ExprAttrs { ty, symbol, res_mut: false, is_var: false };
        }
        let first = self.check_expr(&elems[0], reporter);
        for e in &elems[1..] {
            let attrs = self.check_expr(e, reporter);
            if !self.is_any(&attrs.ty) && !self.ctx.types.equals(&attrs.ty, &first.ty) {
                reporter.report(
                    SemErrorKind::TypeMismatch,
                    format!(
                        "array element has type `{}`, expected `{}`",
                        self.ctx.types.str(&attrs.ty),
                        self.ctx.types.str(&first.ty)
                    ),
                    e.pos,
                    scope,
                );
            }
        }
        let ty = self.ctx.types.array(elems.len(), first.ty);
        let symbol = Some(self.ctx.produce_temp(pos, ty.clone()));
        ExprAttrs { ty, symbol, res_mut: false, is_var: false }
    }

    fn check_tup_elems(&mut self, elems: &[Expr], pos: Position, reporter: &mut Reporter) -> ExprAttrs {
        let tys: Vec<TypeRef> = elems.iter().map(|e| self.check_expr(e, reporter).ty).collect();
        let ty = self.ctx.types.tuple(tys);
        let symbol = Some(self.ctx.produce_temp(pos, ty.clone()));
        ExprAttrs { ty, symbol, res_mut: false, is_var: false }
    }

    fn check_bracket(&mut self, block: &Block, pos: Position, reporter: &mut Reporter) -> ExprAttrs {
        self.ctx.enter_block(true);
        let ty = self.check_block_value(block, reporter);
        let scope = self.ctx.current_scope_name();
        self.ctx.exit_scope(reporter, &scope);
        let symbol = if self.is_unit(&ty) { None } else { Some(self.ctx.produce_temp(pos, ty.clone())) };
        ExprAttrs { ty, symbol, res_mut: false, is_var: false }
    }

    fn check_call(&mut self, callee: &str, args: &[Expr], pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        let arg_attrs: Vec<ExprAttrs> = args.iter().map(|a| self.check_expr(a, reporter)).collect();
        match self.ctx.symtab.lookup_function(callee) {
            None => {
                reporter.report(
                    SemErrorKind::CallUndeclaredFunc,
                    format!("call to undeclared function `{}`", callee),
                    pos,
                    scope,
                );
                ExprAttrs { ty: self.ctx.types.any_type(), symbol: None, res_mut: false, is_var: false }
            }
            Some(func) => {
                if func.params.len() != args.len() {
                    reporter.report(
                        SemErrorKind::ArgCntMismatch,
                        format!(
                            "`{}` expects {} argument(s), found {}",
                            callee,
                            func.params.len(),
                            args.len()
                        ),
                        pos,
                        scope,
                    );
                } else {
                    for (i, (param, attrs)) in func.params.iter().zip(arg_attrs.iter()).enumerate() {
                        let param_ty = param.borrow().ty.clone();
                        if !self.is_any(&attrs.ty) && !self.ctx.types.equals(&param_ty, &attrs.ty) {
                            reporter.report_with_details(
                                SemErrorKind::ArgTypeMismatch,
                                format!("argument type mismatch calling `{}`", callee),
                                args[i].pos,
                                scope,
                                format!(
                                    "argument {}: expected `{}`, found `{}`",
                                    i + 1,
                                    self.ctx.types.str(&param_ty),
                                    self.ctx.types.str(&attrs.ty)
                                ),
                            );
                        }
                    }
                }
                let ty = func.ret.clone();
                let symbol = if self.is_unit(&ty) { None } else { Some(self.ctx.produce_temp(pos, ty.clone())) };
                ExprAttrs { ty, symbol, res_mut: false, is_var: false }
            }
        }
    }

    fn check_if(
        &mut self,
        cond: &Expr,
        body: &Block,
        else_: &Option<Box<ElseClause>>,
        pos: Position,
        reporter: &mut Reporter,
    ) -> ExprAttrs {
        let cond_attrs = self.check_expr(cond, reporter);
        let scope = self.ctx.current_scope_name();
        if !self.is_any(&cond_attrs.ty) && !self.ctx.types.equals(&cond_attrs.ty, &self.ctx.types.bool_type()) {
            reporter.report(
                SemErrorKind::TypeMismatch,
                format!("`if` condition must be `bool`, found `{}`", self.ctx.types.str(&cond_attrs.ty)),
                cond.pos,
                scope.clone(),
            );
        }

        self.ctx.enter_if(true);
        let body_ty = self.check_block_value(body, reporter);
        let if_scope = self.ctx.current_scope_name();
        self.ctx.exit_scope(reporter, &if_scope);
        let body_returns = flow::block_returns(body);

        let (else_ty, else_returns, has_terminal_else) = match else_ {
            None => (self.ctx.types.unit_type(), false, false),
            Some(clause) => match clause.as_ref() {
                ElseClause::Else(eb) => {
                    self.ctx.enter_else(true);
                    let ety = self.check_block_value(eb, reporter);
                    let else_scope = self.ctx.current_scope_name();
                    self.ctx.exit_scope(reporter, &else_scope);
                    (ety, flow::block_returns(eb), true)
                }
                ElseClause::ElseIf(nested) => {
                    let nested_attrs = self.check_expr(nested, reporter);
                    (nested_attrs.ty, flow::expr_returns(nested), false)
                }
            },
        };

        let result_ty = if body_returns { else_ty.clone() } else { body_ty.clone() };

        if !self.is_unit(&result_ty) && !has_terminal_else {
            reporter.report(
                SemErrorKind::MissingElse,
                "`if` yields a non-`()` value and needs a terminal `else`",
                pos,
                scope.clone(),
            );
        }
        if !body_returns && !self.is_any(&body_ty) && !self.ctx.types.equals(&body_ty, &result_ty) {
            reporter.report(
                SemErrorKind::TypeMismatch,
                format!(
                    "`if` branch yields `{}`, expected `{}`",
                    self.ctx.types.str(&body_ty),
                    self.ctx.types.str(&result_ty)
                ),
                pos,
                scope.clone(),
            );
        }
        if else_.is_some() && !else_returns && !self.is_any(&else_ty) && !self.ctx.types.equals(&else_ty, &result_ty) {
            reporter.report(
                SemErrorKind::TypeMismatch,
                format!(
                    "`else` branch yields `{}`, expected `{}`",
                    self.ctx.types.str(&else_ty),
                    self.ctx.types.str(&result_ty)
                ),
                pos,
                scope,
            );
        }

        let symbol = if self.is_unit(&result_ty) { None } else { Some(self.ctx.produce_temp(pos, result_ty.clone())) };
        ExprAttrs { ty: result_ty, symbol, res_mut: false, is_var: false }
    }

    fn check_while(&mut self, cond: &Expr, body: &Block, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        let cond_attrs = self.check_expr(cond, reporter);
        if !self.is_any(&cond_attrs.ty) && !self.ctx.types.equals(&cond_attrs.ty, &self.ctx.types.bool_type()) {
            reporter.report(
                SemErrorKind::TypeMismatch,
                format!("`while` condition must be `bool`, found `{}`", self.ctx.types.str(&cond_attrs.ty)),
                cond.pos,
                scope,
            );
        }
        self.ctx.enter_while(true);
        let body_ty = self.check_block_value(body, reporter);
        let body_scope = self.ctx.current_scope_name();
        self.ctx.exit_scope(reporter, &body_scope);
        if !self.is_any(&body_ty) && !self.is_unit(&body_ty) {
            reporter.report(
                SemErrorKind::UnexpectedExprType,
                format!("`while` body must yield `()`, found `{}`", self.ctx.types.str(&body_ty)),
                pos,
                scope,
            );
        }
        ExprAttrs { ty: self.ctx.types.unit_type(), symbol: None, res_mut: false, is_var: false }
    }

    fn check_for(
        &mut self,
        id: NodeId,
        var: &str,
        source: &ForSource,
        body: &Block,
        pos: Position,
        scope: &str,
        reporter: &mut Reporter,
    ) -> ExprAttrs {
        let iter_ty = match source {
            ForSource::Range { start, end } => {
                let s = self.check_expr(start, reporter);
                let e = self.check_expr(end, reporter);
                let int_ty = self.ctx.types.int_type();
                if (!self.is_any(&s.ty) && !self.ctx.types.equals(&s.ty, &int_ty))
                    || (!self.is_any(&e.ty) && !self.ctx.types.equals(&e.ty, &int_ty))
                {
                    reporter.report(
                        SemErrorKind::TypeMismatch,
                        "`for` range endpoints must be `i32`",
                        pos,
                        scope,
                    );
                }
                int_ty
            }
            ForSource::Iterable(value) => {
                let v = self.check_expr(value, reporter);
                match &*v.ty {
                    TypeKind::Array { elem, .. } => elem.clone(),
                    TypeKind::Any => self.ctx.types.any_type(),
                    _ => {
                        reporter.report(
                            SemErrorKind::UnexpectedExprType,
                            format!("`for` requires an iterable array, found `{}`", self.ctx.types.str(&v.ty)),
                            value.pos,
                            scope,
                        );
                        self.ctx.types.any_type()
                    }
                }
            }
        };

        self.ctx.enter_for(true);
        let iter_value = Value::new_local(var, iter_ty, pos, false, false);
        iter_value.borrow_mut().initialized = true;
        self.ctx.symtab.declare_value(var, iter_value.clone());
        self.for_vars.insert(id, iter_value);
        let body_ty = self.check_block_value(body, reporter);
        let body_scope = self.ctx.current_scope_name();
        self.ctx.exit_scope(reporter, &body_scope);
        if !self.is_any(&body_ty) && !self.is_unit(&body_ty) {
            reporter.report(
                SemErrorKind::UnexpectedExprType,
                format!("`for` body must yield `()`, found `{}`", self.ctx.types.str(&body_ty)),
                pos,
                scope,
            );
        }
        ExprAttrs { ty: self.ctx.types.unit_type(), symbol: None, res_mut: false, is_var: false }
    }

    fn check_loop(&mut self, body: &Block, pos: Position, reporter: &mut Reporter) -> ExprAttrs {
        self.ctx.enter_loop(true);
        let body_ty = self.check_block_value(body, reporter);
        let scope = self.ctx.current_scope_name();
        if !self.is_any(&body_ty) && !self.is_unit(&body_ty) {
            reporter.report(
                SemErrorKind::UnexpectedExprType,
                format!("`loop` body must yield `()`, found `{}`", self.ctx.types.str(&body_ty)),
                pos,
                scope.clone(),
            );
        }
        let attrs = &self.attrs;
        let lookup = move |id: NodeId| {
            attrs
                .get(&id)
                .map(|a| a.ty.clone())
                .unwrap_or_else(|| Rc::new(TypeKind::Unknown))
        };
        let break_result = flow::check_break_types(body, &lookup, &self.ctx.types, reporter, &scope);
        self.ctx.exit_scope(reporter, &scope);

        let ty = break_result.ty;
        let symbol = if self.is_unit(&ty) { None } else { Some(self.ctx.produce_temp(pos, ty.clone())) };
        ExprAttrs { ty, symbol, res_mut: false, is_var: false }
    }

    fn check_return(&mut self, value: &Option<Box<Expr>>, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        let ret_ty = self
            .ctx
            .current_function
            .as_ref()
            .map(|f| f.ret.clone())
            .unwrap_or_else(|| self.ctx.types.unit_type());
        match value {
            None => {
                if !self.is_unit(&ret_ty) {
                    reporter.report(
                        SemErrorKind::MissingRetval,
                        format!("bare `return` in a function declared to return `{}`", self.ctx.types.str(&ret_ty)),
                        pos,
                        scope,
                    );
                }
            }
            Some(v) => {
                let attrs = self.check_expr(v, reporter);
                if !self.is_any(&attrs.ty) && !self.ctx.types.equals(&attrs.ty, &ret_ty) {
                    reporter.report(
                        SemErrorKind::RetTypeMismatch,
                        format!(
                            "returned `{}`, expected `{}`",
                            self.ctx.types.str(&attrs.ty),
                            self.ctx.types.str(&ret_ty)
                        ),
                        pos,
                        scope,
                    );
                }
            }
        }
        ExprAttrs { ty: self.ctx.types.unit_type(), symbol: None, res_mut: false, is_var: false }
    }

    fn check_break(&mut self, value: &Option<Box<Expr>>, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        match self.ctx.current_loop_frame() {
            None => {
                reporter.report(SemErrorKind::BreakCtxError, "`break` outside a loop", pos, scope);
            }
            Some(frame) => {
                if value.is_some() && frame.kind != ScopeKind::Loop {
                    reporter.report(
                        SemErrorKind::BreakCtxError,
                        "`break <value>` is only valid inside an unconditional `loop`",
                        pos,
                        scope,
                    );
                }
            }
        }
        if let Some(v) = value {
            self.check_expr(v, reporter);
        }
        ExprAttrs { ty: self.ctx.types.unit_type(), symbol: None, res_mut: false, is_var: false }
    }

    fn check_continue(&mut self, pos: Position, scope: &str, reporter: &mut Reporter) -> ExprAttrs {
        if !self.ctx.in_loop_context() {
            reporter.report(SemErrorKind::ContinueCtxError, "`continue` outside a loop", pos, scope);
        }
        ExprAttrs { ty: self.ctx.types.unit_type(), symbol: None, res_mut: false, is_var: false }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::source::SourceFile;

    fn check(src: &str) -> (CheckOutcome, String) {
        let program = Parser::parse_source("t", src).unwrap();
        let source = SourceFile::new("t", src);
        let mut reporter = Reporter::new(&source);
        let outcome = check_program(&program, &mut reporter);
        (outcome, reporter.render())
    }

    #[test]
    fn simple_return_type_checks() {
        let (outcome, rendered) = check("fn main() -> i32 { return 1; }");
        assert!(!rendered.contains("Semantic Error"));
        assert_eq!(outcome.functions.len(), 1);
    }

    #[test]
    fn immutable_reassignment_is_reported() {
        let (_, rendered) = check("fn e() { let x = 1; x = 2; }");
        assert!(rendered.contains("assign-immutable"));
    }

    #[test]
    fn if_without_else_needs_unit_type() {
        let (_, rendered) = check("fn f(x: i32) -> i32 { let y = if x > 0 { 1 }; return y; }");
        assert!(rendered.contains("missing-else"));
    }

    #[test]
    fn if_else_balanced_types_check_clean() {
        let (_, rendered) =
            check("fn f(x: i32) -> i32 { let y = if x > 0 { 1 } else { -1 }; return y; }");
        assert!(!rendered.contains("Semantic Error"));
    }

    #[test]
    fn break_outside_loop_is_reported() {
        let (_, rendered) = check("fn f() { break; }");
        assert!(rendered.contains("break-ctx-error"));
    }

    #[test]
    fn mismatched_break_types_in_loop_are_reported() {
        let (_, rendered) = check(
            "fn h() -> i32 { let x = loop { if x > 0 { break 1; } break true; }; return x; }",
        );
        assert!(rendered.contains("undeclared-var") || rendered.contains("break-type-mismatch"));
    }

    #[test]
    fn undeclared_call_is_reported() {
        let (_, rendered) = check("fn f() { g(); }");
        assert!(rendered.contains("call-undeclared-func"));
    }

    #[test]
    fn for_range_declares_int_iterator() {
        let (_, rendered) =
            check("fn s() -> i32 { let mut t = 0; for i in 0..3 { t = t + i; } return t; }");
        assert!(!rendered.contains("Semantic Error"));
    }
}
