//! Control-flow analysis (C5 return-path check, part of C6 break/continue
//! validity): whether a function body returns on every path, and what type
//! `break` expressions within a loop must agree on.
//!
//! Grounded in `examples/original_source/src/semantic/return_checker.cpp`
//! and `break_checker.cpp`, each a dedicated AST visitor kept separate from
//! the main type checker. Re-expressed here as plain recursive functions
//! over the immutable tree rather than visitor objects, since there is no
//! mutable per-node state to accumulate (`checker.rs` owns the `NodeId`
//! side tables these functions read from).

use crate::ast::*;
use crate::reporter::{Reporter, SemErrorKind};
use crate::types::{TypeRef, TypeRegistry};

/// True if every path through `block` ends in a `return` (directly, or via
/// an exhaustive `if`/`else` or an unconditional `loop`). `while`/`for` are
/// never considered exhaustive: the original source calls out that the
/// loop body "may not execute" (`return_checker.cpp`, `WhileLoopExpr`).
pub fn block_returns(block: &Block) -> bool {
    let mut has_ret = false;
    for stmt in &block.stmts {
        if !has_ret {
            has_ret = stmt_returns(stmt);
        }
    }
    has_ret
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Let { init, .. } => expr_returns(init),
        StmtKind::Expr { expr, .. } => expr_returns(expr),
    }
}

pub fn expr_returns(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Return(_) => true,
        ExprKind::Break(value) => value.as_deref().map(expr_returns).unwrap_or(false),
        ExprKind::Assign { rval, .. } => expr_returns(rval),
        ExprKind::Block(b) => block_returns(b),
        ExprKind::If { body, else_, .. } => match else_ {
            None => false,
            Some(clause) => {
                let else_returns = match clause.as_ref() {
                    ElseClause::ElseIf(nested) => expr_returns(nested),
                    ElseClause::Else(b) => block_returns(b),
                };
                block_returns(body) && else_returns
            }
        },
        ExprKind::While { .. } | ExprKind::For { .. } => false,
        ExprKind::Loop { body } => block_returns(body),
        _ => false,
    }
}

/// Walks `block`, reporting every statement reached after one that already
/// returns on all paths as unreachable code. Mirrors
/// `ReturnChecker::visit(StmtBlockExpr&)` marking `stmt->unreachable`, but
/// reports immediately instead of annotating the tree.
pub fn report_unreachable(block: &Block, reporter: &mut Reporter, scope: &str) {
    let mut has_ret = false;
    for stmt in &block.stmts {
        if has_ret {
            reporter.report_unreachable(stmt.pos, scope);
        } else {
            has_ret = stmt_returns(stmt);
        }
    }
}

/// Type-unifying walk over a loop body, collecting every `break` reachable
/// without crossing into a nested loop and checking that each agrees with
/// the first one seen. `expr_types` is the checker's `NodeId -> TypeRef`
/// side table; by the time a loop's body is passed here the checker has
/// already typed every sub-expression, including nested `break` values.
///
/// Grounded in `break_checker.cpp`: the visitor has no override for
/// `WhileLoopExpr`/`ForLoopExpr`/`LoopExpr`, so a `break` inside a nested
/// loop is invisible to the outer one — each loop's breaks are collected by
/// a fresh pass over just that loop's own body.
pub struct BreakTypeCheck {
    pub ty: TypeRef,
    pub has_break: bool,
}

pub fn check_break_types(
    block: &Block,
    expr_types: &dyn Fn(NodeId) -> TypeRef,
    types: &TypeRegistry,
    reporter: &mut Reporter,
    scope: &str,
) -> BreakTypeCheck {
    let mut state = BreakTypeCheck {
        ty: types.unknown_type(),
        has_break: false,
    };
    walk_block_breaks(block, expr_types, types, reporter, scope, &mut state);
    if !state.has_break {
        state.ty = types.unit_type();
    }
    state
}

fn walk_block_breaks(
    block: &Block,
    expr_types: &dyn Fn(NodeId) -> TypeRef,
    types: &TypeRegistry,
    reporter: &mut Reporter,
    scope: &str,
    state: &mut BreakTypeCheck,
) {
    for stmt in &block.stmts {
        match &stmt.kind {
            StmtKind::Let { init, .. } => walk_expr_breaks(init, expr_types, types, reporter, scope, state),
            StmtKind::Expr { expr, .. } => walk_expr_breaks(expr, expr_types, types, reporter, scope, state),
        }
    }
}

fn walk_expr_breaks(
    expr: &Expr,
    expr_types: &dyn Fn(NodeId) -> TypeRef,
    types: &TypeRegistry,
    reporter: &mut Reporter,
    scope: &str,
    state: &mut BreakTypeCheck,
) {
    match &expr.kind {
        ExprKind::Return(value) => {
            if let Some(v) = value {
                walk_expr_breaks(v, expr_types, types, reporter, scope, state);
            }
        }
        ExprKind::Assign { rval, .. } => {
            walk_expr_breaks(rval, expr_types, types, reporter, scope, state)
        }
        ExprKind::Block(b) => walk_block_breaks(b, expr_types, types, reporter, scope, state),
        ExprKind::If { body, else_, .. } => {
            walk_block_breaks(body, expr_types, types, reporter, scope, state);
            match else_ {
                Some(clause) => match clause.as_ref() {
                    ElseClause::ElseIf(nested) => {
                        walk_expr_breaks(nested, expr_types, types, reporter, scope, state)
                    }
                    ElseClause::Else(b) => walk_block_breaks(b, expr_types, types, reporter, scope, state),
                },
                None => {}
            }
        }
        ExprKind::Break(value) => {
            state.has_break = true;
            let observed = match value {
                Some(v) => expr_types(v.id),
                None => types.unit_type(),
            };
            // `Any` (error-recovery) never becomes the expected type: treat
            // it as Unit so one earlier error doesn't cascade into a second
            // break-type-mismatch report.
            let observed = if matches!(&*observed, crate::types::TypeKind::Any) {
                types.unit_type()
            } else {
                observed
            };
            if matches!(&*state.ty, crate::types::TypeKind::Unknown) {
                state.ty = observed;
            } else if !types.equals(&state.ty, &observed) {
                reporter.report(
                    SemErrorKind::BreakTypeMismatch,
                    format!(
                        "break expected type {}, found {}",
                        types.str(&state.ty),
                        types.str(&observed)
                    ),
                    expr.pos,
                    scope,
                );
            }
        }
        // Nested loops collect their own breaks independently.
        ExprKind::While { .. } | ExprKind::For { .. } | ExprKind::Loop { .. } => {}
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Position;

    fn pos() -> Position {
        Position::default()
    }

    fn block(stmts: Vec<Stmt>) -> Block {
        Block { stmts, id: NodeId(0), pos: pos() }
    }

    fn ret_stmt(id: u32) -> Stmt {
        Stmt {
            kind: StmtKind::Expr {
                expr: Expr { kind: ExprKind::Return(None), id: NodeId(id), pos: pos() },
                has_semi: true,
            },
            id: NodeId(id + 100),
            pos: pos(),
        }
    }

    #[test]
    fn if_without_else_does_not_return_on_all_paths() {
        let if_expr = Expr {
            kind: ExprKind::If {
                cond: Box::new(Expr { kind: ExprKind::Bool(true), id: NodeId(1), pos: pos() }),
                body: block(vec![ret_stmt(2)]),
                else_: None,
            },
            id: NodeId(3),
            pos: pos(),
        };
        let b = block(vec![Stmt {
            kind: StmtKind::Expr { expr: if_expr, has_semi: true },
            id: NodeId(4),
            pos: pos(),
        }]);
        assert!(!block_returns(&b));
    }

    #[test]
    fn if_else_both_returning_is_exhaustive() {
        let if_expr = Expr {
            kind: ExprKind::If {
                cond: Box::new(Expr { kind: ExprKind::Bool(true), id: NodeId(1), pos: pos() }),
                body: block(vec![ret_stmt(2)]),
                else_: Some(Box::new(ElseClause::Else(block(vec![ret_stmt(3)])))),
            },
            id: NodeId(4),
            pos: pos(),
        };
        let b = block(vec![Stmt {
            kind: StmtKind::Expr { expr: if_expr, has_semi: true },
            id: NodeId(5),
            pos: pos(),
        }]);
        assert!(block_returns(&b));
    }

    #[test]
    fn loop_body_always_executes() {
        let loop_expr = Expr {
            kind: ExprKind::Loop { body: block(vec![ret_stmt(1)]) },
            id: NodeId(2),
            pos: pos(),
        };
        let b = block(vec![Stmt {
            kind: StmtKind::Expr { expr: loop_expr, has_semi: true },
            id: NodeId(3),
            pos: pos(),
        }]);
        assert!(block_returns(&b));
    }

    #[test]
    fn while_is_never_exhaustive() {
        let while_expr = Expr {
            kind: ExprKind::While {
                cond: Box::new(Expr { kind: ExprKind::Bool(true), id: NodeId(1), pos: pos() }),
                body: block(vec![ret_stmt(2)]),
            },
            id: NodeId(3),
            pos: pos(),
        };
        let b = block(vec![Stmt {
            kind: StmtKind::Expr { expr: while_expr, has_semi: true },
            id: NodeId(4),
            pos: pos(),
        }]);
        assert!(!block_returns(&b));
    }

    #[test]
    fn mismatched_break_types_are_reported() {
        let types = TypeRegistry::new();
        let src = crate::source::SourceFile::new("t", "loop {}\n");
        let mut reporter = Reporter::new(&src);
        let mut expr_types = std::collections::HashMap::new();
        let b1 = Expr { kind: ExprKind::Break(Some(Box::new(Expr {
            kind: ExprKind::Number(1), id: NodeId(1), pos: pos(),
        }))), id: NodeId(2), pos: pos() };
        expr_types.insert(NodeId(1), types.int_type());
        let b2 = Expr { kind: ExprKind::Break(Some(Box::new(Expr {
            kind: ExprKind::Bool(true), id: NodeId(3), pos: pos(),
        }))), id: NodeId(4), pos: pos() };
        expr_types.insert(NodeId(3), types.bool_type());
        let body = block(vec![
            Stmt { kind: StmtKind::Expr { expr: b1, has_semi: true }, id: NodeId(5), pos: pos() },
            Stmt { kind: StmtKind::Expr { expr: b2, has_semi: true }, id: NodeId(6), pos: pos() },
        ]);
        let lookup = |id: NodeId| expr_types.get(&id).cloned().unwrap_or_else(|| types.unknown_type());
        let result = check_break_types(&body, &lookup, &types, &mut reporter, "global::main::L1");
        assert!(result.has_break);
        assert!(reporter.has_errors());
    }

    #[test]
    fn no_break_yields_unit() {
        let types = TypeRegistry::new();
        let src = crate::source::SourceFile::new("t", "loop {}\n");
        let mut reporter = Reporter::new(&src);
        let lookup = |_id: NodeId| types.unknown_type();
        let body = block(vec![]);
        let result = check_break_types(&body, &lookup, &types, &mut reporter, "global::main::L1");
        assert!(!result.has_break);
        assert!(types.equals(&result.ty, &types.unit_type()));
    }
}
