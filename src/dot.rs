//! AST-to-DOT rendering, for the `-p/--parse` product.
//!
//! Grounded in `examples/original_source/src/ast/ast2dot.{hpp,cpp}`: each
//! AST node becomes a uniquely-numbered DOT node (`str2NodeDecl` there;
//! `next_id`/`node` here), with an edge from every parent to its children
//! and a `label` attribute carrying the node's syntactic shape.

use std::fmt::Write;

use crate::ast::{Block, ElseClause, Expr, ExprKind, ForSource, FuncDef, Program, Stmt, StmtKind};

struct DotWriter {
    out: String,
    counter: usize,
}

impl DotWriter {
    fn node(&mut self, label: &str) -> String {
        let name = format!("n{}", self.counter);
        self.counter += 1;
        let escaped = label.replace('\\', "\\\\").replace('"', "\\\"");
        let _ = writeln!(self.out, "  {} [label=\"{}\"];", name, escaped);
        name
    }

    fn edge(&mut self, parent: &str, child: &str) {
        let _ = writeln!(self.out, "  {} -> {};", parent, child);
    }
}

pub fn program_to_dot(program: &Program) -> String {
    let mut w = DotWriter { out: String::new(), counter: 0 };
    w.out.push_str("digraph AST {\n");
    let root = w.node("Program");
    for func in &program.functions {
        let f = func_to_dot(&mut w, func);
        w.edge(&root, &f);
    }
    w.out.push_str("}\n");
    w.out
}

fn func_to_dot(w: &mut DotWriter, func: &FuncDef) -> String {
    let n = w.node(&format!("fn {}", func.name));
    let body = block_to_dot(w, &func.body);
    w.edge(&n, &body);
    n
}

fn block_to_dot(w: &mut DotWriter, block: &Block) -> String {
    let n = w.node("Block");
    for stmt in &block.stmts {
        let s = stmt_to_dot(w, stmt);
        w.edge(&n, &s);
    }
    n
}

fn stmt_to_dot(w: &mut DotWriter, stmt: &Stmt) -> String {
    match &stmt.kind {
        StmtKind::Let { name, mutable, init, .. } => {
            let label = if *mutable { format!("let mut {}", name) } else { format!("let {}", name) };
            let n = w.node(&label);
            let init_n = expr_to_dot(w, init);
            w.edge(&n, &init_n);
            n
        }
        StmtKind::Expr { expr, has_semi } => {
            let n = w.node(if *has_semi { "ExprStmt" } else { "TrailingExpr" });
            let e = expr_to_dot(w, expr);
            w.edge(&n, &e);
            n
        }
    }
}

fn expr_to_dot(w: &mut DotWriter, expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Number(v) => w.node(&v.to_string()),
        ExprKind::Bool(v) => w.node(&v.to_string()),
        ExprKind::Variable(name) => w.node(name),
        ExprKind::ArrAcc { base, idx } => {
            let n = w.node("[]");
            let b = expr_to_dot(w, base);
            let i = expr_to_dot(w, idx);
            w.edge(&n, &b);
            w.edge(&n, &i);
            n
        }
        ExprKind::TupAcc { base, idx } => {
            let n = w.node(&format!(".{}", idx));
            let b = expr_to_dot(w, base);
            w.edge(&n, &b);
            n
        }
        ExprKind::Assign { lval, rval } => {
            let n = w.node("=");
            let l = expr_to_dot(w, lval);
            let r = expr_to_dot(w, rval);
            w.edge(&n, &l);
            w.edge(&n, &r);
            n
        }
        ExprKind::Cmp { op, lhs, rhs } => {
            let n = w.node(&format!("{:?}", op));
            let l = expr_to_dot(w, lhs);
            let r = expr_to_dot(w, rhs);
            w.edge(&n, &l);
            w.edge(&n, &r);
            n
        }
        ExprKind::Ari { op, lhs, rhs } => {
            let n = w.node(&format!("{:?}", op));
            let l = expr_to_dot(w, lhs);
            let r = expr_to_dot(w, rhs);
            w.edge(&n, &l);
            w.edge(&n, &r);
            n
        }
        ExprKind::ArrElems(elems) => {
            let n = w.node("[...]");
            for e in elems {
                let c = expr_to_dot(w, e);
                w.edge(&n, &c);
            }
            n
        }
        ExprKind::TupElems(elems) => {
            let n = w.node("(...)");
            for e in elems {
                let c = expr_to_dot(w, e);
                w.edge(&n, &c);
            }
            n
        }
        ExprKind::Block(block) => block_to_dot(w, block),
        ExprKind::Call { callee, args } => {
            let n = w.node(&format!("call {}", callee));
            for a in args {
                let c = expr_to_dot(w, a);
                w.edge(&n, &c);
            }
            n
        }
        ExprKind::If { cond, body, else_ } => {
            let n = w.node("if");
            let c = expr_to_dot(w, cond);
            let b = block_to_dot(w, body);
            w.edge(&n, &c);
            w.edge(&n, &b);
            if let Some(else_clause) = else_ {
                let e = else_to_dot(w, else_clause);
                w.edge(&n, &e);
            }
            n
        }
        ExprKind::While { cond, body } => {
            let n = w.node("while");
            let c = expr_to_dot(w, cond);
            let b = block_to_dot(w, body);
            w.edge(&n, &c);
            w.edge(&n, &b);
            n
        }
        ExprKind::For { var, source, body } => {
            let n = w.node(&format!("for {}", var));
            let s = match source {
                ForSource::Range { start, end } => {
                    let rn = w.node("range");
                    let s0 = expr_to_dot(w, start);
                    let s1 = expr_to_dot(w, end);
                    w.edge(&rn, &s0);
                    w.edge(&rn, &s1);
                    rn
                }
                ForSource::Iterable(it) => expr_to_dot(w, it),
            };
            let b = block_to_dot(w, body);
            w.edge(&n, &s);
            w.edge(&n, &b);
            n
        }
        ExprKind::Loop { body } => {
            let n = w.node("loop");
            let b = block_to_dot(w, body);
            w.edge(&n, &b);
            n
        }
        ExprKind::Return(v) => {
            let n = w.node("return");
            if let Some(v) = v {
                let c = expr_to_dot(w, v);
                w.edge(&n, &c);
            }
            n
        }
        ExprKind::Break(v) => {
            let n = w.node("break");
            if let Some(v) = v {
                let c = expr_to_dot(w, v);
                w.edge(&n, &c);
            }
            n
        }
        ExprKind::Continue => w.node("continue"),
    }
}

fn else_to_dot(w: &mut DotWriter, clause: &ElseClause) -> String {
    match clause {
        ElseClause::ElseIf(inner) => expr_to_dot(w, inner),
        ElseClause::Else(block) => block_to_dot(w, block),
    }
}
