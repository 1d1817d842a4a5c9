//! Compiler library: lex, parse, check, lower to IR, and generate 32-bit
//! RISC-V assembly for a small Rust-like imperative language.
//!
//! [`compile_source`] drives the whole pipeline and stops at whichever
//! [`Stage`] the caller asks for, returning the rendered text for that
//! stage (and every stage before it is always fully run — there is no way
//! to ask for assembly without also type-checking).

pub mod ast;
pub mod checker;
pub mod codegen;
pub mod config;
pub mod context;
pub mod dot;
pub mod error;
pub mod flow;
pub mod ir;
pub mod irbuilder;
pub mod lexer;
pub mod memalloc;
pub mod parser;
pub mod regalloc;
pub mod reporter;
pub mod source;
pub mod stackalloc;
pub mod symbol;
pub mod symtab;
pub mod types;

use std::fs;

pub use config::Config;
pub use error::{CompileError, CompileResult};

use checker::{check_program, CheckOutcome};
use ir::IrProgram;
use irbuilder::build_program;
use lexer::{strip_comments, Lexer, Token};
use parser::Parser;
use reporter::Reporter;
use source::SourceFile;

/// Which pipeline stage to stop at and report, per spec.md §6's flags.
/// Every variant still runs every earlier stage internally (e.g. asking
/// for `Semantic` still lexes and parses first); only the rendered output
/// differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Token,
    Parse,
    Semantic,
    Generate,
    Assembly,
}

pub fn compile_source(source_path: &str, stage: Stage) -> CompileResult<String> {
    let span = tracing::info_span!("compile", source_path);
    let _enter = span.enter();

    let raw = fs::read_to_string(source_path)
        .map_err(|e| CompileError::Io(format!("reading {source_path}: {e}")))?;
    let text = strip_comments(&raw);

    tracing::debug!("lexing");
    let tokens = Lexer::new(source_path, &text).tokenize()?;
    if stage == Stage::Token {
        return Ok(render_tokens(&tokens));
    }

    tracing::debug!("parsing");
    let program = Parser::parse_source(source_path, &text)?;
    if stage == Stage::Parse {
        return Ok(dot::program_to_dot(&program));
    }

    let source_file = SourceFile::new(source_path, &text);
    let mut reporter = Reporter::new(&source_file);
    tracing::debug!("checking");
    let outcome = check_program(&program, &mut reporter);
    if reporter.has_errors() {
        let rendered = reporter.render();
        eprint!("{rendered}");
        return Err(CompileError::SemanticFailed(reporter.error_count()));
    }
    if stage == Stage::Semantic {
        return Ok(render_symbols(&outcome));
    }

    tracing::debug!("building IR");
    let ir = build_program(&program, &outcome);
    if stage == Stage::Generate {
        return Ok(render_ir(&ir));
    }

    tracing::debug!("generating assembly");
    let mut generator = codegen::CodeGenerator::new();
    generator.generate(&ir, &outcome.ctx.types)
}

fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for tok in tokens {
        out.push_str(&format!("{} {:?}\n", tok.pos, tok.kind));
    }
    out
}

fn render_symbols(outcome: &CheckOutcome) -> String {
    let mut out = String::new();
    for func in &outcome.functions {
        let params: Vec<String> = func
            .params
            .iter()
            .map(|p| {
                let p = p.borrow();
                format!("{}: {}", p.name, outcome.ctx.types.str(&p.ty))
            })
            .collect();
        out.push_str(&format!(
            "fn {}({}) -> {}\n",
            func.name,
            params.join(", "),
            outcome.ctx.types.str(&func.ret)
        ));
    }
    out
}

fn render_ir(ir: &IrProgram) -> String {
    let mut out = String::new();
    for func in &ir.funcs {
        out.push_str(&format!("# {}\n", func.name));
        for quad in &func.code {
            out.push_str(&quad.str());
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
