//! Command-line interface: compiles a source file and writes whichever
//! product file the requested stage calls for.

use clap::{ArgAction, Parser as ClapParser};
use std::path::PathBuf;
use std::process;

use rvimp::{compile_source, CompileError, Config, Stage};

#[derive(ClapParser)]
#[command(
    name = "rvimpc",
    about = "Compiles a small Rust-like imperative language to 32-bit RISC-V assembly",
    disable_version_flag = true,
    disable_help_flag = true
)]
struct Cli {
    /// Input source file (required)
    #[arg(short = 'i', long = "input", value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output base name; product files are named "<base>.<ext>"
    #[arg(short = 'o', long = "output", value_name = "BASE")]
    output: Option<String>,

    /// Emit the token list only
    #[arg(short = 't', long = "token")]
    token: bool,

    /// Emit the AST in DOT
    #[arg(short = 'p', long = "parse")]
    parse: bool,

    /// Emit the symbol table
    #[arg(short = 's', long = "semantic")]
    semantic: bool,

    /// Emit the IR
    #[arg(short = 'g', long = "generate")]
    generate: bool,

    /// Print help
    #[arg(short = 'h', long = "help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Print version
    #[arg(short = 'v', long = "version", short_alias = 'V', action = ArgAction::Version)]
    version: Option<bool>,
}

fn stage_ext(stage: Stage) -> &'static str {
    match stage {
        Stage::Token => "token",
        Stage::Parse => "dot",
        Stage::Semantic => "symbol",
        Stage::Generate => "ir",
        Stage::Assembly => "s",
    }
}

fn delete_products(base: &str) {
    for ext in ["token", "dot", "symbol", "ir", "s"] {
        let _ = std::fs::remove_file(format!("{base}.{ext}"));
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rvimp=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("hint: run `rvimpc --help` for usage");
            process::exit(1);
        }
    };

    let Some(input) = cli.input.as_ref() else {
        eprintln!("Error: -i/--input is required");
        eprintln!("hint: run `rvimpc --help` for usage");
        process::exit(1);
    };

    let stage = if cli.token {
        Stage::Token
    } else if cli.parse {
        Stage::Parse
    } else if cli.semantic {
        Stage::Semantic
    } else if cli.generate {
        Stage::Generate
    } else {
        Stage::Assembly
    };

    let config = Config::load_from_dir(std::path::Path::new(".")).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });
    let output_base = cli.output.clone().unwrap_or(config.output_base);

    let input_str = input.to_string_lossy();
    match compile_source(&input_str, stage) {
        Ok(rendered) => {
            let path = format!("{}.{}", output_base, stage_ext(stage));
            if let Err(e) = std::fs::write(&path, rendered) {
                eprintln!("Error writing {path}: {e}");
                delete_products(&output_base);
                process::exit(1);
            }
        }
        Err(e) => {
            report_failure(&e);
            delete_products(&output_base);
            process::exit(1);
        }
    }
}

fn report_failure(e: &CompileError) {
    match e {
        CompileError::SemanticFailed(_) => {
            // The reporter has already printed every error to stderr.
        }
        other => eprintln!("Error: {other}"),
    }
}
