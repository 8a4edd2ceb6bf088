//! # Why
//!
//! This binary is the compiler & interpreter driver for wabbitc. It wires
//! together the lexer, parser, typechecker, transformer, interpreter and
//! emitters into a single application.
mod cli;

use cli::*;

use std::fs;
use std::io;
use std::process::ExitCode;

use log::{debug, error, info};
use wabbitc::{emitter, interpreter, lexer, parser, transformer, typechecker};

fn main() -> ExitCode {
    let args = Cli::init();
    simple_logger::init_with_level(log::Level::from(&args.verbosity)).unwrap();

    let source = match fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            error!("could not read {}: {e}", args.file.display());
            return ExitCode::FAILURE;
        }
    };

    let (tokens, lex_errors) = lexer::lex(&source);
    if !lex_errors.is_empty() {
        for e in &lex_errors {
            error!("{e}");
        }
        return ExitCode::FAILURE;
    }
    debug!("lexed {} tokens", tokens.len());

    let (ast, parse_errors) = parser::parse(tokens);
    if !parse_errors.is_empty() {
        for e in &parse_errors {
            error!("{e}");
        }
        return ExitCode::FAILURE;
    }

    if args.dump_ast {
        info!("Parsed AST:\n{:#?}", ast);
    }

    let (typed_ast, ok, type_errors) = typechecker::check(ast);
    if !type_errors.is_empty() {
        for e in &type_errors {
            error!("{e}");
        }
    }
    if !ok {
        return ExitCode::FAILURE;
    }

    if args.dump_typed {
        info!("Typed AST:\n{:#?}", typed_ast);
    }

    let typed_ast = transformer::transform(typed_ast);

    if args.run {
        let mut stdout = io::stdout();
        return match interpreter::run(&typed_ast, &mut stdout) {
            Ok(code) => {
                let code = code.clamp(0, u8::MAX as i64) as u8;
                ExitCode::from(code)
            }
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let stem = args
        .file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string());

    let c_dir = args.out_dir.join("langc");
    let wasm_dir = args.out_dir.join("wasm");
    if let Err(e) = fs::create_dir_all(&c_dir).and_then(|_| fs::create_dir_all(&wasm_dir)) {
        error!("could not create output directories: {e}");
        return ExitCode::FAILURE;
    }

    let c_source = emitter::c::emit(&typed_ast);
    let c_path = c_dir.join(format!("{stem}.c"));
    if let Err(e) = fs::write(&c_path, c_source) {
        error!("could not write {}: {e}", c_path.display());
        return ExitCode::FAILURE;
    }
    info!("wrote {}", c_path.display());

    match emitter::wasm::emit(&typed_ast) {
        Ok(bytes) => {
            let wasm_path = wasm_dir.join(format!("{stem}.wasm"));
            if let Err(e) = fs::write(&wasm_path, bytes) {
                error!("could not write {}: {e}", wasm_path.display());
                return ExitCode::FAILURE;
            }
            info!("wrote {}", wasm_path.display());
        }
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
