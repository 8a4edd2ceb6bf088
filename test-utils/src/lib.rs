//! Shared fixture-running helpers for `tests/*.rs`, exercising the library
//! directly rather than shelling out to a built binary.
use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use wabbitc::ast::{Ast, TypeInfo};
use wabbitc::{emitter, interpreter, lexer, parser, transformer, typechecker};

pub struct Expected<'a> {
    pub stdout: &'a str,
}

impl<'a> Expected<'a> {
    fn assert_matches(&self, stdout: &str) {
        assert_eq!(stdout, self.stdout);
    }
}

fn load_and_check(src_path: &Path) -> Result<Ast<TypeInfo>, Box<dyn Error>> {
    let source = fs::read_to_string(src_path)?;

    let (tokens, lex_errors) = lexer::lex(&source);
    if !lex_errors.is_empty() {
        return Err(format!("lex errors: {lex_errors:?}").into());
    }

    let (ast, parse_errors) = parser::parse(tokens);
    if !parse_errors.is_empty() {
        return Err(format!("parse errors: {parse_errors:?}").into());
    }

    let (typed_ast, ok, type_errors) = typechecker::check(ast);
    if !ok {
        return Err(format!("type errors: {type_errors:?}").into());
    }

    Ok(transformer::transform(typed_ast))
}

/// Runs a fixture through the full pipeline and the interpreter, asserting
/// its printed output matches `expected`.
pub fn run_interpreter(src_path: &Path, expected: Expected) -> Result<(), Box<dyn Error>> {
    let ast = load_and_check(src_path)?;

    let mut out = vec![];
    interpreter::run(&ast, &mut out)?;
    let stdout = String::from_utf8(out)?;

    expected.assert_matches(&stdout);
    Ok(())
}

/// Compiles a fixture to C, returning the generated translation unit.
pub fn compile_to_c(src_path: &Path) -> Result<String, Box<dyn Error>> {
    let ast = load_and_check(src_path)?;
    Ok(emitter::c::emit(&ast))
}

/// Compiles a fixture to a WASM binary module.
pub fn compile_to_wasm_bytes(src_path: &Path) -> Result<Vec<u8>, Box<dyn Error>> {
    let ast = load_and_check(src_path)?;
    Ok(emitter::wasm::emit(&ast)?)
}

/// Asserts that a fixture fails typechecking (used for the negative-test
/// corpus, §8).
pub fn check_failing_type_checking(src_path: &Path) -> Result<(), Box<dyn Error>> {
    let source = fs::read_to_string(src_path)?;
    let (tokens, lex_errors) = lexer::lex(&source);
    if !lex_errors.is_empty() {
        return Ok(());
    }
    let (ast, parse_errors) = parser::parse(tokens);
    if !parse_errors.is_empty() {
        return Ok(());
    }
    let (_, ok, type_errors) = typechecker::check(ast);
    assert!(!ok, "expected type checking to fail for {}", src_path.display());
    let mut rendered = String::new();
    for e in &type_errors {
        let _ = writeln!(rendered, "{e}");
    }
    println!("{rendered}");
    Ok(())
}
