//! Interpreter/compiler fixtures for the seed scenarios (§8).
use std::path::Path;

use test_utils::{compile_to_c, compile_to_wasm_bytes, run_interpreter, Expected};

#[test]
fn arithmetic_precedence() {
    run_interpreter(
        Path::new("demos/arithmetic.wb"),
        Expected { stdout: "-17\n" },
    )
    .unwrap();
}

#[test]
fn const_folding_float() {
    run_interpreter(
        Path::new("demos/const_fold.wb"),
        Expected {
            stdout: "6.28318\n",
        },
    )
    .unwrap();
}

#[test]
fn if_else_branch() {
    run_interpreter(Path::new("demos/if_else.wb"), Expected { stdout: "2\n" }).unwrap();
}

#[test]
fn factorial_loop_prints_every_step() {
    run_interpreter(
        Path::new("demos/factorial_loop.wb"),
        Expected {
            stdout: "1\n2\n6\n24\n120\n720\n5040\n40320\n362880\n",
        },
    )
    .unwrap();
}

#[test]
fn compound_expression_swap() {
    run_interpreter(
        Path::new("demos/swap_compound.wb"),
        Expected {
            stdout: "42\n37\n",
        },
    )
    .unwrap();
}

#[test]
fn break_and_continue() {
    run_interpreter(
        Path::new("demos/break_continue.wb"),
        Expected {
            stdout: "0\n1\n3\n4\n5\n6\n7\n",
        },
    )
    .unwrap();
}

#[test]
fn recursive_factorial_under_interpreter() {
    // `main` only returns a value here; nothing is printed.
    run_interpreter(
        Path::new("demos/factorial_recursive.wb"),
        Expected { stdout: "" },
    )
    .unwrap();
}

#[test]
fn recursive_factorial_compiles_to_c() {
    let c_source = compile_to_c(Path::new("demos/factorial_recursive.wb")).unwrap();
    assert!(c_source.contains("int factorial(int n)"));
    assert!(c_source.contains("int main(void)"));
}

#[test]
fn recursive_factorial_compiles_to_wasm() {
    let bytes = compile_to_wasm_bytes(Path::new("demos/factorial_recursive.wb")).unwrap();
    assert_eq!(&bytes[0..4], b"\0asm");
    assert_eq!(&bytes[4..8], &[0x01, 0x00, 0x00, 0x00]);
}

#[test]
fn every_fixture_compiles_to_c() {
    for name in [
        "arithmetic.wb",
        "const_fold.wb",
        "if_else.wb",
        "factorial_loop.wb",
        "swap_compound.wb",
        "break_continue.wb",
    ] {
        let path = Path::new("demos").join(name);
        compile_to_c(&path).unwrap_or_else(|e| panic!("{name} failed to compile to C: {e}"));
    }
}

#[test]
fn every_fixture_compiles_to_wasm() {
    for name in [
        "arithmetic.wb",
        "const_fold.wb",
        "if_else.wb",
        "factorial_loop.wb",
        "swap_compound.wb",
        "break_continue.wb",
    ] {
        let path = Path::new("demos").join(name);
        compile_to_wasm_bytes(&path).unwrap_or_else(|e| panic!("{name} failed to compile to WASM: {e}"));
    }
}
