//! Round-trip property (§8): pretty-printing a parsed AST and feeding the
//! result back through the lexer and parser must re-parse cleanly and
//! reach a fixed point under a second pretty-print.
use wabbitc::{lexer, parser, pretty};

fn parse_ok(source: &str) -> wabbitc::ast::Ast<()> {
    let (tokens, lex_errors) = lexer::lex(source);
    assert!(lex_errors.is_empty(), "{lex_errors:?}");
    let (ast, parse_errors) = parser::parse(tokens);
    assert!(parse_errors.is_empty(), "{parse_errors:?}");
    ast
}

fn assert_round_trips(source: &str) {
    let ast = parse_ok(source);
    let printed_once = pretty::print_ast(&ast);

    let reparsed = parse_ok(&printed_once);
    assert_eq!(reparsed.items().len(), ast.items().len());

    let printed_twice = pretty::print_ast(&reparsed);
    assert_eq!(printed_once, printed_twice);
}

#[test]
fn arithmetic_expression_round_trips() {
    assert_round_trips("print 3 + 4 * -5;\n");
}

#[test]
fn control_flow_round_trips() {
    assert_round_trips(
        "var a int = 2;\nvar b int = 3;\nif a < b {\n    print a;\n} else {\n    print b;\n}\n",
    );
}

#[test]
fn while_loop_with_break_and_continue_round_trips() {
    assert_round_trips(
        "const n = 10;\nvar x int = 0;\nwhile x < n {\n    print x;\n    if x == 1 {\n        x = x + 2;\n        continue;\n    }\n    if x == 7 {\n        break;\n    }\n    x = x + 1;\n}\n",
    );
}

#[test]
fn function_definition_round_trips() {
    assert_round_trips(
        "func factorial(n int) int {\n    if n == 0 {\n        return 1;\n    }\n    return n * factorial(n - 1);\n}\n",
    );
}

#[test]
fn compound_expression_round_trips() {
    assert_round_trips("var x = 37;\nvar y = 42;\nx = { var t = y; y = x; t; };\n");
}
