//! Renders an AST back into Wabbit source text (§8's round-trip property:
//! re-lexing and re-parsing the output must yield a structurally equivalent
//! tree, modulo line numbers).
use std::fmt::Write as _;

use crate::ast::{
    Ast, AssignStmt, BinOpExpr, BlockStmt, CallExpr, CompoundExpr, ConstDefStmt, Expression,
    FuncDefStmt, IfStmt, Literal, LocationExpr, PrintStmt, Statement, UnOpExpr, VarDefStmt,
    WhileStmt,
};

pub fn print_ast<T>(ast: &Ast<T>) -> String {
    let mut out = String::new();
    for item in ast.items() {
        print_stmt(item, 0, &mut out);
    }
    out
}

fn indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("    ");
    }
}

fn print_stmt<T>(stmt: &Statement<T>, level: usize, out: &mut String) {
    indent(level, out);
    match stmt {
        Statement::Print(PrintStmt { expr, .. }) => {
            let _ = writeln!(out, "print {};", print_expr(expr));
        }
        Statement::VarDef(VarDefStmt {
            name,
            declared_type,
            value,
            ..
        }) => {
            let ty = declared_type.map(|t| format!(" {t}")).unwrap_or_default();
            match value {
                Some(v) => {
                    let _ = writeln!(out, "var {name}{ty} = {};", print_expr(v));
                }
                None => {
                    let _ = writeln!(out, "var {name}{ty};");
                }
            }
        }
        Statement::ConstDef(ConstDefStmt {
            name,
            declared_type,
            value,
            ..
        }) => {
            let ty = declared_type.map(|t| format!(" {t}")).unwrap_or_default();
            let _ = writeln!(out, "const {name}{ty} = {};", print_expr(value));
        }
        Statement::Assign(AssignStmt { name, value, .. }) => {
            let _ = writeln!(out, "{name} = {};", print_expr(value));
        }
        Statement::If(IfStmt {
            cond,
            then_block,
            else_block,
            ..
        }) => {
            let _ = writeln!(out, "if {} {{", print_expr(cond));
            print_block_body(then_block, level, out);
            match else_block {
                Some(else_block) => {
                    indent(level, out);
                    out.push_str("} else {\n");
                    print_block_body(else_block, level, out);
                    indent(level, out);
                    out.push_str("}\n");
                }
                None => {
                    indent(level, out);
                    out.push_str("}\n");
                }
            }
        }
        Statement::While(WhileStmt { cond, body, .. }) => {
            let _ = writeln!(out, "while {} {{", print_expr(cond));
            print_block_body(body, level, out);
            indent(level, out);
            out.push_str("}\n");
        }
        Statement::Break(_) => out.push_str("break;\n"),
        Statement::Continue(_) => out.push_str("continue;\n"),
        Statement::Return(r) => match &r.value {
            Some(e) => {
                let _ = writeln!(out, "return {};", print_expr(e));
            }
            None => out.push_str("return;\n"),
        },
        Statement::FuncDef(FuncDefStmt {
            name,
            params,
            return_type,
            body,
            ..
        }) => {
            let params = params
                .iter()
                .map(|p| format!("{} {}", p.name, p.p_type))
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(out, "func {name}({params}) {return_type} {{");
            print_block_body(body, level, out);
            indent(level, out);
            out.push_str("}\n");
        }
        Statement::Block(b) => {
            out.push_str("{\n");
            print_block_body(b, level, out);
            indent(level, out);
            out.push_str("}\n");
        }
        Statement::Expr(e) => {
            let _ = writeln!(out, "{};", print_expr(e));
        }
    }
}

fn print_block_body<T>(block: &BlockStmt<T>, level: usize, out: &mut String) {
    for stmt in &block.statements {
        print_stmt(stmt, level + 1, out);
    }
}

fn print_expr<T>(expr: &Expression<T>) -> String {
    match expr {
        Expression::Literal(l) => print_literal(&l.value),
        Expression::Location(LocationExpr { name, .. }) => name.clone(),
        Expression::UnOp(UnOpExpr { op, operand, .. }) => {
            format!("{op}{}", print_expr(operand))
        }
        Expression::BinOp(BinOpExpr { op, lhs, rhs, .. }) => {
            format!("({} {op} {})", print_expr(lhs), print_expr(rhs))
        }
        Expression::Call(CallExpr { name, args, .. }) => {
            let args = args.iter().map(print_expr).collect::<Vec<_>>().join(", ");
            format!("{name}({args})")
        }
        Expression::Compound(CompoundExpr { leading, tail, .. }) => {
            let mut out = String::from("{ ");
            for stmt in leading {
                print_stmt(stmt, 0, &mut out);
                out.push(' ');
            }
            let _ = write!(out, "{} }}", print_expr(tail));
            out
        }
    }
}

fn print_literal(value: &Literal) -> String {
    match value {
        Literal::Char(c) => format!("'{}'", escape_char(*c)),
        Literal::Float(v) => print_float(*v),
        other => other.to_string(),
    }
}

/// A whole-valued float (`2.0`) formats via `Display` as `"2"`, which
/// re-lexes as `INTEGER` rather than `FLOAT` and breaks the round-trip
/// property (§8). Force a decimal point back in when one isn't there.
fn print_float(v: f64) -> String {
    let s = v.to_string();
    if s.contains('.') || s.contains('e') || s.contains('E') {
        s
    } else {
        format!("{s}.0")
    }
}

fn escape_char(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\'' => "\\'".to_string(),
        '\\' => "\\\\".to_string(),
        other => other.to_string(),
    }
}
