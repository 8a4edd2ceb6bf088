//! Lowers a type-checked, transformed AST to a single C99 translation unit
//! (§4.6). Grounded on `Context`/`_compile` in the reference implementation:
//! every non-trivial expression lands in a freshly numbered temporary, and
//! `if`/`while`/`break`/`continue` lower to labels and `goto`.
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::ast::{
    Ast, AssignStmt, BinOpExpr, BinaryOp, BlockStmt, CallExpr, CompoundExpr, ConstDefStmt,
    Expression, FuncDefStmt, IfStmt, Literal, LocationExpr, PType, Param, PrintStmt, Statement,
    TypeInfo, UnOpExpr, UnaryOp, VarDefStmt, WhileStmt,
};

/// Per-emission state: temporary/label counters and the running output
/// buffers, passed by reference rather than kept as module globals (§9
/// "globally mutable counters ... pass an emitter context by reference").
#[derive(Default)]
struct Context {
    temp_counter: usize,
    label_counter: usize,
    declarations: Vec<String>,
    statements: Vec<String>,
    /// The enclosing while's (condition label, exit label), for break/continue.
    loop_labels: Vec<(String, String)>,
}

impl Context {
    fn new_temp(&mut self, p_type: PType) -> String {
        self.temp_counter += 1;
        let name = format!("_t{}", self.temp_counter);
        self.declarations
            .push(format!("\t{} {name};", c_type(p_type)));
        name
    }

    fn new_label(&mut self) -> String {
        self.label_counter += 1;
        format!("L{}", self.label_counter)
    }

    fn emit(&mut self, stmt: impl Into<String>) {
        self.statements.push(format!("\t{}", stmt.into()));
    }

    fn emit_label(&mut self, label: &str) {
        self.statements.push(format!("{label}:"));
    }
}

/// `bool -> int`, `unit -> int*`, everything else unchanged (§4.6).
fn c_type(p_type: PType) -> &'static str {
    match p_type {
        PType::Int => "int",
        PType::Float => "double",
        PType::Char => "char",
        PType::Bool => "int",
        PType::Unit => "int*",
    }
}

pub fn emit(ast: &Ast<TypeInfo>) -> String {
    let mut ctx = Context::default();
    let mut globals = HashMap::new();
    let mut functions = String::new();

    // A user-declared `func main` is fused into the synthesized entry
    // point below rather than emitted as its own C function, avoiding a
    // collision with the synthesized `int main(void)`.
    let user_main = ast.items().iter().find_map(|item| match item {
        Statement::FuncDef(f) if f.name == "main" => Some(f),
        _ => None,
    });

    for item in ast.items() {
        if let Statement::FuncDef(f) = item {
            if f.name == "main" {
                continue;
            }
            functions.push_str(&emit_function(f));
            functions.push('\n');
        }
    }

    for item in ast.items() {
        if !matches!(item, Statement::FuncDef(_)) {
            emit_stmt(item, &mut ctx, &mut globals, true);
        }
    }
    if let Some(main_fn) = user_main {
        let mut locals = HashMap::new();
        for stmt in &main_fn.body.statements {
            emit_stmt(stmt, &mut ctx, &mut locals, false);
        }
    }

    let mut out = String::new();
    out.push_str("#include <stdio.h>\n\n");
    for (name, p_type) in &globals {
        let _ = writeln!(out, "{} {name};", c_type(*p_type));
    }
    out.push('\n');
    out.push_str(&functions);
    out.push_str("int main(void) {\n");
    for decl in &ctx.declarations {
        out.push_str(decl);
        out.push('\n');
    }
    out.push('\n');
    for stmt in &ctx.statements {
        out.push_str(stmt);
        out.push('\n');
    }
    out.push_str("\treturn 0;\n}\n");
    out
}

fn emit_function(f: &FuncDefStmt<TypeInfo>) -> String {
    let mut ctx = Context::default();
    let mut locals = HashMap::new();
    for Param { name, p_type, .. } in &f.params {
        locals.insert(name.clone(), *p_type);
    }
    for stmt in &f.body.statements {
        emit_stmt(stmt, &mut ctx, &mut locals, false);
    }

    let params = f
        .params
        .iter()
        .map(|p| format!("{} {}", c_type(p.p_type), p.name))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = String::new();
    let _ = writeln!(out, "{} {}({}) {{", c_type(f.return_type), f.name, params);
    for decl in &ctx.declarations {
        out.push_str(decl);
        out.push('\n');
    }
    out.push('\n');
    for stmt in &ctx.statements {
        out.push_str(stmt);
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

fn emit_block(
    block: &BlockStmt<TypeInfo>,
    ctx: &mut Context,
    scope: &mut HashMap<String, PType>,
    is_global: bool,
) {
    for stmt in &block.statements {
        emit_stmt(stmt, ctx, scope, is_global);
    }
}

fn emit_stmt(
    stmt: &Statement<TypeInfo>,
    ctx: &mut Context,
    scope: &mut HashMap<String, PType>,
    is_global: bool,
) {
    match stmt {
        Statement::Print(p) => emit_print(p, ctx, scope),
        Statement::VarDef(v) => {
            emit_definition(&v.name, v.declared_type, v.value.as_ref(), ctx, scope, is_global)
        }
        Statement::ConstDef(c) => {
            emit_definition(&c.name, c.declared_type, Some(&c.value), ctx, scope, is_global)
        }
        Statement::Assign(a) => emit_assign(a, ctx, scope),
        Statement::If(i) => emit_if(i, ctx, scope, is_global),
        Statement::While(w) => emit_while(w, ctx, scope, is_global),
        Statement::Break(_) => {
            let (_, exit) = ctx.loop_labels.last().expect("break inside a loop").clone();
            ctx.emit(format!("goto {exit};"));
        }
        Statement::Continue(_) => {
            let (cond, _) = ctx.loop_labels.last().expect("continue inside a loop").clone();
            ctx.emit(format!("goto {cond};"));
        }
        Statement::Return(r) => match &r.value {
            Some(e) => {
                let value = emit_expr(e, ctx, scope);
                ctx.emit(format!("return {value};"));
            }
            None => ctx.emit("return 0;"),
        },
        Statement::FuncDef(_) => {}
        Statement::Block(b) => emit_block(b, ctx, scope, is_global),
        Statement::Expr(e) => {
            emit_expr(e, ctx, scope);
        }
    }
}

fn emit_print(p: &PrintStmt<TypeInfo>, ctx: &mut Context, scope: &mut HashMap<String, PType>) {
    let value = emit_expr(&p.expr, ctx, scope);
    let p_type = p.expr.p_type();
    if p_type == PType::Unit {
        ctx.emit("printf(\"()\\n\");");
        return;
    }
    let spec = match p_type {
        PType::Bool | PType::Int => 'd',
        PType::Float => 'f',
        PType::Char => 'c',
        PType::Unit => unreachable!(),
    };
    let end = if spec == 'c' { "" } else { "\\n" };
    ctx.emit(format!("printf(\"%{spec}{end}\", {value});"));
}

fn emit_definition(
    name: &str,
    declared_type: Option<PType>,
    value: Option<&Expression<TypeInfo>>,
    ctx: &mut Context,
    scope: &mut HashMap<String, PType>,
    is_global: bool,
) {
    let p_type = match (declared_type, value) {
        (Some(t), _) => t,
        (None, Some(e)) => e.p_type(),
        (None, None) => PType::Unit,
    };
    if !is_global {
        ctx.declarations.push(format!("\t{} {name};", c_type(p_type)));
    }
    if let Some(value) = value {
        let rhs = emit_expr(value, ctx, scope);
        ctx.emit(format!("{name} = {rhs};"));
    }
    scope.insert(name.to_string(), p_type);
}

fn emit_assign(a: &AssignStmt<TypeInfo>, ctx: &mut Context, scope: &mut HashMap<String, PType>) {
    let value = emit_expr(&a.value, ctx, scope);
    ctx.emit(format!("{} = {value};", a.name));
}

/// Three labels: true, false (only if an else exists), join (§4.6).
fn emit_if(i: &IfStmt<TypeInfo>, ctx: &mut Context, scope: &mut HashMap<String, PType>, is_global: bool) {
    let true_label = ctx.new_label();
    let false_label = i.else_block.as_ref().map(|_| ctx.new_label());
    let join_label = ctx.new_label();

    let cond = emit_expr(&i.cond, ctx, scope);
    ctx.emit(format!("if ({cond}) goto {true_label};"));
    ctx.emit(format!(
        "goto {};",
        false_label.as_deref().unwrap_or(&join_label)
    ));

    ctx.emit_label(&true_label);
    emit_block(&i.then_block, ctx, scope, is_global);
    ctx.emit(format!("goto {join_label};"));

    if let (Some(else_block), Some(false_label)) = (&i.else_block, &false_label) {
        ctx.emit_label(false_label);
        emit_block(else_block, ctx, scope, is_global);
        ctx.emit(format!("goto {join_label};"));
    }

    ctx.emit_label(&join_label);
}

/// Three labels: condition, body, exit (§4.6).
fn emit_while(w: &WhileStmt<TypeInfo>, ctx: &mut Context, scope: &mut HashMap<String, PType>, is_global: bool) {
    let cond_label = ctx.new_label();
    let body_label = ctx.new_label();
    let exit_label = ctx.new_label();

    ctx.emit_label(&cond_label);
    let cond = emit_expr(&w.cond, ctx, scope);
    ctx.emit(format!("if ({cond}) goto {body_label};"));
    ctx.emit(format!("goto {exit_label};"));

    ctx.emit_label(&body_label);
    ctx.loop_labels.push((cond_label.clone(), exit_label.clone()));
    emit_block(&w.body, ctx, scope, is_global);
    ctx.loop_labels.pop();
    ctx.emit(format!("goto {cond_label};"));

    ctx.emit_label(&exit_label);
}

fn emit_expr(expr: &Expression<TypeInfo>, ctx: &mut Context, scope: &mut HashMap<String, PType>) -> String {
    match expr {
        Expression::Literal(l) => literal_text(&l.value),
        Expression::Location(l) => emit_location(l),
        Expression::UnOp(u) => emit_unop(u, ctx, scope),
        Expression::BinOp(b) => emit_binop(b, ctx, scope),
        Expression::Call(c) => emit_call(c, ctx, scope),
        Expression::Compound(c) => emit_compound(c, ctx, scope),
    }
}

fn literal_text(value: &Literal) -> String {
    match value {
        Literal::Integer(v) => v.to_string(),
        Literal::Float(v) => format!("{v}"),
        Literal::Char(v) => format!("'{}'", escape_c_char(*v)),
        Literal::Bool(v) => if *v { "1" } else { "0" }.to_string(),
        Literal::Unit => "NULL".to_string(),
    }
}

fn escape_c_char(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\'' => "\\'".to_string(),
        '\\' => "\\\\".to_string(),
        other => other.to_string(),
    }
}

fn emit_location(l: &LocationExpr<TypeInfo>) -> String {
    l.name.clone()
}

fn emit_unop(u: &UnOpExpr<TypeInfo>, ctx: &mut Context, scope: &mut HashMap<String, PType>) -> String {
    let operand = emit_expr(&u.operand, ctx, scope);
    let op = match u.op {
        UnaryOp::Plus => "+",
        UnaryOp::Minus => "-",
        UnaryOp::Not => "!",
    };
    let temp = ctx.new_temp(u.info.p_type);
    ctx.emit(format!("{temp} = {op}{operand};"));
    temp
}

fn emit_binop(b: &BinOpExpr<TypeInfo>, ctx: &mut Context, scope: &mut HashMap<String, PType>) -> String {
    let lhs = emit_expr(&b.lhs, ctx, scope);
    let rhs = emit_expr(&b.rhs, ctx, scope);
    let op = match b.op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    };
    let temp = ctx.new_temp(b.info.p_type);
    ctx.emit(format!("{temp} = {lhs} {op} {rhs};"));
    temp
}

fn emit_call(c: &CallExpr<TypeInfo>, ctx: &mut Context, scope: &mut HashMap<String, PType>) -> String {
    let args: Vec<String> = c.args.iter().map(|a| emit_expr(a, ctx, scope)).collect();
    let temp = ctx.new_temp(c.info.p_type);
    ctx.emit(format!("{temp} = {}({});", c.name, args.join(", ")));
    temp
}

fn emit_compound(c: &CompoundExpr<TypeInfo>, ctx: &mut Context, scope: &mut HashMap<String, PType>) -> String {
    for stmt in &c.leading {
        emit_stmt(stmt, ctx, scope, false);
    }
    emit_expr(&c.tail, ctx, scope)
}
