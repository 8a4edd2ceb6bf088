//! Lowers a type-checked, transformed AST to a WebAssembly MVP binary
//! (§4.7). Grounded on the reference `generate.py`'s structured-control-flow
//! lowering: `if`/`else` via the `if`/`else`/`end` instruction, `while` via
//! `block { loop { ... } }` with `br`/`br_if` for `break`/`continue`.
mod encode;
mod error;
mod module;

use std::collections::HashMap;

pub use error::WasmEmitError;
use module::{GlobalInit, Module, ValType};

use crate::ast::{
    Ast, AssignStmt, BinOpExpr, BinaryOp, BlockStmt, CallExpr, CompoundExpr, ConstDefStmt,
    Expression, FuncDefStmt, IfStmt, Literal, LocationExpr, PType, Param, PrintStmt, Statement,
    TypeInfo, UnOpExpr, UnaryOp, VarDefStmt, WhileStmt,
};

fn val_type(p_type: PType) -> ValType {
    match p_type {
        PType::Float => ValType::F64,
        _ => ValType::I32,
    }
}

/// Local-variable indices, function indices by name, module-level globals by
/// name, and the structured-control-flow nesting depth, threaded through
/// lowering instead of kept as module globals (§9).
///
/// `depth` counts every currently-open `block`/`loop`/`if` at the current
/// point of emission. Each enclosing `while` pushes the depth its `block`
/// and `loop` were opened at onto `loop_targets`; a `break`/`continue` reads
/// the innermost entry and computes its `br` index as the *difference*
/// between the current depth and the recorded one, so an `if` sitting
/// between the loop and the break/continue (§8's `break_continue` example)
/// is accounted for instead of silently mistargeting the branch.
struct FuncCtx<'a> {
    locals: HashMap<String, u32>,
    functions: &'a HashMap<String, u32>,
    globals: &'a HashMap<String, u32>,
    depth: u32,
    loop_targets: Vec<(u32, u32)>,
}

pub fn emit(ast: &Ast<TypeInfo>) -> Result<Vec<u8>, WasmEmitError> {
    let mut module = Module::new();
    module.import_function("runtime", "_printi", vec![ValType::I32], vec![]);
    module.import_function("runtime", "_printf", vec![ValType::F64], vec![]);
    module.import_function("runtime", "_printb", vec![ValType::I32], vec![]);
    module.import_function("runtime", "_printc", vec![ValType::I32], vec![]);
    module.import_function("runtime", "_printu", vec![], vec![]);

    let user_main = ast.items().iter().find_map(|item| match item {
        Statement::FuncDef(f) if f.name == "main" => Some(f),
        _ => None,
    });

    let mut functions = HashMap::new();
    for item in ast.items() {
        if let Statement::FuncDef(f) = item {
            if f.name == "main" {
                continue;
            }
            let argtypes = f.params.iter().map(|p| val_type(p.p_type)).collect();
            let rettypes = if f.return_type == PType::Unit {
                vec![]
            } else {
                vec![val_type(f.return_type)]
            };
            let idx = module.add_function(f.name.clone(), argtypes, rettypes);
            functions.insert(f.name.clone(), idx);
        }
    }
    let main_rettype = user_main.map(|f| f.return_type).unwrap_or(PType::Int);
    let main_idx = module.add_function(
        "main",
        vec![],
        if main_rettype == PType::Unit {
            vec![]
        } else {
            vec![val_type(main_rettype)]
        },
    );
    functions.insert("main".to_string(), main_idx);

    // Top-level `var`/`const` become module globals; a literal initializer
    // is required (§9 open question (c)).
    let mut globals = HashMap::new();
    let mut prelude: Vec<&Statement<TypeInfo>> = vec![];
    for item in ast.items() {
        match item {
            Statement::FuncDef(_) => {}
            Statement::VarDef(v) => declare_global(&v.name, v.declared_type, v.value.as_ref(), &mut module, &mut globals)?,
            Statement::ConstDef(c) => declare_global(&c.name, c.declared_type, Some(&c.value), &mut module, &mut globals)?,
            other => prelude.push(other),
        }
    }

    for item in ast.items() {
        if let Statement::FuncDef(f) = item {
            if f.name != "main" {
                emit_function(f, &mut module, &functions, &globals);
            }
        }
    }

    let mut ctx = FuncCtx {
        locals: HashMap::new(),
        functions: &functions,
        globals: &globals,
        depth: 0,
        loop_targets: vec![],
    };
    for stmt in prelude {
        emit_stmt(stmt, &mut module, main_idx as usize, &mut ctx);
    }
    if let Some(main_fn) = user_main {
        for stmt in &main_fn.body.statements {
            emit_stmt(stmt, &mut module, main_idx as usize, &mut ctx);
        }
    }
    if main_rettype != PType::Unit {
        // Falling off the end without an explicit `return` still needs a
        // value of the declared type on the stack.
        match val_type(main_rettype) {
            ValType::I32 => module.functions[main_idx as usize].iconst(0),
            ValType::F64 => module.functions[main_idx as usize].fconst(0.0),
        }
    }

    Ok(module.encode())
}

fn declare_global(
    name: &str,
    declared_type: Option<PType>,
    value: Option<&Expression<TypeInfo>>,
    module: &mut Module,
    globals: &mut HashMap<String, u32>,
) -> Result<(), WasmEmitError> {
    let p_type = declared_type
        .or_else(|| value.map(|e| e.p_type()))
        .unwrap_or(PType::Unit);
    let literal = match value {
        None => default_literal(p_type),
        Some(Expression::Literal(l)) => l.value.clone(),
        Some(_) => {
            return Err(WasmEmitError::new(format!(
                "global initializer for '{name}' must be a literal"
            )))
        }
    };
    let idx = module.add_global(name, val_type(p_type), global_init(&literal, p_type));
    globals.insert(name.to_string(), idx);
    Ok(())
}

fn default_literal(p_type: PType) -> Literal {
    match p_type {
        PType::Int => Literal::Integer(0),
        PType::Float => Literal::Float(0.0),
        PType::Char => Literal::Char('\0'),
        PType::Bool => Literal::Bool(false),
        PType::Unit => Literal::Unit,
    }
}

fn global_init(value: &Literal, p_type: PType) -> GlobalInit {
    match val_type(p_type) {
        ValType::I32 => GlobalInit::I32(match value {
            Literal::Integer(v) => *v as i32,
            Literal::Bool(v) => *v as i32,
            Literal::Char(v) => *v as i32,
            Literal::Unit => 0,
            Literal::Float(_) => 0,
        }),
        ValType::F64 => GlobalInit::F64(match value {
            Literal::Float(v) => *v,
            _ => 0.0,
        }),
    }
}

fn emit_function(
    f: &FuncDefStmt<TypeInfo>,
    module: &mut Module,
    functions: &HashMap<String, u32>,
    globals: &HashMap<String, u32>,
) {
    let idx = *functions.get(&f.name).expect("registered above");
    let mut ctx = FuncCtx {
        locals: HashMap::new(),
        functions,
        globals,
        depth: 0,
        loop_targets: vec![],
    };
    for (i, Param { name, .. }) in f.params.iter().enumerate() {
        ctx.locals.insert(name.clone(), i as u32);
    }
    for stmt in &f.body.statements {
        emit_stmt(stmt, module, idx as usize, &mut ctx);
    }
    if f.return_type != PType::Unit {
        match val_type(f.return_type) {
            ValType::I32 => module.functions[idx as usize].iconst(0),
            ValType::F64 => module.functions[idx as usize].fconst(0.0),
        }
    }
}

fn emit_block(block: &BlockStmt<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    for stmt in &block.statements {
        emit_stmt(stmt, module, f, ctx);
    }
}

fn emit_stmt(stmt: &Statement<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    match stmt {
        Statement::Print(p) => emit_print(p, module, f, ctx),
        Statement::VarDef(v) => emit_var_def(v, module, f, ctx),
        Statement::ConstDef(c) => emit_const_def(c, module, f, ctx),
        Statement::Assign(a) => emit_assign(a, module, f, ctx),
        Statement::If(i) => emit_if(i, module, f, ctx),
        Statement::While(w) => emit_while(w, module, f, ctx),
        Statement::Break(_) => {
            let (break_target, _) = *ctx.loop_targets.last().expect("break inside a loop");
            module.functions[f].br(ctx.depth - break_target);
        }
        Statement::Continue(_) => {
            let (_, continue_target) = *ctx.loop_targets.last().expect("continue inside a loop");
            module.functions[f].br(ctx.depth - continue_target);
        }
        Statement::Return(r) => {
            if let Some(e) = &r.value {
                emit_expr(e, module, f, ctx);
            }
            module.functions[f].ret();
        }
        Statement::FuncDef(_) => {}
        Statement::Block(b) => emit_block(b, module, f, ctx),
        Statement::Expr(e) => {
            emit_expr(e, module, f, ctx);
            // An expression-statement's value is always discarded; only a
            // `CompoundExpr`'s own tail (emitted via `emit_expr` directly,
            // never through here) keeps its value on the stack.
            if e.p_type() != PType::Unit {
                module.functions[f].drop_();
            }
        }
    }
}

fn emit_print(p: &PrintStmt<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    emit_expr(&p.expr, module, f, ctx);
    let callee = match p.expr.p_type() {
        PType::Int => "_printi",
        PType::Float => "_printf",
        PType::Bool => "_printb",
        PType::Char => "_printc",
        PType::Unit => "_printu",
    };
    let idx = module
        .imported_functions
        .iter()
        .find(|imp| imp.name == callee)
        .expect("built-in print import")
        .idx;
    module.functions[f].call(idx);
}

fn emit_var_def(v: &VarDefStmt<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    let p_type = v
        .declared_type
        .or_else(|| v.value.as_ref().map(|e| e.p_type()))
        .unwrap_or(PType::Unit);
    let ty = val_type(p_type);
    match &v.value {
        Some(e) => emit_expr(e, module, f, ctx),
        None => match ty {
            ValType::I32 => module.functions[f].iconst(0),
            ValType::F64 => module.functions[f].fconst(0.0),
        },
    }
    let idx = module.functions[f].alloca(ty);
    module.functions[f].local_set(idx);
    ctx.locals.insert(v.name.clone(), idx);
}

fn emit_const_def(c: &ConstDefStmt<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    emit_expr(&c.value, module, f, ctx);
    let ty = val_type(c.value.p_type());
    let idx = module.functions[f].alloca(ty);
    module.functions[f].local_set(idx);
    ctx.locals.insert(c.name.clone(), idx);
}

fn emit_assign(a: &AssignStmt<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    emit_expr(&a.value, module, f, ctx);
    if let Some(idx) = ctx.locals.get(&a.name) {
        module.functions[f].local_set(*idx);
    } else {
        let idx = *ctx.globals.get(&a.name).expect("assigned name is bound");
        module.functions[f].global_set(idx);
    }
}

// `if`/`while` are always statements in Wabbit's grammar — only a
// `CompoundExpr`'s tail sits in expression position — so the `if` block
// is always opened with a void result type, regardless of what its last
// statement produces.
fn emit_if(i: &IfStmt<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    emit_expr(&i.cond, module, f, ctx);
    module.functions[f].if_start(None);
    ctx.depth += 1;
    emit_block(&i.then_block, module, f, ctx);
    if let Some(else_block) = &i.else_block {
        module.functions[f].else_();
        emit_block(else_block, module, f, ctx);
    }
    module.functions[f].end();
    ctx.depth -= 1;
}

/// `block { loop { <negated cond> br_if <block>; <body>; br <loop> } }`
/// (§4.7). The `block`'s and `loop`'s own depths are recorded on
/// `ctx.loop_targets` rather than assumed to be a fixed distance away, so a
/// `break`/`continue` nested inside an `if` within the body (§8's
/// `break_continue` example) still branches to the right label.
fn emit_while(w: &WhileStmt<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    module.functions[f].block();
    ctx.depth += 1;
    let break_target = ctx.depth;

    module.functions[f].loop_();
    ctx.depth += 1;
    let continue_target = ctx.depth;

    ctx.loop_targets.push((break_target, continue_target));

    emit_expr(&w.cond, module, f, ctx);
    module.functions[f].ieqz();
    module.functions[f].br_if(ctx.depth - break_target);

    emit_block(&w.body, module, f, ctx);
    module.functions[f].br(ctx.depth - continue_target);

    ctx.loop_targets.pop();

    module.functions[f].end();
    ctx.depth -= 1;
    module.functions[f].end();
    ctx.depth -= 1;
}

fn emit_expr(expr: &Expression<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    match expr {
        Expression::Literal(l) => emit_literal(&l.value, module, f),
        Expression::Location(l) => emit_location(l, module, f, ctx),
        Expression::UnOp(u) => emit_unop(u, module, f, ctx),
        Expression::BinOp(b) => emit_binop(b, module, f, ctx),
        Expression::Call(c) => emit_call(c, module, f, ctx),
        Expression::Compound(c) => emit_compound(c, module, f, ctx),
    }
}

fn emit_literal(value: &Literal, module: &mut Module, f: usize) {
    match value {
        Literal::Integer(v) => module.functions[f].iconst(*v as i32),
        Literal::Float(v) => module.functions[f].fconst(*v),
        Literal::Bool(v) => module.functions[f].iconst(if *v { 1 } else { 0 }),
        Literal::Char(v) => module.functions[f].iconst(*v as i32),
        Literal::Unit => module.functions[f].iconst(0),
    }
}

fn emit_location(l: &LocationExpr<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    match ctx.locals.get(&l.name) {
        Some(idx) => module.functions[f].local_get(*idx),
        None => {
            let idx = *ctx
                .globals
                .get(&l.name)
                .expect("undefined name reached code generation");
            module.functions[f].global_get(idx);
        }
    }
}

fn emit_unop(u: &UnOpExpr<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    emit_expr(&u.operand, module, f, ctx);
    match (u.op, u.info.p_type) {
        (UnaryOp::Not, _) => module.functions[f].ieqz(),
        (UnaryOp::Minus, PType::Int) => {
            module.functions[f].iconst(-1);
            module.functions[f].imul();
        }
        (UnaryOp::Minus, PType::Float) => {
            module.functions[f].fconst(-1.0);
            module.functions[f].fmul();
        }
        _ => {}
    }
}

fn emit_binop(b: &BinOpExpr<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    let operand_is_float = b.lhs.p_type() == PType::Float;

    match b.op {
        BinaryOp::And => {
            // `a && b` => `if a { b } else { false }` (§4.7).
            emit_expr(&b.lhs, module, f, ctx);
            module.functions[f].if_start(Some(ValType::I32));
            emit_expr(&b.rhs, module, f, ctx);
            module.functions[f].else_();
            module.functions[f].iconst(0);
            module.functions[f].end();
            return;
        }
        BinaryOp::Or => {
            // `a || b` => `if a { true } else { b }` (§4.7).
            emit_expr(&b.lhs, module, f, ctx);
            module.functions[f].if_start(Some(ValType::I32));
            module.functions[f].iconst(1);
            module.functions[f].else_();
            emit_expr(&b.rhs, module, f, ctx);
            module.functions[f].end();
            return;
        }
        _ => {}
    }

    emit_expr(&b.lhs, module, f, ctx);
    emit_expr(&b.rhs, module, f, ctx);
    let func = &mut module.functions[f];
    match (b.op, operand_is_float) {
        (BinaryOp::Add, false) => func.iadd(),
        (BinaryOp::Add, true) => func.fadd(),
        (BinaryOp::Sub, false) => func.isub(),
        (BinaryOp::Sub, true) => func.fsub(),
        (BinaryOp::Mul, false) => func.imul(),
        (BinaryOp::Mul, true) => func.fmul(),
        (BinaryOp::Div, false) => func.idiv(),
        (BinaryOp::Div, true) => func.fdiv(),
        (BinaryOp::Lt, false) => func.ilt(),
        (BinaryOp::Lt, true) => func.flt(),
        (BinaryOp::Gt, false) => func.igt(),
        (BinaryOp::Gt, true) => func.fgt(),
        (BinaryOp::Le, false) => func.ile(),
        (BinaryOp::Le, true) => func.fle(),
        (BinaryOp::Ge, false) => func.ige(),
        (BinaryOp::Ge, true) => func.fge(),
        (BinaryOp::Eq, false) => func.ieq(),
        (BinaryOp::Eq, true) => func.feq(),
        (BinaryOp::Ne, false) => func.ineq(),
        (BinaryOp::Ne, true) => func.fneq(),
        (BinaryOp::And | BinaryOp::Or, _) => unreachable!("handled above"),
    }
}

fn emit_call(c: &CallExpr<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    for arg in &c.args {
        emit_expr(arg, module, f, ctx);
    }
    let idx = *ctx
        .functions
        .get(&c.name)
        .expect("undefined function reached code generation");
    module.functions[f].call(idx);
}

fn emit_compound(c: &CompoundExpr<TypeInfo>, module: &mut Module, f: usize, ctx: &mut FuncCtx) {
    for stmt in &c.leading {
        emit_stmt(stmt, module, f, ctx);
    }
    emit_expr(&c.tail, module, f, ctx);
}
