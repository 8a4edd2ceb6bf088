//! Constant folding and dead-code elimination, run bottom-up over a
//! type-checked AST before emission (§4.5).
use std::collections::HashMap;

use crate::ast::{
    Ast, AssignStmt, BinOpExpr, BinaryOp, BlockStmt, CallExpr, CompoundExpr, ConstDefStmt,
    Expression, FuncDefStmt, IfStmt, Literal, LiteralExpr, LocationExpr, PrintStmt, Statement,
    TypeInfo, UnOpExpr, UnaryOp, VarDefStmt, WhileStmt,
};

/// Folded `const` bindings visible at the current point, keyed by name.
/// Scoped the same way `Env`/`TypeScope` are: a stack of frames, innermost
/// wins (§4.5 "record the binding in the transformer's environment").
///
/// A frame entry of `None` marks a name as *shadowed*: a parameter or a
/// `var`/non-literal `const` of that name hides whatever an outer frame
/// bound, without itself being a constant to substitute. Without this,
/// `const k = 100; func f(k int) int { return k; }` would fold `k` inside
/// `f`'s body to the outer `100`, ignoring the parameter entirely.
#[derive(Debug, Default)]
struct FoldEnv {
    frames: Vec<HashMap<String, Option<Literal>>>,
}

impl FoldEnv {
    fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn bind(&mut self, name: &str, value: Literal) {
        self.frames
            .last_mut()
            .expect("at least one frame")
            .insert(name.to_string(), Some(value));
    }

    fn shadow(&mut self, name: &str) {
        self.frames
            .last_mut()
            .expect("at least one frame")
            .insert(name.to_string(), None);
    }

    fn get(&self, name: &str) -> Option<&Literal> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.get(name))
            .and_then(|entry| entry.as_ref())
    }
}

/// Runs the transformer over a whole program, returning the folded items.
pub fn transform(ast: Ast<TypeInfo>) -> Ast<TypeInfo> {
    let mut env = FoldEnv::new();
    let items = transform_block_items(ast.into_items(), &mut env);
    Ast::new(items)
}

fn transform_block_items(
    items: Vec<Statement<TypeInfo>>,
    env: &mut FoldEnv,
) -> Vec<Statement<TypeInfo>> {
    let mut out = vec![];
    for item in items {
        if let Some(folded) = transform_stmt(item, env) {
            out.push(folded);
        }
    }
    out
}

/// Returns `None` when the statement folds away entirely (a `ConstDef`
/// recorded into `env`, a dead `If`/`While` branch, an empty block).
fn transform_stmt(stmt: Statement<TypeInfo>, env: &mut FoldEnv) -> Option<Statement<TypeInfo>> {
    match stmt {
        Statement::Print(p) => Some(Statement::Print(PrintStmt {
            expr: transform_expr(p.expr, env),
            line: p.line,
        })),
        Statement::VarDef(v) => {
            let value = v.value.map(|e| transform_expr(e, env));
            env.shadow(&v.name);
            Some(Statement::VarDef(VarDefStmt {
                name: v.name,
                declared_type: v.declared_type,
                value,
                line: v.line,
            }))
        }
        Statement::ConstDef(c) => {
            let value = transform_expr(c.value, env);
            if let Expression::Literal(l) = &value {
                env.bind(&c.name, l.value.clone());
                None
            } else {
                env.shadow(&c.name);
                Some(Statement::ConstDef(ConstDefStmt {
                    name: c.name,
                    declared_type: c.declared_type,
                    value,
                    line: c.line,
                }))
            }
        }
        Statement::Assign(a) => Some(Statement::Assign(AssignStmt {
            name: a.name,
            value: transform_expr(a.value, env),
            line: a.line,
        })),
        Statement::If(i) => transform_if(i, env),
        Statement::While(w) => transform_while(w, env),
        Statement::Break(b) => Some(Statement::Break(b)),
        Statement::Continue(c) => Some(Statement::Continue(c)),
        Statement::Return(r) => Some(Statement::Return(crate::ast::ReturnStmt {
            value: r.value.map(|e| transform_expr(e, env)),
            line: r.line,
        })),
        Statement::FuncDef(f) => Some(Statement::FuncDef(transform_fn_def(f, env))),
        Statement::Block(b) => {
            let block = transform_block(b, env);
            if block.statements.is_empty() {
                None
            } else {
                Some(Statement::Block(block))
            }
        }
        Statement::Expr(e) => Some(Statement::Expr(transform_expr(e, env))),
    }
}

fn transform_block(block: BlockStmt<TypeInfo>, env: &mut FoldEnv) -> BlockStmt<TypeInfo> {
    env.push();
    let statements = transform_block_items(block.statements, env);
    env.pop();
    BlockStmt {
        statements,
        line: block.line,
    }
}

fn transform_fn_def(f: FuncDefStmt<TypeInfo>, env: &mut FoldEnv) -> FuncDefStmt<TypeInfo> {
    // A function body folds in its own scope: parameters shadow outer
    // consts and nothing declared inside escapes.
    env.push();
    for param in &f.params {
        env.shadow(&param.name);
    }
    let body = transform_block(f.body, env);
    env.pop();
    FuncDefStmt {
        name: f.name,
        params: f.params,
        return_type: f.return_type,
        body,
        line: f.line,
    }
}

fn transform_if(i: IfStmt<TypeInfo>, env: &mut FoldEnv) -> Option<Statement<TypeInfo>> {
    let cond = transform_expr(i.cond, env);
    let then_block = transform_block(i.then_block, env);
    let else_block = i.else_block.map(|b| transform_block(b, env));

    let then_block = (!then_block.statements.is_empty()).then_some(then_block);
    let else_block = else_block.filter(|b| !b.statements.is_empty());

    if let Expression::Literal(l) = &cond {
        if let Literal::Bool(value) = l.value {
            return if value {
                then_block.map(Statement::Block)
            } else {
                else_block.map(Statement::Block)
            };
        }
    }

    match (then_block, else_block) {
        (None, None) => None,
        (then_block, else_block) => Some(Statement::If(IfStmt {
            cond,
            then_block: then_block.unwrap_or(BlockStmt {
                statements: vec![],
                line: i.line,
            }),
            else_block,
            line: i.line,
        })),
    }
}

fn transform_while(w: WhileStmt<TypeInfo>, env: &mut FoldEnv) -> Option<Statement<TypeInfo>> {
    let cond = transform_expr(w.cond, env);
    let body = transform_block(w.body, env);

    if let Expression::Literal(LiteralExpr {
        value: Literal::Bool(false),
        ..
    }) = &cond
    {
        return None;
    }

    Some(Statement::While(WhileStmt { cond, body, line: w.line }))
}

fn transform_expr(expr: Expression<TypeInfo>, env: &mut FoldEnv) -> Expression<TypeInfo> {
    match expr {
        Expression::Literal(l) => Expression::Literal(l),
        Expression::Location(l) => transform_location(l, env),
        Expression::UnOp(u) => transform_unop(u, env),
        Expression::BinOp(b) => transform_binop(b, env),
        Expression::Call(c) => transform_call(c, env),
        Expression::Compound(c) => transform_compound(c, env),
    }
}

fn transform_location(l: LocationExpr<TypeInfo>, env: &mut FoldEnv) -> Expression<TypeInfo> {
    match env.get(&l.name) {
        Some(value) => Expression::Literal(LiteralExpr {
            value: value.clone(),
            line: l.line,
            info: l.info,
        }),
        None => Expression::Location(l),
    }
}

fn transform_unop(u: UnOpExpr<TypeInfo>, env: &mut FoldEnv) -> Expression<TypeInfo> {
    let operand = transform_expr(*u.operand, env);
    if let Expression::Literal(l) = &operand {
        let folded = match (u.op, &l.value) {
            (UnaryOp::Plus, Literal::Integer(v)) => Some(Literal::Integer(*v)),
            (UnaryOp::Plus, Literal::Float(v)) => Some(Literal::Float(*v)),
            (UnaryOp::Minus, Literal::Integer(v)) => Some(Literal::Integer(-v)),
            (UnaryOp::Minus, Literal::Float(v)) => Some(Literal::Float(-v)),
            (UnaryOp::Not, Literal::Bool(v)) => Some(Literal::Bool(!v)),
            _ => None,
        };
        if let Some(value) = folded {
            return Expression::Literal(LiteralExpr {
                value,
                line: u.line,
                info: u.info,
            });
        }
    }
    Expression::UnOp(UnOpExpr {
        op: u.op,
        operand: Box::new(operand),
        line: u.line,
        info: u.info,
    })
}

fn transform_binop(b: BinOpExpr<TypeInfo>, env: &mut FoldEnv) -> Expression<TypeInfo> {
    let lhs = transform_expr(*b.lhs, env);

    // Short-circuit on a literal left-hand side before even folding the
    // right (§4.5 "short-circuit for && / || when the left is a literal").
    if let Expression::Literal(LiteralExpr {
        value: Literal::Bool(lv),
        ..
    }) = &lhs
    {
        if b.op == BinaryOp::And && !lv {
            return lit(Literal::Bool(false), b.line, b.info);
        }
        if b.op == BinaryOp::Or && *lv {
            return lit(Literal::Bool(true), b.line, b.info);
        }
    }

    let rhs = transform_expr(*b.rhs, env);

    if let (Expression::Literal(l), Expression::Literal(r)) = (&lhs, &rhs) {
        if let Some(value) = fold_binop(b.op, &l.value, &r.value) {
            return lit(value, b.line, b.info);
        }
    }

    Expression::BinOp(BinOpExpr {
        op: b.op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        line: b.line,
        info: b.info,
    })
}

fn fold_binop(op: BinaryOp, lhs: &Literal, rhs: &Literal) -> Option<Literal> {
    use Literal::*;
    Some(match (op, lhs, rhs) {
        (BinaryOp::Add, Integer(a), Integer(b)) => Integer(a + b),
        (BinaryOp::Sub, Integer(a), Integer(b)) => Integer(a - b),
        (BinaryOp::Mul, Integer(a), Integer(b)) => Integer(a * b),
        (BinaryOp::Div, Integer(a), Integer(b)) => {
            if *b == 0 {
                Integer(i64::MAX)
            } else {
                Integer(a / b)
            }
        }
        (BinaryOp::Add, Float(a), Float(b)) => Float(a + b),
        (BinaryOp::Sub, Float(a), Float(b)) => Float(a - b),
        (BinaryOp::Mul, Float(a), Float(b)) => Float(a * b),
        (BinaryOp::Div, Float(a), Float(b)) => {
            if *b == 0.0 {
                Float(f64::MAX)
            } else {
                Float(a / b)
            }
        }
        (BinaryOp::Lt, Integer(a), Integer(b)) => Bool(a < b),
        (BinaryOp::Le, Integer(a), Integer(b)) => Bool(a <= b),
        (BinaryOp::Gt, Integer(a), Integer(b)) => Bool(a > b),
        (BinaryOp::Ge, Integer(a), Integer(b)) => Bool(a >= b),
        (BinaryOp::Lt, Float(a), Float(b)) => Bool(a < b),
        (BinaryOp::Le, Float(a), Float(b)) => Bool(a <= b),
        (BinaryOp::Gt, Float(a), Float(b)) => Bool(a > b),
        (BinaryOp::Ge, Float(a), Float(b)) => Bool(a >= b),
        (BinaryOp::Eq, a, b) => Bool(a == b),
        (BinaryOp::Ne, a, b) => Bool(a != b),
        (BinaryOp::And, Bool(a), Bool(b)) => Bool(*a && *b),
        (BinaryOp::Or, Bool(a), Bool(b)) => Bool(*a || *b),
        _ => return None,
    })
}

fn lit(value: Literal, line: usize, info: TypeInfo) -> Expression<TypeInfo> {
    Expression::Literal(LiteralExpr { value, line, info })
}

fn transform_call(c: CallExpr<TypeInfo>, env: &mut FoldEnv) -> Expression<TypeInfo> {
    let args = c.args.into_iter().map(|a| transform_expr(a, env)).collect();
    Expression::Call(CallExpr {
        name: c.name,
        args,
        line: c.line,
        info: c.info,
    })
}

fn transform_compound(c: CompoundExpr<TypeInfo>, env: &mut FoldEnv) -> Expression<TypeInfo> {
    env.push();
    let leading = transform_block_items(c.leading, env);
    let tail = transform_expr(*c.tail, env);
    env.pop();
    Expression::Compound(CompoundExpr {
        leading,
        tail: Box::new(tail),
        line: c.line,
        info: c.info,
    })
}
