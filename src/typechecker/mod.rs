//! Scoped, mutability-aware type checker (§4.3).
//!
//! Unlike the fail-fast `?`-propagation style of a plain `Result`-returning
//! checker, every `check_*` method here pushes onto a shared `errors` sink
//! and keeps going, so a single run reports every problem in the program
//! rather than just the first.
mod error;
mod scope;

pub use error::TypeError;
pub use scope::{Binding, FuncSig, ScopeKind, TypeScope};

use log::debug;

use crate::ast::{
    Ast, AssignStmt, BinOpExpr, BinaryOp, BlockStmt, BreakStmt, CallExpr, CompoundExpr,
    ConstDefStmt, ContinueStmt, Expression, FuncDefStmt, IfStmt, LiteralExpr, LocationExpr, PType,
    PrintStmt, ReturnStmt, Statement, TypeInfo, UnOpExpr, UnaryOp, VarDefStmt, WhileStmt,
};

const RESERVED: &[&str] = &[
    "break", "const", "continue", "else", "enum", "false", "func", "if", "import", "let", "match",
    "return", "struct", "true", "var", "while",
];

/// Runs the checker to completion. Always returns a fully-formed annotated
/// AST; callers must consult the `bool` (ok-flag, §4.3) before trusting it —
/// on failure it is best-effort and the driver must skip execution/emission.
pub fn check(ast: Ast<()>) -> (Ast<TypeInfo>, bool, Vec<TypeError>) {
    let mut checker = Typechecker::new();
    checker.register_functions(ast.items());

    let mut items = vec![];
    for item in ast.into_items() {
        items.push(checker.check_top_item(item));
    }

    let ok = checker.errors.is_empty();
    debug!("typecheck finished, ok={ok}, {} error(s)", checker.errors.len());
    (Ast::new(items), ok, checker.errors)
}

struct Typechecker {
    scope: TypeScope,
    loop_depth: usize,
    current_return_type: Option<PType>,
    errors: Vec<TypeError>,
}

fn info(p_type: PType) -> TypeInfo {
    TypeInfo::new(p_type)
}

impl Typechecker {
    fn new() -> Self {
        Self {
            scope: TypeScope::new(),
            loop_depth: 0,
            current_return_type: None,
            errors: vec![],
        }
    }

    fn error(&mut self, line: usize, message: impl Into<String>) {
        self.errors.push(TypeError::new(line, message));
    }

    /// Pre-scan pass: every top-level function is registered before any
    /// body is checked, so forward calls and recursion both resolve
    /// (§4.3 "the function name is registered before its body is checked").
    fn register_functions(&mut self, items: &[Statement<()>]) {
        for item in items {
            if let Statement::FuncDef(f) = item {
                let params = f.params.iter().map(|p| p.p_type).collect();
                self.scope.declare_function(
                    &f.name,
                    FuncSig {
                        params,
                        return_type: f.return_type,
                    },
                );
            }
        }
    }

    /// Most top items are `func_def`/`var_def`/`const_def` (§4.2), but a few
    /// worked examples are bare top-level statements; anything other than a
    /// function definition is checked exactly as it would be inside a block.
    fn check_top_item(&mut self, item: Statement<()>) -> Statement<TypeInfo> {
        match item {
            Statement::FuncDef(f) => self.check_fn_def(f),
            other => self.check_stmt(other),
        }
    }

    fn check_block(&mut self, block: BlockStmt<()>, kind: ScopeKind) -> BlockStmt<TypeInfo> {
        self.scope.push();
        let _ = kind;
        let statements = block
            .statements
            .into_iter()
            .map(|s| self.check_stmt(s))
            .collect();
        self.scope.pop();
        BlockStmt {
            statements,
            line: block.line,
        }
    }

    fn check_stmt(&mut self, stmt: Statement<()>) -> Statement<TypeInfo> {
        match stmt {
            Statement::Print(p) => self.check_print(p),
            Statement::VarDef(v) => self.check_var_def(v),
            Statement::ConstDef(c) => self.check_const_def(c),
            Statement::Assign(a) => self.check_assign(a),
            Statement::If(i) => self.check_if(i),
            Statement::While(w) => self.check_while(w),
            Statement::Break(b) => self.check_break(b),
            Statement::Continue(c) => self.check_continue(c),
            Statement::Return(r) => self.check_return(r),
            Statement::FuncDef(f) => {
                self.error(f.line, "Nested function definitions are not allowed");
                self.check_fn_def(f)
            }
            Statement::Block(b) => {
                let block = self.check_block(
                    BlockStmt {
                        statements: b.statements,
                        line: b.line,
                    },
                    ScopeKind::CompoundExpr,
                );
                Statement::Block(crate::ast::BlockStmt {
                    statements: block.statements,
                    line: block.line,
                })
            }
            Statement::Expr(e) => Statement::Expr(self.check_expr(e)),
        }
    }

    fn check_print(&mut self, p: PrintStmt<()>) -> Statement<TypeInfo> {
        let expr = self.check_expr(p.expr);
        Statement::Print(PrintStmt { expr, line: p.line })
    }

    fn declared_type_ok(&mut self, declared: Option<PType>, actual: PType, line: usize, what: &str) {
        if let Some(declared) = declared {
            if declared != actual {
                self.error(
                    line,
                    format!("Type error in {what}. {declared} != {actual}"),
                );
            }
        }
    }

    fn check_var_def(&mut self, v: VarDefStmt<()>) -> Statement<TypeInfo> {
        self.check_definition(&v.name, v.line);

        let value = v.value.map(|e| self.check_expr(e));
        let p_type = match (&v.declared_type, &value) {
            (Some(t), _) => *t,
            (None, Some(e)) => e.p_type(),
            (None, None) => PType::Unit,
        };
        if let Some(value) = &value {
            self.declared_type_ok(v.declared_type, value.p_type(), v.line, "initialization");
        }

        self.scope.declare(
            &v.name,
            Binding {
                p_type,
                mutable: true,
            },
        );

        Statement::VarDef(VarDefStmt {
            name: v.name,
            declared_type: Some(p_type),
            value,
            line: v.line,
        })
    }

    fn check_const_def(&mut self, c: ConstDefStmt<()>) -> Statement<TypeInfo> {
        self.check_definition(&c.name, c.line);

        let value = self.check_expr(c.value);
        let p_type = c.declared_type.unwrap_or_else(|| value.p_type());
        self.declared_type_ok(c.declared_type, value.p_type(), c.line, "initialization");

        self.scope.declare(
            &c.name,
            Binding {
                p_type,
                mutable: false,
            },
        );

        Statement::ConstDef(ConstDefStmt {
            name: c.name,
            declared_type: Some(p_type),
            value,
            line: c.line,
        })
    }

    fn check_definition(&mut self, name: &str, line: usize) {
        if RESERVED.contains(&name) {
            self.error(line, format!("'{name}' is a reserved word and can't be used as an identifier"));
        }
        if self.scope.contains_in_current_frame(name) {
            self.error(line, format!("'{name}' is already defined in this scope"));
        }
    }

    fn check_assign(&mut self, a: AssignStmt<()>) -> Statement<TypeInfo> {
        let value = self.check_expr(a.value);
        match self.scope.lookup(&a.name) {
            None => self.error(a.line, format!("{} not defined!", a.name)),
            Some(binding) => {
                if !binding.mutable {
                    self.error(a.line, "Can't assign to const");
                } else if binding.p_type != value.p_type() {
                    self.error(
                        a.line,
                        format!(
                            "Type error in assignment. {} != {}",
                            binding.p_type,
                            value.p_type()
                        ),
                    );
                }
            }
        }
        Statement::Assign(AssignStmt {
            name: a.name,
            value,
            line: a.line,
        })
    }

    fn check_if(&mut self, i: IfStmt<()>) -> Statement<TypeInfo> {
        let cond = self.check_expr(i.cond);
        if cond.p_type() != PType::Bool {
            self.error(
                i.line,
                format!("if test must be bool. Got {}", cond.p_type()),
            );
        }
        let then_block = self.check_block(i.then_block, ScopeKind::If);
        let else_block = i.else_block.map(|b| self.check_block(b, ScopeKind::Else));
        Statement::If(IfStmt {
            cond,
            then_block,
            else_block,
            line: i.line,
        })
    }

    fn check_while(&mut self, w: WhileStmt<()>) -> Statement<TypeInfo> {
        let cond = self.check_expr(w.cond);
        if cond.p_type() != PType::Bool {
            self.error(
                w.line,
                format!("while test must be bool. Got {}", cond.p_type()),
            );
        }
        self.loop_depth += 1;
        let body = self.check_block(w.body, ScopeKind::While);
        self.loop_depth -= 1;
        Statement::While(WhileStmt { cond, body, line: w.line })
    }

    fn check_break(&mut self, b: BreakStmt) -> Statement<TypeInfo> {
        if self.loop_depth == 0 {
            self.error(b.line, "break used outside of while loop");
        }
        Statement::Break(b)
    }

    fn check_continue(&mut self, c: ContinueStmt) -> Statement<TypeInfo> {
        if self.loop_depth == 0 {
            self.error(c.line, "continue used outside of while loop");
        }
        Statement::Continue(c)
    }

    fn check_return(&mut self, r: ReturnStmt<()>) -> Statement<TypeInfo> {
        let Some(expected) = self.current_return_type else {
            self.error(r.line, "return used outside of function");
            let value = r.value.map(|e| self.check_expr(e));
            return Statement::Return(ReturnStmt { value, line: r.line });
        };

        let value = r.value.map(|e| self.check_expr(e));
        let actual = value.as_ref().map(|e| e.p_type()).unwrap_or(PType::Unit);
        if actual != expected {
            self.error(
                r.line,
                format!("Type error in return. {expected} != {actual}"),
            );
        }
        Statement::Return(ReturnStmt { value, line: r.line })
    }

    fn check_fn_def(&mut self, f: FuncDefStmt<()>) -> Statement<TypeInfo> {
        self.scope.push();
        for param in &f.params {
            self.scope.declare(
                &param.name,
                Binding {
                    p_type: param.p_type,
                    mutable: true,
                },
            );
        }

        let previous_return = self.current_return_type.replace(f.return_type);
        let previous_loop_depth = std::mem::take(&mut self.loop_depth);

        let body = self.check_block(f.body, ScopeKind::Function);

        self.loop_depth = previous_loop_depth;
        self.current_return_type = previous_return;
        self.scope.pop();

        Statement::FuncDef(FuncDefStmt {
            name: f.name,
            params: f.params,
            return_type: f.return_type,
            body,
            line: f.line,
        })
    }

    fn check_expr(&mut self, expr: Expression<()>) -> Expression<TypeInfo> {
        match expr {
            Expression::Literal(l) => {
                let p_type = l.value.p_type();
                Expression::Literal(LiteralExpr {
                    value: l.value,
                    line: l.line,
                    info: info(p_type),
                })
            }
            Expression::Location(l) => self.check_location(l),
            Expression::UnOp(u) => self.check_unop(u),
            Expression::BinOp(b) => self.check_binop(b),
            Expression::Call(c) => self.check_call(c),
            Expression::Compound(c) => self.check_compound(c),
        }
    }

    fn check_location(&mut self, l: LocationExpr<()>) -> Expression<TypeInfo> {
        let p_type = match self.scope.lookup(&l.name) {
            Some(binding) => binding.p_type,
            None => {
                self.error(l.line, format!("{} not defined!", l.name));
                PType::Unit
            }
        };
        Expression::Location(LocationExpr {
            name: l.name,
            line: l.line,
            info: info(p_type),
        })
    }

    fn check_unop(&mut self, u: UnOpExpr<()>) -> Expression<TypeInfo> {
        let operand = self.check_expr(*u.operand);
        let operand_type = operand.p_type();
        let p_type = match (u.op, operand_type) {
            (UnaryOp::Plus | UnaryOp::Minus, PType::Int) => PType::Int,
            (UnaryOp::Plus | UnaryOp::Minus, PType::Float) => PType::Float,
            (UnaryOp::Not, PType::Bool) => PType::Bool,
            _ => {
                self.error(
                    u.line,
                    format!("Unsupported unary operator {} for type {operand_type}", u.op),
                );
                operand_type
            }
        };
        Expression::UnOp(UnOpExpr {
            op: u.op,
            operand: Box::new(operand),
            line: u.line,
            info: info(p_type),
        })
    }

    fn check_binop(&mut self, b: BinOpExpr<()>) -> Expression<TypeInfo> {
        let lhs = self.check_expr(*b.lhs);
        let rhs = self.check_expr(*b.rhs);
        let lt = lhs.p_type();
        let rt = rhs.p_type();

        let p_type = if lt != rt {
            self.error(
                b.line,
                format!("Type error in operator '{}'. {lt} != {rt}", b.op),
            );
            PType::Bool
        } else {
            match allowed_result(b.op, lt) {
                Some(result) => result,
                None => {
                    self.error(
                        b.line,
                        format!("Unsupported operator '{}' for type {lt}", b.op),
                    );
                    PType::Bool
                }
            }
        };

        Expression::BinOp(BinOpExpr {
            op: b.op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            line: b.line,
            info: info(p_type),
        })
    }

    fn check_call(&mut self, c: CallExpr<()>) -> Expression<TypeInfo> {
        let args: Vec<_> = c.args.into_iter().map(|a| self.check_expr(a)).collect();

        let p_type = match self.scope.lookup_function(&c.name).cloned() {
            None => {
                self.error(c.line, format!("{} not defined!", c.name));
                PType::Unit
            }
            Some(sig) => {
                if sig.params.len() != args.len() {
                    self.error(
                        c.line,
                        format!(
                            "{} expects {} argument(s), got {}",
                            c.name,
                            sig.params.len(),
                            args.len()
                        ),
                    );
                } else {
                    for (param_type, arg) in sig.params.iter().zip(args.iter()) {
                        if *param_type != arg.p_type() {
                            self.error(
                                c.line,
                                format!(
                                    "Type error in argument to {}. {} != {}",
                                    c.name,
                                    param_type,
                                    arg.p_type()
                                ),
                            );
                        }
                    }
                }
                sig.return_type
            }
        };

        Expression::Call(CallExpr {
            name: c.name,
            args,
            line: c.line,
            info: info(p_type),
        })
    }

    fn check_compound(&mut self, c: CompoundExpr<()>) -> Expression<TypeInfo> {
        self.scope.push();
        let leading = c
            .leading
            .into_iter()
            .map(|s| self.check_stmt(s))
            .collect();
        let tail = self.check_expr(*c.tail);
        self.scope.pop();
        let p_type = tail.p_type();
        Expression::Compound(CompoundExpr {
            leading,
            tail: Box::new(tail),
            line: c.line,
            info: info(p_type),
        })
    }
}

/// Implements the operator/operand-type table in §4.3.
fn allowed_result(op: BinaryOp, operand_type: PType) -> Option<PType> {
    use BinaryOp::*;
    use PType::*;

    if op.is_logical() {
        return matches!(operand_type, Bool | Unit).then_some(Bool);
    }
    if op.always_bool() {
        // relational / equality
        let relational = matches!(op, Lt | Le | Gt | Ge);
        if relational && matches!(operand_type, Bool | Unit) {
            return None;
        }
        return Some(Bool);
    }
    // arithmetic
    match operand_type {
        Int => Some(Int),
        Float => Some(Float),
        _ => None,
    }
}
