//! Tree-walking evaluator (§4.4).
mod env;
mod error;

pub use env::{Env, Value};
pub use error::RuntimeError;

use std::collections::HashMap;
use std::io::Write;

use crate::ast::{
    Ast, AssignStmt, BinOpExpr, BinaryOp, BlockStmt, CallExpr, CompoundExpr, ConstDefStmt,
    Expression, FuncDefStmt, IfStmt, Literal, LocationExpr, PrintStmt, Statement, TypeInfo,
    UnOpExpr, UnaryOp, VarDefStmt, WhileStmt,
};

/// What a statement/expression evaluation unwinds with. Propagated by
/// returning it rather than via host exceptions (§9 design note).
enum Signal {
    Normal(Value),
    Break,
    Continue,
    Return(Value),
}

impl Signal {
    fn into_value(self) -> Value {
        match self {
            Signal::Normal(v) | Signal::Return(v) => v,
            Signal::Break | Signal::Continue => Literal::Unit,
        }
    }
}

/// Runs a type-checked program to completion, writing `print` output to
/// `out`, and returns `main`'s integer return value (§4.4).
pub fn run(ast: &Ast<TypeInfo>, out: &mut impl Write) -> Result<i64, RuntimeError> {
    let mut interp = Interpreter {
        env: Env::new(),
        functions: HashMap::new(),
        out,
    };

    for item in ast.items() {
        if let Statement::FuncDef(f) = item {
            interp.functions.insert(f.name.clone(), f.clone());
        }
    }

    for item in ast.items() {
        if matches!(item, Statement::FuncDef(_)) {
            continue;
        }
        match interp.exec(item)? {
            Signal::Return(_) => {
                return Err(RuntimeError::new("return used outside of function"))
            }
            _ => {}
        }
    }

    // A bare top-level script (no `func main`) is a complete program in its
    // own right (seed scenarios 1-6); `main` is only invoked when present,
    // e.g. by a program built around recursive functions (seed scenario 7).
    match interp.functions.get("main").cloned() {
        Some(main) => match interp.call_function(&main, vec![])? {
            Literal::Integer(v) => Ok(v),
            _ => Ok(0),
        },
        None => Ok(0),
    }
}

struct Interpreter<'a, W: Write> {
    env: Env,
    functions: HashMap<String, FuncDefStmt<TypeInfo>>,
    out: &'a mut W,
}

impl<'a, W: Write> Interpreter<'a, W> {
    fn exec(&mut self, stmt: &Statement<TypeInfo>) -> Result<Signal, RuntimeError> {
        match stmt {
            Statement::Print(p) => self.exec_print(p),
            Statement::VarDef(v) => self.exec_var_def(v),
            Statement::ConstDef(c) => self.exec_const_def(c),
            Statement::Assign(a) => self.exec_assign(a),
            Statement::If(i) => self.exec_if(i),
            Statement::While(w) => self.exec_while(w),
            Statement::Break(_) => Ok(Signal::Break),
            Statement::Continue(_) => Ok(Signal::Continue),
            Statement::Return(r) => {
                let value = match &r.value {
                    Some(e) => self.eval(e)?,
                    None => Literal::Unit,
                };
                Ok(Signal::Return(value))
            }
            Statement::FuncDef(_) => Ok(Signal::Normal(Literal::Unit)),
            Statement::Block(b) => self.exec_block(b),
            Statement::Expr(e) => Ok(Signal::Normal(self.eval(e)?)),
        }
    }

    fn exec_print(&mut self, p: &PrintStmt<TypeInfo>) -> Result<Signal, RuntimeError> {
        let value = self.eval(&p.expr)?;
        match value {
            Literal::Char(c) => {
                let _ = write!(self.out, "{c}");
            }
            other => {
                let _ = writeln!(self.out, "{other}");
            }
        }
        Ok(Signal::Normal(Literal::Unit))
    }

    fn exec_var_def(&mut self, v: &VarDefStmt<TypeInfo>) -> Result<Signal, RuntimeError> {
        let value = match &v.value {
            Some(e) => self.eval(e)?,
            None => default_for(v.declared_type.unwrap_or(crate::ast::PType::Unit)),
        };
        self.env.declare(&v.name, value);
        Ok(Signal::Normal(Literal::Unit))
    }

    fn exec_const_def(&mut self, c: &ConstDefStmt<TypeInfo>) -> Result<Signal, RuntimeError> {
        let value = self.eval(&c.value)?;
        self.env.declare(&c.name, value);
        Ok(Signal::Normal(Literal::Unit))
    }

    fn exec_assign(&mut self, a: &AssignStmt<TypeInfo>) -> Result<Signal, RuntimeError> {
        let value = self.eval(&a.value)?;
        self.env.set(&a.name, value);
        Ok(Signal::Normal(Literal::Unit))
    }

    fn exec_if(&mut self, i: &IfStmt<TypeInfo>) -> Result<Signal, RuntimeError> {
        let cond = self.eval(&i.cond)?;
        if truthy(&cond) {
            self.exec_block(&i.then_block)
        } else if let Some(else_block) = &i.else_block {
            self.exec_block(else_block)
        } else {
            Ok(Signal::Normal(Literal::Unit))
        }
    }

    fn exec_while(&mut self, w: &WhileStmt<TypeInfo>) -> Result<Signal, RuntimeError> {
        loop {
            let cond = self.eval(&w.cond)?;
            if !truthy(&cond) {
                break;
            }
            match self.exec_block(&w.body)? {
                Signal::Break => break,
                Signal::Continue | Signal::Normal(_) => {}
                ret @ Signal::Return(_) => return Ok(ret),
            }
        }
        Ok(Signal::Normal(Literal::Unit))
    }

    fn exec_block(&mut self, block: &BlockStmt<TypeInfo>) -> Result<Signal, RuntimeError> {
        self.env.push_block();
        let result = self.exec_statements(&block.statements);
        self.env.pop_block();
        result
    }

    fn exec_statements(&mut self, statements: &[Statement<TypeInfo>]) -> Result<Signal, RuntimeError> {
        for stmt in statements {
            match self.exec(stmt)? {
                Signal::Normal(_) => {}
                other => return Ok(other),
            }
        }
        Ok(Signal::Normal(Literal::Unit))
    }

    fn eval(&mut self, expr: &Expression<TypeInfo>) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Literal(l) => Ok(l.value.clone()),
            Expression::Location(l) => self.eval_location(l),
            Expression::UnOp(u) => self.eval_unop(u),
            Expression::BinOp(b) => self.eval_binop(b),
            Expression::Call(c) => self.eval_call(c),
            Expression::Compound(c) => self.eval_compound(c),
        }
    }

    fn eval_location(&mut self, l: &LocationExpr<TypeInfo>) -> Result<Value, RuntimeError> {
        self.env
            .get(&l.name)
            .cloned()
            .ok_or_else(|| RuntimeError::new(format!("{} not defined!", l.name)))
    }

    fn eval_unop(&mut self, u: &UnOpExpr<TypeInfo>) -> Result<Value, RuntimeError> {
        let operand = self.eval(&u.operand)?;
        Ok(match (u.op, operand) {
            (UnaryOp::Plus, Literal::Integer(v)) => Literal::Integer(v),
            (UnaryOp::Plus, Literal::Float(v)) => Literal::Float(v),
            (UnaryOp::Minus, Literal::Integer(v)) => Literal::Integer(-v),
            (UnaryOp::Minus, Literal::Float(v)) => Literal::Float(-v),
            (UnaryOp::Not, Literal::Bool(v)) => Literal::Bool(!v),
            (_, other) => other,
        })
    }

    fn eval_binop(&mut self, b: &BinOpExpr<TypeInfo>) -> Result<Value, RuntimeError> {
        // Short-circuit: the right operand is only evaluated when needed (§4.4).
        if b.op == BinaryOp::And {
            let lhs = self.eval(&b.lhs)?;
            if !truthy(&lhs) {
                return Ok(Literal::Bool(false));
            }
            return Ok(Literal::Bool(truthy(&self.eval(&b.rhs)?)));
        }
        if b.op == BinaryOp::Or {
            let lhs = self.eval(&b.lhs)?;
            if truthy(&lhs) {
                return Ok(Literal::Bool(true));
            }
            return Ok(Literal::Bool(truthy(&self.eval(&b.rhs)?)));
        }

        let lhs = self.eval(&b.lhs)?;
        let rhs = self.eval(&b.rhs)?;
        Ok(apply_binop(b.op, lhs, rhs))
    }

    fn eval_call(&mut self, c: &CallExpr<TypeInfo>) -> Result<Value, RuntimeError> {
        let args: Vec<Value> = c
            .args
            .iter()
            .map(|a| self.eval(a))
            .collect::<Result<_, _>>()?;
        let func = self
            .functions
            .get(&c.name)
            .cloned()
            .ok_or_else(|| RuntimeError::new(format!("{} not defined!", c.name)))?;
        self.call_function(&func, args)
    }

    fn call_function(
        &mut self,
        func: &FuncDefStmt<TypeInfo>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let mut frame = HashMap::new();
        for (param, arg) in func.params.iter().zip(args) {
            frame.insert(param.name.clone(), arg);
        }
        let saved = self.env.enter_call(frame);
        let result = self.exec_statements(&func.body.statements);
        self.env.exit_call(saved);
        Ok(result?.into_value())
    }

    fn eval_compound(&mut self, c: &CompoundExpr<TypeInfo>) -> Result<Value, RuntimeError> {
        self.env.push_block();
        let result = (|| {
            for stmt in &c.leading {
                match self.exec(stmt)? {
                    Signal::Normal(_) => {}
                    _ => {
                        return Err(RuntimeError::new(
                            "break/continue/return inside a compound expression",
                        ))
                    }
                }
            }
            self.eval(&c.tail)
        })();
        self.env.pop_block();
        result
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Literal::Bool(b) => *b,
        Literal::Unit => false,
        _ => true,
    }
}

fn default_for(p_type: crate::ast::PType) -> Value {
    use crate::ast::PType;
    match p_type {
        PType::Int => Literal::Integer(0),
        PType::Float => Literal::Float(0.0),
        PType::Char => Literal::Char('\0'),
        PType::Bool => Literal::Bool(false),
        PType::Unit => Literal::Unit,
    }
}

/// Integer division truncates toward zero; division by zero is tolerant
/// rather than trapping, yielding the type's maximum value (§4.4, §9 open
/// question (a)).
fn apply_binop(op: BinaryOp, lhs: Value, rhs: Value) -> Value {
    use Literal::*;
    match (op, lhs, rhs) {
        (BinaryOp::Add, Integer(a), Integer(b)) => Integer(a.wrapping_add(b)),
        (BinaryOp::Sub, Integer(a), Integer(b)) => Integer(a.wrapping_sub(b)),
        (BinaryOp::Mul, Integer(a), Integer(b)) => Integer(a.wrapping_mul(b)),
        (BinaryOp::Div, Integer(a), Integer(b)) => {
            if b == 0 {
                Integer(i64::MAX)
            } else {
                Integer(a.wrapping_div(b))
            }
        }
        (BinaryOp::Add, Float(a), Float(b)) => Float(a + b),
        (BinaryOp::Sub, Float(a), Float(b)) => Float(a - b),
        (BinaryOp::Mul, Float(a), Float(b)) => Float(a * b),
        (BinaryOp::Div, Float(a), Float(b)) => {
            if b == 0.0 {
                Float(f64::MAX)
            } else {
                Float(a / b)
            }
        }
        (BinaryOp::Lt, a, b) => Bool(compare(&a, &b) == std::cmp::Ordering::Less),
        (BinaryOp::Le, a, b) => Bool(compare(&a, &b) != std::cmp::Ordering::Greater),
        (BinaryOp::Gt, a, b) => Bool(compare(&a, &b) == std::cmp::Ordering::Greater),
        (BinaryOp::Ge, a, b) => Bool(compare(&a, &b) != std::cmp::Ordering::Less),
        (BinaryOp::Eq, a, b) => Bool(a == b),
        (BinaryOp::Ne, a, b) => Bool(a != b),
        (_, a, _) => a,
    }
}

fn compare(a: &Literal, b: &Literal) -> std::cmp::Ordering {
    match (a, b) {
        (Literal::Integer(a), Literal::Integer(b)) => a.cmp(b),
        (Literal::Float(a), Literal::Float(b)) => a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal),
        (Literal::Char(a), Literal::Char(b)) => a.cmp(b),
        _ => std::cmp::Ordering::Equal,
    }
}
