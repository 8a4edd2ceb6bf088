//! Operator-precedence recursive-descent parser (§4.2).
mod error;

pub use error::ParseError;

use log::debug;
use std::str::FromStr;

use crate::ast::{
    Ast, AssignStmt, BinOpExpr, BinaryOp, BlockStmt, BreakStmt, CallExpr, CompoundExpr,
    ConstDefStmt, ContinueStmt, Expression, FuncDefStmt, IfStmt, Literal, LiteralExpr,
    LocationExpr, PType, Param, PrintStmt, ReturnStmt, Statement, UnOpExpr, UnaryOp, VarDefStmt,
    WhileStmt,
};
use crate::lexer::{Token, TokenKind};

pub fn parse(tokens: Vec<Token>) -> (Ast<()>, Vec<ParseError>) {
    debug!("parsing {} tokens", tokens.len());
    let mut parser = Parser::new(tokens);
    let items = parser.program();
    (Ast::new(items), parser.errors)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

type PResult<T> = Result<T, ()>;

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: vec![],
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(ParseError::new(self.line(), message.into()));
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            self.error(format!("Unexpected token {}, expected {kind}", self.peek()));
            Err(())
        }
    }

    /// Skips to the next statement boundary after a parse error, so one bad
    /// statement does not abort the whole program (§7 "continue to the next
    /// synchronization point").
    fn synchronize(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Eof | TokenKind::RBrace => return,
                TokenKind::Semi => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn name(&mut self) -> PResult<String> {
        match self.peek().clone() {
            TokenKind::Name(n) => {
                self.advance();
                Ok(n)
            }
            _ => {
                self.error(format!("Unexpected token {}, expected a name", self.peek()));
                Err(())
            }
        }
    }

    fn type_name(&mut self) -> PResult<PType> {
        let line = self.line();
        let name = self.name()?;
        PType::from_str(&name).map_err(|_| {
            self.errors
                .push(ParseError::new(line, format!("Invalid type '{name}'")));
        })
    }

    // ---- top level ----

    fn program(&mut self) -> Vec<Statement<()>> {
        let mut items = vec![];
        while !matches!(self.peek(), TokenKind::Eof) {
            match self.top_item() {
                Ok(item) => items.push(item),
                Err(()) => self.synchronize(),
            }
        }
        items
    }

    /// The formal grammar names `func_def | var_def | const_def` as the
    /// top-level items, but several of the worked example programs are bare
    /// top-level statements (a lone `print`, `if`, `while`, ...), so in
    /// practice a top item is a function definition or any statement.
    fn top_item(&mut self) -> PResult<Statement<()>> {
        match self.peek() {
            TokenKind::Func => self.func_def(),
            _ => self.stmt(),
        }
    }

    fn func_def(&mut self) -> PResult<Statement<()>> {
        let line = self.line();
        self.expect(TokenKind::Func)?;
        let name = self.name()?;
        self.expect(TokenKind::LParen)?;
        let mut params = vec![];
        if !self.check(&TokenKind::RParen) {
            loop {
                let p_line = self.line();
                let p_name = self.name()?;
                let p_type = self.type_name()?;
                params.push(Param {
                    name: p_name,
                    p_type,
                    line: p_line,
                });
                if self.check(&TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let return_type = if self.check(&TokenKind::LBrace) {
            PType::Unit
        } else {
            self.type_name()?
        };
        let body = self.block()?;
        Ok(Statement::FuncDef(FuncDefStmt {
            name,
            params,
            return_type,
            body,
            line,
        }))
    }

    fn var_def(&mut self) -> PResult<Statement<()>> {
        let line = self.line();
        self.expect(TokenKind::Var)?;
        let name = self.name()?;
        let declared_type = if !self.check(&TokenKind::Assign) && !self.check(&TokenKind::Semi) {
            Some(self.type_name()?)
        } else {
            None
        };
        let value = if self.check(&TokenKind::Assign) {
            self.advance();
            Some(self.expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Semi)?;
        Ok(Statement::VarDef(VarDefStmt {
            name,
            declared_type,
            value,
            line,
        }))
    }

    fn const_def(&mut self) -> PResult<Statement<()>> {
        let line = self.line();
        self.expect(TokenKind::Const)?;
        let name = self.name()?;
        let declared_type = if !self.check(&TokenKind::Assign) {
            Some(self.type_name()?)
        } else {
            None
        };
        self.expect(TokenKind::Assign)?;
        let value = self.expr()?;
        self.expect(TokenKind::Semi)?;
        Ok(Statement::ConstDef(ConstDefStmt {
            name,
            declared_type,
            value,
            line,
        }))
    }

    // ---- statements ----

    fn block(&mut self) -> PResult<BlockStmt<()>> {
        let line = self.line();
        self.expect(TokenKind::LBrace)?;
        let mut statements = vec![];
        while !self.check(&TokenKind::RBrace) && !matches!(self.peek(), TokenKind::Eof) {
            match self.stmt() {
                Ok(s) => statements.push(s),
                Err(()) => self.synchronize(),
            }
        }
        self.expect(TokenKind::RBrace)?;
        Ok(BlockStmt { statements, line })
    }

    fn stmt(&mut self) -> PResult<Statement<()>> {
        match self.peek() {
            TokenKind::Print => self.print_stmt(),
            TokenKind::Var => self.var_def(),
            TokenKind::Const => self.const_def(),
            TokenKind::If => self.if_stmt(),
            TokenKind::While => self.while_stmt(),
            TokenKind::Break => {
                let line = self.line();
                self.advance();
                self.expect(TokenKind::Semi)?;
                Ok(Statement::Break(BreakStmt { line }))
            }
            TokenKind::Continue => {
                let line = self.line();
                self.advance();
                self.expect(TokenKind::Semi)?;
                Ok(Statement::Continue(ContinueStmt { line }))
            }
            TokenKind::Return => {
                let line = self.line();
                self.advance();
                let value = if self.check(&TokenKind::Semi) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(TokenKind::Semi)?;
                Ok(Statement::Return(ReturnStmt { value, line }))
            }
            TokenKind::Name(_) if matches!(self.peek_at(1), TokenKind::Assign) => {
                self.assign_stmt()
            }
            _ => {
                let expr = self.expr()?;
                self.expect(TokenKind::Semi)?;
                Ok(Statement::Expr(expr))
            }
        }
    }

    fn print_stmt(&mut self) -> PResult<Statement<()>> {
        let line = self.line();
        self.expect(TokenKind::Print)?;
        let expr = self.expr()?;
        self.expect(TokenKind::Semi)?;
        Ok(Statement::Print(PrintStmt { expr, line }))
    }

    fn assign_stmt(&mut self) -> PResult<Statement<()>> {
        let line = self.line();
        let name = self.name()?;
        self.expect(TokenKind::Assign)?;
        let value = self.expr()?;
        self.expect(TokenKind::Semi)?;
        Ok(Statement::Assign(AssignStmt { name, value, line }))
    }

    fn if_stmt(&mut self) -> PResult<Statement<()>> {
        let line = self.line();
        self.expect(TokenKind::If)?;
        let cond = self.expr()?;
        let then_block = self.block()?;
        let else_block = if self.check(&TokenKind::Else) {
            self.advance();
            Some(self.block()?)
        } else {
            None
        };
        Ok(Statement::If(IfStmt {
            cond,
            then_block,
            else_block,
            line,
        }))
    }

    fn while_stmt(&mut self) -> PResult<Statement<()>> {
        let line = self.line();
        self.expect(TokenKind::While)?;
        let cond = self.expr()?;
        let body = self.block()?;
        Ok(Statement::While(WhileStmt { cond, body, line }))
    }

    // ---- expressions (lowest to highest precedence, §4.2) ----

    fn expr(&mut self) -> PResult<Expression<()>> {
        self.logic_or()
    }

    fn logic_or(&mut self) -> PResult<Expression<()>> {
        let mut lhs = self.logic_and()?;
        while self.check(&TokenKind::OrOr) {
            let line = self.line();
            self.advance();
            let rhs = self.logic_and()?;
            lhs = bin(BinaryOp::Or, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn logic_and(&mut self) -> PResult<Expression<()>> {
        let mut lhs = self.equality()?;
        while self.check(&TokenKind::AndAnd) {
            let line = self.line();
            self.advance();
            let rhs = self.equality()?;
            lhs = bin(BinaryOp::And, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> PResult<Expression<()>> {
        let mut lhs = self.relational()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let rhs = self.relational()?;
            lhs = bin(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn relational(&mut self) -> PResult<Expression<()>> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Le => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Ge => BinaryOp::Ge,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let rhs = self.additive()?;
            lhs = bin(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> PResult<Expression<()>> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = bin(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> PResult<Expression<()>> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let rhs = self.unary()?;
            lhs = bin(op, lhs, rhs, line);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> PResult<Expression<()>> {
        let op = match self.peek() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let line = self.line();
            self.advance();
            let operand = self.unary()?;
            return Ok(Expression::UnOp(UnOpExpr {
                op,
                operand: Box::new(operand),
                line,
                info: (),
            }));
        }
        self.atom()
    }

    fn atom(&mut self) -> PResult<Expression<()>> {
        let line = self.line();
        match self.peek().clone() {
            TokenKind::Integer(v) => {
                self.advance();
                Ok(lit(Literal::Integer(v), line))
            }
            TokenKind::Float(v) => {
                self.advance();
                Ok(lit(Literal::Float(v), line))
            }
            TokenKind::Char(v) => {
                self.advance();
                Ok(lit(Literal::Char(v), line))
            }
            TokenKind::True => {
                self.advance();
                Ok(lit(Literal::Bool(true), line))
            }
            TokenKind::False => {
                self.advance();
                Ok(lit(Literal::Bool(false), line))
            }
            TokenKind::LParen if matches!(self.peek_at(1), TokenKind::RParen) => {
                self.advance();
                self.advance();
                Ok(lit(Literal::Unit, line))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBrace => self.compound(),
            TokenKind::Name(name) if matches!(self.peek_at(1), TokenKind::LParen) => {
                self.advance();
                self.advance();
                let mut args = vec![];
                if !self.check(&TokenKind::RParen) {
                    loop {
                        args.push(self.expr()?);
                        if self.check(&TokenKind::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen)?;
                Ok(Expression::Call(CallExpr {
                    name,
                    args,
                    line,
                    info: (),
                }))
            }
            TokenKind::Name(name) => {
                self.advance();
                Ok(Expression::Location(LocationExpr {
                    name,
                    line,
                    info: (),
                }))
            }
            _ => {
                self.error(format!("Unexpected token {}, expected an expression", self.peek()));
                Err(())
            }
        }
    }

    /// `{ stmt* expr }`: statements accumulate until the next token cannot
    /// start a new statement, at which point what remains must be the
    /// trailing expression with no `;` (§3, §4.2).
    fn compound(&mut self) -> PResult<Expression<()>> {
        let line = self.line();
        self.expect(TokenKind::LBrace)?;
        let mut leading = vec![];
        loop {
            match self.peek() {
                TokenKind::Print
                | TokenKind::Var
                | TokenKind::Const
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return => {
                    leading.push(self.stmt()?);
                }
                TokenKind::Name(_) if matches!(self.peek_at(1), TokenKind::Assign) => {
                    leading.push(self.assign_stmt()?);
                }
                _ => {
                    let expr = self.expr()?;
                    if self.check(&TokenKind::Semi) {
                        self.advance();
                        leading.push(Statement::Expr(expr));
                    } else {
                        self.expect(TokenKind::RBrace)?;
                        return Ok(Expression::Compound(CompoundExpr {
                            leading,
                            tail: Box::new(expr),
                            line,
                            info: (),
                        }));
                    }
                }
            }
        }
    }
}

fn lit(value: Literal, line: usize) -> Expression<()> {
    Expression::Literal(LiteralExpr {
        value,
        line,
        info: (),
    })
}

fn bin(op: BinaryOp, lhs: Expression<()>, rhs: Expression<()>, line: usize) -> Expression<()> {
    Expression::BinOp(BinOpExpr {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        line,
        info: (),
    })
}
