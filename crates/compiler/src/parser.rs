//! Parser for Cedar.
//!
//! Recursive descent with precedence climbing over the operator table
//! (lowest to highest): `=` (right-associative); `&&`/`||`; `&`/`|`/`^`;
//! relational; shifts; `+`/`-`; `*`/`/`/`#`/`\`/`%`/`@`; unary; primary.
//! The dangling `else` binds to the innermost `if`, as the grammar falls
//! out of recursive descent naturally.
//!
//! Syntax errors are recorded as one-line diagnostics and the parser
//! synchronizes at the next statement or declaration boundary, so a
//! single bad token does not hide later errors.

use crate::ast::{
    BinOp, BlockItem, Expr, ExternDecl, ExternKind, Function, GlobalDecl, GlobalVar, Initializer,
    Literal, Program, RetType, Statement, UnaryOp, VarDecl, VarType,
};
use crate::lexer::{Token, TokenKind, tokenize};
use std::fmt;

/// A recorded syntax error, pointing at the offending token.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub text: String,
    pub kind: String,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == "EOF" {
            write!(f, "Syntax error at end of file, line {}", self.line)
        } else {
            write!(
                f,
                "Syntax error at {} ({}), line {}, position {}",
                self.text, self.kind, self.line, self.col
            )
        }
    }
}

/// Marker for "an error has already been recorded".
type ParseResult<T> = Result<T, ()>;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    /// Build a parser over a pre-lexed token stream.
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    /// Lex and parse in one step, discarding lexical diagnostics.
    pub fn from_source(source: &str) -> Self {
        let (tokens, _) = tokenize(source);
        Parser::new(tokens)
    }

    /// Parse a whole program. Returns the AST if no syntax errors were
    /// recorded, otherwise every collected diagnostic.
    pub fn parse(&mut self) -> Result<Program, Vec<SyntaxError>> {
        let mut decls = Vec::new();
        while !self.at_end() {
            match self.global_decl() {
                Ok(decl) => decls.push(decl),
                Err(()) => self.synchronize(),
            }
        }
        if self.errors.is_empty() {
            Ok(Program { decls })
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Record a syntax error at the current token (or EOF) and fail.
    fn unexpected<T>(&mut self) -> ParseResult<T> {
        let err = match self.tokens.get(self.pos) {
            Some(t) => SyntaxError {
                text: t.kind.text(),
                kind: t.kind.kind_name().to_string(),
                line: t.line,
                col: t.col,
            },
            None => SyntaxError {
                text: String::new(),
                kind: "EOF".to_string(),
                line: self.tokens.last().map(|t| t.line).unwrap_or(1),
                col: 0,
            },
        };
        self.errors.push(err);
        Err(())
    }

    fn check_punct(&self, c: char) -> bool {
        matches!(self.peek(), Some(TokenKind::Punct(p)) if *p == c)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.check_punct(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> ParseResult<()> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            self.unexpected()
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => self.unexpected(),
        }
    }

    /// Skip to the next plausible declaration or statement boundary.
    fn synchronize(&mut self) {
        while let Some(kind) = self.peek() {
            match kind {
                TokenKind::Punct(';') | TokenKind::Punct('}') => {
                    self.pos += 1;
                    return;
                }
                TokenKind::Export | TokenKind::Extern | TokenKind::Void => return,
                _ => self.pos += 1,
            }
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn global_decl(&mut self) -> ParseResult<GlobalDecl> {
        match self.peek() {
            Some(TokenKind::Export) => self.export_decl(),
            Some(TokenKind::Extern) => self.extern_decl(),
            Some(TokenKind::Void) => {
                self.pos += 1;
                let name = self.expect_ident()?;
                let (params, body) = self.function_header_body()?;
                Ok(GlobalDecl::Function(Function {
                    ret: RetType::Void,
                    name,
                    params,
                    body,
                }))
            }
            Some(TokenKind::Type(_)) => {
                let decl = self.var_decl()?;
                if self.eat(&TokenKind::Assign) {
                    let value = self.initializer()?;
                    self.expect_punct(';')?;
                    Ok(GlobalDecl::Variable(GlobalVar {
                        ty: decl.ty,
                        name: decl.name,
                        value,
                    }))
                } else if self.check_punct('(') {
                    let (params, body) = self.function_header_body()?;
                    Ok(GlobalDecl::Function(Function {
                        ret: RetType::Value(decl.ty),
                        name: decl.name,
                        params,
                        body,
                    }))
                } else {
                    self.unexpected()
                }
            }
            _ => self.unexpected(),
        }
    }

    fn export_decl(&mut self) -> ParseResult<GlobalDecl> {
        self.pos += 1;
        let name = self.expect_ident()?;
        let function = if self.eat_punct('(') {
            self.expect_punct(')')?;
            true
        } else {
            false
        };
        self.expect_punct(';')?;
        Ok(GlobalDecl::Export { name, function })
    }

    fn extern_decl(&mut self) -> ParseResult<GlobalDecl> {
        self.pos += 1;
        let linkage = match self.peek() {
            Some(TokenKind::StrLit(s)) => {
                let s = s.clone();
                self.pos += 1;
                Some(s)
            }
            _ => None,
        };
        match self.peek() {
            Some(TokenKind::Void) => {
                self.pos += 1;
                let name = self.expect_ident()?;
                let (params, varargs) = self.extern_params()?;
                self.expect_punct(';')?;
                Ok(GlobalDecl::Extern(ExternDecl {
                    linkage,
                    name,
                    kind: ExternKind::Function {
                        ret: RetType::Void,
                        params,
                        varargs,
                    },
                }))
            }
            Some(TokenKind::Type(_)) => {
                let decl = self.var_decl()?;
                if self.check_punct('(') {
                    let (params, varargs) = self.extern_params()?;
                    self.expect_punct(';')?;
                    Ok(GlobalDecl::Extern(ExternDecl {
                        linkage,
                        name: decl.name,
                        kind: ExternKind::Function {
                            ret: RetType::Value(decl.ty),
                            params,
                            varargs,
                        },
                    }))
                } else {
                    self.expect_punct(';')?;
                    Ok(GlobalDecl::Extern(ExternDecl {
                        linkage,
                        name: decl.name,
                        kind: ExternKind::Variable(decl.ty),
                    }))
                }
            }
            _ => self.unexpected(),
        }
    }

    fn var_decl(&mut self) -> ParseResult<VarDecl> {
        let ty = self.var_type()?;
        let name = self.expect_ident()?;
        Ok(VarDecl { ty, name })
    }

    fn var_type(&mut self) -> ParseResult<VarType> {
        let prim = match self.peek() {
            Some(TokenKind::Type(p)) => {
                let p = *p;
                self.pos += 1;
                p
            }
            _ => return self.unexpected(),
        };
        if self.eat_punct('[') {
            let len = match self.peek() {
                Some(TokenKind::IntLit(v)) => {
                    let v = *v;
                    if v < 0 {
                        return self.unexpected();
                    }
                    self.pos += 1;
                    Some(v as u32)
                }
                _ => None,
            };
            self.expect_punct(']')?;
            Ok(VarType::Array { elem: prim, len })
        } else {
            Ok(VarType::Prim(prim))
        }
    }

    fn literal(&mut self) -> ParseResult<Literal> {
        match self.peek() {
            Some(TokenKind::IntLit(v)) => {
                let v = *v;
                self.pos += 1;
                Ok(Literal::Int(v))
            }
            Some(TokenKind::CharLit(c)) => {
                let c = *c;
                self.pos += 1;
                Ok(Literal::Char(c))
            }
            Some(TokenKind::StrLit(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(Literal::Str(s))
            }
            _ => self.unexpected(),
        }
    }

    fn initializer(&mut self) -> ParseResult<Initializer> {
        if self.eat_punct('{') {
            let mut elems = Vec::new();
            if !self.check_punct('}') {
                elems.push(self.literal()?);
                while self.eat_punct(',') {
                    elems.push(self.literal()?);
                }
            }
            self.expect_punct('}')?;
            Ok(Initializer::Array(elems))
        } else {
            Ok(Initializer::Literal(self.literal()?))
        }
    }

    fn function_header_body(&mut self) -> ParseResult<(Vec<String>, Statement)> {
        self.expect_punct('(')?;
        let params = self.param_list()?;
        self.expect_punct(')')?;
        let body = self.statement()?;
        Ok((params, body))
    }

    /// A parameter is an identifier, optionally preceded by a type
    /// annotation which is parsed and discarded (parameters are dword
    /// slots regardless of declared type).
    fn param(&mut self) -> ParseResult<String> {
        if matches!(self.peek(), Some(TokenKind::Type(_))) {
            let decl = self.var_decl()?;
            Ok(decl.name)
        } else {
            self.expect_ident()
        }
    }

    fn param_list(&mut self) -> ParseResult<Vec<String>> {
        let mut params = Vec::new();
        if self.check_punct(')') {
            return Ok(params);
        }
        params.push(self.param()?);
        while self.eat_punct(',') {
            params.push(self.param()?);
        }
        Ok(params)
    }

    /// Extern parameter list: like `param_list` but a final `...` marks
    /// the function variadic.
    fn extern_params(&mut self) -> ParseResult<(Vec<String>, bool)> {
        self.expect_punct('(')?;
        let mut params = Vec::new();
        let mut varargs = false;
        if !self.check_punct(')') {
            if self.eat(&TokenKind::Ellipsis) {
                varargs = true;
            } else {
                params.push(self.param()?);
                while self.eat_punct(',') {
                    if self.eat(&TokenKind::Ellipsis) {
                        varargs = true;
                        break;
                    }
                    params.push(self.param()?);
                }
            }
        }
        self.expect_punct(')')?;
        Ok((params, varargs))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> ParseResult<Statement> {
        match self.peek() {
            Some(TokenKind::Punct('{')) => self.block(),
            Some(TokenKind::If) => {
                self.pos += 1;
                let cond = self.condition()?;
                let then = Box::new(self.statement()?);
                let els = if self.eat(&TokenKind::Else) {
                    Some(Box::new(self.statement()?))
                } else {
                    None
                };
                Ok(Statement::If { cond, then, els })
            }
            Some(TokenKind::While) => {
                self.pos += 1;
                let cond = self.condition()?;
                let body = Box::new(self.statement()?);
                Ok(Statement::While { cond, body })
            }
            Some(TokenKind::Break) => {
                self.pos += 1;
                self.expect_punct(';')?;
                Ok(Statement::Break)
            }
            Some(TokenKind::Continue) => {
                self.pos += 1;
                self.expect_punct(';')?;
                Ok(Statement::Continue)
            }
            Some(TokenKind::Return) => {
                self.pos += 1;
                if self.eat_punct(';') {
                    Ok(Statement::Return(None))
                } else {
                    let expr = self.expr()?;
                    self.expect_punct(';')?;
                    Ok(Statement::Return(Some(expr)))
                }
            }
            Some(TokenKind::Punct(';')) => {
                self.pos += 1;
                Ok(Statement::Empty)
            }
            _ => {
                let expr = self.expr()?;
                self.expect_punct(';')?;
                Ok(Statement::Expr(expr))
            }
        }
    }

    fn condition(&mut self) -> ParseResult<Expr> {
        self.expect_punct('(')?;
        let cond = self.expr()?;
        self.expect_punct(')')?;
        Ok(cond)
    }

    fn block(&mut self) -> ParseResult<Statement> {
        self.expect_punct('{')?;
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Some(TokenKind::Punct('}')) => {
                    self.pos += 1;
                    return Ok(Statement::Block(items));
                }
                Some(TokenKind::Type(_)) => {
                    let decl = self.var_decl()?;
                    self.expect_punct(';')?;
                    items.push(BlockItem::Decl(decl));
                }
                Some(_) => match self.statement() {
                    Ok(stmt) => items.push(BlockItem::Stmt(stmt)),
                    // Recover inside the block so one bad statement does
                    // not swallow the rest of the function. Synchronizing
                    // must consume at least one token or the loop would
                    // retry the same one forever.
                    Err(()) => {
                        let before = self.pos;
                        self.synchronize();
                        if self.pos == before {
                            self.pos += 1;
                        }
                    }
                },
                None => return self.unexpected(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let lhs = self.logical()?;
        if matches!(self.peek(), Some(TokenKind::Assign)) {
            if !lhs.is_lvalue() {
                return self.unexpected();
            }
            self.pos += 1;
            let rhs = self.assignment()?;
            return Ok(Expr::Binary {
                op: BinOp::Assign,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn logical(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.bitwise()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::AndAnd) => BinOp::And,
                Some(TokenKind::OrOr) => BinOp::Or,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.bitwise()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn bitwise(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.relational()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Punct('&')) => BinOp::BitAnd,
                Some(TokenKind::Punct('|')) => BinOp::BitOr,
                Some(TokenKind::Punct('^')) => BinOp::BitXor,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.relational()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn relational(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.shift()?;
        while let Some(TokenKind::Relop(r)) = self.peek() {
            let op = BinOp::Rel(*r);
            self.pos += 1;
            let rhs = self.shift()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn shift(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.additive()?;
        while let Some(TokenKind::Shift(s)) = self.peek() {
            let op = BinOp::Shift(*s);
            self.pos += 1;
            let rhs = self.additive()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Punct('+')) => BinOp::Add,
                Some(TokenKind::Punct('-')) => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn multiplicative(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Punct('*')) => BinOp::Mul,
                Some(TokenKind::Punct('/')) => BinOp::Div,
                Some(TokenKind::Punct('#')) => BinOp::MulU,
                Some(TokenKind::Punct('\\')) => BinOp::DivU,
                Some(TokenKind::Punct('%')) => BinOp::Rem,
                Some(TokenKind::Punct('@')) => BinOp::RemU,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek() {
            Some(TokenKind::Punct('!')) => Some(UnaryOp::Not),
            Some(TokenKind::Punct('-')) => Some(UnaryOp::Neg),
            Some(TokenKind::Punct('~')) => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            let expr = self.unary()?;
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
            });
        }
        match self.peek() {
            // In operand position `*` and `#` are the dereference
            // operators; in operator position they are multiplications.
            Some(TokenKind::Punct('*')) => {
                self.pos += 1;
                let expr = self.unary()?;
                Ok(Expr::Deref {
                    expr: Box::new(expr),
                    byte: false,
                })
            }
            Some(TokenKind::Punct('#')) => {
                self.pos += 1;
                let expr = self.unary()?;
                Ok(Expr::Deref {
                    expr: Box::new(expr),
                    byte: true,
                })
            }
            Some(TokenKind::Punct('&')) => {
                self.pos += 1;
                let lvalue = self.unary()?;
                if !lvalue.is_lvalue() {
                    return self.unexpected();
                }
                Ok(Expr::Address(Box::new(lvalue)))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        match self.peek() {
            Some(TokenKind::IntLit(_) | TokenKind::CharLit(_) | TokenKind::StrLit(_)) => {
                Ok(Expr::Literal(self.literal()?))
            }
            Some(TokenKind::Punct('(')) => {
                self.pos += 1;
                let expr = self.expr()?;
                self.expect_punct(')')?;
                Ok(expr)
            }
            Some(TokenKind::Syscall(name)) => {
                let name = name.clone();
                self.pos += 1;
                let args = self.arg_list()?;
                Ok(Expr::Call { name, args })
            }
            Some(TokenKind::Ident(_)) => {
                let name = match self.advance() {
                    Some(Token {
                        kind: TokenKind::Ident(name),
                        ..
                    }) => name,
                    _ => return self.unexpected(),
                };
                if self.check_punct('(') {
                    let args = self.arg_list()?;
                    Ok(Expr::Call { name, args })
                } else if self.eat_punct('[') {
                    let index = self.expr()?;
                    self.expect_punct(']')?;
                    Ok(Expr::ArrayAccess {
                        name,
                        index: Box::new(index),
                    })
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            _ => self.unexpected(),
        }
    }

    fn arg_list(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect_punct('(')?;
        let mut args = Vec::new();
        if !self.check_punct(')') {
            args.push(self.expr()?);
            while self.eat_punct(',') {
                args.push(self.expr()?);
            }
        }
        self.expect_punct(')')?;
        Ok(args)
    }
}
