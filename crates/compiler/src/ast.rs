//! Abstract syntax tree for Cedar.
//!
//! Every node is a tagged variant; the code generator discriminates with
//! exhaustive `match`. The `Display` impls render a node back to source
//! text that re-parses to a structurally equal tree, which is what the
//! round-trip tests and the `graph` subcommand rely on.

use std::fmt;

/// The two scalar types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimType {
    Int,
    Char,
}

impl PrimType {
    /// Size in bytes: `int` is a dword, `char` a single byte.
    pub fn size(self) -> u32 {
        match self {
            PrimType::Int => 4,
            PrimType::Char => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimType::Int => "int",
            PrimType::Char => "char",
        }
    }
}

impl fmt::Display for PrimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A variable's declared type: a scalar or an array of scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarType {
    Prim(PrimType),
    /// `len` is `None` until an initializer supplies the length.
    Array { elem: PrimType, len: Option<u32> },
}

impl VarType {
    /// The scalar type stored in this slot (the element type for arrays).
    pub fn elem(&self) -> PrimType {
        match self {
            VarType::Prim(p) => *p,
            VarType::Array { elem, .. } => *elem,
        }
    }

    /// Size in bytes. Array sizes are rounded up to a dword multiple.
    /// Returns `None` for an array whose length is still unknown.
    pub fn size(&self) -> Option<u32> {
        match self {
            VarType::Prim(p) => Some(p.size()),
            VarType::Array { elem, len } => {
                let len = (*len)?;
                Some((len * elem.size()).div_ceil(4) * 4)
            }
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Prim(p) => write!(f, "{}", p),
            VarType::Array { elem, len: Some(n) } => write!(f, "{}[{}]", elem, n),
            VarType::Array { elem, len: None } => write!(f, "{}[]", elem),
        }
    }
}

/// A function's return type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetType {
    Void,
    Value(VarType),
}

impl RetType {
    pub fn is_void(&self) -> bool {
        matches!(self, RetType::Void)
    }
}

impl fmt::Display for RetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetType::Void => f.write_str("void"),
            RetType::Value(ty) => write!(f, "{}", ty),
        }
    }
}

/// A literal as written in the source. String escapes are kept verbatim
/// and only interpreted by the assembler (backtick quoting).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i32),
    Char(char),
    Str(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Char(c) => write!(f, "'{}'", c),
            Literal::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// A global variable's initializer.
#[derive(Debug, Clone, PartialEq)]
pub enum Initializer {
    Literal(Literal),
    Array(Vec<Literal>),
}

impl fmt::Display for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Initializer::Literal(l) => write!(f, "{}", l),
            Initializer::Array(elems) => {
                f.write_str("{")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// `<type> <name>`, as it appears in block-local declarations.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub ty: VarType,
    pub name: String,
}

impl fmt::Display for VarDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ty, self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVar {
    pub ty: VarType,
    pub name: String,
    pub value: Initializer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub ret: RetType,
    pub name: String,
    /// Parameter names in declaration order. Declared parameter types are
    /// discarded: every parameter occupies a dword slot.
    pub params: Vec<String>,
    pub body: Statement,
}

/// What an `extern` declaration names.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternKind {
    Variable(VarType),
    Function {
        ret: RetType,
        params: Vec<String>,
        varargs: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternDecl {
    /// The linkage string as written (`extern "C" ...`); `None` means the
    /// compiler's native convention.
    pub linkage: Option<String>,
    pub name: String,
    pub kind: ExternKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalDecl {
    Variable(GlobalVar),
    Function(Function),
    Export { name: String, function: bool },
    Extern(ExternDecl),
}

impl fmt::Display for GlobalDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlobalDecl::Variable(v) => write!(f, "{} {} = {};", v.ty, v.name, v.value),
            GlobalDecl::Function(func) => {
                write!(f, "{} {}({}) {}", func.ret, func.name, func.params.join(", "), func.body)
            }
            GlobalDecl::Export { name, function: true } => write!(f, "export {}();", name),
            GlobalDecl::Export { name, function: false } => write!(f, "export {};", name),
            GlobalDecl::Extern(ext) => {
                f.write_str("extern ")?;
                if let Some(linkage) = &ext.linkage {
                    write!(f, "\"{}\" ", linkage)?;
                }
                match &ext.kind {
                    ExternKind::Variable(ty) => write!(f, "{} {};", ty, ext.name),
                    ExternKind::Function { ret, params, varargs } => {
                        write!(f, "{} {}(", ret, ext.name)?;
                        for (i, p) in params.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            f.write_str(p)?;
                        }
                        if *varargs {
                            if !params.is_empty() {
                                f.write_str(", ")?;
                            }
                            f.write_str("...")?;
                        }
                        f.write_str(");")
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub decls: Vec<GlobalDecl>,
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.decls {
            writeln!(f, "{}", decl)?;
        }
        Ok(())
    }
}

/// An entry in a block: either a statement or a local declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockItem {
    Decl(VarDecl),
    Stmt(Statement),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Empty,
    Expr(Expr),
    Block(Vec<BlockItem>),
    If {
        cond: Expr,
        then: Box<Statement>,
        els: Option<Box<Statement>>,
    },
    While {
        cond: Expr,
        body: Box<Statement>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Empty => f.write_str(";"),
            Statement::Expr(e) => write!(f, "{};", e),
            Statement::Block(items) => {
                f.write_str("{\n")?;
                for item in items {
                    let text = match item {
                        BlockItem::Decl(d) => format!("{};", d),
                        BlockItem::Stmt(s) => format!("{}", s),
                    };
                    for line in text.lines() {
                        writeln!(f, "    {}", line)?;
                    }
                }
                f.write_str("}")
            }
            Statement::If { cond, then, els } => {
                write!(f, "if ({}) {}", cond, then)?;
                if let Some(els) = els {
                    write!(f, " else {}", els)?;
                }
                Ok(())
            }
            Statement::While { cond, body } => write!(f, "while ({}) {}", cond, body),
            Statement::Break => f.write_str("break;"),
            Statement::Continue => f.write_str("continue;"),
            Statement::Return(None) => f.write_str("return;"),
            Statement::Return(Some(e)) => write!(f, "return {};", e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`: logical not, producing 0 or 1.
    Not,
    /// `-`: negation.
    Neg,
    /// `~`: bitwise complement.
    BitNot,
}

impl UnaryOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
        }
    }
}

/// Relational operators. The `U*` variants are the unsigned comparisons
/// written with a `|` suffix (`<|`, `>|=`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Lt,
    Gt,
    Le,
    Ge,
    Ult,
    Ugt,
    Ule,
    Uge,
    Eq,
    Ne,
}

impl RelOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            RelOp::Lt => "<",
            RelOp::Gt => ">",
            RelOp::Le => "<=",
            RelOp::Ge => ">=",
            RelOp::Ult => "<|",
            RelOp::Ugt => ">|",
            RelOp::Ule => "<|=",
            RelOp::Uge => ">|=",
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
        }
    }
}

/// Shift operators. `>>` is the arithmetic shift; `>>>` is the logical
/// (unsigned) shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Shl,
    Shr,
    Ushr,
}

impl ShiftOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            ShiftOp::Shl => "<<",
            ShiftOp::Shr => ">>",
            ShiftOp::Ushr => ">>>",
        }
    }
}

/// Binary operators, assignment included. `MulU`/`DivU`/`RemU` are the
/// unsigned arithmetic spellings `#`, `\` and `@`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Assign,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Rel(RelOp),
    Shift(ShiftOp),
    Add,
    Sub,
    Mul,
    MulU,
    Div,
    DivU,
    Rem,
    RemU,
}

impl BinOp {
    pub fn lexeme(self) -> &'static str {
        match self {
            BinOp::Assign => "=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Rel(r) => r.lexeme(),
            BinOp::Shift(s) => s.lexeme(),
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::MulU => "#",
            BinOp::Div => "/",
            BinOp::DivU => "\\",
            BinOp::Rem => "%",
            BinOp::RemU => "@",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    ArrayAccess {
        name: String,
        index: Box<Expr>,
    },
    /// `*expr` reads a dword, `#expr` reads a sign-extended byte.
    Deref {
        expr: Box<Expr>,
        byte: bool,
    },
    /// `&lvalue`. The parser guarantees the operand is an lvalue.
    Address(Box<Expr>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// An lvalue denotes a storage location: it may sit left of `=` or
    /// under `&`.
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self,
            Expr::Ident(_) | Expr::ArrayAccess { .. } | Expr::Deref { .. }
        )
    }

    /// Identifiers and array accesses have a direct addressing mode;
    /// dereferences need their address computed into a register first.
    pub fn is_simple_lvalue(&self) -> bool {
        matches!(self, Expr::Ident(_) | Expr::ArrayAccess { .. })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(l) => write!(f, "{}", l),
            Expr::Ident(name) => f.write_str(name),
            Expr::ArrayAccess { name, index } => write!(f, "{}[{}]", name, index),
            Expr::Deref { expr, byte } => {
                write!(f, "{}({})", if *byte { "#" } else { "*" }, expr)
            }
            Expr::Address(lv) => write!(f, "&{}", lv),
            Expr::Unary { op, expr } => write!(f, "{}({})", op.lexeme(), expr),
            Expr::Binary { op: BinOp::Assign, lhs, rhs } => {
                write!(f, "{} = ({})", lhs, rhs)
            }
            Expr::Binary { op, lhs, rhs } => {
                write!(f, "({}) {} ({})", lhs, op.lexeme(), rhs)
            }
            Expr::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prim_sizes() {
        assert_eq!(PrimType::Int.size(), 4);
        assert_eq!(PrimType::Char.size(), 1);
    }

    #[test]
    fn test_array_size_rounds_up_to_dword() {
        let ty = VarType::Array { elem: PrimType::Char, len: Some(5) };
        assert_eq!(ty.size(), Some(8));
        let ty = VarType::Array { elem: PrimType::Char, len: Some(8) };
        assert_eq!(ty.size(), Some(8));
        let ty = VarType::Array { elem: PrimType::Int, len: Some(3) };
        assert_eq!(ty.size(), Some(12));
    }

    #[test]
    fn test_unsized_array_has_no_size() {
        let ty = VarType::Array { elem: PrimType::Int, len: None };
        assert_eq!(ty.size(), None);
    }

    #[test]
    fn test_lvalue_classification() {
        let ident = Expr::Ident("x".to_string());
        assert!(ident.is_lvalue());
        assert!(ident.is_simple_lvalue());

        let deref = Expr::Deref { expr: Box::new(ident.clone()), byte: false };
        assert!(deref.is_lvalue());
        assert!(!deref.is_simple_lvalue());

        let call = Expr::Call { name: "f".to_string(), args: vec![] };
        assert!(!call.is_lvalue());
    }

    #[test]
    fn test_display_expr() {
        let e = Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(Expr::Ident("a".to_string())),
            rhs: Box::new(Expr::Literal(Literal::Int(1))),
        };
        assert_eq!(e.to_string(), "(a) + (1)");
    }

    #[test]
    fn test_display_extern() {
        let ext = GlobalDecl::Extern(ExternDecl {
            linkage: Some("C".to_string()),
            name: "printf".to_string(),
            kind: ExternKind::Function {
                ret: RetType::Value(VarType::Prim(PrimType::Int)),
                params: vec!["fmt".to_string()],
                varargs: true,
            },
        });
        assert_eq!(ext.to_string(), "extern \"C\" int printf(fmt, ...);");
    }
}
