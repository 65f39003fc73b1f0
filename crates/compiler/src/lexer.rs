//! Lexer for Cedar source text.
//!
//! Produces the whole token stream in one pass, with 1-based line and
//! column tracking. Lexical errors are never fatal: the offending
//! character is reported and skipped, and lexing continues, so the stream
//! is always finite and the parser decides what to do with what remains.

use crate::ast::{PrimType, RelOp, ShiftOp};
use crate::syscalls;
use std::fmt;

/// A single token. `line`/`col` point at its first character.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub col: u32,
}

impl Token {
    fn new(kind: TokenKind, line: u32, col: u32) -> Self {
        Token { kind, line, col }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    IntLit(i32),
    CharLit(char),
    /// Contents between the quotes, escape sequences kept verbatim.
    StrLit(String),
    Ident(String),
    /// A `$name` from the syscall table, `$` included.
    Syscall(String),
    Type(PrimType),
    Void,
    If,
    Else,
    While,
    Break,
    Continue,
    Return,
    Export,
    Extern,
    Relop(RelOp),
    Shift(ShiftOp),
    Assign,
    AndAnd,
    OrOr,
    Ellipsis,
    /// One of `( ) { } [ ] ; , + - * / \ % @ # & | ^ ~ !`.
    Punct(char),
}

impl TokenKind {
    /// Short tag used in diagnostics, mirroring the token-class names of
    /// the grammar.
    pub fn kind_name(&self) -> &'static str {
        match self {
            TokenKind::IntLit(_) => "INT_LIT",
            TokenKind::CharLit(_) => "CHAR_LIT",
            TokenKind::StrLit(_) => "STRING_LIT",
            TokenKind::Ident(_) => "IDENT",
            TokenKind::Syscall(_) => "SYSCALL",
            TokenKind::Type(_) => "PRIM_TYPE",
            TokenKind::Void => "VOID",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::Break => "BREAK",
            TokenKind::Continue => "CONTINUE",
            TokenKind::Return => "RETURN",
            TokenKind::Export => "EXPORT",
            TokenKind::Extern => "EXTERN",
            TokenKind::Relop(_) => "RELOP",
            TokenKind::Shift(_) => "SHIFT",
            TokenKind::Assign => "EQ",
            TokenKind::AndAnd => "AND",
            TokenKind::OrOr => "OR",
            TokenKind::Ellipsis => "ELLIPSIS",
            TokenKind::Punct(_) => "LITERAL",
        }
    }

    /// The token's source spelling, for diagnostics and the token dump.
    pub fn text(&self) -> String {
        match self {
            TokenKind::IntLit(v) => v.to_string(),
            TokenKind::CharLit(c) => format!("'{}'", c),
            TokenKind::StrLit(s) => format!("\"{}\"", s),
            TokenKind::Ident(s) => s.clone(),
            TokenKind::Syscall(s) => s.clone(),
            TokenKind::Type(p) => p.name().to_string(),
            TokenKind::Void => "void".to_string(),
            TokenKind::If => "if".to_string(),
            TokenKind::Else => "else".to_string(),
            TokenKind::While => "while".to_string(),
            TokenKind::Break => "break".to_string(),
            TokenKind::Continue => "continue".to_string(),
            TokenKind::Return => "return".to_string(),
            TokenKind::Export => "export".to_string(),
            TokenKind::Extern => "extern".to_string(),
            TokenKind::Relop(r) => r.lexeme().to_string(),
            TokenKind::Shift(s) => s.lexeme().to_string(),
            TokenKind::Assign => "=".to_string(),
            TokenKind::AndAnd => "&&".to_string(),
            TokenKind::OrOr => "||".to_string(),
            TokenKind::Ellipsis => "...".to_string(),
            TokenKind::Punct(c) => c.to_string(),
        }
    }
}

/// A recoverable lexical error.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub message: String,
    pub line: u32,
}

impl LexError {
    fn illegal(ch: char, line: u32) -> Self {
        LexError {
            message: format!("Illegal character '{}'", ch),
            line,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on line {}", self.message, self.line)
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
    /// Whether the previous token can end an expression; decides whether
    /// `-5` is a negative literal or a minus followed by `5`.
    after_operand: bool,
}

/// Tokenize a whole source file. Always returns the full (finite) token
/// stream; lexical errors are collected alongside, one per skipped
/// character.
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer {
        chars: source.chars().collect(),
        pos: 0,
        line: 1,
        col: 1,
        tokens: Vec::new(),
        errors: Vec::new(),
        after_operand: false,
    };
    lexer.run();
    (lexer.tokens, lexer.errors)
}

impl Lexer {
    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn current(&self) -> Option<char> {
        self.peek(0)
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    fn push(&mut self, kind: TokenKind, line: u32, col: u32) {
        self.after_operand = matches!(
            kind,
            TokenKind::IntLit(_)
                | TokenKind::CharLit(_)
                | TokenKind::StrLit(_)
                | TokenKind::Ident(_)
                | TokenKind::Syscall(_)
                | TokenKind::Punct(')')
                | TokenKind::Punct(']')
        );
        self.tokens.push(Token::new(kind, line, col));
    }

    fn error(&mut self, message: String) {
        self.errors.push(LexError {
            message,
            line: self.line,
        });
    }

    fn run(&mut self) {
        while let Some(c) = self.current() {
            let (line, col) = (self.line, self.col);
            match c {
                ' ' | '\t' | '\r' | '\n' => self.advance(),
                '/' if self.peek(1) == Some('/') => {
                    while let Some(c) = self.current() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                '/' if self.peek(1) == Some('*') => self.block_comment(),
                '0'..='9' => self.number(false),
                '-' if !self.after_operand
                    && self.peek(1).is_some_and(|c| c.is_ascii_digit()) =>
                {
                    self.advance();
                    self.number(true);
                }
                '\'' => self.char_literal(),
                '"' => self.string_literal(),
                'a'..='z' | 'A'..='Z' | '_' => self.identifier(),
                '$' => self.syscall(),
                '<' => {
                    self.advance();
                    if self.current() == Some('<') {
                        self.advance();
                        self.push(TokenKind::Shift(ShiftOp::Shl), line, col);
                    } else {
                        let op = self.relop_suffix(RelOp::Lt, RelOp::Le, RelOp::Ult, RelOp::Ule);
                        self.push(TokenKind::Relop(op), line, col);
                    }
                }
                '>' => {
                    self.advance();
                    if self.current() == Some('>') {
                        self.advance();
                        if self.current() == Some('>') {
                            self.advance();
                            self.push(TokenKind::Shift(ShiftOp::Ushr), line, col);
                        } else {
                            self.push(TokenKind::Shift(ShiftOp::Shr), line, col);
                        }
                    } else {
                        let op = self.relop_suffix(RelOp::Gt, RelOp::Ge, RelOp::Ugt, RelOp::Uge);
                        self.push(TokenKind::Relop(op), line, col);
                    }
                }
                '=' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        self.push(TokenKind::Relop(RelOp::Eq), line, col);
                    } else {
                        self.push(TokenKind::Assign, line, col);
                    }
                }
                '!' => {
                    self.advance();
                    if self.current() == Some('=') {
                        self.advance();
                        self.push(TokenKind::Relop(RelOp::Ne), line, col);
                    } else {
                        self.push(TokenKind::Punct('!'), line, col);
                    }
                }
                '&' => {
                    self.advance();
                    if self.current() == Some('&') {
                        self.advance();
                        self.push(TokenKind::AndAnd, line, col);
                    } else {
                        self.push(TokenKind::Punct('&'), line, col);
                    }
                }
                '|' => {
                    self.advance();
                    if self.current() == Some('|') {
                        self.advance();
                        self.push(TokenKind::OrOr, line, col);
                    } else {
                        self.push(TokenKind::Punct('|'), line, col);
                    }
                }
                '.' => {
                    if self.peek(1) == Some('.') && self.peek(2) == Some('.') {
                        self.advance();
                        self.advance();
                        self.advance();
                        self.push(TokenKind::Ellipsis, line, col);
                    } else {
                        self.error(format!("Illegal character '{}'", c));
                        self.advance();
                    }
                }
                '(' | ')' | '{' | '}' | '[' | ']' | ';' | ',' | '+' | '-' | '*' | '/' | '\\'
                | '%' | '@' | '#' | '^' | '~' => {
                    self.advance();
                    self.push(TokenKind::Punct(c), line, col);
                }
                _ => {
                    self.errors.push(LexError::illegal(c, line));
                    self.advance();
                }
            }
        }
    }

    fn block_comment(&mut self) {
        self.advance();
        self.advance();
        loop {
            match self.current() {
                Some('*') if self.peek(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    return;
                }
                Some(_) => self.advance(),
                None => {
                    self.error("Unterminated block comment".to_string());
                    return;
                }
            }
        }
    }

    fn number(&mut self, negative: bool) {
        let (line, col) = (self.line, self.col);
        let mut text = String::new();
        if negative {
            text.push('-');
        }
        while let Some(c) = self.current() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.advance();
        }
        match text.parse::<i32>() {
            Ok(v) => self.push(TokenKind::IntLit(v), line, col),
            Err(_) => self.error(format!("Integer literal {} out of range", text)),
        }
    }

    fn char_literal(&mut self) {
        let (line, col) = (self.line, self.col);
        self.advance();
        let c = match self.current() {
            Some(c) if c != '\n' && c != '\'' => c,
            _ => {
                self.error("Illegal character '''".to_string());
                return;
            }
        };
        self.advance();
        if self.current() == Some('\'') {
            self.advance();
            self.push(TokenKind::CharLit(c), line, col);
        } else {
            // Not a character literal after all: report the opening
            // quote, back up, and re-lex from the character after it.
            self.errors.push(LexError::illegal('\'', line));
            self.pos -= 1;
            self.col -= 1;
        }
    }

    fn string_literal(&mut self) {
        let (line, col) = (self.line, self.col);
        self.advance();
        let mut value = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    self.push(TokenKind::StrLit(value), line, col);
                    return;
                }
                Some('\\') => {
                    // Escapes are kept verbatim for the assembler.
                    value.push('\\');
                    self.advance();
                    if let Some(c) = self.current() {
                        value.push(c);
                        self.advance();
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                None => {
                    self.error("Unterminated string literal".to_string());
                    return;
                }
            }
        }
    }

    fn identifier(&mut self) {
        let (line, col) = (self.line, self.col);
        let mut name = String::new();
        while let Some(c) = self.current() {
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            self.advance();
        }
        let kind = match name.as_str() {
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "return" => TokenKind::Return,
            "export" => TokenKind::Export,
            "extern" => TokenKind::Extern,
            "int" => TokenKind::Type(PrimType::Int),
            "char" => TokenKind::Type(PrimType::Char),
            "void" => TokenKind::Void,
            _ => TokenKind::Ident(name),
        };
        self.push(kind, line, col);
    }

    fn syscall(&mut self) {
        let (line, col) = (self.line, self.col);
        let rest: String = self.chars[self.pos..].iter().collect();
        match syscalls::longest_match(&rest) {
            Some(name) => {
                for _ in 0..name.chars().count() {
                    self.advance();
                }
                self.push(TokenKind::Syscall(name.to_string()), line, col);
            }
            None => {
                self.errors.push(LexError::illegal('$', line));
                self.advance();
            }
        }
    }

    /// The `|`/`=` suffixes shared by `<` and `>`.
    fn relop_suffix(&mut self, base: RelOp, eq: RelOp, uns: RelOp, uns_eq: RelOp) -> RelOp {
        let unsigned = self.current() == Some('|');
        if unsigned {
            self.advance();
        }
        let equal = self.current() == Some('=');
        if equal {
            self.advance();
        }
        match (unsigned, equal) {
            (false, false) => base,
            (false, true) => eq,
            (true, false) => uns,
            (true, true) => uns_eq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_keywords_and_types() {
        assert_eq!(
            kinds("if else while break continue return export extern int char void"),
            vec![
                TokenKind::If,
                TokenKind::Else,
                TokenKind::While,
                TokenKind::Break,
                TokenKind::Continue,
                TokenKind::Return,
                TokenKind::Export,
                TokenKind::Extern,
                TokenKind::Type(PrimType::Int),
                TokenKind::Type(PrimType::Char),
                TokenKind::Void,
            ]
        );
    }

    #[test]
    fn test_relops_and_shifts() {
        assert_eq!(
            kinds("< <= <| <|= > >= >| >|= == != << >> >>>"),
            vec![
                TokenKind::Relop(RelOp::Lt),
                TokenKind::Relop(RelOp::Le),
                TokenKind::Relop(RelOp::Ult),
                TokenKind::Relop(RelOp::Ule),
                TokenKind::Relop(RelOp::Gt),
                TokenKind::Relop(RelOp::Ge),
                TokenKind::Relop(RelOp::Ugt),
                TokenKind::Relop(RelOp::Uge),
                TokenKind::Relop(RelOp::Eq),
                TokenKind::Relop(RelOp::Ne),
                TokenKind::Shift(ShiftOp::Shl),
                TokenKind::Shift(ShiftOp::Shr),
                TokenKind::Shift(ShiftOp::Ushr),
            ]
        );
    }

    #[test]
    fn test_negative_literal_only_after_non_operand() {
        // In initializer position the sign belongs to the literal...
        assert_eq!(
            kinds("= -5"),
            vec![TokenKind::Assign, TokenKind::IntLit(-5)]
        );
        // ...but after an operand it is binary minus.
        assert_eq!(
            kinds("a - 1"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Punct('-'),
                TokenKind::IntLit(1),
            ]
        );
        assert_eq!(
            kinds("a[0]-1"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Punct('['),
                TokenKind::IntLit(0),
                TokenKind::Punct(']'),
                TokenKind::Punct('-'),
                TokenKind::IntLit(1),
            ]
        );
    }

    #[test]
    fn test_char_and_string_literals() {
        assert_eq!(
            kinds("'x' \"hi\\n\""),
            vec![
                TokenKind::CharLit('x'),
                TokenKind::StrLit("hi\\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_and_line_tracking() {
        let (tokens, errors) = tokenize("// line comment\nx /* block\ncomment */ y");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Ident("x".to_string()));
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].kind, TokenKind::Ident("y".to_string()));
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_syscall_longest_match() {
        assert_eq!(
            kinds("$write(1)"),
            vec![
                TokenKind::Syscall("$write".to_string()),
                TokenKind::Punct('('),
                TokenKind::IntLit(1),
                TokenKind::Punct(')'),
            ]
        );
    }

    #[test]
    fn test_unknown_syscall_reported_and_skipped() {
        let (tokens, errors) = tokenize("$frob");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("$"));
        // The '$' is skipped one character; the rest lexes as an identifier.
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Ident("frob".to_string()));
    }

    #[test]
    fn test_lexer_totality_on_garbage() {
        let (tokens, errors) = tokenize("int ` x ?? = 1;");
        // Every bad character yields exactly one error and is skipped.
        assert_eq!(errors.len(), 3);
        let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Type(PrimType::Int),
                TokenKind::Ident("x".to_string()),
                TokenKind::Assign,
                TokenKind::IntLit(1),
                TokenKind::Punct(';'),
            ]
        );
    }

    #[test]
    fn test_ellipsis() {
        assert_eq!(
            kinds(", ...)"),
            vec![
                TokenKind::Punct(','),
                TokenKind::Ellipsis,
                TokenKind::Punct(')'),
            ]
        );
    }
}
