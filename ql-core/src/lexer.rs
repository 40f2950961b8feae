//! Lexer for Quill sources.
//!
//! Tokens never own text: each carries a [`Span`] into the immutable
//! source buffer. The lexer can be driven on demand through
//! [`Lexer::next_token`] (or as an iterator), or eagerly through [`lex`].
//!
//! Two pieces of nesting state are tracked while scanning:
//!
//! * block comments nest, so `/* a /* b */ c */` is a single comment;
//! * template strings (`` `text {expr} text` ``) push an interpolation
//!   frame on `{`, and a `}` only resumes literal scanning when it closes
//!   that frame rather than an ordinary brace opened inside it.

use std::fmt;

use thiserror::Error;

use crate::diagnostic::Diagnostic;
use crate::span::{FileId, Span};

/// Errors reported through [`TokenKind::Error`] tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum LexError {
    #[error("unexpected character")]
    UnexpectedCharacter,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated character literal")]
    UnterminatedChar,
    #[error("unterminated template string")]
    UnterminatedTemplate,
    #[error("unterminated block comment")]
    UnterminatedComment,
}

impl LexError {
    pub fn code(self) -> &'static str {
        match self {
            LexError::UnexpectedCharacter => "E0001",
            LexError::UnterminatedString => "E0002",
            LexError::UnterminatedChar => "E0003",
            LexError::UnterminatedTemplate => "E0004",
            LexError::UnterminatedComment => "E0005",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Special
    Eof,
    Error(LexError),

    // Identifiers and literals
    Identifier,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    CharLiteral,
    CharsLiteral,
    TemplateFull,   // `text`
    TemplateStart,  // `text{
    TemplateMiddle, // }text{
    TemplateEnd,    // }text`
    Directive,      // @name

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,
    ColonColon,
    Question,
    Tilde,
    Dot,
    DotDot,
    DotDotEqual,

    // Operators
    Plus,
    PlusPlus,
    PlusEqual,
    Minus,
    MinusMinus,
    MinusEqual,
    Arrow,
    TripleMinus,
    Star,
    StarEqual,
    Slash,
    SlashEqual,
    Percent,
    PercentEqual,
    Equal,
    EqualEqual,
    Bang,
    BangEqual,
    Less,
    LessEqual,
    LessLess,
    LessLessEqual,
    Greater,
    GreaterEqual,
    Amp,
    AmpAmp,
    AmpEqual,
    Pipe,
    PipePipe,
    PipeEqual,
    Caret,
    CaretEqual,

    // Built-in scalar type keywords
    Void,
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Int,
    Uint,
    Float,
    Iptr,
    Uptr,

    // Keywords
    True,
    False,
    Let,
    Mut,
    Static,
    Struct,
    Typedef,
    Package,
    Import,
    If,
    Else,
    While,
    Foreach,
    In,
    Return,
    Defer,
    Crash,
    Sizeof,
    Cast,
    Switch,
}

/// Keyword table, matched by exact length and bytes.
const KEYWORDS: &[(&str, TokenKind)] = &[
    ("void", TokenKind::Void),
    ("bool", TokenKind::Bool),
    ("char", TokenKind::Char),
    ("i8", TokenKind::I8),
    ("i16", TokenKind::I16),
    ("i32", TokenKind::I32),
    ("i64", TokenKind::I64),
    ("u8", TokenKind::U8),
    ("u16", TokenKind::U16),
    ("u32", TokenKind::U32),
    ("u64", TokenKind::U64),
    ("f32", TokenKind::F32),
    ("f64", TokenKind::F64),
    ("int", TokenKind::Int),
    ("uint", TokenKind::Uint),
    ("float", TokenKind::Float),
    ("iptr", TokenKind::Iptr),
    ("uptr", TokenKind::Uptr),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("let", TokenKind::Let),
    ("mut", TokenKind::Mut),
    ("static", TokenKind::Static),
    ("struct", TokenKind::Struct),
    ("typedef", TokenKind::Typedef),
    ("package", TokenKind::Package),
    ("import", TokenKind::Import),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("foreach", TokenKind::Foreach),
    ("in", TokenKind::In),
    ("return", TokenKind::Return),
    ("defer", TokenKind::Defer),
    ("crash", TokenKind::Crash),
    ("sizeof", TokenKind::Sizeof),
    ("cast", TokenKind::Cast),
    ("switch", TokenKind::Switch),
];

fn keyword(text: &str) -> Option<TokenKind> {
    let bytes = text.as_bytes();
    KEYWORDS
        .iter()
        .find(|(word, _)| word.len() == bytes.len() && word.as_bytes() == bytes)
        .map(|(_, kind)| *kind)
}

impl TokenKind {
    /// Upper-case name used by token dumps and parser messages.
    pub fn name(self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof => "EOF",
            Error(_) => "ERROR",
            Identifier => "IDENTIFIER",
            IntLiteral => "INT",
            FloatLiteral => "FLOAT",
            StringLiteral => "STRING",
            CharLiteral => "CHAR_LITERAL",
            CharsLiteral => "CHARS",
            TemplateFull => "TEMPLATE_FULL",
            TemplateStart => "TEMPLATE_START",
            TemplateMiddle => "TEMPLATE_MIDDLE",
            TemplateEnd => "TEMPLATE_END",
            Directive => "DIRECTIVE",
            LeftParen => "LEFT_PAREN",
            RightParen => "RIGHT_PAREN",
            LeftBrace => "LEFT_BRACE",
            RightBrace => "RIGHT_BRACE",
            LeftBracket => "LEFT_BRACKET",
            RightBracket => "RIGHT_BRACKET",
            Comma => "COMMA",
            Semicolon => "SEMICOLON",
            Colon => "COLON",
            ColonColon => "COLON_COLON",
            Question => "QUESTION",
            Tilde => "TILDE",
            Dot => "DOT",
            DotDot => "DOT_DOT",
            DotDotEqual => "DOT_DOT_EQUAL",
            Plus => "PLUS",
            PlusPlus => "PLUS_PLUS",
            PlusEqual => "PLUS_EQUAL",
            Minus => "MINUS",
            MinusMinus => "MINUS_MINUS",
            MinusEqual => "MINUS_EQUAL",
            Arrow => "ARROW",
            TripleMinus => "TRIPLE_MINUS",
            Star => "STAR",
            StarEqual => "STAR_EQUAL",
            Slash => "SLASH",
            SlashEqual => "SLASH_EQUAL",
            Percent => "PERCENT",
            PercentEqual => "PERCENT_EQUAL",
            Equal => "EQUAL",
            EqualEqual => "EQUAL_EQUAL",
            Bang => "BANG",
            BangEqual => "BANG_EQUAL",
            Less => "LESS",
            LessEqual => "LESS_EQUAL",
            LessLess => "LESS_LESS",
            LessLessEqual => "LESS_LESS_EQUAL",
            Greater => "GREATER",
            GreaterEqual => "GREATER_EQUAL",
            Amp => "AMP",
            AmpAmp => "AMP_AMP",
            AmpEqual => "AMP_EQUAL",
            Pipe => "PIPE",
            PipePipe => "PIPE_PIPE",
            PipeEqual => "PIPE_EQUAL",
            Caret => "CARET",
            CaretEqual => "CARET_EQUAL",
            Void => "VOID",
            Bool => "BOOL",
            Char => "CHAR",
            I8 => "I8",
            I16 => "I16",
            I32 => "I32",
            I64 => "I64",
            U8 => "U8",
            U16 => "U16",
            U32 => "U32",
            U64 => "U64",
            F32 => "F32",
            F64 => "F64",
            Int => "INT_TYPE",
            Uint => "UINT_TYPE",
            Float => "FLOAT_TYPE",
            Iptr => "IPTR",
            Uptr => "UPTR",
            True => "TRUE",
            False => "FALSE",
            Let => "LET",
            Mut => "MUT",
            Static => "STATIC",
            Struct => "STRUCT",
            Typedef => "TYPEDEF",
            Package => "PACKAGE",
            Import => "IMPORT",
            If => "IF",
            Else => "ELSE",
            While => "WHILE",
            Foreach => "FOREACH",
            In => "IN",
            Return => "RETURN",
            Defer => "DEFER",
            Crash => "CRASH",
            Sizeof => "SIZEOF",
            Cast => "CAST",
            Switch => "SWITCH",
        }
    }

    /// True for the keywords naming built-in scalar types (including `void`).
    pub fn is_builtin_type(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Void | Bool
                | Char
                | I8
                | I16
                | I32
                | I64
                | U8
                | U16
                | U32
                | U64
                | F32
                | F64
                | Int
                | Uint
                | Float
                | Iptr
                | Uptr
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single token: its kind and where its text lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn line(&self) -> u32 {
        self.span.line
    }

    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        self.span.text(source)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

/// Result of lexing a whole source file.
#[derive(Debug)]
pub struct LexResult {
    /// Every well-formed token, terminated by a single EOF token.
    pub tokens: Vec<Token>,
    /// One diagnostic per error token encountered.
    pub diagnostics: Vec<Diagnostic>,
}

/// Lex a source string eagerly.
///
/// Error tokens are converted into diagnostics and left out of the token
/// stream, so the parser only ever sees well-formed tokens.
pub fn lex(file: FileId, source: &str) -> LexResult {
    let mut lexer = Lexer::new(file, source);
    let mut tokens = Vec::new();
    let mut diagnostics = Vec::new();
    loop {
        let token = lexer.next_token();
        match token.kind {
            TokenKind::Error(err) => {
                diagnostics.push(Diagnostic::error(err.to_string(), token.span).with_code(err.code()));
            }
            TokenKind::Eof => {
                tokens.push(token);
                break;
            }
            _ => tokens.push(token),
        }
    }
    tracing::debug!(file = file.0, tokens = tokens.len(), errors = diagnostics.len(), "lexed source");
    LexResult {
        tokens,
        diagnostics,
    }
}

pub struct Lexer<'src> {
    file: FileId,
    bytes: &'src [u8],
    index: usize,
    line: u32,
    comment_depth: u32,
    /// One frame per open template interpolation: the number of ordinary
    /// `{` opened inside it and not yet closed.
    templates: Vec<u32>,
    finished: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(file: FileId, source: &'src str) -> Self {
        Lexer {
            file,
            bytes: source.as_bytes(),
            index: 0,
            line: 1,
            comment_depth: 0,
            templates: Vec::new(),
            finished: false,
        }
    }

    /// Current template interpolation nesting.
    pub fn template_depth(&self) -> usize {
        self.templates.len()
    }

    /// Produce the next token. Once the input is exhausted this keeps
    /// returning the same EOF token.
    pub fn next_token(&mut self) -> Token {
        if let Some(error) = self.skip_trivia() {
            return error;
        }

        let start = self.index;
        let line = self.line;
        let Some(ch) = self.peek() else {
            return self.make(TokenKind::Eof, start, line);
        };

        match ch {
            b'(' => self.single(TokenKind::LeftParen, start, line),
            b')' => self.single(TokenKind::RightParen, start, line),
            b'[' => self.single(TokenKind::LeftBracket, start, line),
            b']' => self.single(TokenKind::RightBracket, start, line),
            b',' => self.single(TokenKind::Comma, start, line),
            b';' => self.single(TokenKind::Semicolon, start, line),
            b'?' => self.single(TokenKind::Question, start, line),
            b'~' => self.single(TokenKind::Tilde, start, line),
            b'{' => {
                if let Some(open) = self.templates.last_mut() {
                    *open += 1;
                }
                self.single(TokenKind::LeftBrace, start, line)
            }
            b'}' => match self.templates.last_mut() {
                Some(0) => {
                    self.advance();
                    self.scan_template_body(start, line, TokenKind::TemplateMiddle, TokenKind::TemplateEnd)
                }
                Some(open) => {
                    *open -= 1;
                    self.single(TokenKind::RightBrace, start, line)
                }
                None => self.single(TokenKind::RightBrace, start, line),
            },
            b':' => {
                self.advance();
                if self.eat(b':') {
                    self.make(TokenKind::ColonColon, start, line)
                } else {
                    self.make(TokenKind::Colon, start, line)
                }
            }
            b'.' => {
                self.advance();
                if self.eat(b'.') {
                    if self.eat(b'=') {
                        self.make(TokenKind::DotDotEqual, start, line)
                    } else {
                        self.make(TokenKind::DotDot, start, line)
                    }
                } else {
                    self.make(TokenKind::Dot, start, line)
                }
            }
            b'+' => {
                self.advance();
                if self.eat(b'+') {
                    self.make(TokenKind::PlusPlus, start, line)
                } else if self.eat(b'=') {
                    self.make(TokenKind::PlusEqual, start, line)
                } else {
                    self.make(TokenKind::Plus, start, line)
                }
            }
            b'-' => {
                self.advance();
                if self.eat(b'-') {
                    if self.eat(b'-') {
                        self.make(TokenKind::TripleMinus, start, line)
                    } else {
                        self.make(TokenKind::MinusMinus, start, line)
                    }
                } else if self.eat(b'>') {
                    self.make(TokenKind::Arrow, start, line)
                } else if self.eat(b'=') {
                    self.make(TokenKind::MinusEqual, start, line)
                } else {
                    self.make(TokenKind::Minus, start, line)
                }
            }
            b'*' => self.with_equal(TokenKind::Star, TokenKind::StarEqual, start, line),
            b'/' => self.with_equal(TokenKind::Slash, TokenKind::SlashEqual, start, line),
            b'%' => self.with_equal(TokenKind::Percent, TokenKind::PercentEqual, start, line),
            b'=' => self.with_equal(TokenKind::Equal, TokenKind::EqualEqual, start, line),
            b'!' => self.with_equal(TokenKind::Bang, TokenKind::BangEqual, start, line),
            b'^' => self.with_equal(TokenKind::Caret, TokenKind::CaretEqual, start, line),
            // `>>` is deliberately never produced; the parser joins adjacent
            // `>` tokens so nested generic lists close one level at a time.
            b'>' => self.with_equal(TokenKind::Greater, TokenKind::GreaterEqual, start, line),
            b'<' => {
                self.advance();
                if self.eat(b'<') {
                    if self.eat(b'=') {
                        self.make(TokenKind::LessLessEqual, start, line)
                    } else {
                        self.make(TokenKind::LessLess, start, line)
                    }
                } else if self.eat(b'=') {
                    self.make(TokenKind::LessEqual, start, line)
                } else {
                    self.make(TokenKind::Less, start, line)
                }
            }
            b'&' => {
                self.advance();
                if self.eat(b'&') {
                    self.make(TokenKind::AmpAmp, start, line)
                } else if self.eat(b'=') {
                    self.make(TokenKind::AmpEqual, start, line)
                } else {
                    self.make(TokenKind::Amp, start, line)
                }
            }
            b'|' => {
                self.advance();
                if self.eat(b'|') {
                    self.make(TokenKind::PipePipe, start, line)
                } else if self.eat(b'=') {
                    self.make(TokenKind::PipeEqual, start, line)
                } else {
                    self.make(TokenKind::Pipe, start, line)
                }
            }
            b'"' => self.scan_string(start, line),
            b'\'' => self.scan_chars(start, line),
            b'`' => {
                self.advance();
                self.scan_template_body(start, line, TokenKind::TemplateStart, TokenKind::TemplateFull)
            }
            b'@' => self.scan_directive(start, line),
            b'0'..=b'9' => self.scan_number(start, line),
            _ if is_ident_start(ch) => self.scan_identifier(start, line),
            _ => {
                self.advance_char();
                self.make(TokenKind::Error(LexError::UnexpectedCharacter), start, line)
            }
        }
    }

    fn skip_trivia(&mut self) -> Option<Token> {
        while let Some(ch) = self.peek() {
            match ch {
                b' ' | b'\t' | b'\r' | b'\n' => self.advance(),
                b'/' if self.peek_next() == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                b'/' if self.peek_next() == Some(b'*') => {
                    let start = self.index;
                    let line = self.line;
                    self.advance();
                    self.advance();
                    self.comment_depth = 1;
                    while self.comment_depth > 0 {
                        match (self.peek(), self.peek_next()) {
                            (None, _) => {
                                self.comment_depth = 0;
                                return Some(self.make(
                                    TokenKind::Error(LexError::UnterminatedComment),
                                    start,
                                    line,
                                ));
                            }
                            (Some(b'/'), Some(b'*')) => {
                                self.advance();
                                self.advance();
                                self.comment_depth += 1;
                            }
                            (Some(b'*'), Some(b'/')) => {
                                self.advance();
                                self.advance();
                                self.comment_depth -= 1;
                            }
                            _ => self.advance(),
                        }
                    }
                }
                _ => break,
            }
        }
        None
    }

    fn scan_string(&mut self, start: usize, line: u32) -> Token {
        self.advance(); // opening quote
        while let Some(ch) = self.peek() {
            match ch {
                b'"' => {
                    self.advance();
                    return self.make(TokenKind::StringLiteral, start, line);
                }
                b'\n' => break,
                b'\\' => {
                    self.advance();
                    if self.peek().is_some_and(|c| c != b'\n') {
                        self.advance();
                    }
                }
                _ => self.advance(),
            }
        }
        self.make(TokenKind::Error(LexError::UnterminatedString), start, line)
    }

    /// `'a'` is a char literal; anything else between single quotes
    /// (`'ab'`, `''`) is a "chars" literal.
    fn scan_chars(&mut self, start: usize, line: u32) -> Token {
        self.advance(); // opening quote
        let mut count = 0usize;
        while let Some(ch) = self.peek() {
            match ch {
                b'\'' => {
                    self.advance();
                    let kind = if count == 1 {
                        TokenKind::CharLiteral
                    } else {
                        TokenKind::CharsLiteral
                    };
                    return self.make(kind, start, line);
                }
                b'\n' => break,
                b'\\' => {
                    self.advance();
                    if self.peek().is_some_and(|c| c != b'\n') {
                        self.advance_char();
                    }
                    count += 1;
                }
                _ => {
                    self.advance_char();
                    count += 1;
                }
            }
        }
        self.make(TokenKind::Error(LexError::UnterminatedChar), start, line)
    }

    /// Scan template text after a `` ` `` or a closing interpolation `}`.
    ///
    /// Ending on `{` opens an interpolation frame and yields `open_kind`;
    /// ending on `` ` `` yields `close_kind`.
    fn scan_template_body(
        &mut self,
        start: usize,
        line: u32,
        open_kind: TokenKind,
        close_kind: TokenKind,
    ) -> Token {
        let resumed = matches!(close_kind, TokenKind::TemplateEnd);
        while let Some(ch) = self.peek() {
            match ch {
                b'`' => {
                    self.advance();
                    if resumed {
                        self.templates.pop();
                    }
                    return self.make(close_kind, start, line);
                }
                b'{' => {
                    self.advance();
                    if !resumed {
                        self.templates.push(0);
                    }
                    return self.make(open_kind, start, line);
                }
                b'\\' => {
                    self.advance();
                    if self.peek().is_some() {
                        self.advance();
                    }
                }
                _ => self.advance(),
            }
        }
        if resumed {
            self.templates.pop();
        }
        self.make(TokenKind::Error(LexError::UnterminatedTemplate), start, line)
    }

    fn scan_directive(&mut self, start: usize, line: u32) -> Token {
        self.advance(); // '@'
        let name_start = self.index;
        while self.peek().is_some_and(is_ident_continue) {
            self.advance();
        }
        if self.index == name_start {
            return self.make(TokenKind::Error(LexError::UnexpectedCharacter), start, line);
        }
        self.make(TokenKind::Directive, start, line)
    }

    fn scan_number(&mut self, start: usize, line: u32) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        // Digits running straight into letters (`1a`) are not a number.
        if self.peek().is_some_and(is_ident_start) {
            return self.scan_identifier(start, line);
        }
        if self.peek() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance(); // '.'
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
            return self.make(TokenKind::FloatLiteral, start, line);
        }
        self.make(TokenKind::IntLiteral, start, line)
    }

    fn scan_identifier(&mut self, start: usize, line: u32) -> Token {
        while self.peek().is_some_and(is_ident_continue) {
            self.advance();
        }
        let text = std::str::from_utf8(&self.bytes[start..self.index]).unwrap_or("");
        let kind = keyword(text).unwrap_or(TokenKind::Identifier);
        self.make(kind, start, line)
    }

    fn with_equal(&mut self, plain: TokenKind, with_eq: TokenKind, start: usize, line: u32) -> Token {
        self.advance();
        if self.eat(b'=') {
            self.make(with_eq, start, line)
        } else {
            self.make(plain, start, line)
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize, line: u32) -> Token {
        self.advance();
        self.make(kind, start, line)
    }

    fn make(&self, kind: TokenKind, start: usize, line: u32) -> Token {
        Token {
            kind,
            span: Span::new(self.file, start as u32, self.index as u32, line),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.bytes.get(self.index + 1).copied()
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek() {
            if ch == b'\n' {
                self.line += 1;
            }
            self.index += 1;
        }
    }

    /// Advance over one whole UTF-8 scalar so spans stay on char boundaries.
    fn advance_char(&mut self) {
        self.advance();
        while self.peek().is_some_and(|c| (c & 0b1100_0000) == 0b1000_0000) {
            self.index += 1;
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields every token including one trailing EOF, then stops.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.is_eof() {
            self.finished = true;
        }
        Some(token)
    }
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_ident_continue(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(FileId(0), source).map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_empty_main_with_comment() {
        let source = "void main() {\n\t// no-op\n}";
        let tokens = lex(FileId(0), source).tokens;
        let summary: Vec<_> = tokens
            .iter()
            .filter(|t| !t.is_eof())
            .map(|t| (t.kind, t.line()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (TokenKind::Void, 1),
                (TokenKind::Identifier, 1),
                (TokenKind::LeftParen, 1),
                (TokenKind::RightParen, 1),
                (TokenKind::LeftBrace, 1),
                (TokenKind::RightBrace, 3),
            ]
        );
        assert_eq!(tokens[1].text(source), "main");
    }

    #[test]
    fn nested_block_comment_is_one_unit() {
        assert_eq!(kinds("/* a /* b */ c */ x"), vec![TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn unclosed_nested_comment_is_an_error() {
        let kinds = kinds("/* a /* b */ c");
        assert_eq!(kinds[0], TokenKind::Error(LexError::UnterminatedComment));
    }

    #[test]
    fn greedy_minus_family() {
        assert_eq!(
            kinds("- -> -- --- -="),
            vec![
                TokenKind::Minus,
                TokenKind::Arrow,
                TokenKind::MinusMinus,
                TokenKind::TripleMinus,
                TokenKind::MinusEqual,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn numbers_promote_to_float_only_before_digit() {
        assert_eq!(kinds("1.5"), vec![TokenKind::FloatLiteral, TokenKind::Eof]);
        assert_eq!(
            kinds("1..3"),
            vec![TokenKind::IntLiteral, TokenKind::DotDot, TokenKind::IntLiteral, TokenKind::Eof]
        );
        assert_eq!(
            kinds("x.0"),
            vec![TokenKind::Identifier, TokenKind::Dot, TokenKind::IntLiteral, TokenKind::Eof]
        );
    }

    #[test]
    fn digits_followed_by_letters_are_an_identifier() {
        let source = "1a";
        let tokens = lex(FileId(0), source).tokens;
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text(source), "1a");
        assert_eq!(kinds("0x1F 1_000"), vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn keywords_require_exact_match() {
        assert_eq!(
            kinds("int integer u8 u88"),
            vec![
                TokenKind::Int,
                TokenKind::Identifier,
                TokenKind::U8,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn template_without_interpolation_is_full() {
        assert_eq!(kinds("`hello`"), vec![TokenKind::TemplateFull, TokenKind::Eof]);
    }

    #[test]
    fn template_with_interpolations() {
        assert_eq!(
            kinds("`a {x} b {y} c`"),
            vec![
                TokenKind::TemplateStart,
                TokenKind::Identifier,
                TokenKind::TemplateMiddle,
                TokenKind::Identifier,
                TokenKind::TemplateEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn braces_inside_interpolation_do_not_close_it() {
        assert_eq!(
            kinds("`v {.{ .x = 1 }} end`"),
            vec![
                TokenKind::TemplateStart,
                TokenKind::Dot,
                TokenKind::LeftBrace,
                TokenKind::Dot,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::IntLiteral,
                TokenKind::RightBrace,
                TokenKind::TemplateEnd,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn nested_templates_track_depth() {
        let mut lexer = Lexer::new(FileId(0), "`a {`b {c}`} d`");
        assert_eq!(lexer.next_token().kind, TokenKind::TemplateStart);
        assert_eq!(lexer.template_depth(), 1);
        assert_eq!(lexer.next_token().kind, TokenKind::TemplateStart);
        assert_eq!(lexer.template_depth(), 2);
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier);
        assert_eq!(lexer.next_token().kind, TokenKind::TemplateEnd);
        assert_eq!(lexer.template_depth(), 1);
        assert_eq!(lexer.next_token().kind, TokenKind::TemplateEnd);
        assert_eq!(lexer.template_depth(), 0);
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn plain_closing_brace_outside_templates() {
        assert_eq!(kinds("{}"), vec![TokenKind::LeftBrace, TokenKind::RightBrace, TokenKind::Eof]);
    }

    #[test]
    fn char_and_chars_literals() {
        assert_eq!(
            kinds(r"'a' '\n' 'ab' ''"),
            vec![
                TokenKind::CharLiteral,
                TokenKind::CharLiteral,
                TokenKind::CharsLiteral,
                TokenKind::CharsLiteral,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_literals_produce_error_tokens_and_continue() {
        let kinds = kinds("\"abc\nx");
        assert_eq!(kinds[0], TokenKind::Error(LexError::UnterminatedString));
        assert_eq!(kinds[1], TokenKind::Identifier);
    }

    #[test]
    fn eager_lex_reports_diagnostics_and_skips_error_tokens() {
        let result = lex(FileId(0), "a $ b");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some("E0001"));
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]);
    }

    #[test]
    fn directives_carry_their_name() {
        let source = "@c_header(\"stdio.h\")";
        let tokens = lex(FileId(0), source).tokens;
        assert_eq!(tokens[0].kind, TokenKind::Directive);
        assert_eq!(tokens[0].text(source), "@c_header");
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn eof_repeats() {
        let mut lexer = Lexer::new(FileId(0), "x");
        lexer.next_token();
        assert!(lexer.next_token().is_eof());
        assert!(lexer.next_token().is_eof());
    }

    #[test]
    fn greater_is_never_doubled() {
        assert_eq!(
            kinds(">> >="),
            vec![TokenKind::Greater, TokenKind::Greater, TokenKind::GreaterEqual, TokenKind::Eof]
        );
    }
}
