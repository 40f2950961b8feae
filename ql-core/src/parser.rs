//! Recursive-descent parser for Quill.
//!
//! The parser walks an immutable token slice through a copyable [`Cursor`].
//! Alternatives that cannot be told apart by one token of lookahead (a
//! statement starting with a type versus an expression, `sizeof(T)` versus
//! `sizeof(expr)`) are tried in order with [`Parser::attempt`], which
//! restores the cursor and drops any diagnostics on failure; the first
//! alternative that succeeds wins.
//!
//! Errors use panic mode: the first missing token records one diagnostic
//! and further ones are suppressed until the parser resynchronizes at the
//! next statement or declaration.

use crate::ast::{
    ArrayElement, AssignOp, BinaryOp, Directive, DirectiveKind, Field, FieldInit, FunctionSig,
    IdGen, Import, ImportKind, Literal, Node, NodeKind, Param, PostfixOp, StructDecl,
    TemplatePart, Type, TypeKind, UnaryOp, VarDecl,
};
use crate::builtins::scalar_for_token;
use crate::diagnostic::Diagnostic;
use crate::lexer::{self, Token, TokenKind};
use crate::source::SourceMap;
use crate::span::{FileId, Span};

/// Result of parsing one or more sources.
#[derive(Debug)]
pub struct ParseResult<'src> {
    /// A `Root` node whose children are `File` nodes.
    pub root: Node<'src>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult<'_> {
    pub fn has_errors(&self) -> bool {
        crate::diagnostic::has_errors(&self.diagnostics)
    }
}

/// Lex and parse every file of a source map into one root.
///
/// Node and type identities come from `ids`, so they stay unique across all
/// files of the compilation.
pub fn parse_sources<'src>(sources: &'src SourceMap, ids: &mut IdGen) -> ParseResult<'src> {
    let mut files = Vec::new();
    let mut diagnostics = Vec::new();
    for source in sources.files() {
        let lexed = lexer::lex(source.id, &source.text);
        diagnostics.extend(lexed.diagnostics);
        let (parsed, parse_diagnostics) = parse_tokens(source.id, &source.text, &lexed.tokens, ids);
        files.extend(parsed);
        diagnostics.extend(parse_diagnostics);
    }
    let root = Node {
        id: ids.node(),
        span: Span::default(),
        directives: Vec::new(),
        kind: NodeKind::Root { files },
    };
    tracing::debug!(nodes = ids.node_count(), errors = diagnostics.len(), "parsed sources");
    ParseResult { root, diagnostics }
}

/// Parse a single source string into a root, mostly for tests and tools.
pub fn parse_source<'src>(file: FileId, source: &'src str, ids: &mut IdGen) -> ParseResult<'src> {
    let lexed = lexer::lex(file, source);
    let mut diagnostics = lexed.diagnostics;
    let (files, parse_diagnostics) = parse_tokens(file, source, &lexed.tokens, ids);
    diagnostics.extend(parse_diagnostics);
    let root = Node {
        id: ids.node(),
        span: Span::default(),
        directives: Vec::new(),
        kind: NodeKind::Root { files },
    };
    ParseResult { root, diagnostics }
}

/// Parse a token stream into `File` nodes, one per `---`-separated section.
pub fn parse_tokens<'src>(
    file: FileId,
    source: &'src str,
    tokens: &[Token],
    ids: &mut IdGen,
) -> (Vec<Node<'src>>, Vec<Diagnostic>) {
    let mut parser = Parser::new(file, source, tokens, ids);
    let files = parser.parse_files();
    (files, parser.diagnostics)
}

/// Position in the token stream. Copying it is how checkpoints are taken.
#[derive(Debug, Clone, Copy)]
struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Token {
        let index = (self.pos + offset).min(self.tokens.len().saturating_sub(1));
        self.tokens[index]
    }

    fn previous(&self) -> Token {
        self.tokens[self.pos.saturating_sub(1).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek();
        if !token.is_eof() {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    pos: usize,
    diagnostics: usize,
    panic: bool,
}

struct Parser<'src, 'a> {
    file: FileId,
    source: &'src str,
    cursor: Cursor<'a>,
    ids: &'a mut IdGen,
    diagnostics: Vec<Diagnostic>,
    panic: bool,
}

impl<'src, 'a> Parser<'src, 'a> {
    fn new(file: FileId, source: &'src str, tokens: &'a [Token], ids: &'a mut IdGen) -> Self {
        debug_assert!(tokens.last().is_some_and(Token::is_eof));
        Parser {
            file,
            source,
            cursor: Cursor { tokens, pos: 0 },
            ids,
            diagnostics: Vec::new(),
            panic: false,
        }
    }

    // -----------------------------------------------------------------
    // Cursor helpers
    // -----------------------------------------------------------------

    fn peek(&self) -> Token {
        self.cursor.peek()
    }

    fn peek_kind(&self) -> TokenKind {
        self.cursor.peek().kind
    }

    fn peek_kind_at(&self, offset: usize) -> TokenKind {
        self.cursor.peek_at(offset).kind
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn advance(&mut self) -> Token {
        self.cursor.advance()
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn text(&self, token: Token) -> &'src str {
        token.text(self.source)
    }

    /// Text of a quoted literal token without its first and last byte.
    fn inner_text(&self, token: Token) -> &'src str {
        let text = self.text(token);
        if text.len() >= 2 { &text[1..text.len() - 1] } else { "" }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error_here(&format!("expected {what}"));
            None
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Option<&'src str> {
        let token = self.expect(TokenKind::Identifier, what)?;
        Some(self.text(token))
    }

    fn error_here(&mut self, message: &str) {
        let token = self.peek();
        let found = if token.is_eof() {
            "end of input".to_string()
        } else {
            format!("'{}'", self.text(token))
        };
        self.error_at(token.span, format!("{message}, found {found}"), "E0100");
    }

    fn error_at(&mut self, span: Span, message: String, code: &'static str) {
        if self.panic {
            return;
        }
        self.panic = true;
        self.diagnostics.push(Diagnostic::error(message, span).with_code(code));
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.cursor.pos,
            diagnostics: self.diagnostics.len(),
            panic: self.panic,
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.cursor.pos = checkpoint.pos;
        self.diagnostics.truncate(checkpoint.diagnostics);
        self.panic = checkpoint.panic;
    }

    /// Run `production`; on failure rewind as if it had never run.
    fn attempt<T>(&mut self, production: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        let checkpoint = self.checkpoint();
        let result = production(self);
        if result.is_none() {
            self.restore(checkpoint);
        }
        result
    }

    fn span_from(&self, start: Span) -> Span {
        let end = self.cursor.previous().span;
        if end.end < start.start {
            start
        } else {
            start.to(end)
        }
    }

    fn node(&mut self, kind: NodeKind<'src>, span: Span) -> Node<'src> {
        Node {
            id: self.ids.node(),
            span,
            directives: Vec::new(),
            kind,
        }
    }

    fn make_type(&mut self, kind: TypeKind<'src>, span: Span) -> Type<'src> {
        Type {
            id: self.ids.ty(),
            span,
            directives: Vec::new(),
            kind,
        }
    }

    // -----------------------------------------------------------------
    // Files and top-level declarations
    // -----------------------------------------------------------------

    fn parse_files(&mut self) -> Vec<Node<'src>> {
        let mut files = Vec::new();
        let mut decls: Vec<Node<'src>> = Vec::new();
        while !self.cursor.at_eof() {
            self.panic = false;
            let start = self.cursor.pos;
            match self.parse_top_level() {
                Some(decl) => {
                    if matches!(decl.kind, NodeKind::FileSeparator) && !decls.is_empty() {
                        let finished = std::mem::take(&mut decls);
                        files.push(self.file_node(finished));
                    }
                    decls.push(decl);
                }
                None => self.synchronize_top_level(start),
            }
        }
        if !decls.is_empty() || files.is_empty() {
            files.push(self.file_node(decls));
        }
        files
    }

    fn file_node(&mut self, decls: Vec<Node<'src>>) -> Node<'src> {
        let span = match (decls.first(), decls.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => Span::new(self.file, 0, 0, 1),
        };
        let file = self.file;
        self.node(NodeKind::File { file, decls }, span)
    }

    fn synchronize_top_level(&mut self, start: usize) {
        if self.cursor.pos == start {
            self.advance();
        }
        let mut depth = 0i32;
        while !self.cursor.at_eof() {
            match self.peek_kind() {
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => {
                    depth -= 1;
                    if depth <= 0 {
                        self.advance();
                        return;
                    }
                }
                TokenKind::Struct
                | TokenKind::Typedef
                | TokenKind::Import
                | TokenKind::Package
                | TokenKind::TripleMinus
                | TokenKind::Directive
                | TokenKind::Static
                    if depth == 0 =>
                {
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    fn parse_top_level(&mut self) -> Option<Node<'src>> {
        let directives = self.parse_directives()?;
        let start = self.peek().span;
        let mut node = match self.peek_kind() {
            TokenKind::TripleMinus => {
                self.advance();
                self.node(NodeKind::FileSeparator, start)
            }
            TokenKind::Package => self.parse_package()?,
            TokenKind::Import => self.parse_import()?,
            TokenKind::Typedef => self.parse_typedef()?,
            TokenKind::Struct => self.parse_struct()?,
            TokenKind::Static | TokenKind::Let => self.parse_var_decl()?,
            _ => self.parse_function_or_global()?,
        };
        node.directives = directives;
        Some(node)
    }

    fn parse_directives(&mut self) -> Option<Vec<Directive<'src>>> {
        let mut directives = Vec::new();
        while self.check(TokenKind::Directive) {
            let token = self.advance();
            let text = self.text(token);
            let Some((kind, takes_arg)) = DirectiveKind::lookup(text) else {
                self.error_at(token.span, format!("unknown directive '{text}'"), "E0101");
                return None;
            };
            let mut arg = None;
            if takes_arg {
                self.expect(TokenKind::LeftParen, &format!("'(' after {text}"))?;
                let literal = self.expect(TokenKind::StringLiteral, "a string literal argument")?;
                arg = Some(self.inner_text(literal));
                self.expect(TokenKind::RightParen, "')'")?;
            }
            directives.push(Directive {
                kind,
                arg,
                span: self.span_from(token.span),
            });
        }
        Some(directives)
    }

    /// `a/b/c`
    fn parse_package_path(&mut self) -> Option<Vec<&'src str>> {
        let mut segments = vec![self.expect_identifier("a package path segment")?];
        while self.eat(TokenKind::Slash) {
            segments.push(self.expect_identifier("a package path segment")?);
        }
        Some(segments)
    }

    fn parse_package(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let path = self.parse_package_path()?;
        self.expect(TokenKind::Semicolon, "';' after package declaration")?;
        let span = self.span_from(start);
        Some(self.node(NodeKind::PackageDecl { path }, span))
    }

    fn parse_import(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let kind = match (self.peek_kind(), self.peek_kind_at(1)) {
            (TokenKind::Dot, TokenKind::Slash) => {
                self.advance();
                self.advance();
                ImportKind::Local
            }
            (TokenKind::Tilde, TokenKind::Slash) => {
                self.advance();
                self.advance();
                ImportKind::Root
            }
            _ => ImportKind::Plain,
        };
        let segments = self.parse_package_path()?;
        let mut symbols = Vec::new();
        let mut wildcard = false;
        while self.eat(TokenKind::ColonColon) {
            if self.eat(TokenKind::Star) {
                wildcard = true;
                break;
            }
            symbols.push(self.expect_identifier("a symbol name or '*'")?);
        }
        self.expect(TokenKind::Semicolon, "';' after import")?;
        let span = self.span_from(start);
        let import = Import {
            kind,
            segments,
            symbols,
            wildcard,
        };
        Some(self.node(NodeKind::Import(import), span))
    }

    fn parse_typedef(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let name = self.expect_identifier("a typedef name")?;
        let ty = if self.eat(TokenKind::Equal) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';' after typedef")?;
        let span = self.span_from(start);
        Some(self.node(NodeKind::Typedef { name, ty }, span))
    }

    fn parse_struct(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let name = self.expect_identifier("a struct name")?;
        let mut generics = Vec::new();
        if self.eat(TokenKind::Less) {
            loop {
                generics.push(self.expect_identifier("a generic parameter name")?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Greater, "'>' to close the generic parameter list")?;
        }
        self.expect(TokenKind::LeftBrace, "'{' to open the struct body")?;
        let mut fields = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.cursor.at_eof() {
            let field_start = self.peek().span;
            let ty = self.parse_type()?;
            let field_name = self.expect_identifier("a field name")?;
            fields.push(Field {
                name: field_name,
                ty,
                span: self.span_from(field_start),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace, "'}' to close the struct body")?;
        self.eat(TokenKind::Semicolon);
        let span = self.span_from(start);
        let decl = StructDecl {
            name,
            generics,
            fields,
        };
        Some(self.node(NodeKind::StructDecl(decl), span))
    }

    /// A declaration starting with a type: a function (header or full) or a
    /// global variable.
    fn parse_function_or_global(&mut self) -> Option<Node<'src>> {
        let start = self.peek().span;
        let ty = self.parse_type()?;
        if self.check(TokenKind::Mut) {
            return self.finish_var_decl(start, false, Some(ty));
        }
        if !(self.check(TokenKind::Identifier) && self.peek_kind_at(1) == TokenKind::LeftParen) {
            return self.finish_var_decl(start, false, Some(ty));
        }
        let name = self.expect_identifier("a function name")?;
        let params = self.parse_params()?;
        let sig = FunctionSig {
            name,
            params,
            ret: ty,
            is_main: name == "main",
        };
        match self.peek_kind() {
            TokenKind::Semicolon => {
                self.advance();
                let span = self.span_from(start);
                Some(self.node(NodeKind::FunctionHeader(sig), span))
            }
            TokenKind::LeftBrace => {
                let body = self.parse_block()?;
                let span = self.span_from(start);
                Some(self.node(
                    NodeKind::Function {
                        sig,
                        body: Box::new(body),
                    },
                    span,
                ))
            }
            _ => {
                self.error_here("expected ';' or a function body");
                None
            }
        }
    }

    fn parse_params(&mut self) -> Option<Vec<Param<'src>>> {
        self.expect(TokenKind::LeftParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                let start = self.peek().span;
                let ty = self.parse_type()?;
                let mutable = self.eat(TokenKind::Mut);
                let name = self.expect_identifier("a parameter name")?;
                params.push(Param {
                    name,
                    ty,
                    mutable,
                    span: self.span_from(start),
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen, "')' to close the parameter list")?;
        Some(params)
    }

    /// `static`? (`let` | Type) `mut`? name (`=` expr)? `;`
    fn parse_var_decl(&mut self) -> Option<Node<'src>> {
        let start = self.peek().span;
        let is_static = self.eat(TokenKind::Static);
        let ty = if self.eat(TokenKind::Let) {
            None
        } else {
            Some(self.parse_type()?)
        };
        self.finish_var_decl(start, is_static, ty)
    }

    fn finish_var_decl(
        &mut self,
        start: Span,
        is_static: bool,
        ty: Option<Type<'src>>,
    ) -> Option<Node<'src>> {
        let mutable = self.eat(TokenKind::Mut);
        let name = self.expect_identifier("a variable name")?;
        let init = if self.eat(TokenKind::Equal) {
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "';' after variable declaration")?;
        let span = self.span_from(start);
        let var = VarDecl {
            is_static,
            mutable,
            ty,
            name,
            init,
        };
        Some(self.node(NodeKind::VarDecl(var), span))
    }

    // -----------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------

    fn parse_type(&mut self) -> Option<Type<'src>> {
        let directives = self.parse_directives()?;
        let base = self.parse_type_base()?;
        let mut ty = self.wrap_type(base)?;
        if !directives.is_empty() {
            ty.directives = directives;
        }
        Some(ty)
    }

    fn parse_type_base(&mut self) -> Option<Type<'src>> {
        let token = self.peek();
        if token.kind == TokenKind::Void {
            self.advance();
            return Some(self.make_type(TypeKind::Void, token.span));
        }
        if let Some(scalar) = scalar_for_token(token.kind) {
            self.advance();
            return Some(self.make_type(TypeKind::Scalar(scalar), token.span));
        }
        match token.kind {
            TokenKind::Identifier => {
                let path = self.parse_static_path()?;
                let span = self.span_from(token.span);
                Some(self.make_type(
                    TypeKind::Named {
                        path,
                        generics: Vec::new(),
                    },
                    span,
                ))
            }
            TokenKind::LeftParen => {
                self.advance();
                let mut items = Vec::new();
                loop {
                    items.push(self.parse_type()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RightParen, "')' to close the tuple type")?;
                let span = self.span_from(token.span);
                Some(self.make_type(TypeKind::Tuple(items), span))
            }
            _ => {
                self.error_here("expected a type");
                None
            }
        }
    }

    /// Apply postfix type constructors left to right until none match.
    fn wrap_type(&mut self, mut ty: Type<'src>) -> Option<Type<'src>> {
        loop {
            let start = ty.span;
            ty = match self.peek_kind() {
                TokenKind::Star => {
                    self.advance();
                    let span = self.span_from(start);
                    self.make_type(TypeKind::Pointer(Box::new(ty)), span)
                }
                TokenKind::Mut if self.peek_kind_at(1) == TokenKind::Star => {
                    self.advance();
                    self.advance();
                    let span = self.span_from(start);
                    self.make_type(TypeKind::MutPointer(Box::new(ty)), span)
                }
                TokenKind::LeftBracket => match (self.peek_kind_at(1), self.peek_kind_at(2)) {
                    (TokenKind::RightBracket, _) => {
                        self.advance();
                        self.advance();
                        let span = self.span_from(start);
                        self.make_type(
                            TypeKind::Array {
                                elem: Box::new(ty),
                                len: None,
                            },
                            span,
                        )
                    }
                    (TokenKind::DotDot, TokenKind::RightBracket) => {
                        self.advance();
                        self.advance();
                        self.advance();
                        let span = self.span_from(start);
                        self.make_type(TypeKind::Slice(Box::new(ty)), span)
                    }
                    (TokenKind::IntLiteral | TokenKind::Identifier, TokenKind::RightBracket) => {
                        self.advance();
                        let len = self.advance();
                        self.advance();
                        let len = Some(self.text(len));
                        let span = self.span_from(start);
                        self.make_type(
                            TypeKind::Array {
                                elem: Box::new(ty),
                                len,
                            },
                            span,
                        )
                    }
                    _ => return Some(ty),
                },
                TokenKind::Less => {
                    let path = match ty.kind {
                        TypeKind::Named { path, generics } if generics.is_empty() => path,
                        kind => {
                            ty.kind = kind;
                            return Some(ty);
                        }
                    };
                    self.advance();
                    let mut args = Vec::new();
                    loop {
                        args.push(self.parse_type()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::Greater, "'>' to close the generic argument list")?;
                    let span = self.span_from(start);
                    self.make_type(
                        TypeKind::Named {
                            path,
                            generics: args,
                        },
                        span,
                    )
                }
                TokenKind::Question => {
                    self.advance();
                    let span = self.span_from(start);
                    self.make_type(TypeKind::Optional(Box::new(ty)), span)
                }
                TokenKind::Bang => {
                    self.advance();
                    let err = self.parse_type_base()?;
                    let span = self.span_from(start);
                    self.make_type(
                        TypeKind::Result {
                            ok: Box::new(ty),
                            err: Box::new(err),
                        },
                        span,
                    )
                }
                _ => return Some(ty),
            };
        }
    }

    /// `a::b::c`
    fn parse_static_path(&mut self) -> Option<Vec<&'src str>> {
        let mut path = vec![self.expect_identifier("a name")?];
        while self.check(TokenKind::ColonColon) && self.peek_kind_at(1) == TokenKind::Identifier {
            self.advance();
            let segment = self.advance();
            path.push(self.text(segment));
        }
        Some(path)
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn parse_block(&mut self) -> Option<Node<'src>> {
        let start = self.expect(TokenKind::LeftBrace, "'{'")?.span;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.cursor.at_eof() {
            let before = self.cursor.pos;
            match self.parse_statement() {
                Some(stmt) => {
                    self.panic = false;
                    stmts.push(stmt);
                }
                None => self.synchronize_statement(before),
            }
        }
        self.expect(TokenKind::RightBrace, "'}' to close the block")?;
        let span = self.span_from(start);
        Some(self.node(NodeKind::Block { stmts }, span))
    }

    /// Skip to just after the next `;` or to the next `}` of this block,
    /// always moving at least one token.
    fn synchronize_statement(&mut self, before: usize) {
        if self.cursor.pos == before {
            self.advance();
        }
        let mut depth = 0i32;
        while !self.cursor.at_eof() {
            match self.peek_kind() {
                TokenKind::Semicolon if depth == 0 => {
                    self.advance();
                    break;
                }
                TokenKind::RightBrace if depth == 0 => break,
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth -= 1,
                _ => {}
            }
            self.advance();
        }
        self.panic = false;
    }

    fn parse_statement(&mut self) -> Option<Node<'src>> {
        let directives = self.parse_directives()?;
        let mut stmt = match self.peek_kind() {
            TokenKind::LeftBrace => self.parse_block()?,
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::Foreach => self.parse_foreach()?,
            TokenKind::Return => self.parse_return()?,
            TokenKind::Defer => self.parse_defer()?,
            TokenKind::Crash => self.parse_crash()?,
            TokenKind::Switch => self.parse_switch()?,
            TokenKind::Static | TokenKind::Let => self.parse_var_decl()?,
            _ => self.parse_simple_statement()?,
        };
        if !directives.is_empty() {
            stmt.directives = directives;
        }
        Some(stmt)
    }

    /// Declaration, expression statement, or assignment, tried in that order.
    fn parse_simple_statement(&mut self) -> Option<Node<'src>> {
        if let Some(decl) = self.attempt(|p| p.parse_var_decl()) {
            return Some(decl);
        }
        if let Some(stmt) = self.attempt(|p| p.parse_expr_statement()) {
            return Some(stmt);
        }
        self.parse_assignment()
    }

    fn parse_expr_statement(&mut self) -> Option<Node<'src>> {
        let start = self.peek().span;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';' after expression")?;
        let span = self.span_from(start);
        Some(self.node(
            NodeKind::ExprStmt {
                expr: Box::new(expr),
            },
            span,
        ))
    }

    fn parse_assignment(&mut self) -> Option<Node<'src>> {
        let start = self.peek().span;
        let target = self.parse_expr()?;
        let Some(op) = self.eat_assign_op() else {
            self.error_here("expected ';' or an assignment operator");
            return None;
        };
        let value = self.parse_expr()?;
        self.expect(TokenKind::Semicolon, "';' after assignment")?;
        let span = self.span_from(start);
        Some(self.node(
            NodeKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        ))
    }

    fn eat_assign_op(&mut self) -> Option<AssignOp> {
        let op = match self.peek_kind() {
            TokenKind::Equal => AssignOp::Assign,
            TokenKind::PlusEqual => AssignOp::Add,
            TokenKind::MinusEqual => AssignOp::Sub,
            TokenKind::StarEqual => AssignOp::Mul,
            TokenKind::SlashEqual => AssignOp::Div,
            TokenKind::PercentEqual => AssignOp::Rem,
            TokenKind::AmpEqual => AssignOp::BitAnd,
            TokenKind::PipeEqual => AssignOp::BitOr,
            TokenKind::CaretEqual => AssignOp::BitXor,
            TokenKind::LessLessEqual => AssignOp::Shl,
            TokenKind::Greater if self.adjacent_next(TokenKind::GreaterEqual) => {
                self.advance();
                self.advance();
                return Some(AssignOp::Shr);
            }
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    /// True if the token after the current one is `kind` and touches it.
    fn adjacent_next(&self, kind: TokenKind) -> bool {
        let current = self.cursor.peek();
        let next = self.cursor.peek_at(1);
        next.kind == kind && next.span.start == current.span.end
    }

    fn parse_if(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let cond = self.parse_expr()?;
        let then_branch = self.parse_block()?;
        let else_branch = if self.eat(TokenKind::Else) {
            if self.check(TokenKind::If) {
                Some(Box::new(self.parse_if()?))
            } else {
                Some(Box::new(self.parse_block()?))
            }
        } else {
            None
        };
        let span = self.span_from(start);
        Some(self.node(
            NodeKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            span,
        ))
    }

    fn parse_while(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let cond = self.parse_expr()?;
        let body = self.parse_block()?;
        let span = self.span_from(start);
        Some(self.node(
            NodeKind::While {
                cond: Box::new(cond),
                body: Box::new(body),
            },
            span,
        ))
    }

    fn parse_foreach(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let binding = self.expect_identifier("a loop variable name")?;
        if self.check(TokenKind::Comma) {
            let span = self.peek().span;
            self.error_at(
                span,
                "foreach over several variables is not supported".to_string(),
                "E0102",
            );
            return None;
        }
        self.expect(TokenKind::In, "'in'")?;
        let iterable = self.parse_expr()?;
        let body = self.parse_block()?;
        let span = self.span_from(start);
        Some(self.node(
            NodeKind::Foreach {
                binding,
                iterable: Box::new(iterable),
                body: Box::new(body),
            },
            span,
        ))
    }

    fn parse_return(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(TokenKind::Semicolon, "';' after return")?;
        let span = self.span_from(start);
        Some(self.node(NodeKind::Return { value }, span))
    }

    fn parse_defer(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let stmt = self.parse_statement()?;
        let span = self.span_from(start);
        Some(self.node(
            NodeKind::Defer {
                stmt: Box::new(stmt),
            },
            span,
        ))
    }

    fn parse_crash(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let message = match self.peek_kind() {
            TokenKind::Semicolon => None,
            TokenKind::StringLiteral
            | TokenKind::TemplateFull
            | TokenKind::TemplateStart
            | TokenKind::Directive => Some(Box::new(self.parse_expr()?)),
            _ => {
                self.error_here("expected a string or template string after 'crash'");
                return None;
            }
        };
        self.expect(TokenKind::Semicolon, "';' after crash")?;
        let span = self.span_from(start);
        Some(self.node(NodeKind::Crash { message }, span))
    }

    /// `switch expr { ... }`; the body is skipped with brace balancing.
    fn parse_switch(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let scrutinee = self.parse_expr()?;
        self.expect(TokenKind::LeftBrace, "'{' to open the switch body")?;
        let mut depth = 1;
        while depth > 0 {
            match self.advance().kind {
                TokenKind::LeftBrace => depth += 1,
                TokenKind::RightBrace => depth -= 1,
                TokenKind::Eof => {
                    self.error_here("expected '}' to close the switch body");
                    return None;
                }
                _ => {}
            }
        }
        let span = self.span_from(start);
        Some(self.node(
            NodeKind::Switch {
                scrutinee: Box::new(scrutinee),
            },
            span,
        ))
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    fn parse_expr(&mut self) -> Option<Node<'src>> {
        let directives = self.parse_directives()?;
        let mut expr = self.parse_binary(0)?;
        if !directives.is_empty() {
            expr.directives = directives;
        }
        Some(expr)
    }

    /// Precedence climbing. Ranges bind loosest (level 1) and do not chain.
    fn parse_binary(&mut self, min_prec: u8) -> Option<Node<'src>> {
        let mut lhs = self.parse_unary()?;
        loop {
            if min_prec <= 1 && matches!(self.peek_kind(), TokenKind::DotDot | TokenKind::DotDotEqual) {
                let inclusive = self.advance().kind == TokenKind::DotDotEqual;
                let rhs = self.parse_binary(2)?;
                let span = lhs.span.to(rhs.span);
                return Some(self.node(
                    NodeKind::Range {
                        start: Box::new(lhs),
                        end: Box::new(rhs),
                        inclusive,
                    },
                    span,
                ));
            }
            let Some((op, width)) = self.peek_binary_op() else {
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            for _ in 0..width {
                self.advance();
            }
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.to(rhs.span);
            lhs = self.node(
                NodeKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Some(lhs)
    }

    /// The binary operator at the cursor and how many tokens it spans.
    fn peek_binary_op(&self) -> Option<(BinaryOp, usize)> {
        let op = match self.peek_kind() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            TokenKind::EqualEqual => BinaryOp::Eq,
            TokenKind::BangEqual => BinaryOp::Ne,
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::LessEqual => BinaryOp::Le,
            TokenKind::GreaterEqual => BinaryOp::Ge,
            TokenKind::AmpAmp => BinaryOp::And,
            TokenKind::PipePipe => BinaryOp::Or,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::LessLess => BinaryOp::Shl,
            TokenKind::Greater => {
                if self.adjacent_next(TokenKind::Greater) {
                    return Some((BinaryOp::Shr, 2));
                }
                if self.adjacent_next(TokenKind::GreaterEqual) {
                    // `>>=` belongs to an assignment.
                    return None;
                }
                BinaryOp::Gt
            }
            _ => return None,
        };
        Some((op, 1))
    }

    fn parse_unary(&mut self) -> Option<Node<'src>> {
        let op = match self.peek_kind() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Amp => UnaryOp::AddrOf,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::PlusPlus => UnaryOp::PreInc,
            TokenKind::MinusMinus => UnaryOp::PreDec,
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = start.to(operand.span);
        Some(self.node(
            NodeKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// Wrap calls, field accesses, indexing and `++`/`--` around `expr`
    /// until none apply.
    fn parse_postfix(&mut self, mut expr: Node<'src>) -> Option<Node<'src>> {
        loop {
            let start = expr.span;
            expr = match self.peek_kind() {
                TokenKind::LeftParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RightParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.expect(TokenKind::RightParen, "')' to close the argument list")?;
                    let span = self.span_from(start);
                    self.node(
                        NodeKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    )
                }
                TokenKind::Dot | TokenKind::Arrow
                    if self.peek_kind_at(1) == TokenKind::Identifier =>
                {
                    let arrow = self.advance().kind == TokenKind::Arrow;
                    let field = self.advance();
                    let field = self.text(field);
                    let span = self.span_from(start);
                    self.node(
                        NodeKind::GetField {
                            target: Box::new(expr),
                            field,
                            arrow,
                        },
                        span,
                    )
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RightBracket, "']' to close the index")?;
                    let span = self.span_from(start);
                    self.node(
                        NodeKind::Index {
                            target: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    )
                }
                TokenKind::PlusPlus | TokenKind::MinusMinus => {
                    let op = if self.advance().kind == TokenKind::PlusPlus {
                        PostfixOp::Inc
                    } else {
                        PostfixOp::Dec
                    };
                    let span = self.span_from(start);
                    self.node(
                        NodeKind::Postfix {
                            op,
                            operand: Box::new(expr),
                        },
                        span,
                    )
                }
                _ => return Some(expr),
            };
        }
    }

    fn parse_primary(&mut self) -> Option<Node<'src>> {
        let token = self.peek();
        let literal = match token.kind {
            TokenKind::True => Some(Literal::Bool(true)),
            TokenKind::False => Some(Literal::Bool(false)),
            TokenKind::IntLiteral => Some(Literal::Int(self.text(token))),
            TokenKind::FloatLiteral => Some(Literal::Float(self.text(token))),
            TokenKind::StringLiteral => Some(Literal::String(self.inner_text(token))),
            TokenKind::CharLiteral => Some(Literal::Char(self.inner_text(token))),
            TokenKind::CharsLiteral => Some(Literal::Chars(self.inner_text(token))),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Some(self.node(NodeKind::Literal(literal), token.span));
        }

        match token.kind {
            TokenKind::Identifier => {
                let path = self.parse_static_path()?;
                let span = self.span_from(token.span);
                Some(self.node(NodeKind::VarRef { path }, span))
            }
            TokenKind::TemplateFull | TokenKind::TemplateStart => self.parse_template(),
            TokenKind::LeftParen => self.parse_paren(),
            TokenKind::Dot if self.peek_kind_at(1) == TokenKind::LeftBrace => {
                self.parse_struct_init()
            }
            TokenKind::LeftBracket => self.parse_array_init(),
            TokenKind::Sizeof => self.parse_sizeof(),
            TokenKind::Cast => self.parse_cast(),
            _ => {
                self.error_here("expected an expression");
                None
            }
        }
    }

    fn parse_template(&mut self) -> Option<Node<'src>> {
        let first = self.advance();
        let mut parts = Vec::new();
        let text = self.inner_text(first);
        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        if first.kind == TokenKind::TemplateStart {
            loop {
                parts.push(TemplatePart::Expr(self.parse_expr()?));
                let next = self.peek();
                match next.kind {
                    TokenKind::TemplateMiddle | TokenKind::TemplateEnd => {
                        self.advance();
                        let text = self.inner_text(next);
                        if !text.is_empty() {
                            parts.push(TemplatePart::Text(text));
                        }
                        if next.kind == TokenKind::TemplateEnd {
                            break;
                        }
                    }
                    _ => {
                        self.error_here("expected '}' to close the interpolation");
                        return None;
                    }
                }
            }
        }
        let span = self.span_from(first.span);
        Some(self.node(NodeKind::TemplateString { parts }, span))
    }

    /// `(expr)` groups; `(a, b, ...)` builds a tuple.
    fn parse_paren(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let first = self.parse_expr()?;
        if !self.check(TokenKind::Comma) {
            self.expect(TokenKind::RightParen, "')'")?;
            return Some(first);
        }
        let mut items = vec![first];
        while self.eat(TokenKind::Comma) {
            if self.check(TokenKind::RightParen) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        self.expect(TokenKind::RightParen, "')' to close the tuple")?;
        let span = self.span_from(start);
        Some(self.node(NodeKind::Tuple { items }, span))
    }

    /// `.{ .field = expr, ... }`
    fn parse_struct_init(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        self.advance(); // '{'
        let mut fields = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let field_start = self.expect(TokenKind::Dot, "'.' before a field name")?.span;
            let name = self.expect_identifier("a field name")?;
            self.expect(TokenKind::Equal, "'=' after the field name")?;
            let value = self.parse_expr()?;
            fields.push(FieldInit {
                name,
                value,
                span: self.span_from(field_start),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace, "'}' to close the struct initializer")?;
        let span = self.span_from(start);
        Some(self.node(NodeKind::StructInit { fields }, span))
    }

    /// `[len]{ elem, index = elem, ... }`
    fn parse_array_init(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        let len = if self.check(TokenKind::RightBracket) {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        self.expect(TokenKind::RightBracket, "']' after the array length")?;
        self.expect(TokenKind::LeftBrace, "'{' to open the array initializer")?;
        let mut elements = Vec::new();
        while !self.check(TokenKind::RightBrace) {
            let first = self.parse_expr()?;
            let element = if self.eat(TokenKind::Equal) {
                ArrayElement {
                    index: Some(first),
                    value: self.parse_expr()?,
                }
            } else {
                ArrayElement {
                    index: None,
                    value: first,
                }
            };
            elements.push(element);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RightBrace, "'}' to close the array initializer")?;
        let span = self.span_from(start);
        Some(self.node(NodeKind::ArrayInit { len, elements }, span))
    }

    /// `sizeof(Type)` is preferred; `sizeof(expr)` otherwise. When the type
    /// could also be a variable the expression reading is kept alongside it.
    fn parse_sizeof(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        self.expect(TokenKind::LeftParen, "'(' after sizeof")?;
        let open = self.checkpoint();
        let as_type = self.attempt(|p| {
            let ty = p.parse_type()?;
            p.check(TokenKind::RightParen).then_some(ty)
        });
        let kind = match as_type {
            Some(ty) => {
                let operand = match ty.value_name() {
                    Some(_) => {
                        let close = self.checkpoint();
                        self.restore(open);
                        let operand = self.attempt(|p| {
                            let expr = p.parse_expr()?;
                            p.check(TokenKind::RightParen).then_some(expr)
                        });
                        self.restore(close);
                        operand.map(Box::new)
                    }
                    None => None,
                };
                NodeKind::SizeofType { ty, operand }
            }
            None => NodeKind::SizeofExpr {
                expr: Box::new(self.parse_expr()?),
            },
        };
        self.expect(TokenKind::RightParen, "')' to close sizeof")?;
        let span = self.span_from(start);
        Some(self.node(kind, span))
    }

    /// `cast<Type>(expr)`
    fn parse_cast(&mut self) -> Option<Node<'src>> {
        let start = self.advance().span;
        self.expect(TokenKind::Less, "'<' after cast")?;
        let ty = self.parse_type()?;
        self.expect(TokenKind::Greater, "'>' to close the cast type")?;
        self.expect(TokenKind::LeftParen, "'(' before the cast operand")?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RightParen, "')' to close the cast operand")?;
        let span = self.span_from(start);
        Some(self.node(
            NodeKind::Cast {
                ty,
                expr: Box::new(expr),
            },
            span,
        ))
    }
}
