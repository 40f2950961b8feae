//! Syntax tree produced by the parser.
//!
//! Nodes are small: a numeric identity, a span, the directives written in
//! front of them and a kind. Facts computed by later passes (resolved types,
//! name bindings) are kept in side tables keyed by [`NodeId`] instead of
//! being stored on the node. Children are owned by their parent and there
//! are no back references.
//!
//! Names are borrowed straight from the source buffer, so a tree can never
//! outlive the [`crate::source::SourceMap`] it was parsed from.

use std::fmt;

use crate::builtins::Scalar;
use crate::span::{FileId, Span};

/// Stable identity of a node, assigned in construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a syntactic type, counted separately from nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

/// Monotonic identity counters shared by every parse of one compilation.
#[derive(Debug, Default)]
pub struct IdGen {
    next_node: u32,
    next_type: u32,
}

impl IdGen {
    pub fn new() -> Self {
        IdGen::default()
    }

    pub fn node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    pub fn ty(&mut self) -> TypeId {
        let id = TypeId(self.next_type);
        self.next_type += 1;
        id
    }

    /// Number of node identities handed out so far.
    pub fn node_count(&self) -> usize {
        self.next_node as usize
    }

    pub fn type_count(&self) -> usize {
        self.next_type as usize
    }
}

// ---------------------------------------------------------------------
// Directives
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    /// `@c_header("path")`: the package binds an existing C header.
    CHeader,
    /// `@restrict`: pointer aliasing hint.
    Restrict,
    /// `@c_file`: the typedef names C's opaque `FILE`.
    CFile,
    /// `@unused`: silence the unused-binding warning.
    Unused,
    /// `@extern`: implemented outside the generated code.
    Extern,
    /// `@cstr`: back a string literal with a plain `char*`.
    CStr,
    /// `@stack_buf`: render a template string into a stack buffer.
    StackBuf,
    /// `@range_usize`: iterate a range with a `size_t` counter.
    RangeUsize,
}

/// Spelling, kind and whether a parenthesized string argument is required.
pub const DIRECTIVES: &[(&str, DirectiveKind, bool)] = &[
    ("@c_header", DirectiveKind::CHeader, true),
    ("@restrict", DirectiveKind::Restrict, false),
    ("@c_file", DirectiveKind::CFile, false),
    ("@unused", DirectiveKind::Unused, false),
    ("@extern", DirectiveKind::Extern, false),
    ("@cstr", DirectiveKind::CStr, false),
    ("@stack_buf", DirectiveKind::StackBuf, false),
    ("@range_usize", DirectiveKind::RangeUsize, false),
];

impl DirectiveKind {
    pub fn lookup(text: &str) -> Option<(DirectiveKind, bool)> {
        DIRECTIVES
            .iter()
            .find(|(name, _, _)| *name == text)
            .map(|(_, kind, takes_arg)| (*kind, *takes_arg))
    }

    pub fn name(self) -> &'static str {
        DIRECTIVES
            .iter()
            .find(|(_, kind, _)| *kind == self)
            .map(|(name, _, _)| *name)
            .unwrap_or("@?")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive<'src> {
    pub kind: DirectiveKind,
    /// String argument without its quotes, for directives that take one.
    pub arg: Option<&'src str>,
    pub span: Span,
}

pub fn find_directive<'a, 'src>(
    directives: &'a [Directive<'src>],
    kind: DirectiveKind,
) -> Option<&'a Directive<'src>> {
    directives.iter().find(|d| d.kind == kind)
}

// ---------------------------------------------------------------------
// Types as written
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Type<'src> {
    pub id: TypeId,
    pub span: Span,
    pub directives: Vec<Directive<'src>>,
    pub kind: TypeKind<'src>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind<'src> {
    Void,
    Scalar(Scalar),
    /// `Name`, `ns::Name`, `Name<A, B>`.
    Named {
        path: Vec<&'src str>,
        generics: Vec<Type<'src>>,
    },
    Pointer(Box<Type<'src>>),
    MutPointer(Box<Type<'src>>),
    /// `T[]` or `T[N]`; the length is kept as written.
    Array {
        elem: Box<Type<'src>>,
        len: Option<&'src str>,
    },
    Slice(Box<Type<'src>>),
    Optional(Box<Type<'src>>),
    Result {
        ok: Box<Type<'src>>,
        err: Box<Type<'src>>,
    },
    Tuple(Vec<Type<'src>>),
}

impl TypeKind<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            TypeKind::Void => "void",
            TypeKind::Scalar(_) => "scalar",
            TypeKind::Named { .. } => "named type",
            TypeKind::Pointer(_) => "pointer",
            TypeKind::MutPointer(_) => "mutable pointer",
            TypeKind::Array { .. } => "array",
            TypeKind::Slice(_) => "slice",
            TypeKind::Optional(_) => "optional",
            TypeKind::Result { .. } => "result",
            TypeKind::Tuple(_) => "tuple",
        }
    }
}

impl<'src> Type<'src> {
    /// Directly nested types, in source order.
    pub fn children(&self) -> Vec<&Type<'src>> {
        match &self.kind {
            TypeKind::Void | TypeKind::Scalar(_) => Vec::new(),
            TypeKind::Named { generics, .. } => generics.iter().collect(),
            TypeKind::Pointer(inner)
            | TypeKind::MutPointer(inner)
            | TypeKind::Slice(inner)
            | TypeKind::Optional(inner) => vec![inner],
            TypeKind::Array { elem, .. } => vec![elem],
            TypeKind::Result { ok, err } => vec![ok, err],
            TypeKind::Tuple(items) => items.iter().collect(),
        }
    }

    /// The variable this type would name if it were read as `x` or `x[n]`.
    pub fn value_name(&self) -> Option<&'src str> {
        match &self.kind {
            TypeKind::Named { path, generics } if generics.is_empty() => match path.as_slice() {
                [name] => Some(*name),
                _ => None,
            },
            TypeKind::Array { elem, len: Some(_) } => elem.value_name(),
            _ => None,
        }
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::Void => f.write_str("void"),
            TypeKind::Scalar(scalar) => f.write_str(scalar.name()),
            TypeKind::Named { path, generics } => {
                f.write_str(&path.join("::"))?;
                if !generics.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in generics.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeKind::Pointer(inner) => write!(f, "{inner}*"),
            TypeKind::MutPointer(inner) => write!(f, "{inner} mut*"),
            TypeKind::Array { elem, len } => write!(f, "{elem}[{}]", len.unwrap_or("")),
            TypeKind::Slice(inner) => write!(f, "{inner}[..]"),
            TypeKind::Optional(inner) => write!(f, "{inner}?"),
            TypeKind::Result { ok, err } => write!(f, "{ok}!{err}"),
            TypeKind::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

// ---------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import std/io;`
    Plain,
    /// `import ./util;`, relative to the importing package's directory.
    Local,
    /// `import ~/app/util;`, from the project root.
    Root,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import<'src> {
    pub kind: ImportKind,
    /// Package path segments, root to leaf.
    pub segments: Vec<&'src str>,
    /// In-file symbol path after `::`, empty when the whole package is imported.
    pub symbols: Vec<&'src str>,
    /// `::*`
    pub wildcard: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param<'src> {
    pub name: &'src str,
    pub ty: Type<'src>,
    pub mutable: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSig<'src> {
    pub name: &'src str,
    pub params: Vec<Param<'src>>,
    pub ret: Type<'src>,
    /// Set for a function literally named `main`.
    pub is_main: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field<'src> {
    pub name: &'src str,
    pub ty: Type<'src>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl<'src> {
    pub name: &'src str,
    pub generics: Vec<&'src str>,
    pub fields: Vec<Field<'src>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl<'src> {
    pub is_static: bool,
    pub mutable: bool,
    /// `None` for `let`.
    pub ty: Option<Type<'src>>,
    pub name: &'src str,
    pub init: Option<Box<Node<'src>>>,
}

// ---------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }

    /// Binding power; higher binds tighter. Ranges sit below all of these.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 2,
            BinaryOp::And => 3,
            BinaryOp::BitOr => 4,
            BinaryOp::BitXor => 5,
            BinaryOp::BitAnd => 6,
            BinaryOp::Eq | BinaryOp::Ne => 7,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 8,
            BinaryOp::Shl | BinaryOp::Shr => 9,
            BinaryOp::Add | BinaryOp::Sub => 10,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 11,
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
    AddrOf,
    Deref,
    PreInc,
    PreDec,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
            UnaryOp::AddrOf => "&",
            UnaryOp::Deref => "*",
            UnaryOp::PreInc => "++",
            UnaryOp::PreDec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Inc,
    Dec,
}

impl PostfixOp {
    pub fn symbol(self) -> &'static str {
        match self {
            PostfixOp::Inc => "++",
            PostfixOp::Dec => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Rem => "%=",
            AssignOp::BitAnd => "&=",
            AssignOp::BitOr => "|=",
            AssignOp::BitXor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }
}

/// Literal values keep their source text; string-like literals drop their
/// delimiters but keep escapes as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal<'src> {
    Bool(bool),
    Int(&'src str),
    Float(&'src str),
    String(&'src str),
    Char(&'src str),
    Chars(&'src str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInit<'src> {
    pub name: &'src str,
    pub value: Node<'src>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayElement<'src> {
    /// Explicit index for sparse `index = value` elements.
    pub index: Option<Node<'src>>,
    pub value: Node<'src>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart<'src> {
    Text(&'src str),
    Expr(Node<'src>),
}

// ---------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Node<'src> {
    pub id: NodeId,
    pub span: Span,
    pub directives: Vec<Directive<'src>>,
    pub kind: NodeKind<'src>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<'src> {
    Root {
        files: Vec<Node<'src>>,
    },
    File {
        file: FileId,
        decls: Vec<Node<'src>>,
    },
    /// `---` between logical files of one token stream.
    FileSeparator,
    PackageDecl {
        path: Vec<&'src str>,
    },
    Import(Import<'src>),
    Typedef {
        name: &'src str,
        /// `None` declares an opaque type.
        ty: Option<Type<'src>>,
    },
    StructDecl(StructDecl<'src>),
    FunctionHeader(FunctionSig<'src>),
    Function {
        sig: FunctionSig<'src>,
        body: Box<Node<'src>>,
    },
    VarDecl(VarDecl<'src>),

    Block {
        stmts: Vec<Node<'src>>,
    },
    If {
        cond: Box<Node<'src>>,
        then_branch: Box<Node<'src>>,
        else_branch: Option<Box<Node<'src>>>,
    },
    While {
        cond: Box<Node<'src>>,
        body: Box<Node<'src>>,
    },
    Foreach {
        binding: &'src str,
        iterable: Box<Node<'src>>,
        body: Box<Node<'src>>,
    },
    Return {
        value: Option<Box<Node<'src>>>,
    },
    Defer {
        stmt: Box<Node<'src>>,
    },
    Crash {
        message: Option<Box<Node<'src>>>,
    },
    ExprStmt {
        expr: Box<Node<'src>>,
    },
    Assign {
        op: AssignOp,
        target: Box<Node<'src>>,
        value: Box<Node<'src>>,
    },

    Binary {
        op: BinaryOp,
        lhs: Box<Node<'src>>,
        rhs: Box<Node<'src>>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node<'src>>,
    },
    Postfix {
        op: PostfixOp,
        operand: Box<Node<'src>>,
    },
    Call {
        callee: Box<Node<'src>>,
        args: Vec<Node<'src>>,
    },
    Literal(Literal<'src>),
    VarRef {
        path: Vec<&'src str>,
    },
    GetField {
        target: Box<Node<'src>>,
        field: &'src str,
        /// `->` rather than `.`
        arrow: bool,
    },
    Index {
        target: Box<Node<'src>>,
        index: Box<Node<'src>>,
    },
    Range {
        start: Box<Node<'src>>,
        end: Box<Node<'src>>,
        inclusive: bool,
    },
    Tuple {
        items: Vec<Node<'src>>,
    },
    StructInit {
        fields: Vec<FieldInit<'src>>,
    },
    ArrayInit {
        len: Option<Box<Node<'src>>>,
        elements: Vec<ArrayElement<'src>>,
    },
    TemplateString {
        parts: Vec<TemplatePart<'src>>,
    },
    /// `operand` holds the same text parsed as an expression when it could
    /// also name a value, such as `sizeof(x)` or `sizeof(a[0])`.
    SizeofType {
        ty: Type<'src>,
        operand: Option<Box<Node<'src>>>,
    },
    SizeofExpr {
        expr: Box<Node<'src>>,
    },
    Cast {
        ty: Type<'src>,
        expr: Box<Node<'src>>,
    },
    /// `switch` is recognized but not lowered yet.
    Switch {
        scrutinee: Box<Node<'src>>,
    },
}

impl NodeKind<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Root { .. } => "root",
            NodeKind::File { .. } => "file",
            NodeKind::FileSeparator => "file separator",
            NodeKind::PackageDecl { .. } => "package declaration",
            NodeKind::Import(_) => "import",
            NodeKind::Typedef { .. } => "typedef",
            NodeKind::StructDecl(_) => "struct declaration",
            NodeKind::FunctionHeader(_) => "function header",
            NodeKind::Function { .. } => "function declaration",
            NodeKind::VarDecl(_) => "variable declaration",
            NodeKind::Block { .. } => "block",
            NodeKind::If { .. } => "if",
            NodeKind::While { .. } => "while",
            NodeKind::Foreach { .. } => "foreach",
            NodeKind::Return { .. } => "return",
            NodeKind::Defer { .. } => "defer",
            NodeKind::Crash { .. } => "crash",
            NodeKind::ExprStmt { .. } => "expression statement",
            NodeKind::Assign { .. } => "assignment",
            NodeKind::Binary { .. } => "binary operation",
            NodeKind::Unary { .. } => "unary operation",
            NodeKind::Postfix { .. } => "postfix operation",
            NodeKind::Call { .. } => "call",
            NodeKind::Literal(Literal::String(_)) => "string literal",
            NodeKind::Literal(Literal::Chars(_)) => "chars literal",
            NodeKind::Literal(_) => "literal",
            NodeKind::VarRef { .. } => "variable reference",
            NodeKind::GetField { .. } => "field access",
            NodeKind::Index { .. } => "index",
            NodeKind::Range { .. } => "range",
            NodeKind::Tuple { .. } => "tuple",
            NodeKind::StructInit { .. } => "struct initializer",
            NodeKind::ArrayInit { .. } => "array initializer",
            NodeKind::TemplateString { .. } => "template string",
            NodeKind::SizeofType { .. } | NodeKind::SizeofExpr { .. } => "sizeof",
            NodeKind::Cast { .. } => "cast",
            NodeKind::Switch { .. } => "switch",
        }
    }
}

impl<'src> Node<'src> {
    /// Directly nested nodes, in source order. Types are not included.
    pub fn children(&self) -> Vec<&Node<'src>> {
        let mut out = Vec::new();
        match &self.kind {
            NodeKind::Root { files } => out.extend(files),
            NodeKind::File { decls, .. } => out.extend(decls),
            NodeKind::FileSeparator
            | NodeKind::PackageDecl { .. }
            | NodeKind::Import(_)
            | NodeKind::Typedef { .. }
            | NodeKind::StructDecl(_)
            | NodeKind::FunctionHeader(_)
            | NodeKind::Literal(_)
            | NodeKind::VarRef { .. }
            | NodeKind::SizeofType { .. } => {}
            NodeKind::Function { body, .. } => out.push(&**body),
            NodeKind::VarDecl(var) => out.extend(var.init.as_deref()),
            NodeKind::Block { stmts } => out.extend(stmts),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                out.push(&**cond);
                out.push(&**then_branch);
                out.extend(else_branch.as_deref());
            }
            NodeKind::While { cond, body } => {
                out.push(&**cond);
                out.push(&**body);
            }
            NodeKind::Foreach { iterable, body, .. } => {
                out.push(&**iterable);
                out.push(&**body);
            }
            NodeKind::Return { value } => out.extend(value.as_deref()),
            NodeKind::Defer { stmt } => out.push(&**stmt),
            NodeKind::Crash { message } => out.extend(message.as_deref()),
            NodeKind::ExprStmt { expr } => out.push(&**expr),
            NodeKind::Assign { target, value, .. } => {
                out.push(&**target);
                out.push(&**value);
            }
            NodeKind::Binary { lhs, rhs, .. } => {
                out.push(&**lhs);
                out.push(&**rhs);
            }
            NodeKind::Unary { operand, .. } | NodeKind::Postfix { operand, .. } => {
                out.push(&**operand)
            }
            NodeKind::Call { callee, args } => {
                out.push(&**callee);
                out.extend(args);
            }
            NodeKind::GetField { target, .. } => out.push(&**target),
            NodeKind::Index { target, index } => {
                out.push(&**target);
                out.push(&**index);
            }
            NodeKind::Range { start, end, .. } => {
                out.push(&**start);
                out.push(&**end);
            }
            NodeKind::Tuple { items } => out.extend(items),
            NodeKind::StructInit { fields } => out.extend(fields.iter().map(|f| &f.value)),
            NodeKind::ArrayInit { len, elements } => {
                out.extend(len.as_deref());
                for element in elements {
                    out.extend(element.index.as_ref());
                    out.push(&element.value);
                }
            }
            NodeKind::TemplateString { parts } => {
                for part in parts {
                    if let TemplatePart::Expr(expr) = part {
                        out.push(expr);
                    }
                }
            }
            NodeKind::SizeofExpr { expr } => out.push(&**expr),
            NodeKind::Cast { expr, .. } => out.push(&**expr),
            NodeKind::Switch { scrutinee } => out.push(&**scrutinee),
        }
        out
    }

    /// Types written directly on this node (not on its children).
    pub fn types(&self) -> Vec<&Type<'src>> {
        match &self.kind {
            NodeKind::Typedef { ty, .. } => ty.iter().collect(),
            NodeKind::StructDecl(decl) => decl.fields.iter().map(|f| &f.ty).collect(),
            NodeKind::FunctionHeader(sig) | NodeKind::Function { sig, .. } => sig
                .params
                .iter()
                .map(|p| &p.ty)
                .chain(std::iter::once(&sig.ret))
                .collect(),
            NodeKind::VarDecl(var) => var.ty.iter().collect(),
            NodeKind::SizeofType { ty, .. } | NodeKind::Cast { ty, .. } => vec![ty],
            _ => Vec::new(),
        }
    }

    /// Visit this node and every descendant, parents first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node<'src>)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Top-level declarations of a `File` node; empty for anything else.
    pub fn decls(&self) -> &[Node<'src>] {
        match &self.kind {
            NodeKind::File { decls, .. } => decls,
            _ => &[],
        }
    }

    /// The package path declared in a `File`, if any.
    pub fn package_path(&self) -> Option<&[&'src str]> {
        self.decls().iter().find_map(|decl| match &decl.kind {
            NodeKind::PackageDecl { path } => Some(path.as_slice()),
            _ => None,
        })
    }

    /// Directives of the package declaration of a `File`.
    pub fn package_directives(&self) -> &[Directive<'src>] {
        self.decls()
            .iter()
            .find(|decl| matches!(decl.kind, NodeKind::PackageDecl { .. }))
            .map(|decl| decl.directives.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_literal_int(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(Literal::Int(_)))
    }

    pub fn is_literal_float(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(Literal::Float(_)))
    }
}
