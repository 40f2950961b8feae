//! A small C syntax tree.
//!
//! Lowering builds these values; [`super::emit`] turns them into text. Only
//! the constructs the generator needs are represented.

/// A C type split around the declarator: `base name suffix`, so arrays can
/// be written as `int32_t xs[4]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CType {
    pub base: String,
    pub suffix: String,
}

impl CType {
    pub fn named(base: impl Into<String>) -> Self {
        CType {
            base: base.into(),
            suffix: String::new(),
        }
    }

    pub fn is_array(&self) -> bool {
        !self.suffix.is_empty()
    }

    /// `base name suffix`.
    pub fn declare(&self, name: &str) -> String {
        format!("{} {}{}", self.base, name, self.suffix)
    }

    /// The type with no declarator, as used by casts and `sizeof`.
    pub fn spelling(&self) -> String {
        format!("{}{}", self.base, self.suffix)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CExpr {
    Var(String),
    /// A literal already spelled for C.
    Literal(String),
    Binary {
        op: &'static str,
        lhs: Box<CExpr>,
        rhs: Box<CExpr>,
    },
    Unary {
        op: &'static str,
        operand: Box<CExpr>,
    },
    Postfix {
        op: &'static str,
        operand: Box<CExpr>,
    },
    Call {
        callee: Box<CExpr>,
        args: Vec<CExpr>,
    },
    Field {
        target: Box<CExpr>,
        field: String,
        arrow: bool,
    },
    Index {
        target: Box<CExpr>,
        index: Box<CExpr>,
    },
    SizeofType(CType),
    SizeofExpr(Box<CExpr>),
    Cast {
        ty: CType,
        expr: Box<CExpr>,
    },
    /// `(T){ .a = x, .b = y }`
    Compound {
        ty: CType,
        fields: Vec<(String, CExpr)>,
    },
    /// `{ x, [2] = y }`, only valid as an initializer.
    InitList(Vec<(Option<CExpr>, CExpr)>),
}

impl CExpr {
    pub fn var(name: impl Into<String>) -> Self {
        CExpr::Var(name.into())
    }

    pub fn literal(text: impl Into<String>) -> Self {
        CExpr::Literal(text.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<CExpr>) -> Self {
        CExpr::Call {
            callee: Box::new(CExpr::Var(name.into())),
            args,
        }
    }

    pub fn binary(op: &'static str, lhs: CExpr, rhs: CExpr) -> Self {
        CExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn postfix(op: &'static str, operand: CExpr) -> Self {
        CExpr::Postfix {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn cast(ty: CType, expr: CExpr) -> Self {
        CExpr::Cast {
            ty,
            expr: Box::new(expr),
        }
    }
}

/// One declarator with an optional initializer.
#[derive(Debug, Clone, PartialEq)]
pub struct CVar {
    pub ty: CType,
    pub name: String,
    pub init: Option<CExpr>,
    pub is_static: bool,
}

impl CVar {
    pub fn new(ty: CType, name: impl Into<String>, init: Option<CExpr>) -> Self {
        CVar {
            ty,
            name: name.into(),
            init,
            is_static: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CStmt {
    Block(Vec<CStmt>),
    Var(CVar),
    Expr(CExpr),
    Assign {
        op: &'static str,
        target: CExpr,
        value: CExpr,
    },
    If {
        cond: CExpr,
        then_branch: Vec<CStmt>,
        else_branch: Option<Vec<CStmt>>,
    },
    While {
        cond: CExpr,
        body: Vec<CStmt>,
    },
    For {
        init: CVar,
        cond: CExpr,
        step: CExpr,
        body: Vec<CStmt>,
    },
    Return(Option<CExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CParam {
    pub ty: CType,
    pub name: String,
    pub restrict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Definition,
    Extern,
}

/// A file-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum CItem {
    Include { path: String, system: bool },
    Define(String),
    IfNotDef(String),
    EndIf,
    /// `typedef struct Name Name;`
    ForwardStruct(String),
    Struct {
        name: String,
        fields: Vec<(CType, String)>,
    },
    Var { var: CVar, storage: Storage },
    FunctionHeader {
        ret: CType,
        name: String,
        params: Vec<CParam>,
    },
    Function {
        ret: CType,
        name: String,
        params: Vec<CParam>,
        body: Vec<CStmt>,
    },
}
