//! C text output.

use super::ir::{CExpr, CItem, CParam, CStmt, CType, CVar, Storage};

const INDENT: &str = "    ";

/// Render `items` in order, one declaration per line.
pub fn emit(items: &[CItem]) -> String {
    let mut emitter = Emitter::default();
    for item in items {
        emitter.item(item);
    }
    emitter.out
}

#[derive(Default)]
struct Emitter {
    out: String,
    indent: usize,
}

impl Emitter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn item(&mut self, item: &CItem) {
        match item {
            CItem::Include { path, system: true } => self.line(&format!("#include <{path}>")),
            CItem::Include { path, system: false } => self.line(&format!("#include \"{path}\"")),
            CItem::Define(name) => self.line(&format!("#define {name}")),
            CItem::IfNotDef(name) => self.line(&format!("#ifndef {name}")),
            CItem::EndIf => self.line("#endif"),
            CItem::ForwardStruct(name) => self.line(&format!("typedef struct {name} {name};")),
            CItem::Struct { name, fields } => {
                self.line(&format!("struct {name} {{"));
                self.indent += 1;
                for (ty, field) in fields {
                    self.line(&format!("{};", ty.declare(field)));
                }
                self.indent -= 1;
                self.line("};");
            }
            CItem::Var { var, storage } => {
                let text = match storage {
                    Storage::Extern => format!("extern {};", declaration(var)),
                    Storage::Definition => format!("{};", declaration(var)),
                };
                self.line(&text);
            }
            CItem::FunctionHeader { ret, name, params } => {
                self.line(&format!("{};", signature(ret, name, params)));
            }
            CItem::Function {
                ret,
                name,
                params,
                body,
            } => {
                self.line(&format!("{} {{", signature(ret, name, params)));
                self.body(body);
                self.line("}");
                self.out.push('\n');
            }
        }
    }

    fn body(&mut self, stmts: &[CStmt]) {
        self.indent += 1;
        for stmt in stmts {
            self.stmt(stmt);
        }
        self.indent -= 1;
    }

    fn stmt(&mut self, stmt: &CStmt) {
        match stmt {
            CStmt::Block(stmts) => {
                self.line("{");
                self.body(stmts);
                self.line("}");
            }
            CStmt::Var(var) => self.line(&format!("{};", declaration(var))),
            CStmt::Expr(e) => self.line(&format!("{};", expr(e, true))),
            CStmt::Assign { op, target, value } => {
                self.line(&format!("{} {op} {};", expr(target, true), expr(value, true)));
            }
            CStmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.line(&format!("if ({}) {{", expr(cond, true)));
                self.body(then_branch);
                if let Some(else_branch) = else_branch {
                    self.line("} else {");
                    self.body(else_branch);
                }
                self.line("}");
            }
            CStmt::While { cond, body } => {
                self.line(&format!("while ({}) {{", expr(cond, true)));
                self.body(body);
                self.line("}");
            }
            CStmt::For {
                init,
                cond,
                step,
                body,
            } => {
                self.line(&format!(
                    "for ({}; {}; {}) {{",
                    declaration(init),
                    expr(cond, true),
                    expr(step, true)
                ));
                self.body(body);
                self.line("}");
            }
            CStmt::Return(None) => self.line("return;"),
            CStmt::Return(Some(value)) => self.line(&format!("return {};", expr(value, true))),
        }
    }
}

fn declaration(var: &CVar) -> String {
    let mut text = String::new();
    if var.is_static {
        text.push_str("static ");
    }
    text.push_str(&var.ty.declare(&var.name));
    if let Some(init) = &var.init {
        text.push_str(" = ");
        text.push_str(&expr(init, true));
    }
    text
}

fn signature(ret: &CType, name: &str, params: &[CParam]) -> String {
    let params = if params.is_empty() {
        "void".to_string()
    } else {
        params.iter().map(param).collect::<Vec<_>>().join(", ")
    };
    format!("{} {name}({params})", ret.base)
}

fn param(param: &CParam) -> String {
    if param.restrict {
        format!("{} restrict {}{}", param.ty.base, param.name, param.ty.suffix)
    } else {
        param.ty.declare(&param.name)
    }
}

fn list(items: &[CExpr]) -> String {
    items.iter().map(|e| expr(e, true)).collect::<Vec<_>>().join(", ")
}

/// Operators are parenthesized unless `top` says the surrounding syntax
/// already delimits the expression.
fn expr(e: &CExpr, top: bool) -> String {
    let wrap = |text: String| if top { text } else { format!("({text})") };
    match e {
        CExpr::Var(name) | CExpr::Literal(name) => name.clone(),
        CExpr::Binary { op, lhs, rhs } => wrap(format!("{} {op} {}", expr(lhs, false), expr(rhs, false))),
        CExpr::Unary { op, operand } => wrap(format!("{op}{}", expr(operand, false))),
        CExpr::Postfix { op, operand } => wrap(format!("{}{op}", expr(operand, false))),
        CExpr::Call { callee, args } => format!("{}({})", expr(callee, false), list(args)),
        CExpr::Field {
            target,
            field,
            arrow,
        } => {
            let op = if *arrow { "->" } else { "." };
            format!("{}{op}{field}", expr(target, false))
        }
        CExpr::Index { target, index } => format!("{}[{}]", expr(target, false), expr(index, true)),
        CExpr::SizeofType(ty) => format!("sizeof({})", ty.spelling()),
        CExpr::SizeofExpr(inner) => format!("sizeof({})", expr(inner, true)),
        CExpr::Cast { ty, expr: inner } => wrap(format!("({}){}", ty.spelling(), expr(inner, false))),
        CExpr::Compound { ty, fields } if fields.is_empty() => format!("({}){{0}}", ty.spelling()),
        CExpr::Compound { ty, fields } => {
            let fields = fields
                .iter()
                .map(|(name, value)| format!(".{name} = {}", expr(value, true)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({}){{ {fields} }}", ty.spelling())
        }
        CExpr::InitList(elements) if elements.is_empty() => "{0}".to_string(),
        CExpr::InitList(elements) => {
            let elements = elements
                .iter()
                .map(|(index, value)| match index {
                    Some(index) => format!("[{}] = {}", expr(index, true), expr(value, true)),
                    None => expr(value, true),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{ {elements} }}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int() -> CType {
        CType::named("int")
    }

    #[test]
    fn empty_parameter_lists_are_void() {
        let items = [CItem::FunctionHeader {
            ret: CType::named("void"),
            name: "f".into(),
            params: Vec::new(),
        }];
        assert_eq!(emit(&items), "void f(void);\n");
    }

    #[test]
    fn nested_operators_are_parenthesized() {
        let sum = CExpr::binary("+", CExpr::var("a"), CExpr::var("b"));
        let product = CExpr::binary("*", sum, CExpr::literal("2"));
        assert_eq!(expr(&product, true), "(a + b) * 2");
        let negated = CExpr::Unary {
            op: "-",
            operand: Box::new(CExpr::Unary {
                op: "-",
                operand: Box::new(CExpr::var("x")),
            }),
        };
        assert_eq!(expr(&negated, true), "-(-x)");
    }

    #[test]
    fn arrays_put_their_length_after_the_name() {
        let var = CVar::new(
            CType {
                base: "int".into(),
                suffix: "[3]".into(),
            },
            "xs",
            Some(CExpr::InitList(vec![
                (None, CExpr::literal("1")),
                (Some(CExpr::literal("2")), CExpr::literal("5")),
            ])),
        );
        assert_eq!(declaration(&var), "int xs[3] = { 1, [2] = 5 }");
    }

    #[test]
    fn restrict_sits_between_type_and_name() {
        let p = CParam {
            ty: CType::named("char*"),
            name: "s".into(),
            restrict: true,
        };
        assert_eq!(signature(&int(), "puts", &[p]), "int puts(char* restrict s)");
    }

    #[test]
    fn function_bodies_are_indented() {
        let items = [CItem::Function {
            ret: int(),
            name: "f".into(),
            params: vec![CParam {
                ty: int(),
                name: "n".into(),
                restrict: false,
            }],
            body: vec![CStmt::If {
                cond: CExpr::binary(">", CExpr::var("n"), CExpr::literal("0")),
                then_branch: vec![CStmt::Return(Some(CExpr::var("n")))],
                else_branch: Some(vec![CStmt::Return(Some(CExpr::literal("0")))]),
            }],
        }];
        let expected = "int f(int n) {\n    if (n > 0) {\n        return n;\n    } else {\n        return 0;\n    }\n}\n\n";
        assert_eq!(emit(&items), expected);
    }
}
