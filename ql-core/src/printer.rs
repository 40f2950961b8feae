//! Indented dump of a syntax tree, used by `--emit ast` and in tests.

use std::fmt::Write as _;

use crate::ast::{ImportKind, Literal, Node, NodeKind, TemplatePart};

/// Render `node` and its descendants, one node per line.
pub fn print_tree(node: &Node<'_>) -> String {
    let mut printer = Printer::default();
    printer.node(node);
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        self.indent += 1;
        f(self);
        self.indent -= 1;
    }

    fn node(&mut self, node: &Node<'_>) {
        let mut head = self.head(node);
        for directive in &node.directives {
            let _ = write!(head, " {}", directive.kind.name());
            if let Some(arg) = directive.arg {
                let _ = write!(head, "(\"{arg}\")");
            }
        }
        self.line(&head);
        self.nested(|p| {
            if let NodeKind::TemplateString { parts } = &node.kind {
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => p.line(&format!("text {text:?}")),
                        TemplatePart::Expr(expr) => p.node(expr),
                    }
                }
                return;
            }
            for child in node.children() {
                p.node(child);
            }
        });
    }

    fn head(&self, node: &Node<'_>) -> String {
        match &node.kind {
            NodeKind::Root { .. } => "Root".to_string(),
            NodeKind::File { file, .. } => format!("File #{}", file.0),
            NodeKind::FileSeparator => "---".to_string(),
            NodeKind::PackageDecl { path } => format!("Package {}", path.join("/")),
            NodeKind::Import(import) => {
                let prefix = match import.kind {
                    ImportKind::Plain => "",
                    ImportKind::Local => "./",
                    ImportKind::Root => "~/",
                };
                let mut text = format!("Import {prefix}{}", import.segments.join("/"));
                for symbol in &import.symbols {
                    let _ = write!(text, "::{symbol}");
                }
                if import.wildcard {
                    text.push_str("::*");
                }
                text
            }
            NodeKind::Typedef { name, ty } => match ty {
                Some(ty) => format!("Typedef {name} = {ty}"),
                None => format!("Typedef {name} (opaque)"),
            },
            NodeKind::StructDecl(decl) => {
                let fields: Vec<_> = decl
                    .fields
                    .iter()
                    .map(|f| format!("{} {}", f.ty, f.name))
                    .collect();
                if decl.generics.is_empty() {
                    format!("Struct {} {{ {} }}", decl.name, fields.join(", "))
                } else {
                    format!(
                        "Struct {}<{}> {{ {} }}",
                        decl.name,
                        decl.generics.join(", "),
                        fields.join(", ")
                    )
                }
            }
            NodeKind::FunctionHeader(sig) | NodeKind::Function { sig, .. } => {
                let params: Vec<_> = sig
                    .params
                    .iter()
                    .map(|p| {
                        if p.mutable {
                            format!("{} mut {}", p.ty, p.name)
                        } else {
                            format!("{} {}", p.ty, p.name)
                        }
                    })
                    .collect();
                let label = if matches!(node.kind, NodeKind::FunctionHeader(_)) {
                    "FunctionHeader"
                } else {
                    "Function"
                };
                format!("{label} {} {}({})", sig.ret, sig.name, params.join(", "))
            }
            NodeKind::VarDecl(var) => {
                let mut text = String::from("Var");
                if var.is_static {
                    text.push_str(" static");
                }
                match &var.ty {
                    Some(ty) => {
                        let _ = write!(text, " {ty}");
                    }
                    None => text.push_str(" let"),
                }
                if var.mutable {
                    text.push_str(" mut");
                }
                let _ = write!(text, " {}", var.name);
                text
            }
            NodeKind::Foreach { binding, .. } => format!("Foreach {binding}"),
            NodeKind::Assign { op, .. } => format!("Assign {}", op.symbol()),
            NodeKind::Binary { op, .. } => format!("Binary {}", op.symbol()),
            NodeKind::Unary { op, .. } => format!("Unary {}", op.symbol()),
            NodeKind::Postfix { op, .. } => format!("Postfix {}", op.symbol()),
            NodeKind::Literal(literal) => match literal {
                Literal::Bool(value) => format!("Bool {value}"),
                Literal::Int(text) => format!("Int {text}"),
                Literal::Float(text) => format!("Float {text}"),
                Literal::String(text) => format!("String \"{text}\""),
                Literal::Char(text) => format!("Char '{text}'"),
                Literal::Chars(text) => format!("Chars '{text}'"),
            },
            NodeKind::VarRef { path } => format!("Ref {}", path.join("::")),
            NodeKind::GetField { field, arrow, .. } => {
                format!("Field {}{field}", if *arrow { "->" } else { "." })
            }
            NodeKind::Range { inclusive, .. } => {
                format!("Range {}", if *inclusive { "..=" } else { ".." })
            }
            NodeKind::StructInit { fields } => {
                let names: Vec<_> = fields.iter().map(|f| format!(".{}", f.name)).collect();
                format!("StructInit {}", names.join(" "))
            }
            NodeKind::SizeofType { ty, .. } => format!("Sizeof {ty}"),
            NodeKind::Cast { ty, .. } => format!("Cast {ty}"),
            other => capitalize(other.name()),
        }
    }
}

fn capitalize(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IdGen;
    use crate::parser::parse_source;
    use crate::span::FileId;

    #[test]
    fn prints_nested_structure() {
        let mut ids = IdGen::new();
        let result = parse_source(
            FileId(0),
            "package app;\n@unused int add(int a, int b) { return a + b; }",
            &mut ids,
        );
        let text = print_tree(&result.root);
        let expected = "\
Root
  File #0
    Package app
    Function int add(int a, int b) @unused
      Block
        Return
          Binary +
            Ref a
            Ref b
";
        assert_eq!(text, expected);
    }

    #[test]
    fn capitalizes_multiword_names() {
        assert_eq!(capitalize("expression statement"), "ExpressionStatement");
    }
}
