//! Canonical declaration strings
//!
//! Every symbol carries a cached `detail` string used verbatim as hover and
//! completion text. The construction order is part of the contract: storage
//! qualifier, declaration keyword, `const`, `&`, tag annotation, name,
//! dimension suffix, argument default.

use crate::grammar::symbol::{
    Argument, ArrayDim, ArrayKind, ConstExpr, DefaultValue, Enumerator, Function, Ident, Substitute,
    Symbol, Tag, Usage, Variable, GLOBAL_SCOPE,
};

/// Declaration keyword family a symbol renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decl {
    Variable,
    Function,
    Enumerator,
    Constant,
    Argument,
}

/// Renders declaration strings against the current tag/enumerator/constant
/// tables. Pure: rendering the same symbol twice yields identical strings.
pub struct DetailRenderer<'a> {
    tags: &'a [Tag],
    enumerators: &'a [Enumerator],
    constants: &'a [ConstExpr],
}

impl<'a> DetailRenderer<'a> {
    pub fn new(tags: &'a [Tag], enumerators: &'a [Enumerator], constants: &'a [ConstExpr]) -> Self {
        Self {
            tags,
            enumerators,
            constants,
        }
    }

    /// `#define pattern substitution`
    pub fn substitute(sub: &Substitute) -> String {
        let mut out = format!("#define {}", sub.pattern);
        if !sub.substitution.is_empty() {
            out.push(' ');
            out.push_str(&sub.substitution);
        }
        out
    }

    /// Tags render as the annotation they are written as: `Name:`
    pub fn tag(tag: &Tag) -> String {
        format!("{}:", tag.name)
    }

    pub fn variable(&self, var: &Variable) -> String {
        let mut out = self.prefix(&var.sym, Decl::Variable, &[var.sym.tag_id]);
        self.push_dims(&mut out, &var.array);
        out
    }

    /// A standalone constant expression: a plain constant, an enumerator
    /// root (rendered with the `enum` keyword), or an enumerator field.
    pub fn constant(&self, konst: &ConstExpr) -> String {
        let decl = if konst.is_enum_root() {
            Decl::Enumerator
        } else {
            Decl::Constant
        };
        let mut out = self.prefix(&konst.sym, decl, &[konst.sym.tag_id]);
        if konst.is_enum_field() {
            self.push_field_dims(&mut out, &konst.array);
        }
        out
    }

    /// Function header plus the comma-joined renders of every argument.
    /// Also returns the per-argument details (signature-help labels).
    pub fn function(&self, func: &Function) -> (String, Vec<String>) {
        let mut out = self.prefix(&func.sym, Decl::Function, &[func.sym.tag_id]);
        let args: Vec<String> = func.args.iter().map(|a| self.argument(a)).collect();

        out.push('(');
        out.push_str(&args.join(", "));
        out.push(')');

        (out, args)
    }

    pub fn argument(&self, arg: &Argument) -> String {
        let mut out = self.prefix(&arg.sym, Decl::Argument, &arg.tag_list);

        if arg.sym.ident == Ident::RefArray {
            // Sizes are unknown for by-reference arrays.
            for _ in 0..arg.dimension {
                out.push_str("[]");
            }
        }

        if arg.has_default {
            out.push_str(" = ");
            match self.default_constant(arg) {
                Some(named) => out.push_str(named),
                None => match &arg.default_value {
                    DefaultValue::Number(n) => out.push_str(&n.to_string()),
                    DefaultValue::Text(s) if !s.is_empty() => out.push_str(s),
                    DefaultValue::Text(_) => out.push_str("\"\""),
                },
            }
        }

        out
    }

    /// Enumerator header plus its brace block, each field rendered in its
    /// parent's context. Also returns the per-field details.
    pub fn enumerator(&self, en: &Enumerator) -> (String, Vec<String>) {
        let mut out = self.prefix(&en.sym, Decl::Enumerator, &[]);
        let fields: Vec<String> = en.fields.iter().map(|f| self.enum_field(f, en)).collect();

        out.push_str("\n{\n");
        for (i, field) in fields.iter().enumerate() {
            if i == 0 {
                out.push('\t');
            } else {
                out.push_str(",\n\t");
            }
            out.push_str(field);
        }
        out.push_str("\n}");

        (out, fields)
    }

    /// One enumerator field, with the enclosing enumerator supplied as
    /// render-time context for tag resolution.
    pub fn enum_field(&self, field: &ConstExpr, parent: &Enumerator) -> String {
        let tag = if field.sym.tag_id != 0 {
            field.sym.tag_id
        } else {
            parent.sym.tag_id
        };
        let mut out = self.prefix(&field.sym, Decl::Constant, &[tag]);
        self.push_field_dims(&mut out, &field.array);
        out
    }

    /// Steps 1–6 of the construction order, shared by every variant.
    fn prefix(&self, sym: &Symbol, decl: Decl, tag_list: &[i64]) -> String {
        let mut out = String::new();

        if sym.file_scope != GLOBAL_SCOPE {
            out.push_str("static ");
        }

        if decl == Decl::Enumerator {
            out.push_str("enum ");
        } else {
            if decl == Decl::Function {
                out.push_str(if sym.usage.contains(Usage::NATIVE) {
                    "native "
                } else {
                    "forward "
                });
            }
            if !sym.usage.contains(Usage::ENUM_FIELD) && sym.usage.contains(Usage::STOCK) {
                out.push_str("stock ");
            }
            if decl == Decl::Variable {
                out.push_str("new ");
            }
        }

        if decl != Decl::Function && sym.usage.contains(Usage::CONST) {
            out.push_str("const ");
        }

        if sym.ident == Ident::Reference {
            out.push('&');
        }

        if decl != Decl::Enumerator {
            self.push_tag_annotation(&mut out, tag_list);
        }

        out.push_str(&sym.name);
        out
    }

    fn push_tag_annotation(&self, out: &mut String, tag_list: &[i64]) {
        if tag_list.len() > 1 {
            out.push('{');
        }
        for (i, &tag) in tag_list.iter().enumerate() {
            if tag != 0 || tag_list.len() > 1 {
                if let Some(known) = self.tags.iter().find(|t| t.value == tag) {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&known.name);
                }
            }
        }
        if tag_list.len() > 1 {
            out.push('}');
        }
        if !tag_list.is_empty() && tag_list[0] != 0 {
            out.push_str(": ");
        }
    }

    /// Variable dimension suffix: `[N]` for sized dims, `[EnumName]` for
    /// dims sized by an enumerator's cell count.
    fn push_dims(&self, out: &mut String, dims: &[ArrayDim]) {
        for dim in dims {
            match dim.kind {
                ArrayKind::Integer => {
                    out.push('[');
                    out.push_str(&dim.value.to_string());
                    out.push(']');
                }
                ArrayKind::Enumerator => {
                    if let Some(en) = self.enumerators.iter().find(|e| e.sym.tag_id == dim.value) {
                        out.push('[');
                        out.push_str(&en.sym.name);
                        out.push(']');
                    }
                }
            }
        }
    }

    /// Enum fields only show a size suffix when it is informative: a cell
    /// count above 1, or an enumerator-sized dimension.
    fn push_field_dims(&self, out: &mut String, dims: &[ArrayDim]) {
        let Some(dim) = dims.first() else { return };
        match dim.kind {
            ArrayKind::Integer if dim.value > 1 => {
                out.push('[');
                out.push_str(&dim.value.to_string());
                out.push(']');
            }
            ArrayKind::Integer => {}
            ArrayKind::Enumerator => {
                if let Some(en) = self.enumerators.iter().find(|e| e.sym.tag_id == dim.value) {
                    out.push('[');
                    out.push_str(&en.sym.name);
                    out.push(']');
                }
            }
        }
    }

    /// Resolve a tagged default back to the named constant with that tag and
    /// value, preferred over the literal default.
    fn default_constant(&self, arg: &Argument) -> Option<&str> {
        if arg.reference_tag == 0 {
            return None;
        }
        self.constants
            .iter()
            .find(|c| c.sym.tag_id == arg.reference_tag && c.value == arg.reference_value)
            .map(|c| c.sym.name.as_str())
    }
}
