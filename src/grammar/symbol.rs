//! Domain model for analyzer-reported symbols
//!
//! Every record kind the analysis compiler reports is represented here as an
//! explicit struct around a shared [`Symbol`] core. Variant discrimination is
//! the [`Ident`] enum plus the [`Usage`] flag word; both are validated once at
//! the ingestion boundary (`records`), never re-probed downstream.

use std::path::PathBuf;

use bitflags::bitflags;

/// Analysis-unit file index.
pub type FileId = i32;

/// Sentinel file index for symbols visible from any file (predefined or
/// global declarations).
pub const GLOBAL_SCOPE: FileId = -1;

/// Symbol variant discriminant, matching the compiler's `ident` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ident {
    Label,
    /// Cell with an address, fetched directly (lvalue)
    Variable,
    /// Like `Variable`, but must be dereferenced
    Reference,
    Array,
    /// Array passed by reference
    RefArray,
    /// Array element, fetched indirectly
    ArrayCell,
    /// Array element, character from a cell
    ArrayChar,
    /// Expression result with no address (rvalue)
    Expression,
    /// Constant expression or constant symbol
    ConstExpr,
    Function,
    RefFunc,
    /// `...` argument list
    VarArgs,
}

impl Ident {
    /// Decode a wire ident code. Unknown codes are rejected so a malformed
    /// record is dropped instead of mis-tagged.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Ident::Label,
            1 => Ident::Variable,
            2 => Ident::Reference,
            3 => Ident::Array,
            4 => Ident::RefArray,
            5 => Ident::ArrayCell,
            6 => Ident::ArrayChar,
            7 => Ident::Expression,
            8 => Ident::ConstExpr,
            9 => Ident::Function,
            10 => Ident::RefFunc,
            11 => Ident::VarArgs,
            _ => return None,
        })
    }
}

bitflags! {
    /// The compiler's `usage` bit word.
    ///
    /// The bits are context-dependent the same way they are in the compiler:
    /// `RETVALUE`/`WRITTEN`, `PROTOTYPED`/`CONST`/`PREDEFINED`,
    /// `NATIVE`/`ENUM_ROOT` and `STOCK`/`ENUM_FIELD` share bit positions.
    /// Which reading applies follows from the symbol's [`Ident`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Usage: u32 {
        const DEFINED    = 0x001;
        const READ       = 0x002;
        const WRITTEN    = 0x004;
        const RETVALUE   = 0x004;
        const CONST      = 0x008;
        const PROTOTYPED = 0x008;
        const PREDEFINED = 0x008;
        const PUBLIC     = 0x010;
        const NATIVE     = 0x020;
        const ENUM_ROOT  = 0x020;
        const STOCK      = 0x040;
        const ENUM_FIELD = 0x040;
        const MISSING    = 0x080;
        const FORWARD    = 0x100;
    }
}

/// Attributes shared by every symbol variant.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ident: Ident,
    pub usage: Usage,
    /// Tag id, 0 = untagged
    pub tag_id: i64,
    /// Owning file index, or [`GLOBAL_SCOPE`]
    pub file_scope: FileId,
    /// Cached declaration string, recomputed by the detail-refresh pass
    pub detail: String,
}

impl Symbol {
    pub fn new(name: String, ident: Ident, usage: Usage, tag_id: i64, file_scope: FileId) -> Self {
        Self {
            name,
            ident,
            usage,
            tag_id,
            file_scope,
            detail: String::new(),
        }
    }

    /// Scope predicate: global symbols are visible from any file, file-scoped
    /// symbols only from their own file.
    pub fn visible_from(&self, scope: FileId) -> bool {
        self.file_scope == GLOBAL_SCOPE || self.file_scope == scope
    }
}

/// One array dimension of a variable or enum field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayDim {
    pub kind: ArrayKind,
    /// Element count for `Integer` dims, tag id of the sizing enumerator for
    /// `Enumerator` dims
    pub value: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    Integer,
    Enumerator,
}

/// A global or file-static variable (possibly an array).
#[derive(Debug, Clone)]
pub struct Variable {
    pub sym: Symbol,
    pub array: Vec<ArrayDim>,
}

/// A constant expression: a plain named constant, an enumerator root, or an
/// enumerator field (discriminated by the `ENUM_ROOT`/`ENUM_FIELD` flags).
#[derive(Debug, Clone)]
pub struct ConstExpr {
    pub sym: Symbol,
    pub value: f64,
    pub array: Vec<ArrayDim>,
}

impl ConstExpr {
    pub fn is_enum_root(&self) -> bool {
        self.sym.ident == Ident::ConstExpr && self.sym.usage.contains(Usage::ENUM_ROOT)
    }

    pub fn is_enum_field(&self) -> bool {
        self.sym.ident == Ident::ConstExpr && self.sym.usage.contains(Usage::ENUM_FIELD)
    }
}

/// A named enumeration and its ordered fields.
///
/// Fields never hold a reference back to their enumerator; rendering passes
/// the parent as context instead.
#[derive(Debug, Clone)]
pub struct Enumerator {
    pub sym: Symbol,
    pub fields: Vec<ConstExpr>,
}

/// A function argument.
#[derive(Debug, Clone)]
pub struct Argument {
    pub sym: Symbol,
    /// Declared dimension count (sizes are unknown for by-reference arrays)
    pub dimension: u32,
    /// Accepted tags; more than one entry means a tag union
    pub tag_list: Vec<i64>,
    pub has_default: bool,
    pub default_value: DefaultValue,
    /// Tag id for re-resolving the default to a named constant, 0 = none
    pub reference_tag: i64,
    pub reference_value: f64,
}

/// An argument default, numeric or textual.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    Number(f64),
    Text(String),
}

/// A forward-declared, native, or defined function with its argument list.
#[derive(Debug, Clone)]
pub struct Function {
    pub sym: Symbol,
    pub args: Vec<Argument>,
}

/// A `#define` substitution macro.
#[derive(Debug, Clone)]
pub struct Substitute {
    /// Macro name prefix followed by the pattern template
    pub pattern: String,
    /// Byte length of the literal name prefix used for matching
    pub match_length: usize,
    /// Replacement template with `%0`–`%9` placeholders
    pub substitution: String,
    pub detail: String,
}

impl Substitute {
    /// The literal macro name this pattern starts with.
    pub fn name_prefix(&self) -> &str {
        self.pattern.get(..self.match_length).unwrap_or(&self.pattern)
    }

    /// Whether `token` is exactly this macro's name.
    pub fn matches_token(&self, token: &str) -> bool {
        !token.is_empty() && self.pattern.get(..self.match_length) == Some(token)
    }
}

/// A tag name with its numeric id.
#[derive(Debug, Clone)]
pub struct Tag {
    pub name: String,
    pub value: i64,
    pub index: i64,
    pub detail: String,
}

/// One file of the analysis unit, as numbered by the analyzer.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub number: FileId,
}
