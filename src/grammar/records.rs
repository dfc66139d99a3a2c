//! Wire records from the analysis compiler
//!
//! The analyzer prints one JSON object per line, tagged by `type` with the
//! payload under `contents`. This module deserializes those lines and
//! converts them into the domain model, validating the `ident` discriminant
//! and the usage flag word once here. A line that fails to parse or convert
//! is skipped by the caller; it never invalidates the rest of the batch.

use serde::Deserialize;
use std::path::PathBuf;

use crate::grammar::symbol::{
    Argument, ArrayDim, ArrayKind, ConstExpr, DefaultValue, Enumerator, FileId, Function, Ident,
    SourceFile, Substitute, Symbol, Tag, Usage, Variable, GLOBAL_SCOPE,
};

/// One analyzer stdout line.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "contents", rename_all = "lowercase")]
pub enum RecordLine {
    Files(Vec<FileRecord>),
    Tags(Vec<TagRecord>),
    Constants(Vec<ConstExprRecord>),
    Enumerators(Vec<EnumeratorRecord>),
    Variables(Vec<VariableRecord>),
    Functions(Vec<FunctionRecord>),
    Substitutes(Vec<SubstituteRecord>),
    Error(ErrorRecord),
}

impl RecordLine {
    /// Parse one stdout line. The analyzer emits bare `Infinity` tokens for
    /// out-of-range rationals, which is not valid JSON; they are scrubbed to
    /// `0.0` first.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&replace_word(line, "Infinity", "0.0"))
    }
}

/// Replace whole-word occurrences of `word` (no identifier characters on
/// either side) with `replacement`.
fn replace_word(line: &str, word: &str, replacement: &str) -> String {
    let bytes = line.as_bytes();
    let is_word_byte = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
    let mut out = String::with_capacity(line.len());
    let mut i = 0;

    while let Some(pos) = line[i..].find(word) {
        let at = i + pos;
        let end = at + word.len();
        let bounded = (at == 0 || !is_word_byte(bytes[at - 1]))
            && (end == bytes.len() || !is_word_byte(bytes[end]));

        out.push_str(&line[i..at]);
        out.push_str(if bounded { replacement } else { word });
        i = end;
    }

    out.push_str(&line[i..]);
    out
}

fn default_scope() -> FileId {
    GLOBAL_SCOPE
}

/// Constant records are constant expressions by definition; tolerate the
/// analyzer omitting the discriminant on them.
fn default_constexpr_ident() -> u8 {
    8
}

#[derive(Debug, Deserialize)]
pub struct FileRecord {
    pub file_path: PathBuf,
    pub number: FileId,
}

#[derive(Debug, Deserialize)]
pub struct TagRecord {
    pub name: String,
    pub value: i64,
    #[serde(default)]
    pub index: i64,
}

#[derive(Debug, Deserialize)]
pub struct ArrayRecord {
    pub array_type: u8,
    pub array_value: i64,
}

#[derive(Debug, Deserialize)]
pub struct ConstExprRecord {
    pub name: String,
    #[serde(default = "default_constexpr_ident")]
    pub ident: u8,
    #[serde(default)]
    pub usage: u32,
    #[serde(default)]
    pub tagid: i64,
    #[serde(default = "default_scope")]
    pub file_number: FileId,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub array: Vec<ArrayRecord>,
}

#[derive(Debug, Deserialize)]
pub struct EnumeratorRecord {
    pub name: String,
    #[serde(default)]
    pub tagid: i64,
    #[serde(default)]
    pub usage: u32,
    #[serde(default = "default_scope")]
    pub file_number: FileId,
    #[serde(default)]
    pub field: Vec<EnumeratorFieldRecord>,
}

#[derive(Debug, Deserialize)]
pub struct EnumeratorFieldRecord {
    pub name: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub array: Vec<ArrayRecord>,
}

#[derive(Debug, Deserialize)]
pub struct VariableRecord {
    pub name: String,
    pub ident: u8,
    #[serde(default)]
    pub usage: u32,
    #[serde(default)]
    pub tagid: i64,
    #[serde(default = "default_scope")]
    pub file_number: FileId,
    #[serde(default)]
    pub array: Vec<ArrayRecord>,
}

#[derive(Debug, Deserialize)]
pub struct FunctionRecord {
    pub name: String,
    pub ident: u8,
    #[serde(default)]
    pub usage: u32,
    #[serde(default)]
    pub tagid: i64,
    #[serde(default = "default_scope")]
    pub file_number: FileId,
    #[serde(default)]
    pub argument: Vec<ArgumentRecord>,
}

#[derive(Debug, Deserialize)]
pub struct ArgumentRecord {
    pub name: String,
    pub ident: u8,
    #[serde(default)]
    pub usage: u32,
    #[serde(default)]
    pub tagid: i64,
    #[serde(default)]
    pub dimension: u32,
    #[serde(default)]
    pub tag_list: Vec<i64>,
    #[serde(default)]
    pub hasdefault: u32,
    #[serde(default)]
    pub default_value: DefaultValueRecord,
    /// Tag id of the default's named-constant reference; the analyzer emits
    /// a string here when no reference exists.
    #[serde(default)]
    pub reference: ReferenceRecord,
    #[serde(default)]
    pub reference_value: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DefaultValueRecord {
    Number(f64),
    Text(String),
}

impl Default for DefaultValueRecord {
    fn default() -> Self {
        DefaultValueRecord::Number(0.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReferenceRecord {
    Tag(i64),
    Text(String),
}

impl Default for ReferenceRecord {
    fn default() -> Self {
        ReferenceRecord::Tag(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct SubstituteRecord {
    pub pattern: String,
    pub match_length: usize,
    pub substitution: String,
}

/// Diagnostic record from the analyzer; consumed by the LSP diagnostics
/// publisher, never by the grammar table.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorRecord {
    pub file_name: PathBuf,
    pub error_id: u32,
    /// First affected line, or -1 when only `last_line` is known
    pub first_line: i64,
    pub last_line: i64,
    pub error_type: u8,
    pub error_message: String,
}

// ============================================================================
// Boundary conversions into the domain model
// ============================================================================

fn dims(records: Vec<ArrayRecord>) -> Vec<ArrayDim> {
    records
        .into_iter()
        .filter_map(|r| {
            let kind = match r.array_type {
                1 => ArrayKind::Integer,
                2 => ArrayKind::Enumerator,
                _ => return None,
            };
            Some(ArrayDim {
                kind,
                value: r.array_value,
            })
        })
        .collect()
}

impl FileRecord {
    pub fn into_domain(self) -> SourceFile {
        SourceFile {
            path: self.file_path,
            number: self.number,
        }
    }
}

impl TagRecord {
    pub fn into_domain(self) -> Tag {
        Tag {
            name: self.name,
            value: self.value,
            index: self.index,
            detail: String::new(),
        }
    }
}

impl ConstExprRecord {
    pub fn into_domain(self) -> Option<ConstExpr> {
        let ident = Ident::from_code(self.ident)?;
        Some(ConstExpr {
            sym: Symbol::new(
                self.name,
                ident,
                Usage::from_bits_truncate(self.usage),
                self.tagid,
                self.file_number,
            ),
            value: self.value,
            array: dims(self.array),
        })
    }
}

impl EnumeratorRecord {
    /// Fields carry no tag or scope on the wire; both are inherited from the
    /// enumerator here, once, instead of through a parent back-reference.
    pub fn into_domain(self) -> Enumerator {
        let usage = Usage::from_bits_truncate(self.usage) | Usage::DEFINED | Usage::ENUM_ROOT;
        let sym = Symbol::new(
            self.name,
            Ident::ConstExpr,
            usage,
            self.tagid,
            self.file_number,
        );
        let fields = self
            .field
            .into_iter()
            .map(|f| ConstExpr {
                sym: Symbol::new(
                    f.name,
                    Ident::ConstExpr,
                    Usage::DEFINED | Usage::ENUM_FIELD,
                    self.tagid,
                    self.file_number,
                ),
                value: f.value,
                array: dims(f.array),
            })
            .collect();

        Enumerator { sym, fields }
    }
}

impl VariableRecord {
    pub fn into_domain(self) -> Option<Variable> {
        let ident = Ident::from_code(self.ident)?;
        Some(Variable {
            sym: Symbol::new(
                self.name,
                ident,
                Usage::from_bits_truncate(self.usage),
                self.tagid,
                self.file_number,
            ),
            array: dims(self.array),
        })
    }
}

impl FunctionRecord {
    pub fn into_domain(self) -> Option<Function> {
        let ident = Ident::from_code(self.ident)?;
        let file_number = self.file_number;
        let args = self
            .argument
            .into_iter()
            .filter_map(|a| a.into_domain(file_number))
            .collect();

        Some(Function {
            sym: Symbol::new(
                self.name,
                ident,
                Usage::from_bits_truncate(self.usage),
                self.tagid,
                file_number,
            ),
            args,
        })
    }
}

impl ArgumentRecord {
    fn into_domain(self, file_number: FileId) -> Option<Argument> {
        let ident = Ident::from_code(self.ident)?;
        let tag_list = if self.tag_list.is_empty() {
            vec![self.tagid]
        } else {
            self.tag_list
        };
        let reference_tag = match self.reference {
            ReferenceRecord::Tag(tag) => tag,
            ReferenceRecord::Text(_) => 0,
        };

        Some(Argument {
            sym: Symbol::new(
                self.name,
                ident,
                Usage::from_bits_truncate(self.usage),
                self.tagid,
                file_number,
            ),
            dimension: self.dimension,
            tag_list,
            has_default: self.hasdefault != 0,
            default_value: match self.default_value {
                DefaultValueRecord::Number(n) => DefaultValue::Number(n),
                DefaultValueRecord::Text(s) => DefaultValue::Text(s),
            },
            reference_tag,
            reference_value: self.reference_value,
        })
    }
}

impl SubstituteRecord {
    pub fn into_domain(self) -> Substitute {
        Substitute {
            pattern: self.pattern,
            match_length: self.match_length,
            substitution: self.substitution,
            detail: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_substitutes_line() {
        let line = r#"{"type":"substitutes","contents":[{"pattern":"MAX(%0,%1)","match_length":3,"substitution":"((%0)>(%1)?(%0):(%1))"}]}"#;
        let RecordLine::Substitutes(subs) = RecordLine::parse(line).unwrap() else {
            panic!("wrong record kind");
        };
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].match_length, 3);
    }

    #[test]
    fn test_parse_scrubs_infinity() {
        let line = r#"{"type":"constants","contents":[{"name":"HUGE","ident":8,"value":Infinity}]}"#;
        let RecordLine::Constants(consts) = RecordLine::parse(line).unwrap() else {
            panic!("wrong record kind");
        };
        assert_eq!(consts[0].value, 0.0);
    }

    #[test]
    fn test_replace_word_respects_boundaries() {
        assert_eq!(replace_word("MyInfinity", "Infinity", "0.0"), "MyInfinity");
        assert_eq!(replace_word("Infinity2", "Infinity", "0.0"), "Infinity2");
        assert_eq!(replace_word("[Infinity]", "Infinity", "0.0"), "[0.0]");
    }

    #[test]
    fn test_malformed_line_is_error_not_panic() {
        assert!(RecordLine::parse("not json").is_err());
        assert!(RecordLine::parse(r#"{"type":"unknown","contents":[]}"#).is_err());
    }

    #[test]
    fn test_invalid_ident_code_rejected() {
        let record = VariableRecord {
            name: "v".to_string(),
            ident: 42,
            usage: 0,
            tagid: 0,
            file_number: GLOBAL_SCOPE,
            array: vec![],
        };
        assert!(record.into_domain().is_none());
    }

    #[test]
    fn test_enum_fields_inherit_tag_and_scope() {
        let record = EnumeratorRecord {
            name: "Color".to_string(),
            tagid: 9,
            usage: 0,
            file_number: 2,
            field: vec![EnumeratorFieldRecord {
                name: "RED".to_string(),
                value: 0.0,
                array: vec![],
            }],
        };
        let en = record.into_domain();
        assert!(en.sym.usage.contains(Usage::ENUM_ROOT));
        assert_eq!(en.fields[0].sym.tag_id, 9);
        assert_eq!(en.fields[0].sym.file_scope, 2);
        assert!(en.fields[0].is_enum_field());
    }

    #[test]
    fn test_untagged_reference_variants() {
        let line = r#"{"type":"functions","contents":[{"name":"f","ident":9,"argument":[
            {"name":"a","ident":1,"hasdefault":1,"default_value":"text","reference":"none"},
            {"name":"b","ident":1,"hasdefault":1,"default_value":5,"reference":7,"reference_value":5}
        ]}]}"#;
        let RecordLine::Functions(funcs) = RecordLine::parse(line).unwrap() else {
            panic!("wrong record kind");
        };
        let func = funcs.into_iter().next().unwrap().into_domain().unwrap();
        assert_eq!(func.args[0].reference_tag, 0);
        assert!(matches!(func.args[0].default_value, DefaultValue::Text(ref s) if s == "text"));
        assert_eq!(func.args[1].reference_tag, 7);
    }
}
