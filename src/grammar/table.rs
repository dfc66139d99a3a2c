//! Grammar table: all ingested records for one analysis unit
//!
//! The table owns the per-kind ingestion policy, the first-wins dedup rule,
//! and every lookup predicate the request handlers use. A table is built
//! offline during an analysis pass and published as an immutable snapshot;
//! nothing here mutates after publication.

use std::path::{Component, Path, PathBuf};

use crate::grammar::detail::DetailRenderer;
use crate::grammar::records::RecordLine;
use crate::grammar::symbol::{
    ConstExpr, Enumerator, FileId, Function, SourceFile, Substitute, Tag, Variable, GLOBAL_SCOPE,
};

/// How a batch of one record kind combines with the table's current
/// contents for that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPolicy {
    /// The batch replaces the previous pass's records wholesale.
    Replace,
    /// The batch is appended, then deduplicated against the accumulated set.
    Merge,
}

/// Best match for a name, in the fixed precedence order used by hover.
#[derive(Debug, Clone, Copy)]
pub enum SymbolMatch<'a> {
    Substitute(&'a Substitute),
    Tag(&'a Tag),
    Constant(&'a ConstExpr),
    Enumerator(&'a Enumerator),
    Variable(&'a Variable),
    Function(&'a Function),
}

impl SymbolMatch<'_> {
    /// The matched symbol's rendered declaration string.
    pub fn detail(&self) -> &str {
        match self {
            SymbolMatch::Substitute(s) => &s.detail,
            SymbolMatch::Tag(t) => &t.detail,
            SymbolMatch::Constant(c) => &c.sym.detail,
            SymbolMatch::Enumerator(e) => &e.sym.detail,
            SymbolMatch::Variable(v) => &v.sym.detail,
            SymbolMatch::Function(f) => &f.sym.detail,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GrammarTable {
    files: Vec<SourceFile>,
    enumerators: Vec<Enumerator>,
    functions: Vec<Function>,
    variables: Vec<Variable>,
    substitutions: Vec<Substitute>,
    constant_expressions: Vec<ConstExpr>,
    tags: Vec<Tag>,
}

impl GrammarTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fresh pass's table with the Merge-kind collections of the
    /// previous snapshot, so variables and constant expressions accumulate
    /// across passes while every Replace kind starts empty.
    pub fn carry_over(previous: &GrammarTable) -> Self {
        Self {
            variables: previous.variables.clone(),
            constant_expressions: previous.constant_expressions.clone(),
            ..Self::default()
        }
    }

    /// Ingest one parsed analyzer line. Error records are not table data and
    /// are returned to the caller.
    pub fn ingest_line(&mut self, line: RecordLine) -> Option<crate::grammar::records::ErrorRecord> {
        match line {
            RecordLine::Files(records) => {
                self.add_files(records.into_iter().map(|r| r.into_domain()).collect())
            }
            RecordLine::Tags(records) => {
                self.add_tags(records.into_iter().map(|r| r.into_domain()).collect())
            }
            RecordLine::Constants(records) => self.add_constant_expressions(
                records.into_iter().filter_map(|r| r.into_domain()).collect(),
            ),
            RecordLine::Enumerators(records) => {
                self.add_enumerators(records.into_iter().map(|r| r.into_domain()).collect())
            }
            RecordLine::Variables(records) => {
                self.add_variables(records.into_iter().filter_map(|r| r.into_domain()).collect())
            }
            RecordLine::Functions(records) => {
                self.add_functions(records.into_iter().filter_map(|r| r.into_domain()).collect())
            }
            RecordLine::Substitutes(records) => {
                self.add_substitutes(records.into_iter().map(|r| r.into_domain()).collect())
            }
            RecordLine::Error(record) => return Some(record),
        }
        None
    }

    pub fn add_files(&mut self, mut files: Vec<SourceFile>) {
        for file in &mut files {
            file.path = normalize_path(&file.path);
        }
        ingest(&mut self.files, files, IngestPolicy::Replace, |a, b| {
            a.path == b.path
        });
    }

    pub fn add_tags(&mut self, tags: Vec<Tag>) {
        ingest(&mut self.tags, tags, IngestPolicy::Replace, |a, b| {
            a.name == b.name
        });
    }

    /// Enumerators replace; each field is additionally registered as a
    /// standalone constant expression so it is independently lookup-able.
    pub fn add_enumerators(&mut self, enumerators: Vec<Enumerator>) {
        ingest(
            &mut self.enumerators,
            enumerators,
            IngestPolicy::Replace,
            |a, b| a.sym.name == b.sym.name && a.sym.file_scope == b.sym.file_scope,
        );

        let fields: Vec<ConstExpr> = self
            .enumerators
            .iter()
            .flat_map(|e| e.fields.iter().cloned())
            .collect();
        self.add_constant_expressions(fields);
    }

    pub fn add_functions(&mut self, functions: Vec<Function>) {
        ingest(
            &mut self.functions,
            functions,
            IngestPolicy::Replace,
            |a, b| a.sym.name == b.sym.name && a.sym.file_scope == b.sym.file_scope,
        );
    }

    pub fn add_variables(&mut self, variables: Vec<Variable>) {
        ingest(
            &mut self.variables,
            variables,
            IngestPolicy::Merge,
            |a, b| a.sym.name == b.sym.name && a.sym.file_scope == b.sym.file_scope,
        );
    }

    pub fn add_constant_expressions(&mut self, constants: Vec<ConstExpr>) {
        ingest(
            &mut self.constant_expressions,
            constants,
            IngestPolicy::Merge,
            |a, b| a.sym.name == b.sym.name && a.sym.file_scope == b.sym.file_scope,
        );
    }

    /// Substitutions replace. Patterns containing the analyzer's `|||`
    /// internal marker are not real macros and are dropped.
    pub fn add_substitutes(&mut self, substitutions: Vec<Substitute>) {
        let substitutions: Vec<Substitute> = substitutions
            .into_iter()
            .filter(|s| !s.pattern.contains("|||"))
            .collect();
        ingest(
            &mut self.substitutions,
            substitutions,
            IngestPolicy::Replace,
            |a, b| a.pattern == b.pattern,
        );
    }

    // ------------------------------------------------------------------------
    // Read-only queries
    // ------------------------------------------------------------------------

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn enumerators(&self) -> &[Enumerator] {
        &self.enumerators
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn substitutions(&self) -> &[Substitute] {
        &self.substitutions
    }

    pub fn constant_expressions(&self) -> &[ConstExpr] {
        &self.constant_expressions
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// The analyzer's index for `path`, or [`GLOBAL_SCOPE`] if the file is
    /// not part of this unit.
    pub fn file_index(&self, path: &Path) -> FileId {
        let normalized = normalize_path(path);
        self.files
            .iter()
            .find(|f| f.path == normalized)
            .map(|f| f.number)
            .unwrap_or(GLOBAL_SCOPE)
    }

    pub fn find_substitute(&self, token: &str) -> Option<&Substitute> {
        self.substitutions.iter().find(|s| s.matches_token(token))
    }

    pub fn find_tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.name == name)
    }

    /// Constant expressions are looked up by name alone; constants are
    /// scope-agnostic at query time.
    pub fn find_constant(&self, name: &str) -> Option<&ConstExpr> {
        self.constant_expressions.iter().find(|c| c.sym.name == name)
    }

    pub fn find_enumerator(&self, name: &str, scope: FileId) -> Option<&Enumerator> {
        self.enumerators
            .iter()
            .find(|e| e.sym.name == name && e.sym.visible_from(scope))
    }

    pub fn find_variable(&self, name: &str, scope: FileId) -> Option<&Variable> {
        self.variables
            .iter()
            .find(|v| v.sym.name == name && v.sym.visible_from(scope))
    }

    pub fn find_function(&self, name: &str, scope: FileId) -> Option<&Function> {
        self.functions
            .iter()
            .find(|f| f.sym.name == name && f.sym.visible_from(scope))
    }

    /// Best match across every collection, in the fixed precedence order
    /// substitution → tag → constant expression → enumerator → variable →
    /// function.
    pub fn find_symbol(&self, name: &str, scope: FileId) -> Option<SymbolMatch<'_>> {
        if let Some(s) = self.find_substitute(name) {
            return Some(SymbolMatch::Substitute(s));
        }
        if let Some(t) = self.find_tag(name) {
            return Some(SymbolMatch::Tag(t));
        }
        if let Some(c) = self.find_constant(name) {
            return Some(SymbolMatch::Constant(c));
        }
        if let Some(e) = self.find_enumerator(name, scope) {
            return Some(SymbolMatch::Enumerator(e));
        }
        if let Some(v) = self.find_variable(name, scope) {
            return Some(SymbolMatch::Variable(v));
        }
        if let Some(f) = self.find_function(name, scope) {
            return Some(SymbolMatch::Function(f));
        }
        None
    }

    /// The enumerator declaring a field with this name, used to rebuild the
    /// enclosing-enum hover header without a stored parent reference.
    pub fn parent_enumerator_of(&self, field_name: &str) -> Option<&Enumerator> {
        self.enumerators
            .iter()
            .find(|e| e.fields.iter().any(|f| f.sym.name == field_name))
    }

    // ------------------------------------------------------------------------
    // Detail refresh
    // ------------------------------------------------------------------------

    /// Recompute every cached `detail` string. Must run after each pass's
    /// full batch is ingested: tag and enumerator resolution can change the
    /// rendering of symbols that were not themselves re-ingested.
    pub fn refresh_details(&mut self) {
        for sub in &mut self.substitutions {
            sub.detail = DetailRenderer::substitute(sub);
        }
        for tag in &mut self.tags {
            tag.detail = DetailRenderer::tag(tag);
        }

        let renderer = DetailRenderer::new(&self.tags, &self.enumerators, &self.constant_expressions);

        let enum_details: Vec<(String, Vec<String>)> =
            self.enumerators.iter().map(|e| renderer.enumerator(e)).collect();
        let func_details: Vec<(String, Vec<String>)> =
            self.functions.iter().map(|f| renderer.function(f)).collect();
        let var_details: Vec<String> = self.variables.iter().map(|v| renderer.variable(v)).collect();
        let const_details: Vec<String> = self
            .constant_expressions
            .iter()
            .map(|c| renderer.constant(c))
            .collect();

        for (en, (detail, field_details)) in self.enumerators.iter_mut().zip(enum_details) {
            en.sym.detail = detail;
            for (field, field_detail) in en.fields.iter_mut().zip(field_details) {
                field.sym.detail = field_detail;
            }
        }
        for (func, (detail, arg_details)) in self.functions.iter_mut().zip(func_details) {
            func.sym.detail = detail;
            for (arg, arg_detail) in func.args.iter_mut().zip(arg_details) {
                arg.sym.detail = arg_detail;
            }
        }
        for (var, detail) in self.variables.iter_mut().zip(var_details) {
            var.sym.detail = detail;
        }
        for (konst, detail) in self.constant_expressions.iter_mut().zip(const_details) {
            konst.sym.detail = detail;
        }
    }
}

/// Apply `policy`, then keep the earliest record of every colliding pair.
fn ingest<T>(current: &mut Vec<T>, incoming: Vec<T>, policy: IngestPolicy, collides: impl Fn(&T, &T) -> bool) {
    let combined = match policy {
        IngestPolicy::Replace => incoming,
        IngestPolicy::Merge => {
            let mut combined = std::mem::take(current);
            combined.extend(incoming);
            combined
        }
    };
    *current = dedup_first_wins(combined, collides);
}

/// First-wins dedup: a later record is discarded when any earlier kept
/// record collides with it.
fn dedup_first_wins<T>(items: Vec<T>, collides: impl Fn(&T, &T) -> bool) -> Vec<T> {
    let mut kept: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !kept.iter().any(|k| collides(k, &item)) {
            kept.push(item);
        }
    }
    kept
}

/// Lexical path normalization (separators, `.` and `..` segments), so paths
/// from the analyzer and from the editor compare equal without touching the
/// file system.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}
