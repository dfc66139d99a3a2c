//! Symbol model and macro emulation for one analysis unit
//!
//! This module is the language-intelligence core:
//! - `records`: wire records from the analysis compiler, validated at the boundary
//! - `symbol`: the domain model (ident discriminant, usage flags, variants)
//! - `table`: ingestion policy, dedup, and lookup predicates
//! - `detail`: canonical declaration strings for hover/completion/signatures
//! - `matcher`: `#define` pattern matching and template expansion
//! - `preview`: one-shot macro-expansion preview at the cursor

pub mod detail;
pub mod matcher;
pub mod preview;
pub mod records;
pub mod symbol;
pub mod table;

pub use table::{GrammarTable, SymbolMatch};
