#![forbid(unsafe_code)]
//! Pawn Language Server
//!
//! A language server for the Pawn scripting language. An external analysis
//! compiler reports symbols and diagnostics as line-oriented JSON; this crate
//! maintains the in-memory symbol model built from that output, renders
//! canonical declaration strings, and emulates Pawn's `#define` substitution
//! macros well enough to preview expansions at the cursor.
//!
//! ## Modules
//!
//! - `grammar`: the core — symbol table, declaration rendering, macro matching
//! - `analysis`: analyzer process integration and per-root analysis units
//! - `lsp`: the tower-lsp frontend (hover, completion, signature help)
//! - `config`: client-supplied settings
//!
//! ## Panic Policy
//!
//! Production code propagates failures with `Result`/`Option`; a lookup miss
//! is a `None`, never an error. `.unwrap()` and `.expect()` are acceptable in
//! tests only.

pub mod analysis;
pub mod config;
pub mod grammar;
pub mod lsp;

pub use grammar::{GrammarTable, SymbolMatch};
pub use lsp::PawnLanguageServer;
