//! Pawn Language Server Protocol implementation
//!
//! Provides IDE features over the published symbol model:
//! - Hover information (declaration strings, macro expansion previews)
//! - Completions across every symbol collection
//! - Signature help with active-parameter tracking
//! - Diagnostics from analyzer error records

pub mod backend;
pub mod diagnostics;
pub mod position;

pub use backend::PawnLanguageServer;
