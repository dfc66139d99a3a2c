//! External analysis process integration
//!
//! - `manager`: analysis units per workspace folder / loose file
//! - `runner`: spawning the analyzer and publishing its output

pub mod manager;
pub mod runner;

pub use manager::{AnalysisManager, AnalysisUnit};
pub use runner::{run, AnalysisError, AnalysisOutcome};
