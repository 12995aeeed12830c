//! Palisade - deletion gate for agent shell commands
//!
//! Pre-execution hook that inspects Bash commands an AI coding agent is
//! about to run and blocks file deletions reaching outside the working
//! directory.
//!
//! This library exposes the analysis pipeline and verdict types for testing
//! and extension.

pub mod analyze;
pub mod classify;
pub mod hook;
pub mod install;
pub mod parse;
pub mod resolve;
pub mod verdict;

// Re-export the pipeline surface for convenient access
pub use analyze::{analyze_line, Analysis};
pub use hook::{evaluate_request, run_gate, HookRequest};
pub use resolve::GuardContext;
pub use verdict::{Blocked, Verdict};
