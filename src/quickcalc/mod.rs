// src/quickcalc/mod.rs

pub mod calculation;
pub mod config;
pub mod evaluator;
pub mod format;
pub mod rewriter;
pub mod scanner;

// Export the per-request types so they are reachable as quickcalc::QuickCalc
// as well as through their modules.
pub use calculation::{Answer, QuickCalc};
