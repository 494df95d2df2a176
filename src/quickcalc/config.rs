//! Configuration for QuickCalc.
//!
//! [`QuickCalcConfig`] tells the bc evaluator what to launch and how long to
//! wait, and holds the text shown for an answer that could not be computed.
//! Users construct it manually; no config-file parsing is involved.
//!
//! # Example
//!
//! ```rust
//! use quickcalc::QuickCalcConfig;
//!
//! let config = QuickCalcConfig::default().with_timeout(2);
//! assert_eq!(config.timeout_secs, 2);
//! assert_eq!(config.placeholder, "...");
//! ```

use std::path::PathBuf;

/// Settings for evaluating a rewritten query.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickCalcConfig {
    /// Evaluator executable, looked up on `PATH` when relative.
    pub bc_program: PathBuf,
    /// Arguments passed to the evaluator; `-l` loads bc's math library.
    pub bc_args: Vec<String>,
    /// Seconds to wait for the evaluator before giving up.
    pub timeout_secs: u64,
    /// Display text for an invalid answer.
    pub placeholder: String,
}

impl QuickCalcConfig {
    pub fn with_bc_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.bc_program = program.into();
        self
    }

    pub fn with_bc_args(mut self, args: Vec<String>) -> Self {
        self.bc_args = args;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

impl Default for QuickCalcConfig {
    /// `bc -l` with a five second timeout and `...` as the placeholder.
    fn default() -> Self {
        Self {
            bc_program: PathBuf::from("bc"),
            bc_args: vec!["-l".to_string()],
            timeout_secs: 5,
            placeholder: "...".to_string(),
        }
    }
}
