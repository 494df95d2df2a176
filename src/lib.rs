//! # QuickCalc
//!
//! QuickCalc turns shorthand arithmetic, the kind typed into a launcher bar,
//! into a strict program for the `bc` arbitrary-precision calculator, and
//! formats the number that comes back.
//!
//! The crate provides:
//!
//! * **Rewriting**: [`rewriter::rewrite`] expands implicit multiplication
//!   (`3x4`, `20% of 50`), unit suffixes (`5k`, `2.5 million`), percentages
//!   (`100+10%`), currency and thousands separators (`$1,000`, `1_000`), and
//!   auto-closes parentheses so half-typed input still evaluates.
//! * **Scanning**: the [`scanner`] locates `define` blocks and top-level
//!   variable declarations so user definitions can be inlined without parsing
//!   the whole script.
//! * **Formatting**: [`format::format_number`] and
//!   [`format::remove_trailing_zero`] render results for display.
//! * **Evaluation**: [`Evaluator`] is the seam to the calculator process;
//!   [`BcEvaluator`] pipes programs into `bc -l`.
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use quickcalc::{BcEvaluator, QuickCalc, QuickCalcConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     quickcalc::init_logger();
//!
//!     let config = QuickCalcConfig::default();
//!     let bc = BcEvaluator::from_config(&config);
//!
//!     let calc = QuickCalc::new("tip = 15%; $80 + tip of 80", "", "");
//!     let answer = calc.calculate(&bc, &config).await;
//!     println!("{}", answer.display);
//! }
//! ```
//!
//! Rewriting alone is synchronous and never fails:
//!
//! ```rust
//! use quickcalc::rewriter::rewrite;
//!
//! assert_eq!(rewrite("2.5 million", "", ""), "\n\n2.5*1000000");
//! ```

use std::sync::Once;

static INIT_LOGGER: Once = Once::new();

/// Initialise the global [`env_logger`] subscriber exactly once.
///
/// Set `RUST_LOG=quickcalc=trace` to see the query after every rewrite stage.
///
/// ```rust
/// quickcalc::init_logger();
/// log::info!("Logger is ready");
/// ```
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        env_logger::init();
    });
}

// Import the top-level `quickcalc` module.
pub mod quickcalc;

// Re-exporting key items for easier external access.
pub use crate::quickcalc::calculation::{Answer, QuickCalc};
pub use crate::quickcalc::config;
pub use crate::quickcalc::config::QuickCalcConfig;
pub use crate::quickcalc::evaluator;
pub use crate::quickcalc::evaluator::{BcEvaluator, Evaluator, EvaluatorError, EvaluatorOutput};
pub use crate::quickcalc::format;
pub use crate::quickcalc::format::{format_number, remove_trailing_zero, Number};
pub use crate::quickcalc::rewriter;
pub use crate::quickcalc::rewriter::rewrite;
pub use crate::quickcalc::scanner;
pub use crate::quickcalc::scanner::{FunctionSpan, TextRange, VariableBinding};
