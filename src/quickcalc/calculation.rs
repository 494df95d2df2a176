//! # QuickCalc
//!
//! One calculation request: the rewritten program, the scanner's view of it,
//! and the classification of whatever the evaluator printed.
//!
//! ```rust
//! use quickcalc::{Answer, EvaluatorOutput, QuickCalc};
//!
//! let calc = QuickCalc::new("1,500 + 10%", "", "");
//! assert_eq!(calc.program(), "\n\n1500 *1.1");
//!
//! let answer = Answer::from_output(&EvaluatorOutput::success("1650.0"), "...");
//! assert!(answer.valid);
//! assert_eq!(answer.display, "1,650");
//! ```

use crate::quickcalc::config::QuickCalcConfig;
use crate::quickcalc::evaluator::{Evaluator, EvaluatorOutput};
use crate::quickcalc::format::{format_number, remove_trailing_zero, Number};
use crate::quickcalc::rewriter::rewrite;
use crate::quickcalc::scanner::{
    find_function_spans, find_variable_bindings_outside, FunctionSpan, VariableBinding,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    static ref LEADING_FLOAT: Regex =
        Regex::new(r"\A\s*[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?").unwrap();
}

/// A rewritten query, ready for an [`Evaluator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickCalc {
    program: String,
}

impl QuickCalc {
    /// Rewrites `query`, wrapping it with the user's custom definitions and the
    /// default function library. Arguments follow [`rewrite`]'s order.
    pub fn new(query: &str, custom_definitions: &str, default_functions: &str) -> Self {
        Self {
            program: rewrite(query, custom_definitions, default_functions),
        }
    }

    /// The evaluator-ready program text.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// `define` blocks in the program, including the default library's.
    pub fn functions(&self) -> Vec<FunctionSpan> {
        find_function_spans(&self.program)
    }

    /// Top-level variable declarations in the program.
    pub fn variables(&self) -> Vec<VariableBinding> {
        find_variable_bindings_outside(&self.program, &self.functions())
    }

    /// Evaluates the program and classifies the result.
    ///
    /// Never fails: an evaluator error becomes an invalid [`Answer`].
    pub async fn calculate(&self, evaluator: &dyn Evaluator, config: &QuickCalcConfig) -> Answer {
        match evaluator.evaluate(&self.program).await {
            Ok(output) => Answer::from_output(&output, &config.placeholder),
            Err(e) => {
                log::warn!("evaluation failed: {}", e);
                Answer::invalid(&config.placeholder)
            }
        }
    }
}

/// The outcome of one calculation, shaped for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// False when the evaluator failed or reported an error
    pub valid: bool,
    /// The numeric answer; `0` when invalid
    pub value: Number,
    /// Comma-grouped answer, or the placeholder when invalid
    pub display: String,
}

impl Answer {
    pub fn invalid(placeholder: &str) -> Self {
        Self {
            valid: false,
            value: Number::Integer(0),
            display: placeholder.to_string(),
        }
    }

    /// Classifies evaluator output.
    ///
    /// A non-zero exit or any mention of `error` makes the answer invalid.
    /// Otherwise the leading number of the output is the answer; output that
    /// does not start with a number reads as `0`.
    pub fn from_output(output: &EvaluatorOutput, placeholder: &str) -> Self {
        if !output.success || output.output.contains("error") {
            log::debug!("invalid evaluator output: {:?}", output.output);
            return Self::invalid(placeholder);
        }

        let value = remove_trailing_zero(leading_float(&output.output));
        Self {
            valid: true,
            value,
            display: format_number(value),
        }
    }
}

/// Parses the number at the start of `text`, or `0.0` if there is none.
///
/// bc wraps long numbers with a trailing backslash; those continuations are
/// joined first.
fn leading_float(text: &str) -> f64 {
    let joined = text.replace("\\\n", "");
    LEADING_FLOAT
        .find(&joined)
        .and_then(|found| found.as_str().trim_start().parse::<f64>().ok())
        .unwrap_or(0.0)
}
