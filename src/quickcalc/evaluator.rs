//! Evaluator Backends
//!
//! The rewriter only produces program text; computing it is delegated to an
//! [`Evaluator`]. [`BcEvaluator`] pipes the program into an arbitrary-precision
//! `bc` process, the equivalent of `echo "$program" | bc -l 2>&1`.
//!
//! # Examples
//!
//! ```no_run
//! use quickcalc::evaluator::{BcEvaluator, Evaluator};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bc = BcEvaluator::new().with_timeout(2);
//! let output = bc.evaluate("scale=2; 10/4").await?;
//! assert!(output.success);
//! assert_eq!(output.output, "2.50");
//! # Ok(())
//! # }
//! ```

use crate::quickcalc::config::QuickCalcConfig;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// What the evaluator printed and whether it exited cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorOutput {
    /// Whether the process exited with status 0
    pub success: bool,
    /// Standard output followed by standard error, trimmed
    pub output: String,
    /// Exit code, or -1 when the process was terminated by a signal
    pub exit_code: i32,
}

impl EvaluatorOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            exit_code: 0,
        }
    }

    pub fn failure(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code,
        }
    }
}

/// Errors raised while running an evaluator
#[derive(Debug)]
pub enum EvaluatorError {
    /// The evaluator process could not be started
    Spawn(std::io::Error),
    /// Writing the program or collecting output failed
    Io(std::io::Error),
    /// The evaluator did not finish in time
    Timeout(String),
}

impl std::fmt::Display for EvaluatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorError::Spawn(e) => write!(f, "Failed to start evaluator: {}", e),
            EvaluatorError::Io(e) => write!(f, "IO error: {}", e),
            EvaluatorError::Timeout(msg) => write!(f, "Evaluator timeout: {}", msg),
        }
    }
}

impl std::error::Error for EvaluatorError {}

/// Computes a rewritten program.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, program: &str) -> Result<EvaluatorOutput, EvaluatorError>;
}

/// Runs programs through an external `bc` process.
#[derive(Debug, Clone)]
pub struct BcEvaluator {
    program: PathBuf,
    args: Vec<String>,
    timeout_secs: u64,
}

impl BcEvaluator {
    /// `bc -l` with the default timeout.
    pub fn new() -> Self {
        Self::from_config(&QuickCalcConfig::default())
    }

    pub fn from_config(config: &QuickCalcConfig) -> Self {
        Self {
            program: config.bc_program.clone(),
            args: config.bc_args.clone(),
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }
}

impl Default for BcEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Evaluator for BcEvaluator {
    async fn evaluate(&self, program: &str) -> Result<EvaluatorOutput, EvaluatorError> {
        log::debug!("running {} {:?}", self.program.display(), self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                log::warn!("could not start {}: {}", self.program.display(), e);
                EvaluatorError::Spawn(e)
            })?;

        // bc reads statements line by line; the last one needs its newline.
        let mut input = String::with_capacity(program.len() + 1);
        input.push_str(program);
        input.push('\n');

        // Output is drained while the program is written, so a long reply
        // cannot fill the pipe and stall the write.
        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input.as_bytes()).await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let run = async move {
            let (written, output) = tokio::join!(write, child.wait_with_output());
            let output = output.map_err(EvaluatorError::Io)?;
            match written {
                // The process quit before reading everything; its output still counts.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    log::debug!("evaluator closed stdin early: {}", e);
                }
                Err(e) => return Err(EvaluatorError::Io(e)),
                Ok(()) => {}
            }
            Ok(output)
        };

        let output = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), run).await
        {
            Ok(result) => result?,
            Err(_) => {
                log::warn!("evaluator exceeded {} second timeout", self.timeout_secs);
                return Err(EvaluatorError::Timeout(format!(
                    "Evaluator exceeded {} second timeout",
                    self.timeout_secs
                )));
            }
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        if output.status.success() {
            Ok(EvaluatorOutput::success(combined))
        } else {
            let exit_code = output.status.code().unwrap_or(-1);
            log::warn!("evaluator exited with status {}", exit_code);
            Ok(EvaluatorOutput::failure(combined, exit_code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_copies_process_settings() {
        let config = QuickCalcConfig::default()
            .with_bc_program("/usr/local/bin/bc")
            .with_bc_args(vec!["-lq".to_string()])
            .with_timeout(9);
        let bc = BcEvaluator::from_config(&config);
        assert_eq!(bc.program, PathBuf::from("/usr/local/bin/bc"));
        assert_eq!(bc.args, vec!["-lq".to_string()]);
        assert_eq!(bc.timeout_secs(), 9);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_larger_than_pipe_buffer_is_collected() {
        // `cat` echoes everything back, well past a pipe's capacity.
        let program = "1234567890\n".repeat(50_000);
        let cat = BcEvaluator::new()
            .with_program("cat")
            .with_args(Vec::new())
            .with_timeout(10);
        let output = cat.evaluate(&program).await.unwrap();
        assert!(output.success);
        assert_eq!(output.output, program.trim());
    }

    #[tokio::test]
    async fn test_missing_program_is_a_spawn_error() {
        let bc = BcEvaluator::new().with_program("/nonexistent/quickcalc-test-bc");
        let result = bc.evaluate("1+1").await;
        assert!(matches!(result, Err(EvaluatorError::Spawn(_))));
    }
}
