use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::parser::parse_solver_output;
use crate::result::SolverResult;
use crate::translate::Translation;

/// External SMT solver driven over stdin/stdout.
///
/// One `check_sat` call is one subprocess: the script is piped in, the
/// process runs to completion, and the verdict plus model are parsed
/// from its stdout. Timeouts are enforced by the solver's own flag.
#[derive(Debug)]
pub struct SmtSolver {
    config: SolverConfig,
}

impl SmtSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Auto-detect an installed solver with default settings.
    pub fn with_default_config() -> Result<Self, SolverError> {
        Ok(Self {
            config: SolverConfig::auto_detect()?,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Check satisfiability of a translated justification.
    pub fn check_sat(&self, translation: &Translation) -> Result<SolverResult, SolverError> {
        self.check_sat_raw(translation.script())
    }

    /// Check satisfiability of a raw SMT-LIB2 script.
    pub fn check_sat_raw(&self, script: &str) -> Result<SolverResult, SolverError> {
        self.config.validate()?;
        let args = self.config.build_args();
        debug!(
            solver = %self.config.kind,
            bytes = script.len(),
            "invoking solver"
        );

        let started = Instant::now();
        let mut child = Command::new(&self.config.solver_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SolverError::Process(format!("failed to start solver: {e}")))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .ok_or_else(|| SolverError::Process("solver stdin unavailable".to_string()))?;
            stdin
                .write_all(script.as_bytes())
                .map_err(|e| SolverError::Process(format!("failed to write script: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| SolverError::Process(format!("failed to wait for solver: {e}")))?;

        let elapsed = started.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("timeout") || stdout.trim() == "timeout" {
            return Ok(SolverResult::Unknown(timeout_reason(elapsed)));
        }
        let result = parse_solver_output(&stdout, &stderr)?;
        debug!(
            verdict = result.verdict(),
            elapsed_ms = elapsed.as_millis() as u64,
            "solver finished"
        );
        Ok(result)
    }
}

fn timeout_reason(elapsed: Duration) -> String {
    format!("timeout after {}ms", elapsed.as_millis())
}
