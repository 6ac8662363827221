use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use crate::error::SolverError;

/// Supported external SMT solvers. Anything that speaks SMT-LIB2 on
/// stdin and understands QF_BV works; these two are tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverKind {
    Z3,
    Cvc5,
}

impl SolverKind {
    /// Binary name used for PATH lookup.
    pub fn binary_name(&self) -> &'static str {
        match self {
            SolverKind::Z3 => "z3",
            SolverKind::Cvc5 => "cvc5",
        }
    }

    /// Install locations checked when PATH lookup fails.
    fn common_paths(&self) -> &'static [&'static str] {
        match self {
            SolverKind::Z3 => &["/opt/homebrew/bin/z3", "/usr/local/bin/z3", "/usr/bin/z3"],
            SolverKind::Cvc5 => &[
                "/opt/homebrew/bin/cvc5",
                "/usr/local/bin/cvc5",
                "/usr/bin/cvc5",
            ],
        }
    }

    /// Arguments that put the solver into read-script-from-stdin mode
    /// with model production enabled.
    pub fn stdin_args(&self) -> Vec<String> {
        match self {
            SolverKind::Z3 => vec!["-in".to_string()],
            SolverKind::Cvc5 => vec![
                "--lang".to_string(),
                "smt2".to_string(),
                "--produce-models".to_string(),
            ],
        }
    }

    /// Solver-native timeout argument, if one is configured.
    pub fn timeout_arg(&self, timeout_ms: u64) -> Option<String> {
        if timeout_ms == 0 {
            return None;
        }
        match self {
            SolverKind::Z3 => Some(format!("-t:{timeout_ms}")),
            SolverKind::Cvc5 => Some(format!("--tlimit={timeout_ms}")),
        }
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary_name())
    }
}

impl std::str::FromStr for SolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "z3" => Ok(SolverKind::Z3),
            "cvc5" => Ok(SolverKind::Cvc5),
            _ => Err(format!("unknown solver: {s} (expected z3 or cvc5)")),
        }
    }
}

/// Where the solver lives and how to invoke it.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub kind: SolverKind,
    pub solver_path: PathBuf,
    /// Timeout in milliseconds; 0 means none.
    pub timeout_ms: u64,
    pub extra_args: Vec<String>,
}

impl SolverConfig {
    pub fn new(kind: SolverKind, solver_path: PathBuf) -> Self {
        Self {
            kind,
            solver_path,
            timeout_ms: 0,
            extra_args: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Locate a solver of the given kind: `which` first, then the
    /// common install paths.
    pub fn auto_detect_for(kind: SolverKind) -> Result<Self, SolverError> {
        if let Ok(output) = Command::new("which").arg(kind.binary_name()).output() {
            if output.status.success() {
                let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !found.is_empty() {
                    let path = PathBuf::from(&found);
                    if path.exists() {
                        return Ok(Self::new(kind, path));
                    }
                }
            }
        }
        for candidate in kind.common_paths() {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(Self::new(kind, path));
            }
        }
        Err(SolverError::NotFound(
            kind,
            PathBuf::from(kind.binary_name()),
        ))
    }

    /// First available solver, preferring Z3.
    pub fn auto_detect() -> Result<Self, SolverError> {
        Self::auto_detect_for(SolverKind::Z3).or_else(|_| Self::auto_detect_for(SolverKind::Cvc5))
    }

    /// Full argument list for one invocation.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.kind.stdin_args();
        if let Some(timeout) = self.kind.timeout_arg(self.timeout_ms) {
            args.push(timeout);
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }

    pub fn validate(&self) -> Result<(), SolverError> {
        if !self.solver_path.exists() {
            return Err(SolverError::NotFound(self.kind, self.solver_path.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_has_no_timeout() {
        let config = SolverConfig::new(SolverKind::Z3, PathBuf::from("/usr/bin/z3"));
        assert_eq!(config.timeout_ms, 0);
        assert!(config.extra_args.is_empty());
    }

    #[test]
    fn builders_set_fields() {
        let config = SolverConfig::new(SolverKind::Z3, PathBuf::from("/usr/bin/z3"))
            .with_timeout(5000)
            .with_extra_args(vec!["-v:1".to_string()]);
        assert_eq!(config.timeout_ms, 5000);
        assert_eq!(config.extra_args, vec!["-v:1".to_string()]);
    }

    #[test]
    fn build_args_z3_includes_timeout() {
        let config =
            SolverConfig::new(SolverKind::Z3, PathBuf::from("/usr/bin/z3")).with_timeout(3000);
        assert_eq!(config.build_args(), vec!["-in", "-t:3000"]);
    }

    #[test]
    fn build_args_cvc5() {
        let config =
            SolverConfig::new(SolverKind::Cvc5, PathBuf::from("/usr/bin/cvc5")).with_timeout(3000);
        let args = config.build_args();
        assert!(args.contains(&"--produce-models".to_string()));
        assert!(args.contains(&"--tlimit=3000".to_string()));
    }

    #[test]
    fn zero_timeout_omits_the_flag() {
        assert_eq!(SolverKind::Z3.timeout_arg(0), None);
        assert_eq!(SolverKind::Cvc5.timeout_arg(0), None);
    }

    #[test]
    fn kind_parses_from_str() {
        assert_eq!("z3".parse::<SolverKind>().unwrap(), SolverKind::Z3);
        assert_eq!("CVC5".parse::<SolverKind>().unwrap(), SolverKind::Cvc5);
        assert!("boolector".parse::<SolverKind>().is_err());
    }

    #[test]
    fn validate_missing_binary() {
        let config = SolverConfig::new(SolverKind::Z3, PathBuf::from("/nonexistent/z3"));
        assert_eq!(
            config.validate().unwrap_err(),
            SolverError::NotFound(SolverKind::Z3, PathBuf::from("/nonexistent/z3"))
        );
    }
}
