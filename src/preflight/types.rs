//! Preflight check outcomes and reporting.

/// A single named check and its outcome.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
}

/// Outcome of one preflight check. Failures block the build; warnings
/// do not.
#[derive(Debug, Clone)]
pub enum CheckStatus {
    Pass { details: Option<String> },
    Fail { details: String },
    Warn { details: String },
}

impl CheckStatus {
    fn label(&self) -> &'static str {
        match self {
            CheckStatus::Pass { .. } => "PASS",
            CheckStatus::Fail { .. } => "FAIL",
            CheckStatus::Warn { .. } => "WARN",
        }
    }

    fn details(&self) -> Option<&str> {
        match self {
            CheckStatus::Pass { details } => details.as_deref(),
            CheckStatus::Fail { details } | CheckStatus::Warn { details } => Some(details),
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, CheckStatus::Fail { .. })
    }

    pub fn is_warn(&self) -> bool {
        matches!(self, CheckStatus::Warn { .. })
    }
}

impl CheckResult {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass { details: None },
        }
    }

    pub fn pass_with(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass {
                details: Some(details.to_string()),
            },
        }
    }

    pub fn fail(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail {
                details: details.to_string(),
            },
        }
    }

    pub fn warn(name: &str, details: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn {
                details: details.to_string(),
            },
        }
    }
}

/// Results of all preflight checks.
pub struct PreflightReport {
    pub checks: Vec<CheckResult>,
}

impl PreflightReport {
    /// True when no check failed. Warnings don't block a build.
    pub fn all_passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status.is_fail())
    }

    pub fn fail_count(&self) -> usize {
        self.checks.iter().filter(|c| c.status.is_fail()).count()
    }

    pub fn warn_count(&self) -> usize {
        self.checks.iter().filter(|c| c.status.is_warn()).count()
    }

    /// Print the report to stdout.
    pub fn print(&self) {
        println!("=== Preflight Check Results ===\n");

        for check in &self.checks {
            match check.status.details() {
                Some(details) => {
                    println!("  [{}] {}: {}", check.status.label(), check.name, details)
                }
                None => println!("  [{}] {}", check.status.label(), check.name),
            }
        }

        let failed = self.fail_count();
        let warned = self.warn_count();
        let passed = self.checks.len() - failed - warned;

        println!("\nSummary: {}/{} passed", passed, self.checks.len());
        if failed > 0 {
            println!("         {} FAILED - build will not succeed", failed);
        }
        if warned > 0 {
            println!("         {} warnings", warned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_passes_with_warnings() {
        let report = PreflightReport {
            checks: vec![
                CheckResult::pass("node"),
                CheckResult::warn("package-lock.json", "missing"),
            ],
        };
        assert!(report.all_passed());
        assert_eq!(report.warn_count(), 1);
        assert_eq!(report.fail_count(), 0);
    }

    #[test]
    fn report_fails_on_any_failure() {
        let report = PreflightReport {
            checks: vec![
                CheckResult::pass("node"),
                CheckResult::fail("npm", "not found"),
            ],
        };
        assert!(!report.all_passed());
        assert_eq!(report.fail_count(), 1);
    }
}
