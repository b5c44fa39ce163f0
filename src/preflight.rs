//! Preflight contract: host validation results, streamed progress, and the
//! checker trait the orchestrator consumes. The host-facing implementation
//! lives in [`host`].

pub mod host;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::error::Error;

pub use host::{HostPreflight, PreflightOptions};

/// Host requirement a preflight check validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Supported Debian release.
    DebianVersion,
    /// Enough free space on the install target.
    DiskSpace,
    /// apt tooling present on the host.
    PackageManager,
    /// apt sources configured.
    Repositories,
    /// Mirror reachable over the network.
    Network,
    /// GPU hardware probe (informational).
    Gpu,
}

impl Requirement {
    /// Human-readable label used in check messages.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Requirement::DebianVersion => "Debian version",
            Requirement::DiskSpace => "disk space",
            Requirement::PackageManager => "package manager",
            Requirement::Repositories => "apt repositories",
            Requirement::Network => "network connectivity",
            Requirement::Gpu => "GPU",
        }
    }
}

/// How severe a failed check is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Failure blocks the installation.
    Critical,
    /// Failure is surfaced but does not block.
    Warning,
    /// Informational only.
    Info,
}

/// Remediation advice attached to a check result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guidance {
    /// What the operator should do about the failure.
    message: String,
}

impl Guidance {
    /// Build guidance from a remediation message.
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// The remediation message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of a single preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    /// Requirement the check validated.
    pub requirement: Requirement,
    /// Severity class of a failure.
    pub severity: Severity,
    /// Whether the host satisfied the requirement.
    pub passed: bool,
    /// What the check observed on the host.
    pub observed: String,
    /// What the requirement expects.
    pub expected: String,
    /// Remediation advice for failures.
    guidance: Guidance,
}

impl CheckResult {
    /// What: Build a check result.
    ///
    /// Input: Requirement, severity, pass flag, observed/expected strings,
    /// and remediation advice.
    /// Output: The assembled result.
    #[must_use]
    pub fn new(
        requirement: Requirement,
        severity: Severity,
        passed: bool,
        observed: &str,
        expected: &str,
        guidance: Guidance,
    ) -> Self {
        Self {
            requirement,
            severity,
            passed,
            observed: observed.to_string(),
            expected: expected.to_string(),
            guidance,
        }
    }

    /// Remediation advice for this result.
    #[must_use]
    pub fn guidance(&self) -> &Guidance {
        &self.guidance
    }

    /// True when this result blocks the installation.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity == Severity::Critical
    }

    /// What: Display-ready one-line summary of the result.
    ///
    /// Input: None.
    /// Output: `"<label> check passed: <observed>"` or
    /// `"<label> check failed: found <observed>, expected <expected>"`.
    #[must_use]
    pub fn format_message(&self) -> String {
        if self.passed {
            format!("{} check passed: {}", self.requirement.label(), self.observed)
        } else {
            format!(
                "{} check failed: found {}, expected {}",
                self.requirement.label(),
                self.observed,
                self.expected
            )
        }
    }
}

/// Aggregated outcome of one preflight run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSession {
    /// Every check result in execution order.
    results: Vec<CheckResult>,
}

impl ValidationSession {
    /// Empty validation session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one check result.
    pub fn add(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    /// Every check result in execution order.
    #[must_use]
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    /// True when no blocking failure was recorded.
    #[must_use]
    pub fn can_proceed(&self) -> bool {
        !self.results.iter().any(CheckResult::is_blocking)
    }

    /// True when at least one non-blocking failure was recorded.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warning_results().is_empty()
    }

    /// Results that block the installation.
    #[must_use]
    pub fn blocking_results(&self) -> Vec<&CheckResult> {
        self.results.iter().filter(|r| r.is_blocking()).collect()
    }

    /// Failed results that do not block.
    #[must_use]
    pub fn warning_results(&self) -> Vec<&CheckResult> {
        self.results
            .iter()
            .filter(|r| !r.passed && r.severity == Severity::Warning)
            .collect()
    }
}

/// One streamed progress message from a running preflight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Display message describing the check in flight.
    pub message: String,
}

/// Channel end preflight implementations push [`ProgressUpdate`]s into.
pub type PreflightUpdateSender = mpsc::UnboundedSender<ProgressUpdate>;

/// What: Host validation the orchestrator runs before touching the system.
///
/// Inputs:
/// - `ctx`: Cancellation token observed between checks.
/// - `updates`: Channel for streamed progress; dropped (closing the stream)
///   when the checks finish, before the validation session is returned.
///
/// Output:
/// - The final [`ValidationSession`]; infrastructure failures that prevent
///   the checks from running at all surface as errors.
#[async_trait]
pub trait PreflightChecker: Send + Sync {
    /// Run every check, streaming progress along the way.
    async fn run(
        &self,
        ctx: &CancellationToken,
        updates: PreflightUpdateSender,
    ) -> Result<ValidationSession, Error>;
}
