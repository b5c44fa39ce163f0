//! Progress values and estimation heuristics for the install pipeline.
//!
//! The orchestrator reports progress two ways: optional [`ProgressNotice`]
//! values pushed to a caller-supplied channel while the pipeline runs, and a
//! terminal [`InstallationProgress`] response returned from `execute`. The
//! estimator helpers are pure so front-ends can reuse them for their own
//! displays.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::session::Status;

/// Phase label used for the preflight stage (also appears in failure
/// responses when preflight blocks the pipeline).
pub const PHASE_PREFLIGHT: &str = "Preflight Checks";
/// Phase label used while the snapshot is captured and attached.
pub const PHASE_SNAPSHOT: &str = "Creating Snapshot";
/// Phase label used while conflicts are detected and resolved.
pub const PHASE_CONFLICTS: &str = "Resolving Conflicts";
/// Phase label used while packages are applied.
pub const PHASE_INSTALL: &str = "Installing Packages";
/// Phase label used while configuration is deployed.
pub const PHASE_CONFIGURE: &str = "Configuring";
/// Phase label used while installed components are verified.
pub const PHASE_VERIFY: &str = "Verifying";
/// Phase label used once the pipeline finished.
pub const PHASE_COMPLETE: &str = "Completed";
/// Phase label used while a snapshot is restored.
pub const PHASE_ROLLBACK: &str = "Rolling Back";

/// Fallback phase weight when a status has no reference weight.
const DEFAULT_PHASE_WEIGHT: f64 = 0.20;

/// One progress emission pushed to the caller's sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressNotice {
    /// Label of the active phase.
    pub phase: String,
    /// Percent complete across the whole pipeline, 0–100.
    pub percent: u8,
    /// Display message for the step.
    pub message: String,
    /// Components applied so far.
    pub components_installed: usize,
    /// Components the session will apply in total.
    pub components_total: usize,
}

/// Channel end the orchestrator pushes [`ProgressNotice`] values into.
pub type ProgressSender = mpsc::UnboundedSender<ProgressNotice>;

/// Terminal progress snapshot returned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct InstallationProgress {
    /// Session the response describes.
    pub session_id: String,
    /// Final session status string (`completed`, `failed`, `rolled_back`).
    pub status: String,
    /// Label of the phase the pipeline ended in.
    pub phase: String,
    /// Percent complete; 100 on success, 0 when the pipeline failed.
    pub percent_complete: u8,
    /// Display message summarising the outcome.
    pub message: String,
    /// Components applied before the pipeline ended.
    pub components_installed: usize,
    /// Components the session was asked to apply.
    pub components_total: usize,
    /// Display-ready failure reason, when the pipeline failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// What: Percent completion of one phase from step counters.
///
/// Input:
/// - `phase`: Phase the counters belong to (traced for diagnostics).
/// - `total`: Total steps in the phase.
/// - `completed`: Steps finished so far.
///
/// Output:
/// - `0` when `total` is zero, `100` once `completed >= total`, otherwise
///   `⌊100·completed/total⌋`; always within 0–100.
#[must_use]
pub fn calculate_phase_progress(phase: Status, total: usize, completed: usize) -> u8 {
    tracing::trace!(phase = %phase, total, completed, "phase progress");
    if total == 0 {
        return 0;
    }
    if completed >= total {
        return 100;
    }
    let percent = (completed as u64 * 100) / total as u64;
    u8::try_from(percent.min(100)).unwrap_or(100)
}

/// Reference weight of a phase: the fraction of total wall-clock time an
/// installation typically spends in it.
fn phase_weight(phase: Status) -> f64 {
    match phase {
        Status::Pending => 0.01,
        Status::Preparation => 0.05,
        Status::Downloading => 0.30,
        Status::Installing => 0.40,
        Status::Configuring => 0.15,
        Status::Verifying => 0.09,
        _ => DEFAULT_PHASE_WEIGHT,
    }
}

/// What: Estimate time remaining for the pipeline.
///
/// Input:
/// - `phase`: Phase the pipeline is currently in.
/// - `percent`: Percent complete across the pipeline, 0–100.
/// - `elapsed`: Wall-clock time spent so far.
///
/// Output:
/// - Zero once `percent >= 100` or the phase is `Completed`.
/// - With no measurable progress, a phase-weighted estimate:
///   `max(0, elapsed / weight(phase) − elapsed)`.
/// - Otherwise the linear projection `elapsed · (100 − percent) / percent`.
#[must_use]
pub fn estimate_remaining(phase: Status, percent: u8, elapsed: Duration) -> Duration {
    if percent >= 100 || phase == Status::Completed {
        return Duration::ZERO;
    }
    if percent == 0 {
        let projected_total = elapsed.as_secs_f64() / phase_weight(phase);
        let remaining = projected_total - elapsed.as_secs_f64();
        return Duration::from_secs_f64(remaining.max(0.0));
    }
    let remaining =
        elapsed.as_secs_f64() * f64::from(100 - percent) / f64::from(percent);
    Duration::from_secs_f64(remaining)
}
