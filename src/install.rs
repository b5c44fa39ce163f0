//! The installation pipeline: orchestrator, conflict policy, progress
//! values, and the component→package mapping.

pub mod conflict;
pub mod mapping;
pub mod orchestrator;
pub mod progress;

pub use conflict::{AptConflictResolver, ConflictResolver};
pub use orchestrator::Orchestrator;
pub use progress::{InstallationProgress, ProgressNotice, ProgressSender};
