//! Conflict resolver contract and the dpkg-backed implementation.
//!
//! Detection is a single read-only pass over the installed package set, so
//! repeated calls observe the same host state. Resolution delegates removals
//! to the package manager.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::config::ComponentSelection;
use crate::domain::error::Error;
use crate::domain::package::{PackageConflict, ResolutionAction};
use crate::install::mapping;
use crate::pm::PackageManager;
use crate::util::{CommandError, CommandRunner};

/// What: Conflict detection and disposal operations the pipeline consumes.
///
/// Inputs: Selected components for detection; one conflict plus an action
/// for resolution.
///
/// Output: Detected conflicts, or the outcome of applying the action.
///
/// Details:
/// - `detect` must be idempotent; the pipeline performs at most one
///   detection pass.
/// - `Remove` and `Replace` drop the conflicting package (`Replace` presumes
///   a later install supplies the replacement); `Skip` succeeds without
///   side effects; `Abort` fails without retry.
#[async_trait]
pub trait ConflictResolver: Send + Sync {
    /// Find conflicts between the selections and the host.
    async fn detect(
        &self,
        ctx: &CancellationToken,
        components: &[ComponentSelection],
    ) -> Result<Vec<PackageConflict>, Error>;

    /// Apply one resolution action to one conflict.
    async fn resolve(
        &self,
        ctx: &CancellationToken,
        conflict: &PackageConflict,
        action: ResolutionAction,
    ) -> Result<(), Error>;
}

/// Resolver that reads `Conflicts:` declarations from the dpkg database.
pub struct AptConflictResolver {
    /// Subprocess seam for `dpkg-query`.
    runner: Arc<dyn CommandRunner>,
    /// Package manager used for removals.
    package_manager: Arc<dyn PackageManager>,
}

impl AptConflictResolver {
    /// Build a resolver over the given runner and package manager.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, package_manager: Arc<dyn PackageManager>) -> Self {
        Self {
            runner,
            package_manager,
        }
    }
}

/// What: Cross installed `Conflicts:` declarations against target packages.
///
/// Input:
/// - `dpkg_output`: Lines of `package\tconflicts` from `dpkg-query`.
/// - `targets`: Package names the installation plans to apply.
///
/// Output:
/// - One [`PackageConflict`] per installed package declaring a conflict with
///   a target, in dpkg output order.
fn conflicts_from_dpkg(dpkg_output: &str, targets: &HashSet<String>) -> Vec<PackageConflict> {
    let mut found = Vec::new();
    for line in dpkg_output.lines() {
        let Some((installed, declared)) = line.split_once('\t') else {
            continue;
        };
        let installed = installed.trim();
        if installed.is_empty() || targets.contains(installed) {
            continue;
        }
        for entry in declared.split(',') {
            // Entries look like "hyprland (<< 0.30)"; the name is the first token.
            let Some(name) = entry.split_whitespace().next() else {
                continue;
            };
            if !targets.contains(name) {
                continue;
            }
            match PackageConflict::new(
                name,
                installed,
                &format!("installed package {installed} declares a conflict with {name}"),
            ) {
                Ok(conflict) => found.push(conflict),
                Err(err) => tracing::warn!(error = %err, line, "skipping malformed conflict"),
            }
        }
    }
    found
}

#[async_trait]
impl ConflictResolver for AptConflictResolver {
    async fn detect(
        &self,
        ctx: &CancellationToken,
        components: &[ComponentSelection],
    ) -> Result<Vec<PackageConflict>, Error> {
        let targets: HashSet<String> = components
            .iter()
            .map(|selection| mapping::package_for(selection.component()))
            .collect();
        let out = match self
            .runner
            .run(
                ctx,
                "dpkg-query",
                &["-W", "-f", "${Package}\\t${Conflicts}\\n"],
                &[],
            )
            .await
        {
            Ok(out) => out,
            Err(CommandError::Cancelled) => return Err(Error::Cancelled),
            Err(other) => {
                return Err(Error::PackageConflict(format!(
                    "conflict detection failed: {other}"
                )));
            }
        };
        let found = conflicts_from_dpkg(&out, &targets);
        tracing::info!(count = found.len(), "conflict detection finished");
        Ok(found)
    }

    async fn resolve(
        &self,
        ctx: &CancellationToken,
        conflict: &PackageConflict,
        action: ResolutionAction,
    ) -> Result<(), Error> {
        tracing::info!(conflict = %conflict, action = %action, "resolving conflict");
        match action {
            ResolutionAction::Remove | ResolutionAction::Replace => {
                self.package_manager
                    .remove(ctx, conflict.conflicting_package())
                    .await
            }
            ResolutionAction::Skip => Ok(()),
            ResolutionAction::Abort => Err(Error::PackageConflict(format!(
                "installation aborted: {conflict}"
            ))),
        }
    }
}
