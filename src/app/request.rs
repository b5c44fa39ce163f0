//! Request mapping: turning CLI input and host probes into a validated
//! installation configuration.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::component::ComponentName;
use crate::domain::config::{
    ComponentSelection, DiskSpace, GpuSupport, InstallationConfiguration,
};
use crate::domain::error::Error;
use crate::preflight::host::detect_gpu_vendor;
use crate::util::CommandRunner;

/// Version used when the operator does not pin one.
const DEFAULT_VERSION: &str = "latest";

/// What: Parse one CLI component spec (`name` or `name=version`).
///
/// Input:
/// - `spec`: Raw CLI argument.
///
/// Output:
/// - A [`ComponentSelection`] pinned to the given or default version.
///
/// # Errors
/// - `Error::InvalidComponentSelection` for an empty name or version.
pub fn parse_selection(spec: &str) -> Result<ComponentSelection, Error> {
    let (name, version) = match spec.split_once('=') {
        Some((name, version)) => (name.trim(), version.trim()),
        None => (spec.trim(), DEFAULT_VERSION),
    };
    if name.is_empty() {
        return Err(Error::InvalidComponentSelection(format!(
            "component spec `{spec}` has no name"
        )));
    }
    ComponentSelection::new(ComponentName::from(name), version, None)
}

/// What: Build a validated configuration from parsed selections and host
/// probes.
///
/// Input:
/// - `selections`: Parsed selections in declaration order.
/// - `merge_existing_config`: Merge-vs-replace flag.
/// - `gpu`: GPU descriptor from [`probe_gpu`], when one was derived.
/// - `disk_space`: Disk capacity from [`probe_disk`].
///
/// Output:
/// - A ready [`InstallationConfiguration`].
///
/// # Errors
/// - `Error::CoreComponentRequired` when no selection names the compositor.
///   The configuration constructor re-checks the same invariant; both
///   checks stay on purpose so a future request source cannot sneak past
///   it.
pub fn build_configuration(
    selections: &[ComponentSelection],
    merge_existing_config: bool,
    gpu: Option<GpuSupport>,
    disk_space: DiskSpace,
) -> Result<InstallationConfiguration, Error> {
    if !selections.iter().any(ComponentSelection::is_core) {
        return Err(Error::CoreComponentRequired);
    }
    InstallationConfiguration::new(selections, gpu, disk_space, merge_existing_config)
}

/// What: Measure free space on the install target.
///
/// Input:
/// - `install_root`: Filesystem the packages land on.
/// - `required_bytes`: Bytes the installation needs.
///
/// Output:
/// - A validated [`DiskSpace`].
///
/// # Errors
/// - `Error::InsufficientDiskSpace` when the target is short.
/// - `Error::InvalidDiskSpace` when the filesystem cannot be probed.
pub fn probe_disk(install_root: &Path, required_bytes: u64) -> Result<DiskSpace, Error> {
    let stat = nix::sys::statvfs::statvfs(install_root).map_err(|err| {
        Error::InvalidDiskSpace(format!(
            "could not probe {}: {err}",
            install_root.display()
        ))
    })?;
    let available = stat.blocks_available() as u64 * stat.fragment_size() as u64;
    DiskSpace::new(available, required_bytes)
}

/// What: Derive GPU support from the selections and an lspci probe.
///
/// Input:
/// - `ctx`: Cancellation token for the probe.
/// - `runner`: Subprocess seam.
/// - `selections`: Parsed component selections.
///
/// Output:
/// - A descriptor requiring the selected driver when the operator picked
///   one, a driverless descriptor for a recognized GPU, or `None` when
///   nothing can be derived (probe failure is not an error).
pub async fn probe_gpu(
    ctx: &CancellationToken,
    runner: &Arc<dyn CommandRunner>,
    selections: &[ComponentSelection],
) -> Option<GpuSupport> {
    if let Some(driver) = selections
        .iter()
        .find(|selection| selection.is_driver())
        .map(|selection| selection.component().clone())
    {
        let vendor = match driver {
            ComponentName::AmdDriver => "amd",
            ComponentName::NvidiaDriver => "nvidia",
            ComponentName::IntelDriver => "intel",
            _ => return None,
        };
        return match GpuSupport::new(vendor, true, Some(driver)) {
            Ok(gpu) => Some(gpu),
            Err(err) => {
                tracing::warn!(error = %err, "could not derive GPU support from selections");
                None
            }
        };
    }
    let out = runner.run(ctx, "lspci", &[], &[]).await.ok()?;
    let vendor = detect_gpu_vendor(&out)?;
    match GpuSupport::new(&vendor, false, None) {
        Ok(gpu) => Some(gpu),
        Err(err) => {
            tracing::warn!(error = %err, vendor = %vendor, "could not build GPU support from probe");
            None
        }
    }
}
