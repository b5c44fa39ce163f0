//! JSON DTOs for the durable repository.
//!
//! Field names are a stable storage contract; decoding rebuilds the
//! aggregate by calling the same value-object and entity constructors a
//! fresh session would, then installs the persisted lifecycle state through
//! the crate-private reconstruction factories.

use chrono::{DateTime, Utc};

use crate::domain::component::ComponentName;
use crate::domain::config::{
    ComponentSelection, DiskSpace, GpuSupport, InstallationConfiguration,
};
use crate::domain::error::Error;
use crate::domain::package::PackageInfo;
use crate::domain::session::{InstallationSession, InstalledComponent, Status};
use crate::domain::snapshot::SystemSnapshot;

/// One component selection as stored.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SelectionDto {
    /// Component name string.
    pub component: String,
    /// Pinned version.
    pub version: String,
    /// Resolved package name, when metadata was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// Package size in bytes, when metadata was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Package dependencies, when metadata was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
}

/// The installation configuration as stored.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConfigurationDto {
    /// Requested components in declaration order.
    pub components: Vec<SelectionDto>,
    /// GPU vendor, when a descriptor was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_vendor: Option<String>,
    /// GPU requires-driver flag, when a descriptor was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_requires_driver: Option<bool>,
    /// GPU driver component, when one was required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_driver_component: Option<String>,
    /// Bytes available at planning time.
    pub disk_available: u64,
    /// Bytes required at planning time.
    pub disk_required: u64,
    /// Merge-vs-replace flag for existing user configuration.
    pub merge_existing_conf: bool,
}

/// The attached snapshot as stored.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SnapshotDto {
    /// Snapshot identity.
    pub id: String,
    /// Capture timestamp, RFC 3339.
    pub created_at: String,
    /// Manifest location.
    pub path: String,
    /// Bytes available at capture time.
    pub disk_available: u64,
    /// Bytes required at capture time.
    pub disk_required: u64,
    /// Captured `name=version` pairs.
    #[serde(default)]
    pub packages: Vec<String>,
    /// Corruption flag.
    #[serde(default)]
    pub corrupted: bool,
    /// Corruption reason, when marked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corruption_reason: Option<String>,
}

/// One installed component as stored.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InstalledComponentDto {
    /// Component record identity.
    pub id: String,
    /// Component name string.
    pub component: String,
    /// Applied version.
    pub version: String,
    /// Resolved package name, when metadata was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    /// Package size in bytes, when metadata was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// Package dependencies, when metadata was attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    /// Apply timestamp, RFC 3339.
    pub installed_at: String,
    /// Whether verification confirmed the component.
    #[serde(default)]
    pub verified: bool,
    /// Verification timestamp, when verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_at: Option<String>,
}

/// One session document as stored, keyed by `id`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SessionDto {
    /// Session identity.
    pub id: String,
    /// Status string.
    pub status: String,
    /// Start timestamp, RFC 3339.
    pub started_at: String,
    /// Terminal timestamp, RFC 3339, absent until terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Failure reason; empty unless failed.
    #[serde(default)]
    pub failure_reason: String,
    /// The configuration the session installs from.
    pub configuration: ConfigurationDto,
    /// The attached snapshot, once captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<SnapshotDto>,
    /// Components applied so far.
    #[serde(default)]
    pub installed_components: Vec<InstalledComponentDto>,
}

/// Flatten optional package metadata into the DTO triplet.
fn package_fields(
    info: Option<&PackageInfo>,
) -> (Option<String>, Option<u64>, Option<Vec<String>>) {
    match info {
        Some(info) => (
            Some(info.name().to_string()),
            Some(info.size_bytes()),
            if info.dependencies().is_empty() {
                None
            } else {
                Some(info.dependencies().to_vec())
            },
        ),
        None => (None, None, None),
    }
}

/// Rebuild optional package metadata from the DTO triplet.
fn package_from_fields(
    package_name: Option<&str>,
    version: &str,
    size_bytes: Option<u64>,
    dependencies: Option<&[String]>,
) -> Result<Option<PackageInfo>, Error> {
    match package_name {
        Some(name) => Ok(Some(PackageInfo::new(
            name,
            version,
            size_bytes.unwrap_or(0),
            dependencies.unwrap_or(&[]),
        )?)),
        None => Ok(None),
    }
}

/// Parse a stored RFC 3339 timestamp.
fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| Error::Repository {
            context: format!("invalid {field} timestamp `{raw}`"),
            source: Some(Box::new(err)),
        })
}

impl SessionDto {
    /// What: Encode a session into its storage document.
    ///
    /// Input:
    /// - `session`: The aggregate to encode.
    ///
    /// Output:
    /// - A [`SessionDto`] mirroring every publicly exposed field.
    #[must_use]
    pub fn from_session(session: &InstallationSession) -> Self {
        let configuration = session.configuration();
        let components = configuration
            .components()
            .iter()
            .map(|selection| {
                let (package_name, size_bytes, dependencies) =
                    package_fields(selection.package_info());
                SelectionDto {
                    component: selection.component().to_string(),
                    version: selection.version().to_string(),
                    package_name,
                    size_bytes,
                    dependencies,
                }
            })
            .collect();
        let snapshot = session.snapshot().map(|snapshot| SnapshotDto {
            id: snapshot.id().to_string(),
            created_at: snapshot.created_at().to_rfc3339(),
            path: snapshot.path().to_string(),
            disk_available: snapshot.disk_space().available_bytes(),
            disk_required: snapshot.disk_space().required_bytes(),
            packages: snapshot.packages().to_vec(),
            corrupted: snapshot.is_corrupted(),
            corruption_reason: snapshot.corruption_reason().map(str::to_string),
        });
        let installed_components = session
            .installed_components()
            .iter()
            .map(|component| {
                let (package_name, size_bytes, dependencies) =
                    package_fields(component.package_info());
                InstalledComponentDto {
                    id: component.id().to_string(),
                    component: component.component().to_string(),
                    version: component.version().to_string(),
                    package_name,
                    size_bytes,
                    dependencies,
                    installed_at: component.installed_at().to_rfc3339(),
                    verified: component.is_verified(),
                    verified_at: component.verified_at().map(|at| at.to_rfc3339()),
                }
            })
            .collect();
        Self {
            id: session.id().to_string(),
            status: session.status().as_str().to_string(),
            started_at: session.started_at().to_rfc3339(),
            completed_at: session.completed_at().map(|at| at.to_rfc3339()),
            failure_reason: session.failure_reason().to_string(),
            configuration: ConfigurationDto {
                components,
                gpu_vendor: configuration.gpu().map(|gpu| gpu.vendor().to_string()),
                gpu_requires_driver: configuration.gpu().map(GpuSupport::requires_driver),
                gpu_driver_component: configuration
                    .gpu()
                    .and_then(|gpu| gpu.driver().map(ToString::to_string)),
                disk_available: configuration.disk_space().available_bytes(),
                disk_required: configuration.disk_space().required_bytes(),
                merge_existing_conf: configuration.merge_existing_config(),
            },
            snapshot,
            installed_components,
        }
    }

    /// What: Rebuild the aggregate from its storage document.
    ///
    /// Input: The decoded document.
    ///
    /// Output:
    /// - The reconstructed session, or the first constructor error
    ///   encountered, verbatim.
    ///
    /// Details:
    /// - Value objects are rebuilt in the same order as a fresh session
    ///   (selections, GPU, disk, configuration), then the persisted status,
    ///   snapshot, installed components, completion timestamp, and failure
    ///   reason are installed through the reconstruction factories.
    pub fn into_session(self) -> Result<InstallationSession, Error> {
        let mut selections = Vec::with_capacity(self.configuration.components.len());
        for dto in &self.configuration.components {
            let package_info = package_from_fields(
                dto.package_name.as_deref(),
                &dto.version,
                dto.size_bytes,
                dto.dependencies.as_deref(),
            )?;
            selections.push(ComponentSelection::new(
                ComponentName::from(dto.component.as_str()),
                &dto.version,
                package_info,
            )?);
        }
        let gpu = match &self.configuration.gpu_vendor {
            Some(vendor) => Some(GpuSupport::new(
                vendor,
                self.configuration.gpu_requires_driver.unwrap_or(false),
                self.configuration
                    .gpu_driver_component
                    .as_deref()
                    .map(ComponentName::from),
            )?),
            None => None,
        };
        let disk_space = DiskSpace::new(
            self.configuration.disk_available,
            self.configuration.disk_required,
        )?;
        let configuration = InstallationConfiguration::new(
            &selections,
            gpu,
            disk_space,
            self.configuration.merge_existing_conf,
        )?;

        let snapshot = match self.snapshot {
            Some(dto) => Some(SystemSnapshot::reconstruct(
                &dto.id,
                parse_timestamp(&dto.created_at, "snapshot created_at")?,
                &dto.path,
                DiskSpace::new(dto.disk_available, dto.disk_required)?,
                dto.packages,
                dto.corrupted,
                dto.corruption_reason,
            )?),
            None => None,
        };

        let mut installed_components = Vec::with_capacity(self.installed_components.len());
        for dto in &self.installed_components {
            let package_info = package_from_fields(
                dto.package_name.as_deref(),
                &dto.version,
                dto.size_bytes,
                dto.dependencies.as_deref(),
            )?;
            let verified_at = dto
                .verified_at
                .as_deref()
                .map(|raw| parse_timestamp(raw, "verified_at"))
                .transpose()?;
            installed_components.push(InstalledComponent::reconstruct(
                &dto.id,
                ComponentName::from(dto.component.as_str()),
                &dto.version,
                package_info,
                parse_timestamp(&dto.installed_at, "installed_at")?,
                dto.verified,
                verified_at,
            )?);
        }

        let status: Status = self.status.parse()?;
        let started_at = parse_timestamp(&self.started_at, "started_at")?;
        let completed_at = self
            .completed_at
            .as_deref()
            .map(|raw| parse_timestamp(raw, "completed_at"))
            .transpose()?;
        InstallationSession::reconstruct(
            &self.id,
            configuration,
            status,
            snapshot,
            installed_components,
            started_at,
            completed_at,
            self.failure_reason,
        )
    }
}
