//! Package-level value objects: metadata, conflicts, and the resolution
//! actions the conflict policy can take.

use std::fmt;

use crate::domain::error::Error;
use crate::util::MB;

/// Default reason recorded for a conflict reported without one.
const GENERIC_CONFLICT_REASON: &str = "package conflict detected";

/// Metadata for a single OS package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Package name as known to the package manager.
    name: String,
    /// Version string as known to the package manager.
    version: String,
    /// Installed size in bytes; zero for meta-packages.
    size_bytes: u64,
    /// Declared dependencies, possibly empty.
    dependencies: Vec<String>,
}

impl PackageInfo {
    /// What: Validate and construct package metadata.
    ///
    /// Input:
    /// - `name`: Package name; trimmed, must be non-empty.
    /// - `version`: Version string; trimmed, must be non-empty.
    /// - `size_bytes`: Installed size; zero is allowed for meta-packages.
    /// - `dependencies`: Dependency names; copied into the value.
    ///
    /// Output:
    /// - `Ok(PackageInfo)` or `Err(Error::InvalidPackageInfo)` when either
    ///   string is empty after trimming.
    pub fn new(
        name: &str,
        version: &str,
        size_bytes: u64,
        dependencies: &[String],
    ) -> Result<Self, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidPackageInfo(
                "package name must not be empty".into(),
            ));
        }
        let version = version.trim();
        if version.is_empty() {
            return Err(Error::InvalidPackageInfo(
                "package version must not be empty".into(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            size_bytes,
            dependencies: dependencies.to_vec(),
        })
    }

    /// Package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Installed size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Declared dependencies.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Installed size in mebibytes.
    #[must_use]
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / MB as f64
    }
}

/// A detected conflict between a requested package and one on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConflict {
    /// Package whose installation is being blocked.
    package: String,
    /// Package on the host that conflicts with it.
    conflicting_package: String,
    /// Why the two cannot coexist.
    reason: String,
}

impl PackageConflict {
    /// What: Validate and construct a conflict record.
    ///
    /// Input:
    /// - `package`: Requested package; trimmed, must be non-empty.
    /// - `conflicting_package`: Conflicting host package; trimmed, must be
    ///   non-empty.
    /// - `reason`: Explanation; an empty string is replaced with a generic
    ///   message.
    ///
    /// Output:
    /// - `Ok(PackageConflict)` or `Err(Error::InvalidPackageInfo)` when
    ///   either package name is empty after trimming.
    pub fn new(package: &str, conflicting_package: &str, reason: &str) -> Result<Self, Error> {
        let package = package.trim();
        let conflicting_package = conflicting_package.trim();
        if package.is_empty() || conflicting_package.is_empty() {
            return Err(Error::InvalidPackageInfo(
                "conflict package names must not be empty".into(),
            ));
        }
        let reason = reason.trim();
        Ok(Self {
            package: package.to_string(),
            conflicting_package: conflicting_package.to_string(),
            reason: if reason.is_empty() {
                GENERIC_CONFLICT_REASON.to_string()
            } else {
                reason.to_string()
            },
        })
    }

    /// Package whose installation is blocked.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Host package that conflicts with it.
    #[must_use]
    pub fn conflicting_package(&self) -> &str {
        &self.conflicting_package
    }

    /// Why the two cannot coexist.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for PackageConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} conflicts with {}: {}",
            self.package, self.conflicting_package, self.reason
        )
    }
}

/// How the conflict policy disposes of a [`PackageConflict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionAction {
    /// Remove the conflicting host package.
    Remove,
    /// Remove the conflicting host package; a later install step supplies
    /// the replacement.
    Replace,
    /// Leave both packages alone and continue.
    Skip,
    /// Stop the installation.
    Abort,
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResolutionAction::Remove => "remove",
            ResolutionAction::Replace => "replace",
            ResolutionAction::Skip => "skip",
            ResolutionAction::Abort => "abort",
        };
        f.write_str(label)
    }
}
