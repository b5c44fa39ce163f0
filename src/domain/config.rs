//! Configuration value objects: disk space, GPU support, component
//! selections, and the installation configuration that binds them.

use crate::domain::component::ComponentName;
use crate::domain::error::Error;
use crate::domain::package::PackageInfo;

/// Disk capacity on the install target versus the installation requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    /// Bytes available on the install target.
    available_bytes: u64,
    /// Bytes the installation requires.
    required_bytes: u64,
}

impl DiskSpace {
    /// What: Validate and construct a disk-space value.
    ///
    /// Input:
    /// - `available_bytes`: Free bytes on the install target.
    /// - `required_bytes`: Bytes the planned installation needs; zero is
    ///   allowed.
    ///
    /// Output:
    /// - `Ok(DiskSpace)` when `available_bytes >= required_bytes`, otherwise
    ///   `Err(Error::InsufficientDiskSpace)`.
    pub fn new(available_bytes: u64, required_bytes: u64) -> Result<Self, Error> {
        if available_bytes < required_bytes {
            return Err(Error::InsufficientDiskSpace {
                available: available_bytes,
                required: required_bytes,
            });
        }
        Ok(Self {
            available_bytes,
            required_bytes,
        })
    }

    /// Bytes available on the install target.
    #[must_use]
    pub fn available_bytes(&self) -> u64 {
        self.available_bytes
    }

    /// Bytes the installation requires.
    #[must_use]
    pub fn required_bytes(&self) -> u64 {
        self.required_bytes
    }
}

/// GPU vendor support descriptor derived from hardware probing and the
/// selected driver components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuSupport {
    /// Normalized lower-case vendor: `amd`, `nvidia`, `intel`, or `other`.
    vendor: String,
    /// Whether the installation must apply a vendor driver.
    requires_driver: bool,
    /// The driver component to apply, when one is required.
    driver: Option<ComponentName>,
}

impl GpuSupport {
    /// What: Validate and construct a GPU support descriptor.
    ///
    /// Input:
    /// - `vendor`: Vendor name; trimmed and lower-cased, must be one of
    ///   `amd`, `nvidia`, `intel`, `other`.
    /// - `requires_driver`: Whether a vendor driver must be installed.
    /// - `driver`: Driver component; required when `requires_driver`, and it
    ///   must be a driver matching the vendor.
    ///
    /// Output:
    /// - `Ok(GpuSupport)` or `Err(Error::InvalidGpuSupport)` describing the
    ///   violated invariant.
    pub fn new(
        vendor: &str,
        requires_driver: bool,
        driver: Option<ComponentName>,
    ) -> Result<Self, Error> {
        let vendor = vendor.trim().to_lowercase();
        if vendor.is_empty() {
            return Err(Error::InvalidGpuSupport("vendor must not be empty".into()));
        }
        if !matches!(vendor.as_str(), "amd" | "nvidia" | "intel" | "other") {
            return Err(Error::InvalidGpuSupport(format!(
                "unknown vendor `{vendor}`"
            )));
        }
        if requires_driver {
            let Some(driver_name) = driver.as_ref() else {
                return Err(Error::InvalidGpuSupport(
                    "a driver component is required when requires_driver is set".into(),
                ));
            };
            if !driver_name.is_driver() {
                return Err(Error::InvalidGpuSupport(format!(
                    "{driver_name} is not a driver component"
                )));
            }
            let matches_vendor = matches!(
                (vendor.as_str(), driver_name),
                ("amd", ComponentName::AmdDriver)
                    | ("nvidia", ComponentName::NvidiaDriver)
                    | ("intel", ComponentName::IntelDriver)
            );
            if !matches_vendor {
                return Err(Error::InvalidGpuSupport(format!(
                    "driver {driver_name} does not match vendor {vendor}"
                )));
            }
        }
        Ok(Self {
            vendor,
            requires_driver,
            driver,
        })
    }

    /// Normalized vendor name.
    #[must_use]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Whether a vendor driver must be installed.
    #[must_use]
    pub fn requires_driver(&self) -> bool {
        self.requires_driver
    }

    /// The driver component, when one is required.
    #[must_use]
    pub fn driver(&self) -> Option<&ComponentName> {
        self.driver.as_ref()
    }

    /// True iff the vendor needs a proprietary driver stack (NVIDIA).
    #[must_use]
    pub fn requires_proprietary(&self) -> bool {
        self.vendor == "nvidia"
    }
}

/// One requested component at a pinned version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSelection {
    /// Which component is requested.
    component: ComponentName,
    /// Version the component is pinned to.
    version: String,
    /// Resolved package metadata, when the planner has it.
    package_info: Option<PackageInfo>,
}

impl ComponentSelection {
    /// What: Validate and construct a component selection.
    ///
    /// Input:
    /// - `component`: The component name.
    /// - `version`: Pinned version; trimmed, must be non-empty.
    /// - `package_info`: Resolved package metadata, if known.
    ///
    /// Output:
    /// - `Ok(ComponentSelection)` or `Err(Error::InvalidComponentSelection)`
    ///   when the version is empty after trimming.
    pub fn new(
        component: ComponentName,
        version: &str,
        package_info: Option<PackageInfo>,
    ) -> Result<Self, Error> {
        let version = version.trim();
        if version.is_empty() {
            return Err(Error::InvalidComponentSelection(format!(
                "version for {component} must not be empty"
            )));
        }
        Ok(Self {
            component,
            version: version.to_string(),
            package_info,
        })
    }

    /// The selected component.
    #[must_use]
    pub fn component(&self) -> &ComponentName {
        &self.component
    }

    /// Pinned version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Resolved package metadata, when known.
    #[must_use]
    pub fn package_info(&self) -> Option<&PackageInfo> {
        self.package_info.as_ref()
    }

    /// Delegates to [`ComponentName::is_core`].
    #[must_use]
    pub fn is_core(&self) -> bool {
        self.component.is_core()
    }

    /// Delegates to [`ComponentName::is_driver`].
    #[must_use]
    pub fn is_driver(&self) -> bool {
        self.component.is_driver()
    }
}

/// The full set of inputs a session installs from.
///
/// Duplicate selections of the same component (at different versions) are
/// permitted; the apply phase installs them in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationConfiguration {
    /// Requested components in declaration order.
    components: Vec<ComponentSelection>,
    /// GPU support descriptor, when hardware probing produced one.
    gpu: Option<GpuSupport>,
    /// Disk capacity versus requirement at planning time.
    disk_space: DiskSpace,
    /// Whether existing user configuration files are merged rather than
    /// replaced.
    merge_existing_config: bool,
}

impl InstallationConfiguration {
    /// What: Validate and construct an installation configuration.
    ///
    /// Input:
    /// - `components`: Requested selections; copied, must be non-empty and
    ///   contain at least one core component.
    /// - `gpu`: Optional GPU support descriptor.
    /// - `disk_space`: Disk capacity value (already validated).
    /// - `merge_existing_config`: Merge-vs-replace flag for user config.
    ///
    /// Output:
    /// - `Ok(InstallationConfiguration)`, `Err(Error::InvalidConfiguration)`
    ///   when the selection list is empty, or
    ///   `Err(Error::CoreComponentRequired)` when no core component is
    ///   present.
    pub fn new(
        components: &[ComponentSelection],
        gpu: Option<GpuSupport>,
        disk_space: DiskSpace,
        merge_existing_config: bool,
    ) -> Result<Self, Error> {
        if components.is_empty() {
            return Err(Error::InvalidConfiguration(
                "at least one component must be selected".into(),
            ));
        }
        if !components.iter().any(ComponentSelection::is_core) {
            return Err(Error::CoreComponentRequired);
        }
        Ok(Self {
            components: components.to_vec(),
            gpu,
            disk_space,
            merge_existing_config,
        })
    }

    /// Requested components in declaration order.
    #[must_use]
    pub fn components(&self) -> &[ComponentSelection] {
        &self.components
    }

    /// GPU support descriptor, when present.
    #[must_use]
    pub fn gpu(&self) -> Option<&GpuSupport> {
        self.gpu.as_ref()
    }

    /// Disk capacity value.
    #[must_use]
    pub fn disk_space(&self) -> &DiskSpace {
        &self.disk_space
    }

    /// Merge-vs-replace flag for existing user configuration.
    #[must_use]
    pub fn merge_existing_config(&self) -> bool {
        self.merge_existing_config
    }
}
