//! Host-probing preflight implementation for Debian-family systems.
//!
//! Checks run sequentially on the caller's task, streaming one update per
//! check. Subprocess probes go through the [`CommandRunner`] seam; filesystem
//! and socket probes use paths and hosts from [`PreflightOptions`] so tests
//! can point them at fixtures.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::error::Error;
use crate::preflight::{
    CheckResult, Guidance, PreflightChecker, PreflightUpdateSender, ProgressUpdate, Requirement,
    Severity, ValidationSession,
};
use crate::util::{format_bytes, CommandRunner, GB};

/// Debian releases the desktop stack supports.
const SUPPORTED_CODENAMES: &[&str] = &["sid", "trixie"];

/// How long the mirror probe waits before reporting the network down.
const NETWORK_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for the host preflight probes.
#[derive(Debug, Clone)]
pub struct PreflightOptions {
    /// Where the os-release file lives.
    pub os_release_path: PathBuf,
    /// Directory holding apt source configuration.
    pub apt_dir: PathBuf,
    /// Filesystem the packages land on.
    pub install_root: PathBuf,
    /// Mirror host probed for reachability.
    pub mirror_host: String,
    /// Mirror port probed for reachability.
    pub mirror_port: u16,
    /// Bytes the planned installation needs free.
    pub required_bytes: u64,
}

impl Default for PreflightOptions {
    fn default() -> Self {
        Self {
            os_release_path: PathBuf::from("/etc/os-release"),
            apt_dir: PathBuf::from("/etc/apt"),
            install_root: PathBuf::from("/"),
            mirror_host: "deb.debian.org".to_string(),
            mirror_port: 443,
            required_bytes: 10 * GB,
        }
    }
}

/// Preflight checker that probes the local host.
pub struct HostPreflight {
    /// Subprocess seam for `lspci`.
    runner: Arc<dyn CommandRunner>,
    /// Probe tunables.
    options: PreflightOptions,
}

impl HostPreflight {
    /// Build a host preflight with the given runner and options.
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>, options: PreflightOptions) -> Self {
        Self { runner, options }
    }

    /// Parse `KEY=VALUE` lines from an os-release body, stripping quotes.
    fn os_release_value(body: &str, key: &str) -> Option<String> {
        body.lines().find_map(|line| {
            let (k, v) = line.split_once('=')?;
            if k.trim() != key {
                return None;
            }
            Some(v.trim().trim_matches('"').to_string())
        })
    }

    /// Validate the Debian release against the supported codenames.
    async fn check_debian_release(&self) -> CheckResult {
        let guidance = Guidance::new(&format!(
            "upgrade the host to Debian {} before installing",
            SUPPORTED_CODENAMES.join(" or ")
        ));
        let expected = SUPPORTED_CODENAMES.join(" or ");
        let body = match tokio::fs::read_to_string(&self.options.os_release_path).await {
            Ok(body) => body,
            Err(err) => {
                return CheckResult::new(
                    Requirement::DebianVersion,
                    Severity::Critical,
                    false,
                    &format!("unreadable os-release ({err})"),
                    &expected,
                    guidance,
                );
            }
        };
        let id = Self::os_release_value(&body, "ID").unwrap_or_default();
        let id_like = Self::os_release_value(&body, "ID_LIKE").unwrap_or_default();
        let codename = Self::os_release_value(&body, "VERSION_CODENAME").unwrap_or_default();
        let debian_family = id == "debian" || id_like.split_whitespace().any(|l| l == "debian");
        if !debian_family {
            return CheckResult::new(
                Requirement::DebianVersion,
                Severity::Critical,
                false,
                &format!("non-Debian host ({id})"),
                &expected,
                guidance,
            );
        }
        let supported = SUPPORTED_CODENAMES.contains(&codename.as_str());
        CheckResult::new(
            Requirement::DebianVersion,
            Severity::Critical,
            supported,
            if codename.is_empty() { &id } else { &codename },
            &expected,
            guidance,
        )
    }

    /// Verify the apt tooling is on PATH.
    fn check_package_manager(&self) -> CheckResult {
        let present = which::which("apt-get").is_ok();
        CheckResult::new(
            Requirement::PackageManager,
            Severity::Critical,
            present,
            if present { "apt-get" } else { "apt-get missing" },
            "apt-get on PATH",
            Guidance::new("install the apt tooling and re-run the installer"),
        )
    }

    /// Verify at least one apt source is configured.
    fn check_repositories(&self) -> CheckResult {
        let sources_list = self.options.apt_dir.join("sources.list");
        let sources_dir = self.options.apt_dir.join("sources.list.d");
        let list_present = std::fs::metadata(&sources_list).map(|m| m.len() > 0).unwrap_or(false);
        let dir_present = std::fs::read_dir(&sources_dir)
            .map(|mut entries| entries.next().is_some())
            .unwrap_or(false);
        let configured = list_present || dir_present;
        CheckResult::new(
            Requirement::Repositories,
            Severity::Critical,
            configured,
            if configured {
                "apt sources configured"
            } else {
                "no apt sources found"
            },
            "at least one apt source",
            Guidance::new("configure an apt source under /etc/apt and re-run"),
        )
    }

    /// Verify the install target has enough free space.
    fn check_disk_space(&self) -> CheckResult {
        let required = self.options.required_bytes;
        let guidance = Guidance::new(&format!(
            "free at least {} on the install target",
            format_bytes(required)
        ));
        let expected = format!("{} free", format_bytes(required));
        match nix::sys::statvfs::statvfs(&self.options.install_root) {
            Ok(stat) => {
                let available = stat.blocks_available() as u64 * stat.fragment_size() as u64;
                CheckResult::new(
                    Requirement::DiskSpace,
                    Severity::Critical,
                    available >= required,
                    &format!("{} free", format_bytes(available)),
                    &expected,
                    guidance,
                )
            }
            Err(err) => CheckResult::new(
                Requirement::DiskSpace,
                Severity::Critical,
                false,
                &format!("unreadable filesystem ({err})"),
                &expected,
                guidance,
            ),
        }
    }

    /// Verify the configured mirror answers on its port.
    async fn check_network(&self, ctx: &CancellationToken) -> CheckResult {
        let target = (self.options.mirror_host.clone(), self.options.mirror_port);
        let observed_host = format!("{}:{}", target.0, target.1);
        let connect = tokio::time::timeout(
            NETWORK_PROBE_TIMEOUT,
            tokio::net::TcpStream::connect(target),
        );
        let reachable = tokio::select! {
            result = connect => matches!(result, Ok(Ok(_))),
            () = ctx.cancelled() => false,
        };
        let observed = if reachable {
            format!("{observed_host} reachable")
        } else {
            format!("{observed_host} unreachable")
        };
        CheckResult::new(
            Requirement::Network,
            Severity::Critical,
            reachable,
            &observed,
            "mirror reachable",
            Guidance::new("check the network connection and apt mirror availability"),
        )
    }

    /// Probe GPU hardware; informational only.
    async fn check_gpu(&self, ctx: &CancellationToken) -> CheckResult {
        let vendor = match self.runner.run(ctx, "lspci", &[], &[]).await {
            Ok(out) => detect_gpu_vendor(&out).unwrap_or_else(|| "unknown".to_string()),
            Err(err) => {
                tracing::debug!(error = %err, "lspci probe failed");
                "unknown".to_string()
            }
        };
        CheckResult::new(
            Requirement::Gpu,
            Severity::Info,
            true,
            &vendor,
            "any",
            Guidance::new("select the matching GPU driver component"),
        )
    }
}

/// What: Extract the GPU vendor from `lspci` output.
///
/// Input:
/// - `lspci_output`: Full stdout of an `lspci` run.
///
/// Output:
/// - `Some("amd" | "nvidia" | "intel" | "other")` when a display controller
///   line is present, `None` otherwise.
#[must_use]
pub fn detect_gpu_vendor(lspci_output: &str) -> Option<String> {
    let line = lspci_output
        .lines()
        .find(|line| line.contains(" VGA ") || line.contains("3D controller"))?;
    let lower = line.to_lowercase();
    let vendor = if lower.contains("nvidia") {
        "nvidia"
    } else if lower.contains("amd") || lower.contains("ati") {
        "amd"
    } else if lower.contains("intel") {
        "intel"
    } else {
        "other"
    };
    Some(vendor.to_string())
}

#[async_trait]
impl PreflightChecker for HostPreflight {
    async fn run(
        &self,
        ctx: &CancellationToken,
        updates: PreflightUpdateSender,
    ) -> Result<ValidationSession, Error> {
        let mut session = ValidationSession::new();
        let announce = |message: &str| {
            let _ = updates.send(ProgressUpdate {
                message: message.to_string(),
            });
        };

        announce("checking Debian release");
        session.add(self.check_debian_release().await);
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        announce("checking package manager availability");
        session.add(self.check_package_manager());

        announce("checking apt repository configuration");
        session.add(self.check_repositories());

        announce("checking free disk space");
        session.add(self.check_disk_space());
        if ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }

        announce("checking network connectivity");
        session.add(self.check_network(ctx).await);

        announce("detecting GPU hardware");
        session.add(self.check_gpu(ctx).await);

        tracing::info!(
            blockers = session.blocking_results().len(),
            warnings = session.warning_results().len(),
            "preflight finished"
        );
        Ok(session)
    }
}
