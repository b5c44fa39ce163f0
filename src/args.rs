//! Command-line argument definition and processing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Gohan - installer and lifecycle orchestrator for Hyprland desktop stacks
/// on Debian-family systems.
#[derive(Parser, Debug)]
#[command(name = "gohan")]
#[command(version)]
#[command(about = "Install and manage a Hyprland desktop stack on Debian", long_about = None)]
pub struct Args {
    /// Set the logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Settings file (default: /etc/gohan/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log every package operation instead of executing it
    #[arg(long)]
    pub dry_run: bool,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install desktop components (e.g. `gohan install hyprland waybar kitty`)
    Install {
        /// Components to install; each is `name` or `name=version`
        #[arg(required = true)]
        components: Vec<String>,

        /// Merge existing user configuration instead of replacing it
        #[arg(long)]
        merge_config: bool,

        /// Override the disk-space requirement in bytes
        #[arg(long)]
        required_bytes: Option<u64>,
    },
    /// List recorded installation sessions, newest first
    Sessions,
    /// Print the installation history log
    History,
    /// Restore a mid-flight session's host state from its snapshot
    Rollback {
        /// Session to roll back
        session_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Install arguments parse component specs and flags.
    ///
    /// - Input: Typical install invocation with pins and flags.
    /// - Output: Components, merge flag, and dry-run flag captured.
    fn install_arguments_parse() {
        let args = Args::parse_from([
            "gohan",
            "--dry-run",
            "install",
            "hyprland=0.35.0",
            "waybar",
            "--merge-config",
        ]);
        assert!(args.dry_run);
        match args.command {
            Command::Install {
                components,
                merge_config,
                required_bytes,
            } => {
                assert_eq!(components, ["hyprland=0.35.0", "waybar"]);
                assert!(merge_config);
                assert!(required_bytes.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    /// What: Rollback requires a session id; sessions takes none.
    ///
    /// - Input: Both subcommands.
    /// - Output: Parsed variants; missing id rejected.
    fn other_subcommands_parse() {
        let args = Args::parse_from(["gohan", "rollback", "abc-123"]);
        assert!(matches!(
            args.command,
            Command::Rollback { session_id } if session_id == "abc-123"
        ));
        assert!(matches!(
            Args::parse_from(["gohan", "sessions"]).command,
            Command::Sessions
        ));
        assert!(Args::try_parse_from(["gohan", "rollback"]).is_err());
    }
}
