//! # Gohan Crate Overview
//!
//! Gohan installs and manages a Hyprland desktop stack on Debian-family
//! hosts: it validates the host, snapshots the pre-installation state,
//! resolves package conflicts, applies the selected components through apt,
//! and records every outcome durably so a session survives a process
//! restart. Integration tests and downstream tooling can depend on this
//! crate to drive installations without going through the binary
//! entrypoint.
//!
//! ## Highlights
//! - [`install::Orchestrator`] driving the preflight → snapshot → conflicts
//!   → apply → configure → verify pipeline with progress fan-out.
//! - A persistence contract ([`repo`]) with in-memory and single-file
//!   SQLite repositories that rebuild the session aggregate field-for-field.
//! - Collaborator seams (package manager, preflight, snapshots, history)
//!   as object-safe async traits, each with a host-facing implementation.
//!
//! ## Crate Layout
//! - [`domain`]: value objects, entities, the session aggregate, events,
//!   and the error taxonomy.
//! - [`install`]: orchestrator, conflict policy, progress estimation, and
//!   the component→package mapping.
//! - [`pm`], [`preflight`], [`snapshot`], [`history`]: collaborator
//!   contracts plus their apt/dpkg/host implementations.
//! - [`repo`]: session persistence and DTO reconstruction.
//! - [`app`], [`args`], [`settings`], [`util`]: binary runtime glue.
//!
//! ## Quick Start
//! ```no_run
//! use clap::Parser;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let args = gohan::args::Args::parse();
//!     gohan::app::run(args).await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod args;
pub mod deploy;
pub mod domain;
pub mod history;
pub mod install;
pub mod pm;
pub mod preflight;
pub mod repo;
pub mod settings;
pub mod snapshot;
pub mod util;
