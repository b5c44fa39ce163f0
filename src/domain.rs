//! Domain model for the installer: value objects, entities, the session
//! aggregate, domain events, and the error taxonomy.
//!
//! Everything here is infrastructure-free; persistence and subprocess
//! concerns live in the outer modules and consume these types.

pub mod component;
pub mod config;
pub mod error;
pub mod event;
pub mod package;
pub mod session;
pub mod snapshot;

pub use component::ComponentName;
pub use config::{ComponentSelection, DiskSpace, GpuSupport, InstallationConfiguration};
pub use error::Error;
pub use event::DomainEvent;
pub use package::{PackageConflict, PackageInfo, ResolutionAction};
pub use session::{InstallationSession, InstalledComponent, Status};
pub use snapshot::SystemSnapshot;
