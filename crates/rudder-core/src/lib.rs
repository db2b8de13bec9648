//! Rudder Core Library
//!
//! Shared by the hub, the CLI, and store adapters: the error type, platform
//! paths, and the repository data model (connection records, install
//! options, search briefs, versioned records).

pub mod core;
pub mod repository;

pub use crate::core::{ErrorKind, ResultExt, RudderError, RudderResult};
pub use repository::{Annotations, Info, InstallOption, InstallerBrief, RecordMap, VersionedRecord};
