//! Rudder: a plugin repository hub
//!
//! This crate tracks chart repositories, keeps them reconciled against a
//! durable record store, and installs plugins from them. Errors, paths, and
//! the repository data model come from `rudder-core`.

pub use rudder_core::{ErrorKind, ResultExt, RudderError, RudderResult};

/// Core module re-exported from rudder-core.
pub mod core {
    pub use rudder_core::core::*;
    pub use rudder_core::*;

    /// Path module re-exported from rudder-core.
    pub mod path {
        pub use rudder_core::core::path::*;
    }
}

/// Configuration management.
pub mod config;

/// Catalog documents and artifact fetching.
pub mod catalog;

/// Chart archives.
pub mod chart;

/// Deployment targets and manifest rendering.
pub mod deploy;

/// Dependency injection infrastructure.
pub mod di;

/// The reconciling repository hub.
pub mod hub;

/// Plugin installers.
pub mod installer;

/// Manifest post-rendering.
pub mod postrender;

/// Plugin repositories.
pub mod repository;

/// Durable repository records.
pub mod store;
