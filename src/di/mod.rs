//! Dependency injection infrastructure for Rudder
//!
//! Every collaborator of the hub sits behind a trait so that tests can swap
//! in in-memory implementations.
//!
//! # Example (Production)
//! ```no_run
//! use rudder::config::Config;
//! use rudder::di::ServiceContainer;
//!
//! # fn example() -> rudder::core::RudderResult<()> {
//! let container = ServiceContainer::new(Config::load()?)?;
//! let hub = container.hub();
//! # Ok(())
//! # }
//! ```
//!
//! # Example (Testing)
//! ```
//! use rudder::di::{mocks::*, ServiceContainer};
//! use std::sync::Arc;
//!
//! let fetcher = Arc::new(MockFetcher::new());
//! let container = ServiceContainer::in_memory(fetcher, std::env::temp_dir());
//! ```

pub mod container;
pub mod mocks;
pub mod traits;

pub use container::ServiceContainer;
pub use traits::{
    ArtifactFetcher, DeploymentTarget, InfoStore, RawSnapshot, RepositoryConstructor,
    StateBackend, StateItem,
};
