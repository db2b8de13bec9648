pub mod install;
pub mod list;
pub mod repo;
pub mod search;
pub mod serve;
pub mod uninstall;

use rudder::config::Config;
use rudder::core::RudderResult;
use rudder::di::ServiceContainer;
use std::path::Path;

/// Build the services from the config at `path`, or the default location.
pub fn container(path: Option<&Path>) -> RudderResult<ServiceContainer> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    ServiceContainer::new(config)
}
