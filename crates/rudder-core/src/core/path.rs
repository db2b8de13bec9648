use crate::core::error::{RudderError, RudderResult};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "rudder";

fn platform_dir(base: Option<PathBuf>, what: &str) -> RudderResult<PathBuf> {
    base.map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| RudderError::Path(format!("Could not determine {} directory", what)))
}

/// `<config_dir>/rudder/config.yaml`
pub fn config_file() -> RudderResult<PathBuf> {
    Ok(platform_dir(dirs::config_dir(), "config")?.join("config.yaml"))
}

/// Root under which every repository keeps its chart archives
pub fn cache_dir() -> RudderResult<PathBuf> {
    platform_dir(dirs::cache_dir(), "cache")
}

/// Default location of the record store
pub fn state_dir() -> RudderResult<PathBuf> {
    Ok(platform_dir(dirs::data_dir(), "data")?.join("state"))
}

/// Default root of the filesystem deployment driver
pub fn deploy_dir() -> RudderResult<PathBuf> {
    Ok(platform_dir(dirs::data_dir(), "data")?.join("releases"))
}

pub fn repo_cache_dir(cache_root: &Path, repo_name: &str) -> PathBuf {
    cache_root.join("repo").join(repo_name)
}

pub fn ensure_dir(path: &Path) -> RudderResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
