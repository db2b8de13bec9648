use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Summary of one catalog entry, as returned by a search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallerBrief {
    pub name: String,

    /// Name of the repository the entry came from
    pub repo: String,

    pub version: String,

    /// Whether a deployed instance with this name and version exists
    pub installed: bool,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl InstallerBrief {
    /// True if `other` names the same package version.
    pub fn same_package(&self, other: &InstallerBrief) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl fmt::Display for InstallerBrief {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.repo, self.name, self.version)
    }
}
