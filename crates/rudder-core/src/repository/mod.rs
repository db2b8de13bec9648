//! Repository data model.
//!
//! [`Info`] is the durable connection record of one plugin repository.
//! [`InstallOption`] and [`InstallerBrief`] are the values exchanged with
//! installers and catalog searches. [`RecordMap`] is the document the
//! durable store keeps, used by the hub only for diffing snapshots.

mod brief;
mod info;
mod option;
mod record;

pub use brief::InstallerBrief;
pub use info::Info;
pub use option::InstallOption;
pub use record::{RecordMap, VersionedRecord};

/// Arbitrary JSON data attached to a record or an installer.
pub type Annotations = serde_json::Map<String, serde_json::Value>;

/// Annotation key holding the chart README text.
pub const README_KEY: &str = "readme";

/// Annotation key holding the raw default values document.
pub const CONFIGURATION_KEY: &str = "configuration";

/// Annotation key holding the values JSON schema.
pub const CONFIGURATION_SCHEMA_KEY: &str = "configuration_schema";

/// Annotation key holding the raw chart description document.
pub const CHART_DESC_KEY: &str = "Chart";
