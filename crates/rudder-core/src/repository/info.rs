use super::Annotations;
use crate::core::{RudderError, RudderResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository connection record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// Unique repository name
    pub name: String,

    /// Base URL of the catalog (the index document lives under it)
    pub url: String,

    #[serde(default, skip_serializing_if = "Annotations::is_empty")]
    pub annotations: Annotations,
}

impl Info {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            annotations: Annotations::new(),
        }
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    /// Reject records that cannot be registered.
    pub fn validate(&self) -> RudderResult<()> {
        if self.name.is_empty() {
            return Err(RudderError::Validation(
                "repository name must not be empty".to_string(),
            ));
        }
        if self.name.contains('/') || self.name.chars().any(char::is_whitespace) {
            return Err(RudderError::Validation(format!(
                "repository name '{}' must not contain '/' or whitespace",
                self.name
            )));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(RudderError::Validation(format!(
                "repository url '{}' must start with http:// or https://",
                self.url
            )));
        }
        if self.annotations.keys().any(|k| k.is_empty()) {
            return Err(RudderError::Validation(format!(
                "repository '{}' has an empty annotation key",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(e) => write!(f, "<{}>", e),
        }
    }
}
