use crate::core::{RudderError, RudderResult};
use serde::{Deserialize, Serialize};

/// A single install option (a top-level chart value)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallOption {
    pub key: String,
    pub value: serde_json::Value,
}

impl InstallOption {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Parse `key=value`, reading the value as JSON and falling back to a
    /// plain string.
    pub fn parse(s: &str) -> RudderResult<Self> {
        let (key, raw) = s.split_once('=').ok_or_else(|| {
            RudderError::Validation(format!("option '{}' must have the form key=value", s))
        })?;
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        let option = Self::new(key.trim(), value);
        option.validate()?;
        Ok(option)
    }

    pub fn validate(&self) -> RudderResult<()> {
        if self.key.trim().is_empty() {
            return Err(RudderError::Validation(
                "option key must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
