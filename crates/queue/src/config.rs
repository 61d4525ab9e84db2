//! Queue configuration.

use serde::{Deserialize, Serialize};

/// Dispatch queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Worker thread name; also the `queue` field on every log line.
    pub name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: "keyqueue-dispatch".to_string(),
        }
    }
}

impl QueueConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: QueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, QueueConfig::default());
    }

    #[test]
    fn builder_overrides_name() {
        let config = QueueConfig::default().with_name("orders");
        assert_eq!(config.name, "orders");
    }
}
