//! Configuration file of the command-line tool.
//!
//! ```json
//! {
//!   "entityLog": [
//!     { "table": "User", "insert": true, "update": true, "delete": true },
//!     { "table": "Order", "delete": true, "lifetime": 30 }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{MigrateError, Result};
use crate::patch::{EntityLogPatch, LoggedTable};

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MigrateConfig {
    /// Tables that receive entity-log triggers.
    pub entity_log: Vec<LoggedTable>,
}

impl MigrateConfig {
    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// [`MigrateError::Io`] when the file cannot be read,
    /// [`MigrateError::Config`] when it is not valid.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| MigrateError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The entity-log patch for the configured tables.
    #[must_use]
    pub fn entity_log_patch(&self) -> EntityLogPatch {
        EntityLogPatch::new().tables(self.entity_log.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_orm::EntityLogConfig;

    #[test]
    fn test_parse_config() {
        let config: MigrateConfig = serde_json::from_str(
            r#"{"entityLog": [{"table": "User", "insert": true, "update": true, "delete": true}]}"#,
        )
        .unwrap();
        assert_eq!(
            config.entity_log,
            vec![LoggedTable::new("User", EntityLogConfig::all())]
        );
    }

    #[test]
    fn test_empty_config() {
        let config: MigrateConfig = serde_json::from_str("{}").unwrap();
        assert!(config.entity_log.is_empty());
        assert!(config.entity_log_patch().logged_tables().is_empty());
    }
}
