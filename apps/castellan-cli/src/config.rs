//! CLI configuration loading.

use std::path::Path;

use serde::Deserialize;

use castellan_auth::SyncPolicy;
use castellan_directory::DirectorySettings;

use crate::error::{CliError, CliResult};

/// On-disk configuration: directory settings plus the sync policy.
///
/// The check command only needs the directory section, but the whole file
/// is parsed and validated so a malformed sync policy surfaces here
/// rather than at the next login.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub directory: DirectorySettings,

    #[serde(default)]
    #[allow(dead_code)]
    pub sync: SyncPolicy,
}

impl AppConfig {
    pub fn load(path: &Path) -> CliResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| CliError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;

        let config: AppConfig =
            serde_json::from_str(&raw).map_err(|e| CliError::Config(e.to_string()))?;
        config
            .directory
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(config)
    }
}
