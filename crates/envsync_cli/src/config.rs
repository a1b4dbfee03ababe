//! Settings file handling for the envsync CLI.
//!
//! The settings file is TOML and declares the desired environments of one repository:
//!
//! ```toml
//! [[environments]]
//! name = "Production"
//! wait_timer = 5
//! prevent_self_review = true
//! reviewers = [{ id = 1, type = "Team" }]
//! deployment_branch_policy = { protected_branches = false, custom_branch_policies = [{ name = "main" }] }
//! variables = [{ name = "REGION", value = "eu" }]
//! deployment_protection_rules = [{ app_id = 42 }]
//! ```
//!
//! Keys left out of an environment are not managed beyond their defaults. A file without
//! an `environments` key configures nothing, and a sync run with it changes nothing.

use std::{fs, path::Path};

use envsync_core::EnvironmentEntry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::Error;

/// Default settings file name
pub const DEFAULT_SETTINGS_FILENAME: &str = "envsync.toml";

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Contents of a settings file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsFile {
    /// Desired environments; `None` when the file does not mention environments at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<EnvironmentEntry>>,
}

impl SettingsFile {
    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file does not exist, cannot be read or does not
    /// match the expected shape.
    pub fn load(path: &Path) -> Result<Self, Error> {
        debug!("Loading settings from {:?}", path);

        if !path.exists() {
            return Err(Error::Config(format!("Settings file not found: {:?}", path)));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read settings file: {}", e)))?;

        Self::parse(&content)
    }

    /// Parses settings from TOML text.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let settings: SettingsFile = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse settings file: {}", e)))?;

        if let Some(environments) = &settings.environments {
            if let Some(unnamed) = environments.iter().position(|e| e.name.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "Environment #{} has an empty name",
                    unnamed + 1
                )));
            }
        }

        Ok(settings)
    }
}
