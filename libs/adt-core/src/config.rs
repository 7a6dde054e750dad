//! Developer, user, and CLI configuration layering (C3).
//!
//! Developer config declares the known modules and is required. User config
//! is optional and overlays per-module config and enable/disable preferences.
//! CLI overrides never touch config values, only enable/disable (see
//! [`crate::sequencer`]).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};

/// One module entry in the developer config.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleDeclaration {
    pub name: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub additional_dependencies: Vec<String>,
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
}

/// The developer-authored module manifest (`.adt-modules.json`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DevConfig {
    pub version: String,
    pub modules: Vec<ModuleDeclaration>,
    #[serde(default)]
    pub global_config: BTreeMap<String, Value>,
}

impl DevConfig {
    /// Parse and minimally validate a developer config document.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedDevConfig`] if the JSON does not parse,
    /// or [`CoreError::MissingDevConfigField`] if `version` or `modules` is absent.
    pub fn parse(path: &str, raw: &str) -> CoreResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|source| CoreError::MalformedDevConfig {
                path: path.to_string(),
                source,
            })?;
        let obj = value.as_object().ok_or(CoreError::MissingDevConfigField {
            field: "modules",
        })?;
        if !obj.contains_key("version") {
            return Err(CoreError::MissingDevConfigField { field: "version" });
        }
        if !obj.contains_key("modules") {
            return Err(CoreError::MissingDevConfigField { field: "modules" });
        }
        serde_json::from_value(value).map_err(|source| CoreError::MalformedDevConfig {
            path: path.to_string(),
            source,
        })
    }

    #[must_use]
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path).unwrap_or_default();
        Self::parse(&path.display().to_string(), &raw)
    }
}

/// User-authored preferences (enable/disable + per-module config overlays).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct UserConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, rename = "enabledModules")]
    pub enabled_modules: Vec<String>,
    #[serde(default, rename = "disabledModules")]
    pub disabled_modules: Vec<String>,
    #[serde(default, rename = "moduleOverrides")]
    pub module_overrides: BTreeMap<String, BTreeMap<String, Value>>,
}

impl UserConfig {
    /// Load user config from `path`. A missing file is treated as an empty
    /// layer, not an error; a malformed one is a configuration error.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedUserConfig`] if the file exists but does not parse.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&raw).map_err(|source| CoreError::MalformedUserConfig {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Force-enable (`true`) / force-disable (`false`) overrides supplied on the
/// command line. Never affects config values, only the enable/disable decision.
pub type CliOverrides = BTreeMap<String, bool>;

/// Layer global defaults < module entry config < user overrides for one module.
#[must_use]
pub fn effective_config(
    global_config: &BTreeMap<String, Value>,
    module_config: &BTreeMap<String, Value>,
    user_override: Option<&BTreeMap<String, Value>>,
) -> BTreeMap<String, Value> {
    let mut effective = global_config.clone();
    for (key, value) in module_config {
        effective.insert(key.clone(), value.clone());
    }
    if let Some(overrides) = user_override {
        for (key, value) in overrides {
            effective.insert(key.clone(), value.clone());
        }
    }
    effective
}
