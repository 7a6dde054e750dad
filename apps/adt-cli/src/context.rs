//! Loads the configuration layers and module registry once per invocation
//! and assembles the `WorkflowEngine` every `journey` subcommand drives.

use std::path::PathBuf;

use adt_core::config::{CliOverrides, DevConfig, UserConfig};
use adt_core::paths::default_home_dir;
use adt_core::registry::ModuleRegistry;
use adt_core::workflow::{WorkflowEngine, WorkflowStore};
use anyhow::Context as _;

fn dev_config_path() -> PathBuf {
    std::env::var("ADT_DEV_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./.adt-modules.json"))
}

fn user_config_path() -> PathBuf {
    std::env::var("ADT_USER_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_home_dir().join(".adt").join("config.json"))
}

/// # Errors
///
/// Returns an error if the developer config, user config, or module registry
/// cannot be loaded.
pub fn build_engine(cli_overrides: CliOverrides) -> anyhow::Result<WorkflowEngine> {
    let dev_path = dev_config_path();
    let dev_config = DevConfig::load_from_file(&dev_path)
        .with_context(|| format!("loading developer config from {}", dev_path.display()))?;

    let user_path = user_config_path();
    let user_config = UserConfig::load_from_file(&user_path)
        .with_context(|| format!("loading user config from {}", user_path.display()))?;

    let registry = ModuleRegistry::discover().context("discovering registered modules")?;
    let store = WorkflowStore::default();

    Ok(WorkflowEngine::new(registry, store, dev_config, user_config, cli_overrides))
}
