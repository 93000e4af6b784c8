use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

const CONFIGURATION_DIRECTORY_VAR: &str = "APP_CONFIGURATION_DIRECTORY";

/// Loads `Settings` from `configuration/base.yaml` (or `test.yaml` in tests) and
/// layers `APP_*` environment variables on top, e.g. `APP_EMAIL__SMTP_PORT=587`.
pub fn config<Settings: DeserializeOwned>() -> anyhow::Result<Settings> {
    let configuration_directory = configuration_directory()?;
    config_from_directory(&configuration_directory)
}

pub fn config_from_directory<Settings: DeserializeOwned>(
    configuration_directory: &Path,
) -> anyhow::Result<Settings> {
    let file = if cfg!(test) { "test.yaml" } else { "base.yaml" };
    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join(file)))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .with_context(|| {
            format!(
                "Failed to build configuration from {}",
                configuration_directory.display()
            )
        })?;

    settings
        .try_deserialize::<Settings>()
        .context("Failed to deserialize settings")
}

fn configuration_directory() -> anyhow::Result<PathBuf> {
    if let Ok(directory) = std::env::var(CONFIGURATION_DIRECTORY_VAR) {
        return Ok(PathBuf::from(directory));
    }
    let base_path = std::env::current_dir().context("Failed to determine the current directory")?;
    Ok(base_path.join("configuration"))
}
