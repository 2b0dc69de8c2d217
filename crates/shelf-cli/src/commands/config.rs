use std::path::Path;

use shelf_core::ClientConfig;

use crate::error::CliError;

pub fn run_config_show(config: &ClientConfig, config_path: &Path) -> Result<(), CliError> {
    println!("# {}", config_path.display());
    println!("{}", serde_json::to_string_pretty(config)?);
    println!("# push endpoint: {}", config.resolved_push_url());
    Ok(())
}

/// Persist a new service URL, keeping the rest of the file.
pub fn run_config_set_url(url: &str, config_path: &Path) -> Result<(), CliError> {
    let current = ClientConfig::load_from_path(config_path)?.unwrap_or_default();
    let updated = ClientConfig {
        api_base_url: url.to_string(),
        ..current
    }
    .validated()
    .map_err(|error| CliError::Config(error.to_string()))?;

    updated.save_to_path(config_path)?;
    println!("API URL set to {}", updated.api_base_url);
    Ok(())
}
