//! Generate config command

use std::path::Path;

use colored::Colorize;

use super::prompt::confirm;
use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;

/// Generate example configuration file
pub async fn config_generate(output_path: Option<String>, force: bool) -> Result<(), CliError> {
    let path = output_path.unwrap_or_else(|| "config.example.toml".to_string());

    // 非 --force 模式下交互确认
    if !force
        && Path::new(&path).exists()
        && !confirm(&format!("{} {}. Overwrite?", "File already exists:".yellow(), path.blue()))?
    {
        println!("{}", "Aborted.".red());
        return Ok(());
    }

    StaticConfig::default().save_to_file(&path).map_err(|e| {
        CliError::CommandError(format!("Unable to write configuration file: {}", e))
    })?;

    println!(
        "  {} {}",
        "Configuration file generated successfully".green(),
        path.blue()
    );
    println!(
        "  {}",
        "Set auth.jwt_secret and auth.landlord_token before starting the server".yellow()
    );
    Ok(())
}
