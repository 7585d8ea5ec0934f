//! CLI interface module
//!
//! 运维命令直接连接 landlord 库执行，不经过 HTTP 服务。

pub mod commands;

use std::fmt;
use std::sync::Arc;

use crate::api::AppState;
use crate::cli::{Commands, ConfigCommands, TenantCommands};
use crate::config::get_config;
use crate::errors::CrmError;
use crate::runtime::lifetime::startup::build_state;
use crate::storage::open_landlord;
use commands::{config_generate, tenants};

#[derive(Debug)]
pub enum CliError {
    StorageError(String),
    ParseError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StorageError(msg) => format!("Storage error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StorageError(msg) => {
                format!("{} {}", "Storage error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<CrmError> for CliError {
    fn from(err: CrmError) -> Self {
        match err {
            CrmError::DatabaseConfig(_)
            | CrmError::DatabaseConnection(_)
            | CrmError::DatabaseOperation(_) => CliError::StorageError(err.message().to_string()),
            CrmError::Validation(_) => CliError::ParseError(err.message().to_string()),
            _ => CliError::CommandError(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::StorageError(format!("{:#}", err))
    }
}

/// 连接 landlord 库并组装租户管理所需的组件
async fn open_state() -> Result<Arc<AppState>, CliError> {
    let config = get_config();
    let landlord = open_landlord(&config.database).await?;
    Ok(Arc::new(build_state(&config, landlord)?))
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Serve => Err(CliError::CommandError(
            "serve is handled by the server mode".to_string(),
        )),

        // Generate 不需要数据库
        Commands::Config {
            action: ConfigCommands::Generate { output_path, force },
        } => config_generate(output_path, force).await,

        Commands::Migrate => {
            // open_landlord 会执行 landlord 迁移
            open_state().await?;
            println!("Landlord database is up to date");
            Ok(())
        }

        Commands::Tenant { action } => {
            let state = open_state().await?;
            match action {
                TenantCommands::List { status } => tenants::list(&state, status).await,
                TenantCommands::Create {
                    subdomain,
                    name,
                    admin_name,
                    admin_email,
                    admin_password,
                } => {
                    tenants::create(
                        &state,
                        subdomain,
                        name,
                        admin_name,
                        admin_email,
                        admin_password,
                    )
                    .await
                }
                TenantCommands::Migrate { tenant, all } => {
                    tenants::migrate(&state, tenant, all).await
                }
                TenantCommands::Suspend { tenant } => {
                    tenants::set_suspended(&state, &tenant, true).await
                }
                TenantCommands::Activate { tenant } => {
                    tenants::set_suspended(&state, &tenant, false).await
                }
                TenantCommands::Delete { tenant, force } => {
                    tenants::delete(&state, &tenant, force).await
                }
            }
        }
    }
}
