//! CLI mode

use crate::cli::Commands;
use crate::interfaces::cli::CliError;

/// 执行一条运维命令
pub async fn run_cli(command: Commands) -> Result<(), CliError> {
    crate::interfaces::cli::run_cli_command(command).await
}
