//! 交互输入

use std::io::{self, BufRead, IsTerminal, Write};

use crate::interfaces::cli::CliError;

/// 读取 y/N 确认，默认否
pub fn confirm(question: &str) -> Result<bool, CliError> {
    print!("{} [y/N] ", question);
    io::stdout()
        .flush()
        .map_err(|e| CliError::CommandError(e.to_string()))?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(|e| CliError::CommandError(format!("Failed to read input: {}", e)))?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// 交互式输入密码（带确认）
pub fn prompt_password_with_confirm() -> Result<String, CliError> {
    if !io::stdin().is_terminal() {
        return Err(CliError::ParseError(
            "No password provided. Use --admin-password or run interactively.".to_string(),
        ));
    }

    let password = rpassword::prompt_password("Administrator password: ")
        .map_err(|e| CliError::CommandError(format!("Failed to read password: {}", e)))?;
    let confirm = rpassword::prompt_password("Confirm password: ")
        .map_err(|e| CliError::CommandError(format!("Failed to read password: {}", e)))?;

    if password != confirm {
        return Err(CliError::ParseError("Passwords do not match".to_string()));
    }
    Ok(password)
}
