//! 租户管理命令

use colored::Colorize;

use super::prompt::{confirm, prompt_password_with_confirm};
use crate::api::AppState;
use crate::interfaces::cli::CliError;
use crate::storage::{Tenant, TenantStatus};
use crate::tenancy::RegisterTenant;

fn print_tenant(tenant: &Tenant) {
    let label = tenant.status.to_string();
    let status = match tenant.status {
        TenantStatus::Active => label.as_str().green(),
        TenantStatus::Suspended => label.as_str().yellow(),
        TenantStatus::Failed => label.as_str().red(),
        TenantStatus::Pending | TenantStatus::Provisioning => label.as_str().cyan(),
    };
    println!(
        "  {} {} [{}] {} {}",
        tenant.subdomain.bold(),
        tenant.name,
        status,
        tenant.database_name.dimmed(),
        tenant.id.dimmed()
    );
    if let Some(reason) = &tenant.failure_reason {
        println!("      {} {}", "reason:".red(), reason);
    }
}

pub async fn list(state: &AppState, status: Option<String>) -> Result<(), CliError> {
    let status = status
        .map(|s| {
            s.parse::<TenantStatus>()
                .map_err(|_| CliError::ParseError(format!("Unknown tenant status '{}'", s)))
        })
        .transpose()?;

    let tenants: Vec<Tenant> = state
        .landlord
        .list_all()
        .await?
        .into_iter()
        .filter(|t| status.is_none_or(|s| t.status == s))
        .collect();

    if tenants.is_empty() {
        println!("{}", "No tenants found".dimmed());
        return Ok(());
    }
    println!("{} tenant(s):", tenants.len().to_string().bold());
    for tenant in &tenants {
        print_tenant(tenant);
    }
    Ok(())
}

pub async fn create(
    state: &AppState,
    subdomain: String,
    company_name: String,
    admin_name: String,
    admin_email: String,
    admin_password: Option<String>,
) -> Result<(), CliError> {
    let admin_password = match admin_password {
        Some(password) => password,
        None => prompt_password_with_confirm()?,
    };

    println!("{} {}", "Provisioning tenant".yellow(), subdomain.blue());
    let tenant = state
        .provisioner
        .register(RegisterTenant {
            company_name,
            subdomain,
            admin_name,
            admin_email,
            admin_password,
        })
        .await?;

    println!("{}", "Tenant is ready".green());
    print_tenant(&tenant);
    Ok(())
}

pub async fn migrate(state: &AppState, key: Option<String>, all: bool) -> Result<(), CliError> {
    let targets: Vec<Tenant> = if all {
        state
            .landlord
            .list_all()
            .await?
            .into_iter()
            .filter(|t| matches!(t.status, TenantStatus::Active | TenantStatus::Suspended))
            .collect()
    } else {
        let key = key.ok_or_else(|| CliError::ParseError("Tenant is required".to_string()))?;
        let tenant = state
            .landlord
            .find_by_key(&key)
            .await?
            .ok_or_else(|| CliError::CommandError(format!("Tenant '{}' not found", key)))?;
        vec![tenant]
    };

    let mut failures = 0usize;
    for tenant in &targets {
        match state.provisioner.migrate_tenant(tenant).await {
            Ok(()) => println!("  {} {}", "migrated".green(), tenant.subdomain),
            Err(e) => {
                failures += 1;
                println!("  {} {}: {}", "failed".red(), tenant.subdomain, e);
            }
        }
    }

    if failures > 0 {
        return Err(CliError::CommandError(format!(
            "{} of {} tenant migration(s) failed",
            failures,
            targets.len()
        )));
    }
    println!("{} tenant(s) migrated", targets.len());
    Ok(())
}

pub async fn set_suspended(state: &AppState, key: &str, suspended: bool) -> Result<(), CliError> {
    let tenant = state.provisioner.set_suspended(key, suspended).await?;
    print_tenant(&tenant);
    Ok(())
}

pub async fn delete(state: &AppState, key: &str, force: bool) -> Result<(), CliError> {
    if !force
        && !confirm(&format!(
            "{} '{}' and its database?",
            "Permanently delete tenant".red(),
            key
        ))?
    {
        println!("{}", "Aborted.".red());
        return Ok(());
    }

    let tenant = state.provisioner.deprovision(key).await?;
    println!("{} {}", "Deleted".green(), tenant.subdomain);
    Ok(())
}
