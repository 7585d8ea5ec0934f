//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// salesdesk - multi-tenant sales/CRM backend
#[derive(Parser)]
#[command(name = "salesdesk")]
#[command(version)]
#[command(about = "Multi-tenant sales/CRM backend", long_about = None)]
pub struct Cli {
    /// Configuration file (default: config.toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default when no command is given)
    Serve,

    /// Run landlord database migrations
    Migrate,

    /// Manage tenants
    Tenant {
        #[command(subcommand)]
        action: TenantCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Tenant management commands
#[derive(Subcommand)]
pub enum TenantCommands {
    /// List tenants
    List {
        /// Filter by status (pending, provisioning, active, suspended, failed)
        #[arg(long)]
        status: Option<String>,
    },

    /// Register and provision a tenant
    Create {
        /// Subdomain, e.g. `acme` for acme.example.com
        subdomain: String,

        /// Company name
        #[arg(long)]
        name: String,

        /// Administrator display name
        #[arg(long)]
        admin_name: String,

        /// Administrator email
        #[arg(long)]
        admin_email: String,

        /// Administrator password (prompted when omitted)
        #[arg(long)]
        admin_password: Option<String>,
    },

    /// Re-run tenant database migrations
    Migrate {
        /// Tenant id or subdomain
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        tenant: Option<String>,

        /// Migrate every active or suspended tenant
        #[arg(long)]
        all: bool,
    },

    /// Suspend a tenant
    Suspend {
        /// Tenant id or subdomain
        tenant: String,
    },

    /// Reactivate a suspended tenant
    Activate {
        /// Tenant id or subdomain
        tenant: String,
    },

    /// Drop the tenant database and its landlord record
    Delete {
        /// Tenant id or subdomain
        tenant: String,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Force overwrite without confirmation
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tenant_create() {
        let cli = Cli::try_parse_from([
            "salesdesk",
            "-c",
            "prod.toml",
            "tenant",
            "create",
            "acme",
            "--name",
            "Acme Ltd",
            "--admin-name",
            "Jane",
            "--admin-email",
            "jane@acme.io",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("prod.toml"));
        match cli.command {
            Some(Commands::Tenant {
                action:
                    TenantCommands::Create {
                        subdomain,
                        admin_password,
                        ..
                    },
            }) => {
                assert_eq!(subdomain, "acme");
                assert!(admin_password.is_none());
            }
            _ => panic!("expected tenant create"),
        }
    }

    #[test]
    fn test_migrate_requires_target() {
        assert!(Cli::try_parse_from(["salesdesk", "tenant", "migrate"]).is_err());
        assert!(Cli::try_parse_from(["salesdesk", "tenant", "migrate", "--all"]).is_ok());
        assert!(Cli::try_parse_from(["salesdesk", "tenant", "migrate", "acme", "--all"]).is_err());
    }

    #[test]
    fn test_no_command_defaults_to_none() {
        let cli = Cli::try_parse_from(["salesdesk"]).unwrap();
        assert!(cli.command.is_none());
    }
}
