use clap::Parser;

use salesdesk::cli::{Cli, Commands};
use salesdesk::config::{get_config, init_config_from};
use salesdesk::runtime::modes;
use salesdesk::system::init_logging;

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref().unwrap_or("config.toml"));

    let config = get_config();
    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        None | Some(Commands::Serve) => {
            if let Err(e) = modes::run_server().await {
                eprintln!("Server error: {:#}", e);
                std::process::exit(1);
            }
        }
        #[cfg(feature = "cli")]
        Some(command) => {
            if let Err(e) = modes::run_cli(command).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
        }
        #[cfg(not(feature = "cli"))]
        Some(_) => {
            eprintln!("This build does not include the CLI commands");
            std::process::exit(1);
        }
    }
}
