mod config_gen;
mod prompt;
pub mod tenants;

pub use config_gen::config_generate;
