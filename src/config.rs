use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Banter chat server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(name = "banter-server", version, about = "Banter real-time chat server")]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "BANTER_PORT", default_value = "8000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "BANTER_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./banter.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "BANTER_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Skip seeding the demo chats and message histories at boot
    #[arg(long, env = "BANTER_NO_SEED")]
    pub no_seed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            bind_address: "0.0.0.0".to_string(),
            config: "./banter.toml".to_string(),
            json_logs: false,
            generate_config: false,
            no_seed: false,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (BANTER_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("BANTER_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Banter Chat Server Configuration
# Place this file at ./banter.toml or specify with --config <path>
# All settings can be overridden via environment variables (BANTER_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8000)
# port = 8000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Skip seeding the demo chats and message histories at boot
# no_seed = false
"#
    .to_string()
}
