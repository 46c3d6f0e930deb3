use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::game::GameParameters;

/// Wordfriends session server
#[derive(Parser, Serialize, Deserialize, Clone, Debug)]
#[command(
    name = "wordfriends-server",
    version,
    about = "Wordfriends session server"
)]
pub struct Config {
    /// Port to listen on
    #[arg(long, env = "WORDFRIENDS_PORT", default_value = "9000")]
    pub port: u16,

    /// Bind address
    #[arg(long, env = "WORDFRIENDS_BIND_ADDRESS", default_value = "0.0.0.0")]
    pub bind_address: String,

    /// Path to TOML config file
    #[arg(long, default_value = "./wordfriends.toml")]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long, env = "WORDFRIENDS_JSON_LOGS")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    pub generate_config: bool,

    /// Seconds an empty session is kept alive before it is closed
    #[arg(
        long,
        env = "WORDFRIENDS_EMPTY_SESSION_TIMEOUT_SECS",
        default_value = "60"
    )]
    pub empty_session_timeout_secs: u64,

    /// Game parameters for new sessions (loaded from [game] section in TOML)
    #[arg(skip)]
    #[serde(default)]
    pub game: Option<GameParameters>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 9000,
            bind_address: "0.0.0.0".to_string(),
            config: "./wordfriends.toml".to_string(),
            json_logs: false,
            generate_config: false,
            empty_session_timeout_secs: 60,
            game: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (WORDFRIENDS_*) < CLI args
    pub fn load() -> Result<Self, figment::Error> {
        let cli = Config::parse();
        let config_path = cli.config.clone();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_path))
            .merge(Env::prefixed("WORDFRIENDS_"))
            .merge(Serialized::defaults(cli))
            .extract()
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Wordfriends Session Server Configuration
# Place this file at ./wordfriends.toml or specify with --config <path>
# All settings can be overridden via environment variables (WORDFRIENDS_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 9000)
# port = 9000

# Bind address (default: 0.0.0.0 — all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Seconds an empty session survives before the idle close removes it
# (default: 60). A player joining within the window cancels the close.
# empty_session_timeout_secs = 60

# ---- Game Parameters ----
# Applied to every newly created session.
# [game]

# Letters per word (default: 5)
# word_length = 5

# Guesses per player (default: 5)
# max_guesses = 5
"#
    .to_string()
}
