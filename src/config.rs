use clap::Parser;
use log::warn;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_USERNAME: &str = "user";
pub const DEFAULT_PASSWORD: &str = "pass";

/// Runtime configuration, from flags or environment
#[derive(Clone, Debug, Parser)]
#[command(name = "dashboard", about = "Retail sales reporting dashboard")]
pub struct Config {
    /// Directory holding `transactions/` and the dimension CSV files
    #[arg(long, env = "DASHBOARD_DATA_DIR", default_value = "db")]
    pub data_dir: PathBuf,

    /// Address the HTTP server listens on
    #[arg(long, env = "DASHBOARD_BIND", default_value = "127.0.0.1:8050")]
    pub bind: SocketAddr,

    /// The single account allowed to log in
    #[arg(long, env = "DASHBOARD_USERNAME", default_value = DEFAULT_USERNAME)]
    pub username: String,

    #[arg(long, env = "DASHBOARD_PASSWORD", default_value = DEFAULT_PASSWORD, hide_env_values = true)]
    pub password: String,
}

impl Config {
    /// Log configuration choices that should not reach production unnoticed.
    pub fn warn_on_defaults(&self) {
        if self.password == DEFAULT_PASSWORD {
            warn!("Using the default dashboard password; set DASHBOARD_PASSWORD");
        }
    }
}

/// Install the `env_logger` backend, defaulting to `info`
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
