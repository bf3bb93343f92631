//! Runtime configuration, read once at boot from the environment (a local
//! `.env` file is honored). No hot reload.

use ashenmoor_core::constants;
use log::LevelFilter;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub tick_secs: f64,
    pub log_level: LevelFilter,
    pub log_file: Option<String>,
}

impl Config {
    pub fn from_env() -> Config {
        // Missing .env is fine; real environments set variables directly.
        let _ = dotenvy::dotenv();

        let host = std::env::var("ASHENMOOR_HOST")
            .unwrap_or_else(|_| constants::DEFAULT_HOST.to_string());
        let port = std::env::var("ASHENMOOR_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(constants::DEFAULT_PORT);
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| constants::DEFAULT_DATABASE_URL.to_string());
        let tick_secs = std::env::var("ASHENMOOR_TICK_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v: &f64| *v > 0.0)
            .unwrap_or(constants::DEFAULT_TICK_SECS);
        let log_level = std::env::var("ASHENMOOR_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LevelFilter::Info);
        let log_file = std::env::var("ASHENMOOR_LOG_FILE").ok();

        Config {
            host,
            port,
            database_url,
            tick_secs,
            log_level,
            log_file,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: constants::DEFAULT_HOST.to_string(),
            port: constants::DEFAULT_PORT,
            database_url: constants::DEFAULT_DATABASE_URL.to_string(),
            tick_secs: constants::DEFAULT_TICK_SECS,
            log_level: LevelFilter::Info,
            log_file: None,
        }
    }
}
