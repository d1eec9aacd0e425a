use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use ngolink_api::credentials::PasswordMode;

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub password_mode: PasswordMode,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("NGOLINK_HOST").unwrap_or_else(|| "0.0.0.0".into());

        // Plain PORT is honoured for hosting platforms that set it.
        let port: u16 = match lookup("NGOLINK_PORT").or_else(|| lookup("PORT")) {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid port '{}'", raw))?,
            None => 3000,
        };

        let db_path = lookup("NGOLINK_DB_PATH")
            .unwrap_or_else(|| "ngolink.db".into())
            .into();

        let password_mode = match lookup("NGOLINK_PASSWORD_MODE") {
            Some(raw) => raw.parse()?,
            None => {
                info!("NGOLINK_PASSWORD_MODE not set, using plaintext");
                PasswordMode::Plaintext
            }
        };

        Ok(Self {
            host,
            port,
            db_path,
            password_mode,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port).parse()?;
        Ok(addr)
    }
}
