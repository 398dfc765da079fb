use std::env;
use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    /// Serve HTTP directly on `listen_addr`.
    Local,
    /// Hand the router to the Lambda runtime.
    Lambda,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub runtime: Runtime,
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let runtime = match lookup("RUNTIME").as_deref() {
            None | Some("LOCAL") => Runtime::Local,
            Some("LAMBDA") => Runtime::Lambda,
            Some(other) => return Err(anyhow!("Invalid RUNTIME: {other}")),
        };

        let listen_addr = lookup("LISTEN_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8000".to_string())
            .parse()
            .context("LISTEN_ADDR must be a socket address")?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            None => 5,
        };

        Ok(Config {
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            runtime,
            listen_addr,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite::memory:".to_string()),
            max_connections,
        })
    }
}
