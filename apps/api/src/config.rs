use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

/// Where sessions and the question bank live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    /// Process-local state seeded from a question bank JSON file.
    Memory { question_bank_path: PathBuf },
}

impl StorageBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Postgres { .. } => "postgres",
            StorageBackend::Memory { .. } => "memory",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendKind {
    Postgres,
    Memory,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(BackendKind::Postgres),
            "memory" | "in-memory" => Ok(BackendKind::Memory),
            other => Err(anyhow!(
                "STORAGE_BACKEND must be 'postgres' or 'memory', got '{other}'"
            )),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let require = |key: &str| {
            lookup(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let kind: BackendKind = lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;

        let storage = match kind {
            BackendKind::Postgres => StorageBackend::Postgres {
                database_url: require("DATABASE_URL")?,
            },
            BackendKind::Memory => StorageBackend::Memory {
                question_bank_path: PathBuf::from(require("QUESTION_BANK_PATH")?),
            },
        };

        Ok(Config {
            storage,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
