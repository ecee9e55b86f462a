use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // HTTP
    pub port: u16,

    // Admin API
    pub admin_api_token: String,

    // Storage
    pub database_path: String,
    pub images_dir: String,

    // Languages
    pub default_language: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            // Admin API - bearer token checked on every /admin route
            admin_api_token: std::env::var("ADMIN_API_TOKEN")
                .context("ADMIN_API_TOKEN not set")?,

            // Storage
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/cms.db".to_string()),
            images_dir: std::env::var("IMAGES_DIR")
                .unwrap_or_else(|_| "data/images".to_string()),

            // Languages - the default code is seeded and undeletable
            default_language: std::env::var("DEFAULT_LANGUAGE")
                .unwrap_or_else(|_| "NL".to_string())
                .to_uppercase(),
        })
    }
}
