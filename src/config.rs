use std::env;

const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://localhost:5000,http://localhost:8000";

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub admin_token: String,
    pub allow_origins: Vec<String>,
    pub max_upload_size: usize, // bytes
    pub rate_limit_per_minute: u32,
    pub upload_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().expect("PORT must be a number"),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "admin_token_123".to_string()),
            allow_origins: parse_origins(&env::var("ALLOW_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string())),
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10 * 1024 * 1024),
            rate_limit_per_minute: env::var("RATE_LIMIT_PER_MINUTE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
