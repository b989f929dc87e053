use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::validation::PasswordPolicy;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub listen_addr: String,
    pub log_dir: String,
    pub password_min_length: usize,
    pub password_max_similarity: f64,
    pub index_limit: u64,
    pub cookie_secure: bool,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    database_url: Option<String>,
    jwt_secret: Option<String>,
    listen_addr: Option<String>,
    log_dir: Option<String>,
    password_min_length: Option<usize>,
    password_max_similarity: Option<f64>,
    index_limit: Option<u64>,
    cookie_secure: Option<bool>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_password_min_length() -> usize {
    8
}

fn default_password_max_similarity() -> f64 {
    0.7
}

fn default_index_limit() -> u64 {
    10
}

fn default_cookie_secure() -> bool {
    true
}

impl PartialServerConfig {
    fn from_file(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
    }

    fn from_env() -> Result<Self, String> {
        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            jwt_secret: env::var("JWT_SECRET").ok(),
            listen_addr: env::var("LISTEN_ADDR").ok(),
            log_dir: env::var("LOG_DIR").ok(),
            password_min_length: parse_env("PASSWORD_MIN_LENGTH")?,
            password_max_similarity: parse_env("PASSWORD_MAX_SIMILARITY")?,
            index_limit: parse_env("INDEX_LIMIT")?,
            cookie_secure: parse_env("COOKIE_SECURE")?,
        })
    }
}

fn parse_env<T>(key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("Invalid value for {key}: {e}")),
        Err(_) => Ok(None),
    }
}

impl ServerConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path_str) => PartialServerConfig::from_file(Path::new(path_str))?,
            None => PartialServerConfig::default(),
        };

        // 2. Load from environment variables
        let env_config = PartialServerConfig::from_env()?;

        // 3. Merge: environment overrides file
        Self::merge(env_config, file_config)
    }

    fn merge(env_config: PartialServerConfig, file_config: PartialServerConfig) -> Result<Self, String> {
        let final_config = ServerConfig {
            database_url: env_config.database_url.or(file_config.database_url)
                .ok_or("DATABASE_URL is required")?,
            jwt_secret: env_config.jwt_secret.or(file_config.jwt_secret)
                .ok_or("JWT_SECRET is required")?,
            listen_addr: env_config.listen_addr.or(file_config.listen_addr)
                .unwrap_or_else(default_listen_addr),
            log_dir: env_config.log_dir.or(file_config.log_dir)
                .unwrap_or_else(default_log_dir),
            password_min_length: env_config.password_min_length.or(file_config.password_min_length)
                .unwrap_or_else(default_password_min_length),
            password_max_similarity: env_config.password_max_similarity.or(file_config.password_max_similarity)
                .unwrap_or_else(default_password_max_similarity),
            index_limit: env_config.index_limit.or(file_config.index_limit)
                .unwrap_or_else(default_index_limit),
            cookie_secure: env_config.cookie_secure.or(file_config.cookie_secure)
                .unwrap_or_else(default_cookie_secure),
        };

        if !(0.0..=1.0).contains(&final_config.password_max_similarity) {
            return Err("PASSWORD_MAX_SIMILARITY must be between 0 and 1".to_string());
        }

        Ok(final_config)
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_length: self.password_min_length,
            max_similarity: self.password_max_similarity,
        }
    }
}
