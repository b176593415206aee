// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

/// Minimum length of the HMAC key used to sign session cookies.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,
  pub database_max_connections: u32,

  pub session_secret: String,
  pub session_ttl_hours: i64,
  pub cookie_secure: bool,

  pub run_migrations: bool,
  // Optional: for seeding an admin account on startup
  pub seed_db: bool,
  pub seed_admin_phone: Option<String>,
  pub seed_admin_password: Option<String>,

  pub log_format: LogFormat,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the config from any variable source; `from_env` passes the process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let parse_bool = |var_name: &str, default: bool| -> Result<bool> {
      match get_env(var_name) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
          "1" | "true" | "yes" | "on" => Ok(true),
          "0" | "false" | "no" | "off" => Ok(false),
          other => Err(AppError::Config(format!("Invalid {} value: {}", var_name, other))),
        },
        Err(_) => Ok(default),
      }
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;
    let database_max_connections = get_env("DATABASE_MAX_CONNECTIONS")
      .unwrap_or_else(|_| "10".to_string())
      .parse::<u32>()
      .map_err(|e| AppError::Config(format!("Invalid DATABASE_MAX_CONNECTIONS: {}", e)))?;

    let session_secret = get_env("SESSION_SECRET")?;
    if session_secret.len() < MIN_SESSION_SECRET_LEN {
      return Err(AppError::Config(format!(
        "SESSION_SECRET must be at least {} bytes",
        MIN_SESSION_SECRET_LEN
      )));
    }
    let session_ttl_hours = get_env("SESSION_TTL_HOURS")
      .unwrap_or_else(|_| "168".to_string())
      .parse::<i64>()
      .ok()
      .filter(|h| *h > 0)
      .ok_or_else(|| AppError::Config("SESSION_TTL_HOURS must be a positive integer".to_string()))?;
    let cookie_secure = parse_bool("COOKIE_SECURE", false)?;

    let run_migrations = parse_bool("RUN_MIGRATIONS", true)?;
    let seed_db = parse_bool("SEED_DB", false)?;
    let seed_admin_phone = get_env("SEED_ADMIN_PHONE").ok();
    let seed_admin_password = get_env("SEED_ADMIN_PASSWORD").ok();

    let log_format = match get_env("LOG_FORMAT") {
      Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
        "json" => LogFormat::Json,
        "text" | "pretty" => LogFormat::Text,
        other => return Err(AppError::Config(format!("Invalid LOG_FORMAT: {}", other))),
      },
      Err(_) => LogFormat::Text,
    };

    Ok(Self {
      server_host,
      server_port,
      database_url,
      database_max_connections,
      session_secret,
      session_ttl_hours,
      cookie_secure,
      run_migrations,
      seed_db,
      seed_admin_phone,
      seed_admin_password,
      log_format,
    })
  }

  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server_host, self.server_port)
  }
}
