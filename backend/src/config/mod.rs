//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the bind address, database path, token secrets, mail backend, booking
//! hours and the business details shown on public pages. Values come from a
//! TOML file with per-field defaults, then selected environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveTime;
use chrono_tz::Tz;
use salon_adapters::{build_adapter, AdapterError, MailAdapter, SmtpSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SALON_CONFIG";

/// Config file picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "salon.toml";

const INSECURE_DEV_SECRET: &str = "insecure-dev-secret-change-me";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub business: BusinessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            cors_origins: default_cors_origins(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("salon.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

fn default_jwt_secret() -> String {
    INSECURE_DEV_SECRET.to_string()
}

fn default_access_token_minutes() -> i64 {
    60
}

fn default_refresh_token_days() -> i64 {
    1
}

fn default_password_iterations() -> u32 {
    100_000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
            password_iterations: default_password_iterations(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// One of `smtp`, `log`, `file`, `memory`.
    #[serde(default = "default_mail_backend")]
    pub backend: String,
    #[serde(default = "default_mail_from")]
    pub from: String,
    #[serde(default = "default_outbox_path")]
    pub outbox_path: PathBuf,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    /// Usually supplied through `SALON_SMTP_PASSWORD`.
    #[serde(default, skip_serializing)]
    pub smtp_password: Option<String>,
}

impl MailConfig {
    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
        }
    }

    /// Builds the configured mail adapter.
    pub fn build_adapter(&self) -> Result<Arc<dyn MailAdapter>, AdapterError> {
        build_adapter(&self.backend, &self.outbox_path, &self.smtp_settings())
    }
}

fn default_mail_backend() -> String {
    "log".to_string()
}

fn default_mail_from() -> String {
    "Glamour Touch <glamourtouch58@gmail.com>".to_string()
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("mail_outbox.jsonl")
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            backend: default_mail_backend(),
            from: default_mail_from(),
            outbox_path: default_outbox_path(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    #[serde(default = "default_opening_time")]
    pub opening_time: NaiveTime,
    #[serde(default = "default_closing_time")]
    pub closing_time: NaiveTime,
    #[serde(default = "default_same_day_lead_hours")]
    pub same_day_lead_hours: i64,
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: i64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Number of upcoming appointments shown on the customer dashboard.
    #[serde(default = "default_upcoming_limit")]
    pub upcoming_limit: i64,
}

fn default_opening_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default()
}

fn default_closing_time() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default()
}

fn default_same_day_lead_hours() -> i64 {
    2
}

fn default_duration_minutes() -> i64 {
    60
}

fn default_timezone() -> String {
    "Asia/Kathmandu".to_string()
}

fn default_upcoming_limit() -> i64 {
    5
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            opening_time: default_opening_time(),
            closing_time: default_closing_time(),
            same_day_lead_hours: default_same_day_lead_hours(),
            default_duration_minutes: default_duration_minutes(),
            timezone: default_timezone(),
            upcoming_limit: default_upcoming_limit(),
        }
    }
}

impl BookingConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("unknown timezone '{}'", self.timezone)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessConfig {
    #[serde(default = "default_business_name")]
    pub name: String,
    #[serde(default = "default_business_email")]
    pub email: String,
    #[serde(default = "default_business_phone")]
    pub phone: String,
    #[serde(default = "default_business_address")]
    pub address: String,
    #[serde(default = "default_experience_years")]
    pub experience_years: u32,
    #[serde(default = "default_team_size")]
    pub team_size: u32,
}

fn default_business_name() -> String {
    "Glamour Touch Beauty Parlour".to_string()
}

fn default_business_email() -> String {
    "info@glamourtouch.com".to_string()
}

fn default_business_phone() -> String {
    "+977-98XXXXXXXX".to_string()
}

fn default_business_address() -> String {
    "Kathmandu, Nepal".to_string()
}

fn default_experience_years() -> u32 {
    5
}

fn default_team_size() -> u32 {
    10
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            name: default_business_name(),
            email: default_business_email(),
            phone: default_business_phone(),
            address: default_business_address(),
            experience_years: default_experience_years(),
            team_size: default_team_size(),
        }
    }
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Resolution order for the file: explicit `path`, `$SALON_CONFIG`,
    /// `./salon.toml` if it exists, otherwise built-in defaults. Environment
    /// overrides are applied last and the result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::load_from_path(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_from_path(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("SALON_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Ok(path) = std::env::var("SALON_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Ok(secret) = std::env::var("SALON_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Ok(username) = std::env::var("SALON_SMTP_USERNAME") {
            self.mail.smtp_username = Some(username);
        }
        if let Ok(password) = std::env::var("SALON_SMTP_PASSWORD") {
            self.mail.smtp_password = Some(password);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.booking.opening_time >= self.booking.closing_time {
            return Err(ConfigError::Invalid(
                "booking.opening_time must be before booking.closing_time".into(),
            ));
        }
        if self.booking.default_duration_minutes <= 0 {
            return Err(ConfigError::Invalid(
                "booking.default_duration_minutes must be positive".into(),
            ));
        }
        if self.auth.access_token_minutes <= 0 || self.auth.refresh_token_days <= 0 {
            return Err(ConfigError::Invalid("token lifetimes must be positive".into()));
        }
        if self.auth.password_iterations == 0 {
            return Err(ConfigError::Invalid("auth.password_iterations must be positive".into()));
        }
        if !matches!(self.mail.backend.as_str(), "smtp" | "log" | "file" | "memory") {
            return Err(ConfigError::Invalid(format!(
                "unknown mail backend '{}'",
                self.mail.backend
            )));
        }
        if self.mail.backend == "smtp" {
            if self.mail.smtp_host.trim().is_empty() || self.mail.smtp_port == 0 {
                return Err(ConfigError::Invalid("mail.smtp_host and mail.smtp_port are required".into()));
            }
            if self.mail.smtp_username.is_some() && self.mail.smtp_password.is_none() {
                return Err(ConfigError::Invalid(
                    "mail.smtp_username is set but no password; set SALON_SMTP_PASSWORD".into(),
                ));
            }
        }
        self.booking.tz()?;
        if self.auth.jwt_secret == INSECURE_DEV_SECRET {
            warn!("auth.jwt_secret is the built-in development secret; set SALON_JWT_SECRET");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind_addr, "127.0.0.1:8000");
        assert_eq!(config.auth.access_token_minutes, 60);
        assert_eq!(config.auth.refresh_token_days, 1);
        assert_eq!(config.booking.opening_time, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(config.booking.closing_time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(config.booking.default_duration_minutes, 60);
        assert_eq!(config.mail.backend, "log");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml_str = r#"
            [server]
            bind_addr = "0.0.0.0:9000"

            [booking]
            opening_time = "10:00:00"
            same_day_lead_hours = 3

            [mail]
            backend = "memory"
        "#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.server.max_body_bytes, 64 * 1024);
        assert_eq!(config.booking.opening_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(config.booking.closing_time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(config.booking.same_day_lead_hours, 3);
        assert_eq!(config.mail.backend, "memory");
        assert_eq!(config.business.name, "Glamour Touch Beauty Parlour");
    }

    #[test]
    fn test_validate_rejects_inverted_hours() {
        let mut config = AppConfig::default();
        config.booking.opening_time = NaiveTime::from_hms_opt(19, 0, 0).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_backend_and_timezone() {
        let mut config = AppConfig::default();
        config.mail.backend = "pigeon".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.booking.timezone = "Mars/Olympus".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_smtp_settings() {
        let mut config = AppConfig::default();
        config.mail.backend = "smtp".into();
        assert!(config.validate().is_ok());

        config.mail.smtp_username = Some("salon@example.com".into());
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.mail.smtp_password = Some("app-password".into());
        assert!(config.validate().is_ok());

        config.mail.smtp_host = String::new();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_builds_smtp_adapter_from_toml() {
        let toml_str = r#"
            [mail]
            backend = "smtp"
            smtp_host = "mail.example.com"
            smtp_port = 2525
            smtp_username = "salon@example.com"
            smtp_password = "app-password"
        "#;
        let config = AppConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(config.mail.smtp_port, 2525);
        let settings = config.mail.smtp_settings();
        assert_eq!(settings.host, "mail.example.com");
        assert_eq!(settings.password.as_deref(), Some("app-password"));
        assert_eq!(config.mail.build_adapter().unwrap().name(), "smtp");

        let serialized = toml::to_string(&config.mail).unwrap();
        assert!(!serialized.contains("app-password"));
    }

    #[test]
    fn test_load_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"/tmp/salon-test.db\"").unwrap();
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert!(config.database.path.ends_with("salon-test.db")
            || std::env::var("SALON_DATABASE_PATH").is_ok());
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/salon.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
