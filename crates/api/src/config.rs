use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

use domain::services::{InvitationSettings, MagicLinkSettings};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub invitations: InvitationsConfig,
    /// Email delivery configuration
    #[serde(default)]
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Public base URL used in verification and signup links.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub hsts_enabled: bool,

    /// Magic-link requests allowed per email within the window.
    #[serde(default = "default_sign_in_attempts")]
    pub sign_in_attempts: u32,

    #[serde(default = "default_sign_in_window")]
    pub sign_in_window_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            hsts_enabled: false,
            sign_in_attempts: default_sign_in_attempts(),
            sign_in_window_secs: default_sign_in_window(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_magic_link_ttl")]
    pub magic_link_ttl_minutes: i64,

    #[serde(default = "default_session_ttl")]
    pub session_ttl_days: i64,

    /// Adds the `Secure` attribute to the session cookie.
    #[serde(default)]
    pub secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            magic_link_ttl_minutes: default_magic_link_ttl(),
            session_ttl_days: default_session_ttl(),
            secure_cookies: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvitationsConfig {
    #[serde(default = "default_invitation_expiry")]
    pub default_expiry_days: i64,

    #[serde(default = "default_invitation_max_expiry")]
    pub max_expiry_days: i64,
}

impl Default for InvitationsConfig {
    fn default() -> Self {
        Self {
            default_expiry_days: default_invitation_expiry(),
            max_expiry_days: default_invitation_max_expiry(),
        }
    }
}

/// Mail transport selection. `mock` never touches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailTransportKind {
    Smtp,
    Mock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_email_transport")]
    pub transport: EmailTransportKind,

    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_username: String,

    #[serde(default)]
    pub smtp_password: String,

    #[serde(default = "default_smtp_tls")]
    pub smtp_use_tls: bool,

    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            transport: default_email_transport(),
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_use_tls: default_smtp_tls(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_app_base_url() -> String {
    "http://localhost:3000".to_string()
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_sign_in_attempts() -> u32 {
    3
}
fn default_sign_in_window() -> u64 {
    900
}
fn default_magic_link_ttl() -> i64 {
    15
}
fn default_session_ttl() -> i64 {
    30
}
fn default_invitation_expiry() -> i64 {
    7
}
fn default_invitation_max_expiry() -> i64 {
    30
}
fn default_email_transport() -> EmailTransportKind {
    EmailTransportKind::Mock
}
fn default_smtp_port() -> u16 {
    587
}
fn default_smtp_tls() -> bool {
    true
}
fn default_sender_email() -> String {
    "noreply@clubhouse.local".to_string()
}
fn default_sender_name() -> String {
    "Clubhouse".to_string()
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with CH__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("CH").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Build configuration from embedded defaults plus overrides, without
    /// touching config files or the environment. Validation is skipped.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 30
            app_base_url = "http://localhost:3000"

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            hsts_enabled = false
            sign_in_attempts = 3
            sign_in_window_secs = 900

            [auth]
            magic_link_ttl_minutes = 15
            session_ttl_days = 30
            secure_cookies = false

            [invitations]
            default_expiry_days = 7
            max_expiry_days = 30

            [email]
            transport = "mock"
            sender_email = "test@example.com"
            sender_name = "Test"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "CH__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.server.app_base_url.trim().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "server.app_base_url must be set".to_string(),
            ));
        }

        if self.auth.magic_link_ttl_minutes <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "auth.magic_link_ttl_minutes must be positive".to_string(),
            ));
        }

        if self.auth.session_ttl_days <= 0 {
            return Err(ConfigValidationError::InvalidValue(
                "auth.session_ttl_days must be positive".to_string(),
            ));
        }

        let invitations = &self.invitations;
        if invitations.default_expiry_days < 1
            || invitations.default_expiry_days > invitations.max_expiry_days
        {
            return Err(ConfigValidationError::InvalidValue(
                "invitations.default_expiry_days must be between 1 and max_expiry_days"
                    .to_string(),
            ));
        }

        if self.security.sign_in_attempts == 0 || self.security.sign_in_window_secs == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "security.sign_in_attempts and sign_in_window_secs must be positive".to_string(),
            ));
        }

        if self.email.transport == EmailTransportKind::Smtp && self.email.smtp_host.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "email.smtp_host is required for the smtp transport".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    pub fn magic_link_settings(&self) -> MagicLinkSettings {
        MagicLinkSettings {
            base_url: self.server.app_base_url.clone(),
            ttl: chrono::Duration::minutes(self.auth.magic_link_ttl_minutes),
        }
    }

    pub fn invitation_settings(&self) -> InvitationSettings {
        InvitationSettings {
            base_url: self.server.app_base_url.clone(),
            default_expiry_days: self.invitations.default_expiry_days,
            max_expiry_days: self.invitations.max_expiry_days,
        }
    }
}
