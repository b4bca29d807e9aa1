use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use sms_core::phone::is_valid_did;
use std::env;

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// VoIP.ms account configuration
    pub account: AccountConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 8123)
    pub port: u16,
    /// Publicly reachable base URL, preferred when building webhook URLs
    pub external_url: Option<String>,
    /// LAN base URL, used when no external URL is set
    pub internal_url: Option<String>,
}

/// VoIP.ms account configuration
#[derive(Deserialize, Serialize, Clone)]
pub struct AccountConfig {
    /// API username (the account e-mail)
    pub api_username: String,
    /// API password, distinct from the portal password
    pub api_password: String,
    /// REST endpoint (default: VoIP.ms production)
    pub api_url: String,
    /// DIDs to set up; the first one is the default sender
    pub dids: Vec<String>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("api_username", &self.api_username)
            .field("api_password", &"***")
            .field("api_url", &self.api_url)
            .field("dids", &self.dids)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: json or pretty (default: json)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8123,
            external_url: None,
            internal_url: None,
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            api_username: String::new(),
            api_password: String::new(),
            api_url: sms_voipms::DEFAULT_API_URL.to_string(),
            dids: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl ServerConfig {
    /// Base URL for links handed to the operator.
    pub fn base_url(&self) -> &str {
        self.external_url
            .as_deref()
            .or(self.internal_url.as_deref())
            .unwrap_or("http://your-ha-instance:8123")
            .trim_end_matches('/')
    }
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start with default configuration
            .add_source(Config::try_from(&AppConfig::default())?)
            // Add configuration file based on environment
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with VOIPMS_SMS_)
            .add_source(
                Environment::with_prefix("VOIPMS_SMS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("account.dids")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    /// Reject configurations that cannot talk to VoIP.ms or name a malformed DID.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.account.api_username.is_empty() || self.account.api_password.is_empty() {
            return Err(ConfigError::Message(
                "account.api_username and account.api_password are required".into(),
            ));
        }
        if self.account.dids.is_empty() {
            return Err(ConfigError::Message(
                "account.dids must list at least one DID".into(),
            ));
        }
        if let Some(bad) = self.account.dids.iter().find(|d| !is_valid_did(d)) {
            return Err(ConfigError::Message(format!(
                "DID must be a numeric phone number (at least 10 digits): {}",
                bad
            )));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            account: AccountConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
