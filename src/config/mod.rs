//! Transport session configuration.
//!
//! [`SessionConfig`] carries everything needed to synthesize a transport
//! [`Session`]: host, ports, timeouts, TLS/SSL flags, bounce address and
//! credentials. It can be built fluently, loaded from JSON, or mutated
//! field-by-field through a draft message.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::errors::{MailError, MailResult};
use crate::session::Session;
use crate::types::Address;

/// Default plain SMTP port.
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Default SMTP port for SSL on connect.
pub const DEFAULT_SSL_SMTP_PORT: u16 = 465;

/// Default socket connection timeout (60 seconds).
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Default socket read timeout (60 seconds).
pub const DEFAULT_SOCKET_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Pre-built session; when set, every other field is ignored for resolution.
    #[serde(skip)]
    pub session: Option<Arc<Session>>,
    /// SMTP server hostname.
    #[serde(default)]
    pub host: Option<String>,
    /// Plain SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP port used when `ssl_on_connect` is enabled.
    #[serde(default = "default_ssl_smtp_port")]
    pub ssl_smtp_port: u16,
    /// Socket connection timeout.
    #[serde(default = "default_connection_timeout", with = "humantime_serde")]
    pub connection_timeout: Duration,
    /// Socket read timeout.
    #[serde(default = "default_socket_timeout", with = "humantime_serde")]
    pub socket_timeout: Duration,
    /// Use implicit TLS when connecting.
    #[serde(default)]
    pub ssl_on_connect: bool,
    /// Verify the server identity against its certificate.
    #[serde(default)]
    pub ssl_check_server_identity: bool,
    /// Upgrade with STARTTLS when offered.
    #[serde(default)]
    pub start_tls_enabled: bool,
    /// Fail when STARTTLS is not offered.
    #[serde(default)]
    pub start_tls_required: bool,
    /// Envelope sender for bounces.
    #[serde(default)]
    pub bounce_address: Option<Address>,
    /// Authentication username.
    #[serde(default)]
    pub username: Option<String>,
    /// Authentication password (never serialized).
    #[serde(default, skip_serializing)]
    pub password: Option<SecretString>,
    /// Enable transport debug output.
    #[serde(default)]
    pub debug: bool,
}

fn default_smtp_port() -> u16 { DEFAULT_SMTP_PORT }
fn default_ssl_smtp_port() -> u16 { DEFAULT_SSL_SMTP_PORT }
fn default_connection_timeout() -> Duration { DEFAULT_CONNECTION_TIMEOUT }
fn default_socket_timeout() -> Duration { DEFAULT_SOCKET_TIMEOUT }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session: None,
            host: None,
            smtp_port: DEFAULT_SMTP_PORT,
            ssl_smtp_port: DEFAULT_SSL_SMTP_PORT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            socket_timeout: DEFAULT_SOCKET_TIMEOUT,
            ssl_on_connect: false,
            ssl_check_server_identity: false,
            start_tls_enabled: false,
            start_tls_required: false,
            bounce_address: None,
            username: None,
            password: None,
            debug: false,
        }
    }
}

impl SessionConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> MailResult<Self> {
        let config: SessionConfig = serde_json::from_str(json).map_err(|e| {
            MailError::configuration(format!("Malformed session configuration: {}", e)).with_cause(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> MailResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            MailError::configuration(format!("Cannot read {}", path.display())).with_cause(e)
        })?;
        Self::from_json(&json)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> MailResult<()> {
        if let Some(host) = &self.host {
            if host.trim().is_empty() {
                return Err(MailError::configuration("Host cannot be blank"));
            }
        }

        if self.smtp_port == 0 || self.ssl_smtp_port == 0 {
            return Err(MailError::configuration("Ports must be non-zero"));
        }

        if self.connection_timeout.is_zero() || self.socket_timeout.is_zero() {
            return Err(MailError::configuration("Timeouts must be positive"));
        }

        if self.password.is_some() && self.username.is_none() {
            return Err(MailError::configuration("Password set without a username"));
        }

        Ok(())
    }

    /// Returns the port a synthesized session connects to.
    pub fn effective_port(&self) -> u16 {
        if self.ssl_on_connect {
            self.ssl_smtp_port
        } else {
            self.smtp_port
        }
    }

    /// Returns true if authentication is configured.
    pub fn has_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Builder for session configuration.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Sets the SMTP server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    /// Sets the plain SMTP port.
    pub fn smtp_port(mut self, port: u16) -> Self {
        self.config.smtp_port = port;
        self
    }

    /// Sets the SSL SMTP port.
    pub fn ssl_smtp_port(mut self, port: u16) -> Self {
        self.config.ssl_smtp_port = port;
        self
    }

    /// Sets the socket connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Sets the socket read timeout.
    pub fn socket_timeout(mut self, timeout: Duration) -> Self {
        self.config.socket_timeout = timeout;
        self
    }

    /// Enables implicit TLS.
    pub fn ssl_on_connect(mut self, enabled: bool) -> Self {
        self.config.ssl_on_connect = enabled;
        self
    }

    /// Enables server identity checks.
    pub fn ssl_check_server_identity(mut self, enabled: bool) -> Self {
        self.config.ssl_check_server_identity = enabled;
        self
    }

    /// Enables STARTTLS.
    pub fn start_tls_enabled(mut self, enabled: bool) -> Self {
        self.config.start_tls_enabled = enabled;
        self
    }

    /// Requires STARTTLS.
    pub fn start_tls_required(mut self, required: bool) -> Self {
        self.config.start_tls_required = required;
        self
    }

    /// Sets the bounce address.
    pub fn bounce_address(mut self, address: Address) -> Self {
        self.config.bounce_address = Some(address);
        self
    }

    /// Sets plain credentials.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(SecretString::new(password.into()));
        self
    }

    /// Supplies a pre-built session.
    pub fn session(mut self, session: Arc<Session>) -> Self {
        self.config.session = Some(session);
        self
    }

    /// Enables transport debug output.
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> MailResult<SessionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// Humantime serde support
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
