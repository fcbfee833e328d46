//! Transport sessions and their resolution.
//!
//! A [`Session`] is the handle an out-of-crate delivery layer connects with.
//! [`SessionResolver`] either hands back a caller-supplied session untouched
//! or synthesizes one from a [`SessionConfig`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{SessionConfig, DEFAULT_CONNECTION_TIMEOUT, DEFAULT_SMTP_PORT, DEFAULT_SOCKET_TIMEOUT};
use crate::errors::{MailError, MailErrorKind, MailResult};
use crate::types::Address;

/// Authentication credentials.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Creates plain credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into()),
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Transport session handle.
#[derive(Debug, Clone)]
pub struct Session {
    host: Option<String>,
    port: u16,
    connection_timeout: Duration,
    timeout: Duration,
    ssl_on_connect: bool,
    check_server_identity: bool,
    start_tls_enabled: bool,
    start_tls_required: bool,
    bounce_address: Option<Address>,
    credentials: Option<Credentials>,
    debug: bool,
}

impl Session {
    /// Creates a builder for a caller-supplied session.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Returns the host, if the session names one.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Returns the port to connect to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `host:port`, or None without a host.
    pub fn address(&self) -> Option<String> {
        self.host.as_ref().map(|h| format!("{}:{}", h, self.port))
    }

    /// Returns the socket connection timeout.
    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Returns the socket read timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns true if TLS starts immediately on connect.
    pub fn ssl_on_connect(&self) -> bool {
        self.ssl_on_connect
    }

    /// Returns true if the server identity must match its certificate.
    pub fn check_server_identity(&self) -> bool {
        self.check_server_identity
    }

    /// Returns true if STARTTLS is enabled.
    pub fn start_tls_enabled(&self) -> bool {
        self.start_tls_enabled
    }

    /// Returns true if STARTTLS is mandatory.
    pub fn start_tls_required(&self) -> bool {
        self.start_tls_required
    }

    /// Returns the envelope sender for bounces.
    pub fn bounce_address(&self) -> Option<&Address> {
        self.bounce_address.as_ref()
    }

    /// Returns the credentials, if any.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Returns true if transport debug output is enabled.
    pub fn debug(&self) -> bool {
        self.debug
    }
}

/// Builder for a caller-supplied [`Session`].
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    session: Session,
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            session: Session {
                host: None,
                port: DEFAULT_SMTP_PORT,
                connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
                timeout: DEFAULT_SOCKET_TIMEOUT,
                ssl_on_connect: false,
                check_server_identity: false,
                start_tls_enabled: false,
                start_tls_required: false,
                bounce_address: None,
                credentials: None,
                debug: false,
            },
        }
    }
}

impl SessionBuilder {
    /// Sets the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.session.host = Some(host.into());
        self
    }

    /// Sets the port.
    pub fn port(mut self, port: u16) -> Self {
        self.session.port = port;
        self
    }

    /// Sets the socket connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.session.connection_timeout = timeout;
        self
    }

    /// Sets the socket read timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.session.timeout = timeout;
        self
    }

    /// Enables implicit TLS.
    pub fn ssl_on_connect(mut self, enabled: bool) -> Self {
        self.session.ssl_on_connect = enabled;
        self
    }

    /// Enables server identity checks.
    pub fn check_server_identity(mut self, enabled: bool) -> Self {
        self.session.check_server_identity = enabled;
        self
    }

    /// Enables STARTTLS.
    pub fn start_tls_enabled(mut self, enabled: bool) -> Self {
        self.session.start_tls_enabled = enabled;
        self
    }

    /// Requires STARTTLS.
    pub fn start_tls_required(mut self, required: bool) -> Self {
        self.session.start_tls_required = required;
        self
    }

    /// Sets the bounce address.
    pub fn bounce_address(mut self, address: Address) -> Self {
        self.session.bounce_address = Some(address);
        self
    }

    /// Sets the credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.session.credentials = Some(credentials);
        self
    }

    /// Enables transport debug output.
    pub fn debug(mut self, debug: bool) -> Self {
        self.session.debug = debug;
        self
    }

    /// Builds the session.
    pub fn build(self) -> Session {
        self.session
    }
}

/// Produces the session a message is assembled against.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionResolver;

impl SessionResolver {
    /// Returns the explicit session unchanged, or synthesizes one.
    ///
    /// Synthesis fails with `MissingHost` when no host is configured.
    pub fn resolve(config: &SessionConfig) -> MailResult<Arc<Session>> {
        if let Some(session) = &config.session {
            return Ok(Arc::clone(session));
        }

        let host = config
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| {
                MailError::new(
                    MailErrorKind::MissingHost,
                    "Cannot find a valid hostname for the mail session",
                )
            })?;

        let credentials = match (&config.username, &config.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        let secured = config.ssl_on_connect || config.start_tls_enabled;

        let session = Session {
            host: Some(host.to_string()),
            port: config.effective_port(),
            connection_timeout: config.connection_timeout,
            timeout: config.socket_timeout,
            ssl_on_connect: config.ssl_on_connect,
            check_server_identity: secured && config.ssl_check_server_identity,
            start_tls_enabled: config.start_tls_enabled,
            start_tls_required: config.start_tls_required,
            bounce_address: config.bounce_address.clone(),
            credentials,
            debug: config.debug,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            host = %host,
            port = session.port,
            ssl_on_connect = session.ssl_on_connect,
            start_tls = session.start_tls_enabled,
            "Synthesized mail session"
        );

        Ok(Arc::new(session))
    }

    /// Returns the host a draft reports: the explicit session's host when a
    /// session is supplied, otherwise the configured host.
    pub fn host_name(config: &SessionConfig) -> Option<String> {
        match &config.session {
            Some(session) => session.host().map(str::to_string),
            None => config.host.clone().filter(|h| !h.trim().is_empty()),
        }
    }
}
