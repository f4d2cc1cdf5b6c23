use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Host name or IP address of the queue manager listener.
pub const DEFAULT_HOST: &str = "localhost";
/// Listener port of the queue manager.
pub const DEFAULT_PORT: u16 = 1414;
/// Channel used for client connections.
pub const DEFAULT_CHANNEL: &str = "MEBT.REMOTE.CONN.TLS";
pub const DEFAULT_QUEUE_MANAGER: &str = "AEQT";
pub const DEFAULT_APP_USER: &str = "admin";
pub const DEFAULT_APP_PASSWORD: &str = "passw0rd";
/// Queue the exchange puts to and gets from.
pub const DEFAULT_QUEUE: &str = "EAU.ISO20OUT.REQUEST.QL.MEBGLBK";
pub const APPLICATION_NAME: &str = "mqx-exchange (Rust)";
/// Upper bound for the single receive of an exchange.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(15_000);

/// How the session reaches the queue manager.
///
/// ```
/// use mqx_core::ConnectionMode;
///
/// assert_eq!(ConnectionMode::default().as_str(), "client");
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMode {
    #[default]
    Client,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Client => "client",
        }
    }
}

/// User/password pair presented when authentication is enabled.
///
/// The password never shows up in `Debug` output:
///
/// ```
/// use mqx_core::Credentials;
///
/// let creds = Credentials::new("admin", "s3cret");
/// assert!(!format!("{creds:?}").contains("s3cret"));
/// assert_eq!(creds.password(), "s3cret");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Everything a provider needs to open a session. Resolved once, before any
/// connection attempt, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProperties {
    pub host: String,
    pub port: u16,
    pub channel: String,
    pub queue_manager: String,
    pub connection_mode: ConnectionMode,
    pub application_name: String,
    /// Present only when authentication is enabled.
    pub credentials: Option<Credentials>,
    pub cipher_spec: Option<String>,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            channel: DEFAULT_CHANNEL.to_string(),
            queue_manager: DEFAULT_QUEUE_MANAGER.to_string(),
            connection_mode: ConnectionMode::Client,
            application_name: APPLICATION_NAME.to_string(),
            credentials: Some(Credentials::new(DEFAULT_APP_USER, DEFAULT_APP_PASSWORD)),
            cipher_spec: None,
        }
    }
}

impl ConnectionProperties {
    pub fn authentication_enabled(&self) -> bool {
        self.credentials.is_some()
    }
}
