use crate::config::{ExchangeConfig, ProviderKind};
use clap::{ArgAction, Parser};
use mqx_core::{
    APPLICATION_NAME, ConnectionMode, ConnectionProperties, Credentials, DEFAULT_APP_PASSWORD,
    DEFAULT_APP_USER, DEFAULT_CHANNEL, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_QUEUE,
    DEFAULT_QUEUE_MANAGER,
};
use std::time::Duration;

/// Positionals are applied in order; a missing one leaves it and every later
/// one at its default.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Put one text message on a queue and get one back"
)]
pub struct Cli {
    /// Host name or IP address of the queue manager [default: localhost]
    #[arg(value_name = "HOST")]
    pub host: Option<String>,
    /// Listener port of the queue manager [default: 1414]
    #[arg(value_name = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,
    /// Channel name [default: MEBT.REMOTE.CONN.TLS]
    #[arg(value_name = "CHANNEL")]
    pub channel: Option<String>,
    /// Present user credentials (true/false) [default: true]
    #[arg(value_name = "AUTH", value_parser = parse_auth_flag, action = ArgAction::Set)]
    pub auth: Option<bool>,
    /// TLS cipher specification; enables TLS when given
    #[arg(value_name = "CIPHER_SPEC")]
    pub cipher_spec: Option<String>,

    #[arg(long, env = "MQX_QUEUE_MANAGER", default_value = DEFAULT_QUEUE_MANAGER)]
    pub queue_manager: String,
    #[arg(long, env = "MQX_QUEUE", default_value = DEFAULT_QUEUE)]
    pub queue: String,
    #[arg(long, env = "MQX_APP_USER", default_value = DEFAULT_APP_USER)]
    pub app_user: String,
    #[arg(
        long,
        env = "MQX_APP_PASSWORD",
        default_value = DEFAULT_APP_PASSWORD,
        hide_env_values = true,
        hide_default_value = true
    )]
    pub app_password: String,
    #[arg(long, env = "MQX_PROVIDER", value_enum, default_value_t = ProviderKind::Nats)]
    pub provider: ProviderKind,
    /// Upper bound for the single receive
    #[arg(long, env = "MQX_RECEIVE_TIMEOUT_MS", default_value_t = 15_000)]
    pub receive_timeout_ms: u64,
}

fn parse_auth_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("expected 'true' or 'false', got '{raw}'")),
    }
}

impl Cli {
    pub fn into_config(self) -> ExchangeConfig {
        let authenticate = self.auth.unwrap_or(true);
        let connection = ConnectionProperties {
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            channel: self.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            queue_manager: self.queue_manager,
            connection_mode: ConnectionMode::Client,
            application_name: APPLICATION_NAME.to_string(),
            credentials: authenticate.then(|| Credentials::new(self.app_user, self.app_password)),
            cipher_spec: self.cipher_spec.filter(|spec| !spec.trim().is_empty()),
        };
        ExchangeConfig {
            connection,
            queue: self.queue,
            receive_timeout: Duration::from_millis(self.receive_timeout_ms),
            provider: self.provider,
        }
    }
}
