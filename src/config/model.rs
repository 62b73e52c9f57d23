//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence.
//! Every field has a default so an empty or partial file is valid.

use serde::{Deserialize, Serialize};

use super::nickname::generate_nickname;
use crate::irc::framer::DEFAULT_MAX_LINE_LEN;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_servers")]
    pub servers: Vec<ServerConfig>,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            client: ClientConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Server by name, or the first configured server when `name` is `None`.
    pub fn server(&self, name: Option<&str>) -> Option<&ServerConfig> {
        match name {
            Some(name) => self.servers.iter().find(|s| s.name.eq_ignore_ascii_case(name)),
            None => self.servers.first(),
        }
    }
}

fn default_servers() -> Vec<ServerConfig> {
    let nick = generate_nickname();
    vec![
        ServerConfig {
            name: "libera".into(),
            host: "irc.libera.chat".into(),
            port: 6667,
            nickname: nick.clone(),
            username: None,
            realname: None,
            password: None,
            channels: vec![],
            quit_message: default_quit_message(),
        },
        ServerConfig {
            name: "oftc".into(),
            host: "irc.oftc.net".into(),
            port: 6667,
            nickname: nick,
            username: None,
            realname: None,
            password: None,
            channels: vec![],
            quit_message: default_quit_message(),
        },
    ]
}

/// One IRC server the `connect` command can reach over plain TCP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// User-facing label (e.g. `"libera"`).
    pub name: String,
    /// Hostname or IP address of the IRC server.
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_nickname")]
    pub nickname: String,
    /// Defaults to the nickname.
    #[serde(default)]
    pub username: Option<String>,
    /// Defaults to the nickname.
    #[serde(default)]
    pub realname: Option<String>,
    /// Sent as `PASS` before registering.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default = "default_quit_message")]
    pub quit_message: String,
}

/// Settings for [`Client`](crate::irc::client::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Longest accepted inbound line, in bytes, CR LF excluded. Longer lines
    /// end the client loop with a read error.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
    /// Buffered warning/fatal signals before `warn`/`fatal` wait for the loop.
    #[serde(default = "default_signal_capacity")]
    pub signal_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_line_len: default_max_line_len(),
            signal_capacity: default_signal_capacity(),
        }
    }
}

/// Diagnostic log output (`tracing`), not chat logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            with_target: false,
        }
    }
}

fn default_nickname() -> String {
    generate_nickname()
}
fn default_port() -> u16 {
    6667
}
fn default_quit_message() -> String {
    "ircwire".to_string()
}
fn default_max_line_len() -> usize {
    DEFAULT_MAX_LINE_LEN
}
fn default_signal_capacity() -> usize {
    1
}
fn default_filter() -> String {
    "info".to_string()
}
