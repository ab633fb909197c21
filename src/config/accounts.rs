//! Accounts file: the list of sessions plus pacing parameters.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::{ConfigError, PacingConfig};

/// Mobile Safari agents used when an account has none configured.
const IOS_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_5_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 18_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.0 Mobile/15E148 Safari/604.1",
];

const DEVICE_SUFFIXES: &[&str] = &["", "Pro", "Max", "Pro Max"];

/// Proxy used for the mini-app HTTP traffic of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy scheme (`http`, `https`, `socks5`).
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_scheme() -> String {
    "http".to_owned()
}

impl ProxyConfig {
    /// Proxy URL without credentials.
    #[must_use]
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.hostname, self.port)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidProxy {
            name: name.to_owned(),
            reason: reason.to_owned(),
        };

        if !matches!(self.scheme.as_str(), "http" | "https" | "socks5" | "socks5h") {
            return Err(invalid("scheme must be http, https, socks5 or socks5h"));
        }
        if self.hostname.trim().is_empty() {
            return Err(invalid("hostname is empty"));
        }
        if self.port == 0 {
            return Err(invalid("port must be > 0"));
        }
        if self.password.is_some() && self.username.is_none() {
            return Err(invalid("password given without username"));
        }
        Ok(())
    }
}

/// Immutable per-account configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    /// Unique account name; also the Telegram session file name.
    pub name: String,

    /// Phone number used by `--login`.
    #[serde(default)]
    pub phone_number: Option<String>,

    /// User agent sent to the mini-app.
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Device model reported to Telegram.
    #[serde(default)]
    pub device_model: Option<String>,

    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

impl SessionIdentity {
    /// Creates an identity with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_number: None,
            user_agent: None,
            device_model: None,
            proxy: None,
        }
    }

    /// User agent to send, falling back to the first built-in agent.
    #[must_use]
    pub fn user_agent_or_default(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(IOS_USER_AGENTS[0])
    }
}

/// Configuration containing all accounts and pacing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Directory holding one Telegram session file per account.
    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,

    /// Accounts to automate.
    pub accounts: Vec<SessionIdentity>,

    #[serde(default)]
    pub pacing: PacingConfig,
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from("sessions")
}

impl FarmConfig {
    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves configuration to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates accounts and pacing.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_all().into_iter().find_map(Result::err).map_or(Ok(()), Err)
    }

    /// Returns one result per account followed by the pacing result.
    #[must_use]
    pub fn validate_all(&self) -> Vec<Result<(), ConfigError>> {
        if self.accounts.is_empty() {
            return vec![Err(ConfigError::NoAccounts)];
        }

        let mut seen = HashSet::new();
        let mut results: Vec<_> = self
            .accounts
            .iter()
            .enumerate()
            .map(|(index, account)| {
                if account.name.trim().is_empty() {
                    return Err(ConfigError::EmptyName { index });
                }
                if !seen.insert(account.name.as_str()) {
                    return Err(ConfigError::DuplicateName {
                        name: account.name.clone(),
                    });
                }
                if let Some(proxy) = &account.proxy {
                    proxy.validate(&account.name)?;
                }
                Ok(())
            })
            .collect();

        results.push(self.pacing.validate());
        results
    }

    /// Path of the Telegram session file of `name`.
    #[must_use]
    pub fn session_path(&self, name: &str) -> PathBuf {
        self.sessions_dir.join(format!("{name}.session"))
    }

    /// Looks up an account by name.
    #[must_use]
    pub fn account(&self, name: &str) -> Option<&SessionIdentity> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// Generates a user agent and device model for accounts missing them.
    ///
    /// Returns the number of accounts changed.
    pub fn fill_missing_devices<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut changed = 0;
        for account in &mut self.accounts {
            if account.user_agent.is_some() && account.device_model.is_some() {
                continue;
            }
            let agent = account
                .user_agent
                .clone()
                .or_else(|| IOS_USER_AGENTS.choose(rng).map(|s| (*s).to_owned()))
                .unwrap_or_default();
            if account.device_model.is_none() {
                account.device_model = Some(device_model_for(&agent, rng));
            }
            account.user_agent = Some(agent);
            changed += 1;
        }
        changed
    }

    /// Creates an example configuration for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self {
            sessions_dir: default_sessions_dir(),
            accounts: vec![
                SessionIdentity {
                    phone_number: Some("+10000000001".to_owned()),
                    ..SessionIdentity::new("main")
                },
                SessionIdentity {
                    phone_number: Some("+10000000002".to_owned()),
                    proxy: Some(ProxyConfig {
                        scheme: default_scheme(),
                        hostname: "proxy.example.com".to_owned(),
                        port: 8080,
                        username: Some("user".to_owned()),
                        password: Some("secret".to_owned()),
                    }),
                    ..SessionIdentity::new("second")
                },
            ],
            pacing: PacingConfig::default(),
        }
    }
}

/// Builds a device model such as `iPhone 14 Pro` from a user agent.
fn device_model_for<R: Rng + ?Sized>(user_agent: &str, rng: &mut R) -> String {
    let family = user_agent
        .split_once('(')
        .and_then(|(_, rest)| rest.split_once(';'))
        .map_or("iPhone", |(family, _)| family.trim());
    let generation = rng.gen_range(11..=15);
    let suffix = DEVICE_SUFFIXES.choose(rng).copied().unwrap_or_default();

    format!("{family} {generation} {suffix}").trim().to_owned()
}
