//! Validator configuration.
//!
//! All configuration can be driven by environment variables:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SAPPHIRE_API_KEY` | *(required)* | Account identifier |
//! | `SAPPHIRE_API_SECRET` | *(required)* | Shared secret |
//! | `SAPPHIRE_FRESHNESS_WINDOW_MS` | `1000` | Maximum message age |
//! | `SAPPHIRE_NONCE_POLICY` | `consume-first` | `consume-first` or `consume-on-success` |
//! | `SAPPHIRE_NONCE_EXPIRY` | `true` | Evict nonces once the freshness window has passed |

use std::fmt;

use crate::error::ConfigError;

/// Default freshness window in milliseconds.
pub const DEFAULT_FRESHNESS_WINDOW_MS: i64 = 1000;

/// When a nonce is recorded relative to the identity and signature checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoncePolicy {
    /// Record the nonce before the account and signature are checked. A
    /// message that later fails still burns its nonce.
    #[default]
    ConsumeFirst,
    /// Record the nonce only once the signature has matched.
    ConsumeOnSuccess,
}

impl std::str::FromStr for NoncePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "consume-first" => Ok(Self::ConsumeFirst),
            "consume-on-success" => Ok(Self::ConsumeOnSuccess),
            _ => Err(()),
        }
    }
}

/// Configuration for a [`SapphireAuth`](crate::SapphireAuth) instance.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Account identifier this validator accepts.
    pub api_key: String,
    /// Shared secret.
    pub api_secret: String,
    /// Maximum age of an accepted message, in milliseconds.
    #[serde(default = "default_freshness_window_ms")]
    pub freshness_window_ms: i64,
    /// Nonce recording order.
    #[serde(default)]
    pub nonce_policy: NoncePolicy,
    /// Whether recorded nonces expire after the freshness window.
    #[serde(default = "default_true")]
    pub nonce_expiry: bool,
}

fn default_freshness_window_ms() -> i64 {
    DEFAULT_FRESHNESS_WINDOW_MS
}

fn default_true() -> bool {
    true
}

impl AuthConfig {
    /// Create a configuration with default tunables.
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
            nonce_policy: NoncePolicy::default(),
            nonce_expiry: true,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] when the key or secret is unset (or
    /// the key is empty) and
    /// [`ConfigError::InvalidVar`] when a tunable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AuthConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("SAPPHIRE_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingVar("SAPPHIRE_API_KEY"))?;
        let api_secret =
            lookup("SAPPHIRE_API_SECRET").ok_or(ConfigError::MissingVar("SAPPHIRE_API_SECRET"))?;

        let mut config = Self::new(api_key, api_secret);

        if let Some(v) = lookup("SAPPHIRE_FRESHNESS_WINDOW_MS") {
            config.freshness_window_ms = v
                .parse()
                .ok()
                .filter(|window: &i64| *window > 0)
                .ok_or(ConfigError::InvalidVar {
                    name: "SAPPHIRE_FRESHNESS_WINDOW_MS",
                    value: v.clone(),
                })?;
        }
        if let Some(v) = lookup("SAPPHIRE_NONCE_POLICY") {
            config.nonce_policy = v.parse().map_err(|()| ConfigError::InvalidVar {
                name: "SAPPHIRE_NONCE_POLICY",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("SAPPHIRE_NONCE_EXPIRY") {
            config.nonce_expiry = parse_flag(&v).ok_or(ConfigError::InvalidVar {
                name: "SAPPHIRE_NONCE_EXPIRY",
                value: v.clone(),
            })?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("freshness_window_ms", &self.freshness_window_ms)
            .field("nonce_policy", &self.nonce_policy)
            .field("nonce_expiry", &self.nonce_expiry)
            .finish()
    }
}
