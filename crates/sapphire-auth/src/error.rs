//! Error types for Sapphire request authentication.
//!
//! Validation never surfaces these to untrusted callers: [`SapphireAuth::is_valid`]
//! collapses every [`AuthError`] into `false`. The variants exist so that
//! operators and framework adapters can log or branch on the precise reason.
//!
//! [`SapphireAuth::is_valid`]: crate::SapphireAuth::is_valid

/// Reasons a message can fail validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// A required control header is absent.
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),

    /// A control header carries more than one value.
    #[error("Header carries multiple values: {0}")]
    AmbiguousHeader(&'static str),

    /// The timestamp header is not an integer number of milliseconds.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The message is older than the freshness window.
    #[error("Request has expired (timestamp {timestamp}, now {now})")]
    RequestExpired {
        /// Timestamp carried by the message, in ms since the epoch.
        timestamp: i64,
        /// Validation time, in ms since the epoch.
        now: i64,
    },

    /// The nonce was already recorded for this account.
    #[error("Nonce has already been used")]
    NonceReplayed,

    /// The account identifier is missing or belongs to another account.
    #[error("Account identifier does not match")]
    AccountMismatch,

    /// The computed signature does not match the provided signature.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,
}

/// Errors raised while loading [`AuthConfig`](crate::AuthConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing environment variable: {0}")]
    MissingVar(&'static str),

    /// An environment variable holds a value that cannot be parsed.
    #[error("invalid value for {name}: {value}")]
    InvalidVar {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}
