//! Sapphire message validation.
//!
//! [`SapphireAuth`] verifies a message in a fixed order:
//!
//! 1. Freshness: the timestamp header must be present, integral, and satisfy
//!    `now - timestamp < window`.
//! 2. The account-id header is read.
//! 3. Replay: a present nonce is checked and recorded for that account. Under
//!    [`NoncePolicy::ConsumeFirst`] this happens here, so a message that fails
//!    later still consumes its nonce.
//! 4. Identity: the account id must equal the configured one.
//! 5. Signature: the signature header must equal the recomputed signature,
//!    compared in constant time.
//!
//! The main entry points are [`SapphireAuth::is_valid`] and
//! [`SapphireAuth::verify`].

use std::sync::Arc;

use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::{AuthConfig, DEFAULT_FRESHNESS_WINDOW_MS, NoncePolicy};
use crate::error::AuthError;
use crate::headers::{API_KEY_HEADER, Headers, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::nonce::NonceStore;
use crate::signer::{self, Credential};
use crate::value::Params;

/// Signs outbound messages and validates inbound ones for one account.
///
/// Cloning is cheap and clones share the same nonce store.
///
/// # Examples
///
/// ```
/// use sapphire_auth::clock::ManualClock;
/// use sapphire_auth::{Headers, Params, SapphireAuth};
///
/// let clock = ManualClock::new(1_564_350_580_093);
/// let auth = SapphireAuth::new("my-account", "my-secret").with_clock(clock);
///
/// let mut headers = Headers::new();
/// auth.stamp("GET", "https://api.example.com/v1/items", &mut headers, &Params::new());
///
/// assert!(auth.is_valid("GET", "https://api.example.com/v1/items", &headers, &Params::new()));
/// // The stamped nonce cannot be replayed.
/// assert!(!auth.is_valid("GET", "https://api.example.com/v1/items", &headers, &Params::new()));
/// ```
#[derive(Debug, Clone)]
pub struct SapphireAuth {
    credential: Credential,
    freshness_window_ms: i64,
    nonce_policy: NoncePolicy,
    nonce_expiry: bool,
    nonces: Arc<NonceStore>,
    clock: Arc<dyn Clock>,
}

impl SapphireAuth {
    /// Header carrying the account identifier.
    pub const API_KEY_HEADER: &'static str = API_KEY_HEADER;
    /// Header carrying the send timestamp.
    pub const TIMESTAMP_HEADER: &'static str = TIMESTAMP_HEADER;
    /// Header carrying the signature.
    pub const SIGNATURE_HEADER: &'static str = SIGNATURE_HEADER;
    /// Header carrying the nonce.
    pub const NONCE_HEADER: &'static str = NONCE_HEADER;

    /// Create a validator for `account_id` with its own nonce store and the
    /// system clock.
    pub fn new(account_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            credential: Credential::new(account_id, secret),
            freshness_window_ms: DEFAULT_FRESHNESS_WINDOW_MS,
            nonce_policy: NoncePolicy::default(),
            nonce_expiry: true,
            nonces: Arc::new(NonceStore::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a validator from a loaded configuration.
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.api_key.clone(), config.api_secret.clone())
            .with_freshness_window(config.freshness_window_ms)
            .with_nonce_policy(config.nonce_policy)
            .with_nonce_expiry(config.nonce_expiry)
    }

    /// Use `clock` as the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Share `store` with other validators.
    #[must_use]
    pub fn with_nonce_store(mut self, store: Arc<NonceStore>) -> Self {
        self.nonces = store;
        self
    }

    /// Override the freshness window, in milliseconds.
    #[must_use]
    pub fn with_freshness_window(mut self, window_ms: i64) -> Self {
        self.freshness_window_ms = window_ms;
        self
    }

    /// Choose when nonces are recorded.
    #[must_use]
    pub fn with_nonce_policy(mut self, policy: NoncePolicy) -> Self {
        self.nonce_policy = policy;
        self
    }

    /// Enable or disable nonce expiry. Disabled, nonces are kept for the life
    /// of the store.
    #[must_use]
    pub fn with_nonce_expiry(mut self, enabled: bool) -> Self {
        self.nonce_expiry = enabled;
        self
    }

    /// The configured account identifier.
    #[must_use]
    pub fn account_id(&self) -> &str {
        self.credential.account_id()
    }

    /// The nonce store backing replay protection.
    #[must_use]
    pub fn nonce_store(&self) -> &Arc<NonceStore> {
        &self.nonces
    }

    /// Forget every recorded nonce. Never expose this to request handlers.
    pub fn reset_nonces(&self) {
        self.nonces.reset();
    }

    /// Compute the signature for a message with this validator's secret.
    #[must_use]
    pub fn sign(&self, method: &str, url: &str, headers: &Headers, params: &Params) -> String {
        signer::sign(method, url, headers, params, self.credential.secret())
    }

    /// Prepare an outbound message: write the api-key, current timestamp and a
    /// fresh random nonce, then sign and write the signature header.
    pub fn stamp(&self, method: &str, url: &str, headers: &mut Headers, params: &Params) -> String {
        let nonce = uuid::Uuid::new_v4().to_string();
        signer::stamp(
            &self.credential,
            method,
            url,
            headers,
            params,
            self.clock.now_millis(),
            Some(&nonce),
        )
    }

    /// Whether the message is authentic, fresh, and not replayed.
    ///
    /// Every failure, including malformed input, yields `false`.
    #[must_use]
    pub fn is_valid(&self, method: &str, url: &str, headers: &Headers, params: &Params) -> bool {
        self.verify(method, url, headers, params).is_ok()
    }

    /// Validate a message, reporting why it was rejected.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first failing check.
    pub fn verify(
        &self,
        method: &str,
        url: &str,
        headers: &Headers,
        params: &Params,
    ) -> Result<(), AuthError> {
        let now = self.clock.now_millis();

        let timestamp = self.check_freshness(headers, now)?;
        let api_key = headers.control(API_KEY_HEADER)?;
        let nonce = headers.control(NONCE_HEADER)?;

        let expires_at = if self.nonce_expiry {
            timestamp.max(now).saturating_add(self.freshness_window_ms)
        } else {
            i64::MAX
        };

        if self.nonce_policy == NoncePolicy::ConsumeFirst {
            if let Some(nonce) = nonce {
                self.consume_nonce(api_key.unwrap_or_default(), nonce, expires_at, now)?;
            }
        }

        let api_key = api_key.ok_or_else(|| {
            debug!("Missing account identifier");
            AuthError::MissingHeader(API_KEY_HEADER)
        })?;
        if api_key != self.credential.account_id() {
            debug!(api_key, "Account identifier mismatch");
            return Err(AuthError::AccountMismatch);
        }

        let provided = headers.control(SIGNATURE_HEADER)?.ok_or_else(|| {
            debug!(api_key, "Missing signature");
            AuthError::MissingHeader(SIGNATURE_HEADER)
        })?;
        let expected = self.sign(method, url, headers, params);

        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            debug!(api_key, provided, "Signature mismatch");
            return Err(AuthError::SignatureDoesNotMatch);
        }

        if self.nonce_policy == NoncePolicy::ConsumeOnSuccess {
            if let Some(nonce) = nonce {
                self.consume_nonce(api_key, nonce, expires_at, now)?;
            }
        }

        debug!(api_key, "Signature verification succeeded");
        Ok(())
    }

    /// Parse the timestamp header and reject messages outside the window.
    fn check_freshness(&self, headers: &Headers, now: i64) -> Result<i64, AuthError> {
        let raw = headers.control(TIMESTAMP_HEADER)?.ok_or_else(|| {
            debug!("Missing timestamp");
            AuthError::MissingHeader(TIMESTAMP_HEADER)
        })?;

        let timestamp: i64 = raw.trim().parse().map_err(|_| {
            debug!(timestamp = raw, "Timestamp is not an integer");
            AuthError::InvalidTimestamp(raw.to_owned())
        })?;

        if timestamp.saturating_add(self.freshness_window_ms) <= now {
            debug!(timestamp, now, "Request has expired");
            return Err(AuthError::RequestExpired { timestamp, now });
        }

        Ok(timestamp)
    }

    fn consume_nonce(
        &self,
        account_id: &str,
        nonce: &str,
        expires_at: i64,
        now: i64,
    ) -> Result<(), AuthError> {
        if self.nonces.seen_before(account_id, nonce, expires_at, now) {
            warn!(account_id, nonce, "Rejected replayed nonce");
            return Err(AuthError::NonceReplayed);
        }
        Ok(())
    }
}
