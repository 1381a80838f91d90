//! Shared-secret request authentication for Sapphire APIs.
//!
//! A caller signs an outbound message with its account secret; a receiver
//! recomputes the signature to verify authenticity, freshness, and, when a
//! nonce is supplied, non-replay.
//!
//! # Overview
//!
//! The signature is `base64(HMAC-SHA256(secret, token))` where the token is
//! the upper-cased method, the URL (without query string), the canonical
//! `X-Sapphire-*` headers and the canonical parameters, joined by `_`.
//! Validation checks, in order, the timestamp, the nonce, the account
//! identifier and finally the signature.
//!
//! # Usage
//!
//! ```rust
//! use sapphire_auth::{Headers, ParamValue, Params, SapphireAuth};
//!
//! let auth = SapphireAuth::new("abcdefghijklmnopqrstuvwxyz", "1234567989-abcd");
//!
//! let mut params = Params::new();
//! params.insert("areaCode".to_owned(), ParamValue::from("863"));
//!
//! // Client side: add the control headers and the signature.
//! let mut headers = Headers::new();
//! auth.stamp("GET", "https://callrestrictions.com/api/v1/allowable-hours", &mut headers, &params);
//!
//! // Server side: validate.
//! assert!(auth.is_valid("GET", "https://callrestrictions.com/api/v1/allowable-hours", &headers, &params));
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical strings for headers and parameters
//! - [`clock`] - Time sources
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Validation and configuration errors
//! - [`headers`] - Header multimap and control header names
//! - [`nonce`] - Replay-protection store
//! - [`request`] - Adapter for `http` request parts
//! - [`signer`] - Signature computation
//! - [`validator`] - The validation pipeline
//! - [`value`] - Parameter values

pub mod canonical;
pub mod clock;
pub mod config;
pub mod error;
pub mod headers;
pub mod nonce;
pub mod request;
pub mod signer;
pub mod validator;
pub mod value;

pub use config::{AuthConfig, NoncePolicy};
pub use error::{AuthError, ConfigError};
pub use headers::{API_KEY_HEADER, Headers, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
pub use nonce::NonceStore;
pub use request::{Message, status_for};
pub use signer::{Credential, sign};
pub use validator::SapphireAuth;
pub use value::{ParamValue, Params, params_from_json};
