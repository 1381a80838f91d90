//! Sapphire signature computation.
//!
//! The signature is an HMAC-SHA256 over a string to sign built from four
//! underscore-separated components:
//!
//! ```text
//! UPPER(method) "_" url "_" CanonicalHeaders "_" CanonicalParams
//! ```
//!
//! and is transmitted base64-encoded. The URL is used verbatim: callers must
//! strip the query string and normalize scheme/host casing themselves.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha2::Sha256;

use crate::canonical::{canonicalize, canonicalize_headers};
use crate::headers::{API_KEY_HEADER, Headers, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::value::Params;

type HmacSha256 = Hmac<Sha256>;

/// An account identifier and the secret it signs with.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    account_id: String,
    secret: String,
}

impl Credential {
    /// Create a credential.
    pub fn new(account_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            secret: secret.into(),
        }
    }

    /// The account identifier.
    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// The shared secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("account_id", &self.account_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Build the string to sign.
///
/// # Examples
///
/// ```
/// use sapphire_auth::{Headers, Params};
/// use sapphire_auth::signer::build_string_to_sign;
///
/// let sts = build_string_to_sign("get", "https://example.com/a", &Headers::new(), &Params::new());
/// assert_eq!(sts, "GET_https://example.com/a__");
/// ```
#[must_use]
pub fn build_string_to_sign(method: &str, url: &str, headers: &Headers, params: &Params) -> String {
    let canonical_headers = canonicalize_headers(headers);
    let canonical_params = canonicalize(params);
    let method = method.to_uppercase();

    format!("{method}_{url}_{canonical_headers}_{canonical_params}")
}

/// Compute `base64(HMAC-SHA256(secret, string_to_sign))`.
///
/// Any secret is accepted, including an empty one.
#[must_use]
pub fn compute_signature(secret: &str, string_to_sign: &str) -> String {
    let mut mac = <HmacSha256 as KeyInit>::new_from_slice(secret.as_bytes())
        .expect("HMAC can accept keys of any length");
    mac.update(string_to_sign.as_bytes());
    BASE64.encode(mac.finalize().into_bytes().as_slice())
}

/// Sign a message with `secret`.
#[must_use]
pub fn sign(method: &str, url: &str, headers: &Headers, params: &Params, secret: &str) -> String {
    compute_signature(secret, &build_string_to_sign(method, url, headers, params))
}

/// Add every control header a receiver expects and return the signature.
///
/// The api-key and timestamp headers are always (re)written. The nonce header
/// is written when `nonce` is given. The signature is computed over the
/// resulting headers and stored under [`SIGNATURE_HEADER`].
pub fn stamp(
    credential: &Credential,
    method: &str,
    url: &str,
    headers: &mut Headers,
    params: &Params,
    timestamp_millis: i64,
    nonce: Option<&str>,
) -> String {
    for name in [API_KEY_HEADER, TIMESTAMP_HEADER, NONCE_HEADER, SIGNATURE_HEADER] {
        headers.remove(name);
        headers.remove(&name.to_ascii_lowercase());
    }
    headers.insert(API_KEY_HEADER, credential.account_id());
    headers.insert(TIMESTAMP_HEADER, timestamp_millis.to_string());
    if let Some(nonce) = nonce {
        headers.insert(NONCE_HEADER, nonce);
    }

    let signature = sign(method, url, headers, params, credential.secret());
    headers.insert(SIGNATURE_HEADER, signature.clone());
    signature
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ParamValue;

    const API_KEY: &str = "abcdefghijklmnopqrstuvwxyz";
    const SECRET: &str = "1234567989-abcd";
    const URL: &str = "https://callrestrictions.com/api/v1/allowable-hours";

    fn headers_with_nonce(nonce: Option<&str>) -> Headers {
        let mut headers: Headers = [
            (API_KEY_HEADER, API_KEY),
            (TIMESTAMP_HEADER, "1564350579593"),
            ("Content-Type", "application/json"),
        ]
        .into_iter()
        .collect();
        if let Some(nonce) = nonce {
            headers.append(NONCE_HEADER, nonce);
        }
        headers
    }

    fn flat_params() -> Params {
        [
            ("areaCode".to_owned(), ParamValue::from("863")),
            ("isB2B".to_owned(), ParamValue::from(true)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_should_match_known_signature_for_flat_params() {
        let signature = sign(
            "GET",
            URL,
            &headers_with_nonce(Some("abcdefgh")),
            &flat_params(),
            SECRET,
        );
        assert_eq!(signature, "3LK+N7E5fgxN4tHDeSWk1vH400MwIt5+PDekcF6+YYA=");
    }

    #[test]
    fn test_should_match_known_signature_without_nonce() {
        let signature = sign("GET", URL, &headers_with_nonce(None), &flat_params(), SECRET);
        assert_eq!(signature, "KuJSSJjhZ6SPYrl18YxcZUos0kEZsnYhpk5LVwUQsjo=");
    }

    #[test]
    fn test_should_match_known_signature_with_unsafe_characters() {
        let signature = sign(
            "GET",
            URL,
            &headers_with_nonce(Some("abcd/efgh")),
            &flat_params(),
            SECRET,
        );
        assert_eq!(signature, "5XecuZbJ2FX4X64LAHnmClDNOUc9PVvddHGTGA/VYLU=");
    }

    #[test]
    fn test_should_build_string_to_sign_from_components() {
        let sts = build_string_to_sign(
            "get",
            URL,
            &headers_with_nonce(Some("abcdefgh")),
            &flat_params(),
        );
        assert_eq!(
            sts,
            "GET_https://callrestrictions.com/api/v1/allowable-hours_\
             x-sapphire-api-key=abcdefghijklmnopqrstuvwxyz\
             &x-sapphire-nonce=abcdefgh\
             &x-sapphire-timestamp=1564350579593_\
             areaCode=863&isB2B=true"
        );
    }

    #[test]
    fn test_should_sign_with_empty_secret() {
        let signature = sign("GET", URL, &Headers::new(), &Params::new(), "");
        assert_eq!(signature.len(), 44);
        assert_ne!(signature, sign("GET", URL, &Headers::new(), &Params::new(), "x"));
    }

    #[test]
    fn test_should_ignore_non_sapphire_headers() {
        let mut headers = headers_with_nonce(Some("abcdefgh"));
        let before = sign("GET", URL, &headers, &flat_params(), SECRET);
        headers.insert("Content-Type", "text/plain");
        headers.insert(SIGNATURE_HEADER, "anything");
        assert_eq!(before, sign("GET", URL, &headers, &flat_params(), SECRET));
    }

    #[test]
    fn test_should_change_signature_when_any_component_changes() {
        let headers = headers_with_nonce(Some("abcdefgh"));
        let params = flat_params();
        let base = sign("GET", URL, &headers, &params, SECRET);

        assert_ne!(base, sign("POST", URL, &headers, &params, SECRET));
        assert_ne!(base, sign("GET", &format!("{URL}/x"), &headers, &params, SECRET));

        let mut tampered_headers = headers.clone();
        tampered_headers.insert(NONCE_HEADER, "abcdefgi");
        assert_ne!(base, sign("GET", URL, &tampered_headers, &params, SECRET));

        let mut tampered_params = params.clone();
        tampered_params.insert("areaCode".to_owned(), ParamValue::from("864"));
        assert_ne!(base, sign("GET", URL, &headers, &tampered_params, SECRET));

        assert_ne!(base, sign("GET", URL, &headers, &params, "other-secret"));
    }

    #[test]
    fn test_should_stamp_control_headers_and_signature() {
        let credential = Credential::new(API_KEY, SECRET);
        let mut headers: Headers = [("Content-Type", "application/json"), ("x-sapphire-nonce", "stale")]
            .into_iter()
            .collect();

        let signature = stamp(
            &credential,
            "GET",
            URL,
            &mut headers,
            &flat_params(),
            1_564_350_579_593,
            Some("abcdefgh"),
        );

        assert_eq!(signature, "3LK+N7E5fgxN4tHDeSWk1vH400MwIt5+PDekcF6+YYA=");
        assert_eq!(headers.control(SIGNATURE_HEADER).unwrap(), Some(signature.as_str()));
        assert_eq!(headers.control(NONCE_HEADER).unwrap(), Some("abcdefgh"));
        assert_eq!(headers.get_all("x-sapphire-nonce").count(), 0);
    }

    #[test]
    fn test_should_redact_secret_in_debug_output() {
        let rendered = format!("{:?}", Credential::new(API_KEY, SECRET));
        assert!(rendered.contains(API_KEY));
        assert!(!rendered.contains(SECRET));
    }
}
