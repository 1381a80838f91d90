//! Adapter from `http` request parts to Sapphire messages.
//!
//! The signed URL is `scheme://host + path` with the query string removed;
//! query parameters are merged into the parameter map instead. Body
//! parameters (a decoded JSON body or form) override query parameters with the
//! same name. A key repeated in the query string becomes a list.

use http::StatusCode;
use http::request::Parts;

use crate::error::AuthError;
use crate::headers::Headers;
use crate::validator::SapphireAuth;
use crate::value::{ParamValue, Params};

/// A message as the signer and validator see it.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// HTTP method.
    pub method: String,
    /// `scheme://host + path`, without query string.
    pub url: String,
    /// All request headers.
    pub headers: Headers,
    /// Query and body parameters.
    pub params: Params,
}

impl Message {
    /// Build a message from request parts and already-decoded body parameters.
    ///
    /// The scheme comes from the request URI, then `X-Forwarded-Proto`, then
    /// defaults to `http`. The host comes from the URI authority, then the
    /// `Host` header.
    #[must_use]
    pub fn from_http_parts(parts: &Parts, body_params: Params) -> Self {
        let mut params = parse_query(parts.uri.query().unwrap_or(""));
        params.extend(body_params);

        Self {
            method: parts.method.as_str().to_owned(),
            url: signing_url(parts),
            headers: Headers::from(&parts.headers),
            params,
        }
    }
}

/// Derive `scheme://host + path` from request parts.
fn signing_url(parts: &Parts) -> String {
    let scheme = parts
        .uri
        .scheme_str()
        .or_else(|| {
            parts
                .headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
        })
        .unwrap_or("http");

    let host = parts
        .uri
        .authority()
        .map(http::uri::Authority::as_str)
        .or_else(|| {
            parts
                .headers
                .get(http::header::HOST)
                .and_then(|v| v.to_str().ok())
        })
        .unwrap_or("");

    format!("{scheme}://{host}{}", parts.uri.path())
}

/// Decode a query string into parameters.
fn parse_query(query: &str) -> Params {
    let mut params = Params::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let value = ParamValue::String(value.into_owned());
        match params.get_mut(&*key) {
            Some(ParamValue::List(items)) => items.push(value),
            Some(existing) => {
                let first = std::mem::replace(existing, ParamValue::Null);
                *existing = ParamValue::List(vec![first, value]);
            }
            None => {
                params.insert(key.into_owned(), value);
            }
        }
    }
    params
}

/// The status a framework should answer with for a validation outcome.
#[must_use]
pub fn status_for(valid: bool) -> StatusCode {
    if valid {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

impl SapphireAuth {
    /// Validate a message from `http` request parts.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first failing check.
    pub fn verify_http(&self, parts: &Parts, body_params: Params) -> Result<(), AuthError> {
        let message = Message::from_http_parts(parts, body_params);
        self.verify_message(&message)
    }

    /// Whether an `http` request is valid. See [`SapphireAuth::is_valid`].
    #[must_use]
    pub fn is_valid_http(&self, parts: &Parts, body_params: Params) -> bool {
        self.verify_http(parts, body_params).is_ok()
    }

    /// Validate an already-assembled [`Message`].
    ///
    /// # Errors
    ///
    /// Returns the [`AuthError`] of the first failing check.
    pub fn verify_message(&self, message: &Message) -> Result<(), AuthError> {
        self.verify(
            &message.method,
            &message.url,
            &message.headers,
            &message.params,
        )
    }

    /// Sign an already-assembled [`Message`].
    #[must_use]
    pub fn sign_message(&self, message: &Message) -> String {
        self.sign(
            &message.method,
            &message.url,
            &message.headers,
            &message.params,
        )
    }
}
