//! Canonical string construction for Sapphire signatures.
//!
//! A canonical string is a deterministic, order-independent rendering of a
//! named-value mapping:
//!
//! ```text
//! enc(key1)=enc(value1)&enc(key2)=enc(value2)&...
//! ```
//!
//! Keys are sorted byte-wise. A nested mapping is canonicalized first and the
//! resulting string is then encoded as one scalar value, so nesting never
//! flattens into the parent. Percent-encoding leaves only
//! `A-Z a-z 0-9 - _ . ! ~ * ' ( )` unescaped.

use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::headers::{Headers, SIGNATURE_HEADER, SIGNED_HEADER_PREFIX};
use crate::value::{ParamValue, Params};

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Build the canonical string for a parameter mapping.
///
/// # Examples
///
/// ```
/// use sapphire_auth::ParamValue;
/// use sapphire_auth::canonical::canonicalize;
///
/// let params = [
///     ("isB2B".to_owned(), ParamValue::from(true)),
///     ("areaCode".to_owned(), ParamValue::from("863")),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(canonicalize(&params), "areaCode=863&isB2B=true");
/// ```
#[must_use]
pub fn canonicalize(params: &Params) -> String {
    join_pairs(params.iter().map(|(k, v)| (k.as_str(), render_value(v))))
}

/// Build the canonical string for the signed subset of `headers`.
///
/// Only headers whose lower-cased name starts with `x-sapphire-` take part,
/// and the signature header itself is always excluded. Names are lower-cased.
/// Several values under the same lower-cased name are joined with `,` in
/// arrival order.
///
/// # Examples
///
/// ```
/// use sapphire_auth::Headers;
/// use sapphire_auth::canonical::canonicalize_headers;
///
/// let headers: Headers = [
///     ("X-Sapphire-Timestamp", "1564350579593"),
///     ("Content-Type", "application/json"),
///     ("X-Sapphire-Signature", "ignored"),
/// ]
/// .into_iter()
/// .collect();
///
/// assert_eq!(canonicalize_headers(&headers), "x-sapphire-timestamp=1564350579593");
/// ```
#[must_use]
pub fn canonicalize_headers(headers: &Headers) -> String {
    let signature_name = SIGNATURE_HEADER.to_ascii_lowercase();

    let mut signed: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let lower_name = name.to_lowercase();
        if !lower_name.starts_with(SIGNED_HEADER_PREFIX) || lower_name == signature_name {
            continue;
        }
        signed
            .entry(lower_name)
            .and_modify(|existing| {
                existing.push(',');
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_owned());
    }

    join_pairs(signed.iter().map(|(k, v)| (k.as_str(), v.clone())))
}

/// Render a value as the string that gets percent-encoded.
fn render_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Map(nested) => canonicalize(nested),
        ParamValue::List(items) => canonicalize_list(items),
        scalar => scalar.scalar_string().unwrap_or_default(),
    }
}

/// Lists canonicalize like a map keyed by index, so `"10"` sorts before `"2"`.
fn canonicalize_list(items: &[ParamValue]) -> String {
    let mut pairs: Vec<(String, String)> = items
        .iter()
        .enumerate()
        .map(|(index, item)| (index.to_string(), render_value(item)))
        .collect();
    pairs.sort_unstable_by(|a, b| a.0.cmp(&b.0));

    join_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.clone())))
}

/// Encode and join pairs that are already in canonical order.
fn join_pairs<'a>(pairs: impl Iterator<Item = (&'a str, String)>) -> String {
    pairs
        .map(|(key, value)| format!("{}={}", component_encode(key), component_encode(&value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode a key or value component.
fn component_encode(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT_ENCODE_SET).to_string()
}
