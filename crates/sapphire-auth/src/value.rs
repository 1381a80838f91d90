//! Request parameter values.
//!
//! Parameters come from query strings, URL-encoded forms, or JSON bodies, so
//! they are recursive. [`ParamValue`] models them as a closed variant so that
//! canonicalization is total.

use std::collections::BTreeMap;

/// A key-ordered parameter mapping.
pub type Params = BTreeMap<String, ParamValue>;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A string scalar.
    String(String),
    /// A numeric scalar.
    Number(serde_json::Number),
    /// A boolean scalar, rendered as `true` / `false`.
    Bool(bool),
    /// An explicit null, rendered as `null`.
    Null,
    /// An ordered list, canonicalized like a map keyed by index.
    List(Vec<ParamValue>),
    /// A nested mapping.
    Map(Params),
}

impl ParamValue {
    /// Build a nested map from key/value pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use sapphire_auth::ParamValue;
    ///
    /// let nested = ParamValue::map([("a", "b"), ("c", "d")]);
    /// assert!(matches!(nested, ParamValue::Map(ref m) if m.len() == 2));
    /// ```
    pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Render a scalar as the text that gets signed.
    ///
    /// Returns `None` for lists and maps, which canonicalize recursively instead.
    #[must_use]
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(n)),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null => Some("null".to_owned()),
            Self::List(_) | Self::Map(_) => None,
        }
    }
}

/// Render a number in the shortest form that round-trips.
///
/// Integers print as-is. Floats use plain decimal notation while the decimal
/// exponent `n` (value = 0.digits x 10^n) satisfies `-6 < n <= 21`, and
/// `d.ddde+x` / `d.ddde-x` otherwise. Negative zero prints as `0`.
fn format_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => format_float(f),
        _ => n.to_string(),
    }
}

fn format_float(f: f64) -> String {
    if f == 0.0 {
        return "0".to_owned();
    }
    let sign = if f < 0.0 { "-" } else { "" };

    // `{:e}` yields the shortest round-trip digits, e.g. `1.2345e3`.
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let k = i64::try_from(digits.len()).unwrap_or(i64::MAX);
    let n = exp.parse::<i64>().unwrap_or(0) + 1;

    let body = if (k..=21).contains(&n) {
        let zeros = usize::try_from(n - k).unwrap_or(0);
        format!("{digits}{}", "0".repeat(zeros))
    } else if (1..=21).contains(&n) {
        let (int, frac) = digits.split_at(usize::try_from(n).unwrap_or(0));
        format!("{int}.{frac}")
    } else if (-5..=0).contains(&n) {
        let zeros = usize::try_from(-n).unwrap_or(0);
        format!("0.{}{digits}", "0".repeat(zeros))
    } else {
        let e = n - 1;
        let exp_sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{exp_sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{exp_sign}{}", e.abs())
        }
    };

    format!("{sign}{body}")
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<Params> for ParamValue {
    fn from(value: Params) -> Self {
        Self::Map(value)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(value: Vec<ParamValue>) -> Self {
        Self::List(value)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

/// Convert a JSON object into top-level request parameters.
///
/// Non-object JSON values have no named parameters and yield an empty map.
#[must_use]
pub fn params_from_json(value: serde_json::Value) -> Params {
    match ParamValue::from(value) {
        ParamValue::Map(map) => map,
        _ => Params::new(),
    }
}
