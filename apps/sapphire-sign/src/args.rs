use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use sapphire_auth::{Headers, Params, params_from_json};

/// Parse a JSON object argument into request parameters.
pub fn parse_params(raw: &str) -> Result<Params> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("invalid params JSON: {raw}"))?;
    if !value.is_object() {
        bail!("params JSON must be an object");
    }
    Ok(params_from_json(value))
}

/// Parse a JSON object of header name to string (or string array) values.
pub fn parse_headers(raw: &str) -> Result<Headers> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("invalid headers JSON: {raw}"))?;
    let serde_json::Value::Object(map) = value else {
        bail!("headers JSON must be an object");
    };

    let mut headers = Headers::new();
    for (name, value) in map {
        match value {
            serde_json::Value::Array(values) => {
                for v in values {
                    headers.append(name.clone(), json_to_header_value(v));
                }
            }
            other => headers.append(name, json_to_header_value(other)),
        }
    }
    Ok(headers)
}

fn json_to_header_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[derive(Args, Debug)]
pub struct SignArgs {
    /// HTTP method, e.g. GET
    pub method: String,

    /// Request URL without the query string
    pub url: String,

    /// Request parameters as a JSON object
    #[arg(value_parser = parse_params)]
    pub params: Option<Params>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// HTTP method, e.g. GET
    pub method: String,

    /// Request URL without the query string
    pub url: String,

    /// Received headers as a JSON object; array values repeat the header
    #[arg(value_parser = parse_headers)]
    pub headers: Headers,

    /// Request parameters as a JSON object
    #[arg(value_parser = parse_params)]
    pub params: Option<Params>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stamp and sign a request, printing the headers to attach
    Sign(SignArgs),
    /// Verify a received request; exits with 1 when it is rejected
    Verify(VerifyArgs),
}

#[derive(Parser, Debug)]
#[command(about, version)]
pub struct ToolArgs {
    #[command(subcommand)]
    pub command: Command,
}
