//! Sapphire Sign - stamp or verify Sapphire-authenticated requests.
//!
//! # Usage
//!
//! ```text
//! sapphire-sign sign <METHOD> <URL> [PARAMS_JSON]
//! sapphire-sign verify <METHOD> <URL> <HEADERS_JSON> [PARAMS_JSON]
//! sapphire-sign --help
//! ```
//!
//! `sign` prints the headers to attach, one `Name: value` per line.
//! `verify` exits with code 0 when the request is valid and 1 otherwise.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SAPPHIRE_API_KEY` | *(required)* | Account identifier |
//! | `SAPPHIRE_API_SECRET` | *(required)* | Shared secret |
//! | `SAPPHIRE_FRESHNESS_WINDOW_MS` | `1000` | Maximum message age |
//! | `SAPPHIRE_NONCE_POLICY` | `consume-first` | `consume-first` or `consume-on-success` |
//! | `SAPPHIRE_NONCE_EXPIRY` | `true` | Drop remembered nonces once their window passes |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result};
use clap::Parser;
use sapphire_auth::{AuthConfig, Headers, SapphireAuth};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use self::args::{Command, SignArgs, ToolArgs, VerifyArgs};

mod args;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to `LOG_LEVEL` (default `info`).
/// Logs go to stderr so that stdout carries only command output.
fn init_tracing() -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
        EnvFilter::try_new(&log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn run_sign(auth: &SapphireAuth, args: SignArgs) {
    let params = args.params.unwrap_or_default();

    let mut headers = Headers::new();
    let signature = auth.stamp(&args.method, &args.url, &mut headers, &params);
    debug!(signature = %signature, "stamped request");

    for (name, value) in headers.iter() {
        println!("{name}: {value}");
    }
}

fn run_verify(auth: &SapphireAuth, args: VerifyArgs) -> bool {
    let params = args.params.unwrap_or_default();

    match auth.verify(&args.method, &args.url, &args.headers, &params) {
        Ok(()) => {
            println!("valid");
            true
        }
        Err(e) => {
            println!("invalid: {e}");
            false
        }
    }
}

fn main() -> Result<()> {
    let args = ToolArgs::parse();
    init_tracing()?;

    let config = AuthConfig::from_env().context("failed to load configuration")?;
    info!(
        api_key = %config.api_key,
        freshness_window_ms = config.freshness_window_ms,
        "loaded Sapphire configuration",
    );
    let auth = SapphireAuth::from_config(&config);

    match args.command {
        Command::Sign(args) => run_sign(&auth, args),
        Command::Verify(args) => {
            let valid = run_verify(&auth, args);
            std::process::exit(i32::from(!valid));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sapphire_auth::clock::ManualClock;

    use super::*;

    #[test]
    fn test_should_report_stamped_request_as_valid_once() {
        let auth = SapphireAuth::new("key", "secret").with_clock(ManualClock::new(1_000));
        let mut headers = Headers::new();
        auth.stamp("GET", "https://api.example.com/v1", &mut headers, &Default::default());

        let verify = || VerifyArgs {
            method: "GET".to_owned(),
            url: "https://api.example.com/v1".to_owned(),
            headers: headers.clone(),
            params: None,
        };
        assert!(run_verify(&auth, verify()));
        assert!(!run_verify(&auth, verify()));
    }
}
