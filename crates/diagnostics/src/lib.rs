//! One-shot HTTP probes against a running ERP backend and its hosted
//! Supabase project.
//!
//! Every probe takes a shared [`reqwest::Client`] (see [`build_client`])
//! and returns a plain report struct; printing is left to the caller.

pub mod cors;
pub mod error;
pub mod save_repro;
pub mod supabase;

use std::time::Duration;

pub use error::DiagnosticsError;

/// Client with the request timeout every probe shares.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, DiagnosticsError> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("cinerp-ops/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Join a base URL and a path without doubling or dropping the slash.
pub fn join_url(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) if !path.is_empty() => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
