/// Errors from the diagnostics probes.
///
/// A probe that reaches the server and gets a non-2xx answer is usually a
/// successful probe; only the Supabase check turns that into [`Api`].
///
/// [`Api`]: DiagnosticsError::Api
#[derive(Debug, thiserror::Error)]
pub enum DiagnosticsError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Table or column name that cannot be sent as a path segment.
    #[error(transparent)]
    Core(#[from] cinerp_core::CoreError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payload is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// The remote API answered with a non-2xx status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
}
