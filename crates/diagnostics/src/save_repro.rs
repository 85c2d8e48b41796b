//! Replays a save request with a literal JSON body to reproduce a
//! server-side error outside the browser.

use std::time::{Duration, Instant};

use reqwest::Method;
use serde::Serialize;

use crate::DiagnosticsError;

#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub url: String,
    pub method: String,
    /// Raw JSON text; validated before sending.
    pub payload: String,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveResponse {
    pub status: u16,
    pub elapsed: Duration,
    pub content_type: Option<String>,
    pub body: String,
}

impl SaveResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body re-indented when it is JSON, as-is otherwise.
    pub fn pretty_body(&self) -> String {
        serde_json::from_str::<serde_json::Value>(&self.body)
            .and_then(|v| serde_json::to_string_pretty(&v))
            .unwrap_or_else(|_| self.body.clone())
    }
}

/// Send the request and capture whatever comes back.
///
/// A 4xx/5xx answer is the point of the exercise, so it is returned as
/// a normal [`SaveResponse`].
pub async fn reproduce(
    client: &reqwest::Client,
    req: &SaveRequest,
) -> Result<SaveResponse, DiagnosticsError> {
    let payload: serde_json::Value = serde_json::from_str(&req.payload)?;
    let method: Method = req
        .method
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| DiagnosticsError::InvalidRequest(format!("bad method {:?}", req.method)))?;

    let mut request = client.request(method.clone(), &req.url).json(&payload);
    if let Some(token) = &req.bearer_token {
        request = request.bearer_auth(token);
    }

    tracing::info!(url = %req.url, %method, "Replaying save request");
    let started = Instant::now();
    let response = request.send().await?;
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await?;
    let elapsed = started.elapsed();

    if (200..300).contains(&status) {
        tracing::info!(status, elapsed_ms = elapsed.as_millis() as u64, "Save succeeded");
    } else {
        tracing::warn!(status, elapsed_ms = elapsed.as_millis() as u64, "Save reproduced an error");
    }

    Ok(SaveResponse {
        status,
        elapsed,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> SaveResponse {
        SaveResponse {
            status,
            elapsed: Duration::from_millis(5),
            content_type: None,
            body: body.into(),
        }
    }

    #[test]
    fn pretty_prints_json_bodies() {
        let r = response(422, r#"{"detail":"stage required"}"#);
        assert_eq!(r.pretty_body(), "{\n  \"detail\": \"stage required\"\n}");
        assert!(!r.is_success());
    }

    #[test]
    fn leaves_plain_bodies_alone() {
        let r = response(500, "Internal Server Error");
        assert_eq!(r.pretty_body(), "Internal Server Error");
    }

    #[tokio::test]
    async fn invalid_payload_rejected_before_sending() {
        let client = reqwest::Client::new();
        let req = SaveRequest {
            // Unroutable; the payload check must fail first.
            url: "http://127.0.0.1:9/unused".into(),
            method: "POST".into(),
            payload: "{not json".into(),
            bearer_token: None,
        };
        let err = reproduce(&client, &req).await.unwrap_err();
        assert!(matches!(err, DiagnosticsError::InvalidPayload(_)));
    }
}
