//! CORS preflight probe.
//!
//! Sends the same `OPTIONS` request a browser would send before a
//! cross-origin call and reports whether the answer would let it through.

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Method;
use serde::Serialize;

use crate::DiagnosticsError;

const ALLOW_ORIGIN: &str = "access-control-allow-origin";
const ALLOW_METHODS: &str = "access-control-allow-methods";
const ALLOW_HEADERS: &str = "access-control-allow-headers";
const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";

#[derive(Debug, Clone)]
pub struct CorsProbe {
    pub url: String,
    pub origin: String,
    /// Method the browser would ask permission for, e.g. `POST`.
    pub method: String,
    /// Extra request headers the browser would ask permission for.
    pub request_headers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorsReport {
    pub status: u16,
    /// Every `access-control-*` header in the response, lowercased names.
    pub headers: Vec<(String, String)>,
    pub origin_allowed: bool,
    pub method_allowed: bool,
    /// Requested headers missing from `access-control-allow-headers`.
    pub headers_denied: Vec<String>,
    pub credentials_allowed: bool,
}

impl CorsReport {
    /// Whether a browser would proceed with the real request.
    pub fn passes(&self) -> bool {
        self.origin_allowed && self.method_allowed && self.headers_denied.is_empty()
    }
}

/// Send the preflight and evaluate the response.
pub async fn probe(
    client: &reqwest::Client,
    probe: &CorsProbe,
) -> Result<CorsReport, DiagnosticsError> {
    let method: Method = probe
        .method
        .to_ascii_uppercase()
        .parse()
        .map_err(|_| DiagnosticsError::InvalidRequest(format!("bad method {:?}", probe.method)))?;

    let mut request = client
        .request(Method::OPTIONS, &probe.url)
        .header("Origin", &probe.origin)
        .header("Access-Control-Request-Method", method.as_str());
    if !probe.request_headers.is_empty() {
        request = request.header(
            "Access-Control-Request-Headers",
            probe.request_headers.join(", "),
        );
    }

    tracing::info!(
        url = %probe.url,
        origin = %probe.origin,
        method = %method,
        "Sending CORS preflight"
    );
    let response = request.send().await?;
    let status = response.status().as_u16();
    let report = evaluate(status, response.headers(), probe);

    tracing::info!(status, passes = report.passes(), "CORS preflight evaluated");
    Ok(report)
}

/// Judge a preflight response's headers against the probe.
pub fn evaluate(status: u16, headers: &HeaderMap, probe: &CorsProbe) -> CorsReport {
    let collected: Vec<(String, String)> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("access-control-"))
        .map(|(name, value)| (name.as_str().to_string(), header_text(value)))
        .collect();

    // A credentialed response may not use `*`; browsers then read it literally.
    let credentials_allowed = header(headers, ALLOW_CREDENTIALS)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    let wildcard = |v: &str| v == "*" && !credentials_allowed;

    let allow_origin = header(headers, ALLOW_ORIGIN);
    let origin_allowed =
        matches!(allow_origin.as_deref(), Some(o) if wildcard(o) || o == probe.origin);

    let allow_methods = list(header(headers, ALLOW_METHODS));
    let method_allowed = allow_methods
        .iter()
        .any(|m| wildcard(m.as_str()) || m.eq_ignore_ascii_case(&probe.method));

    let allow_headers = list(header(headers, ALLOW_HEADERS));
    let headers_denied = probe
        .request_headers
        .iter()
        .filter(|h| {
            !allow_headers
                .iter()
                .any(|a| wildcard(a.as_str()) || a.eq_ignore_ascii_case(h))
        })
        .cloned()
        .collect();

    CorsReport {
        status,
        headers: collected,
        origin_allowed,
        method_allowed,
        headers_denied,
        credentials_allowed,
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).map(header_text)
}

fn header_text(value: &HeaderValue) -> String {
    String::from_utf8_lossy(value.as_bytes()).trim().to_string()
}

fn list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_for(origin: &str) -> CorsProbe {
        CorsProbe {
            url: "http://localhost:8000/api/projects".into(),
            origin: origin.into(),
            method: "post".into(),
            request_headers: vec!["Content-Type".into(), "Authorization".into()],
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn exact_origin_and_listed_method_pass() {
        let map = headers(&[
            ("access-control-allow-origin", "http://localhost:5173"),
            ("access-control-allow-methods", "GET, POST, OPTIONS"),
            ("access-control-allow-headers", "content-type, authorization"),
            ("access-control-allow-credentials", "true"),
            ("content-length", "0"),
        ]);
        let report = evaluate(204, &map, &probe_for("http://localhost:5173"));

        assert!(report.passes());
        assert!(report.credentials_allowed);
        assert_eq!(report.headers.len(), 4);
    }

    #[test]
    fn wildcards_pass() {
        let map = headers(&[
            ("access-control-allow-origin", "*"),
            ("access-control-allow-methods", "*"),
            ("access-control-allow-headers", "*"),
        ]);
        let report = evaluate(200, &map, &probe_for("https://erp.example.com"));
        assert!(report.passes());
        assert!(!report.credentials_allowed);
    }

    #[test]
    fn other_origin_fails() {
        let map = headers(&[
            ("access-control-allow-origin", "http://localhost:3000"),
            ("access-control-allow-methods", "POST"),
            ("access-control-allow-headers", "content-type, authorization"),
        ]);
        let report = evaluate(200, &map, &probe_for("http://localhost:5173"));
        assert!(!report.origin_allowed);
        assert!(report.method_allowed);
        assert!(!report.passes());
    }

    #[test]
    fn missing_headers_fail_everything() {
        let report = evaluate(405, &HeaderMap::new(), &probe_for("http://localhost:5173"));
        assert!(!report.origin_allowed);
        assert!(!report.method_allowed);
        assert_eq!(report.headers_denied, vec!["Content-Type", "Authorization"]);
        assert!(report.headers.is_empty());
    }

    #[test]
    fn wildcards_with_credentials_fail() {
        let map = headers(&[
            ("access-control-allow-origin", "*"),
            ("access-control-allow-methods", "*"),
            ("access-control-allow-headers", "*"),
            ("access-control-allow-credentials", "true"),
        ]);
        let report = evaluate(204, &map, &probe_for("http://localhost:5173"));

        assert!(report.credentials_allowed);
        assert!(!report.origin_allowed);
        assert!(!report.method_allowed);
        assert_eq!(report.headers_denied, vec!["Content-Type", "Authorization"]);
        assert!(!report.passes());
    }

    #[test]
    fn credentials_with_explicit_lists_pass() {
        let map = headers(&[
            ("access-control-allow-origin", "http://localhost:5173"),
            ("access-control-allow-methods", "POST"),
            ("access-control-allow-headers", "*, content-type, authorization"),
            ("access-control-allow-credentials", "true"),
        ]);
        assert!(evaluate(204, &map, &probe_for("http://localhost:5173")).passes());
    }

    #[test]
    fn unlisted_request_header_is_denied() {
        let map = headers(&[
            ("access-control-allow-origin", "*"),
            ("access-control-allow-methods", "POST"),
            ("access-control-allow-headers", "content-type"),
        ]);
        let report = evaluate(200, &map, &probe_for("http://localhost:5173"));
        assert_eq!(report.headers_denied, vec!["Authorization"]);
    }
}
