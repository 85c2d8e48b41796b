//! HTTP diagnostics: `cors-probe`, `repro-save`, `supabase-check`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use cinerp_diagnostics::cors::{self, CorsProbe};
use cinerp_diagnostics::save_repro::{self, SaveRequest};
use cinerp_diagnostics::supabase::SupabaseClient;
use cinerp_diagnostics::{build_client, join_url};

use crate::config::OpsConfig;
use crate::output::{print_json, print_table};

pub struct CorsArgs {
    pub url: Option<String>,
    pub origin: Option<String>,
    pub method: String,
    pub headers: Vec<String>,
}

pub async fn cors_probe(config: &OpsConfig, args: CorsArgs, json: bool) -> Result<()> {
    let client = build_client(config.http_timeout)?;
    let probe = CorsProbe {
        url: args.url.unwrap_or_else(|| config.api_base_url.clone()),
        origin: args.origin.unwrap_or_else(|| config.cors_origin.clone()),
        method: args.method,
        request_headers: args.headers,
    };

    let report = cors::probe(&client, &probe)
        .await
        .with_context(|| format!("CORS preflight to {} failed", probe.url))?;

    if json {
        return print_json(&report);
    }

    println!("OPTIONS {} -> {}", probe.url, report.status);
    if report.headers.is_empty() {
        println!("(no access-control-* headers in response)");
    } else {
        let rows = report
            .headers
            .iter()
            .map(|(k, v)| vec![k.clone(), v.clone()])
            .collect();
        print_table(&["header", "value"], rows);
    }
    println!();
    println!("origin {:<8} {}", verdict(report.origin_allowed), probe.origin);
    println!("method {:<8} {}", verdict(report.method_allowed), probe.method);
    if !report.headers_denied.is_empty() {
        println!("headers denied: {}", report.headers_denied.join(", "));
    }
    println!(
        "credentials {}",
        if report.credentials_allowed { "allowed" } else { "not allowed" }
    );
    println!(
        "=> browser would {}",
        if report.passes() { "proceed" } else { "block the request" }
    );
    Ok(())
}

fn verdict(ok: bool) -> &'static str {
    if ok {
        "allowed"
    } else {
        "DENIED"
    }
}

pub struct SaveArgs {
    pub path: String,
    pub payload: Option<String>,
    pub payload_file: Option<PathBuf>,
    pub method: String,
    pub token: Option<String>,
}

pub async fn repro_save(config: &OpsConfig, args: SaveArgs, json: bool) -> Result<()> {
    let payload = match (args.payload, args.payload_file) {
        (Some(inline), None) => inline,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read payload file {}", path.display()))?,
        (Some(_), Some(_)) => bail!("pass either --payload or --payload-file, not both"),
        (None, None) => bail!("a payload is required (--payload or --payload-file)"),
    };

    let client = build_client(config.http_timeout)?;
    let request = SaveRequest {
        url: join_url(&config.api_base_url, &args.path),
        method: args.method,
        payload,
        bearer_token: args.token,
    };

    let response = save_repro::reproduce(&client, &request)
        .await
        .with_context(|| format!("Request to {} failed", request.url))?;

    if json {
        return print_json(&serde_json::json!({
            "url": request.url,
            "status": response.status,
            "elapsed_ms": response.elapsed.as_millis() as u64,
            "content_type": response.content_type,
            "body": serde_json::from_str::<serde_json::Value>(&response.body)
                .unwrap_or(serde_json::Value::String(response.body.clone())),
        }));
    }

    println!(
        "{} {} -> {} in {} ms",
        request.method.to_ascii_uppercase(),
        request.url,
        response.status,
        response.elapsed.as_millis()
    );
    if let Some(ct) = &response.content_type {
        println!("content-type: {ct}");
    }
    println!();
    println!("{}", response.pretty_body());
    Ok(())
}

pub async fn supabase_check(
    config: &OpsConfig,
    table: &str,
    column: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    let (url, key) = config.supabase()?;
    let client = build_client(config.http_timeout)?;
    let supabase = SupabaseClient::new(client, url.to_string(), key.to_string());

    let check = supabase
        .check_table(table, column, limit)
        .await
        .with_context(|| format!("Supabase check of {table} failed"))?;

    if json {
        return print_json(&check);
    }

    println!("{}: {} rows (limit {limit})", check.table, check.rows);
    let rows = check
        .tally
        .iter()
        .map(|(value, count)| vec![value.clone(), count.to_string()])
        .collect();
    print_table(&[column, "rows"], rows);
    Ok(())
}
