//! Minimal Supabase PostgREST reader used to eyeball one table's rows.

use std::collections::BTreeMap;

use cinerp_core::dialect::Ident;
use serde::Serialize;

use crate::{join_url, DiagnosticsError};

/// Bucket used for rows where the column is `null` or absent.
pub const NULL_BUCKET: &str = "<null>";

/// HTTP client for a single Supabase project's REST endpoint.
pub struct SupabaseClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableCheck {
    pub table: String,
    pub column: String,
    pub rows: usize,
    /// Distinct values of `column` with their row counts.
    pub tally: BTreeMap<String, usize>,
}

impl SupabaseClient {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    /// Fetch up to `limit` rows of `table`.
    ///
    /// Sends `GET /rest/v1/{table}?select={select}&limit={limit}` with the
    /// project key as both `apikey` and bearer token. `table` must be a
    /// plain identifier so it cannot reshape the path or query.
    pub async fn fetch_rows(
        &self,
        table: &str,
        select: &str,
        limit: usize,
    ) -> Result<Vec<serde_json::Value>, DiagnosticsError> {
        let table = Ident::new(table)?;
        let url = join_url(&self.base_url, &format!("/rest/v1/{table}"));
        let limit = limit.to_string();

        let response = self
            .client
            .get(url)
            .query(&[("select", select), ("limit", limit.as_str())])
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DiagnosticsError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }

    /// Fetch rows and tally the values of `column`.
    pub async fn check_table(
        &self,
        table: &str,
        column: &str,
        limit: usize,
    ) -> Result<TableCheck, DiagnosticsError> {
        tracing::info!(table, column, limit, "Querying Supabase table");
        let rows = self.fetch_rows(table, "*", limit).await?;
        let check = tally(table, column, &rows);
        tracing::info!(rows = check.rows, distinct = check.tally.len(), "Supabase table checked");
        Ok(check)
    }
}

/// Count rows per distinct value of `column`. Non-string values are
/// rendered as JSON.
pub fn tally(table: &str, column: &str, rows: &[serde_json::Value]) -> TableCheck {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        let key = match row.get(column) {
            None | Some(serde_json::Value::Null) => NULL_BUCKET.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };
        *counts.entry(key).or_default() += 1;
    }
    TableCheck {
        table: table.to_string(),
        column: column.to_string(),
        rows: rows.len(),
        tally: counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tallies_values_and_nulls() {
        let rows = vec![
            json!({"id": 1, "user_type": "crew"}),
            json!({"id": 2, "user_type": "producer"}),
            json!({"id": 3, "user_type": "crew"}),
            json!({"id": 4, "user_type": null}),
            json!({"id": 5}),
        ];
        let check = tally("users", "user_type", &rows);

        assert_eq!(check.rows, 5);
        assert_eq!(check.tally["crew"], 2);
        assert_eq!(check.tally["producer"], 1);
        assert_eq!(check.tally[NULL_BUCKET], 2);
    }

    #[test]
    fn non_string_values_use_json_text() {
        let rows = vec![json!({"is_admin": true}), json!({"is_admin": false})];
        let check = tally("users", "is_admin", &rows);
        assert_eq!(check.tally["true"], 1);
        assert_eq!(check.tally["false"], 1);
    }

    #[test]
    fn empty_table() {
        let check = tally("users", "user_type", &[]);
        assert_eq!(check.rows, 0);
        assert!(check.tally.is_empty());
    }
}
