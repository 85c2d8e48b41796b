use std::time::Duration;

/// Configuration errors. Missing values are only reported by the
/// commands that need them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Ops tool configuration loaded from environment variables (after the
/// `.env` file has been merged in).
#[derive(Debug, Clone)]
pub struct OpsConfig {
    /// `DATABASE_URL`; Postgres or SQLite.
    pub database_url: Option<String>,
    /// Base URL of the running backend API.
    pub api_base_url: String,
    /// Origin the frontend is served from.
    pub cors_origin: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub http_timeout: Duration,
}

impl OpsConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                  |
    /// |-----------------------------|--------------------------|
    /// | `DATABASE_URL`              | (db commands only)       |
    /// | `API_BASE_URL`              | `http://localhost:8000`  |
    /// | `CORS_ORIGIN`               | `http://localhost:5173`  |
    /// | `SUPABASE_URL`              | (supabase-check only)    |
    /// | `SUPABASE_KEY`              | `SUPABASE_SERVICE_ROLE_KEY` |
    /// | `HTTP_TIMEOUT_SECS`         | `30`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let http_timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "HTTP_TIMEOUT_SECS",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => 30,
        };
        if http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "HTTP_TIMEOUT_SECS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            database_url: get("DATABASE_URL"),
            api_base_url: get("API_BASE_URL").unwrap_or_else(|| "http://localhost:8000".into()),
            cors_origin: get("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:5173".into()),
            supabase_url: get("SUPABASE_URL"),
            supabase_key: get("SUPABASE_KEY").or_else(|| get("SUPABASE_SERVICE_ROLE_KEY")),
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    /// `(url, key)` for the Supabase project.
    pub fn supabase(&self) -> Result<(&str, &str), ConfigError> {
        let url = self
            .supabase_url
            .as_deref()
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let key = self
            .supabase_key
            .as_deref()
            .ok_or(ConfigError::Missing("SUPABASE_KEY"))?;
        Ok((url, key))
    }
}
