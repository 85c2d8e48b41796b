//! Masking rules for dumping environment values to a terminal.

use serde::Serialize;
use url::Url;

/// Variables the backend reads at startup; reported as missing when unset.
pub const EXPECTED_KEYS: &[&str] = &[
    "DATABASE_URL",
    "API_BASE_URL",
    "CORS_ORIGIN",
    "SUPABASE_URL",
    "SUPABASE_KEY",
    "JWT_SECRET",
];

/// Key fragments that mark a value as secret.
const SECRET_MARKERS: &[&str] = &["SECRET", "PASSWORD", "PASSWD", "TOKEN", "KEY", "PRIVATE"];

/// Keys holding a database connection string, URL or keyword DSN.
const CONNECTION_MARKERS: &[&str] = &["DATABASE_URL", "DB_URL", "DSN"];

/// Replacement for hidden values.
const MASK: &str = "***";

/// Characters of a secret kept visible so two values can be told apart.
const VISIBLE_PREFIX: usize = 4;

/// The prefix is only shown when at least this many characters stay hidden.
const MIN_HIDDEN: usize = 3 * VISIBLE_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
    pub masked: bool,
}

pub fn is_secret_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SECRET_MARKERS.iter().any(|m| upper.contains(m))
}

pub fn is_connection_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    CONNECTION_MARKERS.iter().any(|m| upper.contains(m))
}

/// Hide the password and secret-looking query parameters of a URL.
///
/// Returns `None` when `value` is not a URL or has nothing to hide.
pub fn redact_url(value: &str) -> Option<String> {
    let mut url = Url::parse(value).ok()?;
    let mut redacted = false;

    if url.password().is_some() {
        url.set_password(Some(MASK)).ok()?;
        redacted = true;
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if pairs.iter().any(|(k, _)| is_secret_key(k)) {
        url.query_pairs_mut().clear().extend_pairs(pairs.iter().map(|(k, v)| {
            if is_secret_key(k) {
                (k.as_str(), MASK)
            } else {
                (k.as_str(), v.as_str())
            }
        }));
        redacted = true;
    }

    redacted.then(|| url.into())
}

/// Secret values show their first few characters only when they are long
/// enough that most of the value stays hidden.
pub fn mask_secret(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let count = value.chars().count();
    if count < VISIBLE_PREFIX + MIN_HIDDEN {
        return MASK.into();
    }
    let prefix: String = value.chars().take(VISIBLE_PREFIX).collect();
    format!("{prefix}{MASK} ({count} chars)")
}

/// Build a display entry, masking unless `reveal` is set.
pub fn entry(key: &str, value: &str, reveal: bool) -> EnvEntry {
    if reveal {
        return EnvEntry {
            key: key.to_string(),
            value: value.to_string(),
            masked: false,
        };
    }
    let (value, masked) = if is_secret_key(key) {
        (mask_secret(value), true)
    } else if let Some(redacted) = redact_url(value) {
        (redacted, true)
    } else if is_connection_key(key) && !value.is_empty() && Url::parse(value).is_err() {
        // Keyword DSN such as `host=db user=erp password=...`.
        (mask_secret(value), true)
    } else {
        (value.to_string(), false)
    };
    EnvEntry {
        key: key.to_string(),
        value,
        masked,
    }
}

/// Expected keys absent from `present`.
pub fn missing_keys<'a>(present: impl IntoIterator<Item = &'a str>) -> Vec<&'static str> {
    let present: Vec<&str> = present.into_iter().collect();
    EXPECTED_KEYS
        .iter()
        .copied()
        .filter(|k| !present.contains(k))
        .collect()
}
