#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid identifier {0:?}: expected [A-Za-z_][A-Za-z0-9_]* of at most 63 bytes")]
    InvalidIdentifier(String),

    #[error("Unknown schema patch: {0}")]
    UnknownPatch(String),

    #[error("Unsupported database URL scheme: {0}")]
    UnsupportedDatabase(String),

    #[error("Invalid default literal for {column}: {reason}")]
    InvalidDefault { column: String, reason: String },

    #[error("Encoding error: {0}")]
    Encoding(String),
}
