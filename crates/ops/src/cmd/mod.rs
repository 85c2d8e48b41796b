pub mod env_dump;
pub mod fix_encoding;
pub mod probes;
pub mod schema;
