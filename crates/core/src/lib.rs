//! Pure building blocks for the cinerp schema-patching and diagnostics tools.
//!
//! Nothing in this crate touches the network, the database, or the
//! filesystem. The `cinerp-db`, `cinerp-diagnostics` and `cinerp-ops`
//! crates do the I/O on top of these types.

pub mod backfill;
pub mod catalog;
pub mod dialect;
pub mod encoding;
pub mod env_file;
pub mod error;
pub mod schema_patch;

pub use error::CoreError;
