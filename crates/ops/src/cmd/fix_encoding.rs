//! `fix-encoding`: rewrite files as BOM-less UTF-8 with `\n` line endings.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cinerp_core::encoding::{self, SourceEncoding};
use serde::Serialize;

use crate::output::{print_json, print_table};

#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: PathBuf,
    pub encoding: SourceEncoding,
    pub crlf_fixed: usize,
    pub changed: bool,
    pub written: bool,
}

/// Normalize one file. With `check` nothing is written.
pub fn fix_file(path: &Path, check: bool) -> Result<FileResult> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let normalized = encoding::normalize(&bytes)
        .with_context(|| format!("Failed to decode {}", path.display()))?;

    let written = normalized.changed && !check;
    if written {
        replace_contents(path, normalized.text.as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(path = %path.display(), from = %normalized.encoding, "Rewritten as UTF-8");
    } else if normalized.changed {
        tracing::info!(path = %path.display(), from = %normalized.encoding, "Needs re-encoding");
    } else {
        tracing::debug!(path = %path.display(), "Already normalized");
    }

    Ok(FileResult {
        path: path.to_path_buf(),
        encoding: normalized.encoding,
        crlf_fixed: normalized.crlf_fixed,
        changed: normalized.changed,
        written,
    })
}

/// Write `contents` to a temp file next to `path`, then rename it over
/// `path`. An interrupted run leaves the original untouched.
fn replace_contents(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = fs::metadata(path)?.permissions();

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.as_file().set_permissions(permissions)?;
    tmp.persist(path)?;
    Ok(())
}

pub fn run(files: &[PathBuf], check: bool, json: bool) -> Result<()> {
    let results = files
        .iter()
        .map(|f| fix_file(f, check))
        .collect::<Result<Vec<_>>>()?;

    if json {
        return print_json(&results);
    }

    let rows = results
        .iter()
        .map(|r| {
            let action = match (r.changed, r.written) {
                (false, _) => "ok",
                (true, true) => "rewritten",
                (true, false) => "needs fix",
            };
            vec![
                r.path.display().to_string(),
                r.encoding.to_string(),
                r.crlf_fixed.to_string(),
                action.to_string(),
            ]
        })
        .collect();
    print_table(&["file", "detected", "crlf", "action"], rows);
    Ok(())
}
