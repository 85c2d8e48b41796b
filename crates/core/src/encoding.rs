//! Text re-encoding for config and data files saved by Windows editors.
//!
//! Detection order: UTF-8 BOM, UTF-16 LE/BE BOM, valid UTF-8, then
//! Windows-1252 as the catch-all (every byte sequence decodes). The
//! normalized form is UTF-8 without a BOM and with `\n` line endings.

use std::fmt;

use serde::Serialize;

use crate::CoreError;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Windows-1252 code points for bytes 0x80..=0x9F. Undefined slots keep
/// their Latin-1 (C1 control) value.
const CP1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Windows1252,
}

impl SourceEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Bom => "utf-8 (bom)",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Windows1252 => "windows-1252",
        }
    }
}

impl fmt::Display for SourceEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of normalizing one file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub encoding: SourceEncoding,
    pub text: String,
    /// Number of `\r\n` pairs folded to `\n`.
    pub crlf_fixed: usize,
    /// `false` when the input bytes were already in normalized form.
    pub changed: bool,
}

/// Decode bytes into a `String`, reporting which encoding was used.
pub fn decode(bytes: &[u8]) -> Result<(SourceEncoding, String), CoreError> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        let text = std::str::from_utf8(rest)
            .map_err(|e| CoreError::Encoding(format!("invalid UTF-8 after BOM: {e}")))?;
        return Ok((SourceEncoding::Utf8Bom, text.to_string()));
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        return Ok((SourceEncoding::Utf16Le, decode_utf16(rest, u16::from_le_bytes)?));
    }
    if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        return Ok((SourceEncoding::Utf16Be, decode_utf16(rest, u16::from_be_bytes)?));
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok((SourceEncoding::Utf8, text.to_string())),
        Err(_) => Ok((SourceEncoding::Windows1252, decode_cp1252(bytes))),
    }
}

/// Decode and normalize: UTF-8, no BOM, `\n` line endings.
pub fn normalize(bytes: &[u8]) -> Result<Normalized, CoreError> {
    let (encoding, decoded) = decode(bytes)?;
    let crlf_fixed = decoded.matches("\r\n").count();
    let text = if crlf_fixed > 0 {
        decoded.replace("\r\n", "\n")
    } else {
        decoded
    };
    let changed = text.as_bytes() != bytes;
    Ok(Normalized {
        encoding,
        text,
        crlf_fixed,
        changed,
    })
}

fn decode_utf16(bytes: &[u8], read: fn([u8; 2]) -> u16) -> Result<String, CoreError> {
    if bytes.len() % 2 != 0 {
        return Err(CoreError::Encoding(format!(
            "odd byte count ({}) in UTF-16 input",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| read([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| CoreError::Encoding(format!("invalid UTF-16: {e}")))
}

fn decode_cp1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
            _ => char::from(b),
        })
        .collect()
}
