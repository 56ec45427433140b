//! Flat description table parsing (`key , value` lines)
//!
//! Description files are legacy 8-bit text by default; a `charset` entry
//! near the top can switch the encoding for the whole file. Parsing is
//! lenient: malformed lines are skipped, never fatal.

use encoding_rs::{Encoding, SHIFT_JIS};
use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

/// An immutable key/value table loaded from a flat description file.
/// Later duplicate keys overwrite earlier ones; key case is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptTable {
    entries: HashMap<String, String>,
    modified: Option<SystemTime>,
}

impl DescriptTable {
    /// Load a flat description file from disk. Unreadable files are the
    /// caller's concern; malformed content is not.
    pub fn load(path: &Path) -> std::io::Result<DescriptTable> {
        let bytes = std::fs::read(path)?;
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        Ok(Self::from_bytes(&bytes, modified))
    }

    /// Parse from raw bytes (exposed for tests and in-memory sources).
    pub fn from_bytes(bytes: &[u8], modified: Option<SystemTime>) -> DescriptTable {
        let encoding = sniff_charset(bytes, false);
        let (text, _, _) = encoding.decode(bytes);

        let mut entries = HashMap::new();
        for line in text.lines() {
            if let Some((key, value)) = line.split_once(',') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                entries.insert(key.to_string(), value.trim().to_string());
            }
        }
        DescriptTable { entries, modified }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|v| v.as_str())
    }

    /// Look up a key and interpret "1" as true.
    pub fn get_flag(&self, key: &str) -> bool {
        self.get(key) == Some("1")
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// Determine the file encoding by scanning raw bytes under the legacy
/// default (Shift_JIS) line by line.
///
/// A `charset , <name>` line switches the encoding and stops the scan.
/// When `stop_at_content` is set (scoped definition files), the scan also
/// stops at the first non-blank line, keeping the default.
pub(crate) fn sniff_charset(bytes: &[u8], stop_at_content: bool) -> &'static Encoding {
    for raw_line in bytes.split(|&b| b == b'\n') {
        let (line, _, _) = SHIFT_JIS.decode(raw_line);
        let line = line.trim_end_matches('\r').trim();
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(',') {
            if key.trim().eq_ignore_ascii_case("charset") {
                if let Some(encoding) = Encoding::for_label(value.trim().as_bytes()) {
                    return encoding;
                }
                return SHIFT_JIS;
            }
        }
        if stop_at_content {
            return SHIFT_JIS;
        }
    }
    SHIFT_JIS
}
