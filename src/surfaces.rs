//! Scoped surface definition file parsing (`scopeName { key,value ... }`)
//!
//! The scoped format shares the flat format's encoding detection but the
//! charset scan stops at the first non-blank content line. Scope entries
//! keep duplicates in declaration order; keys are lower-cased.

use crate::descript::sniff_charset;
use std::path::Path;
use std::time::SystemTime;

/// One named scope and its ordered entry list.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub name: String,
    pub entries: Vec<(String, String)>,
}

/// A parsed scoped definition file. Scopes appear in file order and the
/// same scope name may occur more than once.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfacesFile {
    pub scopes: Vec<Scope>,
    modified: Option<SystemTime>,
}

impl SurfacesFile {
    pub fn load(path: &Path) -> std::io::Result<SurfacesFile> {
        let bytes = std::fs::read(path)?;
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        Ok(Self::from_bytes(&bytes, modified))
    }

    /// Parse from raw bytes (exposed for tests and in-memory sources).
    pub fn from_bytes(bytes: &[u8], modified: Option<SystemTime>) -> SurfacesFile {
        let encoding = sniff_charset(bytes, true);
        let (text, _, _) = encoding.decode(bytes);

        let mut scopes: Vec<Scope> = Vec::new();
        // Index into `scopes` while a scope body is open.
        let mut open: Option<usize> = None;
        let mut previous_line = String::new();

        for raw_line in text.lines() {
            // Comments strip to end of line, even mid-line.
            let line = match raw_line.find("//") {
                Some(pos) => &raw_line[..pos],
                None => raw_line,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line == "{" {
                // Scope named by the preceding non-blank line.
                scopes.push(Scope { name: previous_line.clone(), entries: Vec::new() });
                open = Some(scopes.len() - 1);
            } else if let Some(name) = line.strip_suffix('{') {
                // Tolerates the malformed inline form `name{`.
                scopes.push(Scope { name: name.trim().to_string(), entries: Vec::new() });
                open = Some(scopes.len() - 1);
            } else if line == "}" {
                open = None;
            } else if let Some((key, value)) = line.split_once(',') {
                // Entries outside any scope are ignored.
                if let Some(idx) = open {
                    scopes[idx]
                        .entries
                        .push((key.trim().to_lowercase(), value.trim().to_string()));
                }
            }
            // Any other line is silently ignored.

            previous_line = line.to_string();
        }

        SurfacesFile { scopes, modified }
    }

    /// Iterate scopes with the given exact name (a file may repeat one).
    pub fn scopes_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Scope> {
        self.scopes.iter().filter(move |s| s.name == name)
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}
