//! Monster display-name lookup
//!
//! Template ids arrive as varints; the display name comes from an external
//! table keyed by the decimal string of the id. Tables are usually shipped as
//! JSON (`{"10001": "Goblin Scout", ...}`); they are read with the YAML parser,
//! which accepts JSON documents, after stripping a UTF-8 BOM and control
//! characters that some exporters leave behind.

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

use crate::{Result, TapError};

/// Name lookup keyed by the decimal string of a template id.
pub trait MonsterNames: Send + Sync + 'static {
    fn lookup(&self, key: &str) -> Option<&str>;
}

/// Lookup that never resolves a name.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl MonsterNames for NoNames {
    fn lookup(&self, _key: &str) -> Option<&str> {
        None
    }
}

/// In-memory name table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameTable {
    names: HashMap<String, String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `{ "<id>": "<name>" }` document (JSON or YAML).
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let cleaned = strip_control_characters(text);
        if cleaned.trim().is_empty() {
            return Err(TapError::parse("Name table", "Document is empty"));
        }

        let names: HashMap<String, String> = serde_yaml_ng::from_str(&cleaned)
            .map_err(|e| TapError::parse("Name table", format!("Deserialization failed: {}", e)))?;

        debug!("Parsed name table with {} entries", names.len());
        Ok(Self { names })
    }

    /// Load a name table from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TapError::file_error(path.to_path_buf(), e))?;
        let table = Self::from_yaml_str(&text)?;
        info!("Loaded {} monster names from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn insert(&mut self, id: impl Into<String>, name: impl Into<String>) {
        self.names.insert(id.into(), name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { names: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}

impl MonsterNames for NameTable {
    fn lookup(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }
}

/// Remove a leading BOM and control characters other than `\n`, `\r`, `\t`.
fn strip_control_characters(text: &str) -> String {
    text.trim_start_matches('\u{feff}')
        .chars()
        .filter(|ch| !matches!(ch, '\x00'..='\x08' | '\x0B'..='\x0C' | '\x0E'..='\x1F'))
        .collect()
}
