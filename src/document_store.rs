//! The document store: the authoritative in-memory text for every file the
//! client has open. Trimmed to exactly the state the core needs — no
//! stdlib/workspace symbol indexing, no background analysis thread.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lsp_types::{Range, Url};

use crate::error::{Result, ServerError};
use crate::position::apply_range_replace;

/// Strips `base_path` from `path` when it is a prefix; the stripped form is
/// the key into the document store and the compile driver. Falls back to
/// the absolute path, verbatim, when there's no base path or it isn't a
/// prefix.
pub fn normalize_path(path: &Path, base_path: Option<&Path>) -> String {
    if let Some(base) = base_path {
        if let Ok(stripped) = path.strip_prefix(base) {
            return stripped.to_string_lossy().into_owned();
        }
    }
    path.to_string_lossy().into_owned()
}

/// The inverse of [`normalize_path`]: rejoins a stored key with `base_path`
/// when the key is relative, so it can be turned back into a `file://` uri.
pub fn denormalize_path(path: &str, base_path: Option<&Path>) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        return candidate.to_path_buf();
    }
    match base_path {
        Some(base) => base.join(candidate),
        None => candidate.to_path_buf(),
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub uri: Url,
    pub version: i32,
    pub text: String,
}

#[derive(Default)]
pub struct DocumentStore {
    documents: HashMap<Url, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uri: &Url) -> Result<&Document> {
        self.documents
            .get(uri)
            .ok_or_else(|| ServerError::DocumentNotFound(uri.to_string()))
    }

    pub fn is_open(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }

    pub fn open(&mut self, uri: Url, version: i32, text: String) {
        self.documents.insert(uri.clone(), Document { uri, version, text });
    }

    pub fn close(&mut self, uri: &Url) {
        self.documents.remove(uri);
    }

    /// Replaces a document's full text (a `textDocumentSync` full-content
    /// change with no `range`).
    pub fn full_update(&mut self, uri: &Url, version: i32, text: String) -> Result<()> {
        let doc = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| ServerError::DocumentNotFound(uri.to_string()))?;
        doc.version = version;
        doc.text = text;
        Ok(())
    }

    /// Splices one incremental change into a document's current text.
    pub fn range_update(&mut self, uri: &Url, version: i32, range: Range, replacement: &str) -> Result<()> {
        let doc = self
            .documents
            .get_mut(uri)
            .ok_or_else(|| ServerError::DocumentNotFound(uri.to_string()))?;
        doc.text = apply_range_replace(&doc.text, range, replacement)?;
        doc.version = version;
        Ok(())
    }

    /// A snapshot of every open document's path/text, the shape the compile
    /// driver hands the frontend. Keys are normalized against `base_path`.
    pub fn snapshot(&self, base_path: Option<&Path>) -> HashMap<String, String> {
        self.documents
            .values()
            .filter_map(|doc| {
                let path = doc.uri.to_file_path().ok()?;
                Some((normalize_path(&path, base_path), doc.text.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;

    fn uri() -> Url {
        Url::parse("file:///a.src").unwrap()
    }

    #[test]
    fn open_then_get_round_trips_text() {
        let mut store = DocumentStore::new();
        store.open(uri(), 1, "contract Foo {}".to_string());
        assert_eq!(store.get(&uri()).unwrap().text, "contract Foo {}");
    }

    #[test]
    fn full_update_replaces_text_and_bumps_version() {
        let mut store = DocumentStore::new();
        store.open(uri(), 1, "old".to_string());
        store.full_update(&uri(), 2, "new".to_string()).unwrap();
        let doc = store.get(&uri()).unwrap();
        assert_eq!(doc.text, "new");
        assert_eq!(doc.version, 2);
    }

    #[test]
    fn range_update_splices_into_existing_text() {
        let mut store = DocumentStore::new();
        store.open(uri(), 1, "the quick fox".to_string());
        let range = Range {
            start: Position { line: 0, character: 4 },
            end: Position { line: 0, character: 9 },
        };
        store.range_update(&uri(), 2, range, "slow").unwrap();
        assert_eq!(store.get(&uri()).unwrap().text, "the slow fox");
    }

    #[test]
    fn close_removes_the_document() {
        let mut store = DocumentStore::new();
        store.open(uri(), 1, "x".to_string());
        store.close(&uri());
        assert!(store.get(&uri()).is_err());
    }

    #[test]
    fn update_on_unopened_document_is_an_error() {
        let mut store = DocumentStore::new();
        assert!(store
            .full_update(&uri(), 1, "x".to_string())
            .is_err());
    }
}
