use std::path::Path;

use anyhow::Context;

use crate::error::{IngestError, Result};

pub const ACCEPTED_EXTENSION: &str = "xml";
pub const MAX_DOCUMENT_BYTES: u64 = 50 * 1024 * 1024;

/// An uploaded document as handed over by the upload boundary.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub size_bytes: u64,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            bytes,
        }
    }

    /// Loads a document from disk, checking name and size before the
    /// content is read.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("invalid file name: {}", path.display()))?
            .to_string();
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?;

        validate(&Self {
            name: name.clone(),
            size_bytes: metadata.len(),
            bytes: Vec::new(),
        })?;

        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::new(name, bytes))
    }

    /// Lower-cased extension, used as the stored file type.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }

    pub fn text(&self) -> Result<&str> {
        std::str::from_utf8(&self.bytes)
            .map_err(|e| IngestError::MalformedDocument(format!("document is not UTF-8: {e}")))
    }
}

/// Checks name and size only; content problems are left to extraction.
pub fn validate(document: &Document) -> Result<()> {
    let suffix = format!(".{ACCEPTED_EXTENSION}");
    if !document.name.ends_with(&suffix) {
        return Err(IngestError::InvalidExtension {
            filename: document.name.clone(),
            expected: ACCEPTED_EXTENSION,
        });
    }

    if document.size_bytes > MAX_DOCUMENT_BYTES {
        return Err(IngestError::OversizedDocument {
            size_bytes: document.size_bytes,
            limit_bytes: MAX_DOCUMENT_BYTES,
        });
    }

    Ok(())
}
