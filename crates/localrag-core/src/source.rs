use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::traits::DocumentSource;

/// Reads `.txt` files from a directory tree (sorted by path) or a single file.
#[derive(Debug, Clone)]
pub struct TextDirSource {
    extension: String,
    limit: Option<usize>,
}

impl Default for TextDirSource {
    fn default() -> Self {
        Self { extension: "txt".to_string(), limit: None }
    }
}

impl TextDirSource {
    pub fn new() -> Self { Self::default() }

    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.extension = ext.into();
        self
    }

    /// Only read the first `limit` files.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Matching files under `root`, sorted. Symlinks are followed; any entry
    /// the walk cannot read fails the whole listing.
    pub fn list_files(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).follow_links(true) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).display().to_string();
                Error::SourceNotFound(format!("cannot read {path}: {e}"))
            })?;
            if entry.file_type().is_file() && entry.path().extension().and_then(|s| s.to_str()) == Some(self.extension.as_str()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        if let Some(limit) = self.limit { files.truncate(limit); }
        Ok(files)
    }

    fn read_file_content(file_path: &Path) -> Result<String> {
        let bytes = fs::read(file_path)
            .map_err(|e| Error::SourceNotFound(format!("cannot read {}: {e}", file_path.display())))?;
        match String::from_utf8(bytes) {
            Ok(content) => Ok(content),
            Err(e) => {
                warn!(path = %file_path.display(), "file is not valid UTF-8, decoding lossily");
                Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
            }
        }
    }
}

impl DocumentSource for TextDirSource {
    fn load(&self, location: &Path) -> Result<Vec<String>> {
        if !location.exists() {
            return Err(Error::SourceNotFound(format!("document source {} does not exist", location.display())));
        }
        let files = if location.is_file() { vec![location.to_path_buf()] } else { self.list_files(location)? };
        let mut texts = Vec::with_capacity(files.len());
        for (i, file_path) in files.iter().enumerate() {
            debug!("Reading file {}/{}: {}", i + 1, files.len(), file_path.display());
            texts.push(Self::read_file_content(file_path)?);
        }
        info!(files = texts.len(), root = %location.display(), "loaded documents");
        Ok(texts)
    }
}
