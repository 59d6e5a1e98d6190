use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Answers whether an item has already been read.
///
/// The normalizer asks exactly once per entry and blocks on the answer.
/// Implementations own their persistence and any latency bound.
pub trait ReadState {
    fn is_read(&self, id: &str) -> bool;
}

/// Reports every item as unread.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverRead;

impl ReadState for NeverRead {
    fn is_read(&self, _id: &str) -> bool {
        false
    }
}

impl ReadState for HashSet<String> {
    fn is_read(&self, id: &str) -> bool {
        self.contains(id)
    }
}

impl<F> ReadState for F
where
    F: Fn(&str) -> bool,
{
    fn is_read(&self, id: &str) -> bool {
        self(id)
    }
}

#[derive(Debug, Error)]
pub enum ReadStateError {
    #[error("Failed to read state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read IDs loaded from a newline-delimited file.
///
/// Blank lines and lines starting with `#` are ignored; surrounding
/// whitespace on each line is trimmed.
#[derive(Debug, Clone, Default)]
pub struct ReadStateFile {
    ids: HashSet<String>,
}

impl ReadStateFile {
    /// Loads the file at `path`. A missing file means nothing has been read.
    pub fn load(path: &Path) -> Result<Self, ReadStateError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No read-state file found, treating all items as unread");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ReadStateError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let state = Self::from_lines(&content);
        tracing::debug!(path = %path.display(), ids = state.len(), "Loaded read state");
        Ok(state)
    }

    pub fn from_lines(content: &str) -> Self {
        let ids = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_owned)
            .collect();
        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl ReadState for ReadStateFile {
    fn is_read(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}
