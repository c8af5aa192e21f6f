//! Where ingestion reads from and how it writes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::path::{Path, PathBuf};

/// How a processed file is written to the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Add rows to the existing table.
    #[default]
    Append,
    /// Replace the table contents.
    Overwrite,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append => write!(f, "append"),
            Self::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Lists and reads raw input files.
#[async_trait]
pub trait FileSource: Send + Sync + Debug {
    /// Returns every candidate file, in processing order.
    async fn list_files(&self) -> anyhow::Result<Vec<String>>;

    /// Reads one file.
    async fn read_file(&self, path: &str) -> anyhow::Result<Vec<u8>>;
}

/// Parses a raw file and writes it to the target table.
#[async_trait]
pub trait FileProcessor: Send + Sync + Debug {
    /// Processes `contents` of `path`, returning the number of rows written.
    async fn process(&self, path: &str, contents: &[u8], mode: WriteMode) -> anyhow::Result<u64>;
}

/// Regular files of a local directory, sorted by path.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    root: PathBuf,
    extension: Option<String>,
}

impl LocalDirSource {
    /// Lists every regular file directly under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: None,
        }
    }

    /// Only lists files with this extension (without the dot).
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accepts(&self, path: &Path) -> bool {
        self.extension.as_deref().map_or(true, |wanted| {
            path.extension().and_then(|e| e.to_str()) == Some(wanted)
        })
    }
}

#[async_trait]
impl FileSource for LocalDirSource {
    async fn list_files(&self) -> anyhow::Result<Vec<String>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && self.accepts(&path) {
                files.push(path.to_string_lossy().into_owned());
            }
        }
        files.sort();
        Ok(files)
    }

    async fn read_file(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        Ok(tokio::fs::read(path).await?)
    }
}
