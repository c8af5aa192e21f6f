//! In-memory doubles for ingestion sources and processors.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};

use crate::ingest::{FileProcessor, FileSource, WriteMode};

/// A file source backed by a sorted in-memory map.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    listing_fails: Mutex<bool>,
}

impl MemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn add(&self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.files.lock().insert(path.into(), contents.into());
    }

    /// Makes every later `list_files` call fail.
    pub fn fail_listing(&self) {
        *self.listing_fails.lock() = true;
    }
}

#[async_trait]
impl FileSource for MemorySource {
    async fn list_files(&self) -> anyhow::Result<Vec<String>> {
        if *self.listing_fails.lock() {
            anyhow::bail!("source listing unavailable");
        }
        Ok(self.files.lock().keys().cloned().collect())
    }

    async fn read_file(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such file: {path}"))
    }
}

/// A processor counting one row per line and recording every call.
#[derive(Debug, Default)]
pub struct RecordingProcessor {
    calls: Mutex<Vec<(String, WriteMode)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingProcessor {
    /// Creates a processor that accepts every file.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes processing `path` fail.
    pub fn fail_on(&self, path: impl Into<String>) {
        self.failing.lock().insert(path.into());
    }

    /// Every `(path, mode)` processed, including failures, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, WriteMode)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FileProcessor for RecordingProcessor {
    async fn process(&self, path: &str, contents: &[u8], mode: WriteMode) -> anyhow::Result<u64> {
        self.calls.lock().push((path.to_string(), mode));
        if self.failing.lock().contains(path) {
            anyhow::bail!("could not parse {path}");
        }
        Ok(String::from_utf8_lossy(contents).lines().count() as u64)
    }
}
