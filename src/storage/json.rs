//! JSON document storage implementation
//!
//! Each spider gets a directory under the state root holding three
//! pretty-printed JSON documents. Writes go to a temporary file in the same
//! directory which is then renamed over the target.

use crate::state::{CrawlState, ListingGroups, ScrapedRecord};
use crate::storage::traits::{StateStore, StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Document holding listing URL -> discovered content URLs
pub const LISTING_GROUPS_FILE: &str = "listing_group_content_urls.json";

/// Document holding the scraped content URL set
pub const SCRAPED_URLS_FILE: &str = "scraped_content_urls.json";

/// Document holding accumulated records
pub const RECORDS_FILE: &str = "scraped_data.json";

/// File-backed state store
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    root: PathBuf,
}

impl JsonStateStore {
    /// Creates a store rooted at `root`
    ///
    /// Nothing is created on disk until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory holding one subdirectory per spider
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a spider's documents
    pub fn spider_dir(&self, spider_name: &str) -> PathBuf {
        self.root.join(spider_name)
    }

    fn document_path(&self, spider_name: &str, file: &str) -> PathBuf {
        self.spider_dir(spider_name).join(file)
    }

    fn write_document<T: Serialize>(
        &self,
        spider_name: &str,
        file: &str,
        value: &T,
    ) -> StorageResult<()> {
        let dir = self.spider_dir(spider_name);
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;

        let path = dir.join(file);
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StorageError::io(&dir, e))?;
        serde_json::to_writer_pretty(&mut tmp, value)?;
        tmp.write_all(b"\n")
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| StorageError::io(tmp.path(), e))?;
        tmp.persist(&path)
            .map_err(|e| StorageError::io(&path, e.error))?;

        tracing::trace!("Wrote {}", path.display());
        Ok(())
    }
}

/// Reads a JSON document, treating a missing file as the default value
fn read_document<T: DeserializeOwned + Default>(path: &Path) -> StorageResult<T> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(StorageError::io(path, e)),
    };

    serde_json::from_str(&text).map_err(|source| StorageError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

/// On-disk groups missing from memory are kept; in-memory groups win
fn merge_listing_groups(on_disk: ListingGroups, in_memory: &ListingGroups) -> ListingGroups {
    let mut merged = on_disk;
    for (listing_url, content_urls) in in_memory {
        merged.insert(listing_url.clone(), content_urls.clone());
    }
    merged
}

fn merge_records(on_disk: Vec<ScrapedRecord>, in_memory: &[ScrapedRecord]) -> Vec<ScrapedRecord> {
    let known: HashSet<ScrapedRecord> = on_disk.iter().cloned().collect();
    let mut merged = on_disk;
    let mut added = HashSet::new();

    for record in in_memory {
        if !known.contains(record) && added.insert(record) {
            merged.push(record.clone());
        }
    }
    merged
}

impl StateStore for JsonStateStore {
    fn load(&self, spider_name: &str) -> StorageResult<CrawlState> {
        let listing_groups =
            read_document(&self.document_path(spider_name, LISTING_GROUPS_FILE))?;
        let scraped_urls = read_document(&self.document_path(spider_name, SCRAPED_URLS_FILE))?;
        let records = read_document(&self.document_path(spider_name, RECORDS_FILE))?;

        Ok(CrawlState {
            spider_name: spider_name.to_string(),
            listing_groups,
            scraped_urls,
            records,
        })
    }

    fn persist_listing_groups(&self, state: &CrawlState) -> StorageResult<()> {
        let path = self.document_path(&state.spider_name, LISTING_GROUPS_FILE);
        let merged = merge_listing_groups(read_document(&path)?, &state.listing_groups);
        self.write_document(&state.spider_name, LISTING_GROUPS_FILE, &merged)
    }

    fn persist_scraped_urls(&self, state: &CrawlState) -> StorageResult<()> {
        let path = self.document_path(&state.spider_name, SCRAPED_URLS_FILE);
        let mut merged: BTreeSet<String> = read_document(&path)?;
        merged.extend(state.scraped_urls.iter().cloned());
        self.write_document(&state.spider_name, SCRAPED_URLS_FILE, &merged)
    }

    fn persist_records(&self, state: &CrawlState) -> StorageResult<()> {
        let path = self.document_path(&state.spider_name, RECORDS_FILE);
        let merged = merge_records(read_document(&path)?, &state.records);
        self.write_document(&state.spider_name, RECORDS_FILE, &merged)
    }

    fn clear_listing_groups(&self, spider_name: &str) -> StorageResult<()> {
        let path = self.document_path(spider_name, LISTING_GROUPS_FILE);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("Cleared listing groups for spider '{}'", spider_name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}
