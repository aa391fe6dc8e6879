//! File-backed store: every record lives in one JSON document.
//!
//! Each call takes the file lock, reloads the document, applies its change
//! and writes it back atomically, so two desktops sharing a network drive
//! never interleave writes or hand out the same document number.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{format_document_number, NcrStore, StoreResult};
use crate::errors::NcrResult;
use crate::file_io::{read_json, validate_version, write_json_atomic, FileLock};
use crate::records::{NcrRecord, ReturnRecord};

/// Current schema version of the store file
pub const STORE_SCHEMA_VERSION: &str = "0.1.0";

/// On-disk layout of the store file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub version: String,
    /// Last sequence handed out, per calendar year
    #[serde(default)]
    pub sequences: BTreeMap<i32, u32>,
    #[serde(default)]
    pub ncr_records: Vec<NcrRecord>,
    #[serde(default)]
    pub return_records: Vec<ReturnRecord>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        StoreDocument {
            version: STORE_SCHEMA_VERSION.to_string(),
            sequences: BTreeMap::new(),
            ncr_records: Vec::new(),
            return_records: Vec::new(),
        }
    }
}

/// Store backed by a single locked JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    user_id: String,
}

impl JsonFileStore {
    /// Use `path` as the store file; it is created on first write.
    pub fn new(path: impl Into<PathBuf>, user_id: impl Into<String>) -> Self {
        JsonFileStore {
            path: path.into(),
            user_id: user_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, or an empty one when the file does not exist yet
    pub fn load(&self) -> NcrResult<StoreDocument> {
        if !self.path.exists() {
            return Ok(StoreDocument::default());
        }
        let doc: StoreDocument = read_json(&self.path)?;
        validate_version(&doc.version, STORE_SCHEMA_VERSION)?;
        Ok(doc)
    }

    /// Run `change` on the document under the file lock and save the result
    fn update<T>(&self, change: impl FnOnce(&mut StoreDocument) -> T) -> NcrResult<T> {
        let _lock = FileLock::acquire(&self.path, self.user_id.clone())?;
        let mut doc = self.load()?;
        let out = change(&mut doc);
        write_json_atomic(&doc, &self.path)?;
        Ok(out)
    }
}

#[async_trait(?Send)]
impl NcrStore for JsonFileStore {
    async fn next_document_number(&self) -> StoreResult<String> {
        let year = Utc::now().year();
        let number = self.update(|doc| {
            let seq = doc.sequences.entry(year).or_insert(0);
            *seq += 1;
            format_document_number(year, *seq)
        })?;
        tracing::debug!(%number, path = %self.path.display(), "allocated document number");
        Ok(number)
    }

    async fn add_ncr_record(&self, record: &NcrRecord) -> StoreResult<()> {
        self.update(|doc| doc.ncr_records.push(record.clone()))?;
        Ok(())
    }

    async fn add_return_record(&self, record: &ReturnRecord) -> StoreResult<()> {
        self.update(|doc| doc.return_records.push(record.clone()))?;
        Ok(())
    }

    async fn ncr_records(&self) -> StoreResult<Vec<NcrRecord>> {
        Ok(self.load()?.ncr_records)
    }
}
