//! Snapshot Persistence
//!
//! Serializes cache entries to a human-readable JSON document and reads
//! them back. Payload bodies go through the category's registered codec.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::cache::entry::CacheEntry;
use crate::cache::payload::CodecRegistry;
use crate::error::{CacheError, Result};

/// Format version written to new snapshots.
pub const SNAPSHOT_VERSION: &str = "1.0";

// == Document Types ==
/// Top-level snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub entries: Vec<SnapshotEntry>,
}

/// One persisted entry. Every field but `key` may be absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub key: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
    #[serde(default)]
    pub payload: Option<SnapshotPayload>,
}

/// Payload type tag and, when a codec was available, its encoded body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPayload {
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// == Persistence Codec ==
/// Converts between live entries and snapshot documents.
#[derive(Debug, Clone, Copy)]
pub struct PersistenceCodec<'a> {
    codecs: &'a CodecRegistry,
}

impl<'a> PersistenceCodec<'a> {
    pub fn new(codecs: &'a CodecRegistry) -> Self {
        Self { codecs }
    }

    // == Encode ==
    /// Builds a snapshot document from live entries.
    ///
    /// Entries whose payload has no codec, or whose codec refuses it, are
    /// written with their type tag only and will be skipped on load.
    pub fn encode<'e, I>(&self, entries: I, now: DateTime<Utc>) -> SnapshotDocument
    where
        I: IntoIterator<Item = &'e CacheEntry>,
    {
        let mut encoded: Vec<SnapshotEntry> = entries
            .into_iter()
            .map(|entry| self.encode_entry(entry))
            .collect();
        encoded.sort_by(|a, b| a.key.cmp(&b.key));

        SnapshotDocument {
            version: SNAPSHOT_VERSION.to_string(),
            timestamp: Some(now),
            entries: encoded,
        }
    }

    fn encode_entry(&self, entry: &CacheEntry) -> SnapshotEntry {
        let type_tag = entry.payload.type_tag();
        let data = match self.codecs.lookup(&entry.category, type_tag) {
            Some(codec) => match codec.encode(entry.payload.as_ref()) {
                Ok(data) => Some(data),
                Err(e) => {
                    warn!("Payload of '{}' not persisted: {}", entry.key, e);
                    None
                }
            },
            None => None,
        };

        SnapshotEntry {
            key: entry.key.clone(),
            created_at: Some(entry.created_at),
            last_accessed: Some(entry.last_accessed),
            expires_at: entry.expires_at,
            access_count: entry.access_count,
            size: entry.size_bytes,
            category: Some(entry.category.clone()),
            source: entry.source.clone(),
            is_pinned: entry.is_pinned,
            metadata: entry.metadata.clone(),
            payload: Some(SnapshotPayload {
                type_tag: type_tag.to_string(),
                data,
            }),
        }
    }

    // == Decode ==
    /// Rebuilds entries from a snapshot document.
    ///
    /// Entries without an encoded payload or without a codec are skipped.
    /// A payload a codec cannot decode fails the whole document.
    pub fn decode(&self, document: SnapshotDocument, now: DateTime<Utc>) -> Result<Vec<CacheEntry>> {
        check_version(&document.version)?;

        let mut entries = Vec::with_capacity(document.entries.len());
        for snapshot in document.entries {
            if snapshot.key.is_empty() {
                return Err(CacheError::MalformedSnapshot(
                    "entry with empty key".to_string(),
                ));
            }

            let category = snapshot
                .category
                .clone()
                .or_else(|| {
                    snapshot
                        .metadata
                        .get("category")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "unknown".to_string());

            let Some(SnapshotPayload {
                type_tag,
                data: Some(data),
            }) = snapshot.payload
            else {
                warn!("Skipping '{}': snapshot holds no payload body", snapshot.key);
                continue;
            };

            let Some(codec) = self.codecs.lookup(&category, &type_tag) else {
                warn!(
                    "Skipping '{}': no codec for category '{}' or type '{}'",
                    snapshot.key, category, type_tag
                );
                continue;
            };

            let payload = codec.decode(&data).map_err(|e| {
                CacheError::MalformedSnapshot(format!("entry '{}': {}", snapshot.key, e))
            })?;

            let created_at = snapshot.created_at.unwrap_or(now);
            let last_accessed = snapshot.last_accessed.unwrap_or(created_at).max(created_at);

            entries.push(CacheEntry {
                key: snapshot.key,
                payload,
                created_at,
                last_accessed,
                expires_at: snapshot.expires_at,
                access_count: snapshot.access_count,
                size_bytes: snapshot.size,
                category,
                source: snapshot.source,
                is_pinned: snapshot.is_pinned,
                version: 0,
                metadata: snapshot.metadata,
            });
        }

        Ok(entries)
    }
}

fn check_version(version: &str) -> Result<()> {
    if version.is_empty() || version == "1" || version.starts_with("1.") {
        Ok(())
    } else {
        Err(CacheError::MalformedSnapshot(format!(
            "unsupported snapshot version '{}'",
            version
        )))
    }
}

// == File I/O ==
/// Writes a document atomically: the bytes go to a sibling temp file which
/// is then renamed over `path`.
pub fn write_document(path: &Path, document: &SnapshotDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let bytes = serde_json::to_vec_pretty(document)?;
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, bytes)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Reads and parses a document. Structural problems are reported as
/// `MalformedSnapshot`.
pub fn read_document(path: &Path) -> Result<SnapshotDocument> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| CacheError::MalformedSnapshot(e.to_string()))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "snapshot".into());
    name.push(".tmp");
    path.with_file_name(name)
}
