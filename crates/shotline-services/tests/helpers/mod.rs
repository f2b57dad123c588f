#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use shotline_core::models::{PipelineEvent, Stage};
use shotline_core::PipelineEventSink;
use shotline_services::{ObjectEntry, ObjectStorage, StorageBackend, StorageError, StorageResult};
use shotline_storage::UploadOptions;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A storage call as seen by [`MemoryStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload { bucket: String, key: String },
    Copy { from_bucket: String, from_key: String, to_bucket: String, to_key: String },
    Remove { bucket: String, keys: Vec<String> },
    List { bucket: String, prefix: String },
    Sign { bucket: String, key: String },
}

/// In-memory object storage that records every call and can be told to fail.
#[derive(Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<(String, String), Bytes>>,
    calls: Mutex<Vec<Call>>,
    failing_lists: Mutex<HashSet<(String, String)>>,
    failing_removes: Mutex<HashSet<String>>,
    failing_copies: Mutex<HashSet<String>>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Place an object without recording a call.
    pub fn put(&self, bucket: &str, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), Bytes::copy_from_slice(data));
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// All keys currently stored in a bucket.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn removes(&self) -> Vec<(String, Vec<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Remove { bucket, keys } => Some((bucket, keys)),
                _ => None,
            })
            .collect()
    }

    pub fn fail_list(&self, bucket: &str, prefix: &str) {
        self.failing_lists
            .lock()
            .unwrap()
            .insert((bucket.to_string(), prefix.to_string()));
    }

    pub fn fail_remove(&self, bucket: &str) {
        self.failing_removes.lock().unwrap().insert(bucket.to_string());
    }

    pub fn fail_copy_into(&self, bucket: &str) {
        self.failing_copies.lock().unwrap().insert(bucket.to_string());
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: UploadOptions,
    ) -> StorageResult<()> {
        self.record(Call::Upload {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        let mut objects = self.objects.lock().unwrap();
        let id = (bucket.to_string(), key.to_string());
        if !options.upsert && objects.contains_key(&id) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        objects.insert(id, data);
        Ok(())
    }

    async fn copy(
        &self,
        from_bucket: &str,
        from_key: &str,
        to_bucket: &str,
        to_key: &str,
    ) -> StorageResult<()> {
        self.record(Call::Copy {
            from_bucket: from_bucket.to_string(),
            from_key: from_key.to_string(),
            to_bucket: to_bucket.to_string(),
            to_key: to_key.to_string(),
        });
        if self.failing_copies.lock().unwrap().contains(to_bucket) {
            return Err(StorageError::CopyFailed("injected copy failure".to_string()));
        }
        let mut objects = self.objects.lock().unwrap();
        let data = objects
            .get(&(from_bucket.to_string(), from_key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", from_bucket, from_key)))?;
        objects.insert((to_bucket.to_string(), to_key.to_string()), data);
        Ok(())
    }

    async fn remove(&self, bucket: &str, keys: &[String]) -> StorageResult<()> {
        self.record(Call::Remove {
            bucket: bucket.to_string(),
            keys: keys.to_vec(),
        });
        if self.failing_removes.lock().unwrap().contains(bucket) {
            return Err(StorageError::DeleteFailed("injected delete failure".to_string()));
        }
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(&(bucket.to_string(), key.clone()));
        }
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str, limit: usize) -> StorageResult<Vec<ObjectEntry>> {
        let prefix = prefix.trim_end_matches('/');
        self.record(Call::List {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        });
        if self
            .failing_lists
            .lock()
            .unwrap()
            .contains(&(bucket.to_string(), prefix.to_string()))
        {
            return Err(StorageError::ListFailed("injected list failure".to_string()));
        }

        let start = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", prefix)
        };

        let objects = self.objects.lock().unwrap();
        let mut folders = BTreeSet::new();
        let mut entries = Vec::new();
        for ((b, key), data) in objects.iter() {
            if b != bucket {
                continue;
            }
            let Some(rest) = key.strip_prefix(&start) else {
                continue;
            };
            match rest.split_once('/') {
                Some((folder, _)) => {
                    folders.insert(folder.to_string());
                }
                None => entries.push(ObjectEntry::object(rest, data.len() as u64, None)),
            }
        }

        entries.extend(folders.into_iter().map(ObjectEntry::prefix));
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries.truncate(limit);
        Ok(entries)
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://cdn.test/{}/{}", bucket, key)
    }

    async fn create_signed_upload_url(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.record(Call::Sign {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        Ok(format!(
            "https://signed.test/{}/{}?expires={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Event sink that keeps everything it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl PipelineEventSink for RecordingSink {
    async fn record(&self, event: PipelineEvent) -> Result<(), String> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Event sink that rejects every event.
pub struct FailingSink;

#[async_trait]
impl PipelineEventSink for FailingSink {
    async fn record(&self, _event: PipelineEvent) -> Result<(), String> {
        Err("event store unavailable".to_string())
    }
}

/// A generated-style key for an object created `age` before `now`.
pub fn aged_key(listing: &str, stage: Stage, age: ChronoDuration, now: DateTime<Utc>) -> String {
    let created = (now - age).timestamp_millis();
    format!("{}/{}/{}-abc123.jpg", listing, stage, created)
}
