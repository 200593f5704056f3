//! In-memory document and blob stores.
//!
//! Used by tests and by the standalone server when no production backend is
//! wired in. Documents are plain JSON objects keyed by collection name.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Blob, BlobStore, Clause, Document, DocumentStore, Filter, Result};

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON object of `{ "collection": [ {...}, ... ] }`.
    pub fn from_json(value: Value) -> Result<Self> {
        let collections: HashMap<String, Vec<Document>> = serde_json::from_value(value)?;
        Ok(Self {
            collections: RwLock::new(collections),
        })
    }

    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read(path).await?;
        Self::from_json(serde_json::from_slice(&raw)?)
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<usize> {
        let count = docs.len();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
        Ok(count)
    }

    async fn upsert_fields(
        &self,
        collection: &str,
        filter: &Filter,
        fields: Document,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        let mut matched = false;
        for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
            matched = true;
            doc.extend(fields.clone());
        }

        if !matched {
            let mut doc: Document = filter
                .clauses()
                .iter()
                .filter_map(|clause| match clause {
                    Clause::Eq { field, value } => Some((field.clone(), value.clone())),
                    Clause::AnyOf { .. } => None,
                })
                .collect();
            doc.extend(fields);
            docs.push(doc);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, (Option<String>, Vec<u8>)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, handle: &str, content_type: Option<&str>, bytes: Vec<u8>) -> Result<()> {
        super::validate_handle(handle)?;
        self.blobs.write().await.insert(
            handle.to_string(),
            (content_type.map(str::to_string), bytes),
        );
        Ok(())
    }

    async fn open(&self, handle: &str) -> Result<Option<Blob>> {
        super::validate_handle(handle)?;
        let blobs = self.blobs.read().await;
        Ok(blobs.get(handle).map(|(content_type, bytes)| Blob {
            content_type: content_type.clone(),
            size: Some(bytes.len() as u64),
            stream: Box::pin(futures::stream::once(futures::future::ready(Ok(
                bytes.clone()
            )))),
        }))
    }
}
