//! Local collaborator ports: document query store and artifact blob store.
//!
//! The federation layer never owns these; they are built at process start and
//! injected through [`crate::FederationContext`] as `Arc<dyn ...>`, so the
//! same logic runs against a production backend or the in-memory doubles.

pub mod fs;
pub mod memory;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{Map, Value};

use crate::error::StoreError;

pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryDocumentStore};

pub type Document = Map<String, Value>;

pub type Result<T> = std::result::Result<T, StoreError>;

// ── Filters ──────────────────────────────────────────────────

/// Conjunction of field predicates. Field names may be dotted paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Eq { field: String, value: Value },
    AnyOf { field: String, values: Vec<Value> },
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn any_of(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.clauses.push(Clause::AnyOf {
            field: field.into(),
            values,
        });
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|clause| match clause {
            Clause::Eq { field, value } => lookup(doc, field) == Some(value),
            Clause::AnyOf { field, values } => {
                lookup(doc, field).is_some_and(|found| values.contains(found))
            }
        })
    }
}

fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

// ── Document store ───────────────────────────────────────────

/// Company-scoped document queries. No transactions are assumed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<usize>;

    /// Set `fields` on every match; insert a document built from the filter's
    /// equality clauses plus `fields` when nothing matches.
    async fn upsert_fields(&self, collection: &str, filter: &Filter, fields: Document)
        -> Result<()>;
}

// ── Blob store ───────────────────────────────────────────────

pub type BlobStream = BoxStream<'static, std::io::Result<Vec<u8>>>;

/// An open artifact, ready to be streamed.
pub struct Blob {
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub stream: BlobStream,
}

/// Content-addressable artifact storage (photos, embeddings).
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, handle: &str, content_type: Option<&str>, bytes: Vec<u8>) -> Result<()>;

    async fn open(&self, handle: &str) -> Result<Option<Blob>>;
}

/// Buffer a whole artifact in memory, refusing anything over `limit` bytes.
///
/// Only for flows that must embed the bytes inline; everything else streams.
pub async fn read_to_end(
    blobs: &dyn BlobStore,
    handle: &str,
    limit: usize,
) -> Result<Option<(Option<String>, Vec<u8>)>> {
    let Some(blob) = blobs.open(handle).await? else {
        return Ok(None);
    };
    if blob.size.is_some_and(|size| size > limit as u64) {
        return Err(StoreError::TooLarge {
            handle: handle.to_string(),
            limit,
        });
    }

    let mut buffer = Vec::new();
    let mut stream = blob.stream;
    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);
        if buffer.len() > limit {
            return Err(StoreError::TooLarge {
                handle: handle.to_string(),
                limit,
            });
        }
    }
    Ok(Some((blob.content_type, buffer)))
}

/// Handles are single path segments: no separators, no leading dot.
pub fn validate_handle(handle: &str) -> Result<()> {
    let valid = !handle.is_empty()
        && handle.len() <= 200
        && !handle.starts_with('.')
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidHandle(handle.to_string()))
    }
}
