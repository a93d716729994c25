//! In-process stores for running without AWS and for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::sync::RwLock;

use super::models::Book;
use super::store::{BookStore, ImageStore, PutOutcome};

#[derive(Default)]
pub struct MemoryBookStore {
    books: RwLock<BTreeMap<i32, Book>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn load(&self, id: i32) -> anyhow::Result<Option<Book>> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn scan(&self) -> anyhow::Result<Vec<Book>> {
        Ok(self.books.read().await.values().cloned().collect())
    }

    async fn save(&self, book: &Book) -> anyhow::Result<()> {
        self.books.write().await.insert(book.id, book.clone());
        Ok(())
    }

    async fn delete(&self, id: i32) -> anyhow::Result<()> {
        self.books.write().await.remove(&id);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub content_type: String,
    pub body: Bytes,
}

/// Object store keyed by `(bucket, key)`. Listing follows key order, as S3 does.
#[derive(Default)]
pub struct MemoryImageStore {
    buckets: RwLock<BTreeSet<String>>,
    objects: RwLock<BTreeMap<(String, String), StoredObject>>,
    calls: AtomicUsize,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            buckets: RwLock::new(BTreeSet::from([bucket.into()])),
            ..Self::default()
        }
    }

    /// Number of store operations served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn bucket_exists(&self, bucket: &str) -> anyhow::Result<bool> {
        self.record_call();
        Ok(self.buckets.read().await.contains(bucket))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> anyhow::Result<PutOutcome> {
        self.record_call();
        if !self.buckets.read().await.contains(bucket) {
            return Ok(PutOutcome::Rejected { status: 404 });
        }

        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                content_type: content_type.to_string(),
                body,
            },
        );
        Ok(PutOutcome::Stored)
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<String>> {
        self.record_call();
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, key)| b == bucket && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> anyhow::Result<String> {
        self.record_call();
        Ok(format!(
            "memory://{}/{}?expires_in={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}
