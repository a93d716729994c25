//! Narrow seams over the document store and the object store.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;

use super::models::Book;

/// Point lookups, full scans and whole-record writes keyed by book id.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn load(&self, id: i32) -> anyhow::Result<Option<Book>>;

    /// Every stored book, in store order.
    async fn scan(&self) -> anyhow::Result<Vec<Book>>;

    /// Insert or fully replace the record with `book.id`.
    async fn save(&self, book: &Book) -> anyhow::Result<()>;

    async fn delete(&self, id: i32) -> anyhow::Result<()>;
}

/// Result of a put that reached the object store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored,
    /// The store answered with a non-success HTTP status.
    Rejected { status: u16 },
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> anyhow::Result<bool>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> anyhow::Result<PutOutcome>;

    /// Keys starting with `prefix`, in listing order.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> anyhow::Result<Vec<String>>;

    /// A GET URL for `key` that needs no further credentials.
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> anyhow::Result<String>;
}
