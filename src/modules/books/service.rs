use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use bookshelf_http::AppError;
use serde_json::json;

use super::models::{Book, ImageLink};
use super::store::{BookStore, ImageStore, PutOutcome};

/// Requested lifetime of the download links returned by an upload.
pub const PRESIGNED_URL_LIFETIME: Duration = Duration::from_secs(365 * 24 * 60 * 60);

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// CRUD over books.
///
/// Every write first looks the id up and then acts on the answer. The two
/// calls are separate round-trips, so concurrent writers to one id can race.
#[derive(Clone)]
pub struct BookCatalog {
    store: Arc<dyn BookStore>,
}

impl BookCatalog {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: i32) -> Result<Book, AppError> {
        self.store
            .load(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn list(&self) -> Result<Vec<Book>, AppError> {
        Ok(self.store.scan().await?)
    }

    pub async fn create(&self, book: Book) -> Result<Book, AppError> {
        if self.store.load(book.id).await?.is_some() {
            return Err(AppError::conflict(
                vec![json!({ "id": book.id })],
                format!("Book with Id {} Already Exists", book.id),
            ));
        }

        self.store.save(&book).await?;
        tracing::info!(id = book.id, "book created");
        Ok(book)
    }

    /// Replace the whole record; fields missing from `book` are cleared.
    pub async fn update(&self, book: Book) -> Result<Book, AppError> {
        if self.store.load(book.id).await?.is_none() {
            return Err(not_found(book.id));
        }

        self.store.save(&book).await?;
        tracing::info!(id = book.id, "book updated");
        Ok(book)
    }

    pub async fn delete(&self, id: i32) -> Result<(), AppError> {
        if self.store.load(id).await?.is_none() {
            return Err(not_found(id));
        }

        self.store.delete(id).await?;
        tracing::info!(id, "book deleted");
        Ok(())
    }
}

fn not_found(id: i32) -> AppError {
    AppError::not_found(format!("Book with Id {} does not exist", id))
}

/// A file taken from the `image` multipart field.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Stores uploaded images in one configured bucket.
#[derive(Clone)]
pub struct ImageUploader {
    store: Arc<dyn ImageStore>,
    bucket: String,
}

impl ImageUploader {
    pub fn new(store: Arc<dyn ImageStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Store the image under its own file name and return links to every
    /// object sharing that name as a prefix.
    pub async fn upload(&self, image: Option<UploadedImage>) -> Result<Vec<ImageLink>, AppError> {
        let image = match image {
            Some(image) if !image.data.is_empty() => image,
            _ => return Err(AppError::bad_request("No file uploaded.")),
        };

        let key = match image.file_name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(AppError::bad_request("Image name is required.")),
        };

        // An unnamed bucket cannot be addressed, so it is reported as missing.
        if self.bucket.is_empty() || !self.store.bucket_exists(&self.bucket).await? {
            return Err(AppError::not_found(format!(
                "Bucket {} does not exist.",
                self.bucket
            )));
        }

        let content_type = image
            .content_type
            .as_deref()
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let outcome = self
            .store
            .put_object(&self.bucket, &key, content_type, image.data)
            .await?;

        if let PutOutcome::Rejected { status } = outcome {
            tracing::error!(bucket = %self.bucket, key = %key, status, "image upload failed");
            return Err(AppError::server_error("Error uploading file to S3"));
        }

        let mut links = Vec::new();
        for object_key in self.store.list_keys(&self.bucket, &key).await? {
            let url = self
                .store
                .presign_get(&self.bucket, &object_key, PRESIGNED_URL_LIFETIME)
                .await?;
            links.push(ImageLink {
                image_name: object_key,
                image_presigned_url: url,
            });
        }

        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::books::memory::{MemoryBookStore, MemoryImageStore};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use rust_decimal::Decimal;

    fn book(id: i32, name: &str) -> Book {
        Book {
            id,
            name: Some(name.to_string()),
            author: Some("Frank Herbert".to_string()),
            description: None,
            price: Decimal::new(1250, 2),
            imageurl: None,
        }
    }

    fn catalog() -> BookCatalog {
        BookCatalog::new(Arc::new(MemoryBookStore::new()))
    }

    fn png(name: Option<&str>, data: &'static [u8]) -> Option<UploadedImage> {
        Some(UploadedImage {
            file_name: name.map(str::to_string),
            content_type: Some("image/png".to_string()),
            data: Bytes::from_static(data),
        })
    }

    #[tokio::test]
    async fn get_unknown_id_is_not_found() {
        let err = catalog().get(404).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn created_book_is_returned_by_get() {
        let catalog = catalog();
        let created = catalog.create(book(1, "Dune")).await.unwrap();

        assert_eq!(created, book(1, "Dune"));
        assert_eq!(catalog.get(1).await.unwrap(), book(1, "Dune"));
        assert_eq!(catalog.list().await.unwrap(), vec![book(1, "Dune")]);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts_and_keeps_original() {
        let catalog = catalog();
        catalog.create(book(1, "Dune")).await.unwrap();

        let err = catalog.create(book(1, "Dune Messiah")).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(matches!(
            &err,
            AppError::Conflict { message, .. } if message == "Book with Id 1 Already Exists"
        ));
        assert_eq!(catalog.get(1).await.unwrap().name.as_deref(), Some("Dune"));
    }

    #[tokio::test]
    async fn update_unknown_id_creates_nothing() {
        let catalog = catalog();
        let err = catalog.update(book(9, "Ghost")).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_whole_record() {
        let catalog = catalog();
        catalog.create(book(1, "Dune")).await.unwrap();

        let replacement = Book {
            author: None,
            ..book(1, "Dune (Deluxe)")
        };
        catalog.update(replacement.clone()).await.unwrap();

        assert_eq!(catalog.get(1).await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn delete_removes_existing_and_rejects_unknown() {
        let catalog = catalog();
        assert_eq!(
            catalog.delete(1).await.unwrap_err().status(),
            StatusCode::NOT_FOUND
        );

        catalog.create(book(1, "Dune")).await.unwrap();
        catalog.delete(1).await.unwrap();
        assert_eq!(
            catalog.get(1).await.unwrap_err().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn missing_or_empty_upload_never_touches_the_store() {
        let store = Arc::new(MemoryImageStore::with_bucket("covers"));
        let uploader = ImageUploader::new(store.clone(), "covers");

        for image in [None, png(Some("cover.png"), b"")] {
            let err = uploader.upload(image).await.unwrap_err();
            assert!(matches!(
                &err,
                AppError::BadRequest { message, .. } if message == "No file uploaded."
            ));
        }

        for name in [None, Some("")] {
            let err = uploader.upload(png(name, b"png")).await.unwrap_err();
            assert!(matches!(
                &err,
                AppError::BadRequest { message, .. } if message == "Image name is required."
            ));
        }

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn missing_bucket_is_not_found_without_put() {
        let store = Arc::new(MemoryImageStore::new());
        let uploader = ImageUploader::new(store.clone(), "covers");

        let err = uploader
            .upload(png(Some("cover.png"), b"png"))
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            AppError::NotFound { message, .. } if message == "Bucket covers does not exist."
        ));
        assert_eq!(store.calls(), 1);
        assert!(store.object("covers", "cover.png").await.is_none());
    }

    #[tokio::test]
    async fn unnamed_bucket_is_not_found_without_store_calls() {
        let store = Arc::new(MemoryImageStore::with_bucket(""));
        let uploader = ImageUploader::new(store.clone(), "");

        let err = uploader
            .upload(png(Some("cover.png"), b"png"))
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            AppError::NotFound { message, .. } if message == "Bucket  does not exist."
        ));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn upload_returns_links_for_every_object_sharing_the_prefix() {
        let store = Arc::new(MemoryImageStore::with_bucket("covers"));
        let uploader = ImageUploader::new(store.clone(), "covers");
        uploader
            .upload(png(Some("dune.png.old"), b"old"))
            .await
            .unwrap();

        let links = uploader.upload(png(Some("dune.png"), b"new")).await.unwrap();

        let names: Vec<_> = links.iter().map(|l| l.image_name.as_str()).collect();
        assert_eq!(names, vec!["dune.png", "dune.png.old"]);
        assert!(links[0]
            .image_presigned_url
            .ends_with(&format!("expires_in={}", PRESIGNED_URL_LIFETIME.as_secs())));

        let stored = store.object("covers", "dune.png").await.unwrap();
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(&stored.body[..], b"new");
    }

    #[tokio::test]
    async fn same_name_overwrites_previous_object() {
        let store = Arc::new(MemoryImageStore::with_bucket("covers"));
        let uploader = ImageUploader::new(store.clone(), "covers");

        uploader.upload(png(Some("a.png"), b"one")).await.unwrap();
        let links = uploader.upload(png(Some("a.png"), b"two")).await.unwrap();

        assert_eq!(links.len(), 1);
        let stored = store.object("covers", "a.png").await.unwrap();
        assert_eq!(&stored.body[..], b"two");
    }

    #[tokio::test]
    async fn missing_content_type_defaults_to_octet_stream() {
        let store = Arc::new(MemoryImageStore::with_bucket("covers"));
        let uploader = ImageUploader::new(store.clone(), "covers");

        let image = UploadedImage {
            file_name: Some("raw.bin".to_string()),
            content_type: None,
            data: Bytes::from_static(b"\x00\x01"),
        };
        uploader.upload(Some(image)).await.unwrap();

        let stored = store.object("covers", "raw.bin").await.unwrap();
        assert_eq!(stored.content_type, DEFAULT_CONTENT_TYPE);
    }

    struct RejectingImageStore;

    #[async_trait]
    impl ImageStore for RejectingImageStore {
        async fn bucket_exists(&self, _bucket: &str) -> anyhow::Result<bool> {
            Ok(true)
        }

        async fn put_object(
            &self,
            _bucket: &str,
            _key: &str,
            _content_type: &str,
            _body: Bytes,
        ) -> anyhow::Result<PutOutcome> {
            Ok(PutOutcome::Rejected { status: 503 })
        }

        async fn list_keys(&self, _bucket: &str, _prefix: &str) -> anyhow::Result<Vec<String>> {
            panic!("listing must not follow a rejected upload")
        }

        async fn presign_get(
            &self,
            _bucket: &str,
            _key: &str,
            _expires_in: Duration,
        ) -> anyhow::Result<String> {
            panic!("presigning must not follow a rejected upload")
        }
    }

    #[tokio::test]
    async fn rejected_upload_is_a_generic_server_error() {
        let uploader = ImageUploader::new(Arc::new(RejectingImageStore), "covers");

        let err = uploader
            .upload(png(Some("cover.png"), b"png"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(
            &err,
            AppError::ServerError { message, .. } if message == "Error uploading file to S3"
        ));
    }
}
