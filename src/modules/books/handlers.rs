use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, rejection::PathRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bookshelf_http::AppError;

use super::models::{Book, ImageLink};
use super::service::{BookCatalog, ImageUploader, UploadedImage};

/// Multipart field that carries the uploaded file.
pub const IMAGE_FIELD: &str = "image";

/// Shared state for the books routes.
#[derive(Clone)]
pub struct BooksState {
    pub catalog: BookCatalog,
    pub uploader: ImageUploader,
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book).put(update_book))
        .route("/upload", post(upload_image))
        .route("/{id}", get(get_book).delete(delete_book))
        .with_state(state)
}

async fn get_book(
    State(state): State<BooksState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(state.catalog.get(id).await?))
}

/// Unpaginated full scan.
async fn list_books(State(state): State<BooksState>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.catalog.list().await?))
}

async fn create_book(
    State(state): State<BooksState>,
    payload: Result<Json<Book>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(book) = payload?;
    Ok(Json(state.catalog.create(book).await?))
}

async fn update_book(
    State(state): State<BooksState>,
    payload: Result<Json<Book>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(book) = payload?;
    Ok(Json(state.catalog.update(book).await?))
}

async fn delete_book(
    State(state): State<BooksState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = id?;
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_image(
    State(state): State<BooksState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<ImageLink>>, AppError> {
    let mut multipart = multipart?;

    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(ToOwned::to_owned);
        let content_type = field.content_type().map(ToOwned::to_owned);
        let data = field.bytes().await?;
        image = Some(UploadedImage {
            file_name,
            content_type,
            data,
        });
        break;
    }

    Ok(Json(state.uploader.upload(image).await?))
}
