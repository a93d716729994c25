pub mod dynamodb;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod s3;
pub mod service;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{
    settings::{Settings, StorageBackend},
    InitCtx, Module,
};

use handlers::BooksState;
use service::{BookCatalog, ImageUploader};
use store::{BookStore, ImageStore};

/// Book catalogue and cover image uploads, served under `/api/books`
pub struct BooksModule {
    state: BooksState,
    table: String,
}

impl BooksModule {
    pub fn new(
        books: Arc<dyn BookStore>,
        images: Arc<dyn ImageStore>,
        table: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            state: BooksState {
                catalog: BookCatalog::new(books),
                uploader: ImageUploader::new(images, bucket),
            },
            table: table.into(),
        }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let bucket = self.state.uploader.bucket();
        if bucket.is_empty() {
            tracing::warn!(
                module = self.name(),
                "storage.bucket is empty; uploads will report a missing bucket"
            );
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.storage.backend,
            table = %self.table,
            bucket = %bucket,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        handlers::router(self.state.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(serde_json::json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List all books",
                        "description": "Full table scan; no pagination or ordering.",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Every stored book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "500": {
                                "description": "Upstream store failure",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "The stored book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "400": {
                                "description": "A book with this id already exists, or the body is malformed",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    },
                    "put": {
                        "summary": "Replace a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Book" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "The stored book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": {
                                "description": "No book with this id",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "parameters": [{
                        "name": "id",
                        "in": "path",
                        "required": true,
                        "schema": { "type": "integer", "format": "int32" }
                    }],
                    "get": {
                        "summary": "Get a book",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": {
                                "description": "No book with this id",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    },
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "responses": {
                            "204": { "description": "Deleted" },
                            "404": {
                                "description": "No book with this id",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/upload": {
                    "post": {
                        "summary": "Upload a cover image",
                        "description": "Stores the file under its own name and returns presigned links for every object sharing that name as a prefix.",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "multipart/form-data": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "image": { "type": "string", "format": "binary" }
                                        },
                                        "required": ["image"]
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Objects sharing the uploaded name",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/ImageLink" }
                                        }
                                    }
                                }
                            },
                            "400": {
                                "description": "Missing, empty or unnamed file",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            },
                            "404": {
                                "description": "Configured bucket does not exist",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            },
                            "500": {
                                "description": "Upstream store failure",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": {
                                "type": "integer",
                                "format": "int32",
                                "description": "Unique identifier, supplied by the client"
                            },
                            "name": { "type": "string", "nullable": true },
                            "author": { "type": "string", "nullable": true },
                            "description": { "type": "string", "nullable": true },
                            "price": { "type": "number", "format": "decimal" },
                            "imageurl": { "type": "string", "nullable": true }
                        },
                        "required": ["id", "price"]
                    },
                    "ImageLink": {
                        "type": "object",
                        "properties": {
                            "imageName": {
                                "type": "string",
                                "description": "Object key in the bucket"
                            },
                            "imagePresignedUrl": {
                                "type": "string",
                                "format": "uri",
                                "description": "Time-limited GET link"
                            }
                        },
                        "required": ["imageName", "imagePresignedUrl"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Build the books module over the stores selected by `storage.backend`.
pub async fn create_module(settings: &Settings) -> Arc<dyn Module> {
    let storage = &settings.storage;

    let (books, images): (Arc<dyn BookStore>, Arc<dyn ImageStore>) = match storage.backend {
        StorageBackend::Aws => {
            let clients = bookshelf_aws::connect(&settings.aws).await;
            (
                Arc::new(dynamodb::DynamoBookStore::new(
                    clients.dynamodb,
                    storage.table.clone(),
                )),
                Arc::new(s3::S3ImageStore::new(clients.s3)),
            )
        }
        StorageBackend::Memory => (
            Arc::new(memory::MemoryBookStore::new()),
            Arc::new(memory::MemoryImageStore::with_bucket(storage.bucket.clone())),
        ),
    };

    Arc::new(BooksModule::new(
        books,
        images,
        storage.table.clone(),
        storage.bucket.clone(),
    ))
}
