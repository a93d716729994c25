//! Bookshelf application library
//!
//! Hosts the `books` module: CRUD over book records in DynamoDB and cover
//! image uploads to S3 with presigned download links.

pub mod modules;

/// Re-export commonly used types
pub use modules::*;
