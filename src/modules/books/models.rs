use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalogue entry, keyed by a client-supplied integer id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier, also the DynamoDB hash key
    pub id: i32,
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    /// Fixed-point price, serialized as a JSON number
    pub price: Decimal,
    /// Link to the cover image, usually a presigned URL from `/upload`
    pub imageurl: Option<String>,
}

/// An uploaded object together with a presigned download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageLink {
    pub image_name: String,
    pub image_presigned_url: String,
}
