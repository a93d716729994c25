//! DynamoDB-backed [`BookStore`].

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use rust_decimal::Decimal;

use super::models::Book;
use super::store::BookStore;

const ID: &str = "id";
const NAME: &str = "name";
const AUTHOR: &str = "author";
const DESCRIPTION: &str = "description";
const PRICE: &str = "price";
const IMAGE_URL: &str = "imageurl";

type Item = HashMap<String, AttributeValue>;

/// Books table with a numeric `id` hash key.
pub struct DynamoBookStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoBookStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn key(id: i32) -> AttributeValue {
        AttributeValue::N(id.to_string())
    }
}

#[async_trait]
impl BookStore for DynamoBookStore {
    async fn load(&self, id: i32) -> anyhow::Result<Option<Book>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(ID, Self::key(id))
            .send()
            .await
            .with_context(|| format!("failed to load book {} from {}", id, self.table))?;

        output.item().map(book_from_item).transpose()
    }

    async fn scan(&self) -> anyhow::Result<Vec<Book>> {
        let mut books = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let page = self
                .client
                .scan()
                .table_name(&self.table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .with_context(|| format!("failed to scan {}", self.table))?;

            for item in page.items() {
                books.push(book_from_item(item)?);
            }

            match page.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        tracing::debug!(table = %self.table, count = books.len(), "scanned books");
        Ok(books)
    }

    async fn save(&self, book: &Book) -> anyhow::Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(book_to_item(book)))
            .send()
            .await
            .with_context(|| format!("failed to save book {} to {}", book.id, self.table))?;

        tracing::debug!(table = %self.table, id = book.id, "saved book");
        Ok(())
    }

    async fn delete(&self, id: i32) -> anyhow::Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key(ID, Self::key(id))
            .send()
            .await
            .with_context(|| format!("failed to delete book {} from {}", id, self.table))?;

        tracing::debug!(table = %self.table, id, "deleted book");
        Ok(())
    }
}

/// Absent optional fields are left out of the item rather than stored as NULL.
fn book_to_item(book: &Book) -> Item {
    let mut item = Item::new();
    item.insert(ID.to_string(), AttributeValue::N(book.id.to_string()));
    item.insert(PRICE.to_string(), AttributeValue::N(book.price.to_string()));

    let optional = [
        (NAME, &book.name),
        (AUTHOR, &book.author),
        (DESCRIPTION, &book.description),
        (IMAGE_URL, &book.imageurl),
    ];
    for (attribute, value) in optional {
        if let Some(value) = value {
            item.insert(attribute.to_string(), AttributeValue::S(value.clone()));
        }
    }

    item
}

fn book_from_item(item: &Item) -> anyhow::Result<Book> {
    let id = number(item, ID)?
        .ok_or_else(|| anyhow!("item is missing the '{}' key", ID))?
        .parse::<i32>()
        .with_context(|| format!("attribute '{}' is not a 32-bit integer", ID))?;

    // Items written by other clients may omit the price.
    let price = match number(item, PRICE)? {
        Some(raw) => Decimal::from_str(raw)
            .or_else(|_| Decimal::from_scientific(raw))
            .with_context(|| format!("attribute '{}' of book {} is not a decimal", PRICE, id))?,
        None => Decimal::ZERO,
    };

    Ok(Book {
        id,
        name: string(item, NAME),
        author: string(item, AUTHOR),
        description: string(item, DESCRIPTION),
        price,
        imageurl: string(item, IMAGE_URL),
    })
}

fn number<'a>(item: &'a Item, attribute: &str) -> anyhow::Result<Option<&'a str>> {
    match item.get(attribute) {
        None | Some(AttributeValue::Null(_)) => Ok(None),
        Some(AttributeValue::N(raw)) => Ok(Some(raw.as_str())),
        Some(other) => Err(anyhow!(
            "attribute '{}' should be a number, found {:?}",
            attribute,
            other
        )),
    }
}

fn string(item: &Item, attribute: &str) -> Option<String> {
    item.get(attribute)
        .and_then(|value| value.as_s().ok())
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dune() -> Book {
        Book {
            id: 1,
            name: Some("Dune".to_string()),
            author: Some("Frank Herbert".to_string()),
            description: None,
            price: Decimal::new(1250, 2),
            imageurl: None,
        }
    }

    #[test]
    fn item_uses_numeric_key_and_skips_missing_fields() {
        let item = book_to_item(&dune());

        assert_eq!(item[ID], AttributeValue::N("1".to_string()));
        assert_eq!(item[PRICE], AttributeValue::N("12.50".to_string()));
        assert_eq!(item[NAME], AttributeValue::S("Dune".to_string()));
        assert!(!item.contains_key(DESCRIPTION));
        assert!(!item.contains_key(IMAGE_URL));
    }

    #[test]
    fn item_written_by_other_clients_is_read() {
        let mut item = Item::new();
        item.insert(ID.to_string(), AttributeValue::N("42".to_string()));
        item.insert(PRICE.to_string(), AttributeValue::N("1.5E+1".to_string()));
        item.insert(DESCRIPTION.to_string(), AttributeValue::Null(true));

        let book = book_from_item(&item).unwrap();
        assert_eq!(book.id, 42);
        assert_eq!(book.price, Decimal::from(15));
        assert_eq!(book.description, None);
    }

    #[test]
    fn item_without_id_is_an_error() {
        let mut item = book_to_item(&dune());
        item.remove(ID);
        assert!(book_from_item(&item).is_err());

        item.insert(ID.to_string(), AttributeValue::S("one".to_string()));
        assert!(book_from_item(&item).is_err());
    }

    #[test]
    fn stored_item_reads_back_as_the_same_book() {
        assert_eq!(book_from_item(&book_to_item(&dune())).unwrap(), dune());
    }
}
