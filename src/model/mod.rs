//! Documents served by the API.
//!
//! Every document type lives in its own collection and shares the same
//! lifecycle: the server assigns an identifier on create, validates required
//! fields on create and update, and lists newest first.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

mod article;
mod link;

pub use article::Article;
pub use link::Link;

// =============================================================================
// Document Trait
// =============================================================================

/// How a query parameter restricts a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// The field is a list; match when it shares any value with the query
    AnyOf,

    /// The field is a scalar; match on the first query value only
    Equals,
}

/// A document type stored in its own collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Collection name, also used as the table suffix in DynamoDB.
    const COLLECTION: &'static str;

    /// Human-readable singular name used in error messages.
    const NAME: &'static str;

    fn id(&self) -> Option<&str>;

    fn set_id(&mut self, id: Option<String>);

    /// Filter semantics for a query key, `None` when the key is not filterable.
    fn filter_kind(field: &str) -> Option<FilterKind>;

    /// Ordering key for listings. Larger sorts first; `None` sorts last.
    fn sort_key(&self) -> Option<i64>;

    /// Names of required fields that are empty.
    fn missing_fields(&self) -> Vec<&'static str>;

    /// Fill in server-assigned fields before the first insert.
    fn prepare_create(&mut self) {}

    /// Carry server-assigned fields over from the stored version.
    fn prepare_update(&mut self, _existing: &Self) {}
}

// =============================================================================
// Document Identifier
// =============================================================================

/// Store-generated identifier, rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(Uuid);

impl DocumentId {
    pub fn generate() -> Self {
        DocumentId(Uuid::new_v4())
    }
}

impl FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(DocumentId)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}
