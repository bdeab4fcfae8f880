//! Listing filters built from query strings.
//!
//! Only fields a document type declares filterable may appear in a query;
//! anything else is rejected before it reaches the store.

use serde_json::Value;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::model::{Document, FilterKind};

/// One restriction on a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterClause {
    /// The list field shares at least one value with `values`
    AnyOf { field: String, values: Vec<String> },

    /// The field equals `value` exactly
    Equals { field: String, value: String },
}

impl FilterClause {
    pub fn field(&self) -> &str {
        match self {
            FilterClause::AnyOf { field, .. } | FilterClause::Equals { field, .. } => field,
        }
    }

    fn matches(&self, document: &Value) -> bool {
        match self {
            FilterClause::AnyOf { field, values } => match document.get(field) {
                Some(Value::Array(items)) => items
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|item| values.iter().any(|v| v == item)),
                Some(Value::String(item)) => values.iter().any(|v| v == item),
                _ => false,
            },
            FilterClause::Equals { field, value } => {
                document.get(field).and_then(Value::as_str) == Some(value.as_str())
            }
        }
    }
}

/// A conjunction of clauses. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    clauses: Vec<FilterClause>,
}

impl DocumentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any_of(mut self, field: impl Into<String>, values: Vec<String>) -> Self {
        self.clauses.push(FilterClause::AnyOf {
            field: field.into(),
            values,
        });
        self
    }

    pub fn equals(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push(FilterClause::Equals {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Build a filter from a raw query string.
    ///
    /// Repeated keys are kept. List fields match any of the given values,
    /// scalar fields use the first value only.
    pub fn from_query<D: Document>(query: Option<&str>) -> Result<Self, ApiError> {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match grouped.iter_mut().find(|(k, _)| *k == key) {
                Some((_, values)) => values.push(value.into_owned()),
                None => grouped.push((key.into_owned(), vec![value.into_owned()])),
            }
        }

        let mut filter = DocumentFilter::new();
        for (key, mut values) in grouped {
            match D::filter_kind(&key) {
                Some(FilterKind::AnyOf) => filter = filter.any_of(key, values),
                Some(FilterKind::Equals) => filter = filter.equals(key, values.swap_remove(0)),
                None => {
                    return Err(ApiError::validation(
                        "invalid filter",
                        format!("{} can not be filtered by {}", D::COLLECTION, key),
                    ))
                }
            }
        }
        Ok(filter)
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, document: &Value) -> bool {
        self.clauses.iter().all(|clause| clause.matches(document))
    }
}
