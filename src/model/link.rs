//! Link (bookmark) documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Document, FilterKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Link {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub url: String,
    pub banner: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,

    /// Set by the server on create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
}

impl Document for Link {
    const COLLECTION: &'static str = "links";
    const NAME: &'static str = "link";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn filter_kind(field: &str) -> Option<FilterKind> {
        match field {
            "categories" | "tags" => Some(FilterKind::AnyOf),
            "title" | "url" | "banner" => Some(FilterKind::Equals),
            _ => None,
        }
    }

    fn sort_key(&self) -> Option<i64> {
        self.created_date.map(|created| created.timestamp_millis())
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.is_empty() {
            missing.push("title");
        }
        if self.url.is_empty() {
            missing.push("url");
        }
        missing
    }

    fn prepare_create(&mut self) {
        self.created_date = Some(Utc::now());
    }

    fn prepare_update(&mut self, existing: &Self) {
        self.created_date = existing.created_date;
    }
}
