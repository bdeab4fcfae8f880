//! Article documents.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Document, FilterKind};

/// A blog-post-like document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Article {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub author: String,
    pub url: String,
    pub content: String,
    pub banner: String,
    pub data_source: String,

    /// Calendar date, written as `YYYY-MM-DD`
    #[serde(skip_serializing_if = "Option::is_none", with = "publish_date")]
    pub publish_date: Option<NaiveDate>,

    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

impl Document for Article {
    const COLLECTION: &'static str = "articles";
    const NAME: &'static str = "article";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: Option<String>) {
        self.id = id;
    }

    fn filter_kind(field: &str) -> Option<FilterKind> {
        match field {
            "categories" | "tags" => Some(FilterKind::AnyOf),
            "title" | "author" | "url" | "banner" | "dataSource" => Some(FilterKind::Equals),
            _ => None,
        }
    }

    fn sort_key(&self) -> Option<i64> {
        self.publish_date.map(|date| i64::from(date.num_days_from_ce()))
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("url", &self.url),
            ("content", &self.content),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// `publishDate` accepts `YYYY-MM-DD` or a full timestamp and keeps the date.
mod publish_date {
    use chrono::NaiveDate;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(
        date: &Option<NaiveDate>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&date.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDate>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let raw = match raw.as_deref().map(str::trim) {
            None | Some("") => return Ok(None),
            Some(raw) => raw,
        };
        let date_part = raw.split('T').next().unwrap_or(raw);
        NaiveDate::parse_from_str(date_part, FORMAT)
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid publishDate {raw:?}: {e}")))
    }
}
