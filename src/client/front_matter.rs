//! Markdown files with a YAML front matter block.
//!
//! ```text
//! ---
//! title: Hello
//! publishDate: 01/31/2020
//! ---
//! Article body...
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FrontMatterError, ImportError};
use crate::model::Article;

const DELIMITER: &str = "---";

/// Date format of `publishDate` in front matter.
pub const PUBLISH_DATE_FORMAT: &str = "%m/%d/%Y";

/// An article as written in a markdown file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportArticle {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub title: String,
    pub url: String,
    pub banner: String,
    pub images: Vec<String>,
    pub publish_date: String,
    pub author: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    /// Markdown after the front matter block
    #[serde(skip)]
    pub content: String,
}

impl ImportArticle {
    /// Parse a markdown file.
    pub fn parse(text: &str) -> Result<Self, FrontMatterError> {
        let (yaml, body) = split(text)?;
        let mut article: ImportArticle = if yaml.trim().is_empty() {
            ImportArticle::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| FrontMatterError::Yaml(e.to_string()))?
        };
        article.content = body.to_string();
        Ok(article)
    }

    /// Render back to markdown.
    pub fn render(&self) -> Result<String, FrontMatterError> {
        let yaml = serde_yaml::to_string(self).map_err(|e| FrontMatterError::Yaml(e.to_string()))?;
        Ok(format!(
            "{delim}\n{yaml}{delim}\n{body}",
            delim = DELIMITER,
            yaml = yaml,
            body = self.content
        ))
    }

    /// The API document for this file.
    pub fn to_article(&self) -> Result<Article, ImportError> {
        let publish_date = match self.publish_date.trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, PUBLISH_DATE_FORMAT)
                    .map_err(|_| ImportError::InvalidDate(raw.to_string()))?,
            ),
        };

        Ok(Article {
            id: Some(self.id.clone()).filter(|id| !id.is_empty()),
            title: self.title.clone(),
            author: self.author.clone(),
            url: self.url.clone(),
            content: self.content.clone(),
            banner: self.banner.clone(),
            data_source: String::new(),
            publish_date,
            categories: self.categories.clone(),
            tags: self.tags.clone(),
        })
    }
}

/// Split a file into its front matter and body.
fn split(text: &str) -> Result<(&str, &str), FrontMatterError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let (first, rest) = next_line(text);
    if first.trim_end() != DELIMITER {
        return Err(FrontMatterError::MissingOpeningDelimiter);
    }

    let mut offset = 0;
    let mut remaining = rest;
    while !remaining.is_empty() {
        let (line, after) = next_line(remaining);
        if line.trim_end() == DELIMITER {
            return Ok((&rest[..offset], after));
        }
        offset += remaining.len() - after.len();
        remaining = after;
    }
    Err(FrontMatterError::MissingClosingDelimiter)
}

/// First line (without its newline) and everything after it.
fn next_line(text: &str) -> (&str, &str) {
    match text.find('\n') {
        Some(idx) => (&text[..idx], &text[idx + 1..]),
        None => (text, ""),
    }
}
