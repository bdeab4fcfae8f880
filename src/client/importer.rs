//! Markdown article importer.
//!
//! Imports a single markdown file or every `*.md` file below a folder. The
//! saved article id is written back into each file's front matter so that
//! the next import updates instead of duplicating.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, error, info, warn};

use super::api::{content_type_for, ApiClient};
use super::front_matter::ImportArticle;
use crate::error::{ClientError, ImportError};

/// Directory entries never descended into.
pub const SKIPPED_ENTRIES: &[&str] = &[".git", ".DS_Store"];

const MARKDOWN_EXTENSION: &str = "md";

/// Outcome of an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct ArticleImporter {
    client: ApiClient,
}

impl ArticleImporter {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Import `path`, a markdown file or a folder.
    ///
    /// Failures are logged per file and do not stop the run.
    pub async fn import(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        let files = markdown_files(path)?;
        info!(path = %path.display(), files = files.len(), "Importing articles");

        let mut summary = ImportSummary::default();
        for file in files {
            match self.import_file(&file).await {
                Ok(id) => {
                    info!(file = %file.display(), id = %id, "Saved article");
                    summary.succeeded += 1;
                }
                Err(e) => {
                    error!(file = %file.display(), error = %e, "Unable to import article");
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Save one markdown file and return the article id.
    pub async fn import_file(&self, file: &Path) -> Result<String, ImportError> {
        let text = tokio::fs::read_to_string(file)
            .await
            .map_err(|e| io_error(file, e))?;
        let mut import = ImportArticle::parse(&text).map_err(|source| ImportError::FrontMatter {
            path: file.display().to_string(),
            source,
        })?;
        let article = import.to_article()?;

        let mut saved_id = None;
        if !import.id.is_empty() {
            match self.client.update_article(&import.id, &article).await {
                Ok(_) => saved_id = Some(import.id.clone()),
                Err(ClientError::NotFound(_)) => {
                    debug!(id = %import.id, "Article no longer exists, creating it");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let id = match saved_id {
            Some(id) => id,
            None => {
                let mut new_article = article;
                new_article.id = None;
                let created = self.client.create_article(&new_article).await?;
                created.id.ok_or_else(|| ClientError::Status {
                    status: 201,
                    message: "created article has no id".to_string(),
                })?
            }
        };

        if !import.images.is_empty() {
            let directory = file.parent().unwrap_or_else(|| Path::new("."));
            self.upload_images(&id, directory, &import.images).await;
        }

        import.id = id.clone();
        let rendered = import.render().map_err(|source| ImportError::FrontMatter {
            path: file.display().to_string(),
            source,
        })?;
        tokio::fs::write(file, rendered)
            .await
            .map_err(|e| io_error(file, e))?;

        Ok(id)
    }

    async fn upload_images(&self, id: &str, directory: &Path, images: &[String]) {
        for name in images {
            let path = directory.join(name);
            let data = match tokio::fs::read(&path).await {
                Ok(data) => Bytes::from(data),
                Err(e) => {
                    warn!(image = %path.display(), error = %e, "Unable to read image");
                    continue;
                }
            };

            let filename = Path::new(name)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.clone());
            if let Err(e) = self
                .client
                .upload_image(id, &filename, content_type_for(&filename), data)
                .await
            {
                warn!(image = %path.display(), error = %e, "Unable to upload image");
            }
        }
    }
}

fn io_error(path: &Path, e: std::io::Error) -> ImportError {
    ImportError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// `path` itself when it is a file, else every markdown file below it.
pub fn markdown_files(path: &Path) -> Result<Vec<PathBuf>, ImportError> {
    let metadata = std::fs::metadata(path).map_err(|e| io_error(path, e))?;
    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_error(&dir, e))?;
            let name = entry.file_name();
            if SKIPPED_ENTRIES.iter().any(|skip| name == *skip) {
                continue;
            }

            let entry_path = entry.path();
            if entry_path.is_dir() {
                pending.push(entry_path);
            } else if entry_path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(MARKDOWN_EXTENSION))
            {
                files.push(entry_path);
            }
        }
    }
    files.sort();
    Ok(files)
}
