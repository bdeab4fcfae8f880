//! HTTP client for the articles API.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::{multipart, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::token::AccessTokenService;
use crate::error::ClientError;
use crate::model::{Article, Link};

/// Multipart field name for image uploads.
pub const IMAGE_FIELD: &str = "image";

/// Authenticated client for the articles API.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<AccessTokenService>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<AccessTokenService>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, tokens)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Arc<AccessTokenService>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.tokens.access_token().await?;
        Ok(self.client.request(method, self.url(path)).bearer_auth(token))
    }

    pub async fn get_article(&self, id: &str) -> Result<Article, ClientError> {
        let path = format!("/api/articles/{}", urlencoding::encode(id));
        let response = self.request(Method::GET, &path).await?.send().await?;
        decode(expect(response, StatusCode::OK, &path).await?).await
    }

    /// Create an article; the returned copy carries the assigned id.
    pub async fn create_article(&self, article: &Article) -> Result<Article, ClientError> {
        let path = "/api/articles";
        let response = self
            .request(Method::POST, path)
            .await?
            .json(article)
            .send()
            .await?;
        let created: Article = decode(expect(response, StatusCode::CREATED, path).await?).await?;
        debug!(id = ?created.id, title = %created.title, "Created article");
        Ok(created)
    }

    /// Replace an existing article. A missing article is [`ClientError::NotFound`].
    pub async fn update_article(&self, id: &str, article: &Article) -> Result<Article, ClientError> {
        let path = format!("/api/articles/{}", urlencoding::encode(id));
        let response = self
            .request(Method::PUT, &path)
            .await?
            .json(article)
            .send()
            .await?;
        decode(expect(response, StatusCode::OK, &path).await?).await
    }

    pub async fn upload_image(
        &self,
        article_id: &str,
        filename: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<(), ClientError> {
        let path = format!("/api/articles/{}/images", urlencoding::encode(article_id));
        let part = multipart::Part::stream(data)
            .file_name(filename.to_string())
            .mime_str(content_type)?;
        let form = multipart::Form::new().part(IMAGE_FIELD, part);

        let response = self
            .request(Method::POST, &path)
            .await?
            .multipart(form)
            .send()
            .await?;
        expect(response, StatusCode::ACCEPTED, &path).await?;
        debug!(article = %article_id, filename = %filename, "Uploaded image");
        Ok(())
    }

    pub async fn create_link(&self, link: &Link) -> Result<Link, ClientError> {
        let path = "/api/links";
        let response = self
            .request(Method::POST, path)
            .await?
            .json(link)
            .send()
            .await?;
        decode(expect(response, StatusCode::CREATED, path).await?).await
    }
}

async fn expect(response: Response, want: StatusCode, path: &str) -> Result<Response, ClientError> {
    let status = response.status();
    if status == want {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound(path.to_string()));
    }
    let message = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    Ok(response.json::<T>().await?)
}

/// Guess an image content type from its file extension.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => crate::objects::DEFAULT_CONTENT_TYPE,
    }
}
