//! HTTP-backed `TransportPort`.
//!
//! JSON bodies for `/search` and `/albums`, multipart forms for
//! `/media-search` and `/upload`. No request timeout is set: a hung call
//! stalls the operation that issued it.

use async_trait::async_trait;
use mediafind_common::{
    AlbumInfo, CreateAlbumRequest, ErrorBody, SearchResponse, ServerInfo, TextSearchRequest,
    UploadResponse,
};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{TransportError, TransportPort};
use crate::config::Config;
use crate::media_file::MediaFile;

pub struct HttpTransport {
    base_url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a non-success response to a TransportError, preferring the
    /// `{error}` message when the body carries one.
    async fn map_error(resp: reqwest::Response) -> TransportError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) => body,
        };
        TransportError::Status { status, message }
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, TransportError> {
        if !resp.status().is_success() {
            return Err(Self::map_error(resp).await);
        }
        resp.json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn media_part(file: &MediaFile) -> Result<Part, TransportError> {
        let data = file.read().await?;
        let part = Part::bytes(data)
            .file_name(file.file_name.clone())
            .mime_str(file.content_type.as_str())?;
        Ok(part)
    }
}

#[async_trait]
impl TransportPort for HttpTransport {
    async fn submit_text_query(
        &self,
        request: &TextSearchRequest,
    ) -> Result<SearchResponse, TransportError> {
        debug!("POST /search (max {})", request.max_results);
        let resp = self
            .client
            .post(self.url("/search"))
            .json(request)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn submit_content_query(
        &self,
        file: &MediaFile,
        max_results: u32,
        album_id: Option<&str>,
    ) -> Result<SearchResponse, TransportError> {
        debug!("POST /media-search with {}", file.file_name);
        let mut form = Form::new()
            .part("media", Self::media_part(file).await?)
            .text("maxResults", max_results.to_string());
        if let Some(album_id) = album_id {
            form = form.text("albumId", album_id.to_string());
        }

        let resp = self
            .client
            .post(self.url("/media-search"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn submit_upload(
        &self,
        file: &MediaFile,
        album_id: Option<&str>,
        metadata: Option<&str>,
    ) -> Result<UploadResponse, TransportError> {
        debug!("POST /upload with {}", file.file_name);
        let mut form = Form::new().part("media", Self::media_part(file).await?);
        if let Some(album_id) = album_id {
            form = form.text("albumId", album_id.to_string());
        }
        if let Some(metadata) = metadata {
            form = form.text("metadata", metadata.to_string());
        }

        let resp = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn server_info(&self) -> Result<ServerInfo, TransportError> {
        let resp = self.client.get(self.url("/info")).send().await?;
        Self::decode(resp).await
    }

    async fn create_album(&self, name: &str) -> Result<AlbumInfo, TransportError> {
        let resp = self
            .client
            .post(self.url("/albums"))
            .json(&CreateAlbumRequest {
                name: name.to_string(),
            })
            .send()
            .await?;
        Self::decode(resp).await
    }
}
