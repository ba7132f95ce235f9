//! Document Loader
//!
//! Produces the raw bytes of a document, either from inline text or with a
//! single HTTP(S) GET. Nothing is retried; any failure ends the load.

use std::borrow::Cow;
use std::future::Future;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::LoaderConfig;
use crate::error::{LoadError, SourceError};

/// Where the document comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    /// Document text supplied by the caller
    Inline(String),
    /// Absolute `http` or `https` URL to fetch
    Url(String),
}

impl DocumentSource {
    /// Build a source from optional content and URL fields, exactly one of
    /// which must be set; empty strings count as unset
    pub fn from_parts(content: Option<&str>, content_url: Option<&str>) -> Result<Self, SourceError> {
        let content = content.filter(|s| !s.is_empty());
        let content_url = content_url.filter(|s| !s.is_empty());
        match (content, content_url) {
            (Some(text), None) => Ok(DocumentSource::Inline(text.to_string())),
            (None, Some(url)) => Ok(DocumentSource::Url(url.to_string())),
            (None, None) => Err(SourceError::Missing),
            (Some(_), Some(_)) => Err(SourceError::Ambiguous),
        }
    }
}

/// Fetches documents with a shared HTTP client
#[derive(Debug, Clone)]
pub struct Loader {
    client: reqwest::Client,
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(LoadError::Client)?;
        Ok(Loader { client, config })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Raw document bytes; inline sources are borrowed, never copied
    pub async fn load<'s>(&self, source: &'s DocumentSource) -> Result<Cow<'s, [u8]>, LoadError> {
        match source {
            DocumentSource::Inline(text) => Ok(Cow::Borrowed(text.as_bytes())),
            DocumentSource::Url(url) => self.fetch(url).await.map(Cow::Owned),
        }
    }

    /// Like [`load`](Self::load), but gives up with [`LoadError::Cancelled`]
    /// as soon as `cancel` completes; the in-flight request is dropped
    pub async fn load_until<'s, C>(&self, source: &'s DocumentSource, cancel: C) -> Result<Cow<'s, [u8]>, LoadError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            result = self.load(source) => result,
            () = cancel => {
                tracing::debug!("document load cancelled");
                Err(LoadError::Cancelled)
            }
        }
    }

    async fn fetch(&self, raw: &str) -> Result<Vec<u8>, LoadError> {
        let url = Url::parse(raw).map_err(|e| LoadError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(LoadError::UnsupportedScheme(url.scheme().to_string()));
        }

        tracing::debug!(url = raw, "fetching document");
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(raw, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: raw.to_string(),
                status: status.as_u16(),
            });
        }

        let limit = self.config.max_body_bytes;
        if response.content_length().is_some_and(|len| len > limit as u64) {
            return Err(LoadError::TooLarge { limit });
        }

        // Content-Length may be absent or wrong, so count as we go
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| transport_error(raw, e))? {
            if body.len() + chunk.len() > limit {
                return Err(LoadError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(url = raw, status = status.as_u16(), bytes = body.len(), "fetched document");
        Ok(body)
    }
}

fn transport_error(url: &str, source: reqwest::Error) -> LoadError {
    if source.is_timeout() {
        LoadError::Timeout { url: url.to_string() }
    } else {
        LoadError::Transport {
            url: url.to_string(),
            source,
        }
    }
}
