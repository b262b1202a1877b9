//! Resolves stored document references to bytes.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AppError, ErrorKind};
use crate::storage::{storage_key, BlobStorage};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const HTML_SNIFF_LEN: usize = 512;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unsupported document reference: {0}")]
    UnsupportedReference(String),
    #[error("failed to read stored document: {0}")]
    Storage(String),
    #[error("request failed: {0}")]
    Http(String),
    #[error("received an HTML page instead of the file; the link may not be shared publicly")]
    HtmlPage,
    #[error("received an empty response")]
    Empty,
    #[error("all download attempts failed: {0}")]
    Exhausted(String),
}

impl From<SourceError> for AppError {
    fn from(value: SourceError) -> Self {
        let kind = match value {
            SourceError::UnsupportedReference(_) => ErrorKind::Validation,
            SourceError::Storage(_) => ErrorKind::Storage,
            _ => ErrorKind::Delivery,
        };
        AppError::new(kind, value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentReference {
    Storage(String),
    Drive(String),
    Http(Url),
}

impl DocumentReference {
    pub fn parse(reference: &str) -> Result<Self, SourceError> {
        let reference = reference.trim();
        if let Some(key) = storage_key(reference) {
            return Ok(Self::Storage(key.to_string()));
        }

        let url = Url::parse(reference)
            .map_err(|_| SourceError::UnsupportedReference(reference.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SourceError::UnsupportedReference(reference.to_string()));
        }
        match drive_file_id(&url) {
            Some(file_id) => Ok(Self::Drive(file_id)),
            None => Ok(Self::Http(url)),
        }
    }
}

/// Extracts the file id from `/file/d/<id>/...` or `?id=<id>` Drive links.
pub fn drive_file_id(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    if !(host.ends_with("drive.google.com") || host.ends_with("docs.google.com")) {
        return None;
    }

    let segments: Vec<&str> = url.path_segments()?.collect();
    if let Some(position) = segments.iter().position(|segment| *segment == "d") {
        if let Some(id) = segments.get(position + 1).filter(|id| !id.is_empty()) {
            return Some((*id).to_string());
        }
    }

    url.query_pairs()
        .find(|(name, _)| name == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

pub fn drive_view_url(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/view")
}

pub fn drive_download_url(file_id: &str) -> String {
    format!("https://drive.google.com/uc?export=download&id={file_id}")
}

/// Candidate URLs for a public Drive file, tried in order.
pub fn drive_download_urls(file_id: &str, api_key: Option<&str>) -> Vec<Url> {
    let candidates = [
        drive_download_url(file_id),
        format!("https://drive.google.com/uc?id={file_id}&export=download"),
        format!("https://www.googleapis.com/drive/v3/files/{file_id}?alt=media"),
        format!("https://docs.google.com/uc?export=download&id={file_id}"),
    ];

    candidates
        .iter()
        .filter_map(|raw| Url::parse(raw).ok())
        .map(|mut url| {
            if let Some(key) = api_key {
                url.query_pairs_mut().append_pair("key", key);
            }
            url
        })
        .collect()
}

pub fn looks_like_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(HTML_SNIFF_LEN)];
    let text = String::from_utf8_lossy(head);
    let trimmed = text.trim_start();
    if !trimmed.starts_with('<') {
        return false;
    }
    let lowered = trimmed.to_ascii_lowercase();
    lowered.starts_with("<!doctype html") || lowered.starts_with("<html")
}

#[derive(Debug, Clone, Serialize)]
pub struct DriveFileLinks {
    pub file_id: String,
    pub view_url: String,
    pub download_url: String,
}

impl DriveFileLinks {
    pub fn new(file_id: &str) -> Self {
        Self {
            file_id: file_id.to_string(),
            view_url: drive_view_url(file_id),
            download_url: drive_download_url(file_id),
        }
    }
}

#[derive(Clone)]
pub struct DocumentSources {
    http: reqwest::Client,
    storage: Arc<dyn BlobStorage>,
    google_api_key: Option<String>,
}

impl DocumentSources {
    pub fn new(
        storage: Arc<dyn BlobStorage>,
        google_api_key: Option<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            storage,
            google_api_key,
        })
    }

    pub async fn fetch(&self, reference: &str) -> Result<Vec<u8>, SourceError> {
        match DocumentReference::parse(reference)? {
            DocumentReference::Storage(key) => self
                .storage
                .get_object(&key)
                .await
                .map_err(|err| SourceError::Storage(format!("{err:#}"))),
            DocumentReference::Drive(file_id) => self.fetch_drive_file(&file_id).await,
            DocumentReference::Http(url) => self.fetch_url(url).await,
        }
    }

    pub async fn fetch_drive_file(&self, file_id: &str) -> Result<Vec<u8>, SourceError> {
        let urls = drive_download_urls(file_id, self.google_api_key.as_deref());
        let attempts = urls.len();
        let mut last_error = SourceError::Empty;

        for (index, url) in urls.into_iter().enumerate() {
            debug!(file_id, attempt = index + 1, attempts, "downloading public drive file");
            match self.fetch_url(url).await {
                Ok(bytes) => {
                    info!(file_id, bytes = bytes.len(), "downloaded drive file");
                    return Ok(bytes);
                }
                Err(err) => {
                    warn!(
                        file_id,
                        attempt = index + 1,
                        error = %err,
                        "drive download attempt failed"
                    );
                    last_error = err;
                }
            }
        }

        Err(SourceError::Exhausted(last_error.to_string()))
    }

    async fn fetch_url(&self, url: Url) -> Result<Vec<u8>, SourceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| SourceError::Http(err.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SourceError::Http(format!("unexpected status {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| SourceError::Http(err.to_string()))?;
        if bytes.is_empty() {
            return Err(SourceError::Empty);
        }
        if looks_like_html(&bytes) {
            return Err(SourceError::HtmlPage);
        }
        Ok(bytes.to_vec())
    }
}
