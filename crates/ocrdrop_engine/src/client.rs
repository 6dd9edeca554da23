use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use url::Url;

use crate::{ApiError, CacheClearResponse, LogRecord, ProcessStatusBody, ServerStatus, SubmitError};

const PDF_MIME: &str = "application/pdf";
const UPLOAD_FIELD: &str = "files[]";

/// A file to upload, as handed over by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// The server surface the controller talks to. Picked once at startup.
#[async_trait::async_trait]
pub trait OcrBackend: Send + Sync {
    /// Uploads the batch and returns the opaque process id.
    async fn submit(&self, files: &[UploadFile]) -> Result<String, SubmitError>;

    async fn process_status(&self, process_id: &str) -> Result<ProcessStatusBody, ApiError>;

    async fn status(&self) -> Result<ServerStatus, ApiError>;

    async fn logs(&self) -> Result<Vec<LogRecord>, ApiError>;

    async fn cancel(&self, process_id: &str) -> Result<(), ApiError>;

    async fn clear_cache(&self) -> Result<CacheClearResponse, ApiError>;

    /// Streams the result archive into `out` and returns the byte count.
    async fn download(
        &self,
        url: &str,
        out: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, ApiError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Parses the server base URL and makes sure it ends with `/` so endpoint
/// paths are appended rather than replacing the last segment.
fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let mut url =
        Url::parse(raw.trim()).map_err(|err| ApiError::InvalidUrl(format!("{raw}: {err}")))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(raw.to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitAck {
    #[serde(default)]
    process_id: Option<serde_json::Value>,
}

/// Talks to a real server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(settings: ServerSettings) -> Result<Self, ApiError> {
        // Job endpoints carry no request timeout: uploads and OCR runs can be long.
        let base_url = parse_base_url(&settings.base_url)?;
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(ApiError::transport)?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Resolves a server-provided URL, which may be relative to the base.
    fn resolve(&self, url: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(url)
            .map_err(|err| ApiError::InvalidUrl(format!("{url}: {err}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        engine_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ApiError::transport)?;
        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::transport)?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        serde_json::from_slice(&body).map_err(|err| ApiError::Malformed(err.to_string()))
    }

    /// Each file is streamed from disk while the request is sent.
    async fn build_form(files: &[UploadFile]) -> Result<Form, SubmitError> {
        let mut form = Form::new();
        for file in files {
            let unreadable = |err: std::io::Error| SubmitError::Unreadable {
                name: file.name.clone(),
                message: err.to_string(),
            };
            let handle = tokio::fs::File::open(&file.path).await.map_err(unreadable)?;
            let length = handle.metadata().await.map_err(unreadable)?.len();
            let body = Body::wrap_stream(ReaderStream::new(handle));
            let part = Part::stream_with_length(body, length)
                .file_name(file.name.clone())
                .mime_str(PDF_MIME)
                .map_err(|err| SubmitError::Transport(err.to_string()))?;
            form = form.part(UPLOAD_FIELD, part);
        }
        Ok(form)
    }
}

#[async_trait::async_trait]
impl OcrBackend for HttpBackend {
    async fn submit(&self, files: &[UploadFile]) -> Result<String, SubmitError> {
        let url = self
            .endpoint(&["process"])
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        let form = Self::build_form(files).await?;
        engine_info!("POST {} with {} file(s)", url, files.len());

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        let status = response.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(SubmitError::PayloadTooLarge);
        }
        let body = response
            .bytes()
            .await
            .map_err(|err| SubmitError::Transport(err.to_string()))?;
        if !status.is_success() {
            return Err(SubmitError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let ack: SubmitAck =
            serde_json::from_slice(&body).map_err(|_| SubmitError::MalformedResponse)?;
        match ack.process_id {
            Some(serde_json::Value::String(id)) if !id.is_empty() => Ok(id),
            Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
            _ => Err(SubmitError::MalformedResponse),
        }
    }

    async fn process_status(&self, process_id: &str) -> Result<ProcessStatusBody, ApiError> {
        let url = self.endpoint(&["process-status", process_id])?;
        self.get_json(url).await
    }

    async fn status(&self) -> Result<ServerStatus, ApiError> {
        let url = self.endpoint(&["status"])?;
        self.get_json(url).await
    }

    async fn logs(&self) -> Result<Vec<LogRecord>, ApiError> {
        let url = self.endpoint(&["logs"])?;
        self.get_json(url).await
    }

    async fn cancel(&self, process_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["cancel-process", process_id])?;
        engine_info!("POST {}", url);
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(ApiError::transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn clear_cache(&self) -> Result<CacheClearResponse, ApiError> {
        let url = self.endpoint(&["clear-cache"])?;
        self.get_json(url).await
    }

    async fn download(
        &self,
        url: &str,
        out: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, ApiError> {
        let url = self.resolve(url)?;
        engine_info!("GET {} (archive)", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ApiError::transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let mut written = 0_u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(ApiError::transport)?;
            out.write_all(&chunk)
                .await
                .map_err(|err| ApiError::Io(err.to_string()))?;
            written += chunk.len() as u64;
        }
        out.flush()
            .await
            .map_err(|err| ApiError::Io(err.to_string()))?;
        engine_debug!("Archive download finished ({} bytes)", written);
        Ok(written)
    }
}

fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error)
        .filter(|message| !message.is_empty())
}
