use crate::config::BackendConfig;
use crate::error::{Result, WorkflowError};
use crate::types::{ErrorBody, MaskRequest, MaskResponse, SelectedFile, UploadResponse};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::fs;

/// The redaction service: detection on upload, masking, and file retrieval.
pub trait PiiBackend {
    fn upload(&self, file: &SelectedFile) -> Result<UploadResponse>;
    fn mask(&self, request: &MaskRequest) -> Result<MaskResponse>;
    fn download_url(&self, masked_file_path: &str) -> String;
    fn fetch(&self, masked_file_path: &str) -> Result<Vec<u8>>;
}

pub struct HttpBackend {
    config: BackendConfig,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WorkflowError::Config(e.to_string()))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

fn read_document(file: &SelectedFile) -> Result<Vec<u8>> {
    fs::read(file.path()).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WorkflowError::Io(std::io::Error::new(
                e.kind(),
                format!("File not found: {}", file.path().display()),
            ))
        } else {
            WorkflowError::Io(e)
        }
    })
}

/// Body text of a failed response, preferring the service's own `error` field.
fn failure_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(err) = serde_json::from_str::<ErrorBody>(body) {
        return err.error;
    }
    let body = body.trim();
    if body.is_empty() {
        status.canonical_reason().unwrap_or("no response body").to_string()
    } else {
        body.to_string()
    }
}

fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        return Err(WorkflowError::Backend {
            status: status.as_u16(),
            message: failure_message(status, &body),
        });
    }
    if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
        return Err(WorkflowError::Rejected(err.error));
    }
    serde_json::from_str(&body).map_err(|e| WorkflowError::InvalidResponse(format!("{}: {}", what, e)))
}

impl PiiBackend for HttpBackend {
    fn upload(&self, file: &SelectedFile) -> Result<UploadResponse> {
        let bytes = read_document(file)?;
        let url = self.config.endpoint("upload");
        log::debug!("[upload] {} ({} bytes) -> {}", file.file_name, bytes.len(), url);

        let part = multipart::Part::bytes(bytes).file_name(file.file_name.clone());
        let form = multipart::Form::new().part("file", part);
        let response = self.client.post(&url).multipart(form).send()?;
        read_json(response, "upload")
    }

    fn mask(&self, request: &MaskRequest) -> Result<MaskResponse> {
        let url = self.config.endpoint("mask");
        log::debug!(
            "[mask] {} with {} edited field(s) -> {}",
            request.file_path,
            request.edited_pii_data.len(),
            url
        );
        let response = self.client.post(&url).json(request).send()?;
        read_json(response, "mask")
    }

    /// Each `/`-separated piece becomes one percent-encoded path segment.
    fn download_url(&self, masked_file_path: &str) -> String {
        let base = self.config.endpoint("download");
        let segments = masked_file_path.split('/').filter(|s| !s.is_empty());
        match Url::parse(&base) {
            Ok(mut url) => {
                if let Ok(mut path) = url.path_segments_mut() {
                    path.pop_if_empty().extend(segments);
                }
                url.to_string()
            }
            Err(_) => format!("{}/{}", base, segments.collect::<Vec<_>>().join("/")),
        }
    }

    fn fetch(&self, masked_file_path: &str) -> Result<Vec<u8>> {
        let url = self.download_url(masked_file_path);
        log::debug!("[download] GET {}", url);
        let response = self.client.get(&url).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(WorkflowError::Backend {
                status: status.as_u16(),
                message: failure_message(status, &body),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}
