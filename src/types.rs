use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Extensions the redaction service knows how to read.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "docx", "pdf"];

/// Document chosen by the user. Bytes are read only when uploading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl SelectedFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        Self { path, file_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_supported_extension(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| SUPPORTED_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

/// Field key -> value. Used both for detected raw values and for edited values.
pub type PiiMap = HashMap<String, String>;

/// Response of `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub pii_list: PiiMap,
    pub file_path: String,
}

/// Body of `POST /mask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskRequest {
    pub file_path: String,
    pub edited_pii_data: PiiMap,
}

/// Response of `POST /mask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskResponse {
    pub masked_file_path: String,
}

/// The service answers some failures with a 200 and `{"error": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// One detected field as shown to the user (sorted by key for stable output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedField {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edited: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_file_takes_name_from_path() {
        let file = SelectedFile::new("/tmp/docs/contract.PDF");
        assert_eq!(file.file_name, "contract.PDF");
        assert!(file.has_supported_extension());
        assert!(!SelectedFile::new("notes.md").has_supported_extension());
        assert!(!SelectedFile::new("README").has_supported_extension());
    }

    #[test]
    fn upload_response_decodes() {
        let json = r#"{"pii_list": {"John Doe": "PERSON"}, "file_path": "uploads/a.txt"}"#;
        let resp: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.file_path, "uploads/a.txt");
        assert_eq!(resp.pii_list.get("John Doe").map(String::as_str), Some("PERSON"));
    }

    #[test]
    fn mask_request_uses_backend_field_names() {
        let mut edited = PiiMap::new();
        edited.insert("name".to_string(), "****".to_string());
        let req = MaskRequest {
            file_path: "tmp/doc1".to_string(),
            edited_pii_data: edited,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["file_path"], "tmp/doc1");
        assert_eq!(value["edited_pii_data"]["name"], "****");
    }

    #[test]
    fn error_body_is_not_an_upload_response() {
        let json = r#"{"error": "Unsupported file format"}"#;
        assert!(serde_json::from_str::<UploadResponse>(json).is_err());
        let err: ErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(err.error, "Unsupported file format");
    }
}
