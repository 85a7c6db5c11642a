//! Session state for one redaction run and the transitions between stages.
//!
//! ```text
//! Idle --select--> FileSelected --verify--> PiiVerified --mask--> Masked
//!   ^                   ^                                           |
//!   +---- select (from any stage) resets downstream data -----------+
//! ```

use crate::action::PiiAction;
use crate::backend::PiiBackend;
use crate::error::{Result, WorkflowError};
use crate::types::{DetectedField, MaskRequest, PiiMap, SelectedFile};

/// What the service returned for the uploaded file plus the user's edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub file: SelectedFile,
    pub file_path: String,
    pub pii: PiiMap,
    pub edited: PiiMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Idle,
    FileSelected(SelectedFile),
    PiiVerified(Verified),
    Masked {
        verified: Verified,
        masked_file_path: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Idle,
    FileSelected,
    PiiVerified,
    Masked,
}

impl Stage {
    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Idle => StageKind::Idle,
            Stage::FileSelected(_) => StageKind::FileSelected,
            Stage::PiiVerified(_) => StageKind::PiiVerified,
            Stage::Masked { .. } => StageKind::Masked,
        }
    }

    fn file(&self) -> Option<&SelectedFile> {
        match self {
            Stage::Idle => None,
            Stage::FileSelected(file) => Some(file),
            Stage::PiiVerified(v) => Some(&v.file),
            Stage::Masked { verified, .. } => Some(&verified.file),
        }
    }

    fn verified(&self) -> Option<&Verified> {
        match self {
            Stage::PiiVerified(v) => Some(v),
            Stage::Masked { verified, .. } => Some(verified),
            _ => None,
        }
    }

    fn verified_mut(&mut self) -> Option<&mut Verified> {
        match self {
            Stage::PiiVerified(v) => Some(v),
            Stage::Masked { verified, .. } => Some(verified),
            _ => None,
        }
    }
}

/// Drives one session against a redaction service.
pub struct Session<B: PiiBackend> {
    backend: B,
    stage: Stage,
}

impl<B: PiiBackend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            stage: Stage::Idle,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn stage_kind(&self) -> StageKind {
        self.stage.kind()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.stage.file()
    }

    pub fn file_path(&self) -> Option<&str> {
        self.stage.verified().map(|v| v.file_path.as_str())
    }

    pub fn pii(&self) -> Option<&PiiMap> {
        self.stage.verified().map(|v| &v.pii)
    }

    pub fn edited(&self) -> Option<&PiiMap> {
        self.stage.verified().map(|v| &v.edited)
    }

    pub fn masked_file_path(&self) -> Option<&str> {
        match &self.stage {
            Stage::Masked {
                masked_file_path, ..
            } => Some(masked_file_path.as_str()),
            _ => None,
        }
    }

    /// Detected fields sorted by key, with the edit chosen so far (if any).
    pub fn detected_fields(&self) -> Vec<DetectedField> {
        let Some(v) = self.stage.verified() else {
            return Vec::new();
        };
        let mut fields: Vec<DetectedField> = v
            .pii
            .iter()
            .map(|(key, value)| DetectedField {
                key: key.clone(),
                value: value.clone(),
                edited: v.edited.get(key).cloned(),
            })
            .collect();
        fields.sort_by(|a, b| a.key.cmp(&b.key));
        fields
    }

    /// Choose a document. Always lands in `FileSelected`, dropping everything downstream.
    pub fn select_file(&mut self, file: SelectedFile) {
        log::info!("Selected {}", file.path().display());
        if !file.has_supported_extension() {
            log::warn!(
                "{} is not .txt, .docx or .pdf; the service will probably reject it",
                file.file_name
            );
        }
        self.stage = Stage::FileSelected(file);
    }

    /// Upload the selected file for detection.
    pub fn request_verification(&mut self) -> Result<&PiiMap> {
        let file = self.stage.file().cloned().ok_or(WorkflowError::NoFileSelected)?;
        let response = self.backend.upload(&file).map_err(|e| {
            log::error!("Error uploading file {}: {}", file.file_name, e);
            e
        })?;
        log::info!(
            "Detected {} PII field(s) in {}",
            response.pii_list.len(),
            file.file_name
        );
        self.stage = Stage::PiiVerified(Verified {
            file,
            file_path: response.file_path,
            pii: response.pii_list,
            edited: PiiMap::new(),
        });
        self.pii().ok_or(WorkflowError::NotVerified)
    }

    /// Record the action for one detected field. Re-choosing overwrites.
    pub fn choose_action(&mut self, key: &str, action: PiiAction) -> Result<&str> {
        let verified = self.stage.verified_mut().ok_or(WorkflowError::NotVerified)?;
        let raw = verified
            .pii
            .get(key)
            .ok_or_else(|| WorkflowError::UnknownField(key.to_string()))?;
        let value = action.apply(raw);
        log::debug!("{} -> {}", key, action);
        let slot = verified.edited.entry(key.to_string()).or_default();
        *slot = value;
        Ok(slot.as_str())
    }

    /// Undo a choice so the field is not sent to the service.
    pub fn clear_action(&mut self, key: &str) -> Result<()> {
        let verified = self.stage.verified_mut().ok_or(WorkflowError::NotVerified)?;
        if !verified.pii.contains_key(key) {
            return Err(WorkflowError::UnknownField(key.to_string()));
        }
        verified.edited.remove(key);
        Ok(())
    }

    /// Apply the same action to every detected field.
    pub fn choose_action_for_all(&mut self, action: PiiAction) -> Result<usize> {
        let verified = self.stage.verified_mut().ok_or(WorkflowError::NotVerified)?;
        for (key, raw) in &verified.pii {
            verified.edited.insert(key.clone(), action.apply(raw));
        }
        Ok(verified.edited.len())
    }

    /// Ask the service to write the masked document.
    pub fn request_masking(&mut self) -> Result<&str> {
        let verified = self.stage.verified().ok_or(WorkflowError::NotVerified)?;
        if verified.edited.is_empty() {
            return Err(WorkflowError::NoActionsChosen);
        }
        let request = MaskRequest {
            file_path: verified.file_path.clone(),
            edited_pii_data: verified.edited.clone(),
        };
        let response = self.backend.mask(&request).map_err(|e| {
            log::error!("Error masking PII in {}: {}", request.file_path, e);
            e
        })?;
        log::info!("Masked file ready: {}", response.masked_file_path);

        let verified = match std::mem::take(&mut self.stage) {
            Stage::PiiVerified(v) => v,
            Stage::Masked { verified, .. } => verified,
            other => {
                self.stage = other;
                return Err(WorkflowError::NotVerified);
            }
        };
        self.stage = Stage::Masked {
            verified,
            masked_file_path: response.masked_file_path,
        };
        self.masked_file_path().ok_or(WorkflowError::NothingToDownload)
    }

    /// Where the user agent should go to retrieve the masked file.
    pub fn download_url(&self) -> Result<String> {
        let masked = self.masked_file_path().ok_or(WorkflowError::NothingToDownload)?;
        Ok(self.backend.download_url(masked))
    }

    /// Fetch the masked file contents.
    pub fn download_bytes(&self) -> Result<Vec<u8>> {
        let masked = self.masked_file_path().ok_or(WorkflowError::NothingToDownload)?;
        self.backend.fetch(masked).map_err(|e| {
            log::error!("Error downloading {}: {}", masked, e);
            e
        })
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use crate::types::{MaskResponse, UploadResponse};
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Upload(String),
        Mask(MaskRequest),
        Fetch(String),
    }

    /// Records calls and answers from queued results.
    #[derive(Default)]
    pub struct FakeBackend {
        pub calls: RefCell<Vec<Call>>,
        pub uploads: RefCell<Vec<Result<UploadResponse>>>,
        pub masks: RefCell<Vec<Result<MaskResponse>>>,
        pub files: RefCell<Vec<Result<Vec<u8>>>>,
    }

    impl FakeBackend {
        pub fn with_upload(self, pii: &[(&str, &str)], file_path: &str) -> Self {
            self.uploads.borrow_mut().push(Ok(UploadResponse {
                pii_list: pii
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                file_path: file_path.to_string(),
            }));
            self
        }

        pub fn with_upload_err(self, err: WorkflowError) -> Self {
            self.uploads.borrow_mut().push(Err(err));
            self
        }

        pub fn with_mask(self, masked_file_path: &str) -> Self {
            self.masks.borrow_mut().push(Ok(MaskResponse {
                masked_file_path: masked_file_path.to_string(),
            }));
            self
        }

        pub fn with_mask_err(self, err: WorkflowError) -> Self {
            self.masks.borrow_mut().push(Err(err));
            self
        }

        pub fn with_file(self, bytes: &[u8]) -> Self {
            self.files.borrow_mut().push(Ok(bytes.to_vec()));
            self
        }

        pub fn call_count(&self) -> usize {
            self.calls.borrow().len()
        }
    }

    fn next<T>(queue: &RefCell<Vec<Result<T>>>) -> Result<T> {
        let mut q = queue.borrow_mut();
        if q.is_empty() {
            return Err(WorkflowError::Network("no fake response queued".to_string()));
        }
        q.remove(0)
    }

    impl PiiBackend for FakeBackend {
        fn upload(&self, file: &SelectedFile) -> Result<UploadResponse> {
            self.calls.borrow_mut().push(Call::Upload(file.file_name.clone()));
            next(&self.uploads)
        }

        fn mask(&self, request: &MaskRequest) -> Result<MaskResponse> {
            self.calls.borrow_mut().push(Call::Mask(request.clone()));
            next(&self.masks)
        }

        fn download_url(&self, masked_file_path: &str) -> String {
            format!("/download/{}", masked_file_path)
        }

        fn fetch(&self, masked_file_path: &str) -> Result<Vec<u8>> {
            self.calls.borrow_mut().push(Call::Fetch(masked_file_path.to_string()));
            next(&self.files)
        }
    }
}
