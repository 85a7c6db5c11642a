use crate::action::{parse_choice, PiiAction};
use crate::backend::PiiBackend;
use crate::error::{Result, WorkflowError};
use crate::types::{DetectedField, SelectedFile};
use crate::workflow::{Session, StageKind};
use serde::Serialize;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// The one session the command handlers work on.
pub struct AppState<B: PiiBackend> {
    pub session: Mutex<Session<B>>,
}

impl<B: PiiBackend> AppState<B> {
    pub fn new(backend: B) -> Self {
        Self {
            session: Mutex::new(Session::new(backend)),
        }
    }

    pub fn lock(&self) -> std::result::Result<MutexGuard<'_, Session<B>>, String> {
        self.session.lock().map_err(|e| e.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub file_name: String,
    pub file_path: String,
    pub fields: Vec<DetectedField>,
}

/// How the user picked actions for the redact command.
#[derive(Debug, Clone, Default)]
pub struct ActionPlan {
    /// Applied first, to every detected field.
    pub all: Option<PiiAction>,
    /// `None` clears the field.
    pub per_field: Vec<(String, Option<PiiAction>)>,
}

impl ActionPlan {
    /// True when applying the plan could not choose an action for any field.
    pub fn is_empty(&self) -> bool {
        self.all.is_none() && self.per_field.iter().all(|(_, action)| action.is_none())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    /// Hand the download URL to the system's default handler.
    Open,
    /// Fetch the file and write it here. An existing directory, or a path ending in a
    /// separator, gets the service's file name.
    Save(PathBuf),
    /// Fetch the file into this directory, creating it if needed.
    SaveInDir(PathBuf),
}

#[derive(Debug, Serialize)]
pub struct RedactOutcome {
    pub masked_file_path: String,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
}

/// Parse `KEY=ACTION`. The last `=` splits, so keys may contain `=`.
pub fn parse_assignment(s: &str) -> Result<(String, Option<PiiAction>)> {
    let (key, action) = s
        .rsplit_once('=')
        .ok_or_else(|| WorkflowError::InvalidAction(format!("expected KEY=ACTION, got '{}'", s)))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(WorkflowError::InvalidAction(format!("missing field name in '{}'", s)));
    }
    Ok((key.to_string(), parse_choice(action)?))
}

pub fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn report<B: PiiBackend>(session: &Session<B>) -> ScanReport {
    ScanReport {
        file_name: session
            .selected_file()
            .map(|f| f.file_name.clone())
            .unwrap_or_default(),
        file_path: session.file_path().unwrap_or_default().to_string(),
        fields: session.detected_fields(),
    }
}

/// Select the document and run detection on it.
pub fn scan<B: PiiBackend>(session: &mut Session<B>, document: &Path) -> Result<ScanReport> {
    session.select_file(SelectedFile::new(document));
    session.request_verification()?;
    Ok(report(session))
}

pub fn select_file<B: PiiBackend>(state: &AppState<B>, file_path: String) -> std::result::Result<StageKind, String> {
    let mut session = state.lock()?;
    session.select_file(SelectedFile::new(file_path));
    Ok(session.stage_kind())
}

pub fn verify_pii<B: PiiBackend>(state: &AppState<B>) -> std::result::Result<ScanReport, String> {
    let mut session = state.lock()?;
    session.request_verification().map_err(|e| e.to_string())?;
    Ok(report(&*session))
}

/// `action` is redact/delete/mask; empty or `none` removes the field from the edits.
pub fn choose_action<B: PiiBackend>(
    state: &AppState<B>,
    key: String,
    action: String,
) -> std::result::Result<Option<String>, String> {
    let mut session = state.lock()?;
    match parse_choice(&action).map_err(|e| e.to_string())? {
        Some(action) => session
            .choose_action(&key, action)
            .map(|v| Some(v.to_string()))
            .map_err(|e| e.to_string()),
        None => session
            .clear_action(&key)
            .map(|_| None)
            .map_err(|e| e.to_string()),
    }
}

pub fn apply_changes<B: PiiBackend>(state: &AppState<B>) -> std::result::Result<String, String> {
    let mut session = state.lock()?;
    session
        .request_masking()
        .map(str::to_string)
        .map_err(|e| e.to_string())
}

pub fn get_download_url<B: PiiBackend>(state: &AppState<B>) -> std::result::Result<String, String> {
    state.lock()?.download_url().map_err(|e| e.to_string())
}

pub fn download_masked_file<B: PiiBackend>(
    state: &AppState<B>,
    dest: String,
) -> std::result::Result<String, String> {
    let session = state.lock()?;
    let path = save_download(&*session, Path::new(&dest), false).map_err(|e| e.to_string())?;
    path.to_str()
        .map(String::from)
        .ok_or_else(|| "Invalid path".to_string())
}

pub fn apply_plan<B: PiiBackend>(session: &mut Session<B>, plan: &ActionPlan) -> Result<()> {
    if let Some(action) = plan.all {
        session.choose_action_for_all(action)?;
    }
    for (key, action) in &plan.per_field {
        match action {
            Some(action) => {
                session.choose_action(key, *action)?;
            }
            None => session.clear_action(key)?,
        }
    }
    Ok(())
}

/// Ask for an action per detected field. Empty input keeps whatever is already chosen,
/// `none` clears it, EOF stops asking.
pub fn prompt_actions<B: PiiBackend, R: BufRead, W: Write>(
    session: &mut Session<B>,
    mut input: R,
    mut output: W,
) -> Result<usize> {
    let fields = session.detected_fields();
    if fields.is_empty() {
        writeln!(output, "No PII detected.")?;
        return Ok(0);
    }
    writeln!(output, "Detected PII:")?;
    let mut chosen = 0;
    for field in &fields {
        loop {
            match &field.edited {
                Some(current) => write!(
                    output,
                    "  {} - {} (now {:?}) [redact/delete/mask/none, empty to keep]: ",
                    field.key, field.value, current
                )?,
                None => write!(
                    output,
                    "  {} - {} [redact/delete/mask, empty to skip]: ",
                    field.key, field.value
                )?,
            }
            output.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(chosen);
            }
            if line.trim().is_empty() {
                break;
            }
            match parse_choice(&line) {
                Ok(Some(action)) => {
                    let edited = session.choose_action(&field.key, action)?;
                    writeln!(output, "    -> {:?}", edited)?;
                    chosen += 1;
                    break;
                }
                Ok(None) => {
                    session.clear_action(&field.key)?;
                    writeln!(output, "    -> not sent")?;
                    break;
                }
                Err(e) => writeln!(output, "    {}", e)?,
            }
        }
    }
    Ok(chosen)
}

fn names_directory(dest: &Path) -> bool {
    dest.is_dir()
        || dest
            .to_str()
            .and_then(|s| s.chars().last())
            .map(std::path::is_separator)
            .unwrap_or(false)
}

fn save_path_for(dest: &Path, masked_file_path: &str, into_dir: bool) -> PathBuf {
    if into_dir || names_directory(dest) {
        let name = Path::new(masked_file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("masked_document");
        dest.join(name)
    } else {
        dest.to_path_buf()
    }
}

pub fn save_download<B: PiiBackend>(session: &Session<B>, dest: &Path, into_dir: bool) -> Result<PathBuf> {
    let masked = session
        .masked_file_path()
        .ok_or(WorkflowError::NothingToDownload)?;
    let bytes = session.download_bytes()?;
    let path = save_path_for(dest, masked, into_dir);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, &bytes)?;
    log::info!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

pub fn open_download<B: PiiBackend>(session: &Session<B>) -> Result<String> {
    let url = session.download_url()?;
    opener::open(&url).map_err(|e| WorkflowError::Io(std::io::Error::other(e)))?;
    Ok(url)
}

/// Mask with the chosen actions and deliver the result.
pub fn finish<B: PiiBackend>(session: &mut Session<B>, target: &DownloadTarget) -> Result<RedactOutcome> {
    let masked_file_path = session.request_masking()?.to_string();
    let (download_url, saved_to) = match target {
        DownloadTarget::Open => (open_download(session)?, None),
        DownloadTarget::Save(dest) => (session.download_url()?, Some(save_download(session, dest, false)?)),
        DownloadTarget::SaveInDir(dir) => (session.download_url()?, Some(save_download(session, dir, true)?)),
    };
    Ok(RedactOutcome {
        masked_file_path,
        download_url,
        saved_to,
    })
}
