use std::path::PathBuf;

use crate::presets::PresetKind;

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("unknown {kind} preset '{name}'. Available: {available}")]
    UnknownPreset {
        kind: PresetKind,
        name: String,
        available: String,
    },

    #[error("{kind} preset '{name}' is not a valid regular expression: {reason}")]
    InvalidPattern {
        kind: PresetKind,
        name: String,
        reason: String,
    },

    #[error("failed to load presets from {path}: {reason}")]
    PresetLoad { path: PathBuf, reason: String },

    #[error("invalid preset: {0}")]
    InvalidPreset(String),

    #[error("embedding table images requires an image directory (--images-dir)")]
    MissingImageDir,

    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    #[error("{tool} not found. {hint}")]
    ToolNotFound { tool: &'static str, hint: &'static str },

    #[error("{tool} failed with exit code {code}: {stderr}")]
    ToolFailed {
        tool: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("pattern matching failed: {0}")]
    Matching(String),

    #[error("crop region ({x0}, {top}, {x1}, {bottom}) lies outside page {page} ({width} x {height})")]
    InvalidCrop {
        page: u32,
        x0: f64,
        top: f64,
        x1: f64,
        bottom: f64,
        width: f64,
        height: f64,
    },

    #[error("PDF parse error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("spreadsheet write error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("spreadsheet read error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    /// Configuration errors have no sensible fallback and abort the whole run.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ScrapeError::UnknownPreset { .. }
                | ScrapeError::InvalidPattern { .. }
                | ScrapeError::PresetLoad { .. }
                | ScrapeError::InvalidPreset(_)
                | ScrapeError::MissingImageDir
        )
    }

    /// Errors that would recur for every remaining document: configuration
    /// errors and a missing external tool.
    pub fn aborts_batch(&self) -> bool {
        self.is_configuration() || matches!(self, ScrapeError::ToolNotFound { .. })
    }
}
