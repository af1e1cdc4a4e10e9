//! Report export: file formats, byte production and the export dialog.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::docx::{DocumentSerializer, DocxSerializer};
use crate::error::ReportError;
use crate::formatter::Report;

/// Base name shared by every exported file.
pub const EXPORT_BASE_NAME: &str = "System_Impact_Analysis_Report";

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Plain UTF-8 text.
    Text,
    /// Printable HTML document.
    Html,
    /// Office Open XML word document.
    Docx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Text, ExportFormat::Html, ExportFormat::Docx];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Html => "html",
            ExportFormat::Docx => "docx",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain; charset=utf-8",
            ExportFormat::Html => "text/html; charset=utf-8",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", EXPORT_BASE_NAME, self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(ExportFormat::Text),
            "html" | "htm" | "pdf" => Ok(ExportFormat::Html),
            "docx" | "word" => Ok(ExportFormat::Docx),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

/// A rendered export ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

/// Render the stored report in `format` with the default docx serializer.
pub fn export(report: Option<&Value>, format: ExportFormat) -> Result<ExportedFile, ReportError> {
    export_with(report, format, &DocxSerializer)
}

/// Render the stored report in `format`.
///
/// A missing report fails with [`ReportError::NoReportData`] for every format.
pub fn export_with(
    report: Option<&Value>,
    format: ExportFormat,
    serializer: &dyn DocumentSerializer,
) -> Result<ExportedFile, ReportError> {
    let report = Report::from_stored(report)?;
    let bytes = match format {
        ExportFormat::Text => report.to_text().into_bytes(),
        ExportFormat::Html => report.to_html_document().into_bytes(),
        ExportFormat::Docx => serializer.serialize(&report.to_doc_tree())?,
    };

    tracing::info!(format = %format, bytes = bytes.len(), "Report exported");

    Ok(ExportedFile {
        file_name: format.file_name(),
        mime: format.mime(),
        bytes,
    })
}

/// Export on the blocking pool so large reports do not stall the runtime.
pub async fn export_async(
    report: Option<Value>,
    format: ExportFormat,
) -> Result<ExportedFile, ReportError> {
    tokio::task::spawn_blocking(move || export(report.as_ref(), format))
        .await
        .map_err(|e| ReportError::Serialization(format!("export task failed: {}", e)))?
}

/// Write an exported file into `dir`, creating the directory if needed.
pub fn write_export(file: &ExportedFile, dir: &Path) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(&file.file_name);
    std::fs::write(&path, &file.bytes)?;
    tracing::info!(path = %path.display(), "Export written");
    Ok(path)
}

// =============================================================================
// Export dialog
// =============================================================================

/// Outcome shown once a download finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportResult {
    Success(String),
    Error(String),
}

/// Dialog lifecycle: Closed -> Selecting -> Downloading -> Finished -> Closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    Closed,
    Selecting,
    Downloading(ExportFormat),
    Finished(ExportResult),
}

impl ExportState {
    fn name(&self) -> &'static str {
        match self {
            ExportState::Closed => "closed",
            ExportState::Selecting => "selecting",
            ExportState::Downloading(_) => "downloading",
            ExportState::Finished(_) => "finished",
        }
    }
}

/// Export dialog state machine.
///
/// Only one download may be in progress at a time, and a download cannot
/// start without a report. Dismissing is always allowed; a download that
/// finishes after dismissal is dropped by [`ExportDialog::finish`].
#[derive(Debug, Clone)]
pub struct ExportDialog {
    state: ExportState,
    has_report: bool,
}

impl Default for ExportDialog {
    fn default() -> Self {
        Self {
            state: ExportState::Closed,
            has_report: false,
        }
    }
}

impl ExportDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    pub fn has_report(&self) -> bool {
        self.has_report
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, ExportState::Downloading(_))
    }

    /// Open the format chooser. Reopening while idle refreshes report availability.
    pub fn open(&mut self, has_report: bool) -> Result<(), ReportError> {
        match self.state {
            ExportState::Downloading(_) => Err(ReportError::ExportBusy),
            _ => {
                self.has_report = has_report;
                self.state = ExportState::Selecting;
                Ok(())
            }
        }
    }

    /// Start downloading `format`.
    pub fn begin(&mut self, format: ExportFormat) -> Result<(), ReportError> {
        match self.state {
            ExportState::Selecting | ExportState::Finished(_) if !self.has_report => {
                Err(ReportError::NoReportData)
            }
            ExportState::Selecting | ExportState::Finished(_) => {
                self.state = ExportState::Downloading(format);
                Ok(())
            }
            ExportState::Downloading(_) => Err(ReportError::ExportBusy),
            ref other => Err(ReportError::InvalidTransition {
                from: other.name(),
                to: "downloading",
            }),
        }
    }

    /// Record the result of the running download.
    pub fn finish(&mut self, result: ExportResult) -> Result<(), ReportError> {
        match self.state {
            ExportState::Downloading(_) => {
                self.state = ExportState::Finished(result);
                Ok(())
            }
            ref other => Err(ReportError::InvalidTransition {
                from: other.name(),
                to: "finished",
            }),
        }
    }

    /// Close the dialog from any state.
    pub fn dismiss(&mut self) {
        self.state = ExportState::Closed;
    }
}
