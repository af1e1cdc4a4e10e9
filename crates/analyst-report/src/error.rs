//! Error types for report formatting and export.

/// Errors from the report formatter and exporter.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no report data available")]
    NoReportData,
    #[error("report payload must be an object")]
    InvalidPayload,
    #[error("document serialization failed: {0}")]
    Serialization(String),
    #[error("an export is already in progress")]
    ExportBusy,
    #[error("invalid export transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("unknown export format: {0}")]
    UnknownFormat(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
