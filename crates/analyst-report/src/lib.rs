//! Analyst report crate - structured impact reports and their exports.
//!
//! Renders a nested report payload as flat text, HTML or a document tree,
//! serializes the tree to `.docx`, and tracks the export dialog lifecycle.

pub mod docx;
pub mod error;
pub mod export;
pub mod formatter;

pub use docx::{DocumentSerializer, DocxSerializer};
pub use error::ReportError;
pub use export::{
    export, export_async, export_with, write_export, ExportDialog, ExportFormat, ExportResult,
    ExportState, ExportedFile, EXPORT_BASE_NAME,
};
pub use formatter::{display_value, DocNode, Report, ReportVisitor, TextRun, REPORT_TITLE};
