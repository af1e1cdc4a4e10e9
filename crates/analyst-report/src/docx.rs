//! Word-processor serialization of a report document tree.

use std::io::Cursor;

use docx_rs::{Docx, Paragraph, Run, Style, StyleType};

use crate::error::ReportError;
use crate::formatter::DocNode;

/// Turns a document tree into a binary document.
pub trait DocumentSerializer: Send + Sync {
    fn serialize(&self, nodes: &[DocNode]) -> Result<Vec<u8>, ReportError>;
}

/// Serializes to the Office Open XML (`.docx`) format.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxSerializer;

impl DocxSerializer {
    pub fn new() -> Self {
        Self
    }

    fn heading_styles(docx: Docx) -> Docx {
        // (style id, display name, half-point size)
        let headings = [
            ("Heading1", "Heading 1", 36),
            ("Heading2", "Heading 2", 28),
            ("Heading3", "Heading 3", 24),
        ];
        headings.into_iter().fold(docx, |docx, (id, name, size)| {
            docx.add_style(
                Style::new(id, StyleType::Paragraph)
                    .name(name)
                    .size(size)
                    .bold(),
            )
        })
    }

    fn paragraph(node: &DocNode) -> Paragraph {
        match node {
            DocNode::Heading { level, text } => Paragraph::new()
                .style(&format!("Heading{}", level))
                .add_run(Run::new().add_text(text.as_str()).bold()),
            DocNode::Paragraph { runs } => {
                runs.iter().fold(Paragraph::new(), |paragraph, run| {
                    let mut r = Run::new().add_text(run.text.as_str());
                    if run.bold {
                        r = r.bold();
                    }
                    paragraph.add_run(r)
                })
            }
        }
    }
}

impl DocumentSerializer for DocxSerializer {
    fn serialize(&self, nodes: &[DocNode]) -> Result<Vec<u8>, ReportError> {
        let docx = nodes
            .iter()
            .fold(Self::heading_styles(Docx::new()), |docx, node| {
                docx.add_paragraph(Self::paragraph(node))
            });

        let mut cursor = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut cursor)
            .map_err(|e| ReportError::Serialization(e.to_string()))?;

        let bytes = cursor.into_inner();
        tracing::debug!(nodes = nodes.len(), bytes = bytes.len(), "Serialized docx");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docx_is_zip_container() {
        let nodes = vec![
            DocNode::heading(1, "System Impact Analysis Report"),
            DocNode::heading(2, "Summary"),
            DocNode::labelled("Risk", "Low"),
            DocNode::plain("Free text"),
        ];
        let bytes = DocxSerializer::new().serialize(&nodes).unwrap();
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_empty_tree_still_serializes() {
        let bytes = DocxSerializer.serialize(&[]).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
