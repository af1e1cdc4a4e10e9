//! Recursive report rendering.
//!
//! A report is a tree of named sections whose bodies are scalars or nested
//! objects of any depth. [`Report::walk`] performs the traversal once and
//! drives a [`ReportVisitor`]; the text, HTML and document-tree renderers are
//! visitors over that walk.

use serde_json::{Map, Value};

use crate::error::ReportError;

/// Name of the root object inside `document_payload`.
pub const REPORT_TITLE: &str = "System Impact Analysis Report";

/// Placeholder for missing or empty values.
pub const MISSING_VALUE: &str = "N/A";

// =============================================================================
// Traversal
// =============================================================================

/// Callbacks invoked by [`Report::walk`] in document order.
pub trait ReportVisitor {
    /// A top-level section starts. `index` is its position.
    fn begin_section(&mut self, name: &str, index: usize);

    /// A section whose body is a single value.
    fn section_value(&mut self, value: &str);

    /// A nested object starts; its entries follow at `depth + 1`.
    fn group(&mut self, key: &str, depth: usize);

    /// A `key: value` leaf.
    fn leaf(&mut self, key: &str, value: &str, depth: usize);
}

/// Borrowed view over a report payload.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    sections: &'a Map<String, Value>,
}

impl<'a> Report<'a> {
    /// Build a view over a stored `document_payload`.
    ///
    /// The sections are read from the `"System Impact Analysis Report"`
    /// object when present, otherwise from the payload itself.
    pub fn from_payload(payload: &'a Value) -> Result<Self, ReportError> {
        let root = payload.as_object().ok_or(ReportError::InvalidPayload)?;
        let sections = match root.get(REPORT_TITLE) {
            Some(Value::Object(inner)) => inner,
            _ => root,
        };
        Ok(Self { sections })
    }

    /// Like [`Report::from_payload`], treating a missing payload as an error.
    pub fn from_stored(payload: Option<&'a Value>) -> Result<Self, ReportError> {
        Self::from_payload(payload.ok_or(ReportError::NoReportData)?)
    }

    /// Section names in payload order.
    pub fn section_names(&self) -> impl Iterator<Item = &'a str> {
        self.sections.keys().map(String::as_str)
    }

    /// Walk every section in order.
    pub fn walk<V: ReportVisitor>(&self, visitor: &mut V) {
        for (index, (name, body)) in self.sections.iter().enumerate() {
            visitor.begin_section(name, index);
            match body {
                Value::Object(entries) if !entries.is_empty() => {
                    walk_entries(entries, 0, visitor)
                }
                Value::Array(items) if items.iter().any(Value::is_object) => {
                    walk_items(name, items, 0, visitor)
                }
                other => visitor.section_value(&display_value(other)),
            }
        }
    }

    /// Flat text rendering.
    pub fn to_text(&self) -> String {
        let mut renderer = TextRenderer::default();
        self.walk(&mut renderer);
        format!("{}\n\n{}", REPORT_TITLE, renderer.out)
    }

    /// HTML body fragment.
    pub fn to_html_fragment(&self) -> String {
        let mut renderer = HtmlRenderer::default();
        self.walk(&mut renderer);
        renderer.out
    }

    /// Complete standalone HTML document.
    pub fn to_html_document(&self) -> String {
        html_document(REPORT_TITLE, &self.to_html_fragment())
    }

    /// Structural tree for word-processor serialization.
    pub fn to_doc_tree(&self) -> Vec<DocNode> {
        let mut builder = DocTreeBuilder {
            nodes: vec![DocNode::heading(1, REPORT_TITLE)],
        };
        self.walk(&mut builder);
        builder.nodes
    }
}

fn walk_entries<V: ReportVisitor>(entries: &Map<String, Value>, depth: usize, visitor: &mut V) {
    for (key, value) in entries {
        match value {
            Value::Object(children) if !children.is_empty() => {
                visitor.group(key, depth);
                walk_entries(children, depth + 1, visitor);
            }
            Value::Array(items) if items.iter().any(Value::is_object) => {
                walk_items(key, items, depth, visitor)
            }
            other => visitor.leaf(key, &display_value(other), depth),
        }
    }
}

/// Arrays holding objects are expanded item by item as `key #n`.
fn walk_items<V: ReportVisitor>(key: &str, items: &[Value], depth: usize, visitor: &mut V) {
    for (n, item) in items.iter().enumerate() {
        let label = format!("{} #{}", key, n + 1);
        match item {
            Value::Object(children) if !children.is_empty() => {
                visitor.group(&label, depth);
                walk_entries(children, depth + 1, visitor);
            }
            other => visitor.leaf(&label, &display_value(other), depth),
        }
    }
}

/// Render a leaf value, substituting `N/A` for missing or empty values.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => MISSING_VALUE.to_string(),
        Value::String(s) if s.trim().is_empty() => MISSING_VALUE.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(display_value)
                .filter(|s| s != MISSING_VALUE)
                .collect();
            if parts.is_empty() {
                MISSING_VALUE.to_string()
            } else {
                parts.join(", ")
            }
        }
        Value::Object(map) if map.is_empty() => MISSING_VALUE.to_string(),
        Value::Object(_) => value.to_string(),
    }
}

// =============================================================================
// Flat text
// =============================================================================

#[derive(Default)]
struct TextRenderer {
    out: String,
}

impl ReportVisitor for TextRenderer {
    fn begin_section(&mut self, name: &str, index: usize) {
        if index > 0 {
            self.out.push('\n');
        }
        self.out.push_str(name);
        self.out.push('\n');
        self.out.push_str(&"=".repeat(name.chars().count()));
        self.out.push('\n');
    }

    fn section_value(&mut self, value: &str) {
        self.out.push_str(value);
        self.out.push('\n');
    }

    fn group(&mut self, key: &str, depth: usize) {
        self.out
            .push_str(&format!("{}{}:\n", "  ".repeat(depth), key));
    }

    fn leaf(&mut self, key: &str, value: &str, depth: usize) {
        self.out
            .push_str(&format!("{}{}: {}\n", "  ".repeat(depth), key, value));
    }
}

// =============================================================================
// HTML
// =============================================================================

#[derive(Default)]
struct HtmlRenderer {
    out: String,
}

impl ReportVisitor for HtmlRenderer {
    fn begin_section(&mut self, name: &str, _index: usize) {
        self.out.push_str(&format!("<h2>{}</h2>\n", escape_html(name)));
    }

    fn section_value(&mut self, value: &str) {
        self.out.push_str(&format!("<p>{}</p>\n", escape_html(value)));
    }

    fn group(&mut self, key: &str, depth: usize) {
        let level = (depth + 3).min(6);
        self.out
            .push_str(&format!("<h{level}>{}</h{level}>\n", escape_html(key)));
    }

    fn leaf(&mut self, key: &str, value: &str, _depth: usize) {
        self.out.push_str(&format!(
            "<p><strong>{}:</strong> {}</p>\n",
            escape_html(key),
            escape_html(value)
        ));
    }
}

/// Escape text for inclusion in HTML element content.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wrap a body fragment in a minimal printable document.
pub fn html_document(title: &str, body: &str) -> String {
    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: Arial, Helvetica, sans-serif; margin: 2.5em; line-height: 1.5; color: #222; }}
h1 {{ text-align: center; border-bottom: 2px solid #333; padding-bottom: 0.3em; }}
h2 {{ color: #1a4d8f; margin-top: 1.6em; }}
h3, h4, h5, h6 {{ color: #333; margin-bottom: 0.2em; }}
p {{ margin: 0.3em 0; }}
</style>
</head>
<body>
<h1>{title}</h1>
{body}</body>
</html>
"#
    )
}

// =============================================================================
// Document tree
// =============================================================================

/// A run of text within a paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub bold: bool,
}

/// Structural node handed to a [`crate::DocumentSerializer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocNode {
    /// Level 1 is the title, 2 a section, 3 a subsection.
    Heading { level: u8, text: String },
    Paragraph { runs: Vec<TextRun> },
}

impl DocNode {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        DocNode::Heading {
            level: level.clamp(1, 3),
            text: text.into(),
        }
    }

    /// A paragraph with a bold `key:` label followed by the value.
    pub fn labelled(key: &str, value: &str) -> Self {
        DocNode::Paragraph {
            runs: vec![
                TextRun {
                    text: format!("{}: ", key),
                    bold: true,
                },
                TextRun {
                    text: value.to_string(),
                    bold: false,
                },
            ],
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        DocNode::Paragraph {
            runs: vec![TextRun {
                text: text.into(),
                bold: false,
            }],
        }
    }
}

struct DocTreeBuilder {
    nodes: Vec<DocNode>,
}

impl ReportVisitor for DocTreeBuilder {
    fn begin_section(&mut self, name: &str, _index: usize) {
        self.nodes.push(DocNode::heading(2, name));
    }

    fn section_value(&mut self, value: &str) {
        self.nodes.push(DocNode::plain(value));
    }

    fn group(&mut self, key: &str, _depth: usize) {
        self.nodes.push(DocNode::heading(3, key));
    }

    fn leaf(&mut self, key: &str, value: &str, _depth: usize) {
        self.nodes.push(DocNode::labelled(key, value));
    }
}
