//! Report rendering collaborator.
//!
//! The coordinator treats rendering as an opaque bytes-producing capability
//! behind [`ReportRenderer`]. Production deployments plug in an external PDF
//! engine; [`BasicPdfRenderer`] is the built-in fallback that emits a
//! one-page summary document so the pipeline works end-to-end without one.

use std::fmt;

use bytes::Bytes;

use crate::report::{ReportSpec, Target};
use crate::router::BoxFuture;

/// Why a render attempt failed. Recorded verbatim on the failed artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    reason: String,
}

impl RenderError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

impl std::error::Error for RenderError {}

/// External PDF-producing engine.
///
/// Invoked asynchronously by the coordinator after submission bookkeeping;
/// implementations may take arbitrarily long. The returned bytes become the
/// artifact's immutable content.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, spec: ReportSpec) -> BoxFuture<'static, Result<Bytes, RenderError>>;
}

/// Minimal built-in renderer: a single-page PDF listing the report
/// parameters. Not a substitute for a real reporting engine.
pub struct BasicPdfRenderer;

impl ReportRenderer for BasicPdfRenderer {
    fn render(&self, spec: ReportSpec) -> BoxFuture<'static, Result<Bytes, RenderError>> {
        Box::pin(async move {
            let mut lines = vec![
                spec.kind.title().to_string(),
                format!("Period: {} to {}", spec.date_from, spec.date_to),
                format!("Requested by: {}", spec.requested_by),
            ];
            match spec.target {
                Some(Target::Team(id)) => lines.push(format!("Team: {id}")),
                Some(Target::User(id)) => lines.push(format!("Employee: {id}")),
                None => {}
            }
            Ok(Bytes::from(build_pdf(&lines)))
        })
    }
}

/// Escape characters PDF string literals treat specially.
fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            // Keep the content stream ASCII; the built-in fonts have no
            // reliable encoding for anything else.
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Assemble a single-page PDF 1.4 document with the given text lines.
fn build_pdf(lines: &[String]) -> Vec<u8> {
    let mut content = String::from("BT\n/F1 16 Tf\n50 780 Td\n");
    for (i, line) in lines.iter().enumerate() {
        if i == 1 {
            content.push_str("/F1 11 Tf\n");
        }
        if i > 0 {
            content.push_str("0 -22 Td\n");
        }
        content.push_str(&format!("({}) Tj\n", escape_pdf_text(line)));
    }
    content.push_str("ET\n");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_offset = out.len();
    out.push_str(&format!("xref\n0 {}\n", objects.len() + 1));
    out.push_str("0000000000 65535 f \n");
    for offset in &offsets {
        out.push_str(&format!("{offset:010} 00000 n \n"));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    ));

    out.into_bytes()
}
