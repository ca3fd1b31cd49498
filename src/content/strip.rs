//! Removal of text-showing operators.

use std::collections::HashSet;

use super::ops;
use super::state::{fmt_number, GraphicsStack};
use crate::backend::{ContentOp, PdfValue};
use crate::error::{Error, Result};

/// Which text to remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontFilter {
    /// Text in every font
    All,
    /// Text written with one of these font resource names
    Fonts(HashSet<Vec<u8>>),
}

impl FontFilter {
    /// Filter for a list of resource names (e.g. `["F1", "F3"]`).
    pub fn fonts<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        FontFilter::Fonts(names.into_iter().map(|n| n.as_ref().to_vec()).collect())
    }

    fn matches(&self, font: Option<&[u8]>) -> bool {
        match self {
            FontFilter::All => true,
            FontFilter::Fonts(set) => font.is_some_and(|f| set.contains(f)),
        }
    }
}

/// Result of stripping text from a stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StripResult {
    pub content: Vec<ContentOp>,
    /// Number of text-showing operators removed
    pub removed: usize,
}

/// Remove the text-showing operators selected by `filter`.
///
/// All other operators are kept in order. `'` and `"` are replaced by their
/// line-advance effect so that following text in other fonts stays in place.
pub fn strip_text(content: &[ContentOp], filter: &FontFilter) -> Result<StripResult> {
    let mut stack = GraphicsStack::new();
    let mut in_text = false;
    let mut out = Vec::with_capacity(content.len());
    let mut removed = 0;

    for (index, op) in content.iter().enumerate() {
        match op.operator.as_str() {
            "BT" if in_text => return Err(Error::UnbalancedText(index)),
            "BT" => in_text = true,
            "ET" if !in_text => return Err(Error::UnbalancedText(index)),
            "ET" => in_text = false,
            _ => {}
        }
        stack.apply(op, index)?;

        let shows = matches!(op.operator.as_str(), "Tj" | "TJ" | "'" | "\"");
        if !(in_text && shows && filter.matches(stack.current().text.font.as_deref())) {
            out.push(op.clone());
            continue;
        }

        removed += 1;
        match op.operator.as_str() {
            "'" => out.push(ContentOp::new("T*", vec![])),
            "\"" => {
                let [aw, ac] = match op.operands.as_slice() {
                    [aw, ac, _] => [aw, ac].map(|v| v.as_number()),
                    _ => return Err(ops::syntax_error(op, index, "expected 3 operands")),
                };
                let (Some(aw), Some(ac)) = (aw, ac) else {
                    return Err(ops::syntax_error(op, index, "expected spacing numbers"));
                };
                out.push(ContentOp::new("Tw", vec![PdfValue::Real(aw)]));
                out.push(ContentOp::new("Tc", vec![PdfValue::Real(ac)]));
                out.push(ContentOp::new("T*", vec![]));
            }
            _ => {}
        }
    }

    if in_text {
        return Err(Error::UnbalancedText(content.len()));
    }
    stack.finish()?;
    log::debug!("Removed {} text operator(s)", removed);
    Ok(StripResult {
        content: out,
        removed,
    })
}

/// Human-readable rendering of operations, one per line.
pub fn format_ops(content: &[ContentOp]) -> String {
    fn value(v: &PdfValue) -> String {
        match v {
            PdfValue::Integer(i) => i.to_string(),
            PdfValue::Real(r) => fmt_number(*r),
            PdfValue::Bool(b) => b.to_string(),
            PdfValue::Null | PdfValue::Other => "null".to_string(),
            PdfValue::Name(n) => format!("/{}", String::from_utf8_lossy(n)),
            PdfValue::Str(s) => format!("({})", String::from_utf8_lossy(s)),
            PdfValue::Array(items) => {
                format!("[{}]", items.iter().map(value).collect::<Vec<_>>().join(" "))
            }
            PdfValue::Dict(entries) => format!(
                "<<{}>>",
                entries
                    .iter()
                    .map(|(k, v)| format!("/{} {}", String::from_utf8_lossy(k), value(v)))
                    .collect::<Vec<_>>()
                    .join(" ")
            ),
        }
    }
    content
        .iter()
        .map(|op| {
            let mut parts: Vec<String> = op.operands.iter().map(value).collect();
            parts.push(op.operator.clone());
            parts.join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
