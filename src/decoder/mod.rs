//! Decoders for the markup payloads stored on test-case work items.
//!
//! Three fields carry structured data as loosely formed markup:
//! - `Microsoft.VSTS.TCM.Steps` → [`decode_steps`]
//! - `Microsoft.VSTS.TCM.Parameters` → [`decode_parameters`]
//! - `Microsoft.VSTS.TCM.LocalDataSource` → [`decode_value_rows`]
//!
//! None of the decoders fail. Malformed input is logged and decodes to an
//! empty list, so a case can always be produced. Steps and parameters get a
//! second chance through fragment recovery when strict parsing fails.

mod markup;
mod parameters;
mod recovery;
mod steps;
mod values;

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

pub use markup::{Element, MarkupError, Node};
pub use parameters::decode_parameters;
pub use steps::decode_steps;
pub use values::decode_value_rows;

use crate::models::{fields, Parameter, ParameterValueRow, Step, WorkItem};

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// The three decoded payloads of one work item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedPayload {
    pub steps: Vec<Step>,
    pub parameters: Vec<Parameter>,
    pub parameter_values: Vec<ParameterValueRow>,
}

impl DecodedPayload {
    /// Decode whichever payload fields are present. Missing or non-string
    /// fields decode to empty lists.
    pub fn from_fields(fields: &Map<String, Value>) -> Self {
        let text = |name: &str| fields.get(name).and_then(Value::as_str).unwrap_or_default();
        Self {
            steps: decode_steps(text(fields::STEPS)),
            parameters: decode_parameters(text(fields::PARAMETERS)),
            parameter_values: decode_value_rows(text(fields::LOCAL_DATA_SOURCE)),
        }
    }

    pub fn from_work_item(item: &WorkItem) -> Self {
        tracing::debug_span!("decode", work_item = item.id).in_scope(|| Self::from_fields(&item.fields))
    }
}

/// Prepare a raw payload for strict parsing.
///
/// Unwraps a CDATA section that encloses the whole payload (inner CDATA is
/// left to the parser) and, unless the text already starts
/// with a declaration or the expected root element, wraps it in `<root>`.
pub(crate) fn normalize(raw: &str, root: &str) -> String {
    let mut text = raw.trim();

    if let Some(inner) = text
        .strip_prefix(CDATA_OPEN)
        .and_then(|rest| rest.strip_suffix(CDATA_CLOSE))
    {
        tracing::debug!("Unwrapping CDATA section from <{}> payload", root);
        text = inner.trim();
    }

    if text.starts_with("<?xml") || starts_with_element(text, root) {
        text.to_string()
    } else {
        format!("<{root}>{text}</{root}>")
    }
}

fn starts_with_element(text: &str, name: &str) -> bool {
    text.strip_prefix('<')
        .and_then(|rest| rest.strip_prefix(name))
        .is_some_and(|rest| rest.starts_with(|c: char| c == '>' || c == '/' || c.is_whitespace()))
}

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"))
}

fn line_break_pattern() -> &'static Regex {
    static BREAK: OnceLock<Regex> = OnceLock::new();
    BREAK.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern is valid"))
}

/// Reduce rich text to plain text: tags removed, `<br>` kept as a newline,
/// common entities decoded, surrounding whitespace trimmed.
pub fn strip_markup(text: &str) -> String {
    if !text.contains('<') && !text.contains('&') {
        return text.trim().to_string();
    }
    let with_breaks = line_break_pattern().replace_all(text, "\n");
    let plain = tag_pattern().replace_all(&with_breaks, "");
    decode_entities(&plain).trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
