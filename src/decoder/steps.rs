use tracing::{debug, error, warn};

use super::markup::{self, Element};
use super::{normalize, recovery, strip_markup};
use crate::models::{Attachment, Step};

const ROOT: &str = "steps";
const STEP: &str = "step";

/// Decode a steps payload into steps in document order.
///
/// Steps are collected from anywhere in the tree, so steps nested in shared
/// step references are included. On a strict parse failure each `<step>`
/// fragment is recovered and parsed on its own.
pub fn decode_steps(raw: &str) -> Vec<Step> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let document = normalize(raw, ROOT);
    debug!(bytes = document.len(), "Parsing steps payload");

    match markup::parse(&document) {
        Ok(root) => {
            let steps: Vec<Step> = root.descendants(STEP).into_iter().map(step_from_element).collect();
            debug!(count = steps.len(), "Parsed steps");
            steps
        }
        Err(err) => {
            warn!(error = %err, "Steps payload is malformed, attempting fragment recovery");
            recover(&document)
        }
    }
}

fn recover(document: &str) -> Vec<Step> {
    let Some(spans) = recovery::fragments(document, STEP) else {
        error!("Unable to recover steps payload");
        return Vec::new();
    };

    let mut steps = Vec::with_capacity(spans.len());
    for span in spans {
        match markup::parse(&format!("<{ROOT}>{span}</{ROOT}>")) {
            Ok(root) => steps.extend(root.child(STEP).map(step_from_element)),
            Err(err) => error!(error = %err, "Skipping unreadable step fragment"),
        }
    }
    debug!(count = steps.len(), "Recovered steps from malformed payload");
    steps
}

/// Read one `<step>` element.
///
/// Named `action`/`expectedResult`/`title` children win; otherwise the first
/// and second `parameterizedString` children are the action and the expected
/// result and `description` is the title.
fn step_from_element(el: &Element) -> Step {
    let strings: Vec<&Element> = el.children_named("parameterizedString").collect();

    let action = el.child("action").or_else(|| strings.first().copied());
    let expected = el.child("expectedResult").or_else(|| strings.get(1).copied());
    let title = el.child("title").or_else(|| el.child("description"));

    let parameter_type = el
        .attr("parameterizedString")
        .filter(|kind| !kind.is_empty())
        .map(str::to_string);

    let attachments = el
        .child("attachments")
        .map(|list| {
            list.children_named("attachment")
                .map(|a| Attachment {
                    name: a.attr("name").unwrap_or_default().to_string(),
                    url: a.attr("url").unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    Step {
        id: el.attr("id").unwrap_or_default().to_string(),
        step_type: el.attr("type").unwrap_or_default().to_string(),
        title: title.map(plain_text).unwrap_or_default(),
        action: action.map(plain_text).unwrap_or_default(),
        expected_result: expected.map(plain_text).unwrap_or_default(),
        parameterized: parameter_type.is_some(),
        parameter_type,
        attachments,
    }
}

fn plain_text(el: &Element) -> String {
    strip_markup(&el.text_content())
}
