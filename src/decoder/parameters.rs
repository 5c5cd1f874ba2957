use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use super::markup::{self, Element};
use super::{normalize, recovery};
use crate::models::Parameter;

const ROOT: &str = "parameters";
const PARAM: &str = "param";

/// Decode a parameter declaration payload.
///
/// `name` and `default` become fields; every other attribute is forwarded
/// as-is. On a strict parse failure each `<param>` fragment is recovered and
/// parsed on its own.
pub fn decode_parameters(raw: &str) -> Vec<Parameter> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let document = normalize(raw, ROOT);
    match markup::parse(&document) {
        Ok(root) => {
            let parameters: Vec<Parameter> = root.descendants(PARAM).into_iter().map(parameter_from_element).collect();
            debug!(count = parameters.len(), "Parsed parameters");
            parameters
        }
        Err(err) => {
            warn!(error = %err, "Parameters payload is malformed, attempting fragment recovery");
            recover(&document)
        }
    }
}

fn recover(document: &str) -> Vec<Parameter> {
    let Some(spans) = recovery::fragments(document, PARAM) else {
        error!("Unable to recover parameters payload");
        return Vec::new();
    };

    let mut parameters = Vec::with_capacity(spans.len());
    for span in spans {
        match markup::parse(&format!("<{ROOT}>{span}</{ROOT}>")) {
            Ok(root) => parameters.extend(root.child(PARAM).map(parameter_from_element)),
            Err(err) => error!(error = %err, "Skipping unreadable parameter fragment"),
        }
    }
    debug!(count = parameters.len(), "Recovered parameters from malformed payload");
    parameters
}

fn parameter_from_element(el: &Element) -> Parameter {
    let extra: BTreeMap<String, String> = el
        .attributes
        .iter()
        .filter(|(key, _)| key != "name" && key != "default")
        .cloned()
        .collect();

    Parameter {
        name: el.attr("name").unwrap_or_default().to_string(),
        default: el.attr("default").unwrap_or_default().to_string(),
        extra,
    }
}
