use tracing::{debug, warn};

use super::markup::{self, Element};
use super::normalize;
use crate::models::ParameterValueRow;

const ROOT: &str = "LocalDataSource";

/// A recognized layout for parameter values.
type Shape = fn(&Element) -> Vec<ParameterValueRow>;

/// Tried in order; the first shape that yields any row wins.
const SHAPES: &[(&str, Shape)] = &[
    ("table/row/column", table_rows),
    ("data/row attributes", attribute_rows),
    ("flat value list", flat_values),
    ("dataset tables", dataset_rows),
];

/// Decode a local data source into value rows.
///
/// There is no fragment recovery here: a malformed payload or an unknown
/// layout decodes to no rows.
pub fn decode_value_rows(raw: &str) -> Vec<ParameterValueRow> {
    if raw.trim().is_empty() {
        return Vec::new();
    }

    let document = normalize(raw, ROOT);
    let root = match markup::parse(&document) {
        Ok(root) => root,
        Err(err) => {
            warn!(error = %err, "Data source payload is malformed");
            return Vec::new();
        }
    };

    for (label, shape) in SHAPES {
        let rows = shape(&root);
        if !rows.is_empty() {
            debug!(shape = label, count = rows.len(), "Parsed parameter value rows");
            return rows;
        }
    }

    warn!("Data source payload has no recognized structure");
    Vec::new()
}

/// `<table><row><column name="x">value</column></row></table>`
fn table_rows(root: &Element) -> Vec<ParameterValueRow> {
    rows_under(root, "table")
        .into_iter()
        .map(|row| {
            row.children_named("column")
                .filter_map(|col| {
                    let name = col.attr("name").filter(|n| !n.is_empty())?;
                    Some((name.to_string(), col.text_content().trim().to_string()))
                })
                .collect::<ParameterValueRow>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

/// `<data><row x="value" y="value"/></data>`
fn attribute_rows(root: &Element) -> Vec<ParameterValueRow> {
    rows_under(root, "data")
        .into_iter()
        .map(|row| row.attributes.iter().cloned().collect::<ParameterValueRow>())
        .filter(|row| !row.is_empty())
        .collect()
}

/// `<value name="x">value</value>` directly under the root, collapsed into one row.
fn flat_values(root: &Element) -> Vec<ParameterValueRow> {
    let row: ParameterValueRow = root
        .children_named("value")
        .filter_map(|value| {
            let name = value.attr("name").filter(|n| !n.is_empty())?;
            Some((name.to_string(), value.text_content().trim().to_string()))
        })
        .collect();

    if row.is_empty() {
        Vec::new()
    } else {
        vec![row]
    }
}

/// `<NewDataSet><xs:schema/><Table1><x>value</x></Table1></NewDataSet>`
fn dataset_rows(root: &Element) -> Vec<ParameterValueRow> {
    let mut sets = root.descendants("NewDataSet");
    if root.name == "NewDataSet" {
        sets.insert(0, root);
    }

    sets.into_iter()
        .flat_map(|set| set.children())
        .filter(|table| table.local_name().starts_with("Table"))
        .map(|table| {
            table
                .children()
                .filter(|cell| cell.is_leaf())
                .map(|cell| (cell.name.clone(), cell.text_content().trim().to_string()))
                .collect::<ParameterValueRow>()
        })
        .filter(|row| !row.is_empty())
        .collect()
}

/// `row` children of every `container` element, in document order.
fn rows_under<'a>(root: &'a Element, container: &str) -> Vec<&'a Element> {
    let mut containers = root.descendants(container);
    if root.name == container {
        containers.insert(0, root);
    }
    containers
        .into_iter()
        .flat_map(|c| c.children_named("row"))
        .collect()
}
