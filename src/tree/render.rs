//! ASCII tree rendering for extracted suites.

use crate::models::SuiteNode;

const WITH_CASES: char = '●';
const STRUCTURAL: char = '○';

fn node_symbol(node: &SuiteNode) -> char {
    if node.cases_included {
        WITH_CASES
    } else {
        STRUCTURAL
    }
}

fn label(node: &SuiteNode) -> String {
    let mut label = format!("{} [{}]", node.suite.name, node.suite.id);
    if node.cases_included {
        let n = node.cases.len();
        label.push_str(&format!(" ({} case{})", n, if n == 1 { "" } else { "s" }));
    }
    label
}

/// Render suite trees as ASCII art.
///
/// `●` marks suites whose cases were pulled, `○` suites that were only
/// visited on the way to selected descendants.
///
/// Example output:
/// ```text
/// ○ Release [20]
/// ├── ● Login [21] (2 cases)
/// │   └── ● Lockout [23] (0 cases)
/// └── ○ Checkout [22]
/// ```
pub fn render_tree(nodes: &[SuiteNode]) -> String {
    let mut output = String::new();
    for node in nodes {
        output.push(node_symbol(node));
        output.push(' ');
        output.push_str(&label(node));
        output.push('\n');
        render_children(&mut output, node, "");
    }
    output
}

fn render_children(output: &mut String, node: &SuiteNode, prefix: &str) {
    for (i, child) in node.child_suites.iter().enumerate() {
        let is_last = i == node.child_suites.len() - 1;
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push(node_symbol(child));
        output.push(' ');
        output.push_str(&label(child));
        output.push('\n');

        let continuation = if is_last { "    " } else { "│   " };
        render_children(output, child, &format!("{}{}", prefix, continuation));
    }
}
