//! Selector reconstruction
//!
//! A selector is rebuilt from three signals so that neither re-ordering nor
//! duplicate markup alone breaks re-resolution:
//! 1. the structural path, one `tag:nth-of-type(n)` per segment
//! 2. syntactically valid class tokens
//! 3. a whitelist of stable attributes

use dom_adapter::{escape_attr_name, escape_attr_value};
use once_cell::sync::Lazy;
use perceiver_structural::DocumentNode;
use regex::Regex;

use crate::errors::LocatorError;

/// Attributes that identify an element without depending on layout.
pub const SAFE_ATTRIBUTES: &[&str] = &[
    "id",
    "name",
    "type",
    "value",
    "placeholder",
    "aria-label",
    "aria-labelledby",
    "aria-describedby",
    "role",
    "for",
    "autocomplete",
    "required",
    "readonly",
    "alt",
    "title",
    "src",
    "data-testid",
    "data-id",
    "data-qa",
    "data-cy",
    "href",
    "target",
];

static VALID_CLASS_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_-]*$").unwrap());

/// Characters that force a contains-match instead of an exact match.
static UNSAFE_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["'<>`]"#).unwrap());

/// Build the selector for a snapshot element, relative to its boundary root.
pub fn selector_for(node: &DocumentNode) -> Result<String, LocatorError> {
    if node.structural_path.is_empty() {
        return Err(LocatorError::InvalidEntry(format!(
            "node {} has no structural path",
            node.id
        )));
    }
    let mut selector = String::from(":scope");
    for segment in &node.structural_path {
        selector.push_str(&format!(
            " > {}:nth-of-type({})",
            segment.tag, segment.sibling_index
        ));
    }

    if let Some(classes) = node.attribute("class") {
        for class in classes.split_whitespace() {
            if VALID_CLASS_NAME.is_match(class) {
                selector.push('.');
                selector.push_str(class);
            }
        }
    }

    for (name, value) in &node.attributes {
        if name.trim().is_empty() || !SAFE_ATTRIBUTES.contains(&name.as_str()) {
            continue;
        }
        let name = escape_attr_name(name);
        if value.is_empty() {
            selector.push_str(&format!("[{name}]"));
        } else if UNSAFE_VALUE.is_match(value) {
            selector.push_str(&format!("[{name}*=\"{}\"]", escape_attr_value(value)));
        } else {
            selector.push_str(&format!("[{name}=\"{}\"]", escape_attr_value(value)));
        }
    }
    Ok(selector)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_adapter::NodeId;
    use perceiver_structural::{Boundary, PathSegment, SnapshotId, SnapshotKind};
    use std::collections::BTreeMap;

    fn node(path: &[(&str, usize)], attrs: &[(&str, &str)]) -> DocumentNode {
        DocumentNode {
            id: SnapshotId(4),
            kind: SnapshotKind::Element,
            tag_name: path.last().map(|(tag, _)| tag.to_string()),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            structural_path: path
                .iter()
                .map(|(tag, idx)| PathSegment {
                    tag: tag.to_string(),
                    sibling_index: *idx,
                })
                .collect(),
            text_excerpt: None,
            is_visible: true,
            is_interactive: true,
            is_topmost: true,
            children: Vec::new(),
            parent: None,
            boundary: Boundary::Plain,
            dom_id: NodeId(9),
        }
    }

    #[test]
    fn path_classes_and_attributes() {
        let n = node(
            &[("html", 1), ("body", 1), ("button", 2)],
            &[
                ("class", "btn primary 9bad"),
                ("name", "go"),
                ("required", ""),
                ("onclick", "run()"),
            ],
        );
        assert_eq!(
            selector_for(&n).unwrap(),
            ":scope > html:nth-of-type(1) > body:nth-of-type(1) > button:nth-of-type(2).btn.primary[name=\"go\"][required]"
        );
    }

    #[test]
    fn unsafe_values_use_contains_match() {
        let n = node(&[("a", 1)], &[("title", "say \"hi\""), ("xmlns:href", "x")]);
        assert_eq!(
            selector_for(&n).unwrap(),
            ":scope > a:nth-of-type(1)[title*=\"say \\\"hi\\\"\"]"
        );
    }

    #[test]
    fn empty_path_is_rejected() {
        let n = node(&[], &[]);
        assert!(matches!(selector_for(&n), Err(LocatorError::InvalidEntry(_))));
    }
}
