//! Text rendering of an indexed snapshot, one line per indexed element.

use crate::indexer::IndexMap;
use crate::model::{DomSnapshot, SnapshotId, SnapshotKind};

/// Attributes copied into the element list when present and non-empty.
pub const LISTED_ATTRIBUTES: &[&str] = &[
    "title",
    "type",
    "name",
    "role",
    "tabindex",
    "aria-label",
    "placeholder",
    "value",
    "alt",
    "aria-expanded",
];

/// Render `index[:]<tag attrs>text</tag>` lines for indexed elements and
/// `_[:]text` lines for free text that no indexed element owns.
pub fn element_list(snapshot: &DomSnapshot, index: &IndexMap) -> String {
    let mut lines = Vec::new();
    for id in snapshot.depth_first() {
        let Some(node) = snapshot.get(id) else {
            continue;
        };
        match node.kind {
            SnapshotKind::Element => {
                let Some(position) = index.index_of(id) else {
                    continue;
                };
                let tag = node.tag_name.as_deref().unwrap_or_default();
                let attrs: Vec<String> = LISTED_ATTRIBUTES
                    .iter()
                    .filter_map(|name| {
                        node.attribute(name)
                            .filter(|value| !value.is_empty())
                            .map(|value| format!("{name}=\"{}\"", single_line(value)))
                    })
                    .collect();
                let attr_str = if attrs.is_empty() {
                    String::new()
                } else {
                    format!(" {}", attrs.join(" "))
                };
                let text = owned_text(snapshot, index, id);
                lines.push(format!("{position}[:]<{tag}{attr_str}>{text}</{tag}>"));
            }
            SnapshotKind::Text => {
                if snapshot.has_indexed_ancestor(id) {
                    continue;
                }
                if let Some(text) = node.text_excerpt.as_deref().map(single_line) {
                    if !text.is_empty() {
                        lines.push(format!("_[:]{text}"));
                    }
                }
            }
            SnapshotKind::IsolationRoot => {}
        }
    }
    lines.join("\n")
}

/// Text under `owner` up to, but not including, the next indexed element.
fn owned_text(snapshot: &DomSnapshot, index: &IndexMap, owner: SnapshotId) -> String {
    let mut parts = Vec::new();
    let mut stack = vec![owner];
    while let Some(id) = stack.pop() {
        let Some(node) = snapshot.get(id) else {
            continue;
        };
        if id != owner && index.index_of(id).is_some() {
            continue;
        }
        if let Some(text) = node.text_excerpt.as_deref() {
            parts.push(text);
        }
        if let Some(doc) = node.nested_document() {
            stack.push(doc);
        }
        stack.extend(node.children.iter().rev().copied());
        if let Some(root) = node.nested_root() {
            stack.push(root);
        }
    }
    single_line(&parts.join(" "))
}

/// Each entry must stay on one line, so runs of whitespace collapse to a
/// single space.
fn single_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::ElementIndexer;
    use crate::snapshot::SnapshotBuilder;
    use dom_adapter::{el, MemoryDocument, PageFixture};
    use tabpilot_core_types::CycleId;

    #[tokio::test]
    async fn renders_indexed_lines_and_free_text() {
        let doc = MemoryDocument::shared(
            PageFixture::new("https://list.test/")
                .child(el("h1").text("Welcome"))
                .child(
                    el("button")
                        .attr("type", "submit")
                        .attr("class", "primary")
                        .attr("aria-label", "")
                        .child(el("span").text("Go")),
                )
                .child(el("input").attr("name", "q").attr("placeholder", "Search")),
        );
        let snapshot = SnapshotBuilder::default().build(doc).await.expect("snapshot");
        let index = ElementIndexer::new().assign(&snapshot, CycleId(1));

        let list = element_list(&snapshot, &index);
        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(
            lines,
            vec![
                "_[:]Welcome",
                "0[:]<button type=\"submit\">Go</button>",
                "1[:]<input name=\"q\" placeholder=\"Search\"></input>",
            ]
        );
    }

    #[tokio::test]
    async fn multiline_values_stay_on_one_line() {
        let doc = MemoryDocument::shared(
            PageFixture::new("https://list.test/").child(
                el("button")
                    .attr("aria-label", "line1\nline2")
                    .child(el("span").text("Save"))
                    .child(el("span").text("draft\n now")),
            ),
        );
        let snapshot = SnapshotBuilder::default().build(doc).await.expect("snapshot");
        let index = ElementIndexer::new().assign(&snapshot, CycleId(1));

        assert_eq!(
            element_list(&snapshot, &index),
            "0[:]<button aria-label=\"line1 line2\">Save draft now</button>"
        );
    }
}
