use std::collections::BTreeMap;

use dom_adapter::{LiveDocument, NodeId, Viewport};

use crate::model::JudgeReport;

/// Tags that are never content.
pub const SKIPPED_TAGS: &[&str] = &[
    "style", "script", "meta", "link", "noscript", "template", "svg", "head", "title", "base",
];

/// Tags that are actionable by themselves.
pub const INTERACTIVE_TAGS: &[&str] = &[
    "a", "button", "input", "select", "textarea", "details", "summary", "label", "option",
    "optgroup", "menu", "menuitem", "embed", "object",
];

/// ARIA roles that indicate interactivity.
pub const INTERACTIVE_ROLES: &[&str] = &[
    "button",
    "link",
    "checkbox",
    "radio",
    "menu",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "tab",
    "textbox",
    "combobox",
    "listbox",
    "option",
    "slider",
    "spinbutton",
    "searchbox",
    "switch",
    "scrollbar",
    "treeitem",
    "gridcell",
];

/// Inline handlers and framework click bindings.
pub const EVENT_BINDING_ATTRIBUTES: &[&str] = &[
    "onclick",
    "onmousedown",
    "onmouseup",
    "ontouchstart",
    "ng-click",
    "@click",
    "v-on:click",
    "data-action",
];

pub fn visible(doc: &dyn LiveDocument, node: NodeId) -> JudgeReport {
    let mut issues = Vec::new();
    match doc.bounding_box(node) {
        Some(rect) if !rect.is_empty() => {}
        Some(_) => issues.push("zero_area".to_string()),
        None => issues.push("missing_geometry".to_string()),
    }
    let style = doc.computed_style(node);
    if style.display == "none" {
        issues.push("display_none".to_string());
    }
    if matches!(style.visibility.as_str(), "hidden" | "collapse") {
        issues.push("visibility_hidden".to_string());
    }
    if style.opacity <= 0.0 {
        issues.push("opacity_zero".to_string());
    }
    report("visible", "not_visible", issues)
}

pub fn interactive(tag: &str, attrs: &BTreeMap<String, String>) -> JudgeReport {
    let mut signals = Vec::new();
    if INTERACTIVE_TAGS.contains(&tag) {
        signals.push("tag");
    }
    if let Some(role) = attrs.get("role") {
        let role = role.trim().to_ascii_lowercase();
        if role.split_whitespace().any(|r| INTERACTIVE_ROLES.contains(&r)) {
            signals.push("role");
        }
    }
    if let Some(tabindex) = attrs.get("tabindex") {
        if tabindex.trim().parse::<i32>().map_or(false, |t| t >= 0) {
            signals.push("tabindex");
        }
    }
    if let Some(editable) = attrs.get("contenteditable") {
        if matches!(editable.trim().to_ascii_lowercase().as_str(), "" | "true" | "plaintext-only") {
            signals.push("contenteditable");
        }
    }
    if EVENT_BINDING_ATTRIBUTES
        .iter()
        .any(|name| attrs.contains_key(*name))
    {
        signals.push("event_binding");
    }
    if signals.is_empty() {
        JudgeReport {
            ok: false,
            reason: "not_interactive(no_signal)".to_string(),
        }
    } else {
        JudgeReport {
            ok: true,
            reason: format!("interactive({})", signals.join(",")),
        }
    }
}

/// Hit-test the center of `node` inside `context` and confirm `node` is on
/// the ancestor chain of whatever was hit.
pub fn topmost(doc: &dyn LiveDocument, node: NodeId, context: NodeId) -> JudgeReport {
    let Some(rect) = doc.bounding_box(node) else {
        return report("topmost", "not_topmost", vec!["missing_geometry".to_string()]);
    };
    let (x, y) = rect.center();
    let Some(hit) = doc.element_from_point(context, x, y) else {
        return report("topmost", "not_topmost", vec!["outside_viewport".to_string()]);
    };
    let mut current = Some(hit);
    while let Some(candidate) = current {
        if candidate == node {
            return report("topmost", "not_topmost", Vec::new());
        }
        current = doc.parent(candidate);
    }
    report("topmost", "not_topmost", vec!["covered".to_string()])
}

/// Whether a text box is rendered within the scroll-visible area.
pub fn text_visible(doc: &dyn LiveDocument, node: NodeId, viewport: &Viewport) -> bool {
    doc.bounding_box(node)
        .map_or(false, |rect| !rect.is_empty() && rect.intersects(&viewport.client_rect()))
}

fn report(ok_reason: &str, failed_reason: &str, issues: Vec<String>) -> JudgeReport {
    if issues.is_empty() {
        JudgeReport {
            ok: true,
            reason: ok_reason.to_string(),
        }
    } else {
        JudgeReport {
            ok: false,
            reason: format!("{}({})", failed_reason, issues.join(",")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom_adapter::{el, MemoryDocument, PageFixture, Rect};

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn interactivity_signals() {
        assert!(interactive("button", &attrs(&[])).ok);
        assert!(interactive("div", &attrs(&[("role", "Button")])).ok);
        assert!(interactive("div", &attrs(&[("tabindex", "0")])).ok);
        assert!(!interactive("div", &attrs(&[("tabindex", "-1")])).ok);
        assert!(interactive("span", &attrs(&[("@click", "go()")])).ok);
        assert!(interactive("div", &attrs(&[("contenteditable", "")])).ok);
        let report = interactive("p", &attrs(&[("class", "copy")]));
        assert!(!report.ok);
        assert_eq!(report.reason, "not_interactive(no_signal)");
    }

    #[test]
    fn visibility_and_topmost() {
        let doc = MemoryDocument::from_fixture(
            PageFixture::new("https://judge.test/")
                .child(el("button").attr("id", "shown").rect(Rect::new(0.0, 0.0, 100.0, 30.0)).text("Shown"))
                .child(el("button").attr("id", "transparent").rect(Rect::new(200.0, 0.0, 100.0, 30.0)).opacity(0.0).text("Ghost"))
                .child(el("button").attr("id", "covered").rect(Rect::new(0.0, 100.0, 100.0, 30.0)).text("Covered"))
                .child(el("div").attr("id", "modal").rect(Rect::new(0.0, 90.0, 300.0, 100.0)).z(5)),
        );
        let root = doc.document_node();
        let shown = doc.find("#shown").expect("shown");
        let transparent = doc.find("#transparent").expect("transparent");
        let covered = doc.find("#covered").expect("covered");

        assert!(visible(&doc, shown).ok);
        let ghost = visible(&doc, transparent);
        assert!(!ghost.ok);
        assert!(ghost.reason.contains("opacity_zero"));

        assert!(topmost(&doc, shown, root).ok);
        let blocked = topmost(&doc, covered, root);
        assert!(!blocked.ok);
        assert_eq!(blocked.reason, "not_topmost(covered)");
    }
}
