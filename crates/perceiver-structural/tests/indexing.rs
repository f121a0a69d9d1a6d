use std::sync::Arc;

use dom_adapter::{el, LiveDocument, MemoryDocument, PageFixture, Rect};
use perceiver_structural::{
    Boundary, EmbeddedContent, SnapshotKind, StructuralPerceiver, StructuralPerceiverImpl,
};
use tabpilot_core_types::CycleId;

fn storefront() -> PageFixture {
    PageFixture::new("https://shop.test/")
        .title("Shop")
        .child(el("h1").text("Catalog"))
        .child(el("button").attr("id", "submit").text("Submit"))
        .child(el("a").attr("href", "/home").text("Home"))
        .child(el("div").attr("class", "copy").text("Plain paragraph"))
        .child(el("button").attr("id", "hidden").display("none").text("Hidden"))
        .child(el("button").attr("id", "faded").opacity(0.0).text("Faded"))
        .child(el("div").attr("role", "button").attr("tabindex", "0").text("Custom"))
        .child(
            el("button")
                .attr("id", "buried")
                .rect(Rect::new(0.0, 400.0, 120.0, 30.0))
                .text("Buried"),
        )
        .child(
            el("div")
                .attr("class", "modal")
                .rect(Rect::new(0.0, 380.0, 400.0, 100.0))
                .z(10),
        )
        .child(
            el("x-panel").shadow_child(
                el("button")
                    .attr("class", "inner-action")
                    .text("Shadow action"),
            ),
        )
        .child(
            el("iframe").attr("id", "embedded").frame(
                PageFixture::new("https://shop.test/embedded")
                    .child(el("input").attr("name", "coupon").attr("placeholder", "Coupon")),
            ),
        )
        .child(el("iframe").attr("id", "ads").cross_origin_frame())
}

#[tokio::test]
async fn button_and_link_index_in_document_order() {
    let doc = MemoryDocument::shared(
        PageFixture::new("https://simple.test/")
            .child(el("button").text("Submit"))
            .child(el("a").attr("href", "/home").text("Home")),
    );
    let perceiver = StructuralPerceiverImpl::default();
    let perception = perceiver.perceive(doc, CycleId(1)).await.expect("perceive");

    assert_eq!(perception.index.len(), 2);
    assert_eq!(perception.entry(0).expect("0").tag_name.as_deref(), Some("button"));
    assert_eq!(perception.entry(1).expect("1").tag_name.as_deref(), Some("a"));
    assert_eq!(
        perception.element_list,
        "0[:]<button>Submit</button>\n1[:]<a>Home</a>"
    );
}

#[tokio::test]
async fn indices_are_unique_and_monotonic() {
    let doc = MemoryDocument::shared(storefront());
    let perception = StructuralPerceiverImpl::default()
        .perceive(doc, CycleId(3))
        .await
        .expect("perceive");

    let indices: Vec<usize> = perception.index.iter().map(|e| e.index).collect();
    let expected: Vec<usize> = (0..indices.len()).collect();
    assert_eq!(indices, expected);

    let order = perception.snapshot.depth_first();
    let positions: Vec<usize> = perception
        .index
        .iter()
        .map(|entry| order.iter().position(|id| *id == entry.node).expect("in traversal"))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn index_holds_exactly_the_visible_interactive_topmost_nodes() {
    let doc = MemoryDocument::shared(storefront());
    let perception = StructuralPerceiverImpl::default()
        .perceive(doc, CycleId(1))
        .await
        .expect("perceive");

    for node in &perception.snapshot.nodes {
        let qualifies = node.kind == SnapshotKind::Element
            && node.is_visible
            && node.is_interactive
            && node.is_topmost;
        assert_eq!(
            perception.index.index_of(node.id).is_some(),
            qualifies,
            "node {:?} <{:?}>",
            node.id,
            node.tag_name
        );
    }

    let ids: Vec<Option<&str>> = perception
        .index
        .iter()
        .map(|entry| {
            perception
                .snapshot
                .get(entry.node)
                .and_then(|n| n.attribute("id").or(n.attribute("class")).or(n.attribute("name")))
        })
        .collect();
    assert_eq!(
        ids,
        vec![
            Some("submit"),
            None,
            None,
            Some("inner-action"),
            Some("coupon"),
        ]
    );
}

#[tokio::test]
async fn rebuilding_an_unchanged_document_is_idempotent() {
    let doc = MemoryDocument::shared(storefront());
    let perceiver = StructuralPerceiverImpl::default();
    let first = perceiver.perceive(doc.clone(), CycleId(1)).await.expect("first");
    let second = perceiver.perceive(doc, CycleId(2)).await.expect("second");

    let a: Vec<_> = first.index.iter().map(|e| (e.index, e.node)).collect();
    let b: Vec<_> = second.index.iter().map(|e| (e.index, e.node)).collect();
    assert_eq!(a, b);
    assert_eq!(first.element_list, second.element_list);
}

#[tokio::test]
async fn boundaries_are_recorded_on_hosts() {
    let doc = MemoryDocument::shared(storefront());
    let snapshot = StructuralPerceiverImpl::default()
        .snapshot(doc.clone() as Arc<dyn LiveDocument>)
        .await
        .expect("snapshot");

    let host = snapshot
        .nodes
        .iter()
        .find(|n| n.tag_name.as_deref() == Some("x-panel"))
        .expect("shadow host");
    let root = host.nested_root().expect("isolation root");
    assert_eq!(snapshot.get(root).expect("root").kind, SnapshotKind::IsolationRoot);

    let inner = snapshot
        .nodes
        .iter()
        .find(|n| n.attribute("class") == Some("inner-action"))
        .expect("shadow button");
    assert_eq!(snapshot.isolation_host(inner.id), Some(host.id));
    assert_eq!(inner.structural_path.len(), 1);
    assert_eq!(inner.structural_path[0].tag, "button");

    let frame = snapshot
        .nodes
        .iter()
        .find(|n| n.attribute("id") == Some("embedded"))
        .expect("frame host");
    assert!(frame.nested_document().is_some());
    let coupon = snapshot
        .nodes
        .iter()
        .find(|n| n.attribute("name") == Some("coupon"))
        .expect("frame input");
    assert_eq!(snapshot.frame_host(coupon.id), Some(frame.id));
    assert_eq!(snapshot.isolation_host(coupon.id), None);

    let ads = snapshot
        .nodes
        .iter()
        .find(|n| n.attribute("id") == Some("ads"))
        .expect("cross-origin host");
    assert_eq!(
        ads.boundary,
        Boundary::EmbeddedDocument {
            content: EmbeddedContent::CrossOrigin
        }
    );
    assert!(ads.children.is_empty());
    assert!(!ads.is_interactive);
}

#[tokio::test]
async fn skipped_tags_and_hidden_text_stay_out() {
    let doc = MemoryDocument::shared(
        PageFixture::new("https://skip.test/")
            .child(el("script").text("var x = 1;"))
            .child(el("style").text("body {}"))
            .child(el("p").text("   "))
            .child(el("p").display("none").text("secret"))
            .child(el("p").text("Shown")),
    );
    let perception = StructuralPerceiverImpl::default()
        .perceive(doc, CycleId(1))
        .await
        .expect("perceive");

    assert!(perception
        .snapshot
        .nodes
        .iter()
        .all(|n| !matches!(n.tag_name.as_deref(), Some("script") | Some("style"))));
    let texts: Vec<&str> = perception
        .snapshot
        .nodes
        .iter()
        .filter_map(|n| n.text_excerpt.as_deref())
        .collect();
    assert_eq!(texts, vec!["Shown"]);
    assert_eq!(perception.element_list, "_[:]Shown");
}
