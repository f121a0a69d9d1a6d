use std::sync::Arc;

use action_locator::{DefaultElementResolver, ElementResolver, LocatorError, LocatorStrategy};
use dom_adapter::{el, LiveDocument, MemoryDocument, PageFixture};
use perceiver_structural::{StructuralPerceiver, StructuralPerceiverImpl};
use tabpilot_core_types::CycleId;

fn nested_page() -> PageFixture {
    PageFixture::new("https://nest.test/")
        .child(el("button").attr("class", "btn").text("First"))
        .child(el("button").attr("class", "btn").text("Second"))
        .child(el("input").attr("name", "email").attr("placeholder", "a \"quoted\" hint"))
        .child(
            el("x-card")
                .shadow_child(el("button").attr("class", "btn").text("In shadow"))
                .child(el("button").attr("class", "btn").text("Light child")),
        )
        .child(
            el("iframe").frame(
                PageFixture::new("https://nest.test/frame")
                    .child(el("a").attr("href", "/terms").text("Terms"))
                    .child(el("x-widget").shadow_child(el("input").attr("type", "checkbox"))),
            ),
        )
}

#[tokio::test]
async fn every_fresh_index_entry_resolves_to_its_own_node() {
    let doc = MemoryDocument::shared(nested_page());
    let perception = StructuralPerceiverImpl::default()
        .perceive(doc.clone(), CycleId(1))
        .await
        .expect("perceive");
    let resolver = DefaultElementResolver::new();

    assert_eq!(perception.index.len(), 7);
    let mut strategies = Vec::new();
    for entry in perception.index.iter() {
        let node = perception.snapshot.get(entry.node).expect("node");
        let resolution = resolver
            .resolve(doc.clone(), &perception.snapshot, entry.node)
            .await
            .unwrap_or_else(|err| panic!("index {} failed: {err}", entry.index));
        assert_eq!(resolution.handle.node, node.dom_id, "index {}", entry.index);
        assert_eq!(resolution.handle.tag_name(), node.tag_name);
        strategies.push(resolution.strategy);
    }
    assert_eq!(
        strategies,
        vec![
            LocatorStrategy::Direct,
            LocatorStrategy::Direct,
            LocatorStrategy::Direct,
            LocatorStrategy::IsolationRoot,
            LocatorStrategy::Direct,
            LocatorStrategy::EmbeddedDocument,
            LocatorStrategy::IsolationRoot,
        ]
    );
}

#[tokio::test]
async fn frame_content_resolves_in_the_frame_document() {
    let doc = MemoryDocument::shared(nested_page());
    let perception = StructuralPerceiverImpl::default()
        .perceive(doc.clone(), CycleId(1))
        .await
        .expect("perceive");
    let host = doc.find("iframe").expect("iframe");
    let frame = doc.frame_of(host).expect("frame document");

    let link = perception
        .index
        .iter()
        .find(|e| perception.snapshot.get(e.node).and_then(|n| n.tag_name.as_deref()) == Some("a"))
        .expect("link entry");
    let resolution = DefaultElementResolver::new()
        .resolve(doc.clone(), &perception.snapshot, link.node)
        .await
        .expect("resolve");
    let frame_dyn: Arc<dyn LiveDocument> = frame;
    assert!(Arc::ptr_eq(&resolution.handle.document, &frame_dyn));
}

#[tokio::test]
async fn navigation_invalidates_resolution() {
    let doc = MemoryDocument::shared(
        PageFixture::new("https://nav.test/").child(el("button").attr("name", "go").text("Go")),
    );
    let perception = StructuralPerceiverImpl::default()
        .perceive(doc.clone(), CycleId(1))
        .await
        .expect("perceive");
    doc.navigate("https://nav.test/elsewhere").expect("navigate");

    let entry = perception.index.get(0).expect("entry");
    let err = DefaultElementResolver::new()
        .resolve(doc.clone(), &perception.snapshot, entry)
        .await
        .expect_err("stale entry");
    assert!(matches!(err, LocatorError::ElementNotFound(_)));
    assert!(err.is_retryable());
}
