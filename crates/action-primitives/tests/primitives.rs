use std::sync::Arc;

use action_primitives::{
    ActionError, ActionPrimitives, DefaultActionPrimitives, ExecCtx, ExecutorSettings,
    ExtractFormat, ScrollDirection,
};
use dom_adapter::{el, LiveDocument, MemoryDocument, PageFixture};
use perceiver_structural::{Perception, StructuralPerceiver, StructuralPerceiverImpl};
use tabpilot_core_types::CycleId;
use tokio_util::sync::CancellationToken;

fn form_page() -> PageFixture {
    PageFixture::new("https://form.test/")
        .child(el("button").attr("id", "go").text("Go"))
        .child(el("a").attr("href", "/next").text("Next"))
        .child(el("input").attr("name", "q").attr("value", "old"))
        .child(el("x-panel").shadow_child(el("button").attr("id", "inner").text("Inner")))
        .route(
            "https://form.test/next",
            PageFixture::new("https://form.test/next").child(el("h1").text("Next page")),
        )
}

async fn perceive(doc: Arc<MemoryDocument>) -> Perception {
    StructuralPerceiverImpl::default()
        .perceive(doc, CycleId(1))
        .await
        .expect("perceive")
}

fn ctx(doc: &Arc<MemoryDocument>) -> ExecCtx {
    ExecCtx::new(doc.clone(), CancellationToken::new())
}

#[tokio::test]
async fn activate_clicks_exactly_once() {
    let doc = MemoryDocument::shared(form_page());
    let perception = perceive(doc.clone()).await;
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let node = perception.index.resolve(0).unwrap();

    let report = primitives
        .activate(&ctx(&doc), &perception.snapshot, node)
        .await
        .expect("activate");

    let button = doc.find("#go").unwrap();
    assert_eq!(doc.count_events(button, "click"), 1);
    assert_eq!(doc.events_of_kind("click"), 1);
    assert_eq!(report.located_by.as_deref(), Some("direct"));
    assert!(doc.pointer().is_some());
    assert!(doc.attribute(button, "data-tabpilot-highlight").is_none());
}

#[tokio::test]
async fn activate_reaches_into_isolation_roots() {
    let doc = MemoryDocument::shared(form_page());
    let perception = perceive(doc.clone()).await;
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let node = perception.index.resolve(3).unwrap();

    let report = primitives
        .activate(&ctx(&doc), &perception.snapshot, node)
        .await
        .expect("activate");

    let host = doc.find("x-panel").unwrap();
    let inner = doc.find_in_shadow(host, "#inner").unwrap();
    assert_eq!(doc.count_events(inner, "click"), 1);
    assert_eq!(report.located_by.as_deref(), Some("isolation-root"));
}

#[tokio::test]
async fn disabled_targets_get_synthetic_events_instead() {
    let doc = MemoryDocument::shared(
        PageFixture::new("https://form.test/")
            .child(el("button").attr("id", "off").attr("disabled", "").text("Off")),
    );
    let perception = perceive(doc.clone()).await;
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let node = perception.index.resolve(0).unwrap();

    primitives
        .activate(&ctx(&doc), &perception.snapshot, node)
        .await
        .expect("activate");

    let button = doc.find("#off").unwrap();
    assert_eq!(doc.count_events(button, "mousedown"), 1);
    assert_eq!(doc.count_events(button, "mouseup"), 1);
    assert_eq!(doc.count_events(button, "click"), 1);
}

#[tokio::test]
async fn set_value_types_character_by_character() {
    let doc = MemoryDocument::shared(form_page());
    let perception = perceive(doc.clone()).await;
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let node = perception.index.resolve(2).unwrap();

    primitives
        .set_value(&ctx(&doc), &perception.snapshot, node, "hello")
        .await
        .expect("set value");

    let input = doc.find("input[name=\"q\"]").unwrap();
    assert_eq!(doc.value(input).as_deref(), Some("hello"));
    assert_eq!(doc.count_events(input, "change"), 1);
    assert_eq!(doc.count_events(input, "keydown"), 5);
    assert_eq!(doc.count_events(input, "keyup"), 5);
    assert_eq!(doc.count_events(input, "input"), 6);
    assert_eq!(doc.active_element(), Some(input));
    assert!(doc.attribute(input, "data-tabpilot-highlight").is_none());
}

#[tokio::test]
async fn stale_nodes_fail_after_navigation() {
    let doc = MemoryDocument::shared(form_page());
    let perception = perceive(doc.clone()).await;
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let context = ctx(&doc);

    primitives
        .navigate(&context, "https://form.test/next")
        .await
        .expect("navigate");
    assert_eq!(doc.url(), "https://form.test/next");

    let node = perception.index.resolve(0).unwrap();
    let err = primitives
        .activate(&context, &perception.snapshot, node)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::TargetNotFound(_)), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn cancelled_context_is_interrupted() {
    let doc = MemoryDocument::shared(form_page());
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let context = ctx(&doc);
    context.cancel_token.cancel();

    let err = primitives.scroll(&context, ScrollDirection::Down, None).await.unwrap_err();
    assert_eq!(err, ActionError::Interrupted("context cancelled".into()));
}

#[tokio::test]
async fn scroll_defaults_to_one_viewport() {
    let tall = (0..80).fold(PageFixture::new("https://long.test/"), |page, n| {
        page.child(el("p").text(format!("Paragraph {n}")))
    });
    let doc = MemoryDocument::shared(tall);
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let context = ctx(&doc);
    let height = doc.viewport().height;

    primitives.scroll(&context, ScrollDirection::Down, None).await.unwrap();
    assert_eq!(doc.viewport().scroll_y, height);
    primitives
        .scroll(&context, ScrollDirection::Up, Some(height))
        .await
        .unwrap();
    assert_eq!(doc.viewport().scroll_y, 0.0);
    assert!(matches!(
        primitives.scroll(&context, ScrollDirection::Up, Some(-5.0)).await,
        Err(ActionError::InvalidAction(_))
    ));
}

#[tokio::test]
async fn send_keys_targets_the_focused_field() {
    let doc = MemoryDocument::shared(form_page());
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let context = ctx(&doc);
    let input = doc.find("input").unwrap();

    primitives.send_keys(&context, "x").await.unwrap();
    assert_eq!(doc.events_of_kind("keydown"), 0);

    doc.focus(input).unwrap();
    doc.set_value(input, "ab").unwrap();
    primitives.send_keys(&context, "c").await.unwrap();
    assert_eq!(doc.value(input).as_deref(), Some("abc"));
    assert_eq!(doc.count_events(input, "change"), 1);

    primitives.send_keys(&context, "Enter").await.unwrap();
    assert_eq!(doc.count_events(input, "keydown"), 1);
}

#[tokio::test]
async fn extract_returns_body_content() {
    let doc = MemoryDocument::shared(
        PageFixture::new("https://read.test/")
            .child(el("h1").text("Heading"))
            .child(el("p").text("Body copy")),
    );
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let context = ctx(&doc);

    let text = primitives.extract(&context, ExtractFormat::Text).await.unwrap();
    let text = text.content.unwrap();
    assert!(text.contains("Heading") && text.contains("Body copy"));

    let markdown = primitives
        .extract(&context, ExtractFormat::Markdown)
        .await
        .unwrap()
        .content
        .unwrap();
    assert!(markdown.starts_with("# Heading"), "{markdown}");
}

#[tokio::test]
async fn cleanup_removes_overlays() {
    let doc = MemoryDocument::shared(form_page());
    let perception = perceive(doc.clone()).await;
    let primitives = DefaultActionPrimitives::new(&ExecutorSettings::minimal());
    let context = ctx(&doc);
    let node = perception.index.resolve(0).unwrap();
    primitives
        .activate(&context, &perception.snapshot, node)
        .await
        .unwrap();

    primitives.cleanup(&context);
    let button = doc.find("#go").unwrap();
    assert!(doc.pointer().is_none());
    assert!(doc.attribute(button, "data-tabpilot-highlight").is_none());
}
