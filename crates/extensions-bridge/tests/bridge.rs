use std::sync::Arc;

use action_primitives::{
    AgentAction, BatchExecutor, ExecutorSettings, PageRequest, PageResponse, PageState,
};
use dom_adapter::{el, LiveDocument, MemoryDocument, PageFixture};
use extensions_bridge::{BridgeConfig, BridgeError, BridgeEvent, PageBridge, TabHandle};
use serde_json::json;
use tabpilot_core_types::CycleId;
use tokio_util::sync::CancellationToken;

fn shop() -> PageFixture {
    PageFixture::new("https://shop.test/")
        .child(el("button").attr("id", "buy").text("Buy"))
        .child(el("a").attr("href", "/cart").text("Cart"))
        .child(el("input").attr("name", "coupon"))
        .route(
            "https://shop.test/cart",
            PageFixture::new("https://shop.test/cart").child(el("button").text("Checkout")),
        )
}

fn bridge() -> Arc<PageBridge> {
    PageBridge::new(BridgeConfig::default(), ExecutorSettings::minimal())
}

async fn state(tab: &TabHandle) -> PageState {
    match tab
        .request(PageRequest::GetPageState {
            capture_screenshot: false,
        })
        .await
        .expect("page state")
    {
        PageResponse::State(state) => state,
        other => panic!("unexpected response: {other:?}"),
    }
}

fn batch(raw: serde_json::Value) -> Vec<AgentAction> {
    let raw: Vec<serde_json::Value> = serde_json::from_value(raw).unwrap();
    AgentAction::parse_batch(&raw).unwrap()
}

#[tokio::test]
async fn batch_runs_through_the_tab_actor() {
    let bridge = bridge();
    let doc = MemoryDocument::shared(shop());
    let tab = bridge.open_tab(doc.clone());

    let state = state(&tab).await;
    assert_eq!(state.element_count, 3);
    assert!(state.element_list.contains("0[:]<button>Buy</button>"));

    let actions = batch(json!([
        {"action": "click", "index": 0},
        {"action": "fill", "index": 2, "value": "SAVE10"}
    ]));
    let outcome = BatchExecutor::new(&ExecutorSettings::minimal())
        .execute(&tab, state.cycle, &actions, &CancellationToken::new())
        .await;

    assert!(outcome.all_succeeded(), "{outcome:?}");
    let buy = doc.find("#buy").unwrap();
    let coupon = doc.find("input").unwrap();
    assert_eq!(doc.count_events(buy, "click"), 1);
    assert_eq!(doc.value(coupon).as_deref(), Some("SAVE10"));
    assert_eq!(doc.count_events(coupon, "change"), 1);
}

#[tokio::test]
async fn released_cycles_cannot_be_reused() {
    let bridge = bridge();
    let doc = MemoryDocument::shared(shop());
    let tab = bridge.open_tab(doc.clone());
    let executor = BatchExecutor::new(&ExecutorSettings::minimal());

    let state = state(&tab).await;
    executor
        .execute(&tab, state.cycle, &batch(json!([{"action": "scroll_down"}])), &CancellationToken::new())
        .await;

    let replay = executor
        .execute(
            &tab,
            state.cycle,
            &batch(json!([{"action": "click", "index": 0}])),
            &CancellationToken::new(),
        )
        .await;
    assert!(replay.first_error().unwrap().contains("stale index 0"));
    assert_eq!(doc.events_of_kind("click"), 0);
}

#[tokio::test]
async fn navigation_retires_the_index_mid_batch() {
    let bridge = bridge();
    let doc = MemoryDocument::shared(shop());
    let tab = bridge.open_tab(doc.clone());

    let state = state(&tab).await;
    let actions = batch(json!([
        {"action": "click", "index": 1},
        {"action": "click", "index": 0}
    ]));
    let outcome = BatchExecutor::new(&ExecutorSettings::minimal())
        .execute(&tab, state.cycle, &actions, &CancellationToken::new())
        .await;

    assert_eq!(doc.url(), "https://shop.test/cart");
    assert_eq!(outcome.outcomes.len(), 2);
    assert!(outcome.outcomes[0].success);
    assert!(outcome.first_error().unwrap().contains("stale index 0"));
    assert_eq!(doc.events_of_kind("click"), 1);

    let fresh = state_after(&tab, state.cycle).await;
    assert!(fresh.element_list.contains("Checkout"));
}

async fn state_after(tab: &TabHandle, previous: CycleId) -> PageState {
    let next = state(tab).await;
    assert!(next.cycle > previous);
    next
}

#[tokio::test]
async fn registry_tracks_tabs_and_emits_events() {
    let bridge = bridge();
    let mut events = bridge.subscribe();
    let tab = bridge.open_tab(MemoryDocument::shared(shop()));
    let id = tab.tab().clone();

    assert_eq!(bridge.tabs(), vec![id.clone()]);
    match events.recv().await.unwrap() {
        BridgeEvent::TabOpened { tab, url } => {
            assert_eq!(tab, id);
            assert_eq!(url, "https://shop.test/");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let response = bridge.send(&id, PageRequest::CheckReadiness).await.unwrap();
    assert_eq!(response, PageResponse::Ready { ready: true });
    assert!(matches!(
        events.recv().await.unwrap(),
        BridgeEvent::RequestOk { ref request, .. } if request == "check_readiness"
    ));

    bridge.close_tab(&id).await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), BridgeEvent::RequestOk { .. }));
    assert_eq!(events.recv().await.unwrap(), BridgeEvent::TabClosed { tab: id.clone() });
    assert!(matches!(bridge.tab(&id), Err(BridgeError::TabNotFound(ref t)) if *t == id));
    assert!(bridge.tabs().is_empty());
}

#[test]
fn events_serialize_with_a_tag() {
    let event = BridgeEvent::TabClosed {
        tab: "tab-1".parse().unwrap(),
    };
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({"event": "tab_closed", "tab": "tab-1"})
    );
}
