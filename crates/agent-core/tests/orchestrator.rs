use std::sync::Arc;
use std::time::Duration;

use action_primitives::ExecutorSettings;
use agent_core::{
    AgentError, AgentRole, CheckpointDecision, CheckpointHandler, HistoryStore,
    InMemoryHistoryStore, Orchestrator, OrchestratorConfig, OrchestratorState, PlanStep,
    ReasoningRequest, ReasoningService, ScriptedReasoner, Task, TaskStatus, MAX_RETRIES_EXCEEDED,
    MAX_STEPS_EXCEEDED, SESSION_RESET,
};
use action_primitives::PageState;
use async_trait::async_trait;
use dom_adapter::{el, LiveDocument, MemoryDocument, PageFixture};
use extensions_bridge::{BridgeConfig, PageBridge, TabHandle};
use serde_json::{json, Value};

fn page() -> PageFixture {
    PageFixture::new("https://todo.test/")
        .child(el("button").attr("id", "add").text("Add"))
        .child(el("input").attr("name", "title"))
}

fn open(doc: Arc<MemoryDocument>) -> TabHandle {
    PageBridge::new(BridgeConfig::default(), ExecutorSettings::minimal()).open_tab(doc)
}

fn plan(steps: usize) -> Value {
    let steps: Vec<Value> = (0..steps)
        .map(|n| {
            json!({
                "type": "action",
                "description": format!("step {n}"),
                "success_criteria": "item added",
                "confidence_level": 0.8
            })
        })
        .collect();
    json!({ "action_plan": steps })
}

fn click_add() -> Value {
    json!({
        "current_state": {"evaluation_previous_goal": "Unknown", "memory": "", "next_goal": "add item"},
        "actions": [{"action": "click", "index": 0, "description": "press add"}]
    })
}

fn verdict(success: bool) -> Value {
    json!({
        "evaluation": if success { "success" } else { "failure" },
        "reason": if success { "added" } else { "nothing changed" },
        "confidence": 0.9
    })
}

fn orchestrator(reasoner: Arc<ScriptedReasoner>, config: OrchestratorConfig) -> Orchestrator {
    Orchestrator::new(config, reasoner, Arc::new(InMemoryHistoryStore::new()))
}

#[tokio::test]
async fn four_failures_then_success_completes() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(1));
    for attempt in 0..5 {
        reasoner.push_json(AgentRole::Executor, click_add());
        reasoner.push_json(AgentRole::Evaluator, verdict(attempt == 4));
    }
    let doc = MemoryDocument::shared(page());
    let tab = open(doc.clone());

    let outcome = orchestrator(reasoner.clone(), OrchestratorConfig::minimal())
        .run(&tab, "add a todo")
        .await;

    assert!(outcome.success, "{outcome:?}");
    assert_eq!(outcome.retries, 4);
    assert_eq!(outcome.steps_completed, 1);
    assert_eq!(outcome.state, OrchestratorState::Completed);
    let add = doc.find("#add").unwrap();
    assert_eq!(doc.count_events(add, "click"), 5);
}

#[tokio::test]
async fn repeated_failures_exhaust_retries() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(1));
    for _ in 0..6 {
        reasoner.push_json(AgentRole::Executor, click_add());
        reasoner.push_json(AgentRole::Evaluator, verdict(false));
    }
    let tab = open(MemoryDocument::shared(page()));

    let outcome = orchestrator(reasoner.clone(), OrchestratorConfig::minimal())
        .run(&tab, "add a todo")
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some(MAX_RETRIES_EXCEEDED));
    assert_eq!(outcome.retries, 5);
    assert_eq!(outcome.state, OrchestratorState::Aborted);
    assert_eq!(reasoner.requests_for(AgentRole::Executor).len(), 5);
}

#[tokio::test]
async fn step_budget_stops_long_plans() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(4));
    for _ in 0..4 {
        reasoner.push_json(AgentRole::Executor, click_add());
        reasoner.push_json(AgentRole::Evaluator, verdict(true));
    }
    let tab = open(MemoryDocument::shared(page()));

    let outcome = orchestrator(
        reasoner.clone(),
        OrchestratorConfig::minimal().with_max_steps(2),
    )
    .run(&tab, "add four todos")
    .await;

    assert_eq!(outcome.error.as_deref(), Some(MAX_STEPS_EXCEEDED));
    assert_eq!(outcome.steps_completed, 2);
    assert_eq!(reasoner.requests_for(AgentRole::Executor).len(), 2);
}

#[tokio::test]
async fn loop_is_bounded_by_steps_plus_retries() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(20));
    for n in 0..20 {
        reasoner.push_json(AgentRole::Executor, click_add());
        reasoner.push_json(AgentRole::Evaluator, verdict(n % 2 == 0));
    }
    let tab = open(MemoryDocument::shared(page()));
    let config = OrchestratorConfig::minimal()
        .with_max_steps(4)
        .with_max_retries(3);

    let outcome = orchestrator(reasoner.clone(), config).run(&tab, "keep going").await;

    assert!(!outcome.success);
    assert!(reasoner.requests_for(AgentRole::Executor).len() <= 4 + 3);
}

#[tokio::test]
async fn done_action_finishes_without_evaluation() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(3));
    reasoner.push_json(
        AgentRole::Executor,
        json!({
            "current_state": {"evaluation_previous_goal": "Success", "memory": "all set"},
            "actions": [
                {"action": "fill", "index": 1, "value": "milk", "description": "type"},
                {"action": "done", "description": "finish", "text": "added milk"},
                {"action": "click", "index": 0, "description": "never runs"}
            ]
        }),
    );
    let doc = MemoryDocument::shared(page());
    let tab = open(doc.clone());

    let outcome = orchestrator(reasoner.clone(), OrchestratorConfig::minimal())
        .run(&tab, "add milk")
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.final_text.as_deref(), Some("added milk"));
    assert!(reasoner.requests_for(AgentRole::Evaluator).is_empty());
    let add = doc.find("#add").unwrap();
    assert_eq!(doc.count_events(add, "click"), 0);
    let title = doc.find("input").unwrap();
    assert_eq!(doc.value(title).as_deref(), Some("milk"));
}

#[tokio::test]
async fn unknown_action_counts_as_failed_attempt() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(1));
    reasoner.push_json(
        AgentRole::Executor,
        json!({
            "current_state": {"evaluation_previous_goal": "Unknown", "memory": ""},
            "actions": [{"action": "hover", "index": 0, "description": "?"}]
        }),
    );
    let tab = open(MemoryDocument::shared(page()));

    let outcome = orchestrator(
        reasoner.clone(),
        OrchestratorConfig::minimal().with_max_retries(1),
    )
    .run(&tab, "hover")
    .await;

    assert_eq!(outcome.error.as_deref(), Some(MAX_RETRIES_EXCEEDED));
    assert!(reasoner.requests_for(AgentRole::Evaluator).is_empty());
}

#[tokio::test]
async fn collaborator_failure_fails_the_task() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    let tab = open(MemoryDocument::shared(page()));

    let outcome = orchestrator(reasoner, OrchestratorConfig::minimal())
        .run(&tab, "anything")
        .await;

    assert_eq!(
        outcome.error.as_deref(),
        Some("collaborator error: no scripted reply left for planner")
    );
}

#[tokio::test]
async fn empty_plan_aborts() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(0));
    let tab = open(MemoryDocument::shared(page()));

    let outcome = orchestrator(reasoner, OrchestratorConfig::minimal())
        .run(&tab, "nothing to do")
        .await;

    assert_eq!(outcome.error.as_deref(), Some("planner returned an empty plan"));
}

#[tokio::test]
async fn each_role_sees_only_its_own_history() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(1));
    for attempt in 0..2 {
        reasoner.push_json(AgentRole::Executor, click_add());
        reasoner.push_json(AgentRole::Evaluator, verdict(attempt == 1));
    }
    let history = Arc::new(InMemoryHistoryStore::new());
    let orchestrator = Orchestrator::new(
        OrchestratorConfig::minimal().with_vision(false),
        reasoner.clone(),
        history.clone(),
    );
    let tab = open(MemoryDocument::shared(page()));

    let outcome = orchestrator.run(&tab, "add a todo").await;
    assert!(outcome.success);

    let executor_calls = reasoner.requests_for(AgentRole::Executor);
    assert!(executor_calls[0].history.is_empty());
    let retry_history = &executor_calls[1].history;
    assert_eq!(retry_history.len(), 2);
    assert!(retry_history.iter().all(|e| e.agent == AgentRole::Executor));
    assert!(executor_calls[1].screenshot.is_none());
    assert!(executor_calls[1]
        .elements
        .as_deref()
        .unwrap()
        .contains("0[:]<button>Add</button>"));

    // planner 2 + executor 2x2 + evaluator 2x2
    let stored = history.entries_for(&outcome.task_id, None, None).await.unwrap();
    assert_eq!(stored.len(), 10);
}

#[tokio::test]
async fn retry_is_told_why_the_last_attempt_failed() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(1));
    reasoner.push_json(AgentRole::Executor, click_add());
    reasoner.push_json(
        AgentRole::Evaluator,
        json!({"evaluation": "failure", "reason": "autocomplete popup still open", "confidence": 0.8}),
    );
    reasoner.push_json(AgentRole::Executor, click_add());
    reasoner.push_json(AgentRole::Evaluator, verdict(true));
    let tab = open(MemoryDocument::shared(page()));

    let outcome = orchestrator(reasoner.clone(), OrchestratorConfig::minimal())
        .run(&tab, "add a todo")
        .await;
    assert!(outcome.success, "{outcome:?}");

    let executor_calls = reasoner.requests_for(AgentRole::Executor);
    assert!(!executor_calls[0].prompt.contains("previous attempt"));
    let retry = &executor_calls[1].prompt;
    assert!(retry.contains("The previous attempt failed: autocomplete popup still open."));
    assert!(retry.contains("Its action results: "));
}

#[tokio::test]
async fn screenshots_are_written_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(AgentRole::Planner, plan(1));
    reasoner.push_json(AgentRole::Executor, click_add());
    reasoner.push_json(AgentRole::Evaluator, verdict(true));
    let tab = open(MemoryDocument::shared(page()));

    let outcome = orchestrator(
        reasoner.clone(),
        OrchestratorConfig::minimal().with_screenshot_dir(dir.path()),
    )
    .run(&tab, "add a todo")
    .await;

    assert!(outcome.success);
    let saved = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(saved, 3);
    let planner = &reasoner.requests_for(AgentRole::Planner)[0];
    assert!(planner.screenshot.is_some());
}

struct ReplanOnce {
    fired: parking_lot::Mutex<bool>,
}

#[async_trait]
impl CheckpointHandler for ReplanOnce {
    async fn on_checkpoint(&self, _: &Task, _: &PlanStep, _: &PageState) -> CheckpointDecision {
        let mut fired = self.fired.lock();
        if *fired {
            CheckpointDecision::Continue
        } else {
            *fired = true;
            CheckpointDecision::Replan
        }
    }
}

#[tokio::test]
async fn checkpoint_can_request_a_new_plan() {
    let reasoner = Arc::new(ScriptedReasoner::new());
    reasoner.push_json(
        AgentRole::Planner,
        json!({"action_plan": [
            {"type": "checkpoint", "description": "look at the list"},
            {"type": "action", "description": "stale step"}
        ]}),
    );
    reasoner.push_json(AgentRole::Planner, plan(1));
    reasoner.push_json(AgentRole::Executor, click_add());
    reasoner.push_json(AgentRole::Evaluator, verdict(true));
    let tab = open(MemoryDocument::shared(page()));

    let outcome = orchestrator(reasoner.clone(), OrchestratorConfig::minimal())
        .with_checkpoint_handler(Arc::new(ReplanOnce {
            fired: parking_lot::Mutex::new(false),
        }))
        .run(&tab, "review then add")
        .await;

    assert!(outcome.success, "{outcome:?}");
    assert_eq!(outcome.steps_completed, 2);
    let replan = &reasoner.requests_for(AgentRole::Planner)[1];
    assert!(replan.prompt.contains("Already completed: look at the list"));
    let executed = &reasoner.requests_for(AgentRole::Executor)[0];
    assert!(executed.prompt.contains("step 0"));
}

/// Never answers; lets a test reset the session mid-task.
struct Stalled;

#[async_trait]
impl ReasoningService for Stalled {
    async fn complete(&self, _: &ReasoningRequest) -> Result<String, AgentError> {
        std::future::pending::<()>().await;
        Err(AgentError::collaborator("unreachable"))
    }
}

#[tokio::test]
async fn reset_abandons_the_running_task() {
    let history = Arc::new(InMemoryHistoryStore::new());
    let orchestrator = Arc::new(Orchestrator::new(
        OrchestratorConfig::minimal(),
        Arc::new(Stalled),
        history.clone(),
    ));
    let tab = open(MemoryDocument::shared(page()));

    let running = {
        let orchestrator = orchestrator.clone();
        let tab = tab.clone();
        tokio::spawn(async move { orchestrator.run(&tab, "wait forever").await })
    };
    while history.is_empty() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    orchestrator.reset(&tab).await.unwrap();
    let outcome = running.await.unwrap();

    assert_eq!(outcome.error.as_deref(), Some(SESSION_RESET));
    let task = orchestrator.current_task().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error.as_deref(), Some(SESSION_RESET));
    assert!(history.is_empty());
}
