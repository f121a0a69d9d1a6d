use agent_core::{
    AgentRole, ConversationEntry, ConversationRole, HistoryStore, JsonFileHistoryStore,
};
use tabpilot_core_types::{PlanStepId, TaskId};

fn entry(task: &TaskId, step: Option<&PlanStepId>, agent: AgentRole, text: &str) -> ConversationEntry {
    ConversationEntry::new(
        ConversationRole::User,
        agent,
        task.clone(),
        step.cloned(),
        text,
    )
}

#[tokio::test]
async fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("history.json");
    let task = TaskId::new();
    let step = PlanStepId::new();

    let store = JsonFileHistoryStore::new(&path);
    assert!(store.all().await.unwrap().is_empty());
    store
        .append(entry(&task, None, AgentRole::Planner, "plan it"))
        .await
        .unwrap();
    store
        .append(entry(&task, Some(&step), AgentRole::Executor, "do it"))
        .await
        .unwrap();
    store
        .append(entry(&TaskId::new(), None, AgentRole::Planner, "other task"))
        .await
        .unwrap();

    let reopened = JsonFileHistoryStore::new(&path);
    assert_eq!(reopened.all().await.unwrap().len(), 3);
    let scoped = reopened
        .entries_for(&task, Some(&step), Some(AgentRole::Executor))
        .await
        .unwrap();
    assert_eq!(scoped.len(), 1);
    assert_eq!(scoped[0].content, "do it");

    reopened.clear().await.unwrap();
    assert!(store.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn corrupt_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(&path, "not json").unwrap();

    let err = JsonFileHistoryStore::new(&path).all().await.unwrap_err();
    assert!(err.to_string().starts_with("history store error: corrupt history file"));
}
