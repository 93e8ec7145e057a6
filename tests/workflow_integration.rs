use std::sync::Arc;

use futures::StreamExt;
use pagecraft::agents::{Agents, RoutingPolicy};
use pagecraft::aggregator::StreamAggregator;
use pagecraft::llm::ScriptedCompletion;
use pagecraft::normalized::ChatEvent;
use pagecraft::page::PageStore;
use pagecraft::prompts::PromptStore;
use pagecraft::workflow::{WorkflowEngine, WorkflowState};

struct Fixture {
    _dir: tempfile::TempDir,
    pages: Arc<PageStore>,
    script: Arc<ScriptedCompletion>,
    agents: Arc<Agents>,
}

fn fixture(script: ScriptedCompletion, policy: RoutingPolicy) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let pages = Arc::new(PageStore::new(dir.path().join("page.html")));
    let script = Arc::new(script);
    let agents = Arc::new(Agents::new(
        Arc::clone(&script) as _,
        Arc::new(PromptStore::builtin()),
        Arc::clone(&pages),
        policy,
    ));
    Fixture {
        _dir: dir,
        pages,
        script,
        agents,
    }
}

/// One request, the way the chat endpoint drives it.
async fn turn(f: &Fixture, request_id: &str, message: &str) -> Vec<ChatEvent> {
    let existing = f.pages.read_existing().await.unwrap();
    let engine = WorkflowEngine::new(Arc::clone(&f.agents));
    StreamAggregator::new(engine, request_id)
        .into_stream(WorkflowState::new(message, existing))
        .collect()
        .await
}

fn completed(events: &[ChatEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::NotUpdate { node, .. } => Some(node.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_router_labels_follow_their_fixed_path() {
    let cases = [
        ("WRITE_CODE", vec!["route", "plan", "generate"]),
        ("write_code", vec!["route", "plan", "generate"]),
        ("  Write-Code\n", vec!["route", "plan", "generate"]),
        ("RESPOND_NATURALLY", vec!["route", "respond"]),
        (" respond-naturally ", vec!["route", "respond"]),
    ];

    for (label, expected) in cases {
        let f = fixture(
            ScriptedCompletion::new()
                .reply(label)
                .reply("first")
                .reply("<html></html>"),
            RoutingPolicy::Strict,
        );

        let events = turn(&f, "req_case", "do something").await;

        assert_eq!(completed(&events), expected, "label {label:?}");
        assert!(!events.iter().any(|e| e.kind() == "error"), "label {label:?}");
    }
}

#[tokio::test]
async fn test_unknown_label_under_strict_policy_is_one_error() {
    let f = fixture(
        ScriptedCompletion::new().reply("DELETE_EVERYTHING"),
        RoutingPolicy::Strict,
    );

    let events = turn(&f, "req_strict", "hmm").await;
    let kinds: Vec<&str> = events.iter().map(ChatEvent::kind).collect();

    // The route token is streamed before classification fails.
    assert_eq!(kinds, vec!["start", "update", "error", "final"]);
    let ChatEvent::Error { error, .. } = &events[2] else {
        panic!("expected error");
    };
    assert!(error.contains("DELETE_EVERYTHING"), "{error}");
}

#[tokio::test]
async fn test_second_turn_sees_page_from_first() {
    let f = fixture(
        ScriptedCompletion::new()
            .reply("WRITE_CODE")
            .reply("1. Title")
            .reply("<html><h1>Cats</h1></html>")
            .reply("RESPOND_NATURALLY")
            .reply("It has a title."),
        RoutingPolicy::Fallback,
    );

    turn(&f, "req_1", "a page about cats").await;
    let events = turn(&f, "req_2", "what is on the page?").await;

    assert_eq!(completed(&events), vec!["route", "respond"]);
    let prompts = f.script.prompts();
    assert_eq!(prompts.len(), 5);
    // Route and respond of the second turn both carried the stored page.
    assert!(prompts[3].contains("<html><h1>Cats</h1></html>"));
    assert!(prompts[4].contains("<html><h1>Cats</h1></html>"));
    assert!(events.iter().all(|e| e.request_id() == "req_2"));
}

#[tokio::test]
async fn test_generate_failure_keeps_previous_page() {
    let f = fixture(
        ScriptedCompletion::new()
            .reply("WRITE_CODE")
            .reply("plan")
            .reply("<html>v1</html>")
            .reply("WRITE_CODE")
            .reply("plan")
            .fail("connection reset"),
        RoutingPolicy::Fallback,
    );

    turn(&f, "req_1", "v1").await;
    let events = turn(&f, "req_2", "v2").await;

    assert_eq!(completed(&events), vec!["route", "plan"]);
    assert_eq!(events.iter().filter(|e| e.kind() == "error").count(), 1);
    assert_eq!(events.last().map(ChatEvent::kind), Some("final"));
    assert_eq!(f.pages.read_existing().await.unwrap(), "<html>v1</html>");
}

#[tokio::test]
async fn test_not_update_values_carry_step_updates() {
    let f = fixture(
        ScriptedCompletion::new()
            .reply("WRITE_CODE")
            .reply("1. Header")
            .reply("<html>x</html>"),
        RoutingPolicy::Fallback,
    );

    let events = turn(&f, "req_v", "go").await;

    let values: Vec<serde_json::Value> = events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::NotUpdate { value, .. } => Some(serde_json::from_str(value).unwrap()),
            _ => None,
        })
        .collect();
    assert_eq!(values[0], serde_json::json!({ "route": { "next": "design_and_plan" } }));
    assert_eq!(values[1], serde_json::json!({ "plan": { "design_plan": "1. Header" } }));
    assert_eq!(
        values[2]["generate"]["final_html_content"],
        serde_json::json!("<html>x</html>")
    );
}
