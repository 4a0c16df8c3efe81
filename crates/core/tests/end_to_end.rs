use fremen_core::error::LoadError;
use fremen_core::loader::{CodeLoader, NativeLoader, NodeFunction, ScriptLoader};
use fremen_core::storage::{FilesystemStore, InMemoryStore};
use fremen_core::workflow::WorkflowRunner;
use fremen_core::{Behavior, FailureKind, Node, NodeId, NodeOutput, WorkflowDefinition, WorkflowId};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const IDENTITY: &str = "fn run(inputs, config) { inputs[0] }";
const COLLECT: &str = r#"
fn run(inputs, config) {
    let out = [];
    for x in inputs { out.push(x); }
    out
}
"#;

/// Wraps a loader and counts how many node functions actually get invoked
struct CountingLoader<L> {
    inner: L,
    calls: Arc<AtomicUsize>,
}

struct Counted {
    inner: Arc<dyn NodeFunction>,
    calls: Arc<AtomicUsize>,
}

impl NodeFunction for Counted {
    fn call(&self, inputs: &[NodeOutput], config: &serde_json::Value) -> anyhow::Result<NodeOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.call(inputs, config)
    }
}

impl<L: CodeLoader> CodeLoader for CountingLoader<L> {
    fn load(&self, source: &str) -> Result<Arc<dyn NodeFunction>, LoadError> {
        let inner = self.inner.load(source)?;
        Ok(Arc::new(Counted {
            inner,
            calls: self.calls.clone(),
        }))
    }
}

fn counting_runner(store: InMemoryStore) -> (WorkflowRunner, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let loader = CountingLoader {
        inner: ScriptLoader::default(),
        calls: calls.clone(),
    };
    let store = Arc::new(store);
    (WorkflowRunner::new(store.clone(), store, Arc::new(loader)), calls)
}

#[tokio::test]
async fn absence_flows_through_the_chain() {
    let store = InMemoryStore::new()
        .with_behavior(Behavior::new(1, "identity", IDENTITY))
        .with_behavior(Behavior::new(2, "collect", COLLECT))
        .with_workflow(
            WorkflowDefinition::new(1, "absence")
                .node(Node::new(1))
                .node(Node::new(2).with_behavior(1))
                .node(Node::new(3).with_behavior(2))
                .edge(1, 2)
                .edge(2, 3),
        );
    let (runner, calls) = counting_runner(store);

    let report = runner.run(WorkflowId(1)).await;
    let results = report.results().expect("run should succeed");

    assert_eq!(results.len(), 3);
    assert_eq!(results[&NodeId(1)], None);
    assert_eq!(results[&NodeId(2)], None);
    assert_eq!(results[&NodeId(3)], Some(json!([null])));
    // Node 1 has no behavior and is never invoked
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn fan_in_aggregates_in_edge_order() {
    let store = InMemoryStore::new()
        .with_behavior(Behavior::new(
            1,
            "emit",
            "fn run(inputs, config) { config.value }",
        ))
        .with_behavior(Behavior::new(2, "collect", COLLECT))
        .with_workflow(
            WorkflowDefinition::new(1, "fan-in")
                .node(Node::new(1).with_behavior(1).with_config(r#"{"value": "left"}"#))
                .node(Node::new(2).with_behavior(1).with_config(r#"{"value": "right"}"#))
                .node(Node::new(3))
                .node(Node::new(4).with_behavior(2))
                .edge(2, 4)
                .edge(3, 4)
                .edge(1, 4),
        );
    let (runner, _) = counting_runner(store);

    let report = runner.run(WorkflowId(1)).await;
    assert_eq!(
        report.results().unwrap()[&NodeId(4)],
        Some(json!(["right", null, "left"]))
    );
}

#[tokio::test]
async fn cycle_fails_before_any_node_runs() {
    let store = InMemoryStore::new()
        .with_behavior(Behavior::new(1, "identity", IDENTITY))
        .with_workflow(
            WorkflowDefinition::new(1, "cycle")
                .node(Node::new(1).with_behavior(1))
                .node(Node::new(2).with_behavior(1))
                .node(Node::new(3).with_behavior(1))
                .edge(1, 2)
                .edge(2, 3)
                .edge(3, 2),
        );
    let (runner, calls) = counting_runner(store);

    let report = runner.run(WorkflowId(1)).await;
    assert_eq!(report.failure_kind(), Some(FailureKind::CyclicGraph));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn load_failure_stops_downstream_nodes() {
    let store = InMemoryStore::new()
        .with_behavior(Behavior::new(1, "one", "fn run(inputs, config) { 1 }"))
        .with_behavior(Behavior::new(2, "broken", "fn main() { 1 }"))
        .with_workflow(
            WorkflowDefinition::new(1, "broken")
                .node(Node::new(1).with_behavior(1))
                .node(Node::new(2).with_behavior(2))
                .node(Node::new(3).with_behavior(1))
                .edge(1, 2)
                .edge(2, 3),
        );
    let (runner, calls) = counting_runner(store);

    let report = runner.run(WorkflowId(1)).await;
    assert_eq!(report.failure_kind(), Some(FailureKind::BehaviorLoad));
    assert!(report.error().unwrap().contains("node 2"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let envelope = serde_json::to_value(&report).unwrap();
    assert_eq!(envelope["status"], "failure");
    assert_eq!(envelope["node_id"], 2);
    assert!(envelope.get("result").is_none());
}

#[tokio::test]
async fn script_error_is_reported_as_execution_failure() {
    let store = InMemoryStore::new()
        .with_behavior(Behavior::new(
            1,
            "throws",
            r#"fn run(inputs, config) { throw "upstream unavailable"; }"#,
        ))
        .with_workflow(WorkflowDefinition::new(1, "throws").node(Node::new(7).with_behavior(1)));
    let (runner, _) = counting_runner(store);

    let report = runner.run(WorkflowId(1)).await;
    assert_eq!(report.failure_kind(), Some(FailureKind::NodeExecution));
    assert!(report.error().unwrap().contains("upstream unavailable"));
}

#[tokio::test]
async fn malformed_config_falls_back_to_empty() {
    let store = InMemoryStore::new()
        .with_behavior(Behavior::new(
            1,
            "keys",
            "fn run(inputs, config) { config.keys().len() }",
        ))
        .with_workflow(
            WorkflowDefinition::new(1, "config")
                .node(Node::new(1).with_behavior(1).with_config("{not json"))
                .node(Node::new(2).with_behavior(1).with_config(""))
                .node(Node::new(3).with_behavior(1).with_config(r#"{"a": 1, "b": 2}"#)),
        );
    let (runner, _) = counting_runner(store);

    let report = runner.run(WorkflowId(1)).await;
    let results = report.results().unwrap();
    assert_eq!(results[&NodeId(1)], Some(json!(0)));
    assert_eq!(results[&NodeId(2)], Some(json!(0)));
    assert_eq!(results[&NodeId(3)], Some(json!(2)));
}

#[tokio::test]
async fn repeated_runs_give_identical_results() {
    let store = InMemoryStore::new()
        .with_behavior(Behavior::new(
            1,
            "sum",
            "fn run(inputs, config) { let total = config.base; for x in inputs { total += x; } total }",
        ))
        .with_workflow(
            WorkflowDefinition::new(1, "sum")
                .node(Node::new(1).with_behavior(1).with_config(r#"{"base": 1}"#))
                .node(Node::new(2).with_behavior(1).with_config(r#"{"base": 10}"#))
                .node(Node::new(3).with_behavior(1).with_config(r#"{"base": 100}"#))
                .edge(1, 3)
                .edge(2, 3),
        );
    let (runner, _) = counting_runner(store);

    let first = runner.run(WorkflowId(1)).await;
    let second = runner.run(WorkflowId(1)).await;

    assert_ne!(first.run_id, second.run_id);
    assert_eq!(first.results(), second.results());
    assert_eq!(first.results().unwrap()[&NodeId(3)], Some(json!(111)));
}

#[tokio::test]
async fn filesystem_store_drives_a_run() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        FilesystemStore::new(dir.path().join("workflows"), dir.path().join("behaviors")).unwrap(),
    );

    std::fs::write(
        dir.path().join("behaviors/1.toml"),
        "name = \"shout\"\ncode = '''\nfn run(inputs, config) { config.word.to_upper() }\n'''\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("workflows/12.json"),
        r#"{
            "id": 12,
            "name": "shout",
            "nodes": [
                {"id": 1, "node_type_id": 1, "config": "{\"word\": \"hello\"}",
                 "position": {"x": 0.0, "y": 0.0}, "size": {"width": 200.0, "height": 100.0}},
                {"id": 2, "node_type_id": null, "config": null}
            ],
            "edges": [{"id": 1, "source": 1, "target": 2, "label": null}]
        }"#,
    )
    .unwrap();

    let runner = WorkflowRunner::new(store.clone(), store, Arc::new(ScriptLoader::default()));
    let report = runner.run(WorkflowId(12)).await;

    let results = report.results().expect("run should succeed");
    assert_eq!(results[&NodeId(1)], Some(json!("HELLO")));
    assert_eq!(results[&NodeId(2)], None);

    let envelope = serde_json::to_value(&report).unwrap();
    assert_eq!(envelope["result"], json!({"1": "HELLO", "2": null}));
}

#[tokio::test]
async fn native_behaviors_run_alongside_stored_definitions() {
    let mut loader = NativeLoader::new();
    loader.register("len", |inputs: &[NodeOutput], _: &serde_json::Value| {
        Ok(Some(json!(inputs.iter().flatten().count())))
    });

    let store = Arc::new(
        InMemoryStore::new()
            .with_behavior(Behavior::new(1, "len", "len"))
            .with_workflow(
                WorkflowDefinition::new(1, "native")
                    .node(Node::new(1))
                    .node(Node::new(2).with_behavior(1))
                    .node(Node::new(3).with_behavior(1))
                    .edge(1, 2)
                    .edge(2, 3),
            ),
    );
    let runner = WorkflowRunner::new(store.clone(), store, Arc::new(loader));

    let report = runner.run(WorkflowId(1)).await;
    let results = report.results().unwrap();
    assert_eq!(results[&NodeId(2)], Some(json!(0)));
    assert_eq!(results[&NodeId(3)], Some(json!(1)));
}
