use anyhow::{Context, Result};
use fremen_core::storage::{BehaviorStore, WorkflowStore};
use fremen_core::workflow::WorkflowRunner;
use fremen_core::{BehaviorSummary, FailureKind, NodeId, WorkflowId, WorkflowSummary};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum CheckOutput {
    Valid {
        workflow_id: WorkflowId,
        order: Vec<NodeId>,
    },
    Invalid {
        workflow_id: WorkflowId,
        error: String,
        kind: FailureKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        node_id: Option<NodeId>,
    },
}

#[derive(Debug, Serialize)]
struct ListOutput {
    workflows: Vec<WorkflowSummary>,
    behaviors: Vec<BehaviorSummary>,
}

/// Run every requested workflow concurrently and print one report per line
/// (or per pretty-printed block). Returns whether all runs succeeded.
pub async fn run(
    runner: &WorkflowRunner,
    ids: &[i64],
    compact: bool,
    out: &mut impl Write,
) -> Result<bool> {
    let reports =
        futures::future::join_all(ids.iter().map(|&id| runner.run(WorkflowId(id)))).await;

    let mut all_succeeded = true;
    for report in &reports {
        all_succeeded &= report.is_success();
        write_json(out, report, compact)?;
    }

    Ok(all_succeeded)
}

/// Validate a workflow and print its execution order
pub fn check(runner: &WorkflowRunner, id: i64, out: &mut impl Write) -> Result<bool> {
    let workflow_id = WorkflowId(id);
    let output = match runner.check(workflow_id) {
        Ok(order) => CheckOutput::Valid { workflow_id, order },
        Err(e) => {
            tracing::error!("Workflow {} is not runnable: {}", workflow_id, e);
            CheckOutput::Invalid {
                workflow_id,
                error: e.to_string(),
                kind: e.kind(),
                node_id: e.node_id(),
            }
        }
    };

    let valid = matches!(output, CheckOutput::Valid { .. });
    write_json(out, &output, false)?;
    Ok(valid)
}

/// Print the stored workflows and behaviors
pub fn list<S>(store: &S, out: &mut impl Write) -> Result<()>
where
    S: WorkflowStore + BehaviorStore,
{
    let output = ListOutput {
        workflows: store.list_workflows().context("Failed to list workflows")?,
        behaviors: store.list_behaviors().context("Failed to list behaviors")?,
    };
    write_json(out, &output, false)
}

fn write_json(out: &mut impl Write, value: &impl Serialize, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    writeln!(out, "{}", json).context("Failed to write output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fremen_core::loader::ScriptLoader;
    use fremen_core::storage::FilesystemStore;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (Arc<FilesystemStore>, WorkflowRunner) {
        let store = Arc::new(
            FilesystemStore::new(dir.path().join("workflows"), dir.path().join("behaviors"))
                .unwrap(),
        );
        std::fs::write(
            dir.path().join("behaviors/1.toml"),
            "name = \"inc\"\ncode = 'fn run(inputs, config) { if inputs.is_empty() { 0 } else { inputs[0] + 1 } }'\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("workflows/1.json"),
            r#"{"id": 1, "name": "count",
                "nodes": [{"id": 1, "node_type_id": 1}, {"id": 2, "node_type_id": 1}],
                "edges": [{"source": 1, "target": 2}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("workflows/2.json"),
            r#"{"id": 2, "name": "loop",
                "nodes": [{"id": 1}, {"id": 2}],
                "edges": [{"source": 1, "target": 2}, {"source": 2, "target": 1}]}"#,
        )
        .unwrap();

        let runner = WorkflowRunner::new(store.clone(), store.clone(), Arc::new(ScriptLoader::default()));
        (store, runner)
    }

    fn lines(out: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_run_prints_one_report_per_workflow() {
        let dir = TempDir::new().unwrap();
        let (_, runner) = setup(&dir);

        let mut out = Vec::new();
        let ok = run(&runner, &[1, 2], true, &mut out).await.unwrap();
        assert!(!ok);

        let reports = lines(out);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0]["status"], "success");
        assert_eq!(reports[0]["result"], serde_json::json!({"1": 0, "2": 1}));
        assert_eq!(reports[1]["status"], "failure");
        assert_eq!(reports[1]["kind"], "cyclic_graph");
    }

    #[test]
    fn test_check() {
        let dir = TempDir::new().unwrap();
        let (_, runner) = setup(&dir);

        let mut out = Vec::new();
        assert!(check(&runner, 1, &mut out).unwrap());
        let output: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(output["status"], "valid");
        assert_eq!(output["order"], serde_json::json!([1, 2]));

        let mut out = Vec::new();
        assert!(!check(&runner, 3, &mut out).unwrap());
        let output: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(output["kind"], "workflow_not_found");
    }

    #[test]
    fn test_list() {
        let dir = TempDir::new().unwrap();
        let (store, _) = setup(&dir);

        let mut out = Vec::new();
        list(store.as_ref(), &mut out).unwrap();
        let output: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(output["workflows"][0]["name"], "count");
        assert_eq!(output["workflows"][1]["edge_count"], 2);
        assert_eq!(output["behaviors"][0]["name"], "inc");
    }
}
