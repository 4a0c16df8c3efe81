use super::{summarize, BehaviorStore, WorkflowStore};
use crate::types::{
    Behavior, BehaviorId, BehaviorSummary, WorkflowDefinition, WorkflowId, WorkflowSummary,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Directory-backed definition store.
///
/// Workflows live in `<workflows_dir>/<id>.json` using the editor's JSON shape;
/// behaviors live in `<behaviors_dir>/<id>.toml`:
///
/// ```toml
/// name = "sum"
/// code = '''
/// fn run(inputs, config) { inputs.reduce(|acc, x| acc + x, 0) }
/// '''
/// ```
///
/// The id in the file name is authoritative. Files are read on every lookup,
/// so each run sees the definition as it is when the run starts.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    workflows_dir: PathBuf,
    behaviors_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct BehaviorFile {
    #[serde(default)]
    name: Option<String>,
    code: String,
}

impl FilesystemStore {
    pub fn new(workflows_dir: PathBuf, behaviors_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&workflows_dir)
            .context("Failed to create workflows directory")?;
        std::fs::create_dir_all(&behaviors_dir)
            .context("Failed to create behaviors directory")?;

        Ok(Self {
            workflows_dir,
            behaviors_dir,
        })
    }

    fn workflow_path(&self, id: WorkflowId) -> PathBuf {
        self.workflows_dir.join(format!("{}.json", id))
    }

    fn behavior_path(&self, id: BehaviorId) -> PathBuf {
        self.behaviors_dir.join(format!("{}.toml", id))
    }

    fn read_workflow(&self, id: WorkflowId, path: &Path) -> Result<WorkflowDefinition> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file {}", path.display()))?;
        let mut definition: WorkflowDefinition = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse workflow file {}", path.display()))?;

        if definition.id != id {
            tracing::warn!(
                "Workflow file {} declares id {}, using {}",
                path.display(),
                definition.id,
                id
            );
            definition.id = id;
        }

        Ok(definition)
    }

    fn read_behavior(&self, id: BehaviorId, path: &Path) -> Result<Behavior> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read behavior file {}", path.display()))?;
        let file: BehaviorFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse behavior file {}", path.display()))?;

        Ok(Behavior {
            id,
            name: file.name.unwrap_or_else(|| format!("behavior-{}", id)),
            code: file.code,
        })
    }
}

/// Ids of `<id>.<extension>` files in a directory, sorted
fn list_ids(dir: &Path, extension: &str) -> Result<Vec<i64>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list directory {}", dir.display()))?;

    let mut ids = Vec::new();
    for entry in entries {
        let path = entry.context("Failed to read directory entry")?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        match path.file_stem().and_then(|s| s.to_str()).map(str::parse::<i64>) {
            Some(Ok(id)) => ids.push(id),
            _ => tracing::debug!("Skipping {}: file name is not an id", path.display()),
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

impl WorkflowStore for FilesystemStore {
    fn workflow(&self, id: WorkflowId) -> Result<Option<WorkflowDefinition>> {
        let path = self.workflow_path(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read_workflow(id, &path).map(Some)
    }

    fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        list_ids(&self.workflows_dir, "json")?
            .into_iter()
            .map(|id| {
                let id = WorkflowId(id);
                self.read_workflow(id, &self.workflow_path(id))
                    .map(|definition| summarize(&definition))
            })
            .collect()
    }
}

impl BehaviorStore for FilesystemStore {
    fn behavior(&self, id: BehaviorId) -> Result<Option<Behavior>> {
        let path = self.behavior_path(id);
        if !path.exists() {
            return Ok(None);
        }
        self.read_behavior(id, &path).map(Some)
    }

    fn list_behaviors(&self) -> Result<Vec<BehaviorSummary>> {
        list_ids(&self.behaviors_dir, "toml")?
            .into_iter()
            .map(|id| {
                let id = BehaviorId(id);
                self.read_behavior(id, &self.behavior_path(id))
                    .map(|behavior| BehaviorSummary {
                        id: behavior.id,
                        name: behavior.name,
                    })
            })
            .collect()
    }
}
