use std::collections::HashMap;
use tokio::sync::RwLock;
use wfcore::{Workflow, WorkflowDraft, WorkflowError, WorkflowId};

/// In-memory workflow collection
#[derive(Default)]
pub struct WorkflowStore {
    workflows: RwLock<HashMap<WorkflowId, Workflow>>,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new workflow built from `draft` and return its fresh id
    pub async fn create(&self, draft: WorkflowDraft) -> WorkflowId {
        let workflow = Workflow::from_draft(draft);
        let id = workflow.id.clone();
        tracing::info!("Creating workflow: {} ({})", workflow.name, id);
        self.workflows.write().await.insert(id.clone(), workflow);
        id
    }

    /// Store a workflow as-is (imports), replacing one with the same id
    pub async fn insert(&self, workflow: Workflow) -> Option<Workflow> {
        self.workflows
            .write()
            .await
            .insert(workflow.id.clone(), workflow)
    }

    pub async fn get(&self, id: &str) -> Option<Workflow> {
        self.workflows.read().await.get(id).cloned()
    }

    /// All workflows, oldest first
    pub async fn list(&self) -> Vec<Workflow> {
        let mut all: Vec<Workflow> = self.workflows.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    /// Apply `edit` to a stored workflow and stamp `updated_at`
    pub async fn update<F, T>(&self, id: &str, edit: F) -> Result<T, WorkflowError>
    where
        F: FnOnce(&mut Workflow) -> T,
    {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;
        let out = edit(workflow);
        workflow.touch();
        Ok(out)
    }

    pub async fn delete(&self, id: &str) -> Option<Workflow> {
        let removed = self.workflows.write().await.remove(id);
        if removed.is_some() {
            tracing::info!("Deleted workflow: {}", id);
        }
        removed
    }

    /// Flip `is_active` and return the new value
    pub async fn toggle_active(&self, id: &str) -> Result<bool, WorkflowError> {
        let mut workflows = self.workflows.write().await;
        let workflow = workflows
            .get_mut(id)
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))?;
        workflow.is_active = !workflow.is_active;
        Ok(workflow.is_active)
    }

    pub async fn len(&self) -> usize {
        self.workflows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
