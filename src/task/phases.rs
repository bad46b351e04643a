use crate::shared::clock::now_millis;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

impl PhaseStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseStatus::Success | PhaseStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseLog {
    pub at: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseFailure {
    pub message: String,
    pub name: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// One stage of task lifecycle. Part of the stable JSON contract rendered
/// by external consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub id: String,
    pub title: String,
    pub status: PhaseStatus,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub error: Option<PhaseFailure>,
    #[serde(default)]
    pub meta: Map<String, Value>,
    #[serde(default)]
    pub logs: Vec<PhaseLog>,
}

/// Tracks a fixed set of phases through pending -> in_progress ->
/// (success | failed). Transitions are monotonic: starting a non-pending
/// phase or completing a phase that is not in progress is ignored rather
/// than corrupting recorded history.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    phases: Vec<Phase>,
}

impl PhaseTracker {
    pub fn new(definitions: &[(&str, &str)]) -> Self {
        let phases = definitions
            .iter()
            .map(|(id, title)| Phase {
                id: id.to_string(),
                title: title.to_string(),
                status: PhaseStatus::Pending,
                started_at: None,
                finished_at: None,
                error: None,
                meta: Map::new(),
                logs: Vec::new(),
            })
            .collect();
        Self { phases }
    }

    pub fn start(&mut self, id: &str) {
        if let Some(phase) = self.phase_mut(id) {
            if phase.status == PhaseStatus::Pending {
                phase.status = PhaseStatus::InProgress;
                phase.started_at = Some(now_millis());
            }
        }
    }

    pub fn log(&mut self, id: &str, message: impl Into<String>) {
        if let Some(phase) = self.phase_mut(id) {
            phase.logs.push(PhaseLog {
                at: now_millis(),
                message: message.into(),
            });
        }
    }

    pub fn set_meta(&mut self, id: &str, key: impl Into<String>, value: Value) {
        if let Some(phase) = self.phase_mut(id) {
            phase.meta.insert(key.into(), value);
        }
    }

    pub fn succeed(&mut self, id: &str, meta: Map<String, Value>) {
        self.finish(id, PhaseStatus::Success, None, meta);
    }

    pub fn fail(&mut self, id: &str, failure: PhaseFailure, meta: Map<String, Value>) {
        self.finish(id, PhaseStatus::Failed, Some(failure), meta);
    }

    fn finish(
        &mut self,
        id: &str,
        status: PhaseStatus,
        error: Option<PhaseFailure>,
        meta: Map<String, Value>,
    ) {
        if let Some(phase) = self.phase_mut(id) {
            if phase.status != PhaseStatus::InProgress {
                return;
            }
            phase.status = status;
            phase.finished_at = Some(now_millis());
            phase.error = error;
            phase.meta.extend(meta);
        }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn snapshot(&self) -> Vec<Phase> {
        self.phases.clone()
    }

    /// Phase history up to and including `id`, excluding phases that never
    /// left pending. This is what a failure report carries: everything that
    /// happened, nothing that was still hypothetical.
    pub fn history_through(&self, id: &str) -> Vec<Phase> {
        let mut history = Vec::new();
        for phase in &self.phases {
            history.push(phase.clone());
            if phase.id == id {
                break;
            }
        }
        history
    }

    pub fn into_phases(self) -> Vec<Phase> {
        self.phases
    }

    fn phase_mut(&mut self, id: &str) -> Option<&mut Phase> {
        self.phases.iter_mut().find(|phase| phase.id == id)
    }
}
