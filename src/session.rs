use crate::exec::CommandExecutionResult;
use crate::plan::CommandPlan;
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::ids::generate_session_id;
use crate::task::{AgentFile, Phase};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Maximum generations walked when reconstructing revision ancestry.
/// Guards against cycles in `parentSessionId` links.
pub const ANCESTRY_DEPTH_LIMIT: usize = 25;

const ID_ALLOCATION_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Queued,
    Planning,
    Executing,
    Succeeded,
    Failed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            SessionStatus::Queued => "queued",
            SessionStatus::Planning => "planning",
            SessionStatus::Executing => "executing",
            SessionStatus::Succeeded => "succeeded",
            SessionStatus::Failed => "failed",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub at: i64,
    pub message: String,
}

/// One task attempt, as persisted for external consumers. The JSON shape is
/// a stable contract: the store, the UI, and revision flows all read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub submitted_at: i64,
    pub task: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub plan: Option<CommandPlan>,
    #[serde(default)]
    pub raw_plan: Option<Value>,
    #[serde(default)]
    pub result: Option<CommandExecutionResult>,
    #[serde(default)]
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub uploaded_files: Vec<AgentFile>,
    #[serde(default)]
    pub request_options: Map<String, Value>,
    #[serde(default)]
    pub debug: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub response_text: Option<String>,
    #[serde(default)]
    pub parent_session_id: Option<String>,
    #[serde(default)]
    pub complaint_context: Option<String>,
    #[serde(default)]
    pub complaints: Vec<Complaint>,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>, task: impl Into<String>, submitted_at: i64) -> Self {
        Self {
            id: id.into(),
            submitted_at,
            task: task.into(),
            status: SessionStatus::Queued,
            plan: None,
            raw_plan: None,
            result: None,
            phases: Vec::new(),
            uploaded_files: Vec::new(),
            request_options: Map::new(),
            debug: None,
            error: None,
            detail: None,
            response_text: None,
            parent_session_id: None,
            complaint_context: None,
            complaints: Vec::new(),
        }
    }

    /// True when this record is a revision of an earlier session.
    pub fn is_revision(&self) -> bool {
        self.parent_session_id.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session `{session_id}` not found")]
    UnknownSession { session_id: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to allocate a unique session id after {attempts} attempts")]
    IdAllocation { attempts: u32 },
    #[error("session id generation failed: {0}")]
    IdGeneration(String),
}

/// File-backed session store: one pretty-printed JSON document per session
/// under `<state_root>/sessions/`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    state_root: PathBuf,
}

impl SessionStore {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
        }
    }

    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    pub fn persist_session(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let path = self.session_path(&record.id);
        let body = serde_json::to_vec_pretty(record).map_err(|err| json_error(&path, err))?;
        atomic_write_file(&path, &body).map_err(|err| io_error(&path, err))
    }

    pub fn load_session(&self, session_id: &str) -> Result<SessionRecord, SessionError> {
        let path = self.session_path(session_id);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(SessionError::UnknownSession {
                    session_id: session_id.to_string(),
                })
            }
            Err(err) => return Err(io_error(&path, err)),
        };
        serde_json::from_str(&raw).map_err(|err| json_error(&path, err))
    }

    pub fn session_exists(&self, session_id: &str) -> bool {
        self.session_path(session_id).is_file()
    }

    pub fn allocate_session_id(&self, now: i64) -> Result<String, SessionError> {
        for _ in 0..ID_ALLOCATION_ATTEMPTS {
            let candidate = generate_session_id(now).map_err(SessionError::IdGeneration)?;
            if !self.session_exists(&candidate) {
                return Ok(candidate);
            }
        }
        Err(SessionError::IdAllocation {
            attempts: ID_ALLOCATION_ATTEMPTS,
        })
    }

    /// Walk `parentSessionId` links from `base` to the original attempt.
    /// Returns the chain oldest-first, ending with `base` itself. The walk
    /// is cycle-safe and capped at [`ANCESTRY_DEPTH_LIMIT`]; unreadable or
    /// missing ancestors truncate the chain rather than failing the caller.
    pub fn collect_ancestry(&self, base: &SessionRecord) -> Vec<SessionRecord> {
        let mut chain = vec![base.clone()];
        let mut visited: BTreeSet<String> = BTreeSet::new();
        visited.insert(base.id.clone());

        let mut current_parent = base.parent_session_id.clone();
        while let Some(parent_id) = current_parent {
            if chain.len() >= ANCESTRY_DEPTH_LIMIT || !visited.insert(parent_id.clone()) {
                break;
            }
            let Ok(parent) = self.load_session(&parent_id) else {
                break;
            };
            current_parent = parent.parent_session_id.clone();
            chain.push(parent);
        }

        chain.reverse();
        chain
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.state_root
            .join("sessions")
            .join(format!("{session_id}.json"))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SessionError {
    SessionError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn json_error(path: &Path, source: serde_json::Error) -> SessionError {
    SessionError::Json {
        path: path.display().to_string(),
        source,
    }
}
