//! Exploration sessions and the in-memory store that owns them.
//!
//! The store is the only shared mutable resource in the service. Each entry
//! is wrapped in its own `tokio::sync::Mutex`; the engine holds that lock for
//! the whole of an operation, including the LLM suspension point, so
//! operations on a single session are serialized end to end. No state is
//! shared across sessions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::exploration::catalog::ChoiceList;

/// Name and grade captured at stage 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentIdentity {
    pub name: String,
    pub grade: u8,
}

/// A recorded answer: the original indices plus the texts they resolved to
/// at submission time. Downstream consumers (summary, recommendation, plan)
/// never re-resolve indices against a possibly-stale choice list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageAnswer {
    pub selected_indices: Vec<usize>,
    pub selected_texts: Vec<String>,
    pub free_text: Option<String>,
}

impl StageAnswer {
    /// Human-readable rendering used in summaries and LLM context.
    pub fn display(&self) -> String {
        if let Some(text) = &self.free_text {
            return format!("Other: {}", text);
        }
        self.selected_texts.join(", ")
    }
}

/// Where a session currently is: a defined stage, or done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum StagePointer {
    Stage(usize),
    Complete,
}

/// One student's exploration, owned exclusively by the store. Mutated only
/// through engine operations while the per-session lock is held.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorationSession {
    pub session_id: Uuid,
    pub identity: Option<StudentIdentity>,
    pub current_stage: StagePointer,
    /// Append-only; a stage id appears at most once.
    pub completed_stages: Vec<usize>,
    pub answers: BTreeMap<usize, StageAnswer>,
    /// Live AI-generated (or fallback) list for the dynamic stage.
    pub dynamic_choices: Option<ChoiceList>,
    /// Everything already shown on the dynamic stage, passed to the provider
    /// as a duplicate-avoidance hint.
    pub previous_dynamic_choices: Vec<String>,
    pub regeneration_count: u32,
    pub recommendation: Option<String>,
    pub recommendation_confirmed: bool,
    /// Latest modification request from the confirm loop; forwarded to the
    /// generator as a hint on the next explicit regeneration.
    pub modification_request: Option<String>,
    /// Immutable once set at confirmation time.
    pub final_goal: Option<String>,
    pub plan_result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExplorationSession {
    fn new(session_id: Uuid) -> Self {
        let now = Utc::now();
        ExplorationSession {
            session_id,
            identity: None,
            current_stage: StagePointer::Stage(0),
            completed_stages: Vec::new(),
            answers: BTreeMap::new(),
            dynamic_choices: None,
            previous_dynamic_choices: Vec::new(),
            regeneration_count: 0,
            recommendation: None,
            recommendation_confirmed: false,
            modification_request: None,
            final_goal: None,
            plan_result: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self, stage_id: usize) -> bool {
        self.completed_stages.contains(&stage_id)
    }

    /// Records a completed stage and moves the pointer to `next`. Revisiting
    /// an already-completed stage (re-confirming after a late regeneration)
    /// moves the pointer without duplicating the entry.
    pub fn complete_stage(&mut self, stage_id: usize, next: StagePointer) {
        if !self.is_completed(stage_id) {
            self.completed_stages.push(stage_id);
        }
        self.current_stage = next;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Keyed container of sessions. Lifecycle only; the store knows nothing
/// about stages or validation.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<ExplorationSession>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore::default()
    }

    pub async fn create(&self) -> Uuid {
        let session_id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(ExplorationSession::new(session_id)));
        self.sessions.write().await.insert(session_id, session);
        session_id
    }

    /// Hands out the per-session lock holder; callers lock it for the
    /// duration of one engine operation.
    pub async fn get(&self, session_id: Uuid) -> Option<Arc<Mutex<ExplorationSession>>> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    pub async fn delete(&self, session_id: Uuid) -> bool {
        self.sessions.write().await.remove(&session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_get_delete() {
        let store = SessionStore::new();
        let id = store.create().await;
        assert_eq!(store.len().await, 1);

        let session = store.get(id).await.expect("session exists");
        {
            let guard = session.lock().await;
            assert_eq!(guard.session_id, id);
            assert_eq!(guard.current_stage, StagePointer::Stage(0));
            assert!(guard.completed_stages.is_empty());
            assert!(!guard.recommendation_confirmed);
        }

        assert!(store.delete(id).await);
        assert!(!store.delete(id).await);
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        let a = store.create().await;
        let b = store.create().await;
        assert_ne!(a, b);

        let sa = store.get(a).await.unwrap();
        sa.lock().await.complete_stage(0, StagePointer::Stage(1));

        let sb = store.get(b).await.unwrap();
        assert_eq!(sb.lock().await.current_stage, StagePointer::Stage(0));
    }

    #[test]
    fn test_answer_display_prefers_free_text() {
        let answer = StageAnswer {
            selected_indices: vec![11],
            selected_texts: vec!["Other (write your own)".to_string()],
            free_text: Some("deep sea explorer".to_string()),
        };
        assert_eq!(answer.display(), "Other: deep sea explorer");

        let plain = StageAnswer {
            selected_indices: vec![1, 5],
            selected_texts: vec!["a".to_string(), "b".to_string()],
            free_text: None,
        };
        assert_eq!(plain.display(), "a, b");
    }

    #[tokio::test]
    async fn test_complete_stage_updates_timestamp() {
        let store = SessionStore::new();
        let id = store.create().await;
        let session = store.get(id).await.unwrap();
        let mut guard = session.lock().await;
        let before = guard.updated_at;
        guard.complete_stage(0, StagePointer::Stage(1));
        assert!(guard.updated_at >= before);
        assert_eq!(guard.completed_stages, vec![0]);
    }
}
