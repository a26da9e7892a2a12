//! The career exploration engine, owner of the stage state machine.
//!
//! One engine is instantiated per school band with that band's catalog, an
//! isolated session store, and the three generation capabilities. All session
//! mutation flows through here while the per-session lock is held, including
//! across LLM calls, so concurrent requests against one session serialize.
//!
//! Error policy: validation and precondition failures leave the session
//! untouched; provider failures advance the flow with fallback content and a
//! soft `used_fallback` flag instead of blocking the student.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::exploration::catalog::{ChoiceList, StageCatalog, StageDefinition, StageKind};
use crate::exploration::providers::{
    fallback_plan, fallback_recommendation, AnsweredStage, DynamicChoiceProvider, PlanGenerator,
    ProviderError, RecommendationGenerator, StudentContext,
};
use crate::exploration::session::{
    ExplorationSession, SessionStore, StageAnswer, StagePointer, StudentIdentity,
};
use crate::exploration::validator::{validate, SelectionRules, ValidationError};

/// Engine tunables, sourced from `Config` in production.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_regenerations: u32,
    pub generation_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_regenerations: 5,
            generation_timeout: Duration::from_secs(60),
        }
    }
}

/// Typed failure of an engine operation. The transport layer maps each kind
/// to a stable status code; nothing here panics across the boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("this stage requires name and grade")]
    MissingIdentity,

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("the recommendation stage requires an accept/modify response")]
    MissingConfirmation,

    #[error("declining the recommendation requires a modification request")]
    MissingModificationRequest,

    #[error("choice regeneration limit ({max}) reached")]
    RegenerationLimitReached { max: u32 },

    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    #[error("this session is already complete")]
    AlreadyComplete,
}

// ────────────────────────────────────────────────────────────────────────────
// Operation payloads and views
// ────────────────────────────────────────────────────────────────────────────

/// Accept/modify response at the recommendation stage.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationPayload {
    pub accepted: bool,
    pub modification_request: Option<String>,
}

/// One submission. Which fields matter depends on the current stage kind;
/// the engine dispatches once on the stage's kind and ignores the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitPayload {
    pub identity: Option<StudentIdentity>,
    pub choice_numbers: Option<Vec<usize>>,
    pub free_text: Option<String>,
    pub confirmation: Option<ConfirmationPayload>,
}

#[derive(Debug, Serialize)]
pub struct SubmitOutcome {
    pub message: String,
    pub current_stage: StagePointer,
}

/// What the caller renders for the current stage.
#[derive(Debug, Serialize)]
pub struct PromptView {
    pub stage: usize,
    pub kind: StageKind,
    pub question: String,
    /// Numbered options, absent for identity/recommendation/plan stages.
    pub choices: Option<Vec<String>>,
    pub recommendation: Option<String>,
    pub encouragement: String,
    pub student_name: Option<String>,
    pub regeneration_count: Option<u32>,
    pub max_regenerations: Option<u32>,
    /// True when the choices shown are the static fallback list because the
    /// provider was unavailable.
    pub used_fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct RecommendationView {
    pub recommendation: String,
    pub used_fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct DynamicChoicesView {
    pub choices: Vec<String>,
    pub regeneration_count: u32,
    pub max_regenerations: u32,
    pub used_fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct PlanView {
    pub plan: String,
    pub used_fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct AnswerSummary {
    pub stage: usize,
    pub question: String,
    pub answer: String,
    pub choice_numbers: Vec<usize>,
}

/// Read-only projection consumed by the exporter after completion.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub band: &'static str,
    pub identity: Option<StudentIdentity>,
    pub current_stage: StagePointer,
    pub completed_stages: Vec<usize>,
    pub total_stages: usize,
    pub progress_percentage: u32,
    pub answers: Vec<AnswerSummary>,
    pub recommendation: Option<String>,
    pub recommendation_confirmed: bool,
    pub final_goal: Option<String>,
    pub plan_result: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

pub struct CareerExplorationEngine {
    catalog: StageCatalog,
    store: SessionStore,
    choice_provider: Arc<dyn DynamicChoiceProvider>,
    recommender: Arc<dyn RecommendationGenerator>,
    planner: Arc<dyn PlanGenerator>,
    config: EngineConfig,
}

impl CareerExplorationEngine {
    pub fn new(
        catalog: StageCatalog,
        store: SessionStore,
        choice_provider: Arc<dyn DynamicChoiceProvider>,
        recommender: Arc<dyn RecommendationGenerator>,
        planner: Arc<dyn PlanGenerator>,
        config: EngineConfig,
    ) -> Self {
        CareerExplorationEngine {
            catalog,
            store,
            choice_provider,
            recommender,
            planner,
            config,
        }
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    /// Opens a new session at stage 0.
    pub async fn start(&self) -> Uuid {
        let session_id = self.store.create().await;
        info!(
            "started {} exploration session {}",
            self.catalog.band().as_str(),
            session_id
        );
        session_id
    }

    pub async fn delete(&self, session_id: Uuid) -> bool {
        self.store.delete(session_id).await
    }

    /// Resolves the current question. Idempotent except for the lazy
    /// first-time dynamic choice generation, which persists its result.
    pub async fn get_current_prompt(&self, session_id: Uuid) -> Result<PromptView, EngineError> {
        let handle = self.session(session_id).await?;
        let mut session = handle.lock().await;

        let definition = self.current_definition(&session)?;
        let mut used_fallback = false;

        let choices = match definition.kind {
            StageKind::Select if definition.is_dynamic => {
                if session.dynamic_choices.is_none() {
                    let context = self.student_context(&session);
                    let (list, fell_back) = self.generate_choices(&context, &[], 0).await;
                    used_fallback = fell_back;
                    session.dynamic_choices = Some(list);
                    session.touch();
                }
                session.dynamic_choices.as_ref().map(|l| l.numbered())
            }
            StageKind::Select => Some(ChoiceList::from_static(definition).numbered()),
            _ => None,
        };

        Ok(PromptView {
            stage: definition.id,
            kind: definition.kind,
            question: definition.prompt_text.to_string(),
            choices,
            recommendation: if definition.kind == StageKind::Recommendation {
                session.recommendation.clone()
            } else {
                None
            },
            encouragement: self.encouragement(&session),
            student_name: session.identity.as_ref().map(|i| i.name.clone()),
            regeneration_count: definition.is_dynamic.then_some(session.regeneration_count),
            max_regenerations: definition.is_dynamic.then_some(self.config.max_regenerations),
            used_fallback,
        })
    }

    /// Records an answer for the current stage and advances the pointer.
    /// On any rejection the session is left exactly as it was.
    pub async fn submit_response(
        &self,
        session_id: Uuid,
        payload: SubmitPayload,
    ) -> Result<SubmitOutcome, EngineError> {
        let handle = self.session(session_id).await?;
        let mut session = handle.lock().await;

        let definition = self.current_definition(&session)?.clone();

        let message = match definition.kind {
            StageKind::Identity => self.submit_identity(&mut session, &definition, payload)?,
            StageKind::Select => self.submit_selection(&mut session, &definition, payload)?,
            StageKind::Recommendation => {
                self.submit_confirmation(&mut session, &definition, payload)?
            }
            StageKind::Plan => {
                session.complete_stage(definition.id, StagePointer::Complete);
                "All stages complete!".to_string()
            }
        };

        Ok(SubmitOutcome {
            message,
            current_stage: session.current_stage,
        })
    }

    /// Generates (or re-generates) the recommendation. Requires every stage
    /// before the recommendation stage to be completed, checked as set
    /// membership, not pointer position.
    pub async fn generate_recommendation(
        &self,
        session_id: Uuid,
        regenerate: bool,
    ) -> Result<RecommendationView, EngineError> {
        let handle = self.session(session_id).await?;
        let mut session = handle.lock().await;

        if session.current_stage == StagePointer::Complete {
            return Err(EngineError::AlreadyComplete);
        }
        // Acceptance freezes the goal; a fresh recommendation after that
        // would dangle against an immutable final_goal.
        if session.recommendation_confirmed {
            return Err(EngineError::InvalidTransition(
                "the recommendation has already been accepted".to_string(),
            ));
        }

        let recommendation_stage = self.catalog.recommendation_stage();
        let missing: Vec<usize> = (0..recommendation_stage)
            .filter(|id| !session.is_completed(*id))
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::PreconditionNotMet(format!(
                "stages {:?} must be completed before requesting a recommendation",
                missing
            )));
        }

        let context = self.student_context(&session);
        let modification = session.modification_request.clone();
        let result = self
            .with_timeout(
                self.recommender
                    .generate(&context, regenerate, modification.as_deref()),
            )
            .await;

        let (recommendation, used_fallback) = match result {
            Ok(text) => (text, false),
            Err(e) => {
                warn!("recommendation generation failed, using fallback: {e}");
                (fallback_recommendation(&context), true)
            }
        };

        info!(
            "recommendation {} for session {} (regenerate={}, fallback={})",
            if regenerate { "regenerated" } else { "generated" },
            session_id,
            regenerate,
            used_fallback
        );

        // The regenerate flag is a diversity hint only; an existing
        // confirmation is never reset here.
        session.recommendation = Some(recommendation.clone());
        session.current_stage = StagePointer::Stage(recommendation_stage);
        session.touch();

        Ok(RecommendationView {
            recommendation,
            used_fallback,
        })
    }

    /// Replaces the dynamic stage's choices within the regeneration budget.
    /// The budget check happens before anything is mutated and before the
    /// provider is invoked.
    pub async fn regenerate_dynamic_choices(
        &self,
        session_id: Uuid,
    ) -> Result<DynamicChoicesView, EngineError> {
        let handle = self.session(session_id).await?;
        let mut session = handle.lock().await;

        if session.current_stage == StagePointer::Complete {
            return Err(EngineError::AlreadyComplete);
        }

        let dynamic_stage = self.catalog.dynamic_stage().ok_or_else(|| {
            EngineError::InvalidTransition(format!(
                "the {} band has no dynamic stage",
                self.catalog.band().as_str()
            ))
        })?;

        if session.current_stage != StagePointer::Stage(dynamic_stage) {
            return Err(EngineError::InvalidTransition(format!(
                "choices can only be regenerated while on stage {dynamic_stage}"
            )));
        }

        if session.regeneration_count + 1 > self.config.max_regenerations {
            return Err(EngineError::RegenerationLimitReached {
                max: self.config.max_regenerations,
            });
        }

        if let Some(previous) = session.dynamic_choices.take() {
            session.previous_dynamic_choices.extend(previous.options);
        }
        session.regeneration_count += 1;

        let context = self.student_context(&session);
        let previous = session.previous_dynamic_choices.clone();
        let attempt = session.regeneration_count;
        let (list, used_fallback) = self.generate_choices(&context, &previous, attempt).await;

        let view = DynamicChoicesView {
            choices: list.numbered(),
            regeneration_count: session.regeneration_count,
            max_regenerations: self.config.max_regenerations,
            used_fallback,
        };

        session.dynamic_choices = Some(list);
        session.touch();

        info!(
            "regenerated choices for session {} ({}/{}, fallback={})",
            session_id, view.regeneration_count, view.max_regenerations, used_fallback
        );

        Ok(view)
    }

    /// Generates the long-form plan. Requires a confirmed recommendation.
    pub async fn generate_plan(&self, session_id: Uuid) -> Result<PlanView, EngineError> {
        let handle = self.session(session_id).await?;
        let mut session = handle.lock().await;

        if session.current_stage == StagePointer::Complete {
            return Err(EngineError::AlreadyComplete);
        }
        if !session.recommendation_confirmed {
            return Err(EngineError::PreconditionNotMet(
                "the recommendation must be accepted before generating a plan".to_string(),
            ));
        }
        let final_goal = session.final_goal.clone().ok_or_else(|| {
            EngineError::PreconditionNotMet("no final goal recorded".to_string())
        })?;

        let context = self.student_context(&session);
        let result = self
            .with_timeout(self.planner.generate(&context, &final_goal))
            .await;

        let (plan, used_fallback) = match result {
            Ok(text) => (text, false),
            Err(e) => {
                warn!("plan generation failed, using fallback: {e}");
                (fallback_plan(&context, &final_goal), true)
            }
        };

        info!(
            "plan generated for session {} (fallback={})",
            session_id, used_fallback
        );

        session.plan_result = Some(plan.clone());
        session.touch();

        Ok(PlanView {
            plan,
            used_fallback,
        })
    }

    /// Read-only projection; answers are already resolved text, so nothing
    /// is re-derived from choice lists here.
    pub async fn get_summary(&self, session_id: Uuid) -> Result<SessionSummary, EngineError> {
        let handle = self.session(session_id).await?;
        let session = handle.lock().await;

        let answers = session
            .answers
            .iter()
            .map(|(stage, answer)| AnswerSummary {
                stage: *stage,
                question: self
                    .catalog
                    .get(*stage)
                    .map(|d| d.prompt_text.to_string())
                    .unwrap_or_default(),
                answer: answer.display(),
                choice_numbers: answer.selected_indices.clone(),
            })
            .collect();

        let total_stages = self.catalog.total_stages();
        let progress_percentage =
            (session.completed_stages.len() * 100 / total_stages) as u32;

        Ok(SessionSummary {
            session_id: session.session_id,
            band: self.catalog.band().as_str(),
            identity: session.identity.clone(),
            current_stage: session.current_stage,
            completed_stages: session.completed_stages.clone(),
            total_stages,
            progress_percentage,
            answers,
            recommendation: session.recommendation.clone(),
            recommendation_confirmed: session.recommendation_confirmed,
            final_goal: session.final_goal.clone(),
            plan_result: session.plan_result.clone(),
        })
    }

    // ────────────────────────────────────────────────────────────────────
    // Stage handlers
    // ────────────────────────────────────────────────────────────────────

    fn submit_identity(
        &self,
        session: &mut ExplorationSession,
        definition: &StageDefinition,
        payload: SubmitPayload,
    ) -> Result<String, EngineError> {
        let identity = payload.identity.ok_or(EngineError::MissingIdentity)?;

        if identity.name.trim().is_empty() {
            return Err(EngineError::InvalidIdentity("name must not be empty".to_string()));
        }
        let (min_grade, max_grade) = self.catalog.band().grade_range();
        if identity.grade < min_grade || identity.grade > max_grade {
            return Err(EngineError::InvalidIdentity(format!(
                "grade must be between {min_grade} and {max_grade} for {} school",
                self.catalog.band().as_str()
            )));
        }

        let name = identity.name.clone();
        session.identity = Some(identity);
        session.complete_stage(definition.id, StagePointer::Stage(definition.id + 1));
        Ok(format!("Nice to meet you, {name}! Let's get started."))
    }

    fn submit_selection(
        &self,
        session: &mut ExplorationSession,
        definition: &StageDefinition,
        payload: SubmitPayload,
    ) -> Result<String, EngineError> {
        let indices = payload.choice_numbers.unwrap_or_default();
        let free_text = payload.free_text.as_deref();

        // A dynamic stage that never generated choices is answered against
        // its static list, same as when the provider fell back.
        let live = match (definition.is_dynamic, &session.dynamic_choices) {
            (true, Some(list)) => list.clone(),
            _ => ChoiceList::from_static(definition),
        };

        let rules = SelectionRules::for_stage(definition, &live);
        validate(&rules, &indices, free_text)?;

        let selected_texts: Vec<String> = indices
            .iter()
            .map(|&i| live.options[i - 1].clone())
            .collect();
        let is_other = rules
            .other_index
            .map(|other| indices.contains(&other))
            .unwrap_or(false);
        let free_text = is_other.then(|| free_text.unwrap_or_default().trim().to_string());

        session.answers.insert(
            definition.id,
            StageAnswer {
                selected_indices: indices,
                selected_texts,
                free_text,
            },
        );
        session.complete_stage(definition.id, StagePointer::Stage(definition.id + 1));
        Ok("Answer recorded.".to_string())
    }

    fn submit_confirmation(
        &self,
        session: &mut ExplorationSession,
        definition: &StageDefinition,
        payload: SubmitPayload,
    ) -> Result<String, EngineError> {
        let confirmation = payload.confirmation.ok_or(EngineError::MissingConfirmation)?;

        let recommendation = session.recommendation.clone().ok_or_else(|| {
            EngineError::PreconditionNotMet(
                "no recommendation has been generated yet".to_string(),
            )
        })?;

        if confirmation.accepted {
            session.recommendation_confirmed = true;
            session.final_goal = Some(recommendation);
            session.complete_stage(definition.id, StagePointer::Stage(definition.id + 1));
            Ok("Your dream is confirmed! Ready to build the plan.".to_string())
        } else {
            let request = confirmation
                .modification_request
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .ok_or(EngineError::MissingModificationRequest)?;
            // Stored as a hint only; regeneration happens when the caller
            // explicitly asks for a new recommendation.
            session.modification_request = Some(request.clone());
            session.touch();
            Ok(format!("Modification request noted: {request}"))
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Helpers
    // ────────────────────────────────────────────────────────────────────

    async fn session(
        &self,
        session_id: Uuid,
    ) -> Result<Arc<tokio::sync::Mutex<ExplorationSession>>, EngineError> {
        self.store
            .get(session_id)
            .await
            .ok_or(EngineError::SessionNotFound(session_id))
    }

    fn current_definition<'a>(
        &'a self,
        session: &ExplorationSession,
    ) -> Result<&'a StageDefinition, EngineError> {
        match session.current_stage {
            StagePointer::Complete => Err(EngineError::AlreadyComplete),
            StagePointer::Stage(id) => self.catalog.get(id).ok_or_else(|| {
                EngineError::InvalidTransition(format!("stage {id} is not defined"))
            }),
        }
    }

    fn student_context(&self, session: &ExplorationSession) -> StudentContext {
        let answers = session
            .answers
            .iter()
            .filter_map(|(stage, answer)| {
                self.catalog.get(*stage).map(|d| AnsweredStage {
                    question: d.prompt_text.to_string(),
                    answer: answer.display(),
                })
            })
            .collect();

        StudentContext {
            name: session
                .identity
                .as_ref()
                .map(|i| i.name.clone())
                .unwrap_or_else(|| "student".to_string()),
            grade: session.identity.as_ref().map(|i| i.grade).unwrap_or(0),
            band: self.catalog.band(),
            answers,
        }
    }

    /// Calls the choice provider with the configured timeout; on any failure
    /// substitutes the catalog's static fallback list.
    async fn generate_choices(
        &self,
        context: &StudentContext,
        previous: &[String],
        attempt: u32,
    ) -> (ChoiceList, bool) {
        let definition = self
            .catalog
            .dynamic_stage()
            .and_then(|id| self.catalog.get(id));
        let Some(definition) = definition else {
            // No dynamic stage in this band; callers never reach here.
            return (ChoiceList::from_generated(vec![]), false);
        };

        match self
            .with_timeout(self.choice_provider.generate(context, previous, attempt))
            .await
        {
            Ok(options) => (ChoiceList::from_generated(options), false),
            Err(e) => {
                warn!("dynamic choice generation failed, using static fallback: {e}");
                (ChoiceList::from_static(definition), true)
            }
        }
    }

    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match tokio::time::timeout(self.config.generation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout),
        }
    }

    fn encouragement(&self, session: &ExplorationSession) -> String {
        let message = self
            .catalog
            .encouragements()
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Keep going!");
        match &session.identity {
            Some(identity) => format!("{}, {}", identity.name, lowercase_first(message)),
            None => message.to_string(),
        }
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
