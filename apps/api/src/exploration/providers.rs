//! Generation capabilities consumed by the engine.
//!
//! Three seams, each a trait so tests can substitute deterministic mocks:
//! dynamic choice generation, the one-sentence recommendation, and the
//! long-form plan. The LLM-backed implementations are the only callers of
//! `llm_client` in this module tree.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::exploration::catalog::SchoolBand;
use crate::exploration::prompts::{
    AVOID_BLOCK_TEMPLATE, CHOICES_PROMPT_TEMPLATE, CHOICES_SYSTEM, MODIFICATION_BLOCK_TEMPLATE,
    PLAN_PROMPT_TEMPLATE, PLAN_SYSTEM, RECOMMENDATION_PROMPT_TEMPLATE, RECOMMENDATION_SYSTEM,
    REGENERATE_SUFFIX,
};
use crate::llm_client::{CompletionRequest, LlmClient};

/// Sampling temperature for first-pass generation.
const BASE_TEMPERATURE: f32 = 0.7;
/// Higher temperature when the caller asked for a different take.
const REGENERATE_TEMPERATURE: f32 = 0.9;
const CHOICES_TEMPERATURE: f32 = 0.8;

const RECOMMENDATION_MAX_TOKENS: u32 = 200;
const CHOICES_MAX_TOKENS: u32 = 400;
const PLAN_MAX_TOKENS: u32 = 1500;

/// A provider call failed; the engine substitutes fallback content rather
/// than surfacing this to the student.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream generation failed: {0}")]
    Upstream(String),

    #[error("upstream generation timed out")]
    Timeout,
}

/// One answered stage, already resolved to display text.
#[derive(Debug, Clone, Serialize)]
pub struct AnsweredStage {
    pub question: String,
    pub answer: String,
}

/// Accumulated human-readable answers passed to every generator. Indices
/// never cross this boundary.
#[derive(Debug, Clone, Serialize)]
pub struct StudentContext {
    pub name: String,
    pub grade: u8,
    pub band: SchoolBand,
    pub answers: Vec<AnsweredStage>,
}

impl StudentContext {
    /// Plain-text rendering embedded into prompts.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Name: {}\nGrade: {} ({} school)\n",
            self.name,
            self.grade,
            self.band.as_str()
        );
        for answered in &self.answers {
            out.push_str(&format!("Q: {}\nA: {}\n", answered.question, answered.answer));
        }
        out
    }
}

/// Produces the dynamic stage's choice list. `previous_choices` is a
/// duplicate-avoidance hint only; the provider owns output quality, the
/// engine owns the regeneration budget.
#[async_trait]
pub trait DynamicChoiceProvider: Send + Sync {
    async fn generate(
        &self,
        context: &StudentContext,
        previous_choices: &[String],
        attempt_number: u32,
    ) -> Result<Vec<String>, ProviderError>;
}

/// Produces the one-sentence career recommendation. `regenerate` is a
/// diversity hint; identical output on regeneration is acceptable.
#[async_trait]
pub trait RecommendationGenerator: Send + Sync {
    async fn generate(
        &self,
        context: &StudentContext,
        regenerate: bool,
        modification_request: Option<&str>,
    ) -> Result<String, ProviderError>;
}

/// Produces the long-form action plan conditioned on the confirmed goal.
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn generate(
        &self,
        context: &StudentContext,
        final_goal: &str,
    ) -> Result<String, ProviderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LLM-backed implementations
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmChoiceProvider {
    llm: LlmClient,
}

impl LlmChoiceProvider {
    pub fn new(llm: LlmClient) -> Self {
        LlmChoiceProvider { llm }
    }
}

#[async_trait]
impl DynamicChoiceProvider for LlmChoiceProvider {
    async fn generate(
        &self,
        context: &StudentContext,
        previous_choices: &[String],
        attempt_number: u32,
    ) -> Result<Vec<String>, ProviderError> {
        let avoid_block = if previous_choices.is_empty() {
            String::new()
        } else {
            AVOID_BLOCK_TEMPLATE.replace("{previous_choices}", &previous_choices.join("\n"))
        };

        let prompt = CHOICES_PROMPT_TEMPLATE
            .replace("{student_context}", &context.render())
            .replace("{band}", context.band.as_str())
            .replace("{avoid_block}", &avoid_block);

        let choices: Vec<String> = self
            .llm
            .complete_json(CompletionRequest {
                system: CHOICES_SYSTEM,
                prompt: &prompt,
                temperature: CHOICES_TEMPERATURE,
                max_tokens: CHOICES_MAX_TOKENS,
            })
            .await
            .map_err(|e| ProviderError::Upstream(e.to_string()))?;

        let choices: Vec<String> = choices
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if choices.is_empty() {
            warn!(
                "choice generation attempt {} returned an empty list",
                attempt_number
            );
            return Err(ProviderError::Upstream(
                "generator returned no usable choices".to_string(),
            ));
        }

        Ok(choices)
    }
}

pub struct LlmRecommendationGenerator {
    llm: LlmClient,
}

impl LlmRecommendationGenerator {
    pub fn new(llm: LlmClient) -> Self {
        LlmRecommendationGenerator { llm }
    }
}

#[async_trait]
impl RecommendationGenerator for LlmRecommendationGenerator {
    async fn generate(
        &self,
        context: &StudentContext,
        regenerate: bool,
        modification_request: Option<&str>,
    ) -> Result<String, ProviderError> {
        let modification_block = match modification_request {
            Some(request) if !request.trim().is_empty() => {
                MODIFICATION_BLOCK_TEMPLATE.replace("{modification_request}", request)
            }
            _ => String::new(),
        };

        let mut prompt = RECOMMENDATION_PROMPT_TEMPLATE
            .replace("{student_context}", &context.render())
            .replace("{band}", context.band.as_str())
            .replace("{modification_block}", &modification_block);

        if regenerate {
            prompt.push_str(REGENERATE_SUFFIX);
        }

        let text = self
            .llm
            .complete(CompletionRequest {
                system: RECOMMENDATION_SYSTEM,
                prompt: &prompt,
                temperature: if regenerate {
                    REGENERATE_TEMPERATURE
                } else {
                    BASE_TEMPERATURE
                },
                max_tokens: RECOMMENDATION_MAX_TOKENS,
            })
            .await
            .map_err(|e| ProviderError::Upstream(e.to_string()))?;

        Ok(text.trim().to_string())
    }
}

pub struct LlmPlanGenerator {
    llm: LlmClient,
}

impl LlmPlanGenerator {
    pub fn new(llm: LlmClient) -> Self {
        LlmPlanGenerator { llm }
    }
}

#[async_trait]
impl PlanGenerator for LlmPlanGenerator {
    async fn generate(
        &self,
        context: &StudentContext,
        final_goal: &str,
    ) -> Result<String, ProviderError> {
        let prompt = PLAN_PROMPT_TEMPLATE
            .replace("{student_context}", &context.render())
            .replace("{final_goal}", final_goal)
            .replace("{student_name}", &context.name)
            .replace("{band}", context.band.as_str());

        let text = self
            .llm
            .complete(CompletionRequest {
                system: PLAN_SYSTEM,
                prompt: &prompt,
                temperature: BASE_TEMPERATURE,
                max_tokens: PLAN_MAX_TOKENS,
            })
            .await
            .map_err(|e| ProviderError::Upstream(e.to_string()))?;

        Ok(text.trim().to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fallback content
// ────────────────────────────────────────────────────────────────────────────

/// Recommendation used when the generator is unavailable, built from the
/// student's own words so the flow stays personal.
pub fn fallback_recommendation(context: &StudentContext) -> String {
    let theme = context
        .answers
        .first()
        .map(|a| a.answer.clone())
        .unwrap_or_else(|| "what you love".to_string());
    format!(
        "An expert who turns {} into work that helps others — a dream {} can grow into step by step.",
        theme, context.name
    )
}

/// Minimal plan skeleton used when the plan generator is unavailable.
pub fn fallback_plan(context: &StudentContext, final_goal: &str) -> String {
    format!(
        "[{name}'s dream logic]\nFinal dream: {goal}\n\n\
        Mid-goal 1: Learn the basics — pick one school subject or club related to your dream and show up every week.\n\
        Mid-goal 2: Practice in daily life — spend 20 minutes a day on a small project connected to {goal}.\n\
        Mid-goal 3: Share and get feedback — show your work to a teacher, friend, or family member each month.\n\n\
        Encouragement memo:\n\
        \"{name}, the strengths you chose are real. Small daily steps will carry you toward {goal}!\"",
        name = context.name,
        goal = final_goal,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> StudentContext {
        StudentContext {
            name: "Kim".to_string(),
            grade: 2,
            band: SchoolBand::Middle,
            answers: vec![AnsweredStage {
                question: "What do you lose track of time doing?".to_string(),
                answer: "Coding and prototyping games or apps".to_string(),
            }],
        }
    }

    #[test]
    fn test_context_render_includes_answers() {
        let rendered = context().render();
        assert!(rendered.contains("Name: Kim"));
        assert!(rendered.contains("Grade: 2 (middle school)"));
        assert!(rendered.contains("Q: What do you lose track of time doing?"));
        assert!(rendered.contains("A: Coding and prototyping games or apps"));
    }

    #[test]
    fn test_fallback_recommendation_uses_first_answer() {
        let text = fallback_recommendation(&context());
        assert!(text.contains("Coding and prototyping games or apps"));
        assert!(text.contains("Kim"));
    }

    #[test]
    fn test_fallback_plan_names_goal_and_student() {
        let text = fallback_plan(&context(), "a game developer for education");
        assert!(text.contains("Kim"));
        assert!(text.contains("a game developer for education"));
        assert!(text.contains("Mid-goal 3"));
    }
}
