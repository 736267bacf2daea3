//! AI workout recommendation pipeline.
//!
//! Four ordered stages run over an immutable state record:
//! analyze -> recommend -> validate -> finalize. Each stage catches its own
//! model failure and substitutes a well-defined fallback, so a broken or
//! unreachable endpoint degrades to a rest-day recommendation instead of an
//! error. Only the store reads and the final save can fail.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::llm::{ChatClient, CompletionOptions};
use crate::metrics::{self, TrainingMetrics};
use crate::models::{UserProfile, WorkoutType};
use crate::store::Database;

const ANALYZE_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.7,
    max_tokens: 500,
};

const RECOMMEND_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.7,
    max_tokens: 600,
};

const VALIDATE_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.3,
    max_tokens: 200,
};

/// Intensity levels a recommendation may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Moderate => "moderate",
            Intensity::High => "high",
        }
    }
}

impl std::fmt::Display for Intensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured workout recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecommendation {
    pub workout_type: WorkoutType,
    pub duration_minutes: u32,
    pub intensity: Intensity,
    pub description: String,
    pub reasoning: String,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl WorkoutRecommendation {
    /// Safe fallback substituted whenever a pipeline stage fails
    pub fn rest_day(reasoning: impl Into<String>, warning: impl Into<String>) -> Self {
        WorkoutRecommendation {
            workout_type: WorkoutType::Rest,
            duration_minutes: 0,
            intensity: Intensity::Low,
            description: "Take a rest day to recover".to_string(),
            reasoning: reasoning.into(),
            warnings: vec![warning.into()],
        }
    }
}

/// State threaded through the pipeline; stages take and return it whole
#[derive(Debug, Clone)]
pub struct RecommendationState {
    pub profile: UserProfile,
    pub metrics: TrainingMetrics,
    pub analysis: String,
    pub recommendation: Option<WorkoutRecommendation>,
    pub validation: String,
}

/// Finalized pipeline output
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationOutput {
    pub recommendation: WorkoutRecommendation,
    pub analysis: String,
    pub validation: String,
    pub generated_date: NaiveDate,
}

type Stage = fn(&dyn ChatClient, RecommendationState) -> RecommendationState;

const STAGES: [(&str, Stage); 3] = [
    ("analyze", analyze_stage),
    ("recommend", recommend_stage),
    ("validate", validate_stage),
];

/// Run the full stage list and finalize the output for `as_of`
pub fn run_pipeline(
    client: &dyn ChatClient,
    profile: UserProfile,
    metrics: TrainingMetrics,
    as_of: NaiveDate,
) -> RecommendationOutput {
    let mut state = RecommendationState {
        profile,
        metrics,
        analysis: String::new(),
        recommendation: None,
        validation: String::new(),
    };

    for (name, stage) in STAGES {
        debug!(stage = name, "running recommendation stage");
        state = stage(client, state);
    }

    finalize_stage(state, as_of)
}

/// Generate, persist, and return a recommendation for a user.
///
/// The saved row is append-only; generating twice for one day creates two
/// rows.
pub fn generate_recommendation(
    store: &Database,
    client: &dyn ChatClient,
    user_id: i64,
    as_of: NaiveDate,
) -> Result<RecommendationOutput> {
    let profile = store.get_user(user_id)?;
    let metrics = metrics::get_training_metrics(store, user_id, as_of)?;

    let output = run_pipeline(client, profile, metrics, as_of);

    let recommendation_json = serde_json::to_string(&output.recommendation)?;
    store.insert_recommendation(user_id, as_of, &recommendation_json, Some(&output.analysis))?;

    Ok(output)
}

/// Stage 1: assess the athlete's current training state
fn analyze_stage(client: &dyn ChatClient, mut state: RecommendationState) -> RecommendationState {
    let prompt = analysis_prompt(&state.profile, &state.metrics);

    state.analysis = match client.complete(&prompt, &ANALYZE_OPTIONS) {
        Ok(analysis) => analysis,
        Err(err) => {
            warn!(error = %err, "analysis stage failed");
            format!("Error in analysis: {err}")
        }
    };
    state
}

/// Stage 2: turn the analysis into a structured workout recommendation
fn recommend_stage(client: &dyn ChatClient, mut state: RecommendationState) -> RecommendationState {
    let prompt = recommendation_prompt(&state.profile, &state.metrics, &state.analysis);

    let recommendation = client
        .complete(&prompt, &RECOMMEND_OPTIONS)
        .map_err(|err| err.to_string())
        .and_then(|raw| {
            serde_json::from_str::<WorkoutRecommendation>(extract_json_block(&raw))
                .map_err(|err| err.to_string())
        });

    state.recommendation = Some(match recommendation {
        Ok(recommendation) => recommendation,
        Err(err) => {
            warn!(error = %err, "recommendation stage failed, falling back to rest day");
            WorkoutRecommendation::rest_day(
                format!("Error generating recommendation: {err}"),
                "System error - defaulting to rest day",
            )
        }
    });
    state
}

/// Stage 3: safety-review the recommendation
fn validate_stage(client: &dyn ChatClient, mut state: RecommendationState) -> RecommendationState {
    let Some(recommendation) = state.recommendation.clone() else {
        return state;
    };
    let prompt = validation_prompt(&state.profile, &state.metrics, &recommendation);

    match client.complete(&prompt, &VALIDATE_OPTIONS) {
        Ok(validation) => {
            if validation.contains("REJECT:") {
                state.recommendation = Some(WorkoutRecommendation::rest_day(
                    validation.clone(),
                    "Original recommendation rejected by safety validator",
                ));
            } else if validation.contains("ADJUST:") {
                if let Some(recommendation) = state.recommendation.as_mut() {
                    recommendation
                        .warnings
                        .push(format!("Validation note: {validation}"));
                }
            }
            state.validation = validation;
        }
        Err(err) => {
            warn!(error = %err, "validation stage failed");
            state.validation = format!("Validation error: {err}");
        }
    }
    state
}

/// Stage 4: assemble the final output record
fn finalize_stage(state: RecommendationState, as_of: NaiveDate) -> RecommendationOutput {
    let recommendation = state.recommendation.unwrap_or_else(|| {
        WorkoutRecommendation::rest_day(
            "No recommendation was produced",
            "Pipeline produced no recommendation - defaulting to rest day",
        )
    });

    RecommendationOutput {
        recommendation,
        analysis: state.analysis,
        validation: state.validation,
        generated_date: as_of,
    }
}

fn analysis_prompt(profile: &UserProfile, metrics: &TrainingMetrics) -> String {
    format!(
        "You are an expert endurance sports coach analyzing an athlete's training data.\n\n\
         ATHLETE PROFILE:\n\
         - Name: {name}\n\
         - Sport: {sport}\n\
         - Experience: {experience}\n\
         - Goal: {goal}\n\n\
         CURRENT TRAINING METRICS:\n\
         - Fitness (CTL): {ctl}\n\
         - Fatigue (ATL): {atl}\n\
         - Form (TSB): {tsb} - {form_status}\n\
         - Recovery Score: {recovery}% - {recovery_note}\n\
         - Weekly Training Load: {weekly}\n\n\
         ANALYSIS TASK:\n\
         1. Assess the athlete's current training state\n\
         2. Identify any red flags (overtraining, under-recovery, detraining)\n\
         3. Determine what type of training they need most\n\
         4. Consider their experience level and goals\n\n\
         Provide a concise 2-3 paragraph analysis.",
        name = profile.name,
        sport = profile.sport_or_default(),
        experience = profile.experience_or_default(),
        goal = profile.goal_or_default(),
        ctl = metrics.fitness.ctl,
        atl = metrics.fatigue.atl,
        tsb = metrics.form.tsb,
        form_status = metrics.form.status,
        recovery = metrics.recovery.recovery_score,
        recovery_note = metrics.recovery.recommendation,
        weekly = metrics.weekly_training_load,
    )
}

fn recommendation_prompt(
    profile: &UserProfile,
    metrics: &TrainingMetrics,
    analysis: &str,
) -> String {
    format!(
        "Based on this analysis, create a specific workout recommendation.\n\n\
         ANALYSIS:\n{analysis}\n\n\
         CURRENT STATE:\n\
         - Form (TSB): {tsb}\n\
         - Recovery: {recovery}%\n\
         - Athlete Goal: {goal}\n\n\
         Generate a workout recommendation in JSON format with these fields:\n\
         {{\n\
             \"workout_type\": \"easy|tempo|interval|long|race|rest\",\n\
             \"duration_minutes\": <number>,\n\
             \"intensity\": \"low|moderate|high\",\n\
             \"description\": \"<detailed workout description>\",\n\
             \"reasoning\": \"<why this workout is appropriate now>\",\n\
             \"warnings\": [\"<any important warnings or cautions>\"]\n\
         }}\n\n\
         IMPORTANT:\n\
         - If TSB < -20, prioritize recovery (rest or very easy workouts)\n\
         - If Recovery Score < 60%, recommend easy training or rest\n\
         - Consider experience level (don't overload beginners)\n\
         - Match workout to stated goal (marathon prep, base building, etc.)\n\n\
         Return ONLY valid JSON, no additional text.",
        analysis = analysis,
        tsb = metrics.form.tsb,
        recovery = metrics.recovery.recovery_score,
        goal = profile.goal_or_default(),
    )
}

fn validation_prompt(
    profile: &UserProfile,
    metrics: &TrainingMetrics,
    recommendation: &WorkoutRecommendation,
) -> String {
    format!(
        "You are a sports medicine expert. Review this workout recommendation for safety.\n\n\
         ATHLETE:\n\
         - Experience: {experience}\n\
         - Current Recovery: {recovery}%\n\
         - Form (TSB): {tsb}\n\n\
         RECOMMENDED WORKOUT:\n\
         - Type: {workout_type}\n\
         - Duration: {duration} minutes\n\
         - Intensity: {intensity}\n\
         - Description: {description}\n\n\
         VALIDATION TASK:\n\
         1. Is this safe given their current state?\n\
         2. Are there any injury risks?\n\
         3. Should the intensity/duration be adjusted?\n\n\
         Respond with:\n\
         - \"APPROVED\" if safe as-is\n\
         - \"ADJUST: <specific changes needed>\" if needs modification\n\
         - \"REJECT: <reason>\" if unsafe\n\n\
         Keep response to 1-2 sentences.",
        experience = profile.experience_or_default(),
        recovery = metrics.recovery.recovery_score,
        tsb = metrics.form.tsb,
        workout_type = recommendation.workout_type,
        duration = recommendation.duration_minutes,
        intensity = recommendation.intensity,
        description = recommendation.description,
    )
}

/// Strip a markdown code fence from a model response, if present
fn extract_json_block(text: &str) -> &str {
    let trimmed = text.trim();
    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let rest = &trimmed[start + fence.len()..];
            if let Some(end) = rest.find("```") {
                return rest[..end].trim();
            }
            return rest.trim();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_block_passthrough() {
        assert_eq!(extract_json_block(r#"  {"a": 1}  "#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_block_strips_json_fence() {
        let text = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json_block(text), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_block_strips_bare_fence() {
        let text = "Here it is:\n```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_block(text), "{\"a\": 1}");
    }

    #[test]
    fn test_extract_json_block_handles_unterminated_fence() {
        let text = "```json\n{\"a\": 1}";
        assert_eq!(extract_json_block(text), "{\"a\": 1}");
    }

    #[test]
    fn test_rest_day_fallback_shape() {
        let rec = WorkoutRecommendation::rest_day("why", "careful");
        assert_eq!(rec.workout_type, WorkoutType::Rest);
        assert_eq!(rec.duration_minutes, 0);
        assert_eq!(rec.intensity, Intensity::Low);
        assert_eq!(rec.warnings, vec!["careful".to_string()]);
    }

    #[test]
    fn test_recommendation_deserializes_without_warnings_field() {
        let raw = r#"{
            "workout_type": "easy",
            "duration_minutes": 45,
            "intensity": "low",
            "description": "Easy aerobic run",
            "reasoning": "Recovery week"
        }"#;
        let rec: WorkoutRecommendation = serde_json::from_str(raw).unwrap();
        assert_eq!(rec.workout_type, WorkoutType::Easy);
        assert!(rec.warnings.is_empty());
    }
}
