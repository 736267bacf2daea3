use chrono::NaiveDate;
use std::cell::RefCell;

use peakform::coach::{self, Intensity};
use peakform::llm::{ChatClient, CompletionOptions, LlmError};
use peakform::models::WorkoutType;
use peakform::store::Database;

/// Pipeline behavior tests with a scripted stand-in for the model client.

struct ScriptedClient {
    responses: RefCell<Vec<Result<String, LlmError>>>,
}

impl ScriptedClient {
    fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: RefCell::new(responses),
        }
    }
}

impl ChatClient for ScriptedClient {
    fn complete(&self, _prompt: &str, _options: &CompletionOptions) -> Result<String, LlmError> {
        let mut responses = self.responses.borrow_mut();
        assert!(!responses.is_empty(), "pipeline made an unexpected model call");
        responses.remove(0)
    }
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
}

fn seeded_store() -> (Database, i64) {
    let db = Database::open_in_memory().unwrap();
    let user_id = db
        .insert_user(
            "Test Athlete",
            Some("running"),
            Some("intermediate"),
            Some("marathon"),
        )
        .unwrap();
    (db, user_id)
}

fn easy_run_json() -> String {
    r#"{
        "workout_type": "easy",
        "duration_minutes": 45,
        "intensity": "low",
        "description": "45 minute conversational-pace run",
        "reasoning": "Recovery score supports aerobic work",
        "warnings": []
    }"#
    .to_string()
}

#[test]
fn test_happy_path_produces_parsed_recommendation() {
    let (db, user_id) = seeded_store();
    let client = ScriptedClient::new(vec![
        Ok("The athlete is well recovered with a light recent load.".to_string()),
        Ok(easy_run_json()),
        Ok("APPROVED".to_string()),
    ]);

    let output = coach::generate_recommendation(&db, &client, user_id, as_of()).unwrap();

    assert_eq!(output.recommendation.workout_type, WorkoutType::Easy);
    assert_eq!(output.recommendation.duration_minutes, 45);
    assert_eq!(output.recommendation.intensity, Intensity::Low);
    assert!(output.analysis.contains("well recovered"));
    assert_eq!(output.validation, "APPROVED");
    assert_eq!(output.generated_date, as_of());
}

#[test]
fn test_fenced_json_is_parsed() {
    let (db, user_id) = seeded_store();
    let fenced = format!("```json\n{}\n```", easy_run_json());
    let client = ScriptedClient::new(vec![
        Ok("Analysis.".to_string()),
        Ok(fenced),
        Ok("APPROVED".to_string()),
    ]);

    let output = coach::generate_recommendation(&db, &client, user_id, as_of()).unwrap();
    assert_eq!(output.recommendation.workout_type, WorkoutType::Easy);
}

#[test]
fn test_recommend_failure_falls_back_to_rest_day() {
    let (db, user_id) = seeded_store();
    let client = ScriptedClient::new(vec![
        Ok("Analysis.".to_string()),
        Err(LlmError::EmptyResponse),
        Ok("APPROVED".to_string()),
    ]);

    let output = coach::generate_recommendation(&db, &client, user_id, as_of()).unwrap();

    assert_eq!(output.recommendation.workout_type, WorkoutType::Rest);
    assert_eq!(output.recommendation.duration_minutes, 0);
    assert!(output
        .recommendation
        .warnings
        .iter()
        .any(|w| w.contains("defaulting to rest day")));
}

#[test]
fn test_unparseable_recommendation_falls_back_to_rest_day() {
    let (db, user_id) = seeded_store();
    let client = ScriptedClient::new(vec![
        Ok("Analysis.".to_string()),
        Ok("I suggest you go for a nice easy run!".to_string()),
        Ok("APPROVED".to_string()),
    ]);

    let output = coach::generate_recommendation(&db, &client, user_id, as_of()).unwrap();
    assert_eq!(output.recommendation.workout_type, WorkoutType::Rest);
    assert!(output
        .recommendation
        .reasoning
        .contains("Error generating recommendation"));
}

#[test]
fn test_every_stage_failing_still_yields_rest_day() {
    let (db, user_id) = seeded_store();
    let client = ScriptedClient::new(vec![
        Err(LlmError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }),
        Err(LlmError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }),
        Err(LlmError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }),
    ]);

    let output = coach::generate_recommendation(&db, &client, user_id, as_of()).unwrap();

    assert_eq!(output.recommendation.workout_type, WorkoutType::Rest);
    assert!(output.analysis.contains("Error in analysis"));
    assert!(output.validation.contains("Validation error"));
}

#[test]
fn test_validator_rejection_replaces_with_rest_day() {
    let (db, user_id) = seeded_store();
    let client = ScriptedClient::new(vec![
        Ok("Analysis.".to_string()),
        Ok(easy_run_json()),
        Ok("REJECT: recovery too low for any training today".to_string()),
    ]);

    let output = coach::generate_recommendation(&db, &client, user_id, as_of()).unwrap();

    assert_eq!(output.recommendation.workout_type, WorkoutType::Rest);
    assert!(output.recommendation.reasoning.contains("REJECT:"));
    assert!(output
        .recommendation
        .warnings
        .iter()
        .any(|w| w.contains("rejected by safety validator")));
}

#[test]
fn test_validator_adjustment_appends_warning() {
    let (db, user_id) = seeded_store();
    let client = ScriptedClient::new(vec![
        Ok("Analysis.".to_string()),
        Ok(easy_run_json()),
        Ok("ADJUST: shorten the run to 30 minutes".to_string()),
    ]);

    let output = coach::generate_recommendation(&db, &client, user_id, as_of()).unwrap();

    // the workout itself is kept
    assert_eq!(output.recommendation.workout_type, WorkoutType::Easy);
    assert!(output
        .recommendation
        .warnings
        .iter()
        .any(|w| w.contains("shorten the run")));
}

#[test]
fn test_recommendation_is_persisted_append_only() {
    let (db, user_id) = seeded_store();

    let client = ScriptedClient::new(vec![
        Ok("Analysis one.".to_string()),
        Ok(easy_run_json()),
        Ok("APPROVED".to_string()),
    ]);
    coach::generate_recommendation(&db, &client, user_id, as_of()).unwrap();

    let client = ScriptedClient::new(vec![
        Ok("Analysis two.".to_string()),
        Err(LlmError::EmptyResponse),
        Ok("APPROVED".to_string()),
    ]);
    coach::generate_recommendation(&db, &client, user_id, as_of()).unwrap();

    let saved = db.latest_recommendation(user_id).unwrap().unwrap();
    assert_eq!(saved.date, as_of());
    assert!(saved.recommendation_json.contains("rest"));
    assert_eq!(saved.reasoning_summary.as_deref(), Some("Analysis two."));
}

#[test]
fn test_unknown_user_is_an_error() {
    let db = Database::open_in_memory().unwrap();
    let client = ScriptedClient::new(vec![]);

    let result = coach::generate_recommendation(&db, &client, 42, as_of());
    assert!(result.is_err());
}
