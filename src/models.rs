use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Workout categories, shared by logged sessions and coach recommendations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutType {
    Easy,
    Tempo,
    Interval,
    Long,
    Race,
    Rest,
}

impl WorkoutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutType::Easy => "easy",
            WorkoutType::Tempo => "tempo",
            WorkoutType::Interval => "interval",
            WorkoutType::Long => "long",
            WorkoutType::Race => "race",
            WorkoutType::Rest => "rest",
        }
    }
}

impl fmt::Display for WorkoutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a workout type string is not recognized
#[derive(Debug, Error)]
#[error("Unknown workout type: {0}")]
pub struct ParseWorkoutTypeError(pub String);

impl FromStr for WorkoutType {
    type Err = ParseWorkoutTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(WorkoutType::Easy),
            "tempo" => Ok(WorkoutType::Tempo),
            "interval" => Ok(WorkoutType::Interval),
            "long" => Ok(WorkoutType::Long),
            "race" => Ok(WorkoutType::Race),
            "rest" => Ok(WorkoutType::Rest),
            other => Err(ParseWorkoutTypeError(other.to_string())),
        }
    }
}

/// A stored workout log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutEntry {
    pub id: i64,

    pub user_id: i64,

    /// Calendar date of the session
    pub date: NaiveDate,

    pub workout_type: WorkoutType,

    /// Session duration in minutes
    pub duration_minutes: Decimal,

    /// Distance covered in kilometers
    pub distance_km: Option<Decimal>,

    /// Average heart rate in bpm
    pub avg_hr: Option<u16>,

    /// Training load score, computed when the session is logged
    pub load_score: Option<Decimal>,

    pub created_at: DateTime<Utc>,
}

/// Fields required to log a new workout
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkout {
    pub user_id: i64,
    pub date: NaiveDate,
    pub workout_type: WorkoutType,
    pub duration_minutes: Decimal,
    pub distance_km: Option<Decimal>,
    pub avg_hr: Option<u16>,
    pub load_score: Option<Decimal>,
}

/// A stored nightly sleep log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepEntry {
    pub id: i64,

    pub user_id: i64,

    /// Calendar date the night of sleep is attributed to
    pub date: NaiveDate,

    /// Total sleep in hours
    pub hours: Decimal,

    /// Subjective quality score, 1-10
    pub quality_score: u8,

    pub created_at: DateTime<Utc>,
}

/// Fields required to log a new sleep entry
#[derive(Debug, Clone, PartialEq)]
pub struct NewSleepEntry {
    pub user_id: i64,
    pub date: NaiveDate,
    pub hours: Decimal,
    pub quality_score: u8,
}

/// A registered athlete profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,

    pub name: String,

    /// Primary sport, e.g. "running", "cycling", "triathlon"
    pub sport: Option<String>,

    /// Self-reported level: beginner / intermediate / advanced
    pub experience_level: Option<String>,

    /// Stated training goal, e.g. "marathon", "base fitness"
    pub goal: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn sport_or_default(&self) -> &str {
        self.sport.as_deref().unwrap_or("endurance sports")
    }

    pub fn experience_or_default(&self) -> &str {
        self.experience_level.as_deref().unwrap_or("intermediate")
    }

    pub fn goal_or_default(&self) -> &str {
        self.goal.as_deref().unwrap_or("general fitness")
    }
}

/// A persisted coach recommendation row (append-only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRecommendation {
    pub id: i64,

    pub user_id: i64,

    /// Calendar date the recommendation was generated for
    pub date: NaiveDate,

    /// Structured recommendation as a JSON document
    pub recommendation_json: String,

    /// Free-text analysis that led to the recommendation
    pub reasoning_summary: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workout_type_round_trip() {
        for (name, expected) in [
            ("easy", WorkoutType::Easy),
            ("tempo", WorkoutType::Tempo),
            ("interval", WorkoutType::Interval),
            ("long", WorkoutType::Long),
            ("race", WorkoutType::Race),
            ("rest", WorkoutType::Rest),
        ] {
            let parsed: WorkoutType = name.parse().unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.as_str(), name);
        }
    }

    #[test]
    fn test_workout_type_parse_is_case_insensitive() {
        assert_eq!("Tempo".parse::<WorkoutType>().unwrap(), WorkoutType::Tempo);
        assert!("fartlek".parse::<WorkoutType>().is_err());
    }

    #[test]
    fn test_workout_type_serializes_lowercase() {
        let json = serde_json::to_string(&WorkoutType::Interval).unwrap();
        assert_eq!(json, "\"interval\"");
    }

    #[test]
    fn test_profile_prompt_defaults() {
        let profile = UserProfile {
            id: 1,
            name: "Test Athlete".to_string(),
            sport: None,
            experience_level: None,
            goal: None,
            created_at: Utc::now(),
        };
        assert_eq!(profile.sport_or_default(), "endurance sports");
        assert_eq!(profile.experience_or_default(), "intermediate");
        assert_eq!(profile.goal_or_default(), "general fitness");
    }
}
