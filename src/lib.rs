// Library interface for the peakform training metrics engine.
// This allows integration tests to access the core functionality.

pub mod coach;
pub mod config;
pub mod error;
pub mod llm;
pub mod load;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pmc;
pub mod recovery;
pub mod store;

// Re-export commonly used types for convenience
pub use coach::{RecommendationOutput, WorkoutRecommendation};
pub use config::AppConfig;
pub use error::{PeakformError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::{FormStatus, TrainingMetrics};
pub use models::*;
pub use pmc::FitnessFatigueForm;
pub use recovery::{RecoveryBand, RecoveryScore};
pub use store::Database;
