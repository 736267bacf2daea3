use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::load;
use crate::pmc;
use crate::recovery::{self, RecoveryScore};
use crate::store::{Database, StoreError};

/// Window for the trailing weekly load sum, in days
const WEEKLY_WINDOW_DAYS: u16 = 7;

/// Qualitative form bands over TSB, evaluated lowest threshold first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormStatus {
    Overreaching,
    OptimalTraining,
    Maintaining,
    PeakForm,
    Detraining,
}

impl FormStatus {
    /// Band for a TSB value; boundaries are strict less-than
    pub fn from_tsb(tsb: Decimal) -> Self {
        if tsb < Decimal::from(-30) {
            FormStatus::Overreaching
        } else if tsb < Decimal::from(-10) {
            FormStatus::OptimalTraining
        } else if tsb < Decimal::from(5) {
            FormStatus::Maintaining
        } else if tsb < Decimal::from(25) {
            FormStatus::PeakForm
        } else {
            FormStatus::Detraining
        }
    }

    /// Display label for this band
    pub fn label(&self) -> &'static str {
        match self {
            FormStatus::Overreaching => "Overreaching - high risk of overtraining",
            FormStatus::OptimalTraining => "Optimal training zone - building fitness",
            FormStatus::Maintaining => "Maintaining fitness",
            FormStatus::PeakForm => "Peak form - race ready",
            FormStatus::Detraining => "Detraining - consider increasing training load",
        }
    }
}

impl fmt::Display for FormStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fitness block of the metrics bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessSummary {
    pub ctl: Decimal,
    pub description: String,
}

/// Fatigue block of the metrics bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueSummary {
    pub atl: Decimal,
    pub description: String,
}

/// Form block of the metrics bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSummary {
    pub tsb: Decimal,
    pub status: String,
    pub description: String,
}

/// Full training metrics bundle, serialized directly by consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub fitness: FitnessSummary,
    pub fatigue: FatigueSummary,
    pub form: FormSummary,
    pub recovery: RecoveryScore,
    pub weekly_training_load: Decimal,
}

/// All training metrics for a user as of the given date.
///
/// The recovery calculator recomputes the fitness-fatigue-form snapshot
/// internally; the duplicate store read is accepted. The weekly load is an
/// independent 7-day fetch, not a slice of the 42-day series.
pub fn get_training_metrics(
    store: &Database,
    user_id: i64,
    as_of: NaiveDate,
) -> Result<TrainingMetrics, StoreError> {
    let fff = pmc::compute_fitness_fatigue_form(store, user_id, as_of)?;
    let recovery = recovery::compute_recovery(store, user_id, as_of)?;

    let weekly_training_load = load::daily_load_series(store, user_id, WEEKLY_WINDOW_DAYS, as_of)?
        .iter()
        .copied()
        .sum::<Decimal>()
        .round_dp(2);

    let status = FormStatus::from_tsb(fff.tsb);

    Ok(TrainingMetrics {
        fitness: FitnessSummary {
            ctl: fff.ctl,
            description: "Chronic Training Load - your overall fitness level".to_string(),
        },
        fatigue: FatigueSummary {
            atl: fff.atl,
            description: "Acute Training Load - your recent training stress".to_string(),
        },
        form: FormSummary {
            tsb: fff.tsb,
            status: status.label().to_string(),
            description: "Training Stress Balance - readiness to perform".to_string(),
        },
        recovery,
        weekly_training_load,
    })
}
