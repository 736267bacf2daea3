//! Composite recovery scoring from sleep quality and training stress.
//!
//! The recovery score blends two equally weighted components into a 0-100
//! value:
//!
//! - **Sleep**: average hours and subjective quality over the last three
//!   calendar nights, scored against an 8-hour target. No sleep data scores
//!   a neutral 50.
//! - **Training stress**: a piecewise mapping of the current training
//!   stress balance (TSB). Positive TSB means the athlete is fresh;
//!   accumulated fatigue pushes the component toward zero. With no training
//!   history the athlete is assumed recovered (75).
//!
//! Score bands: 80-100 fully recovered, 60-79 moderate, 40-59 low,
//! below 40 poor.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::SleepEntry;
use crate::pmc::{self, FitnessFatigueForm};
use crate::store::{Database, StoreError};

/// Calendar days of sleep history consulted
const SLEEP_WINDOW_DAYS: u64 = 3;

/// Maximum sleep entries blended into the sleep component
const SLEEP_ENTRY_CAP: usize = 3;

/// Qualitative recovery bands over the 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryBand {
    /// 80-100: ready for hard training
    Full,
    /// 60-79: easy to moderate training
    Moderate,
    /// 40-59: rest or very easy activity
    Low,
    /// Below 40: rest required
    Poor,
}

impl RecoveryBand {
    /// Band for a recovery score, evaluated high to low
    pub fn from_score(score: Decimal) -> Self {
        if score >= Decimal::from(80) {
            RecoveryBand::Full
        } else if score >= Decimal::from(60) {
            RecoveryBand::Moderate
        } else if score >= Decimal::from(40) {
            RecoveryBand::Low
        } else {
            RecoveryBand::Poor
        }
    }

    /// Training guidance for this band
    pub fn recommendation(&self) -> &'static str {
        match self {
            RecoveryBand::Full => "Fully recovered - ready for hard training",
            RecoveryBand::Moderate => "Moderate recovery - easy/moderate training recommended",
            RecoveryBand::Low => "Low recovery - consider rest or very easy activity",
            RecoveryBand::Poor => "Poor recovery - rest required",
        }
    }
}

/// Composite recovery assessment for one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryScore {
    /// Composite score, 0-100, one decimal place
    pub recovery_score: Decimal,

    /// Guidance text for the score's band
    pub recommendation: String,

    /// Sleep component, 0-100
    pub sleep_quality: Decimal,

    /// Training-stress component, 0-100
    pub training_stress: Decimal,
}

/// Sleep component of the recovery score.
///
/// Averages hours and quality over the given entries (simple mean, not
/// recency-weighted), scores hours against an 8-hour target capped at 100,
/// quality against the 1-10 scale, and blends the two equally.
/// No entries yields the neutral 50.
pub fn sleep_component(entries: &[SleepEntry]) -> Decimal {
    if entries.is_empty() {
        return Decimal::from(50);
    }

    let count = Decimal::from(entries.len());
    let avg_hours = entries.iter().map(|e| e.hours).sum::<Decimal>() / count;
    let avg_quality = entries
        .iter()
        .map(|e| Decimal::from(e.quality_score))
        .sum::<Decimal>()
        / count;

    let hours_score =
        (avg_hours / Decimal::from(8) * Decimal::from(100)).min(Decimal::from(100));
    let quality_score = avg_quality / Decimal::from(10) * Decimal::from(100);

    (hours_score + quality_score) / Decimal::from(2)
}

/// Training-stress component of the recovery score, piecewise on TSB.
///
/// With no chronic load the athlete is assumed recovered. Branches are
/// evaluated top-down; the lower bound of each band is inclusive.
pub fn training_stress_component(fff: &FitnessFatigueForm) -> Decimal {
    if fff.ctl == Decimal::ZERO {
        return Decimal::from(75);
    }

    let tsb = fff.tsb;
    if tsb >= Decimal::from(10) {
        Decimal::from(100)
    } else if tsb >= Decimal::ZERO {
        Decimal::from(75) + tsb / Decimal::from(10) * Decimal::from(25)
    } else if tsb >= Decimal::from(-15) {
        Decimal::from(50) + (tsb + Decimal::from(15)) / Decimal::from(15) * Decimal::from(25)
    } else {
        (Decimal::from(50) + tsb / Decimal::from(30) * Decimal::from(50)).max(Decimal::ZERO)
    }
}

/// Recovery score for a user as of the given date.
///
/// Fetches up to the three most recent sleep entries from the last three
/// calendar days (inclusive of `as_of`) and recomputes the current
/// fitness-fatigue-form snapshot for the stress component.
pub fn compute_recovery(
    store: &Database,
    user_id: i64,
    as_of: NaiveDate,
) -> Result<RecoveryScore, StoreError> {
    let start = as_of
        .checked_sub_days(Days::new(SLEEP_WINDOW_DAYS - 1))
        .unwrap_or(as_of);
    let sleep = store.recent_sleep(user_id, start, as_of, SLEEP_ENTRY_CAP)?;
    let sleep_score = sleep_component(&sleep);

    let fff = pmc::compute_fitness_fatigue_form(store, user_id, as_of)?;
    let stress_score = training_stress_component(&fff);

    let half = Decimal::new(5, 1);
    let recovery_score = (sleep_score * half + stress_score * half).round_dp(1);
    let band = RecoveryBand::from_score(recovery_score);

    Ok(RecoveryScore {
        recovery_score,
        recommendation: band.recommendation().to_string(),
        sleep_quality: sleep_score.round_dp(1),
        training_stress: stress_score.round_dp(1),
    })
}
