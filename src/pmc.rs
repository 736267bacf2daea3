use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::load;
use crate::store::{Database, StoreError};

/// Time constant for chronic training load (fitness), in days
pub const CTL_TIME_CONSTANT: u16 = 42;

/// Time constant for acute training load (fatigue), in days
pub const ATL_TIME_CONSTANT: u16 = 7;

/// Fitness-fatigue-form snapshot for one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitnessFatigueForm {
    /// Chronic Training Load: 42-day smoothed load (fitness)
    pub ctl: Decimal,

    /// Acute Training Load: 7-day smoothed load (fatigue)
    pub atl: Decimal,

    /// Training Stress Balance: ctl - atl (form)
    pub tsb: Decimal,
}

impl FitnessFatigueForm {
    /// All-zero snapshot for an athlete with no training history
    pub fn zero() -> Self {
        FitnessFatigueForm {
            ctl: Decimal::ZERO,
            atl: Decimal::ZERO,
            tsb: Decimal::ZERO,
        }
    }
}

/// Exponential moving average over a chronological series.
///
/// Seeded with the first observation, then folded oldest to newest with
/// `alpha = 2 / (time_constant + 1)`. The seeding makes early smoothing
/// sensitive to where the window starts; downstream results depend on it,
/// so it must not be replaced with a zero-seeded average.
/// Empty input yields 0. Result is rounded to 2 decimal places.
pub fn exponential_moving_average(values: &[Decimal], time_constant: u16) -> Decimal {
    let Some((first, rest)) = values.split_first() else {
        return Decimal::ZERO;
    };

    let alpha = Decimal::from(2) / Decimal::from(u32::from(time_constant) + 1);
    let mut ema = *first;
    for value in rest {
        ema = alpha * *value + (Decimal::ONE - alpha) * ema;
    }

    ema.round_dp(2)
}

/// CTL, ATL, and TSB for a user as of the given date.
///
/// Loads one 42-day series; the ATL reuses the tail of that same series
/// rather than reloading a 7-day window. A series that is empty or sums to
/// exactly zero short-circuits to the all-zero snapshot.
pub fn compute_fitness_fatigue_form(
    store: &Database,
    user_id: i64,
    as_of: NaiveDate,
) -> Result<FitnessFatigueForm, StoreError> {
    let series = load::daily_load_series(store, user_id, CTL_TIME_CONSTANT, as_of)?;

    let total: Decimal = series.iter().copied().sum();
    if series.is_empty() || total == Decimal::ZERO {
        return Ok(FitnessFatigueForm::zero());
    }

    let ctl = exponential_moving_average(&series, CTL_TIME_CONSTANT);

    let recent = if series.len() >= usize::from(ATL_TIME_CONSTANT) {
        &series[series.len() - usize::from(ATL_TIME_CONSTANT)..]
    } else {
        &series[..]
    };
    let atl = exponential_moving_average(recent, ATL_TIME_CONSTANT);

    let tsb = (ctl - atl).round_dp(2);

    Ok(FitnessFatigueForm { ctl, atl, tsb })
}
