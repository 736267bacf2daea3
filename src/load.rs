//! Daily training-load projection over a calendar window.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::models::WorkoutType;
use crate::store::{Database, StoreError};

/// First day of a window of `window_days` ending at `as_of`, inclusive
pub fn window_start(as_of: NaiveDate, window_days: u16) -> NaiveDate {
    as_of
        .checked_sub_days(Days::new(u64::from(window_days.saturating_sub(1))))
        .unwrap_or(as_of)
}

/// One training-load value per calendar day across the window ending at
/// `as_of`, oldest first. Days without workouts are zero-filled; multiple
/// workouts on one day are summed; a missing load score counts as zero.
/// The result always has exactly `window_days` entries.
pub fn daily_load_series(
    store: &Database,
    user_id: i64,
    window_days: u16,
    as_of: NaiveDate,
) -> Result<Vec<Decimal>, StoreError> {
    if window_days == 0 {
        return Ok(Vec::new());
    }

    let start = window_start(as_of, window_days);
    let workouts = store.workouts_in_range(user_id, start, as_of)?;

    let mut load_by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for workout in &workouts {
        let load = workout.load_score.unwrap_or(Decimal::ZERO);
        load_by_day
            .entry(workout.date)
            .and_modify(|total| *total += load)
            .or_insert(load);
    }

    let mut series = Vec::with_capacity(usize::from(window_days));
    let mut day = start;
    for _ in 0..window_days {
        series.push(load_by_day.get(&day).copied().unwrap_or(Decimal::ZERO));
        day = day.succ_opt().unwrap_or(day);
    }

    Ok(series)
}

/// Training load score assigned when a workout is logged:
/// duration scaled by a per-type intensity factor and, when heart rate is
/// available, a heart-rate factor. Rounded to 2 decimal places.
pub fn training_load_score(
    duration_minutes: Decimal,
    workout_type: WorkoutType,
    avg_hr: Option<u16>,
) -> Decimal {
    let intensity_factor = match workout_type {
        WorkoutType::Easy => Decimal::ONE,
        WorkoutType::Tempo => Decimal::new(15, 1),
        WorkoutType::Interval => Decimal::new(2, 0),
        WorkoutType::Long => Decimal::new(12, 1),
        WorkoutType::Race => Decimal::new(25, 1),
        WorkoutType::Rest => Decimal::ONE,
    };

    let mut score = duration_minutes * intensity_factor;

    if let Some(hr) = avg_hr {
        let hr_factor = if hr < 130 {
            Decimal::ONE
        } else if hr < 150 {
            Decimal::new(12, 1)
        } else if hr < 170 {
            Decimal::new(15, 1)
        } else {
            Decimal::new(18, 1)
        };
        score *= hr_factor;
    }

    score.round_dp(2)
}
