use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::models::{
    NewSleepEntry, NewWorkout, SavedRecommendation, SleepEntry, UserProfile, WorkoutEntry,
    WorkoutType,
};

/// Log store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// SQLite-backed log store for workouts, sleep entries, and recommendations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open a private in-memory database (tests)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema with tables and indexes
    fn init_schema(&self) -> Result<(), StoreError> {
        // WAL mode for better concurrent access; this pragma returns the
        // resulting mode as a row, so it cannot go through execute_batch
        let _mode: String =
            self.conn
                .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        self.conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                sport TEXT,
                experience_level TEXT,
                goal TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS workouts (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                date DATE NOT NULL,
                workout_type TEXT NOT NULL,
                duration_minutes TEXT NOT NULL,
                distance_km TEXT,
                avg_hr INTEGER,
                load_score TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,

                FOREIGN KEY (user_id) REFERENCES users (id)
            );

            CREATE TABLE IF NOT EXISTS sleep_logs (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                date DATE NOT NULL,
                hours TEXT NOT NULL,
                quality_score INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,

                FOREIGN KEY (user_id) REFERENCES users (id)
            );

            -- Append-only: no uniqueness on (user_id, date)
            CREATE TABLE IF NOT EXISTS recommendations (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                date DATE NOT NULL,
                recommendation_json TEXT NOT NULL,
                reasoning_summary TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,

                FOREIGN KEY (user_id) REFERENCES users (id)
            );

            CREATE INDEX IF NOT EXISTS idx_workouts_user_date
                ON workouts (user_id, date);
            CREATE INDEX IF NOT EXISTS idx_sleep_logs_user_date
                ON sleep_logs (user_id, date);
            CREATE INDEX IF NOT EXISTS idx_recommendations_user_date
                ON recommendations (user_id, date);
            "#,
        )?;

        Ok(())
    }

    /// Register a new user profile, returning its id
    pub fn insert_user(
        &self,
        name: &str,
        sport: Option<&str>,
        experience_level: Option<&str>,
        goal: Option<&str>,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO users (name, sport, experience_level, goal) VALUES (?1, ?2, ?3, ?4)",
            params![name, sport, experience_level, goal],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Load a user profile by id
    pub fn get_user(&self, user_id: i64) -> Result<UserProfile, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, sport, experience_level, goal, created_at
                 FROM users WHERE id = ?1",
                params![user_id],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("users.{user_id}")))
    }

    /// Store a workout log entry, returning its id
    pub fn insert_workout(&self, workout: &NewWorkout) -> Result<i64, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO workouts (
                user_id, date, workout_type, duration_minutes, distance_km, avg_hr, load_score
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                workout.user_id,
                workout.date,
                workout.workout_type.as_str(),
                workout.duration_minutes.to_string(),
                workout.distance_km.map(|d| d.to_string()),
                workout.avg_hr,
                workout.load_score.map(|l| l.to_string()),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Store a sleep log entry, returning its id
    pub fn insert_sleep(&self, entry: &NewSleepEntry) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO sleep_logs (user_id, date, hours, quality_score) VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.user_id,
                entry.date,
                entry.hours.to_string(),
                entry.quality_score,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All workouts for a user within a closed date range, ascending by date
    pub fn workouts_in_range(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WorkoutEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, date, workout_type, duration_minutes, distance_km,
                   avg_hr, load_score, created_at
            FROM workouts
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date ASC
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, start, end], workout_from_row)?;
        let mut workouts = Vec::new();
        for row in rows {
            workouts.push(row?);
        }
        Ok(workouts)
    }

    /// Most recent sleep entries within a closed date range, newest first,
    /// capped at `limit` rows
    pub fn recent_sleep(
        &self,
        user_id: i64,
        start: NaiveDate,
        end: NaiveDate,
        limit: usize,
    ) -> Result<Vec<SleepEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, user_id, date, hours, quality_score, created_at
            FROM sleep_logs
            WHERE user_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date DESC
            LIMIT ?4
            "#,
        )?;

        let rows = stmt.query_map(params![user_id, start, end, limit as i64], sleep_from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Append a generated recommendation; duplicates per (user, date) are allowed
    pub fn insert_recommendation(
        &self,
        user_id: i64,
        date: NaiveDate,
        recommendation_json: &str,
        reasoning_summary: Option<&str>,
    ) -> Result<i64, StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO recommendations (user_id, date, recommendation_json, reasoning_summary)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![user_id, date, recommendation_json, reasoning_summary],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recently saved recommendation for a user, if any
    pub fn latest_recommendation(
        &self,
        user_id: i64,
    ) -> Result<Option<SavedRecommendation>, StoreError> {
        let rec = self
            .conn
            .query_row(
                r#"
                SELECT id, user_id, date, recommendation_json, reasoning_summary, created_at
                FROM recommendations
                WHERE user_id = ?1
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#,
                params![user_id],
                recommendation_from_row,
            )
            .optional()?;
        Ok(rec)
    }
}

fn user_from_row(row: &Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get("id")?,
        name: row.get("name")?,
        sport: row.get("sport")?,
        experience_level: row.get("experience_level")?,
        goal: row.get("goal")?,
        created_at: row.get::<_, DateTime<Utc>>("created_at")?,
    })
}

fn workout_from_row(row: &Row) -> rusqlite::Result<WorkoutEntry> {
    Ok(WorkoutEntry {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        date: row.get("date")?,
        workout_type: workout_type_column(row, "workout_type")?,
        duration_minutes: decimal_column(row, "duration_minutes")?,
        distance_km: optional_decimal_column(row, "distance_km")?,
        avg_hr: row.get("avg_hr")?,
        load_score: optional_decimal_column(row, "load_score")?,
        created_at: row.get::<_, DateTime<Utc>>("created_at")?,
    })
}

fn sleep_from_row(row: &Row) -> rusqlite::Result<SleepEntry> {
    Ok(SleepEntry {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        date: row.get("date")?,
        hours: decimal_column(row, "hours")?,
        quality_score: row.get("quality_score")?,
        created_at: row.get::<_, DateTime<Utc>>("created_at")?,
    })
}

fn recommendation_from_row(row: &Row) -> rusqlite::Result<SavedRecommendation> {
    Ok(SavedRecommendation {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        date: row.get("date")?,
        recommendation_json: row.get("recommendation_json")?,
        reasoning_summary: row.get("reasoning_summary")?,
        created_at: row.get::<_, DateTime<Utc>>("created_at")?,
    })
}

// Decimal values are stored as TEXT and parsed on read
fn decimal_column(row: &Row, column: &str) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(column)?;
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn optional_decimal_column(row: &Row, column: &str) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(column)?;
    match raw {
        Some(s) => Decimal::from_str(&s)
            .map(Some)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            }),
        None => Ok(None),
    }
}

fn workout_type_column(row: &Row, column: &str) -> rusqlite::Result<WorkoutType> {
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e: crate::models::ParseWorkoutTypeError| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn seeded_store() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let user_id = db
            .insert_user("Test Athlete", Some("running"), None, Some("marathon"))
            .unwrap();
        (db, user_id)
    }

    #[test]
    fn test_user_round_trip() {
        let (db, user_id) = seeded_store();
        let user = db.get_user(user_id).unwrap();
        assert_eq!(user.name, "Test Athlete");
        assert_eq!(user.sport.as_deref(), Some("running"));
        assert_eq!(user.experience_level, None);
        assert_eq!(user.goal.as_deref(), Some("marathon"));
    }

    #[test]
    fn test_missing_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(db.get_user(99), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_workout_round_trip() {
        let (db, user_id) = seeded_store();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        db.insert_workout(&NewWorkout {
            user_id,
            date,
            workout_type: WorkoutType::Tempo,
            duration_minutes: dec!(45.5),
            distance_km: Some(dec!(10.2)),
            avg_hr: Some(155),
            load_score: Some(dec!(81.9)),
        })
        .unwrap();

        let workouts = db.workouts_in_range(user_id, date, date).unwrap();
        assert_eq!(workouts.len(), 1);
        let w = &workouts[0];
        assert_eq!(w.workout_type, WorkoutType::Tempo);
        assert_eq!(w.duration_minutes, dec!(45.5));
        assert_eq!(w.distance_km, Some(dec!(10.2)));
        assert_eq!(w.avg_hr, Some(155));
        assert_eq!(w.load_score, Some(dec!(81.9)));
    }

    #[test]
    fn test_workout_range_is_closed_and_ordered() {
        let (db, user_id) = seeded_store();
        let dates = [
            NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        ];
        for date in dates {
            db.insert_workout(&NewWorkout {
                user_id,
                date,
                workout_type: WorkoutType::Easy,
                duration_minutes: dec!(30),
                distance_km: None,
                avg_hr: None,
                load_score: Some(dec!(30)),
            })
            .unwrap();
        }

        let start = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let workouts = db.workouts_in_range(user_id, start, end).unwrap();
        assert_eq!(workouts.len(), 2);
        assert_eq!(workouts[0].date, start);
        assert_eq!(workouts[1].date, end);
    }

    #[test]
    fn test_recent_sleep_is_newest_first_and_capped() {
        let (db, user_id) = seeded_store();
        for day in 1..=5 {
            db.insert_sleep(&NewSleepEntry {
                user_id,
                date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
                hours: dec!(7.5),
                quality_score: 7,
            })
            .unwrap();
        }

        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
        let entries = db.recent_sleep(user_id, start, end, 3).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].date, NaiveDate::from_ymd_opt(2025, 3, 5).unwrap());
        assert_eq!(entries[2].date, NaiveDate::from_ymd_opt(2025, 3, 3).unwrap());
    }

    #[test]
    fn test_recommendations_are_append_only() {
        let (db, user_id) = seeded_store();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        db.insert_recommendation(user_id, date, r#"{"workout_type":"rest"}"#, None)
            .unwrap();
        db.insert_recommendation(user_id, date, r#"{"workout_type":"easy"}"#, Some("analysis"))
            .unwrap();

        let latest = db.latest_recommendation(user_id).unwrap().unwrap();
        assert_eq!(latest.date, date);
        assert!(latest.recommendation_json.contains("easy"));
        assert_eq!(latest.reasoning_summary.as_deref(), Some("analysis"));
    }

    #[test]
    fn test_open_creates_schema_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("peakform.db");

        let user_id = {
            let db = Database::open(&path).unwrap();
            db.insert_user("Disk Athlete", None, None, None).unwrap()
        };

        // reopening preserves data
        let db = Database::open(&path).unwrap();
        let user = db.get_user(user_id).unwrap();
        assert_eq!(user.name, "Disk Athlete");
    }

    #[test]
    fn test_users_are_isolated() {
        let (db, user_id) = seeded_store();
        let other = db.insert_user("Other", None, None, None).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        db.insert_workout(&NewWorkout {
            user_id,
            date,
            workout_type: WorkoutType::Easy,
            duration_minutes: dec!(30),
            distance_km: None,
            avg_hr: None,
            load_score: Some(dec!(30)),
        })
        .unwrap();

        assert!(db.workouts_in_range(other, date, date).unwrap().is_empty());
    }
}
