#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nodestat::{NodeRow, RelationEntityDefinition, StatError, StatResult, StorageDriver};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr};

const SCHEMA: &[&str] = &[
    "CREATE TABLE node (nid INTEGER PRIMARY KEY, type TEXT NOT NULL, title TEXT)",
    "CREATE TABLE field_data_field_participant (entity_id INTEGER NOT NULL, delta INTEGER NOT NULL DEFAULT 0, field_participant_target_id INTEGER)",
    "CREATE TABLE field_data_field_event (entity_id INTEGER NOT NULL, delta INTEGER NOT NULL DEFAULT 0, field_event_target_id INTEGER)",
    "CREATE TABLE field_data_field_minutes (entity_id INTEGER NOT NULL, delta INTEGER NOT NULL DEFAULT 0, field_minutes_value INTEGER)",
    "CREATE TABLE field_data_field_hours (entity_id INTEGER NOT NULL, delta INTEGER NOT NULL DEFAULT 0, field_hours_value INTEGER)",
    "CREATE TABLE field_data_field_seconds (entity_id INTEGER NOT NULL, delta INTEGER NOT NULL DEFAULT 0, field_seconds_value INTEGER)",
    "CREATE TABLE field_data_field_distance_in_miles (entity_id INTEGER NOT NULL, delta INTEGER NOT NULL DEFAULT 0, field_distance_in_miles_value REAL)",
    "CREATE TABLE field_data_field_team_statistics (entity_id INTEGER NOT NULL, delta INTEGER NOT NULL DEFAULT 0, field_team_statistics_target_id INTEGER)",
];

const SEED: &[&str] = &[
    "INSERT INTO node (nid, type, title) VALUES (1, 'sports_statistic', 'Morning run')",
    "INSERT INTO node (nid, type, title) VALUES (2, 'sports_statistic', 'Evening ride')",
    "INSERT INTO node (nid, type, title) VALUES (10, 'goalball_team', 'Owls')",
    "INSERT INTO node (nid, type, title) VALUES (11, 'goalball_team', 'Bats')",
    "INSERT INTO node (nid, type, title) VALUES (20, 'goalball_score_board', 'Spring cup')",
    "INSERT INTO node (nid, type, title) VALUES (21, 'goalball_score_board', 'Autumn cup')",
    "INSERT INTO node (nid, type, title) VALUES (30, 'bowling_scores', 'Lane 4')",
    "INSERT INTO field_data_field_participant (entity_id, delta, field_participant_target_id) VALUES (1, 0, 100)",
    "INSERT INTO field_data_field_participant (entity_id, delta, field_participant_target_id) VALUES (2, 0, 101)",
    "INSERT INTO field_data_field_event (entity_id, delta, field_event_target_id) VALUES (1, 0, 200)",
    "INSERT INTO field_data_field_event (entity_id, delta, field_event_target_id) VALUES (2, 0, 200)",
    "INSERT INTO field_data_field_minutes (entity_id, delta, field_minutes_value) VALUES (1, 0, 30)",
    "INSERT INTO field_data_field_minutes (entity_id, delta, field_minutes_value) VALUES (2, 0, 45)",
    "INSERT INTO field_data_field_hours (entity_id, delta, field_hours_value) VALUES (1, 0, 1)",
    "INSERT INTO field_data_field_hours (entity_id, delta, field_hours_value) VALUES (2, 0, 0)",
    "INSERT INTO field_data_field_seconds (entity_id, delta, field_seconds_value) VALUES (1, 0, 15)",
    "INSERT INTO field_data_field_seconds (entity_id, delta, field_seconds_value) VALUES (2, 0, 5)",
    "INSERT INTO field_data_field_distance_in_miles (entity_id, delta, field_distance_in_miles_value) VALUES (1, 0, 6.5)",
    // Spring cup lists the Bats before the Owls
    "INSERT INTO field_data_field_team_statistics (entity_id, delta, field_team_statistics_target_id) VALUES (20, 1, 10)",
    "INSERT INTO field_data_field_team_statistics (entity_id, delta, field_team_statistics_target_id) VALUES (20, 0, 11)",
];

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory SQLite database with the Drupal node and field tables, empty
pub async fn setup_empty_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    for sql in SCHEMA {
        db.execute_unprepared(sql).await?;
    }
    Ok(db)
}

/// Same as [`setup_empty_db`] with the sample site content loaded
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = setup_empty_db().await?;
    for sql in SEED {
        db.execute_unprepared(sql).await?;
    }
    Ok(db)
}

/// Add `count` sports statistics numbered from nid 1000, each with a minutes row
pub async fn seed_bulk_statistics(db: &DatabaseConnection, count: i64) -> Result<(), DbErr> {
    let last = 999 + count;
    db.execute_unprepared(&format!(
        "WITH RECURSIVE seq(n) AS (SELECT 1000 UNION ALL SELECT n + 1 FROM seq WHERE n < {last}) \
         INSERT INTO node (nid, type, title) SELECT n, 'sports_statistic', 'Run ' || n FROM seq"
    ))
    .await?;
    db.execute_unprepared(
        "INSERT INTO field_data_field_minutes (entity_id, delta, field_minutes_value) \
         SELECT nid, 0, nid % 60 FROM node WHERE nid >= 1000",
    )
    .await?;
    Ok(())
}

/// Driver serving prepared rows, counting every fetch
#[derive(Default)]
pub struct MemoryDriver {
    rows: Vec<NodeRow>,
    calls: AtomicUsize,
    fail: bool,
}

impl MemoryDriver {
    pub fn new(rows: Vec<NodeRow>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    async fn fetch(&self, definition: &RelationEntityDefinition) -> StatResult<Vec<NodeRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(StatError::storage(
                "fetch",
                DbErr::Custom("connection reset".to_string()),
            ));
        }
        Ok(self
            .rows
            .iter()
            .filter(|row| row.entity_type == definition.filter.value)
            .filter(|row| {
                definition
                    .ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&row.id))
            })
            .cloned()
            .collect())
    }
}
