//! Idempotent schema setup and deduplicating event inserts.
//!
//! Advancements are permanent one-time facts: a (player, title) pair is
//! recorded at most once, ever. Colony events are deduplicated by recency —
//! the most recent row with the same (colony id, action, building name,
//! position) suppresses the insert. That bounds duplicate insertion when a
//! restart rescans previously seen state, at the cost of not distinguishing
//! a genuine repeat of the same action from a re-scan.

use chrono::Utc;
use sqlx::PgPool;

use chronicle_types::{AdvancementEvent, ColonyEvent};

use crate::error::DbError;

/// Result of a deduplicating insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written.
    Inserted,
    /// An equivalent row already existed; nothing was written.
    Duplicate,
}

/// Operations on the `advancements` and `colony_events` tables.
pub struct EventSink<'a> {
    pool: &'a PgPool,
}

impl<'a> EventSink<'a> {
    /// Create a new event sink bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create the event tables when absent.
    ///
    /// Idempotent; run once at startup and again after every reconnect.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a statement fails.
    pub async fn ensure_schema(&self) -> Result<(), DbError> {
        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS advancements (
                id BIGSERIAL PRIMARY KEY,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                player VARCHAR(32) NOT NULL,
                title VARCHAR(128) NOT NULL
            )",
        )
        .execute(self.pool)
        .await?;

        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS colony_events (
                id BIGSERIAL PRIMARY KEY,
                recorded_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                colony_id BIGINT,
                colony_name VARCHAR(128),
                owner VARCHAR(128),
                action VARCHAR(32),
                building_id VARCHAR(128),
                building_name VARCHAR(128),
                block_id VARCHAR(128),
                x INT,
                y INT,
                z INT,
                raw_text TEXT NOT NULL
            )",
        )
        .execute(self.pool)
        .await?;

        tracing::debug!("Event tables ready");
        Ok(())
    }

    /// Record a player advancement, once per (player, title) ever.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the check or insert fails.
    pub async fn record_advancement(
        &self,
        event: &AdvancementEvent,
    ) -> Result<InsertOutcome, DbError> {
        let existing = sqlx::query(
            r"SELECT 1 FROM advancements WHERE player = $1 AND title = $2 LIMIT 1",
        )
        .bind(&event.player)
        .bind(&event.title)
        .fetch_optional(self.pool)
        .await?;

        if existing.is_some() {
            return Ok(InsertOutcome::Duplicate);
        }

        sqlx::query(
            r"INSERT INTO advancements (recorded_at, player, title) VALUES ($1, $2, $3)",
        )
        .bind(Utc::now())
        .bind(&event.player)
        .bind(&event.title)
        .execute(self.pool)
        .await?;

        tracing::info!(
            player = %event.player,
            title = %event.title,
            "Recorded advancement"
        );
        Ok(InsertOutcome::Inserted)
    }

    /// Record a colony event unless the most recent matching row already
    /// covers it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the check or insert fails.
    pub async fn record_colony_event(
        &self,
        event: &ColonyEvent,
    ) -> Result<InsertOutcome, DbError> {
        let action = event.action.to_string();

        let existing = sqlx::query(
            r"SELECT 1 FROM colony_events
              WHERE colony_id = $1 AND action = $2 AND building_name = $3
                AND x = $4 AND y = $5 AND z = $6
              ORDER BY recorded_at DESC
              LIMIT 1",
        )
        .bind(event.colony_id)
        .bind(&action)
        .bind(&event.building_name)
        .bind(event.position.x)
        .bind(event.position.y)
        .bind(event.position.z)
        .fetch_optional(self.pool)
        .await?;

        if existing.is_some() {
            return Ok(InsertOutcome::Duplicate);
        }

        sqlx::query(
            r"INSERT INTO colony_events
              (recorded_at, colony_id, colony_name, owner, action, building_id,
               building_name, block_id, x, y, z, raw_text)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(Utc::now())
        .bind(event.colony_id)
        .bind(event.colony_name.as_deref())
        .bind(event.owner.as_deref())
        .bind(&action)
        .bind(&event.building_id)
        .bind(&event.building_name)
        .bind(&event.block_id)
        .bind(event.position.x)
        .bind(event.position.y)
        .bind(event.position.z)
        .bind(&event.raw_text)
        .execute(self.pool)
        .await?;

        tracing::info!(
            colony_id = event.colony_id,
            action = %action,
            building = %event.building_name,
            position = %event.position,
            owner = event.owner.as_deref().unwrap_or("-"),
            "Recorded colony event"
        );
        Ok(InsertOutcome::Inserted)
    }

    /// Query the most recent colony events for one colony, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn recent_colony_events(
        &self,
        colony_id: i64,
        limit: i64,
    ) -> Result<Vec<ColonyEventRow>, DbError> {
        let rows = sqlx::query_as::<_, ColonyEventRow>(
            r"SELECT id, recorded_at, colony_id, colony_name, owner, action,
                     building_id, building_name, block_id, x, y, z, raw_text
              FROM colony_events
              WHERE colony_id = $1
              ORDER BY recorded_at DESC, id DESC
              LIMIT $2",
        )
        .bind(colony_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}

/// A row from the `colony_events` table.
///
/// Uses runtime types rather than compile-time checked types to avoid
/// requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ColonyEventRow {
    /// Auto-incremented row ID.
    pub id: i64,
    /// When the event was recorded.
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    /// Numeric colony identifier.
    pub colony_id: Option<i64>,
    /// Colony display name, if known at record time.
    pub colony_name: Option<String>,
    /// Colony owner, if known at record time.
    pub owner: Option<String>,
    /// Canonical action text (`constructed`, `level_N`, or free text).
    pub action: Option<String>,
    /// Building class identifier.
    pub building_id: Option<String>,
    /// Human-readable building name.
    pub building_name: Option<String>,
    /// Block identifier.
    pub block_id: Option<String>,
    /// Position, east-west.
    pub x: Option<i32>,
    /// Position, vertical.
    pub y: Option<i32>,
    /// Position, north-south.
    pub z: Option<i32>,
    /// The raw text the event was derived from.
    pub raw_text: String,
}
