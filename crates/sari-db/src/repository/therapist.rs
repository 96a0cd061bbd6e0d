//! # Therapist Repository
//!
//! Lookup surface of the (excluded) therapist roster. Sales reference a
//! therapist for invoice display and the performance report.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::DbResult;
use sari_core::Therapist;

/// Repository for therapist lookups.
#[derive(Debug, Clone)]
pub struct TherapistRepository {
    pool: SqlitePool,
}

impl TherapistRepository {
    /// Creates a new TherapistRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TherapistRepository { pool }
    }

    /// Inserts a therapist (used by seeding and tests).
    pub async fn insert(&self, therapist: &Therapist) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO therapists (id, name, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&therapist.id)
        .bind(&therapist.name)
        .bind(therapist.is_active)
        .bind(therapist.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a therapist by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Therapist>> {
        let therapist = sqlx::query_as::<_, Therapist>(
            "SELECT id, name, is_active, created_at FROM therapists WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(therapist)
    }

    /// Lists active therapists sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Therapist>> {
        let therapists = sqlx::query_as::<_, Therapist>(
            "SELECT id, name, is_active, created_at FROM therapists WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(therapists)
    }
}

/// Builds an active therapist value with a fresh id and timestamp.
pub fn new_therapist(name: &str) -> Therapist {
    Therapist {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        is_active: true,
        created_at: Utc::now(),
    }
}
