//! # Voucher Repository
//!
//! Lookup surface of the (excluded) voucher catalog.
//!
//! The sale transaction manager resolves discount terms here at creation
//! time; the sale then stores only the denormalized code string. Codes are
//! stored and compared uppercase.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::error::DbResult;
use sari_core::{Voucher, VoucherKind};

const VOUCHER_COLUMNS: &str =
    "id, code, description, kind, value, is_active, created_by, created_at";

/// Repository for voucher lookups.
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: SqlitePool,
}

impl VoucherRepository {
    /// Creates a new VoucherRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VoucherRepository { pool }
    }

    /// Inserts a voucher (used by seeding and tests).
    ///
    /// The caller is expected to have normalized `code` already; the UNIQUE
    /// index rejects duplicates either way.
    pub async fn insert(&self, voucher: &Voucher) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO vouchers (
                id, code, description, kind, value, is_active, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&voucher.id)
        .bind(&voucher.code)
        .bind(&voucher.description)
        .bind(voucher.kind)
        .bind(voucher.value)
        .bind(voucher.is_active)
        .bind(&voucher.created_by)
        .bind(voucher.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Finds an active voucher by its (already normalized) code.
    pub async fn find_active_by_code(&self, code: &str) -> DbResult<Option<Voucher>> {
        let mut conn = self.pool.acquire().await?;
        fetch_active_voucher(&mut conn, code).await
    }

    /// Lists active vouchers (the POS shows these as checkout choices).
    pub async fn list_active(&self) -> DbResult<Vec<Voucher>> {
        let vouchers = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE is_active = 1 ORDER BY code"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vouchers)
    }
}

/// Fetches an active voucher on the caller's connection (used inside the
/// sale creation transaction).
pub(crate) async fn fetch_active_voucher(
    conn: &mut SqliteConnection,
    code: &str,
) -> DbResult<Option<Voucher>> {
    let voucher = sqlx::query_as::<_, Voucher>(&format!(
        "SELECT {VOUCHER_COLUMNS} FROM vouchers WHERE code = ?1 AND is_active = 1"
    ))
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(voucher)
}

/// Builds a voucher value with a fresh id and timestamp.
pub fn new_voucher(
    code: &str,
    kind: VoucherKind,
    value: i64,
    created_by: &str,
) -> Voucher {
    Voucher {
        id: Uuid::new_v4().to_string(),
        code: code.to_uppercase(),
        description: format!("Voucher {}", code.to_uppercase()),
        kind,
        value,
        is_active: true,
        created_by: created_by.to_string(),
        created_at: Utc::now(),
    }
}
