//! # Stock Ledger
//!
//! The single authority over `products.stock`.
//!
//! ## The Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              stock >= 0, for every product, at all times                │
//! │                                                                         │
//! │  Five operations contend for the same stock rows:                      │
//! │                                                                         │
//! │   createSale ────► decrement(qty)        (paid OR unpaid - a tab       │
//! │                                           still takes goods off the    │
//! │                                           shelf)                        │
//! │   updateSale ────► apply_delta(old-new)  (signed reconciliation)       │
//! │   retractSale ───► increment(qty)        (restoration)                 │
//! │   adjustment ────► apply_delta(signed)   (damage, loss, correction)    │
//! │   seeding ───────► increment(qty)                                      │
//! │                                                                         │
//! │  ALL of them go through this module, inside the caller's transaction.  │
//! │  Nothing else writes products.stock.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conditional Updates
//!
//! The non-negative check is enforced by the UPDATE itself:
//!
//! ```sql
//! UPDATE products SET stock = stock - ?2 WHERE id = ?1 AND stock >= ?2
//! ```
//!
//! Zero rows affected means the guard failed. A separate read supplies the
//! product name and available quantity for the error message, but the
//! conditional update is the authoritative check - a read-modify-write in
//! Rust could race between two requests; the guarded UPDATE cannot.
//!
//! ## Transactions
//!
//! Every function takes `&mut SqliteConnection` rather than a pool so the
//! caller decides the transaction boundary. Decrementing five products for
//! one sale is five ledger calls on ONE transaction: either all five commit
//! or none do.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};
use sari_core::CoreError;

/// Atomic stock mutation primitives.
///
/// Stateless; all functions are associated so call sites read
/// `StockLedger::decrement(&mut tx, ...)`.
pub struct StockLedger;

impl StockLedger {
    /// Decrements stock for a sale line.
    ///
    /// ## Failures
    /// * `ProductNotFound` - no such product row
    /// * `InsufficientStock` - available < requested; the error names the
    ///   product and carries both quantities so the caller can act
    ///
    /// `qty` must be >= 1 (request validation runs before the ledger).
    pub async fn decrement(conn: &mut SqliteConnection, product_id: &str, qty: i64) -> DbResult<()> {
        debug_assert!(qty > 0, "decrement quantity must be positive");

        let (name, available) = fetch_name_and_stock(conn, product_id).await?;

        if available < qty {
            return Err(DbError::Domain(CoreError::InsufficientStock {
                name,
                available,
                requested: qty,
            }));
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(product_id)
        .bind(qty)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            // The guard failed after the read above; report with the
            // freshest numbers we have.
            return Err(DbError::Domain(CoreError::InsufficientStock {
                name,
                available,
                requested: qty,
            }));
        }

        debug!(product_id = %product_id, qty = %qty, "Stock decremented");
        Ok(())
    }

    /// Increments stock (retraction restoration, edit reconciliation).
    ///
    /// No upper bound. Fails only with `ProductNotFound`.
    pub async fn increment(conn: &mut SqliteConnection, product_id: &str, qty: i64) -> DbResult<()> {
        debug_assert!(qty > 0, "increment quantity must be positive");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(product_id)
        .bind(qty)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Domain(CoreError::ProductNotFound(
                product_id.to_string(),
            )));
        }

        debug!(product_id = %product_id, qty = %qty, "Stock incremented");
        Ok(())
    }

    /// Applies a signed stock delta.
    ///
    /// Positive deltas return stock, negative deltas consume more.
    /// A delta of zero is a no-op.
    ///
    /// ## Failures
    /// * `ProductNotFound` - no such product row
    /// * `NegativeStock` - the delta would take stock below zero
    pub async fn apply_delta(
        conn: &mut SqliteConnection,
        product_id: &str,
        delta: i64,
    ) -> DbResult<()> {
        if delta == 0 {
            return Ok(());
        }

        let (name, _stock) = fetch_name_and_stock(conn, product_id).await?;

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + ?2, updated_at = ?3
            WHERE id = ?1 AND stock + ?2 >= 0
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Domain(CoreError::NegativeStock { name }));
        }

        debug!(product_id = %product_id, delta = %delta, "Stock delta applied");
        Ok(())
    }
}

/// Reads `(name, stock)` for error context, failing with `ProductNotFound`
/// when the row is missing.
async fn fetch_name_and_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<(String, i64)> {
    let row: Option<(String, i64)> =
        sqlx::query_as("SELECT name, stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    row.ok_or_else(|| DbError::Domain(CoreError::ProductNotFound(product_id.to_string())))
}

// =============================================================================
// Unit Tests
// =============================================================================
