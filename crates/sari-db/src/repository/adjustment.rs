//! # Adjustment Repository
//!
//! Manual stock adjustments: damage, loss, expiry, count corrections, and
//! initial stock entry.
//!
//! ## Side Effect: Loss Expenses
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  createAdjustment(product, -3, Damaged)          (one transaction)      │
//! │       │                                                                 │
//! │       ├── StockLedger::apply_delta(product, -3)   stock check           │
//! │       │                                                                 │
//! │       ├── INSERT adjustments (name snapshot, signed delta, reason)      │
//! │       │                                                                 │
//! │       └── reason is loss-type AND delta < 0?                            │
//! │               └── INSERT expenses                                       │
//! │                   amount = |delta| * base_price, category "Stock Loss"  │
//! │                                                                         │
//! │  A positive delta or a non-loss reason writes no expense.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::product::fetch_product;
use crate::repository::stock::StockLedger;
use sari_core::{validation, Adjustment, AdjustmentReason, CoreError, Expense, Identity};
use serde::{Deserialize, Serialize};

/// Expense category used for automatic loss write-offs.
const STOCK_LOSS_CATEGORY: &str = "Stock Loss";

/// Input for [`AdjustmentRepository::create`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdjustmentRequest {
    pub product_id: String,
    /// Signed delta applied to stock.
    pub quantity_changed: i64,
    pub reason: AdjustmentReason,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Repository for stock adjustments and their expense side effects.
#[derive(Debug, Clone)]
pub struct AdjustmentRepository {
    pool: SqlitePool,
}

impl AdjustmentRepository {
    /// Creates a new AdjustmentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AdjustmentRepository { pool }
    }

    /// Applies a manual stock adjustment. Admin only.
    ///
    /// ## What This Does (one transaction)
    /// 1. Resolves the product (`ProductNotFound`)
    /// 2. Applies the signed delta through the stock ledger
    ///    (`NegativeStock` when it would underflow)
    /// 3. Inserts the adjustment with a product-name snapshot
    /// 4. For loss-type reasons with a negative delta, inserts an expense
    ///    valued at `|quantity_changed| * base_price`
    pub async fn create(
        &self,
        actor: &Identity,
        req: CreateAdjustmentRequest,
    ) -> DbResult<Adjustment> {
        if !actor.is_admin() {
            return Err(CoreError::admin_required("adjust stock").into());
        }
        validation::validate_adjustment_delta(req.quantity_changed).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let product = fetch_product(&mut tx, &req.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(req.product_id.clone()))?;

        StockLedger::apply_delta(&mut tx, &product.id, req.quantity_changed).await?;

        let now = Utc::now();
        let adjustment = Adjustment {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity_changed: req.quantity_changed,
            reason: req.reason,
            adjusted_by: actor.user_id.clone(),
            notes: req.notes,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO adjustments (
                id, product_id, product_name, quantity_changed, reason,
                adjusted_by, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&adjustment.id)
        .bind(&adjustment.product_id)
        .bind(&adjustment.product_name)
        .bind(adjustment.quantity_changed)
        .bind(adjustment.reason)
        .bind(&adjustment.adjusted_by)
        .bind(&adjustment.notes)
        .bind(adjustment.created_at)
        .execute(&mut *tx)
        .await?;

        // If reason is Damaged, Lost, or Expired, the shrinkage is money
        // out the door - book it as an expense
        if req.reason.is_loss() && req.quantity_changed < 0 {
            let loss_amount = product
                .base_price
                .multiply_quantity(req.quantity_changed.abs());

            sqlx::query(
                r#"
                INSERT INTO expenses (id, description, amount, category, created_by, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(format!(
                "Stock loss for {} due to: {:?}",
                product.name, req.reason
            ))
            .bind(loss_amount)
            .bind(STOCK_LOSS_CATEGORY)
            .bind(&actor.user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            product_id = %adjustment.product_id,
            delta = %adjustment.quantity_changed,
            reason = ?adjustment.reason,
            "Stock adjusted"
        );

        Ok(adjustment)
    }

    /// Lists adjustments, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Adjustment>> {
        let adjustments = sqlx::query_as::<_, Adjustment>(
            r#"
            SELECT id, product_id, product_name, quantity_changed, reason,
                   adjusted_by, notes, created_at
            FROM adjustments
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(adjustments)
    }

    /// Lists expenses, newest first (the accounting page reads these).
    pub async fn list_expenses(&self, limit: u32) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(
            r#"
            SELECT id, description, amount, category, created_by, created_at
            FROM expenses
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
