//! # Sale Repository
//!
//! The sale transaction manager: creation, editing, payment, and
//! retraction of sales, each as one atomic unit against the stock ledger.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create_sale() → Sale { status: Completed,                      │
//! │                                payment_status: Paid | Unpaid }         │
//! │     └── stock decremented for EVERY line, paid or unpaid               │
//! │         (an unpaid tab still takes goods off the shelf)                │
//! │                                                                         │
//! │  2. (UNPAID ONLY) EDIT                                                 │
//! │     └── update_sale() → items replaced, stock reconciled by the        │
//! │         delta between old and new quantities                           │
//! │                                                                         │
//! │  3. (UNPAID ONLY) PAY                                                  │
//! │     └── mark_paid() → payment_status: Paid, method set                 │
//! │     └── no stock change                                                │
//! │                                                                         │
//! │  4. (ADMIN) RETRACT                                                    │
//! │     └── retract_sale() → status: Retracted, stock restored in full     │
//! │     └── terminal: no un-retract, no second restoration                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity
//!
//! Every mutation here opens ONE transaction and routes stock writes
//! through [`StockLedger`]. If any line fails (unknown product, not enough
//! stock), the transaction is dropped and rolls back: no partial stock
//! movement, no orphan sale row.
//!
//! ## Authoritative Pricing
//!
//! Totals are recomputed server-side from the catalog's prices and the
//! voucher's terms via [`sari_core::pricing`]; client-submitted totals are
//! never stored. See DESIGN.md for the compatibility note.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use crate::repository::stock::StockLedger;
use crate::repository::voucher::fetch_active_voucher;
use sari_core::pricing::{price_cart, PricedLine, VoucherTerms};
use sari_core::{
    validation, AdditionalFee, CoreError, Identity, Money, PaymentMethod, PaymentStatus, Sale,
    SaleItem, SaleStatus, TransportationFee, ValidationError,
};

// =============================================================================
// Requests & Responses
// =============================================================================

/// One cart line as submitted by the POS client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
}

/// Input for [`SaleRepository::create_sale`].
///
/// Note what is NOT here: subtotal, discount, total. The server derives
/// the breakdown from its own product prices and voucher terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleRequest {
    pub items: Vec<CartLine>,
    #[serde(default)]
    pub voucher_code: Option<String>,
    #[serde(default)]
    pub additional_fee: AdditionalFee,
    #[serde(default)]
    pub transportation_fee: TransportationFee,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    /// Required (and must be concrete) when `payment_status` is `Paid`.
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub therapist_id: Option<String>,
    #[serde(default)]
    pub include_therapist_on_invoice: bool,
}

/// Input for [`SaleRepository::update_sale`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSaleRequest {
    pub items: Vec<CartLine>,
}

/// A sale enriched with resolved display names, the shape the POS screens
/// and the invoice want.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetails {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    pub cashier_name: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub therapist_name: Option<String>,
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Flat row shape of the `sales` table; folded into the domain [`Sale`]
/// (nested fee structs) after fetch.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SaleRow {
    id: String,
    cashier_id: String,
    customer_id: Option<String>,
    therapist_id: Option<String>,
    include_therapist_on_invoice: bool,
    subtotal: Money,
    discount: Money,
    voucher_code: Option<String>,
    additional_fee: Money,
    additional_fee_description: Option<String>,
    additional_fee_on_invoice: bool,
    transportation_fee: Money,
    transportation_fee_on_invoice: bool,
    total_amount: Money,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    status: SaleStatus,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            cashier_id: row.cashier_id,
            customer_id: row.customer_id,
            therapist_id: row.therapist_id,
            include_therapist_on_invoice: row.include_therapist_on_invoice,
            subtotal: row.subtotal,
            discount: row.discount,
            voucher_code: row.voucher_code,
            additional_fee: AdditionalFee {
                amount: row.additional_fee,
                description: row.additional_fee_description,
                include_on_invoice: row.additional_fee_on_invoice,
            },
            transportation_fee: TransportationFee {
                amount: row.transportation_fee,
                include_on_invoice: row.transportation_fee_on_invoice,
            },
            total_amount: row.total_amount,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Column list shared by every sale SELECT.
pub(crate) const SALE_COLUMNS: &str = r#"
    id, cashier_id, customer_id, therapist_id, include_therapist_on_invoice,
    subtotal, discount, voucher_code,
    additional_fee, additional_fee_description, additional_fee_on_invoice,
    transportation_fee, transportation_fee_on_invoice,
    total_amount, payment_method, payment_status, status,
    created_at, updated_at
"#;

const ITEM_COLUMNS: &str = r#"
    id, sale_id, product_id, name_snapshot, base_price, unit_price,
    quantity, note, created_at
"#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for the sale lifecycle.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Create
    // -------------------------------------------------------------------------

    /// Creates a sale and decrements stock for every line item, atomically.
    ///
    /// ## What This Does (one transaction)
    /// 1. Validates the cart shape (non-empty, sane quantities, fees >= 0)
    /// 2. Resolves the customer when one is referenced
    /// 3. Resolves voucher terms when a code is submitted
    /// 4. Snapshots name/price/base price from each product row
    /// 5. Recomputes the pricing breakdown server-side
    /// 6. Inserts the sale + items, decrements the ledger per line
    ///
    /// Stock is decremented whether the sale is Paid or Unpaid: an unpaid
    /// tab still reserves physical inventory.
    ///
    /// ## Failures (all roll back in full)
    /// `EmptyCart`, `ProductNotFound`, `InsufficientStock` (names the
    /// product and available quantity), `CustomerNotFound`,
    /// `VoucherNotFound`, validation errors.
    pub async fn create_sale(
        &self,
        actor: &Identity,
        req: CreateSaleRequest,
    ) -> DbResult<SaleDetails> {
        validate_cart(&req.items)?;
        validation::validate_fee_amount("additional_fee", req.additional_fee.amount)
            .map_err(CoreError::from)?;
        validation::validate_fee_amount("transportation_fee", req.transportation_fee.amount)
            .map_err(CoreError::from)?;

        let payment_status = req.payment_status;
        let payment_method = resolve_payment_method(payment_status, req.payment_method)?;

        // Any early return below this point drops the transaction,
        // rolling back every write.
        let mut tx = self.pool.begin().await?;

        if let Some(customer_id) = &req.customer_id {
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT id FROM customers WHERE id = ?1")
                    .bind(customer_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if exists.is_none() {
                return Err(CoreError::CustomerNotFound(customer_id.clone()).into());
            }
        }

        let (voucher_code, voucher_terms) = match &req.voucher_code {
            Some(code) => {
                let code = validation::normalize_voucher_code(code).map_err(CoreError::from)?;
                let voucher = fetch_active_voucher(&mut tx, &code)
                    .await?
                    .ok_or_else(|| CoreError::VoucherNotFound(code.clone()))?;
                (Some(code), Some(VoucherTerms::from(&voucher)))
            }
            None => (None, None),
        };

        let sale_id = generate_sale_id();
        let now = Utc::now();

        // Snapshot pattern: freeze name/price/base price per line so later
        // product edits never rewrite this sale.
        let mut items = Vec::with_capacity(req.items.len());
        for line in &req.items {
            let product = fetch_product(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;

            items.push(SaleItem {
                id: generate_sale_item_id(),
                sale_id: sale_id.clone(),
                product_id: product.id,
                name_snapshot: product.name,
                base_price: product.base_price,
                unit_price: product.price,
                quantity: line.quantity,
                note: line.note.clone(),
                created_at: now,
            });
        }

        let priced: Vec<PricedLine> = items
            .iter()
            .map(|item| PricedLine {
                unit_price: item.unit_price,
                quantity: item.quantity,
            })
            .collect();
        let breakdown = price_cart(
            &priced,
            voucher_terms.as_ref(),
            req.additional_fee.amount,
            req.transportation_fee.amount,
        );

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, cashier_id, customer_id, therapist_id, include_therapist_on_invoice,
                subtotal, discount, voucher_code,
                additional_fee, additional_fee_description, additional_fee_on_invoice,
                transportation_fee, transportation_fee_on_invoice,
                total_amount, payment_method, payment_status, status,
                created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8,
                ?9, ?10, ?11,
                ?12, ?13,
                ?14, ?15, ?16, ?17,
                ?18, ?19
            )
            "#,
        )
        .bind(&sale_id)
        .bind(&actor.user_id)
        .bind(&req.customer_id)
        .bind(&req.therapist_id)
        .bind(req.include_therapist_on_invoice)
        .bind(breakdown.subtotal)
        .bind(breakdown.discount)
        .bind(&voucher_code)
        .bind(req.additional_fee.amount)
        .bind(&req.additional_fee.description)
        .bind(req.additional_fee.include_on_invoice)
        .bind(req.transportation_fee.amount)
        .bind(req.transportation_fee.include_on_invoice)
        .bind(breakdown.total_amount)
        .bind(payment_method)
        .bind(payment_status)
        .bind(SaleStatus::Completed)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            insert_item(&mut tx, item).await?;

            // Decrease stock for all orders, paid or unpaid
            StockLedger::decrement(&mut tx, &item.product_id, item.quantity).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            total = %breakdown.total_amount,
            items = items.len(),
            payment_status = ?payment_status,
            "Sale created"
        );

        self.get_details(&sale_id).await
    }

    // -------------------------------------------------------------------------
    // Update (unpaid orders only)
    // -------------------------------------------------------------------------

    /// Replaces an unpaid sale's line items, reconciling stock by delta.
    ///
    /// ## Reconciliation
    /// For the union of product ids across old and new item sets:
    /// `delta = old_qty - new_qty`. Positive deltas return stock, negative
    /// deltas consume more and must still respect the non-negative
    /// invariant - raising a quantity beyond `stock + old_qty` fails the
    /// whole edit.
    ///
    /// Retained products keep their original snapshots; products new to
    /// the sale are snapshotted at current catalog data. Subtotal and
    /// total are recomputed; the discount and fees are unchanged.
    pub async fn update_sale(
        &self,
        _actor: &Identity,
        sale_id: &str,
        req: UpdateSaleRequest,
    ) -> DbResult<SaleDetails> {
        validate_cart(&req.items)?;

        let mut tx = self.pool.begin().await?;

        let sale = fetch_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        if sale.status == SaleStatus::Retracted {
            return Err(CoreError::AlreadyRetracted(sale_id.to_string()).into());
        }
        if sale.payment_status == PaymentStatus::Paid {
            return Err(CoreError::CannotEditPaidSale(sale_id.to_string()).into());
        }

        let old_items = fetch_items(&mut tx, sale_id).await?;

        let old_quantities = quantities_by_product(old_items.iter().map(|i| (&i.product_id, i.quantity)));
        let new_quantities =
            quantities_by_product(req.items.iter().map(|l| (&l.product_id, l.quantity)));

        let product_ids: BTreeSet<&String> =
            old_quantities.keys().chain(new_quantities.keys()).collect();

        for product_id in product_ids {
            let old_qty = old_quantities.get(product_id).copied().unwrap_or(0);
            let new_qty = new_quantities.get(product_id).copied().unwrap_or(0);
            let delta = old_qty - new_qty;

            StockLedger::apply_delta(&mut tx, product_id, delta).await?;
        }

        // Rebuild items: keep frozen snapshots for retained products,
        // snapshot current catalog data for newly added ones.
        let now = Utc::now();
        let snapshots: BTreeMap<&String, &SaleItem> =
            old_items.iter().map(|i| (&i.product_id, i)).collect();

        let mut items = Vec::with_capacity(req.items.len());
        for line in &req.items {
            let item = match snapshots.get(&line.product_id) {
                Some(prev) => SaleItem {
                    id: generate_sale_item_id(),
                    sale_id: sale_id.to_string(),
                    product_id: prev.product_id.clone(),
                    name_snapshot: prev.name_snapshot.clone(),
                    base_price: prev.base_price,
                    unit_price: prev.unit_price,
                    quantity: line.quantity,
                    note: line.note.clone(),
                    created_at: now,
                },
                None => {
                    let product = fetch_product(&mut tx, &line.product_id)
                        .await?
                        .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
                    SaleItem {
                        id: generate_sale_item_id(),
                        sale_id: sale_id.to_string(),
                        product_id: product.id,
                        name_snapshot: product.name,
                        base_price: product.base_price,
                        unit_price: product.price,
                        quantity: line.quantity,
                        note: line.note.clone(),
                        created_at: now,
                    }
                }
            };
            items.push(item);
        }

        let subtotal: Money = items.iter().map(SaleItem::line_total).sum();
        let total_amount = subtotal.saturating_sub_floor_zero(sale.discount)
            + sale.additional_fee.amount
            + sale.transportation_fee.amount;

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;
        for item in &items {
            insert_item(&mut tx, item).await?;
        }

        sqlx::query(
            r#"
            UPDATE sales
            SET subtotal = ?2, total_amount = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(sale_id)
        .bind(subtotal)
        .bind(total_amount)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(sale_id = %sale_id, total = %total_amount, items = items.len(), "Sale updated");

        self.get_details(sale_id).await
    }

    // -------------------------------------------------------------------------
    // Pay
    // -------------------------------------------------------------------------

    /// Marks an unpaid sale as paid with a concrete payment method.
    ///
    /// No stock mutation: the inventory already left the shelf at creation.
    pub async fn mark_paid(
        &self,
        _actor: &Identity,
        sale_id: &str,
        payment_method: PaymentMethod,
    ) -> DbResult<Sale> {
        if payment_method == PaymentMethod::Pending {
            return Err(CoreError::Validation(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: "a concrete method is required to pay a sale".to_string(),
            })
            .into());
        }

        let sale = self
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        if sale.status == SaleStatus::Retracted {
            return Err(CoreError::AlreadyRetracted(sale_id.to_string()).into());
        }
        if sale.payment_status == PaymentStatus::Paid {
            return Err(CoreError::AlreadyPaid(sale_id.to_string()).into());
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET payment_status = ?2, payment_method = ?3, updated_at = ?4
            WHERE id = ?1 AND payment_status = ?5
            "#,
        )
        .bind(sale_id)
        .bind(PaymentStatus::Paid)
        .bind(payment_method)
        .bind(now)
        .bind(PaymentStatus::Unpaid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Lost a race with a concurrent payment
            return Err(CoreError::AlreadyPaid(sale_id.to_string()).into());
        }

        info!(sale_id = %sale_id, method = ?payment_method, "Sale marked paid");

        self.get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))
    }

    // -------------------------------------------------------------------------
    // Retract
    // -------------------------------------------------------------------------

    /// Retracts a completed sale, restoring stock for every line item.
    ///
    /// Admin only. Terminal: there is no un-retract, and the conditional
    /// status flip guarantees stock is never restored twice.
    pub async fn retract_sale(&self, actor: &Identity, sale_id: &str) -> DbResult<SaleDetails> {
        if !actor.is_admin() {
            return Err(CoreError::admin_required("retract a sale").into());
        }

        let mut tx = self.pool.begin().await?;

        let sale = fetch_sale(&mut tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;

        if sale.status == SaleStatus::Retracted {
            return Err(CoreError::AlreadyRetracted(sale_id.to_string()).into());
        }

        // Restore stock for all retracted items
        let items = fetch_items(&mut tx, sale_id).await?;
        for item in &items {
            StockLedger::increment(&mut tx, &item.product_id, item.quantity).await?;
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET status = ?2, updated_at = ?3
            WHERE id = ?1 AND status = ?4
            "#,
        )
        .bind(sale_id)
        .bind(SaleStatus::Retracted)
        .bind(now)
        .bind(SaleStatus::Completed)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Lost a race with a concurrent retraction; rolling back also
            // undoes the increments above, so stock is not restored twice.
            return Err(CoreError::AlreadyRetracted(sale_id.to_string()).into());
        }

        tx.commit().await?;

        info!(sale_id = %sale_id, items = items.len(), "Sale retracted, stock restored");

        self.get_details(sale_id).await
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Gets a sale header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// Gets the line items of a sale, oldest first.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_items(&mut conn, sale_id).await
    }

    /// Gets a sale with items and resolved display names.
    pub async fn get_details(&self, sale_id: &str) -> DbResult<SaleDetails> {
        let sale = self
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(sale_id.to_string()))?;
        let items = self.get_items(sale_id).await?;

        let cashier_name: Option<String> =
            sqlx::query_scalar("SELECT username FROM users WHERE id = ?1")
                .bind(&sale.cashier_id)
                .fetch_optional(&self.pool)
                .await?;

        let customer: Option<(String, Option<String>)> = match &sale.customer_id {
            Some(customer_id) => {
                sqlx::query_as("SELECT name, phone FROM customers WHERE id = ?1")
                    .bind(customer_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };
        let (customer_name, customer_phone) = match customer {
            Some((name, phone)) => (Some(name), phone),
            None => (None, None),
        };

        let therapist_name: Option<String> = match &sale.therapist_id {
            Some(therapist_id) => {
                sqlx::query_scalar("SELECT name FROM therapists WHERE id = ?1")
                    .bind(therapist_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };

        Ok(SaleDetails {
            sale,
            items,
            cashier_name,
            customer_name,
            customer_phone,
            therapist_name,
        })
    }

    /// Lists sales, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Sale::from).collect())
    }

    /// Counts sales (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Shared Helpers
// =============================================================================

/// Cart shape validation shared by create and update.
fn validate_cart(items: &[CartLine]) -> DbResult<()> {
    if items.is_empty() {
        return Err(CoreError::EmptyCart.into());
    }
    validation::validate_cart_size(items.len()).map_err(CoreError::from)?;
    for line in items {
        validation::validate_quantity(line.quantity).map_err(CoreError::from)?;
    }
    Ok(())
}

/// Picks the stored payment method: the submitted method for paid sales
/// (which must be concrete), `Pending` for unpaid ones.
fn resolve_payment_method(
    status: PaymentStatus,
    submitted: Option<PaymentMethod>,
) -> DbResult<PaymentMethod> {
    match status {
        PaymentStatus::Unpaid => Ok(PaymentMethod::Pending),
        PaymentStatus::Paid => match submitted {
            Some(PaymentMethod::Pending) | None => {
                Err(CoreError::Validation(ValidationError::InvalidFormat {
                    field: "payment_method".to_string(),
                    reason: "a concrete method is required for a paid sale".to_string(),
                })
                .into())
            }
            Some(method) => Ok(method),
        },
    }
}

/// Sums quantities per product id (duplicate cart lines for the same
/// product reconcile as their sum).
fn quantities_by_product<'a>(
    entries: impl Iterator<Item = (&'a String, i64)>,
) -> BTreeMap<String, i64> {
    let mut map = BTreeMap::new();
    for (product_id, quantity) in entries {
        *map.entry(product_id.clone()).or_insert(0) += quantity;
    }
    map
}

/// Fetches a sale header on the caller's connection.
pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let row = sqlx::query_as::<_, SaleRow>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Sale::from))
}

/// Fetches a sale's items on the caller's connection.
pub(crate) async fn fetch_items(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as::<_, SaleItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, id"
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

/// Inserts one line item on the caller's connection.
async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Adding sale item");

    sqlx::query(
        r#"
        INSERT INTO sale_items (
            id, sale_id, product_id, name_snapshot, base_price, unit_price,
            quantity, note, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&item.id)
    .bind(&item.sale_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.base_price)
    .bind(item.unit_price)
    .bind(item.quantity)
    .bind(&item.note)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use sari_core::pricing::verify_sale;
    use sari_core::VoucherKind;

    /// A one-line unpaid cash-register request.
    fn simple_request(product_id: &str, quantity: i64) -> CreateSaleRequest {
        CreateSaleRequest {
            items: vec![CartLine {
                product_id: product_id.to_string(),
                quantity,
                note: None,
            }],
            voucher_code: None,
            additional_fee: AdditionalFee::default(),
            transportation_fee: TransportationFee::default(),
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            customer_id: None,
            therapist_id: None,
            include_therapist_on_invoice: false,
        }
    }

    #[tokio::test]
    async fn test_create_unpaid_sale_decrements_stock_and_pends_payment() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let details = db
            .sales()
            .create_sale(&cashier, simple_request(&product.id, 3))
            .await
            .unwrap();

        assert_eq!(details.sale.payment_status, PaymentStatus::Unpaid);
        assert_eq!(details.sale.payment_method, PaymentMethod::Pending);
        assert_eq!(details.sale.status, SaleStatus::Completed);
        assert_eq!(details.sale.total_amount.amount(), 150_000);
        assert_eq!(details.items.len(), 1);
        assert!(details.cashier_name.is_some());

        let fresh = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fresh.stock, 7);
    }

    #[tokio::test]
    async fn test_create_sale_insufficient_stock_rolls_back_everything() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 7).await;

        let err = db
            .sales()
            .create_sale(&cashier, simple_request(&product.id, 10))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 7,
                requested: 10,
                ..
            })
        ));

        let fresh = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fresh.stock, 7);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_sale_multi_line_failure_leaves_no_partial_decrement() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let a = testutil::seed_product(&db, "Oil A", "A-1", 10_000, 5_000, 10).await;
        let b = testutil::seed_product(&db, "Oil B", "B-1", 10_000, 5_000, 1).await;

        let mut req = simple_request(&a.id, 5);
        req.items.push(CartLine {
            product_id: b.id.clone(),
            quantity: 2,
            note: None,
        });

        db.sales().create_sale(&cashier, req).await.unwrap_err();

        assert_eq!(db.products().get_by_id(&a.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(db.products().get_by_id(&b.id).await.unwrap().unwrap().stock, 1);
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_sale_rejects_empty_cart() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;

        let mut req = simple_request("whatever", 1);
        req.items.clear();

        let err = db.sales().create_sale(&cashier, req).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyCart)));
    }

    #[tokio::test]
    async fn test_create_sale_rejects_unknown_product() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;

        let err = db
            .sales()
            .create_sale(&cashier, simple_request("missing-product", 1))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::ProductNotFound(_))
        ));
        assert_eq!(db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_sale_rejects_unknown_customer_without_stock_movement() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let mut req = simple_request(&product.id, 2);
        req.customer_id = Some("nobody".to_string());

        let err = db.sales().create_sale(&cashier, req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CustomerNotFound(_))
        ));

        let fresh = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fresh.stock, 10);
    }

    #[tokio::test]
    async fn test_create_sale_with_voucher_and_fee_prices_server_side() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product =
            testutil::seed_product(&db, "Spa Package", "SPA-01", 100_000, 60_000, 5).await;
        testutil::seed_voucher(&db, &cashier, "SPA10", VoucherKind::Percentage, 10).await;

        let mut req = simple_request(&product.id, 1);
        // Codes are normalized server-side
        req.voucher_code = Some(" spa10 ".to_string());
        req.additional_fee = AdditionalFee {
            amount: Money::new(5_000),
            description: Some("Service charge".to_string()),
            include_on_invoice: true,
        };

        let details = db.sales().create_sale(&cashier, req).await.unwrap();

        assert_eq!(details.sale.subtotal.amount(), 100_000);
        assert_eq!(details.sale.discount.amount(), 10_000);
        assert_eq!(details.sale.total_amount.amount(), 95_000);
        assert_eq!(details.sale.voucher_code.as_deref(), Some("SPA10"));
        assert!(verify_sale(&details.sale, &details.items));
    }

    #[tokio::test]
    async fn test_create_sale_rejects_unknown_voucher_code() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Spa Package", "SPA-01", 100_000, 60_000, 5).await;

        let mut req = simple_request(&product.id, 1);
        req.voucher_code = Some("NOPE".to_string());

        let err = db.sales().create_sale(&cashier, req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::VoucherNotFound(_))
        ));

        let fresh = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fresh.stock, 5);
    }

    #[tokio::test]
    async fn test_create_paid_sale_stores_submitted_method_and_still_decrements() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let mut req = simple_request(&product.id, 2);
        req.payment_status = PaymentStatus::Paid;
        req.payment_method = Some(PaymentMethod::Card);

        let details = db.sales().create_sale(&cashier, req).await.unwrap();
        assert_eq!(details.sale.payment_status, PaymentStatus::Paid);
        assert_eq!(details.sale.payment_method, PaymentMethod::Card);

        let fresh = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fresh.stock, 8);
    }

    #[tokio::test]
    async fn test_create_paid_sale_requires_concrete_method() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let mut req = simple_request(&product.id, 1);
        req.payment_status = PaymentStatus::Paid;
        req.payment_method = Some(PaymentMethod::Pending);

        let err = db.sales().create_sale(&cashier, req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_sale_raises_quantity_within_true_available() {
        // Scenario: sale holds 3 of P, shelf shows 7. True available is
        // 7 + 3 = 10, so raising to 5 must succeed and land stock at 5.
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let details = db
            .sales()
            .create_sale(&cashier, simple_request(&product.id, 3))
            .await
            .unwrap();
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().stock, 7);

        let updated = db
            .sales()
            .update_sale(
                &cashier,
                &details.sale.id,
                UpdateSaleRequest {
                    items: vec![CartLine {
                        product_id: product.id.clone(),
                        quantity: 5,
                        note: None,
                    }],
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.items[0].quantity, 5);
        assert_eq!(updated.sale.subtotal.amount(), 250_000);
        assert_eq!(updated.sale.total_amount.amount(), 250_000);
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_update_sale_beyond_available_fails_whole_edit() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let details = db
            .sales()
            .create_sale(&cashier, simple_request(&product.id, 3))
            .await
            .unwrap();

        // True available is 10; asking for 11 must fail and change nothing
        let err = db
            .sales()
            .update_sale(
                &cashier,
                &details.sale.id,
                UpdateSaleRequest {
                    items: vec![CartLine {
                        product_id: product.id.clone(),
                        quantity: 11,
                        note: None,
                    }],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::NegativeStock { .. })
        ));

        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().stock, 7);
        let items = db.sales().get_items(&details.sale.id).await.unwrap();
        assert_eq!(items[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_update_sale_swaps_products_and_reconciles_both_sides() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let a = testutil::seed_product(&db, "Oil A", "A-1", 10_000, 5_000, 10).await;
        let b = testutil::seed_product(&db, "Oil B", "B-1", 20_000, 8_000, 10).await;

        let details = db
            .sales()
            .create_sale(&cashier, simple_request(&a.id, 4))
            .await
            .unwrap();
        assert_eq!(db.products().get_by_id(&a.id).await.unwrap().unwrap().stock, 6);

        // Replace A entirely with B: A's 4 return, B loses 2
        let updated = db
            .sales()
            .update_sale(
                &cashier,
                &details.sale.id,
                UpdateSaleRequest {
                    items: vec![CartLine {
                        product_id: b.id.clone(),
                        quantity: 2,
                        note: None,
                    }],
                },
            )
            .await
            .unwrap();

        assert_eq!(db.products().get_by_id(&a.id).await.unwrap().unwrap().stock, 10);
        assert_eq!(db.products().get_by_id(&b.id).await.unwrap().unwrap().stock, 8);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.items[0].name_snapshot, "Oil B");
        assert_eq!(updated.sale.subtotal.amount(), 40_000);
    }

    #[tokio::test]
    async fn test_update_sale_rejects_paid_sale() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let details = db
            .sales()
            .create_sale(&cashier, simple_request(&product.id, 1))
            .await
            .unwrap();
        db.sales()
            .mark_paid(&cashier, &details.sale.id, PaymentMethod::Cash)
            .await
            .unwrap();

        let err = db
            .sales()
            .update_sale(
                &cashier,
                &details.sale.id,
                UpdateSaleRequest {
                    items: vec![CartLine {
                        product_id: product.id.clone(),
                        quantity: 2,
                        note: None,
                    }],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CannotEditPaidSale(_))
        ));
    }

    #[tokio::test]
    async fn test_mark_paid_transitions_and_rejects_double_pay() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let details = db
            .sales()
            .create_sale(&cashier, simple_request(&product.id, 2))
            .await
            .unwrap();

        let paid = db
            .sales()
            .mark_paid(&cashier, &details.sale.id, PaymentMethod::Digital)
            .await
            .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_method, PaymentMethod::Digital);

        // Paying does not move stock
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().stock, 8);

        let err = db
            .sales()
            .mark_paid(&cashier, &details.sale.id, PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AlreadyPaid(_))));
    }

    #[tokio::test]
    async fn test_mark_paid_rejects_pending_and_unknown_sale() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;

        let err = db
            .sales()
            .mark_paid(&cashier, "missing", PaymentMethod::Pending)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let err = db
            .sales()
            .mark_paid(&cashier, "missing", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SaleNotFound(_))));
    }

    #[tokio::test]
    async fn test_retract_restores_stock_once_and_only_once() {
        let db = testutil::test_db().await;
        let admin = testutil::seed_admin(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let mut req = simple_request(&product.id, 3);
        req.payment_status = PaymentStatus::Paid;
        req.payment_method = Some(PaymentMethod::Cash);
        let details = db.sales().create_sale(&admin, req).await.unwrap();
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().stock, 7);

        let retracted = db.sales().retract_sale(&admin, &details.sale.id).await.unwrap();
        assert_eq!(retracted.sale.status, SaleStatus::Retracted);
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().stock, 10);

        // Second retraction: error, and stock untouched
        let err = db
            .sales()
            .retract_sale(&admin, &details.sale.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyRetracted(_))
        ));
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_retract_requires_admin() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let details = db
            .sales()
            .create_sale(&cashier, simple_request(&product.id, 1))
            .await
            .unwrap();

        let err = db
            .sales()
            .retract_sale(&cashier, &details.sale.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AdminRequired { .. })
        ));
        assert_eq!(db.products().get_by_id(&product.id).await.unwrap().unwrap().stock, 9);
    }

    #[tokio::test]
    async fn test_conservation_create_edit_retract_nets_to_zero() {
        let db = testutil::test_db().await;
        let admin = testutil::seed_admin(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 20).await;

        let details = db
            .sales()
            .create_sale(&admin, simple_request(&product.id, 6))
            .await
            .unwrap();
        db.sales()
            .update_sale(
                &admin,
                &details.sale.id,
                UpdateSaleRequest {
                    items: vec![CartLine {
                        product_id: product.id.clone(),
                        quantity: 9,
                        note: None,
                    }],
                },
            )
            .await
            .unwrap();
        db.sales().retract_sale(&admin, &details.sale.id).await.unwrap();

        // Each step balanced; retraction restores exactly what the sale held
        let fresh = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fresh.stock, 20);
    }

    #[tokio::test]
    async fn test_snapshots_survive_later_product_edits() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Lavender Oil", "OIL-001", 50_000, 30_000, 10).await;

        let details = db
            .sales()
            .create_sale(&cashier, simple_request(&product.id, 1))
            .await
            .unwrap();

        // Reprice and rename the product after the fact
        sqlx::query("UPDATE products SET name = ?1, price = ?2 WHERE id = ?3")
            .bind("Lavender Oil Deluxe")
            .bind(99_000_i64)
            .bind(&product.id)
            .execute(db.pool())
            .await
            .unwrap();

        let items = db.sales().get_items(&details.sale.id).await.unwrap();
        assert_eq!(items[0].name_snapshot, "Lavender Oil");
        assert_eq!(items[0].unit_price.amount(), 50_000);
    }

    #[tokio::test]
    async fn test_details_resolve_customer_and_therapist_names() {
        let db = testutil::test_db().await;
        let cashier = testutil::seed_cashier(&db).await;
        let product = testutil::seed_product(&db, "Spa Package", "SPA-01", 100_000, 60_000, 5).await;
        let customer = testutil::seed_customer(&db, "Ibu Ratna").await;
        let therapist = testutil::seed_therapist(&db, "Dewi").await;

        let mut req = simple_request(&product.id, 1);
        req.customer_id = Some(customer.id.clone());
        req.therapist_id = Some(therapist.id.clone());
        req.include_therapist_on_invoice = true;

        let details = db.sales().create_sale(&cashier, req).await.unwrap();
        assert_eq!(details.customer_name.as_deref(), Some("Ibu Ratna"));
        assert_eq!(details.therapist_name.as_deref(), Some("Dewi"));
        assert!(details.sale.include_therapist_on_invoice);
    }
}
