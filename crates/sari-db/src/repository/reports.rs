//! # Reporting Projector
//!
//! Read-only aggregations over completed sales.
//!
//! ## Projections
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Reporting Projector                                │
//! │                                                                         │
//! │  sales ──┬── top_products(n)         top-N by summed item quantity     │
//! │          ├── all_selling_products()  same, unranked cutoff             │
//! │          ├── todays_sales()          today's completed sales +         │
//! │          │                           revenue over PAID sales only      │
//! │          └── therapist_leaderboard() completed-sale count per          │
//! │                                      therapist, top 10, with names    │
//! │                                                                         │
//! │  Retracted sales are invisible to every projection.                    │
//! │  Pure queries: no mutation, empty results are empty collections.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Local, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::repository::sale::{SaleRow, SALE_COLUMNS};
use sari_core::{Money, Sale};

/// Aggregated sales volume of one product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductSales {
    pub product_id: String,
    pub name: String,
    pub total_quantity: i64,
}

/// Completed-sale count for one therapist.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TherapistPerformance {
    pub therapist_id: String,
    pub name: String,
    pub transaction_count: i64,
}

/// One day's (or window's) completed sales plus revenue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesWindowReport {
    pub sales: Vec<Sale>,
    /// Sum of `total_amount` over PAID sales in the window.
    /// Unpaid tabs appear in `sales` but are not revenue yet.
    pub total_revenue: Money,
}

/// Repository for read-only sales reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Product rankings
    // -------------------------------------------------------------------------

    /// Top-N products by summed quantity across all completed sales.
    ///
    /// Deterministic ordering: quantity descending, then name, so repeated
    /// reads with no intervening writes return identical results.
    pub async fn top_products(&self, limit: u32) -> DbResult<Vec<ProductSales>> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT i.product_id AS product_id,
                   i.name_snapshot AS name,
                   SUM(i.quantity) AS total_quantity
            FROM sale_items i
            INNER JOIN sales s ON s.id = i.sale_id
            WHERE s.status = 'Completed'
            GROUP BY i.product_id
            ORDER BY total_quantity DESC, name ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every selling product, ranked but without a cutoff.
    pub async fn all_selling_products(&self) -> DbResult<Vec<ProductSales>> {
        let rows = sqlx::query_as::<_, ProductSales>(
            r#"
            SELECT i.product_id AS product_id,
                   i.name_snapshot AS name,
                   SUM(i.quantity) AS total_quantity
            FROM sale_items i
            INNER JOIN sales s ON s.id = i.sale_id
            WHERE s.status = 'Completed'
            GROUP BY i.product_id
            ORDER BY total_quantity DESC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Daily sales & revenue
    // -------------------------------------------------------------------------

    /// Completed sales within [start, end), newest first, plus revenue
    /// summed over PAID sales only.
    pub async fn sales_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<SalesWindowReport> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE status = 'Completed'
              AND created_at >= ?1
              AND created_at < ?2
            ORDER BY created_at DESC
            "#
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        let sales: Vec<Sale> = rows.into_iter().map(Sale::from).collect();

        let total_revenue: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(total_amount), 0)
            FROM sales
            WHERE status = 'Completed'
              AND payment_status = 'Paid'
              AND created_at >= ?1
              AND created_at < ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(SalesWindowReport {
            sales,
            total_revenue: Money::new(total_revenue),
        })
    }

    /// Today's completed sales (local calendar day) plus today's revenue.
    pub async fn todays_sales(&self) -> DbResult<SalesWindowReport> {
        let now_local = Local::now();
        let start_local = now_local
            .with_time(NaiveTime::MIN)
            .earliest()
            .unwrap_or(now_local);
        let end_local = start_local + Duration::days(1);

        self.sales_between(
            start_local.with_timezone(&Utc),
            end_local.with_timezone(&Utc),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Therapist leaderboard
    // -------------------------------------------------------------------------

    /// Completed-sale count per therapist, top 10, joined with names.
    ///
    /// Pass a window to restrict by `created_at`; `None` ranks all time.
    pub async fn therapist_leaderboard(
        &self,
        window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> DbResult<Vec<TherapistPerformance>> {
        let rows = match window {
            Some((start, end)) => {
                sqlx::query_as::<_, TherapistPerformance>(
                    r#"
                    SELECT s.therapist_id AS therapist_id,
                           t.name AS name,
                           COUNT(*) AS transaction_count
                    FROM sales s
                    INNER JOIN therapists t ON t.id = s.therapist_id
                    WHERE s.status = 'Completed'
                      AND s.therapist_id IS NOT NULL
                      AND s.created_at >= ?1
                      AND s.created_at < ?2
                    GROUP BY s.therapist_id
                    ORDER BY transaction_count DESC, name ASC
                    LIMIT 10
                    "#,
                )
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, TherapistPerformance>(
                    r#"
                    SELECT s.therapist_id AS therapist_id,
                           t.name AS name,
                           COUNT(*) AS transaction_count
                    FROM sales s
                    INNER JOIN therapists t ON t.id = s.therapist_id
                    WHERE s.status = 'Completed'
                      AND s.therapist_id IS NOT NULL
                    GROUP BY s.therapist_id
                    ORDER BY transaction_count DESC, name ASC
                    LIMIT 10
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sale::{CartLine, CreateSaleRequest, UpdateSaleRequest};
    use crate::testutil;
    use sari_core::{
        AdditionalFee, Identity, PaymentMethod, PaymentStatus, TransportationFee,
    };

    async fn sell(
        db: &crate::Database,
        actor: &Identity,
        product_id: &str,
        quantity: i64,
        paid: bool,
    ) -> String {
        let req = CreateSaleRequest {
            items: vec![CartLine {
                product_id: product_id.to_string(),
                quantity,
                note: None,
            }],
            voucher_code: None,
            additional_fee: AdditionalFee::default(),
            transportation_fee: TransportationFee::default(),
            payment_status: if paid {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Unpaid
            },
            payment_method: paid.then_some(PaymentMethod::Cash),
            customer_id: None,
            therapist_id: None,
            include_therapist_on_invoice: false,
        };
        db.sales().create_sale(actor, req).await.unwrap().sale.id
    }

    #[tokio::test]
    async fn test_top_products_ranks_by_total_quantity() {
        let db = testutil::test_db().await;
        let admin = testutil::seed_admin(&db).await;
        let a = testutil::seed_product(&db, "Oil A", "A-1", 10_000, 5_000, 100).await;
        let b = testutil::seed_product(&db, "Oil B", "B-1", 10_000, 5_000, 100).await;
        let c = testutil::seed_product(&db, "Oil C", "C-1", 10_000, 5_000, 100).await;

        sell(&db, &admin, &a.id, 2, true).await;
        sell(&db, &admin, &b.id, 5, false).await;
        sell(&db, &admin, &b.id, 1, true).await;
        sell(&db, &admin, &c.id, 4, true).await;

        let top = db.reports().top_products(2).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Oil B");
        assert_eq!(top[0].total_quantity, 6);
        assert_eq!(top[1].name, "Oil C");

        let all = db.reports().all_selling_products().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].name, "Oil A");
    }

    #[tokio::test]
    async fn test_top_products_is_idempotent_without_writes() {
        let db = testutil::test_db().await;
        let admin = testutil::seed_admin(&db).await;
        let a = testutil::seed_product(&db, "Oil A", "A-1", 10_000, 5_000, 100).await;
        let b = testutil::seed_product(&db, "Oil B", "B-1", 10_000, 5_000, 100).await;
        sell(&db, &admin, &a.id, 3, true).await;
        sell(&db, &admin, &b.id, 3, true).await;

        let first = db.reports().top_products(5).await.unwrap();
        let second = db.reports().top_products(5).await.unwrap();

        let flatten = |rows: &[ProductSales]| {
            rows.iter()
                .map(|r| (r.product_id.clone(), r.total_quantity))
                .collect::<Vec<_>>()
        };
        assert_eq!(flatten(&first), flatten(&second));
    }

    #[tokio::test]
    async fn test_retracted_sales_are_invisible_to_rankings() {
        let db = testutil::test_db().await;
        let admin = testutil::seed_admin(&db).await;
        let a = testutil::seed_product(&db, "Oil A", "A-1", 10_000, 5_000, 100).await;

        let sale_id = sell(&db, &admin, &a.id, 3, true).await;
        assert_eq!(db.reports().all_selling_products().await.unwrap().len(), 1);

        db.sales().retract_sale(&admin, &sale_id).await.unwrap();
        assert!(db.reports().all_selling_products().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_todays_revenue_counts_only_paid_sales() {
        let db = testutil::test_db().await;
        let admin = testutil::seed_admin(&db).await;
        let a = testutil::seed_product(&db, "Oil A", "A-1", 10_000, 5_000, 100).await;

        sell(&db, &admin, &a.id, 2, true).await; // 20_000 paid
        sell(&db, &admin, &a.id, 3, false).await; // 30_000 unpaid tab

        let report = db.reports().todays_sales().await.unwrap();
        assert_eq!(report.sales.len(), 2);
        assert_eq!(report.total_revenue.amount(), 20_000);
    }

    #[tokio::test]
    async fn test_sales_between_empty_window_is_empty_not_error() {
        let db = testutil::test_db().await;
        let start = Utc::now() - Duration::days(30);
        let end = Utc::now() - Duration::days(29);

        let report = db.reports().sales_between(start, end).await.unwrap();
        assert!(report.sales.is_empty());
        assert_eq!(report.total_revenue, Money::zero());
    }

    #[tokio::test]
    async fn test_therapist_leaderboard_counts_and_names() {
        let db = testutil::test_db().await;
        let admin = testutil::seed_admin(&db).await;
        let a = testutil::seed_product(&db, "Spa Package", "SPA-1", 100_000, 50_000, 100).await;
        let dewi = testutil::seed_therapist(&db, "Dewi").await;
        let sari = testutil::seed_therapist(&db, "Sari").await;

        for (therapist_id, count) in [(&dewi.id, 3), (&sari.id, 1)] {
            for _ in 0..count {
                let req = CreateSaleRequest {
                    items: vec![CartLine {
                        product_id: a.id.clone(),
                        quantity: 1,
                        note: None,
                    }],
                    voucher_code: None,
                    additional_fee: AdditionalFee::default(),
                    transportation_fee: TransportationFee::default(),
                    payment_status: PaymentStatus::Paid,
                    payment_method: Some(PaymentMethod::Cash),
                    customer_id: None,
                    therapist_id: Some(therapist_id.to_string()),
                    include_therapist_on_invoice: true,
                };
                db.sales().create_sale(&admin, req).await.unwrap();
            }
        }
        // One sale without a therapist must not appear at all
        sell(&db, &admin, &a.id, 1, true).await;

        let board = db.reports().therapist_leaderboard(None).await.unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board[0].name, "Dewi");
        assert_eq!(board[0].transaction_count, 3);
        assert_eq!(board[1].name, "Sari");

        // Windowed variant sees the same recent data
        let windowed = db
            .reports()
            .therapist_leaderboard(Some((Utc::now() - Duration::hours(1), Utc::now() + Duration::hours(1))))
            .await
            .unwrap();
        assert_eq!(windowed.len(), 2);
    }

    #[tokio::test]
    async fn test_edited_sale_reports_updated_quantities() {
        let db = testutil::test_db().await;
        let admin = testutil::seed_admin(&db).await;
        let a = testutil::seed_product(&db, "Oil A", "A-1", 10_000, 5_000, 100).await;

        let sale_id = sell(&db, &admin, &a.id, 2, false).await;
        db.sales()
            .update_sale(
                &admin,
                &sale_id,
                UpdateSaleRequest {
                    items: vec![CartLine {
                        product_id: a.id.clone(),
                        quantity: 7,
                        note: None,
                    }],
                },
            )
            .await
            .unwrap();

        let top = db.reports().top_products(5).await.unwrap();
        assert_eq!(top[0].total_quantity, 7);
    }
}
