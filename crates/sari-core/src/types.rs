//! # Domain Types
//!
//! Core domain types used throughout Sari POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  sale_id (FK)   │       │
//! │  │  sku (business) │   │  payment_status │   │  name_snapshot  │       │
//! │  │  price          │   │  status         │   │  unit_price     │       │
//! │  │  stock          │   │  total_amount   │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Adjustment    │   │    Voucher      │   │   Identity      │       │
//! │  │  signed delta   │   │  percentage /   │   │  user_id + role │       │
//! │  │  loss reasons   │   │  fixed discount │   │  (from auth)    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (sku, voucher code) - human-readable
//!
//! ## Snapshot Pattern
//! Sale line items freeze the product name, sell price, and base price at
//! sale time. Editing a product later must never rewrite sales history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Identity & Roles
// =============================================================================

/// Role attached to an authenticated identity.
///
/// Retraction and stock adjustments require `Admin`; sale creation, edit,
/// and payment are open to any authenticated role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum Role {
    Admin,
    Cashier,
}

/// The identity the (external) auth layer resolves for every request.
///
/// Operations record `user_id` as `cashier_id` / `adjusted_by` and gate
/// privileged actions on `role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    /// Checks whether this identity carries the Admin role.
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A user record, kept only to resolve display names and roles for
/// identities issued by the excluded auth layer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on the invoice.
    pub name: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Category reference (category CRUD lives outside this workspace).
    pub category_id: Option<String>,

    /// Cost price. Basis for loss expenses on stock adjustments.
    pub base_price: Money,

    /// Sell price.
    pub price: Money,

    /// Current stock level. Never negative.
    pub stock: i64,

    /// Optional expiry date for perishable goods.
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<DateTime<Utc>>,

    /// Free-form supplier name.
    pub supplier: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Customers & Therapists
// =============================================================================

/// A customer record (CRUD lives outside this workspace; sales only need
/// existence checks and display names).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A therapist who can be credited on a sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Therapist {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Vouchers
// =============================================================================

/// How a voucher's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum VoucherKind {
    /// `value` is a whole-number percent of the subtotal.
    Percentage,
    /// `value` is a fixed amount in minor currency units.
    Fixed,
}

/// A discount voucher.
///
/// Sales store only a denormalized `voucher_code` string, never a live
/// reference: deleting or deactivating a voucher must not alter history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Voucher {
    pub id: String,

    /// Business identifier, unique, normalized to uppercase.
    pub code: String,

    pub description: String,

    pub kind: VoucherKind,

    /// Percent for `Percentage` vouchers, minor units for `Fixed` ones.
    pub value: i64,

    pub is_active: bool,

    pub created_by: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Status & Payment
// =============================================================================

/// How a sale was (or will be) paid.
///
/// `Pending` is the placeholder for unpaid tabs; it becomes a concrete
/// method when the sale is marked paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentMethod {
    Cash,
    Card,
    Digital,
    Pending,
}

/// Whether a sale has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Unpaid
    }
}

/// Lifecycle status of a sale.
///
/// A sale is born `Completed` (even when unpaid - the stock is already
/// gone from the shelf). `Retracted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum SaleStatus {
    Completed,
    Retracted,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Completed
    }
}

// =============================================================================
// Sale
// =============================================================================

/// An additional fee attached to a sale (e.g. service charge).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdditionalFee {
    pub amount: Money,
    pub description: Option<String>,
    pub include_on_invoice: bool,
}

/// A transportation/delivery fee attached to a sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransportationFee {
    pub amount: Money,
    pub include_on_invoice: bool,
}

/// A sale transaction header. Line items live in [`SaleItem`].
///
/// The pricing breakdown (subtotal, discount, fees, total) is persisted in
/// full so `total_amount` can always be re-derived for audit:
/// `total = max(0, subtotal - discount) + additional_fee + transportation_fee`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,

    /// The cashier who rang the sale up.
    pub cashier_id: String,

    /// Optional customer (walk-ins have none).
    pub customer_id: Option<String>,

    /// Optional therapist credited with the service.
    pub therapist_id: Option<String>,

    /// Whether the therapist name is printed on the invoice.
    pub include_therapist_on_invoice: bool,

    pub subtotal: Money,

    pub discount: Money,

    /// Denormalized code of the voucher that produced `discount`.
    pub voucher_code: Option<String>,

    pub additional_fee: AdditionalFee,

    pub transportation_fee: TransportationFee,

    pub total_amount: Money,

    pub payment_method: PaymentMethod,

    pub payment_status: PaymentStatus,

    pub status: SaleStatus,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Checks whether this sale can still be edited (unpaid, not retracted).
    #[inline]
    pub fn is_editable(&self) -> bool {
        self.payment_status == PaymentStatus::Unpaid && self.status == SaleStatus::Completed
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Cost price at time of sale (frozen).
    pub base_price: Money,
    /// Sell price at time of sale (frozen).
    pub unit_price: Money,
    /// Quantity sold. Always >= 1.
    pub quantity: i64,
    /// Optional cashier note for this line.
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the line total (unit_price × quantity).
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Stock Adjustments & Expenses
// =============================================================================

/// Why stock was adjusted outside of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum AdjustmentReason {
    Damaged,
    Lost,
    Expired,
    StockCountCorrection,
    InitialStock,
}

impl AdjustmentReason {
    /// Loss-type reasons trigger an automatic expense when stock decreases.
    #[inline]
    pub fn is_loss(&self) -> bool {
        matches!(
            self,
            AdjustmentReason::Damaged | AdjustmentReason::Lost | AdjustmentReason::Expired
        )
    }
}

/// A manual stock adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Adjustment {
    pub id: String,
    pub product_id: String,
    /// Product name at adjustment time (frozen).
    pub product_name: String,
    /// Signed delta applied to stock.
    pub quantity_changed: i64,
    pub reason: AdjustmentReason,
    pub adjusted_by: String,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// An expense record. Loss-type negative adjustments write one
/// automatically, valued at `|quantity_changed| * base_price`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub description: String,
    pub amount: Money,
    pub category: String,
    pub created_by: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
