//! # sari-db: Database Layer for Sari POS
//!
//! This crate provides database access for the Sari POS system.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sari POS Data Flow                               │
//! │                                                                         │
//! │  Web handler (create sale / retract sale / reports)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     sari-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (sale.rs,    │    │  (embedded)  │  │   │
//! │  │   │               │    │   stock.rs,   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│   reports.rs) │    │ 001_init.sql │  │   │
//! │  │   │ Management    │    │               │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (WAL mode, foreign keys on)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transaction Discipline
//!
//! `Product.stock` is the single shared mutable resource of the system,
//! contended by sale creation, sale editing, retraction, and manual
//! adjustment. Every one of those operations:
//!
//! 1. opens ONE transaction,
//! 2. routes every stock mutation through [`repository::stock::StockLedger`],
//! 3. commits only if every write succeeded.
//!
//! No code path reads stock and writes it back outside a transaction; the
//! ledger's conditional updates serialize conflicting writes on the same
//! product row.
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (sale, stock, reports, ...)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sari_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/sari.db")).await?;
//!
//! let details = db.sales().create_sale(&actor, request).await?;
//! let top = db.reports().top_products(5).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testutil;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::adjustment::AdjustmentRepository;
pub use repository::customer::CustomerRepository;
pub use repository::product::ProductRepository;
pub use repository::reports::ReportRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockLedger;
pub use repository::therapist::TherapistRepository;
pub use repository::user::UserRepository;
pub use repository::voucher::VoucherRepository;
