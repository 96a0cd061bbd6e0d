//! # Test Utilities
//!
//! Shared seeding helpers for repository tests. Every test gets its own
//! in-memory database with migrations applied; foreign keys are on, so
//! helpers insert the rows the constraints expect (users for cashiers,
//! therapists for sales, ...).

use uuid::Uuid;

use crate::pool::{Database, DbConfig};
use crate::repository::customer::new_customer;
use crate::repository::product::new_product;
use crate::repository::therapist::new_therapist;
use crate::repository::user::new_user;
use crate::repository::voucher::new_voucher;
use sari_core::{Customer, Identity, Product, Role, Therapist, Voucher, VoucherKind};

/// Creates a fresh in-memory database with migrations applied.
pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory())
        .await
        .expect("in-memory database")
}

/// Inserts a product and returns it.
pub(crate) async fn seed_product(
    db: &Database,
    name: &str,
    sku: &str,
    price: i64,
    base_price: i64,
    stock: i64,
) -> Product {
    let product = new_product(name, sku, price, base_price, stock);
    db.products().insert(&product).await.expect("seed product");
    product
}

/// Inserts an Admin user and returns the matching identity.
pub(crate) async fn seed_admin(db: &Database) -> Identity {
    seed_identity(db, Role::Admin).await
}

/// Inserts a Cashier user and returns the matching identity.
pub(crate) async fn seed_cashier(db: &Database) -> Identity {
    seed_identity(db, Role::Cashier).await
}

async fn seed_identity(db: &Database, role: Role) -> Identity {
    // Unique username per call so a test can seed several identities
    let suffix = Uuid::new_v4().simple().to_string();
    let username = match role {
        Role::Admin => format!("admin-{}", &suffix[..8]),
        Role::Cashier => format!("cashier-{}", &suffix[..8]),
    };
    let user = new_user(&username, role);
    db.users().insert(&user).await.expect("seed user");

    Identity {
        user_id: user.id,
        role,
    }
}

/// Inserts a customer and returns it.
pub(crate) async fn seed_customer(db: &Database, name: &str) -> Customer {
    let customer = new_customer(name, Some("0812-0000-0000"));
    db.customers().insert(&customer).await.expect("seed customer");
    customer
}

/// Inserts an active therapist and returns it.
pub(crate) async fn seed_therapist(db: &Database, name: &str) -> Therapist {
    let therapist = new_therapist(name);
    db.therapists()
        .insert(&therapist)
        .await
        .expect("seed therapist");
    therapist
}

/// Inserts an active voucher owned by `actor` and returns it.
pub(crate) async fn seed_voucher(
    db: &Database,
    actor: &Identity,
    code: &str,
    kind: VoucherKind,
    value: i64,
) -> Voucher {
    let voucher = new_voucher(code, kind, value, &actor.user_id);
    db.vouchers().insert(&voucher).await.expect("seed voucher");
    voucher
}
