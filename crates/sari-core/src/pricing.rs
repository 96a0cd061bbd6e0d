//! # Pricing Module
//!
//! The discount/fee calculator: pure computation of a sale's pricing
//! breakdown from cart contents, voucher terms, and fees.
//!
//! ## Where Pricing Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Pricing Data Flow                                  │
//! │                                                                         │
//! │  Client cart (preview)          Server (authoritative)                  │
//! │       │                              │                                  │
//! │       ▼                              ▼                                  │
//! │  price_cart(...) ◄──── same pure function ────► price_cart(...)        │
//! │       │                              │                                  │
//! │       ▼                              ▼                                  │
//! │  Displayed totals             Persisted on the Sale                    │
//! │                                                                         │
//! │  The server recomputes from ITS product prices and voucher terms;      │
//! │  client-submitted totals are never trusted.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Formula
//! ```text
//! subtotal = Σ unit_price · quantity
//! discount = percentage voucher ? round(subtotal · value / 100) : value
//! total    = max(0, subtotal - discount) + additional_fee + transportation_fee
//! ```
//!
//! Note the asymmetry: a fixed voucher is NOT capped to the subtotal; only
//! the goods portion of the total is floored at zero. Fees are always due.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Sale, SaleItem, Voucher, VoucherKind};

// =============================================================================
// Inputs
// =============================================================================

/// One cart line as the calculator sees it: a price and a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricedLine {
    pub unit_price: Money,
    pub quantity: i64,
}

/// The discount-relevant slice of a voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VoucherTerms {
    pub kind: VoucherKind,
    /// Percent for `Percentage`, minor units for `Fixed`.
    pub value: i64,
}

impl From<&Voucher> for VoucherTerms {
    fn from(voucher: &Voucher) -> Self {
        VoucherTerms {
            kind: voucher.kind,
            value: voucher.value,
        }
    }
}

// =============================================================================
// Output
// =============================================================================

/// The complete pricing breakdown of a sale.
///
/// Deterministic: persisting these fields lets anyone re-derive and audit
/// `total_amount` later (see [`verify_sale`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingBreakdown {
    pub subtotal: Money,
    pub discount: Money,
    pub additional_fee: Money,
    pub transportation_fee: Money,
    pub total_amount: Money,
}

// =============================================================================
// Calculator
// =============================================================================

/// Computes the discount a voucher grants on a subtotal.
///
/// ## Example
/// ```rust
/// use sari_core::money::Money;
/// use sari_core::pricing::{discount_for, VoucherTerms};
/// use sari_core::types::VoucherKind;
///
/// let terms = VoucherTerms { kind: VoucherKind::Percentage, value: 10 };
/// assert_eq!(discount_for(&terms, Money::new(100_000)).amount(), 10_000);
/// ```
pub fn discount_for(voucher: &VoucherTerms, subtotal: Money) -> Money {
    match voucher.kind {
        VoucherKind::Percentage => subtotal.percentage(voucher.value),
        VoucherKind::Fixed => Money::new(voucher.value),
    }
}

/// Computes the full pricing breakdown for a cart.
///
/// Pure and deterministic; both the client preview and the authoritative
/// server-side computation go through this single function.
pub fn price_cart(
    lines: &[PricedLine],
    voucher: Option<&VoucherTerms>,
    additional_fee: Money,
    transportation_fee: Money,
) -> PricingBreakdown {
    let subtotal: Money = lines
        .iter()
        .map(|line| line.unit_price.multiply_quantity(line.quantity))
        .sum();

    let discount = voucher
        .map(|terms| discount_for(terms, subtotal))
        .unwrap_or_else(Money::zero);

    let total_amount =
        subtotal.saturating_sub_floor_zero(discount) + additional_fee + transportation_fee;

    PricingBreakdown {
        subtotal,
        discount,
        additional_fee,
        transportation_fee,
        total_amount,
    }
}

/// Re-derives a persisted sale's total from its stored breakdown and items.
///
/// Returns `true` when the stored `subtotal` matches the line items and the
/// stored `total_amount` matches the formula. Used by audit tooling and
/// tests; a `false` here means the stored record was tampered with or a
/// write skipped the calculator.
pub fn verify_sale(sale: &Sale, items: &[SaleItem]) -> bool {
    let derived_subtotal: Money = items.iter().map(SaleItem::line_total).sum();

    let derived_total = sale.subtotal.saturating_sub_floor_zero(sale.discount)
        + sale.additional_fee.amount
        + sale.transportation_fee.amount;

    derived_subtotal == sale.subtotal && derived_total == sale.total_amount
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AdditionalFee, PaymentMethod, PaymentStatus, SaleStatus, TransportationFee};
    use chrono::Utc;

    fn lines(entries: &[(i64, i64)]) -> Vec<PricedLine> {
        entries
            .iter()
            .map(|&(price, qty)| PricedLine {
                unit_price: Money::new(price),
                quantity: qty,
            })
            .collect()
    }

    #[test]
    fn test_subtotal_sums_price_times_quantity() {
        let breakdown = price_cart(
            &lines(&[(50_000, 2), (25_000, 1)]),
            None,
            Money::zero(),
            Money::zero(),
        );
        assert_eq!(breakdown.subtotal.amount(), 125_000);
        assert_eq!(breakdown.discount, Money::zero());
        assert_eq!(breakdown.total_amount.amount(), 125_000);
    }

    #[test]
    fn test_percentage_voucher_with_additional_fee() {
        // 10% on 100_000 → discount 10_000; +5_000 fee → 95_000
        let voucher = VoucherTerms {
            kind: VoucherKind::Percentage,
            value: 10,
        };
        let breakdown = price_cart(
            &lines(&[(100_000, 1)]),
            Some(&voucher),
            Money::new(5_000),
            Money::zero(),
        );
        assert_eq!(breakdown.discount.amount(), 10_000);
        assert_eq!(breakdown.total_amount.amount(), 95_000);
    }

    #[test]
    fn test_fixed_voucher_is_not_capped_but_total_is_floored() {
        // A fixed voucher larger than the subtotal: the stored discount
        // keeps its face value; only the goods portion floors at zero.
        let voucher = VoucherTerms {
            kind: VoucherKind::Fixed,
            value: 150_000,
        };
        let breakdown = price_cart(
            &lines(&[(100_000, 1)]),
            Some(&voucher),
            Money::new(7_500),
            Money::new(2_500),
        );
        assert_eq!(breakdown.discount.amount(), 150_000);
        assert_eq!(breakdown.total_amount.amount(), 10_000);
    }

    #[test]
    fn test_transportation_fee_added_after_discount() {
        let voucher = VoucherTerms {
            kind: VoucherKind::Fixed,
            value: 20_000,
        };
        let breakdown = price_cart(
            &lines(&[(40_000, 2)]),
            Some(&voucher),
            Money::zero(),
            Money::new(15_000),
        );
        // 80_000 - 20_000 + 15_000
        assert_eq!(breakdown.total_amount.amount(), 75_000);
    }

    #[test]
    fn test_empty_cart_prices_to_fees_only() {
        // The transaction manager rejects empty carts before pricing; the
        // calculator itself stays total (no panic, fees pass through).
        let breakdown = price_cart(&[], None, Money::new(1_000), Money::new(2_000));
        assert_eq!(breakdown.subtotal, Money::zero());
        assert_eq!(breakdown.total_amount.amount(), 3_000);
    }

    #[test]
    fn test_verify_sale_round_trip() {
        let now = Utc::now();
        let items = vec![SaleItem {
            id: "i1".to_string(),
            sale_id: "s1".to_string(),
            product_id: "p1".to_string(),
            name_snapshot: "Jasmine Body Scrub".to_string(),
            base_price: Money::new(30_000),
            unit_price: Money::new(50_000),
            quantity: 2,
            note: None,
            created_at: now,
        }];
        let voucher = VoucherTerms {
            kind: VoucherKind::Percentage,
            value: 10,
        };
        let breakdown = price_cart(
            &[PricedLine {
                unit_price: Money::new(50_000),
                quantity: 2,
            }],
            Some(&voucher),
            Money::new(5_000),
            Money::zero(),
        );

        let sale = Sale {
            id: "s1".to_string(),
            cashier_id: "u1".to_string(),
            customer_id: None,
            therapist_id: None,
            include_therapist_on_invoice: false,
            subtotal: breakdown.subtotal,
            discount: breakdown.discount,
            voucher_code: Some("SPA10".to_string()),
            additional_fee: AdditionalFee {
                amount: breakdown.additional_fee,
                description: Some("Service".to_string()),
                include_on_invoice: true,
            },
            transportation_fee: TransportationFee {
                amount: breakdown.transportation_fee,
                include_on_invoice: false,
            },
            total_amount: breakdown.total_amount,
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Paid,
            status: SaleStatus::Completed,
            created_at: now,
            updated_at: now,
        };

        assert!(verify_sale(&sale, &items));

        // Tampered total must fail verification
        let mut tampered = sale.clone();
        tampered.total_amount = Money::new(1);
        assert!(!verify_sale(&tampered, &items));
    }
}
