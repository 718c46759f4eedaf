//! Realized capital gains and taxes for a sequence of sales drawn from a
//! single asset's purchase lots, under ACB, FIFO, LIFO or HIFO.
//!
//! ```
//! use capgains::{compute_gains, Purchase, SaleEvent};
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let day = |m, d| NaiveDate::from_ymd_opt(2023, m, d).unwrap();
//! let purchases = [
//!     Purchase::new(day(1, 1), dec!(10), dec!(100)),
//!     Purchase::new(day(1, 15), dec!(12), dec!(50)),
//! ];
//! let sales = [SaleEvent::new(day(2, 15), dec!(120), dec!(15))];
//!
//! let results = compute_gains(&purchases, &sales, "FIFO", None).unwrap();
//! assert_eq!(results[0].gross_profit, dec!(560));
//! assert_eq!(results[0].taxes, dec!(154));
//! ```

use rust_decimal::prelude::*;

pub mod config;
pub mod error;
pub mod gains;
pub mod inventory;
pub mod ledger;
pub mod lot;
pub mod method;
pub mod processor;
pub mod report;
pub mod selector;

pub use error::{LoadError, TaxError};
pub use gains::{DEFAULT_TAX_RATE, IncomeResult};
pub use inventory::Inventory;
pub use lot::{AcquisitionKind, Lot, LotId, Purchase, SaleEvent, SaleResult};
pub use method::Method;
pub use processor::{BalanceSnapshot, BatchOutcome, SaleProcessor};

/// Runs `sales` in order against a fresh inventory built from `purchases`.
///
/// The method is validated before anything is processed. Any failure aborts
/// the whole batch.
pub fn compute_gains(
    purchases: &[Purchase],
    sales: &[SaleEvent],
    method: &str,
    tax_rate: Option<Decimal>,
) -> Result<Vec<SaleResult>, TaxError> {
    let method: Method = method.parse()?;
    let tax_rate = tax_rate.unwrap_or(DEFAULT_TAX_RATE);
    if tax_rate < Decimal::ZERO || tax_rate > Decimal::ONE {
        return Err(TaxError::InvalidTaxRate(tax_rate));
    }
    let mut inventory = Inventory::from_purchases(purchases);
    SaleProcessor::new(method)
        .with_tax_rate(tax_rate)
        .process(&mut inventory, sales)
}

/// Sum that yields `None` instead of panicking past `Decimal::MAX`.
pub fn checked_sum<I: IntoIterator<Item = Decimal>>(values: I) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, x| acc.checked_add(x))
}

/// Money precision.
pub fn q2(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Unit precision.
pub fn q8(x: Decimal) -> Decimal {
    x.round_dp_with_strategy(8, RoundingStrategy::MidpointAwayFromZero)
}
