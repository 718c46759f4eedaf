use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::lot::LotId;

/// Failures of a gains computation. Every variant aborts the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxError {
    #[error("unknown cost basis method: {0} (expected ACB, FIFO, LIFO or HIFO)")]
    InvalidMethod(String),
    #[error("insufficient units on {date}: requested={requested}, available={available}")]
    InsufficientInventory {
        date: NaiveDate,
        requested: Decimal,
        available: Decimal,
    },
    #[error("units drawn on {date} do not match sale: requested={requested}, drawn={drawn}")]
    UnitsMismatch {
        date: NaiveDate,
        requested: Decimal,
        drawn: Decimal,
    },
    #[error("cannot consume {requested} units from lot {lot}: only {remaining} remaining")]
    InvariantViolation {
        lot: LotId,
        requested: Decimal,
        remaining: Decimal,
    },
    #[error("invalid sale on {date}: units={units}, price={price}")]
    InvalidSale {
        date: NaiveDate,
        units: Decimal,
        price: Decimal,
    },
    #[error("sale on {date} is earlier than previous sale on {previous}")]
    OutOfOrderSale {
        previous: NaiveDate,
        date: NaiveDate,
    },
    #[error("amounts on {date} exceed the representable decimal range")]
    Overflow { date: NaiveDate },
    #[error("tax rate must be between 0 and 1, got {0}")]
    InvalidTaxRate(Decimal),
}

/// Failures while reading a transaction ledger. Line numbers are 1-based and
/// count the header.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read ledger: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed ledger csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: invalid decimal {value:?} in {field}")]
    InvalidDecimal {
        line: u64,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: unsupported date format {value:?}")]
    InvalidDate { line: u64, value: String },
    #[error("line {line}: unknown transaction type {value:?}")]
    UnknownType { line: u64, value: String },
    #[error("line {line}: transaction type {value:?} is not supported for a single-asset ledger")]
    UnsupportedType { line: u64, value: String },
    #[error("line {line}: units must be positive, got {units}")]
    NonPositiveUnits { line: u64, units: Decimal },
    #[error("line {line}: unit price must not be negative, got {price}")]
    NegativePrice { line: u64, price: Decimal },
}
