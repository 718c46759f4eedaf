//! Semicolon-delimited transaction ledger:
//!
//! ```text
//! Date;Type;Units;Unit Price;Currency
//! 01/09/2023 10:00:00;Purchase;3.152;78.85;EUR
//! ```

use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use rust_decimal::prelude::*;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::LoadError;
use crate::lot::{AcquisitionKind, Purchase, SaleEvent};

#[derive(Debug, Deserialize, Clone)]
struct LedgerRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Type")]
    row_type: String,
    #[serde(rename = "Units")]
    units: String,
    #[serde(rename = "Unit Price")]
    unit_price: String,
    #[serde(rename = "Currency", default)]
    currency: String,
}

/// Purchases in file order and sales sorted by date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    pub purchases: Vec<Purchase>,
    pub sales: Vec<SaleEvent>,
}

enum RowKind {
    Acquisition(AcquisitionKind),
    Sale,
}

fn parse_kind(s: &str, line: u64) -> Result<RowKind, LoadError> {
    match s.trim().to_lowercase().as_str() {
        "purchase" | "buy" => Ok(RowKind::Acquisition(AcquisitionKind::Purchase)),
        "airdrop" => Ok(RowKind::Acquisition(AcquisitionKind::Airdrop)),
        "staking" => Ok(RowKind::Acquisition(AcquisitionKind::Staking)),
        "mining" => Ok(RowKind::Acquisition(AcquisitionKind::Mining)),
        "sell" | "sale" => Ok(RowKind::Sale),
        "swap" => Err(LoadError::UnsupportedType {
            line,
            value: s.to_string(),
        }),
        _ => Err(LoadError::UnknownType {
            line,
            value: s.to_string(),
        }),
    }
}

fn parse_decimal(s: &str, field: &'static str, line: u64) -> Result<Decimal, LoadError> {
    Decimal::from_str(s.trim()).map_err(|_| LoadError::InvalidDecimal {
        line,
        field,
        value: s.to_string(),
    })
}

/// Calendar date of a ledger timestamp; any time of day is dropped.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    for fmt in ["%d/%m/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.date());
        }
    }
    for fmt in ["%d/%m/%Y", "%Y-%m-%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

pub fn load_ledger(path: &Path) -> Result<Ledger, LoadError> {
    let f = File::open(path)?;
    read_ledger(f)
}

pub fn read_ledger<R: Read>(reader: R) -> Result<Ledger, LoadError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut ledger = Ledger::default();

    for (i, row) in rdr.deserialize::<LedgerRow>().enumerate() {
        let line = i as u64 + 2;
        let row = row?;
        if row.date.is_empty() && row.row_type.is_empty() {
            warn!(line, "skipping empty ledger row");
            continue;
        }

        let kind = parse_kind(&row.row_type, line)?;
        let date = parse_date(&row.date).ok_or_else(|| LoadError::InvalidDate {
            line,
            value: row.date.clone(),
        })?;
        let units = parse_decimal(&row.units, "Units", line)?;
        let zero_cost = matches!(kind, RowKind::Acquisition(k) if k.is_zero_cost());
        let unit_price = if zero_cost && row.unit_price.is_empty() {
            debug!(line, "no price on zero-cost acquisition");
            Decimal::ZERO
        } else {
            parse_decimal(&row.unit_price, "Unit Price", line)?
        };
        if units <= Decimal::ZERO {
            return Err(LoadError::NonPositiveUnits { line, units });
        }
        if unit_price < Decimal::ZERO {
            return Err(LoadError::NegativePrice {
                line,
                price: unit_price,
            });
        }
        debug!(line, %date, kind = %row.row_type, %units, %unit_price, currency = %row.currency, "ledger row");

        match kind {
            RowKind::Acquisition(kind) => ledger.purchases.push(Purchase {
                date,
                unit_price,
                units,
                kind,
            }),
            RowKind::Sale => ledger.sales.push(SaleEvent::new(date, units, unit_price)),
        }
    }

    ledger.sales.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_supported_date_formats() {
        assert_eq!(parse_date("01/09/2023 10:30:00"), Some(ymd(2023, 9, 1)));
        assert_eq!(parse_date("15/10/2024"), Some(ymd(2024, 10, 15)));
        assert_eq!(parse_date("2024-10-16"), Some(ymd(2024, 10, 16)));
        assert_eq!(parse_date("2024-10-16 23:59:59"), Some(ymd(2024, 10, 16)));
        assert_eq!(parse_date("16 Oct 2024"), None);
    }

    #[test]
    fn reads_acquisitions_and_sales() {
        let csv = "\
Date;Type;Units;Unit Price;Currency
01/09/2023 00:00:00;Purchase;3.152;78.85;EUR
17/10/2024 00:00:00;Sell;40;100;EUR
02/10/2023 00:00:00;Airdrop;1.5;4.20;EUR
16/10/2024 00:00:00;Sell;100;120;EUR
03/11/2023 00:00:00;Mining;0.25;75.60;EUR
";
        let ledger = read_ledger(csv.as_bytes()).unwrap();
        assert_eq!(ledger.purchases.len(), 3);
        assert_eq!(ledger.purchases[0].kind, AcquisitionKind::Purchase);
        assert_eq!(ledger.purchases[1].kind, AcquisitionKind::Airdrop);
        assert_eq!(ledger.purchases[1].basis_price(), dec!(0));
        assert_eq!(ledger.purchases[2].kind, AcquisitionKind::Mining);
        assert_eq!(ledger.purchases[2].unit_price, dec!(75.60));

        let dates: Vec<NaiveDate> = ledger.sales.iter().map(|s| s.date).collect();
        assert_eq!(dates, vec![ymd(2024, 10, 16), ymd(2024, 10, 17)]);
        assert_eq!(ledger.sales[0].units, dec!(100));
    }

    #[test]
    fn currency_column_is_optional() {
        let csv = "Date;Type;Units;Unit Price\n2024-01-01;Purchase;2;10\n";
        let ledger = read_ledger(csv.as_bytes()).unwrap();
        assert_eq!(ledger.purchases.len(), 1);
    }

    #[test]
    fn zero_cost_rows_may_omit_price() {
        let csv = "\
Date;Type;Units;Unit Price;Currency
02/01/2023 00:00:00;Airdrop;3;;
03/01/2023 00:00:00;Staking;0.5;;EUR
";
        let ledger = read_ledger(csv.as_bytes()).unwrap();
        assert_eq!(ledger.purchases.len(), 2);
        assert_eq!(ledger.purchases[0].unit_price, Decimal::ZERO);
        assert_eq!(ledger.purchases[1].kind, AcquisitionKind::Staking);
        assert_eq!(ledger.purchases[1].units, dec!(0.5));

        let csv = "Date;Type;Units;Unit Price\n2024-01-01;Purchase;2;\n";
        assert!(matches!(
            read_ledger(csv.as_bytes()),
            Err(LoadError::InvalidDecimal { field: "Unit Price", .. })
        ));
    }

    #[test]
    fn swap_is_rejected() {
        let csv = "Date;Type;Units;Unit Price\n2024-01-01;Swap;2;10\n";
        match read_ledger(csv.as_bytes()) {
            Err(LoadError::UnsupportedType { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn bad_values_report_line() {
        let csv = "Date;Type;Units;Unit Price\n2024-01-01;Purchase;2;10\n2024-01-02;Purchase;x;10\n";
        match read_ledger(csv.as_bytes()) {
            Err(LoadError::InvalidDecimal { line, field, .. }) => {
                assert_eq!(line, 3);
                assert_eq!(field, "Units");
            }
            other => panic!("expected InvalidDecimal, got {:?}", other),
        }

        let csv = "Date;Type;Units;Unit Price\n2024-01-01;Sell;0;10\n";
        assert!(matches!(
            read_ledger(csv.as_bytes()),
            Err(LoadError::NonPositiveUnits { line: 2, .. })
        ));

        let csv = "Date;Type;Units;Unit Price\n2024-01-01;Gift;1;10\n";
        assert!(matches!(
            read_ledger(csv.as_bytes()),
            Err(LoadError::UnknownType { .. })
        ));
    }
}
