use chrono::NaiveDate;
use rust_decimal::prelude::*;
use std::fmt;

/// Stable identity of a lot: its position in purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LotId(pub usize);

impl fmt::Display for LotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How a lot entered the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionKind {
    Purchase,
    /// Free units, carried at zero cost basis.
    Airdrop,
    /// Staking rewards, carried at zero cost basis.
    Staking,
    /// Carried at market value and taxed as income at receipt.
    Mining,
}

impl AcquisitionKind {
    pub fn is_zero_cost(&self) -> bool {
        matches!(self, AcquisitionKind::Airdrop | AcquisitionKind::Staking)
    }
}

/// A purchase record as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub date: NaiveDate,
    pub unit_price: Decimal,
    pub units: Decimal,
    pub kind: AcquisitionKind,
}

impl Purchase {
    pub fn new(date: NaiveDate, unit_price: Decimal, units: Decimal) -> Self {
        Purchase {
            date,
            unit_price,
            units,
            kind: AcquisitionKind::Purchase,
        }
    }

    /// Cost basis per unit this acquisition is carried at.
    pub fn basis_price(&self) -> Decimal {
        if self.kind.is_zero_cost() {
            Decimal::ZERO
        } else {
            self.unit_price
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub id: LotId,
    pub purchase_date: NaiveDate,
    pub unit_price: Decimal,
    pub units_remaining: Decimal,
}

impl Lot {
    pub fn is_eligible(&self, as_of: NaiveDate) -> bool {
        self.purchase_date <= as_of && self.units_remaining > Decimal::ZERO
    }

    /// `None` if the product does not fit a `Decimal`.
    pub fn value(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(self.units_remaining)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaleEvent {
    pub date: NaiveDate,
    pub units: Decimal,
    pub unit_price: Decimal,
}

impl SaleEvent {
    pub fn new(date: NaiveDate, units: Decimal, unit_price: Decimal) -> Self {
        SaleEvent {
            date,
            units,
            unit_price,
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        self.units.checked_mul(self.unit_price)
    }
}

/// Outcome of one sale. Amounts keep full precision; round when rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleResult {
    pub date: NaiveDate,
    pub units: Decimal,
    pub unit_price: Decimal,
    pub value: Decimal,
    pub gross_profit: Decimal,
    pub taxes: Decimal,
    pub net_profit: Decimal,
    pub average_cost_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn lot_eligible_on_purchase_day() {
        let lot = Lot {
            id: LotId(0),
            purchase_date: date("2023-01-15"),
            unit_price: dec!(12),
            units_remaining: dec!(50),
        };
        assert!(lot.is_eligible(date("2023-01-15")));
        assert!(!lot.is_eligible(date("2023-01-14")));
    }

    #[test]
    fn exhausted_lot_not_eligible() {
        let lot = Lot {
            id: LotId(0),
            purchase_date: date("2023-01-01"),
            unit_price: dec!(10),
            units_remaining: dec!(0),
        };
        assert!(!lot.is_eligible(date("2024-01-01")));
    }

    #[test]
    fn airdrop_carried_at_zero_basis() {
        let mut p = Purchase::new(date("2023-01-01"), dec!(3.5), dec!(10));
        assert_eq!(p.basis_price(), dec!(3.5));
        p.kind = AcquisitionKind::Airdrop;
        assert_eq!(p.basis_price(), dec!(0));
        p.kind = AcquisitionKind::Mining;
        assert_eq!(p.basis_price(), dec!(3.5));
    }

    #[test]
    fn value_is_none_past_decimal_range() {
        let lot = Lot {
            id: LotId(0),
            purchase_date: date("2023-01-01"),
            unit_price: dec!(12),
            units_remaining: dec!(50),
        };
        assert_eq!(lot.value(), Some(dec!(600)));
        let huge = SaleEvent::new(date("2023-01-01"), Decimal::MAX, dec!(2));
        assert_eq!(huge.value(), None);
    }
}
