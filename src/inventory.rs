use chrono::NaiveDate;
use rust_decimal::prelude::*;

use crate::checked_sum;
use crate::error::TaxError;
use crate::lot::{Lot, LotId, Purchase};

/// Lots in purchase order. Lots are never removed; an exhausted lot simply
/// stops being eligible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    lots: Vec<Lot>,
}

impl Inventory {
    pub fn new() -> Self {
        Inventory { lots: Vec::new() }
    }

    pub fn from_purchases(purchases: &[Purchase]) -> Self {
        let mut inventory = Inventory::new();
        for p in purchases {
            inventory.add(p.date, p.basis_price(), p.units);
        }
        inventory
    }

    pub fn add(&mut self, purchase_date: NaiveDate, unit_price: Decimal, units: Decimal) -> LotId {
        let id = LotId(self.lots.len());
        self.lots.push(Lot {
            id,
            purchase_date,
            unit_price,
            units_remaining: units,
        });
        id
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn get(&self, id: LotId) -> Option<&Lot> {
        self.lots.get(id.0)
    }

    pub fn eligible_lots(&self, as_of: NaiveDate) -> Vec<&Lot> {
        self.lots.iter().filter(|l| l.is_eligible(as_of)).collect()
    }

    /// `None` if the eligible units overflow a `Decimal`.
    pub fn total_eligible_units(&self, as_of: NaiveDate) -> Option<Decimal> {
        checked_sum(
            self.lots
                .iter()
                .filter(|l| l.is_eligible(as_of))
                .map(|l| l.units_remaining),
        )
    }

    /// Total remaining units and their cost across every lot.
    pub fn position(&self) -> Option<(Decimal, Decimal)> {
        let units = checked_sum(self.lots.iter().map(|l| l.units_remaining))?;
        let cost = self
            .lots
            .iter()
            .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.value()?))?;
        Some((units, cost))
    }

    pub fn consume(&mut self, id: LotId, amount: Decimal) -> Result<(), TaxError> {
        let lot = self.lots.get_mut(id.0).ok_or(TaxError::InvariantViolation {
            lot: id,
            requested: amount,
            remaining: Decimal::ZERO,
        })?;
        if amount < Decimal::ZERO || amount > lot.units_remaining {
            return Err(TaxError::InvariantViolation {
                lot: id,
                requested: amount,
                remaining: lot.units_remaining,
            });
        }
        lot.units_remaining -= amount;
        Ok(())
    }
}
