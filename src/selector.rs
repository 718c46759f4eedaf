//! Lot selection: which eligible lots a sale draws its units from.
//!
//! Every selector walks an ordering of the eligible lots and takes
//! `min(remaining, available)` from each until the sale is covered, splitting
//! the last lot touched. The orderings:
//!
//! - ACB: smallest `units_remaining` first. Order only matters for bookkeeping;
//!   the cost basis is the weighted average of the whole pool.
//! - FIFO: oldest purchase first, ties by insertion order.
//! - LIFO: newest purchase first, exact reverse of FIFO.
//! - HIFO: highest unit price first, ties by oldest purchase then insertion.

use rust_decimal::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

use crate::checked_sum;
use crate::lot::{Lot, LotId};

/// Units taken from one lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draw {
    pub lot: LotId,
    pub units: Decimal,
    pub unit_price: Decimal,
}

impl Draw {
    pub fn cost(&self) -> Option<Decimal> {
        self.units.checked_mul(self.unit_price)
    }
}

/// Ordered draws for one sale, plus the size and value of the pool the draws
/// came from (measured before any consumption).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawPlan {
    pub draws: Vec<Draw>,
    pub pool_units: Decimal,
    pub pool_value: Decimal,
}

impl DrawPlan {
    /// Weighted average price of the pool; zero for an empty pool.
    pub fn pool_average_price(&self) -> Option<Decimal> {
        if self.pool_units.is_zero() {
            return Some(Decimal::ZERO);
        }
        self.pool_value.checked_div(self.pool_units)
    }

    pub fn units_drawn(&self) -> Option<Decimal> {
        checked_sum(self.draws.iter().map(|d| d.units))
    }

    pub fn drawn_cost(&self) -> Option<Decimal> {
        self.draws
            .iter()
            .try_fold(Decimal::ZERO, |acc, d| acc.checked_add(d.cost()?))
    }
}

pub trait LotSelector {
    /// Orders the eligible lots in the sequence they should be drawn from.
    fn order(&self, eligible: &mut [&Lot]);

    /// `None` if the pool's units or value overflow a `Decimal`.
    fn draw_plan(&self, eligible: &[&Lot], units: Decimal) -> Option<DrawPlan> {
        let (pool_units, pool_value) = pool_totals(eligible)?;
        let mut ordered = eligible.to_vec();
        self.order(&mut ordered);

        let mut remaining = units;
        let mut draws = Vec::new();
        for lot in ordered {
            if remaining <= Decimal::ZERO {
                break;
            }
            let take = remaining.min(lot.units_remaining);
            debug!(lot = %lot.id, units = %take, price = %lot.unit_price, "draw");
            draws.push(Draw {
                lot: lot.id,
                units: take,
                unit_price: lot.unit_price,
            });
            remaining -= take;
        }

        Some(DrawPlan {
            draws,
            pool_units,
            pool_value,
        })
    }
}

/// `Σ(units)` and `Σ(price·units)` over the pool.
pub fn pool_totals(lots: &[&Lot]) -> Option<(Decimal, Decimal)> {
    let units = checked_sum(lots.iter().map(|l| l.units_remaining))?;
    let value = lots
        .iter()
        .try_fold(Decimal::ZERO, |acc, l| acc.checked_add(l.value()?))?;
    Some((units, value))
}

/// `Σ(price·units) / Σ(units)` over the pool; zero for an empty pool.
pub fn weighted_average_price(lots: &[&Lot]) -> Option<Decimal> {
    let (units, value) = pool_totals(lots)?;
    if units.is_zero() {
        return Some(Decimal::ZERO);
    }
    value.checked_div(units)
}

pub struct SmallestLotFirst;

impl LotSelector for SmallestLotFirst {
    fn order(&self, eligible: &mut [&Lot]) {
        eligible.sort_by(|a, b| {
            a.units_remaining
                .cmp(&b.units_remaining)
                .then(a.id.cmp(&b.id))
        });
    }
}

pub struct OldestFirst;

impl LotSelector for OldestFirst {
    fn order(&self, eligible: &mut [&Lot]) {
        eligible.sort_by(|a, b| by_date(a, b));
    }
}

pub struct NewestFirst;

impl LotSelector for NewestFirst {
    fn order(&self, eligible: &mut [&Lot]) {
        eligible.sort_by(|a, b| by_date(b, a));
    }
}

pub struct HighestPriceFirst;

impl LotSelector for HighestPriceFirst {
    fn order(&self, eligible: &mut [&Lot]) {
        eligible.sort_by(|a, b| b.unit_price.cmp(&a.unit_price).then(by_date(a, b)));
    }
}

fn by_date(a: &Lot, b: &Lot) -> Ordering {
    a.purchase_date
        .cmp(&b.purchase_date)
        .then(a.id.cmp(&b.id))
}
