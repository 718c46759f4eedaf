use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::error::TaxError;
use crate::gains::DEFAULT_TAX_RATE;
use crate::inventory::Inventory;
use crate::lot::{Lot, SaleEvent, SaleResult};
use crate::method::Method;

/// Slack allowed between units drawn and units sold.
pub const UNITS_TOLERANCE: Decimal = dec!(0.000000001);

/// Lots held on a date, for tracking how the balance evolves.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceSnapshot {
    pub date: NaiveDate,
    pub lots: Vec<Lot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<SaleResult>,
    pub snapshots: Vec<BalanceSnapshot>,
}

/// Runs sales against an inventory, one at a time in date order.
#[derive(Debug, Clone, Copy)]
pub struct SaleProcessor {
    method: Method,
    tax_rate: Decimal,
}

impl SaleProcessor {
    pub fn new(method: Method) -> Self {
        SaleProcessor {
            method,
            tax_rate: DEFAULT_TAX_RATE,
        }
    }

    pub fn with_tax_rate(mut self, tax_rate: Decimal) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    /// Processes every sale or none: the first error aborts the batch and no
    /// results are returned. The inventory is left as of the failing sale.
    pub fn process(
        &self,
        inventory: &mut Inventory,
        sales: &[SaleEvent],
    ) -> Result<Vec<SaleResult>, TaxError> {
        let mut results = Vec::with_capacity(sales.len());
        let mut previous: Option<NaiveDate> = None;
        for sale in sales {
            check_order(previous, sale)?;
            results.push(self.process_sale(inventory, sale)?);
            previous = Some(sale.date);
        }
        Ok(results)
    }

    /// Like `process`, also recording the balance before the first sale and
    /// after each one.
    pub fn process_with_snapshots(
        &self,
        inventory: &mut Inventory,
        sales: &[SaleEvent],
    ) -> Result<BatchOutcome, TaxError> {
        let mut results = Vec::with_capacity(sales.len());
        let mut snapshots = Vec::with_capacity(sales.len() + 1);
        if let Some(first) = sales.first() {
            snapshots.push(opening_snapshot(inventory, first.date));
        }

        let mut previous: Option<NaiveDate> = None;
        for sale in sales {
            check_order(previous, sale)?;
            results.push(self.process_sale(inventory, sale)?);
            let balance = snapshot(inventory, sale.date);
            debug!(date = %balance.date, lots = balance.lots.len(), "balance snapshot");
            snapshots.push(balance);
            previous = Some(sale.date);
        }

        Ok(BatchOutcome { results, snapshots })
    }

    pub fn process_sale(
        &self,
        inventory: &mut Inventory,
        sale: &SaleEvent,
    ) -> Result<SaleResult, TaxError> {
        if sale.units <= Decimal::ZERO || sale.unit_price < Decimal::ZERO {
            return Err(TaxError::InvalidSale {
                date: sale.date,
                units: sale.units,
                price: sale.unit_price,
            });
        }

        let overflow = || TaxError::Overflow { date: sale.date };
        let available = inventory
            .total_eligible_units(sale.date)
            .ok_or_else(overflow)?;
        if available < sale.units {
            return Err(TaxError::InsufficientInventory {
                date: sale.date,
                requested: sale.units,
                available,
            });
        }
        let value = sale.value().ok_or_else(overflow)?;

        // everything fallible is computed before the inventory is touched
        let strategy = self.method.strategy();
        let plan = {
            let eligible = inventory.eligible_lots(sale.date);
            strategy
                .selector
                .draw_plan(&eligible, sale.units)
                .ok_or_else(overflow)?
        };
        let gain = strategy
            .gains
            .realize(&plan, sale.units, sale.unit_price, self.tax_rate)
            .ok_or_else(overflow)?;
        let drawn = plan.units_drawn().ok_or_else(overflow)?;

        for draw in &plan.draws {
            inventory.consume(draw.lot, draw.units)?;
        }

        if (drawn - sale.units).abs() > UNITS_TOLERANCE {
            return Err(TaxError::UnitsMismatch {
                date: sale.date,
                requested: sale.units,
                drawn,
            });
        }

        info!(
            method = %self.method,
            date = %sale.date,
            units = %sale.units,
            gross_profit = %gain.gross_profit,
            taxes = %gain.taxes,
            "processed sale"
        );

        Ok(SaleResult {
            date: sale.date,
            units: sale.units,
            unit_price: sale.unit_price,
            value,
            gross_profit: gain.gross_profit,
            taxes: gain.taxes,
            net_profit: gain.net_profit,
            average_cost_price: gain.average_cost_price,
        })
    }
}

fn check_order(previous: Option<NaiveDate>, sale: &SaleEvent) -> Result<(), TaxError> {
    match previous {
        Some(previous) if sale.date < previous => Err(TaxError::OutOfOrderSale {
            previous,
            date: sale.date,
        }),
        _ => Ok(()),
    }
}

fn snapshot(inventory: &Inventory, date: NaiveDate) -> BalanceSnapshot {
    BalanceSnapshot {
        date,
        lots: inventory
            .eligible_lots(date)
            .into_iter()
            .cloned()
            .collect(),
    }
}

fn opening_snapshot(inventory: &Inventory, first_sale: NaiveDate) -> BalanceSnapshot {
    let lots: Vec<Lot> = inventory
        .lots()
        .iter()
        .filter(|l| l.purchase_date < first_sale && l.units_remaining > Decimal::ZERO)
        .cloned()
        .collect();
    let date = lots
        .iter()
        .map(|l| l.purchase_date)
        .max()
        .unwrap_or(first_sale);
    BalanceSnapshot { date, lots }
}
