//! Gain and tax computation for a drawn sale, and income taxed at receipt.

use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;

use crate::error::TaxError;
use crate::lot::{AcquisitionKind, Purchase};
use crate::selector::DrawPlan;

pub const DEFAULT_TAX_RATE: Decimal = dec!(0.275);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gain {
    pub cost_basis: Decimal,
    pub gross_profit: Decimal,
    pub taxes: Decimal,
    pub net_profit: Decimal,
    pub average_cost_price: Decimal,
}

pub trait GainCalculator {
    /// Purchase-side value of the units being sold.
    fn cost_basis(&self, plan: &DrawPlan, units: Decimal) -> Option<Decimal>;

    /// `None` if any amount leaves the `Decimal` range.
    fn realize(
        &self,
        plan: &DrawPlan,
        units: Decimal,
        sale_price: Decimal,
        tax_rate: Decimal,
    ) -> Option<Gain> {
        let cost_basis = self.cost_basis(plan, units)?;
        let gross_profit = units.checked_mul(sale_price)?.checked_sub(cost_basis)?;
        let taxes = tax_on(gross_profit, tax_rate)?;
        let average_cost_price = if units.is_zero() {
            Decimal::ZERO
        } else {
            cost_basis.checked_div(units)?
        };
        Some(Gain {
            cost_basis,
            gross_profit,
            taxes,
            net_profit: gross_profit.checked_sub(taxes)?,
            average_cost_price,
        })
    }
}

/// Units sold at the weighted average price of the whole eligible pool.
pub struct AverageCostBasis;

impl GainCalculator for AverageCostBasis {
    fn cost_basis(&self, plan: &DrawPlan, units: Decimal) -> Option<Decimal> {
        if plan.pool_units.is_zero() {
            return Some(Decimal::ZERO);
        }
        // multiply before dividing so selling the whole pool returns its exact value
        match units.checked_mul(plan.pool_value) {
            Some(product) => product.checked_div(plan.pool_units),
            None => plan.pool_average_price()?.checked_mul(units),
        }
    }
}

/// Sum of `units · price` over the lots actually drawn.
pub struct DrawnCostBasis;

impl GainCalculator for DrawnCostBasis {
    fn cost_basis(&self, plan: &DrawPlan, _units: Decimal) -> Option<Decimal> {
        plan.drawn_cost()
    }
}

/// Losses are untaxed and not carried forward.
pub fn tax_on(gain: Decimal, tax_rate: Decimal) -> Option<Decimal> {
    if gain > Decimal::ZERO {
        gain.checked_mul(tax_rate)
    } else {
        Some(Decimal::ZERO)
    }
}

/// Mining rewards are income at their market value on receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomeResult {
    pub date: NaiveDate,
    pub units: Decimal,
    pub unit_price: Decimal,
    pub income: Decimal,
    pub taxes: Decimal,
    pub net_income: Decimal,
}

pub fn income_at_receipt(
    purchases: &[Purchase],
    tax_rate: Decimal,
) -> Result<Vec<IncomeResult>, TaxError> {
    purchases
        .iter()
        .filter(|p| p.kind == AcquisitionKind::Mining)
        .map(|p| {
            let overflow = || TaxError::Overflow { date: p.date };
            let income = p.units.checked_mul(p.unit_price).ok_or_else(overflow)?;
            let taxes = tax_on(income, tax_rate).ok_or_else(overflow)?;
            Ok(IncomeResult {
                date: p.date,
                units: p.units,
                unit_price: p.unit_price,
                income,
                taxes,
                net_income: income.checked_sub(taxes).ok_or_else(overflow)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lot::LotId;
    use crate::selector::Draw;

    fn plan() -> DrawPlan {
        DrawPlan {
            draws: vec![
                Draw {
                    lot: LotId(0),
                    units: dec!(100),
                    unit_price: dec!(10),
                },
                Draw {
                    lot: LotId(1),
                    units: dec!(20),
                    unit_price: dec!(12),
                },
            ],
            pool_units: dec!(10),
            pool_value: dec!(110),
        }
    }

    #[test]
    fn drawn_basis_sums_lot_costs() {
        let gain = DrawnCostBasis
            .realize(&plan(), dec!(120), dec!(15), DEFAULT_TAX_RATE)
            .unwrap();
        assert_eq!(gain.cost_basis, dec!(1240));
        assert_eq!(gain.gross_profit, dec!(560));
        assert_eq!(gain.taxes, dec!(154));
        assert_eq!(gain.net_profit, dec!(406));
        assert_eq!(crate::q2(gain.average_cost_price), dec!(10.33));
    }

    #[test]
    fn average_basis_uses_pool_price() {
        let gain = AverageCostBasis
            .realize(&plan(), dec!(120), dec!(15), DEFAULT_TAX_RATE)
            .unwrap();
        assert_eq!(gain.cost_basis, dec!(1320));
        assert_eq!(gain.gross_profit, dec!(480));
        assert_eq!(gain.average_cost_price, dec!(11));
    }

    #[test]
    fn loss_is_untaxed() {
        let gain = DrawnCostBasis
            .realize(&plan(), dec!(120), dec!(9), DEFAULT_TAX_RATE)
            .unwrap();
        assert_eq!(gain.gross_profit, dec!(-160));
        assert_eq!(gain.taxes, Decimal::ZERO);
        assert_eq!(gain.net_profit, dec!(-160));
    }

    #[test]
    fn break_even_is_untaxed() {
        assert_eq!(tax_on(Decimal::ZERO, dec!(0.5)), Some(Decimal::ZERO));
    }

    #[test]
    fn average_basis_of_whole_pool_is_exact() {
        // 1 @ 10 + 2 @ 11; 32 / 3 does not terminate
        let pool = DrawPlan {
            draws: vec![],
            pool_units: dec!(3),
            pool_value: dec!(32),
        };
        let gain = AverageCostBasis
            .realize(&pool, dec!(3), dec!(12), DEFAULT_TAX_RATE)
            .unwrap();
        assert_eq!(gain.cost_basis, dec!(32));
        assert_eq!(gain.gross_profit, dec!(4));
        assert_eq!(gain.taxes, dec!(1.1));
    }

    #[test]
    fn overflowing_proceeds_give_no_gain() {
        let gain = DrawnCostBasis.realize(&plan(), Decimal::MAX, dec!(2), DEFAULT_TAX_RATE);
        assert_eq!(gain, None);
    }

    #[test]
    fn mining_income_taxed_at_receipt() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut mined = Purchase::new(date, dec!(80), dec!(0.5));
        mined.kind = AcquisitionKind::Mining;
        let bought = Purchase::new(date, dec!(80), dec!(3));

        let rows = income_at_receipt(&[bought, mined], dec!(0.2)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].income, dec!(40));
        assert_eq!(rows[0].taxes, dec!(8));
        assert_eq!(rows[0].net_income, dec!(32));
    }

    #[test]
    fn overflowing_mining_income_is_an_error() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut mined = Purchase::new(date, Decimal::MAX, dec!(2));
        mined.kind = AcquisitionKind::Mining;
        assert_eq!(
            income_at_receipt(&[mined], dec!(0.2)),
            Err(TaxError::Overflow { date })
        );
    }
}
