use chrono::NaiveDate;
use csv::WriterBuilder;
use rust_decimal::prelude::*;
use serde::Serialize;
use std::io::Write;

use crate::error::TaxError;
use crate::gains::IncomeResult;
use crate::lot::SaleResult;
use crate::processor::BalanceSnapshot;
use crate::{q2, q8};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub date: String,
    pub event_type: String,
    pub units: String,
    pub unit_price: String,
    pub value: String,
    pub gross_profit: String,
    pub taxes: String,
    pub net_profit: String,
    pub average_cost_price: String,
    pub currency: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Totals {
    pub value: Decimal,
    pub gross_profit: Decimal,
    pub taxes: Decimal,
    pub net_profit: Decimal,
    pub income: Decimal,
}

impl Totals {
    pub fn add_sale(&mut self, r: &SaleResult) -> Result<(), TaxError> {
        let overflow = || TaxError::Overflow { date: r.date };
        self.value = self.value.checked_add(r.value).ok_or_else(overflow)?;
        self.gross_profit = self
            .gross_profit
            .checked_add(r.gross_profit)
            .ok_or_else(overflow)?;
        self.taxes = self.taxes.checked_add(r.taxes).ok_or_else(overflow)?;
        self.net_profit = self
            .net_profit
            .checked_add(r.net_profit)
            .ok_or_else(overflow)?;
        Ok(())
    }

    pub fn add_income(&mut self, r: &IncomeResult) -> Result<(), TaxError> {
        let overflow = || TaxError::Overflow { date: r.date };
        self.income = self.income.checked_add(r.income).ok_or_else(overflow)?;
        self.taxes = self.taxes.checked_add(r.taxes).ok_or_else(overflow)?;
        self.net_profit = self
            .net_profit
            .checked_add(r.net_income)
            .ok_or_else(overflow)?;
        Ok(())
    }
}

fn make_row(date: NaiveDate, event_type: &str, currency: &str) -> ReportRow {
    ReportRow {
        date: date.format("%Y-%m-%d").to_string(),
        event_type: event_type.to_string(),
        units: String::new(),
        unit_price: String::new(),
        value: String::new(),
        gross_profit: String::new(),
        taxes: String::new(),
        net_profit: String::new(),
        average_cost_price: String::new(),
        currency: currency.to_string(),
    }
}

pub fn sale_row(r: &SaleResult, currency: &str) -> ReportRow {
    let mut row = make_row(r.date, "sale", currency);
    row.units = q8(r.units).to_string();
    row.unit_price = q2(r.unit_price).to_string();
    row.value = q2(r.value).to_string();
    row.gross_profit = q2(r.gross_profit).to_string();
    row.taxes = q2(r.taxes).to_string();
    row.net_profit = q2(r.net_profit).to_string();
    row.average_cost_price = q2(r.average_cost_price).to_string();
    row
}

pub fn income_row(r: &IncomeResult, currency: &str) -> ReportRow {
    let mut row = make_row(r.date, "mining_income", currency);
    row.units = q8(r.units).to_string();
    row.unit_price = q2(r.unit_price).to_string();
    row.value = q2(r.income).to_string();
    row.gross_profit = q2(r.income).to_string();
    row.taxes = q2(r.taxes).to_string();
    row.net_profit = q2(r.net_income).to_string();
    row.average_cost_price = q2(r.unit_price).to_string();
    row
}

/// Sale and income rows merged by date; on equal dates sales come first.
pub fn build_report(
    sales: &[SaleResult],
    income: &[IncomeResult],
    currency: &str,
) -> Result<(Vec<ReportRow>, Totals), TaxError> {
    let mut totals = Totals::default();
    let mut dated: Vec<(NaiveDate, ReportRow)> = Vec::with_capacity(sales.len() + income.len());

    for r in sales {
        totals.add_sale(r)?;
        dated.push((r.date, sale_row(r, currency)));
    }
    for r in income {
        totals.add_income(r)?;
        dated.push((r.date, income_row(r, currency)));
    }
    dated.sort_by(|a, b| a.0.cmp(&b.0));

    Ok((dated.into_iter().map(|(_, row)| row).collect(), totals))
}

pub fn write_report<W: Write>(rows: &[ReportRow], writer: W) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct BalanceRow {
    date: String,
    lot: usize,
    purchase_date: String,
    units: String,
    unit_price: String,
}

pub fn write_balance<W: Write>(snapshots: &[BalanceSnapshot], writer: W) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new().from_writer(writer);
    for snapshot in snapshots {
        for lot in &snapshot.lots {
            wtr.serialize(BalanceRow {
                date: snapshot.date.format("%Y-%m-%d").to_string(),
                lot: lot.id.0,
                purchase_date: lot.purchase_date.format("%Y-%m-%d").to_string(),
                units: q8(lot.units_remaining).to_string(),
                unit_price: q2(lot.unit_price).to_string(),
            })?;
        }
    }
    wtr.flush()?;
    Ok(())
}
