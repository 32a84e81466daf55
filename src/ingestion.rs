//! Conversion of loosely typed storage rows into a [`LedgerSnapshot`].
//!
//! Rows arrive the way the storage layer keeps them: categorical columns as
//! free text, the administration percentage as whatever was typed in. Bad
//! rows are dropped and counted instead of failing the whole load.

use crate::money::parse_optional_amount;
use crate::schema::{
    validate_price, Expense, ExpenseId, ExpenseType, PaymentStatus, Platform, PriceId, Season,
    SeasonalPrice, Stay, StayId, StaySpan, Unit, UnitId, UnitStatus,
};
use crate::snapshot::LedgerSnapshot;
use crate::utils::normalize_key;
use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: UnitId,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub administration_flag: String,
    #[serde(default)]
    pub administration_percentage: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StayRecord {
    pub id: StayId,
    pub unit_id: UnitId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub guest: String,
    pub total_price: f64,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub payment_status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: ExpenseId,
    pub unit_id: UnitId,
    pub date: NaiveDate,
    pub expense_type: String,
    pub amount: f64,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRecord {
    pub id: PriceId,
    pub unit_id: UnitId,
    pub season: String,
    pub base_price: f64,
}

/// Counts of rows left out of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub invalid_stays: usize,
    pub orphan_stays: usize,
    pub orphan_expenses: usize,
    pub invalid_prices: usize,
}

impl LoadReport {
    pub fn total_skipped(&self) -> usize {
        self.invalid_stays + self.orphan_stays + self.orphan_expenses + self.invalid_prices
    }
}

fn is_flag_set(text: &str) -> bool {
    matches!(
        normalize_key(text).as_str(),
        "sim" | "s" | "yes" | "y" | "true" | "1"
    )
}

impl From<UnitRecord> for Unit {
    fn from(record: UnitRecord) -> Self {
        let percentage = parse_optional_amount(record.administration_percentage.as_deref());
        Unit {
            id: record.id,
            name: record.name.trim().to_string(),
            location: record.location,
            capacity: record
                .capacity
                .and_then(|c| u32::try_from(c).ok())
                .unwrap_or(1),
            status: UnitStatus::from_text(&record.status),
            administered: is_flag_set(&record.administration_flag),
            administration_percentage: if percentage.is_finite() { percentage } else { 0.0 },
        }
    }
}

impl LedgerSnapshot {
    pub fn from_records(
        units: Vec<UnitRecord>,
        stays: Vec<StayRecord>,
        expenses: Vec<ExpenseRecord>,
        prices: Vec<PriceRecord>,
    ) -> (LedgerSnapshot, LoadReport) {
        let mut report = LoadReport::default();
        let units: Vec<Unit> = units.into_iter().map(Unit::from).collect();
        let known: HashSet<UnitId> = units.iter().map(|u| u.id).collect();

        let stays: Vec<Stay> = stays
            .into_iter()
            .filter_map(|row| {
                if !known.contains(&row.unit_id) {
                    warn!("Skipping stay {}: unknown unit {}", row.id, row.unit_id);
                    report.orphan_stays += 1;
                    return None;
                }
                let span = match validate_price(row.total_price)
                    .and_then(|_| StaySpan::from_dates(row.check_in, row.check_out))
                {
                    Ok(span) => span,
                    Err(e) => {
                        warn!("Skipping stay {}: {}", row.id, e);
                        report.invalid_stays += 1;
                        return None;
                    }
                };
                Some(Stay {
                    id: row.id,
                    unit_id: row.unit_id,
                    span,
                    guest: row.guest,
                    total_price: row.total_price,
                    platform: Platform::from_text(&row.platform),
                    payment_status: PaymentStatus::from_text(&row.payment_status),
                })
            })
            .collect();

        let expenses: Vec<Expense> = expenses
            .into_iter()
            .filter_map(|row| {
                if !known.contains(&row.unit_id) {
                    warn!("Skipping expense {}: unknown unit {}", row.id, row.unit_id);
                    report.orphan_expenses += 1;
                    return None;
                }
                Some(Expense {
                    id: row.id,
                    unit_id: row.unit_id,
                    date: row.date,
                    expense_type: ExpenseType::from_text(&row.expense_type),
                    amount: if row.amount.is_finite() { row.amount } else { 0.0 },
                    description: row.description,
                })
            })
            .collect();

        let prices: Vec<SeasonalPrice> = prices
            .into_iter()
            .filter_map(|row| {
                let season = Season::from_text(&row.season);
                match season {
                    Some(season) if known.contains(&row.unit_id) => Some(SeasonalPrice {
                        id: row.id,
                        unit_id: row.unit_id,
                        season,
                        base_price: row.base_price,
                    }),
                    _ => {
                        warn!(
                            "Skipping price {}: unit {} season '{}'",
                            row.id, row.unit_id, row.season
                        );
                        report.invalid_prices += 1;
                        None
                    }
                }
            })
            .collect();

        info!(
            "Loaded {} units, {} stays, {} expenses, {} prices ({} rows skipped)",
            units.len(),
            stays.len(),
            expenses.len(),
            prices.len(),
            report.total_skipped()
        );

        (
            LedgerSnapshot::new(units, stays, expenses, prices),
            report,
        )
    }
}
