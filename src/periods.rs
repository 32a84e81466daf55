//! Calendar-period views: month series, unit × year pivot, nights per month
//! and the expense breakdown.
//!
//! Revenue here is attributed whole to the month of check-in. This is the
//! bookkeeping view; the occupancy grid spreads value night by night instead.

use crate::allocation::allocate_stay;
use crate::error::Result;
use crate::occupancy::{occupancy_summary, OccupancySummary};
use crate::schema::{Expense, ExpenseType, Stay, Unit, UnitId};
use crate::utils::{month_label, validate_month, year_month, DateWindow};
use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeriodFilter {
    pub year: i32,
    /// `None` keeps every unit.
    pub units: Option<BTreeSet<UnitId>>,
    /// `None` keeps every month.
    pub months: Option<BTreeSet<u32>>,
}

impl PeriodFilter {
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            units: None,
            months: None,
        }
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = UnitId>) -> Self {
        self.units = Some(units.into_iter().collect());
        self
    }

    pub fn with_months(mut self, months: impl IntoIterator<Item = u32>) -> Result<Self> {
        let months: BTreeSet<u32> = months.into_iter().collect();
        for month in &months {
            validate_month(*month)?;
        }
        self.months = Some(months);
        Ok(self)
    }

    pub fn matches(&self, unit_id: UnitId, date: NaiveDate) -> bool {
        date.year() == self.year
            && self.units.as_ref().map_or(true, |u| u.contains(&unit_id))
            && self
                .months
                .as_ref()
                .map_or(true, |m| m.contains(&date.month()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub month: u32,
    pub label: String,
    pub revenue: f64,
    pub expense: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeriodTotals {
    pub revenue: f64,
    pub expense: f64,
    pub profit: f64,
}

impl PeriodTotals {
    fn add_revenue(&mut self, amount: f64) {
        self.revenue += amount;
        self.profit = self.revenue - self.expense;
    }

    fn add_expense(&mut self, amount: f64) {
        self.expense += amount;
        self.profit = self.revenue - self.expense;
    }

    fn absorb(&mut self, other: &PeriodTotals) {
        self.add_revenue(other.revenue);
        self.add_expense(other.expense);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitYearRow {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub years: BTreeMap<i32, PeriodTotals>,
    /// Sum across every year of this unit.
    pub total: PeriodTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitYearPivot {
    pub years: Vec<i32>,
    pub rows: Vec<UnitYearRow>,
    pub grand_total: PeriodTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitNights {
    pub unit_id: UnitId,
    pub unit_name: String,
    /// Index 0 is January.
    pub nights: [u64; 12],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightsReport {
    pub year: i32,
    pub rows: Vec<UnitNights>,
}

impl NightsReport {
    pub fn month_totals(&self) -> [u64; 12] {
        let mut totals = [0u64; 12];
        for row in &self.rows {
            for (slot, n) in totals.iter_mut().zip(row.nights.iter()) {
                *slot += n;
            }
        }
        totals
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseBucket {
    pub month: u32,
    pub label: String,
    pub unit_id: UnitId,
    pub unit_name: String,
    pub expense_type: ExpenseType,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub revenue: f64,
    pub expenses: f64,
    pub profit: f64,
    pub occupancy: OccupancySummary,
}

/// Revenue, expense and profit for each month of `filter.year`.
///
/// Always twelve entries, January first. Months excluded by the filter or
/// without activity are present with zeros. Records of units missing from
/// `units` are left out.
pub fn monthly_series(
    units: &[Unit],
    stays: &[Stay],
    expenses: &[Expense],
    filter: &PeriodFilter,
) -> Vec<MonthlyTotals> {
    let known: BTreeSet<UnitId> = units.iter().map(|u| u.id).collect();
    let keeps = |unit_id: UnitId, date: NaiveDate| known.contains(&unit_id) && filter.matches(unit_id, date);
    let mut buckets = [PeriodTotals::default(); 12];

    for stay in stays.iter().filter(|s| keeps(s.unit_id, s.check_in())) {
        buckets[stay.check_in().month0() as usize].add_revenue(stay.total_price);
    }
    for expense in expenses.iter().filter(|e| keeps(e.unit_id, e.date)) {
        buckets[expense.date.month0() as usize].add_expense(expense.amount);
    }

    buckets
        .iter()
        .enumerate()
        .map(|(idx, totals)| {
            let month = idx as u32 + 1;
            MonthlyTotals {
                month,
                label: month_label(month).to_string(),
                revenue: totals.revenue,
                expense: totals.expense,
                profit: totals.profit,
            }
        })
        .collect()
}

/// Years that have at least one check-in or expense, ascending.
pub fn available_years(stays: &[Stay], expenses: &[Expense]) -> Vec<i32> {
    stays
        .iter()
        .map(|s| s.check_in().year())
        .chain(expenses.iter().map(|e| e.date.year()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Revenue/expense/profit per (unit, year), plus per-unit and grand totals.
///
/// Only units present in `units` appear; a unit shows up once it has any stay
/// or expense.
pub fn unit_year_pivot(units: &[Unit], stays: &[Stay], expenses: &[Expense]) -> UnitYearPivot {
    let mut cells: BTreeMap<UnitId, BTreeMap<i32, PeriodTotals>> = BTreeMap::new();

    for stay in stays {
        cells
            .entry(stay.unit_id)
            .or_default()
            .entry(stay.check_in().year())
            .or_default()
            .add_revenue(stay.total_price);
    }
    for expense in expenses {
        cells
            .entry(expense.unit_id)
            .or_default()
            .entry(expense.date.year())
            .or_default()
            .add_expense(expense.amount);
    }

    let mut years = BTreeSet::new();
    let mut grand_total = PeriodTotals::default();
    let mut rows = Vec::new();

    for unit in units {
        let Some(per_year) = cells.remove(&unit.id) else {
            continue;
        };
        let mut total = PeriodTotals::default();
        for (year, totals) in &per_year {
            years.insert(*year);
            total.absorb(totals);
        }
        grand_total.absorb(&total);
        rows.push(UnitYearRow {
            unit_id: unit.id,
            unit_name: unit.name.clone(),
            years: per_year,
            total,
        });
    }

    if !cells.is_empty() {
        debug!(
            "Unit/year pivot dropped activity of {} unknown units",
            cells.len()
        );
    }

    UnitYearPivot {
        years: years.into_iter().collect(),
        rows,
        grand_total,
    }
}

/// Nights booked per month of `year` for each unit, zero-filled.
///
/// Every occupied night is bucketed by its own date, so a stay crossing a
/// month boundary is split. Day-use stays have no overnight and are left out.
pub fn nights_per_month(units: &[Unit], stays: &[Stay], year: i32) -> NightsReport {
    let rows = units
        .iter()
        .map(|unit| {
            let mut nights = [0u64; 12];
            for stay in stays
                .iter()
                .filter(|s| s.unit_id == unit.id && !s.is_day_use())
            {
                for date in stay.span.occupied_dates() {
                    let (y, m) = year_month(date);
                    if y == year {
                        nights[m as usize - 1] += 1;
                    }
                }
            }
            UnitNights {
                unit_id: unit.id,
                unit_name: unit.name.clone(),
                nights,
            }
        })
        .collect();

    NightsReport { year, rows }
}

/// Expenses of `year` summed by (month, unit, type). `types` of `None` keeps all.
pub fn expenses_by_month(
    units: &[Unit],
    expenses: &[Expense],
    year: i32,
    types: Option<&BTreeSet<ExpenseType>>,
) -> Vec<ExpenseBucket> {
    let names: BTreeMap<UnitId, &str> = units.iter().map(|u| (u.id, u.name.as_str())).collect();
    let mut sums: BTreeMap<(u32, UnitId, ExpenseType), f64> = BTreeMap::new();

    for expense in expenses.iter().filter(|e| {
        e.date.year() == year
            && names.contains_key(&e.unit_id)
            && types.map_or(true, |t| t.contains(&e.expense_type))
    }) {
        *sums
            .entry((expense.date.month(), expense.unit_id, expense.expense_type))
            .or_default() += expense.amount;
    }

    sums.into_iter()
        .map(|((month, unit_id, expense_type), amount)| ExpenseBucket {
            month,
            label: month_label(month).to_string(),
            unit_id,
            unit_name: names.get(&unit_id).copied().unwrap_or_default().to_string(),
            expense_type,
            amount,
        })
        .collect()
}

/// Night-proportional revenue inside the window. A day-use counts in full
/// when its day falls inside.
pub fn revenue_in_window(stays: &[Stay], window: &DateWindow) -> f64 {
    stays
        .iter()
        .map(|s| allocate_stay(s, window).value_in_window)
        .sum()
}

/// Expenses dated inside the window, optionally limited to some units.
pub fn expenses_in_window(
    expenses: &[Expense],
    window: &DateWindow,
    units: Option<&BTreeSet<UnitId>>,
) -> f64 {
    expenses
        .iter()
        .filter(|e| window.contains(e.date) && units.map_or(true, |u| u.contains(&e.unit_id)))
        .map(|e| e.amount)
        .sum()
}

/// Headline figures for a window over the given units.
pub fn window_summary(
    units: &[Unit],
    stays: &[Stay],
    expenses: &[Expense],
    window: &DateWindow,
) -> WindowSummary {
    let unit_ids: BTreeSet<UnitId> = units.iter().map(|u| u.id).collect();
    let unit_stays: Vec<Stay> = stays
        .iter()
        .filter(|s| unit_ids.contains(&s.unit_id))
        .cloned()
        .collect();

    let revenue = revenue_in_window(&unit_stays, window);
    let expenses = expenses_in_window(expenses, window, Some(&unit_ids));

    WindowSummary {
        revenue,
        expenses,
        profit: revenue - expenses,
        occupancy: occupancy_summary(units, &unit_stays, window),
    }
}
