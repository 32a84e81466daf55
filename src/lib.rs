//! # Stay Ledger
//!
//! Occupancy and revenue accounting for a small portfolio of rental units.
//! Takes a snapshot of units, stays, expenses and seasonal prices and turns it
//! into the views a host works from.
//!
//! ## Core Concepts
//!
//! - **Stay**: a booking over `[check_in, check_out)`, or a single-day booking
//!   billed as one unit of occupancy on its day (see [`StaySpan`])
//! - **Nightly allocation**: a stay's price is spread evenly over its nights, so
//!   any date window receives exactly the share of nights it contains
//! - **Occupancy grid**: unit × day matrix of markers and allocated value, with
//!   net (after platform fee) and administrator columns
//! - **Period reports**: month series, unit × year pivot, nights per month and
//!   expense breakdowns, attributing stay revenue to the check-in month
//! - **Commission**: the administrator's share of net revenue for externally
//!   managed units
//!
//! ## Example
//!
//! ```rust,ignore
//! use stay_ledger::*;
//! use chrono::NaiveDate;
//!
//! let snapshot = LedgerSnapshot::new(
//!     vec![Unit::new(1, "Beach House").with_administration(20.0)],
//!     vec![Stay::new(
//!         1,
//!         1,
//!         NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
//!         NaiveDate::from_ymd_opt(2024, 1, 13).unwrap(),
//!         300.0,
//!     )?],
//!     vec![],
//!     vec![],
//! );
//! let config = LedgerConfig::default();
//! let dashboard = RentalDashboard::new(&snapshot, &config)?;
//!
//! let window = DateWindow::for_month(2024, 1)?;
//! let grid = dashboard.occupancy_grid(&window, &DashboardFilter::default());
//! println!("{}", dashboard.export_grid_csv(&window, &DashboardFilter::default())?);
//! ```

pub mod allocation;
pub mod commission;
pub mod config;
pub mod error;
pub mod import;
pub mod ingestion;
pub mod money;
pub mod occupancy;
pub mod periods;
pub mod presentation;
pub mod pricing;
pub mod schema;
pub mod snapshot;
pub mod utils;

pub use allocation::{
    allocate, allocate_span, allocate_stay, nightly_breakdown, Allocation, BoundaryEvent,
    BoundaryKind, NightlyValue,
};
pub use commission::{CommissionAllocator, CommissionFilter, CommissionReport, Settlement};
pub use config::{CurrencyFormat, LedgerConfig};
pub use error::{Result, StayLedgerError};
pub use import::{
    import_stays_csv, ImportMode, ImportReport, SkipReason, SkippedRow, StayDraft, StayImporter,
};
pub use ingestion::*;
pub use money::{format_amount, format_currency, parse_amount};
pub use occupancy::{
    build_grid, GridCell, GridRow, Marker, Movement, OccupancyAggregator, OccupancyGrid,
    OccupancySummary,
};
pub use periods::{
    ExpenseBucket, MonthlyTotals, NightsReport, PeriodFilter, PeriodTotals, UnitNights,
    UnitYearPivot, UnitYearRow, WindowSummary,
};
pub use presentation::{format_grid, to_csv, FormattedRow, FormattedTable};
pub use pricing::simulate_rental_value;
pub use schema::*;
pub use snapshot::LedgerSnapshot;
pub use utils::*;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unit and platform selection shared by the dashboard views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardFilter {
    /// `None` keeps every unit.
    pub units: Option<BTreeSet<UnitId>>,
    /// `None` keeps every platform.
    pub platforms: Option<BTreeSet<Platform>>,
}

impl DashboardFilter {
    pub fn single_unit(unit_id: UnitId) -> Self {
        Self {
            units: Some(BTreeSet::from([unit_id])),
            platforms: None,
        }
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = UnitId>) -> Self {
        self.units = Some(units.into_iter().collect());
        self
    }

    pub fn with_platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms = Some(platforms.into_iter().collect());
        self
    }

    pub fn keeps_unit(&self, unit_id: UnitId) -> bool {
        self.units.as_ref().map_or(true, |u| u.contains(&unit_id))
    }

    pub fn keeps_stay(&self, stay: &Stay) -> bool {
        self.keeps_unit(stay.unit_id)
            && self
                .platforms
                .as_ref()
                .map_or(true, |p| p.contains(&stay.platform))
    }
}

/// Read-only views over one snapshot.
///
/// Every call recomputes from the snapshot; nothing is cached between views.
pub struct RentalDashboard<'a> {
    snapshot: &'a LedgerSnapshot,
    config: &'a LedgerConfig,
}

impl<'a> RentalDashboard<'a> {
    pub fn new(snapshot: &'a LedgerSnapshot, config: &'a LedgerConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            "Dashboard over {} units, {} stays, {} expenses",
            snapshot.units.len(),
            snapshot.stays.len(),
            snapshot.expenses.len()
        );
        Ok(Self { snapshot, config })
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        self.snapshot
    }

    pub fn config(&self) -> &LedgerConfig {
        self.config
    }

    fn selected_units(&self, filter: &DashboardFilter) -> Vec<Unit> {
        self.snapshot
            .units
            .iter()
            .filter(|u| filter.keeps_unit(u.id))
            .cloned()
            .collect()
    }

    /// Stays passing the filter that touch the window.
    fn selected_stays(&self, window: &DateWindow, filter: &DashboardFilter) -> Vec<Stay> {
        self.snapshot
            .stays
            .iter()
            .filter(|s| filter.keeps_stay(s) && allocation::overlaps(&s.span, window))
            .cloned()
            .collect()
    }

    pub fn occupancy_grid(&self, window: &DateWindow, filter: &DashboardFilter) -> OccupancyGrid {
        info!(
            "Building occupancy grid {} to {}",
            window.start(),
            window.end()
        );
        let units = self.selected_units(filter);
        let stays = self.selected_stays(window, filter);
        OccupancyAggregator::new(self.config).build_grid(&units, &stays, window)
    }

    pub fn formatted_grid(&self, window: &DateWindow, filter: &DashboardFilter) -> FormattedTable {
        format_grid(&self.occupancy_grid(window, filter), self.config)
    }

    pub fn export_grid_csv(&self, window: &DateWindow, filter: &DashboardFilter) -> Result<String> {
        to_csv(&self.formatted_grid(window, filter))
    }

    /// Revenue, expenses, profit and occupancy cards for a window.
    pub fn window_summary(&self, window: &DateWindow, filter: &DashboardFilter) -> WindowSummary {
        info!("Summarizing {} to {}", window.start(), window.end());
        let units = self.selected_units(filter);
        let stays = self.selected_stays(window, filter);
        periods::window_summary(&units, &stays, &self.snapshot.expenses, window)
    }

    /// Check-ins and check-outs over the configured horizon starting `today`.
    pub fn upcoming_movements(
        &self,
        today: chrono::NaiveDate,
        filter: &DashboardFilter,
    ) -> Vec<Movement> {
        occupancy::upcoming_movements(
            &self.filtered_stays(filter),
            today,
            self.config.upcoming_horizon_days,
        )
    }

    pub fn available_years(&self) -> Vec<i32> {
        periods::available_years(&self.snapshot.stays, &self.snapshot.expenses)
    }

    pub fn monthly_series(&self, filter: &PeriodFilter) -> Vec<MonthlyTotals> {
        info!("Building monthly series for {}", filter.year);
        periods::monthly_series(
            &self.snapshot.units,
            &self.snapshot.stays,
            &self.snapshot.expenses,
            filter,
        )
    }

    /// Stays passing the filter, whatever their dates.
    fn filtered_stays(&self, filter: &DashboardFilter) -> Vec<Stay> {
        self.snapshot
            .stays
            .iter()
            .filter(|s| filter.keeps_stay(s))
            .cloned()
            .collect()
    }

    pub fn unit_year_pivot(&self, filter: &DashboardFilter) -> UnitYearPivot {
        let units = self.selected_units(filter);
        periods::unit_year_pivot(&units, &self.filtered_stays(filter), &self.snapshot.expenses)
    }

    pub fn nights_per_month(&self, year: i32, filter: &DashboardFilter) -> NightsReport {
        let units = self.selected_units(filter);
        periods::nights_per_month(&units, &self.filtered_stays(filter), year)
    }

    pub fn expense_report(
        &self,
        year: i32,
        filter: &DashboardFilter,
        types: Option<&BTreeSet<ExpenseType>>,
    ) -> Vec<ExpenseBucket> {
        let units = self.selected_units(filter);
        periods::expenses_by_month(&units, &self.snapshot.expenses, year, types)
    }

    pub fn commission_report(&self, filter: &CommissionFilter) -> Result<CommissionReport> {
        info!(
            "Building commission report for {}{}",
            filter.year,
            filter
                .month
                .map(|m| format!("-{:02}", m))
                .unwrap_or_default()
        );
        CommissionAllocator::new(self.config).report(
            &self.snapshot.units,
            &self.snapshot.stays,
            filter,
        )
    }

    pub fn simulate_rental_value(
        &self,
        unit_id: UnitId,
        season: Season,
        occupancy_pct: f64,
    ) -> Option<f64> {
        pricing::simulate_rental_value(&self.snapshot.prices, unit_id, season, occupancy_pct)
    }
}
