use crate::allocation::{boundary_events, nightly_breakdown, overlaps, BoundaryKind};
use crate::config::LedgerConfig;
use crate::schema::{Platform, Stay, StayId, Unit, UnitId};
use crate::utils::DateWindow;
use chrono::{Days, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Marker {
    #[default]
    Empty,
    /// Occupied for the night; carries value.
    Occupied,
    CheckIn,
    /// Guest leaves that morning; no value.
    CheckOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridCell {
    pub marker: Marker,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRow {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub cells: Vec<GridCell>,
    pub total: f64,
    pub net_total: f64,
    pub administrator_total: f64,
}

/// Unit × day matrix of markers and allocated values, with its totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancyGrid {
    pub window: DateWindow,
    pub days: Vec<NaiveDate>,
    pub rows: Vec<GridRow>,
    /// Sum over units of each day's value, aligned with `days`.
    pub day_totals: Vec<f64>,
    pub total: f64,
    pub net_total: f64,
    /// Sum of the per-unit administrator totals.
    pub administrator_total: f64,
    pub occupied_nights: u64,
    pub occupancy_rate: f64,
}

impl OccupancyGrid {
    pub fn row(&self, unit_id: UnitId) -> Option<&GridRow> {
        self.rows.iter().find(|r| r.unit_id == unit_id)
    }

    pub fn cell(&self, unit_id: UnitId, date: NaiveDate) -> Option<&GridCell> {
        let idx = self.window.index_of(date)?;
        self.row(unit_id).and_then(|r| r.cells.get(idx))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OccupancySummary {
    pub occupied_nights: u64,
    pub available_nights: u64,
    pub occupancy_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub date: NaiveDate,
    pub kind: BoundaryKind,
    pub stay_id: StayId,
    pub unit_id: UnitId,
    pub guest: String,
    pub platform: Platform,
}

pub struct OccupancyAggregator<'a> {
    config: &'a LedgerConfig,
}

impl<'a> OccupancyAggregator<'a> {
    pub fn new(config: &'a LedgerConfig) -> Self {
        Self { config }
    }

    pub fn build_grid(&self, units: &[Unit], stays: &[Stay], window: &DateWindow) -> OccupancyGrid {
        let days: Vec<NaiveDate> = window.days().collect();
        let mut stays_by_unit: HashMap<UnitId, Vec<&Stay>> = HashMap::new();
        for stay in stays.iter().filter(|s| overlaps(&s.span, window)) {
            stays_by_unit.entry(stay.unit_id).or_default().push(stay);
        }

        let mut rows = Vec::with_capacity(units.len());
        let mut day_totals = vec![0.0; days.len()];
        let mut occupied_nights = 0u64;

        for unit in units {
            let unit_stays = stays_by_unit.get(&unit.id).map(Vec::as_slice).unwrap_or(&[]);
            let cells = self.fill_cells(unit_stays, window, days.len());

            for (slot, cell) in day_totals.iter_mut().zip(&cells) {
                *slot += cell.value;
            }
            occupied_nights += cells
                .iter()
                .filter(|c| c.marker == Marker::Occupied)
                .count() as u64;

            let total: f64 = cells.iter().map(|c| c.value).sum();
            rows.push(GridRow {
                unit_id: unit.id,
                unit_name: unit.name.clone(),
                cells,
                total,
                net_total: self.config.net_of_fee(total),
                administrator_total: total * unit.effective_administration_percentage() / 100.0,
            });
        }

        let total: f64 = rows.iter().map(|r| r.total).sum();
        let administrator_total = rows.iter().map(|r| r.administrator_total).sum();
        let occupancy_rate = occupancy_rate(occupied_nights, units.len(), window.len_days());

        debug!(
            "Built occupancy grid: {} units x {} days, {} occupied nights ({}%)",
            units.len(),
            days.len(),
            occupied_nights,
            occupancy_rate
        );

        OccupancyGrid {
            window: *window,
            days,
            rows,
            day_totals,
            total,
            net_total: self.config.net_of_fee(total),
            administrator_total,
            occupied_nights,
            occupancy_rate,
        }
    }

    fn fill_cells(&self, stays: &[&Stay], window: &DateWindow, len: usize) -> Vec<GridCell> {
        let mut cells = vec![GridCell::default(); len];

        for stay in stays {
            for night in nightly_breakdown(stay, window) {
                if let Some(cell) = window.index_of(night.date).and_then(|i| cells.get_mut(i)) {
                    cell.marker = Marker::Occupied;
                    cell.value += night.value;
                }
            }
        }

        // Boundary markers only land on days no stay occupies.
        for stay in stays {
            for event in boundary_events(&stay.span, window) {
                if let Some(cell) = window.index_of(event.date).and_then(|i| cells.get_mut(i)) {
                    if cell.marker == Marker::Empty {
                        cell.marker = match event.kind {
                            BoundaryKind::CheckIn => Marker::CheckIn,
                            BoundaryKind::CheckOut => Marker::CheckOut,
                        };
                    }
                }
            }
        }

        cells
    }
}

pub fn build_grid(
    units: &[Unit],
    stays: &[Stay],
    window: &DateWindow,
    config: &LedgerConfig,
) -> OccupancyGrid {
    OccupancyAggregator::new(config).build_grid(units, stays, window)
}

/// `occupied / (units × days) × 100`, rounded to one decimal. Zero when there is
/// nothing to divide by.
pub fn occupancy_rate(occupied_nights: u64, unit_count: usize, window_days: i64) -> f64 {
    if unit_count == 0 || window_days <= 0 {
        return 0.0;
    }
    let capacity = unit_count as f64 * window_days as f64;
    let rate = occupied_nights as f64 / capacity * 100.0;
    (rate * 10.0).round() / 10.0
}

/// Occupied unit-nights in the window, counting each (unit, date) once even
/// when stays overlap.
pub fn occupancy_summary(units: &[Unit], stays: &[Stay], window: &DateWindow) -> OccupancySummary {
    let unit_ids: BTreeSet<UnitId> = units.iter().map(|u| u.id).collect();
    let occupied: BTreeSet<(UnitId, NaiveDate)> = stays
        .iter()
        .filter(|s| unit_ids.contains(&s.unit_id))
        .flat_map(|s| {
            s.span
                .occupied_dates()
                .filter(|d| window.contains(*d))
                .map(move |d| (s.unit_id, d))
        })
        .collect();

    let occupied_nights = occupied.len() as u64;
    OccupancySummary {
        occupied_nights,
        available_nights: unit_ids.len() as u64 * window.len_days() as u64,
        occupancy_rate: occupancy_rate(occupied_nights, unit_ids.len(), window.len_days()),
    }
}

/// Check-ins and check-outs dated from `today` through `today + horizon_days`, by date.
pub fn upcoming_movements(stays: &[Stay], today: NaiveDate, horizon_days: u32) -> Vec<Movement> {
    let until = today
        .checked_add_days(Days::new(horizon_days as u64))
        .unwrap_or(NaiveDate::MAX);
    let horizon = DateWindow::new(today, until).unwrap_or_else(|_| DateWindow::single_day(today));

    let mut movements: Vec<Movement> = stays
        .iter()
        .flat_map(|stay| {
            let mut found = Vec::with_capacity(2);
            if horizon.contains(stay.check_in()) {
                found.push((stay, stay.check_in(), BoundaryKind::CheckIn));
            }
            if horizon.contains(stay.check_out()) {
                found.push((stay, stay.check_out(), BoundaryKind::CheckOut));
            }
            found
        })
        .map(|(stay, date, kind)| Movement {
            date,
            kind,
            stay_id: stay.id,
            unit_id: stay.unit_id,
            guest: stay.guest.clone(),
            platform: stay.platform.clone(),
        })
        .collect();

    movements.sort_by_key(|m| m.date);
    movements
}
