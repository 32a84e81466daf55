//! Text rendering of the occupancy grid for the UI layer.

use crate::config::LedgerConfig;
use crate::error::{Result, StayLedgerError};
use crate::money::format_amount;
use crate::occupancy::{Marker, OccupancyGrid};
use serde::{Deserialize, Serialize};

pub const TOTAL_LABEL: &str = "Total";
pub const ADMINISTRATOR_LABEL: &str = "Administrator";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedRow {
    pub label: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedTable {
    pub columns: Vec<String>,
    pub rows: Vec<FormattedRow>,
}

pub fn marker_symbol(marker: Marker) -> &'static str {
    match marker {
        Marker::Empty => "",
        Marker::Occupied => "🟧",
        Marker::CheckIn => "🟦",
        Marker::CheckOut => "◧",
    }
}

pub fn legend() -> Vec<(&'static str, &'static str)> {
    vec![
        (marker_symbol(Marker::Occupied), "Occupied for the night (carries value)"),
        (marker_symbol(Marker::CheckIn), "Check-in"),
        (marker_symbol(Marker::CheckOut), "Check-out (no value)"),
    ]
}

pub fn format_cell(marker: Marker, value: f64, decimal_places: usize) -> String {
    let symbol = marker_symbol(marker);
    if value > 0.0 {
        format!("{} {}", symbol, format_amount(value, decimal_places))
            .trim()
            .to_string()
    } else {
        symbol.to_string()
    }
}

/// One row per unit plus a closing total row. Day columns are labelled
/// `dd/mm`, followed by total, net and administrator columns.
pub fn format_grid(grid: &OccupancyGrid, config: &LedgerConfig) -> FormattedTable {
    let decimals = config.currency.decimal_places;
    let money = |v: f64| format_amount(v, decimals);

    let mut columns: Vec<String> = grid
        .days
        .iter()
        .map(|d| d.format("%d/%m").to_string())
        .collect();
    columns.push(TOTAL_LABEL.to_string());
    columns.push(net_column_label(config));
    columns.push(ADMINISTRATOR_LABEL.to_string());

    let mut rows: Vec<FormattedRow> = grid
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = row
                .cells
                .iter()
                .map(|c| format_cell(c.marker, c.value, decimals))
                .collect();
            cells.push(money(row.total));
            cells.push(money(row.net_total));
            cells.push(money(row.administrator_total));
            FormattedRow {
                label: row.unit_name.clone(),
                cells,
            }
        })
        .collect();

    let mut totals: Vec<String> = grid
        .day_totals
        .iter()
        .map(|v| format_cell(Marker::Empty, *v, decimals))
        .collect();
    totals.push(money(grid.total));
    totals.push(money(grid.net_total));
    totals.push(money(grid.administrator_total));
    rows.push(FormattedRow {
        label: TOTAL_LABEL.to_string(),
        cells: totals,
    });

    FormattedTable { columns, rows }
}

pub fn net_column_label(config: &LedgerConfig) -> String {
    format!("Net (-{}%)", format_amount(config.platform_fee_rate * 100.0, 0))
}

/// Writes the table as `;`-separated text with a leading unit column.
pub fn to_csv(table: &FormattedTable) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    let mut header = vec![String::new()];
    header.extend(table.columns.iter().cloned());
    writer.write_record(&header)?;
    for row in &table.rows {
        writer.write_record(std::iter::once(&row.label).chain(row.cells.iter()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| StayLedgerError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| {
        StayLedgerError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}
