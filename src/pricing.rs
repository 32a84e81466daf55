use crate::schema::{Season, SeasonalPrice, UnitId};
use log::debug;

pub fn base_price(prices: &[SeasonalPrice], unit_id: UnitId, season: Season) -> Option<f64> {
    prices
        .iter()
        .find(|p| p.unit_id == unit_id && p.season == season)
        .map(|p| p.base_price)
}

/// Expected rental value for a season at a given occupancy.
///
/// `base_price * occupancy_pct / 100`, with the percentage clamped to
/// `0..=100`. `None` when the unit has no price for the season.
pub fn simulate_rental_value(
    prices: &[SeasonalPrice],
    unit_id: UnitId,
    season: Season,
    occupancy_pct: f64,
) -> Option<f64> {
    let base = base_price(prices, unit_id, season)?;
    let pct = if occupancy_pct.is_finite() {
        occupancy_pct.clamp(0.0, 100.0)
    } else {
        0.0
    };
    let value = base * pct / 100.0;
    debug!(
        "Simulated unit {} {:?} at {}%: {:.2}",
        unit_id, season, pct, value
    );
    Some(value)
}
