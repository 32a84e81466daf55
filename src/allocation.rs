//! Spreads a stay's total price over the nights it occupies.
//!
//! Every night of a stay carries the same flat rate, `total / nights`. A
//! day-use is one billable unit on its check-in date. Windows are inclusive
//! on both ends and may cut a stay anywhere.

use crate::schema::{Stay, StaySpan};
use crate::utils::DateWindow;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub nightly_rate: f64,
    pub nights_in_window: u64,
    pub value_in_window: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NightlyValue {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryKind {
    CheckIn,
    CheckOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryEvent {
    pub date: NaiveDate,
    pub kind: BoundaryKind,
}

/// Allocation over raw, unvalidated dates.
///
/// Any `check_out <= check_in` is read as a day-use on `check_in`. A window
/// whose start is after its end yields no nights and no value.
pub fn allocate(
    check_in: NaiveDate,
    check_out: NaiveDate,
    total_price: f64,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Allocation {
    let span = if check_out <= check_in {
        StaySpan::DayUse { day: check_in }
    } else {
        StaySpan::Nights {
            check_in,
            check_out,
        }
    };

    match DateWindow::new(window_start, window_end) {
        Ok(window) => allocate_span(&span, total_price, &window),
        Err(_) => Allocation {
            nightly_rate: nightly_rate(&span, total_price),
            nights_in_window: 0,
            value_in_window: 0.0,
        },
    }
}

pub fn allocate_stay(stay: &Stay, window: &DateWindow) -> Allocation {
    allocate_span(&stay.span, stay.total_price, window)
}

pub fn allocate_span(span: &StaySpan, total_price: f64, window: &DateWindow) -> Allocation {
    let rate = nightly_rate(span, total_price);
    let nights = nights_in_window(span, window);
    Allocation {
        nightly_rate: rate,
        nights_in_window: nights,
        value_in_window: rate * nights as f64,
    }
}

pub fn nightly_rate(span: &StaySpan, total_price: f64) -> f64 {
    total_price / span.night_count().max(1) as f64
}

/// Occupied dates of `span` that fall inside `window`.
pub fn nights_in_window(span: &StaySpan, window: &DateWindow) -> u64 {
    if span.night_count() == 0 {
        return 0;
    }
    let first = span.check_in().max(window.start());
    let last = span.last_night().min(window.end());
    if first > last {
        0
    } else {
        (last - first).num_days() as u64 + 1
    }
}

/// One entry per occupied date inside the window, each carrying the nightly rate.
pub fn nightly_breakdown(stay: &Stay, window: &DateWindow) -> Vec<NightlyValue> {
    let rate = nightly_rate(&stay.span, stay.total_price);
    stay.span
        .occupied_dates()
        .filter(|date| window.contains(*date))
        .map(|date| NightlyValue { date, value: rate })
        .collect()
}

/// Check-in and check-out dates that fall inside the window. These carry no value.
pub fn boundary_events(span: &StaySpan, window: &DateWindow) -> Vec<BoundaryEvent> {
    let mut events = Vec::with_capacity(2);
    if window.contains(span.check_in()) {
        events.push(BoundaryEvent {
            date: span.check_in(),
            kind: BoundaryKind::CheckIn,
        });
    }
    if window.contains(span.check_out()) {
        events.push(BoundaryEvent {
            date: span.check_out(),
            kind: BoundaryKind::CheckOut,
        });
    }
    events
}

/// Whether the stay touches the window at all, check-out day included.
pub fn overlaps(span: &StaySpan, window: &DateWindow) -> bool {
    span.check_in() <= window.end() && span.check_out() >= window.start()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window(start: NaiveDate, end: NaiveDate) -> DateWindow {
        DateWindow::new(start, end).unwrap()
    }

    #[test]
    fn test_partial_window_over_multi_night_stay() {
        let result = allocate(d(2024, 1, 10), d(2024, 1, 13), 300.0, d(2024, 1, 11), d(2024, 1, 11));
        assert!((result.nightly_rate - 100.0).abs() < 1e-9);
        assert_eq!(result.nights_in_window, 1);
        assert!((result.value_in_window - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_day_use_takes_full_price_on_check_in() {
        let result = allocate(d(2024, 3, 5), d(2024, 3, 5), 150.0, d(2024, 3, 1), d(2024, 3, 31));
        assert_eq!(result.nights_in_window, 1);
        assert!((result.value_in_window - 150.0).abs() < 1e-9);

        let outside = allocate(d(2024, 3, 5), d(2024, 3, 5), 150.0, d(2024, 3, 6), d(2024, 3, 31));
        assert_eq!(outside.nights_in_window, 0);
        assert_eq!(outside.value_in_window, 0.0);
    }

    #[test]
    fn test_reversed_raw_range_is_day_use() {
        let result = allocate(d(2024, 3, 5), d(2024, 2, 1), 90.0, d(2024, 3, 5), d(2024, 3, 5));
        assert_eq!(result.nights_in_window, 1);
        assert!((result.value_in_window - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_reversed_window_is_empty() {
        let result = allocate(d(2024, 1, 10), d(2024, 1, 13), 300.0, d(2024, 1, 12), d(2024, 1, 11));
        assert_eq!(result.nights_in_window, 0);
        assert_eq!(result.value_in_window, 0.0);
        assert!((result.nightly_rate - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_check_out_day_is_not_a_night() {
        let span = StaySpan::from_dates(d(2024, 1, 10), d(2024, 1, 13)).unwrap();
        assert_eq!(nights_in_window(&span, &window(d(2024, 1, 13), d(2024, 1, 20))), 0);
        assert_eq!(nights_in_window(&span, &window(d(2024, 1, 1), d(2024, 1, 9))), 0);
        assert_eq!(nights_in_window(&span, &window(d(2024, 1, 12), d(2024, 1, 30))), 1);
        assert!(overlaps(&span, &window(d(2024, 1, 13), d(2024, 1, 20))));
        assert!(!overlaps(&span, &window(d(2024, 1, 14), d(2024, 1, 20))));
    }

    #[test]
    fn test_full_stay_window_recovers_total() {
        for nights in 1..=20u64 {
            let check_in = d(2024, 2, 20);
            let check_out = check_in.checked_add_days(Days::new(nights)).unwrap();
            let stay = Stay::new(1, 1, check_in, check_out, 1234.5).unwrap();
            let full = window(check_in, stay.span.last_night());

            let alloc = allocate_stay(&stay, &full);
            assert_eq!(alloc.nights_in_window, nights);
            assert!((alloc.nightly_rate * nights as f64 - 1234.5).abs() < 1e-6);

            let spread: f64 = nightly_breakdown(&stay, &full).iter().map(|n| n.value).sum();
            assert!((spread - 1234.5).abs() < 1e-6);
        }
    }

    #[test]
    fn test_breakdown_is_clipped_to_window() {
        let stay = Stay::new(1, 1, d(2024, 1, 30), d(2024, 2, 3), 400.0).unwrap();
        let february = window(d(2024, 2, 1), d(2024, 2, 29));
        let nights = nightly_breakdown(&stay, &february);
        assert_eq!(nights.len(), 2);
        assert_eq!(nights[0].date, d(2024, 2, 1));
        assert!((nights[1].value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_boundary_events() {
        let span = StaySpan::from_dates(d(2024, 1, 10), d(2024, 1, 13)).unwrap();
        let events = boundary_events(&span, &window(d(2024, 1, 12), d(2024, 1, 31)));
        assert_eq!(
            events,
            vec![BoundaryEvent {
                date: d(2024, 1, 13),
                kind: BoundaryKind::CheckOut
            }]
        );

        let day_use = StaySpan::DayUse { day: d(2024, 1, 5) };
        assert_eq!(boundary_events(&day_use, &window(d(2024, 1, 5), d(2024, 1, 5))).len(), 2);
    }
}
