use crate::allocation::{allocate_stay, overlaps};
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::money::format_currency;
use crate::schema::{Platform, Stay, StayId, Unit, UnitId};
use crate::utils::DateWindow;
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;

/// Administrator settlement of one stay over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub stay_id: StayId,
    pub unit_id: UnitId,
    pub unit_name: String,
    pub guest: String,
    pub platform: Platform,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub nights_in_window: u64,
    pub gross_value: f64,
    pub net_value: f64,
    pub commission_value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommissionFilter {
    pub year: i32,
    /// Restricts the report to one month of `year`.
    pub month: Option<u32>,
    pub units: Option<BTreeSet<UnitId>>,
    pub platforms: Option<BTreeSet<Platform>>,
}

impl CommissionFilter {
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            ..Default::default()
        }
    }

    pub fn window(&self) -> Result<DateWindow> {
        match self.month {
            Some(month) => DateWindow::for_month(self.year, month),
            None => DateWindow::for_year(self.year),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommissionReport {
    pub window: DateWindow,
    pub settlements: Vec<Settlement>,
    pub nights: u64,
    pub gross_value: f64,
    pub net_value: f64,
    pub commission_value: f64,
}

pub struct CommissionAllocator<'a> {
    config: &'a LedgerConfig,
}

impl<'a> CommissionAllocator<'a> {
    pub fn new(config: &'a LedgerConfig) -> Self {
        Self { config }
    }

    /// Gross is the night-proportional value of the stay inside the window; net
    /// removes the platform fee; the commission is the administrator's share of net.
    pub fn settle(&self, unit: &Unit, stay: &Stay, window: &DateWindow) -> Settlement {
        let allocation = allocate_stay(stay, window);
        let gross_value = allocation.value_in_window;
        let net_value = self.config.net_of_fee(gross_value);
        let commission_value =
            (net_value * unit.effective_administration_percentage() / 100.0).max(0.0);

        Settlement {
            stay_id: stay.id,
            unit_id: unit.id,
            unit_name: unit.name.clone(),
            guest: stay.guest.clone(),
            platform: stay.platform.clone(),
            check_in: stay.check_in(),
            check_out: stay.check_out(),
            nights_in_window: allocation.nights_in_window,
            gross_value,
            net_value,
            commission_value,
        }
    }

    /// Settles every stay of an administered unit that passes the filter and has
    /// at least one night inside the filter's period.
    pub fn report(
        &self,
        units: &[Unit],
        stays: &[Stay],
        filter: &CommissionFilter,
    ) -> Result<CommissionReport> {
        let window = filter.window()?;
        let administered: HashMap<UnitId, &Unit> = units
            .iter()
            .filter(|u| u.administered)
            .filter(|u| filter.units.as_ref().map_or(true, |set| set.contains(&u.id)))
            .map(|u| (u.id, u))
            .collect();

        let mut settlements: Vec<Settlement> = stays
            .iter()
            .filter(|s| {
                filter
                    .platforms
                    .as_ref()
                    .map_or(true, |set| set.contains(&s.platform))
            })
            .filter(|s| overlaps(&s.span, &window))
            .filter_map(|s| {
                administered
                    .get(&s.unit_id)
                    .map(|unit| self.settle(unit, s, &window))
            })
            .filter(|settlement| settlement.nights_in_window > 0)
            .collect();
        settlements.sort_by(|a, b| {
            (a.check_in, a.unit_id, a.stay_id).cmp(&(b.check_in, b.unit_id, b.stay_id))
        });

        debug!(
            "Commission report {} to {}: {} settlements over {} administered units",
            window.start(),
            window.end(),
            settlements.len(),
            administered.len()
        );

        Ok(CommissionReport {
            window,
            nights: settlements.iter().map(|s| s.nights_in_window).sum(),
            gross_value: settlements.iter().map(|s| s.gross_value).sum(),
            net_value: settlements.iter().map(|s| s.net_value).sum(),
            commission_value: settlements.iter().map(|s| s.commission_value).sum(),
            settlements,
        })
    }
}

impl CommissionReport {
    /// Plain-text block ready to paste into a message to the administrator.
    pub fn summary_message(&self, config: &LedgerConfig) -> String {
        let currency = &config.currency;
        let mut text = String::new();
        let _ = writeln!(
            text,
            "Administration report {} - {}",
            self.window.start().format("%d/%m/%Y"),
            self.window.end().format("%d/%m/%Y")
        );
        let _ = writeln!(text, "Stays: {}", self.settlements.len());
        let _ = writeln!(text, "Nights: {}", self.nights);
        let _ = writeln!(text, "Gross: {}", format_currency(self.gross_value, currency));
        let _ = writeln!(
            text,
            "Net (-{}%): {}",
            fee_percent_label(config.platform_fee_rate),
            format_currency(self.net_value, currency)
        );
        let _ = write!(
            text,
            "Commission: {}",
            format_currency(self.commission_value, currency)
        );
        text
    }

    /// One line per settled stay.
    pub fn itemized_detail(&self, config: &LedgerConfig) -> String {
        let currency = &config.currency;
        self.settlements
            .iter()
            .map(|s| {
                format!(
                    "- {} | {} | {} -> {} | {} nights | gross {} | net {} | commission {}",
                    s.unit_name,
                    s.platform,
                    s.check_in.format("%d/%m/%Y"),
                    s.check_out.format("%d/%m/%Y"),
                    s.nights_in_window,
                    format_currency(s.gross_value, currency),
                    format_currency(s.net_value, currency),
                    format_currency(s.commission_value, currency),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn fee_percent_label(rate: f64) -> String {
    let pct = rate * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}", pct.round() as i64)
    } else {
        format!("{:.1}", pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn units() -> Vec<Unit> {
        vec![
            Unit::new(1, "Beach House").with_administration(20.0),
            Unit::new(2, "City Loft"),
            Unit::new(3, "Cabin").with_administration(10.0),
        ]
    }

    #[test]
    fn test_settle_splits_fee_and_commission() {
        let config = LedgerConfig::default();
        let allocator = CommissionAllocator::new(&config);
        let unit = Unit::new(1, "Beach House").with_administration(20.0);
        let stay = Stay::new(1, 1, d(2024, 1, 1), d(2024, 1, 11), 1000.0).unwrap();
        let window = DateWindow::for_month(2024, 1).unwrap();

        let settlement = allocator.settle(&unit, &stay, &window);
        assert_eq!(settlement.nights_in_window, 10);
        assert!((settlement.gross_value - 1000.0).abs() < 1e-9);
        assert!((settlement.net_value - 870.0).abs() < 1e-9);
        assert!((settlement.commission_value - 174.0).abs() < 1e-9);
    }

    #[test]
    fn test_commission_zero_without_administration() {
        let config = LedgerConfig::default();
        let allocator = CommissionAllocator::new(&config);
        let window = DateWindow::for_month(2024, 1).unwrap();
        let stay = Stay::new(1, 2, d(2024, 1, 1), d(2024, 1, 3), 200.0).unwrap();

        let plain = Unit::new(2, "City Loft");
        assert_eq!(allocator.settle(&plain, &stay, &window).commission_value, 0.0);

        let mut odd = Unit::new(2, "City Loft").with_administration(f64::NAN);
        assert_eq!(allocator.settle(&odd, &stay, &window).commission_value, 0.0);
        odd.administration_percentage = -5.0;
        assert_eq!(allocator.settle(&odd, &stay, &window).commission_value, 0.0);
    }

    #[test]
    fn test_report_filters_and_totals() {
        let config = LedgerConfig::default();
        let allocator = CommissionAllocator::new(&config);
        let stays = vec![
            Stay::new(1, 1, d(2024, 1, 30), d(2024, 2, 3), 400.0)
                .unwrap()
                .with_platform(Platform::Airbnb),
            Stay::new(2, 2, d(2024, 1, 10), d(2024, 1, 12), 500.0).unwrap(),
            Stay::new(3, 3, d(2024, 1, 5), d(2024, 1, 5), 100.0)
                .unwrap()
                .with_platform(Platform::Booking),
            Stay::new(4, 1, d(2024, 2, 1), d(2024, 2, 2), 90.0)
                .unwrap()
                .with_platform(Platform::Airbnb),
        ];

        let filter = CommissionFilter {
            month: Some(1),
            ..CommissionFilter::for_year(2024)
        };
        let report = allocator.report(&units(), &stays, &filter).unwrap();
        assert_eq!(report.settlements.len(), 2);
        assert_eq!(report.settlements[0].stay_id, 3);
        assert_eq!(report.nights, 3);
        assert!((report.gross_value - 300.0).abs() < 1e-9);
        assert!((report.net_value - 261.0).abs() < 1e-9);
        // 87 net on Cabin at 10% plus 174 net on Beach House at 20%.
        assert!((report.commission_value - (8.7 + 34.8)).abs() < 1e-9);

        let airbnb_only = CommissionFilter {
            platforms: Some([Platform::Airbnb].into_iter().collect()),
            ..CommissionFilter::for_year(2024)
        };
        let report = allocator.report(&units(), &stays, &airbnb_only).unwrap();
        assert_eq!(report.settlements.len(), 2);
        assert!((report.gross_value - 490.0).abs() < 1e-9);

        let bad_month = CommissionFilter {
            month: Some(13),
            ..CommissionFilter::for_year(2024)
        };
        assert!(allocator.report(&units(), &stays, &bad_month).is_err());
    }

    #[test]
    fn test_report_empty() {
        let config = LedgerConfig::default();
        let report = CommissionAllocator::new(&config)
            .report(&[], &[], &CommissionFilter::for_year(2024))
            .unwrap();
        assert!(report.settlements.is_empty());
        assert_eq!(report.commission_value, 0.0);
        assert!(report.itemized_detail(&config).is_empty());
    }

    #[test]
    fn test_messages() {
        let config = LedgerConfig::default();
        let stays = vec![Stay::new(1, 1, d(2024, 1, 1), d(2024, 1, 11), 1000.0)
            .unwrap()
            .with_platform(Platform::Airbnb)];
        let filter = CommissionFilter {
            month: Some(1),
            ..CommissionFilter::for_year(2024)
        };
        let report = CommissionAllocator::new(&config)
            .report(&units(), &stays, &filter)
            .unwrap();

        let message = report.summary_message(&config);
        assert!(message.starts_with("Administration report 01/01/2024 - 31/01/2024"));
        assert!(message.contains("Nights: 10"));
        assert!(message.contains("Net (-13%): R$ 870.00"));
        assert!(message.ends_with("Commission: R$ 174.00"));

        let detail = report.itemized_detail(&config);
        assert_eq!(
            detail,
            "- Beach House | Airbnb | 01/01/2024 -> 11/01/2024 | 10 nights | gross R$ 1,000.00 | net R$ 870.00 | commission R$ 174.00"
        );
        assert_eq!(fee_percent_label(0.125), "12.5");
    }
}
