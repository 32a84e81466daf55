use crate::error::{Result, StayLedgerError};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// An inclusive calendar range `[start, end]`.
///
/// Construction enforces `start <= end`, so every aggregation that accepts a
/// `DateWindow` can rely on a non-empty range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(StayLedgerError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn for_year(year: i32) -> Result<Self> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| StayLedgerError::DateError(format!("Year {} is out of range", year)))?;
        let end = last_day_of_month(year, 12)?;
        Self::new(start, end)
    }

    pub fn for_month(year: i32, month: u32) -> Result<Self> {
        validate_month(month)?;
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            StayLedgerError::DateError(format!("{:04}-{:02} is out of range", year, month))
        })?;
        let end = last_day_of_month(year, month)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days in the window, both ends included.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.len_days() as usize)
    }

    /// Zero-based position of `date` inside the window.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        if self.contains(date) {
            Some((date - self.start).num_days() as usize)
        } else {
            None
        }
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    validate_month(month)?;
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| {
            StayLedgerError::DateError(format!("{:04}-{:02} is out of range", year, month))
        })
}

pub fn validate_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(StayLedgerError::InvalidMonth(month));
    }
    Ok(())
}

pub fn month_label(month: u32) -> &'static str {
    MONTH_LABELS
        .get(month.wrapping_sub(1) as usize)
        .copied()
        .unwrap_or("")
}

/// Signed day difference `to - from`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// `(year, month)` bucket key for a date.
pub fn year_month(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}

/// Comparison key for free text typed by people: trimmed, lowercased, with
/// Latin diacritics folded ("Apartamento Praia" == " apartamento práia").
pub fn normalize_key(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            'ý' | 'ÿ' => 'y',
            other => other,
        })
        .collect()
}

/// Parses a period string in the format "YYYY", "YYYY-MM" or "YYYY-MM:YYYY-MM"
/// into the window covering those whole months.
pub fn parse_period_string(period: &str) -> Result<DateWindow> {
    let parts: Vec<&str> = period.split(':').map(str::trim).collect();

    match parts.as_slice() {
        [single] if !single.contains('-') => {
            let year: i32 = single.parse().map_err(|_| {
                StayLedgerError::DateError(format!(
                    "Invalid year in period: {}. Expected YYYY",
                    single
                ))
            })?;
            DateWindow::for_year(year)
        }
        [single] => {
            let start = parse_month_start(single)?;
            DateWindow::for_month(start.year(), start.month())
        }
        [from, to] => {
            let start = parse_month_start(from)?;
            let end_ref = parse_month_start(to)?;
            let end = last_day_of_month(end_ref.year(), end_ref.month())?;
            DateWindow::new(start, end)
        }
        _ => Err(StayLedgerError::DateError(format!(
            "Invalid period format: {}. Expected 'YYYY', 'YYYY-MM' or 'YYYY-MM:YYYY-MM'",
            period
        ))),
    }
}

fn parse_month_start(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d").map_err(|_| {
        StayLedgerError::DateError(format!(
            "Invalid date format in period: {}. Expected YYYY-MM",
            text
        ))
    })
}
