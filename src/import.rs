//! Bulk import of stays from `;`-separated spreadsheet exports.
//!
//! Headers are matched case-insensitively against a list of aliases per
//! column, first alias wins. Only the unit and the two dates are required.
//! Rows that cannot be resolved are skipped and reported, never fatal.

use crate::error::{Result, StayLedgerError};
use crate::money::parse_amount;
use crate::schema::{validate_price, PaymentStatus, Platform, Stay, StayId, StaySpan, Unit, UnitId};
use crate::utils::normalize_key;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

const UNIT_ALIASES: &[&str] = &[
    "unidade", "unit", "nome_unidade", "apto", "apartamento", "imovel", "imóvel",
];
const CHECK_IN_ALIASES: &[&str] = &[
    "checkin", "check-in", "data_checkin", "entrada", "inicio", "início",
];
const CHECK_OUT_ALIASES: &[&str] = &[
    "checkout", "check-out", "data_checkout", "saida", "saída", "fim", "final",
];
const GUEST_ALIASES: &[&str] = &["hospede", "hóspede", "cliente", "nome_hospede", "guest"];
const AMOUNT_ALIASES: &[&str] = &["valor", "valor_total", "preco", "preço", "amount", "price"];
const PLATFORM_ALIASES: &[&str] = &["plataforma", "canal", "origem", "platform"];
const PAYMENT_ALIASES: &[&str] = &["status_pagamento", "pagamento", "status", "payment_status"];

// Two-digit years first: "%Y" would also accept "24" as the year 24.
const DATE_FORMATS: &[&str] = &["%d/%m/%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Whether imported stays are added to, or replace, the existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportMode {
    Append,
    Overwrite,
}

/// An imported stay that has not been given an identifier yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayDraft {
    pub unit_id: UnitId,
    pub span: StaySpan,
    pub guest: String,
    pub total_price: f64,
    pub platform: Platform,
    pub payment_status: PaymentStatus,
}

impl StayDraft {
    pub fn into_stay(self, id: StayId) -> Stay {
        Stay {
            id,
            unit_id: self.unit_id,
            span: self.span,
            guest: self.guest,
            total_price: self.total_price,
            platform: self.platform,
            payment_status: self.payment_status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    UnknownUnit(String),
    InvalidDate { column: String, value: String },
    InvalidRange(String),
    InvalidAmount(String),
    Malformed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownUnit(name) => write!(f, "unknown unit '{}'", name),
            Self::InvalidDate { column, value } => write!(f, "invalid {} date '{}'", column, value),
            Self::InvalidRange(details) => write!(f, "invalid range: {}", details),
            Self::InvalidAmount(value) => write!(f, "invalid amount '{}'", value),
            Self::Malformed(details) => write!(f, "malformed row: {}", details),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// 1-based line in the source, header included.
    pub line: usize,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportReport {
    /// Normalized header names as read from the file.
    pub columns: Vec<String>,
    pub drafts: Vec<StayDraft>,
    pub skipped: Vec<SkippedRow>,
}

impl ImportReport {
    pub fn inserted_count(&self) -> usize {
        self.drafts.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

struct ColumnMap {
    unit: usize,
    check_in: usize,
    check_out: usize,
    guest: Option<usize>,
    amount: Option<usize>,
    platform: Option<usize>,
    payment: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self> {
        let pick = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| headers.iter().position(|h| h == alias))
        };

        let unit = pick(UNIT_ALIASES);
        let check_in = pick(CHECK_IN_ALIASES);
        let check_out = pick(CHECK_OUT_ALIASES);

        match (unit, check_in, check_out) {
            (Some(unit), Some(check_in), Some(check_out)) => Ok(Self {
                unit,
                check_in,
                check_out,
                guest: pick(GUEST_ALIASES),
                amount: pick(AMOUNT_ALIASES),
                platform: pick(PLATFORM_ALIASES),
                payment: pick(PAYMENT_ALIASES),
            }),
            _ => {
                let missing = [("unit", unit), ("check-in", check_in), ("check-out", check_out)]
                    .iter()
                    .filter(|(_, idx)| idx.is_none())
                    .map(|(name, _)| name.to_string())
                    .collect();
                Err(StayLedgerError::MissingColumns(missing))
            }
        }
    }
}

pub struct StayImporter {
    units_by_name: HashMap<String, UnitId>,
}

impl StayImporter {
    pub fn new(units: &[Unit]) -> Self {
        Self {
            units_by_name: units
                .iter()
                .map(|u| (normalize_key(&u.name), u.id))
                .collect(),
        }
    }

    /// Accepts UTF-8 (with or without BOM) and falls back to Latin-1.
    pub fn import_bytes(&self, bytes: &[u8]) -> Result<ImportReport> {
        self.import_str(&decode_text(bytes))
    }

    pub fn import_str(&self, text: &str) -> Result<ImportReport> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        let map = ColumnMap::resolve(&columns)?;

        let mut report = ImportReport {
            columns,
            ..Default::default()
        };

        for (idx, record) in reader.records().enumerate() {
            let line = idx + 2;
            let outcome = record
                .map_err(|e| SkipReason::Malformed(e.to_string()))
                .and_then(|r| self.parse_row(&map, &r));
            match outcome {
                Ok(draft) => report.drafts.push(draft),
                Err(reason) => {
                    warn!("Skipping import line {}: {}", line, reason);
                    report.skipped.push(SkippedRow { line, reason });
                }
            }
        }

        info!(
            "Imported {} stays, skipped {} rows",
            report.inserted_count(),
            report.skipped_count()
        );
        Ok(report)
    }

    fn parse_row(&self, map: &ColumnMap, record: &StringRecord) -> std::result::Result<StayDraft, SkipReason> {
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let unit_name = field(Some(map.unit));
        let unit_id = *self
            .units_by_name
            .get(&normalize_key(unit_name))
            .ok_or_else(|| SkipReason::UnknownUnit(unit_name.to_string()))?;

        let check_in = parse_import_date(field(Some(map.check_in))).ok_or_else(|| {
            SkipReason::InvalidDate {
                column: "check-in".to_string(),
                value: field(Some(map.check_in)).to_string(),
            }
        })?;
        let check_out = parse_import_date(field(Some(map.check_out))).ok_or_else(|| {
            SkipReason::InvalidDate {
                column: "check-out".to_string(),
                value: field(Some(map.check_out)).to_string(),
            }
        })?;
        let span = StaySpan::from_dates(check_in, check_out)
            .map_err(|e| SkipReason::InvalidRange(e.to_string()))?;

        let raw_amount = field(map.amount);
        let total_price = parse_amount(raw_amount);
        validate_price(total_price).map_err(|_| SkipReason::InvalidAmount(raw_amount.to_string()))?;

        Ok(StayDraft {
            unit_id,
            span,
            guest: field(map.guest).to_string(),
            total_price,
            platform: Platform::from_text(field(map.platform)),
            payment_status: PaymentStatus::from_text(field(map.payment)),
        })
    }
}

pub fn import_stays_csv(text: &str, units: &[Unit]) -> Result<ImportReport> {
    StayImporter::new(units).import_str(text)
}

/// Day-first dates as typed in spreadsheets, or ISO. A trailing time is ignored.
pub fn parse_import_date(text: &str) -> Option<NaiveDate> {
    let date_part = text.split_whitespace().next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
