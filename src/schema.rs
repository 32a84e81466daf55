use crate::error::{Result, StayLedgerError};
use crate::utils::{days_between, normalize_key};
use chrono::{Days, NaiveDate};
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

pub type UnitId = i64;
pub type StayId = i64;
pub type ExpenseId = i64;
pub type PriceId = i64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum UnitStatus {
    #[schemars(description = "Free to be booked")]
    Available,
    #[schemars(description = "Currently hosting a guest")]
    Occupied,
    #[schemars(description = "Blocked for repairs or cleaning")]
    Maintenance,
}

impl UnitStatus {
    /// Lenient parse of a stored status label. Unknown labels read as `Available`.
    pub fn from_text(text: &str) -> Self {
        match normalize_key(text).as_str() {
            "ocupado" | "occupied" => Self::Occupied,
            "manutencao" | "maintenance" => Self::Maintenance,
            _ => Self::Available,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Unit {
    pub id: UnitId,
    #[schemars(description = "Display name. Imports and filters join on it, so it must be unique.")]
    pub name: String,
    pub location: String,
    pub capacity: u32,
    pub status: UnitStatus,
    #[schemars(description = "True when the unit is managed by an external administrator")]
    pub administered: bool,
    #[schemars(description = "Administrator commission, 0 to 100. Only meaningful when administered.")]
    pub administration_percentage: f64,
}

impl Unit {
    pub fn new(id: UnitId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            location: String::new(),
            capacity: 1,
            status: UnitStatus::Available,
            administered: false,
            administration_percentage: 0.0,
        }
    }

    pub fn with_administration(mut self, percentage: f64) -> Self {
        self.administered = true;
        self.administration_percentage = percentage;
        self
    }

    /// Percentage the administrator keeps, in `0.0..=100.0`.
    ///
    /// Zero unless the unit is administered with a finite, positive percentage.
    pub fn effective_administration_percentage(&self) -> f64 {
        let pct = self.administration_percentage;
        if !self.administered || !pct.is_finite() || pct <= 0.0 {
            0.0
        } else {
            pct.min(100.0)
        }
    }
}

/// The occupied span of a booking.
///
/// Multi-night stays always have `check_out > check_in`; single-day bookings
/// are their own variant instead of an inverted or collapsed range.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StaySpan {
    Nights {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    DayUse {
        day: NaiveDate,
    },
}

impl StaySpan {
    /// Classifies a raw check-in/check-out pair.
    ///
    /// A check-out equal to the check-in, or exactly one day before it, is a
    /// day-use on the check-in date. Anything further reversed is rejected.
    pub fn from_dates(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self> {
        match days_between(check_in, check_out) {
            n if n > 0 => Ok(Self::Nights {
                check_in,
                check_out,
            }),
            0 | -1 => Ok(Self::DayUse { day: check_in }),
            _ => Err(StayLedgerError::InvalidStay {
                check_in,
                check_out,
                details: "check-out is more than one day before check-in".to_string(),
            }),
        }
    }

    /// A multi-night span. Unlike [`StaySpan::from_dates`] nothing is
    /// reinterpreted: `check_out` must come after `check_in`.
    pub fn nights(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self> {
        if check_out <= check_in {
            return Err(StayLedgerError::InvalidStay {
                check_in,
                check_out,
                details: "a multi-night stay must check out after it checks in".to_string(),
            });
        }
        Ok(Self::Nights {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        match *self {
            Self::Nights { check_in, .. } => check_in,
            Self::DayUse { day } => day,
        }
    }

    pub fn check_out(&self) -> NaiveDate {
        match *self {
            Self::Nights { check_out, .. } => check_out,
            Self::DayUse { day } => day,
        }
    }

    pub fn is_day_use(&self) -> bool {
        matches!(self, Self::DayUse { .. })
    }

    /// Billable night count. A day-use counts as one.
    pub fn night_count(&self) -> u64 {
        match *self {
            Self::Nights {
                check_in,
                check_out,
            } => days_between(check_in, check_out).max(0) as u64,
            Self::DayUse { .. } => 1,
        }
    }

    /// Every date carrying occupancy: `[check_in, check_out - 1]` for nights,
    /// the single day for day-use.
    pub fn occupied_dates(&self) -> impl Iterator<Item = NaiveDate> {
        self.check_in().iter_days().take(self.night_count() as usize)
    }

    /// The last occupied date.
    pub fn last_night(&self) -> NaiveDate {
        match *self {
            Self::Nights { check_out, .. } => check_out
                .checked_sub_days(Days::new(1))
                .unwrap_or(check_out),
            Self::DayUse { day } => day,
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum UncheckedSpan {
    Nights {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },
    DayUse {
        day: NaiveDate,
    },
}

impl<'de> Deserialize<'de> for StaySpan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match UncheckedSpan::deserialize(deserializer)? {
            UncheckedSpan::Nights {
                check_in,
                check_out,
            } => StaySpan::nights(check_in, check_out).map_err(de::Error::custom),
            UncheckedSpan::DayUse { day } => Ok(StaySpan::DayUse { day }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Airbnb,
    Booking,
    Direct,
    Other(String),
}

impl Platform {
    pub fn from_text(text: &str) -> Self {
        match normalize_key(text).as_str() {
            "airbnb" => Self::Airbnb,
            "booking" | "booking.com" => Self::Booking,
            "" | "direto" | "direct" => Self::Direct,
            _ => Self::Other(text.trim().to_string()),
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::Direct
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Airbnb => write!(f, "Airbnb"),
            Self::Booking => write!(f, "Booking"),
            Self::Direct => write!(f, "Direct"),
            Self::Other(name) => write!(f, "{}", name),
        }
    }
}

impl From<String> for Platform {
    fn from(value: String) -> Self {
        Self::from_text(&value)
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn from_text(text: &str) -> Self {
        match normalize_key(text).as_str() {
            "pago" | "paid" => Self::Paid,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, JsonSchema)]
pub struct Stay {
    pub id: StayId,
    pub unit_id: UnitId,
    pub span: StaySpan,
    pub guest: String,
    #[schemars(description = "Amount for the whole stay, not per night")]
    pub total_price: f64,
    #[schemars(with = "String")]
    pub platform: Platform,
    pub payment_status: PaymentStatus,
}

impl Stay {
    pub fn new(
        id: StayId,
        unit_id: UnitId,
        check_in: NaiveDate,
        check_out: NaiveDate,
        total_price: f64,
    ) -> Result<Self> {
        validate_price(total_price)?;
        Ok(Self {
            id,
            unit_id,
            span: StaySpan::from_dates(check_in, check_out)?,
            guest: String::new(),
            total_price,
            platform: Platform::Direct,
            payment_status: PaymentStatus::Pending,
        })
    }

    pub fn with_guest(mut self, guest: impl Into<String>) -> Self {
        self.guest = guest.into();
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = status;
        self
    }

    pub fn check_in(&self) -> NaiveDate {
        self.span.check_in()
    }

    pub fn check_out(&self) -> NaiveDate {
        self.span.check_out()
    }

    pub fn is_day_use(&self) -> bool {
        self.span.is_day_use()
    }
}

#[derive(Deserialize)]
struct UncheckedStay {
    id: StayId,
    unit_id: UnitId,
    span: StaySpan,
    guest: String,
    total_price: f64,
    platform: Platform,
    payment_status: PaymentStatus,
}

impl<'de> Deserialize<'de> for Stay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = UncheckedStay::deserialize(deserializer)?;
        validate_price(raw.total_price).map_err(de::Error::custom)?;
        Ok(Stay {
            id: raw.id,
            unit_id: raw.unit_id,
            span: raw.span,
            guest: raw.guest,
            total_price: raw.total_price,
            platform: raw.platform,
            payment_status: raw.payment_status,
        })
    }
}

pub(crate) fn validate_price(total_price: f64) -> Result<()> {
    if !total_price.is_finite() || total_price < 0.0 {
        return Err(StayLedgerError::InvalidPrice(total_price));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum ExpenseType {
    #[schemars(description = "Rent or financing installment")]
    Installment,
    CondoFee,
    Electricity,
    Internet,
    Gas,
    #[schemars(description = "Fee paid to the administrator")]
    Administration,
    Cleaning,
    Maintenance,
    Supplies,
    Other,
}

impl ExpenseType {
    pub const ALL: [ExpenseType; 10] = [
        Self::Installment,
        Self::CondoFee,
        Self::Electricity,
        Self::Internet,
        Self::Gas,
        Self::Administration,
        Self::Cleaning,
        Self::Maintenance,
        Self::Supplies,
        Self::Other,
    ];

    pub fn from_text(text: &str) -> Self {
        match normalize_key(text).as_str() {
            "prestacao" | "installment" | "rent" | "aluguel" => Self::Installment,
            "condominio" | "condo" | "condo fee" => Self::CondoFee,
            "luz" | "energia" | "electricity" => Self::Electricity,
            "internet" => Self::Internet,
            "gas" => Self::Gas,
            "administradora" | "administration" => Self::Administration,
            "limpeza" | "cleaning" => Self::Cleaning,
            "manutencao" | "maintenance" => Self::Maintenance,
            "insumos" | "supplies" => Self::Supplies,
            _ => Self::Other,
        }
    }

    pub fn is_utility(&self) -> bool {
        matches!(self, Self::Electricity | Self::Internet | Self::Gas)
    }
}

impl fmt::Display for ExpenseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Installment => "Installment",
            Self::CondoFee => "Condo fee",
            Self::Electricity => "Electricity",
            Self::Internet => "Internet",
            Self::Gas => "Gas",
            Self::Administration => "Administration",
            Self::Cleaning => "Cleaning",
            Self::Maintenance => "Maintenance",
            Self::Supplies => "Supplies",
            Self::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Expense {
    pub id: ExpenseId,
    pub unit_id: UnitId,
    pub date: NaiveDate,
    pub expense_type: ExpenseType,
    pub amount: f64,
    pub description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum Season {
    Low,
    Medium,
    High,
}

impl Season {
    pub fn from_text(text: &str) -> Option<Self> {
        match normalize_key(text).as_str() {
            "baixa" | "low" => Some(Self::Low),
            "media" | "medium" => Some(Self::Medium),
            "alta" | "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct SeasonalPrice {
    pub id: PriceId,
    pub unit_id: UnitId,
    pub season: Season,
    pub base_price: f64,
}
