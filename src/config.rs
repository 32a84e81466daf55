use crate::error::{Result, StayLedgerError};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyFormat {
    pub symbol: String,
    pub decimal_places: usize,
}

impl Default for CurrencyFormat {
    fn default() -> Self {
        Self {
            symbol: "R$".to_string(),
            decimal_places: 2,
        }
    }
}

/// Knobs shared by the occupancy, commission and formatting components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Fraction withheld by the booking platform and taxes before any split.
    pub platform_fee_rate: f64,
    pub currency: CurrencyFormat,
    /// How far ahead the upcoming check-in/check-out list looks.
    pub upcoming_horizon_days: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            platform_fee_rate: 0.13,
            currency: CurrencyFormat::default(),
            upcoming_horizon_days: 7,
        }
    }
}

impl LedgerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.platform_fee_rate) {
            return Err(StayLedgerError::InvalidConfig(format!(
                "platform_fee_rate {} must be between 0.0 and 1.0",
                self.platform_fee_rate
            )));
        }
        if self.currency.decimal_places > 6 {
            return Err(StayLedgerError::InvalidConfig(format!(
                "decimal_places {} must be at most 6",
                self.currency.decimal_places
            )));
        }
        Ok(())
    }

    /// Share of the gross that remains after the platform fee.
    pub fn net_factor(&self) -> f64 {
        1.0 - self.platform_fee_rate
    }

    pub fn net_of_fee(&self, gross: f64) -> f64 {
        gross * self.net_factor()
    }
}
