use crate::error::{Result, StayLedgerError};
use crate::import::{ImportMode, ImportReport, StayDraft};
use crate::schema::{Expense, ExpenseId, SeasonalPrice, Stay, StayId, Unit, UnitId};
use crate::utils::normalize_key;
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everything the dashboard reads, loaded once per refresh.
///
/// The edit operations only change this in-memory copy. The storage adapter
/// mirrors them to its tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerSnapshot {
    pub units: Vec<Unit>,
    pub stays: Vec<Stay>,
    pub expenses: Vec<Expense>,
    pub prices: Vec<SeasonalPrice>,
}

impl LedgerSnapshot {
    pub fn new(
        units: Vec<Unit>,
        stays: Vec<Stay>,
        expenses: Vec<Expense>,
        prices: Vec<SeasonalPrice>,
    ) -> Self {
        Self {
            units,
            stays,
            expenses,
            prices,
        }
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(LedgerSnapshot)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Case- and accent-insensitive lookup.
    pub fn unit_by_name(&self, name: &str) -> Option<&Unit> {
        let key = normalize_key(name);
        self.units.iter().find(|u| normalize_key(&u.name) == key)
    }

    pub fn stays_for_unit(&self, unit_id: UnitId) -> impl Iterator<Item = &Stay> {
        self.stays.iter().filter(move |s| s.unit_id == unit_id)
    }

    fn next_stay_id(&self) -> StayId {
        self.stays.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }

    fn next_expense_id(&self) -> ExpenseId {
        self.expenses.iter().map(|e| e.id).max().unwrap_or(0) + 1
    }

    /// Appends drafts with fresh ids and returns the ids given out.
    pub fn add_stays(&mut self, drafts: Vec<StayDraft>) -> Vec<StayId> {
        let first = self.next_stay_id();
        let ids: Vec<StayId> = (first..).take(drafts.len()).collect();
        self.stays.extend(
            drafts
                .into_iter()
                .zip(ids.iter())
                .map(|(draft, id)| draft.into_stay(*id)),
        );
        debug!("Added {} stays starting at id {}", ids.len(), first);
        ids
    }

    /// Drops every stay and inserts the drafts numbered from 1.
    pub fn replace_stays(&mut self, drafts: Vec<StayDraft>) -> Vec<StayId> {
        let removed = self.stays.len();
        self.stays.clear();
        let ids = self.add_stays(drafts);
        debug!("Replaced {} stays with {}", removed, ids.len());
        ids
    }

    pub fn apply_import(&mut self, report: ImportReport, mode: ImportMode) -> Vec<StayId> {
        let skipped = report.skipped_count();
        let ids = match mode {
            ImportMode::Append => self.add_stays(report.drafts),
            ImportMode::Overwrite => self.replace_stays(report.drafts),
        };
        info!(
            "Applied import ({:?}): {} stays inserted, {} rows skipped",
            mode,
            ids.len(),
            skipped
        );
        ids
    }

    /// Copies an expense under a new id, keeping date, unit, type and amount.
    pub fn duplicate_expense(&mut self, id: ExpenseId) -> Result<ExpenseId> {
        let original = self
            .expenses
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(StayLedgerError::ExpenseNotFound(id))?;
        let new_id = self.next_expense_id();
        self.expenses.push(Expense {
            id: new_id,
            ..original
        });
        debug!("Duplicated expense {} as {}", id, new_id);
        Ok(new_id)
    }

    /// Removes a unit that nothing references any more.
    pub fn remove_unit(&mut self, id: UnitId) -> Result<Unit> {
        let position = self
            .units
            .iter()
            .position(|u| u.id == id)
            .ok_or(StayLedgerError::UnitNotFound(id))?;

        let stays = self.stays.iter().filter(|s| s.unit_id == id).count();
        let expenses = self.expenses.iter().filter(|e| e.unit_id == id).count();
        let prices = self.prices.iter().filter(|p| p.unit_id == id).count();
        if stays + expenses + prices > 0 {
            return Err(StayLedgerError::UnitInUse {
                unit_id: id,
                stays,
                expenses,
                prices,
            });
        }

        info!("Removing unit {}", id);
        Ok(self.units.remove(position))
    }
}
