use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{events::ChangeKind, Budget, LineId};
use crate::{
    currency::CurrencyCode,
    errors::{BudgetError, BudgetResult},
};

/// Percentage surcharge owned by one line.
///
/// Overheads compound in sequence order: each one is charged on the line's
/// pre-overhead total plus every overhead before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overhead {
    pub title: String,
    /// Decimal fraction, `0.2` is 20%.
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
}

impl Overhead {
    pub fn new(title: impl Into<String>, percentage: f64) -> Self {
        Self {
            title: title.into(),
            percentage,
            currency: None,
        }
    }

    pub fn with_currency(mut self, code: impl Into<CurrencyCode>) -> Self {
        self.currency = Some(code.into());
        self
    }
}

/// Computed amounts of one overhead, rounded for display.
#[derive(Debug, Clone, PartialEq)]
pub struct OverheadAmount {
    pub title: String,
    pub percentage: f64,
    pub currency: CurrencyCode,
    /// What the percentage applies to, in the line's currency.
    pub base_total: f64,
    /// Charged amount, in `currency`.
    pub total: f64,
}

/// Partial change to an existing overhead.
#[derive(Debug, Clone, Default)]
pub struct OverheadUpdate {
    pub title: Option<String>,
    pub percentage: Option<f64>,
    pub currency: Option<String>,
}

impl Budget {
    /// Appends an overhead and returns its 1-based position.
    pub fn add_overhead(&mut self, id: LineId, overhead: Overhead) -> BudgetResult<usize> {
        let index = self.require(id)?;
        check_percentage(overhead.percentage, &index)?;
        if let Some(code) = overhead.currency.as_ref() {
            self.check_currency(code.as_str(), &index)?;
        }
        let node = self.node_mut(id);
        node.overhead.push(overhead);
        let position = node.overhead.len();
        self.touch(id);
        self.announce(format!("Overhead {} added to line {}", position, index));
        self.notify(id, ChangeKind::Overhead);
        Ok(position)
    }

    pub fn remove_overhead(&mut self, id: LineId, position: usize) -> BudgetResult<Overhead> {
        let index = self.require(id)?;
        let slot = self.overhead_slot(id, position, &index)?;
        let removed = self.node_mut(id).overhead.remove(slot);
        self.touch(id);
        self.announce(format!("Overhead {} from line {} deleted", position, index));
        self.notify(id, ChangeKind::Overhead);
        Ok(removed)
    }

    pub fn update_overhead(
        &mut self,
        id: LineId,
        position: usize,
        update: OverheadUpdate,
    ) -> BudgetResult<()> {
        let index = self.require(id)?;
        let slot = self.overhead_slot(id, position, &index)?;
        if let Some(percentage) = update.percentage {
            check_percentage(percentage, &index)?;
        }
        if let Some(code) = update.currency.as_deref() {
            self.check_currency(code, &index)?;
        }
        let overhead = &mut self.node_mut(id).overhead[slot];
        if let Some(title) = update.title {
            overhead.title = title;
        }
        if let Some(percentage) = update.percentage {
            overhead.percentage = percentage;
        }
        if let Some(code) = update.currency {
            overhead.currency = Some(CurrencyCode::new(code));
        }
        self.touch(id);
        self.notify(id, ChangeKind::Overhead);
        Ok(())
    }

    /// Swaps the overhead at `position` with the one before it.
    pub fn move_overhead_up(&mut self, id: LineId, position: usize) -> BudgetResult<()> {
        let index = self.require(id)?;
        let slot = self.overhead_slot(id, position, &index)?;
        if slot == 0 {
            warn!(line = %index, position, "Overhead is already first");
            return Err(BudgetError::InvalidValue {
                field: "overhead position",
                reason: format!("overhead {} of line {} is already first", position, index),
            });
        }
        self.swap_overheads(id, slot - 1, slot);
        Ok(())
    }

    /// Swaps the overhead at `position` with the one after it.
    pub fn move_overhead_down(&mut self, id: LineId, position: usize) -> BudgetResult<()> {
        let index = self.require(id)?;
        let slot = self.overhead_slot(id, position, &index)?;
        if slot + 1 >= self.node(id).overhead.len() {
            warn!(line = %index, position, "Overhead is already last");
            return Err(BudgetError::InvalidValue {
                field: "overhead position",
                reason: format!("overhead {} of line {} is already last", position, index),
            });
        }
        self.swap_overheads(id, slot, slot + 1);
        Ok(())
    }

    fn swap_overheads(&mut self, id: LineId, first: usize, second: usize) {
        self.node_mut(id).overhead.swap(first, second);
        self.touch(id);
        self.notify(id, ChangeKind::Overhead);
    }

    fn overhead_slot(&self, id: LineId, position: usize, index: &str) -> BudgetResult<usize> {
        let count = self.node(id).overhead.len();
        if position == 0 || position > count {
            warn!(line = %index, position, "Line has no overhead at this position");
            return Err(BudgetError::OverheadNotFound {
                index: index.to_string(),
                position,
            });
        }
        Ok(position - 1)
    }
}

fn check_percentage(percentage: f64, index: &str) -> BudgetResult<()> {
    if percentage.is_finite() {
        return Ok(());
    }
    warn!(line = %index, percentage, "Rejected overhead percentage");
    Err(BudgetError::InvalidValue {
        field: "percentage",
        reason: format!("{} is not a finite number", percentage),
    })
}
