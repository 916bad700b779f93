use chrono::{DateTime, Utc};
use tracing::warn;

use super::{events::ChangeKind, valid_quantity, Budget, LeafCost, LineId, LineKind, LineOptions};
use crate::errors::{BudgetError, BudgetResult};

impl Budget {
    /// Sets the title; a blank title falls back to the generated default.
    pub fn set_title(&mut self, id: LineId, title: &str) -> BudgetResult<()> {
        self.require(id)?;
        let trimmed = title.trim();
        self.node_mut(id).title = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self.field_written(id, "title");
        Ok(())
    }

    pub fn set_unit_number(&mut self, id: LineId, unit_number: f64) -> BudgetResult<()> {
        if !valid_quantity(unit_number) {
            return Err(self.reject_value(id, "unit_number", unit_number));
        }
        self.leaf_mut(id)?.unit_number = unit_number;
        self.field_written(id, "unit_number");
        Ok(())
    }

    /// Sets the unit type; lump-sum types pin `unit_number` to 1.
    pub fn set_unit_type(&mut self, id: LineId, unit_type: &str) -> BudgetResult<()> {
        let lumpsum = self.config.is_lumpsum(unit_type);
        let cost = self.leaf_mut(id)?;
        cost.unit_type = unit_type.to_string();
        if lumpsum {
            cost.unit_number = 1.0;
        }
        self.field_written(id, "unit_type");
        Ok(())
    }

    pub fn set_unit_cost(&mut self, id: LineId, unit_cost: f64) -> BudgetResult<()> {
        if !unit_cost.is_finite() {
            return Err(self.reject_value(id, "unit_cost", unit_cost));
        }
        self.leaf_mut(id)?.unit_cost = unit_cost;
        self.field_written(id, "unit_cost");
        Ok(())
    }

    /// Sets the currency of `unit_cost`; `None` follows the line currency.
    pub fn set_unit_currency(&mut self, id: LineId, code: Option<&str>) -> BudgetResult<()> {
        let index = self.require(id)?;
        let currency = match code {
            Some(code) => Some(self.check_currency(code, &index)?),
            None => None,
        };
        self.leaf_mut(id)?.unit_currency = currency;
        self.field_written(id, "unit_currency");
        Ok(())
    }

    pub fn set_frequency(&mut self, id: LineId, frequency: u32) -> BudgetResult<()> {
        if frequency == 0 {
            return Err(self.reject_value(id, "frequency", frequency));
        }
        self.leaf_mut(id)?.frequency = frequency;
        self.field_written(id, "frequency");
        Ok(())
    }

    /// Sets the line currency. Unknown codes are rejected and nothing changes.
    pub fn set_currency(&mut self, id: LineId, code: &str) -> BudgetResult<()> {
        let index = self.require(id)?;
        let currency = self.check_currency(code, &index)?;
        self.node_mut(id).currency = currency;
        self.field_written(id, "currency");
        Ok(())
    }

    pub fn set_start(&mut self, id: LineId, start: DateTime<Utc>) -> BudgetResult<()> {
        self.leaf_mut(id)?;
        self.node_mut(id).start = start;
        self.field_written(id, "start");
        Ok(())
    }

    pub fn set_end(&mut self, id: LineId, end: DateTime<Utc>) -> BudgetResult<()> {
        self.leaf_mut(id)?;
        self.node_mut(id).end = end;
        self.field_written(id, "end");
        Ok(())
    }

    /// Applies every set field of `options` in one step.
    ///
    /// Fields are validated first; on any rejection nothing is written.
    pub fn update(&mut self, id: LineId, options: LineOptions) -> BudgetResult<()> {
        let index = self.require(id)?;
        let is_leaf = matches!(self.node(id).kind, LineKind::Leaf(_));
        let touches_leaf =
            options.has_cost_inputs() || options.start.is_some() || options.end.is_some();
        if touches_leaf && !is_leaf {
            warn!(line = %index, "Cost inputs rejected on a line with children");
            return Err(BudgetError::NotALeaf(index));
        }
        if let Some(value) = options.unit_number.filter(|value| !valid_quantity(*value)) {
            return Err(self.reject_value(id, "unit_number", value));
        }
        if let Some(value) = options.unit_cost.filter(|value| !value.is_finite()) {
            return Err(self.reject_value(id, "unit_cost", value));
        }
        if options.frequency == Some(0) {
            return Err(self.reject_value(id, "frequency", 0));
        }
        let currency = match options.currency.as_deref() {
            Some(code) => Some(self.check_currency(code, &index)?),
            None => None,
        };
        let unit_currency = match options.unit_currency.as_deref() {
            Some(code) => Some(self.check_currency(code, &index)?),
            None => None,
        };

        let lumpsum = options
            .unit_type
            .as_deref()
            .map_or(false, |unit_type| self.config.is_lumpsum(unit_type));
        let node = self.node_mut(id);
        if let Some(title) = options.title {
            let trimmed = title.trim();
            node.title = (!trimmed.is_empty()).then(|| trimmed.to_string());
        }
        if let Some(currency) = currency {
            node.currency = currency;
        }
        if let Some(start) = options.start {
            node.start = start;
        }
        if let Some(end) = options.end {
            node.end = end;
        }
        if let Some(created) = options.created {
            node.created = created;
        }
        for tag in options.category {
            if !node.category.contains(&tag) {
                node.category.push(tag);
            }
        }
        if let LineKind::Leaf(cost) = &mut node.kind {
            if let Some(unit_number) = options.unit_number {
                cost.unit_number = unit_number;
            }
            if let Some(unit_type) = options.unit_type {
                cost.unit_type = unit_type;
            }
            if lumpsum {
                cost.unit_number = 1.0;
            }
            if let Some(unit_cost) = options.unit_cost {
                cost.unit_cost = unit_cost;
            }
            if unit_currency.is_some() {
                cost.unit_currency = unit_currency;
            }
            if let Some(frequency) = options.frequency {
                cost.frequency = frequency;
            }
        }
        node.modified = options.modified.unwrap_or_else(Utc::now);
        self.notify(id, ChangeKind::Field("update"));
        Ok(())
    }

    fn leaf_mut(&mut self, id: LineId) -> BudgetResult<&mut LeafCost> {
        let index = self.require(id)?;
        match &mut self.node_mut(id).kind {
            LineKind::Leaf(cost) => Ok(cost),
            LineKind::Group => {
                warn!(line = %index, "Cost inputs rejected on a line with children");
                Err(BudgetError::NotALeaf(index))
            }
        }
    }

    fn reject_value(
        &self,
        id: LineId,
        field: &'static str,
        value: impl std::fmt::Display,
    ) -> BudgetError {
        let index = self
            .line(id)
            .map(|line| line.index().to_string())
            .unwrap_or_default();
        warn!(line = %index, field, value = %value, "Rejected field value");
        BudgetError::InvalidValue {
            field,
            reason: format!("{} is not accepted", value),
        }
    }

    fn field_written(&mut self, id: LineId, field: &'static str) {
        self.touch(id);
        self.notify(id, ChangeKind::Field(field));
    }
}
