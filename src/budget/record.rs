use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Budget, Line, LineId, LineKind, LineOptions, Overhead};
use crate::{
    config::Config,
    currency::{CurrencyCode, CurrencyResolver},
    errors::{BudgetError, BudgetResult},
};

/// Plain nested representation of a line and its subtree.
///
/// This is the interchange format for persistence and export. `index`,
/// `cost` and `total` are informational and ignored on import; leaf inputs
/// are omitted for lines with children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineRecord {
    #[serde(default)]
    pub index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_currency: Option<CurrencyCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<CurrencyCode>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub start: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub end: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub created: Option<DateTime<Utc>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overhead: Vec<Overhead>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LineRecord>,
}

impl LineRecord {
    /// Depth of the subtree described by this record; 0 without children.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn options(&self) -> LineOptions {
        let leaf = self.children.is_empty();
        LineOptions {
            title: self.title.clone(),
            unit_number: self.unit_number.filter(|_| leaf),
            unit_type: self.unit_type.clone().filter(|_| leaf),
            unit_cost: self.unit_cost.filter(|_| leaf),
            unit_currency: self
                .unit_currency
                .as_ref()
                .filter(|_| leaf)
                .map(|code| code.0.clone()),
            frequency: self.frequency.filter(|_| leaf),
            currency: self.currency.as_ref().map(|code| code.0.clone()),
            start: self.start,
            end: self.end,
            created: self.created,
            modified: self.modified,
            category: self.category.clone(),
        }
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl<'a> Line<'a> {
    /// Produces the record for this line and everything below it.
    pub fn export_record(&self) -> LineRecord {
        let leaf = self.kind().leaf();
        LineRecord {
            index: self.index().to_string(),
            title: Some(self.title()),
            unit_number: leaf.map(|cost| cost.unit_number),
            unit_type: leaf.map(|cost| cost.unit_type.clone()),
            unit_cost: leaf.map(|cost| cost.unit_cost),
            unit_currency: leaf.and_then(|cost| cost.unit_currency.clone()),
            frequency: leaf.map(|cost| cost.frequency),
            cost: leaf.and_then(|_| finite(self.cost())),
            total: finite(self.total()),
            currency: Some(self.currency().clone()),
            start: Some(self.start()),
            end: Some(self.end()),
            created: Some(self.created()),
            modified: Some(self.modified()),
            category: self.category().to_vec(),
            overhead: self.overhead().to_vec(),
            children: self.children().map(|child| child.export_record()).collect(),
        }
    }
}

impl Budget {
    /// Rebuilds a budget from a record, validating currencies on the way.
    ///
    /// A record nested deeper than the configured levels is rejected whole.
    pub fn from_record(
        record: &LineRecord,
        config: Config,
        resolver: Rc<dyn CurrencyResolver>,
    ) -> BudgetResult<Self> {
        let max_level = config.max_level();
        let depth = record.depth();
        if depth > max_level {
            warn!(depth, max_level, "Record is nested deeper than the maximum level");
            return Err(BudgetError::DepthExceeded {
                index: record.index.clone(),
                target: "0".into(),
                max_level,
            });
        }
        let mut budget = Self::new(record.options(), config, resolver);
        let root = budget.root;
        budget.restore_details(root, record);
        Ok(budget)
    }

    pub fn from_json(
        json: &str,
        config: Config,
        resolver: Rc<dyn CurrencyResolver>,
    ) -> BudgetResult<Self> {
        let record: LineRecord = serde_json::from_str(json)?;
        Self::from_record(&record, config, resolver)
    }

    pub fn export_record(&self, id: LineId) -> BudgetResult<LineRecord> {
        self.line(id)
            .map(|line| line.export_record())
            .ok_or_else(|| BudgetError::LineNotFound(format!("{:?}", id.0)))
    }

    pub fn to_json(&self, id: LineId) -> BudgetResult<String> {
        Ok(serde_json::to_string_pretty(&self.export_record(id)?)?)
    }

    /// Inserts the subtree described by `record` into the arena, detached.
    ///
    /// The caller links the returned line into its parent's children.
    pub(crate) fn insert_record(&mut self, record: &LineRecord, parent: LineId) -> LineId {
        let fallback = self.config.default_currency.clone();
        let node = self.build_node(record.options(), fallback, None, Some(parent));
        let id = LineId(self.arena.insert(node));
        self.restore_details(id, record);
        id
    }

    fn restore_details(&mut self, id: LineId, record: &LineRecord) {
        for overhead in &record.overhead {
            if !overhead.percentage.is_finite() {
                warn!(title = %overhead.title, "Skipping overhead without a finite percentage");
                continue;
            }
            let mut overhead = overhead.clone();
            if let Some(code) = overhead.currency.as_ref() {
                if !self.resolver.is_valid_currency(code.as_str()) {
                    warn!(currency = %code, "Unknown overhead currency ignored");
                    overhead.currency = None;
                }
            }
            self.node_mut(id).overhead.push(overhead);
        }
        if record.children.is_empty() {
            return;
        }
        self.node_mut(id).kind = LineKind::Group;
        for child in &record.children {
            let child_id = self.insert_record(child, id);
            self.node_mut(id).children.push(child_id);
        }
    }
}
