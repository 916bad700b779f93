use chrono::{DateTime, Utc};
use generational_arena::Index;

use super::overhead::Overhead;
use crate::currency::CurrencyCode;

/// Handle to a line stored in a [`super::Budget`].
///
/// Handles of removed lines go stale and resolve to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineId(pub(crate) Index);

/// Direct cost inputs carried by a line without children.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafCost {
    pub unit_number: f64,
    pub unit_type: String,
    pub unit_cost: f64,
    /// Currency of `unit_cost`; `None` means the line's own currency.
    pub unit_currency: Option<CurrencyCode>,
    pub frequency: u32,
}

impl Default for LeafCost {
    fn default() -> Self {
        Self {
            unit_number: 1.0,
            unit_type: "ls".into(),
            unit_cost: 0.0,
            unit_currency: None,
            frequency: 1,
        }
    }
}

impl LeafCost {
    /// Inputs of a line whose last child just left.
    pub fn cleared() -> Self {
        Self {
            unit_number: 0.0,
            unit_type: String::new(),
            unit_cost: 0.0,
            unit_currency: None,
            frequency: 1,
        }
    }
}

/// A line either carries its own cost inputs or derives everything from children.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Leaf(LeafCost),
    Group,
}

impl LineKind {
    pub fn leaf(&self) -> Option<&LeafCost> {
        match self {
            LineKind::Leaf(cost) => Some(cost),
            LineKind::Group => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct LineNode {
    pub(crate) title: Option<String>,
    pub(crate) kind: LineKind,
    pub(crate) currency: CurrencyCode,
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
    pub(crate) created: DateTime<Utc>,
    pub(crate) modified: DateTime<Utc>,
    pub(crate) category: Vec<String>,
    pub(crate) overhead: Vec<Overhead>,
    pub(crate) parent: Option<LineId>,
    pub(crate) children: Vec<LineId>,
}

/// Field values for creating or updating a line. Unset fields take defaults.
///
/// Children are never passed here; trees are built with `add` or from records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineOptions {
    pub title: Option<String>,
    pub unit_number: Option<f64>,
    pub unit_type: Option<String>,
    pub unit_cost: Option<f64>,
    pub unit_currency: Option<String>,
    pub frequency: Option<u32>,
    pub currency: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub category: Vec<String>,
}

impl LineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn unit_number(mut self, unit_number: f64) -> Self {
        self.unit_number = Some(unit_number);
        self
    }

    pub fn unit_type(mut self, unit_type: impl Into<String>) -> Self {
        self.unit_type = Some(unit_type.into());
        self
    }

    pub fn unit_cost(mut self, unit_cost: f64) -> Self {
        self.unit_cost = Some(unit_cost);
        self
    }

    pub fn unit_currency(mut self, code: impl Into<String>) -> Self {
        self.unit_currency = Some(code.into());
        self
    }

    pub fn frequency(mut self, frequency: u32) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn currency(mut self, code: impl Into<String>) -> Self {
        self.currency = Some(code.into());
        self
    }

    pub fn start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn category(mut self, tag: impl Into<String>) -> Self {
        self.category.push(tag.into());
        self
    }

    pub(crate) fn has_cost_inputs(&self) -> bool {
        self.unit_number.is_some()
            || self.unit_type.is_some()
            || self.unit_cost.is_some()
            || self.unit_currency.is_some()
            || self.frequency.is_some()
    }
}
