use chrono::{DateTime, Utc};

use super::{line::LineNode, Budget, LineId, LineKind, Overhead};
use crate::currency::CurrencyCode;

/// Borrowed, read-only view of one line.
///
/// Leaf-only inputs read as zero or empty on lines with children.
#[derive(Clone, Copy)]
pub struct Line<'a> {
    pub(crate) budget: &'a Budget,
    pub(crate) id: LineId,
}

impl<'a> Line<'a> {
    pub(crate) fn new(budget: &'a Budget, id: LineId) -> Self {
        Self { budget, id }
    }

    pub(crate) fn node(&self) -> &'a LineNode {
        self.budget.node(self.id)
    }

    pub(crate) fn at(&self, id: LineId) -> Line<'a> {
        Line::new(self.budget, id)
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    /// Explicit title, or `<level name>-<line number>`.
    pub fn title(&self) -> String {
        match self.node().title.as_deref() {
            Some(title) => title.to_string(),
            None => self.default_title(),
        }
    }

    pub fn explicit_title(&self) -> Option<&'a str> {
        self.node().title.as_deref()
    }

    pub fn default_title(&self) -> String {
        format!("{}-{}", self.level_name(), self.line_number())
    }

    pub fn level_name(&self) -> &'a str {
        self.budget.config.level_name(self.level())
    }

    pub fn kind(&self) -> &'a LineKind {
        &self.node().kind
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.node().kind, LineKind::Leaf(_))
    }

    pub fn unit_number(&self) -> f64 {
        self.kind().leaf().map_or(0.0, |cost| cost.unit_number)
    }

    pub fn unit_type(&self) -> &'a str {
        self.kind().leaf().map_or("", |cost| cost.unit_type.as_str())
    }

    pub fn unit_cost(&self) -> f64 {
        self.kind().leaf().map_or(0.0, |cost| cost.unit_cost)
    }

    pub fn frequency(&self) -> u32 {
        self.kind().leaf().map_or(0, |cost| cost.frequency)
    }

    /// Currency `unit_cost` is expressed in; `None` for lines with children.
    pub fn unit_currency(&self) -> Option<&'a CurrencyCode> {
        let cost = self.kind().leaf()?;
        Some(cost.unit_currency.as_ref().unwrap_or(&self.node().currency))
    }

    pub fn currency(&self) -> &'a CurrencyCode {
        &self.node().currency
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.node().created
    }

    pub fn category(&self) -> &'a [String] {
        &self.node().category
    }

    pub fn has_category(&self, tag: &str) -> bool {
        self.node().category.iter().any(|candidate| candidate == tag)
    }

    pub fn overhead(&self) -> &'a [Overhead] {
        &self.node().overhead
    }
}

impl std::fmt::Debug for Line<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Line")
            .field("index", &self.index().to_string())
            .field("title", &self.title())
            .finish()
    }
}

impl PartialEq for Line<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.budget, other.budget) && self.id == other.id
    }
}
