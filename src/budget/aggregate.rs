//! Rollups recomputed from the tree on every read.
//!
//! Intermediate sums stay unrounded; only the values handed out by the
//! public accessors are rounded to `Config::round_decimals`. A missing
//! exchange rate yields NaN, which propagates to every ancestor.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use super::{Line, LineKind, OverheadAmount};
use crate::currency::{round_to, CurrencyCode};

const MS_PER_DAY: f64 = 86_400_000.0;
const MS_PER_WEEK: f64 = 604_800_000.0;
const MS_PER_MONTH: f64 = 2_628_000_000.0;
const MS_PER_YEAR: f64 = 31_536_000_000.0;

/// Unit for [`Line::duration_in`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationUnit {
    Milliseconds,
    Days,
    Weeks,
    Months,
    Years,
}

/// Numeric or temporal line property used by [`Line::get_first`] and [`Line::get_last`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineProperty {
    Start,
    End,
    Created,
    Modified,
    Duration,
    UnitNumber,
    UnitCost,
    Frequency,
    Cost,
    Total,
}

impl<'a> Line<'a> {
    fn round(&self, value: f64) -> f64 {
        round_to(value, self.budget.config.round_decimals)
    }

    fn convert(&self, amount: f64, from: &CurrencyCode, to: &CurrencyCode) -> f64 {
        if from == to {
            return amount;
        }
        self.budget.resolver.convert(amount, from, to)
    }

    fn raw_cost(&self) -> f64 {
        match self.kind() {
            LineKind::Leaf(cost) => cost.unit_number * cost.unit_cost,
            LineKind::Group => 0.0,
        }
    }

    fn raw_total_without_overhead(&self) -> f64 {
        let currency = self.currency();
        match self.kind() {
            LineKind::Leaf(cost) => {
                let unit_currency = cost.unit_currency.as_ref().unwrap_or(currency);
                let amount = self.raw_cost() * f64::from(cost.frequency);
                self.convert(amount, unit_currency, currency)
            }
            LineKind::Group => self
                .children()
                .map(|child| self.convert(child.raw_total(), child.currency(), currency))
                .sum(),
        }
    }

    /// Each overhead's (base in line currency, amount in its own currency).
    fn raw_overheads(&self) -> Vec<(f64, f64)> {
        let currency = self.currency();
        let mut base = self.raw_total_without_overhead();
        let mut amounts = Vec::with_capacity(self.overhead().len());
        for overhead in self.overhead() {
            let own = overhead.currency.as_ref().unwrap_or(currency);
            let amount = self.convert(base * overhead.percentage, currency, own);
            amounts.push((base, amount));
            base += self.convert(amount, own, currency);
        }
        amounts
    }

    fn raw_overhead_total(&self) -> f64 {
        let currency = self.currency();
        self.overhead()
            .iter()
            .zip(self.raw_overheads())
            .map(|(overhead, (_, amount))| {
                let own = overhead.currency.as_ref().unwrap_or(currency);
                self.convert(amount, own, currency)
            })
            .sum()
    }

    fn raw_total(&self) -> f64 {
        self.raw_total_without_overhead() + self.raw_overhead_total()
    }

    /// `unit_number * unit_cost` in the unit currency; 0 for lines with children.
    pub fn cost(&self) -> f64 {
        self.round(self.raw_cost())
    }

    pub fn total_without_overhead(&self) -> f64 {
        self.round(self.raw_total_without_overhead())
    }

    /// Sum of all overheads, in the line's currency.
    pub fn overhead_total(&self) -> f64 {
        self.round(self.raw_overhead_total())
    }

    pub fn total(&self) -> f64 {
        self.round(self.raw_total())
    }

    /// `total` as display text at `Config::show_decimals`.
    pub fn formatted_total(&self) -> String {
        self.budget.config.format_amount(self.total())
    }

    /// `None` while some exchange rate below this line is unavailable.
    pub fn total_checked(&self) -> Option<f64> {
        let total = self.total();
        (!total.is_nan()).then_some(total)
    }

    pub fn rate_unavailable(&self) -> bool {
        self.raw_total().is_nan()
    }

    /// Compounded amounts of every overhead, in sequence order.
    pub fn overhead_amounts(&self) -> Vec<OverheadAmount> {
        let currency = self.currency();
        self.overhead()
            .iter()
            .zip(self.raw_overheads())
            .map(|(overhead, (base, amount))| OverheadAmount {
                title: overhead.title.clone(),
                percentage: overhead.percentage,
                currency: overhead.currency.clone().unwrap_or_else(|| currency.clone()),
                base_total: self.round(base),
                total: self.round(amount),
            })
            .collect()
    }

    /// Every currency used in this subtree plus the default currency, sorted.
    pub fn currencies(&self) -> Vec<CurrencyCode> {
        let mut currencies = BTreeSet::new();
        currencies.insert(self.budget.config.default_currency.clone());
        for line in self.subtree() {
            currencies.insert(line.currency().clone());
            if let Some(code) = line.unit_currency() {
                currencies.insert(code.clone());
            }
            for overhead in line.overhead() {
                if let Some(code) = overhead.currency.as_ref() {
                    currencies.insert(code.clone());
                }
            }
        }
        currencies.into_iter().collect()
    }

    /// Own start for a leaf, earliest leaf start below a line with children.
    pub fn start(&self) -> DateTime<Utc> {
        self.leaves()
            .map(|line| line.node().start)
            .min()
            .unwrap_or(self.node().start)
    }

    /// Own end for a leaf, latest leaf end below a line with children.
    pub fn end(&self) -> DateTime<Utc> {
        self.leaves()
            .map(|line| line.node().end)
            .max()
            .unwrap_or(self.node().end)
    }

    /// Latest modification of this line or anything below it.
    pub fn modified(&self) -> DateTime<Utc> {
        self.subtree()
            .map(|line| line.node().modified)
            .max()
            .unwrap_or(self.node().modified)
    }

    pub fn duration(&self) -> Duration {
        self.end() - self.start()
    }

    pub fn duration_in(&self, unit: DurationUnit) -> f64 {
        let millis = self.duration().num_milliseconds() as f64;
        match unit {
            DurationUnit::Milliseconds => millis,
            DurationUnit::Days => millis / MS_PER_DAY,
            DurationUnit::Weeks => millis / MS_PER_WEEK,
            DurationUnit::Months => millis / MS_PER_MONTH,
            DurationUnit::Years => millis / MS_PER_YEAR,
        }
    }

    fn leaves(&self) -> impl Iterator<Item = Line<'a>> + 'a {
        self.descendants().filter(|line| line.is_leaf())
    }

    pub fn property(&self, property: LineProperty) -> f64 {
        match property {
            LineProperty::Start => self.start().timestamp_millis() as f64,
            LineProperty::End => self.end().timestamp_millis() as f64,
            LineProperty::Created => self.created().timestamp_millis() as f64,
            LineProperty::Modified => self.modified().timestamp_millis() as f64,
            LineProperty::Duration => self.duration_in(DurationUnit::Milliseconds),
            LineProperty::UnitNumber => self.unit_number(),
            LineProperty::UnitCost => self.unit_cost(),
            LineProperty::Frequency => f64::from(self.frequency()),
            LineProperty::Cost => self.cost(),
            LineProperty::Total => self.total(),
        }
    }

    /// Line with the smallest `property` among children, or all descendants
    /// when `deep`. Ties go to the first line in document order.
    pub fn get_first(&self, property: LineProperty, deep: bool) -> Option<Line<'a>> {
        self.extreme(property, deep, |candidate, best| candidate < best)
    }

    /// Line with the largest `property`; see [`Line::get_first`].
    pub fn get_last(&self, property: LineProperty, deep: bool) -> Option<Line<'a>> {
        self.extreme(property, deep, |candidate, best| candidate > best)
    }

    fn extreme(
        &self,
        property: LineProperty,
        deep: bool,
        better: impl Fn(f64, f64) -> bool,
    ) -> Option<Line<'a>> {
        let candidates: Vec<Line<'a>> = if deep {
            self.descendants().collect()
        } else {
            self.children().collect()
        };
        let mut best: Option<(Line<'a>, f64)> = None;
        for line in candidates {
            let value = line.property(property);
            if value.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, current)| better(value, current)) {
                best = Some((line, value));
            }
        }
        best.map(|(line, _)| line)
    }
}
