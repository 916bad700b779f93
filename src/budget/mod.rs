//! The budget-line tree: storage, field access, aggregation, and mutation.
//!
//! Lines live in a generational arena owned by [`Budget`]. Children are
//! owned through their parent's ordered `children` list; the `parent` link is
//! a plain handle used only for walking upwards. Every aggregate (cost,
//! totals, date range, currencies) is recomputed from the tree on each read.

mod aggregate;
mod category;
mod events;
mod fields;
mod index;
mod line;
mod mutation;
mod overhead;
mod record;
mod traversal;
mod view;

use std::{fmt, rc::Rc};

use chrono::{Duration, Utc};
use generational_arena::Arena;
use tracing::{debug, info, warn};

pub use aggregate::{DurationUnit, LineProperty};
pub use events::{ChangeEvent, ChangeKind, SubscriptionId};
pub use index::IndexPath;
pub use line::{LeafCost, LineId, LineKind, LineOptions};
pub use mutation::{AddPosition, MoveTarget};
pub use overhead::{Overhead, OverheadAmount, OverheadUpdate};
pub use record::LineRecord;
pub use traversal::Descendants;
pub use view::Line;

use crate::{
    config::Config,
    currency::{CurrencyCode, CurrencyResolver},
    errors::{BudgetError, BudgetResult},
};
use events::Observer;
use line::LineNode;

/// A rooted, ordered tree of budget lines.
pub struct Budget {
    arena: Arena<LineNode>,
    root: LineId,
    config: Config,
    resolver: Rc<dyn CurrencyResolver>,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    batch_depth: usize,
    batch_dirty: bool,
}

impl Budget {
    /// Creates a budget whose root line is built from `options`.
    pub fn new(options: LineOptions, config: Config, resolver: Rc<dyn CurrencyResolver>) -> Self {
        let fallback = config.default_currency.clone();
        let root = build_node(&config, resolver.as_ref(), options, fallback, None, None);
        let mut arena = Arena::new();
        let root = LineId(arena.insert(root));
        debug!("Budget created");
        Self {
            arena,
            root,
            config,
            resolver,
            observers: Vec::new(),
            next_subscription: 0,
            batch_depth: 0,
            batch_dirty: false,
        }
    }

    pub fn root(&self) -> LineId {
        self.root
    }

    pub fn root_line(&self) -> Line<'_> {
        Line::new(self, self.root)
    }

    /// Read view of a line, `None` if the handle is stale.
    pub fn line(&self, id: LineId) -> Option<Line<'_>> {
        self.arena.get(id.0).map(|_| Line::new(self, id))
    }

    pub fn contains(&self, id: LineId) -> bool {
        self.arena.contains(id.0)
    }

    pub fn line_count(&self) -> usize {
        self.arena.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &dyn CurrencyResolver {
        self.resolver.as_ref()
    }

    /// Registers an observer called after every mutation outside a batch.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&ChangeEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(id, _)| *id != subscription);
        before != self.observers.len()
    }

    /// Runs `f` with change notifications held back.
    ///
    /// When the outermost scope closes, observers receive a single
    /// [`ChangeKind::Batch`] event for the root if anything changed.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && std::mem::take(&mut self.batch_dirty) {
            self.notify(self.root, ChangeKind::Batch);
        }
        result
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    pub(crate) fn node(&self, id: LineId) -> &LineNode {
        &self.arena[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: LineId) -> &mut LineNode {
        &mut self.arena[id.0]
    }

    /// Index of a live line, or a not-found rejection.
    pub(crate) fn require(&self, id: LineId) -> BudgetResult<String> {
        match self.line(id) {
            Some(line) => Ok(line.index().to_string()),
            None => {
                warn!(?id, "Line handle does not resolve");
                Err(BudgetError::LineNotFound(format!("{:?}", id.0)))
            }
        }
    }

    pub(crate) fn check_currency(&self, code: &str, index: &str) -> BudgetResult<CurrencyCode> {
        if self.resolver.is_valid_currency(code) {
            return Ok(CurrencyCode::new(code));
        }
        warn!(line = %index, currency = code, "Rejected unknown currency");
        Err(BudgetError::InvalidCurrency(code.to_string()))
    }

    pub(crate) fn touch(&mut self, id: LineId) {
        self.node_mut(id).modified = Utc::now();
    }

    /// Structural log line, quieter while a batch is open.
    pub(crate) fn announce(&self, message: String) {
        if self.is_batching() {
            debug!("{}", message);
        } else {
            info!("{}", message);
        }
    }

    pub(crate) fn notify(&mut self, id: LineId, kind: ChangeKind) {
        if self.batch_depth > 0 {
            self.batch_dirty = true;
            return;
        }
        if self.observers.is_empty() {
            return;
        }
        let mut affected = vec![id];
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            affected.push(parent);
            current = self.node(parent).parent;
        }
        let event = ChangeEvent {
            line: id,
            kind,
            affected,
        };
        for (_, observer) in self.observers.iter_mut() {
            observer(&event);
        }
    }

    pub(crate) fn build_node(
        &self,
        options: LineOptions,
        fallback_currency: CurrencyCode,
        inherited: Option<LeafCost>,
        parent: Option<LineId>,
    ) -> LineNode {
        build_node(
            &self.config,
            self.resolver.as_ref(),
            options,
            fallback_currency,
            inherited,
            parent,
        )
    }
}

impl fmt::Debug for Budget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Budget")
            .field("root", &self.root)
            .field("lines", &self.arena.len())
            .field("observers", &self.observers.len())
            .field("batch_depth", &self.batch_depth)
            .finish()
    }
}

/// Builds a detached node, validating every option against the resolver.
fn build_node(
    config: &Config,
    resolver: &dyn CurrencyResolver,
    options: LineOptions,
    fallback_currency: CurrencyCode,
    inherited: Option<LeafCost>,
    parent: Option<LineId>,
) -> LineNode {
    let now = Utc::now();
    let unit_cost = checked(options.unit_cost, f64::is_finite, "unit_cost");
    // An inherited unit cost stays priced in the currency it came from.
    let inherited = inherited.map(|mut cost| {
        if unit_cost.is_none() && cost.unit_cost != 0.0 && cost.unit_currency.is_none() {
            cost.unit_currency = Some(fallback_currency.clone());
        }
        cost
    });
    let currency = match options.currency.as_deref() {
        Some(code) if resolver.is_valid_currency(code) => CurrencyCode::new(code),
        Some(code) => {
            warn!(currency = code, fallback = %fallback_currency, "Unknown currency ignored");
            fallback_currency
        }
        None => fallback_currency,
    };

    let base = inherited.unwrap_or_default();
    let unit_currency = match options.unit_currency.as_deref() {
        Some(code) if resolver.is_valid_currency(code) => Some(CurrencyCode::new(code)),
        Some(code) => {
            warn!(currency = code, "Unknown unit currency ignored");
            base.unit_currency
        }
        None => base.unit_currency,
    };
    let mut cost = LeafCost {
        unit_number: checked(options.unit_number, valid_quantity, "unit_number")
            .unwrap_or(base.unit_number),
        unit_type: options.unit_type.unwrap_or(base.unit_type),
        unit_cost: unit_cost.unwrap_or(base.unit_cost),
        unit_currency,
        frequency: checked(options.frequency, |value| value > 0, "frequency")
            .unwrap_or(base.frequency),
    };
    if config.is_lumpsum(&cost.unit_type) {
        cost.unit_number = 1.0;
    }

    let start = options.start.unwrap_or(now);
    let created = options.created.unwrap_or(now);
    let mut category: Vec<String> = Vec::new();
    for tag in options.category {
        if !category.contains(&tag) {
            category.push(tag);
        }
    }
    LineNode {
        title: options
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty()),
        kind: LineKind::Leaf(cost),
        currency,
        start,
        end: options.end.unwrap_or(start + Duration::days(1)),
        created,
        modified: options.modified.unwrap_or(created),
        category,
        overhead: Vec::new(),
        parent,
        children: Vec::new(),
    }
}

pub(crate) fn valid_quantity(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn checked<T>(value: Option<T>, valid: impl Fn(T) -> bool, field: &'static str) -> Option<T>
where
    T: Copy + fmt::Debug,
{
    match value {
        Some(candidate) if valid(candidate) => Some(candidate),
        Some(candidate) => {
            warn!(field, value = ?candidate, "Ignoring invalid option");
            None
        }
        None => None,
    }
}
