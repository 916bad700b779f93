#![doc(test(attr(deny(warnings))))]

//! Budget Tree is a hierarchical budget-line calculation engine: a tree of
//! cost lines whose totals roll up on demand, converted across currencies
//! and inflated by compounding overheads.

pub mod budget;
pub mod config;
pub mod currency;
pub mod errors;
pub mod utils;

use std::sync::Once;

pub use budget::{
    AddPosition, Budget, ChangeEvent, ChangeKind, IndexPath, Line, LineId, LineKind, LineOptions,
    LineRecord, MoveTarget, Overhead,
};
pub use config::Config;
pub use currency::{CurrencyCode, CurrencyResolver, RateTable};
pub use errors::{BudgetError, BudgetResult};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Budget Tree tracing initialized.");
    });
}
