#![allow(dead_code)]

use std::{path::PathBuf, rc::Rc, sync::Mutex};

use budget_tree::{Budget, Config, LineId, LineOptions, RateTable};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn rates() -> Rc<RateTable> {
    Rc::new(RateTable::with_default_symbols())
}

/// USD budget whose root is titled "Budget".
pub fn budget_with(rates: Rc<RateTable>) -> Budget {
    Budget::new(
        LineOptions::new().title("Budget").currency("USD"),
        Config::default(),
        rates,
    )
}

pub fn budget() -> Budget {
    budget_with(rates())
}

/// Leaf options priced per piece so `unit_number` is not pinned to 1.
pub fn priced(unit_number: f64, unit_cost: f64) -> LineOptions {
    LineOptions::new()
        .unit_type("pcs")
        .unit_number(unit_number)
        .unit_cost(unit_cost)
        .frequency(1)
}

pub fn append(budget: &mut Budget, parent: LineId, options: LineOptions) -> LineId {
    budget
        .add(parent, options, Default::default())
        .expect("add line")
}

pub fn index_of(budget: &Budget, id: LineId) -> String {
    budget.line(id).expect("live line").index().to_string()
}
