use std::{fs, path::Path, rc::Rc};

use tracing::debug;

use crate::{
    budget::{Budget, LineId},
    config::{tmp_path, write_atomic, Config},
    currency::CurrencyResolver,
    errors::BudgetResult,
};

/// Writes the record of the whole budget to disk atomically by staging to a temporary file.
pub fn save_budget_to_file(budget: &Budget, path: &Path) -> BudgetResult<()> {
    save_line_to_file(budget, budget.root(), path)
}

/// Same as [`save_budget_to_file`] for a single subtree.
pub fn save_line_to_file(budget: &Budget, id: LineId, path: &Path) -> BudgetResult<()> {
    let json = budget.to_json(id)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(tmp, path)?;
    debug!(path = %path.display(), "Budget saved");
    Ok(())
}

/// Loads a budget record from disk, returning structured errors on failure.
pub fn load_budget_from_file(
    path: &Path,
    config: Config,
    resolver: Rc<dyn CurrencyResolver>,
) -> BudgetResult<Budget> {
    let data = fs::read_to_string(path)?;
    let budget = Budget::from_json(&data, config, resolver)?;
    debug!(path = %path.display(), lines = budget.line_count(), "Budget loaded");
    Ok(budget)
}
