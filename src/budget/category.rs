use super::{events::ChangeKind, Budget, Line, LineId};
use crate::errors::BudgetResult;

impl Budget {
    /// Tags a line. Tags already present are kept once.
    pub fn add_category<I, S>(&mut self, id: LineId, tags: I) -> BudgetResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require(id)?;
        let category = &mut self.node_mut(id).category;
        for tag in tags {
            let tag = tag.into();
            if !category.contains(&tag) {
                category.push(tag);
            }
        }
        self.touch(id);
        self.notify(id, ChangeKind::Category);
        Ok(())
    }

    /// Returns whether the tag was present.
    pub fn remove_category(&mut self, id: LineId, tag: &str) -> BudgetResult<bool> {
        self.require(id)?;
        let category = &mut self.node_mut(id).category;
        let before = category.len();
        category.retain(|candidate| candidate != tag);
        if category.len() == before {
            return Ok(false);
        }
        self.touch(id);
        self.notify(id, ChangeKind::Category);
        Ok(true)
    }
}

impl<'a> Line<'a> {
    /// Indexes of every line in this subtree carrying `tag`, in document order.
    pub fn list_category(&self, tag: &str) -> Vec<String> {
        self.subtree()
            .filter(|line| line.has_category(tag))
            .map(|line| line.index().to_string())
            .collect()
    }
}
