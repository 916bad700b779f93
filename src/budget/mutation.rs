use tracing::warn;

use super::{
    events::ChangeKind, Budget, IndexPath, LeafCost, Line, LineId, LineKind, LineOptions,
    LineRecord,
};
use crate::errors::{BudgetError, BudgetResult};

/// Where [`Budget::add`] places the new line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AddPosition {
    /// Last child of the given parent.
    #[default]
    Append,
    /// 1-based position among the given parent's children; past the end appends.
    At(usize),
    /// Absolute index the new line should take. The parent is resolved from
    /// the leading segments, not from the `parent` argument.
    Path(IndexPath),
}

/// Destination of [`Budget::move_line`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveTarget {
    /// Last child of the target.
    AppendTo(LineId),
    /// Sibling right before the target.
    Before(LineId),
    /// Sibling right after the target.
    After(LineId),
    /// Absolute index of the new parent plus the 1-based position under it.
    Path(IndexPath),
}

impl Budget {
    /// Adds a child line and returns its handle.
    ///
    /// A parent that was a leaf hands its cost inputs down to the new child
    /// and becomes a group. Unset options fall back to the parent's currency.
    pub fn add(
        &mut self,
        parent: LineId,
        options: LineOptions,
        position: AddPosition,
    ) -> BudgetResult<LineId> {
        let (parent, slot) = self.resolve_slot(parent, &position)?;
        self.check_capacity(parent, "new line", 0)?;

        let fallback = self.node(parent).currency.clone();
        let inherited = self.node(parent).kind.leaf().cloned();
        let node = self.build_node(options, fallback, inherited, Some(parent));
        let id = LineId(self.arena.insert(node));
        self.link(parent, id, slot);

        let index = self.require(id)?;
        self.announce(format!("New line added at {}", index));
        self.notify(id, ChangeKind::Added);
        Ok(id)
    }

    /// Attaches the subtree described by `record` under `parent`.
    pub fn add_record(
        &mut self,
        parent: LineId,
        record: &LineRecord,
        position: AddPosition,
    ) -> BudgetResult<LineId> {
        let (parent, slot) = self.resolve_slot(parent, &position)?;
        self.check_capacity(parent, &record.index, record.depth())?;

        let id = self.insert_record(record, parent);
        self.link(parent, id, slot);

        let index = self.require(id)?;
        self.announce(format!("Line {} restored", index));
        self.notify(id, ChangeKind::Added);
        Ok(id)
    }

    /// Removes a line and everything below it, returning the removed subtree.
    ///
    /// Handles to removed lines go stale. A parent left without children
    /// becomes a leaf again with cleared cost inputs.
    pub fn remove(&mut self, id: LineId) -> BudgetResult<LineRecord> {
        let index = self.require(id)?;
        let Some(parent) = self.node(id).parent else {
            warn!("Rejected removing the root line");
            return Err(BudgetError::RootLine("removed"));
        };
        let record = self.export_record(id)?;
        let doomed: Vec<LineId> = Line::new(self, id).subtree().map(|line| line.id).collect();

        self.unlink(parent, id);
        for line in doomed {
            self.arena.remove(line.0);
        }
        self.revert_if_empty(parent);
        self.touch(parent);

        self.announce(format!("Line {} deleted", index));
        self.notify(parent, ChangeKind::Removed);
        Ok(record)
    }

    /// Relocates a line and its subtree.
    ///
    /// Checks run in order and the first failure rejects the move with the
    /// tree untouched: root, target exists, target is not the line itself,
    /// no cycle, the new parent may have children, and the moved subtree
    /// still fits under the maximum level.
    pub fn move_line(&mut self, id: LineId, target: MoveTarget) -> BudgetResult<()> {
        let index = self.require(id)?;
        let Some(old_parent) = self.node(id).parent else {
            warn!("Rejected moving the root line");
            return Err(BudgetError::RootLine("moved"));
        };

        let (anchor, new_parent) = self.resolve_move_target(&index, &target)?;
        let anchor_index = self.require(anchor)?;
        if anchor == id {
            warn!(line = %index, "Rejected moving a line relative to itself");
            return Err(BudgetError::SelfTarget(index));
        }
        let line = Line::new(self, id);
        if line.is_ancestor_of(&Line::new(self, anchor)) {
            warn!(line = %index, target = %anchor_index, "Rejected moving a line into its own subtree");
            return Err(BudgetError::CycleDetected {
                index,
                target: anchor_index,
            });
        }
        self.check_capacity(new_parent, &index, line.depth())?;

        self.unlink(old_parent, id);
        let children = &self.node(new_parent).children;
        let slot = match &target {
            MoveTarget::AppendTo(_) => children.len(),
            MoveTarget::Before(anchor) => position_of(children, *anchor),
            MoveTarget::After(anchor) => position_of(children, *anchor) + 1,
            MoveTarget::Path(path) => path
                .positions()
                .last()
                .map_or(children.len(), |&position| position - 1),
        };
        self.link(new_parent, id, slot);
        self.revert_if_empty(old_parent);
        self.touch(id);

        let new_index = self.require(id)?;
        self.announce(format!("Line {} moved to {}", index, new_index));
        if old_parent != new_parent {
            self.notify(old_parent, ChangeKind::Moved);
        }
        self.notify(id, ChangeKind::Moved);
        Ok(())
    }

    /// Deep copy of a line inserted right after it; returns the copy.
    pub fn duplicate(&mut self, id: LineId) -> BudgetResult<LineId> {
        self.require(id)?;
        let Some(parent) = self.node(id).parent else {
            warn!("Rejected duplicating the root line");
            return Err(BudgetError::RootLine("duplicated"));
        };
        let line = Line::new(self, id);
        let mut record = line.export_record();
        keep_explicit_titles(line, &mut record);
        let position = line.line_number() + 1;
        self.add_record(parent, &record, AddPosition::At(position))
    }

    /// Resolves a parent and a 0-based slot among its children.
    fn resolve_slot(
        &self,
        parent: LineId,
        position: &AddPosition,
    ) -> BudgetResult<(LineId, usize)> {
        let (parent, line_number) = match position {
            AddPosition::Append => {
                self.require(parent)?;
                return Ok((parent, self.node(parent).children.len()));
            }
            AddPosition::At(line_number) => {
                let index = self.require(parent)?;
                if *line_number == 0 {
                    warn!(line = %index, "Line positions start at 1");
                    return Err(BudgetError::InvalidIndex("0".into()));
                }
                (parent, *line_number)
            }
            AddPosition::Path(path) => {
                let Some((parent_path, line_number)) = path.split_last() else {
                    warn!("The root index cannot receive a new line");
                    return Err(BudgetError::InvalidIndex(path.to_string()));
                };
                let parent = self.get_by_path(&parent_path).ok_or_else(|| {
                    warn!(index = %parent_path, "Parent index does not resolve");
                    BudgetError::LineNotFound(parent_path.to_string())
                })?;
                (parent, line_number)
            }
        };
        let slot = (line_number - 1).min(self.node(parent).children.len());
        Ok((parent, slot))
    }

    /// Returns `(anchor, new parent)` for a move; the anchor is the line the
    /// self and cycle checks run against.
    fn resolve_move_target(
        &self,
        index: &str,
        target: &MoveTarget,
    ) -> BudgetResult<(LineId, LineId)> {
        match target {
            MoveTarget::AppendTo(anchor) => {
                self.require(*anchor)?;
                Ok((*anchor, *anchor))
            }
            MoveTarget::Before(anchor) | MoveTarget::After(anchor) => {
                self.require(*anchor)?;
                match self.node(*anchor).parent {
                    Some(parent) => Ok((*anchor, parent)),
                    None => {
                        warn!(line = %index, "Rejected giving the root line a sibling");
                        Err(BudgetError::RootLine("given siblings"))
                    }
                }
            }
            MoveTarget::Path(path) => {
                let Some((parent_path, _)) = path.split_last() else {
                    warn!(line = %index, "Rejected moving a line to the root index");
                    return Err(BudgetError::InvalidIndex(path.to_string()));
                };
                let parent = self.get_by_path(&parent_path).ok_or_else(|| {
                    warn!(line = %index, target = %parent_path, "Target index does not resolve");
                    BudgetError::LineNotFound(parent_path.to_string())
                })?;
                Ok((parent, parent))
            }
        }
    }

    /// Rejects a parent that cannot take `subject`, a subtree `depth` levels deep.
    fn check_capacity(&self, parent: LineId, subject: &str, depth: usize) -> BudgetResult<()> {
        let max_level = self.config.max_level();
        let line = Line::new(self, parent);
        let level = line.level();
        if level >= max_level {
            let index = line.index().to_string();
            warn!(line = %index, max_level, "Maximum level reached");
            return Err(BudgetError::MaxLevelReached { index, max_level });
        }
        if level + 1 + depth > max_level {
            let target = line.index().to_string();
            warn!(line = subject, target = %target, depth, max_level, "Subtree would exceed the maximum level");
            return Err(BudgetError::DepthExceeded {
                index: subject.to_string(),
                target,
                max_level,
            });
        }
        Ok(())
    }

    fn link(&mut self, parent: LineId, id: LineId, slot: usize) {
        let node = self.node_mut(parent);
        node.kind = LineKind::Group;
        let slot = slot.min(node.children.len());
        node.children.insert(slot, id);
        self.node_mut(id).parent = Some(parent);
    }

    fn unlink(&mut self, parent: LineId, id: LineId) {
        self.node_mut(parent).children.retain(|&child| child != id);
    }

    fn revert_if_empty(&mut self, id: LineId) {
        let node = self.node_mut(id);
        if node.children.is_empty() && matches!(node.kind, LineKind::Group) {
            node.kind = LineKind::Leaf(LeafCost::cleared());
        }
    }
}

fn position_of(children: &[LineId], id: LineId) -> usize {
    children
        .iter()
        .position(|&child| child == id)
        .unwrap_or(children.len())
}

fn keep_explicit_titles(line: Line<'_>, record: &mut LineRecord) {
    record.title = line.explicit_title().map(str::to_string);
    for (child, child_record) in line.children().zip(record.children.iter_mut()) {
        keep_explicit_titles(child, child_record);
    }
}
