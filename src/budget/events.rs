use super::LineId;

/// What kind of mutation produced a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A scalar field was written; carries the field name.
    Field(&'static str),
    Added,
    Removed,
    Moved,
    Overhead,
    Category,
    /// Emitted once when a batch scope with pending changes closes.
    Batch,
}

/// Notification that a line and therefore all of its ancestors changed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub line: LineId,
    pub kind: ChangeKind,
    /// `line` followed by its ancestors, root last.
    pub affected: Vec<LineId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

pub(crate) type Observer = Box<dyn FnMut(&ChangeEvent)>;
