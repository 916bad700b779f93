use tracing::debug;

use super::{Budget, IndexPath, Line, LineId};

/// Pre-order walk over the lines below a starting line.
pub struct Descendants<'a> {
    budget: &'a Budget,
    stack: Vec<LineId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        // Reverse so the first child is visited first.
        for &child in self.budget.node(current).children.iter().rev() {
            self.stack.push(child);
        }
        Some(Line::new(self.budget, current))
    }
}

impl<'a> Line<'a> {
    pub fn parent(&self) -> Option<Line<'a>> {
        self.node().parent.map(|id| self.at(id))
    }

    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    pub fn root(&self) -> Line<'a> {
        self.at(self.budget.root)
    }

    pub fn children(&self) -> impl Iterator<Item = Line<'a>> + 'a {
        let budget = self.budget;
        self.node()
            .children
            .iter()
            .map(move |&id| Line::new(budget, id))
    }

    pub fn child_count(&self) -> usize {
        self.node().children.len()
    }

    /// Child at a 1-based position.
    pub fn child(&self, line_number: usize) -> Option<Line<'a>> {
        let children = &self.node().children;
        match line_number.checked_sub(1).and_then(|slot| children.get(slot)) {
            Some(&id) => Some(self.at(id)),
            None if children.is_empty() => {
                debug!(line = %self.index(), "Line does not have any children");
                None
            }
            None => {
                debug!(line = %self.index(), line_number, "Line does not exist");
                None
            }
        }
    }

    /// Every line below this one, in document order.
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants {
            budget: self.budget,
            stack: self.node().children.iter().rev().copied().collect(),
        }
    }

    /// This line followed by its descendants, in document order.
    pub fn subtree(&self) -> Descendants<'a> {
        Descendants {
            budget: self.budget,
            stack: vec![self.id],
        }
    }

    /// Parent first, root last.
    pub fn ancestors(&self) -> Vec<Line<'a>> {
        let mut ancestors = Vec::new();
        let mut current = self.parent();
        while let Some(line) = current {
            current = line.parent();
            ancestors.push(line);
        }
        ancestors
    }

    pub fn is_ancestor_of(&self, other: &Line<'_>) -> bool {
        other.ancestors().iter().any(|line| line.id == self.id)
    }

    pub fn siblings(&self) -> Vec<Line<'a>> {
        match self.parent() {
            Some(parent) => parent.children().filter(|line| line.id != self.id).collect(),
            None => Vec::new(),
        }
    }

    pub fn level(&self) -> usize {
        let mut level = 0;
        let mut current = self.node().parent;
        while let Some(parent) = current {
            level += 1;
            current = self.budget.node(parent).parent;
        }
        level
    }

    /// Height of the subtree below this line; 0 for a line without children.
    pub fn depth(&self) -> usize {
        self.children()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// 1-based position among siblings; 1 for the root.
    pub fn line_number(&self) -> usize {
        match self.node().parent {
            Some(parent) => self
                .budget
                .node(parent)
                .children
                .iter()
                .position(|&id| id == self.id)
                .map_or(1, |slot| slot + 1),
            None => 1,
        }
    }

    pub fn index(&self) -> IndexPath {
        let mut positions = Vec::new();
        let mut current = *self;
        while let Some(parent) = current.parent() {
            positions.push(current.line_number());
            current = parent;
        }
        positions.reverse();
        IndexPath::from_positions(positions).unwrap_or_default()
    }

    /// Previous line in document order.
    pub fn before(&self) -> Option<Line<'a>> {
        let parent = self.parent()?;
        let line_number = self.line_number();
        if line_number == 1 {
            return Some(parent);
        }
        let previous = parent.child(line_number - 1)?;
        Some(previous.descendants().last().unwrap_or(previous))
    }

    /// Next line in document order.
    pub fn after(&self) -> Option<Line<'a>> {
        if let Some(&first) = self.node().children.first() {
            return Some(self.at(first));
        }
        let mut current = *self;
        while let Some(parent) = current.parent() {
            if let Some(&next) = parent.node().children.get(current.line_number()) {
                return Some(self.at(next));
            }
            current = parent;
        }
        None
    }

    /// Position of this line in a document-order listing of the whole tree.
    pub fn abs_line_number(&self) -> usize {
        let mut count = 0;
        let mut current = *self;
        while let Some(previous) = current.before() {
            count += 1;
            current = previous;
        }
        count
    }

    /// Walks a path of 1-based positions downward from this line.
    pub fn resolve(&self, path: &IndexPath) -> Option<Line<'a>> {
        let mut current = *self;
        for &position in path.positions() {
            current = current.child(position)?;
        }
        Some(current)
    }
}

impl Budget {
    /// Resolves an absolute dotted path such as `"2.1.3"`; `"0"` is the root.
    pub fn get_by_index(&self, index: &str) -> Option<LineId> {
        let path = match index.parse::<IndexPath>() {
            Ok(path) => path,
            Err(err) => {
                debug!(index, error = %err, "Unparseable index");
                return None;
            }
        };
        self.get_by_path(&path)
    }

    pub fn get_by_path(&self, path: &IndexPath) -> Option<LineId> {
        self.root_line().resolve(path).map(|line| line.id)
    }

    /// Relative hop: the child of `id` at a 1-based position.
    pub fn get_child(&self, id: LineId, line_number: usize) -> Option<LineId> {
        self.line(id)?.child(line_number).map(|line| line.id)
    }
}
