use std::{fmt, str::FromStr};

use crate::errors::BudgetError;

/// Dot-separated, 1-based sibling positions leading from the root to a line.
///
/// The root itself has the empty path, written `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct IndexPath(Vec<usize>);

impl IndexPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_positions(positions: Vec<usize>) -> Result<Self, BudgetError> {
        if positions.contains(&0) {
            return Err(BudgetError::InvalidIndex(format!(
                "{:?} contains a zero position",
                positions
            )));
        }
        Ok(Self(positions))
    }

    pub fn positions(&self) -> &[usize] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Splits into the parent's path and the last position.
    pub fn split_last(&self) -> Option<(IndexPath, usize)> {
        let (last, parent) = self.0.split_last()?;
        Some((IndexPath(parent.to_vec()), *last))
    }

    pub fn child(&self, position: usize) -> IndexPath {
        let mut positions = self.0.clone();
        positions.push(position);
        IndexPath(positions)
    }
}

impl FromStr for IndexPath {
    type Err = BudgetError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == "0" {
            return Ok(Self::root());
        }
        let positions = trimmed
            .split('.')
            .map(|segment| match segment.trim().parse::<usize>() {
                Ok(position) if position > 0 => Ok(position),
                _ => Err(BudgetError::InvalidIndex(raw.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(positions))
    }
}

impl fmt::Display for IndexPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("0");
        }
        let joined = self
            .0
            .iter()
            .map(|position| position.to_string())
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_paths() {
        let path: IndexPath = "2.1.3".parse().expect("valid path");
        assert_eq!(path.positions(), &[2, 1, 3]);
        assert_eq!(path.to_string(), "2.1.3");
        let (parent, last) = path.split_last().expect("not root");
        assert_eq!(parent.to_string(), "2.1");
        assert_eq!(last, 3);
    }

    #[test]
    fn zero_and_empty_mean_root() {
        assert!("0".parse::<IndexPath>().expect("root").is_root());
        assert!("".parse::<IndexPath>().expect("root").is_root());
        assert_eq!(IndexPath::root().to_string(), "0");
        assert!(IndexPath::root().split_last().is_none());
    }

    #[test]
    fn rejects_malformed_segments() {
        assert!("1.0".parse::<IndexPath>().is_err());
        assert!("1..2".parse::<IndexPath>().is_err());
        assert!("a.1".parse::<IndexPath>().is_err());
        assert!(IndexPath::from_positions(vec![1, 0]).is_err());
    }
}
