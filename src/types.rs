//! Core types: NodeId, CategoryPath, Schema

use std::fmt;

/// Marker stored in a path column that a leaf's branch never reaches.
pub const NOT_APPLICABLE: &str = "N/A";

/// Index of a node inside its [`AllocationTree`](crate::AllocationTree).
///
/// Only meaningful for the tree that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in construction (pre-order) order.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Ordered category names from just below the root down to a leaf.
///
/// One component per [`Schema`] column; levels a branch does not reach hold
/// [`NOT_APPLICABLE`]. Ordering is lexicographic by component, which keeps
/// joined tables sorted the same way regardless of input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoryPath(Vec<String>);

impl CategoryPath {
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(components.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn components(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last component that is not the not-applicable marker.
    pub fn leaf_name(&self) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .map(String::as_str)
            .find(|c| *c != NOT_APPLICABLE)
    }
}

impl fmt::Display for CategoryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" / "))
    }
}

impl From<Vec<String>> for CategoryPath {
    fn from(v: Vec<String>) -> Self {
        Self(v)
    }
}

/// Column layout of an allocation table: one `category_type` per depth
/// below the root, in level order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schema(Vec<String>);

impl Schema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(columns.into_iter().map(Into::into).collect())
    }

    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column position of a category type.
    pub fn position(&self, category_type: &str) -> Option<usize> {
        self.0.iter().position(|c| c == category_type)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_ordering() {
        let a = CategoryPath::new(["Bonds", "US"]);
        let b = CategoryPath::new(["Stocks", "Intl"]);
        let c = CategoryPath::new(["Stocks", "US"]);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn path_display() {
        let p = CategoryPath::new(["Stocks", "Large Cap", "FSKAX"]);
        assert_eq!(format!("{p}"), "Stocks / Large Cap / FSKAX");
    }

    #[test]
    fn leaf_name_skips_sentinel() {
        let p = CategoryPath::new(["Cash", NOT_APPLICABLE, NOT_APPLICABLE]);
        assert_eq!(p.leaf_name(), Some("Cash"));
        let all = CategoryPath::new([NOT_APPLICABLE]);
        assert_eq!(all.leaf_name(), None);
    }

    #[test]
    fn schema_position() {
        let s = Schema::new(["Asset Class", "Asset Style", "Ticker"]);
        assert_eq!(s.position("Ticker"), Some(2));
        assert_eq!(s.position("Sector"), None);
        assert_eq!(format!("{s}"), "[Asset Class, Asset Style, Ticker]");
    }

    #[test]
    fn node_id_display() {
        assert_eq!(format!("{}", NodeId(3)), "N3");
    }
}
