//! Nested allocation descriptors: the raw input an [`AllocationTree`] is built from.
//!
//! A descriptor mirrors one node of the hierarchy before validation. Fields are
//! optional here so that a missing field can be reported with the path of the
//! offending node instead of as a bare parse failure.
//!
//! JSON input accepts both naming conventions:
//!
//! ```json
//! { "category_type": "Portfolio", "name": "Pinwheel", "allocation": 1,
//!   "subcategories": [ { "category_type": "Asset Class", "name": "Stocks", "allocation": 60 } ] }
//! ```
//!
//! ```json
//! { "Type": "Portfolio", "Name": "Pinwheel", "Allocation": 1,
//!   "Subclasses": [ { "Type": "Asset Class", "Name": "Stocks", "Allocation": 60 } ] }
//! ```
//!
//! [`AllocationTree`]: crate::AllocationTree

#[cfg(feature = "json")]
use std::path::Path;

#[cfg(feature = "json")]
use crate::error::{Error, Result};

/// One node of an allocation specification, with its children.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeDescriptor {
    #[cfg_attr(feature = "serde", serde(alias = "Type", default))]
    pub category_type: Option<String>,
    #[cfg_attr(feature = "serde", serde(alias = "Name", default))]
    pub name: Option<String>,
    /// Raw, unnormalized weight relative to siblings.
    #[cfg_attr(feature = "serde", serde(alias = "Allocation", default))]
    pub allocation: Option<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(
            alias = "Subclasses",
            default,
            skip_serializing_if = "Vec::is_empty"
        )
    )]
    pub subcategories: Vec<NodeDescriptor>,
}

impl NodeDescriptor {
    /// A fully specified node with no children.
    pub fn new(category_type: impl Into<String>, name: impl Into<String>, allocation: f64) -> Self {
        Self {
            category_type: Some(category_type.into()),
            name: Some(name.into()),
            allocation: Some(allocation),
            subcategories: Vec::new(),
        }
    }

    /// A root node. The root carries no weight of its own.
    pub fn root(category_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category_type: Some(category_type.into()),
            name: Some(name.into()),
            allocation: None,
            subcategories: Vec::new(),
        }
    }

    /// Append a child, builder style.
    pub fn with_child(mut self, child: NodeDescriptor) -> Self {
        self.subcategories.push(child);
        self
    }

    /// Append several children, builder style.
    pub fn with_children<I: IntoIterator<Item = NodeDescriptor>>(mut self, children: I) -> Self {
        self.subcategories.extend(children);
        self
    }

    /// Number of descriptors in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.subcategories.iter().map(Self::count).sum::<usize>()
    }

    /// Parse a descriptor tree from a JSON string.
    ///
    /// Syntax errors are reported as [`Error::Specification`]; missing fields
    /// are left for [`AllocationTree::build`](crate::AllocationTree::build) to report.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Specification(e.to_string()))
    }

    /// Read and parse a JSON allocation file.
    #[cfg(feature = "json")]
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Serialize back to pretty-printed JSON.
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Specification(e.to_string()))
    }
}
