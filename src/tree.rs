//! Weighted category hierarchy.
//!
//! An [`AllocationTree`] owns every [`CategoryNode`] in a single arena. Children
//! are an ordered list of [`NodeId`]s; the parent link is a plain id used only
//! to walk upwards, never for ownership.
//!
//! Building validates the descriptor, then normalizes weights in level order:
//! each node's children are rescaled so their local weights sum to 1, and each
//! child's total weight becomes `parent.total_weight * local_weight`. Level
//! order guarantees a parent's total is final before its children read it.
//!
//! ```
//! use pinwheel::{AllocationTree, NodeDescriptor};
//!
//! let desc = NodeDescriptor::root("Portfolio", "Mine").with_children([
//!     NodeDescriptor::new("Asset Class", "A", 3.0),
//!     NodeDescriptor::new("Asset Class", "B", 1.0),
//! ]);
//! let tree = AllocationTree::build(&desc).unwrap();
//!
//! let a = tree.find("A").unwrap();
//! assert_eq!(tree.node(a).local_weight(), 0.75);
//! assert_eq!(tree.node(a).total_weight(), 0.75);
//! ```

use std::collections::VecDeque;
use std::fmt;
#[cfg(feature = "json")]
use std::path::Path;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::descriptor::NodeDescriptor;
use crate::error::{Error, Result};
use crate::types::NodeId;

/// One level of the allocation hierarchy.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoryNode {
    category_type: String,
    name: String,
    /// Weight as declared, before normalization.
    raw_weight: f64,
    /// Share of the parent's allocation, normalized across siblings.
    local_weight: f64,
    /// Share of the whole tree.
    total_weight: f64,
    depth: usize,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl CategoryNode {
    #[inline]
    pub fn category_type(&self) -> &str {
        &self.category_type
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn raw_weight(&self) -> f64 {
        self.raw_weight
    }

    #[inline]
    pub fn local_weight(&self) -> f64 {
        self.local_weight
    }

    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Distance from the root (the root is depth 0).
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A validated, normalized allocation hierarchy.
///
/// Immutable once built; to change weights, rebuild from a descriptor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AllocationTree {
    /// Arena in pre-order; index 0 is the root.
    nodes: Vec<CategoryNode>,
}

impl AllocationTree {
    /// Build, validate, and normalize a tree from a nested descriptor.
    ///
    /// Fails with [`Error::Specification`] when a required field is missing,
    /// a weight is negative or not finite, siblings disagree on their
    /// `category_type`, a `category_type` is reused at another depth, or two
    /// siblings share a name.
    pub fn build(descriptor: &NodeDescriptor) -> Result<Self> {
        let mut tree = Self {
            nodes: Vec::with_capacity(descriptor.count()),
        };
        let mut trail = Vec::new();
        tree.add_node(descriptor, None, &mut trail)?;
        tree.validate_levels()?;
        tree.normalize();
        Ok(tree)
    }

    /// Parse a JSON descriptor and build a tree from it.
    #[cfg(feature = "json")]
    pub fn from_json(json: &str) -> Result<Self> {
        Self::build(&NodeDescriptor::from_json(json)?)
    }

    /// Load a JSON allocation file and build a tree from it.
    #[cfg(feature = "json")]
    pub fn load(path: &Path) -> Result<Self> {
        Self::build(&NodeDescriptor::load(path)?)
    }

    fn add_node(
        &mut self,
        desc: &NodeDescriptor,
        parent: Option<NodeId>,
        trail: &mut Vec<String>,
    ) -> Result<NodeId> {
        let name = match &desc.name {
            Some(n) => n.clone(),
            None => return Err(missing_field("name", trail)),
        };
        trail.push(name.clone());

        let category_type = match &desc.category_type {
            Some(t) => t.clone(),
            None => return Err(missing_field("category_type", trail)),
        };

        let (raw_weight, depth) = match parent {
            None => (1.0, 0),
            Some(p) => {
                let raw = desc
                    .allocation
                    .ok_or_else(|| missing_field("allocation", trail))?;
                if !raw.is_finite() || raw < 0.0 {
                    return Err(Error::Specification(format!(
                        "allocation for '{}' must be a finite non-negative number, got {raw}",
                        trail.join(" / ")
                    )));
                }
                (raw, self.nodes[p.0].depth + 1)
            }
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(CategoryNode {
            category_type,
            name,
            raw_weight,
            local_weight: raw_weight,
            total_weight: if parent.is_none() { 1.0 } else { 0.0 },
            depth,
            parent,
            children: Vec::with_capacity(desc.subcategories.len()),
        });
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }

        for child in &desc.subcategories {
            self.add_node(child, Some(id), trail)?;
        }
        trail.pop();
        Ok(id)
    }

    /// Reject hierarchies that cannot be flattened into one column per level:
    /// every depth below the root must carry exactly one category type, and
    /// every category type exactly one depth.
    fn validate_levels(&self) -> Result<()> {
        for node in &self.nodes {
            let Some(&first) = node.children.first() else {
                continue;
            };
            let first = &self.nodes[first.0];
            let mut names = FxHashSet::default();
            for &c in &node.children {
                let child = &self.nodes[c.0];
                if child.category_type != first.category_type {
                    return Err(Error::Specification(format!(
                        "children of '{}' mix category types '{}' and '{}'",
                        node.name, first.category_type, child.category_type
                    )));
                }
                if !names.insert(child.name.as_str()) {
                    return Err(Error::Specification(format!(
                        "'{}' has more than one child named '{}'",
                        node.name, child.name
                    )));
                }
            }
        }

        let mut type_at_depth: FxHashMap<usize, &str> = FxHashMap::default();
        let mut depth_of_type: FxHashMap<&str, usize> = FxHashMap::default();
        for node in self.nodes.iter().filter(|n| !n.is_root()) {
            let ty = node.category_type.as_str();
            match type_at_depth.get(&node.depth) {
                Some(&t) if t != ty => {
                    return Err(Error::Specification(format!(
                        "depth {} mixes category types '{t}' and '{ty}' (at '{}')",
                        node.depth, node.name
                    )));
                }
                Some(_) => {}
                None => {
                    type_at_depth.insert(node.depth, ty);
                }
            }
            match depth_of_type.get(ty) {
                Some(&d) if d != node.depth => {
                    return Err(Error::Specification(format!(
                        "category type '{ty}' appears at depths {d} and {}",
                        node.depth
                    )));
                }
                Some(_) => {}
                None => {
                    depth_of_type.insert(ty, node.depth);
                }
            }
        }
        Ok(())
    }

    /// Level-order pass: rescale each node's children to sum to 1 and derive
    /// their totals from the parent's (already final) total.
    fn normalize(&mut self) {
        let root = self.root();
        self.nodes[root.0].local_weight = 1.0;
        self.nodes[root.0].total_weight = 1.0;

        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            let parent_total = self.nodes[id.0].total_weight;
            let raw = |c: &NodeId| self.nodes[c.0].raw_weight;
            let children = &self.nodes[id.0].children;
            let mut scale = 1.0;
            let mut sum: f64 = children.iter().map(raw).sum();
            if sum.is_infinite() {
                // Weights near f64::MAX: rescale by the largest before summing.
                scale = children.iter().map(raw).fold(0.0, f64::max);
                sum = children.iter().map(|c| raw(c) / scale).sum();
            }

            for i in 0..self.nodes[id.0].children.len() {
                let c = self.nodes[id.0].children[i];
                let child = &mut self.nodes[c.0];
                // All-zero siblings mean nothing is allocated below this point.
                child.local_weight = if sum > 0.0 {
                    child.raw_weight / scale / sum
                } else {
                    0.0
                };
                child.total_weight = parent_total * child.local_weight;
                queue.push_back(c);
            }
        }
    }

    // === Queries ===

    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Node by id. Panics on an id from another tree that is out of range.
    #[inline]
    pub fn node(&self, id: NodeId) -> &CategoryNode {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&CategoryNode> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Total number of nodes, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a built tree has at least its root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Leaves in pre-order. A root without children is its own leaf.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.ids().filter(|&id| self.node(id).is_leaf()).collect()
    }

    /// Nodes grouped by depth, each group in left-to-right order.
    pub fn levels(&self) -> Vec<Vec<NodeId>> {
        let mut levels: Vec<Vec<NodeId>> = Vec::new();
        let mut queue = VecDeque::from([self.root()]);
        while let Some(id) = queue.pop_front() {
            let depth = self.node(id).depth;
            if levels.len() <= depth {
                levels.push(Vec::new());
            }
            levels[depth].push(id);
            queue.extend(self.children(id).iter().copied());
        }
        levels
    }

    /// Ids from the root down to `id`, both ends included.
    pub fn path(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = vec![id];
        let mut cur = id;
        while let Some(p) = self.parent(cur) {
            path.push(p);
            cur = p;
        }
        path.reverse();
        path
    }

    /// First node in pre-order with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.ids().find(|&id| self.node(id).name == name)
    }

    /// Direct children of `id` as `(name, local_weight)` pairs.
    pub fn composition(&self, id: NodeId) -> Vec<(&str, f64)> {
        self.children(id)
            .iter()
            .map(|&c| {
                let n = self.node(c);
                (n.name(), n.local_weight())
            })
            .collect()
    }

    fn render(
        &self,
        f: &mut fmt::Formatter<'_>,
        id: NodeId,
        prefix: &str,
        last: bool,
    ) -> fmt::Result {
        let node = self.node(id);
        let branch = match (node.is_root(), last) {
            (true, _) => "",
            (false, true) => "└── ",
            (false, false) => "├── ",
        };
        writeln!(
            f,
            "{prefix}{branch}{}, {:.02}% of parent, {:.02}% of total",
            node.name,
            100.0 * node.local_weight,
            100.0 * node.total_weight,
        )?;

        let child_prefix = match (node.is_root(), last) {
            (true, _) => String::new(),
            (false, true) => format!("{prefix}    "),
            (false, false) => format!("{prefix}│   "),
        };
        let n = node.children.len();
        for (i, &c) in node.children.iter().enumerate() {
            self.render(f, c, &child_prefix, i + 1 == n)?;
        }
        Ok(())
    }
}

fn missing_field(field: &str, trail: &[String]) -> Error {
    if trail.is_empty() {
        Error::Specification(format!("missing field `{field}` on unnamed node"))
    } else {
        Error::Specification(format!("missing field `{field}` on '{}'", trail.join(" / ")))
    }
}

impl fmt::Display for AllocationTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, self.root(), "", true)
    }
}
