//! Flattening an [`AllocationTree`] into one row per leaf.
//!
//! Projection happens in two steps. [`Schema::derive`] fixes the column set
//! (one `category_type` per depth below the root, in level order), then each
//! leaf fills a row against that fixed schema, writing [`NOT_APPLICABLE`] for
//! levels its branch never reaches. Rows are keyed by [`CategoryPath`], the
//! same key balance data is joined on.

use std::fmt;

use crate::tree::AllocationTree;
use crate::types::{CategoryPath, NOT_APPLICABLE, Schema};

/// Header of the fraction-of-whole column in exported tables.
pub const FRACTION_COLUMN: &str = "Fraction of Whole";

impl Schema {
    /// Column layout of `tree`: the category type of each depth below the root.
    pub fn derive(tree: &AllocationTree) -> Self {
        let columns = tree
            .levels()
            .into_iter()
            .skip(1)
            .filter_map(|level| level.first().map(|&id| tree.node(id).category_type().to_string()));
        Schema::new(columns)
    }
}

/// One leaf of the allocation, flattened.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationRow {
    pub path: CategoryPath,
    /// The leaf's share of the whole portfolio.
    pub fraction_of_whole: f64,
}

/// Per-leaf target allocation, derived from a tree.
///
/// A fresh value on every projection: nothing here aliases the tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocationTable {
    schema: Schema,
    rows: Vec<AllocationRow>,
}

impl AllocationTable {
    /// Project every leaf of `tree` into a row, in pre-order.
    ///
    /// A root with no children yields an empty table.
    pub fn project(tree: &AllocationTree) -> Self {
        let schema = Schema::derive(tree);
        let root = tree.root();
        if tree.node(root).is_leaf() {
            return Self {
                schema,
                rows: Vec::new(),
            };
        }

        let rows = tree
            .leaves()
            .into_iter()
            .map(|leaf| {
                let mut components = vec![NOT_APPLICABLE.to_string(); schema.len()];
                for id in tree.path(leaf).into_iter().skip(1) {
                    let node = tree.node(id);
                    // Validated trees always place a type at exactly one column.
                    if let Some(col) = schema.position(node.category_type()) {
                        components[col] = node.name().to_string();
                    }
                }
                AllocationRow {
                    path: CategoryPath::from(components),
                    fraction_of_whole: tree.node(leaf).total_weight(),
                }
            })
            .collect();

        Self { schema, rows }
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn rows(&self) -> &[AllocationRow] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fraction of whole for a path, if it is a leaf of this table.
    pub fn fraction(&self, path: &CategoryPath) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| &r.path == path)
            .map(|r| r.fraction_of_whole)
    }

    /// Sum of all leaf fractions; 1.0 for any tree with a weighted leaf.
    pub fn total_fraction(&self) -> f64 {
        self.rows.iter().map(|r| r.fraction_of_whole).sum()
    }

    /// Write the table as CSV: one column per schema level, then [`FRACTION_COLUMN`].
    #[cfg(feature = "csv")]
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> crate::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header: Vec<&str> = self.schema.columns().iter().map(String::as_str).collect();
        header.push(FRACTION_COLUMN);
        wtr.write_record(&header)?;

        for row in &self.rows {
            let mut record: Vec<String> = row.path.components().to_vec();
            record.push(row.fraction_of_whole.to_string());
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl fmt::Display for AllocationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = column_widths(
            self.schema.columns(),
            self.rows.iter().map(|r| r.path.components()),
        );
        for (col, w) in self.schema.columns().iter().zip(widths.iter().copied()) {
            write!(f, "{col:w$}  ")?;
        }
        writeln!(f, "{:>10}", "Total %")?;
        for row in &self.rows {
            for (c, w) in row.path.components().iter().zip(widths.iter().copied()) {
                write!(f, "{c:w$}  ")?;
            }
            writeln!(f, "{:>9.2}%", row.fraction_of_whole * 100.0)?;
        }
        Ok(())
    }
}

/// Display widths for path columns: the longest of header and cells.
pub(crate) fn column_widths<'a, I>(headers: &[String], rows: I) -> Vec<usize>
where
    I: Iterator<Item = &'a [String]>,
{
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for components in rows {
        for (w, c) in widths.iter_mut().zip(components) {
            *w = (*w).max(c.chars().count());
        }
    }
    widths
}
