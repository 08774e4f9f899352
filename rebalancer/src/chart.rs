//! Chart data preparation: sunburst hierarchies and pie slices.
//!
//! Nothing here draws. Output is plain serializable data that a plotting
//! front end (plotly, vega, a spreadsheet) can consume as JSON.

use std::io::Read;

use pinwheel::{
    AllocationTable, AllocationTree, BALANCE_COLUMN, BalanceTable, FRACTION_COLUMN, NOT_APPLICABLE,
};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::{Error, Result};

/// Rows of named string cells, the common input to chart builders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ChartTable {
    /// Build from explicit columns and rows. Every row must match the column count.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some(i) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(Error::Chart(format!(
                "row {} has {} cells, expected {}",
                i + 1,
                rows[i].len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Allocation rows with their `Fraction of Whole` column.
    pub fn from_allocation(table: &AllocationTable) -> Self {
        let mut columns = table.schema().columns().to_vec();
        columns.push(FRACTION_COLUMN.to_string());
        let rows = table
            .rows()
            .iter()
            .map(|r| {
                let mut cells = r.path.components().to_vec();
                cells.push(r.fraction_of_whole.to_string());
                cells
            })
            .collect();
        Self { columns, rows }
    }

    /// Balance records with their `Initial Balance` column.
    pub fn from_balances(balances: &BalanceTable) -> Self {
        let mut columns = balances.schema().columns().to_vec();
        columns.push(BALANCE_COLUMN.to_string());
        let rows = balances
            .records()
            .iter()
            .map(|r| {
                let mut cells = r.path.components().to_vec();
                cells.push(r.initial_balance.to_string());
                cells
            })
            .collect();
        Self { columns, rows }
    }

    /// Any CSV with a header row; cells are trimmed.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let to_err = |e: csv::Error| Error::Chart(format!("failed to read chart table: {e}"));
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let columns: Vec<String> = rdr
            .headers()
            .map_err(to_err)?
            .iter()
            .map(String::from)
            .collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(to_err)?;
            rows.push(record.iter().map(String::from).collect());
        }
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::Chart(format!("no column named '{name}'")))
    }
}

/// One segment of a sunburst chart.
///
/// `id` is the `/`-joined path down to this segment; `parent` is the id one
/// level up, empty for the innermost ring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunburstNode {
    pub id: String,
    pub parent: String,
    pub label: String,
    pub value: f64,
}

/// Build sunburst segments from `table`, ringed by `levels`, sized by `value_col`.
///
/// Segment values are summed over every row beneath them. A leaf label that
/// occurs on more than one row is replaced by that row's `alternate_leaf`
/// cell when given; otherwise the leaf is dropped and the row ends on its
/// parent. `N/A` or empty components end a row the same way. Segments come
/// out in first-seen order.
pub fn sunburst<S: AsRef<str>>(
    table: &ChartTable,
    levels: &[S],
    value_col: &str,
    alternate_leaf: Option<&str>,
) -> Result<Vec<SunburstNode>> {
    if levels.is_empty() {
        return Err(Error::Chart("sunburst needs at least one level".into()));
    }
    let level_idx = levels
        .iter()
        .map(|l| table.column(l.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let value_idx = table.column(value_col)?;
    let alt_idx = alternate_leaf.map(|c| table.column(c)).transpose()?;
    let leaf_idx = level_idx[level_idx.len() - 1];

    let mut leaf_counts: FxHashMap<&str, usize> = FxHashMap::default();
    for row in &table.rows {
        *leaf_counts.entry(row[leaf_idx].as_str()).or_default() += 1;
    }

    let mut nodes: Vec<SunburstNode> = Vec::new();
    let mut index: FxHashMap<String, usize> = FxHashMap::default();

    for (i, row) in table.rows.iter().enumerate() {
        let raw = &row[value_idx];
        let value = parse_value(raw).ok_or_else(|| {
            Error::Chart(format!("row {}: '{raw}' is not a number", i + 1))
        })?;

        let mut labels: Vec<&str> = level_idx.iter().map(|&c| row[c].as_str()).collect();
        let last = labels.len() - 1;
        if leaf_counts[labels[last]] > 1 {
            labels[last] = match alt_idx {
                Some(a) => row[a].as_str(),
                None => "",
            };
        }
        let depth = labels
            .iter()
            .position(|l| l.is_empty() || *l == NOT_APPLICABLE)
            .unwrap_or(labels.len());

        let mut parent = String::new();
        for label in &labels[..depth] {
            let id = if parent.is_empty() {
                (*label).to_string()
            } else {
                format!("{parent}/{label}")
            };
            match index.get(&id) {
                Some(&n) => nodes[n].value += value,
                None => {
                    index.insert(id.clone(), nodes.len());
                    nodes.push(SunburstNode {
                        id: id.clone(),
                        parent: parent.clone(),
                        label: (*label).to_string(),
                        value,
                    });
                }
            }
            parent = id;
        }
    }
    Ok(nodes)
}

/// Currency formatting (`$1,250.00`) is accepted; an empty cell counts as zero.
fn parse_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    if cleaned.is_empty() {
        return Some(0.0);
    }
    cleaned.parse().ok()
}

/// One slice of a pie chart over a node's direct children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub weight: f64,
}

/// Slices for the children of `name`, or of the root when `None`.
pub fn pie(tree: &AllocationTree, name: Option<&str>) -> Result<Vec<PieSlice>> {
    let id = match name {
        Some(n) => tree
            .find(n)
            .ok_or_else(|| Error::Chart(format!("no category named '{n}'")))?,
        None => tree.root(),
    };
    Ok(tree
        .composition(id)
        .into_iter()
        .map(|(label, weight)| PieSlice {
            label: label.to_string(),
            weight,
        })
        .collect())
}

/// Pretty JSON for any chart payload.
pub fn to_json<T: Serialize + ?Sized>(data: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}
