//! Actual account balances keyed by category path.
//!
//! Balance rows come from outside (typically a CSV export of account
//! holdings). Several rows may share one path, e.g. one fund held in two
//! accounts; [`BalanceTable::aggregate`] sums them before any join.

use std::collections::BTreeMap;
#[cfg(feature = "csv")]
use std::path::Path;

#[cfg(feature = "csv")]
use crate::error::Error;
use crate::error::Result;
use crate::table::AllocationTable;
use crate::types::{CategoryPath, Schema};
#[cfg(feature = "csv")]
use crate::types::NOT_APPLICABLE;

/// Header of the balance column in balance files.
pub const BALANCE_COLUMN: &str = "Initial Balance";

/// One holding: a category path and its current balance.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BalanceRecord {
    pub path: CategoryPath,
    pub initial_balance: f64,
}

impl BalanceRecord {
    pub fn new(path: CategoryPath, initial_balance: f64) -> Self {
        Self {
            path,
            initial_balance,
        }
    }
}

/// Balance rows sharing one column schema.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BalanceTable {
    schema: Schema,
    records: Vec<BalanceRecord>,
}

impl BalanceTable {
    /// Wrap records, checking every path has one component per schema column
    /// and every balance is finite.
    pub fn new(schema: Schema, records: Vec<BalanceRecord>) -> Result<Self> {
        if let Some(bad) = records.iter().find(|r| r.path.len() != schema.len()) {
            return Err(crate::Error::BalanceFormat(format!(
                "path '{}' has {} components, schema {} has {}",
                bad.path,
                bad.path.len(),
                schema,
                schema.len()
            )));
        }
        if let Some(bad) = records.iter().find(|r| !r.initial_balance.is_finite()) {
            return Err(crate::Error::BalanceFormat(format!(
                "balance for '{}' must be finite, got {}",
                bad.path, bad.initial_balance
            )));
        }
        Ok(Self { schema, records })
    }

    /// A zero-balance row for every leaf of an allocation.
    ///
    /// Written out, this is a ready-to-fill balance file.
    pub fn template(allocation: &AllocationTable) -> Self {
        Self {
            schema: allocation.schema().clone(),
            records: allocation
                .rows()
                .iter()
                .map(|r| BalanceRecord::new(r.path.clone(), 0.0))
                .collect(),
        }
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn records(&self) -> &[BalanceRecord] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of all balances.
    pub fn total(&self) -> f64 {
        self.records.iter().map(|r| r.initial_balance).sum()
    }

    /// Balances summed per path, sorted by path.
    pub fn aggregate(&self) -> BTreeMap<CategoryPath, f64> {
        let mut totals = BTreeMap::new();
        for r in &self.records {
            *totals.entry(r.path.clone()).or_insert(0.0) += r.initial_balance;
        }
        totals
    }

    /// Read balances from CSV.
    ///
    /// The header must name every `schema` column plus [`BALANCE_COLUMN`];
    /// other columns are ignored. Empty path cells read as not-applicable and
    /// empty balances as zero. `$` and thousands separators are accepted.
    #[cfg(feature = "csv")]
    pub fn read_csv<R: std::io::Read>(reader: R, schema: &Schema) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| Error::BalanceFormat(format!("missing column '{name}'")))
        };

        let path_cols = schema
            .columns()
            .iter()
            .map(|c| find(c.as_str()))
            .collect::<Result<Vec<_>>>()?;
        let balance_col = find(BALANCE_COLUMN)?;

        let mut records = Vec::new();
        for (i, result) in rdr.records().enumerate() {
            let record = result?;
            // Header is line 1.
            let line = i + 2;
            let components = path_cols.iter().map(|&c| {
                match record.get(c).map(str::trim) {
                    Some("") | None => NOT_APPLICABLE.to_string(),
                    Some(v) => v.to_string(),
                }
            });
            let path = CategoryPath::new(components);
            let raw = record.get(balance_col).unwrap_or("");
            let initial_balance = parse_amount(raw).ok_or_else(|| {
                Error::BalanceFormat(format!("line {line}: cannot parse balance '{raw}'"))
            })?;
            records.push(BalanceRecord::new(path, initial_balance));
        }

        Ok(Self {
            schema: schema.clone(),
            records,
        })
    }

    /// Read a balance CSV file.
    #[cfg(feature = "csv")]
    pub fn load(path: &Path, schema: &Schema) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::read_csv(std::io::BufReader::new(file), schema)
    }

    /// Write balances as CSV with the same layout [`read_csv`](Self::read_csv) expects.
    #[cfg(feature = "csv")]
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header: Vec<&str> = self.schema.columns().iter().map(String::as_str).collect();
        header.push(BALANCE_COLUMN);
        wtr.write_record(&header)?;
        for r in &self.records {
            let mut row: Vec<String> = r.path.components().to_vec();
            row.push(r.initial_balance.to_string());
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(feature = "csv")]
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Some(0.0);
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
