//! TARGET vs ACTUAL join and periodic contribution plan.
//!
//! The engine outer-joins a projected [`AllocationTable`] with aggregated
//! [`BalanceTable`] rows on [`CategoryPath`]. A path missing on one side is
//! not an error: balance-only rows are unallocated holdings (fraction 0),
//! target-only rows are unfunded targets (balance 0). For every row:
//!
//! - `goal_balance = fraction_of_whole * goal_net_worth`
//! - `balance_delta = goal_balance - initial_balance`
//! - `periodic_contribution = balance_delta / periods_to_goal`

use std::collections::BTreeMap;
use std::fmt;
#[cfg(feature = "csv")]
use std::path::Path;

use crate::balance::{BALANCE_COLUMN, BalanceTable};
use crate::error::{Error, Result};
use crate::table::{AllocationTable, FRACTION_COLUMN, column_widths};
use crate::types::{CategoryPath, Schema};

/// Target net worth and the number of periods to reach it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Goal {
    pub net_worth: f64,
    pub periods: i64,
}

impl Goal {
    pub fn new(net_worth: f64, periods: i64) -> Self {
        Self { net_worth, periods }
    }

    /// Check the goal before any computation uses it.
    pub fn validate(&self) -> Result<()> {
        if self.periods <= 0 {
            return Err(Error::InvalidGoalHorizon(self.periods));
        }
        if !self.net_worth.is_finite() || self.net_worth < 0.0 {
            return Err(Error::InvalidGoal(self.net_worth));
        }
        Ok(())
    }
}

/// Which side(s) of the join a plan row came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RowStatus {
    /// In both the target allocation and the balances.
    Allocated,
    /// Held, but not part of the target allocation.
    Unallocated,
    /// Targeted, but nothing is held yet.
    Unfunded,
}

impl fmt::Display for RowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowStatus::Allocated => write!(f, "allocated"),
            RowStatus::Unallocated => write!(f, "unallocated"),
            RowStatus::Unfunded => write!(f, "unfunded"),
        }
    }
}

/// One category path of the plan.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanRow {
    pub path: CategoryPath,
    pub fraction_of_whole: f64,
    pub initial_balance: f64,
    pub goal_balance: f64,
    pub balance_delta: f64,
    pub periodic_contribution: f64,
    pub status: RowStatus,
}

/// Column sums over a plan.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanTotals {
    pub fraction_of_whole: f64,
    pub initial_balance: f64,
    pub goal_balance: f64,
    pub balance_delta: f64,
    pub periodic_contribution: f64,
}

/// Per-path goal balances and contributions, sorted by path.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalancingPlan {
    pub schema: Schema,
    pub goal: Goal,
    pub rows: Vec<PlanRow>,
}

/// Computes a [`RebalancingPlan`] for one goal.
#[derive(Clone, Copy, Debug)]
pub struct RebalancingEngine {
    goal: Goal,
}

impl RebalancingEngine {
    pub fn new(goal: Goal) -> Self {
        Self { goal }
    }

    #[inline]
    pub fn goal(&self) -> Goal {
        self.goal
    }

    /// Join target and balances and compute every row.
    ///
    /// The goal is validated first, and the two schemas must match; either
    /// failure returns before any row is computed.
    pub fn plan(
        &self,
        allocation: &AllocationTable,
        balances: &BalanceTable,
    ) -> Result<RebalancingPlan> {
        self.goal.validate()?;
        if allocation.schema() != balances.schema() {
            return Err(Error::BalanceFormat(format!(
                "balance columns {} do not match allocation columns {}",
                balances.schema(),
                allocation.schema()
            )));
        }

        // (fraction, balance, in target, held)
        let mut joined: BTreeMap<CategoryPath, (f64, f64, bool, bool)> = BTreeMap::new();
        for row in allocation.rows() {
            let e = joined.entry(row.path.clone()).or_insert((0.0, 0.0, false, false));
            e.0 += row.fraction_of_whole;
            e.2 = true;
        }
        for (path, balance) in balances.aggregate() {
            let e = joined.entry(path).or_insert((0.0, 0.0, false, false));
            e.1 = balance;
            e.3 = true;
        }

        let periods = self.goal.periods as f64;
        let rows = joined
            .into_iter()
            .map(|(path, (fraction, initial, in_target, held))| {
                let goal_balance = fraction * self.goal.net_worth;
                let balance_delta = goal_balance - initial;
                let status = match (in_target, held) {
                    (true, true) => RowStatus::Allocated,
                    (false, _) => RowStatus::Unallocated,
                    (true, false) => RowStatus::Unfunded,
                };
                PlanRow {
                    path,
                    fraction_of_whole: fraction,
                    initial_balance: initial,
                    goal_balance,
                    balance_delta,
                    periodic_contribution: balance_delta / periods,
                    status,
                }
            })
            .collect();

        Ok(RebalancingPlan {
            schema: allocation.schema().clone(),
            goal: self.goal,
            rows,
        })
    }
}

impl RebalancingPlan {
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for a path, if present.
    pub fn row(&self, path: &CategoryPath) -> Option<&PlanRow> {
        self.rows.iter().find(|r| &r.path == path)
    }

    /// Rows with the given join status.
    pub fn with_status(&self, status: RowStatus) -> impl Iterator<Item = &PlanRow> {
        self.rows.iter().filter(move |r| r.status == status)
    }

    pub fn totals(&self) -> PlanTotals {
        self.rows.iter().fold(PlanTotals::default(), |mut t, r| {
            t.fraction_of_whole += r.fraction_of_whole;
            t.initial_balance += r.initial_balance;
            t.goal_balance += r.goal_balance;
            t.balance_delta += r.balance_delta;
            t.periodic_contribution += r.periodic_contribution;
            t
        })
    }

    /// Write the plan as CSV: path columns, then the numeric columns.
    #[cfg(feature = "csv")]
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header: Vec<&str> = self.schema.columns().iter().map(String::as_str).collect();
        header.extend([
            FRACTION_COLUMN,
            BALANCE_COLUMN,
            "Goal Balance",
            "Balance Delta",
            "Periodic Contribution",
        ]);
        wtr.write_record(&header)?;

        for r in &self.rows {
            let mut record: Vec<String> = r.path.components().to_vec();
            record.extend(
                [
                    r.fraction_of_whole,
                    r.initial_balance,
                    r.goal_balance,
                    r.balance_delta,
                    r.periodic_contribution,
                ]
                .iter()
                .map(f64::to_string),
            );
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Export to a CSV file. Only ever done on request.
    #[cfg(feature = "csv")]
    pub fn export(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}

impl fmt::Display for RebalancingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = column_widths(
            self.schema.columns(),
            self.rows.iter().map(|r| r.path.components()),
        );
        let path_width: usize = widths.iter().map(|w| w + 2).sum();

        for (col, w) in self.schema.columns().iter().zip(widths.iter().copied()) {
            write!(f, "{col:w$}  ")?;
        }
        writeln!(
            f,
            "{:>8} {:>14} {:>14} {:>14} {:>14}  Status",
            "Total %", "Initial", "Goal", "Delta", "Per Period"
        )?;

        for r in &self.rows {
            for (c, w) in r.path.components().iter().zip(widths.iter().copied()) {
                write!(f, "{c:w$}  ")?;
            }
            writeln!(
                f,
                "{:>7.2}% {:>14.2} {:>14.2} {:>+14.2} {:>+14.2}  {}",
                r.fraction_of_whole * 100.0,
                r.initial_balance,
                r.goal_balance,
                r.balance_delta,
                r.periodic_contribution,
                r.status,
            )?;
        }

        let t = self.totals();
        writeln!(
            f,
            "{:path_width$}{:>7.2}% {:>14.2} {:>14.2} {:>+14.2} {:>+14.2}",
            "TOTAL",
            t.fraction_of_whole * 100.0,
            t.initial_balance,
            t.goal_balance,
            t.balance_delta,
            t.periodic_contribution,
        )?;
        writeln!(
            f,
            "\n  Goal: {:.2} in {} periods",
            self.goal.net_worth, self.goal.periods
        )
    }
}
