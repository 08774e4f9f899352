//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use pinwheel::{AllocationTree, BalanceTable, RebalancingPlan, RowStatus};
use serde::Serialize;

use crate::error::Result;

/// One line of the trail: event name and timestamp, then the event's fields.
#[derive(Serialize)]
struct Entry<'a> {
    event: &'a str,
    ts: DateTime<Utc>,
    #[serde(flatten)]
    data: &'a serde_json::Value,
}

/// Append-only JSONL writer shared by every rebalancer command.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Append to `path`, creating it and missing directories on first use.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Write one event; `data` must be a JSON object so its fields flatten.
    pub fn log(&mut self, event: &str, data: serde_json::Value) -> Result<()> {
        let line = serde_json::to_string(&Entry {
            event,
            ts: Utc::now(),
            data: &data,
        })?;
        writeln!(self.writer, "{line}")?;
        // Flushed per event so a failed run still leaves its trail on disk.
        self.writer.flush()?;
        Ok(())
    }
}

/// Convenience: log a run start event.
pub fn log_run_started(audit: &mut AuditLog, command: &str, investor: &str) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "command": command,
            "investor": investor,
        }),
    )
}

/// Convenience: log the loaded allocation hierarchy.
pub fn log_allocation_loaded(
    audit: &mut AuditLog,
    file: &Path,
    tree: &AllocationTree,
) -> Result<()> {
    audit.log(
        "allocation_loaded",
        serde_json::json!({
            "file": file.display().to_string(),
            "nodes": tree.len(),
            "leaves": tree.leaves().len(),
        }),
    )
}

/// Convenience: log the loaded balance table.
pub fn log_balances_loaded(
    audit: &mut AuditLog,
    file: &Path,
    balances: &BalanceTable,
) -> Result<()> {
    audit.log(
        "balances_loaded",
        serde_json::json!({
            "file": file.display().to_string(),
            "records": balances.len(),
            "total": balances.total(),
        }),
    )
}

/// Convenience: log a computed plan.
pub fn log_plan(audit: &mut AuditLog, plan: &RebalancingPlan) -> Result<()> {
    let totals = plan.totals();
    audit.log(
        "plan_computed",
        serde_json::json!({
            "net_worth": plan.goal.net_worth,
            "periods": plan.goal.periods,
            "rows": plan.len(),
            "unallocated": plan.with_status(RowStatus::Unallocated).count(),
            "unfunded": plan.with_status(RowStatus::Unfunded).count(),
            "initial_balance": totals.initial_balance,
            "periodic_contribution": totals.periodic_contribution,
        }),
    )
}

/// Convenience: log a written output file.
pub fn log_plan_exported(audit: &mut AuditLog, file: &Path, rows: usize) -> Result<()> {
    audit.log(
        "plan_exported",
        serde_json::json!({
            "file": file.display().to_string(),
            "rows": rows,
        }),
    )
}

/// Convenience: log run completion.
pub fn log_run_completed(audit: &mut AuditLog, command: &str, ok: bool) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "command": command,
            "ok": ok,
        }),
    )
}
