//! Command workflows: load → project → join → report.
//!
//! Each public function backs one CLI command and ties together the core
//! library, the audit trail and terminal output.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use pinwheel::{
    AllocationTable, AllocationTree, BALANCE_COLUMN, BalanceTable, FRACTION_COLUMN, Goal,
    Portfolio, RebalancingPlan, RowStatus,
};

use crate::audit::{self, AuditLog};
use crate::chart::{self, ChartTable, PieSlice, SunburstNode};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::prices::{CsvDirectoryProvider, PriceFrame};

/// Options for a `plan` run. Every field overrides the config when set.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub allocation: Option<PathBuf>,
    pub balance: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub goal: Option<f64>,
    pub periods: Option<i64>,
}

/// Options for a `prices` run.
#[derive(Debug, Clone, Default)]
pub struct PriceOptions {
    pub ids: Vec<String>,
    pub dir: Option<PathBuf>,
    pub complete: bool,
    pub output: Option<PathBuf>,
}

/// Options for `chart sunburst`.
#[derive(Debug, Clone, Default)]
pub struct SunburstOptions {
    pub allocation: Option<PathBuf>,
    pub balance: Option<PathBuf>,
    /// Chart the target allocation instead of held balances.
    pub target: bool,
    /// Ring columns; empty means every allocation level.
    pub levels: Vec<String>,
    pub value: Option<String>,
    pub alternate: Option<String>,
    pub output: Option<PathBuf>,
}

/// Compute the rebalancing plan, print it, and export it when an output is set.
pub fn run_plan(config: &Config, opts: &PlanOptions) -> Result<RebalancingPlan> {
    audited(config, "plan", |audit| plan_steps(config, opts, audit))
}

fn plan_steps(
    config: &Config,
    opts: &PlanOptions,
    audit: &mut AuditLog,
) -> Result<RebalancingPlan> {
    // 1. Resolve goal
    let goal = apply_goal_overrides(config.goal(), opts.goal, opts.periods);
    info!(
        "Goal: {:.2} in {} periods for {}",
        goal.net_worth,
        goal.periods,
        config.portfolio_name()
    );

    // 2. Load allocation
    let (alloc_path, tree) = load_allocation(config, opts.allocation.as_deref())?;
    audit::log_allocation_loaded(audit, &alloc_path, &tree)?;
    let mut portfolio = Portfolio::new(config.investor.name.clone(), goal)
        .with_name(config.portfolio_name())
        .with_allocation(tree);
    let table = portfolio.allocation_table()?;

    // 3. Load balances (a missing balance file is reported by the portfolio)
    if let Some(path) = opts.balance.clone().or_else(|| config.balance_path()) {
        let balances = load_balances(&path, &table)?;
        audit::log_balances_loaded(audit, &path, &balances)?;
        portfolio.set_balances(balances);
    }

    // 4. Join and compute
    let plan = portfolio.rebalance()?;
    audit::log_plan(audit, &plan)?;
    display_plan(portfolio.name(), &plan);

    // 5. Export
    if let Some(out) = opts.output.clone().or_else(|| config.output_path()) {
        plan.export(&out)?;
        info!("Wrote {} plan rows to {}", plan.len(), out.display());
        audit::log_plan_exported(audit, &out, plan.len())?;
    }

    Ok(plan)
}

/// Print the allocation tree and its projected table; optionally write the table as CSV.
pub fn show_allocation(
    config: &Config,
    allocation: Option<&Path>,
    csv: Option<&Path>,
) -> Result<AllocationTable> {
    audited(config, "allocation", |audit| {
        let (path, tree) = load_allocation(config, allocation)?;
        audit::log_allocation_loaded(audit, &path, &tree)?;
        let table = AllocationTable::project(&tree);

        println!("{tree}");
        println!("{table}");

        if let Some(out) = csv {
            let file = std::fs::File::create(out)?;
            table.write_csv(std::io::BufWriter::new(file))?;
            info!("Wrote {} allocation rows to {}", table.len(), out.display());
            audit::log_plan_exported(audit, out, table.len())?;
        }
        Ok(table)
    })
}

/// Write a zero-balance CSV with one row per allocation leaf.
///
/// An existing file is only replaced with `force` or after confirmation.
pub fn write_template(
    config: &Config,
    allocation: Option<&Path>,
    out: &Path,
    force: bool,
) -> Result<BalanceTable> {
    audited(config, "template", |audit| {
        let (path, tree) = load_allocation(config, allocation)?;
        audit::log_allocation_loaded(audit, &path, &tree)?;
        let template = BalanceTable::template(&AllocationTable::project(&tree));

        if out.exists() && !force {
            let confirmed = dialoguer::Confirm::new()
                .with_prompt(format!("{} exists. Overwrite?", out.display()))
                .default(false)
                .interact()
                .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;

            audit.log("user_confirmed", serde_json::json!({"approved": confirmed}))?;
            if !confirmed {
                return Err(Error::Aborted(format!("{} left unchanged", out.display())));
            }
        }

        let file = std::fs::File::create(out)?;
        template.write_csv(std::io::BufWriter::new(file))?;
        println!(
            "Wrote template with {} rows ({}) to {}",
            template.len(),
            template.schema(),
            out.display()
        );
        audit::log_plan_exported(audit, out, template.len())?;
        Ok(template)
    })
}

/// Align price histories for `opts.ids` and write them as CSV.
///
/// Output goes to `opts.output`, or stdout when unset.
pub fn compile_prices(config: &Config, opts: &PriceOptions) -> Result<PriceFrame> {
    if opts.ids.is_empty() {
        return Err(Error::Prices("no identifiers given".into()));
    }
    audited(config, "prices", |audit| {
        let dir = opts.dir.clone().unwrap_or_else(|| config.price_dir());
        let provider = CsvDirectoryProvider::new(dir).with_column(config.prices.column.clone());
        debug!("Reading prices from {}", provider.dir().display());

        let mut frame = PriceFrame::compile(&provider, opts.ids.as_slice())?;
        if opts.complete {
            let before = frame.len();
            frame = frame.drop_incomplete();
            if frame.len() < before {
                warn!("Dropped {} dates with missing prices", before - frame.len());
            }
        }
        info!("{} identifiers over {} dates", frame.ids().len(), frame.len());
        audit.log(
            "prices_compiled",
            serde_json::json!({
                "ids": frame.ids(),
                "dates": frame.len(),
                "complete": opts.complete,
            }),
        )?;

        match &opts.output {
            Some(out) => {
                frame.export(out)?;
                info!("Wrote prices to {}", out.display());
            }
            None => frame.write_csv(std::io::stdout().lock())?,
        }
        Ok(frame)
    })
}

/// Emit sunburst segments for held balances, or for the target with `opts.target`.
pub fn chart_sunburst(config: &Config, opts: &SunburstOptions) -> Result<Vec<SunburstNode>> {
    let (_, tree) = load_allocation(config, opts.allocation.as_deref())?;
    let table = AllocationTable::project(&tree);

    let levels = if opts.levels.is_empty() {
        table.schema().columns().to_vec()
    } else {
        opts.levels.clone()
    };

    let (data, default_value) = if opts.target {
        (ChartTable::from_allocation(&table), FRACTION_COLUMN)
    } else {
        let path = opts
            .balance
            .clone()
            .or_else(|| config.balance_path())
            .ok_or(pinwheel::Error::MissingInput("balance"))?;
        // Raw CSV keeps extra columns such as an account name for relabeling
        let file = std::fs::File::open(&path)?;
        (ChartTable::from_csv(file)?, BALANCE_COLUMN)
    };
    let value = opts.value.as_deref().unwrap_or(default_value);

    let nodes = chart::sunburst(&data, levels.as_slice(), value, opts.alternate.as_deref())?;
    info!("{} sunburst segments over {} rows", nodes.len(), data.len());
    emit(&chart::to_json(&nodes)?, opts.output.as_deref())?;
    Ok(nodes)
}

/// Emit pie slices for the children of `name` (the root when `None`).
pub fn chart_pie(
    config: &Config,
    allocation: Option<&Path>,
    name: Option<&str>,
    output: Option<&Path>,
) -> Result<Vec<PieSlice>> {
    let (_, tree) = load_allocation(config, allocation)?;
    let slices = chart::pie(&tree, name)?;
    if slices.is_empty() {
        warn!("{} has no subcategories", name.unwrap_or("root"));
    }
    emit(&chart::to_json(&slices)?, output)?;
    Ok(slices)
}

// === Helpers ===

/// Bracket a command with `run_started` and `run_completed`, recording failures too.
fn audited<T>(
    config: &Config,
    command: &str,
    run: impl FnOnce(&mut AuditLog) -> Result<T>,
) -> Result<T> {
    let mut audit = AuditLog::open(&config.audit_path())?;
    audit::log_run_started(&mut audit, command, &config.investor.name)?;
    let result = run(&mut audit);
    audit::log_run_completed(&mut audit, command, result.is_ok())?;
    result
}

/// Replace goal fields given on the command line.
pub fn apply_goal_overrides(base: Goal, net_worth: Option<f64>, periods: Option<i64>) -> Goal {
    Goal::new(
        net_worth.unwrap_or(base.net_worth),
        periods.unwrap_or(base.periods),
    )
}

fn load_allocation(config: &Config, over: Option<&Path>) -> Result<(PathBuf, AllocationTree)> {
    let path = over
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.allocation_path());
    let tree = AllocationTree::load(&path).map_err(|e| Error::Load {
        what: "allocation",
        path: path.clone(),
        source: e,
    })?;
    info!(
        "Loaded allocation from {} ({} categories, {} leaves)",
        path.display(),
        tree.len(),
        tree.leaves().len()
    );
    Ok((path, tree))
}

fn load_balances(path: &Path, table: &AllocationTable) -> Result<BalanceTable> {
    let balances = BalanceTable::load(path, table.schema()).map_err(|e| Error::Load {
        what: "balances",
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(
        "Loaded {} balance records totalling {:.2} from {}",
        balances.len(),
        balances.total(),
        path.display()
    );
    Ok(balances)
}

fn emit(json: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(out) => {
            std::fs::write(out, json)?;
            info!("Wrote chart data to {}", out.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn display_plan(name: &str, plan: &RebalancingPlan) {
    println!("\n{name}\n");
    println!("{plan}");

    let unallocated: Vec<_> = plan.with_status(RowStatus::Unallocated).collect();
    if !unallocated.is_empty() {
        warn!(
            "{} holdings are outside the allocation and will be sold down",
            unallocated.len()
        );
        for row in &unallocated {
            println!("  unallocated: {} ({:.2})", row.path, row.initial_balance);
        }
    }
    let unfunded = plan.with_status(RowStatus::Unfunded).count();
    if unfunded > 0 {
        info!("{unfunded} allocation targets have no current balance");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_overrides_replace_only_given_fields() {
        let base = Goal::new(1000.0, 12);
        assert_eq!(apply_goal_overrides(base, None, None), base);
        assert_eq!(apply_goal_overrides(base, Some(5.0), None), Goal::new(5.0, 12));
        assert_eq!(apply_goal_overrides(base, None, Some(3)), Goal::new(1000.0, 3));
    }
}
