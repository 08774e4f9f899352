//! CLI entry point for the pinwheel rebalancer.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use pinwheel_rebalancer::config::Config;
use pinwheel_rebalancer::error::Error;
use pinwheel_rebalancer::workflow::{self, PlanOptions, PriceOptions, SunburstOptions};

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Allocation planner: target weights + balances → periodic contributions")]
#[command(version)]
struct Cli {
    /// Path to pinwheel.toml
    #[arg(long, default_value = "pinwheel.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute goal balances and periodic contributions
    Plan {
        /// Allocation JSON (default: from config)
        #[arg(long)]
        allocation: Option<PathBuf>,

        /// Balance CSV (default: from config)
        #[arg(long)]
        balance: Option<PathBuf>,

        /// Write the plan as CSV
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override the goal net worth
        #[arg(long)]
        goal: Option<f64>,

        /// Override the number of periods
        #[arg(long, allow_negative_numbers = true)]
        periods: Option<i64>,
    },

    /// Show the allocation tree and its flattened table
    Allocation {
        #[arg(long)]
        allocation: Option<PathBuf>,

        /// Write the flattened table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Write a zero-balance CSV to fill in
    Template {
        /// Output CSV
        out: PathBuf,

        #[arg(long)]
        allocation: Option<PathBuf>,

        /// Overwrite without asking
        #[arg(long)]
        force: bool,
    },

    /// Align historical prices for several tickers
    Prices {
        /// Tickers to read from <dir>/<TICKER>.csv
        #[arg(required = true)]
        ids: Vec<String>,

        /// Price directory (default: from config)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Keep only dates where every ticker has a price
        #[arg(long)]
        complete: bool,

        /// Write CSV here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Emit chart data as JSON
    #[command(subcommand)]
    Chart(ChartCommand),
}

#[derive(Subcommand)]
enum ChartCommand {
    /// Nested rings over the allocation levels
    Sunburst {
        #[arg(long)]
        allocation: Option<PathBuf>,

        #[arg(long)]
        balance: Option<PathBuf>,

        /// Chart target fractions instead of balances
        #[arg(long)]
        target: bool,

        /// Ring columns, innermost first (default: every allocation level)
        #[arg(long, value_delimiter = ',')]
        levels: Vec<String>,

        /// Column holding segment sizes
        #[arg(long)]
        value: Option<String>,

        /// Column used to relabel duplicated leaves
        #[arg(long)]
        alternate: Option<String>,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Slices for one category's children
    Pie {
        /// Category name (default: root)
        name: Option<String>,

        #[arg(long)]
        allocation: Option<PathBuf>,

        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Plan {
            allocation,
            balance,
            output,
            goal,
            periods,
        } => {
            let opts = PlanOptions {
                allocation,
                balance,
                output,
                goal,
                periods,
            };
            workflow::run_plan(&config, &opts).map(|_| ())
        }
        Command::Allocation { allocation, csv } => {
            workflow::show_allocation(&config, allocation.as_deref(), csv.as_deref()).map(|_| ())
        }
        Command::Template {
            out,
            allocation,
            force,
        } => workflow::write_template(&config, allocation.as_deref(), &out, force).map(|_| ()),
        Command::Prices {
            ids,
            dir,
            complete,
            output,
        } => {
            let opts = PriceOptions {
                ids,
                dir,
                complete,
                output,
            };
            workflow::compile_prices(&config, &opts).map(|_| ())
        }
        Command::Chart(ChartCommand::Sunburst {
            allocation,
            balance,
            target,
            levels,
            value,
            alternate,
            output,
        }) => {
            let opts = SunburstOptions {
                allocation,
                balance,
                target,
                levels,
                value,
                alternate,
                output,
            };
            workflow::chart_sunburst(&config, &opts).map(|_| ())
        }
        Command::Chart(ChartCommand::Pie {
            name,
            allocation,
            output,
        }) => workflow::chart_pie(
            &config,
            allocation.as_deref(),
            name.as_deref(),
            output.as_deref(),
        )
        .map(|_| ()),
    };

    if let Err(e) = result {
        match &e {
            Error::Plan(
                pinwheel::Error::InvalidGoal(_)
                | pinwheel::Error::InvalidGoalHorizon(_)
                | pinwheel::Error::MissingInput(_),
            ) => {
                eprintln!("\nCannot plan: {e}");
                process::exit(2);
            }
            Error::Aborted(msg) => {
                eprintln!("{msg}");
                process::exit(0);
            }
            _ => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }
}
