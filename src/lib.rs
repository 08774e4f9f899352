//! # pinwheel
//!
//! Hierarchical target asset allocation and periodic rebalancing plans.
//!
//! ## Features
//!
//! - **Weighted hierarchy**: categories nested to any depth, raw weights
//!   normalized per parent, totals derived along the path to the root
//! - **Flat projection**: one row per leaf keyed by its category path
//! - **Rebalancing**: outer join against actual balances, with goal balance,
//!   delta, and per-period contribution for every path
//! - **Fail-fast validation**: inconsistent category levels are rejected at build time
//!
//! ## Quick Start
//!
//! ```
//! use pinwheel::{
//!     AllocationTable, AllocationTree, BalanceRecord, BalanceTable, CategoryPath, Goal,
//!     NodeDescriptor, RebalancingEngine,
//! };
//!
//! let desc = NodeDescriptor::root("Portfolio", "Mine").with_children([
//!     NodeDescriptor::new("Asset Class", "A", 3.0),
//!     NodeDescriptor::new("Asset Class", "B", 1.0),
//! ]);
//! let tree = AllocationTree::build(&desc).unwrap();
//! let table = AllocationTable::project(&tree);
//!
//! let balances = BalanceTable::new(
//!     table.schema().clone(),
//!     vec![BalanceRecord::new(CategoryPath::new(["A"]), 6000.0)],
//! )
//! .unwrap();
//!
//! let plan = RebalancingEngine::new(Goal::new(8000.0, 4))
//!     .plan(&table, &balances)
//!     .unwrap();
//!
//! let b = plan.row(&CategoryPath::new(["B"])).unwrap();
//! assert_eq!(b.goal_balance, 2000.0);
//! assert_eq!(b.periodic_contribution, 500.0);
//! ```
//!
//! ## Loading From Files
//!
//! With the default `json` and `csv` features:
//!
//! ```ignore
//! use pinwheel::{AllocationTable, AllocationTree, BalanceTable, Goal, Portfolio};
//! use std::path::Path;
//!
//! let tree = AllocationTree::load(Path::new("pinwheel_allocation.json"))?;
//! let schema = AllocationTable::project(&tree).schema().clone();
//! let balances = BalanceTable::load(Path::new("balance.csv"), &schema)?;
//!
//! let plan = Portfolio::new("Sam", Goal::new(25_000.0, 12))
//!     .with_allocation(tree)
//!     .with_balances(balances)
//!     .rebalance()?;
//! plan.export(Path::new("goals.csv"))?;
//! ```
//!
//! ## Diagnostic Render
//!
//! ```
//! use pinwheel::{AllocationTree, NodeDescriptor};
//!
//! let tree = AllocationTree::build(&NodeDescriptor::root("Portfolio", "P").with_children([
//!     NodeDescriptor::new("Asset Class", "Stocks", 1.0),
//!     NodeDescriptor::new("Asset Class", "Bonds", 1.0),
//! ]))
//! .unwrap();
//!
//! assert_eq!(
//!     tree.to_string(),
//!     "P, 100.00% of parent, 100.00% of total\n\
//!      ├── Stocks, 50.00% of parent, 50.00% of total\n\
//!      └── Bonds, 50.00% of parent, 50.00% of total\n"
//! );
//! ```

mod balance;
mod descriptor;
mod error;
mod portfolio;
mod rebalance;
mod table;
mod tree;
mod types;

// Re-export public API
pub use balance::{BALANCE_COLUMN, BalanceRecord, BalanceTable};
pub use descriptor::NodeDescriptor;
pub use error::{Error, Result};
pub use portfolio::Portfolio;
pub use rebalance::{Goal, PlanRow, PlanTotals, RebalancingEngine, RebalancingPlan, RowStatus};
pub use table::{AllocationRow, AllocationTable, FRACTION_COLUMN};
pub use tree::{AllocationTree, CategoryNode};
pub use types::{CategoryPath, NOT_APPLICABLE, NodeId, Schema};
