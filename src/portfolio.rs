//! An investor's portfolio: target allocation, actual balances, and goal.

use crate::balance::BalanceTable;
use crate::error::{Error, Result};
use crate::rebalance::{Goal, RebalancingEngine, RebalancingPlan};
use crate::table::AllocationTable;
use crate::tree::AllocationTree;

/// Everything needed to produce a rebalancing plan.
///
/// Allocation and balances may be attached in any order; [`rebalance`]
/// reports whichever is still missing.
///
/// [`rebalance`]: Portfolio::rebalance
#[derive(Clone, Debug)]
pub struct Portfolio {
    investor: String,
    name: String,
    goal: Goal,
    allocation: Option<AllocationTree>,
    balances: Option<BalanceTable>,
}

impl Portfolio {
    /// A portfolio named after its investor ("<investor>'s Portfolio").
    pub fn new(investor: impl Into<String>, goal: Goal) -> Self {
        let investor = investor.into();
        let name = format!("{investor}'s Portfolio");
        Self {
            investor,
            name,
            goal,
            allocation: None,
            balances: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_allocation(mut self, tree: AllocationTree) -> Self {
        self.allocation = Some(tree);
        self
    }

    pub fn with_balances(mut self, balances: BalanceTable) -> Self {
        self.balances = Some(balances);
        self
    }

    pub fn set_allocation(&mut self, tree: AllocationTree) {
        self.allocation = Some(tree);
    }

    pub fn set_balances(&mut self, balances: BalanceTable) {
        self.balances = Some(balances);
    }

    pub fn set_goal(&mut self, goal: Goal) {
        self.goal = goal;
    }

    #[inline]
    pub fn investor(&self) -> &str {
        &self.investor
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn goal(&self) -> Goal {
        self.goal
    }

    #[inline]
    pub fn allocation(&self) -> Option<&AllocationTree> {
        self.allocation.as_ref()
    }

    #[inline]
    pub fn balances(&self) -> Option<&BalanceTable> {
        self.balances.as_ref()
    }

    /// Project the target allocation, if one is attached.
    pub fn allocation_table(&self) -> Result<AllocationTable> {
        let tree = self.allocation.as_ref().ok_or(Error::MissingInput("allocation"))?;
        Ok(AllocationTable::project(tree))
    }

    /// Compute the plan from the attached allocation and balances.
    ///
    /// Fails with [`Error::MissingInput`] before doing anything else when
    /// either input is absent.
    pub fn rebalance(&self) -> Result<RebalancingPlan> {
        let tree = self.allocation.as_ref().ok_or(Error::MissingInput("allocation"))?;
        let balances = self.balances.as_ref().ok_or(Error::MissingInput("balance"))?;
        RebalancingEngine::new(self.goal).plan(&AllocationTable::project(tree), balances)
    }
}
