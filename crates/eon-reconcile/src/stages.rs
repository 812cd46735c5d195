//! Stage graph.
//!
//! Each stage names its prerequisites. `plan` expands targets to their
//! prerequisite closure in a deterministic topological order (ties broken by
//! declaration order), and `validate_order` rejects an explicit sequence
//! that runs a stage before one it depends on.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::error::{ReconcileError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    RateModelsDeploy,
    ComptrollerDeploy,
    ComptrollerSetImplementation,
    MarketsDeploy,
    OracleDeploy,
    OracleInit,
    MarketsSupport,
    MarketsSyncParams,
    ComptrollerInit,
    OracleCheck,
    MarketsRates,
    RewardDistributorInit,
}

impl Stage {
    /// Declaration order; also the tie-break order of `plan`.
    pub const ALL: [Stage; 12] = [
        Stage::RateModelsDeploy,
        Stage::ComptrollerDeploy,
        Stage::ComptrollerSetImplementation,
        Stage::MarketsDeploy,
        Stage::OracleDeploy,
        Stage::OracleInit,
        Stage::MarketsSupport,
        Stage::MarketsSyncParams,
        Stage::ComptrollerInit,
        Stage::OracleCheck,
        Stage::MarketsRates,
        Stage::RewardDistributorInit,
    ];

    /// The `initial-setup` pipeline.
    pub const INITIAL_SETUP: [Stage; 8] = [
        Stage::RateModelsDeploy,
        Stage::ComptrollerDeploy,
        Stage::ComptrollerSetImplementation,
        Stage::MarketsDeploy,
        Stage::OracleDeploy,
        Stage::OracleInit,
        Stage::MarketsSupport,
        Stage::MarketsSyncParams,
    ];

    pub fn task_name(&self) -> &'static str {
        match self {
            Stage::RateModelsDeploy => "rate-models/deploy",
            Stage::ComptrollerDeploy => "comptroller/deploy",
            Stage::ComptrollerSetImplementation => "comptroller/set-implementation",
            Stage::MarketsDeploy => "markets/deploy",
            Stage::OracleDeploy => "oracle/deploy",
            Stage::OracleInit => "oracle/init",
            Stage::MarketsSupport => "markets/support",
            Stage::MarketsSyncParams => "markets/sync-params",
            Stage::ComptrollerInit => "comptroller/init",
            Stage::OracleCheck => "oracle/check",
            Stage::MarketsRates => "markets/rates",
            Stage::RewardDistributorInit => "reward-distributor/init",
        }
    }

    pub fn parse(s: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|st| st.task_name() == s.trim())
    }

    pub fn prerequisites(&self) -> &'static [Stage] {
        match self {
            Stage::RateModelsDeploy | Stage::ComptrollerDeploy | Stage::OracleDeploy => &[],
            Stage::ComptrollerSetImplementation => &[Stage::ComptrollerDeploy],
            Stage::MarketsDeploy => &[Stage::RateModelsDeploy, Stage::ComptrollerSetImplementation],
            Stage::OracleInit => &[Stage::OracleDeploy, Stage::ComptrollerSetImplementation],
            Stage::MarketsSupport => &[Stage::MarketsDeploy],
            // Non-zero collateral factors need a price for the market.
            Stage::MarketsSyncParams => &[Stage::MarketsSupport, Stage::OracleInit],
            Stage::ComptrollerInit | Stage::RewardDistributorInit => &[Stage::ComptrollerSetImplementation],
            Stage::OracleCheck => &[Stage::OracleInit, Stage::MarketsDeploy],
            Stage::MarketsRates => &[Stage::MarketsDeploy],
        }
    }

    fn rank(&self) -> usize {
        Stage::ALL.iter().position(|s| s == self).unwrap_or(usize::MAX)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.task_name())
    }
}

/// `targets` plus everything they transitively depend on, prerequisites
/// first.
pub fn plan(targets: &[Stage]) -> Vec<Stage> {
    let mut wanted = BTreeSet::new();
    let mut stack: Vec<Stage> = targets.to_vec();
    while let Some(s) = stack.pop() {
        if wanted.insert(s) {
            stack.extend_from_slice(s.prerequisites());
        }
    }

    // Kahn's algorithm; the ready set is ordered by declaration rank.
    let mut done: Vec<Stage> = Vec::with_capacity(wanted.len());
    while done.len() < wanted.len() {
        let next = wanted
            .iter()
            .filter(|s| !done.contains(*s))
            .filter(|s| s.prerequisites().iter().all(|p| done.contains(p)))
            .min_by_key(|s| s.rank())
            .copied();
        match next {
            Some(s) => done.push(s),
            // The graph is static and acyclic.
            None => break,
        }
    }
    done
}

/// Reject a sequence in which a stage precedes one of its prerequisites.
/// Prerequisites absent from the sequence are assumed to have run earlier.
pub fn validate_order(sequence: &[Stage]) -> Result<()> {
    for (i, stage) in sequence.iter().enumerate() {
        for pre in stage.prerequisites() {
            if let Some(j) = sequence.iter().position(|s| s == pre) {
                if j > i {
                    return Err(ReconcileError::state(format!(
                        "{stage} must run after {pre}"
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_plan_is_the_initial_setup_order() {
        assert_eq!(plan(&[Stage::MarketsSyncParams]), Stage::INITIAL_SETUP.to_vec());
        assert_eq!(plan(&Stage::INITIAL_SETUP), Stage::INITIAL_SETUP.to_vec());
        assert!(validate_order(&Stage::INITIAL_SETUP).is_ok());
    }

    #[test]
    fn plan_of_leaf_stage_is_itself() {
        assert_eq!(plan(&[Stage::ComptrollerDeploy]), vec![Stage::ComptrollerDeploy]);
        assert_eq!(plan(&[]), Vec::<Stage>::new());
    }

    #[test]
    fn task_names_round_trip() {
        for s in Stage::ALL {
            assert_eq!(Stage::parse(s.task_name()), Some(s));
        }
        assert_eq!(Stage::parse("deploy"), None);
    }

    #[test]
    fn out_of_order_sequence_is_a_state_error() {
        let err = validate_order(&[Stage::MarketsDeploy, Stage::RateModelsDeploy]).unwrap_err();
        assert_eq!(
            err,
            ReconcileError::State("markets/deploy must run after rate-models/deploy".to_string())
        );
    }
}
