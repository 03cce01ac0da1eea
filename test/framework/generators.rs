//! # Property-Based Test Generators
//!
//! Composable `proptest` strategies for generating polls: delegates,
//! delegators bonded to them, and who voted how.
//!
//! ## Design Decisions
//!
//! - Generators produce *plans* (who bonds to whom, who votes), not raw vote
//!   lists, so every generated poll is consistent with the chain fixture and
//!   has a closed-form expected tally.
//! - A delegate's total delegated stake is its own bond plus every delegator's
//!   stake, so override totals can never exceed it.
//! - Stakes are drawn from `u64` to keep sums far from the 256-bit ceiling;
//!   ~20% of values are boundary cases (0, 1, 10^18).

use alloy_primitives::Address;
use poll_audit::{ReportedTally, Stake, Tally, VoteChoice};
use proptest::prelude::*;
use proptest_derive::Arbitrary;

use super::AuditHarness;

// ── Scalar Generators ────────────────────────────────────────────────────────

/// Strategy for stake amounts, biased toward edge cases.
///
/// Distribution:
///   10% → 0
///   10% → 1
///   10% → 10^18 (one token with 18 decimals)
///   70% → uniform in [1, 10^24]
pub fn stake_strategy() -> impl Strategy<Value = u128> {
    prop_oneof![
        1 => Just(0u128),
        1 => Just(1u128),
        1 => Just(1_000_000_000_000_000_000u128),
        7 => (1u128..=1_000_000_000_000_000_000_000_000u128),
    ]
}

/// Strategy for strictly positive stake.
pub fn positive_stake_strategy() -> impl Strategy<Value = u128> {
    prop_oneof![
        1 => Just(1u128),
        1 => Just(1_000_000_000_000_000_000u128),
        8 => (1u128..=1_000_000_000_000_000_000_000_000u128),
    ]
}

/// Strategy for `(head, end_block)` pairs covering active and closed polls.
pub fn window_strategy() -> impl Strategy<Value = (u64, u64)> {
    prop_oneof![
        (0u64..20_000_000u64, 0u64..20_000_000u64),
        (0u64..20u64, 0u64..40u64),
        (1u64..20_000_000u64).prop_map(|b| (b, b)),
    ]
}

/// What an address did in the poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Ballot {
    Abstain,
    Yes,
    No,
}

impl Ballot {
    pub fn choice(self) -> Option<VoteChoice> {
        match self {
            Ballot::Abstain => None,
            Ballot::Yes => Some(VoteChoice::Yes),
            Ballot::No => Some(VoteChoice::No),
        }
    }
}

// ── Poll Plans ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DelegatePlan {
    pub self_bond: u128,
    pub ballot: Ballot,
}

#[derive(Debug, Clone)]
pub struct DelegatorPlan {
    /// Index into [`PollPlan::delegates`].
    pub delegate: usize,
    pub stake: u128,
    pub ballot: Ballot,
}

/// A complete, self-consistent poll.
#[derive(Debug, Clone)]
pub struct PollPlan {
    pub delegates: Vec<DelegatePlan>,
    pub delegators: Vec<DelegatorPlan>,
    /// Record delegate votes before delegator votes in the indexer list.
    pub delegates_vote_first: bool,
}

/// Addresses assigned to a materialized [`PollPlan`].
#[derive(Debug, Clone)]
pub struct PlanAddresses {
    pub delegates: Vec<Address>,
    pub delegators: Vec<Address>,
}

pub fn poll_plan_strategy(
    max_delegates: usize,
    max_delegators: usize,
) -> impl Strategy<Value = PollPlan> {
    (1..=max_delegates)
        .prop_flat_map(move |n_delegates| {
            let delegates = proptest::collection::vec(
                (stake_strategy(), any::<Ballot>())
                    .prop_map(|(self_bond, ballot)| DelegatePlan { self_bond, ballot }),
                n_delegates,
            );
            let delegators = proptest::collection::vec(
                (0..n_delegates, stake_strategy(), any::<Ballot>()).prop_map(
                    |(delegate, stake, ballot)| DelegatorPlan {
                        delegate,
                        stake,
                        ballot,
                    },
                ),
                0..=max_delegators,
            );
            (delegates, delegators, any::<bool>())
        })
        .prop_map(|(delegates, delegators, delegates_vote_first)| PollPlan {
            delegates,
            delegators,
            delegates_vote_first,
        })
}

impl PollPlan {
    /// Total stake bonded to delegate `index`.
    pub fn delegated_total(&self, index: usize) -> u128 {
        self.delegators
            .iter()
            .filter(|d| d.delegate == index)
            .fold(self.delegates[index].self_bond, |acc, d| acc + d.stake)
    }

    /// Closed-form tally: voting delegates carry their delegated total minus
    /// the stake of delegators that voted themselves; voting delegators carry
    /// their own stake.
    pub fn expected_tally(&self) -> Tally {
        let mut tally = Tally::default();
        for (index, delegate) in self.delegates.iter().enumerate() {
            if let Some(choice) = delegate.ballot.choice() {
                let overridden: u128 = self
                    .delegators
                    .iter()
                    .filter(|d| d.delegate == index && d.ballot.choice().is_some())
                    .map(|d| d.stake)
                    .sum();
                let net = self.delegated_total(index) - overridden;
                tally
                    .credit(choice, Stake::from(net))
                    .expect("u128 sums fit in 256 bits");
            }
        }
        for delegator in &self.delegators {
            if let Some(choice) = delegator.ballot.choice() {
                tally
                    .credit(choice, Stake::from(delegator.stake))
                    .expect("u128 sums fit in 256 bits");
            }
        }
        tally
    }

    /// The tally an honest indexer would report.
    pub fn honest_report(&self) -> ReportedTally {
        let tally = self.expected_tally();
        ReportedTally::new(tally.yes.to_string(), tally.no.to_string())
    }

    /// Load the plan into `harness`: chain state, then votes in plan order.
    pub fn materialize(&self, harness: &mut AuditHarness) -> PlanAddresses {
        let delegates: Vec<Address> = (0..self.delegates.len())
            .map(|index| harness.delegate(self.delegated_total(index)))
            .collect();
        let delegators: Vec<Address> = self
            .delegators
            .iter()
            .map(|d| harness.delegator(delegates[d.delegate], d.stake))
            .collect();

        let delegate_votes = self
            .delegates
            .iter()
            .zip(&delegates)
            .filter_map(|(plan, addr)| plan.ballot.choice().map(|c| (*addr, c)));
        let delegator_votes = self
            .delegators
            .iter()
            .zip(&delegators)
            .filter_map(|(plan, addr)| plan.ballot.choice().map(|c| (*addr, c)));

        let ordered: Vec<(Address, VoteChoice)> = if self.delegates_vote_first {
            delegate_votes.chain(delegator_votes).collect()
        } else {
            delegator_votes.chain(delegate_votes).collect()
        };
        for (voter, choice) in ordered {
            harness.vote(voter, choice);
        }

        PlanAddresses {
            delegates,
            delegators,
        }
    }
}
