//! Stake tally engine.
//!
//! ## Vote weight
//! ```text
//! registered delegate  net = delegated_stake(delegate) − Σ pending_stake(override)
//! individual voter     net = pending_stake(voter)
//! ```
//! All stake is read at the run's single evaluation block. The subtraction is
//! checked: an override total above the delegate's stake is a data-integrity
//! fault, never clamped to zero.

use alloy_primitives::Address;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::debug;

use crate::errors::{AuditError, AuditResult, IntegrityFault};
use crate::graph::{VoterGraph, VoterRecord};
use crate::reader::ChainReader;
use crate::types::{serialize_decimal, Stake, VoteChoice};
use crate::window::PollWindowState;

// ── Tally ────────────────────────────────────────────────────────────────────

/// Cumulative yes/no stake.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    #[serde(serialize_with = "serialize_decimal")]
    pub yes: Stake,
    #[serde(serialize_with = "serialize_decimal")]
    pub no: Stake,
}

impl Tally {
    pub fn side(&self, choice: VoteChoice) -> Stake {
        match choice {
            VoteChoice::Yes => self.yes,
            VoteChoice::No => self.no,
        }
    }

    /// Add `amount` to `choice`'s side.
    pub fn credit(&mut self, choice: VoteChoice, amount: Stake) -> Result<(), IntegrityFault> {
        let side = match choice {
            VoteChoice::Yes => &mut self.yes,
            VoteChoice::No => &mut self.no,
        };
        *side = side
            .checked_add(amount)
            .ok_or(IntegrityFault::TallyOverflow { side: choice })?;
        Ok(())
    }

    /// Base-10 rendering of one side, as compared against the indexer.
    pub fn decimal(&self, choice: VoteChoice) -> String {
        self.side(choice).to_string()
    }
}

/// Net weight of one voting record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Contribution {
    pub voter: Address,
    pub choice: VoteChoice,
    pub is_registered_delegate: bool,
    #[serde(serialize_with = "serialize_decimal")]
    pub base_stake: Stake,
    #[serde(serialize_with = "serialize_decimal")]
    pub override_stake: Stake,
    #[serde(serialize_with = "serialize_decimal")]
    pub net_stake: Stake,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TallyBreakdown {
    pub tally: Tally,
    /// One entry per voting record, in graph order.
    pub contributions: Vec<Contribution>,
}

/// `base - Σ overrides`, refusing to go below zero.
pub fn net_stake(
    delegate: Address,
    base: Stake,
    overrides: &[Stake],
) -> Result<(Stake, Stake), IntegrityFault> {
    let mut override_total = Stake::ZERO;
    for stake in overrides {
        override_total = override_total.checked_add(*stake).ok_or(
            IntegrityFault::OverrideExceedsStake {
                delegate,
                base,
                overrides: Stake::MAX,
            },
        )?;
    }
    let net = base
        .checked_sub(override_total)
        .ok_or(IntegrityFault::OverrideExceedsStake {
            delegate,
            base,
            overrides: override_total,
        })?;
    Ok((override_total, net))
}

// ── Engine ───────────────────────────────────────────────────────────────────

async fn weigh_record<C>(
    chain: &C,
    window: PollWindowState,
    voter: Address,
    record: &VoterRecord,
    choice: VoteChoice,
) -> AuditResult<Contribution>
where
    C: ChainReader + ?Sized,
{
    let at = window.evaluation_block;

    if !record.is_registered_delegate {
        if !record.overrides.is_empty() {
            debug!(%voter, overrides = record.overrides.len(), "ignoring overrides on non-delegate");
        }
        let base = chain
            .voter_pending_stake(voter, at)
            .await
            .map_err(|err| AuditError::lookup("voter_pending_stake", err))?;
        return Ok(Contribution {
            voter,
            choice,
            is_registered_delegate: false,
            base_stake: base,
            override_stake: Stake::ZERO,
            net_stake: base,
        });
    }

    let base = chain
        .delegate_total_stake(voter, at)
        .await
        .map_err(|err| AuditError::lookup("delegate_total_stake", err))?;

    let mut override_stakes = Vec::with_capacity(record.overrides.len());
    for delegator in &record.overrides {
        let stake = chain
            .voter_pending_stake(*delegator, at)
            .await
            .map_err(|err| AuditError::lookup("voter_pending_stake", err))?;
        override_stakes.push(stake);
    }

    let (override_stake, net) = net_stake(voter, base, &override_stakes)?;
    debug!(%voter, %base, %override_stake, %net, "delegate vote weighed");
    Ok(Contribution {
        voter,
        choice,
        is_registered_delegate: true,
        base_stake: base,
        override_stake,
        net_stake: net,
    })
}

/// Fold contributions into a tally, in order.
pub fn accumulate(contributions: Vec<Contribution>) -> AuditResult<TallyBreakdown> {
    let mut tally = Tally::default();
    for contribution in &contributions {
        tally.credit(contribution.choice, contribution.net_stake)?;
    }
    Ok(TallyBreakdown {
        tally,
        contributions,
    })
}

/// Tally every record of `graph` that carries a choice.
///
/// Per-record lookups run up to `concurrency` at a time and are accumulated
/// in graph order. Records without a choice (delegates that never voted)
/// contribute nothing.
pub async fn tally_votes<C>(
    chain: &C,
    window: PollWindowState,
    graph: &VoterGraph,
    concurrency: usize,
) -> AuditResult<TallyBreakdown>
where
    C: ChainReader + ?Sized,
{
    let voting = graph
        .iter()
        .filter_map(|(voter, record)| record.choice.map(|choice| (*voter, record, choice)));

    let contributions: Vec<Contribution> = stream::iter(voting)
        .map(|(voter, record, choice)| weigh_record(chain, window, voter, record, choice))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    accumulate(contributions)
}
