//! Voter graph: who votes for which stake.
//!
//! The indexer hands us a flat vote list. Delegates vote with everything
//! bonded to them; a delegator who votes on their own moves their stake out
//! of their delegate's vote. The graph keeps one [`VoterRecord`] per
//! *effective voter* and, on each delegate's record, the delegators that
//! overrode it.
//!
//! ## Merge rules
//! - A record's `choice`, once set by a direct vote, is never overwritten.
//! - A record's `overrides`, once appended to, are never reset.
//! - A delegator is listed at most once per delegate.
//! - Records keep first-insertion order; the tally walks them in that order.

use std::collections::HashMap;

use alloy_primitives::Address;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::errors::{AuditError, AuditResult};
use crate::reader::ChainReader;
use crate::types::{DelegationFact, Vote, VoteChoice};
use crate::window::PollWindowState;

// ── Records ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoterRecord {
    /// Set only when this address cast a vote itself.
    pub choice: Option<VoteChoice>,
    pub is_registered_delegate: bool,
    /// Delegators whose own votes override this delegate's allocation.
    pub overrides: Vec<Address>,
}

/// Insertion-ordered map from effective voter to [`VoterRecord`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoterGraph {
    order: Vec<Address>,
    records: HashMap<Address, VoterRecord>,
}

impl VoterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn get(&self, address: &Address) -> Option<&VoterRecord> {
        self.records.get(address)
    }

    /// Records in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &VoterRecord)> + '_ {
        self.order
            .iter()
            .filter_map(move |address| self.records.get(address).map(|record| (address, record)))
    }

    fn entry(&mut self, address: Address) -> &mut VoterRecord {
        if !self.records.contains_key(&address) {
            self.order.push(address);
        }
        self.records.entry(address).or_default()
    }

    /// Record a direct vote. Returns `false` when the address had already
    /// voted; the earlier choice is kept.
    pub fn record_vote(&mut self, voter: Address, choice: VoteChoice) -> bool {
        let record = self.entry(voter);
        match record.choice {
            Some(_) => false,
            None => {
                record.choice = Some(choice);
                true
            }
        }
    }

    pub fn mark_registration(&mut self, voter: Address, is_registered_delegate: bool) {
        self.entry(voter).is_registered_delegate = is_registered_delegate;
    }

    /// List `delegator` as overriding `delegate`, creating the delegate's
    /// record if this is the first reference to it.
    pub fn record_override(&mut self, delegate: Address, delegator: Address) {
        let record = self.entry(delegate);
        if !record.overrides.contains(&delegator) {
            record.overrides.push(delegator);
        }
    }
}

// ── Builder ──────────────────────────────────────────────────────────────────

/// What the chain says about one voter at the evaluation block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoterStanding {
    RegisteredDelegate,
    Delegator(DelegationFact),
}

/// Result of [`build_voter_graph`].
#[derive(Clone, Debug, Default)]
pub struct GraphBuild {
    pub graph: VoterGraph,
    /// Voters whose indexer `registeredTranscoder` flag disagrees with the chain.
    pub registration_mismatches: Vec<Address>,
}

async fn lookup_standing<C>(
    chain: &C,
    window: PollWindowState,
    voter: Address,
) -> AuditResult<VoterStanding>
where
    C: ChainReader + ?Sized,
{
    let at = window.evaluation_block;
    let registered = chain
        .is_registered_delegate(voter, at)
        .await
        .map_err(|err| AuditError::lookup("is_registered_delegate", err))?;
    if registered {
        debug!(%voter, at, "voter is a registered delegate");
        return Ok(VoterStanding::RegisteredDelegate);
    }

    let fact = chain
        .delegation_fact(voter, at)
        .await
        .map_err(|err| AuditError::lookup("delegation_fact", err))?;
    debug!(%voter, delegate = %fact.delegate, at, "voter is a delegator");
    Ok(VoterStanding::Delegator(fact))
}

/// Fold one vote and its chain standing into the graph.
pub fn apply_vote(graph: &mut VoterGraph, vote: &Vote, standing: &VoterStanding) {
    if !graph.record_vote(vote.voter, vote.choice) {
        warn!(voter = %vote.voter, "duplicate vote ignored, first choice kept");
    }
    match standing {
        VoterStanding::RegisteredDelegate => graph.mark_registration(vote.voter, true),
        VoterStanding::Delegator(fact) => {
            graph.mark_registration(vote.voter, false);
            graph.record_override(fact.delegate, vote.voter);
        }
    }
}

/// Build the voter graph for `votes`.
///
/// Standing lookups are issued up to `concurrency` at a time; results are
/// merged strictly in vote order, so the graph does not depend on the
/// concurrency level. The first lookup failure aborts the build.
pub async fn build_voter_graph<C>(
    chain: &C,
    window: PollWindowState,
    votes: &[Vote],
    concurrency: usize,
) -> AuditResult<GraphBuild>
where
    C: ChainReader + ?Sized,
{
    let standings: Vec<VoterStanding> = stream::iter(votes)
        .map(|vote| lookup_standing(chain, window, vote.voter))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut build = GraphBuild::default();
    for (vote, standing) in votes.iter().zip(&standings) {
        let on_chain = matches!(standing, VoterStanding::RegisteredDelegate);
        if vote.registered_transcoder != on_chain
            && !build.registration_mismatches.contains(&vote.voter)
        {
            warn!(
                voter = %vote.voter,
                indexer = vote.registered_transcoder,
                chain = on_chain,
                "indexer registration flag disagrees with chain"
            );
            build.registration_mismatches.push(vote.voter);
        }
        apply_vote(&mut build.graph, vote, standing);
    }

    debug!(records = build.graph.len(), votes = votes.len(), "voter graph built");
    Ok(build)
}
