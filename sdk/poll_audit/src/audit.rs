//! End-to-end audit of one poll.

use std::time::Duration;

use alloy_primitives::Address;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::errors::{AuditError, AuditResult};
use crate::graph::build_voter_graph;
use crate::reader::{ChainReader, Deadline, IndexerReader};
use crate::reconcile::{reconcile, Verdict};
use crate::tally::{tally_votes, Contribution, Tally};
use crate::types::ReportedTally;
use crate::window::PollWindowState;

/// Knobs that do not change the result, only how it is obtained.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AuditOptions {
    /// Maximum number of in-flight lookups.
    pub concurrency: usize,
    /// Upper bound for a single chain or indexer lookup.
    pub lookup_timeout: Duration,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            lookup_timeout: Duration::from_secs(30),
        }
    }
}

impl AuditOptions {
    pub fn sequential() -> Self {
        Self {
            concurrency: 1,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AuditReport {
    pub poll: Address,
    pub window: PollWindowState,
    pub computed: Tally,
    pub reported: ReportedTally,
    pub verdict: Verdict,
    pub contributions: Vec<Contribution>,
    pub registration_mismatches: Vec<Address>,
}

impl AuditReport {
    /// `0` when the indexer agrees with the chain, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.verdict.is_match() {
            0
        } else {
            1
        }
    }
}

/// Audits polls against one chain and one indexer.
///
/// Both readers are wrapped in a [`Deadline`] of `options.lookup_timeout`.
pub struct PollAuditor<C, I> {
    chain: Deadline<C>,
    indexer: Deadline<I>,
    options: AuditOptions,
}

impl<C, I> PollAuditor<C, I>
where
    C: ChainReader,
    I: IndexerReader,
{
    pub fn new(chain: C, indexer: I, options: AuditOptions) -> Self {
        Self {
            chain: Deadline::new(chain, options.lookup_timeout),
            indexer: Deadline::new(indexer, options.lookup_timeout),
            options,
        }
    }

    pub fn chain(&self) -> &C {
        self.chain.inner()
    }

    pub fn indexer(&self) -> &I {
        self.indexer.inner()
    }

    pub fn options(&self) -> AuditOptions {
        self.options
    }

    /// Fix the evaluation block for a run. Called once per audit.
    pub async fn resolve_window(&self, poll: Address) -> AuditResult<PollWindowState> {
        let head = self
            .chain
            .current_block_height()
            .await
            .map_err(|err| AuditError::lookup("current_block_height", err))?;
        let end_block = self
            .chain
            .poll_end_block(poll)
            .await
            .map_err(|err| AuditError::lookup("poll_end_block", err))?;
        Ok(PollWindowState::resolve(head, end_block))
    }

    #[instrument(skip(self), fields(concurrency = self.options.concurrency))]
    pub async fn audit(&self, poll: Address) -> AuditResult<AuditReport> {
        let window = self.resolve_window(poll).await?;
        info!(%window, "poll window resolved");

        let snapshot = self
            .indexer
            .poll_snapshot(poll, window.evaluation_block)
            .await
            .map_err(|err| AuditError::lookup("poll_snapshot", err))?;
        info!(votes = snapshot.votes.len(), "indexer snapshot fetched");

        let build =
            build_voter_graph(&self.chain, window, &snapshot.votes, self.options.concurrency)
                .await?;
        let breakdown =
            tally_votes(&self.chain, window, &build.graph, self.options.concurrency).await?;

        let verdict = reconcile(&breakdown.tally, &snapshot.tally);
        match &verdict {
            Verdict::Match => info!(
                yes = %breakdown.tally.yes,
                no = %breakdown.tally.no,
                "indexer tally matches chain state"
            ),
            Verdict::Mismatch(found) => {
                for discrepancy in found {
                    warn!(%discrepancy, "tally discrepancy");
                }
            }
        }

        Ok(AuditReport {
            poll,
            window,
            computed: breakdown.tally,
            reported: snapshot.tally,
            verdict,
            contributions: breakdown.contributions,
            registration_mismatches: build.registration_mismatches,
        })
    }
}
