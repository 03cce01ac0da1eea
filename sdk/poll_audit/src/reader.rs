//! Collaborator seams: point-in-time chain reads and the indexer snapshot.
//!
//! Both traits are read-only; implementations must be safe to call
//! concurrently from one task.

use std::future::Future;
use std::time::Duration;

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::errors::LookupError;
use crate::types::{BlockNumber, DelegationFact, IndexedPoll, Stake};

#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Height of the latest block.
    async fn current_block_height(&self) -> Result<BlockNumber, LookupError>;

    /// The poll's configured end block.
    async fn poll_end_block(&self, poll: Address) -> Result<BlockNumber, LookupError>;

    /// Total stake delegated to `delegate` as of `at`.
    async fn delegate_total_stake(
        &self,
        delegate: Address,
        at: BlockNumber,
    ) -> Result<Stake, LookupError>;

    /// `voter`'s own pending (bonded plus unclaimed) stake as of `at`.
    async fn voter_pending_stake(
        &self,
        voter: Address,
        at: BlockNumber,
    ) -> Result<Stake, LookupError>;

    async fn is_registered_delegate(
        &self,
        account: Address,
        at: BlockNumber,
    ) -> Result<bool, LookupError>;

    async fn delegation_fact(
        &self,
        delegator: Address,
        at: BlockNumber,
    ) -> Result<DelegationFact, LookupError>;
}

#[async_trait]
pub trait IndexerReader: Send + Sync {
    /// The indexer's tally and vote list for `poll` as of block `at`.
    async fn poll_snapshot(&self, poll: Address, at: BlockNumber)
        -> Result<IndexedPoll, LookupError>;
}

// ── Deadline wrapper ─────────────────────────────────────────────────────────

/// Bounds every call of the wrapped reader by a fixed timeout.
///
/// Expiry surfaces as [`LookupError::Timeout`] and aborts the run like any
/// other lookup failure.
#[derive(Clone, Debug)]
pub struct Deadline<R> {
    inner: R,
    limit: Duration,
}

impl<R> Deadline<R> {
    pub fn new(inner: R, limit: Duration) -> Self {
        Self { inner, limit }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, LookupError>
    where
        F: Future<Output = Result<T, LookupError>>,
    {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout(self.limit)),
        }
    }
}

#[async_trait]
impl<R: ChainReader> ChainReader for Deadline<R> {
    async fn current_block_height(&self) -> Result<BlockNumber, LookupError> {
        self.bounded(self.inner.current_block_height()).await
    }

    async fn poll_end_block(&self, poll: Address) -> Result<BlockNumber, LookupError> {
        self.bounded(self.inner.poll_end_block(poll)).await
    }

    async fn delegate_total_stake(
        &self,
        delegate: Address,
        at: BlockNumber,
    ) -> Result<Stake, LookupError> {
        self.bounded(self.inner.delegate_total_stake(delegate, at))
            .await
    }

    async fn voter_pending_stake(
        &self,
        voter: Address,
        at: BlockNumber,
    ) -> Result<Stake, LookupError> {
        self.bounded(self.inner.voter_pending_stake(voter, at)).await
    }

    async fn is_registered_delegate(
        &self,
        account: Address,
        at: BlockNumber,
    ) -> Result<bool, LookupError> {
        self.bounded(self.inner.is_registered_delegate(account, at))
            .await
    }

    async fn delegation_fact(
        &self,
        delegator: Address,
        at: BlockNumber,
    ) -> Result<DelegationFact, LookupError> {
        self.bounded(self.inner.delegation_fact(delegator, at)).await
    }
}

#[async_trait]
impl<R: IndexerReader> IndexerReader for Deadline<R> {
    async fn poll_snapshot(
        &self,
        poll: Address,
        at: BlockNumber,
    ) -> Result<IndexedPoll, LookupError> {
        self.bounded(self.inner.poll_snapshot(poll, at)).await
    }
}
