//! Error taxonomy for an audit run.
//!
//! Three outcomes are kept apart so operators can tell them apart at a glance:
//!
//! - [`LookupError`]: a chain or indexer read failed (unreachable node,
//!   JSON-RPC error, revert, timeout).
//! - [`IntegrityFault`]: the data came back but violates an assumption the
//!   tally relies on (negative net stake, malformed return data).
//! - A tally mismatch is **not** an error; see [`crate::reconcile::Verdict`].

use std::time::Duration;

use alloy_primitives::Address;
use thiserror::Error;

use crate::types::{Stake, VoteChoice};

// ── Adapter-level failures ───────────────────────────────────────────────────

/// Failure reported by a [`crate::reader::ChainReader`] or
/// [`crate::reader::IndexerReader`] implementation.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("indexer query failed: {0}")]
    Query(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    /// The remote answered, but the payload could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        LookupError::Transport(err.to_string())
    }
}

// ── Data-integrity faults ────────────────────────────────────────────────────

/// An assumption of the tally logic was violated by the data itself.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntegrityFault {
    #[error(
        "override stake {overrides} exceeds base stake {base} for delegate {delegate}"
    )]
    OverrideExceedsStake {
        delegate: Address,
        base: Stake,
        overrides: Stake,
    },
    #[error("{side} tally overflowed 256 bits")]
    TallyOverflow { side: VoteChoice },
    #[error("malformed response to {operation}: {detail}")]
    MalformedResponse {
        operation: &'static str,
        detail: String,
    },
}

// ── Top-level error ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("{operation} failed: {source}")]
    Lookup {
        operation: &'static str,
        #[source]
        source: LookupError,
    },
    #[error("data integrity fault: {0}")]
    Integrity(#[from] IntegrityFault),
    #[error("configuration error: {0}")]
    Config(String),
}

impl AuditError {
    /// Attribute a reader failure to the operation that issued it.
    ///
    /// Malformed payloads are promoted to [`AuditError::Integrity`].
    pub fn lookup(operation: &'static str, source: LookupError) -> Self {
        match source {
            LookupError::Malformed(detail) => {
                AuditError::Integrity(IntegrityFault::MalformedResponse { operation, detail })
            }
            source => AuditError::Lookup { operation, source },
        }
    }

    /// Process exit code for this failure. `0` and `1` are reserved for a
    /// matching and a mismatching tally.
    pub fn exit_code(&self) -> u8 {
        match self {
            AuditError::Lookup { .. } => 2,
            AuditError::Integrity(_) => 3,
            AuditError::Config(_) => 4,
        }
    }
}

pub type AuditResult<T> = Result<T, AuditError>;
