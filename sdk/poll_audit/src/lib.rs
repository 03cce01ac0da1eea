//! # Poll Audit
//!
//! Recomputes the tally of a stake-weighted governance poll from chain state
//! and checks it against the tally an indexer (the Livepeer subgraph) reports.
//!
//! - **Delegated voting**: a registered delegate votes with all stake bonded to it
//! - **Overrides**: a delegator who votes moves their own stake out of the delegate's vote
//! - **Single evaluation block**: every lookup of a run reads the same block height
//! - **Exact arithmetic**: 256-bit unsigned stake, checked add and subtract
//! - **Explicit verdict**: a mismatch lists the side, the indexer value and the chain value
//!
//! ## Architecture
//!
//! ```text
//! window    — PollWindowState: active/closed, evaluation block
//! graph     — Voter Graph Builder: votes → VoterRecord per effective voter
//! tally     — Stake Tally Engine: VoterGraph → yes/no stake
//! reconcile — Verdict against the indexer's tally
//! audit     — PollAuditor tying the steps together
//! reader    — ChainReader / IndexerReader traits, Deadline wrapper
//! rpc       — JSON-RPC and GraphQL implementations of the readers
//! ```

pub mod audit;
pub mod config;
pub mod errors;
pub mod graph;
pub mod reader;
pub mod reconcile;
pub mod rpc;
pub mod tally;
pub mod types;
pub mod window;

pub use audit::{AuditOptions, AuditReport, PollAuditor};
pub use config::AuditConfig;
pub use errors::{AuditError, AuditResult, IntegrityFault, LookupError};
pub use graph::{build_voter_graph, GraphBuild, VoterGraph, VoterRecord};
pub use reader::{ChainReader, Deadline, IndexerReader};
pub use reconcile::{reconcile, Discrepancy, Verdict};
pub use tally::{tally_votes, Contribution, Tally, TallyBreakdown};
pub use types::{BlockNumber, DelegationFact, IndexedPoll, ReportedTally, Stake, Vote, VoteChoice};
pub use window::{PollWindowState, SAFETY_MARGIN};

pub use alloy_primitives::Address;
