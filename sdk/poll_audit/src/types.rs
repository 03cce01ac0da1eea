//! Value types shared by the graph builder, the tally engine and the readers.

use std::fmt;
use std::str::FromStr;

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize, Serializer};

/// Bonded or delegated stake, in the token's base unit.
pub type Stake = U256;

/// Serialize stake as a base-10 string, the form the subgraph reports.
pub(crate) fn serialize_decimal<S>(stake: &Stake, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(stake)
}

/// Chain height.
pub type BlockNumber = u64;

// ── Vote choice ──────────────────────────────────────────────────────────────

/// The two options of a binary poll.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteChoice {
    Yes,
    No,
}

impl VoteChoice {
    /// The opposite choice.
    pub fn flip(self) -> Self {
        match self {
            VoteChoice::Yes => VoteChoice::No,
            VoteChoice::No => VoteChoice::Yes,
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteChoice::Yes => f.pad("yes"),
            VoteChoice::No => f.pad("no"),
        }
    }
}

/// Parses the indexer's `choiceID` enum values.
impl FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Yes" => Ok(VoteChoice::Yes),
            "No" => Ok(VoteChoice::No),
            other => Err(format!("unknown vote choice {other:?}")),
        }
    }
}

// ── Inputs ───────────────────────────────────────────────────────────────────

/// One recorded vote as reported by the indexer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub voter: Address,
    pub choice: VoteChoice,
    /// The indexer's view of whether the voter is a registered transcoder.
    /// Informational only; the chain is asked again at the evaluation block.
    pub registered_transcoder: bool,
}

impl Vote {
    pub fn new(voter: Address, choice: VoteChoice, registered_transcoder: bool) -> Self {
        Self {
            voter,
            choice,
            registered_transcoder,
        }
    }
}

/// Who a delegator's stake is currently bonded to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegationFact {
    pub delegator: Address,
    pub delegate: Address,
    pub delegated_amount: Stake,
}

/// The indexer's precomputed tally, kept as the decimal strings it returned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedTally {
    pub yes: String,
    pub no: String,
}

impl Default for ReportedTally {
    /// An absent tally means nobody has voted yet.
    fn default() -> Self {
        Self {
            yes: "0".to_string(),
            no: "0".to_string(),
        }
    }
}

impl ReportedTally {
    pub fn new(yes: impl Into<String>, no: impl Into<String>) -> Self {
        Self {
            yes: yes.into(),
            no: no.into(),
        }
    }

    pub fn side(&self, choice: VoteChoice) -> &str {
        match choice {
            VoteChoice::Yes => &self.yes,
            VoteChoice::No => &self.no,
        }
    }
}

/// Everything the indexer knows about a poll at one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexedPoll {
    pub tally: ReportedTally,
    pub votes: Vec<Vote>,
}
