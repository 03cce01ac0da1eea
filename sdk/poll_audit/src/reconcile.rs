//! Comparison of the recomputed tally against the indexer's.
//!
//! Sides are compared as exact base-10 strings, the form both tallies are
//! published in.

use std::fmt;

use serde::Serialize;

use crate::tally::Tally;
use crate::types::{ReportedTally, VoteChoice};

/// One side on which the indexer and the chain disagree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub side: VoteChoice,
    /// What the indexer reported.
    pub expected: String,
    /// What the chain adds up to.
    pub actual: String,
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "incorrect {} tally: indexer reported {}, chain state gives {}",
            self.side, self.expected, self.actual
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Match,
    Mismatch(Vec<Discrepancy>),
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match)
    }

    pub fn discrepancies(&self) -> &[Discrepancy] {
        match self {
            Verdict::Match => &[],
            Verdict::Mismatch(found) => found,
        }
    }
}

pub fn reconcile(computed: &Tally, reported: &ReportedTally) -> Verdict {
    let found: Vec<Discrepancy> = [VoteChoice::Yes, VoteChoice::No]
        .into_iter()
        .filter_map(|side| {
            let actual = computed.decimal(side);
            let expected = reported.side(side);
            (actual != expected).then(|| Discrepancy {
                side,
                expected: expected.to_string(),
                actual,
            })
        })
        .collect();

    if found.is_empty() {
        Verdict::Match
    } else {
        Verdict::Mismatch(found)
    }
}
