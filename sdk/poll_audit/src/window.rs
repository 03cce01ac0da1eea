//! Evaluation-block selection.
//!
//! Every stake figure of one audit run is read at a single block height so
//! that the recomputed tally is internally consistent:
//!
//! ```text
//! head <  end_block  → active, evaluate at head - SAFETY_MARGIN
//! head >= end_block  → closed, evaluate at end_block
//! ```
//!
//! The margin keeps an active-poll audit behind the indexer, which may still
//! be processing the most recent blocks.

use std::fmt;

use serde::Serialize;

use crate::types::BlockNumber;

/// Blocks kept between the chain head and the evaluation block of an active poll.
pub const SAFETY_MARGIN: BlockNumber = 10;

/// Whether the poll still accepts votes, and the block every lookup reads at.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PollWindowState {
    pub is_active: bool,
    pub evaluation_block: BlockNumber,
}

impl PollWindowState {
    pub fn resolve(head: BlockNumber, end_block: BlockNumber) -> Self {
        if head < end_block {
            Self {
                is_active: true,
                evaluation_block: head.saturating_sub(SAFETY_MARGIN),
            }
        } else {
            Self {
                is_active: false,
                evaluation_block: end_block,
            }
        }
    }
}

impl fmt::Display for PollWindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_active { "active" } else { "closed" };
        write!(f, "{status} poll, evaluated at block {}", self.evaluation_block)
    }
}
