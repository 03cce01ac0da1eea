//! # Audit Run Invariant Definitions & Verification
//!
//! Defines invariants that must hold for every successful audit run.
//! Invariants are checked against an [`AuditSnapshot`] and can be composed via
//! the `InvariantSet` builder.
//!
//! ## Complexity
//!
//! - Each invariant runs in O(v + l) where v = votes and l = logged lookups.
//! - With a few hundred voters per generated poll this is negligible next to
//!   the audit itself.

use std::collections::HashSet;

use poll_audit::{Stake, VoteChoice};

use super::AuditSnapshot;

// ── Invariant Trait ──────────────────────────────────────────────────────────

/// A named invariant that can be verified against an audit snapshot.
pub trait Invariant {
    /// Human-readable name for error messages.
    fn name(&self) -> &str;

    /// Check the invariant. Returns `Ok(())` on success, `Err(description)` on violation.
    fn check(&self, snapshot: &AuditSnapshot) -> Result<(), String>;
}

// ── Built-in Invariants ──────────────────────────────────────────────────────

/// **Single Evaluation Block**: every block-pinned lookup of the run reads at
/// the window's evaluation block.
pub struct SingleEvaluationBlock;

impl Invariant for SingleEvaluationBlock {
    fn name(&self) -> &str {
        "all lookups read at the evaluation block"
    }

    fn check(&self, snapshot: &AuditSnapshot) -> Result<(), String> {
        let expected = snapshot.report.window.evaluation_block;
        for lookup in &snapshot.lookups {
            if let Some(block) = lookup.block {
                if block != expected {
                    return Err(format!(
                        "{}({:?}) read at block {}, evaluation block is {}",
                        lookup.operation, lookup.account, block, expected
                    ));
                }
            }
        }
        Ok(())
    }
}

/// **Contribution Sum**: `tally.side == Σ(contributions on that side)`.
///
/// A violation means the accumulator dropped or double-counted a record.
pub struct ContributionsSumToTally;

impl Invariant for ContributionsSumToTally {
    fn name(&self) -> &str {
        "tally == sum(contributions) per side"
    }

    fn check(&self, snapshot: &AuditSnapshot) -> Result<(), String> {
        for side in [VoteChoice::Yes, VoteChoice::No] {
            let sum = snapshot.contribution_total(side);
            let tallied = snapshot.report.computed.side(side);
            if sum != tallied {
                return Err(format!(
                    "{side} tally {tallied} != sum of contributions {sum}"
                ));
            }
        }
        Ok(())
    }
}

/// **Net Weight Identity**: for every contribution,
/// `net + overrides == base`, and individual voters carry no overrides.
pub struct NetWeightIdentity;

impl Invariant for NetWeightIdentity {
    fn name(&self) -> &str {
        "net + overrides == base for every contribution"
    }

    fn check(&self, snapshot: &AuditSnapshot) -> Result<(), String> {
        for c in &snapshot.report.contributions {
            if c.net_stake + c.override_stake != c.base_stake {
                return Err(format!(
                    "{}: net {} + overrides {} != base {}",
                    c.voter, c.net_stake, c.override_stake, c.base_stake
                ));
            }
            if !c.is_registered_delegate && c.override_stake != Stake::ZERO {
                return Err(format!(
                    "individual voter {} carries override stake {}",
                    c.voter, c.override_stake
                ));
            }
        }
        Ok(())
    }
}

/// **Only Voters Contribute**: each contribution belongs to an address that
/// appears in the indexer's vote list, and appears at most once.
///
/// Delegate-only records (created because a delegator overrode them) must
/// never carry weight.
pub struct OnlyVotersContribute;

impl Invariant for OnlyVotersContribute {
    fn name(&self) -> &str {
        "contributions come from distinct direct voters"
    }

    fn check(&self, snapshot: &AuditSnapshot) -> Result<(), String> {
        let voters: HashSet<_> = snapshot.votes.iter().map(|v| v.voter).collect();
        let mut seen = HashSet::new();
        for c in &snapshot.report.contributions {
            if !voters.contains(&c.voter) {
                return Err(format!("{} contributed without voting", c.voter));
            }
            if !seen.insert(c.voter) {
                return Err(format!("{} contributed twice", c.voter));
            }
        }
        Ok(())
    }
}

// ── Invariant Set ────────────────────────────────────────────────────────────

/// Composite checker that runs a collection of invariants.
pub struct InvariantSet {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantSet {
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    /// Every built-in invariant.
    pub fn all() -> Self {
        let mut set = Self::new();
        set.add(Box::new(SingleEvaluationBlock));
        set.add(Box::new(ContributionsSumToTally));
        set.add(Box::new(NetWeightIdentity));
        set.add(Box::new(OnlyVotersContribute));
        set
    }

    pub fn add(&mut self, invariant: Box<dyn Invariant>) {
        self.invariants.push(invariant);
    }

    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }

    /// Run every invariant; returns `(name, message)` for each violation.
    pub fn check_all(&self, snapshot: &AuditSnapshot) -> Vec<(String, String)> {
        let mut violations = Vec::new();
        for inv in &self.invariants {
            if let Err(msg) = inv.check(snapshot) {
                violations.push((inv.name().to_string(), msg));
            }
        }
        violations
    }

    /// Panic with a report listing every violation.
    pub fn assert_all(&self, snapshot: &AuditSnapshot) {
        let violations = self.check_all(snapshot);
        if !violations.is_empty() {
            let mut report = String::from("Invariant violations:\n");
            for (name, msg) in &violations {
                report.push_str(&format!("  ✗ [{}]: {}\n", name, msg));
            }
            panic!("{}", report);
        }
    }
}

impl Default for InvariantSet {
    fn default() -> Self {
        Self::all()
    }
}

// ── Transition Invariants ────────────────────────────────────────────────────

/// An invariant over two runs of the audit on related inputs.
pub trait TransitionInvariant {
    fn name(&self) -> &str;

    fn check(&self, before: &AuditSnapshot, after: &AuditSnapshot) -> Result<(), String>;
}

/// **Vote Monotonicity**: adding one vote of `amount` uncontested stake on
/// `side` raises that side by exactly `amount` and leaves the other alone.
pub struct VoteMonotonicity {
    pub side: VoteChoice,
    pub amount: Stake,
}

impl TransitionInvariant for VoteMonotonicity {
    fn name(&self) -> &str {
        "one extra uncontested vote adds exactly its stake"
    }

    fn check(&self, before: &AuditSnapshot, after: &AuditSnapshot) -> Result<(), String> {
        let expected = before.report.computed.side(self.side) + self.amount;
        let got = after.report.computed.side(self.side);
        if got != expected {
            return Err(format!(
                "after adding {} on {}: expected {}, got {}",
                self.amount, self.side, expected, got
            ));
        }
        let other = self.side.flip();
        if before.report.computed.side(other) != after.report.computed.side(other) {
            return Err(format!(
                "{} side changed from {} to {}",
                other,
                before.report.computed.side(other),
                after.report.computed.side(other)
            ));
        }
        Ok(())
    }
}

/// **Determinism**: two runs over the same fixture produce the same report.
pub struct Deterministic;

impl TransitionInvariant for Deterministic {
    fn name(&self) -> &str {
        "identical inputs give identical tallies"
    }

    fn check(&self, before: &AuditSnapshot, after: &AuditSnapshot) -> Result<(), String> {
        if before.report.computed != after.report.computed {
            return Err(format!(
                "tally changed between runs: {:?} -> {:?}",
                before.report.computed, after.report.computed
            ));
        }
        if before.report.contributions != after.report.contributions {
            return Err("contributions changed between runs".to_string());
        }
        if before.report.verdict != after.report.verdict {
            return Err("verdict changed between runs".to_string());
        }
        Ok(())
    }
}

/// Composite checker for transition invariants.
pub struct TransitionInvariantSet {
    invariants: Vec<Box<dyn TransitionInvariant>>,
}

impl TransitionInvariantSet {
    pub fn new() -> Self {
        Self {
            invariants: Vec::new(),
        }
    }

    pub fn add(&mut self, invariant: Box<dyn TransitionInvariant>) {
        self.invariants.push(invariant);
    }

    pub fn check_all(&self, before: &AuditSnapshot, after: &AuditSnapshot) -> Vec<(String, String)> {
        let mut violations = Vec::new();
        for inv in &self.invariants {
            if let Err(msg) = inv.check(before, after) {
                violations.push((inv.name().to_string(), msg));
            }
        }
        violations
    }

    pub fn assert_all(&self, before: &AuditSnapshot, after: &AuditSnapshot) {
        let violations = self.check_all(before, after);
        if !violations.is_empty() {
            let mut report = String::from("Transition invariant violations:\n");
            for (name, msg) in &violations {
                report.push_str(&format!("  ✗ [{}]: {}\n", name, msg));
            }
            panic!("{}", report);
        }
    }
}

impl Default for TransitionInvariantSet {
    fn default() -> Self {
        Self::new()
    }
}
