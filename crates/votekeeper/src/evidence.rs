//! Evidence of equivocation.

use std::collections::btree_map::{BTreeMap, Keys};

use baronbft_core_types::{Address, Vote};

/// A pair of votes from the same validator for the same (height, round,
/// type) but different block ids.
pub type DoubleVote = (Vote, Vote);

/// Keeps track of evidence of equivocation, per validator address.
#[derive(Clone, Debug, Default)]
pub struct EvidenceMap {
    map: BTreeMap<Address, Vec<DoubleVote>>,
}

impl EvidenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any equivocation has been recorded.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The recorded equivocations of the given validator, if any.
    pub fn get(&self, address: &Address) -> Option<&Vec<DoubleVote>> {
        self.map.get(address)
    }

    /// Record a pair of equivocating votes. A pair that was already recorded
    /// (in either order) is not added again.
    ///
    /// Both votes must come from the same validator (debug-asserted).
    pub fn add(&mut self, existing: Vote, conflicting: Vote) {
        debug_assert_eq!(existing.validator_address, conflicting.validator_address);

        let evidence = self.map.entry(conflicting.validator_address).or_default();

        let already_exists = evidence.iter().any(|(e, c)| {
            (e == &existing && c == &conflicting) || (e == &conflicting && c == &existing)
        });

        if !already_exists {
            evidence.push((existing, conflicting));
        }
    }

    /// Iterate over all addresses with recorded equivocations.
    pub fn iter(&self) -> Keys<'_, Address, Vec<DoubleVote>> {
        self.map.keys()
    }
}
