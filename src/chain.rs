// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Per-drug chain ranking.
//!
//! Each chain's score for a drug is the number of non-reverted claims
//! dispensed for that drug by all of the chain's pharmacies. Chains rank by
//! score descending, then by name ascending, and only the top two are kept.

use crate::base::{Chain, Ndc};
use crate::directory::PharmacyDirectory;
use crate::metrics::{MetricKey, MetricRecord};
use crate::quality::DataQualityReport;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

/// Maximum number of chains recommended per drug.
pub const TOP_CHAINS: usize = 2;

/// Whether chains whose claims for a drug were all reverted may be ranked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroScoreChains {
    /// A zero score counts as no activity; the chain is left out.
    #[default]
    Exclude,
    /// Any chain with at least one claim for the drug is ranked.
    Include,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainScore {
    pub chain: Chain,
    pub score: u64,
}

/// Up to [`TOP_CHAINS`] chains for one drug, best first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainRecommendation {
    pub chains: Vec<ChainScore>,
}

impl ChainRecommendation {
    fn rank(scores: HashMap<Chain, u64>, zero_scores: ZeroScoreChains) -> Self {
        let mut chains: Vec<ChainScore> = scores
            .into_iter()
            .filter(|(_, score)| zero_scores == ZeroScoreChains::Include || *score > 0)
            .map(|(chain, score)| ChainScore { chain, score })
            .collect();
        chains.sort_by(|a, b| {
            (Reverse(a.score), &a.chain).cmp(&(Reverse(b.score), &b.chain))
        });
        chains.truncate(TOP_CHAINS);
        Self { chains }
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

/// Recommends the top chains per drug, leaving out zero-score chains.
pub fn recommend(
    metrics: &BTreeMap<MetricKey, MetricRecord>,
    directory: &PharmacyDirectory,
    quality: &mut DataQualityReport,
) -> BTreeMap<Ndc, ChainRecommendation> {
    recommend_with(metrics, directory, ZeroScoreChains::default(), quality)
}

/// Recommends the top chains per drug under an explicit zero-score policy.
///
/// Metrics for an NPI with no pharmacy record cannot be attributed to a
/// chain. They are skipped and their claims are counted in
/// [`DataQualityReport::dangling_pharmacy_refs`]. Drugs left with no
/// eligible chain are omitted.
pub fn recommend_with(
    metrics: &BTreeMap<MetricKey, MetricRecord>,
    directory: &PharmacyDirectory,
    zero_scores: ZeroScoreChains,
    quality: &mut DataQualityReport,
) -> BTreeMap<Ndc, ChainRecommendation> {
    let mut scores: BTreeMap<&Ndc, HashMap<Chain, u64>> = BTreeMap::new();

    for (key, record) in metrics {
        let Some(chain) = directory.chain_of(&key.npi) else {
            tracing::debug!(npi = %key.npi, ndc = %key.ndc, "no pharmacy for npi");
            quality.dangling_pharmacy_refs += record.total_claims();
            continue;
        };
        *scores
            .entry(&key.ndc)
            .or_default()
            .entry(chain.clone())
            .or_insert(0) += record.claim_count;
    }

    scores
        .into_iter()
        .map(|(ndc, chains)| (ndc.clone(), ChainRecommendation::rank(chains, zero_scores)))
        .filter(|(_, recommendation)| !recommendation.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(entries: &[(&str, u64)]) -> HashMap<Chain, u64> {
        entries
            .iter()
            .map(|(chain, score)| (Chain::from(*chain), *score))
            .collect()
    }

    fn names(recommendation: &ChainRecommendation) -> Vec<&str> {
        recommendation
            .chains
            .iter()
            .map(|entry| entry.chain.as_str())
            .collect()
    }

    #[test]
    fn rank_keeps_top_two_by_score() {
        let ranked = ChainRecommendation::rank(
            scores(&[("health", 3), ("saint", 7), ("doctor", 5)]),
            ZeroScoreChains::Exclude,
        );
        assert_eq!(names(&ranked), vec!["saint", "doctor"]);
        assert_eq!(ranked.chains[0].score, 7);
        assert_eq!(ranked.chains[1].score, 5);
    }

    #[test]
    fn rank_breaks_ties_by_name() {
        let ranked = ChainRecommendation::rank(
            scores(&[("saint", 4), ("health", 4), ("doctor", 4)]),
            ZeroScoreChains::Exclude,
        );
        assert_eq!(names(&ranked), vec!["doctor", "health"]);
    }

    #[test]
    fn rank_never_pads() {
        let ranked =
            ChainRecommendation::rank(scores(&[("health", 1)]), ZeroScoreChains::Exclude);
        assert_eq!(ranked.chains.len(), 1);
    }

    #[test]
    fn rank_zero_score_policy() {
        let excluded =
            ChainRecommendation::rank(scores(&[("a", 0), ("b", 2)]), ZeroScoreChains::Exclude);
        assert_eq!(names(&excluded), vec!["b"]);

        let included =
            ChainRecommendation::rank(scores(&[("a", 0), ("b", 2)]), ZeroScoreChains::Include);
        assert_eq!(names(&included), vec!["b", "a"]);
    }
}
