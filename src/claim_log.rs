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

//! Claim index with duplicate detection.
//!
//! Records the arrival position of every claim ID so reverts can be matched
//! in O(1) while the claims themselves stay in their original order.

use crate::base::ClaimId;
use crate::error::PipelineError;
use crate::event::Claim;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Arrival-ordered claim index that rejects duplicate IDs.
#[derive(Debug, Default)]
pub(crate) struct ClaimLog {
    /// Claim ID to position in the claims stream.
    positions: HashMap<ClaimId, usize>,
}

impl ClaimLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: HashMap::with_capacity(capacity),
        }
    }

    /// Builds the index for a whole claims stream.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateClaimId`] for the first claim ID
    /// seen twice.
    pub fn index(claims: &[Claim]) -> Result<Self, PipelineError> {
        let mut log = Self::with_capacity(claims.len());
        for claim in claims {
            log.push(claim)?;
        }
        Ok(log)
    }

    /// Appends a claim at the next arrival position.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateClaimId`] if the claim ID is
    /// already indexed.
    pub fn push(&mut self, claim: &Claim) -> Result<usize, PipelineError> {
        let position = self.positions.len();
        match self.positions.entry(claim.claim_id.clone()) {
            Entry::Occupied(_) => Err(PipelineError::DuplicateClaimId(claim.claim_id.clone())),
            Entry::Vacant(entry) => {
                entry.insert(position);
                Ok(position)
            }
        }
    }

    /// Arrival position of a claim, if it is in the batch.
    pub fn position(&self, claim_id: &ClaimId) -> Option<usize> {
        self.positions.get(claim_id).copied()
    }
}
