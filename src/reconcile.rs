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

//! Claim/revert reconciliation.
//!
//! Joins the revert stream against the claims stream and produces one
//! [`EffectiveClaim`] per input claim.
//!
//! # Rules
//!
//! - **Duplicate claim IDs** abort the batch.
//! - **Reverted claims** stay in the output with `reverted = true` so
//!   reversal volume can still be counted downstream.
//! - **Repeated reverts** of the same claim mark it once; the extras are
//!   counted as duplicates.
//! - **Orphan reverts** (unknown claim ID) are skipped and counted.
//! - **Early reverts** (timestamped before their claim) are malformed and
//!   ignored.
//!
//! The result depends only on which claim IDs are referenced, never on the
//! arrival order of reverts relative to claims.

use crate::claim_log::ClaimLog;
use crate::error::{MalformedReason, PipelineError};
use crate::event::{Claim, EffectiveClaim, Revert};
use crate::quality::{DataQualityReport, RecordRef};

/// Reconciles claims against reverts.
///
/// The output preserves claim arrival order and has exactly `claims.len()`
/// entries.
///
/// # Errors
///
/// - [`PipelineError::DuplicateClaimId`] - A claim ID appears more than once.
pub fn reconcile(
    claims: &[Claim],
    reverts: &[Revert],
    quality: &mut DataQualityReport,
) -> Result<Vec<EffectiveClaim>, PipelineError> {
    let log = ClaimLog::index(claims)?;
    let mut reverted = vec![false; claims.len()];

    for revert in reverts {
        let Some(position) = log.position(&revert.claim_id) else {
            tracing::debug!(claim_id = %revert.claim_id, "orphan revert");
            quality.orphan_reverts += 1;
            continue;
        };

        if revert.timestamp < claims[position].timestamp {
            quality.record_malformed(
                RecordRef::Revert(revert.revert_id.clone()),
                MalformedReason::RevertBeforeClaim,
            );
            continue;
        }

        // Marking is idempotent; only the first revert flips the flag.
        if std::mem::replace(&mut reverted[position], true) {
            quality.duplicate_reverts += 1;
        }
    }

    let effective: Vec<EffectiveClaim> = claims
        .iter()
        .zip(reverted)
        .map(|(claim, reverted)| EffectiveClaim {
            claim: claim.clone(),
            reverted,
        })
        .collect();

    tracing::debug!(
        claims = effective.len(),
        reverted = effective.iter().filter(|claim| claim.reverted).count(),
        "reconciled claims"
    );

    Ok(effective)
}
