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

//! Batch pipeline.
//!
//! Runs the full analytics pass over one closed batch:
//!
//! 1. Build the pharmacy directory.
//! 2. Reconcile every claim against the reverts.
//! 3. Drop malformed claims (negative quantity or price).
//! 4. Aggregate metrics, rank chains, find quantity modes.
//!
//! The caller receives either a complete [`AnalyticsReport`] or an error,
//! never a partial set of results.

use crate::base::Ndc;
use crate::chain::{self, ChainRecommendation};
use crate::directory::PharmacyDirectory;
use crate::error::{MalformedReason, PipelineError};
use crate::event::{Claim, EffectiveClaim, Pharmacy, Revert};
use crate::metrics::{self, MetricKey, MetricRecord};
use crate::quality::{DataQualityReport, RecordRef};
use crate::quantity::{self, QuantityMode};
use crate::reconcile::reconcile;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The three validated input streams of a batch.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub pharmacies: Vec<Pharmacy>,
    pub claims: Vec<Claim>,
    pub reverts: Vec<Revert>,
}

/// Everything a batch run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsReport {
    pub metrics: BTreeMap<MetricKey, MetricRecord>,
    pub recommendations: BTreeMap<Ndc, ChainRecommendation>,
    pub quantity_modes: BTreeMap<Ndc, QuantityMode>,
    pub quality: DataQualityReport,
}

/// Runs the batch end to end.
///
/// # Errors
///
/// - [`PipelineError::ConflictingPharmacy`] - An NPI is listed under two chains.
/// - [`PipelineError::DuplicateClaimId`] - A claim ID appears more than once.
/// - [`PipelineError::Overflow`] - A metric total or average does not fit in a decimal.
pub fn run(batch: &Batch) -> Result<AnalyticsReport, PipelineError> {
    let mut quality = DataQualityReport::new();

    let directory = PharmacyDirectory::from_pharmacies(&batch.pharmacies)?;
    tracing::info!(pharmacies = directory.len(), "pharmacy directory ready");

    // Reconcile before screening so duplicate IDs are caught across every
    // claim and reverts of malformed claims are not mistaken for orphans.
    let mut effective = reconcile(&batch.claims, &batch.reverts, &mut quality)?;
    screen_malformed(&mut effective, &mut quality);
    tracing::info!(
        claims = effective.len(),
        reverts = batch.reverts.len(),
        "claims reconciled"
    );

    let metrics = metrics::aggregate_parallel(&effective)?;
    tracing::info!(keys = metrics.len(), "computed npi/ndc metrics");

    let recommendations = chain::recommend(&metrics, &directory, &mut quality);
    tracing::info!(drugs = recommendations.len(), "computed chain recommendations");

    let quantity_modes = quantity::find_modes(&effective);
    tracing::info!(drugs = quantity_modes.len(), "computed quantity modes");

    quality.log_summary();

    Ok(AnalyticsReport {
        metrics,
        recommendations,
        quantity_modes,
        quality,
    })
}

/// Removes claims with a negative quantity or price, reporting each one.
fn screen_malformed(effective: &mut Vec<EffectiveClaim>, quality: &mut DataQualityReport) {
    effective.retain(|claim| match malformed_reason(&claim.claim) {
        Some(reason) => {
            quality.record_malformed(RecordRef::Claim(claim.claim_id().clone()), reason);
            false
        }
        None => true,
    });
}

fn malformed_reason(claim: &Claim) -> Option<MalformedReason> {
    if claim.quantity < Decimal::ZERO {
        Some(MalformedReason::NegativeQuantity)
    } else if claim.price < Decimal::ZERO {
        Some(MalformedReason::NegativePrice)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn claim(quantity: Decimal, price: Decimal) -> Claim {
        Claim {
            claim_id: "c".into(),
            npi: "1".into(),
            ndc: "X".into(),
            quantity,
            price,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn malformed_reason_checks_quantity_first() {
        assert_eq!(
            malformed_reason(&claim(dec!(-1), dec!(-1))),
            Some(MalformedReason::NegativeQuantity)
        );
        assert_eq!(
            malformed_reason(&claim(dec!(1), dec!(-0.01))),
            Some(MalformedReason::NegativePrice)
        );
        assert_eq!(malformed_reason(&claim(dec!(0), dec!(0))), None);
    }
}
