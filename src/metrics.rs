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

//! Per-prescriber, per-drug utilization metrics.
//!
//! # Example
//!
//! ```
//! use pharmacy_analytics::MetricRecord;
//! use rust_decimal_macros::dec;
//!
//! let record = MetricRecord::default();
//! assert_eq!(record.claim_count, 0);
//! assert_eq!(record.avg_price(), Some(dec!(0)));
//! ```

use crate::base::{Ndc, Npi};
use crate::error::PipelineError;
use crate::event::EffectiveClaim;
use dashmap::{DashMap, DashSet};
use rayon::prelude::*;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Grouping key for [`MetricRecord`]s. Orders by NPI, then NDC.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    pub npi: Npi,
    pub ndc: Ndc,
}

impl MetricKey {
    pub fn new(npi: impl Into<Npi>, ndc: impl Into<Ndc>) -> Self {
        Self {
            npi: npi.into(),
            ndc: ndc.into(),
        }
    }

    fn of(claim: &EffectiveClaim) -> Self {
        Self {
            npi: claim.npi().clone(),
            ndc: claim.ndc().clone(),
        }
    }

    fn overflow(self) -> PipelineError {
        PipelineError::Overflow {
            npi: self.npi,
            ndc: self.ndc,
        }
    }
}

/// Utilization summary for one `(npi, ndc)` pair.
///
/// # Invariants
///
/// - `claim_count + reverted_count` equals the number of input claims for the key.
/// - `total_quantity` and `total_price` only include non-reverted claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricRecord {
    pub claim_count: u64,
    pub reverted_count: u64,
    pub total_quantity: Decimal,
    pub total_price: Decimal,
}

impl MetricRecord {
    const PRICE_PRECISION: u32 = 2;

    /// Folds one reconciled claim into the record.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Overflow`] if a decimal total no longer fits.
    /// The record is left unchanged in that case.
    pub fn add(&mut self, claim: &EffectiveClaim) -> Result<(), PipelineError> {
        if claim.reverted {
            self.reverted_count += 1;
            return Ok(());
        }
        let overflow = || MetricKey::of(claim).overflow();
        let total_quantity = self
            .total_quantity
            .checked_add(claim.quantity())
            .ok_or_else(overflow)?;
        let total_price = self
            .total_price
            .checked_add(claim.price())
            .ok_or_else(overflow)?;
        self.claim_count += 1;
        self.total_quantity = total_quantity;
        self.total_price = total_price;
        Ok(())
    }

    /// Every claim seen for the key, reverted or not.
    pub fn total_claims(&self) -> u64 {
        self.claim_count + self.reverted_count
    }

    /// Average unit price, rounded to cents. Zero when nothing was dispensed,
    /// `None` when the quotient does not fit in a decimal.
    pub fn avg_price(&self) -> Option<Decimal> {
        if self.total_quantity.is_zero() {
            return Some(Decimal::ZERO);
        }
        self.total_price
            .checked_div(self.total_quantity)
            .map(|average| average.round_dp(Self::PRICE_PRECISION))
    }
}

/// Groups reconciled claims by `(npi, ndc)`.
///
/// A key whose claims were all reverted is still present, with zero
/// non-reverted totals. A missing key means no claims at all.
///
/// # Errors
///
/// Returns [`PipelineError::Overflow`] for the lowest key whose totals or
/// average price do not fit in a decimal.
pub fn aggregate(
    effective: &[EffectiveClaim],
) -> Result<BTreeMap<MetricKey, MetricRecord>, PipelineError> {
    let mut metrics: BTreeMap<MetricKey, MetricRecord> = BTreeMap::new();
    let mut overflowed: BTreeSet<MetricKey> = BTreeSet::new();
    for claim in effective {
        let key = MetricKey::of(claim);
        if metrics.entry(key.clone()).or_default().add(claim).is_err() {
            overflowed.insert(key);
        }
    }
    finish(metrics, overflowed)
}

/// Same result as [`aggregate`], accumulated concurrently on the rayon pool.
///
/// Counts and decimal sums are order-independent, so the output (or the
/// reported overflow) is identical to the sequential path.
pub fn aggregate_parallel(
    effective: &[EffectiveClaim],
) -> Result<BTreeMap<MetricKey, MetricRecord>, PipelineError> {
    let metrics: DashMap<MetricKey, MetricRecord> = DashMap::new();
    let overflowed: DashSet<MetricKey> = DashSet::new();
    effective.par_iter().for_each(|claim| {
        let key = MetricKey::of(claim);
        let added = metrics.entry(key.clone()).or_default().add(claim);
        if added.is_err() {
            overflowed.insert(key);
        }
    });
    finish(
        metrics.into_iter().collect(),
        overflowed.into_iter().collect(),
    )
}

fn finish(
    metrics: BTreeMap<MetricKey, MetricRecord>,
    overflowed: BTreeSet<MetricKey>,
) -> Result<BTreeMap<MetricKey, MetricRecord>, PipelineError> {
    if let Some(key) = overflowed.into_iter().next() {
        return Err(key.overflow());
    }
    if let Some((key, _)) = metrics.iter().find(|(_, record)| record.avg_price().is_none()) {
        return Err(key.clone().overflow());
    }
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Claim;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn effective(id: &str, quantity: Decimal, price: Decimal, reverted: bool) -> EffectiveClaim {
        EffectiveClaim {
            claim: Claim {
                claim_id: id.into(),
                npi: "1".into(),
                ndc: "X".into(),
                quantity,
                price,
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            },
            reverted,
        }
    }

    #[test]
    fn add_splits_reverted_and_dispensed() {
        let mut record = MetricRecord::default();
        record.add(&effective("a", dec!(10), dec!(25.50), false)).unwrap();
        record.add(&effective("b", dec!(5), dec!(12.25), true)).unwrap();

        assert_eq!(record.claim_count, 1);
        assert_eq!(record.reverted_count, 1);
        assert_eq!(record.total_quantity, dec!(10));
        assert_eq!(record.total_price, dec!(25.50));
        assert_eq!(record.total_claims(), 2);
    }

    #[test]
    fn avg_price_rounds_to_cents() {
        let record = MetricRecord {
            claim_count: 1,
            reverted_count: 0,
            total_quantity: dec!(3),
            total_price: dec!(10),
        };
        assert_eq!(record.avg_price(), Some(dec!(3.33)));
    }

    #[test]
    fn avg_price_zero_quantity() {
        let record = MetricRecord {
            claim_count: 1,
            reverted_count: 0,
            total_quantity: dec!(0),
            total_price: dec!(4.99),
        };
        assert_eq!(record.avg_price(), Some(Decimal::ZERO));
    }

    #[test]
    fn price_sums_keep_fractional_cents() {
        let mut record = MetricRecord::default();
        record.add(&effective("a", dec!(1), dec!(0.001), false)).unwrap();
        record.add(&effective("b", dec!(1), dec!(0.002), false)).unwrap();
        assert_eq!(record.total_price, dec!(0.003));
    }

    #[test]
    fn add_overflow_leaves_record_unchanged() {
        let mut record = MetricRecord::default();
        record.add(&effective("a", dec!(1), Decimal::MAX, false)).unwrap();

        let result = record.add(&effective("b", dec!(1), Decimal::MAX, false));

        assert_eq!(
            result,
            Err(PipelineError::Overflow {
                npi: "1".into(),
                ndc: "X".into(),
            })
        );
        assert_eq!(record.claim_count, 1);
        assert_eq!(record.total_quantity, dec!(1));
        assert_eq!(record.total_price, Decimal::MAX);
    }

    #[test]
    fn avg_price_overflow_is_none() {
        let record = MetricRecord {
            claim_count: 1,
            reverted_count: 0,
            total_quantity: dec!(0.0000000000000000000000000001),
            total_price: dec!(10000000000),
        };
        assert_eq!(record.avg_price(), None);
    }

    #[test]
    fn aggregate_reports_lowest_overflowing_key() {
        let mut claims = Vec::new();
        for (i, npi) in ["9", "9", "2", "2"].iter().enumerate() {
            let mut claim = effective(&format!("c{i}"), dec!(1), Decimal::MAX, false);
            claim.claim.npi = (*npi).into();
            claims.push(claim);
        }

        let expected = Err(PipelineError::Overflow {
            npi: "2".into(),
            ndc: "X".into(),
        });
        assert_eq!(aggregate(&claims), expected);
        assert_eq!(aggregate_parallel(&claims), expected);
    }
}
