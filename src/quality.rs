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

//! Recoverable data-quality findings collected over a batch run.
//!
//! Components receive a `&mut DataQualityReport` instead of failing, so a run
//! with a handful of bad rows still completes and the caller gets one summary
//! at the end.

use crate::base::{ClaimId, RevertId};
use crate::error::MalformedReason;
use std::fmt;

/// Identifies the input record a finding refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRef {
    Claim(ClaimId),
    Revert(RevertId),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Claim(id) => write!(f, "claim {id}"),
            Self::Revert(id) => write!(f, "revert {id}"),
        }
    }
}

/// A record excluded from every computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub record: RecordRef,
    pub reason: MalformedReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataQualityReport {
    /// Reverts referencing a claim ID that is not in the batch.
    pub orphan_reverts: u64,
    /// Extra reverts for a claim that was already reverted.
    pub duplicate_reverts: u64,
    /// Claims whose NPI has no pharmacy record (excluded from chain ranking).
    pub dangling_pharmacy_refs: u64,
    pub malformed: Vec<MalformedRecord>,
}

impl DataQualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an excluded row and reports it individually.
    pub fn record_malformed(&mut self, record: RecordRef, reason: MalformedReason) {
        tracing::warn!(record = %&record, reason = %reason, "excluding malformed record");
        self.malformed.push(MalformedRecord { record, reason });
    }

    /// Returns `true` when nothing recoverable went wrong.
    pub fn is_clean(&self) -> bool {
        self.orphan_reverts == 0
            && self.duplicate_reverts == 0
            && self.dangling_pharmacy_refs == 0
            && self.malformed.is_empty()
    }

    /// Emits the single end-of-run warning, if there is anything to say.
    pub fn log_summary(&self) {
        if self.is_clean() {
            tracing::info!("no data-quality issues found");
            return;
        }
        tracing::warn!(
            orphan_reverts = self.orphan_reverts,
            duplicate_reverts = self.duplicate_reverts,
            dangling_pharmacy_refs = self.dangling_pharmacy_refs,
            malformed_records = self.malformed.len(),
            "data-quality issues found in batch"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_report_is_clean() {
        assert!(DataQualityReport::new().is_clean());
    }

    #[test]
    fn malformed_record_taints_report() {
        let mut report = DataQualityReport::new();
        report.record_malformed(
            RecordRef::Claim(ClaimId::from("c-1")),
            MalformedReason::NegativePrice,
        );

        assert!(!report.is_clean());
        assert_eq!(report.malformed.len(), 1);
        assert_eq!(report.malformed[0].reason, MalformedReason::NegativePrice);
    }

    #[test]
    fn counters_taint_report() {
        let report = DataQualityReport {
            orphan_reverts: 1,
            ..DataQualityReport::default()
        };
        assert!(!report.is_clean());
    }

    #[test]
    fn record_refs_display_kind_and_id() {
        assert_eq!(RecordRef::Claim(ClaimId::from("a")).to_string(), "claim a");
        assert_eq!(RecordRef::Revert(RevertId::from("b")).to_string(), "revert b");
    }
}
