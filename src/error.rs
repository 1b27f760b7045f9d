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

//! Error types for the analytics pipeline and its input adapters.

use crate::base::{Chain, ClaimId, Ndc, Npi};
use thiserror::Error;

/// Fatal batch errors. Any of these aborts the run without producing reports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The same claim ID appears more than once in the claims stream
    #[error("duplicate claim ID {0}")]
    DuplicateClaimId(ClaimId),

    /// One NPI is assigned to two different chains
    #[error("pharmacy {npi} belongs to both {existing} and {conflicting}")]
    ConflictingPharmacy {
        npi: Npi,
        existing: Chain,
        conflicting: Chain,
    },

    /// A decimal total or average for one `(npi, ndc)` pair does not fit
    #[error("decimal overflow in metrics for npi {npi}, ndc {ndc}")]
    Overflow { npi: Npi, ndc: Ndc },
}

/// Reasons a single record is excluded from every computation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// Claim quantity is below zero
    #[error("negative quantity")]
    NegativeQuantity,

    /// Claim price is below zero
    #[error("negative price")]
    NegativePrice,

    /// Revert is timestamped before the claim it cancels
    #[error("revert precedes its claim")]
    RevertBeforeClaim,
}

/// Errors raised while loading input files or writing reports.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("no valid pharmacy data found")]
    NoPharmacies,

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        assert_eq!(
            PipelineError::DuplicateClaimId(ClaimId::from("c-1")).to_string(),
            "duplicate claim ID c-1"
        );
        assert_eq!(
            PipelineError::ConflictingPharmacy {
                npi: Npi::from("1"),
                existing: Chain::from("health"),
                conflicting: Chain::from("saint"),
            }
            .to_string(),
            "pharmacy 1 belongs to both health and saint"
        );
        assert_eq!(
            PipelineError::Overflow {
                npi: Npi::from("1"),
                ndc: Ndc::from("X"),
            }
            .to_string(),
            "decimal overflow in metrics for npi 1, ndc X"
        );
        assert_eq!(MalformedReason::NegativeQuantity.to_string(), "negative quantity");
        assert_eq!(MalformedReason::NegativePrice.to_string(), "negative price");
        assert_eq!(
            MalformedReason::RevertBeforeClaim.to_string(),
            "revert precedes its claim"
        );
        assert_eq!(AdapterError::NoPharmacies.to_string(), "no valid pharmacy data found");
        assert_eq!(
            AdapterError::MissingColumn("chain").to_string(),
            "missing required column 'chain'"
        );
    }

    #[test]
    fn errors_are_cloneable() {
        let error = PipelineError::DuplicateClaimId(ClaimId::from("c-9"));
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
