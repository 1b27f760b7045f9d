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

//! Event records consumed and produced by the analytics core.
//!
//! A claim has a two-state lifecycle within a batch:
//! - dispensed ([`EffectiveClaim::reverted`] is `false`)
//! - reverted (at least one [`Revert`] references it)

use crate::base::{Chain, ClaimId, Ndc, Npi, RevertId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pharmacy master data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pharmacy {
    pub npi: Npi,
    pub chain: Chain,
}

impl Pharmacy {
    pub fn new(npi: impl Into<Npi>, chain: impl Into<Chain>) -> Self {
        Self {
            npi: npi.into(),
            chain: chain.into(),
        }
    }
}

/// A dispensed-claim event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: ClaimId,
    pub npi: Npi,
    pub ndc: Ndc,
    pub quantity: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// A claim-reversal event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revert {
    pub revert_id: RevertId,
    pub claim_id: ClaimId,
    pub timestamp: DateTime<Utc>,
}

/// A claim annotated with its reconciled status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveClaim {
    pub claim: Claim,
    pub reverted: bool,
}

impl EffectiveClaim {
    pub fn claim_id(&self) -> &ClaimId {
        &self.claim.claim_id
    }

    pub fn npi(&self) -> &Npi {
        &self.claim.npi
    }

    pub fn ndc(&self) -> &Ndc {
        &self.claim.ndc
    }

    pub fn quantity(&self) -> Decimal {
        self.claim.quantity
    }

    pub fn price(&self) -> Decimal {
        self.claim.price
    }
}
