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

//! Most frequently dispensed quantity per drug.

use crate::base::Ndc;
use crate::event::EffectiveClaim;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// The modal quantity for one drug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantityMode {
    pub quantity: Decimal,
    /// How many non-reverted claims dispensed exactly this quantity.
    pub occurrences: u64,
}

/// Finds the most frequent non-reverted quantity for every drug.
///
/// Numerically equal quantities (`10` and `10.0`) count as the same value.
/// On a count tie the smallest quantity wins. Drugs with no non-reverted
/// claims have no mode and are omitted.
pub fn find_modes(effective: &[EffectiveClaim]) -> BTreeMap<Ndc, QuantityMode> {
    let mut counts: BTreeMap<&Ndc, BTreeMap<Decimal, u64>> = BTreeMap::new();
    for claim in effective.iter().filter(|claim| !claim.reverted) {
        *counts
            .entry(claim.ndc())
            .or_default()
            .entry(claim.quantity().normalize())
            .or_insert(0) += 1;
    }

    counts
        .into_iter()
        .filter_map(|(ndc, quantities)| mode_of(&quantities).map(|mode| (ndc.clone(), mode)))
        .collect()
}

/// Picks the highest count, scanning quantities in ascending order so the
/// first maximum seen is the smallest quantity.
fn mode_of(quantities: &BTreeMap<Decimal, u64>) -> Option<QuantityMode> {
    let mut best: Option<QuantityMode> = None;
    for (&quantity, &occurrences) in quantities {
        if best.is_none_or(|mode| occurrences > mode.occurrences) {
            best = Some(QuantityMode {
                quantity,
                occurrences,
            });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn counts(entries: &[(Decimal, u64)]) -> BTreeMap<Decimal, u64> {
        entries.iter().copied().collect()
    }

    #[test]
    fn mode_of_picks_highest_count() {
        let mode = mode_of(&counts(&[(dec!(3), 3), (dec!(5), 2), (dec!(7), 1)])).unwrap();
        assert_eq!(mode.quantity, dec!(3));
        assert_eq!(mode.occurrences, 3);
    }

    #[test]
    fn mode_of_tie_takes_smallest() {
        let mode = mode_of(&counts(&[(dec!(5), 2), (dec!(3), 2)])).unwrap();
        assert_eq!(mode.quantity, dec!(3));
    }

    #[test]
    fn mode_of_empty_is_none() {
        assert_eq!(mode_of(&BTreeMap::new()), None);
    }
}
