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

//! Pharmacy-to-chain lookup.

use crate::base::{Chain, Npi};
use crate::error::PipelineError;
use crate::event::Pharmacy;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Maps each pharmacy NPI to the chain it belongs to.
///
/// # Invariants
///
/// - An NPI maps to exactly one chain for the duration of a batch.
#[derive(Debug, Clone, Default)]
pub struct PharmacyDirectory {
    chains: HashMap<Npi, Chain>,
}

impl PharmacyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the directory from pharmacy master data.
    ///
    /// Repeated rows with the same chain are collapsed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ConflictingPharmacy`] if an NPI is listed
    /// under two different chains.
    pub fn from_pharmacies<'a, I>(pharmacies: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = &'a Pharmacy>,
    {
        let mut directory = Self::new();
        for pharmacy in pharmacies {
            directory.insert(pharmacy)?;
        }
        Ok(directory)
    }

    /// Adds one pharmacy, rejecting a second chain for a known NPI.
    pub fn insert(&mut self, pharmacy: &Pharmacy) -> Result<(), PipelineError> {
        match self.chains.entry(pharmacy.npi.clone()) {
            Entry::Occupied(entry) if *entry.get() != pharmacy.chain => {
                Err(PipelineError::ConflictingPharmacy {
                    npi: pharmacy.npi.clone(),
                    existing: entry.get().clone(),
                    conflicting: pharmacy.chain.clone(),
                })
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(entry) => {
                entry.insert(pharmacy.chain.clone());
                Ok(())
            }
        }
    }

    pub fn chain_of(&self, npi: &Npi) -> Option<&Chain> {
        self.chains.get(npi)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
