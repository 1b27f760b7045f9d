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

//! Identifier types for pharmacies, drugs, claims and reverts.
//!
//! Every identifier arrives as text from the input adapters and is compared
//! byte-for-byte. Orderings are lexicographic, which is what the report
//! sorting and chain tie-breaking rely on.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id! {
    /// National Provider Identifier of a pharmacy location.
    Npi
}

string_id! {
    /// National Drug Code of a dispensed product.
    Ndc
}

string_id! {
    /// Unique identifier for a dispensed claim.
    ///
    /// Must be unique across the whole claims stream of a batch.
    ClaimId
}

string_id! {
    /// Identifier of a reversal event.
    RevertId
}

string_id! {
    /// Name of the retail chain a pharmacy belongs to.
    Chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_their_raw_value() {
        assert_eq!(Npi::from("1234567890").to_string(), "1234567890");
        assert_eq!(Chain::from("health").to_string(), "health");
    }

    #[test]
    fn chains_order_lexicographically() {
        let mut chains = vec![Chain::from("saint"), Chain::from("doctor"), Chain::from("health")];
        chains.sort();
        assert_eq!(
            chains,
            vec![Chain::from("doctor"), Chain::from("health"), Chain::from("saint")]
        );
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&Ndc::from("00002-3228")).unwrap();
        assert_eq!(json, "\"00002-3228\"");
    }
}
