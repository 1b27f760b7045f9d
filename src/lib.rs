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

//! # Pharmacy Analytics
//!
//! This library reconciles dispensed pharmacy claims against claim reversals
//! and derives utilization analytics from the result.
//!
//! ## Core Components
//!
//! - [`reconcile()`]: Marks each claim reverted or not, producing [`EffectiveClaim`]s
//! - [`aggregate()`]: Per-`(npi, ndc)` [`MetricRecord`]s
//! - [`recommend()`]: Top 2 chains per drug by dispensed claim count
//! - [`find_modes()`]: Most frequently dispensed quantity per drug
//! - [`pipeline::run`]: The whole batch, returning an [`AnalyticsReport`]
//!
//! ## Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use pharmacy_analytics::{Batch, Claim, MetricKey, Ndc, Pharmacy, pipeline};
//! use rust_decimal_macros::dec;
//!
//! let batch = Batch {
//!     pharmacies: vec![Pharmacy::new("1", "health")],
//!     claims: vec![Claim {
//!         claim_id: "c1".into(),
//!         npi: "1".into(),
//!         ndc: "X".into(),
//!         quantity: dec!(30),
//!         price: dec!(12.50),
//!         timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
//!     }],
//!     reverts: vec![],
//! };
//!
//! let report = pipeline::run(&batch).unwrap();
//! assert_eq!(report.metrics[&MetricKey::new("1", "X")].claim_count, 1);
//! assert_eq!(report.quantity_modes[&Ndc::from("X")].quantity, dec!(30));
//! ```
//!
//! ## Determinism
//!
//! Every result mapping is a `BTreeMap`, and every ranking has a fixed
//! tie-break, so the same batch always yields the same reports regardless of
//! input order.

mod base;
pub mod chain;
mod claim_log;
pub mod directory;
pub mod error;
mod event;
pub mod io;
pub mod metrics;
pub mod pipeline;
pub mod quality;
pub mod quantity;
mod reconcile;

pub use base::{Chain, ClaimId, Ndc, Npi, RevertId};
pub use chain::{
    ChainRecommendation, ChainScore, TOP_CHAINS, ZeroScoreChains, recommend, recommend_with,
};
pub use directory::PharmacyDirectory;
pub use error::{AdapterError, MalformedReason, PipelineError};
pub use event::{Claim, EffectiveClaim, Pharmacy, Revert};
pub use metrics::{MetricKey, MetricRecord, aggregate, aggregate_parallel};
pub use pipeline::{AnalyticsReport, Batch};
pub use quality::{DataQualityReport, MalformedRecord, RecordRef};
pub use quantity::{QuantityMode, find_modes};
pub use reconcile::reconcile;
