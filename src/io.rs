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

//! Input and output adapters.
//!
//! # Inputs
//!
//! - Pharmacies: `*.csv` files with at least `npi` and `chain` columns.
//! - Claims: `*.json` files holding an array of
//!   `{id, npi, ndc, price, quantity, timestamp}` objects.
//! - Reverts: `*.json` files holding an array of `{id, claim_id, timestamp}`
//!   objects.
//!
//! Unreadable files and rows that fail to parse are skipped with a warning;
//! only a batch with no pharmacy data at all is an error.
//!
//! # Outputs
//!
//! [`write_report`] writes `npi_metrics.json`, `chain_recommendations.json`
//! and `quantity_insights.json`, each sorted by key.

use crate::base::{Chain, ClaimId, Ndc, Npi, RevertId};
use crate::chain::ChainRecommendation;
use crate::error::AdapterError;
use crate::event::{Claim, Pharmacy, Revert};
use crate::metrics::{MetricKey, MetricRecord};
use crate::pipeline::{AnalyticsReport, Batch};
use crate::quantity::QuantityMode;
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, Trim};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const METRICS_FILE: &str = "npi_metrics.json";
pub const RECOMMENDATIONS_FILE: &str = "chain_recommendations.json";
pub const QUANTITIES_FILE: &str = "quantity_insights.json";
pub const LOG_FILE: &str = "analytics.log";

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an event timestamp.
///
/// Accepts RFC 3339, or a naive date-time which is taken to be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|timestamp| timestamp.and_utc())
}

/// Identifier that may be written as a JSON string or a bare number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Text {
    Str(String),
    Num(serde_json::Number),
}

impl From<Text> for String {
    fn from(value: Text) -> Self {
        match value {
            Text::Str(text) => text,
            Text::Num(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PharmacyRow {
    npi: String,
    chain: String,
}

#[derive(Debug, Deserialize)]
struct ClaimRow {
    id: Text,
    npi: Text,
    ndc: Text,
    price: Decimal,
    quantity: Decimal,
    timestamp: String,
}

impl ClaimRow {
    /// Returns `None` when the timestamp cannot be parsed.
    fn into_claim(self) -> Option<Claim> {
        Some(Claim {
            timestamp: parse_timestamp(&self.timestamp)?,
            claim_id: ClaimId(self.id.into()),
            npi: Npi(self.npi.into()),
            ndc: Ndc(self.ndc.into()),
            quantity: self.quantity,
            price: self.price,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RevertRow {
    id: Text,
    claim_id: Text,
    timestamp: String,
}

impl RevertRow {
    fn into_revert(self) -> Option<Revert> {
        Some(Revert {
            timestamp: parse_timestamp(&self.timestamp)?,
            revert_id: RevertId(self.id.into()),
            claim_id: ClaimId(self.claim_id.into()),
        })
    }
}

/// Reads pharmacy master data from CSV.
///
/// Columns other than `npi` and `chain` are ignored. Malformed rows are
/// skipped.
///
/// # Errors
///
/// Returns [`AdapterError::MissingColumn`] if the header lacks `npi` or
/// `chain`, or a CSV error if the header cannot be read.
pub fn read_pharmacies<R: Read>(reader: R) -> Result<Vec<Pharmacy>, AdapterError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?;
    for column in ["npi", "chain"] {
        if !headers.iter().any(|header| header == column) {
            return Err(AdapterError::MissingColumn(column));
        }
    }

    let mut pharmacies = Vec::new();
    for result in rdr.deserialize::<PharmacyRow>() {
        match result {
            Ok(row) => pharmacies.push(Pharmacy {
                npi: Npi(row.npi),
                chain: Chain(row.chain),
            }),
            Err(e) => tracing::warn!("skipping malformed pharmacy row: {e}"),
        }
    }
    Ok(pharmacies)
}

/// Reads a JSON array of claim objects. Rows that fail to parse are skipped.
pub fn read_claims<R: Read>(reader: R) -> Result<Vec<Claim>, AdapterError> {
    read_rows(reader, "claim", ClaimRow::into_claim)
}

/// Reads a JSON array of revert objects. Rows that fail to parse are skipped.
pub fn read_reverts<R: Read>(reader: R) -> Result<Vec<Revert>, AdapterError> {
    read_rows(reader, "revert", RevertRow::into_revert)
}

fn read_rows<R, T, E, F>(reader: R, kind: &str, convert: F) -> Result<Vec<E>, AdapterError>
where
    R: Read,
    T: DeserializeOwned,
    F: Fn(T) -> Option<E>,
{
    let values: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
    let mut events = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let row = match serde_json::from_value::<T>(value) {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(index, "skipping malformed {kind} row: {e}");
                continue;
            }
        };
        match convert(row) {
            Some(event) => events.push(event),
            None => tracing::warn!(index, "skipping {kind} row with invalid timestamp"),
        }
    }
    Ok(events)
}

/// Lists files with the given extension (case-insensitive), sorted by path.
fn files_with_extension(dir: &Path, extension: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        tracing::warn!("directory not found: {}", dir.display());
        return Vec::new();
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("failed to list {}: {e}", dir.display());
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
        })
        .collect();
    files.sort();
    files
}

fn load_dirs<T, F>(dirs: &[PathBuf], extension: &str, kind: &str, read: F) -> Vec<T>
where
    F: Fn(BufReader<File>) -> Result<Vec<T>, AdapterError>,
{
    let mut records = Vec::new();
    for dir in dirs {
        for path in files_with_extension(dir, extension) {
            let loaded = File::open(&path)
                .map_err(AdapterError::from)
                .and_then(|file| read(BufReader::new(file)));
            match loaded {
                Ok(batch) => {
                    tracing::info!(count = batch.len(), "loaded {kind} from {}", path.display());
                    records.extend(batch);
                }
                Err(e) => tracing::error!("failed to read {kind} file {}: {e}", path.display()),
            }
        }
    }
    records
}

/// Loads pharmacies from every CSV file in `dirs`.
///
/// # Errors
///
/// Returns [`AdapterError::NoPharmacies`] if no pharmacy rows were loaded.
pub fn load_pharmacies(dirs: &[PathBuf]) -> Result<Vec<Pharmacy>, AdapterError> {
    let pharmacies = load_dirs(dirs, "csv", "pharmacies", read_pharmacies);
    if pharmacies.is_empty() {
        return Err(AdapterError::NoPharmacies);
    }
    tracing::info!(count = pharmacies.len(), "total pharmacies loaded");
    Ok(pharmacies)
}

pub fn load_claims(dirs: &[PathBuf]) -> Vec<Claim> {
    let claims = load_dirs(dirs, "json", "claims", read_claims);
    if claims.is_empty() {
        tracing::warn!("no claim data loaded");
    }
    claims
}

pub fn load_reverts(dirs: &[PathBuf]) -> Vec<Revert> {
    let reverts = load_dirs(dirs, "json", "reverts", read_reverts);
    if reverts.is_empty() {
        tracing::warn!("no revert data loaded");
    }
    reverts
}

/// Loads all three input streams.
pub fn load_batch(
    pharmacy_dirs: &[PathBuf],
    claim_dirs: &[PathBuf],
    revert_dirs: &[PathBuf],
) -> Result<Batch, AdapterError> {
    Ok(Batch {
        pharmacies: load_pharmacies(pharmacy_dirs)?,
        claims: load_claims(claim_dirs),
        reverts: load_reverts(revert_dirs),
    })
}

#[derive(Debug, Serialize)]
struct MetricRow<'a> {
    npi: &'a Npi,
    ndc: &'a Ndc,
    claim_count: u64,
    reverted_count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    total_quantity: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    total_price: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    avg_price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct ChainRow<'a> {
    name: &'a Chain,
    score: u64,
}

#[derive(Debug, Serialize)]
struct RecommendationRow<'a> {
    ndc: &'a Ndc,
    chain: Vec<ChainRow<'a>>,
}

#[derive(Debug, Serialize)]
struct QuantityRow<'a> {
    ndc: &'a Ndc,
    #[serde(with = "rust_decimal::serde::float")]
    most_prescribed_quantity: Decimal,
    occurrences: u64,
}

/// Writes metrics as a pretty-printed JSON array, money rounded to cents.
pub fn write_metrics<W: Write>(
    metrics: &BTreeMap<MetricKey, MetricRecord>,
    writer: W,
) -> Result<(), AdapterError> {
    let rows: Vec<MetricRow<'_>> = metrics
        .iter()
        .map(|(key, record)| MetricRow {
            npi: &key.npi,
            ndc: &key.ndc,
            claim_count: record.claim_count,
            reverted_count: record.reverted_count,
            total_quantity: record.total_quantity,
            total_price: record.total_price.round_dp(2),
            avg_price: record.avg_price(),
        })
        .collect();
    write_json(&rows, writer)
}

pub fn write_recommendations<W: Write>(
    recommendations: &BTreeMap<Ndc, ChainRecommendation>,
    writer: W,
) -> Result<(), AdapterError> {
    let rows: Vec<RecommendationRow<'_>> = recommendations
        .iter()
        .map(|(ndc, recommendation)| RecommendationRow {
            ndc,
            chain: recommendation
                .chains
                .iter()
                .map(|entry| ChainRow {
                    name: &entry.chain,
                    score: entry.score,
                })
                .collect(),
        })
        .collect();
    write_json(&rows, writer)
}

pub fn write_quantity_modes<W: Write>(
    modes: &BTreeMap<Ndc, QuantityMode>,
    writer: W,
) -> Result<(), AdapterError> {
    let rows: Vec<QuantityRow<'_>> = modes
        .iter()
        .map(|(ndc, mode)| QuantityRow {
            ndc,
            most_prescribed_quantity: mode.quantity,
            occurrences: mode.occurrences,
        })
        .collect();
    write_json(&rows, writer)
}

fn write_json<T: Serialize, W: Write>(rows: &T, writer: W) -> Result<(), AdapterError> {
    let mut writer = BufWriter::new(writer);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush()?;
    Ok(())
}

/// Opens `analytics.log` in `output_dir` for appending, creating both as needed.
pub fn open_log_file(output_dir: &Path) -> Result<File, AdapterError> {
    fs::create_dir_all(output_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_dir.join(LOG_FILE))?;
    Ok(file)
}

/// Writes the three report files into `output_dir`, creating it if needed.
pub fn write_report(report: &AnalyticsReport, output_dir: &Path) -> Result<(), AdapterError> {
    fs::create_dir_all(output_dir)?;

    let path = output_dir.join(METRICS_FILE);
    write_metrics(&report.metrics, File::create(&path)?)?;
    tracing::info!(rows = report.metrics.len(), "npi/ndc metrics -> {}", path.display());

    let path = output_dir.join(RECOMMENDATIONS_FILE);
    write_recommendations(&report.recommendations, File::create(&path)?)?;
    tracing::info!(
        drugs = report.recommendations.len(),
        "chain recommendations -> {}",
        path.display()
    );

    let path = output_dir.join(QUANTITIES_FILE);
    write_quantity_modes(&report.quantity_modes, File::create(&path)?)?;
    tracing::info!(
        drugs = report.quantity_modes.len(),
        "quantity insights -> {}",
        path.display()
    );

    Ok(())
}
