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

use clap::Parser;
use pharmacy_analytics::{io, pipeline};
use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Pharmacy Claims Analytics
///
/// Reconciles dispensed claims against reversals and writes per-prescriber
/// metrics, chain recommendations and quantity insights as JSON.
#[derive(Parser, Debug)]
#[command(name = "pharmacy-analytics")]
#[command(about = "Pharmacy claims analytics", long_about = None)]
struct Args {
    /// Directory of pharmacy CSV files (npi, chain); repeatable
    #[arg(long = "pharmacy", value_name = "DIR", required = true)]
    pharmacy: Vec<PathBuf>,

    /// Directory of claim JSON files; repeatable
    #[arg(long = "claims", value_name = "DIR", required = true)]
    claims: Vec<PathBuf>,

    /// Directory of revert JSON files; repeatable
    #[arg(long = "reverts", value_name = "DIR", required = true)]
    reverts: Vec<PathBuf>,

    /// Where the report files and analytics.log are written
    #[arg(long = "output-dir", value_name = "DIR", default_value = "output")]
    output_dir: PathBuf,
}

/// Logs every event to stderr and to the run's log file.
fn init_tracing(log_file: File) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Arc::new(log_file)))
        .init();
}

fn main() {
    let args = Args::parse();

    let log_file = match io::open_log_file(&args.output_dir) {
        Ok(file) => file,
        Err(e) => {
            eprintln!(
                "Error opening log file in '{}': {}",
                args.output_dir.display(),
                e
            );
            process::exit(1);
        }
    };
    init_tracing(log_file);

    tracing::info!("starting pharmacy analytics pipeline");

    let batch = match io::load_batch(&args.pharmacy, &args.claims, &args.reverts) {
        Ok(batch) => batch,
        Err(e) => {
            tracing::error!("error loading input: {e}");
            process::exit(1);
        }
    };

    let report = match pipeline::run(&batch) {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("batch aborted: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = io::write_report(&report, &args.output_dir) {
        tracing::error!("error writing report: {e}");
        process::exit(1);
    }

    tracing::info!("all reports written");
}
