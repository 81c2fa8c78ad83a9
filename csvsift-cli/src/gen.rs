// SPDX-License-Identifier: AGPL-3.0-or-later
// CsvSift - Streaming CSV Query Engine
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
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

//! Synthetic e-commerce fixture generator. Seeded, so fixtures are
//! reproducible across runs and machines.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, SecondsFormat, TimeZone, Utc};
use csvsift_core::CsvWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const HEADER: [&str; 10] = [
    "order_id",
    "user_id",
    "product_id",
    "quantity",
    "price_minor", // 4-digit minor units (1000 => £10.00)
    "discount_minor",
    "total_minor",
    "status",
    "country",
    "created_at",
];

const COUNTRIES: [&str; 10] = ["UK", "US", "DE", "FR", "ES", "IT", "NL", "CA", "AU", "SE"];
const STATUSES: [&str; 5] = [
    "pending",
    "processing",
    "completed",
    "cancelled",
    "refunded",
];

pub fn run(rows: u64, seed: u64, sorted: bool, out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).context("create output dir")?;
    }
    let file = File::create(out_path).context("create output file")?;
    let mut writer = CsvWriter::new(file);
    writer.write_record(&HEADER).context("write header")?;

    let mut rng = StdRng::seed_from_u64(seed);
    let base_time = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();

    let mut record: Vec<String> = vec![String::new(); HEADER.len()];
    for i in 0..rows {
        let quantity = rng.gen_range(1..=5u32);
        let price_minor = rng.gen_range(1000..10_000u32);
        let discount_minor = if rng.gen::<f64>() < 0.15 {
            rng.gen_range(0..=price_minor / 5)
        } else {
            0
        };
        let total_minor = (price_minor * quantity).saturating_sub(discount_minor);

        let created_at = if sorted {
            base_time + Duration::seconds(i as i64)
        } else {
            base_time + Duration::hours(rng.gen_range(0..365 * 24) as i64)
        };

        record[0] = format!("ORD{:09}", i + 1);
        record[1] = format!("USR{:06}", rng.gen_range(1..=200_000u32));
        record[2] = format!("PRD{:05}", rng.gen_range(1..=20_000u32));
        record[3] = quantity.to_string();
        record[4] = format!("{price_minor:04}");
        record[5] = discount_minor.to_string();
        record[6] = total_minor.to_string();
        record[7] = STATUSES[rng.gen_range(0..STATUSES.len())].to_string();
        record[8] = COUNTRIES[rng.gen_range(0..COUNTRIES.len())].to_string();
        record[9] = created_at.to_rfc3339_opts(SecondsFormat::Secs, true);

        writer
            .write_record(&record)
            .with_context(|| format!("write row {i}"))?;
    }

    writer.flush().context("final flush")?;
    println!("wrote {} rows to {}", rows, out_path.display());
    Ok(())
}
