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

//! CsvSift CLI
//!
//! ```bash
//! # Query a CSV (results stream to stdout as CSV)
//! csvsift "SELECT id, total FROM orders.csv WHERE country = 'UK' LIMIT 5"
//!
//! # Query text can also arrive on stdin
//! echo "SELECT * FROM orders.csv" | csvsift
//!
//! # Build the sidecar block index next to the source
//! csvsift index --block-rows 65536 orders.csv
//!
//! # Generate a synthetic e-commerce fixture
//! csvsift gen --rows 1000000 --out fixtures/ecommerce_1m.csv
//! ```
//!
//! `SIDX_DEBUG=1` routes index / pruning diagnostics to stderr;
//! `SIDX_NO_PARALLEL=1` forces the sequential scanner. Exit code is 0 on
//! success (including a closed downstream) and 1 on any error.

mod gen;

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use csvsift_sidx::{sidecar_path, write_index, IndexBuilder, DEFAULT_BLOCK_ROWS};

#[derive(Parser)]
#[command(name = "csvsift", version)]
#[command(about = "Stream SQL-ish queries over CSV files")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// SQL query; read from stdin when omitted
    #[arg(trailing_var_arg = true)]
    query: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Build the .sidx sidecar block index for a CSV file
    Index {
        /// CSV file to index
        file: PathBuf,

        /// Rows per block
        #[arg(long, default_value_t = DEFAULT_BLOCK_ROWS)]
        block_rows: u32,

        /// Assume every column is a string (faster indexing)
        #[arg(long)]
        skip_type_inference: bool,
    },

    /// Generate a synthetic e-commerce CSV fixture
    Gen {
        /// Number of data rows
        #[arg(long, default_value_t = 1_000_000)]
        rows: u64,

        /// Random seed; identical seeds produce identical files
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Sequential timestamps instead of random ones
        #[arg(long)]
        sorted: bool,

        /// Output path
        #[arg(long, default_value = "fixtures/ecommerce_1m.csv")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Index {
            file,
            block_rows,
            skip_type_inference,
        }) => build_index(&file, block_rows, skip_type_inference),
        Some(Command::Gen {
            rows,
            seed,
            sorted,
            out,
        }) => gen::run(rows, seed, sorted, &out),
        None => run_query(&cli.query),
    }
}

fn init_tracing() {
    let default = if std::env::var("SIDX_DEBUG").as_deref() == Ok("1") {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_query(args: &[String]) -> Result<()> {
    let text = if args.is_empty() {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read query from stdin")?;
        buf
    } else {
        args.join(" ")
    };
    let text = text.trim();
    if text.is_empty() {
        bail!("usage: csvsift \"SELECT ...\" (or pipe the query via stdin)");
    }

    let query = csvsift_sql::parse(text).context("parse query")?;
    let stdout = std::io::stdout().lock();
    csvsift_engine::execute(&query, stdout).context("execute query")?;
    Ok(())
}

fn build_index(file: &Path, block_rows: u32, skip_type_inference: bool) -> Result<()> {
    eprintln!(
        "Building index for {} ({} rows per block)...",
        file.display(),
        block_rows
    );

    let index = IndexBuilder::new(block_rows)
        .with_type_inference(!skip_type_inference)
        .build(file)
        .context("build index")?;

    let out_path = sidecar_path(file);
    let mut out = BufWriter::new(File::create(&out_path).context("create index file")?);
    write_index(&mut out, &index).context("write index")?;
    out.flush().context("flush index")?;

    eprintln!(
        "Index written to {} ({} blocks)",
        out_path.display(),
        index.blocks.len()
    );
    Ok(())
}
