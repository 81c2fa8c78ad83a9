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

//! CsvSift Execution Engine
//!
//! [`execute`] takes a [`Query`] and streams matching rows as CSV to the
//! output writer. Strategy selection, in order:
//!
//! 1. aggregates / GROUP BY → buffered aggregation path
//! 2. ORDER BY → buffered sort path
//! 3. stdin source → sequential stream (no index, no parallelism)
//! 4. a valid `<source>.sidx` exists → sequential scan with block
//!    pruning and seek
//! 5. large file, unbounded or large LIMIT → parallel scan
//! 6. otherwise → sequential scan
//!
//! The output header is written and flushed before any scanning starts,
//! so time-to-first-row is bounded by one seek plus one row's parse. A
//! sidecar index that fails to load or validate is logged (`SIDX_DEBUG=1`)
//! and ignored, never fatal. A closed downstream (EPIPE) ends the query
//! cleanly.

pub mod config;
mod groupby;
mod orderby;
mod parallel;
mod scan;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use csvsift_core::{Error, Query, RecordReader, Result, Source};
use csvsift_sidx::Index;
use tracing::debug;

pub use config::EngineConfig;
pub use csvsift_core::{Projection, SortSpec};

use config::{IO_BUFFER_SIZE, PARALLEL_MIN_LIMIT};

/// Runs `query`, writing CSV to `out`, with configuration taken from the
/// environment.
pub fn execute<W: Write>(query: &Query, out: W) -> Result<()> {
    execute_with(query, &EngineConfig::from_env(), out)
}

/// Runs `query` under an explicit configuration.
pub fn execute_with<W: Write>(query: &Query, cfg: &EngineConfig, out: W) -> Result<()> {
    match dispatch(query, cfg, out) {
        // Downstream hung up; everything already emitted stands.
        Err(Error::Cancelled) => Ok(()),
        other => other,
    }
}

/// Streams `query` over an already-open input with stdin-mode
/// semantics: no index, no parallelism, and a flush after every row so
/// a match reaches the output as soon as its record is read.
pub fn execute_reader<R: BufRead, W: Write>(
    query: &Query,
    cfg: &EngineConfig,
    input: R,
    out: W,
) -> Result<()> {
    let mut reader = RecordReader::new(input);
    match scan::run_stream(query, cfg, &mut reader, out, true) {
        Err(Error::Cancelled) => Ok(()),
        other => other,
    }
}

fn dispatch<W: Write>(query: &Query, cfg: &EngineConfig, out: W) -> Result<()> {
    if !query.aggregates.is_empty() || !query.group_by.is_empty() {
        return groupby::execute(query, out);
    }
    if !query.order_by.is_empty() {
        return orderby::execute(query, out);
    }

    let path = match &query.source {
        Source::Stdin => return scan::execute_stdin(query, cfg, out),
        Source::Path(path) => path.as_path(),
    };

    if let Some(index) = load_index(path) {
        return scan::execute_indexed(query, path, &index, cfg, out);
    }

    if !cfg.no_parallel && wants_parallel(query, path, cfg)? {
        return parallel::execute(query, path, cfg, out);
    }
    scan::execute_sequential(query, path, cfg, out)
}

fn wants_parallel(query: &Query, path: &Path, cfg: &EngineConfig) -> Result<bool> {
    if let Some(limit) = query.limit {
        if limit < PARALLEL_MIN_LIMIT {
            return Ok(false);
        }
    }
    let size = std::fs::metadata(path)?.len();
    Ok(size >= cfg.parallel_min_file_size)
}

/// Loads and revalidates the sidecar index. Every failure is demoted to
/// "no index": the query still runs, just without pruning.
fn load_index(path: &Path) -> Option<Index> {
    let sidecar = csvsift_sidx::sidecar_path(path);
    let file = match File::open(&sidecar) {
        Ok(file) => file,
        Err(_) => return None,
    };
    let index = match csvsift_sidx::read_index(&mut BufReader::new(file)) {
        Ok(index) => index,
        Err(err) => {
            debug!(sidecar = %sidecar.display(), %err, "index unreadable, ignoring");
            return None;
        }
    };
    match csvsift_sidx::validate_against(&index, path) {
        Ok(()) => {
            debug!(
                sidecar = %sidecar.display(),
                blocks = index.blocks.len(),
                "index loaded"
            );
            Some(index)
        }
        Err(err) => {
            debug!(sidecar = %sidecar.display(), %err, "index failed validation, ignoring");
            None
        }
    }
}

/// Opens the query's source as a buffered record reader.
fn open_source(query: &Query) -> Result<RecordReader<Box<dyn BufRead>>> {
    let inner: Box<dyn BufRead> = match &query.source {
        Source::Path(path) => Box::new(BufReader::with_capacity(IO_BUFFER_SIZE, File::open(path)?)),
        Source::Stdin => Box::new(io::stdin().lock()),
    };
    Ok(RecordReader::new(inner))
}

/// A broken pipe on the output is a cancellation, not a failure.
fn map_write_err(err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::BrokenPipe {
        Error::Cancelled
    } else {
        Error::Io(err)
    }
}
