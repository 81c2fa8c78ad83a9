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

//! Parallel scanner.
//!
//! Topology: one reader thread and M worker threads over bounded
//! channels sized 2·M.
//!
//! ```text
//! [Reader] --Batch{id, rows}--> [Worker 1..M] --Ready{id, rows}--> [Writer]
//!    │          parse               filter +          reassemble by id,
//!    │                              project           emit in order
//!    └── polls a stop flag between batches (LIMIT / EPIPE / error)
//! ```
//!
//! Batches own their rows outright; nothing is shared across threads but
//! the channels and the stop flag. The writer buffers out-of-order
//! results in a map keyed by batch id, so output row order always equals
//! source row order. When LIMIT is reached the writer raises the stop
//! flag and drains the result channel so blocked producers unwind.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use csvsift_core::{
    parse_record, BoundExpr, CsvWriter, Error, Header, Query, RecordReader, Result, RowBuf,
};
use tracing::debug;

use crate::config::{EngineConfig, IO_BUFFER_SIZE};
use crate::map_write_err;

struct Batch {
    id: u64,
    rows: Vec<Vec<String>>,
}

/// A batch after WHERE and projection, still in source order.
struct Ready {
    id: u64,
    rows: Vec<Vec<String>>,
}

pub(crate) fn execute<W: Write>(
    query: &Query,
    path: &Path,
    cfg: &EngineConfig,
    out: W,
) -> Result<()> {
    let file = File::open(path)?;
    let mut reader = RecordReader::new(BufReader::with_capacity(IO_BUFFER_SIZE, file));
    let mut row_buf = RowBuf::new();

    let Some((record, _)) = reader.read_record()? else {
        return Err(Error::parse(0, "empty input: missing header"));
    };
    parse_record(record, 0, &mut row_buf)?;
    let header = Header::from_fields(row_buf.fields());

    let (selected, out_names) = header.resolve(&query.projection)?;
    let bound = match &query.predicate {
        Some(expr) => Some(BoundExpr::bind(expr, &header)?),
        None => None,
    };

    let mut writer = CsvWriter::new(out);
    writer.write_record(&out_names).map_err(map_write_err)?;
    writer.flush().map_err(map_write_err)?;
    if query.limit == Some(0) {
        return Ok(());
    }

    let workers = cfg.workers.max(1);
    let batch_rows = cfg.batch_rows.max(1);
    debug!(workers, batch_rows, "parallel scan starting");

    let (batch_tx, batch_rx) = bounded::<Result<Batch>>(2 * workers);
    let (ready_tx, ready_rx) = bounded::<Result<Ready>>(2 * workers);
    let stop = AtomicBool::new(false);

    thread::scope(|scope| {
        let stop = &stop;
        let bound = bound.as_ref();
        let selected = selected.as_slice();

        scope.spawn(move || read_batches(reader, row_buf, batch_rows, batch_tx, stop));
        for _ in 0..workers {
            let rx = batch_rx.clone();
            let tx = ready_tx.clone();
            scope.spawn(move || filter_batches(rx, tx, bound, selected));
        }
        drop(batch_rx);
        drop(ready_tx);

        let mut pending: HashMap<u64, Vec<Vec<String>>> = HashMap::new();
        let mut next_id: u64 = 0;
        let mut written: u64 = 0;
        let mut since_flush = 0usize;
        let mut failure: Option<Error> = None;

        'drain: for message in &ready_rx {
            let ready = match message {
                Ok(ready) => ready,
                Err(err) => {
                    failure = Some(err);
                    break 'drain;
                }
            };
            pending.insert(ready.id, ready.rows);

            while let Some(rows) = pending.remove(&next_id) {
                next_id += 1;
                for row in rows {
                    if let Some(limit) = query.limit {
                        if written >= u64::from(limit) {
                            break 'drain;
                        }
                    }
                    if let Err(err) = writer.write_record(&row) {
                        failure = Some(map_write_err(err));
                        break 'drain;
                    }
                    written += 1;
                    since_flush += 1;
                    if since_flush >= cfg.flush_every {
                        if let Err(err) = writer.flush() {
                            failure = Some(map_write_err(err));
                            break 'drain;
                        }
                        since_flush = 0;
                    }
                }
            }
        }

        // Unblock any producer still waiting on a full channel, then let
        // every thread drain out before the scope joins them.
        stop.store(true, Ordering::Relaxed);
        for _ in &ready_rx {}

        match failure {
            Some(err) => Err(err),
            None => {
                writer.flush().map_err(map_write_err)?;
                debug!(rows = written, batches = next_id, "parallel scan complete");
                Ok(())
            }
        }
    })
}

fn read_batches<R: std::io::BufRead>(
    mut reader: RecordReader<R>,
    mut row_buf: RowBuf,
    batch_rows: usize,
    tx: Sender<Result<Batch>>,
    stop: &AtomicBool,
) {
    let mut id: u64 = 0;
    let mut row_no: u64 = 0;
    loop {
        if stop.load(Ordering::Relaxed) {
            return;
        }
        let mut rows = Vec::with_capacity(batch_rows);
        let mut eof = false;
        while rows.len() < batch_rows {
            match reader.read_record() {
                Ok(Some((record, _))) => {
                    if record.is_empty() {
                        continue;
                    }
                    row_no += 1;
                    if let Err(err) = parse_record(record, row_no, &mut row_buf) {
                        let _ = tx.send(Err(err));
                        return;
                    }
                    rows.push(row_buf.to_vec());
                }
                Ok(None) => {
                    eof = true;
                    break;
                }
                Err(err) => {
                    let _ = tx.send(Err(Error::Io(err)));
                    return;
                }
            }
        }
        if !rows.is_empty() {
            if tx.send(Ok(Batch { id, rows })).is_err() {
                return;
            }
            id += 1;
        }
        if eof {
            return;
        }
    }
}

fn filter_batches(
    rx: Receiver<Result<Batch>>,
    tx: Sender<Result<Ready>>,
    bound: Option<&BoundExpr>,
    selected: &[usize],
) {
    for message in rx {
        let batch = match message {
            Ok(batch) => batch,
            Err(err) => {
                let _ = tx.send(Err(err));
                return;
            }
        };
        let mut rows = Vec::new();
        for row in &batch.rows {
            if let Some(pred) = bound {
                if !pred.matches(row) {
                    continue;
                }
            }
            rows.push(
                selected
                    .iter()
                    .map(|&ord| row.get(ord).cloned().unwrap_or_default())
                    .collect(),
            );
        }
        // Every id must reach the writer, even with zero surviving rows,
        // or reassembly stalls.
        if tx.send(Ok(Ready { id: batch.id, rows })).is_err() {
            return;
        }
    }
}
