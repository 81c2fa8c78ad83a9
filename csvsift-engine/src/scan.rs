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

//! Sequential scanners.
//!
//! Three variants share one row loop: a plain file scan, a stdin scan
//! (flushes per row so the first match appears as soon as its record is
//! read), and the indexed scan, which computes the pruned block set up
//! front, seeks straight to the first live block, and re-seeks forward
//! whenever the running row counter crosses into a pruned block.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use csvsift_core::{
    parse_record, BoundExpr, CsvWriter, Error, Header, Query, RecordReader, Result, RowBuf,
};
use csvsift_sidx::{can_prune, Index};
use tracing::debug;

use crate::config::{EngineConfig, IO_BUFFER_SIZE};
use crate::map_write_err;

/// Plain streaming scan over a file.
pub(crate) fn execute_sequential<W: Write>(
    query: &Query,
    path: &Path,
    cfg: &EngineConfig,
    out: W,
) -> Result<()> {
    let file = File::open(path)?;
    let mut reader = RecordReader::new(BufReader::with_capacity(IO_BUFFER_SIZE, file));
    run_stream(query, cfg, &mut reader, out, false)
}

/// Streaming scan over standard input: no index, no parallelism, no
/// seeking, and a flush after every emitted row.
pub(crate) fn execute_stdin<W: Write>(query: &Query, cfg: &EngineConfig, out: W) -> Result<()> {
    let mut reader = RecordReader::new(std::io::stdin().lock());
    run_stream(query, cfg, &mut reader, out, true)
}

pub(crate) fn run_stream<R: BufRead, W: Write>(
    query: &Query,
    cfg: &EngineConfig,
    reader: &mut RecordReader<R>,
    out: W,
    flush_per_row: bool,
) -> Result<()> {
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

    let mut written: u64 = 0;
    let mut since_flush = 0usize;
    let mut row_no: u64 = 0;
    loop {
        let Some((record, _)) = reader.read_record()? else {
            break;
        };
        if record.is_empty() {
            continue;
        }
        row_no += 1;
        parse_record(record, row_no, &mut row_buf)?;

        let fields = row_buf.fields();
        if let Some(pred) = &bound {
            if !pred.matches(fields) {
                continue;
            }
        }

        writer.write_selected(fields, &selected).map_err(map_write_err)?;
        written += 1;
        since_flush += 1;
        if flush_per_row || since_flush >= cfg.flush_every {
            writer.flush().map_err(map_write_err)?;
            since_flush = 0;
        }
        if let Some(limit) = query.limit {
            if written >= u64::from(limit) {
                break;
            }
        }
    }

    writer.flush().map_err(map_write_err)?;
    Ok(())
}

/// Index-assisted scan: prune, seek, stream, re-seek past pruned blocks.
pub(crate) fn execute_indexed<W: Write>(
    query: &Query,
    path: &Path,
    index: &Index,
    cfg: &EngineConfig,
    out: W,
) -> Result<()> {
    let mut file = File::open(path)?;

    let mut row_buf = RowBuf::new();
    let header = {
        let mut reader = RecordReader::new(BufReader::with_capacity(IO_BUFFER_SIZE, &mut file));
        let Some((record, _)) = reader.read_record()? else {
            return Err(Error::parse(0, "empty input: missing header"));
        };
        parse_record(record, 0, &mut row_buf)?;
        Header::from_fields(row_buf.fields())
    };

    let (selected, out_names) = header.resolve(&query.projection)?;
    let bound = match &query.predicate {
        Some(expr) => Some(BoundExpr::bind(expr, &header)?),
        None => None,
    };

    let blocks = &index.blocks;
    let pruned: Vec<bool> = match &query.predicate {
        Some(expr) => blocks.iter().map(|b| can_prune(index, b, expr)).collect(),
        None => vec![false; blocks.len()],
    };
    let pruned_count = pruned.iter().filter(|&&p| p).count();
    debug!(
        blocks = blocks.len(),
        pruned = pruned_count,
        "index loaded, pruning computed"
    );

    let mut writer = CsvWriter::new(out);
    writer.write_record(&out_names).map_err(map_write_err)?;
    writer.flush().map_err(map_write_err)?;

    if query.limit == Some(0) {
        return Ok(());
    }

    let Some(first_live) = pruned.iter().position(|&p| !p) else {
        // every block pruned (or no data rows at all)
        return Ok(());
    };

    let mut cur_block = first_live;
    let mut cur_row = blocks[cur_block].start_row;
    file.seek(SeekFrom::Start(blocks[cur_block].start_offset))?;
    debug!(
        block = cur_block,
        offset = blocks[cur_block].start_offset,
        "seek to first live block"
    );
    let mut reader = RecordReader::new(BufReader::with_capacity(IO_BUFFER_SIZE, file));

    let mut written: u64 = 0;
    let mut since_flush = 0usize;
    loop {
        // Crossing into the next block? Skip forward over pruned ones.
        while cur_block < blocks.len() && cur_row >= blocks[cur_block].end_row {
            cur_block += 1;
        }
        if cur_block < blocks.len() && pruned[cur_block] {
            let mut next = cur_block + 1;
            while next < blocks.len() && pruned[next] {
                next += 1;
            }
            if next >= blocks.len() {
                break;
            }
            let mut file = reader.into_inner().into_inner();
            file.seek(SeekFrom::Start(blocks[next].start_offset))?;
            reader = RecordReader::new(BufReader::with_capacity(IO_BUFFER_SIZE, file));
            cur_block = next;
            cur_row = blocks[next].start_row;
            debug!(
                block = next,
                offset = blocks[next].start_offset,
                "skipped pruned blocks"
            );
        }

        let Some((record, _)) = reader.read_record()? else {
            break;
        };
        if record.is_empty() {
            continue;
        }
        parse_record(record, cur_row + 1, &mut row_buf)?;
        cur_row += 1;

        let fields = row_buf.fields();
        if let Some(pred) = &bound {
            if !pred.matches(fields) {
                continue;
            }
        }

        writer.write_selected(fields, &selected).map_err(map_write_err)?;
        written += 1;
        since_flush += 1;
        if since_flush >= cfg.flush_every {
            writer.flush().map_err(map_write_err)?;
            since_flush = 0;
        }
        if let Some(limit) = query.limit {
            if written >= u64::from(limit) {
                break;
            }
        }
    }

    writer.flush().map_err(map_write_err)?;
    Ok(())
}
