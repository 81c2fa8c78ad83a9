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

//! Streaming index builder.
//!
//! One pass over the CSV. Per row the builder records the byte span of
//! the raw line and folds each field into the current block's running
//! statistics. Blocks flush every `block_rows` rows; the final partial
//! block flushes at EOF. Offsets include line terminators, so a block's
//! `end_offset` is the byte right after its last row's newline and the
//! next block starts exactly there; blank lines never break contiguity.
//!
//! Column types are inferred from the first block only: a column is
//! numeric when at least 80% of its non-empty values parse as doubles.
//! With inference off every column is a string.
//!
//! Each block tracks both lexicographic and numeric extremes and keeps
//! the pair matching the column's declared type, so `min <= max` holds
//! under the comparison the pruner will use. A numeric column whose
//! block contains a value that does not parse gets no min/max for that
//! block (the pruner then leaves the block alone), since numeric
//! extremes cannot bound a cell the row evaluator compares as text.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::UNIX_EPOCH;

use csvsift_core::{canonicalize, parse_record, Error, RecordReader, Result, RowBuf};
use tracing::debug;

use crate::format::{
    typed_cmp, BlockMeta, ColumnInfo, ColumnStats, ColumnType, Index, IndexHeader, FORMAT_VERSION,
};

const BUILD_BUFFER_SIZE: usize = 2 * 1024 * 1024;

/// Running statistics for one column of the current block.
#[derive(Default)]
struct ColumnAcc {
    lex_min: String,
    lex_max: String,
    num_min: f64,
    num_max: f64,
    num_min_text: String,
    num_max_text: String,
    has_numeric: bool,
    saw_nonnumeric: bool,
    empty_count: u32,
}

impl ColumnAcc {
    fn fold(&mut self, value: &str) {
        if value.is_empty() {
            self.empty_count += 1;
            return;
        }
        if self.lex_min.is_empty() || value < self.lex_min.as_str() {
            self.lex_min.clear();
            self.lex_min.push_str(value);
        }
        if self.lex_max.is_empty() || value > self.lex_max.as_str() {
            self.lex_max.clear();
            self.lex_max.push_str(value);
        }
        match value.parse::<f64>() {
            Ok(number) => {
                if !self.has_numeric || number < self.num_min {
                    self.num_min = number;
                    self.num_min_text.clear();
                    self.num_min_text.push_str(value);
                }
                if !self.has_numeric || number > self.num_max {
                    self.num_max = number;
                    self.num_max_text.clear();
                    self.num_max_text.push_str(value);
                }
                self.has_numeric = true;
            }
            Err(_) => self.saw_nonnumeric = true,
        }
    }

    fn take_stats(&mut self, ty: ColumnType) -> ColumnStats {
        let (min, max) = match ty {
            ColumnType::Numeric if self.has_numeric && !self.saw_nonnumeric => (
                std::mem::take(&mut self.num_min_text),
                std::mem::take(&mut self.num_max_text),
            ),
            // a numeric block polluted by non-numeric text carries no
            // range; pruning falls back to "never"
            ColumnType::Numeric => (String::new(), String::new()),
            ColumnType::String => (
                std::mem::take(&mut self.lex_min),
                std::mem::take(&mut self.lex_max),
            ),
        };
        let stats = ColumnStats {
            min,
            max,
            empty_count: self.empty_count,
        };
        *self = ColumnAcc::default();
        stats
    }
}

pub struct IndexBuilder {
    block_rows: u32,
    infer_types: bool,

    current_row: u64,
    blocks: Vec<BlockMeta>,

    block_start_row: u64,
    block_start_offset: u64,
    last_row_end_offset: u64,
    columns: Vec<ColumnAcc>,

    // first-block type inference counters
    numeric_counts: Vec<u64>,
    nonempty_counts: Vec<u64>,
    inference_active: bool,
    types: Vec<ColumnType>,
}

impl IndexBuilder {
    pub fn new(block_rows: u32) -> Self {
        Self {
            block_rows: block_rows.max(1),
            infer_types: true,
            current_row: 0,
            blocks: Vec::new(),
            block_start_row: 0,
            block_start_offset: 0,
            last_row_end_offset: 0,
            columns: Vec::new(),
            numeric_counts: Vec::new(),
            nonempty_counts: Vec::new(),
            inference_active: false,
            types: Vec::new(),
        }
    }

    /// Disables type inference; all columns become strings. Faster, and
    /// the right call when the first block is not representative.
    pub fn with_type_inference(mut self, on: bool) -> Self {
        self.infer_types = on;
        self
    }

    pub fn build(mut self, csv_path: &Path) -> Result<Index> {
        let file = File::open(csv_path)?;
        let meta = file.metadata()?;
        let file_size = meta.len() as i64;
        let file_mtime_ns = mtime_ns(&meta);

        let mut reader = RecordReader::new(BufReader::with_capacity(BUILD_BUFFER_SIZE, file));
        let mut row_buf = RowBuf::new();

        let mut offset: u64 = 0;
        let header_fields = match reader.read_record()? {
            Some((record, raw_len)) => {
                parse_record(record, 0, &mut row_buf)?;
                offset += raw_len as u64;
                row_buf.to_vec()
            }
            None => return Err(Error::parse(0, "empty file: missing header")),
        };

        let num_cols = header_fields.len();
        self.columns = (0..num_cols).map(|_| ColumnAcc::default()).collect();
        self.types = vec![ColumnType::String; num_cols];
        if self.infer_types {
            self.inference_active = true;
            self.numeric_counts = vec![0; num_cols];
            self.nonempty_counts = vec![0; num_cols];
        }

        self.block_start_offset = offset;
        self.last_row_end_offset = offset;

        let mut rows_in_block: u32 = 0;
        loop {
            let Some((record, raw_len)) = reader.read_record()? else {
                break;
            };
            if record.is_empty() {
                // blank line: advances the offset, not the row count
                offset += raw_len as u64;
                continue;
            }
            parse_record(record, self.current_row + 1, &mut row_buf)?;

            for (i, value) in row_buf.fields().iter().enumerate().take(num_cols) {
                self.columns[i].fold(value);
                if self.inference_active && !value.is_empty() {
                    self.nonempty_counts[i] += 1;
                    if value.parse::<f64>().is_ok() {
                        self.numeric_counts[i] += 1;
                    }
                }
            }

            self.current_row += 1;
            rows_in_block += 1;
            offset += raw_len as u64;
            self.last_row_end_offset = offset;

            if rows_in_block >= self.block_rows {
                // types must be settled before the first flush picks
                // which extremes to keep
                if self.inference_active {
                    self.finalize_types();
                }
                self.flush_block();
                rows_in_block = 0;
            }
        }

        if self.inference_active {
            self.finalize_types();
        }
        if self.current_row > self.block_start_row {
            self.flush_block();
        }

        let columns = header_fields
            .iter()
            .zip(self.types.iter())
            .map(|(name, &ty)| ColumnInfo {
                name: name.clone(),
                ty,
            })
            .collect();

        let index = Index {
            header: IndexHeader {
                version: FORMAT_VERSION,
                block_rows: self.block_rows,
                file_size,
                file_mtime_ns,
                columns,
            },
            blocks: self.blocks,
        };
        debug!(
            blocks = index.blocks.len(),
            rows = self.current_row,
            "index build complete"
        );
        Ok(index)
    }

    fn flush_block(&mut self) {
        if self.current_row == self.block_start_row {
            return;
        }
        // Violations here are builder bugs, not data errors.
        assert!(
            self.last_row_end_offset >= self.block_start_offset,
            "invalid block: end_offset {} < start_offset {}",
            self.last_row_end_offset,
            self.block_start_offset
        );

        let rows = self.current_row - self.block_start_row;
        let mut stats = Vec::with_capacity(self.columns.len());
        for (i, acc) in self.columns.iter_mut().enumerate() {
            let ty = self.types[i];
            let col = acc.take_stats(ty);
            assert!(
                col.min.is_empty()
                    || col.max.is_empty()
                    || typed_cmp(ty, &col.min, &col.max).is_le(),
                "invalid block: column {i} has min {:?} > max {:?}",
                col.min,
                col.max
            );
            assert!(
                u64::from(col.empty_count) <= rows,
                "invalid block: column {i} empty_count {} exceeds {rows} rows",
                col.empty_count
            );
            stats.push(col);
        }

        self.blocks.push(BlockMeta {
            start_row: self.block_start_row,
            end_row: self.current_row,
            start_offset: self.block_start_offset,
            end_offset: self.last_row_end_offset,
            stats,
        });

        self.block_start_row = self.current_row;
        self.block_start_offset = self.last_row_end_offset;
    }

    fn finalize_types(&mut self) {
        for i in 0..self.types.len() {
            // numeric when >= 80% of non-empty values parse as doubles
            self.types[i] = if self.nonempty_counts[i] > 0
                && self.numeric_counts[i] * 5 >= self.nonempty_counts[i] * 4
            {
                ColumnType::Numeric
            } else {
                ColumnType::String
            };
        }
        self.inference_active = false;
    }
}

fn mtime_ns(meta: &std::fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos() as i64)
        .unwrap_or(0)
}

/// Checks that `index` still describes the file at `csv_path`: same
/// size, same mtime (nanosecond-exact), and a column dictionary that
/// matches the current header in order under case-insensitive, trimmed
/// comparison. Any mismatch means the index must be ignored.
pub fn validate_against(index: &Index, csv_path: &Path) -> Result<()> {
    let meta = std::fs::metadata(csv_path)?;
    if meta.len() as i64 != index.header.file_size {
        return Err(Error::InvalidIndex(format!(
            "file size mismatch: index has {}, file has {}",
            index.header.file_size,
            meta.len()
        )));
    }
    if mtime_ns(&meta) != index.header.file_mtime_ns {
        return Err(Error::InvalidIndex(
            "file modified since index was built".into(),
        ));
    }

    let file = File::open(csv_path)?;
    let mut reader = RecordReader::new(BufReader::new(file));
    let mut row_buf = RowBuf::new();
    let Some((record, _)) = reader.read_record()? else {
        return Err(Error::InvalidIndex("source has no header".into()));
    };
    parse_record(record, 0, &mut row_buf)?;

    let header = row_buf.fields();
    if header.len() != index.header.columns.len() {
        return Err(Error::InvalidIndex(format!(
            "column count mismatch: file has {}, index has {}",
            header.len(),
            index.header.columns.len()
        )));
    }
    for (i, (file_col, index_col)) in header.iter().zip(index.header.columns.iter()).enumerate() {
        if canonicalize(file_col) != canonicalize(&index_col.name) {
            return Err(Error::InvalidIndex(format!(
                "column {i} mismatch: file has {:?}, index has {:?}",
                file_col, index_col.name
            )));
        }
    }
    Ok(())
}
