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

//! RFC 4180 record reading and field parsing.
//!
//! Two layers:
//!
//! - [`RecordReader`] assembles one *logical* record per call. A quoted
//!   field may contain embedded line breaks, so physical lines are joined
//!   until the quote count balances. The reader reports the raw byte
//!   length consumed (line terminators included) so callers that track
//!   file offsets stay byte-exact.
//! - [`parse_record`] splits a single record (trailing `\r?\n` already
//!   stripped) into fields inside a caller-owned [`RowBuf`]. Field
//!   strings keep their capacity across rows, so steady-state parsing
//!   performs no heap allocation beyond the buffer itself.

use std::io::{self, BufRead};

use crate::error::{Error, Result};

/// Reusable row buffer. The parser writes fields into recycled `String`
/// cells; `fields()` exposes the live prefix.
#[derive(Debug, Default)]
pub struct RowBuf {
    cells: Vec<String>,
    live: usize,
}

impl RowBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fields of the most recently parsed record.
    pub fn fields(&self) -> &[String] {
        &self.cells[..self.live]
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Owned copy of the current fields, for handoff across task
    /// boundaries.
    pub fn to_vec(&self) -> Vec<String> {
        self.fields().to_vec()
    }

    fn clear(&mut self) {
        self.live = 0;
    }

    fn next_cell(&mut self) -> &mut String {
        if self.live == self.cells.len() {
            self.cells.push(String::new());
        }
        let cell = &mut self.cells[self.live];
        self.live += 1;
        cell.clear();
        cell
    }
}

/// Splits one CSV record into fields.
///
/// - A field is unquoted (raw bytes until the next comma) or quoted
///   (`"` ... `"`, with `""` decoding to one `"`).
/// - ASCII spaces around a field are trimmed; interior spaces survive.
/// - An empty record yields one empty field.
/// - Unterminated quotes and trailing garbage after a closing quote fail
///   with [`Error::Parse`] carrying `row`.
pub fn parse_record(line: &[u8], row: u64, out: &mut RowBuf) -> Result<()> {
    out.clear();
    let mut pos = 0usize;
    loop {
        pos = parse_field(line, pos, row, out)?;
        if pos >= line.len() {
            break;
        }
        // parse_field stops on the delimiter
        pos += 1;
        if pos == line.len() {
            // trailing comma: final empty field
            out.next_cell();
            break;
        }
    }
    Ok(())
}

/// Parses one field starting at `pos`; returns the index of the next
/// delimiter, or `line.len()` at end of record.
fn parse_field(line: &[u8], mut pos: usize, row: u64, out: &mut RowBuf) -> Result<usize> {
    while pos < line.len() && line[pos] == b' ' {
        pos += 1;
    }

    if pos < line.len() && line[pos] == b'"' {
        let cell = out.next_cell();
        pos += 1;
        let mut seg = pos;
        loop {
            if pos >= line.len() {
                return Err(Error::parse(row, "unterminated quoted field"));
            }
            if line[pos] == b'"' {
                push_utf8(cell, &line[seg..pos], row)?;
                if pos + 1 < line.len() && line[pos + 1] == b'"' {
                    cell.push('"');
                    pos += 2;
                    seg = pos;
                } else {
                    pos += 1;
                    break;
                }
            } else {
                pos += 1;
            }
        }
        while pos < line.len() && line[pos] == b' ' {
            pos += 1;
        }
        if pos < line.len() && line[pos] != b',' {
            return Err(Error::parse(row, "unexpected data after closing quote"));
        }
        Ok(pos)
    } else {
        let mut end = pos;
        while end < line.len() && line[end] != b',' {
            end += 1;
        }
        let mut hi = end;
        while hi > pos && line[hi - 1] == b' ' {
            hi -= 1;
        }
        let cell = out.next_cell();
        push_utf8(cell, &line[pos..hi], row)?;
        Ok(end)
    }
}

fn push_utf8(cell: &mut String, bytes: &[u8], row: u64) -> Result<()> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Error::parse(row, "field contains invalid UTF-8"))?;
    cell.push_str(text);
    Ok(())
}

/// Streaming logical-record reader over any buffered input.
pub struct RecordReader<R: BufRead> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(256),
        }
    }

    /// Recovers the underlying reader, discarding buffered record state.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads the next logical record.
    ///
    /// Returns `(record, raw_len)` where `record` has the trailing
    /// `\r?\n` stripped (embedded terminators inside quoted fields are
    /// preserved) and `raw_len` counts every byte consumed from the
    /// input, terminators included. Returns `None` at end of input.
    pub fn read_record(&mut self) -> io::Result<Option<(&[u8], usize)>> {
        self.buf.clear();
        let n = self.inner.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        let mut raw_len = n;
        // An odd number of quotes means a quoted field is still open and
        // the terminator we just consumed belongs to the field data.
        while !quotes_balanced(&self.buf) {
            let n = self.inner.read_until(b'\n', &mut self.buf)?;
            if n == 0 {
                break;
            }
            raw_len += n;
        }
        let mut end = self.buf.len();
        if end > 0 && self.buf[end - 1] == b'\n' {
            end -= 1;
            if end > 0 && self.buf[end - 1] == b'\r' {
                end -= 1;
            }
        }
        Ok(Some((&self.buf[..end], raw_len)))
    }
}

fn quotes_balanced(buf: &[u8]) -> bool {
    buf.iter().filter(|&&b| b == b'"').count() % 2 == 0
}
