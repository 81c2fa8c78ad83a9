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

//! RFC 4180 output writer.
//!
//! Standard quoting: a field is quoted when it contains a comma, a
//! quote, a line break, or leading/trailing spaces; internal quotes are
//! doubled. Records end with LF. Each record is assembled in a reused
//! line buffer before a single `write_all`.

use std::io::{self, BufWriter, Write};

const OUT_BUFFER_SIZE: usize = 256 * 1024;

pub struct CsvWriter<W: Write> {
    out: BufWriter<W>,
    line: Vec<u8>,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: BufWriter::with_capacity(OUT_BUFFER_SIZE, out),
            line: Vec::with_capacity(512),
        }
    }

    /// Writes every field of `record` as one CSV row.
    pub fn write_record<S: AsRef<str>>(&mut self, record: &[S]) -> io::Result<()> {
        self.line.clear();
        for (i, field) in record.iter().enumerate() {
            if i > 0 {
                self.line.push(b',');
            }
            encode_field(&mut self.line, field.as_ref());
        }
        self.line.push(b'\n');
        self.out.write_all(&self.line)
    }

    /// Writes the fields selected by `ordinals`, in that order. Ordinals
    /// past the end of the record emit empty fields, mirroring how short
    /// rows project.
    pub fn write_selected(&mut self, record: &[String], ordinals: &[usize]) -> io::Result<()> {
        self.line.clear();
        for (i, &ord) in ordinals.iter().enumerate() {
            if i > 0 {
                self.line.push(b',');
            }
            let field = record.get(ord).map(String::as_str).unwrap_or("");
            encode_field(&mut self.line, field);
        }
        self.line.push(b'\n');
        self.out.write_all(&self.line)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

fn encode_field(line: &mut Vec<u8>, field: &str) {
    if needs_quoting(field) {
        line.push(b'"');
        for &b in field.as_bytes() {
            if b == b'"' {
                line.push(b'"');
            }
            line.push(b);
        }
        line.push(b'"');
    } else {
        line.extend_from_slice(field.as_bytes());
    }
}

fn needs_quoting(field: &str) -> bool {
    field.starts_with(' ')
        || field.ends_with(' ')
        || field
            .bytes()
            .any(|b| matches!(b, b',' | b'"' | b'\n' | b'\r'))
}
