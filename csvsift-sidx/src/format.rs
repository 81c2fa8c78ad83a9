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

//! `.sidx` On-Disk Format (version 3)
//!
//! All integers little-endian, position-dependent layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Header (variable size):                                      │
//! │   Magic (4 bytes): "SIDX"                                    │
//! │   Version: u32                                               │
//! │   BlockSize: u32            rows per block                   │
//! │   NumBlocks: u32                                             │
//! │   FileSize: i64             source CSV size for validation   │
//! │   FileMtime: i64            source CSV mtime (Unix nanos)    │
//! │   NumColumns: u32           column dictionary length         │
//! │   per column:                                                │
//! │     NameLen: u32 │ Name: UTF-8 │ Type: u8 (0=string 1=num)   │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Blocks (NumBlocks times):                                    │
//! │   StartRow: u64 │ EndRow: u64 (exclusive)                    │
//! │   StartOffset: u64 │ EndOffset: u64   byte span in the CSV   │
//! │   per column (dictionary order):                             │
//! │     MinLen: u32 │ Min │ MaxLen: u32 │ Max                    │
//! │     EmptyCount: u32         version >= 3 only                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Version 2 indexes lack `EmptyCount`; the reader accepts them and
//! defaults the count to zero. `EndOffset` is measured *after* the
//! trailing newline of the block's last row, so seeking to the next
//! block's `StartOffset` always lands on a row boundary.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use csvsift_core::{Error, Result};

/// Index magic: "SIDX" in ASCII.
pub const MAGIC: [u8; 4] = *b"SIDX";

/// Current format version. Bumped to 3 when `EmptyCount` joined the
/// per-block column stats.
pub const FORMAT_VERSION: u32 = 3;

/// Oldest version the reader still accepts.
pub const MIN_SUPPORTED_VERSION: u32 = 2;

/// Default rows per block: 64K rows.
pub const DEFAULT_BLOCK_ROWS: u32 = 65_536;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String = 0,
    Numeric = 1,
}

impl TryFrom<u8> for ColumnType {
    type Error = ();

    fn try_from(value: u8) -> std::result::Result<Self, ()> {
        match value {
            0 => Ok(ColumnType::String),
            1 => Ok(ColumnType::Numeric),
            _ => Err(()),
        }
    }
}

/// Dictionary entry: the column's name as spelled in the source header,
/// plus its inferred comparison type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub ty: ColumnType,
}

/// Per-block, per-column statistics. `min`/`max` are the raw field
/// texts; an empty string means no non-empty value was seen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnStats {
    pub min: String,
    pub max: String,
    pub empty_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMeta {
    /// First row in the block (0-indexed, header excluded).
    pub start_row: u64,
    /// One past the last row.
    pub end_row: u64,
    /// Byte offset of the block's first row.
    pub start_offset: u64,
    /// Byte offset just past the last row's line terminator.
    pub end_offset: u64,
    /// Order matches the column dictionary.
    pub stats: Vec<ColumnStats>,
}

impl BlockMeta {
    pub fn rows(&self) -> u64 {
        self.end_row - self.start_row
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHeader {
    pub version: u32,
    pub block_rows: u32,
    pub file_size: i64,
    pub file_mtime_ns: i64,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub header: IndexHeader,
    pub blocks: Vec<BlockMeta>,
}

impl Index {
    /// Checks the structural invariants every well-formed index holds:
    /// contiguous non-overlapping blocks, non-empty row ranges, ordered
    /// stats, and empty counts bounded by the block's row count.
    pub fn check_invariants(&self) -> Result<()> {
        let ncols = self.header.columns.len();
        for (i, block) in self.blocks.iter().enumerate() {
            if block.start_row >= block.end_row {
                return Err(Error::InvalidIndex(format!(
                    "block {i}: start_row {} >= end_row {}",
                    block.start_row, block.end_row
                )));
            }
            if block.start_offset > block.end_offset {
                return Err(Error::InvalidIndex(format!(
                    "block {i}: start_offset {} > end_offset {}",
                    block.start_offset, block.end_offset
                )));
            }
            if block.stats.len() != ncols {
                return Err(Error::InvalidIndex(format!(
                    "block {i}: {} stat entries for {ncols} columns",
                    block.stats.len()
                )));
            }
            if let Some(prev) = i.checked_sub(1).map(|p| &self.blocks[p]) {
                if prev.end_row != block.start_row || prev.end_offset != block.start_offset {
                    return Err(Error::InvalidIndex(format!(
                        "block {i} is not contiguous with block {}",
                        i - 1
                    )));
                }
            }
            let rows = block.rows();
            for (c, stats) in block.stats.iter().enumerate() {
                if u64::from(stats.empty_count) > rows {
                    return Err(Error::InvalidIndex(format!(
                        "block {i} column {c}: empty_count {} exceeds {rows} rows",
                        stats.empty_count
                    )));
                }
                if !stats.min.is_empty() && !stats.max.is_empty() {
                    let ty = self.header.columns[c].ty;
                    if typed_cmp(ty, &stats.min, &stats.max).is_gt() {
                        return Err(Error::InvalidIndex(format!(
                            "block {i} column {c}: min {:?} > max {:?}",
                            stats.min, stats.max
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Compares two stat values under a column's declared semantics: numeric
/// when the column is numeric and both sides parse, lexicographic
/// byte-wise otherwise.
pub(crate) fn typed_cmp(ty: ColumnType, a: &str, b: &str) -> std::cmp::Ordering {
    if ty == ColumnType::Numeric {
        if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
            return x.total_cmp(&y);
        }
    }
    a.cmp(b)
}

/// The sidecar path for a CSV source: `<source>.sidx`.
pub fn sidecar_path(csv_path: &Path) -> PathBuf {
    let mut os = csv_path.as_os_str().to_os_string();
    os.push(".sidx");
    PathBuf::from(os)
}

/// Serializes an index. Fails only on underlying I/O errors.
pub fn write_index<W: Write>(w: &mut W, index: &Index) -> io::Result<()> {
    w.write_all(&MAGIC)?;
    w.write_u32::<LittleEndian>(index.header.version)?;
    w.write_u32::<LittleEndian>(index.header.block_rows)?;
    w.write_u32::<LittleEndian>(index.blocks.len() as u32)?;
    w.write_i64::<LittleEndian>(index.header.file_size)?;
    w.write_i64::<LittleEndian>(index.header.file_mtime_ns)?;

    w.write_u32::<LittleEndian>(index.header.columns.len() as u32)?;
    for col in &index.header.columns {
        w.write_u32::<LittleEndian>(col.name.len() as u32)?;
        w.write_all(col.name.as_bytes())?;
        w.write_u8(col.ty as u8)?;
    }

    for block in &index.blocks {
        w.write_u64::<LittleEndian>(block.start_row)?;
        w.write_u64::<LittleEndian>(block.end_row)?;
        w.write_u64::<LittleEndian>(block.start_offset)?;
        w.write_u64::<LittleEndian>(block.end_offset)?;
        for stats in &block.stats {
            w.write_u32::<LittleEndian>(stats.min.len() as u32)?;
            w.write_all(stats.min.as_bytes())?;
            w.write_u32::<LittleEndian>(stats.max.len() as u32)?;
            w.write_all(stats.max.as_bytes())?;
            w.write_u32::<LittleEndian>(stats.empty_count)?;
        }
    }
    Ok(())
}

/// Deserializes an index and checks its structural invariants.
///
/// Fails with [`Error::BadMagic`] when the stream is not a `.sidx`,
/// [`Error::UnsupportedVersion`] for unknown versions, and
/// [`Error::InvalidIndex`] when the payload violates an invariant.
pub fn read_index<R: Read>(r: &mut R) -> Result<Index> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(Error::BadMagic);
    }

    let version = r.read_u32::<LittleEndian>()?;
    if !(MIN_SUPPORTED_VERSION..=FORMAT_VERSION).contains(&version) {
        return Err(Error::UnsupportedVersion(version));
    }

    let block_rows = r.read_u32::<LittleEndian>()?;
    let num_blocks = r.read_u32::<LittleEndian>()?;
    let file_size = r.read_i64::<LittleEndian>()?;
    let file_mtime_ns = r.read_i64::<LittleEndian>()?;

    let num_columns = r.read_u32::<LittleEndian>()?;
    let mut columns = Vec::with_capacity(num_columns as usize);
    for _ in 0..num_columns {
        let name = read_string(r)?;
        let raw_ty = r.read_u8()?;
        let ty = ColumnType::try_from(raw_ty)
            .map_err(|_| Error::InvalidIndex(format!("unknown column type {raw_ty}")))?;
        columns.push(ColumnInfo { name, ty });
    }

    let mut blocks = Vec::with_capacity(num_blocks as usize);
    for _ in 0..num_blocks {
        let start_row = r.read_u64::<LittleEndian>()?;
        let end_row = r.read_u64::<LittleEndian>()?;
        let start_offset = r.read_u64::<LittleEndian>()?;
        let end_offset = r.read_u64::<LittleEndian>()?;
        let mut stats = Vec::with_capacity(num_columns as usize);
        for _ in 0..num_columns {
            let min = read_string(r)?;
            let max = read_string(r)?;
            let empty_count = if version >= 3 {
                r.read_u32::<LittleEndian>()?
            } else {
                0
            };
            stats.push(ColumnStats {
                min,
                max,
                empty_count,
            });
        }
        blocks.push(BlockMeta {
            start_row,
            end_row,
            start_offset,
            end_offset,
            stats,
        });
    }

    let index = Index {
        header: IndexHeader {
            version,
            block_rows,
            file_size,
            file_mtime_ns,
            columns,
        },
        blocks,
    };
    index.check_invariants()?;
    Ok(index)
}

fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = r.read_u32::<LittleEndian>()?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| Error::InvalidIndex("non-UTF-8 string".into()))
}
