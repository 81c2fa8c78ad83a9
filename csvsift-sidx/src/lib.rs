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

//! CsvSift Sidecar Block Index
//!
//! A `.sidx` file sits next to a CSV source and stores, per block of
//! rows, the byte span of the block plus per-column min/max and empty
//! counts. Queries use it to skip whole blocks that cannot match a
//! predicate, seeking past them instead of parsing them.
//!
//! - [`format`]: the version-3 little-endian on-disk layout
//! - [`builder`]: single streaming pass that collects block statistics
//!   and validates the index against its source
//! - [`prune`]: the conservative can-this-block-match decision

pub mod builder;
pub mod format;
pub mod prune;

pub use builder::{validate_against, IndexBuilder};
pub use format::{
    read_index, sidecar_path, write_index, BlockMeta, ColumnInfo, ColumnStats, ColumnType, Index,
    IndexHeader, DEFAULT_BLOCK_ROWS, FORMAT_VERSION,
};
pub use prune::can_prune;
