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

//! Engine configuration, captured once at query start. Hot loops never
//! consult the environment.

/// Files below this size always scan sequentially.
pub const PARALLEL_MIN_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// LIMITs below this stay sequential; the parallel ramp-up costs more
/// than it saves for small result caps.
pub const PARALLEL_MIN_LIMIT: u32 = 10_000;

/// Read buffer for the scanners.
pub const IO_BUFFER_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `SIDX_NO_PARALLEL=1` forces the sequential path.
    pub no_parallel: bool,
    /// Worker count for the parallel scanner.
    pub workers: usize,
    /// Rows per batch shipped from the parallel reader to workers.
    pub batch_rows: usize,
    /// Output flush interval, in rows.
    pub flush_every: usize,
    /// Minimum source size before the parallel scanner is considered.
    pub parallel_min_file_size: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            no_parallel: false,
            workers: num_cpus::get().max(1),
            batch_rows: 10_000,
            flush_every: 8_192,
            parallel_min_file_size: PARALLEL_MIN_FILE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Reads `SIDX_NO_PARALLEL` from the environment once.
    pub fn from_env() -> Self {
        Self {
            no_parallel: std::env::var("SIDX_NO_PARALLEL").as_deref() == Ok("1"),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert!(cfg.workers >= 1);
        assert_eq!(cfg.batch_rows, 10_000);
        assert_eq!(cfg.flush_every, 8_192);
        assert!(!cfg.no_parallel);
    }
}
