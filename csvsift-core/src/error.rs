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

//! Error types for the csvsift engine

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed CSV at row {row}: {message}")]
    Parse { row: u64, message: String },

    #[error("column {0:?} not found in CSV header")]
    UnknownColumn(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("not a sidecar index: bad magic")]
    BadMagic,

    #[error("unsupported sidecar index version: {0}")]
    UnsupportedVersion(u32),

    #[error("invalid index: {0}")]
    InvalidIndex(String),

    #[error("query cancelled: output stream closed")]
    Cancelled,
}

impl Error {
    pub fn parse(row: u64, message: impl Into<String>) -> Self {
        Error::Parse {
            row,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
