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

//! SQL parse errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SqlError {
    #[error("empty query")]
    Empty,

    #[error("unexpected character {found:?} at byte {pos}")]
    UnexpectedChar { found: char, pos: usize },

    #[error("unterminated string literal starting at byte {pos}")]
    UnterminatedString { pos: usize },

    #[error("unexpected {found} at byte {pos}, expected {expected}")]
    Unexpected {
        found: String,
        expected: String,
        pos: usize,
    },

    #[error("invalid LIMIT value {value:?}")]
    InvalidLimit { value: String },

    #[error("empty column name in SELECT clause")]
    EmptySelectItem,
}

pub type SqlResult<T> = std::result::Result<T, SqlError>;
