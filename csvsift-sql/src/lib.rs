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

//! CsvSift SQL Front-End
//!
//! Parses the query dialect the engine executes:
//!
//! ```text
//! SELECT col, AGG(col), ... | *
//! FROM file.csv | 'path with spaces.csv' | - | stdin
//! [WHERE expr]                  NOT > AND > OR, parentheses allowed
//! [GROUP BY col, ...]
//! [ORDER BY col [ASC|DESC], ...]
//! [LIMIT n]
//! ```
//!
//! # Example
//!
//! ```
//! use csvsift_sql::parse;
//!
//! let query = parse("SELECT id, total FROM orders.csv WHERE country = 'UK' LIMIT 5").unwrap();
//! assert_eq!(query.limit, Some(5));
//! ```

pub mod error;
pub mod lexer;
pub mod parser;

pub use error::{SqlError, SqlResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::parse;
