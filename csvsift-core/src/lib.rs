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

//! CsvSift Core
//!
//! Fundamental types shared by every csvsift crate:
//!
//! - **Error taxonomy** ([`Error`], [`Result`]) for the whole engine
//! - **Record I/O**: an RFC 4180 record reader that assembles logical
//!   records across physical lines, the line-to-fields parser with a
//!   quoteless fast path, and the quoting output writer
//! - **Header normalization**: canonical column names and the
//!   name-to-ordinal map built once per open
//! - **Query model**: the [`Query`] AST and the predicate tree with its
//!   bound, allocation-free WHERE evaluator

pub mod error;
pub mod header;
pub mod query;
pub mod record;
pub mod writer;

pub use error::{Error, Result};
pub use header::{canonicalize, Header};
pub use query::{
    AggregateCall, AggregateFunc, BinaryOp, BoundExpr, CmpOp, Comparison, Expr, Projection, Query,
    SortSpec, Source,
};
pub use record::{parse_record, RecordReader, RowBuf};
pub use writer::CsvWriter;
