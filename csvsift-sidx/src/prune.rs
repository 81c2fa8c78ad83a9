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

//! Conservative block pruning.
//!
//! `can_prune` answers "is the predicate guaranteed false for every row
//! in this block?". False negatives only cost a scan; a false positive
//! would drop rows, so every uncertain case answers `false`:
//!
//! - comparisons against a column missing from the dictionary never prune
//! - `NOT` never prunes (negation inverts selectivity arbitrarily)
//! - `AND` prunes when either side does, `OR` only when both do
//!
//! Stat comparisons honor the column's declared type: numeric columns
//! compare as doubles when both sides parse, everything else compares
//! lexicographically.

use std::cmp::Ordering;

use csvsift_core::{canonicalize, BinaryOp, CmpOp, Comparison, Expr};

use crate::format::{typed_cmp, BlockMeta, Index};

/// True iff no row in `block` can satisfy `expr`.
pub fn can_prune(index: &Index, block: &BlockMeta, expr: &Expr) -> bool {
    match expr {
        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => {
                can_prune(index, block, left) || can_prune(index, block, right)
            }
            BinaryOp::Or => {
                can_prune(index, block, left) && can_prune(index, block, right)
            }
        },
        Expr::Not(_) => false,
        Expr::Compare(cmp) => can_prune_comparison(index, block, cmp),
    }
}

fn can_prune_comparison(index: &Index, block: &BlockMeta, cmp: &Comparison) -> bool {
    let Some(col) = index
        .header
        .columns
        .iter()
        .position(|c| canonicalize(&c.name) == cmp.column)
    else {
        return false;
    };
    let Some(stats) = block.stats.get(col) else {
        return false;
    };
    let ty = index.header.columns[col].ty;

    if stats.min.is_empty() && stats.max.is_empty() {
        // No non-empty value was recorded. When the empty count accounts
        // for every row, equality against a non-empty value cannot hold;
        // anything else stays unprunable.
        let rows = block.rows();
        if rows > 0
            && u64::from(stats.empty_count) == rows
            && cmp.op == CmpOp::Eq
            && !cmp.value.is_empty()
        {
            return true;
        }
        return false;
    }

    let to_min = typed_cmp(ty, &cmp.value, &stats.min);
    let to_max = typed_cmp(ty, &cmp.value, &stats.max);
    match cmp.op {
        // outside [min, max]
        CmpOp::Eq => to_min == Ordering::Less || to_max == Ordering::Greater,
        // every row equals the value
        CmpOp::Ne => {
            typed_cmp(ty, &stats.min, &stats.max) == Ordering::Equal && to_min == Ordering::Equal
        }
        // value >= max: nothing can exceed it
        CmpOp::Gt => to_max != Ordering::Less,
        CmpOp::Ge => to_max == Ordering::Greater,
        // value <= min: nothing can fall below it
        CmpOp::Lt => to_min != Ordering::Greater,
        CmpOp::Le => to_min == Ordering::Less,
    }
}
