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

//! Query AST and the predicate tree.
//!
//! The predicate is an owned tagged sum type: [`Expr::Compare`] leaves
//! combined by AND/OR/NOT, immutable after construction. Evaluation
//! never touches a name map at row time: [`BoundExpr::bind`] resolves
//! every column to its header ordinal once, and [`BoundExpr::matches`]
//! indexes the row's field slice directly.
//!
//! A comparison carries both the raw value text and, when the text
//! parses as a finite double, its numeric form. Per row the evaluator
//! goes numeric when both sides parse; a row value that fails to parse
//! against a numeric comparison is false for every operator except `!=`.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::header::Header;

/// Where the source rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    Stdin,
}

/// Columns to emit: the full header, or named columns in order.
/// Names are canonical (lower-cased, trimmed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
}

/// A single `column OP value` leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Canonical column name.
    pub column: String,
    pub op: CmpOp,
    pub value: String,
    /// Present iff `value` parses as a finite IEEE-754 double.
    pub number: Option<f64>,
}

impl Comparison {
    pub fn new(column: impl Into<String>, op: CmpOp, value: impl Into<String>) -> Self {
        let value = value.into();
        let number = value.parse::<f64>().ok().filter(|n| n.is_finite());
        Self {
            column: column.into(),
            op,
            value,
            number,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare(Comparison),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
}

impl Expr {
    pub fn and(left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op: BinaryOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op: BinaryOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(child: Expr) -> Expr {
        Expr::Not(Box::new(child))
    }
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Canonical column name.
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// An aggregate call in the SELECT list, e.g. `SUM(total)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCall {
    pub func: AggregateFunc,
    /// Canonical column name; `None` for `COUNT(*)`.
    pub column: Option<String>,
    /// The expression as written, used as the output column name.
    pub text: String,
}

/// Everything the engine needs to run one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub projection: Projection,
    pub source: Source,
    pub predicate: Option<Expr>,
    /// `None` = unbounded.
    pub limit: Option<u32>,
    /// Aggregate calls from the SELECT list; non-empty routes the query
    /// to the buffered aggregation path.
    pub aggregates: Vec<AggregateCall>,
    pub group_by: Vec<String>,
    pub order_by: Vec<SortSpec>,
}

impl Query {
    /// A plain streaming query over `source` selecting everything.
    pub fn select_all(source: Source) -> Self {
        Self {
            projection: Projection::All,
            source,
            predicate: None,
            limit: None,
            aggregates: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
        }
    }
}

/// A predicate with every column pre-resolved to its header ordinal.
#[derive(Debug, Clone)]
pub enum BoundExpr {
    Compare {
        ordinal: usize,
        op: CmpOp,
        value: String,
        number: Option<f64>,
    },
    Binary {
        op: BinaryOp,
        left: Box<BoundExpr>,
        right: Box<BoundExpr>,
    },
    Not(Box<BoundExpr>),
}

impl BoundExpr {
    /// Resolves every column reference against `header`, failing with
    /// [`Error::UnknownColumn`] on the first miss.
    pub fn bind(expr: &Expr, header: &Header) -> Result<BoundExpr> {
        match expr {
            Expr::Compare(cmp) => {
                let ordinal = header
                    .ordinal(&cmp.column)
                    .ok_or_else(|| Error::UnknownColumn(cmp.column.clone()))?;
                Ok(BoundExpr::Compare {
                    ordinal,
                    op: cmp.op,
                    value: cmp.value.clone(),
                    number: cmp.number,
                })
            }
            Expr::Binary { op, left, right } => Ok(BoundExpr::Binary {
                op: *op,
                left: Box::new(BoundExpr::bind(left, header)?),
                right: Box::new(BoundExpr::bind(right, header)?),
            }),
            Expr::Not(child) => Ok(BoundExpr::Not(Box::new(BoundExpr::bind(child, header)?))),
        }
    }

    /// Short-circuit evaluation against one row. Allocates nothing.
    pub fn matches(&self, row: &[String]) -> bool {
        match self {
            BoundExpr::Compare {
                ordinal,
                op,
                value,
                number,
            } => match row.get(*ordinal) {
                Some(cell) => compare_cell(cell, *op, value, *number),
                None => false,
            },
            BoundExpr::Binary { op, left, right } => match op {
                BinaryOp::And => left.matches(row) && right.matches(row),
                BinaryOp::Or => left.matches(row) || right.matches(row),
            },
            BoundExpr::Not(child) => !child.matches(row),
        }
    }
}

fn compare_cell(cell: &str, op: CmpOp, value: &str, number: Option<f64>) -> bool {
    if let Some(target) = number {
        return match cell.parse::<f64>() {
            Ok(n) => match op {
                CmpOp::Eq => n == target,
                CmpOp::Ne => n != target,
                CmpOp::Gt => n > target,
                CmpOp::Ge => n >= target,
                CmpOp::Lt => n < target,
                CmpOp::Le => n <= target,
            },
            // Unparseable against a numeric comparison: only != holds.
            Err(_) => op == CmpOp::Ne,
        };
    }
    let ord = cell.cmp(value);
    match op {
        CmpOp::Eq => ord.is_eq(),
        CmpOp::Ne => ord.is_ne(),
        CmpOp::Gt => ord.is_gt(),
        CmpOp::Ge => ord.is_ge(),
        CmpOp::Lt => ord.is_lt(),
        CmpOp::Le => ord.is_le(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(expr: &Expr, names: &[&str]) -> BoundExpr {
        let header = Header::from_fields(&names.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        BoundExpr::bind(expr, &header).unwrap()
    }

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn numeric_value_capture_is_finite_only() {
        assert_eq!(Comparison::new("x", CmpOp::Eq, "40").number, Some(40.0));
        assert_eq!(Comparison::new("x", CmpOp::Eq, "4.5e2").number, Some(450.0));
        assert_eq!(Comparison::new("x", CmpOp::Eq, "UK").number, None);
        assert_eq!(Comparison::new("x", CmpOp::Eq, "inf").number, None);
        assert_eq!(Comparison::new("x", CmpOp::Eq, "NaN").number, None);
    }

    #[test]
    fn numeric_comparison_all_operators() {
        let cases = [
            (CmpOp::Eq, "20", true),
            (CmpOp::Ne, "20", false),
            (CmpOp::Gt, "10", true),
            (CmpOp::Gt, "20", false),
            (CmpOp::Ge, "20", true),
            (CmpOp::Lt, "30", true),
            (CmpOp::Le, "20", true),
        ];
        for (op, value, want) in cases {
            let bound = bind(&Expr::Compare(Comparison::new("v", op, value)), &["v"]);
            assert_eq!(bound.matches(&row(&["20"])), want, "{op:?} {value}");
        }
    }

    #[test]
    fn numeric_comparison_ignores_leading_zeros_in_rows() {
        let bound = bind(&Expr::Compare(Comparison::new("v", CmpOp::Eq, "20")), &["v"]);
        assert!(bound.matches(&row(&["020"])));
        assert!(bound.matches(&row(&["20.0"])));
    }

    #[test]
    fn unparseable_row_value_against_numeric_comparison() {
        for op in [CmpOp::Eq, CmpOp::Gt, CmpOp::Ge, CmpOp::Lt, CmpOp::Le] {
            let bound = bind(&Expr::Compare(Comparison::new("v", op, "10")), &["v"]);
            assert!(!bound.matches(&row(&["oops"])), "{op:?}");
        }
        let bound = bind(&Expr::Compare(Comparison::new("v", CmpOp::Ne, "10")), &["v"]);
        assert!(bound.matches(&row(&["oops"])));
    }

    #[test]
    fn string_comparison_is_bytewise() {
        let bound = bind(
            &Expr::Compare(Comparison::new("c", CmpOp::Gt, "UK")),
            &["c"],
        );
        assert!(bound.matches(&row(&["US"])));
        assert!(!bound.matches(&row(&["DE"])));
    }

    #[test]
    fn and_or_not_compose() {
        let uk = Expr::Compare(Comparison::new("country", CmpOp::Eq, "UK"));
        let big = Expr::Compare(Comparison::new("total", CmpOp::Gt, "40"));
        let expr = Expr::and(uk.clone(), big);
        let bound = bind(&expr, &["country", "total"]);
        assert!(bound.matches(&row(&["UK", "50"])));
        assert!(!bound.matches(&row(&["UK", "30"])));
        assert!(!bound.matches(&row(&["US", "120"])));

        let not_uk = bind(&Expr::not(uk.clone()), &["country", "total"]);
        assert!(not_uk.matches(&row(&["US", "1"])));
        assert!(!not_uk.matches(&row(&["UK", "1"])));

        let double_neg = bind(&Expr::not(Expr::not(uk)), &["country", "total"]);
        assert!(double_neg.matches(&row(&["UK", "1"])));
        assert!(!double_neg.matches(&row(&["US", "1"])));
    }

    #[test]
    fn missing_ordinal_is_false() {
        let bound = bind(&Expr::Compare(Comparison::new("b", CmpOp::Ne, "x")), &["a", "b"]);
        assert!(!bound.matches(&row(&["only-a"])));
    }

    #[test]
    fn bind_rejects_unknown_columns() {
        let header = Header::from_fields(&["a".to_string()]);
        let expr = Expr::Compare(Comparison::new("ghost", CmpOp::Eq, "1"));
        assert!(matches!(
            BoundExpr::bind(&expr, &header),
            Err(Error::UnknownColumn(c)) if c == "ghost"
        ));
    }
}
