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

//! Recursive-descent parser.
//!
//! Precedence in the WHERE grammar, tightest first: NOT, AND, OR.
//! `a OR b AND c` therefore parses as `a OR (b AND c)`. Column names are
//! canonicalized on the way in so the engine never sees raw spellings.

use csvsift_core::{
    canonicalize, AggregateCall, AggregateFunc, CmpOp, Comparison, Expr, Projection, Query,
    SortSpec, Source,
};

use crate::error::{SqlError, SqlResult};
use crate::lexer::{Lexer, Token, TokenKind};

/// Parses one query string into the engine's [`Query`] AST.
pub fn parse(input: &str) -> SqlResult<Query> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SqlError::Empty);
    }
    let tokens = Lexer::new(trimmed).tokenize()?;
    Parser { tokens, pos: 0 }.parse_query()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse_query(mut self) -> SqlResult<Query> {
        self.expect_keyword("SELECT")?;

        let mut columns = Vec::new();
        let mut aggregates = Vec::new();
        let projection = if matches!(self.peek().kind, TokenKind::Star) {
            self.advance();
            Projection::All
        } else {
            if self.at_keyword("FROM") {
                return Err(SqlError::EmptySelectItem);
            }
            loop {
                self.parse_select_item(&mut columns, &mut aggregates)?;
                if matches!(self.peek().kind, TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            Projection::Columns(columns)
        };

        self.expect_keyword("FROM")?;
        let source = self.parse_source()?;

        let predicate = if self.at_keyword("WHERE") {
            self.advance();
            Some(self.parse_or()?)
        } else {
            None
        };

        let group_by = if self.at_keyword("GROUP") {
            self.advance();
            self.expect_keyword("BY")?;
            self.parse_name_list()?
        } else {
            Vec::new()
        };

        let order_by = if self.at_keyword("ORDER") {
            self.advance();
            self.expect_keyword("BY")?;
            self.parse_order_list()?
        } else {
            Vec::new()
        };

        let limit = if self.at_keyword("LIMIT") {
            self.advance();
            Some(self.parse_limit()?)
        } else {
            None
        };

        if self.peek().kind != TokenKind::Eof {
            return Err(self.unexpected("end of query"));
        }

        Ok(Query {
            projection,
            source,
            predicate,
            limit,
            aggregates,
            group_by,
            order_by,
        })
    }

    fn parse_select_item(
        &mut self,
        columns: &mut Vec<String>,
        aggregates: &mut Vec<AggregateCall>,
    ) -> SqlResult<()> {
        let word = self.expect_word("column name")?;
        let func = match word.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggregateFunc::Count),
            "SUM" => Some(AggregateFunc::Sum),
            "AVG" => Some(AggregateFunc::Avg),
            "MIN" => Some(AggregateFunc::Min),
            "MAX" => Some(AggregateFunc::Max),
            _ => None,
        };

        // only a call, `MIN(...)`, is an aggregate; a bare `min` is a column
        if let Some(func) = func {
            if matches!(self.peek().kind, TokenKind::LParen) {
                self.advance();
                let (column, arg_text) = match &self.peek().kind {
                    TokenKind::Star => {
                        self.advance();
                        (None, "*".to_string())
                    }
                    TokenKind::Word(w) => {
                        let w = w.clone();
                        self.advance();
                        (Some(canonicalize(&w)), w)
                    }
                    _ => return Err(self.unexpected("aggregate argument")),
                };
                self.expect(TokenKind::RParen)?;
                aggregates.push(AggregateCall {
                    func,
                    column,
                    text: format!("{word}({arg_text})"),
                });
                return Ok(());
            }
        }

        columns.push(canonicalize(&word));
        Ok(())
    }

    fn parse_source(&mut self) -> SqlResult<Source> {
        let raw = match &self.peek().kind {
            TokenKind::Word(w) => w.clone(),
            TokenKind::Quoted(s) => s.clone(),
            _ => return Err(self.unexpected("file path")),
        };
        self.advance();
        if raw == "-" || raw.eq_ignore_ascii_case("stdin") {
            Ok(Source::Stdin)
        } else {
            Ok(Source::Path(raw.into()))
        }
    }

    fn parse_or(&mut self) -> SqlResult<Expr> {
        let mut left = self.parse_and()?;
        while self.at_keyword("OR") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> SqlResult<Expr> {
        let mut left = self.parse_not()?;
        while self.at_keyword("AND") {
            self.advance();
            let right = self.parse_not()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> SqlResult<Expr> {
        if self.at_keyword("NOT") {
            self.advance();
            return Ok(Expr::not(self.parse_not()?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> SqlResult<Expr> {
        if matches!(self.peek().kind, TokenKind::LParen) {
            self.advance();
            let expr = self.parse_or()?;
            self.expect(TokenKind::RParen)?;
            return Ok(expr);
        }

        let column = self.expect_word("column name")?;
        let op = match self.peek().kind {
            TokenKind::Eq => CmpOp::Eq,
            TokenKind::Ne => CmpOp::Ne,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            _ => return Err(self.unexpected("comparison operator")),
        };
        self.advance();

        let value = match &self.peek().kind {
            TokenKind::Word(w) => w.clone(),
            TokenKind::Quoted(s) => s.clone(),
            _ => return Err(self.unexpected("comparison value")),
        };
        self.advance();

        Ok(Expr::Compare(Comparison::new(
            canonicalize(&column),
            op,
            value,
        )))
    }

    fn parse_name_list(&mut self) -> SqlResult<Vec<String>> {
        let mut names = Vec::new();
        loop {
            let word = self.expect_word("column name")?;
            names.push(canonicalize(&word));
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
            } else {
                return Ok(names);
            }
        }
    }

    fn parse_order_list(&mut self) -> SqlResult<Vec<SortSpec>> {
        let mut specs = Vec::new();
        loop {
            let word = self.expect_word("column name")?;
            let mut descending = false;
            if self.at_keyword("DESC") {
                self.advance();
                descending = true;
            } else if self.at_keyword("ASC") {
                self.advance();
            }
            specs.push(SortSpec {
                column: canonicalize(&word),
                descending,
            });
            if matches!(self.peek().kind, TokenKind::Comma) {
                self.advance();
            } else {
                return Ok(specs);
            }
        }
    }

    fn parse_limit(&mut self) -> SqlResult<u32> {
        let word = self.expect_word("LIMIT value")?;
        word.parse::<u32>()
            .map_err(|_| SqlError::InvalidLimit { value: word })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    fn expect_keyword(&mut self, keyword: &str) -> SqlResult<()> {
        if self.at_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    fn expect(&mut self, kind: TokenKind) -> SqlResult<Token> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn expect_word(&mut self, expected: &str) -> SqlResult<String> {
        match &self.peek().kind {
            TokenKind::Word(w) => {
                let w = w.clone();
                self.advance();
                Ok(w)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &str) -> SqlError {
        let token = self.peek();
        SqlError::Unexpected {
            found: token.kind.describe(),
            expected: expected.to_string(),
            pos: token.pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csvsift_core::BinaryOp;

    #[test]
    fn select_columns_and_limit() {
        let q = parse("SELECT id, total FROM orders.csv LIMIT 5").unwrap();
        assert_eq!(
            q.projection,
            Projection::Columns(vec!["id".into(), "total".into()])
        );
        assert_eq!(q.source, Source::Path("orders.csv".into()));
        assert_eq!(q.limit, Some(5));
        assert!(q.predicate.is_none());
    }

    #[test]
    fn select_star() {
        let q = parse("select * from data.csv").unwrap();
        assert_eq!(q.projection, Projection::All);
        assert_eq!(q.limit, None);
    }

    #[test]
    fn column_names_are_canonicalized() {
        let q = parse("SELECT Name, AGE FROM x.csv WHERE CiTy = 'NYC'").unwrap();
        assert_eq!(
            q.projection,
            Projection::Columns(vec!["name".into(), "age".into()])
        );
        match q.predicate.unwrap() {
            Expr::Compare(cmp) => assert_eq!(cmp.column, "city"),
            other => panic!("unexpected predicate: {other:?}"),
        }
    }

    #[test]
    fn quoted_paths_and_stdin_sources() {
        let q = parse("SELECT * FROM 'my data.csv'").unwrap();
        assert_eq!(q.source, Source::Path("my data.csv".into()));
        assert_eq!(parse("SELECT * FROM -").unwrap().source, Source::Stdin);
        assert_eq!(parse("SELECT * FROM stdin").unwrap().source, Source::Stdin);
    }

    #[test]
    fn comparison_captures_numeric_value() {
        let q = parse("SELECT * FROM f.csv WHERE total > 40").unwrap();
        match q.predicate.unwrap() {
            Expr::Compare(cmp) => {
                assert_eq!(cmp.op, CmpOp::Gt);
                assert_eq!(cmp.value, "40");
                assert_eq!(cmp.number, Some(40.0));
            }
            other => panic!("unexpected predicate: {other:?}"),
        }
        let q = parse("SELECT * FROM f.csv WHERE country = 'UK'").unwrap();
        match q.predicate.unwrap() {
            Expr::Compare(cmp) => assert_eq!(cmp.number, None),
            other => panic!("unexpected predicate: {other:?}"),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let q = parse("SELECT * FROM f.csv WHERE a = '1' OR b = '2' AND c = '3'").unwrap();
        match q.predicate.unwrap() {
            Expr::Binary { op, right, .. } => {
                assert_eq!(op, BinaryOp::Or);
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::And,
                        ..
                    }
                ));
            }
            other => panic!("expected OR at the top, got {other:?}"),
        }
    }

    #[test]
    fn not_binds_tightest_and_stacks() {
        let q = parse("SELECT * FROM f.csv WHERE NOT a = '1' AND b = '2'").unwrap();
        match q.predicate.unwrap() {
            Expr::Binary { op, left, .. } => {
                assert_eq!(op, BinaryOp::And);
                assert!(matches!(*left, Expr::Not(_)));
            }
            other => panic!("expected AND at the top, got {other:?}"),
        }

        let q = parse("SELECT * FROM f.csv WHERE NOT NOT a = '1'").unwrap();
        match q.predicate.unwrap() {
            Expr::Not(inner) => assert!(matches!(*inner, Expr::Not(_))),
            other => panic!("expected NOT NOT, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_group_and_glue_to_keywords() {
        let q = parse("SELECT * FROM f.csv WHERE (a = '1') OR (b = '2')").unwrap();
        assert!(matches!(
            q.predicate.unwrap(),
            Expr::Binary {
                op: BinaryOp::Or,
                ..
            }
        ));

        // no space between keyword and parenthesis
        parse("SELECT * FROM f.csv WHERE a = '1' AND(b = '2')").unwrap();
        parse("SELECT * FROM f.csv WHERE NOT(a = '1')").unwrap();
        parse("SELECT * FROM f.csv WHERE ((a = '1' OR b = '2') AND c = '3')").unwrap();
    }

    #[test]
    fn angle_bracket_ne_normalizes() {
        let q = parse("SELECT * FROM f.csv WHERE a <> '1'").unwrap();
        match q.predicate.unwrap() {
            Expr::Compare(cmp) => assert_eq!(cmp.op, CmpOp::Ne),
            other => panic!("unexpected predicate: {other:?}"),
        }
    }

    #[test]
    fn group_by_and_aggregates() {
        let q = parse("SELECT country, COUNT(*), sum(total) FROM f.csv GROUP BY country").unwrap();
        assert_eq!(q.projection, Projection::Columns(vec!["country".into()]));
        assert_eq!(q.group_by, vec!["country".to_string()]);
        assert_eq!(q.aggregates.len(), 2);
        assert_eq!(q.aggregates[0].func, AggregateFunc::Count);
        assert_eq!(q.aggregates[0].column, None);
        assert_eq!(q.aggregates[0].text, "COUNT(*)");
        assert_eq!(q.aggregates[1].func, AggregateFunc::Sum);
        assert_eq!(q.aggregates[1].column, Some("total".into()));
        assert_eq!(q.aggregates[1].text, "sum(total)");
    }

    #[test]
    fn bare_aggregate_name_is_a_column() {
        let q = parse("SELECT min, max FROM f.csv").unwrap();
        assert_eq!(
            q.projection,
            Projection::Columns(vec!["min".into(), "max".into()])
        );
        assert!(q.aggregates.is_empty());
    }

    #[test]
    fn order_by_directions() {
        let q = parse("SELECT * FROM f.csv ORDER BY total DESC, id").unwrap();
        assert_eq!(
            q.order_by,
            vec![
                SortSpec {
                    column: "total".into(),
                    descending: true
                },
                SortSpec {
                    column: "id".into(),
                    descending: false
                },
            ]
        );
    }

    #[test]
    fn whitespace_including_newlines_is_fine() {
        parse("SELECT * FROM f.csv WHERE a = '1'\nAND b = '2'").unwrap();
        parse("SELECT *\tFROM f.csv\tWHERE a = '1'").unwrap();
    }

    #[test]
    fn errors() {
        assert_eq!(parse("   "), Err(SqlError::Empty));
        assert!(matches!(
            parse("SELECT FROM f.csv"),
            Err(SqlError::EmptySelectItem)
        ));
        assert!(matches!(
            parse("SELECT * FROM f.csv LIMIT -1"),
            Err(SqlError::InvalidLimit { .. })
        ));
        assert!(matches!(
            parse("SELECT * FROM f.csv LIMIT many"),
            Err(SqlError::InvalidLimit { .. })
        ));
        assert!(matches!(
            parse("SELECT * WHERE a = '1'"),
            Err(SqlError::Unexpected { .. })
        ));
        assert!(matches!(
            parse("SELECT * FROM f.csv WHERE a ="),
            Err(SqlError::Unexpected { .. })
        ));
        assert!(matches!(
            parse("SELECT * FROM f.csv trailing"),
            Err(SqlError::Unexpected { .. })
        ));
    }

    #[test]
    fn limit_zero_parses() {
        assert_eq!(parse("SELECT * FROM f.csv LIMIT 0").unwrap().limit, Some(0));
    }
}
