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

//! End-to-end query behavior over the sequential path: projection,
//! predicates, LIMIT, quoting, and the buffered ORDER BY / GROUP BY
//! supplements.

use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;

use csvsift_core::Error;
use csvsift_engine::{execute_with, EngineConfig};
use tempfile::TempDir;

const COUNTRIES: &str = "id,country,total\n1,UK,50\n2,US,120\n3,UK,150\n4,UK,30\n5,US,80\n";

fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    File::create(&path)
        .unwrap()
        .write_all(content.as_bytes())
        .unwrap();
    path
}

fn run_sql(sql: &str) -> String {
    let query = csvsift_sql::parse(sql).unwrap();
    let mut out = Vec::new();
    execute_with(&query, &EngineConfig::default(), &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn run_on(dir: &TempDir, content: &str, sql_tail: &str) -> String {
    let path = write_csv(dir, "data.csv", content);
    run_sql(&sql_tail.replace("{src}", &format!("'{}'", path.display())))
}

#[test]
fn projection_with_predicate_and_limit() {
    let dir = TempDir::new().unwrap();
    let out = run_on(
        &dir,
        COUNTRIES,
        "SELECT id, total FROM {src} WHERE country = 'UK' AND total > 40 LIMIT 5",
    );
    assert_eq!(out, "id,total\n1,50\n3,150\n");
}

#[test]
fn negated_predicate_selects_the_complement() {
    let dir = TempDir::new().unwrap();
    let out = run_on(
        &dir,
        COUNTRIES,
        "SELECT * FROM {src} WHERE NOT country = 'UK' LIMIT 10",
    );
    assert_eq!(out, "id,country,total\n2,US,120\n5,US,80\n");
}

#[test]
fn double_negation_equals_the_plain_predicate() {
    let dir = TempDir::new().unwrap();
    let plain = run_on(&dir, COUNTRIES, "SELECT * FROM {src} WHERE country = 'UK'");
    let doubled = run_on(
        &dir,
        COUNTRIES,
        "SELECT * FROM {src} WHERE NOT NOT country = 'UK'",
    );
    assert_eq!(plain, doubled);
}

#[test]
fn escaped_quote_round_trips_through_output() {
    let dir = TempDir::new().unwrap();
    let out = run_on(
        &dir,
        "prod,desc\nPhone,\"5\"\" screen\"\n",
        "SELECT desc FROM {src}",
    );
    // standard quoting: the embedded quote doubles again on the way out
    assert_eq!(out, "desc\n\"5\"\" screen\"\n");
}

#[test]
fn embedded_newline_in_quoted_field() {
    let dir = TempDir::new().unwrap();
    let out = run_on(
        &dir,
        "id,note\n1,\"two\nlines\"\n2,plain\n",
        "SELECT note FROM {src} WHERE id = '2'",
    );
    assert_eq!(out, "note\nplain\n");
    let all = run_on(&dir, "id,note\n1,\"two\nlines\"\n2,plain\n", "SELECT note FROM {src}");
    assert_eq!(all, "note\n\"two\nlines\"\nplain\n");
}

#[test]
fn limit_zero_emits_only_the_header() {
    let dir = TempDir::new().unwrap();
    let out = run_on(&dir, COUNTRIES, "SELECT * FROM {src} LIMIT 0");
    assert_eq!(out, "id,country,total\n");
}

#[test]
fn header_only_and_single_row_sources() {
    let dir = TempDir::new().unwrap();
    assert_eq!(
        run_on(&dir, "name,age,city\n", "SELECT * FROM {src}"),
        "name,age,city\n"
    );
    assert_eq!(
        run_on(&dir, "only\nvalue\n", "SELECT * FROM {src}"),
        "only\nvalue\n"
    );
    assert_eq!(
        run_on(&dir, "id,v\n7,x", "SELECT v FROM {src}"),
        "v\nx\n"
    );
}

#[test]
fn zero_matches_emit_only_the_header() {
    let dir = TempDir::new().unwrap();
    let out = run_on(
        &dir,
        "name,age\nAlice,30\nBob,25\n",
        "SELECT * FROM {src} WHERE name = 'Charlie'",
    );
    assert_eq!(out, "name,age\n");
}

#[test]
fn all_comparison_operators_numeric() {
    let dir = TempDir::new().unwrap();
    let src = "id,value\n1,10\n2,20\n3,30\n4,40\n";
    let cases = [
        ("=", "20", "id,value\n2,20\n"),
        ("!=", "20", "id,value\n1,10\n3,30\n4,40\n"),
        (">", "20", "id,value\n3,30\n4,40\n"),
        (">=", "20", "id,value\n2,20\n3,30\n4,40\n"),
        ("<", "30", "id,value\n1,10\n2,20\n"),
        ("<=", "30", "id,value\n1,10\n2,20\n3,30\n"),
    ];
    for (op, value, want) in cases {
        let got = run_on(
            &dir,
            src,
            &format!("SELECT * FROM {{src}} WHERE value {op} {value}"),
        );
        assert_eq!(got, want, "operator {op}");
    }
}

#[test]
fn numeric_comparison_matches_equivalent_spellings() {
    let dir = TempDir::new().unwrap();
    let out = run_on(
        &dir,
        "id,v\n1,020\n2,20.0\n3,20\n4,21\n",
        "SELECT id FROM {src} WHERE v = 20",
    );
    assert_eq!(out, "id\n1\n2\n3\n");
}

#[test]
fn case_insensitive_columns_keep_original_spelling_in_output() {
    let dir = TempDir::new().unwrap();
    let out = run_on(
        &dir,
        "Name,AGE,CiTy\nAlice,30,NYC\n",
        "SELECT name, age FROM {src}",
    );
    assert_eq!(out, "Name,AGE\nAlice,30\n");
}

#[test]
fn unknown_columns_fail_in_projection_and_predicate() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "data.csv", "name,age\nAlice,30\n");

    let query =
        csvsift_sql::parse(&format!("SELECT city FROM '{}'", path.display())).unwrap();
    let err = execute_with(&query, &EngineConfig::default(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::UnknownColumn(c) if c == "city"));

    let query = csvsift_sql::parse(&format!(
        "SELECT * FROM '{}' WHERE city = 'NYC'",
        path.display()
    ))
    .unwrap();
    let err = execute_with(&query, &EngineConfig::default(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::UnknownColumn(c) if c == "city"));
}

#[test]
fn missing_file_is_an_io_error() {
    let query = csvsift_sql::parse("SELECT * FROM /nonexistent/file.csv").unwrap();
    let err = execute_with(&query, &EngineConfig::default(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn malformed_row_aborts_with_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "bad.csv", "a,b\n1,\"ok\"\n2,\"ok\" trailing\n");
    let query = csvsift_sql::parse(&format!("SELECT * FROM '{}'", path.display())).unwrap();
    let err = execute_with(&query, &EngineConfig::default(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::Parse { row: 2, .. }), "{err}");
}

#[test]
fn reader_entry_point_streams_with_stdin_semantics() {
    let query = csvsift_sql::parse("SELECT id FROM stdin WHERE id != '2'").unwrap();
    let mut out = Vec::new();
    csvsift_engine::execute_reader(
        &query,
        &EngineConfig::default(),
        COUNTRIES.as_bytes(),
        &mut out,
    )
    .unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "id\n1\n3\n4\n5\n");
}

#[test]
fn order_by_numeric_and_string_keys() {
    let dir = TempDir::new().unwrap();
    let src = "name,total\ncarol,9\nalice,100\nBob,20\n";
    assert_eq!(
        run_on(&dir, src, "SELECT name FROM {src} ORDER BY total"),
        "name\ncarol\nBob\nalice\n"
    );
    assert_eq!(
        run_on(&dir, src, "SELECT name FROM {src} ORDER BY total DESC"),
        "name\nalice\nBob\ncarol\n"
    );
    // string keys sort case-insensitively
    assert_eq!(
        run_on(&dir, src, "SELECT name FROM {src} ORDER BY name"),
        "name\nalice\nBob\ncarol\n"
    );
}

#[test]
fn order_by_top_k_matches_full_sort() {
    let dir = TempDir::new().unwrap();
    let mut src = String::from("id,score\n");
    for i in 0..500u32 {
        src.push_str(&format!("{},{}\n", i, (i * 37) % 1000));
    }
    // LIMIT 3 takes the heap path; LIMIT 2000 takes the full sort
    let top = run_on(&dir, &src, "SELECT id FROM {src} ORDER BY score LIMIT 3");
    let full = run_on(&dir, &src, "SELECT id FROM {src} ORDER BY score LIMIT 2000");
    let full_head: Vec<&str> = full.lines().take(4).collect();
    assert_eq!(top.lines().collect::<Vec<_>>(), full_head);
}

#[test]
fn order_by_secondary_key_breaks_ties() {
    let dir = TempDir::new().unwrap();
    let src = "g,v\nb,1\na,2\nb,0\na,1\n";
    assert_eq!(
        run_on(&dir, src, "SELECT g, v FROM {src} ORDER BY g, v DESC"),
        "g,v\na,2\na,1\nb,1\nb,0\n"
    );
}

#[test]
fn group_by_counts_and_sums() {
    let dir = TempDir::new().unwrap();
    let out = run_on(
        &dir,
        COUNTRIES,
        "SELECT country, COUNT(*), SUM(total), AVG(total) FROM {src} GROUP BY country",
    );
    assert_eq!(
        out,
        "country,COUNT(*),SUM(total),AVG(total)\nUK,3,230.00,76.67\nUS,2,200.00,100.00\n"
    );
}

#[test]
fn group_by_min_max_and_where() {
    let dir = TempDir::new().unwrap();
    let out = run_on(
        &dir,
        COUNTRIES,
        "SELECT country, MIN(total), MAX(total) FROM {src} WHERE total > 40 GROUP BY country",
    );
    assert_eq!(
        out,
        "country,MIN(total),MAX(total)\nUK,50.00,150.00\nUS,80.00,120.00\n"
    );
}

#[test]
fn global_aggregate_without_group_by() {
    let dir = TempDir::new().unwrap();
    let out = run_on(&dir, COUNTRIES, "SELECT COUNT(*) FROM {src}");
    assert_eq!(out, "COUNT(*)\n5\n");
}

#[test]
fn group_by_rejects_star_and_ungrouped_columns() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "data.csv", COUNTRIES);

    let query = csvsift_sql::parse(&format!(
        "SELECT * FROM '{}' GROUP BY country",
        path.display()
    ))
    .unwrap();
    let err = execute_with(&query, &EngineConfig::default(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));

    let query = csvsift_sql::parse(&format!(
        "SELECT id, COUNT(*) FROM '{}' GROUP BY country",
        path.display()
    ))
    .unwrap();
    let err = execute_with(&query, &EngineConfig::default(), &mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::InvalidQuery(_)));
}

#[test]
fn output_header_round_trips_through_the_parser() {
    let dir = TempDir::new().unwrap();
    let out = run_on(&dir, COUNTRIES, "SELECT total, id FROM {src} LIMIT 1");
    let first_line = out.lines().next().unwrap();
    let mut row_buf = csvsift_core::RowBuf::new();
    csvsift_core::parse_record(first_line.as_bytes(), 0, &mut row_buf).unwrap();
    assert_eq!(row_buf.fields(), ["total", "id"]);
}
