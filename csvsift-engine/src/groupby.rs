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

//! Buffered GROUP BY / aggregation.
//!
//! Groups accumulate in memory keyed by the NUL-joined group values;
//! output preserves first-appearance order. `COUNT` counts rows; `SUM`,
//! `AVG`, `MIN`, `MAX` fold the values that parse as doubles and skip
//! the rest (`AVG` divides by the parse count, not the row count).
//! A query with aggregates and no GROUP BY forms one global group.

use std::collections::HashMap;
use std::io::Write;

use csvsift_core::{
    parse_record, AggregateCall, AggregateFunc, BoundExpr, CsvWriter, Error, Header, Projection,
    Query, Result, RowBuf,
};

use crate::{map_write_err, open_source};

struct GroupAcc {
    key_values: Vec<String>,
    row_count: u64,
    sums: Vec<f64>,
    counts: Vec<u64>,
    mins: Vec<f64>,
    maxs: Vec<f64>,
}

impl GroupAcc {
    fn new(key_values: Vec<String>, num_aggs: usize) -> Self {
        Self {
            key_values,
            row_count: 0,
            sums: vec![0.0; num_aggs],
            counts: vec![0; num_aggs],
            mins: vec![f64::INFINITY; num_aggs],
            maxs: vec![f64::NEG_INFINITY; num_aggs],
        }
    }

    fn fold(&mut self, aggregates: &[AggregateCall], ordinals: &[Option<usize>], row: &[String]) {
        self.row_count += 1;
        for (i, agg) in aggregates.iter().enumerate() {
            if agg.func == AggregateFunc::Count {
                continue;
            }
            let Some(ord) = ordinals[i] else { continue };
            let Some(value) = row.get(ord) else { continue };
            let Ok(number) = value.parse::<f64>() else {
                continue;
            };
            self.counts[i] += 1;
            self.sums[i] += number;
            if number < self.mins[i] {
                self.mins[i] = number;
            }
            if number > self.maxs[i] {
                self.maxs[i] = number;
            }
        }
    }

    fn render(&self, agg_index: usize, agg: &AggregateCall) -> String {
        match agg.func {
            AggregateFunc::Count => self.row_count.to_string(),
            AggregateFunc::Sum => format!("{:.2}", self.sums[agg_index]),
            AggregateFunc::Avg => {
                if self.counts[agg_index] > 0 {
                    format!(
                        "{:.2}",
                        self.sums[agg_index] / self.counts[agg_index] as f64
                    )
                } else {
                    "0".to_string()
                }
            }
            AggregateFunc::Min => {
                if self.counts[agg_index] > 0 {
                    format!("{:.2}", self.mins[agg_index])
                } else {
                    String::new()
                }
            }
            AggregateFunc::Max => {
                if self.counts[agg_index] > 0 {
                    format!("{:.2}", self.maxs[agg_index])
                } else {
                    String::new()
                }
            }
        }
    }
}

pub(crate) fn execute<W: Write>(query: &Query, out: W) -> Result<()> {
    let group_cols = match &query.projection {
        Projection::All => {
            return Err(Error::InvalidQuery(
                "SELECT * cannot be combined with GROUP BY or aggregates; name the columns".into(),
            ))
        }
        Projection::Columns(cols) => cols,
    };
    if group_cols.len() != query.group_by.len() {
        return Err(Error::InvalidQuery(
            "every non-aggregate column in SELECT must appear in GROUP BY".into(),
        ));
    }
    for col in group_cols {
        if !query.group_by.contains(col) {
            return Err(Error::InvalidQuery(format!(
                "column {col:?} in SELECT is missing from GROUP BY"
            )));
        }
    }

    let mut reader = open_source(query)?;
    let mut row_buf = RowBuf::new();

    let Some((record, _)) = reader.read_record()? else {
        return Err(Error::parse(0, "empty input: missing header"));
    };
    parse_record(record, 0, &mut row_buf)?;
    let header = Header::from_fields(row_buf.fields());

    let bound = match &query.predicate {
        Some(expr) => Some(BoundExpr::bind(expr, &header)?),
        None => None,
    };

    let mut group_ordinals = Vec::with_capacity(query.group_by.len());
    for col in &query.group_by {
        let ord = header
            .ordinal(col)
            .ok_or_else(|| Error::UnknownColumn(col.clone()))?;
        group_ordinals.push(ord);
    }
    let mut agg_ordinals = Vec::with_capacity(query.aggregates.len());
    for agg in &query.aggregates {
        match &agg.column {
            Some(col) => {
                let ord = header
                    .ordinal(col)
                    .ok_or_else(|| Error::UnknownColumn(col.clone()))?;
                agg_ordinals.push(Some(ord));
            }
            None => agg_ordinals.push(None),
        }
    }

    let mut lookup: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupAcc> = Vec::new();

    let mut row_no: u64 = 0;
    loop {
        let Some((record, _)) = reader.read_record()? else {
            break;
        };
        if record.is_empty() {
            continue;
        }
        row_no += 1;
        parse_record(record, row_no, &mut row_buf)?;
        let fields = row_buf.fields();

        if let Some(pred) = &bound {
            if !pred.matches(fields) {
                continue;
            }
        }

        let mut key = String::new();
        for (i, &ord) in group_ordinals.iter().enumerate() {
            if i > 0 {
                key.push('\0');
            }
            key.push_str(fields.get(ord).map(String::as_str).unwrap_or(""));
        }

        let group_index = match lookup.get(&key) {
            Some(&index) => index,
            None => {
                let key_values = group_ordinals
                    .iter()
                    .map(|&ord| fields.get(ord).cloned().unwrap_or_default())
                    .collect();
                groups.push(GroupAcc::new(key_values, query.aggregates.len()));
                lookup.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[group_index].fold(&query.aggregates, &agg_ordinals, fields);
    }

    // header: group columns in original spelling, then aggregates as typed
    let mut out_names: Vec<String> = Vec::with_capacity(group_ordinals.len() + query.aggregates.len());
    for &ord in &group_ordinals {
        out_names.push(header.names()[ord].clone());
    }
    for agg in &query.aggregates {
        out_names.push(agg.text.clone());
    }

    let mut writer = CsvWriter::new(out);
    writer.write_record(&out_names).map_err(map_write_err)?;

    let mut written: u64 = 0;
    let mut out_row: Vec<String> = Vec::with_capacity(out_names.len());
    for group in &groups {
        if let Some(limit) = query.limit {
            if written >= u64::from(limit) {
                break;
            }
        }
        out_row.clear();
        out_row.extend(group.key_values.iter().cloned());
        for (i, agg) in query.aggregates.iter().enumerate() {
            out_row.push(group.render(i, agg));
        }
        writer.write_record(&out_row).map_err(map_write_err)?;
        written += 1;
    }
    writer.flush().map_err(map_write_err)?;
    Ok(())
}
