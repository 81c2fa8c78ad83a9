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

//! Buffered ORDER BY.
//!
//! Not part of the streaming core: all matching rows are held in memory,
//! sorted, then projected. Sort keys use per-column type detection over
//! a small leading sample (a key column stays numeric until a value
//! fails to parse, then the column is a string for good). Small LIMITs
//! take a bounded-heap top-K path instead of sorting the full set.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::Write;

use csvsift_core::{
    parse_record, BoundExpr, CsvWriter, Error, Header, Query, Result, RowBuf, SortSpec,
};

use crate::{map_write_err, open_source};

/// LIMITs below this use the top-K heap instead of a full sort.
const TOP_K_MAX_LIMIT: u32 = 1_000;

/// Rows sampled before a key column's type is frozen.
const TYPE_SAMPLE_ROWS: usize = 100;

/// Samples needed before "everything parsed so far" means numeric.
const TYPE_MIN_CONFIDENCE: usize = 5;

#[derive(Clone, Copy, PartialEq)]
enum ColClass {
    Unknown,
    Numeric,
    Text,
}

struct SortKey {
    num: Option<f64>,
    /// Lower-cased raw text; string comparisons are case-insensitive.
    text: String,
    descending: bool,
}

impl SortKey {
    fn for_value(value: &str, class: ColClass, spec: &SortSpec) -> SortKey {
        let num = match class {
            ColClass::Text => None,
            _ => value.parse::<f64>().ok(),
        };
        SortKey {
            num,
            text: value.to_lowercase(),
            descending: spec.descending,
        }
    }
}

struct Keyed {
    keys: Vec<SortKey>,
    row: Vec<String>,
}

fn cmp_keys(a: &[SortKey], b: &[SortKey]) -> Ordering {
    for (ka, kb) in a.iter().zip(b.iter()) {
        let ord = match (ka.num, kb.num) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => ka.text.cmp(&kb.text),
        };
        if ord != Ordering::Equal {
            return if ka.descending { ord.reverse() } else { ord };
        }
    }
    Ordering::Equal
}

struct HeapEntry(Keyed);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_keys(&self.0.keys, &other.0.keys)
    }
}

pub(crate) fn execute<W: Write>(query: &Query, out: W) -> Result<()> {
    let mut reader = open_source(query)?;
    let mut row_buf = RowBuf::new();

    let Some((record, _)) = reader.read_record()? else {
        return Err(Error::parse(0, "empty input: missing header"));
    };
    parse_record(record, 0, &mut row_buf)?;
    let header = Header::from_fields(row_buf.fields());

    let (selected, out_names) = header.resolve(&query.projection)?;
    let bound = match &query.predicate {
        Some(expr) => Some(BoundExpr::bind(expr, &header)?),
        None => None,
    };

    let mut key_ordinals = Vec::with_capacity(query.order_by.len());
    for spec in &query.order_by {
        let ord = header
            .ordinal(&spec.column)
            .ok_or_else(|| Error::UnknownColumn(spec.column.clone()))?;
        key_ordinals.push(ord);
    }

    let mut classes = vec![ColClass::Unknown; key_ordinals.len()];
    let mut sampled = 0usize;

    let top_k = query
        .limit
        .filter(|&l| l > 0 && l < TOP_K_MAX_LIMIT)
        .map(|l| l as usize);

    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(top_k.unwrap_or(0) + 1);
    let mut rows: Vec<Keyed> = Vec::new();

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

        if sampled < TYPE_SAMPLE_ROWS {
            for (k, &ord) in key_ordinals.iter().enumerate() {
                if classes[k] != ColClass::Unknown {
                    continue;
                }
                let value = fields.get(ord).map(String::as_str).unwrap_or("");
                if value.parse::<f64>().is_ok() {
                    if sampled >= TYPE_MIN_CONFIDENCE {
                        classes[k] = ColClass::Numeric;
                    }
                } else {
                    classes[k] = ColClass::Text;
                }
            }
            sampled += 1;
        }

        let keys = key_ordinals
            .iter()
            .enumerate()
            .map(|(k, &ord)| {
                let value = fields.get(ord).map(String::as_str).unwrap_or("");
                SortKey::for_value(value, classes[k], &query.order_by[k])
            })
            .collect();
        let keyed = Keyed {
            keys,
            row: row_buf.to_vec(),
        };

        match top_k {
            Some(k) => {
                let entry = HeapEntry(keyed);
                if heap.len() < k {
                    heap.push(entry);
                } else if let Some(worst) = heap.peek() {
                    if entry.cmp(worst) == Ordering::Less {
                        heap.pop();
                        heap.push(entry);
                    }
                }
            }
            None => rows.push(keyed),
        }
    }

    let ordered: Vec<Keyed> = match top_k {
        Some(_) => heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| entry.0)
            .collect(),
        None => {
            rows.sort_by(|a, b| cmp_keys(&a.keys, &b.keys));
            rows
        }
    };

    let mut writer = CsvWriter::new(out);
    writer.write_record(&out_names).map_err(map_write_err)?;

    let mut written: u64 = 0;
    for keyed in &ordered {
        if let Some(limit) = query.limit {
            if written >= u64::from(limit) {
                break;
            }
        }
        writer
            .write_selected(&keyed.row, &selected)
            .map_err(map_write_err)?;
        written += 1;
    }
    writer.flush().map_err(map_write_err)?;
    Ok(())
}
