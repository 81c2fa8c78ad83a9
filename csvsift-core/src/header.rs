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

//! Normalized CSV header: original spellings for output, canonical
//! (lower-cased, trimmed) names for every lookup.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::query::Projection;

/// Canonical form of a column name: whitespace-trimmed and lower-cased.
pub fn canonicalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone)]
pub struct Header {
    names: Vec<String>,
    canonical: Vec<String>,
    ordinals: HashMap<String, usize>,
}

impl Header {
    /// Built once per open. On duplicate canonical names the later column
    /// wins the lookup, matching how the map is populated in order.
    pub fn from_fields(fields: &[String]) -> Self {
        let names: Vec<String> = fields.to_vec();
        let canonical: Vec<String> = names.iter().map(|n| canonicalize(n)).collect();
        let mut ordinals = HashMap::with_capacity(names.len());
        for (i, name) in canonical.iter().enumerate() {
            ordinals.insert(name.clone(), i);
        }
        Self {
            names,
            canonical,
            ordinals,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Original header spellings, preserved for output.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn canonical(&self) -> &[String] {
        &self.canonical
    }

    pub fn ordinal(&self, canonical_name: &str) -> Option<usize> {
        self.ordinals.get(canonical_name).copied()
    }

    /// Resolves a projection to `(ordinals, output names)`. `*` keeps the
    /// full header order; named columns keep their original spelling.
    pub fn resolve(&self, projection: &Projection) -> Result<(Vec<usize>, Vec<String>)> {
        match projection {
            Projection::All => Ok(((0..self.len()).collect(), self.names.clone())),
            Projection::Columns(cols) => {
                let mut ordinals = Vec::with_capacity(cols.len());
                let mut names = Vec::with_capacity(cols.len());
                for col in cols {
                    let ord = self
                        .ordinal(col)
                        .ok_or_else(|| Error::UnknownColumn(col.clone()))?;
                    ordinals.push(ord);
                    names.push(self.names[ord].clone());
                }
                Ok((ordinals, names))
            }
        }
    }
}
