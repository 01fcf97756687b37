// SPDX-License-Identifier: AGPL-3.0-or-later
// RecDB - Process-Wide Configuration & Statistics Registry
// Copyright (C) 2026 RecDB Contributors
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

//! Record value model
//!
//! Records store one of a closed set of value kinds: integer, float, string,
//! counter. The kind is fixed at registration and never changes; every typed
//! operation checks it before touching the payload.
//!
//! Counters are integers by representation but a distinct kind: a counter
//! accumulates monotonically and is the usual candidate for persistence,
//! while an integer record is a plain gauge or tunable.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RecError, Result};

/// Discriminant of the closed value union.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Float,
    Str,
    Counter,
}

impl ValueKind {
    /// Stable lowercase tag, used in snapshots and diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Str => "str",
            ValueKind::Counter => "counter",
        }
    }

    /// Inverse of [`ValueKind::as_str`].
    pub fn from_tag(tag: &str) -> Option<ValueKind> {
        match tag {
            "int" => Some(ValueKind::Int),
            "float" => Some(ValueKind::Float),
            "str" => Some(ValueKind::Str),
            "counter" => Some(ValueKind::Counter),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record's payload: the tagged union over the four value kinds.
///
/// Strings are held as `Arc<str>` so that reads hand out an owned copy
/// without cloning the bytes and without aliasing the store's buffer.
#[derive(Debug, Clone)]
pub enum RecValue {
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Counter(i64),
}

impl RecValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            RecValue::Int(_) => ValueKind::Int,
            RecValue::Float(_) => ValueKind::Float,
            RecValue::Str(_) => ValueKind::Str,
            RecValue::Counter(_) => ValueKind::Counter,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RecValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            RecValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&Arc<str>> {
        match self {
            RecValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_counter(&self) -> Option<i64> {
        match self {
            RecValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// Parse trimmed text into a value of the requested kind.
    ///
    /// This is the ingestion path for textual configuration entries; a value
    /// that does not parse is a [`RecError::MalformedEntry`].
    pub fn parse(kind: ValueKind, text: &str) -> Result<RecValue> {
        let text = text.trim();
        match kind {
            ValueKind::Int => text
                .parse::<i64>()
                .map(RecValue::Int)
                .map_err(|e| RecError::MalformedEntry(format!("bad int {:?}: {}", text, e))),
            ValueKind::Float => text
                .parse::<f64>()
                .map(RecValue::Float)
                .map_err(|e| RecError::MalformedEntry(format!("bad float {:?}: {}", text, e))),
            ValueKind::Str => Ok(RecValue::Str(Arc::from(text))),
            ValueKind::Counter => text
                .parse::<i64>()
                .map(RecValue::Counter)
                .map_err(|e| RecError::MalformedEntry(format!("bad counter {:?}: {}", text, e))),
        }
    }

    /// Exact equality for change detection.
    ///
    /// Floats compare by bit pattern so NaN equals itself and a stored NaN
    /// does not register as a perpetual change. Semantic comparison (e.g.
    /// whitespace-insensitive strings) is the business of dynamic-variable
    /// loaders, not of the store.
    pub fn same_value(&self, other: &RecValue) -> bool {
        match (self, other) {
            (RecValue::Int(a), RecValue::Int(b)) => a == b,
            (RecValue::Float(a), RecValue::Float(b)) => a.to_bits() == b.to_bits(),
            (RecValue::Str(a), RecValue::Str(b)) => a == b,
            (RecValue::Counter(a), RecValue::Counter(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for RecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecValue::Int(v) => write!(f, "{}", v),
            RecValue::Float(v) => write!(f, "{}", v),
            RecValue::Str(v) => f.write_str(v),
            RecValue::Counter(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for RecValue {
    fn from(v: i64) -> Self {
        RecValue::Int(v)
    }
}

impl From<f64> for RecValue {
    fn from(v: f64) -> Self {
        RecValue::Float(v)
    }
}

impl From<&str> for RecValue {
    fn from(v: &str) -> Self {
        RecValue::Str(Arc::from(v))
    }
}

impl From<String> for RecValue {
    fn from(v: String) -> Self {
        RecValue::Str(Arc::from(v))
    }
}
