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

//! Error types for RecDB

use std::io;
use thiserror::Error;

use crate::value::ValueKind;

/// Everything a registry operation can fail with.
///
/// `NotFound` is common and recoverable (speculative lookups); the read-only
/// getters return `Option` instead of raising it. `TypeConflict` is always a
/// programming or configuration error and is never coerced away.
#[derive(Error, Debug)]
pub enum RecError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("type conflict on {name}: have {have}, want {want}")]
    TypeConflict {
        name: String,
        have: ValueKind,
        want: ValueKind,
    },

    #[error("validation failed for {name}: rejected value {value:?}")]
    ValidationFailed { name: String, value: String },

    #[error("malformed entry: {0}")]
    MalformedEntry(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, RecError>;
