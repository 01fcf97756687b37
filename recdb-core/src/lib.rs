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

//! RecDB Core
//!
//! Fundamental types for the configuration-and-statistics registry: the
//! closed value union, record metadata enumerations, validation rules, and
//! the linked cells that mirror record values into subsystem-owned storage.
//!
//! This crate holds no global state and performs no I/O; the concurrent
//! store, persistence, and ingestion live in `recdb-store`.
//!
//! # Core Components
//!
//! - **Value model**: `RecValue` over {int, float, str, counter}
//! - **Metadata**: record class, persistence, update, access, provenance
//! - **Checks**: regex validation rules applied on Set
//! - **Cells**: atomic/locked mirrors for low-overhead reads

pub mod cell;
pub mod check;
pub mod error;
pub mod record;
pub mod value;

pub use cell::{CounterCell, FloatCell, IntCell, StrCell};
pub use check::{CheckKind, CheckRule};
pub use error::{RecError, Result};
pub use record::{AccessKind, ConfigSpec, PersistKind, RecClass, RecSource, UpdateKind};
pub use value::{RecValue, ValueKind};
