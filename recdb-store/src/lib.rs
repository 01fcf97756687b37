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

//! RecDB Store
//!
//! The process-wide configuration-and-statistics registry. Subsystems
//! register named records at start-up, link cells for low-overhead reads,
//! subscribe to updates, and read/write values concurrently from any number
//! of worker threads. Persistent records survive restarts through the
//! snapshot file.
//!
//! # Core Components
//!
//! - **Record store**: sharded concurrent table, per-record locking
//! - **Typed access**: get/set per value kind, bounded and allocating
//!   string reads
//! - **Links**: cells mirrored inside the Set critical section
//! - **Notification**: synchronous per-record subscribers, dynamic
//!   variables
//! - **Persistence**: snapshot flush/restore plus the periodic sync agent
//! - **Ingestion**: bridge from the external config parser, with
//!   environment overrides
//! - **Layout**: installation directory resolution
//!
//! # Example
//!
//! ```
//! use recdb_core::{ConfigSpec, PersistKind, RecSource, RecValue};
//! use recdb_store::RecordStore;
//!
//! let store = RecordStore::new();
//! store
//!     .register_stat(
//!         "proxy.process.http.completed_requests",
//!         RecValue::Counter(0),
//!         PersistKind::Persistent,
//!     )
//!     .unwrap();
//! store
//!     .register_config(ConfigSpec::new("proxy.config.http.keep_alive_enabled", 1i64))
//!     .unwrap();
//!
//! let keep_alive = store.bind_int("proxy.config.http.keep_alive_enabled").unwrap();
//! store
//!     .set_int("proxy.config.http.keep_alive_enabled", 0, RecSource::Explicit)
//!     .unwrap();
//! assert_eq!(keep_alive.get(), 0);
//!
//! store.incr_counter("proxy.process.http.completed_requests", 1).unwrap();
//! ```

pub mod ingest;
pub mod notify;
pub mod paths;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use ingest::{ingest, warn_unregistered, EnvOverride, IngestReport, NoEnvOverride,
    StdEnvOverride, StreamEntry};
pub use notify::{LoadFn, NotifyFn, UpdateCb, UpdateScope};
pub use paths::Layout;
pub use snapshot::{flush, flush_if_dirty, restore, SNAPSHOT_FILENAME};
pub use store::{RecordHandle, RecordStore, StrCopy};
pub use sync::SyncAgent;
