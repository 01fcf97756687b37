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

//! Snapshot persistence
//!
//! Persistent records (accumulating counters, mostly) are serialized to one
//! JSON file so their values survive process restarts. The format is
//! self-describing and order-free:
//!
//! ```text
//! {
//!   "version": 1,
//!   "records": [
//!     { "name": "proxy.process.http.completed_requests",
//!       "kind": "counter", "value": 43, "source": "explicit" },
//!     { "name": "proxy.process.cache.read_seconds",
//!       "kind": "float", "bits": 4602678819172646912, "source": "default" }
//!   ]
//! }
//! ```
//!
//! Floats persist their bit pattern so every value, NaN included, restores
//! exactly. Each entry decodes independently: a malformed entry or an
//! unknown future kind is skipped with a diagnostic and restore continues.
//! Durability is best-effort; an I/O failure is returned to the caller, not
//! fatal to the process.

use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use recdb_core::error::{RecError, Result};
use recdb_core::record::{PersistKind, RecClass, RecSource};
use recdb_core::value::RecValue;

use crate::store::RecordStore;

/// File name of the snapshot under the runtime-state directory.
pub const SNAPSHOT_FILENAME: &str = "records.snap";

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum SnapshotValue {
    Int { value: i64 },
    Float { bits: u64 },
    Str { value: String },
    Counter { value: i64 },
}

impl SnapshotValue {
    fn of(value: &RecValue) -> SnapshotValue {
        match value {
            RecValue::Int(v) => SnapshotValue::Int { value: *v },
            RecValue::Float(v) => SnapshotValue::Float { bits: v.to_bits() },
            RecValue::Str(v) => SnapshotValue::Str {
                value: v.to_string(),
            },
            RecValue::Counter(v) => SnapshotValue::Counter { value: *v },
        }
    }

    fn into_value(self) -> RecValue {
        match self {
            SnapshotValue::Int { value } => RecValue::Int(value),
            SnapshotValue::Float { bits } => RecValue::Float(f64::from_bits(bits)),
            SnapshotValue::Str { value } => RecValue::from(value),
            SnapshotValue::Counter { value } => RecValue::Counter(value),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    name: String,
    #[serde(flatten)]
    value: SnapshotValue,
    #[serde(default)]
    source: RecSource,
}

#[derive(Serialize)]
struct SnapshotDoc<'a> {
    version: u32,
    records: &'a [SnapshotEntry],
}

/// Read-side document: entries stay raw JSON so each decodes independently.
#[derive(Deserialize)]
struct RawSnapshotDoc {
    #[allow(dead_code)]
    version: u32,
    #[serde(default)]
    records: Vec<serde_json::Value>,
}

/// Serialize every persistent record to `path`, replacing the previous
/// snapshot atomically (write-then-rename), and clear `sync_required` on
/// every record written. Returns the number of records written.
///
/// Safe to run concurrently with Sets: each record's value is read under its
/// own lock, so a record changing mid-flush lands as either the pre- or
/// post-change value, never torn.
pub fn flush(store: &RecordStore, path: &Path) -> Result<usize> {
    let mut entries = Vec::new();
    let mut written = Vec::new();
    for handle in store.handles() {
        if handle.persist_kind() != PersistKind::Persistent {
            continue;
        }
        let (value, source) = handle.snapshot_parts();
        entries.push(SnapshotEntry {
            name: handle.name().to_string(),
            value: SnapshotValue::of(&value),
            source,
        });
        written.push(handle);
    }

    let doc = SnapshotDoc {
        version: SNAPSHOT_VERSION,
        records: &entries,
    };
    let body = serde_json::to_string_pretty(&doc)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_file_name(format!(
        "{}.tmp",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(SNAPSHOT_FILENAME)
    ));
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;

    for handle in &written {
        store.clear_sync_required(handle);
    }
    debug!(
        "flushed {} persistent records to {}",
        written.len(),
        path.display()
    );
    Ok(written.len())
}

/// [`flush`], skipped entirely when no record is marked `sync_required`.
pub fn flush_if_dirty(store: &RecordStore, path: &Path) -> Result<usize> {
    if store.dirty_count() == 0 {
        return Ok(0);
    }
    flush(store, path)
}

/// Load the snapshot at `path` into the store. Called once at start-up,
/// before subsystems perform their first Get.
///
/// A missing file is a first run and succeeds with zero records restored.
/// Each entry is applied through the normal Set path, seeding a provisional
/// record when the name is not yet known; a later registration of matching
/// kind keeps the restored value. Malformed entries are skipped with a
/// diagnostic. Returns the number of records restored.
pub fn restore(store: &RecordStore, path: &Path) -> Result<usize> {
    let body = match fs::read_to_string(path) {
        Ok(body) => body,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no snapshot at {}, starting fresh", path.display());
            return Ok(0);
        }
        Err(e) => return Err(e.into()),
    };
    let doc: RawSnapshotDoc = serde_json::from_str(&body)
        .map_err(|e| RecError::MalformedEntry(format!("unreadable snapshot: {}", e)))?;

    let mut restored = 0usize;
    for raw in doc.records {
        let entry = match serde_json::from_value::<SnapshotEntry>(raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("skipping malformed snapshot entry: {}", e);
                continue;
            }
        };
        let name = entry.name.clone();
        match store.seed(
            RecClass::Stat,
            &name,
            entry.value.into_value(),
            PersistKind::Persistent,
            entry.source,
        ) {
            Ok(_) => restored += 1,
            Err(e) => warn!("skipping snapshot entry {}: {}", name, e),
        }
    }
    info!(
        "restored {} persistent records from {}",
        restored,
        path.display()
    );
    Ok(restored)
}
