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

//! The concurrent record store
//!
//! One process-wide table mapping record names to record state, plus the
//! typed get/set surface and link propagation. The table is a sharded
//! `DashMap`, so lookups of already-registered records take only a shard
//! read lock; each record carries its own `RwLock`, so value mutation on one
//! name never blocks reads or writes of another.
//!
//! ## Locking discipline
//!
//! - A shard guard is never held across a record lock: the `Arc<RecordCell>`
//!   is cloned out of the map first.
//! - At most one record lock is held per thread. Update callbacks run inside
//!   the record's write section and receive an [`UpdateScope`] that mutates
//!   the already-locked state directly, so re-entrant locking cannot be
//!   expressed in the public API.
//!
//! ## Set semantics
//!
//! A successful Set is one critical section: kind check, check-rule
//! validation, value store, provenance stamp, dirty mark (persistent
//! records), link propagation, subscriber invocation in registration order.
//! A Set that reproduces the current value stamps provenance only; links and
//! subscribers do not fire and the record is not marked dirty.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use smallvec::SmallVec;
use tracing::warn;

use recdb_core::cell::{CounterCell, FloatCell, IntCell, StrCell};
use recdb_core::check::CheckRule;
use recdb_core::error::{RecError, Result};
use recdb_core::record::{AccessKind, ConfigSpec, PersistKind, RecClass, RecSource, UpdateKind};
use recdb_core::value::{RecValue, ValueKind};

use crate::notify::{UpdateCb, UpdateScope};

/// A non-owning binding to subsystem-owned mirror storage.
#[derive(Clone)]
pub(crate) enum Link {
    Int(Arc<IntCell>),
    Float(Arc<FloatCell>),
    Counter(Arc<CounterCell>),
    Str(Arc<StrCell>),
}

impl Link {
    fn kind(&self) -> ValueKind {
        match self {
            Link::Int(_) => ValueKind::Int,
            Link::Float(_) => ValueKind::Float,
            Link::Counter(_) => ValueKind::Counter,
            Link::Str(_) => ValueKind::Str,
        }
    }

    /// Write the record's value into the target. Kind agreement was checked
    /// at bind time; a mismatched pairing is unreachable and ignored.
    fn store(&self, value: &RecValue) {
        match (self, value) {
            (Link::Int(cell), RecValue::Int(v)) => cell.set(*v),
            (Link::Float(cell), RecValue::Float(v)) => cell.set(*v),
            (Link::Counter(cell), RecValue::Counter(v)) => cell.set(*v),
            (Link::Str(cell), RecValue::Str(v)) => cell.set(v.clone()),
            _ => {}
        }
    }
}

/// Everything behind a record's lock.
pub(crate) struct RecordState {
    pub(crate) class: RecClass,
    pub(crate) value: RecValue,
    pub(crate) default: RecValue,
    pub(crate) persist: PersistKind,
    pub(crate) update: UpdateKind,
    pub(crate) access: AccessKind,
    pub(crate) check: Option<CheckRule>,
    pub(crate) source: RecSource,
    pub(crate) sync_required: bool,
    /// False for records seeded by restore or ingestion before any subsystem
    /// claimed them; registration upgrades the definition in place.
    pub(crate) registered: bool,
    /// Touched by the ingestion layer; drives the unregistered-config warning.
    pub(crate) ingested: bool,
    pub(crate) links: SmallVec<[Link; 2]>,
    pub(crate) subscribers: SmallVec<[UpdateCb; 2]>,
}

/// A record: immutable name plus locked state.
pub(crate) struct RecordCell {
    pub(crate) name: Arc<str>,
    pub(crate) state: RwLock<RecordState>,
}

/// Shareable reference to a single record.
///
/// Handles are cheap clones of the record's `Arc`; identity is the record,
/// not the handle ([`RecordHandle::same_record`]).
#[derive(Clone)]
pub struct RecordHandle {
    pub(crate) cell: Arc<RecordCell>,
}

// Not derived: the record state holds subscriber closures.
impl fmt::Debug for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordHandle")
            .field("name", &self.name())
            .finish()
    }
}

impl RecordHandle {
    pub fn name(&self) -> &str {
        &self.cell.name
    }

    pub fn class(&self) -> RecClass {
        self.cell.state.read().class
    }

    pub fn value_kind(&self) -> ValueKind {
        self.cell.state.read().value.kind()
    }

    /// Atomic snapshot of the current value.
    pub fn value(&self) -> RecValue {
        self.cell.state.read().value.clone()
    }

    pub fn default_value(&self) -> RecValue {
        self.cell.state.read().default.clone()
    }

    pub fn persist_kind(&self) -> PersistKind {
        self.cell.state.read().persist
    }

    pub fn update_kind(&self) -> UpdateKind {
        self.cell.state.read().update
    }

    pub fn access_kind(&self) -> AccessKind {
        self.cell.state.read().access
    }

    pub fn source(&self) -> RecSource {
        self.cell.state.read().source
    }

    pub fn sync_required(&self) -> bool {
        self.cell.state.read().sync_required
    }

    /// Whether a subsystem has registered this record, as opposed to it
    /// having been seeded provisionally by restore or ingestion.
    pub fn is_registered(&self) -> bool {
        self.cell.state.read().registered
    }

    /// True when both handles refer to the same record.
    pub fn same_record(&self, other: &RecordHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Value and provenance under one lock acquisition, for the snapshotter.
    pub(crate) fn snapshot_parts(&self) -> (RecValue, RecSource) {
        let state = self.cell.state.read();
        (state.value.clone(), state.source)
    }

    pub(crate) fn mark_ingested(&self) {
        self.cell.state.write().ingested = true;
    }

    pub(crate) fn is_ingested(&self) -> bool {
        self.cell.state.read().ingested
    }
}

/// Result of a bounded-buffer string read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrCopy {
    /// Bytes written into the caller's buffer.
    pub len: usize,
    /// True when the stored value did not fit and was cut at a char boundary.
    pub truncated: bool,
}

/// The process-wide registry.
///
/// Constructed once at bootstrap, before any registration call, and passed
/// as `Arc<RecordStore>` to the subsystems that need it. There is no
/// reinitialization path and no record deletion; records live until process
/// teardown.
pub struct RecordStore {
    records: DashMap<String, Arc<RecordCell>>,
    /// Count of records currently marked `sync_required`.
    dirty: AtomicU64,
}

impl RecordStore {
    pub fn new() -> Arc<RecordStore> {
        Arc::new(RecordStore {
            records: DashMap::new(),
            dirty: AtomicU64::new(0),
        })
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a stat record.
    ///
    /// First call for a name creates the record; a repeat with the same value
    /// kind is a no-op success returning the existing record's handle; a
    /// conflicting kind or class fails with `TypeConflict`.
    pub fn register_stat(
        &self,
        name: &str,
        default: impl Into<RecValue>,
        persist: PersistKind,
    ) -> Result<RecordHandle> {
        self.register_inner(
            RecClass::Stat,
            name,
            default.into(),
            persist,
            UpdateKind::Dynamic,
            AccessKind::Default,
            RecSource::Default,
            None,
        )
    }

    /// Register a config record from its descriptor.
    pub fn register_config(&self, spec: ConfigSpec) -> Result<RecordHandle> {
        let ConfigSpec {
            name,
            default,
            update,
            access,
            source,
            check,
        } = spec;
        self.register_inner(
            RecClass::Config,
            &name,
            default,
            PersistKind::Transient,
            update,
            access,
            source,
            check,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn register_inner(
        &self,
        class: RecClass,
        name: &str,
        default: RecValue,
        persist: PersistKind,
        update: UpdateKind,
        access: AccessKind,
        source: RecSource,
        check: Option<CheckRule>,
    ) -> Result<RecordHandle> {
        let kind = default.kind();
        // Clone the Arc out of the map before taking the record lock; the
        // shard guard must not be held across it.
        let cell = match self.records.entry(name.to_string()) {
            Entry::Vacant(slot) => {
                let cell = Arc::new(RecordCell {
                    name: Arc::from(name),
                    state: RwLock::new(RecordState {
                        class,
                        value: default.clone(),
                        default,
                        persist,
                        update,
                        access,
                        check,
                        source,
                        sync_required: false,
                        registered: true,
                        ingested: false,
                        links: SmallVec::new(),
                        subscribers: SmallVec::new(),
                    }),
                });
                slot.insert(cell.clone());
                return Ok(RecordHandle { cell });
            }
            Entry::Occupied(slot) => slot.get().clone(),
        };

        let mut state = cell.state.write();
        if state.registered {
            // Idempotent on matching kind and class; anything else is a
            // conflict and the original record is left untouched.
            if state.class != class || state.value.kind() != kind {
                return Err(RecError::TypeConflict {
                    name: name.to_string(),
                    have: state.value.kind(),
                    want: kind,
                });
            }
        } else if state.value.kind() == kind {
            // Provisional record seeded by restore or ingestion: adopt the
            // registration's definition but keep the seeded current value.
            // This is how persisted counters survive a restart that restores
            // before the owning subsystem registers.
            state.class = class;
            state.default = default;
            state.persist = persist;
            state.update = update;
            state.access = access;
            state.check = check;
            state.registered = true;
        } else {
            // Stale seed of a different kind; the registration wins outright.
            warn!(
                "discarding stale seeded value for {} ({} -> {})",
                name,
                state.value.kind(),
                kind
            );
            if state.sync_required {
                self.dirty.fetch_sub(1, Ordering::Relaxed);
            }
            state.class = class;
            state.value = default.clone();
            state.default = default;
            state.persist = persist;
            state.update = update;
            state.access = access;
            state.check = check;
            state.source = source;
            state.sync_required = false;
            state.registered = true;
        }
        drop(state);
        Ok(RecordHandle { cell })
    }

    /// Seed a record from restore or ingestion without claiming registration.
    ///
    /// An existing record (registered or not) takes the value through the
    /// normal Set path, so links and callbacks already bound fire. An unknown
    /// name creates a provisional record whose definition a later subsystem
    /// registration will upgrade in place.
    pub(crate) fn seed(
        &self,
        class: RecClass,
        name: &str,
        value: RecValue,
        persist: PersistKind,
        source: RecSource,
    ) -> Result<RecordHandle> {
        let cell = match self.records.entry(name.to_string()) {
            Entry::Vacant(slot) => {
                let cell = Arc::new(RecordCell {
                    name: Arc::from(name),
                    state: RwLock::new(RecordState {
                        class,
                        value: value.clone(),
                        default: value,
                        persist,
                        update: UpdateKind::Dynamic,
                        access: AccessKind::Default,
                        check: None,
                        source,
                        sync_required: false,
                        registered: false,
                        ingested: false,
                        links: SmallVec::new(),
                        subscribers: SmallVec::new(),
                    }),
                });
                slot.insert(cell.clone());
                return Ok(RecordHandle { cell });
            }
            Entry::Occupied(slot) => slot.get().clone(),
        };

        let mut state = cell.state.write();
        apply_locked(&cell.name, &mut state, &self.dirty, value, source, true)?;
        drop(state);
        Ok(RecordHandle { cell })
    }

    // ========================================================================
    // Lookup and typed reads
    // ========================================================================

    fn cell(&self, name: &str) -> Option<Arc<RecordCell>> {
        self.records.get(name).map(|entry| entry.value().clone())
    }

    /// Read-only, lock-light lookup.
    pub fn lookup(&self, name: &str) -> Option<RecordHandle> {
        self.cell(name).map(|cell| RecordHandle { cell })
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        let cell = self.cell(name)?;
        let state = cell.state.read();
        state.value.as_int()
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        let cell = self.cell(name)?;
        let state = cell.state.read();
        state.value.as_float()
    }

    pub fn get_counter(&self, name: &str) -> Option<i64> {
        let cell = self.cell(name)?;
        let state = cell.state.read();
        state.value.as_counter()
    }

    /// Allocating string read: an owned copy of the stored value.
    pub fn get_string(&self, name: &str) -> Option<Arc<str>> {
        let cell = self.cell(name)?;
        let state = cell.state.read();
        state.value.as_str().cloned()
    }

    /// Bounded-buffer string read. Copies as much of the stored value as
    /// fits, cutting only at a char boundary; content is byte-identical to
    /// [`RecordStore::get_string`] up to the copied length.
    pub fn get_string_into(&self, name: &str, buf: &mut [u8]) -> Option<StrCopy> {
        let value = self.get_string(name)?;
        let bytes = value.as_bytes();
        if bytes.len() <= buf.len() {
            buf[..bytes.len()].copy_from_slice(bytes);
            return Some(StrCopy {
                len: bytes.len(),
                truncated: false,
            });
        }
        let mut cut = buf.len();
        while !value.is_char_boundary(cut) {
            cut -= 1;
        }
        buf[..cut].copy_from_slice(&bytes[..cut]);
        Some(StrCopy {
            len: cut,
            truncated: true,
        })
    }

    // ========================================================================
    // Typed writes
    // ========================================================================

    fn set_value(&self, name: &str, value: RecValue, source: RecSource) -> Result<()> {
        let cell = self
            .cell(name)
            .ok_or_else(|| RecError::NotFound(name.to_string()))?;
        let mut state = cell.state.write();
        apply_locked(&cell.name, &mut state, &self.dirty, value, source, true)?;
        Ok(())
    }

    pub fn set_int(&self, name: &str, v: i64, source: RecSource) -> Result<()> {
        self.set_value(name, RecValue::Int(v), source)
    }

    pub fn set_float(&self, name: &str, v: f64, source: RecSource) -> Result<()> {
        self.set_value(name, RecValue::Float(v), source)
    }

    pub fn set_counter(&self, name: &str, v: i64, source: RecSource) -> Result<()> {
        self.set_value(name, RecValue::Counter(v), source)
    }

    pub fn set_string(&self, name: &str, v: &str, source: RecSource) -> Result<()> {
        self.set_value(name, RecValue::from(v), source)
    }

    /// Add `delta` to an integer record. The read-modify-write is serialized
    /// on the record lock, so concurrent increments never lose updates.
    pub fn incr_int(&self, name: &str, delta: i64) -> Result<i64> {
        let cell = self
            .cell(name)
            .ok_or_else(|| RecError::NotFound(name.to_string()))?;
        let mut state = cell.state.write();
        let current = state.value.as_int().ok_or_else(|| RecError::TypeConflict {
            name: name.to_string(),
            have: state.value.kind(),
            want: ValueKind::Int,
        })?;
        let next = current.wrapping_add(delta);
        apply_locked(
            &cell.name,
            &mut state,
            &self.dirty,
            RecValue::Int(next),
            RecSource::Explicit,
            true,
        )?;
        Ok(next)
    }

    /// Add `delta` to a counter record, serialized on the record lock.
    pub fn incr_counter(&self, name: &str, delta: i64) -> Result<i64> {
        let cell = self
            .cell(name)
            .ok_or_else(|| RecError::NotFound(name.to_string()))?;
        let mut state = cell.state.write();
        let current = state
            .value
            .as_counter()
            .ok_or_else(|| RecError::TypeConflict {
                name: name.to_string(),
                have: state.value.kind(),
                want: ValueKind::Counter,
            })?;
        let next = current.wrapping_add(delta);
        apply_locked(
            &cell.name,
            &mut state,
            &self.dirty,
            RecValue::Counter(next),
            RecSource::Explicit,
            true,
        )?;
        Ok(next)
    }

    /// Restore the registration-time default through the normal Set path.
    pub fn reset(&self, name: &str) -> Result<()> {
        let cell = self
            .cell(name)
            .ok_or_else(|| RecError::NotFound(name.to_string()))?;
        let mut state = cell.state.write();
        let default = state.default.clone();
        apply_locked(
            &cell.name,
            &mut state,
            &self.dirty,
            default,
            RecSource::Default,
            true,
        )?;
        Ok(())
    }

    /// Force a persistent record into the next flush even though its value
    /// did not change through this store (e.g. a linked cell was bumped
    /// directly by its owner).
    pub fn mark_sync_required(&self, name: &str) -> Result<()> {
        let cell = self
            .cell(name)
            .ok_or_else(|| RecError::NotFound(name.to_string()))?;
        let mut state = cell.state.write();
        if state.persist == PersistKind::Persistent && !state.sync_required {
            state.sync_required = true;
            self.dirty.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    pub(crate) fn clear_sync_required(&self, handle: &RecordHandle) {
        let mut state = handle.cell.state.write();
        if state.sync_required {
            state.sync_required = false;
            self.dirty.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Number of records currently awaiting a persistence flush.
    pub fn dirty_count(&self) -> u64 {
        self.dirty.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Links
    // ========================================================================

    fn attach(&self, name: &str, link: Link) -> Result<()> {
        let cell = self
            .cell(name)
            .ok_or_else(|| RecError::NotFound(name.to_string()))?;
        let mut state = cell.state.write();
        if state.value.kind() != link.kind() {
            return Err(RecError::TypeConflict {
                name: name.to_string(),
                have: state.value.kind(),
                want: link.kind(),
            });
        }
        // First sync happens under the record lock so no Set interleaves
        // between the bind and the initial write.
        link.store(&state.value);
        state.links.push(link);
        Ok(())
    }

    /// Bind an integer mirror. The current value is written into the cell
    /// immediately; every later successful Set overwrites it before the Set
    /// returns. There is no unlink.
    pub fn link_int(&self, name: &str, target: Arc<IntCell>) -> Result<()> {
        self.attach(name, Link::Int(target))
    }

    pub fn link_float(&self, name: &str, target: Arc<FloatCell>) -> Result<()> {
        self.attach(name, Link::Float(target))
    }

    pub fn link_counter(&self, name: &str, target: Arc<CounterCell>) -> Result<()> {
        self.attach(name, Link::Counter(target))
    }

    pub fn link_string(&self, name: &str, target: Arc<StrCell>) -> Result<()> {
        self.attach(name, Link::Str(target))
    }

    /// Allocate, link, and return an integer mirror holding the current
    /// value. The usual way a subsystem establishes a static config binding.
    pub fn bind_int(&self, name: &str) -> Result<Arc<IntCell>> {
        let target = Arc::new(IntCell::default());
        self.link_int(name, target.clone())?;
        Ok(target)
    }

    pub fn bind_float(&self, name: &str) -> Result<Arc<FloatCell>> {
        let target = Arc::new(FloatCell::default());
        self.link_float(name, target.clone())?;
        Ok(target)
    }

    pub fn bind_counter(&self, name: &str) -> Result<Arc<CounterCell>> {
        let target = Arc::new(CounterCell::default());
        self.link_counter(name, target.clone())?;
        Ok(target)
    }

    pub fn bind_string(&self, name: &str) -> Result<Arc<StrCell>> {
        let target = Arc::new(StrCell::default());
        self.link_string(name, target.clone())?;
        Ok(target)
    }

    // ========================================================================
    // Enumeration
    // ========================================================================

    /// Handles to every record, in no particular order.
    pub fn handles(&self) -> Vec<RecordHandle> {
        self.records
            .iter()
            .map(|entry| RecordHandle {
                cell: entry.value().clone(),
            })
            .collect()
    }

    /// Handles to every record whose name starts with `prefix`.
    pub fn handles_with_prefix(&self, prefix: &str) -> Vec<RecordHandle> {
        self.records
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| RecordHandle {
                cell: entry.value().clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The Set critical section, entered with the record's write lock held.
///
/// Returns whether the value actually changed. When `notify` is false the
/// subscriber pass is skipped; that is the re-entrant path used by
/// [`UpdateScope`] so a callback's own writes cannot recurse.
pub(crate) fn apply_locked(
    name: &Arc<str>,
    state: &mut RecordState,
    dirty: &AtomicU64,
    value: RecValue,
    source: RecSource,
    notify: bool,
) -> Result<bool> {
    if state.value.kind() != value.kind() {
        return Err(RecError::TypeConflict {
            name: name.to_string(),
            have: state.value.kind(),
            want: value.kind(),
        });
    }
    if let Some(rule) = &state.check {
        if !rule.validate(&value) {
            return Err(RecError::ValidationFailed {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    let changed = !state.value.same_value(&value);
    state.source = source;
    if !changed {
        return Ok(false);
    }

    state.value = value;
    if state.persist == PersistKind::Persistent && !state.sync_required {
        state.sync_required = true;
        dirty.fetch_add(1, Ordering::Relaxed);
    }
    for link in &state.links {
        link.store(&state.value);
    }

    if notify && !state.subscribers.is_empty() {
        // Clone the Arc list so a callback appending a subscriber through a
        // handle it captured cannot invalidate the iteration.
        let subscribers: SmallVec<[UpdateCb; 2]> = state.subscribers.clone();
        for callback in subscribers {
            let mut scope = UpdateScope::new(name, state, dirty);
            callback(&mut scope);
        }
    }
    Ok(true)
}
