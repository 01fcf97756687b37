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

//! Update notification
//!
//! Subscribers attached to a record run synchronously on the setter's
//! thread, inside the record's write section, in registration order, after
//! the value has been validated, stored, and propagated to links.
//!
//! Because the record lock is already held when a callback runs, callbacks
//! never call back into the store for the same record. They receive an
//! [`UpdateScope`] instead, which reads and writes the locked state
//! directly. Writes through the scope validate and propagate to links like
//! any other Set but do not re-enter the subscriber pass, so a callback
//! cannot recurse into itself. The old hazard of "remember to skip the lock
//! you already hold" has no public spelling here.
//!
//! [`RecordStore::enable_dynamic`] unifies the three moments a dynamic
//! variable is loaded: process start, runtime update, and API-driven update.
//! One loader materializes the externally-visible value each time; its
//! changed/unchanged verdict is the sole authority on whether the owner is
//! notified, since the data kind may need semantic comparison the store
//! cannot do (a trimmed string, for example).

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use recdb_core::error::{RecError, Result};
use recdb_core::record::RecSource;
use recdb_core::value::RecValue;

use crate::store::{apply_locked, RecordState, RecordStore};

/// Subscriber invoked after a record's value changes.
pub type UpdateCb = Arc<dyn Fn(&mut UpdateScope<'_>) + Send + Sync>;

/// Loader for a dynamic variable. Applies the record's current value to the
/// externally-visible state and reports whether that state actually changed.
pub type LoadFn = Arc<dyn Fn(&RecValue) -> bool + Send + Sync>;

/// Owner notification for a dynamic variable, fired only on a real change.
pub type NotifyFn = Arc<dyn Fn() + Send + Sync>;

/// A callback's view of the record it was invoked for.
///
/// Borrows the already-locked record state, so everything here runs without
/// further locking and without re-entering notification.
pub struct UpdateScope<'a> {
    name: &'a Arc<str>,
    state: &'a mut RecordState,
    dirty: &'a AtomicU64,
}

impl<'a> UpdateScope<'a> {
    pub(crate) fn new(
        name: &'a Arc<str>,
        state: &'a mut RecordState,
        dirty: &'a AtomicU64,
    ) -> Self {
        UpdateScope { name, state, dirty }
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn value(&self) -> &RecValue {
        &self.state.value
    }

    pub fn source(&self) -> RecSource {
        self.state.source
    }

    fn set_value(&mut self, value: RecValue) -> Result<()> {
        let source = self.state.source;
        apply_locked(self.name, self.state, self.dirty, value, source, false)?;
        Ok(())
    }

    /// Store a new integer value for this record. Validates and syncs links
    /// like a normal Set; subscribers are not re-entered.
    pub fn set_int(&mut self, v: i64) -> Result<()> {
        self.set_value(RecValue::Int(v))
    }

    pub fn set_float(&mut self, v: f64) -> Result<()> {
        self.set_value(RecValue::Float(v))
    }

    pub fn set_counter(&mut self, v: i64) -> Result<()> {
        self.set_value(RecValue::Counter(v))
    }

    pub fn set_string(&mut self, v: &str) -> Result<()> {
        self.set_value(RecValue::from(v))
    }
}

impl RecordStore {
    /// Append an update subscriber to a record.
    ///
    /// No deduplication: registering the same callback twice invokes it once
    /// per registration, in registration order.
    pub fn register_update_callback(&self, name: &str, callback: UpdateCb) -> Result<()> {
        let handle = self
            .lookup(name)
            .ok_or_else(|| RecError::NotFound(name.to_string()))?;
        handle.cell.state.write().subscribers.push(callback);
        Ok(())
    }

    /// Enable a dynamic variable on a record.
    ///
    /// Immediately invokes `load` with the current stored value to prime the
    /// externally-visible state; no notification fires for that call, as it
    /// is a load, not a change. Thereafter every value change invokes `load`
    /// again and, only when it reports the visible state really differed,
    /// `notify`.
    pub fn enable_dynamic(&self, name: &str, load: LoadFn, notify: NotifyFn) -> Result<()> {
        let handle = self
            .lookup(name)
            .ok_or_else(|| RecError::NotFound(name.to_string()))?;
        let mut state = handle.cell.state.write();
        // Prime under the same write acquisition that arms the subscriber,
        // so no Set lands between the initial load and the arming.
        load(&state.value);
        let subscriber: UpdateCb = Arc::new(move |scope: &mut UpdateScope<'_>| {
            if load(scope.value()) {
                notify();
            }
        });
        state.subscribers.push(subscriber);
        Ok(())
    }
}
