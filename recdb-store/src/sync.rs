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

//! Periodic snapshot flushing
//!
//! A background thread that wakes on an interval and flushes dirty
//! persistent records, so counters are not lost to an unclean shutdown.
//! Flushing does blocking file I/O and therefore never runs on a request
//! thread. I/O failures are logged and retried on the next cycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::snapshot;
use crate::store::RecordStore;

struct SyncShared {
    store: Arc<RecordStore>,
    path: PathBuf,
    stop: Mutex<bool>,
    wake: Condvar,
}

impl SyncShared {
    fn run(&self, interval: Duration) {
        loop {
            {
                let mut stopped = self.stop.lock();
                if *stopped {
                    break;
                }
                self.wake.wait_for(&mut stopped, interval);
                if *stopped {
                    break;
                }
            }
            // The stop lock is not held across the flush.
            if let Err(e) = snapshot::flush_if_dirty(&self.store, &self.path) {
                warn!("periodic record sync failed: {}", e);
            }
        }
    }
}

/// Handle to the background sync thread.
///
/// [`SyncAgent::stop`] (also run on drop) signals the thread, joins it, and
/// performs one final flush so shutdown never loses a counter increment.
pub struct SyncAgent {
    shared: Arc<SyncShared>,
    handle: Option<JoinHandle<()>>,
}

impl SyncAgent {
    /// Start flushing `store` to `path` every `interval`.
    pub fn spawn(store: Arc<RecordStore>, path: impl Into<PathBuf>, interval: Duration) -> SyncAgent {
        let shared = Arc::new(SyncShared {
            store,
            path: path.into(),
            stop: Mutex::new(false),
            wake: Condvar::new(),
        });
        let worker = shared.clone();
        let handle = thread::spawn(move || worker.run(interval));
        debug!("record sync agent started, interval {:?}", interval);
        SyncAgent {
            shared,
            handle: Some(handle),
        }
    }

    /// Stop the agent: join the thread and flush one last time.
    pub fn stop(&mut self) {
        {
            let mut stopped = self.shared.stop.lock();
            if *stopped {
                return;
            }
            *stopped = true;
        }
        self.shared.wake.notify_one();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        if let Err(e) = snapshot::flush(&self.shared.store, &self.shared.path) {
            warn!("final record sync failed: {}", e);
        }
    }
}

impl Drop for SyncAgent {
    fn drop(&mut self) {
        self.stop();
    }
}
