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

//! End-to-end registry scenarios
//!
//! Full lifecycle flows across registration, linking, validation,
//! persistence, and ingestion, the way the surrounding server drives them:
//! restore at bootstrap, subsystems register and bind, workers hammer the
//! store, a flush captures state for the next incarnation.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use recdb_core::check::{CheckKind, CheckRule};
use recdb_core::error::RecError;
use recdb_core::record::{ConfigSpec, PersistKind, RecClass, RecSource};
use recdb_core::value::{RecValue, ValueKind};
use recdb_store::{ingest, snapshot, NoEnvOverride, RecordStore, StreamEntry};

#[test]
fn persisted_counter_survives_concurrent_increments_and_restart() {
    let dir = TempDir::new().unwrap();
    let snap = dir.path().join(snapshot::SNAPSHOT_FILENAME);

    let store = RecordStore::new();
    store
        .register_stat(
            "proxy.process.http.completed_requests",
            0i64,
            PersistKind::Persistent,
        )
        .unwrap();
    store
        .set_int(
            "proxy.process.http.completed_requests",
            41,
            RecSource::Explicit,
        )
        .unwrap();

    // Two workers each add one; the record lock serializes the
    // read-modify-write, so neither increment is lost.
    let mut workers = Vec::new();
    for _ in 0..2 {
        let store = store.clone();
        workers.push(thread::spawn(move || {
            store
                .incr_int("proxy.process.http.completed_requests", 1)
                .unwrap();
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(
        store.get_int("proxy.process.http.completed_requests"),
        Some(43)
    );

    snapshot::flush(&store, &snap).unwrap();

    // Process restart: fresh store, restore before the subsystem registers.
    let fresh = RecordStore::new();
    snapshot::restore(&fresh, &snap).unwrap();
    fresh
        .register_stat(
            "proxy.process.http.completed_requests",
            0i64,
            PersistKind::Persistent,
        )
        .unwrap();
    assert_eq!(
        fresh.get_int("proxy.process.http.completed_requests"),
        Some(43)
    );
}

#[test]
fn checked_config_keeps_link_consistent_through_rejection() {
    let store = RecordStore::new();
    store
        .register_config(
            ConfigSpec::new("proxy.config.http.origin_max_connections_queue", "0")
                .with_check(CheckRule::new(CheckKind::Int, "^[0-9]+$").unwrap()),
        )
        .unwrap();

    let mirror = store
        .bind_string("proxy.config.http.origin_max_connections_queue")
        .unwrap();
    assert_eq!(mirror.get().as_ref(), "0");

    store
        .set_string(
            "proxy.config.http.origin_max_connections_queue",
            "100",
            RecSource::Explicit,
        )
        .unwrap();
    assert_eq!(mirror.get().as_ref(), "100");

    let err = store
        .set_string(
            "proxy.config.http.origin_max_connections_queue",
            "abc",
            RecSource::Explicit,
        )
        .unwrap_err();
    assert!(matches!(err, RecError::ValidationFailed { .. }));
    assert_eq!(mirror.get().as_ref(), "100");
    assert_eq!(
        store
            .get_string("proxy.config.http.origin_max_connections_queue")
            .unwrap()
            .as_ref(),
        "100"
    );
}

#[test]
fn linked_cells_agree_with_store_under_contention() {
    let store = RecordStore::new();
    store
        .register_stat(
            "proxy.process.net.accepts",
            RecValue::Counter(0),
            PersistKind::Transient,
        )
        .unwrap();
    let mirror = store.bind_counter("proxy.process.net.accepts").unwrap();

    let mut workers = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        workers.push(thread::spawn(move || {
            for _ in 0..250 {
                store.incr_counter("proxy.process.net.accepts", 1).unwrap();
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(store.get_counter("proxy.process.net.accepts"), Some(1000));
    assert_eq!(mirror.get(), 1000);
}

#[test]
fn ingestion_then_registration_bootstrap_flow() {
    let store = RecordStore::new();

    // Config file parsed before subsystems start.
    let entries = vec![
        StreamEntry {
            class: RecClass::Config,
            kind: ValueKind::Int,
            name: "proxy.config.http.keep_alive_enabled".to_string(),
            text: "0".to_string(),
            source: RecSource::Explicit,
        },
        StreamEntry {
            class: RecClass::Config,
            kind: ValueKind::Str,
            name: "proxy.config.local_state_dir".to_string(),
            text: "/run/proxy".to_string(),
            source: RecSource::Explicit,
        },
    ];
    let report = ingest::ingest(&store, entries, &NoEnvOverride);
    assert_eq!(report.applied, 2);

    // The HTTP subsystem registers afterwards; the ingested value beats the
    // registration default, and the definition upgrades in place.
    let handle = store
        .register_config(ConfigSpec::new("proxy.config.http.keep_alive_enabled", 1i64))
        .unwrap();
    assert!(handle.is_registered());
    assert_eq!(store.get_int("proxy.config.http.keep_alive_enabled"), Some(0));

    let mirror = store.bind_int("proxy.config.http.keep_alive_enabled").unwrap();
    assert_eq!(mirror.get(), 0);

    // Directory resolution sees the ingested override.
    let layout = recdb_store::Layout::new("/opt/proxy");
    assert_eq!(
        layout.snapshot_path(&store),
        std::path::PathBuf::from("/run/proxy/records.snap")
    );
}

#[test]
fn many_threads_mixed_readers_and_writers() {
    let store = RecordStore::new();
    store
        .register_config(ConfigSpec::new("proxy.config.net.poll_timeout", 10i64))
        .unwrap();
    store
        .register_stat(
            "proxy.process.net.read_bytes",
            RecValue::Counter(0),
            PersistKind::Transient,
        )
        .unwrap();

    let mut workers = Vec::new();
    for worker_id in 0..8 {
        let store: Arc<RecordStore> = store.clone();
        workers.push(thread::spawn(move || {
            for i in 0..200i64 {
                if worker_id % 2 == 0 {
                    store
                        .incr_counter("proxy.process.net.read_bytes", 1)
                        .unwrap();
                    store
                        .set_int("proxy.config.net.poll_timeout", i % 50, RecSource::Explicit)
                        .unwrap();
                } else {
                    // Readers must always see a committed value.
                    let v = store.get_int("proxy.config.net.poll_timeout").unwrap();
                    assert!((0..50).contains(&v) || v == 10);
                    assert!(store.get_counter("proxy.process.net.read_bytes").is_some());
                }
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(
        store.get_counter("proxy.process.net.read_bytes"),
        Some(4 * 200)
    );
}
