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

//! Configuration stream ingestion
//!
//! The bridge between the external configuration parser and the record
//! store. The textual grammar is not this crate's business: the parser
//! hands over a sequence of [`StreamEntry`] values, one per configuration
//! line, and this layer registers and sets records from them.
//!
//! Before each Set the environment override hook is consulted; an override
//! replaces the parsed value and stamps `RecSource::Env`, which is how
//! `PROXY_CONFIG_HTTP_SERVER_PORTS=80` beats the config file without
//! editing it.

use std::env;

use tracing::warn;

use recdb_core::record::{PersistKind, RecClass, RecSource};
use recdb_core::value::{RecValue, ValueKind};

use crate::store::RecordStore;

/// One entry of the external configuration stream.
#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub class: RecClass,
    pub kind: ValueKind,
    pub name: String,
    pub text: String,
    pub source: RecSource,
}

/// Hook deciding whether the process environment overrides a parsed value.
pub trait EnvOverride {
    /// Return the substitute value for `name`, or `None` to keep `current`.
    fn value_for(&self, name: &str, current: &str) -> Option<String>;
}

/// The standard transformation: uppercase the record name and replace dots
/// with underscores, then look that variable up in the process environment.
/// `proxy.config.http.server_ports` reads `PROXY_CONFIG_HTTP_SERVER_PORTS`.
#[derive(Debug, Default)]
pub struct StdEnvOverride;

impl StdEnvOverride {
    pub fn variable_name(record_name: &str) -> String {
        record_name.to_uppercase().replace('.', "_")
    }
}

impl EnvOverride for StdEnvOverride {
    fn value_for(&self, name: &str, _current: &str) -> Option<String> {
        env::var(Self::variable_name(name)).ok()
    }
}

/// Hook that never overrides; for tests and embedded use.
#[derive(Debug, Default)]
pub struct NoEnvOverride;

impl EnvOverride for NoEnvOverride {
    fn value_for(&self, _name: &str, _current: &str) -> Option<String> {
        None
    }
}

/// Outcome of one ingestion pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Entries registered/applied.
    pub applied: usize,
    /// Entries dropped (unparseable value, kind conflict, failed check).
    pub skipped: usize,
}

/// Drive registration and Set calls from a parsed configuration stream.
///
/// An unknown name is registered provisionally with the entry as its
/// definition; a later subsystem registration upgrades it in place. A known
/// name takes the value through the normal Set path, so links and callbacks
/// fire. Entries that fail to parse or to validate are skipped with a
/// diagnostic and counted; ingestion always continues.
pub fn ingest<I>(store: &RecordStore, entries: I, env: &dyn EnvOverride) -> IngestReport
where
    I: IntoIterator<Item = StreamEntry>,
{
    let mut report = IngestReport::default();
    for entry in entries {
        let (text, source) = match env.value_for(&entry.name, &entry.text) {
            Some(substitute) => (substitute, RecSource::Env),
            None => (entry.text, entry.source),
        };
        let value = match RecValue::parse(entry.kind, &text) {
            Ok(value) => value,
            Err(e) => {
                warn!("ignoring config entry {}: {}", entry.name, e);
                // The stream did mention this name; a registered record with
                // a bad value keeps its prior value but is not "missing".
                if let Some(handle) = store.lookup(&entry.name) {
                    handle.mark_ingested();
                }
                report.skipped += 1;
                continue;
            }
        };
        match store.seed(
            entry.class,
            &entry.name,
            value,
            PersistKind::Transient,
            source,
        ) {
            Ok(handle) => {
                handle.mark_ingested();
                report.applied += 1;
            }
            Err(e) => {
                warn!("ignoring config entry {}: {}", entry.name, e);
                if let Some(handle) = store.lookup(&entry.name) {
                    handle.mark_ingested();
                }
                report.skipped += 1;
            }
        }
    }
    report
}

/// One-shot consistency check after ingestion: config records registered by
/// subsystems that the configuration stream never mentioned. Informational;
/// such records simply stay at their defaults.
pub fn warn_unregistered(store: &RecordStore) -> Vec<String> {
    let mut missing: Vec<String> = store
        .handles()
        .into_iter()
        .filter(|h| h.class() == RecClass::Config && h.is_registered() && !h.is_ingested())
        .map(|h| h.name().to_string())
        .collect();
    missing.sort();
    if !missing.is_empty() {
        warn!(
            "{} config records not present in the configuration stream: {}",
            missing.len(),
            missing.join(", ")
        );
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use recdb_core::check::{CheckKind, CheckRule};
    use recdb_core::record::ConfigSpec;

    fn config_entry(name: &str, kind: ValueKind, text: &str) -> StreamEntry {
        StreamEntry {
            class: RecClass::Config,
            kind,
            name: name.to_string(),
            text: text.to_string(),
            source: RecSource::Explicit,
        }
    }

    #[test]
    fn test_stream_defines_unknown_records() {
        let store = RecordStore::new();
        let report = ingest(
            &store,
            vec![
                config_entry("proxy.config.http.server_ports", ValueKind::Str, "8080"),
                config_entry("proxy.config.net.poll_timeout", ValueKind::Int, " 30 "),
            ],
            &NoEnvOverride,
        );
        assert_eq!(report, IngestReport { applied: 2, skipped: 0 });
        assert_eq!(
            store
                .get_string("proxy.config.http.server_ports")
                .unwrap()
                .as_ref(),
            "8080"
        );
        assert_eq!(store.get_int("proxy.config.net.poll_timeout"), Some(30));
        // Stream-defined records are provisional until a subsystem claims them.
        assert!(!store
            .lookup("proxy.config.net.poll_timeout")
            .unwrap()
            .is_registered());
    }

    #[test]
    fn test_stream_overrides_registered_default() {
        let store = RecordStore::new();
        store
            .register_config(ConfigSpec::new("proxy.config.net.poll_timeout", 10i64))
            .unwrap();
        ingest(
            &store,
            vec![config_entry("proxy.config.net.poll_timeout", ValueKind::Int, "50")],
            &NoEnvOverride,
        );
        assert_eq!(store.get_int("proxy.config.net.poll_timeout"), Some(50));
        let handle = store.lookup("proxy.config.net.poll_timeout").unwrap();
        assert!(handle.is_registered());
        assert_eq!(handle.source(), RecSource::Explicit);
    }

    struct FixedOverride(&'static str, &'static str);

    impl EnvOverride for FixedOverride {
        fn value_for(&self, name: &str, _current: &str) -> Option<String> {
            (name == self.0).then(|| self.1.to_string())
        }
    }

    #[test]
    fn test_env_override_wins_and_stamps_source() {
        let store = RecordStore::new();
        ingest(
            &store,
            vec![config_entry("proxy.config.net.poll_timeout", ValueKind::Int, "30")],
            &FixedOverride("proxy.config.net.poll_timeout", "99"),
        );
        assert_eq!(store.get_int("proxy.config.net.poll_timeout"), Some(99));
        assert_eq!(
            store.lookup("proxy.config.net.poll_timeout").unwrap().source(),
            RecSource::Env
        );
    }

    #[test]
    fn test_std_override_variable_name() {
        assert_eq!(
            StdEnvOverride::variable_name("proxy.config.http.server_ports"),
            "PROXY_CONFIG_HTTP_SERVER_PORTS"
        );
    }

    #[test]
    fn test_bad_entries_skipped_and_counted() {
        let store = RecordStore::new();
        store
            .register_config(
                ConfigSpec::new("proxy.config.http.retries", 3i64)
                    .with_check(CheckRule::new(CheckKind::Int, "^[0-9]$").unwrap()),
            )
            .unwrap();
        let report = ingest(
            &store,
            vec![
                config_entry("proxy.config.http.retries", ValueKind::Int, "not-a-number"),
                // Parses but fails the single-digit check.
                config_entry("proxy.config.http.retries", ValueKind::Int, "42"),
                config_entry("proxy.config.http.retries", ValueKind::Int, "7"),
            ],
            &NoEnvOverride,
        );
        assert_eq!(report, IngestReport { applied: 1, skipped: 2 });
        assert_eq!(store.get_int("proxy.config.http.retries"), Some(7));
    }

    #[test]
    fn test_kind_conflict_skipped() {
        let store = RecordStore::new();
        store
            .register_config(ConfigSpec::new("proxy.config.hostname", "localhost"))
            .unwrap();
        let report = ingest(
            &store,
            vec![config_entry("proxy.config.hostname", ValueKind::Int, "1")],
            &NoEnvOverride,
        );
        assert_eq!(report.skipped, 1);
        assert_eq!(store.get_string("proxy.config.hostname").unwrap().as_ref(), "localhost");
    }

    #[test]
    fn test_warn_unregistered_lists_untouched_configs() {
        let store = RecordStore::new();
        store
            .register_config(ConfigSpec::new("proxy.config.a", 1i64))
            .unwrap();
        store
            .register_config(ConfigSpec::new("proxy.config.b", 2i64))
            .unwrap();
        store
            .register_stat("proxy.process.c", 3i64, PersistKind::Transient)
            .unwrap();
        ingest(
            &store,
            vec![config_entry("proxy.config.a", ValueKind::Int, "5")],
            &NoEnvOverride,
        );
        assert_eq!(warn_unregistered(&store), vec!["proxy.config.b".to_string()]);
    }

    #[test]
    fn test_bad_valued_entry_still_counts_as_seen() {
        let store = RecordStore::new();
        store
            .register_config(
                ConfigSpec::new("proxy.config.http.retries", 3i64)
                    .with_check(CheckRule::new(CheckKind::Int, "^[0-9]$").unwrap()),
            )
            .unwrap();
        store
            .register_config(ConfigSpec::new("proxy.config.hostname", "localhost"))
            .unwrap();
        let report = ingest(
            &store,
            vec![
                // Unparseable value for a registered record.
                config_entry("proxy.config.http.retries", ValueKind::Int, "not-a-number"),
                // Kind conflict with the registered record.
                config_entry("proxy.config.hostname", ValueKind::Int, "1"),
            ],
            &NoEnvOverride,
        );
        assert_eq!(report, IngestReport { applied: 0, skipped: 2 });
        // Both records keep their prior values but appeared in the stream,
        // so neither is reported missing.
        assert_eq!(store.get_int("proxy.config.http.retries"), Some(3));
        assert!(warn_unregistered(&store).is_empty());
    }
}
