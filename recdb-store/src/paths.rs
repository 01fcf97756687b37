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

//! Installation directory layout
//!
//! The process directories (config, runtime state, logs, binaries, plugins)
//! default to subdirectories of the installation prefix and may each be
//! overridden by a config record. Relative overrides resolve against the
//! prefix.
//!
//! Bootstrap order matters: the override records have to be registered and
//! ingested before any directory other than the config directory is
//! resolved. The config directory therefore never consults the store; it is
//! where the configuration comes from in the first place.

use std::path::{Path, PathBuf};

use crate::snapshot::SNAPSHOT_FILENAME;
use crate::store::RecordStore;

/// Record overriding the runtime-state directory.
pub const LOCAL_STATE_DIR: &str = "proxy.config.local_state_dir";
/// Record overriding the log directory.
pub const LOG_DIR: &str = "proxy.config.log.logfile_dir";
/// Record overriding the bin directory.
pub const BIN_PATH: &str = "proxy.config.bin_path";
/// Record overriding the plugin directory.
pub const PLUGIN_DIR: &str = "proxy.config.plugin.plugin_dir";

/// Resolver for the process's directory layout.
#[derive(Debug, Clone)]
pub struct Layout {
    prefix: PathBuf,
    sysconf_dir: PathBuf,
    runtime_dir: PathBuf,
    log_dir: PathBuf,
    bin_dir: PathBuf,
    plugin_dir: PathBuf,
}

impl Layout {
    /// Default layout under an installation prefix.
    pub fn new(prefix: impl Into<PathBuf>) -> Layout {
        let prefix = prefix.into();
        Layout {
            sysconf_dir: prefix.join("etc"),
            runtime_dir: prefix.join("var"),
            log_dir: prefix.join("var").join("log"),
            bin_dir: prefix.join("bin"),
            plugin_dir: prefix.join("libexec"),
            prefix,
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// The configuration directory. Never consults records: configuration
    /// has to be found before any record exists.
    pub fn config_dir(&self) -> &Path {
        &self.sysconf_dir
    }

    fn resolve(&self, store: &RecordStore, record: &str, default: &Path) -> PathBuf {
        match store.get_string(record) {
            Some(dir) if !dir.is_empty() => {
                let dir = Path::new(dir.as_ref());
                if dir.is_absolute() {
                    dir.to_path_buf()
                } else {
                    self.prefix.join(dir)
                }
            }
            _ => default.to_path_buf(),
        }
    }

    /// Runtime-state directory, honoring `proxy.config.local_state_dir`.
    pub fn runtime_dir(&self, store: &RecordStore) -> PathBuf {
        self.resolve(store, LOCAL_STATE_DIR, &self.runtime_dir)
    }

    /// Log directory, honoring `proxy.config.log.logfile_dir`.
    pub fn log_dir(&self, store: &RecordStore) -> PathBuf {
        self.resolve(store, LOG_DIR, &self.log_dir)
    }

    /// Bin directory, honoring `proxy.config.bin_path`.
    pub fn bin_dir(&self, store: &RecordStore) -> PathBuf {
        self.resolve(store, BIN_PATH, &self.bin_dir)
    }

    /// Plugin directory, honoring `proxy.config.plugin.plugin_dir`.
    pub fn plugin_dir(&self, store: &RecordStore) -> PathBuf {
        self.resolve(store, PLUGIN_DIR, &self.plugin_dir)
    }

    /// Resolve a configuration file whose relative path is held in the
    /// record named `file_variable`, against the config directory. Falls
    /// back to `default`; `None` when neither names a file.
    pub fn config_path(
        &self,
        store: &RecordStore,
        file_variable: &str,
        default: Option<&str>,
    ) -> Option<PathBuf> {
        let name = match store.get_string(file_variable) {
            Some(value) if !value.is_empty() => value.to_string(),
            _ => default?.to_string(),
        };
        let name = Path::new(&name);
        if name.is_absolute() {
            Some(name.to_path_buf())
        } else {
            Some(self.sysconf_dir.join(name))
        }
    }

    /// Where the persistent record snapshot lives: `records.snap` under the
    /// runtime-state directory.
    pub fn snapshot_path(&self, store: &RecordStore) -> PathBuf {
        self.runtime_dir(store).join(SNAPSHOT_FILENAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recdb_core::record::{ConfigSpec, RecSource};

    #[test]
    fn test_defaults_under_prefix() {
        let layout = Layout::new("/opt/proxy");
        let store = RecordStore::new();
        assert_eq!(layout.config_dir(), Path::new("/opt/proxy/etc"));
        assert_eq!(layout.runtime_dir(&store), Path::new("/opt/proxy/var"));
        assert_eq!(layout.log_dir(&store), Path::new("/opt/proxy/var/log"));
        assert_eq!(layout.bin_dir(&store), Path::new("/opt/proxy/bin"));
        assert_eq!(layout.plugin_dir(&store), Path::new("/opt/proxy/libexec"));
    }

    #[test]
    fn test_absolute_and_relative_overrides() {
        let layout = Layout::new("/opt/proxy");
        let store = RecordStore::new();
        store
            .register_config(ConfigSpec::new(LOCAL_STATE_DIR, "/run/proxy"))
            .unwrap();
        store
            .register_config(ConfigSpec::new(LOG_DIR, "logs"))
            .unwrap();
        assert_eq!(layout.runtime_dir(&store), Path::new("/run/proxy"));
        assert_eq!(layout.log_dir(&store), Path::new("/opt/proxy/logs"));
    }

    #[test]
    fn test_empty_override_falls_back() {
        let layout = Layout::new("/opt/proxy");
        let store = RecordStore::new();
        store
            .register_config(ConfigSpec::new(BIN_PATH, ""))
            .unwrap();
        assert_eq!(layout.bin_dir(&store), Path::new("/opt/proxy/bin"));
    }

    #[test]
    fn test_config_path_resolution() {
        let layout = Layout::new("/opt/proxy");
        let store = RecordStore::new();
        store
            .register_config(ConfigSpec::new("proxy.config.log.config.filename", ""))
            .unwrap();

        // Record empty: fall back to the default, relative to sysconfdir.
        assert_eq!(
            layout.config_path(&store, "proxy.config.log.config.filename", Some("logging.yaml")),
            Some(PathBuf::from("/opt/proxy/etc/logging.yaml"))
        );
        // No record, no default.
        assert_eq!(layout.config_path(&store, "proxy.config.nope", None), None);

        store
            .set_string(
                "proxy.config.log.config.filename",
                "/etc/proxy/logging.yaml",
                RecSource::Explicit,
            )
            .unwrap();
        assert_eq!(
            layout.config_path(&store, "proxy.config.log.config.filename", Some("logging.yaml")),
            Some(PathBuf::from("/etc/proxy/logging.yaml"))
        );
    }

    #[test]
    fn test_snapshot_path_tracks_runtime_override() {
        let layout = Layout::new("/opt/proxy");
        let store = RecordStore::new();
        assert_eq!(
            layout.snapshot_path(&store),
            PathBuf::from("/opt/proxy/var/records.snap")
        );
        store
            .register_config(ConfigSpec::new(LOCAL_STATE_DIR, "/run/proxy"))
            .unwrap();
        assert_eq!(
            layout.snapshot_path(&store),
            PathBuf::from("/run/proxy/records.snap")
        );
    }
}
