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

//! Record metadata model
//!
//! The enumerated attributes every record carries besides its value, plus the
//! builder-style registration descriptor for config records. Stats register
//! through a direct call (name, default, persistence); configs carry enough
//! metadata to warrant a builder.

use serde::{Deserialize, Serialize};

use crate::check::CheckRule;
use crate::value::RecValue;

/// Role of a record: runtime counter/gauge or tunable setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecClass {
    Config,
    Stat,
}

/// Whether the record is included in the on-disk snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistKind {
    Persistent,
    Transient,
}

/// How an update is permitted to take effect.
///
/// Recorded, not enforced: consumers read it to decide whether a change
/// applies live or requires a controlled restart of the affected subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Dynamic,
    Restart,
}

/// Visibility tag consulted by external API boundaries, not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessKind {
    #[default]
    Default,
    NoAccess,
    ReadOnly,
}

/// Provenance of a record's last write. Persisted in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecSource {
    #[default]
    Default,
    Explicit,
    Env,
    Plugin,
}

/// Registration descriptor for a config record.
///
/// ```
/// use recdb_core::record::{ConfigSpec, UpdateKind};
/// use recdb_core::check::{CheckKind, CheckRule};
///
/// let spec = ConfigSpec::new("proxy.config.http.connect_attempts_max_retries", 3i64)
///     .with_update(UpdateKind::Dynamic)
///     .with_check(CheckRule::new(CheckKind::Int, "^[0-9]+$").unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigSpec {
    pub name: String,
    pub default: RecValue,
    pub update: UpdateKind,
    pub access: AccessKind,
    pub source: RecSource,
    pub check: Option<CheckRule>,
}

impl ConfigSpec {
    pub fn new(name: impl Into<String>, default: impl Into<RecValue>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            update: UpdateKind::Dynamic,
            access: AccessKind::Default,
            source: RecSource::Default,
            check: None,
        }
    }

    pub fn with_update(mut self, update: UpdateKind) -> Self {
        self.update = update;
        self
    }

    pub fn with_access(mut self, access: AccessKind) -> Self {
        self.access = access;
        self
    }

    pub fn with_source(mut self, source: RecSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_check(mut self, check: CheckRule) -> Self {
        self.check = Some(check);
        self
    }
}
