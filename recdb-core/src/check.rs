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

//! Validation rules attached to config records
//!
//! A record may carry a check rule fixed at registration. Every Set renders
//! the incoming value to text and matches it against the rule's pattern; a
//! mismatch rejects the Set with `ValidationFailed` and the prior value is
//! retained.

use regex::Regex;

use crate::error::{RecError, Result};
use crate::value::RecValue;

/// What shape of text the pattern is meant to admit.
///
/// Recorded for callers (UI, admin dumps); the store only runs the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Arbitrary string constrained by the pattern.
    Str,
    /// Integer-shaped text.
    Int,
    /// IP address-shaped text.
    Ip,
}

/// A compiled validation rule.
#[derive(Debug, Clone)]
pub struct CheckRule {
    kind: CheckKind,
    expr: Regex,
}

impl CheckRule {
    /// Compile a rule from its pattern. An uncompilable pattern is a
    /// configuration defect, reported as `MalformedEntry`.
    pub fn new(kind: CheckKind, pattern: &str) -> Result<CheckRule> {
        let expr = Regex::new(pattern)
            .map_err(|e| RecError::MalformedEntry(format!("bad check pattern {:?}: {}", pattern, e)))?;
        Ok(CheckRule { kind, expr })
    }

    pub fn kind(&self) -> CheckKind {
        self.kind
    }

    pub fn pattern(&self) -> &str {
        self.expr.as_str()
    }

    /// Match the value's rendered text against the pattern.
    pub fn validate(&self, value: &RecValue) -> bool {
        self.expr.is_match(&value.to_string())
    }
}
