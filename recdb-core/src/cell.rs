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

//! Linked cells: externally-owned mirrors of record values
//!
//! A subsystem that reads a config value on every request links a cell to the
//! record and reads the cell instead of going through the registry. The store
//! writes the cell inside the same critical section that changes the record,
//! so a cell read never observes a value older than the last committed Set.
//!
//! Cells are shared, independently synchronized storage: the subsystem holds
//! an `Arc` to the cell for as long as it wants the mirror; the registry
//! holds another. There is no unlink, which is fine because in practice the
//! lifetime of both sides is the process lifetime.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Mirror of an integer record.
#[derive(Debug, Default)]
pub struct IntCell(AtomicI64);

impl IntCell {
    pub fn new(v: i64) -> Self {
        IntCell(AtomicI64::new(v))
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, v: i64) {
        self.0.store(v, Ordering::Release);
    }
}

/// Mirror of a counter record.
#[derive(Debug, Default)]
pub struct CounterCell(AtomicI64);

impl CounterCell {
    pub fn new(v: i64) -> Self {
        CounterCell(AtomicI64::new(v))
    }

    pub fn get(&self) -> i64 {
        self.0.load(Ordering::Acquire)
    }

    pub fn set(&self, v: i64) {
        self.0.store(v, Ordering::Release);
    }
}

/// Mirror of a float record. Stored as the f64 bit pattern so the cell is a
/// single atomic word and NaN payloads survive intact.
#[derive(Debug)]
pub struct FloatCell(AtomicU64);

impl FloatCell {
    pub fn new(v: f64) -> Self {
        FloatCell(AtomicU64::new(v.to_bits()))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Release);
    }
}

impl Default for FloatCell {
    fn default() -> Self {
        FloatCell::new(0.0)
    }
}

/// Mirror of a string record. Readers get a cheap `Arc<str>` clone.
#[derive(Debug)]
pub struct StrCell(RwLock<Arc<str>>);

impl StrCell {
    pub fn new(v: impl Into<Arc<str>>) -> Self {
        StrCell(RwLock::new(v.into()))
    }

    pub fn get(&self) -> Arc<str> {
        self.0.read().clone()
    }

    pub fn set(&self, v: Arc<str>) {
        *self.0.write() = v;
    }
}

impl Default for StrCell {
    fn default() -> Self {
        StrCell::new("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_numeric_cells_round_trip() {
        let i = IntCell::new(i64::MIN);
        assert_eq!(i.get(), i64::MIN);
        i.set(i64::MAX);
        assert_eq!(i.get(), i64::MAX);

        let c = CounterCell::new(0);
        c.set(43);
        assert_eq!(c.get(), 43);
    }

    #[test]
    fn test_float_cell_preserves_nan_bits() {
        let f = FloatCell::new(f64::NAN);
        assert_eq!(f.get().to_bits(), f64::NAN.to_bits());
        f.set(-0.0);
        assert_eq!(f.get().to_bits(), (-0.0f64).to_bits());
    }

    #[test]
    fn test_str_cell() {
        let s = StrCell::new("0");
        assert_eq!(s.get().as_ref(), "0");
        s.set(Arc::from("100"));
        assert_eq!(s.get().as_ref(), "100");
    }

    #[test]
    fn test_cells_shared_across_threads() {
        let cell = Arc::new(IntCell::new(0));
        let writer = {
            let cell = cell.clone();
            thread::spawn(move || {
                for v in 1..=100 {
                    cell.set(v);
                }
            })
        };
        writer.join().unwrap();
        assert_eq!(cell.get(), 100);
    }
}
