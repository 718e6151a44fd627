// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Closed parameter intervals

use serde::Serialize;

/// Closed interval `[min, max]`; empty when `min > max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    pub fn new(a: f64, b: f64) -> Self {
        Self { min: a, max: b }
    }

    /// Interval containing nothing; grows with [`Interval::include`]
    pub fn empty() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn length(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.max - self.min
        }
    }

    pub fn mid(&self) -> f64 {
        0.5 * (self.min + self.max)
    }

    /// Grow to contain `value`
    pub fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.min - tolerance && value <= self.max + tolerance
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if self.is_empty() {
            value
        } else {
            value.clamp(self.min, self.max)
        }
    }

    /// Point at normalized position `s` in `[0, 1]`
    pub fn lerp(&self, s: f64) -> f64 {
        self.min + s * (self.max - self.min)
    }

    /// Distance from `value` to the interval, zero inside
    pub fn distance(&self, value: f64) -> f64 {
        if value < self.min {
            self.min - value
        } else if value > self.max {
            value - self.max
        } else {
            0.0
        }
    }
}

/// Shift `value` by whole periods to lie nearest `reference`
pub fn unwrap_periodic(value: f64, reference: f64, period: f64) -> f64 {
    value + ((reference - value) / period).round() * period
}

/// Difference `a - b` reduced modulo `period` into `[-period/2, period/2]`
pub fn periodic_difference(a: f64, b: f64, period: Option<f64>) -> f64 {
    let d = a - b;
    match period {
        Some(p) => d - (d / p).round() * p,
        None => d,
    }
}
