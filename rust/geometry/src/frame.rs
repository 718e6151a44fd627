// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Right-handed placement frames

use crate::error::{Error, Result};
use nalgebra::{Point3, Vector3};
use serde::Serialize;

/// Orthonormal frame: `z` is the placement axis, `x` the reference direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Frame {
    pub origin: Point3<f64>,
    pub x: Vector3<f64>,
    pub y: Vector3<f64>,
    pub z: Vector3<f64>,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            origin: Point3::origin(),
            x: Vector3::x(),
            y: Vector3::y(),
            z: Vector3::z(),
        }
    }
}

impl Frame {
    /// Build from an axis and a reference direction, either of which may be
    /// absent. The reference direction is projected onto the plane normal
    /// to the axis.
    pub fn new(
        origin: Point3<f64>,
        axis: Option<Vector3<f64>>,
        ref_direction: Option<Vector3<f64>>,
    ) -> Result<Self> {
        let z = axis
            .unwrap_or_else(Vector3::z)
            .try_normalize(1e-12)
            .ok_or_else(|| Error::DegenerateFrame("zero length axis".into()))?;

        let candidate = ref_direction.unwrap_or_else(|| default_reference(&z));
        let projected = candidate - z * candidate.dot(&z);
        let x = match projected.try_normalize(1e-9) {
            Some(x) => x,
            // Reference parallel to the axis
            None => {
                let fallback = default_reference(&z);
                (fallback - z * fallback.dot(&z))
                    .try_normalize(1e-9)
                    .ok_or_else(|| Error::DegenerateFrame("no reference direction".into()))?
            }
        };
        let y = z.cross(&x);

        Ok(Self { origin, x, y, z })
    }

    /// World point from local coordinates
    #[inline]
    pub fn point(&self, lx: f64, ly: f64, lz: f64) -> Point3<f64> {
        self.origin + self.x * lx + self.y * ly + self.z * lz
    }

    /// Local coordinates of a world point
    #[inline]
    pub fn local(&self, p: &Point3<f64>) -> Vector3<f64> {
        let d = p - self.origin;
        Vector3::new(d.dot(&self.x), d.dot(&self.y), d.dot(&self.z))
    }
}

/// Reference direction used when none is given: world X unless the axis is X
fn default_reference(z: &Vector3<f64>) -> Vector3<f64> {
    if z.x.abs() > 1.0 - 1e-9 {
        Vector3::y()
    } else {
        Vector3::x()
    }
}
