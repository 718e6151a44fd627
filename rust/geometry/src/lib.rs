// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! step-brep geometry
//!
//! In-memory boundary representation with exact curve and surface
//! geometry, NURBS evaluation, parameter-space pullback of edges and a
//! structural validator. Uses nalgebra for points and vectors.

pub mod brep;
pub mod curve;
pub mod error;
pub mod frame;
pub mod interval;
pub mod nurbs;
pub mod pullback;
pub mod surface;
pub mod validate;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use brep::{BoundingBox, Brep, BrepStats, Edge, Face, Loop, LoopKind, Shell, Trim, TrimKind, Vertex};
pub use curve::{Curve2, Curve3, CurveGeometry};
pub use error::{Error, Result};
pub use frame::Frame;
pub use interval::Interval;
pub use nurbs::{bezier_knots, expand_knots, quasi_uniform_knots, uniform_knots, NurbsCurve, NurbsSurface};
pub use pullback::{pullback_edge, singular_bridge, uv_tolerance};
pub use surface::{Surface, SurfaceGeometry};
pub use validate::{Severity, ValidationIssue, ValidationReport};
