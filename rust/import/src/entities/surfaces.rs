// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Surface wrappers

use super::curves::degree;
use super::{Entity, Loader};
use crate::context::{ConversionContext, CurveBounds};
use crate::error::Result;
use crate::factory::EntityKey;
use crate::registry::Registry;
use step_brep_geometry::{
    bezier_knots, expand_knots, quasi_uniform_knots, uniform_knots, NurbsSurface, Surface,
    SurfaceGeometry,
};

#[derive(Debug, Clone, PartialEq)]
pub struct BSplineSurface {
    pub u_degree: usize,
    pub v_degree: usize,
    /// Rows run along u
    pub control_points: Vec<Vec<EntityKey>>,
    pub weights: Option<Vec<Vec<f64>>>,
    pub u_knots: Vec<f64>,
    pub v_knots: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEntity {
    Plane {
        position: EntityKey,
    },
    Cylinder {
        position: EntityKey,
        radius: f64,
    },
    Cone {
        position: EntityKey,
        radius: f64,
        semi_angle: f64,
    },
    Sphere {
        position: EntityKey,
        radius: f64,
    },
    Torus {
        position: EntityKey,
        major_radius: f64,
        minor_radius: f64,
    },
    BSpline(BSplineSurface),
    LinearExtrusion {
        swept_curve: EntityKey,
        extrusion_axis: EntityKey,
    },
    Revolution {
        swept_curve: EntityKey,
        axis_position: EntityKey,
    },
}

impl SurfaceEntity {
    pub fn children(&self) -> Vec<EntityKey> {
        match self {
            SurfaceEntity::Plane { position }
            | SurfaceEntity::Cylinder { position, .. }
            | SurfaceEntity::Cone { position, .. }
            | SurfaceEntity::Sphere { position, .. }
            | SurfaceEntity::Torus { position, .. } => vec![*position],
            SurfaceEntity::BSpline(spline) => spline.control_points.concat(),
            SurfaceEntity::LinearExtrusion {
                swept_curve,
                extrusion_axis,
            } => vec![*swept_curve, *extrusion_axis],
            SurfaceEntity::Revolution {
                swept_curve,
                axis_position,
            } => vec![*swept_curve, *axis_position],
        }
    }

    /// Surface geometry in millimetres and radians
    pub fn geometry(&self, ctx: &ConversionContext<'_>) -> Result<SurfaceGeometry> {
        let units = ctx.units();
        let geometry = match self {
            SurfaceEntity::Plane { position } => SurfaceGeometry::Plane {
                frame: ctx.frame(*position)?,
            },
            SurfaceEntity::Cylinder { position, radius } => SurfaceGeometry::Cylinder {
                frame: ctx.frame(*position)?,
                radius: radius * units.length,
            },
            SurfaceEntity::Cone {
                position,
                radius,
                semi_angle,
            } => SurfaceGeometry::cone(
                ctx.frame(*position)?,
                radius * units.length,
                semi_angle * units.plane_angle,
            )?,
            SurfaceEntity::Sphere { position, radius } => SurfaceGeometry::Sphere {
                frame: ctx.frame(*position)?,
                radius: radius * units.length,
            },
            SurfaceEntity::Torus {
                position,
                major_radius,
                minor_radius,
            } => SurfaceGeometry::Torus {
                frame: ctx.frame(*position)?,
                major_radius: major_radius * units.length,
                minor_radius: minor_radius * units.length,
            },
            SurfaceEntity::BSpline(spline) => {
                let control_points = spline
                    .control_points
                    .iter()
                    .map(|row| row.iter().map(|&key| ctx.point(key)).collect::<Result<Vec<_>>>())
                    .collect::<Result<Vec<_>>>()?;
                SurfaceGeometry::Nurbs(NurbsSurface::new(
                    spline.u_degree,
                    spline.v_degree,
                    control_points,
                    spline.weights.clone(),
                    spline.u_knots.clone(),
                    spline.v_knots.clone(),
                )?)
            }
            SurfaceEntity::LinearExtrusion {
                swept_curve,
                extrusion_axis,
            } => SurfaceGeometry::LinearExtrusion {
                curve: ctx.curve3(*swept_curve, CurveBounds::Natural)?,
                direction: ctx.vector(*extrusion_axis)?,
            },
            SurfaceEntity::Revolution {
                swept_curve,
                axis_position,
            } => {
                let (origin, direction) = ctx.axis1(*axis_position)?;
                SurfaceGeometry::revolution(
                    ctx.curve3(*swept_curve, CurveBounds::Natural)?,
                    origin,
                    direction,
                )?
            }
        };
        Ok(geometry)
    }

    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let surface = Surface::new(self.geometry(ctx)?);
        Ok(ctx.brep_mut().add_surface(surface))
    }
}

fn load_elementary(loader: &mut Loader<'_>) -> Result<Entity> {
    let position = loader.entity("position")?;
    let surface = match loader.name() {
        "CYLINDRICAL_SURFACE" => SurfaceEntity::Cylinder {
            position,
            radius: loader.real("radius")?,
        },
        "CONICAL_SURFACE" => SurfaceEntity::Cone {
            position,
            radius: loader.real("radius")?,
            semi_angle: loader.real("semi_angle")?,
        },
        "SPHERICAL_SURFACE" => SurfaceEntity::Sphere {
            position,
            radius: loader.real("radius")?,
        },
        "TOROIDAL_SURFACE" => SurfaceEntity::Torus {
            position,
            major_radius: loader.real("major_radius")?,
            minor_radius: loader.real("minor_radius")?,
        },
        _ => SurfaceEntity::Plane { position },
    };
    Ok(Entity::Surface(surface))
}

fn load_swept(loader: &mut Loader<'_>) -> Result<Entity> {
    let swept_curve = loader.entity("swept_curve")?;
    let surface = if loader.name() == "SURFACE_OF_REVOLUTION" {
        SurfaceEntity::Revolution {
            swept_curve,
            axis_position: loader.entity("axis_position")?,
        }
    } else {
        SurfaceEntity::LinearExtrusion {
            swept_curve,
            extrusion_axis: loader.entity("extrusion_axis")?,
        }
    };
    Ok(Entity::Surface(surface))
}

fn knots_with_multiplicities(
    loader: &Loader<'_>,
    multiplicities: &'static str,
    knots: &'static str,
) -> Result<Vec<f64>> {
    let counts = loader.integers(multiplicities)?;
    let values = loader.reals(knots)?;
    if counts.len() != values.len() {
        return Err(loader.invalid(multiplicities, "one multiplicity per knot"));
    }
    Ok(expand_knots(&values, &counts))
}

fn load_b_spline_surface(loader: &mut Loader<'_>) -> Result<Entity> {
    let u_degree = degree(loader, "u_degree")?;
    let v_degree = degree(loader, "v_degree")?;
    let control_points = loader.entity_grid("control_points_list")?;
    let nu = control_points.len();
    let nv = control_points.first().map(Vec::len).unwrap_or(0);
    let name = loader.name();

    let (u_knots, v_knots) = if name.ends_with("WITH_KNOTS") {
        (
            knots_with_multiplicities(loader, "u_multiplicities", "u_knots")?,
            knots_with_multiplicities(loader, "v_multiplicities", "v_knots")?,
        )
    } else if name.contains("QUASI_UNIFORM") {
        (
            quasi_uniform_knots(nu, u_degree),
            quasi_uniform_knots(nv, v_degree),
        )
    } else if name.contains("UNIFORM") {
        (uniform_knots(nu, u_degree), uniform_knots(nv, v_degree))
    } else {
        (bezier_knots(nu, u_degree), bezier_knots(nv, v_degree))
    };

    let weights = if name.starts_with("RATIONAL") {
        Some(loader.real_grid("weights_data")?)
    } else {
        None
    };

    Ok(Entity::Surface(SurfaceEntity::BSpline(BSplineSurface {
        u_degree,
        v_degree,
        control_points,
        weights,
        u_knots,
        v_knots,
    })))
}

pub(crate) fn register(registry: &mut Registry) {
    for name in [
        "PLANE",
        "CYLINDRICAL_SURFACE",
        "CONICAL_SURFACE",
        "SPHERICAL_SURFACE",
        "TOROIDAL_SURFACE",
    ] {
        registry.register(name, load_elementary);
    }
    registry.register("SURFACE_OF_LINEAR_EXTRUSION", load_swept);
    registry.register("SURFACE_OF_REVOLUTION", load_swept);
    for name in [
        "B_SPLINE_SURFACE_WITH_KNOTS",
        "BEZIER_SURFACE",
        "UNIFORM_SURFACE",
        "QUASI_UNIFORM_SURFACE",
        "RATIONAL_B_SPLINE_SURFACE_WITH_KNOTS",
        "RATIONAL_BEZIER_SURFACE",
        "RATIONAL_UNIFORM_SURFACE",
        "RATIONAL_QUASI_UNIFORM_SURFACE",
    ] {
        registry.register(name, load_b_spline_surface);
    }
}
