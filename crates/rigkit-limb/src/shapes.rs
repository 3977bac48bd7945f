//! Control curve shapes.

use nalgebra::{Point3, Vector3};
use rigkit_core::error::RigError;

use crate::scene::{NodeRef, SceneAdapter};

/// Circle resolution used for rotational controls.
pub const CIRCLE_SECTIONS: u32 = 8;

/// Local-space definition of a control curve.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlShape {
    Polyline { points: Vec<Point3<f64>>, degree: u8 },
    Circle { radius: f64, normal: Vector3<f64>, sections: u32 },
}

impl ControlShape {
    /// Closed plus outline in the XY plane, arms 2 wide reaching 3 from the
    /// center, scaled by `scale`.
    pub fn plus(scale: f64) -> Self {
        const OUTLINE: [[f64; 2]; 13] = [
            [-1.0, 3.0],
            [1.0, 3.0],
            [1.0, 1.0],
            [3.0, 1.0],
            [3.0, -1.0],
            [1.0, -1.0],
            [1.0, -3.0],
            [-1.0, -3.0],
            [-1.0, -1.0],
            [-3.0, -1.0],
            [-3.0, 1.0],
            [-1.0, 1.0],
            [-1.0, 3.0],
        ];
        Self::Polyline {
            points: OUTLINE
                .iter()
                .map(|[x, y]| Point3::new(x * scale, y * scale, 0.0))
                .collect(),
            degree: 1,
        }
    }

    /// Three axis-aligned segments through the origin, drawn as one polyline.
    pub fn cross3d(scale: f64) -> Self {
        let o = Point3::origin();
        let points = [Vector3::x(), Vector3::y(), Vector3::z()]
            .iter()
            .flat_map(|axis| [o + axis * scale, o - axis * scale, o])
            .collect();
        Self::Polyline { points, degree: 1 }
    }

    pub fn circle(radius: f64, normal: Vector3<f64>) -> Self {
        Self::Circle {
            radius,
            normal,
            sections: CIRCLE_SECTIONS,
        }
    }

    /// Uniformly scaled copy.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        match self {
            Self::Polyline { points, degree } => Self::Polyline {
                points: points.iter().map(|p| Point3::from(p.coords * factor)).collect(),
                degree: *degree,
            },
            Self::Circle {
                radius,
                normal,
                sections,
            } => Self::Circle {
                radius: radius * factor,
                normal: *normal,
                sections: *sections,
            },
        }
    }

    pub fn create<S: SceneAdapter + ?Sized>(
        &self,
        scene: &mut S,
        name: &str,
    ) -> Result<NodeRef, RigError> {
        match self {
            Self::Polyline { points, degree } => scene.create_curve(points, name, *degree),
            Self::Circle {
                radius,
                normal,
                sections,
            } => scene.create_circle(*radius, normal, *sections, name),
        }
    }
}
