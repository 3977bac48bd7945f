use std::fmt;
use std::str::FromStr;

use nalgebra::{Isometry3, Point3, Translation3, Vector3};

use crate::error::RigError;
use crate::geometry::rotation_from_euler_degrees;

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which side of the character a limb belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Single-letter prefix used in node names.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Left => "L",
            Self::Right => "R",
        }
    }
}

impl FromStr for Side {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" => Ok(Self::Left),
            "R" => Ok(Self::Right),
            other => Err(RigError::InvalidSide(other.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

// ---------------------------------------------------------------------------
// LimbType
// ---------------------------------------------------------------------------

/// Kind of three-joint limb being rigged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimbType {
    Arm,
    Leg,
}

impl LimbType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Leg => "leg",
        }
    }

    /// Semantic joint aliases used when a config does not name its own.
    pub const fn default_aliases(self) -> [&'static str; 3] {
        match self {
            Self::Arm => ["Shoulder", "Elbow", "Wrist"],
            Self::Leg => ["Hip", "Knee", "Ankle"],
        }
    }
}

impl FromStr for LimbType {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm" => Ok(Self::Arm),
            "leg" => Ok(Self::Leg),
            other => Err(RigError::InvalidLimbType(other.to_string())),
        }
    }
}

impl fmt::Display for LimbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ChainType
// ---------------------------------------------------------------------------

/// Purpose of one of the three parallel joint chains of a limb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainType {
    Ik,
    Fk,
    Bind,
}

impl ChainType {
    pub const ALL: [Self; 3] = [Self::Ik, Self::Fk, Self::Bind];

    /// Label embedded in joint names.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ik => "IK",
            Self::Fk => "FK",
            Self::Bind => "Bind",
        }
    }
}

impl fmt::Display for ChainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A compound transform channel of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Translate,
    Rotate,
    Scale,
}

impl Channel {
    pub const ALL: [Self; 3] = [Self::Translate, Self::Rotate, Self::Scale];

    /// Attribute name of the compound channel.
    pub const fn attr(self) -> &'static str {
        match self {
            Self::Translate => "translate",
            Self::Rotate => "rotate",
            Self::Scale => "scale",
        }
    }

    /// Attribute name of one scalar component, e.g. `scaleX` for `(Scale, X)`.
    pub fn component(self, axis: Axis) -> String {
        format!("{}{}", self.attr(), axis.letter())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attr())
    }
}

// ---------------------------------------------------------------------------
// Axis
// ---------------------------------------------------------------------------

/// A signed principal axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
    NegX,
    NegY,
    NegZ,
}

impl Axis {
    /// Component index (0, 1 or 2), ignoring sign.
    pub const fn index(self) -> usize {
        match self {
            Self::X | Self::NegX => 0,
            Self::Y | Self::NegY => 1,
            Self::Z | Self::NegZ => 2,
        }
    }

    pub const fn is_negative(self) -> bool {
        matches!(self, Self::NegX | Self::NegY | Self::NegZ)
    }

    /// Upper-case letter of the unsigned axis.
    pub const fn letter(self) -> &'static str {
        match self.index() {
            0 => "X",
            1 => "Y",
            _ => "Z",
        }
    }

    pub const fn sign(self) -> f64 {
        if self.is_negative() {
            -1.0
        } else {
            1.0
        }
    }

    /// Unit vector along this axis, e.g. `(0, -1, 0)` for `-Y`.
    pub fn vector(self) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        v[self.index()] = self.sign();
        v
    }
}

impl FromStr for Axis {
    type Err = RigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" => Ok(Self::X),
            "Y" => Ok(Self::Y),
            "Z" => Ok(Self::Z),
            "-X" => Ok(Self::NegX),
            "-Y" => Ok(Self::NegY),
            "-Z" => Ok(Self::NegZ),
            other => Err(RigError::InvalidAxis(other.to_string())),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            f.write_str("-")?;
        }
        f.write_str(self.letter())
    }
}

// ---------------------------------------------------------------------------
// Guide
// ---------------------------------------------------------------------------

/// A named world-space reference transform marking where a joint goes.
#[derive(Debug, Clone, PartialEq)]
pub struct Guide {
    pub name: String,
    pub world: Isometry3<f64>,
}

impl Guide {
    pub fn new(name: impl Into<String>, world: Isometry3<f64>) -> Self {
        Self {
            name: name.into(),
            world,
        }
    }

    /// Guide at `position` with no rotation.
    pub fn at(name: impl Into<String>, position: [f64; 3]) -> Self {
        Self::new(
            name,
            Isometry3::from_parts(
                Translation3::new(position[0], position[1], position[2]),
                nalgebra::UnitQuaternion::identity(),
            ),
        )
    }

    /// Guide from a position and XYZ Euler rotation in degrees.
    pub fn from_euler_degrees(
        name: impl Into<String>,
        position: [f64; 3],
        rotation: [f64; 3],
    ) -> Self {
        Self::new(
            name,
            Isometry3::from_parts(
                Translation3::new(position[0], position[1], position[2]),
                rotation_from_euler_degrees(rotation),
            ),
        )
    }

    pub fn position(&self) -> Point3<f64> {
        Point3::from(self.world.translation.vector)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
