//! The boundary between rig construction and the authoring host.
//!
//! Everything the builders do to a scene goes through [`SceneAdapter`]. A host
//! integration implements it against the host's node and attribute API;
//! [`MemoryScene`] implements it in memory for tests and dry runs.

mod memory;

use std::fmt;

use nalgebra::{Isometry3, Point3, Vector3};
use rigkit_core::error::RigError;
use rigkit_core::geometry::distance;

use crate::align::Alignment;

pub use memory::{Connection, ConstraintRecord, MemoryScene, SceneNode, SceneOp};

// ---------------------------------------------------------------------------
// NodeRef / Plug
// ---------------------------------------------------------------------------

/// Handle to a node in the host scene, identified by its unique name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(String);

impl NodeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Attribute `attr` on this node.
    pub fn plug(&self, attr: impl Into<String>) -> Plug {
        Plug {
            node: self.clone(),
            attr: attr.into(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NodeRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// A node attribute, written `node.attr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Plug {
    pub node: NodeRef,
    pub attr: String,
}

impl fmt::Display for Plug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.attr)
    }
}

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

/// Dataflow utility nodes the builders wire together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtilityKind {
    /// `output = color1 * blender + color2 * (1 - blender)`.
    BlendColors,
    /// `distance = |point1 - point2|`.
    DistanceBetween,
    /// Component-wise multiply or divide, selected by `operation`.
    MultiplyDivide,
    /// `outColor = firstTerm <op> secondTerm ? colorIfTrue : colorIfFalse`.
    Condition,
    /// Sum, difference or average of `input1D[]`, selected by `operation`.
    PlusMinusAverage,
}

impl UtilityKind {
    /// Host node type name.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::BlendColors => "blendColors",
            Self::DistanceBetween => "distanceBetween",
            Self::MultiplyDivide => "multiplyDivide",
            Self::Condition => "condition",
            Self::PlusMinusAverage => "plusMinusAverage",
        }
    }
}

/// Operation codes of [`UtilityKind::MultiplyDivide`].
pub mod multiply_divide {
    pub const MULTIPLY: f64 = 1.0;
    pub const DIVIDE: f64 = 2.0;
}

/// Operation codes of [`UtilityKind::Condition`].
pub mod condition {
    pub const GREATER_THAN: f64 = 2.0;
}

/// Operation codes of [`UtilityKind::PlusMinusAverage`].
pub mod plus_minus_average {
    pub const SUM: f64 = 1.0;
}

/// Transform constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    Point,
    Orient,
    Parent,
    PoleVector,
}

impl ConstraintKind {
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Point => "pointConstraint",
            Self::Orient => "orientConstraint",
            Self::Parent => "parentConstraint",
            Self::PoleVector => "poleVectorConstraint",
        }
    }
}

/// IK solvers an IK handle can use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IkSolver {
    /// Analytic two-bone solve in a plane set by a pole vector.
    RotatePlane,
}

impl IkSolver {
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::RotatePlane => "ikRPsolver",
        }
    }
}

/// Kind of node held by a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Joint,
    Curve,
    Transform,
    Locator,
    IkHandle,
    Utility(UtilityKind),
    Constraint(ConstraintKind),
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Joint => f.write_str("joint"),
            Self::Curve => f.write_str("nurbsCurve"),
            Self::Transform => f.write_str("transform"),
            Self::Locator => f.write_str("locator"),
            Self::IkHandle => f.write_str("ikHandle"),
            Self::Utility(kind) => f.write_str(kind.type_name()),
            Self::Constraint(kind) => f.write_str(kind.type_name()),
        }
    }
}

/// How a host stores the parent offset of an aligned control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OffsetStrategy {
    /// Insert an offset transform between the control and its parent.
    OffsetNode,
    /// Store the offset directly on the control as an offset-parent matrix.
    #[default]
    OffsetMatrix,
}

// ---------------------------------------------------------------------------
// AttributeSpec
// ---------------------------------------------------------------------------

/// A custom scalar (double) attribute added to a node.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSpec {
    pub name: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: f64,
    pub keyable: bool,
}

impl AttributeSpec {
    /// Keyable, unbounded attribute with the given default.
    pub fn new(name: impl Into<String>, default: f64) -> Self {
        Self {
            name: name.into(),
            min: None,
            max: None,
            default,
            keyable: true,
        }
    }

    /// Keyable attribute limited to `[min, max]`.
    pub fn ranged(name: impl Into<String>, min: f64, max: f64, default: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..Self::new(name, default)
        }
    }

    #[must_use]
    pub const fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Clamp `value` into this attribute's range.
    pub fn clamp(&self, value: f64) -> f64 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }
}

// ---------------------------------------------------------------------------
// SceneAdapter
// ---------------------------------------------------------------------------

/// Narrow capability interface the rig builders drive.
///
/// Every method that takes a [`NodeRef`] or [`Plug`] fails with
/// [`RigError::InvalidTarget`] when the node does not exist. Creation methods
/// may rename on collision; callers must use the returned reference.
pub trait SceneAdapter {
    /// Which offset representation this host supports for aligned controls.
    fn offset_strategy(&self) -> OffsetStrategy;

    fn exists(&self, node: &NodeRef) -> bool;

    fn create_joint(
        &mut self,
        parent: Option<&NodeRef>,
        name: &str,
        world: &Isometry3<f64>,
    ) -> Result<NodeRef, RigError>;

    /// Polyline or spline curve through `points` (in the curve's local space).
    fn create_curve(
        &mut self,
        points: &[Point3<f64>],
        name: &str,
        degree: u8,
    ) -> Result<NodeRef, RigError>;

    fn create_circle(
        &mut self,
        radius: f64,
        normal: &Vector3<f64>,
        sections: u32,
        name: &str,
    ) -> Result<NodeRef, RigError>;

    fn create_locator(&mut self, name: &str, parent: Option<&NodeRef>) -> Result<NodeRef, RigError>;

    fn create_utility(&mut self, kind: UtilityKind, name: &str) -> Result<NodeRef, RigError>;

    fn create_ik_handle(
        &mut self,
        name: &str,
        start: &NodeRef,
        end: &NodeRef,
        solver: IkSolver,
    ) -> Result<NodeRef, RigError>;

    /// Reparent `child`, keeping its world transform. `None` parents to the world.
    fn set_parent(&mut self, child: &NodeRef, parent: Option<&NodeRef>) -> Result<(), RigError>;

    fn parent(&self, node: &NodeRef) -> Result<Option<NodeRef>, RigError>;

    fn world_transform(&self, node: &NodeRef) -> Result<Isometry3<f64>, RigError>;

    fn set_world_transform(
        &mut self,
        node: &NodeRef,
        world: &Isometry3<f64>,
    ) -> Result<(), RigError>;

    /// Commit the node's current transform into its geometry and zero its channels.
    fn freeze(&mut self, node: &NodeRef) -> Result<(), RigError>;

    /// Materialize a computed alignment. Returns the node to parent or constrain
    /// in place of the control: the inserted offset node, or the control itself.
    fn align(
        &mut self,
        control: &NodeRef,
        joint: &NodeRef,
        parent: Option<&NodeRef>,
        alignment: &Alignment,
    ) -> Result<NodeRef, RigError>;

    fn add_attribute(&mut self, node: &NodeRef, spec: &AttributeSpec) -> Result<Plug, RigError>;

    fn set_attribute(&mut self, plug: &Plug, value: f64) -> Result<(), RigError>;

    fn connect(&mut self, source: &Plug, dest: &Plug) -> Result<(), RigError>;

    fn constrain(
        &mut self,
        kind: ConstraintKind,
        driver: &NodeRef,
        driven: &NodeRef,
        maintain_offset: bool,
    ) -> Result<NodeRef, RigError>;

    /// Host color index for the node's display override.
    fn set_color(&mut self, node: &NodeRef, index: u8) -> Result<(), RigError>;

    fn delete(&mut self, node: &NodeRef) -> Result<(), RigError>;

    fn delete_history(&mut self, node: &NodeRef) -> Result<(), RigError>;

    /// World-space rotate pivot of a node.
    fn world_position(&self, node: &NodeRef) -> Result<Point3<f64>, RigError> {
        Ok(Point3::from(self.world_transform(node)?.translation.vector))
    }

    fn distance_between(&self, a: &NodeRef, b: &NodeRef) -> Result<f64, RigError> {
        Ok(distance(&self.world_position(a)?, &self.world_position(b)?))
    }

    /// Move `node` by `delta` in world space.
    fn translate_by(&mut self, node: &NodeRef, delta: &Vector3<f64>) -> Result<(), RigError> {
        let mut world = self.world_transform(node)?;
        world.translation.vector += delta;
        self.set_world_transform(node, &world)
    }

    /// Move `target` onto `dest`'s world translation and/or rotation.
    fn snap(
        &mut self,
        target: &NodeRef,
        dest: &NodeRef,
        translate: bool,
        rotate: bool,
        freeze: bool,
    ) -> Result<(), RigError> {
        let dest_world = self.world_transform(dest)?;
        let mut world = self.world_transform(target)?;
        if translate {
            world.translation = dest_world.translation;
        }
        if rotate {
            world.rotation = dest_world.rotation;
        }
        self.set_world_transform(target, &world)?;
        if freeze {
            self.freeze(target)?;
        }
        Ok(())
    }
}
