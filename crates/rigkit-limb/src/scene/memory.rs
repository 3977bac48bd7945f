//! In-memory [`SceneAdapter`] implementation.
//!
//! [`MemoryScene`] keeps a node table with enough transform state to answer
//! world-space queries, records connections and constraints, and logs every
//! mutation as a [`SceneOp`].
//!
//! The dataflow graph is evaluated only on request: [`MemoryScene::evaluate_plug`]
//! pulls a value through connections and utility nodes, and
//! [`MemoryScene::evaluate`] writes the results into connected translate and
//! scale channels. Constraints place the driven node when created and are not
//! solved again.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use nalgebra::{Isometry3, Point3, Vector3};
use rigkit_core::error::RigError;
use rigkit_core::geometry::isometry_from_matrix;
use rigkit_core::types::{Channel, Guide};

use super::{
    condition, multiply_divide, AttributeSpec, ConstraintKind, IkSolver, NodeKind, NodeRef,
    OffsetStrategy, Plug, SceneAdapter, UtilityKind,
};
use crate::align::{Alignment, AlignmentResult, ChannelReset};

// ---------------------------------------------------------------------------
// SceneNode
// ---------------------------------------------------------------------------

/// One node of a [`MemoryScene`].
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub kind: NodeKind,
    pub parent: Option<NodeRef>,
    /// Translate/rotate channels, relative to the parent frame.
    pub local: Isometry3<f64>,
    /// Offset-parent transform applied between the parent and `local`.
    pub offset_parent: Isometry3<f64>,
    pub scale: Vector3<f64>,
    /// Curve points in local space. Empty for non-curve nodes.
    pub shape: Vec<Point3<f64>>,
    /// Rotate/scale pivot in local space.
    pub pivot: Point3<f64>,
    /// Values of attributes that were set or added.
    pub attributes: BTreeMap<String, f64>,
    /// Custom attributes added through [`SceneAdapter::add_attribute`].
    pub custom: Vec<AttributeSpec>,
    pub color: Option<u8>,
}

impl SceneNode {
    fn new(kind: NodeKind, parent: Option<NodeRef>) -> Self {
        Self {
            kind,
            parent,
            local: Isometry3::identity(),
            offset_parent: Isometry3::identity(),
            scale: Vector3::repeat(1.0),
            shape: Vec::new(),
            pivot: Point3::origin(),
            attributes: BTreeMap::new(),
            custom: Vec::new(),
            color: None,
        }
    }

    pub fn custom_attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.custom.iter().find(|spec| spec.name == name)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A dataflow connection `source -> dest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub source: Plug,
    pub dest: Plug,
}

/// A constraint created in the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintRecord {
    pub node: NodeRef,
    pub kind: ConstraintKind,
    pub driver: NodeRef,
    pub driven: NodeRef,
    pub maintain_offset: bool,
}

/// One recorded scene mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneOp {
    Create {
        node: NodeRef,
        kind: NodeKind,
        parent: Option<NodeRef>,
    },
    Parent {
        child: NodeRef,
        parent: Option<NodeRef>,
    },
    Place {
        node: NodeRef,
        position: Point3<f64>,
    },
    Freeze {
        node: NodeRef,
    },
    Align {
        control: NodeRef,
        joint: NodeRef,
        attach: NodeRef,
        offset_matrix: bool,
    },
    AddAttribute {
        plug: Plug,
        spec: AttributeSpec,
    },
    SetAttribute {
        plug: Plug,
        value: f64,
    },
    Connect {
        source: Plug,
        dest: Plug,
    },
    Constrain(ConstraintRecord),
    IkHandle {
        handle: NodeRef,
        start: NodeRef,
        end: NodeRef,
        solver: IkSolver,
    },
    Color {
        node: NodeRef,
        index: u8,
    },
    Delete {
        node: NodeRef,
    },
    DeleteHistory {
        node: NodeRef,
    },
}

fn fmt_parent(parent: Option<&NodeRef>) -> String {
    parent.map_or_else(|| "world".to_string(), ToString::to_string)
}

impl fmt::Display for SceneOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { node, kind, parent } => {
                write!(f, "create {kind} {node} under {}", fmt_parent(parent.as_ref()))
            }
            Self::Parent { child, parent } => {
                write!(f, "parent {child} -> {}", fmt_parent(parent.as_ref()))
            }
            Self::Place { node, position } => write!(
                f,
                "place {node} at ({:.3}, {:.3}, {:.3})",
                position.x, position.y, position.z
            ),
            Self::Freeze { node } => write!(f, "freeze {node}"),
            Self::Align {
                control,
                joint,
                attach,
                offset_matrix,
            } => {
                let how = if *offset_matrix { "offset matrix" } else { "offset node" };
                write!(f, "align {control} to {joint} via {how} (attach {attach})")
            }
            Self::AddAttribute { plug, spec } => {
                write!(f, "add attribute {plug} default {}", spec.default)?;
                match (spec.min, spec.max) {
                    (Some(min), Some(max)) => write!(f, " range [{min}, {max}]"),
                    (Some(min), None) => write!(f, " min {min}"),
                    (None, Some(max)) => write!(f, " max {max}"),
                    (None, None) => Ok(()),
                }
            }
            Self::SetAttribute { plug, value } => write!(f, "set {plug} = {value}"),
            Self::Connect { source, dest } => write!(f, "connect {source} -> {dest}"),
            Self::Constrain(c) => {
                write!(f, "{} {} -> {}", c.kind.type_name(), c.driver, c.driven)?;
                if c.maintain_offset {
                    f.write_str(" (maintain offset)")?;
                }
                Ok(())
            }
            Self::IkHandle {
                handle,
                start,
                end,
                solver,
            } => write!(f, "ik handle {handle}: {start} -> {end} ({})", solver.type_name()),
            Self::Color { node, index } => write!(f, "color {node} = {index}"),
            Self::Delete { node } => write!(f, "delete {node}"),
            Self::DeleteHistory { node } => write!(f, "delete history {node}"),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryScene
// ---------------------------------------------------------------------------

/// Connection hops followed before a pull is treated as a cycle.
const MAX_EVAL_DEPTH: usize = 256;

/// Scene held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    nodes: HashMap<NodeRef, SceneNode>,
    order: Vec<NodeRef>,
    connections: Vec<Connection>,
    constraints: Vec<ConstraintRecord>,
    ops: Vec<SceneOp>,
    strategy: OffsetStrategy,
}

impl MemoryScene {
    /// Empty scene of a host that supports offset-parent matrices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty scene using the given offset representation.
    pub fn with_strategy(strategy: OffsetStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Add a guide as a locator at its world transform.
    pub fn add_guide(&mut self, guide: &Guide) -> NodeRef {
        let node = self.insert(&guide.name, SceneNode::new(NodeKind::Locator, None));
        if let Some(n) = self.nodes.get_mut(&node) {
            n.local = guide.world;
        }
        self.ops.push(SceneOp::Place {
            node: node.clone(),
            position: guide.position(),
        });
        node
    }

    pub fn node(&self, node: &NodeRef) -> Option<&SceneNode> {
        self.nodes.get(node)
    }

    /// Node references in creation order.
    pub fn node_refs(&self) -> &[NodeRef] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ops(&self) -> &[SceneOp] {
        &self.ops
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn constraints(&self) -> &[ConstraintRecord] {
        &self.constraints
    }

    /// Source plug connected into `dest`, if any.
    pub fn incoming(&self, dest: &Plug) -> Option<&Plug> {
        self.connections
            .iter()
            .find(|c| &c.dest == dest)
            .map(|c| &c.source)
    }

    /// Value of an attribute that was added or set.
    pub fn attribute(&self, plug: &Plug) -> Option<f64> {
        self.nodes.get(&plug.node)?.attributes.get(&plug.attr).copied()
    }

    pub fn children(&self, parent: &NodeRef) -> Vec<NodeRef> {
        self.order
            .iter()
            .filter(|n| self.nodes.get(*n).and_then(|node| node.parent.as_ref()) == Some(parent))
            .cloned()
            .collect()
    }

    /// Nodes of the given kind, in creation order.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeRef> {
        self.order
            .iter()
            .filter(|n| self.nodes.get(*n).is_some_and(|node| node.kind == kind))
            .cloned()
            .collect()
    }

    /// Curve points of `node` in world space.
    pub fn world_shape(&self, node: &NodeRef) -> Result<Vec<Point3<f64>>, RigError> {
        let world = self.world_transform(node)?;
        let n = self.get(node)?;
        Ok(n
            .shape
            .iter()
            .map(|p| world * Point3::from(p.coords.component_mul(&n.scale)))
            .collect())
    }

    // -- evaluation ---------------------------------------------------------

    /// Value of `plug`, pulled through incoming connections.
    ///
    /// Utility outputs are computed from their inputs. Transform channels read
    /// the node's transform. Anything else reads the stored attribute, or 0.
    pub fn evaluate_plug(&self, plug: &Plug) -> Result<f64, RigError> {
        self.pull(plug, 0)
    }

    /// Write every connected translate and scale channel with its evaluated
    /// value. Values are pulled before any channel is written.
    pub fn evaluate(&mut self) -> Result<(), RigError> {
        let updates = self
            .connections
            .iter()
            .filter(|c| {
                matches!(
                    transform_channel(&c.dest.attr),
                    Some((Channel::Translate | Channel::Scale, _))
                )
            })
            .map(|c| Ok::<_, RigError>((c.dest.clone(), self.pull(&c.source, 0)?)))
            .collect::<Result<Vec<_>, RigError>>()?;

        for (plug, value) in updates {
            let n = self.get_mut(&plug.node)?;
            match transform_channel(&plug.attr) {
                Some((Channel::Translate, i)) => n.local.translation.vector[i] = value,
                Some((Channel::Scale, i)) => n.scale[i] = value,
                _ => {}
            }
        }
        Ok(())
    }

    fn pull(&self, plug: &Plug, depth: usize) -> Result<f64, RigError> {
        if depth > MAX_EVAL_DEPTH {
            return Err(RigError::InvalidTarget(format!("{plug} feeds back into itself")));
        }
        if let Some(source) = self.incoming(plug) {
            return self.pull(source, depth + 1);
        }
        let n = self.get(&plug.node)?;
        if let NodeKind::Utility(kind) = n.kind {
            if let Some(value) = self.utility_output(kind, plug, depth)? {
                return Ok(value);
            }
        }
        Ok(match transform_channel(&plug.attr) {
            Some((Channel::Translate, i)) => n.local.translation.vector[i],
            Some((Channel::Rotate, i)) => {
                let (x, y, z) = n.local.rotation.euler_angles();
                [x, y, z][i].to_degrees()
            }
            Some((Channel::Scale, i)) => n.scale[i],
            None => n.attributes.get(&plug.attr).copied().unwrap_or(0.0),
        })
    }

    /// Input of a utility node: connected, set, or `default`.
    fn input(
        &self,
        node: &NodeRef,
        attr: &str,
        default: f64,
        depth: usize,
    ) -> Result<f64, RigError> {
        let plug = node.plug(attr);
        if self.incoming(&plug).is_some() || self.attribute(&plug).is_some() {
            self.pull(&plug, depth + 1)
        } else {
            Ok(default)
        }
    }

    /// Indexed inputs such as `input1D[0]`, set or connected, in index order.
    fn indexed_inputs(&self, node: &NodeRef, prefix: &str, suffix: &str) -> Vec<String> {
        let matches = |attr: &str| {
            attr.strip_prefix(prefix)
                .and_then(|rest| rest.strip_suffix(suffix))
                .and_then(|index| index.parse::<usize>().ok())
        };
        let stored = self
            .nodes
            .get(node)
            .into_iter()
            .flat_map(|n| n.attributes.keys().map(String::as_str));
        let connected = self
            .connections
            .iter()
            .filter(|c| &c.dest.node == node)
            .map(|c| c.dest.attr.as_str());
        stored
            .chain(connected)
            .filter_map(|attr| matches(attr).map(|index| (index, attr.to_string())))
            .collect::<BTreeMap<usize, String>>()
            .into_values()
            .collect()
    }

    fn world_input(&self, node: &NodeRef, attr: &str) -> Result<Point3<f64>, RigError> {
        match self.incoming(&node.plug(attr)) {
            Some(source) => self.world_position(&source.node),
            None => Ok(Point3::origin()),
        }
    }

    fn utility_output(
        &self,
        kind: UtilityKind,
        plug: &Plug,
        depth: usize,
    ) -> Result<Option<f64>, RigError> {
        let node = &plug.node;
        let attr = plug.attr.as_str();
        let input = |name: &str, default: f64| self.input(node, name, default, depth);

        match kind {
            UtilityKind::MultiplyDivide => {
                let Some(c) = component(attr, "output", "XYZ") else {
                    return Ok(None);
                };
                let a = input(&format!("input1{c}"), 0.0)?;
                let b = input(&format!("input2{c}"), 1.0)?;
                let operation = input("operation", multiply_divide::MULTIPLY)?;
                if (operation - multiply_divide::DIVIDE).abs() < 0.5 {
                    if b.abs() <= f64::EPSILON {
                        return Err(RigError::DivisionByZero(format!("{plug} divides by zero")));
                    }
                    Ok(Some(a / b))
                } else {
                    Ok(Some(a * b))
                }
            }
            UtilityKind::PlusMinusAverage => {
                let (prefix, suffix) = match attr {
                    "output1D" => ("input1D[", "]".to_string()),
                    "output3Dx" | "output3Dy" | "output3Dz" => {
                        ("input3D[", format!("].input3D{}", &attr[attr.len() - 1..]))
                    }
                    _ => return Ok(None),
                };
                let mut total = 0.0;
                for name in self.indexed_inputs(node, prefix, &suffix) {
                    total += input(&name, 0.0)?;
                }
                Ok(Some(total))
            }
            UtilityKind::Condition => {
                let Some(c) = component(attr, "outColor", "RGB") else {
                    return Ok(None);
                };
                let first = input("firstTerm", 0.0)?;
                let second = input("secondTerm", 0.0)?;
                let operation = input("operation", 0.0)?;
                let holds = if (operation - condition::GREATER_THAN).abs() < 0.5 {
                    first > second
                } else {
                    (first - second).abs() <= f64::EPSILON
                };
                if holds {
                    input(&format!("colorIfTrue{c}"), 0.0).map(Some)
                } else {
                    input(&format!("colorIfFalse{c}"), 1.0).map(Some)
                }
            }
            UtilityKind::BlendColors => {
                let Some(c) = component(attr, "output", "RGB") else {
                    return Ok(None);
                };
                let blender = input("blender", 0.5)?;
                let color1 = input(&format!("color1{c}"), 0.0)?;
                let color2 = input(&format!("color2{c}"), 0.0)?;
                Ok(Some(color2 + (color1 - color2) * blender))
            }
            UtilityKind::DistanceBetween => {
                if attr != "distance" {
                    return Ok(None);
                }
                let a = self.world_input(node, "point1")?;
                let b = self.world_input(node, "point2")?;
                Ok(Some((b - a).norm()))
            }
        }
    }

    // -- internals ----------------------------------------------------------

    fn get(&self, node: &NodeRef) -> Result<&SceneNode, RigError> {
        self.nodes
            .get(node)
            .ok_or_else(|| RigError::InvalidTarget(node.to_string()))
    }

    fn get_mut(&mut self, node: &NodeRef) -> Result<&mut SceneNode, RigError> {
        self.nodes
            .get_mut(node)
            .ok_or_else(|| RigError::InvalidTarget(node.to_string()))
    }

    fn check(&self, node: &NodeRef) -> Result<(), RigError> {
        self.get(node).map(|_| ())
    }

    /// Insert under a unique name, numbering on collision like most hosts do.
    fn insert(&mut self, name: &str, node: SceneNode) -> NodeRef {
        let mut candidate = NodeRef::new(name);
        let mut n = 1;
        while self.nodes.contains_key(&candidate) {
            candidate = NodeRef::new(format!("{name}{n}"));
            n += 1;
        }
        self.ops.push(SceneOp::Create {
            node: candidate.clone(),
            kind: node.kind,
            parent: node.parent.clone(),
        });
        self.nodes.insert(candidate.clone(), node);
        self.order.push(candidate.clone());
        candidate
    }

    /// World frame the node's `local` channels are expressed in.
    fn parent_frame(&self, node: &NodeRef) -> Result<Isometry3<f64>, RigError> {
        let n = self.get(node)?;
        let parent_world = match &n.parent {
            Some(parent) => self.world_transform(parent)?,
            None => Isometry3::identity(),
        };
        Ok(parent_world * n.offset_parent)
    }

    fn is_descendant(&self, node: &NodeRef, ancestor: &NodeRef) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent.clone());
        while let Some(p) = current {
            if &p == ancestor {
                return true;
            }
            current = self.nodes.get(&p).and_then(|n| n.parent.clone());
        }
        false
    }

    fn check_plug(&self, plug: &Plug) -> Result<(), RigError> {
        if self.nodes.contains_key(&plug.node) {
            Ok(())
        } else {
            Err(RigError::InvalidTarget(plug.to_string()))
        }
    }
}

/// Single-letter suffix of `attr` after `prefix`, if it is one of `letters`.
fn component<'a>(attr: &'a str, prefix: &str, letters: &str) -> Option<&'a str> {
    attr.strip_prefix(prefix)
        .filter(|c| c.len() == 1 && letters.contains(*c))
}

/// Split `translateX`-style names into channel and component index.
fn transform_channel(attr: &str) -> Option<(Channel, usize)> {
    Channel::ALL.into_iter().find_map(|channel| {
        let index = match attr.strip_prefix(channel.attr())? {
            "X" => 0,
            "Y" => 1,
            "Z" => 2,
            _ => return None,
        };
        Some((channel, index))
    })
}

fn circle_points(radius: f64, normal: &Vector3<f64>, sections: u32) -> Option<Vec<Point3<f64>>> {
    let n = normal.try_normalize(1e-12)?;
    let helper = if n.x.abs() < 0.9 { Vector3::x() } else { Vector3::y() };
    let u = n.cross(&helper).normalize();
    let v = n.cross(&u);
    Some(
        (0..sections)
            .map(|i| {
                let theta = std::f64::consts::TAU * f64::from(i) / f64::from(sections);
                Point3::from((u * theta.cos() + v * theta.sin()) * radius)
            })
            .collect(),
    )
}

impl SceneAdapter for MemoryScene {
    fn offset_strategy(&self) -> OffsetStrategy {
        self.strategy
    }

    fn exists(&self, node: &NodeRef) -> bool {
        self.nodes.contains_key(node)
    }

    fn create_joint(
        &mut self,
        parent: Option<&NodeRef>,
        name: &str,
        world: &Isometry3<f64>,
    ) -> Result<NodeRef, RigError> {
        let frame = match parent {
            Some(p) => self.world_transform(p)?,
            None => Isometry3::identity(),
        };
        let mut node = SceneNode::new(NodeKind::Joint, parent.cloned());
        node.local = frame.inverse() * world;
        Ok(self.insert(name, node))
    }

    fn create_curve(
        &mut self,
        points: &[Point3<f64>],
        name: &str,
        degree: u8,
    ) -> Result<NodeRef, RigError> {
        if degree == 0 || points.len() <= usize::from(degree) {
            return Err(RigError::InvalidTarget(format!(
                "{name}: {} points cannot make a degree {degree} curve",
                points.len()
            )));
        }
        let mut node = SceneNode::new(NodeKind::Curve, None);
        node.shape = points.to_vec();
        Ok(self.insert(name, node))
    }

    fn create_circle(
        &mut self,
        radius: f64,
        normal: &Vector3<f64>,
        sections: u32,
        name: &str,
    ) -> Result<NodeRef, RigError> {
        let points = (sections >= 3)
            .then(|| circle_points(radius, normal, sections))
            .flatten()
            .ok_or_else(|| RigError::InvalidTarget(format!("{name}: degenerate circle")))?;
        let mut node = SceneNode::new(NodeKind::Curve, None);
        node.shape = points;
        Ok(self.insert(name, node))
    }

    fn create_locator(
        &mut self,
        name: &str,
        parent: Option<&NodeRef>,
    ) -> Result<NodeRef, RigError> {
        if let Some(p) = parent {
            self.check(p)?;
        }
        Ok(self.insert(name, SceneNode::new(NodeKind::Locator, parent.cloned())))
    }

    fn create_utility(&mut self, kind: UtilityKind, name: &str) -> Result<NodeRef, RigError> {
        Ok(self.insert(name, SceneNode::new(NodeKind::Utility(kind), None)))
    }

    fn create_ik_handle(
        &mut self,
        name: &str,
        start: &NodeRef,
        end: &NodeRef,
        solver: IkSolver,
    ) -> Result<NodeRef, RigError> {
        for joint in [start, end] {
            if self.get(joint)?.kind != NodeKind::Joint {
                return Err(RigError::InvalidTarget(format!("{joint} is not a joint")));
            }
        }
        if !self.is_descendant(end, start) {
            return Err(RigError::InvalidTarget(format!("{end} is not below {start}")));
        }
        let world = self.world_transform(end)?;
        let mut node = SceneNode::new(NodeKind::IkHandle, None);
        node.local = world;
        let handle = self.insert(name, node);
        self.ops.push(SceneOp::IkHandle {
            handle: handle.clone(),
            start: start.clone(),
            end: end.clone(),
            solver,
        });
        Ok(handle)
    }

    fn set_parent(&mut self, child: &NodeRef, parent: Option<&NodeRef>) -> Result<(), RigError> {
        let world = self.world_transform(child)?;
        if let Some(p) = parent {
            self.check(p)?;
            if p == child || self.is_descendant(p, child) {
                return Err(RigError::InvalidTarget(format!("cannot parent {child} under {p}")));
            }
        }
        self.get_mut(child)?.parent = parent.cloned();
        let frame = self.parent_frame(child)?;
        self.get_mut(child)?.local = frame.inverse() * world;
        self.ops.push(SceneOp::Parent {
            child: child.clone(),
            parent: parent.cloned(),
        });
        Ok(())
    }

    fn parent(&self, node: &NodeRef) -> Result<Option<NodeRef>, RigError> {
        Ok(self.get(node)?.parent.clone())
    }

    fn world_transform(&self, node: &NodeRef) -> Result<Isometry3<f64>, RigError> {
        let local = self.get(node)?.local;
        Ok(self.parent_frame(node)? * local)
    }

    fn world_position(&self, node: &NodeRef) -> Result<Point3<f64>, RigError> {
        let pivot = self.get(node)?.pivot;
        Ok(self.world_transform(node)? * pivot)
    }

    fn set_world_transform(
        &mut self,
        node: &NodeRef,
        world: &Isometry3<f64>,
    ) -> Result<(), RigError> {
        let frame = self.parent_frame(node)?;
        let n = self.get_mut(node)?;
        n.local = frame.inverse() * world;
        let position = Point3::from(world.translation.vector);
        self.ops.push(SceneOp::Place {
            node: node.clone(),
            position,
        });
        Ok(())
    }

    fn freeze(&mut self, node: &NodeRef) -> Result<(), RigError> {
        let n = self.get_mut(node)?;
        // Joints keep their world frame; the rotation moves into the joint orient.
        if n.kind != NodeKind::Joint {
            let local = n.local;
            let scale = n.scale;
            for p in &mut n.shape {
                *p = local * Point3::from(p.coords.component_mul(&scale));
            }
            n.pivot = local * n.pivot;
            n.local = Isometry3::identity();
            n.scale = Vector3::repeat(1.0);
        }
        self.ops.push(SceneOp::Freeze { node: node.clone() });
        Ok(())
    }

    fn align(
        &mut self,
        control: &NodeRef,
        joint: &NodeRef,
        parent: Option<&NodeRef>,
        alignment: &Alignment,
    ) -> Result<NodeRef, RigError> {
        self.check(control)?;
        self.check(joint)?;
        if let Some(p) = parent {
            self.check(p)?;
        }

        let (attach, offset_matrix) = match &alignment.offset {
            AlignmentResult::ExplicitOffsetNode { name, local } => {
                let mut offset = SceneNode::new(NodeKind::Transform, parent.cloned());
                offset.local = *local;
                let offset = self.insert(name, offset);
                let c = self.get_mut(control)?;
                c.parent = Some(offset.clone());
                c.offset_parent = Isometry3::identity();
                (offset, false)
            }
            AlignmentResult::OffsetMatrix(m) => {
                let c = self.get_mut(control)?;
                c.parent = parent.cloned();
                c.offset_parent = isometry_from_matrix(m);
                (control.clone(), true)
            }
        };

        let c = self.get_mut(control)?;
        c.local = Isometry3::identity();
        if alignment.channels == ChannelReset::All {
            c.scale = Vector3::repeat(1.0);
        }
        for p in &mut c.shape {
            *p = alignment.bake * *p;
        }
        let world = self.world_transform(control)?;
        self.get_mut(control)?.pivot = world.inverse() * alignment.pivot;

        self.ops.push(SceneOp::Align {
            control: control.clone(),
            joint: joint.clone(),
            attach: attach.clone(),
            offset_matrix,
        });
        Ok(attach)
    }

    fn add_attribute(&mut self, node: &NodeRef, spec: &AttributeSpec) -> Result<Plug, RigError> {
        let plug = node.plug(spec.name.clone());
        let n = self.get_mut(node)?;
        if n.custom_attribute(&spec.name).is_some() {
            return Err(RigError::InvalidTarget(format!("{plug} already exists")));
        }
        n.custom.push(spec.clone());
        n.attributes.insert(spec.name.clone(), spec.default);
        self.ops.push(SceneOp::AddAttribute {
            plug: plug.clone(),
            spec: spec.clone(),
        });
        Ok(plug)
    }

    fn set_attribute(&mut self, plug: &Plug, value: f64) -> Result<(), RigError> {
        self.check_plug(plug)?;
        let n = self.get_mut(&plug.node)?;
        let value = n
            .custom_attribute(&plug.attr)
            .map_or(value, |spec| spec.clamp(value));
        n.attributes.insert(plug.attr.clone(), value);
        self.ops.push(SceneOp::SetAttribute {
            plug: plug.clone(),
            value,
        });
        Ok(())
    }

    fn connect(&mut self, source: &Plug, dest: &Plug) -> Result<(), RigError> {
        self.check_plug(source)?;
        self.check_plug(dest)?;
        if self.incoming(dest).is_some() {
            return Err(RigError::InvalidTarget(format!("{dest} already has an input")));
        }
        self.connections.push(Connection {
            source: source.clone(),
            dest: dest.clone(),
        });
        self.ops.push(SceneOp::Connect {
            source: source.clone(),
            dest: dest.clone(),
        });
        Ok(())
    }

    fn constrain(
        &mut self,
        kind: ConstraintKind,
        driver: &NodeRef,
        driven: &NodeRef,
        maintain_offset: bool,
    ) -> Result<NodeRef, RigError> {
        self.check(driver)?;
        self.check(driven)?;
        if driver == driven {
            return Err(RigError::InvalidTarget(format!("{driven} cannot constrain itself")));
        }

        if !maintain_offset {
            let target = self.world_transform(driver)?;
            let pivot = self.world_position(driver)?;
            let mut world = self.world_transform(driven)?;
            match kind {
                ConstraintKind::Point => world.translation.vector = pivot.coords,
                ConstraintKind::Orient => world.rotation = target.rotation,
                ConstraintKind::Parent => world = target,
                ConstraintKind::PoleVector => {}
            }
            let frame = self.parent_frame(driven)?;
            self.get_mut(driven)?.local = frame.inverse() * world;
        }

        let name = format!("{driven}_{}1", kind.type_name());
        let record = SceneNode::new(NodeKind::Constraint(kind), Some(driven.clone()));
        let node = self.insert(&name, record);
        let record = ConstraintRecord {
            node: node.clone(),
            kind,
            driver: driver.clone(),
            driven: driven.clone(),
            maintain_offset,
        };
        self.constraints.push(record.clone());
        self.ops.push(SceneOp::Constrain(record));
        Ok(node)
    }

    fn set_color(&mut self, node: &NodeRef, index: u8) -> Result<(), RigError> {
        self.get_mut(node)?.color = Some(index);
        self.ops.push(SceneOp::Color {
            node: node.clone(),
            index,
        });
        Ok(())
    }

    fn delete(&mut self, node: &NodeRef) -> Result<(), RigError> {
        self.check(node)?;
        let doomed: Vec<NodeRef> = self
            .order
            .iter()
            .filter(|n| *n == node || self.is_descendant(n, node))
            .cloned()
            .collect();
        for n in &doomed {
            self.nodes.remove(n);
        }
        self.order.retain(|n| !doomed.contains(n));
        self.connections
            .retain(|c| !doomed.contains(&c.source.node) && !doomed.contains(&c.dest.node));
        self.constraints
            .retain(|c| !doomed.contains(&c.driver) && !doomed.contains(&c.driven));
        self.ops.push(SceneOp::Delete { node: node.clone() });
        Ok(())
    }

    fn delete_history(&mut self, node: &NodeRef) -> Result<(), RigError> {
        self.check(node)?;
        self.ops.push(SceneOp::DeleteHistory { node: node.clone() });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
