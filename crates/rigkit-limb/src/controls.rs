//! Animator controls of a limb.
//!
//! Control sizes derive from the FK chain's root-to-end length so rigs scale
//! with the model. Three groups are built:
//!
//! * the FK/IK switch, a plus shape floating above the bind chain's end joint
//!   and carrying the `iKfK` attribute
//! * one FK circle per FK joint, parented in chain order and driving its
//!   joint through point and orient constraints
//! * the IK controls (base, world, local and pole vector) plus the
//!   rotate-plane IK handle they drive

use nalgebra::{Point3, Vector3};
use rigkit_core::config::LimbSettings;
use rigkit_core::error::RigError;
use rigkit_core::types::Axis;

use crate::align::{align_local_axes, Alignment};
use crate::chain::Chain;
use crate::naming::{self, IkControlRole};
use crate::scene::{AttributeSpec, ConstraintKind, IkSolver, NodeRef, Plug, SceneAdapter};
use crate::shapes::ControlShape;

/// Name of the FK/IK switch attribute.
pub const SWITCH_ATTR: &str = "iKfK";

/// Control size for a limb: a fifth of the FK chain's root-to-end length.
pub fn control_size(fk: &Chain) -> f64 {
    fk.length() / 5.0
}

// ---------------------------------------------------------------------------
// Specs
// ---------------------------------------------------------------------------

/// How a control is aligned to its target joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    /// Shape lands on the joint and channels are fully reset.
    Snap,
    /// Shape keeps its world placement; only translate/rotate are reset.
    Freeform,
}

/// Definition of one control curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub name: String,
    pub shape: ControlShape,
    pub target: NodeRef,
    pub scale: f64,
    /// World offset applied along the target's local axis after alignment.
    pub offset: Option<(Axis, f64)>,
    pub align: Option<AlignMode>,
    pub color: u8,
}

/// Where the pole-vector control goes.
#[derive(Debug, Clone, PartialEq)]
pub enum PolePlacement {
    /// Snap to an authored guide.
    Guide(NodeRef),
    Computed(Point3<f64>),
}

/// Default pole position: the middle joint pushed away from the root-to-end
/// line by half the chain's rest length.
///
/// A straight chain has no bend direction; the middle joint's `up_axis` is
/// used instead.
pub fn pole_position(chain: &Chain, up_axis: Axis) -> Point3<f64> {
    let p = chain.positions();
    let (root, mid, end) = (p[0], p[1], p[p.len() - 1]);
    let reach = chain.segment_lengths().iter().sum::<f64>() * 0.5;

    let line = end - root;
    let projected = match line.try_normalize(1e-9) {
        Some(dir) => root + dir * (mid - root).dot(&dir),
        None => mid,
    };
    let direction = (mid - projected)
        .try_normalize(1e-9)
        .unwrap_or_else(|| chain.joints[1].world.rotation * up_axis.vector());
    mid + direction * reach
}

/// Every control of a limb, computed before any is created.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPlan {
    pub size: f64,
    pub switch: ControlSpec,
    pub fk: Vec<ControlSpec>,
    pub base: ControlSpec,
    pub world: ControlSpec,
    pub local: ControlSpec,
    pub pole: ControlSpec,
    pub pole_placement: PolePlacement,
}

impl ControlPlan {
    pub fn specs(&self) -> impl Iterator<Item = &ControlSpec> {
        std::iter::once(&self.switch)
            .chain(&self.fk)
            .chain([&self.base, &self.world, &self.local, &self.pole])
    }
}

fn ik_spec(
    limb: &str,
    role: IkControlRole,
    shape: ControlShape,
    target: &NodeRef,
    scale: f64,
    color: u8,
) -> ControlSpec {
    ControlSpec {
        name: naming::ik_control_name(limb, role),
        shape,
        target: target.clone(),
        scale,
        offset: None,
        align: (role != IkControlRole::PoleVector).then_some(AlignMode::Snap),
        color,
    }
}

/// Lay out every control of a limb from its built chains.
pub fn plan_controls(settings: &LimbSettings, ik: &Chain, fk: &Chain, bind: &Chain) -> ControlPlan {
    let size = control_size(fk);
    let limb = settings.limb_name();
    let color = settings.colors.for_side(settings.side);
    let ring = ControlShape::circle(1.0, settings.primary_axis.vector());

    let switch = ControlSpec {
        name: naming::switch_control_name(&limb),
        shape: ControlShape::plus(1.0),
        target: bind.end().node.clone(),
        scale: size * 0.25,
        offset: Some((settings.up_axis, size * 1.5)),
        align: Some(AlignMode::Snap),
        color: settings.colors.switch,
    };

    let fk_specs = fk
        .joints
        .iter()
        .map(|joint| ControlSpec {
            name: naming::fk_control_name(settings.side, &joint.alias),
            shape: ring.clone(),
            target: joint.node.clone(),
            scale: size,
            offset: None,
            align: Some(AlignMode::Snap),
            color,
        })
        .collect();

    let pole_placement = settings.pole_vector.as_ref().map_or_else(
        || PolePlacement::Computed(pole_position(ik, settings.up_axis)),
        |guide| PolePlacement::Guide(NodeRef::new(guide.as_str())),
    );

    ControlPlan {
        size,
        switch,
        fk: fk_specs,
        base: ik_spec(&limb, IkControlRole::Base, ring.clone(), &ik.root().node, size * 1.2, color),
        world: ik_spec(
            &limb,
            IkControlRole::World,
            ring.clone(),
            &ik.end().node,
            size * 1.5,
            color,
        ),
        local: ik_spec(&limb, IkControlRole::Local, ring, &ik.end().node, size * 1.2, color),
        pole: ik_spec(
            &limb,
            IkControlRole::PoleVector,
            ControlShape::cross3d(1.0),
            &ik.joints[1].node,
            size * 0.5,
            color,
        ),
        pole_placement,
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// A control created in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltControl {
    pub control: NodeRef,
    /// Node to parent or constrain in place of the control.
    pub attach: NodeRef,
    pub alignment: Option<Alignment>,
}

/// Create the curve, optionally parent it, then align it to its target.
fn create_control<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    spec: &ControlSpec,
    parent: Option<&NodeRef>,
) -> Result<BuiltControl, RigError> {
    let control = spec.shape.scaled(spec.scale).create(scene, &spec.name)?;
    if let Some(parent) = parent {
        scene.set_parent(&control, Some(parent))?;
    }
    let built = match spec.align {
        Some(mode) => {
            let aligned = align_local_axes(
                scene,
                &[control.clone(), spec.target.clone()],
                mode == AlignMode::Snap,
            )?;
            BuiltControl {
                control,
                attach: aligned.attach,
                alignment: Some(aligned.alignment),
            }
        }
        None => BuiltControl {
            attach: control.clone(),
            control,
            alignment: None,
        },
    };
    scene.set_color(&built.control, spec.color)?;
    tracing::debug!(control = %built.control, target = %spec.target, "created control");
    Ok(built)
}

/// The FK/IK switch and its blend attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchControl {
    pub control: BuiltControl,
    pub attr: Plug,
}

pub fn build_switch_control<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    spec: &ControlSpec,
) -> Result<SwitchControl, RigError> {
    let built = create_control(scene, spec, None)?;
    if let Some((axis, amount)) = spec.offset {
        let target = scene.world_transform(&spec.target)?;
        let delta: Vector3<f64> = target.rotation * (axis.vector() * amount);
        scene.translate_by(&built.control, &delta)?;
        scene.freeze(&built.control)?;
    }
    scene.constrain(ConstraintKind::Parent, &spec.target, &built.attach, true)?;
    let spec = AttributeSpec::ranged(SWITCH_ATTR, 0.0, 1.0, 1.0);
    let attr = scene.add_attribute(&built.control, &spec)?;
    Ok(SwitchControl { control: built, attr })
}

/// FK controls, each parented under the previous one and driving its joint.
pub fn build_fk_controls<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    specs: &[ControlSpec],
) -> Result<Vec<BuiltControl>, RigError> {
    let mut built: Vec<BuiltControl> = Vec::with_capacity(specs.len());
    for spec in specs {
        let parent = built.last().map(|b| b.control.clone());
        let control = create_control(scene, spec, parent.as_ref())?;
        scene.constrain(ConstraintKind::Point, &control.control, &spec.target, false)?;
        scene.constrain(ConstraintKind::Orient, &control.control, &spec.target, false)?;
        built.push(control);
    }
    Ok(built)
}

/// IK controls and the handle they drive.
#[derive(Debug, Clone, PartialEq)]
pub struct IkControls {
    pub base: BuiltControl,
    pub world: BuiltControl,
    pub local: BuiltControl,
    pub pole: BuiltControl,
    pub handle: NodeRef,
}

pub fn build_ik_controls<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    limb_name: &str,
    plan: &ControlPlan,
    ik: &Chain,
) -> Result<IkControls, RigError> {
    let base = create_control(scene, &plan.base, None)?;
    scene.constrain(ConstraintKind::Parent, &base.control, &ik.root().node, true)?;

    let world = create_control(scene, &plan.world, None)?;
    let local = create_control(scene, &plan.local, Some(&world.control))?;

    let pole = create_control(scene, &plan.pole, None)?;
    match &plan.pole_placement {
        PolePlacement::Guide(guide) => scene.snap(&pole.control, guide, true, false, true)?,
        PolePlacement::Computed(position) => {
            scene.translate_by(&pole.control, &position.coords)?;
            scene.freeze(&pole.control)?;
        }
    }

    let handle = scene.create_ik_handle(
        &naming::ik_handle_name(limb_name),
        &ik.root().node,
        &ik.end().node,
        IkSolver::RotatePlane,
    )?;
    scene.constrain(ConstraintKind::Parent, &local.control, &handle, true)?;
    scene.constrain(ConstraintKind::PoleVector, &pole.control, &handle, false)?;
    tracing::debug!(handle = %handle, "built IK controls");

    Ok(IkControls {
        base,
        world,
        local,
        pole,
        handle,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
