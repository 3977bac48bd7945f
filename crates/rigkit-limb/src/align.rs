//! Local-rotation-axis alignment of controls to joints.
//!
//! Aligning a control gives it the joint's local rotation axes while keeping
//! its channels at rest values. The joint's world transform becomes the
//! control's parent offset, expressed relative to the control's existing
//! parent so the hierarchy still composes:
//!
//! ```text
//! parent_world * offset = joint_world
//! ```
//!
//! The offset is stored either as an inserted transform node or as an
//! offset-parent matrix, whichever the host supports; both carry the same
//! transform.

use nalgebra::{Isometry3, Matrix4, Point3, Vector3};
use rigkit_core::error::RigError;
use rigkit_core::geometry::{isometry_from_matrix, reset_to_origin};
use rigkit_core::types::Axis;

use crate::naming;
use crate::scene::{NodeRef, OffsetStrategy, SceneAdapter};

/// Where the parent offset of an aligned control lives.
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentResult {
    /// A transform named `name`, parented where the control was, holding
    /// `local` relative to that parent. The control becomes its child.
    ExplicitOffsetNode { name: String, local: Isometry3<f64> },
    /// Offset-parent matrix stored on the control itself.
    OffsetMatrix(Matrix4<f64>),
}

/// Which transform channels are reset after alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelReset {
    /// Translate, rotate and scale go back to defaults.
    All,
    /// Translate and rotate are frozen; scale is left alone.
    TranslateRotate,
}

/// A fully computed alignment, ready for [`SceneAdapter::align`].
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub offset: AlignmentResult,
    /// Transform baked into the control's shape points. Identity when
    /// snap-aligning, so the shape lands on the joint.
    pub bake: Isometry3<f64>,
    pub channels: ChannelReset,
    /// World position of the control's new rotate/scale pivot.
    pub pivot: Point3<f64>,
}

impl Alignment {
    /// Offset relative to the control's parent, whichever way it is stored.
    pub fn offset_local(&self) -> Isometry3<f64> {
        match &self.offset {
            AlignmentResult::ExplicitOffsetNode { local, .. } => *local,
            AlignmentResult::OffsetMatrix(m) => isometry_from_matrix(m),
        }
    }

    /// Rest values of the attach node's translate channels.
    ///
    /// An inserted offset node carries the offset in its channels; a control
    /// using an offset-parent matrix rests at zero.
    pub fn attach_rest_translation(&self) -> Vector3<f64> {
        match &self.offset {
            AlignmentResult::ExplicitOffsetNode { local, .. } => local.translation.vector,
            AlignmentResult::OffsetMatrix(_) => Vector3::zeros(),
        }
    }

    /// Unit move along `axis` of the control's parent frame, expressed in the
    /// attach node's translate channels.
    ///
    /// Offset node channels live in the parent frame. A control's own
    /// channels sit after the offset-parent matrix, so the move is rotated
    /// into the offset frame.
    pub fn attach_channel_direction(&self, axis: Axis) -> Vector3<f64> {
        let unit = Vector3::ith(axis.index(), 1.0);
        match &self.offset {
            AlignmentResult::ExplicitOffsetNode { .. } => unit,
            AlignmentResult::OffsetMatrix(m) => isometry_from_matrix(m).rotation.inverse() * unit,
        }
    }
}

/// World-space inputs of one alignment.
#[derive(Debug, Clone)]
pub struct AlignmentInput<'a> {
    pub control_name: &'a str,
    pub control_world: Isometry3<f64>,
    pub joint_world: Isometry3<f64>,
    pub parent_world: Option<Isometry3<f64>>,
    pub snap_align: bool,
}

/// Compute the alignment of a control to a joint. Pure.
pub fn compute_alignment(input: &AlignmentInput<'_>, strategy: OffsetStrategy) -> Alignment {
    let offset_local = input
        .parent_world
        .map_or(input.joint_world, |parent| parent.inverse() * input.joint_world);

    let offset = match strategy {
        OffsetStrategy::OffsetNode => AlignmentResult::ExplicitOffsetNode {
            name: naming::offset_name(input.control_name),
            local: offset_local,
        },
        OffsetStrategy::OffsetMatrix => {
            AlignmentResult::OffsetMatrix(offset_local.to_homogeneous())
        }
    };

    // Reset to origin, then re-express the old world transform under the joint.
    let frozen = reset_to_origin(&input.control_world);
    let (bake, channels) = if input.snap_align {
        (frozen.transform, ChannelReset::All)
    } else {
        (input.joint_world.inverse() * frozen.delta, ChannelReset::TranslateRotate)
    };

    Alignment {
        offset,
        bake,
        channels,
        pivot: Point3::from(input.joint_world.translation.vector),
    }
}

/// Result of aligning a control in a scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Aligned {
    /// Node to parent or constrain in place of the control.
    pub attach: NodeRef,
    pub alignment: Alignment,
}

/// Align the local rotation axes of `targets[0]` (a control) to `targets[1]`
/// (a joint), respecting the control's current parent.
///
/// Extra targets are ignored. Construction history on the control is deleted.
pub fn align_local_axes<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    targets: &[NodeRef],
    snap_align: bool,
) -> Result<Aligned, RigError> {
    let [control, joint, ..] = targets else {
        return Err(RigError::InvalidSelection(targets.len()));
    };

    let parent = scene.parent(control)?;
    let parent_world = parent
        .as_ref()
        .map(|p| scene.world_transform(p))
        .transpose()?;
    let input = AlignmentInput {
        control_name: control.name(),
        control_world: scene.world_transform(control)?,
        joint_world: scene.world_transform(joint)?,
        parent_world,
        snap_align,
    };
    let alignment = compute_alignment(&input, scene.offset_strategy());

    let attach = scene.align(control, joint, parent.as_ref(), &alignment)?;
    scene.delete_history(control)?;
    tracing::debug!(control = %control, joint = %joint, attach = %attach, "aligned control");

    Ok(Aligned { attach, alignment })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};

    use crate::scene::MemoryScene;

    fn iso(t: [f64; 3], axis_angle: [f64; 3]) -> Isometry3<f64> {
        Isometry3::new(Vector3::from(t), Vector3::from(axis_angle))
    }

    fn input(parent: Option<Isometry3<f64>>, snap_align: bool) -> AlignmentInput<'static> {
        AlignmentInput {
            control_name: "LShoulder_FK_Ctrl",
            control_world: iso([1.0, 2.0, 0.0], [0.0, 0.0, 0.4]),
            joint_world: iso([5.0, 0.0, 0.0], [0.0, 0.7, 0.0]),
            parent_world: parent,
            snap_align,
        }
    }

    #[test]
    fn offset_without_parent_is_joint_world() {
        let a = compute_alignment(&input(None, true), OffsetStrategy::OffsetMatrix);
        let joint = input(None, true).joint_world;
        assert_relative_eq!(
            a.offset_local().to_homogeneous(),
            joint.to_homogeneous(),
            epsilon = 1e-12
        );
        assert_eq!(a.channels, ChannelReset::All);
        assert_eq!(a.bake, Isometry3::identity());
        assert_relative_eq!(a.pivot, Point3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn offset_composes_with_parent() {
        let parent = iso([0.0, 3.0, -1.0], [0.3, 0.0, 0.2]);
        let i = input(Some(parent), true);
        for strategy in [OffsetStrategy::OffsetNode, OffsetStrategy::OffsetMatrix] {
            let a = compute_alignment(&i, strategy);
            let composed = parent * a.offset_local();
            assert_relative_eq!(
                composed.to_homogeneous(),
                i.joint_world.to_homogeneous(),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn strategies_agree() {
        let parent = iso([0.5, 0.0, 0.0], [0.0, 0.1, 0.0]);
        let i = input(Some(parent), false);
        let node = compute_alignment(&i, OffsetStrategy::OffsetNode);
        let matrix = compute_alignment(&i, OffsetStrategy::OffsetMatrix);
        let expected = "LShoulder_FK_Ctrl_OFF_GRP";
        assert!(matches!(
            node.offset,
            AlignmentResult::ExplicitOffsetNode { ref name, .. } if name == expected
        ));
        assert!(matches!(matrix.offset, AlignmentResult::OffsetMatrix(_)));
        assert_relative_eq!(
            node.offset_local().to_homogeneous(),
            matrix.offset_local().to_homogeneous(),
            epsilon = 1e-9
        );
        assert_eq!(node.bake, matrix.bake);
    }

    #[test]
    fn freeform_preserves_world_shape() {
        let i = input(None, false);
        let a = compute_alignment(&i, OffsetStrategy::OffsetMatrix);
        assert_eq!(a.channels, ChannelReset::TranslateRotate);
        let p = Point3::new(0.0, 1.0, 0.0);
        // New world = offset (joint) * identity channels * baked point.
        assert_relative_eq!(a.offset_local() * (a.bake * p), i.control_world * p, epsilon = 1e-9);
    }

    #[test]
    fn attach_rest_translation_per_strategy() {
        let i = input(None, true);
        let node = compute_alignment(&i, OffsetStrategy::OffsetNode);
        let matrix = compute_alignment(&i, OffsetStrategy::OffsetMatrix);
        assert_relative_eq!(
            node.attach_rest_translation(),
            Vector3::new(5.0, 0.0, 0.0),
            epsilon = 1e-12
        );
        assert_relative_eq!(matrix.attach_rest_translation(), Vector3::zeros());
    }

    #[test]
    fn attach_direction_follows_offset_frame() {
        let parent = iso([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]);
        let mut i = input(Some(parent), true);
        i.joint_world = iso([5.0, 0.0, 0.0], [0.0, 0.0, -std::f64::consts::FRAC_PI_2]);
        let node = compute_alignment(&i, OffsetStrategy::OffsetNode);
        let matrix = compute_alignment(&i, OffsetStrategy::OffsetMatrix);
        assert_eq!(node.attach_channel_direction(Axis::X), Vector3::x());
        assert_eq!(node.attach_channel_direction(Axis::NegX), Vector3::x());

        // Parent +X is the joint's +Y once the joint is turned -90 degrees about Z.
        let direction = matrix.attach_channel_direction(Axis::X);
        assert_relative_eq!(direction, Vector3::y(), epsilon = 1e-12);
        let offset = matrix.offset_local();
        assert_relative_eq!(offset.rotation * direction, Vector3::x(), epsilon = 1e-12);
    }

    #[test]
    fn align_requires_two_targets() {
        let mut scene = MemoryScene::new();
        let ctrl = scene
            .create_circle(1.0, &Vector3::x(), 8, "ctrl")
            .unwrap();
        assert_eq!(
            align_local_axes(&mut scene, &[ctrl], true),
            Err(RigError::InvalidSelection(1))
        );
        assert_eq!(
            align_local_axes(&mut scene, &[], true),
            Err(RigError::InvalidSelection(0))
        );
    }

    #[test]
    fn align_missing_joint_is_invalid_target() {
        let mut scene = MemoryScene::new();
        let ctrl = scene.create_circle(1.0, &Vector3::x(), 8, "ctrl").unwrap();
        let err = align_local_axes(&mut scene, &[ctrl, NodeRef::new("ghost")], true).unwrap_err();
        assert_eq!(err, RigError::InvalidTarget("ghost".into()));
    }

    #[test]
    fn align_in_scene_gives_joint_axes() {
        for strategy in [OffsetStrategy::OffsetNode, OffsetStrategy::OffsetMatrix] {
            let mut scene = MemoryScene::with_strategy(strategy);
            let joint_world = Isometry3::from_parts(
                Translation3::new(5.0, 1.0, 0.0),
                UnitQuaternion::from_euler_angles(0.0, 0.0, 0.5),
            );
            let joint = scene.create_joint(None, "LElbow_FK_Joint", &joint_world).unwrap();
            let parent = scene.create_locator("grp", None).unwrap();
            scene
                .set_world_transform(&parent, &iso([0.0, 2.0, 0.0], [0.2, 0.0, 0.0]))
                .unwrap();
            let ctrl = scene.create_circle(1.0, &Vector3::x(), 8, "LElbow_FK_Ctrl").unwrap();
            scene.set_parent(&ctrl, Some(&parent)).unwrap();

            let aligned = align_local_axes(&mut scene, &[ctrl.clone(), joint], true).unwrap();
            let world = scene.world_transform(&ctrl).unwrap();
            assert_relative_eq!(
                world.to_homogeneous(),
                joint_world.to_homogeneous(),
                epsilon = 1e-9
            );
            assert_relative_eq!(
                scene.world_position(&ctrl).unwrap(),
                Point3::new(5.0, 1.0, 0.0),
                epsilon = 1e-9
            );
            match strategy {
                OffsetStrategy::OffsetNode => {
                    assert_eq!(aligned.attach.name(), "LElbow_FK_Ctrl_OFF_GRP");
                    assert_eq!(scene.parent(&aligned.attach).unwrap(), Some(parent.clone()));
                    assert_eq!(scene.parent(&ctrl).unwrap(), Some(aligned.attach.clone()));
                }
                OffsetStrategy::OffsetMatrix => {
                    assert_eq!(aligned.attach, ctrl);
                    assert_eq!(scene.parent(&ctrl).unwrap(), Some(parent.clone()));
                }
            }
        }
    }

    #[test]
    fn freeform_align_keeps_shape_in_place() {
        let mut scene = MemoryScene::new();
        let joint = scene
            .create_joint(None, "j", &iso([3.0, 0.0, 0.0], [0.0, 0.0, 0.9]))
            .unwrap();
        let ctrl = scene.create_circle(2.0, &Vector3::x(), 8, "c").unwrap();
        scene
            .set_world_transform(&ctrl, &iso([-1.0, 4.0, 2.0], [0.5, 0.1, 0.0]))
            .unwrap();
        let before = scene.world_shape(&ctrl).unwrap();

        align_local_axes(&mut scene, &[ctrl.clone(), joint], false).unwrap();
        let after = scene.world_shape(&ctrl).unwrap();
        assert_eq!(before.len(), after.len());
        for (a, b) in before.iter().zip(after.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }

    #[test]
    fn matrix_alignment_is_idempotent() {
        let mut scene = MemoryScene::new();
        let joint = scene
            .create_joint(None, "j", &iso([0.0, 1.0, 2.0], [0.3, 0.3, 0.0]))
            .unwrap();
        let ctrl = scene.create_circle(1.0, &Vector3::z(), 8, "c").unwrap();
        let first = align_local_axes(&mut scene, &[ctrl.clone(), joint.clone()], false).unwrap();
        let world_first = scene.world_transform(&ctrl).unwrap();
        let shape_first = scene.world_shape(&ctrl).unwrap();

        let second = align_local_axes(&mut scene, &[ctrl.clone(), joint], false).unwrap();
        assert_relative_eq!(
            first.alignment.offset_local().to_homogeneous(),
            second.alignment.offset_local().to_homogeneous(),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            scene.world_transform(&ctrl).unwrap().to_homogeneous(),
            world_first.to_homogeneous(),
            epsilon = 1e-9
        );
        for (a, b) in shape_first.iter().zip(scene.world_shape(&ctrl).unwrap().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-9);
        }
    }
}
