//! Integration test: alignment keeps what the animator sees.

use approx::assert_relative_eq;
use nalgebra::Vector3;
use rigkit_limb::align::{align_local_axes, AlignmentResult};
use rigkit_limb::scene::{MemoryScene, OffsetStrategy, SceneAdapter};
use rigkit_test_utils::{random_isometry, seeded_rng};

#[test]
fn freeform_alignment_preserves_world_shape() {
    let mut rng = seeded_rng(11);
    for round in 0..24 {
        let strategy = if round % 2 == 0 {
            OffsetStrategy::OffsetNode
        } else {
            OffsetStrategy::OffsetMatrix
        };
        let mut scene = MemoryScene::with_strategy(strategy);
        let joint = scene.create_joint(None, "joint", &random_isometry(&mut rng, 10.0)).unwrap();
        let parent = scene.create_locator("parent", None).unwrap();
        scene.set_world_transform(&parent, &random_isometry(&mut rng, 10.0)).unwrap();
        let ctrl = scene.create_circle(1.5, &Vector3::z(), 8, "ctrl").unwrap();
        scene.set_parent(&ctrl, Some(&parent)).unwrap();
        scene.set_world_transform(&ctrl, &random_isometry(&mut rng, 10.0)).unwrap();
        let before = scene.world_shape(&ctrl).unwrap();

        let aligned = align_local_axes(&mut scene, &[ctrl.clone(), joint.clone()], false).unwrap();

        let after = scene.world_shape(&ctrl).unwrap();
        for (a, b) in before.iter().zip(after.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-7);
        }
        let ctrl_world = scene.world_transform(&ctrl).unwrap();
        let joint_world = scene.world_transform(&joint).unwrap();
        assert_relative_eq!(
            ctrl_world.to_homogeneous(),
            joint_world.to_homogeneous(),
            epsilon = 1e-7
        );
        assert_relative_eq!(
            scene.world_position(&ctrl).unwrap(),
            scene.world_position(&joint).unwrap(),
            epsilon = 1e-7
        );
        match (strategy, &aligned.alignment.offset) {
            (OffsetStrategy::OffsetNode, AlignmentResult::ExplicitOffsetNode { .. })
            | (OffsetStrategy::OffsetMatrix, AlignmentResult::OffsetMatrix(_)) => {}
            (s, offset) => panic!("{s:?} produced {offset:?}"),
        }
    }
}
