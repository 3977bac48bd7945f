//! Canonical guide triples and seeded scenes.

use rigkit_core::config::LimbConfig;
use rigkit_core::types::Guide;
use rigkit_limb::scene::MemoryScene;

/// Left arm laid out along +X: shoulder at the origin, elbow at 5, wrist at 10.
pub fn arm_guides() -> Vec<Guide> {
    vec![
        Guide::at("LeftShoulder", [0.0, 0.0, 0.0]),
        Guide::at("LeftElbow", [5.0, 0.0, 0.0]),
        Guide::at("LeftWrist", [10.0, 0.0, 0.0]),
    ]
}

/// Right leg hanging down -Y with the knee bent forward.
pub fn leg_guides() -> Vec<Guide> {
    vec![
        Guide::at("RightHip", [-1.0, 10.0, 0.0]),
        Guide::at("RightKnee", [-1.0, 5.5, 0.5]),
        Guide::at("RightAnkle", [-1.0, 1.0, 0.0]),
    ]
}

pub fn arm_config() -> LimbConfig {
    LimbConfig::new("L", "arm", ["LeftShoulder", "LeftElbow", "LeftWrist"])
}

pub fn leg_config() -> LimbConfig {
    LimbConfig::new("R", "leg", ["RightHip", "RightKnee", "RightAnkle"])
}

/// In-memory scene holding one locator per guide.
pub fn seeded_scene(guides: &[Guide]) -> MemoryScene {
    let mut scene = MemoryScene::new();
    for guide in guides {
        scene.add_guide(guide);
    }
    scene
}
