//! FK/IK blend network.
//!
//! Every channel of every bind joint is driven by a two-input blend node:
//! `color1` takes the IK joint, `color2` the FK joint and `blender` the switch
//! attribute, so a switch value of 1 is fully IK.

use rigkit_core::error::RigError;
use rigkit_core::geometry::lerp;
use rigkit_core::types::{Channel, Side};

use crate::chain::Chain;
use crate::naming;
use crate::network::NetworkPlan;
use crate::scene::{NodeRef, Plug, SceneAdapter, UtilityKind};

/// Evaluate a blend node: `ik` at factor 1, `fk` at factor 0.
pub fn blend_value(ik: f64, fk: f64, factor: f64) -> f64 {
    lerp(fk, ik, factor)
}

/// One blended channel of one joint triplet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlendLink {
    pub node: NodeRef,
    pub joint: usize,
    pub channel: Channel,
    pub ik: Plug,
    pub fk: Plug,
    pub driver: Plug,
    pub bind: Plug,
}

/// Plan the blend network over three matching chains.
pub fn plan_blend(
    side: Side,
    ik: &Chain,
    fk: &Chain,
    bind: &Chain,
    switch: &Plug,
) -> Result<(Vec<BlendLink>, NetworkPlan), RigError> {
    if ik.len() != bind.len() || fk.len() != bind.len() {
        return Err(RigError::InvalidTarget(format!(
            "chain lengths differ: ik {}, fk {}, bind {}",
            ik.len(),
            fk.len(),
            bind.len()
        )));
    }

    let mut plan = NetworkPlan::new();
    let mut links = Vec::with_capacity(bind.len() * Channel::ALL.len());
    for (i, joint) in bind.joints.iter().enumerate() {
        for channel in Channel::ALL {
            let node = plan.utility(
                UtilityKind::BlendColors,
                naming::blend_node_name(side, &joint.alias, channel),
            );
            let link = BlendLink {
                node: node.clone(),
                joint: i,
                channel,
                ik: ik.plug(i, channel),
                fk: fk.plug(i, channel),
                driver: switch.clone(),
                bind: bind.plug(i, channel),
            };
            plan.connect(link.ik.clone(), node.plug("color1"));
            plan.connect(link.fk.clone(), node.plug("color2"));
            plan.connect(link.driver.clone(), node.plug("blender"));
            plan.connect(node.plug("output"), link.bind.clone());
            links.push(link);
        }
    }
    Ok((links, plan))
}

/// Build the blend network and return one link per joint and channel.
pub fn build_blend<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    side: Side,
    ik: &Chain,
    fk: &Chain,
    bind: &Chain,
    switch: &Plug,
) -> Result<Vec<BlendLink>, RigError> {
    let (mut links, plan) = plan_blend(side, ik, fk, bind, switch)?;
    let applied = plan.apply(scene)?;
    for link in &mut links {
        link.node = applied.resolve(&link.node);
    }
    tracing::debug!(links = links.len(), switch = %switch, "built blend network");
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rigkit_core::types::{ChainType, Guide};

    use crate::chain::{build_chain, LimbGuides};
    use crate::scene::MemoryScene;

    fn chains(scene: &mut MemoryScene) -> [Chain; 3] {
        let guides = LimbGuides::new(
            vec![
                Guide::at("LeftHip", [0.0, 10.0, 0.0]),
                Guide::at("LeftKnee", [0.0, 5.0, 1.0]),
                Guide::at("LeftAnkle", [0.0, 0.0, 0.0]),
            ],
            vec!["Hip".into(), "Knee".into(), "Ankle".into()],
        )
        .unwrap();
        ChainType::ALL.map(|t| build_chain(scene, Side::Left, &guides, t).unwrap())
    }

    #[test]
    fn blend_boundaries() {
        assert_relative_eq!(blend_value(3.0, -1.0, 1.0), 3.0);
        assert_relative_eq!(blend_value(3.0, -1.0, 0.0), -1.0);
        assert_relative_eq!(blend_value(3.0, -1.0, 0.5), 1.0);
    }

    #[test]
    fn nine_links_wired_into_bind_chain() {
        let mut scene = MemoryScene::new();
        let [ik, fk, bind] = chains(&mut scene);
        let ctrl = scene.create_locator("L_leg_IKFK_Ctrl", None).unwrap();
        let switch = ctrl.plug("iKfK");

        let links = build_blend(&mut scene, Side::Left, &ik, &fk, &bind, &switch).unwrap();
        assert_eq!(links.len(), 9);
        for link in &links {
            assert_eq!(scene.incoming(&link.bind), Some(&link.node.plug("output")));
            assert_eq!(scene.incoming(&link.node.plug("color1")), Some(&link.ik));
            assert_eq!(scene.incoming(&link.node.plug("color2")), Some(&link.fk));
            assert_eq!(scene.incoming(&link.node.plug("blender")), Some(&switch));
        }
        assert_eq!(links[4].node.name(), "LKnee_rotate_Blend");
        assert_eq!(links[4].bind.to_string(), "LKnee_Bind_Joint.rotate");
    }

    #[test]
    fn mismatched_chains_are_rejected() {
        let mut scene = MemoryScene::new();
        let [ik, fk, mut bind] = chains(&mut scene);
        bind.joints.pop();
        let switch = NodeRef::new("sw").plug("iKfK");
        assert!(matches!(
            plan_blend(Side::Left, &ik, &fk, &bind, &switch),
            Err(RigError::InvalidTarget(_))
        ));
    }
}
