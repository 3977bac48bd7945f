//! Joint chains.
//!
//! A limb carries three chains (IK, FK and Bind) built from the same three
//! guides. They share topology and aliases and differ only in node names.

use nalgebra::{Isometry3, Point3};
use rigkit_core::error::RigError;
use rigkit_core::geometry::distance;
use rigkit_core::types::{ChainType, Channel, Guide, Side};

use crate::naming;
use crate::scene::{NodeRef, Plug, SceneAdapter};

/// Joints per limb.
pub const LIMB_JOINTS: usize = 3;

// ---------------------------------------------------------------------------
// LimbGuides
// ---------------------------------------------------------------------------

/// Three guides in root-to-end order, each paired with its alias.
#[derive(Debug, Clone, PartialEq)]
pub struct LimbGuides {
    guides: [Guide; LIMB_JOINTS],
    aliases: [String; LIMB_JOINTS],
}

fn size_error(guides: usize, aliases: usize) -> RigError {
    RigError::InvalidLimbSize { guides, aliases }
}

impl LimbGuides {
    pub fn new(guides: Vec<Guide>, aliases: Vec<String>) -> Result<Self, RigError> {
        let (g, a) = (guides.len(), aliases.len());
        let guides: [Guide; LIMB_JOINTS] = guides.try_into().map_err(|_| size_error(g, a))?;
        let aliases: [String; LIMB_JOINTS] = aliases.try_into().map_err(|_| size_error(g, a))?;
        Ok(Self { guides, aliases })
    }

    /// Read guide transforms from the scene by name.
    pub fn from_scene<S: SceneAdapter + ?Sized>(
        scene: &S,
        names: &[String],
        aliases: &[String],
    ) -> Result<Self, RigError> {
        if names.len() != LIMB_JOINTS || aliases.len() != LIMB_JOINTS {
            return Err(size_error(names.len(), aliases.len()));
        }
        let guides = names
            .iter()
            .map(|name| {
                let world = scene.world_transform(&NodeRef::new(name.as_str()))?;
                Ok(Guide::new(name.clone(), world))
            })
            .collect::<Result<Vec<_>, RigError>>()?;
        Self::new(guides, aliases.to_vec())
    }

    pub fn guides(&self) -> &[Guide; LIMB_JOINTS] {
        &self.guides
    }

    pub fn aliases(&self) -> &[String; LIMB_JOINTS] {
        &self.aliases
    }

    pub fn positions(&self) -> [Point3<f64>; LIMB_JOINTS] {
        [
            self.guides[0].position(),
            self.guides[1].position(),
            self.guides[2].position(),
        ]
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// One joint of a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSpec {
    pub node: NodeRef,
    pub alias: String,
    /// Index of the parent joint; always lower than this joint's index.
    pub parent: Option<usize>,
    pub chain_type: ChainType,
    pub world: Isometry3<f64>,
}

/// An ordered, single-rooted joint chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub chain_type: ChainType,
    pub joints: Vec<JointSpec>,
}

impl Chain {
    /// Lay out a chain over `guides` without touching a scene.
    pub fn plan(side: Side, guides: &LimbGuides, chain_type: ChainType) -> Self {
        let joints = guides
            .guides()
            .iter()
            .zip(guides.aliases())
            .enumerate()
            .map(|(i, (guide, alias))| JointSpec {
                node: NodeRef::new(naming::joint_name(side, alias, chain_type)),
                alias: alias.clone(),
                parent: i.checked_sub(1),
                chain_type,
                world: guide.world,
            })
            .collect();
        Self { chain_type, joints }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn node(&self, index: usize) -> &NodeRef {
        &self.joints[index].node
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeRef> {
        self.joints.iter().map(|j| &j.node)
    }

    pub fn root(&self) -> &JointSpec {
        &self.joints[0]
    }

    pub fn end(&self) -> &JointSpec {
        &self.joints[self.joints.len() - 1]
    }

    /// `channel` attribute of joint `index`.
    pub fn plug(&self, index: usize, channel: Channel) -> Plug {
        self.node(index).plug(channel.attr())
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.joints
            .iter()
            .map(|j| Point3::from(j.world.translation.vector))
            .collect()
    }

    /// Straight-line distance from root to end.
    pub fn length(&self) -> f64 {
        let p = self.positions();
        match (p.first(), p.last()) {
            (Some(a), Some(b)) => distance(a, b),
            _ => 0.0,
        }
    }

    /// Rest length of each bone, root first.
    pub fn segment_lengths(&self) -> Vec<f64> {
        self.positions()
            .windows(2)
            .map(|w| distance(&w[0], &w[1]))
            .collect()
    }
}

/// Create the joints of one chain. Each joint is placed at its guide's world
/// transform under the previous joint, then frozen.
pub fn build_chain<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    side: Side,
    guides: &LimbGuides,
    chain_type: ChainType,
) -> Result<Chain, RigError> {
    let mut chain = Chain::plan(side, guides, chain_type);
    let mut previous: Option<NodeRef> = None;
    for joint in &mut chain.joints {
        let node = scene.create_joint(previous.as_ref(), joint.node.name(), &joint.world)?;
        scene.freeze(&node)?;
        joint.node = node.clone();
        previous = Some(node);
    }
    tracing::debug!(
        chain = chain_type.label(),
        root = %chain.root().node,
        length = chain.length(),
        "built chain"
    );
    Ok(chain)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
