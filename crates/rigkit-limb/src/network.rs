//! Dataflow networks as data.
//!
//! Blend and stretch networks are planned as a list of [`Instruction`]s
//! before anything touches the scene, then executed in order by
//! [`NetworkPlan::apply`]. Instructions refer to nodes by the names they
//! request; when the adapter renames a node on collision, later instructions
//! are rewritten to the name it actually got.

use std::collections::HashMap;

use rigkit_core::error::RigError;

use crate::scene::{AttributeSpec, ConstraintKind, NodeRef, Plug, SceneAdapter, UtilityKind};

/// One scene mutation of a planned network.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Utility {
        kind: UtilityKind,
        name: String,
    },
    Locator {
        name: String,
        parent: Option<NodeRef>,
    },
    Attribute {
        node: NodeRef,
        spec: AttributeSpec,
    },
    Set {
        plug: Plug,
        value: f64,
    },
    Connect {
        source: Plug,
        dest: Plug,
    },
    Constrain {
        kind: ConstraintKind,
        driver: NodeRef,
        driven: NodeRef,
        maintain_offset: bool,
    },
    /// Move `target` onto `dest` without freezing.
    Snap {
        target: NodeRef,
        dest: NodeRef,
        translate: bool,
        rotate: bool,
    },
}

/// Ordered instructions building one network.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkPlan {
    instructions: Vec<Instruction>,
}

impl NetworkPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn extend(&mut self, other: Self) {
        self.instructions.extend(other.instructions);
    }

    /// Plan a utility node and return its requested reference.
    pub fn utility(&mut self, kind: UtilityKind, name: impl Into<String>) -> NodeRef {
        let name = name.into();
        let node = NodeRef::new(name.clone());
        self.push(Instruction::Utility { kind, name });
        node
    }

    pub fn locator(&mut self, name: impl Into<String>, parent: Option<&NodeRef>) -> NodeRef {
        let name = name.into();
        let node = NodeRef::new(name.clone());
        self.push(Instruction::Locator {
            name,
            parent: parent.cloned(),
        });
        node
    }

    pub fn attribute(&mut self, node: &NodeRef, spec: AttributeSpec) -> Plug {
        let plug = node.plug(spec.name.clone());
        self.push(Instruction::Attribute {
            node: node.clone(),
            spec,
        });
        plug
    }

    pub fn set(&mut self, plug: Plug, value: f64) {
        self.push(Instruction::Set { plug, value });
    }

    pub fn connect(&mut self, source: Plug, dest: Plug) {
        self.push(Instruction::Connect { source, dest });
    }

    pub fn constrain(
        &mut self,
        kind: ConstraintKind,
        driver: &NodeRef,
        driven: &NodeRef,
        maintain_offset: bool,
    ) {
        self.push(Instruction::Constrain {
            kind,
            driver: driver.clone(),
            driven: driven.clone(),
            maintain_offset,
        });
    }

    pub fn snap(&mut self, target: &NodeRef, dest: &NodeRef, translate: bool, rotate: bool) {
        self.push(Instruction::Snap {
            target: target.clone(),
            dest: dest.clone(),
            translate,
            rotate,
        });
    }

    /// Execute every instruction in order. Stops at the first failure; nodes
    /// created before it stay in the scene.
    pub fn apply<S: SceneAdapter + ?Sized>(&self, scene: &mut S) -> Result<Applied, RigError> {
        let mut applied = Applied::default();
        for instruction in &self.instructions {
            match instruction {
                Instruction::Utility { kind, name } => {
                    let node = scene.create_utility(*kind, name)?;
                    applied.record(name, node);
                }
                Instruction::Locator { name, parent } => {
                    let parent = parent.as_ref().map(|p| applied.resolve(p));
                    let node = scene.create_locator(name, parent.as_ref())?;
                    applied.record(name, node);
                }
                Instruction::Attribute { node, spec } => {
                    scene.add_attribute(&applied.resolve(node), spec)?;
                }
                Instruction::Set { plug, value } => {
                    scene.set_attribute(&applied.resolve_plug(plug), *value)?;
                }
                Instruction::Connect { source, dest } => {
                    scene.connect(&applied.resolve_plug(source), &applied.resolve_plug(dest))?;
                }
                Instruction::Constrain {
                    kind,
                    driver,
                    driven,
                    maintain_offset,
                } => {
                    scene.constrain(
                        *kind,
                        &applied.resolve(driver),
                        &applied.resolve(driven),
                        *maintain_offset,
                    )?;
                }
                Instruction::Snap {
                    target,
                    dest,
                    translate,
                    rotate,
                } => {
                    scene.snap(
                        &applied.resolve(target),
                        &applied.resolve(dest),
                        *translate,
                        *rotate,
                        false,
                    )?;
                }
            }
        }
        Ok(applied)
    }
}

/// Names the adapter gave to planned nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Applied {
    renamed: HashMap<NodeRef, NodeRef>,
}

impl Applied {
    fn record(&mut self, requested: &str, actual: NodeRef) {
        if actual.name() != requested {
            self.renamed.insert(NodeRef::new(requested), actual);
        }
    }

    /// Actual reference of a planned node. Nodes that were not renamed, or
    /// were not created by the plan, resolve to themselves.
    pub fn resolve(&self, node: &NodeRef) -> NodeRef {
        self.renamed.get(node).cloned().unwrap_or_else(|| node.clone())
    }

    pub fn resolve_plug(&self, plug: &Plug) -> Plug {
        self.resolve(&plug.node).plug(plug.attr.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::MemoryScene;

    #[test]
    fn apply_follows_renames() {
        let mut scene = MemoryScene::new();
        scene.create_utility(UtilityKind::BlendColors, "blend").unwrap();

        let mut plan = NetworkPlan::new();
        let blend = plan.utility(UtilityKind::BlendColors, "blend");
        let dist = plan.utility(UtilityKind::DistanceBetween, "dist");
        plan.connect(dist.plug("distance"), blend.plug("color1R"));
        plan.set(blend.plug("blender"), 0.5);

        let applied = plan.apply(&mut scene).unwrap();
        let actual = applied.resolve(&blend);
        assert_eq!(actual.name(), "blend1");
        assert_eq!(applied.resolve(&dist), dist);
        assert_eq!(
            scene.incoming(&actual.plug("color1R")),
            Some(&dist.plug("distance"))
        );
        assert_eq!(scene.attribute(&actual.plug("blender")), Some(0.5));
    }

    #[test]
    fn apply_stops_at_missing_node() {
        let mut scene = MemoryScene::new();
        let mut plan = NetworkPlan::new();
        let loc = plan.locator("loc", None);
        plan.constrain(ConstraintKind::Point, &NodeRef::new("ghost"), &loc, false);
        plan.utility(UtilityKind::Condition, "never");

        let err = plan.apply(&mut scene).unwrap_err();
        assert_eq!(err, RigError::InvalidTarget("ghost".into()));
        assert!(scene.exists(&loc));
        assert!(!scene.exists(&NodeRef::new("never")));
    }

    #[test]
    fn builder_methods_record_in_order() {
        let mut plan = NetworkPlan::new();
        let node = plan.locator("a", None);
        let plug = plan.attribute(&node, AttributeSpec::new("stretch", 1.0));
        assert_eq!(plug.to_string(), "a.stretch");
        assert_eq!(plan.len(), 2);
        assert!(matches!(plan.instructions()[1], Instruction::Attribute { .. }));
    }
}
