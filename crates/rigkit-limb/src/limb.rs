//! Limb build entry point.

use rigkit_core::config::{LimbConfig, LimbSettings};
use rigkit_core::error::RigError;
use rigkit_core::types::{ChainType, LimbType, Side};

use crate::blend::{build_blend, BlendLink};
use crate::chain::{build_chain, Chain, LimbGuides};
use crate::controls::{
    build_fk_controls, build_ik_controls, build_switch_control, plan_controls, BuiltControl,
    ControlPlan, IkControls, SwitchControl,
};
use crate::scene::{NodeRef, SceneAdapter};
use crate::stretch::{
    build_fk_stretch, configure_stretch, FkStretch, IkStretchControls, StretchState,
};

/// Everything built for one limb.
#[derive(Debug, Clone, PartialEq)]
pub struct LimbRig {
    /// `{side}_{limb}`, e.g. `L_arm`.
    pub name: String,
    pub side: Side,
    pub limb: LimbType,
    pub ik: Chain,
    pub fk: Chain,
    pub bind: Chain,
    pub controls: ControlPlan,
    pub switch: SwitchControl,
    pub fk_controls: Vec<BuiltControl>,
    pub ik_controls: IkControls,
    pub blend_links: Vec<BlendLink>,
    pub stretch: Option<StretchState>,
    pub fk_stretch: Vec<FkStretch>,
}

/// Build a limb from guides already in the scene.
///
/// The config is validated and every guide, the pole-vector guide included,
/// is looked up before the scene is touched. A failure after that leaves the
/// nodes created so far in place.
pub fn build_limb<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    config: &LimbConfig,
) -> Result<LimbRig, RigError> {
    let settings = config.validate()?;
    let guides = LimbGuides::from_scene(scene, &settings.guides, &settings.aliases)?;
    if let Some(pole) = &settings.pole_vector {
        if !scene.exists(&NodeRef::new(pole.as_str())) {
            return Err(RigError::InvalidTarget(pole.clone()));
        }
    }
    build_limb_from_guides(scene, &settings, &guides)
}

/// Build a limb from validated settings and guide data.
pub fn build_limb_from_guides<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    settings: &LimbSettings,
    guides: &LimbGuides,
) -> Result<LimbRig, RigError> {
    let name = settings.limb_name();

    let ik = build_chain(scene, settings.side, guides, ChainType::Ik)?;
    let fk = build_chain(scene, settings.side, guides, ChainType::Fk)?;
    let bind = build_chain(scene, settings.side, guides, ChainType::Bind)?;

    let plan = plan_controls(settings, &ik, &fk, &bind);
    let switch = build_switch_control(scene, &plan.switch)?;
    let blend_links = build_blend(scene, settings.side, &ik, &fk, &bind, &switch.attr)?;
    let fk_controls = build_fk_controls(scene, &plan.fk)?;
    let ik_controls = build_ik_controls(scene, &name, &plan, &ik)?;

    let (stretch, fk_stretch) = if settings.stretch {
        let controls = IkStretchControls {
            base: &ik_controls.base.control,
            world: &ik_controls.world.control,
            local: &ik_controls.local.control,
        };
        let state = configure_stretch(scene, &name, &ik, controls, settings.primary_axis)?;
        let fk_stretch = build_fk_stretch(scene, &fk, &fk_controls, settings.primary_axis)?;
        (Some(state), fk_stretch)
    } else {
        (None, Vec::new())
    };

    if settings.delete_guides {
        for guide in guides.guides() {
            let node = NodeRef::new(guide.name.as_str());
            if scene.exists(&node) {
                scene.delete(&node)?;
            }
        }
    }

    tracing::info!(
        limb = %name,
        size = plan.size,
        blend_links = blend_links.len(),
        stretch = settings.stretch,
        "built limb"
    );

    Ok(LimbRig {
        name,
        side: settings.side,
        limb: settings.limb,
        ik,
        fk,
        bind,
        controls: plan,
        switch,
        fk_controls,
        ik_controls,
        blend_links,
        stretch,
        fk_stretch,
    })
}
