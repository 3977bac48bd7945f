//! IK and FK stretch.
//!
//! IK stretch measures the live distance between the base and local IK
//! controls and scales both IK segments along the primary axis once that
//! distance exceeds the chain's rest length:
//!
//! ```text
//! ratio   = live / total
//! factor  = live > total ? ratio : 1
//! toggled = lerp(1, factor, stretch)
//! scale_i = userLength_i + toggled - 1
//! ```
//!
//! FK stretch is purely local. Each non-terminal FK control gets a `stretch`
//! multiplier on the offset between it and the next joint. The stretched
//! offset moves the next control along the current control's primary axis:
//!
//! ```text
//! channel_k = weight_k * rest * stretch + bias_k
//! bias_k    = attachRest_k - weight_k * rest
//! ```

use nalgebra::{Point3, Vector3};
use rigkit_core::error::RigError;
use rigkit_core::geometry::lerp;
use rigkit_core::types::{Axis, Channel};

use crate::chain::Chain;
use crate::controls::BuiltControl;
use crate::naming;
use crate::network::NetworkPlan;
use crate::scene::{
    condition, multiply_divide, plus_minus_average, AttributeSpec, ConstraintKind, NodeRef, Plug,
    SceneAdapter, UtilityKind,
};

/// Stretch on/off attribute on the world IK control and on FK controls.
pub const STRETCH_ATTR: &str = "stretch";
/// Per-segment user length multipliers on the world IK control.
pub const SEGMENT_ATTRS: [&str; 2] = ["upperLength", "lowerLength"];

/// Direction components below this are left undriven.
const DIRECTION_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// StretchState
// ---------------------------------------------------------------------------

/// Rest lengths and live measurement of a two-segment limb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchState {
    pub upper: f64,
    pub lower: f64,
    pub total: f64,
    pub live_distance: f64,
}

impl StretchState {
    pub fn from_rest(upper: f64, lower: f64, live_distance: f64) -> Result<Self, RigError> {
        let total = upper + lower;
        if total.abs() <= f64::EPSILON {
            return Err(RigError::DivisionByZero(format!(
                "total rest length is zero (upper {upper}, lower {lower})"
            )));
        }
        Ok(Self {
            upper,
            lower,
            total,
            live_distance,
        })
    }

    /// Rest lengths from the first two segments of `chain`.
    pub fn from_chain(chain: &Chain, live_distance: f64) -> Result<Self, RigError> {
        let segments = chain.segment_lengths();
        let [upper, lower, ..] = segments[..] else {
            return Err(RigError::InvalidLimbSize {
                guides: chain.len(),
                aliases: chain.len(),
            });
        };
        Self::from_rest(upper, lower, live_distance)
    }

    #[must_use]
    pub const fn with_live_distance(mut self, live_distance: f64) -> Self {
        self.live_distance = live_distance;
        self
    }

    pub fn ratio(&self) -> f64 {
        self.live_distance / self.total
    }

    /// One-sided stretch: the ratio when the limb is pulled past rest, else 1.
    pub fn scale_factor(&self) -> f64 {
        if self.live_distance > self.total {
            self.ratio()
        } else {
            1.0
        }
    }

    /// Scale factor after the `stretch` toggle: 1 at `enable = 0`.
    pub fn blended_factor(&self, enable: f64) -> f64 {
        lerp(1.0, self.scale_factor(), enable)
    }

    /// Final segment scale from a user length multiplier and a factor.
    pub fn segment_scale(user_length: f64, factor: f64) -> f64 {
        user_length + factor - 1.0
    }
}

// ---------------------------------------------------------------------------
// IK stretch
// ---------------------------------------------------------------------------

/// Controls the IK stretch network reads.
#[derive(Debug, Clone, Copy)]
pub struct IkStretchControls<'a> {
    pub base: &'a NodeRef,
    pub world: &'a NodeRef,
    pub local: &'a NodeRef,
}

/// Plan the IK stretch network of a limb.
pub fn plan_ik_stretch(
    limb_name: &str,
    ik: &Chain,
    controls: IkStretchControls<'_>,
    axis: Axis,
    state: &StretchState,
) -> NetworkPlan {
    let mut plan = NetworkPlan::new();
    let name = |suffix: &str| naming::stretch_node_name(limb_name, suffix);

    let enable = plan.attribute(controls.world, AttributeSpec::ranged(STRETCH_ATTR, 0.0, 1.0, 1.0));
    let lengths: Vec<Plug> = SEGMENT_ATTRS
        .iter()
        .map(|attr| plan.attribute(controls.world, AttributeSpec::new(*attr, 1.0).with_min(0.0)))
        .collect();

    let start = plan.locator(name("Start_Loc"), None);
    plan.constrain(ConstraintKind::Point, controls.base, &start, false);
    let end = plan.locator(name("End_Loc"), None);
    plan.constrain(ConstraintKind::Point, controls.local, &end, false);

    let dist = plan.utility(UtilityKind::DistanceBetween, name("Dist"));
    plan.connect(start.plug("worldPosition"), dist.plug("point1"));
    plan.connect(end.plug("worldPosition"), dist.plug("point2"));

    let ratio = plan.utility(UtilityKind::MultiplyDivide, name("Ratio"));
    plan.set(ratio.plug("operation"), multiply_divide::DIVIDE);
    plan.connect(dist.plug("distance"), ratio.plug("input1X"));
    plan.set(ratio.plug("input2X"), state.total);

    let cond = plan.utility(UtilityKind::Condition, name("Cond"));
    plan.set(cond.plug("operation"), condition::GREATER_THAN);
    plan.connect(dist.plug("distance"), cond.plug("firstTerm"));
    plan.set(cond.plug("secondTerm"), state.total);
    plan.connect(ratio.plug("outputX"), cond.plug("colorIfTrueR"));
    plan.set(cond.plug("colorIfFalseR"), 1.0);

    let toggle = plan.utility(UtilityKind::BlendColors, name("Toggle"));
    plan.connect(enable, toggle.plug("blender"));
    plan.connect(cond.plug("outColorR"), toggle.plug("color1R"));
    plan.set(toggle.plug("color2R"), 1.0);

    for (i, (length, segment)) in lengths.into_iter().zip(["Upper_Sum", "Lower_Sum"]).enumerate() {
        let sum = plan.utility(UtilityKind::PlusMinusAverage, name(segment));
        plan.set(sum.plug("operation"), plus_minus_average::SUM);
        plan.connect(length, sum.plug("input1D[0]"));
        plan.connect(toggle.plug("outputR"), sum.plug("input1D[1]"));
        plan.set(sum.plug("input1D[2]"), -1.0);
        plan.connect(sum.plug("output1D"), ik.node(i).plug(Channel::Scale.component(axis)));
    }
    plan
}

/// Build the IK stretch network and return the limb's stretch state,
/// measured with the controls at rest.
pub fn configure_stretch<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    limb_name: &str,
    ik: &Chain,
    controls: IkStretchControls<'_>,
    axis: Axis,
) -> Result<StretchState, RigError> {
    let live = scene.distance_between(controls.base, controls.local)?;
    let state = StretchState::from_chain(ik, live)?;
    plan_ik_stretch(limb_name, ik, controls, axis, &state).apply(scene)?;
    tracing::debug!(
        limb = limb_name,
        upper = state.upper,
        lower = state.lower,
        live = state.live_distance,
        "built IK stretch"
    );
    Ok(state)
}

// ---------------------------------------------------------------------------
// FK stretch
// ---------------------------------------------------------------------------

/// One translate channel of a next control's attach node, driven by the
/// stretched rest offset.
#[derive(Debug, Clone, PartialEq)]
pub struct DrivenChannel {
    pub plug: Plug,
    /// Share of the stretched offset landing on this channel.
    pub weight: f64,
    /// Constant added so the rest pose reproduces the channel's rest value.
    pub bias: f64,
}

impl DrivenChannel {
    /// Channel value for a locator offset `rest` and a `stretch` multiplier.
    pub fn value(&self, rest: f64, stretch: f64) -> f64 {
        self.weight * rest * stretch + self.bias
    }
}

/// Stretch setup of one non-terminal FK control.
#[derive(Debug, Clone, PartialEq)]
pub struct FkStretch {
    pub control: NodeRef,
    pub locator: NodeRef,
    pub attr: Plug,
    /// Rest translation of the locator along the primary axis.
    pub rest: f64,
    pub driven: Vec<DrivenChannel>,
}

/// Rest offset of joint `index + 1` from joint `index` along `axis`, in the
/// local frame of joint `index`.
pub fn fk_rest_offset(fk: &Chain, index: usize, axis: Axis) -> f64 {
    let next = Point3::from(fk.joints[index + 1].world.translation.vector);
    (fk.joints[index].world.inverse() * next)[axis.index()]
}

/// Plan FK stretch for every FK control but the last.
///
/// The stretched offset runs along the primary axis of the current control.
/// It is rotated into the translate channels of the next control's attach
/// node, which may be expressed in the next joint's frame.
pub fn plan_fk_stretch(
    fk: &Chain,
    controls: &[BuiltControl],
    axis: Axis,
) -> (Vec<FkStretch>, NetworkPlan) {
    let mut plan = NetworkPlan::new();
    let mut stretches = Vec::new();

    for (i, pair) in controls.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);
        let control = &current.control;
        let name = |suffix: &str| naming::fk_stretch_node_name(control.name(), suffix);

        let attr = plan.attribute(control, AttributeSpec::new(STRETCH_ATTR, 1.0).with_min(0.0));
        let locator = plan.locator(name("Loc"), Some(control));
        plan.snap(&locator, fk.node(i + 1), true, false);

        let rest = fk_rest_offset(fk, i, axis);
        let (direction, attach_rest) = next.alignment.as_ref().map_or_else(
            || (Vector3::ith(axis.index(), 1.0), Vector3::zeros()),
            |a| (a.attach_channel_direction(axis), a.attach_rest_translation()),
        );

        let mult = plan.utility(UtilityKind::MultiplyDivide, name("Mult"));
        plan.set(mult.plug("operation"), multiply_divide::MULTIPLY);
        plan.connect(locator.plug(Channel::Translate.component(axis)), mult.plug("input1X"));
        plan.connect(attr.clone(), mult.plug("input2X"));

        let dir = plan.utility(UtilityKind::MultiplyDivide, name("Dir"));
        plan.set(dir.plug("operation"), multiply_divide::MULTIPLY);
        let sum = plan.utility(UtilityKind::PlusMinusAverage, name("Sum"));
        plan.set(sum.plug("operation"), plus_minus_average::SUM);

        let mut driven = Vec::new();
        for component in [Axis::X, Axis::Y, Axis::Z] {
            let k = component.index();
            let weight = direction[k];
            if weight.abs() <= DIRECTION_EPSILON {
                continue;
            }
            let letter = component.letter();
            let lower = letter.to_ascii_lowercase();
            let bias = attach_rest[k] - weight * rest;

            plan.connect(mult.plug("outputX"), dir.plug(format!("input1{letter}")));
            plan.set(dir.plug(format!("input2{letter}")), weight);
            plan.connect(
                dir.plug(format!("output{letter}")),
                sum.plug(format!("input3D[0].input3D{lower}")),
            );
            plan.set(sum.plug(format!("input3D[1].input3D{lower}")), bias);

            let plug = next.attach.plug(Channel::Translate.component(component));
            plan.connect(sum.plug(format!("output3D{lower}")), plug.clone());
            driven.push(DrivenChannel { plug, weight, bias });
        }

        stretches.push(FkStretch {
            control: control.clone(),
            locator,
            attr,
            rest,
            driven,
        });
    }
    (stretches, plan)
}

pub fn build_fk_stretch<S: SceneAdapter + ?Sized>(
    scene: &mut S,
    fk: &Chain,
    controls: &[BuiltControl],
    axis: Axis,
) -> Result<Vec<FkStretch>, RigError> {
    let (mut stretches, plan) = plan_fk_stretch(fk, controls, axis);
    let applied = plan.apply(scene)?;
    for s in &mut stretches {
        s.locator = applied.resolve(&s.locator);
    }
    tracing::debug!(count = stretches.len(), "built FK stretch");
    Ok(stretches)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rigkit_core::types::{ChainType, Guide, Side};

    use crate::chain::{build_chain, LimbGuides};
    use crate::scene::MemoryScene;

    fn arm_guides() -> LimbGuides {
        LimbGuides::new(
            vec![
                Guide::at("LeftShoulder", [0.0, 0.0, 0.0]),
                Guide::at("LeftElbow", [5.0, 0.0, 0.0]),
                Guide::at("LeftWrist", [10.0, 0.0, 0.0]),
            ],
            vec!["Shoulder".into(), "Elbow".into(), "Wrist".into()],
        )
        .unwrap()
    }

    #[test]
    fn ratio_applies_only_past_rest() {
        let state = StretchState::from_rest(5.0, 5.0, 12.0).unwrap();
        assert_relative_eq!(state.total, 10.0);
        assert_relative_eq!(state.ratio(), 1.2);
        assert_relative_eq!(state.scale_factor(), 1.2);
        let shorter = state.with_live_distance(8.0);
        assert_relative_eq!(shorter.ratio(), 0.8);
        assert_relative_eq!(shorter.scale_factor(), 1.0);
    }

    #[test]
    fn scale_factor_is_monotonic_past_rest() {
        let state = StretchState::from_rest(3.0, 4.0, 0.0).unwrap();
        let mut previous = 1.0;
        for step in 1..50 {
            let live = 7.0 + f64::from(step) * 0.25;
            let factor = state.with_live_distance(live).scale_factor();
            assert!(factor > previous);
            previous = factor;
        }
        for step in 0..=28 {
            let live = f64::from(step) * 0.25;
            assert_relative_eq!(state.with_live_distance(live).scale_factor(), 1.0);
        }
    }

    #[test]
    fn toggle_and_segment_scale() {
        let state = StretchState::from_rest(5.0, 5.0, 12.0).unwrap();
        assert_relative_eq!(state.blended_factor(0.0), 1.0);
        assert_relative_eq!(state.blended_factor(1.0), 1.2);
        assert_relative_eq!(state.blended_factor(0.5), 1.1);
        assert_relative_eq!(StretchState::segment_scale(1.0, 1.2), 1.2);
        assert_relative_eq!(StretchState::segment_scale(1.5, 1.0), 1.5);
    }

    #[test]
    fn zero_rest_length_is_division_by_zero() {
        assert!(matches!(
            StretchState::from_rest(0.0, 0.0, 1.0),
            Err(RigError::DivisionByZero(_))
        ));
    }

    #[test]
    fn ik_network_drives_segment_scales() {
        let mut scene = MemoryScene::new();
        let ik = build_chain(&mut scene, Side::Left, &arm_guides(), ChainType::Ik).unwrap();
        let base = scene.create_locator("base", None).unwrap();
        let world = scene.create_locator("world", None).unwrap();
        let local = scene.create_locator("local", Some(&world)).unwrap();
        scene.snap(&base, ik.node(0), true, true, false).unwrap();
        scene.snap(&world, ik.node(2), true, true, false).unwrap();

        let controls = IkStretchControls {
            base: &base,
            world: &world,
            local: &local,
        };
        let state = configure_stretch(&mut scene, "L_arm", &ik, controls, Axis::X).unwrap();
        assert_relative_eq!(state.total, 10.0);
        assert_relative_eq!(state.live_distance, 10.0, epsilon = 1e-12);
        assert_relative_eq!(state.scale_factor(), 1.0);

        assert_eq!(scene.attribute(&world.plug("stretch")), Some(1.0));
        assert_eq!(scene.attribute(&world.plug("upperLength")), Some(1.0));
        let upper = scene.incoming(&ik.node(0).plug("scaleX")).unwrap();
        assert_eq!(upper.to_string(), "L_arm_Stretch_Upper_Sum.output1D");
        let lower = scene.incoming(&ik.node(1).plug("scaleX")).unwrap();
        assert_eq!(lower.to_string(), "L_arm_Stretch_Lower_Sum.output1D");
        assert_eq!(
            scene.attribute(&NodeRef::new("L_arm_Stretch_Ratio").plug("input2X")),
            Some(10.0)
        );
        assert_eq!(
            scene.incoming(&NodeRef::new("L_arm_Stretch_Toggle").plug("blender")),
            Some(&world.plug("stretch"))
        );
    }

    #[test]
    fn driven_channel_rests_at_bias_plus_offset() {
        // Offset-matrix control turned -90 degrees: the bone runs along its +Y.
        let channel = DrivenChannel {
            plug: NodeRef::new("LElbow_FK_Ctrl").plug("translateY"),
            weight: 1.0,
            bias: -5.0,
        };
        assert_relative_eq!(channel.value(5.0, 1.0), 0.0);
        assert_relative_eq!(channel.value(5.0, 2.0), 5.0);
        assert_relative_eq!(channel.value(5.0, 0.0), -5.0);
    }

    #[test]
    fn fk_rest_offset_in_joint_frame() {
        let chain = Chain::plan(Side::Left, &arm_guides(), ChainType::Fk);
        assert_relative_eq!(fk_rest_offset(&chain, 0, Axis::X), 5.0);
        assert_relative_eq!(fk_rest_offset(&chain, 1, Axis::NegX), 5.0);
        assert_relative_eq!(fk_rest_offset(&chain, 0, Axis::Y), 0.0);
    }
}
