//! Node naming scheme.
//!
//! Every node the builders create is named here so a rig's names can be
//! predicted from its side, limb and aliases alone.

use rigkit_core::types::{ChainType, Channel, Side};

/// `{side}{alias}_{chainType}_Joint`, e.g. `LShoulder_IK_Joint`.
pub fn joint_name(side: Side, alias: &str, chain_type: ChainType) -> String {
    format!("{}{}_{}_Joint", side.prefix(), alias, chain_type.label())
}

/// Offset transform inserted above an aligned control.
pub fn offset_name(control: &str) -> String {
    format!("{control}_OFF_GRP")
}

pub fn fk_control_name(side: Side, alias: &str) -> String {
    format!("{}{}_FK_Ctrl", side.prefix(), alias)
}

/// Roles of the IK controls of a limb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IkControlRole {
    Base,
    World,
    Local,
    PoleVector,
}

impl IkControlRole {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Base => "Base",
            Self::World => "World",
            Self::Local => "Local",
            Self::PoleVector => "PV",
        }
    }
}

/// `{limb}_IK_{role}_Ctrl`, e.g. `L_arm_IK_PV_Ctrl`.
pub fn ik_control_name(limb_name: &str, role: IkControlRole) -> String {
    format!("{limb_name}_IK_{}_Ctrl", role.label())
}

/// The FK/IK switch control.
pub fn switch_control_name(limb_name: &str) -> String {
    format!("{limb_name}_IKFK_Ctrl")
}

pub fn ik_handle_name(limb_name: &str) -> String {
    format!("{limb_name}_IK_Handle")
}

/// Blend node feeding one channel of one bind joint, e.g. `LElbow_rotate_Blend`.
pub fn blend_node_name(side: Side, alias: &str, channel: Channel) -> String {
    format!("{}{}_{}_Blend", side.prefix(), alias, channel.attr())
}

/// Node of the IK stretch network, e.g. `L_arm_Stretch_Dist`.
pub fn stretch_node_name(limb_name: &str, suffix: &str) -> String {
    format!("{limb_name}_Stretch_{suffix}")
}

/// Node of the FK stretch network belonging to one FK control.
pub fn fk_stretch_node_name(control: &str, suffix: &str) -> String {
    format!("{control}_Stretch_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joint_names_follow_scheme() {
        assert_eq!(joint_name(Side::Left, "Shoulder", ChainType::Ik), "LShoulder_IK_Joint");
        assert_eq!(joint_name(Side::Right, "Knee", ChainType::Fk), "RKnee_FK_Joint");
        assert_eq!(joint_name(Side::Left, "Wrist", ChainType::Bind), "LWrist_Bind_Joint");
    }

    #[test]
    fn control_names() {
        assert_eq!(fk_control_name(Side::Left, "Elbow"), "LElbow_FK_Ctrl");
        assert_eq!(ik_control_name("L_arm", IkControlRole::PoleVector), "L_arm_IK_PV_Ctrl");
        assert_eq!(ik_control_name("R_leg", IkControlRole::Base), "R_leg_IK_Base_Ctrl");
        assert_eq!(switch_control_name("L_arm"), "L_arm_IKFK_Ctrl");
        assert_eq!(offset_name("L_arm_IKFK_Ctrl"), "L_arm_IKFK_Ctrl_OFF_GRP");
    }

    #[test]
    fn network_names() {
        assert_eq!(blend_node_name(Side::Left, "Elbow", Channel::Rotate), "LElbow_rotate_Blend");
        assert_eq!(stretch_node_name("L_arm", "Dist"), "L_arm_Stretch_Dist");
        assert_eq!(
            fk_stretch_node_name("LShoulder_FK_Ctrl", "Loc"),
            "LShoulder_FK_Ctrl_Stretch_Loc"
        );
    }
}
