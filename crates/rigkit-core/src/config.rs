use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RigError};
use crate::types::{Axis, Guide, LimbType, Side};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

fn default_side() -> String {
    "L".into()
}
fn default_limb() -> String {
    "arm".into()
}
fn default_primary_axis() -> String {
    "X".into()
}
fn default_up_axis() -> String {
    "Y".into()
}
const fn default_left_color() -> u8 {
    6
}
const fn default_right_color() -> u8 {
    13
}
const fn default_switch_color() -> u8 {
    17
}

// ---------------------------------------------------------------------------
// ControlColors
// ---------------------------------------------------------------------------

/// Host color indices applied to generated controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlColors {
    /// Color of left-side FK/IK controls (default: 6, blue).
    #[serde(default = "default_left_color")]
    pub left: u8,
    /// Color of right-side FK/IK controls (default: 13, red).
    #[serde(default = "default_right_color")]
    pub right: u8,
    /// Color of the FK/IK switch control (default: 17, yellow).
    #[serde(default = "default_switch_color")]
    pub switch: u8,
}

impl Default for ControlColors {
    fn default() -> Self {
        Self {
            left: default_left_color(),
            right: default_right_color(),
            switch: default_switch_color(),
        }
    }
}

impl ControlColors {
    /// Color for the FK/IK controls of `side`.
    pub const fn for_side(&self, side: Side) -> u8 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

// ---------------------------------------------------------------------------
// LimbConfig
// ---------------------------------------------------------------------------

/// Raw, unvalidated description of one limb to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimbConfig {
    /// `"L"` or `"R"`.
    #[serde(default = "default_side")]
    pub side: String,

    /// `"arm"` or `"leg"`.
    #[serde(default = "default_limb")]
    pub limb: String,

    /// Guide names ordered root to end, e.g. shoulder, elbow, wrist.
    pub joints: Vec<String>,

    /// Semantic alias per guide, same order as `joints`.
    /// Defaults to the limb type's aliases when omitted.
    #[serde(default)]
    pub aliases: Option<Vec<String>>,

    /// Guide marking where the pole-vector control goes. Computed when absent.
    #[serde(default)]
    pub pole_vector: Option<String>,

    /// Axis that points down the bone (default: X).
    #[serde(default = "default_primary_axis")]
    pub primary_axis: String,

    /// Axis used to offset the switch control off the limb (default: Y).
    #[serde(default = "default_up_axis")]
    pub up_axis: String,

    /// Build the stretch networks.
    #[serde(default)]
    pub stretch: bool,

    /// Delete the guide nodes once the limb is built.
    #[serde(default)]
    pub delete_guides: bool,

    #[serde(default)]
    pub colors: ControlColors,
}

impl LimbConfig {
    /// Config for a limb with default aliases and axes.
    pub fn new(side: &str, limb: &str, joints: [&str; 3]) -> Self {
        Self {
            side: side.into(),
            limb: limb.into(),
            joints: joints.iter().map(|j| (*j).to_string()).collect(),
            aliases: None,
            pole_vector: None,
            primary_axis: default_primary_axis(),
            up_axis: default_up_axis(),
            stretch: false,
            delete_guides: false,
            colors: ControlColors::default(),
        }
    }

    #[must_use]
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = Some(aliases.iter().map(|a| (*a).to_string()).collect());
        self
    }

    #[must_use]
    pub fn with_pole_vector(mut self, guide: impl Into<String>) -> Self {
        self.pole_vector = Some(guide.into());
        self
    }

    #[must_use]
    pub fn with_axes(mut self, primary: &str, up: &str) -> Self {
        self.primary_axis = primary.into();
        self.up_axis = up.into();
        self
    }

    #[must_use]
    pub const fn with_stretch(mut self, stretch: bool) -> Self {
        self.stretch = stretch;
        self
    }

    #[must_use]
    pub const fn with_delete_guides(mut self, delete_guides: bool) -> Self {
        self.delete_guides = delete_guides;
        self
    }

    /// Check side, limb type, guide/alias counts and axes, in that order.
    pub fn validate(&self) -> Result<LimbSettings, RigError> {
        let side: Side = self.side.parse()?;
        let limb: LimbType = self.limb.parse()?;

        let aliases: Vec<String> = match &self.aliases {
            Some(aliases) => aliases.clone(),
            None => limb
                .default_aliases()
                .iter()
                .map(|a| (*a).to_string())
                .collect(),
        };
        if self.joints.len() != 3 || aliases.len() != 3 {
            return Err(RigError::InvalidLimbSize {
                guides: self.joints.len(),
                aliases: aliases.len(),
            });
        }

        let primary_axis: Axis = self.primary_axis.parse()?;
        let up_axis: Axis = self.up_axis.parse()?;
        if primary_axis.index() == up_axis.index() {
            return Err(RigError::InvalidAxis(format!(
                "{up_axis} (parallel to primary axis {primary_axis})"
            )));
        }

        Ok(LimbSettings {
            side,
            limb,
            guides: [
                self.joints[0].clone(),
                self.joints[1].clone(),
                self.joints[2].clone(),
            ],
            aliases: [aliases[0].clone(), aliases[1].clone(), aliases[2].clone()],
            pole_vector: self.pole_vector.clone(),
            primary_axis,
            up_axis,
            stretch: self.stretch,
            delete_guides: self.delete_guides,
            colors: self.colors,
        })
    }
}

// ---------------------------------------------------------------------------
// LimbSettings
// ---------------------------------------------------------------------------

/// Validated limb description. Index 0 is the root (shoulder/hip).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimbSettings {
    pub side: Side,
    pub limb: LimbType,
    pub guides: [String; 3],
    pub aliases: [String; 3],
    pub pole_vector: Option<String>,
    pub primary_axis: Axis,
    pub up_axis: Axis,
    pub stretch: bool,
    pub delete_guides: bool,
    pub colors: ControlColors,
}

impl LimbSettings {
    /// `{side}_{limb}`, e.g. `L_arm`.
    pub fn limb_name(&self) -> String {
        format!("{}_{}", self.side.prefix(), self.limb.as_str())
    }
}

// ---------------------------------------------------------------------------
// RigFile
// ---------------------------------------------------------------------------

/// A guide as written in a rig file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideConfig {
    pub name: String,
    pub position: [f64; 3],
    /// XYZ Euler rotation in degrees.
    #[serde(default)]
    pub rotation: [f64; 3],
}

impl GuideConfig {
    pub fn to_guide(&self) -> Guide {
        Guide::from_euler_degrees(self.name.clone(), self.position, self.rotation)
    }
}

/// Authoring input for one or more limbs: the guides and the limbs built on them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigFile {
    #[serde(default)]
    pub guides: Vec<GuideConfig>,
    #[serde(default)]
    pub limbs: Vec<LimbConfig>,
}

impl RigFile {
    /// Load from a TOML file and validate every limb.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML and validate every limb.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: Self = toml::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limbs.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "limbs".into(),
                message: "at least one limb is required".into(),
            });
        }
        for limb in &self.limbs {
            limb.validate()?;
        }
        Ok(())
    }

    pub fn guides(&self) -> Vec<Guide> {
        self.guides.iter().map(GuideConfig::to_guide).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn arm() -> LimbConfig {
        LimbConfig::new("L", "arm", ["LeftShoulder", "LeftElbow", "LeftWrist"])
    }

    #[test]
    fn validate_default_arm() {
        let settings = arm().validate().unwrap();
        assert_eq!(settings.side, Side::Left);
        assert_eq!(settings.limb, LimbType::Arm);
        assert_eq!(settings.aliases, ["Shoulder", "Elbow", "Wrist"].map(String::from));
        assert_eq!(settings.primary_axis, Axis::X);
        assert_eq!(settings.up_axis, Axis::Y);
        assert_eq!(settings.limb_name(), "L_arm");
    }

    #[test]
    fn validate_rejects_bad_side() {
        let mut config = arm();
        config.side = "X".into();
        assert_eq!(config.validate(), Err(RigError::InvalidSide("X".into())));
    }

    #[test]
    fn validate_rejects_bad_limb() {
        let mut config = arm();
        config.limb = "wing".into();
        assert_eq!(
            config.validate(),
            Err(RigError::InvalidLimbType("wing".into()))
        );
    }

    #[test]
    fn validate_side_checked_before_limb() {
        let mut config = arm();
        config.side = "M".into();
        config.limb = "wing".into();
        assert!(matches!(config.validate(), Err(RigError::InvalidSide(_))));
    }

    #[test]
    fn validate_rejects_two_guides() {
        let mut config = arm();
        config.joints.pop();
        assert_eq!(
            config.validate(),
            Err(RigError::InvalidLimbSize {
                guides: 2,
                aliases: 3
            })
        );
    }

    #[test]
    fn validate_rejects_alias_count() {
        let config = arm().with_aliases(&["Shoulder", "Elbow"]);
        assert_eq!(
            config.validate(),
            Err(RigError::InvalidLimbSize {
                guides: 3,
                aliases: 2
            })
        );
    }

    #[test]
    fn validate_rejects_bad_axis() {
        let config = arm().with_axes("W", "Y");
        assert_eq!(config.validate(), Err(RigError::InvalidAxis("W".into())));
    }

    #[test]
    fn validate_rejects_parallel_axes() {
        let config = arm().with_axes("X", "-X");
        assert!(matches!(config.validate(), Err(RigError::InvalidAxis(_))));
    }

    #[test]
    fn leg_uses_leg_aliases() {
        let settings = LimbConfig::new("R", "leg", ["RightHip", "RightKnee", "RightAnkle"])
            .validate()
            .unwrap();
        assert_eq!(settings.aliases, ["Hip", "Knee", "Ankle"].map(String::from));
        assert_eq!(settings.limb_name(), "R_leg");
    }

    #[test]
    fn control_colors_by_side() {
        let colors = ControlColors::default();
        assert_eq!(colors.for_side(Side::Left), 6);
        assert_eq!(colors.for_side(Side::Right), 13);
        assert_eq!(colors.switch, 17);
    }

    #[test]
    fn rig_file_from_toml() {
        let toml_str = r#"
            [[guides]]
            name = "LeftShoulder"
            position = [0.0, 0.0, 0.0]

            [[guides]]
            name = "LeftElbow"
            position = [5.0, 0.0, 0.0]
            rotation = [0.0, 0.0, 0.0]

            [[guides]]
            name = "LeftWrist"
            position = [10.0, 0.0, 0.0]

            [[limbs]]
            side = "L"
            limb = "arm"
            joints = ["LeftShoulder", "LeftElbow", "LeftWrist"]
            stretch = true

            [limbs.colors]
            left = 18
        "#;
        let file = RigFile::from_toml_str(toml_str).unwrap();
        assert_eq!(file.guides().len(), 3);
        assert_eq!(file.limbs.len(), 1);
        let limb = &file.limbs[0];
        assert!(limb.stretch);
        assert!(!limb.delete_guides);
        assert_eq!(limb.colors.left, 18);
        assert_eq!(limb.colors.right, 13);
        assert_eq!(limb.primary_axis, "X");
    }

    #[test]
    fn rig_file_invalid_limb_fails() {
        let toml_str = r#"
            [[limbs]]
            side = "Q"
            joints = ["a", "b", "c"]
        "#;
        let err = RigFile::from_toml_str(toml_str).unwrap_err();
        assert!(matches!(err, ConfigError::Rig(RigError::InvalidSide(_))));
    }

    #[test]
    fn rig_file_without_limbs_fails() {
        let err = RigFile::from_toml_str("").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn rig_file_bad_toml() {
        let err = RigFile::from_toml_str("limbs = [").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn rig_file_missing_path() {
        let err = RigFile::from_file("/nonexistent/rig.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
