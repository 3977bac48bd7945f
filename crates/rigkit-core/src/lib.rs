// rigkit-core: Types, geometry, config and errors for procedural limb rigs.

pub mod config;
pub mod error;
pub mod geometry;
pub mod types;

pub mod prelude {
    pub use crate::config::{ControlColors, GuideConfig, LimbConfig, LimbSettings, RigFile};
    pub use crate::error::{ConfigError, RigError, RigkitError};
    pub use crate::geometry::{axis_vector, distance, lerp, reset_to_origin, ResetToOrigin};
    pub use crate::types::{Axis, ChainType, Channel, Guide, LimbType, Side};
}
