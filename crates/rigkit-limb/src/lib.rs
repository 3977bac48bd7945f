//! Procedural IK/FK limb rigs.
//!
//! Builds three parallel joint chains from three guides, an FK/IK blend
//! network driving the bind chain, animator controls, an IK handle and an
//! optional stretch network. All scene access goes through
//! [`SceneAdapter`](scene::SceneAdapter).
//!
//! # Architecture
//!
//! ```text
//! LimbConfig ──► LimbGuides ──► Chain x3 ──► controls ──► blend / stretch ──► LimbRig
//!                                   │
//!                                   └── every mutation via SceneAdapter
//! ```

pub mod align;
pub mod blend;
pub mod chain;
pub mod controls;
pub mod limb;
pub mod naming;
pub mod network;
pub mod scene;
pub mod shapes;
pub mod stretch;

pub use align::{align_local_axes, compute_alignment, Aligned, Alignment, AlignmentResult};
pub use blend::{blend_value, build_blend, BlendLink};
pub use chain::{build_chain, Chain, JointSpec, LimbGuides};
pub use limb::{build_limb, build_limb_from_guides, LimbRig};
pub use scene::{MemoryScene, NodeRef, OffsetStrategy, Plug, SceneAdapter};
pub use stretch::{configure_stretch, StretchState};

pub mod prelude {
    pub use crate::align::{align_local_axes, AlignmentResult};
    pub use crate::blend::{blend_value, BlendLink};
    pub use crate::chain::{Chain, LimbGuides};
    pub use crate::controls::{control_size, ControlSpec, PolePlacement};
    pub use crate::limb::{build_limb, LimbRig};
    pub use crate::scene::{MemoryScene, NodeRef, OffsetStrategy, Plug, SceneAdapter, SceneOp};
    pub use crate::stretch::StretchState;
}
