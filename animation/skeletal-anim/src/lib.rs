//! Skeletal animation core
//!
//! The pipeline, leaves first:
//!
//! - [`Skeleton`]: an immutable, parents-first array of [`Joint`]s
//! - [`SkeletonPose`]: per-instance local/global transforms and skin matrices
//! - [`channel`]: time-sampled transform and trigger tracks, grouped into
//!   [`AnimationClip`]s
//! - [`blendtree`]: sources that sample and blend clips into a named value map,
//!   and the [`AnimationApplier`] that writes it into a pose
//! - [`AnimationManager`]: layers of state machines driving one pose
//! - [`skinning`]: CPU deformation of bind-pose meshes by a pose
//!
//! # Features
//!
//! - `serde-support`: serde derives for skeletons, channels, clips and meshes
//! - `parallel`: [`update_poses`] spreads independent poses over rayon

pub mod attachment;
pub mod blendtree;
pub mod channel;
pub mod clip;
pub mod error;
pub mod joint;
pub mod layer;
pub mod logging_map;
pub mod manager;
pub mod pose;
pub mod skeleton;
pub mod skinning;
pub mod state;

// Re-export common types
pub use attachment::AttachmentPoint;
pub use blendtree::{AnimationApplier, BlendTreeSource, SourceData, ValueStore};
pub use channel::{Channel, StateData, TransformChannel, TransformData, TriggerChannel, TriggerData};
pub use clip::{AnimationClip, AnimationClipState};
pub use error::{Result, SkeletalError};
pub use joint::Joint;
pub use layer::AnimationLayer;
pub use manager::AnimationManager;
pub use pose::{SkeletonPose, update_poses};
pub use skeleton::Skeleton;
pub use skinning::{MeshData, SkinnedMesh};
pub use state::{BlendType, SteadyState, Transition};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
