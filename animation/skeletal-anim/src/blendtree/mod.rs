//! Blend tree sources and pose application
//!
//! A blend tree is a composition of [`BlendTreeSource`]s. Leaves play clips
//! or hold manual joint overrides, inner nodes blend their children. Every
//! source produces a [`SourceData`] map of channel name to sampled value for
//! the current time; the [`AnimationApplier`] writes the final map into a
//! [`SkeletonPose`](crate::pose::SkeletonPose).
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use glam::{Quat, Vec3};
//! use skeletal_anim::blendtree::{BinaryLerpSource, BlendTreeSource, ClipSource, ValueStore};
//! use skeletal_anim::channel::TransformChannel;
//! use skeletal_anim::clip::AnimationClip;
//!
//! let walk = TransformChannel::new(
//!     "_jnt0",
//!     vec![0.0, 1.0],
//!     vec![Quat::IDENTITY; 2],
//!     vec![Vec3::ZERO, Vec3::X],
//!     vec![Vec3::ONE; 2],
//! )?;
//! let clip = Arc::new(AnimationClip::new("walk", vec![walk.into()]));
//!
//! let mut tree = BlendTreeSource::from(BinaryLerpSource::new(
//!     ClipSource::new(Arc::clone(&clip)).into(),
//!     ClipSource::new(clip).into(),
//! ));
//! tree.set_time(0.5);
//! let data = tree.source_data(&ValueStore::default());
//! assert!(data.contains_key("_jnt0"));
//! # Ok::<(), skeletal_anim::error::SkeletalError>(())
//! ```

mod applier;
mod clip_source;
mod lerp;
mod managed;

pub use applier::{AnimationApplier, ApplyReport, CallbackResult, TriggerCallback};
pub use clip_source::{ClipSource, ExclusiveClipSource, InclusiveClipSource};
pub use lerp::{BinaryLerpSource, combine_source_data};
pub use managed::ManagedTransformSource;

pub use crate::clip::SourceData;
use crate::logging_map::LoggingMap;

/// Named blend weights and other scalar parameters read by blend nodes
pub type ValueStore = LoggingMap<String, f64>;

/// A node of a blend tree
#[derive(Debug)]
pub enum BlendTreeSource {
    Clip(ClipSource),
    Inclusive(InclusiveClipSource),
    Exclusive(ExclusiveClipSource),
    Managed(ManagedTransformSource),
    BinaryLerp(Box<BinaryLerpSource>),
}

impl BlendTreeSource {
    /// Sampled values of this node for the current time
    pub fn source_data(&self, values: &ValueStore) -> SourceData {
        match self {
            Self::Clip(source) => source.source_data(),
            Self::Inclusive(source) => source.source_data(),
            Self::Exclusive(source) => source.source_data(),
            Self::Managed(source) => source.source_data(),
            Self::BinaryLerp(source) => source.source_data(values),
        }
    }

    /// Advance playback to `global_time`
    ///
    /// Returns true if any source below this node is still active.
    pub fn set_time(&mut self, global_time: f64) -> bool {
        match self {
            Self::Clip(source) => source.set_time(global_time),
            Self::Inclusive(source) => source.clip_source_mut().set_time(global_time),
            Self::Exclusive(source) => source.clip_source_mut().set_time(global_time),
            Self::Managed(source) => source.set_time(global_time),
            Self::BinaryLerp(source) => source.set_time(global_time),
        }
    }

    /// Restart every clip below this node at `global_start_time`
    pub fn reset_clips(&mut self, global_start_time: f64) {
        match self {
            Self::Clip(source) => source.reset_clips(global_start_time),
            Self::Inclusive(source) => source.clip_source_mut().reset_clips(global_start_time),
            Self::Exclusive(source) => source.clip_source_mut().reset_clips(global_start_time),
            Self::Managed(source) => source.reset_clips(global_start_time),
            Self::BinaryLerp(source) => source.reset_clips(global_start_time),
        }
    }
}

impl From<ClipSource> for BlendTreeSource {
    fn from(source: ClipSource) -> Self {
        Self::Clip(source)
    }
}

impl From<InclusiveClipSource> for BlendTreeSource {
    fn from(source: InclusiveClipSource) -> Self {
        Self::Inclusive(source)
    }
}

impl From<ExclusiveClipSource> for BlendTreeSource {
    fn from(source: ExclusiveClipSource) -> Self {
        Self::Exclusive(source)
    }
}

impl From<ManagedTransformSource> for BlendTreeSource {
    fn from(source: ManagedTransformSource) -> Self {
        Self::Managed(source)
    }
}

impl From<BinaryLerpSource> for BlendTreeSource {
    fn from(source: BinaryLerpSource) -> Self {
        Self::BinaryLerp(Box::new(source))
    }
}
