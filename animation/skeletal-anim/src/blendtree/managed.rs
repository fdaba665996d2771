use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use super::SourceData;
use crate::channel::{Channel, StateData, TransformData, joint_channel_name};
use crate::clip::AnimationClip;
use crate::error::{Result, SkeletalError};
use crate::skeleton::Skeleton;

/// Joint transforms set directly by application code rather than by a clip
///
/// Useful for procedural control (look-at, ragdoll hand-off) blended with
/// clip playback. Playback time has no effect on it.
#[derive(Debug, Clone, Default)]
pub struct ManagedTransformSource {
    data: BTreeMap<String, TransformData>,
    source_name: Option<String>,
}

impl ManagedTransformSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn set_source_name(&mut self, name: impl Into<String>) {
        self.source_name = Some(name.into());
    }

    /// Current override of a joint, if any
    pub fn joint_transform_data(&self, joint_index: usize) -> Option<&TransformData> {
        self.data.get(&joint_channel_name(joint_index))
    }

    pub fn set_joint_transform_data(&mut self, joint_index: usize, data: TransformData) {
        self.data.insert(joint_channel_name(joint_index), data);
    }

    pub fn set_joint_translation(&mut self, joint_index: usize, translation: Vec3) {
        self.entry(joint_index).translation = translation;
    }

    pub fn set_joint_rotation(&mut self, joint_index: usize, rotation: Quat) {
        self.entry(joint_index).rotation = rotation;
    }

    pub fn set_joint_scale(&mut self, joint_index: usize, scale: Vec3) {
        self.entry(joint_index).scale = scale;
    }

    fn entry(&mut self, joint_index: usize) -> &mut TransformData {
        self.data.entry(joint_channel_name(joint_index)).or_default()
    }

    /// Seed the given joints from the first sample of their channels in `clip`
    pub fn init_joints_by_index(&mut self, clip: &AnimationClip, joints: &[usize]) -> Result<()> {
        for &joint_index in joints {
            let name = joint_channel_name(joint_index);
            let data = match clip.find_channel(&name) {
                Some(Channel::Transform(channel)) => channel.transform_data(0),
                _ => None,
            }
            .ok_or(SkeletalError::ChannelNotFound(name))?;
            self.set_joint_transform_data(joint_index, data);
        }
        Ok(())
    }

    /// Like [`Self::init_joints_by_index`], looking joints up by name
    pub fn init_joints_by_name(
        &mut self,
        skeleton: &Skeleton,
        clip: &AnimationClip,
        joint_names: &[&str],
    ) -> Result<()> {
        let indices = joint_names
            .iter()
            .map(|name| {
                skeleton
                    .find_joint_by_name(name)
                    .ok_or_else(|| SkeletalError::JointNotFound((*name).to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        self.init_joints_by_index(clip, &indices)
    }

    pub fn source_data(&self) -> SourceData {
        self.data
            .iter()
            .map(|(key, data)| (key.clone(), StateData::Transform(*data)))
            .collect()
    }

    /// Always active
    pub fn set_time(&mut self, _global_time: f64) -> bool {
        true
    }

    pub fn reset_clips(&mut self, _global_start_time: f64) {}
}
