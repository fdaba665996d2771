//! Attachment points for props carried by a joint

use glam::Affine3A;

use crate::error::{Result, SkeletalError};
use crate::pose::SkeletonPose;

/// A fixed offset from a joint, e.g. a weapon held in a hand
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct AttachmentPoint {
    pub joint_index: usize,
    /// Transform of the attachment relative to the joint
    pub offset: Affine3A,
}

impl AttachmentPoint {
    pub fn new(joint_index: usize, offset: Affine3A) -> Self {
        Self {
            joint_index,
            offset,
        }
    }

    /// Model space transform of the attachment in the given pose
    pub fn world_transform(&self, pose: &SkeletonPose) -> Result<Affine3A> {
        let global = pose.global_transforms().get(self.joint_index).ok_or(
            SkeletalError::JointIndexOutOfRange {
                index: self.joint_index,
                joint_count: pose.joint_count(),
            },
        )?;
        Ok(*global * self.offset)
    }
}
