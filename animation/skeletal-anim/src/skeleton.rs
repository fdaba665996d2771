//! Skeleton hierarchy
//!
//! A [`Skeleton`] is a flat, ordered array of [`Joint`]s. Every joint's parent
//! must precede it in the array, which lets forward kinematics run as a single
//! pass in index order. The ordering is validated when the skeleton is built;
//! afterwards the skeleton is immutable and is shared between poses through an
//! `Arc`.

use crate::error::{Result, SkeletalError};
use crate::joint::Joint;

/// An immutable, validated joint hierarchy
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(try_from = "SkeletonFields"))]
pub struct Skeleton {
    name: String,
    joints: Vec<Joint>,
}

/// Unvalidated skeleton fields, as read by a deserializer
#[cfg(feature = "serde-support")]
#[derive(serde::Deserialize)]
struct SkeletonFields {
    #[serde(default)]
    name: String,
    #[serde(default)]
    joints: Vec<Joint>,
}

#[cfg(feature = "serde-support")]
impl TryFrom<SkeletonFields> for Skeleton {
    type Error = SkeletalError;

    fn try_from(fields: SkeletonFields) -> Result<Self> {
        Self::new(fields.name, fields.joints)
    }
}

impl Skeleton {
    /// Create a skeleton from joints ordered parents-first
    ///
    /// Fails if any joint's parent does not come strictly before it, or if
    /// the joint count collides with the root sentinel.
    pub fn new(name: impl Into<String>, joints: Vec<Joint>) -> Result<Self> {
        let name = name.into();

        if joints.len() > Joint::NO_PARENT as usize {
            return Err(SkeletalError::TooManyJoints {
                name,
                count: joints.len(),
            });
        }

        for (index, joint) in joints.iter().enumerate() {
            if let Some(parent) = joint.parent()
                && parent >= index
            {
                return Err(SkeletalError::ParentOutOfOrder {
                    joint: joint.name().to_string(),
                    index,
                    parent,
                });
            }
        }

        Ok(Self { name, joints })
    }

    /// Skeleton name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Joints in processing order
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Number of joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Get a joint by index
    pub fn joint(&self, index: usize) -> Option<&Joint> {
        self.joints.get(index)
    }

    /// Find the index of the first joint with the given name
    pub fn find_joint_by_name(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|joint| joint.name() == name)
    }

    /// Indices of the direct children of a joint
    pub fn children_of(&self, index: usize) -> Vec<usize> {
        self.joints
            .iter()
            .enumerate()
            .filter(|(_, joint)| joint.parent() == Some(index))
            .map(|(i, _)| i)
            .collect()
    }
}
