//! Skeleton joints

use glam::Affine3A;

/// A single node of a skeleton hierarchy.
///
/// The parent is stored as an index into the owning skeleton's joint array;
/// [`Joint::NO_PARENT`] marks a root joint.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(rename_all = "camelCase"))]
pub struct Joint {
    /// Human readable name, for display and lookup
    name: String,
    /// Parent joint index ([`Joint::NO_PARENT`] for roots)
    #[cfg_attr(feature = "serde-support", serde(default = "no_parent"))]
    parent_index: u16,
    /// Inverse of the joint space -> model space transform in bind position
    #[cfg_attr(feature = "serde-support", serde(default = "identity"))]
    inverse_bind_pose: Affine3A,
}

#[cfg(feature = "serde-support")]
const fn no_parent() -> u16 {
    Joint::NO_PARENT
}

#[cfg(feature = "serde-support")]
const fn identity() -> Affine3A {
    Affine3A::IDENTITY
}

impl Joint {
    /// Parent sentinel for root joints
    pub const NO_PARENT: u16 = u16::MAX;

    /// Create a root joint with an identity inverse bind pose
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent_index: Self::NO_PARENT,
            inverse_bind_pose: Affine3A::IDENTITY,
        }
    }

    /// Builder: set the parent joint index
    pub fn with_parent(mut self, parent_index: u16) -> Self {
        self.parent_index = parent_index;
        self
    }

    /// Builder: set the inverse bind pose
    pub fn with_inverse_bind_pose(mut self, inverse_bind_pose: Affine3A) -> Self {
        self.inverse_bind_pose = inverse_bind_pose;
        self
    }

    /// Joint name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw parent index, [`Joint::NO_PARENT`] for roots
    pub fn parent_index(&self) -> u16 {
        self.parent_index
    }

    /// Parent joint index, `None` for roots
    pub fn parent(&self) -> Option<usize> {
        (self.parent_index != Self::NO_PARENT).then_some(self.parent_index as usize)
    }

    pub fn set_parent_index(&mut self, parent_index: u16) {
        self.parent_index = parent_index;
    }

    /// Inverse of the joint's bind-pose model transform
    pub fn inverse_bind_pose(&self) -> &Affine3A {
        &self.inverse_bind_pose
    }

    pub fn set_inverse_bind_pose(&mut self, inverse_bind_pose: Affine3A) {
        self.inverse_bind_pose = inverse_bind_pose;
    }

    /// Check if this joint is a root (has no parent)
    pub fn is_root(&self) -> bool {
        self.parent_index == Self::NO_PARENT
    }
}

impl std::fmt::Display for Joint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Joint: '{}'", self.name)
    }
}
