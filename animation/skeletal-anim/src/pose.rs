//! Skeleton poses and forward kinematics
//!
//! A [`SkeletonPose`] is one posed instance of a shared [`Skeleton`]. It holds
//! three arrays indexed by joint:
//! - local transforms (joint space, relative to the parent joint)
//! - global transforms (model space)
//! - skin matrices (global * inverse bind pose), used to deform bind-pose
//!   geometry into the current pose
//!
//! Animation writes local transforms; [`SkeletonPose::update_transforms`]
//! then recomputes the other two arrays in a single pass.

use std::sync::Arc;

use glam::{Affine3A, Mat4};

use crate::skeleton::Skeleton;

/// Per-instance pose state for a skeleton
#[derive(Debug, Clone)]
pub struct SkeletonPose {
    /// The skeleton being posed
    skeleton: Arc<Skeleton>,
    /// Joint space transforms, relative to the parent joint
    local_transforms: Vec<Affine3A>,
    /// Model space transforms
    global_transforms: Vec<Affine3A>,
    /// Bind-pose model space -> current-pose model space, per joint
    skin_matrices: Vec<Mat4>,
}

impl SkeletonPose {
    /// Create a pose for the given skeleton, starting in bind pose
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        let count = skeleton.joint_count();
        let mut pose = Self {
            skeleton,
            local_transforms: vec![Affine3A::IDENTITY; count],
            global_transforms: vec![Affine3A::IDENTITY; count],
            skin_matrices: vec![Mat4::IDENTITY; count],
        };
        pose.set_to_bind_pose();
        pose
    }

    /// The skeleton this pose is bound to
    pub fn skeleton(&self) -> &Arc<Skeleton> {
        &self.skeleton
    }

    pub fn joint_count(&self) -> usize {
        self.local_transforms.len()
    }

    pub fn local_transforms(&self) -> &[Affine3A] {
        &self.local_transforms
    }

    /// Mutable local transforms. Call [`Self::update_transforms`] after editing.
    pub fn local_transforms_mut(&mut self) -> &mut [Affine3A] {
        &mut self.local_transforms
    }

    pub fn global_transforms(&self) -> &[Affine3A] {
        &self.global_transforms
    }

    /// Skin matrix palette, one per joint
    pub fn skin_matrices(&self) -> &[Mat4] {
        &self.skin_matrices
    }

    /// Skin matrices as a flat column-major float array for GPU upload
    ///
    /// Each joint contributes 16 floats.
    pub fn skin_matrix_data(&self) -> Vec<f32> {
        let mut data = Vec::with_capacity(self.skin_matrices.len() * 16);
        for matrix in &self.skin_matrices {
            data.extend_from_slice(&matrix.to_cols_array());
        }
        data
    }

    /// Reset local transforms to the skeleton's rest pose
    ///
    /// Each local transform becomes the inverse of the joint's inverse bind
    /// pose (its model space bind transform), with the parent's bind
    /// contribution removed so it is expressed relative to the parent.
    /// Global transforms and skin matrices are left untouched until the next
    /// [`Self::update_transforms`].
    pub fn set_to_bind_pose(&mut self) {
        let joints = self.skeleton.joints();
        for (i, joint) in joints.iter().enumerate() {
            let model_bind = joint.inverse_bind_pose().inverse();
            self.local_transforms[i] = match joint.parent() {
                Some(parent) => *joints[parent].inverse_bind_pose() * model_bind,
                None => model_bind,
            };
        }
    }

    /// Recompute global transforms and skin matrices from local transforms
    ///
    /// Joints are processed in index order; the skeleton guarantees that a
    /// parent's global transform is already current when its children are
    /// reached.
    pub fn update_transforms(&mut self) {
        let joints = self.skeleton.joints();
        for (i, joint) in joints.iter().enumerate() {
            // local -> parent -> model space
            self.global_transforms[i] = match joint.parent() {
                Some(parent) => self.global_transforms[parent] * self.local_transforms[i],
                None => self.local_transforms[i],
            };

            // bind-pose model space -> joint space -> current model space
            self.skin_matrices[i] =
                Mat4::from(self.global_transforms[i] * *joint.inverse_bind_pose());
        }
    }
}

/// Recompute transforms for many independent poses
///
/// With the `parallel` feature the poses are distributed across the rayon
/// thread pool; each pose is still processed sequentially.
pub fn update_poses(poses: &mut [SkeletonPose]) {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        poses.par_iter_mut().for_each(SkeletonPose::update_transforms);
    }

    #[cfg(not(feature = "parallel"))]
    {
        poses.iter_mut().for_each(SkeletonPose::update_transforms);
    }
}
