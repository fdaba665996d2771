//! CPU vertex skinning
//!
//! Deforms bind-pose vertex and normal buffers into the current pose. Each
//! vertex is influenced by up to [`MAX_INFLUENCES`] joints; its skinned
//! position is the weighted sum of the bind position transformed by each
//! influencing joint's skin matrix. Normals are skinned the same way but as
//! directions, so translation does not affect them.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use skeletal_anim::joint::Joint;
//! use skeletal_anim::pose::SkeletonPose;
//! use skeletal_anim::skeleton::Skeleton;
//! use skeletal_anim::skinning::{MeshData, SkinnedMesh};
//!
//! let skeleton = Arc::new(Skeleton::new("rig", vec![Joint::new("root")])?);
//! let mut pose = SkeletonPose::new(skeleton);
//! pose.update_transforms();
//!
//! let bind = MeshData::new(vec![1.0, 2.0, 3.0], None)?;
//! let mut mesh = SkinnedMesh::new(bind, vec![0], vec![1.0], 1)?;
//! mesh.apply_pose(&pose)?;
//! assert_eq!(mesh.mesh_data().vertices(), &[1.0, 2.0, 3.0]);
//! # Ok::<(), skeletal_anim::error::SkeletalError>(())
//! ```

use glam::Vec3;

use crate::error::{Result, SkeletalError};
use crate::pose::SkeletonPose;

/// Maximum number of joint influences per vertex
pub const MAX_INFLUENCES: usize = 4;

/// Flat vertex and optional normal buffers, three floats per vertex
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshData {
    vertices: Vec<f32>,
    normals: Option<Vec<f32>>,
}

impl MeshData {
    pub fn new(vertices: Vec<f32>, normals: Option<Vec<f32>>) -> Result<Self> {
        if vertices.len() % 3 != 0 {
            return Err(SkeletalError::InvalidSkinBuffers(format!(
                "vertex buffer length {} is not a multiple of 3",
                vertices.len()
            )));
        }
        if let Some(normals) = &normals
            && normals.len() != vertices.len()
        {
            return Err(SkeletalError::InvalidSkinBuffers(format!(
                "normal buffer length {} does not match vertex buffer length {}",
                normals.len(),
                vertices.len()
            )));
        }
        Ok(Self { vertices, normals })
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn normals(&self) -> Option<&[f32]> {
        self.normals.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }
}

/// Axis-aligned bounds of a vertex buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// Bounds of a flat xyz buffer, `None` if it is empty
    pub fn from_vertices(vertices: &[f32]) -> Option<Self> {
        let mut points = vertices.chunks_exact(3).map(Vec3::from_slice);
        let first = points.next()?;
        Some(points.fold(Self { min: first, max: first }, |bounds, point| Self {
            min: bounds.min.min(point),
            max: bounds.max.max(point),
        }))
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// A mesh deformed on the CPU by a skeleton pose
#[derive(Debug, Clone)]
pub struct SkinnedMesh {
    weights_per_vertex: usize,
    bind_pose: MeshData,
    mesh: MeshData,
    /// `weights_per_vertex` joint indices per vertex
    joint_indices: Vec<u16>,
    /// `weights_per_vertex` weights per vertex; zero marks an unused slot
    weights: Vec<f32>,
    /// Recompute [`SkinnedMesh::bounds`] after every apply
    pub auto_update_bounds: bool,
    bounds: Option<BoundingBox>,
}

impl SkinnedMesh {
    /// Create a skinned mesh
    ///
    /// `joint_indices` and `weights` hold `weights_per_vertex` entries per
    /// bind-pose vertex. Weights are expected to be normalized.
    pub fn new(
        bind_pose: MeshData,
        joint_indices: Vec<u16>,
        weights: Vec<f32>,
        weights_per_vertex: usize,
    ) -> Result<Self> {
        if !(1..=MAX_INFLUENCES).contains(&weights_per_vertex) {
            return Err(SkeletalError::InvalidSkinBuffers(format!(
                "{weights_per_vertex} weights per vertex, expected 1 to {MAX_INFLUENCES}"
            )));
        }

        let expected = bind_pose.vertex_count() * weights_per_vertex;
        if joint_indices.len() != expected || weights.len() != expected {
            return Err(SkeletalError::InvalidSkinBuffers(format!(
                "expected {expected} joint indices and weights, found {} and {}",
                joint_indices.len(),
                weights.len()
            )));
        }

        Ok(Self {
            weights_per_vertex,
            mesh: bind_pose.clone(),
            bind_pose,
            joint_indices,
            weights,
            auto_update_bounds: false,
            bounds: None,
        })
    }

    pub fn weights_per_vertex(&self) -> usize {
        self.weights_per_vertex
    }

    /// Undeformed geometry
    pub fn bind_pose_data(&self) -> &MeshData {
        &self.bind_pose
    }

    /// Geometry as of the last [`Self::apply_pose`]
    pub fn mesh_data(&self) -> &MeshData {
        &self.mesh
    }

    /// Supply the destination buffers, e.g. ones shared with a renderer
    ///
    /// Buffers whose length does not match the bind pose are reallocated on
    /// the next [`Self::apply_pose`]; matching ones are overwritten in place.
    pub fn set_mesh_data(&mut self, destination: MeshData) {
        self.mesh = destination;
    }

    /// Take back the destination buffers, leaving empty ones behind
    pub fn take_mesh_data(&mut self) -> MeshData {
        std::mem::take(&mut self.mesh)
    }

    pub fn joint_indices(&self) -> &[u16] {
        &self.joint_indices
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Bounds of the skinned vertices, kept when `auto_update_bounds` is set
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// Skin the bind-pose buffers with `pose`'s skin matrices
    ///
    /// Joint indices are checked against the pose before anything is written.
    /// Destination buffers are reused when their length matches the bind-pose
    /// buffers and reallocated otherwise.
    pub fn apply_pose(&mut self, pose: &SkeletonPose) -> Result<()> {
        let joint_count = pose.joint_count();
        if let Some(&index) = self
            .joint_indices
            .iter()
            .zip(&self.weights)
            .filter(|&(_, &weight)| weight != 0.0)
            .map(|(index, _)| index)
            .find(|&&index| usize::from(index) >= joint_count)
        {
            return Err(SkeletalError::JointIndexOutOfRange {
                index: usize::from(index),
                joint_count,
            });
        }

        let skin_matrices = pose.skin_matrices();
        let stride = self.weights_per_vertex;

        if self.mesh.vertices.len() != self.bind_pose.vertices.len() {
            self.mesh.vertices = vec![0.0; self.bind_pose.vertices.len()];
        }
        if let Some(bind_normals) = &self.bind_pose.normals {
            let reuse = matches!(&self.mesh.normals, Some(n) if n.len() == bind_normals.len());
            if !reuse {
                self.mesh.normals = Some(vec![0.0; bind_normals.len()]);
            }
        }

        let bind_normals = self.bind_pose.normals.as_deref();
        for (i, (bind_vertex, out_vertex)) in self
            .bind_pose
            .vertices
            .chunks_exact(3)
            .zip(self.mesh.vertices.chunks_exact_mut(3))
            .enumerate()
        {
            let bind_vertex = Vec3::from_slice(bind_vertex);
            let bind_normal = bind_normals.map(|normals| Vec3::from_slice(&normals[i * 3..i * 3 + 3]));

            let mut vertex_sum = Vec3::ZERO;
            let mut normal_sum = Vec3::ZERO;
            for slot in i * stride..(i + 1) * stride {
                let weight = self.weights[slot];
                if weight == 0.0 {
                    continue;
                }
                let matrix = &skin_matrices[usize::from(self.joint_indices[slot])];
                vertex_sum += matrix.transform_point3(bind_vertex) * weight;
                if let Some(normal) = bind_normal {
                    normal_sum += matrix.transform_vector3(normal) * weight;
                }
            }

            vertex_sum.write_to_slice(out_vertex);
            if bind_normal.is_some()
                && let Some(normals) = &mut self.mesh.normals
            {
                normal_sum.write_to_slice(&mut normals[i * 3..i * 3 + 3]);
            }
        }

        if self.auto_update_bounds {
            self.bounds = BoundingBox::from_vertices(&self.mesh.vertices);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::Joint;
    use crate::skeleton::Skeleton;
    use glam::{Affine3A, Quat};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn pose(joint_count: usize) -> SkeletonPose {
        let joints = (0..joint_count)
            .map(|i| Joint::new(format!("j{i}")))
            .collect();
        SkeletonPose::new(Arc::new(Skeleton::new("rig", joints).unwrap()))
    }

    #[test]
    fn test_invalid_layouts_rejected() {
        let bind = MeshData::new(vec![0.0; 6], None).unwrap();
        assert!(matches!(
            SkinnedMesh::new(bind.clone(), vec![0; 10], vec![0.0; 10], 5),
            Err(SkeletalError::InvalidSkinBuffers(_))
        ));
        assert!(matches!(
            SkinnedMesh::new(bind, vec![0; 3], vec![0.0; 4], 2),
            Err(SkeletalError::InvalidSkinBuffers(_))
        ));
        assert!(MeshData::new(vec![0.0; 4], None).is_err());
        assert!(MeshData::new(vec![0.0; 3], Some(vec![0.0; 6])).is_err());
    }

    #[test]
    fn test_uniform_scale_doubles_vertex() {
        let mut pose = pose(1);
        pose.local_transforms_mut()[0] = Affine3A::from_scale(Vec3::splat(2.0));
        pose.update_transforms();

        let bind = MeshData::new(vec![1.5, -2.0, 3.25], None).unwrap();
        let mut mesh = SkinnedMesh::new(bind, vec![0], vec![1.0], 1).unwrap();
        mesh.apply_pose(&pose).unwrap();
        assert_eq!(mesh.mesh_data().vertices(), &[3.0, -4.0, 6.5]);
    }

    #[test]
    fn test_opposite_translations_cancel() {
        let mut pose = pose(2);
        pose.local_transforms_mut()[0] = Affine3A::from_translation(Vec3::X);
        pose.local_transforms_mut()[1] = Affine3A::from_translation(-Vec3::X);
        pose.update_transforms();

        let bind = MeshData::new(vec![0.5, 2.0, -3.0], Some(vec![0.0, 1.0, 0.0])).unwrap();
        let mut mesh = SkinnedMesh::new(bind, vec![0, 1], vec![0.5, 0.5], 2).unwrap();
        mesh.apply_pose(&pose).unwrap();
        assert_eq!(mesh.mesh_data().vertices(), &[0.5, 2.0, -3.0]);
        // Normals ignore translation
        assert_eq!(mesh.mesh_data().normals(), Some(&[0.0, 1.0, 0.0][..]));
    }

    #[test]
    fn test_zero_weight_slots_are_skipped() {
        let pose = pose(1);
        let bind = MeshData::new(vec![1.0, 1.0, 1.0], None).unwrap();
        // Slot 1 points at a joint that does not exist, but carries no weight
        let mut mesh = SkinnedMesh::new(bind, vec![0, 40], vec![1.0, 0.0], 2).unwrap();
        assert!(mesh.apply_pose(&pose).is_ok());
    }

    #[test]
    fn test_out_of_range_joint_rejected() {
        let pose = pose(1);
        let bind = MeshData::new(vec![1.0, 1.0, 1.0], None).unwrap();
        let mut mesh = SkinnedMesh::new(bind, vec![3], vec![1.0], 1).unwrap();
        assert_eq!(
            mesh.apply_pose(&pose),
            Err(SkeletalError::JointIndexOutOfRange {
                index: 3,
                joint_count: 1,
            })
        );
    }

    #[test]
    fn test_normals_rotate_and_bounds_update() {
        let mut pose = pose(1);
        pose.local_transforms_mut()[0] = Affine3A::from_rotation_translation(
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, 0.0, 5.0),
        );
        pose.update_transforms();

        let bind = MeshData::new(
            vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0],
            Some(vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]),
        )
        .unwrap();
        let mut mesh = SkinnedMesh::new(bind, vec![0, 0], vec![1.0, 1.0], 1).unwrap();
        mesh.auto_update_bounds = true;
        mesh.apply_pose(&pose).unwrap();

        let normals = mesh.mesh_data().normals().unwrap();
        assert!((Vec3::from_slice(&normals[..3]) - Vec3::Y).length() < 1e-6);

        let bounds = mesh.bounds().unwrap();
        assert!((bounds.min - Vec3::new(0.0, 1.0, 5.0)).length() < 1e-6);
        assert!((bounds.max - Vec3::new(0.0, 2.0, 5.0)).length() < 1e-6);
        assert!((bounds.center() - Vec3::new(0.0, 1.5, 5.0)).length() < 1e-6);
    }

    #[test]
    fn test_destination_buffers_reused_in_place() {
        let mut pose = pose(1);
        let bind = MeshData::new(vec![1.0, 2.0, 3.0], Some(vec![0.0, 0.0, 1.0])).unwrap();
        let mut mesh = SkinnedMesh::new(bind, vec![0], vec![1.0], 1).unwrap();

        mesh.apply_pose(&pose).unwrap();
        let vertices = mesh.mesh_data().vertices().as_ptr();
        let normals = mesh.mesh_data().normals().unwrap().as_ptr();

        pose.local_transforms_mut()[0] = Affine3A::from_translation(Vec3::X);
        pose.update_transforms();
        mesh.apply_pose(&pose).unwrap();

        assert_eq!(mesh.mesh_data().vertices(), &[2.0, 2.0, 3.0]);
        assert_eq!(mesh.mesh_data().vertices().as_ptr(), vertices);
        assert_eq!(mesh.mesh_data().normals().unwrap().as_ptr(), normals);
    }

    #[test]
    fn test_mismatched_destination_reallocated() {
        let pose = pose(1);
        let bind = MeshData::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], Some(vec![0.0; 6])).unwrap();
        let mut mesh = SkinnedMesh::new(bind, vec![0, 0], vec![1.0, 1.0], 1).unwrap();

        mesh.set_mesh_data(MeshData::new(vec![0.0; 3], None).unwrap());
        mesh.apply_pose(&pose).unwrap();
        assert_eq!(mesh.mesh_data(), mesh.bind_pose_data());

        let taken = mesh.take_mesh_data();
        assert_eq!(taken.vertex_count(), 2);
        assert_eq!(mesh.mesh_data().vertex_count(), 0);
    }
}
