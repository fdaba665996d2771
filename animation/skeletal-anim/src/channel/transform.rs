use glam::{Affine3A, Quat, Vec3};
use log::warn;

use super::{check_sample_range, rebased_times, sample_range_for_time, validate_samples};
use crate::error::Result;
use crate::joint::Joint;

/// Tolerance used when checking that a decomposed transform rebuilds exactly
const DECOMPOSE_EPSILON: f32 = 1e-4;

/// Rotation, translation and scale of a single transform, the unit of blending
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct TransformData {
    pub rotation: Quat,
    pub translation: Vec3,
    pub scale: Vec3,
}

impl Default for TransformData {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl TransformData {
    pub const IDENTITY: Self = Self {
        rotation: Quat::IDENTITY,
        translation: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    pub fn new(rotation: Quat, translation: Vec3, scale: Vec3) -> Self {
        Self {
            rotation,
            translation,
            scale,
        }
    }

    /// Build the affine transform `T * R * S`
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Overwrite `transform` with this rotation, scale and translation
    pub fn apply_to(&self, transform: &mut Affine3A) {
        *transform = self.to_affine();
    }
}

/// Transform samples over time, usually driving one joint
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde-support",
    serde(try_from = "TransformChannelFields", rename_all = "camelCase")
)]
pub struct TransformChannel {
    name: String,
    /// Human readable name of the driven joint, if any
    #[cfg_attr(
        feature = "serde-support",
        serde(skip_serializing_if = "Option::is_none")
    )]
    joint_name: Option<String>,
    times: Vec<f32>,
    rotations: Vec<Quat>,
    translations: Vec<Vec3>,
    scales: Vec<Vec3>,
}

#[cfg(feature = "serde-support")]
#[derive(Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct TransformChannelFields {
    name: String,
    joint_name: Option<String>,
    times: Vec<f32>,
    rotations: Vec<Quat>,
    translations: Vec<Vec3>,
    scales: Vec<Vec3>,
}

#[cfg(feature = "serde-support")]
impl TryFrom<TransformChannelFields> for TransformChannel {
    type Error = crate::error::SkeletalError;

    fn try_from(fields: TransformChannelFields) -> Result<Self> {
        let mut channel = Self::new(
            fields.name,
            fields.times,
            fields.rotations,
            fields.translations,
            fields.scales,
        )?;
        channel.joint_name = fields.joint_name;
        Ok(channel)
    }
}

impl TransformChannel {
    /// Create a channel from parallel sample arrays
    pub fn new(
        name: impl Into<String>,
        times: Vec<f32>,
        rotations: Vec<Quat>,
        translations: Vec<Vec3>,
        scales: Vec<Vec3>,
    ) -> Result<Self> {
        let name = name.into();
        validate_samples(
            &name,
            &times,
            &[rotations.len(), translations.len(), scales.len()],
        )?;

        Ok(Self {
            name,
            joint_name: None,
            times,
            rotations,
            translations,
            scales,
        })
    }

    /// Create a channel driving the joint at `joint_index`
    pub fn for_joint(
        joint_index: usize,
        joint: &Joint,
        times: Vec<f32>,
        rotations: Vec<Quat>,
        translations: Vec<Vec3>,
        scales: Vec<Vec3>,
    ) -> Result<Self> {
        let mut channel = Self::new(
            super::joint_channel_name(joint_index),
            times,
            rotations,
            translations,
            scales,
        )?;
        channel.joint_name = Some(joint.name().to_string());
        Ok(channel)
    }

    /// Create a channel by decomposing full transforms
    ///
    /// Transforms that carry shear cannot be represented exactly; they are
    /// decomposed anyway and a warning is logged.
    pub fn from_transforms(
        name: impl Into<String>,
        times: Vec<f32>,
        transforms: &[Affine3A],
    ) -> Result<Self> {
        let name = name.into();
        let mut rotations = Vec::with_capacity(transforms.len());
        let mut translations = Vec::with_capacity(transforms.len());
        let mut scales = Vec::with_capacity(transforms.len());

        for (i, transform) in transforms.iter().enumerate() {
            let (scale, rotation, translation) = transform.to_scale_rotation_translation();
            let rebuilt = Affine3A::from_scale_rotation_translation(scale, rotation, translation);
            if !rebuilt.abs_diff_eq(*transform, DECOMPOSE_EPSILON) {
                warn!(
                    "Channel '{name}' sample {i}: transform is not rotation/scale/translation only, decomposition is approximate"
                );
            }
            rotations.push(rotation);
            translations.push(translation);
            scales.push(scale);
        }

        Self::new(name, times, rotations, translations, scales)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the joint this channel was built for, if known
    pub fn joint_name(&self) -> Option<&str> {
        self.joint_name.as_deref()
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn rotations(&self) -> &[Quat] {
        &self.rotations
    }

    pub fn translations(&self) -> &[Vec3] {
        &self.translations
    }

    pub fn scales(&self) -> &[Vec3] {
        &self.scales
    }

    pub fn sample_count(&self) -> usize {
        self.times.len()
    }

    pub fn max_time(&self) -> f32 {
        self.times.last().copied().unwrap_or_default()
    }

    /// Sample `index` verbatim, if it exists
    pub fn transform_data(&self, index: usize) -> Option<TransformData> {
        Some(TransformData::new(
            *self.rotations.get(index)?,
            *self.translations.get(index)?,
            *self.scales.get(index)?,
        ))
    }

    /// Write the value at `index` advanced by `progress` towards `index + 1`
    ///
    /// Progress of exactly 0 or 1 copies a sample verbatim so boundary frames
    /// are bit-exact.
    pub fn set_current_sample(&self, index: usize, progress: f64, out: &mut TransformData) {
        if progress == 0.0 {
            self.copy_sample(index, out);
        } else if progress == 1.0 {
            self.copy_sample(index + 1, out);
        } else if index + 1 < self.times.len() {
            let t = progress as f32;
            out.rotation = self.rotations[index].slerp(self.rotations[index + 1], t);
            out.translation = self.translations[index].lerp(self.translations[index + 1], t);
            out.scale = self.scales[index].lerp(self.scales[index + 1], t);
        } else {
            self.copy_sample(index, out);
        }
    }

    fn copy_sample(&self, index: usize, out: &mut TransformData) {
        if let Some(data) = self.transform_data(index.min(self.times.len().saturating_sub(1))) {
            *out = data;
        }
    }

    /// Copy an inclusive range of samples into a new channel, times rebased to zero
    pub fn subchannel_by_sample(&self, name: &str, start: usize, end: usize) -> Result<Self> {
        check_sample_range(start, end, self.times.len())?;
        let range = start..=end;
        Ok(Self {
            name: name.to_string(),
            joint_name: self.joint_name.clone(),
            times: rebased_times(&self.times[range.clone()]),
            rotations: self.rotations[range.clone()].to_vec(),
            translations: self.translations[range.clone()].to_vec(),
            scales: self.scales[range].to_vec(),
        })
    }

    /// Copy the samples within `[start_time, end_time]` into a new channel
    pub fn subchannel_by_time(&self, name: &str, start_time: f32, end_time: f32) -> Result<Self> {
        let (start, end) = sample_range_for_time(&self.times, start_time, end_time)?;
        self.subchannel_by_sample(name, start, end)
    }
}
