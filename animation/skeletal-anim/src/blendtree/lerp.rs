use std::collections::BTreeSet;

use glam::Vec3;

use super::{BlendTreeSource, SourceData, ValueStore};
use crate::channel::{StateData, TransformData};

/// Blends the output of two child sources by a weight
///
/// The weight is read from the value store when `blend_key` is set, otherwise
/// `blend_weight` is used. A weight of 0 favours source A, 1 favours source B.
#[derive(Debug, Default)]
pub struct BinaryLerpSource {
    pub source_a: Option<BlendTreeSource>,
    pub source_b: Option<BlendTreeSource>,
    pub blend_weight: f64,
    pub blend_key: Option<String>,
}

impl BinaryLerpSource {
    pub fn new(source_a: BlendTreeSource, source_b: BlendTreeSource) -> Self {
        Self {
            source_a: Some(source_a),
            source_b: Some(source_b),
            ..Self::default()
        }
    }

    /// Builder: read the weight from the value store under `key`
    pub fn with_blend_key(mut self, key: impl Into<String>) -> Self {
        self.blend_key = Some(key.into());
        self
    }

    /// Builder: use a fixed weight
    pub fn with_blend_weight(mut self, weight: f64) -> Self {
        self.blend_weight = weight;
        self
    }

    /// Effective blend weight
    pub fn weight(&self, values: &ValueStore) -> f64 {
        match &self.blend_key {
            Some(key) => values.get(key),
            None => self.blend_weight,
        }
    }

    pub fn source_data(&self, values: &ValueStore) -> SourceData {
        let data_a = self.source_a.as_ref().map(|source| source.source_data(values));
        let data_b = self.source_b.as_ref().map(|source| source.source_data(values));
        combine_source_data(data_a.as_ref(), data_b.as_ref(), self.weight(values))
    }

    pub fn set_time(&mut self, global_time: f64) -> bool {
        let mut found_active = false;
        if let Some(source) = &mut self.source_a {
            found_active |= source.set_time(global_time);
        }
        if let Some(source) = &mut self.source_b {
            found_active |= source.set_time(global_time);
        }
        found_active
    }

    pub fn reset_clips(&mut self, global_start_time: f64) {
        for source in [&mut self.source_a, &mut self.source_b].into_iter().flatten() {
            source.reset_clips(global_start_time);
        }
    }
}

/// Blend two source maps
///
/// Transform values are blended per key: translation and scale are a weighted
/// sum, where a side missing from the other map keeps full weight; rotation is
/// copied from the only present side or slerped by `weight` when both are
/// present. Any other value is taken from A when A has it, else from B.
pub fn combine_source_data(
    data_a: Option<&SourceData>,
    data_b: Option<&SourceData>,
    weight: f64,
) -> SourceData {
    let mut transform_keys = BTreeSet::new();
    let mut other_keys = BTreeSet::new();
    for data in [data_a, data_b].into_iter().flatten() {
        for (key, value) in data {
            if value.is_transform() {
                transform_keys.insert(key);
            } else {
                other_keys.insert(key);
            }
        }
    }

    let transform_of = |data: Option<&SourceData>, key: &str| {
        data.and_then(|data| data.get(key))
            .and_then(StateData::as_transform)
            .copied()
    };

    let mut result = SourceData::new();

    for key in transform_keys {
        let transform_a = transform_of(data_a, key);
        let transform_b = transform_of(data_b, key);

        let mut translation = Vec3::ZERO;
        let mut scale = Vec3::ZERO;

        let weight_a = (if transform_b.is_some() { 1.0 - weight } else { 1.0 }) as f32;
        if let Some(a) = &transform_a {
            translation += a.translation * weight_a;
            scale += a.scale * weight_a;
        }

        let weight_b = (if transform_a.is_some() { weight } else { 1.0 }) as f32;
        if let Some(b) = &transform_b {
            translation += b.translation * weight_b;
            scale += b.scale * weight_b;
        }

        let rotation = match (transform_a, transform_b) {
            (Some(a), Some(b)) => a.rotation.slerp(b.rotation, weight as f32),
            (Some(a), None) => a.rotation,
            (None, Some(b)) => b.rotation,
            (None, None) => continue,
        };

        result.insert(
            key.clone(),
            StateData::Transform(TransformData::new(rotation, translation, scale)),
        );
    }

    for key in other_keys {
        if result.contains_key(key) {
            continue;
        }
        let value = data_a
            .and_then(|data| data.get(key))
            .filter(|value| !value.is_transform())
            .or_else(|| data_b.and_then(|data| data.get(key)));
        if let Some(value) = value {
            result.insert(key.clone(), value.clone());
        }
    }

    result
}
