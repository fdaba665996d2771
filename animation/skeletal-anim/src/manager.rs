//! Animation manager
//!
//! Owns a pose together with the layers that animate it. Each frame,
//! [`AnimationManager::update`] advances every layer's state machine, blends
//! the layers bottom-up and applies the result to the pose.

use log::trace;

use crate::blendtree::{AnimationApplier, ApplyReport, SourceData, ValueStore, combine_source_data};
use crate::error::{Result, SkeletalError};
use crate::layer::AnimationLayer;
use crate::pose::SkeletonPose;

/// Name of the layer every manager starts with
pub const BASE_LAYER_NAME: &str = "-BASE_LAYER-";

/// Drives one pose from a stack of animation layers
#[derive(Debug)]
pub struct AnimationManager {
    pose: SkeletonPose,
    applier: AnimationApplier,
    values: ValueStore,
    layers: Vec<AnimationLayer>,
    current_global_time: f64,
    current_data: SourceData,
}

impl AnimationManager {
    /// Create a manager for `pose` with a single, empty base layer
    pub fn new(pose: SkeletonPose) -> Self {
        Self {
            pose,
            applier: AnimationApplier::new(),
            values: ValueStore::default(),
            layers: vec![AnimationLayer::new(BASE_LAYER_NAME)],
            current_global_time: 0.0,
            current_data: SourceData::new(),
        }
    }

    pub fn pose(&self) -> &SkeletonPose {
        &self.pose
    }

    pub fn pose_mut(&mut self) -> &mut SkeletonPose {
        &mut self.pose
    }

    pub fn applier(&self) -> &AnimationApplier {
        &self.applier
    }

    pub fn applier_mut(&mut self) -> &mut AnimationApplier {
        &mut self.applier
    }

    /// Named parameters read by blend nodes (e.g. blend weights)
    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ValueStore {
        &mut self.values
    }

    /// Global time of the last update
    pub fn current_global_time(&self) -> f64 {
        self.current_global_time
    }

    /// Combined layer output of the last update
    pub fn current_source_data(&self) -> &SourceData {
        &self.current_data
    }

    pub fn layers(&self) -> &[AnimationLayer] {
        &self.layers
    }

    /// Add a layer on top of the stack, returning its index
    pub fn add_layer(&mut self, layer: AnimationLayer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    pub fn layer(&self, index: usize) -> Option<&AnimationLayer> {
        self.layers.get(index)
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut AnimationLayer> {
        self.layers
            .get_mut(index)
            .ok_or(SkeletalError::LayerOutOfRange(index))
    }

    pub fn find_layer(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|layer| layer.name() == name)
    }

    pub fn base_layer(&self) -> &AnimationLayer {
        &self.layers[0]
    }

    pub fn base_layer_mut(&mut self) -> &mut AnimationLayer {
        &mut self.layers[0]
    }

    /// Follow the transition registered under `key` on a layer's current state
    pub fn do_transition(&mut self, layer_index: usize, key: &str) -> Result<bool> {
        let time = self.current_global_time;
        self.layer_mut(layer_index)?.do_transition(key, time)
    }

    /// Switch a layer to the named state, restarting its clips now if `rewind`
    pub fn set_current_state(&mut self, layer_index: usize, name: &str, rewind: bool) -> Result<()> {
        let time = self.current_global_time;
        self.layer_mut(layer_index)?.set_current_state(name, rewind, time)
    }

    /// Advance to `global_time`, blend every layer and apply the result to the pose
    pub fn update(&mut self, global_time: f64) -> Result<ApplyReport> {
        self.current_global_time = global_time;

        for layer in &mut self.layers {
            layer.update(global_time)?;
        }

        let mut combined: Option<SourceData> = None;
        for layer in &self.layers {
            let Some(data) = layer.current_source_data(&self.values) else {
                continue;
            };
            combined = Some(match combined {
                Some(below) => combine_source_data(Some(&below), Some(&data), layer.blend_weight),
                None => data,
            });
        }
        self.current_data = combined.unwrap_or_default();

        trace!(
            "Applying {} channels at t={global_time}",
            self.current_data.len()
        );
        self.applier.apply_to(&mut self.pose, &self.current_data)
    }
}
