//! Animation layers: a state machine over steady states

use std::collections::HashMap;

use log::{debug, warn};

use crate::blendtree::{SourceData, ValueStore, combine_source_data};
use crate::error::{Result, SkeletalError};
use crate::state::{BlendType, SteadyState, Transition};

/// Which state a layer is currently playing
#[derive(Debug, Clone, PartialEq)]
pub enum LayerState {
    /// Nothing playing; the layer contributes no data
    Idle,
    /// Playing one steady state
    Steady(String),
    /// Cross-fading between two steady states
    Fading {
        from: Option<String>,
        to: String,
        start_time: f64,
        fade_time: f64,
        blend: BlendType,
        /// Current weight of `to`, refreshed on every update
        weight: f64,
    },
}

/// A named state machine whose output is blended over the layers below it
#[derive(Debug)]
pub struct AnimationLayer {
    name: String,
    states: HashMap<String, SteadyState>,
    current: LayerState,
    /// Weight of this layer over the layers below it
    pub blend_weight: f64,
}

impl AnimationLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: HashMap::new(),
            current: LayerState::Idle,
            blend_weight: 1.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current_state(&self) -> &LayerState {
        &self.current
    }

    /// Name of the steady state being played, or faded into
    pub fn current_state_name(&self) -> Option<&str> {
        match &self.current {
            LayerState::Idle => None,
            LayerState::Steady(name) | LayerState::Fading { to: name, .. } => Some(name),
        }
    }

    pub fn add_steady_state(&mut self, state: SteadyState) {
        self.states.insert(state.name().to_string(), state);
    }

    pub fn steady_state(&self, name: &str) -> Option<&SteadyState> {
        self.states.get(name)
    }

    pub fn steady_state_mut(&mut self, name: &str) -> Option<&mut SteadyState> {
        self.states.get_mut(name)
    }

    pub fn steady_state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Switch to the named state, optionally restarting its clips at `global_time`
    pub fn set_current_state(&mut self, name: &str, rewind: bool, global_time: f64) -> Result<()> {
        let state = self
            .states
            .get_mut(name)
            .ok_or_else(|| SkeletalError::UnknownState(name.to_string()))?;
        if rewind {
            state.source_tree_mut().reset_clips(global_time);
        }
        self.current = LayerState::Steady(name.to_string());
        Ok(())
    }

    /// Stop playing; the layer contributes nothing until a state is set
    pub fn clear_current_state(&mut self) {
        self.current = LayerState::Idle;
    }

    /// Follow the transition the current state registered under `key`
    ///
    /// Returns false if the current state has no such transition.
    pub fn do_transition(&mut self, key: &str, global_time: f64) -> Result<bool> {
        let transition = self
            .current_state_name()
            .and_then(|name| self.states.get(name))
            .and_then(|state| state.transition(key))
            .cloned();

        match transition {
            Some(transition) => {
                self.apply_transition(transition, global_time)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Start a transition at `global_time`
    pub fn apply_transition(&mut self, transition: Transition, global_time: f64) -> Result<()> {
        if !self.states.contains_key(transition.target()) {
            warn!(
                "Layer '{}': transition to unknown state '{}'",
                self.name,
                transition.target()
            );
            return Err(SkeletalError::UnknownState(transition.target().to_string()));
        }
        debug!(
            "Layer '{}': transition to '{}'",
            self.name,
            transition.target()
        );
        match transition {
            Transition::Immediate { target } => self.set_current_state(&target, true, global_time),
            Transition::Fade {
                target,
                fade_time,
                blend,
            } => {
                let state = self
                    .states
                    .get_mut(&target)
                    .ok_or_else(|| SkeletalError::UnknownState(target.clone()))?;
                state.source_tree_mut().reset_clips(global_time);

                let from = self.current_state_name().map(str::to_string);
                self.current = LayerState::Fading {
                    from,
                    to: target,
                    start_time: global_time,
                    fade_time,
                    blend,
                    weight: 0.0,
                };
                Ok(())
            }
        }
    }

    /// Advance the layer's states to `global_time`
    pub fn update(&mut self, global_time: f64) -> Result<()> {
        match self.current.clone() {
            LayerState::Idle => Ok(()),
            LayerState::Steady(name) => self.update_steady(&name, global_time),
            LayerState::Fading {
                to,
                start_time,
                fade_time,
                blend,
                ..
            } => {
                let progress = if fade_time > 0.0 {
                    (global_time - start_time) / fade_time
                } else {
                    1.0
                };

                if progress >= 1.0 {
                    self.current = LayerState::Steady(to.clone());
                    return self.update_steady(&to, global_time);
                }

                self.set_time_current(global_time)?;

                if let LayerState::Fading { weight, .. } = &mut self.current {
                    *weight = blend.weight(progress);
                }
                Ok(())
            }
        }
    }

    fn update_steady(&mut self, name: &str, global_time: f64) -> Result<()> {
        let state = self
            .states
            .get_mut(name)
            .ok_or_else(|| SkeletalError::UnknownState(name.to_string()))?;
        if state.source_tree_mut().set_time(global_time) {
            return Ok(());
        }

        match state.end_transition.clone() {
            Some(transition) => {
                self.apply_transition(transition, global_time)?;
                // Sample the new state so this frame has data
                self.set_time_current(global_time)
            }
            None => {
                debug!("Layer '{}': state '{name}' ended", self.name);
                self.current = LayerState::Idle;
                Ok(())
            }
        }
    }

    /// Advance the trees of the current state(s) without following transitions
    fn set_time_current(&mut self, global_time: f64) -> Result<()> {
        let (from, to) = match &self.current {
            LayerState::Idle => return Ok(()),
            LayerState::Steady(name) => (None, name.clone()),
            LayerState::Fading { from, to, .. } => (from.clone(), to.clone()),
        };

        if let Some(from) = from
            && let Some(state) = self.states.get_mut(&from)
        {
            state.source_tree_mut().set_time(global_time);
        }
        self.states
            .get_mut(&to)
            .ok_or(SkeletalError::UnknownState(to))?
            .source_tree_mut()
            .set_time(global_time);
        Ok(())
    }

    /// Blended output of the current state, `None` when idle
    pub fn current_source_data(&self, values: &ValueStore) -> Option<SourceData> {
        let data_of = |name: &str| {
            self.states
                .get(name)
                .map(|state| state.source_tree().source_data(values))
        };

        match &self.current {
            LayerState::Idle => None,
            LayerState::Steady(name) => data_of(name),
            LayerState::Fading {
                from, to, weight, ..
            } => {
                let data_from = from.as_deref().and_then(data_of);
                let data_to = data_of(to);
                Some(combine_source_data(
                    data_from.as_ref(),
                    data_to.as_ref(),
                    *weight,
                ))
            }
        }
    }
}
