use std::sync::{Arc, Mutex, PoisonError};

use super::{check_sample_range, rebased_times, sample_range_for_time, validate_samples};
use crate::error::Result;

/// Trigger state shared between a clip's playback state and the applier
pub type SharedTriggerData = Arc<Mutex<TriggerData>>;

/// Armed status of a trigger
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerState {
    /// No current trigger
    #[default]
    Disarmed,
    /// A trigger has been set and not yet dispatched
    Armed { name: String, index: usize },
    /// The current trigger was dispatched; the same name and index will not
    /// arm again
    Fired { name: String, index: usize },
}

/// Current trigger of a [`TriggerChannel`] and whether it awaits dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(default))]
pub struct TriggerData {
    state: TriggerState,
}

impl TriggerData {
    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, TriggerState::Armed { .. })
    }

    /// Name of the current trigger, armed or already fired
    pub fn current_trigger(&self) -> Option<&str> {
        match &self.state {
            TriggerState::Disarmed => None,
            TriggerState::Armed { name, .. } | TriggerState::Fired { name, .. } => Some(name),
        }
    }

    /// Sample index of the current trigger
    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            TriggerState::Disarmed => None,
            TriggerState::Armed { index, .. } | TriggerState::Fired { index, .. } => Some(index),
        }
    }

    /// Set the trigger for sample `index`
    ///
    /// `None` (or an empty name) disarms. A name and index identical to the
    /// current trigger leave the state untouched, so repeated sampling of the
    /// same key does not fire twice.
    pub fn arm(&mut self, trigger: Option<&str>, index: usize) {
        let Some(trigger) = trigger.filter(|name| !name.is_empty()) else {
            self.state = TriggerState::Disarmed;
            return;
        };

        if self.current_trigger() == Some(trigger) && self.current_index() == Some(index) {
            return;
        }

        self.state = TriggerState::Armed {
            name: trigger.to_string(),
            index,
        };
    }

    /// Mark an armed trigger as dispatched
    pub fn disarm(&mut self) {
        if let TriggerState::Armed { name, index } = std::mem::take(&mut self.state) {
            self.state = TriggerState::Fired { name, index };
        }
    }
}

/// Keyword samples over time, used to fire events from a clip
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(try_from = "TriggerChannelFields"))]
pub struct TriggerChannel {
    name: String,
    times: Vec<f32>,
    keys: Vec<Option<String>>,
}

#[cfg(feature = "serde-support")]
#[derive(Default, serde::Deserialize)]
#[serde(default)]
struct TriggerChannelFields {
    name: String,
    times: Vec<f32>,
    keys: Vec<Option<String>>,
}

#[cfg(feature = "serde-support")]
impl TryFrom<TriggerChannelFields> for TriggerChannel {
    type Error = crate::error::SkeletalError;

    fn try_from(fields: TriggerChannelFields) -> Result<Self> {
        Self::new(fields.name, fields.times, fields.keys)
    }
}

impl TriggerChannel {
    /// Create a channel from parallel time and keyword arrays
    ///
    /// A `None` key marks a sample that clears the trigger.
    pub fn new(
        name: impl Into<String>,
        times: Vec<f32>,
        keys: Vec<Option<String>>,
    ) -> Result<Self> {
        let name = name.into();
        validate_samples(&name, &times, &[keys.len()])?;
        Ok(Self { name, times, keys })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn keys(&self) -> &[Option<String>] {
        &self.keys
    }

    pub fn sample_count(&self) -> usize {
        self.times.len()
    }

    pub fn max_time(&self) -> f32 {
        self.times.last().copied().unwrap_or_default()
    }

    /// Arm `out` with the key at `index`, or `index + 1` when progress reached it
    pub fn set_current_sample(&self, index: usize, progress: f64, out: &SharedTriggerData) {
        let index = if progress == 1.0 { index + 1 } else { index };
        let key = self.keys.get(index).and_then(Option::as_deref);
        out.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .arm(key, index);
    }

    /// Copy an inclusive range of samples into a new channel, times rebased to zero
    pub fn subchannel_by_sample(&self, name: &str, start: usize, end: usize) -> Result<Self> {
        check_sample_range(start, end, self.times.len())?;
        Ok(Self {
            name: name.to_string(),
            times: rebased_times(&self.times[start..=end]),
            keys: self.keys[start..=end].to_vec(),
        })
    }

    /// Copy the samples within `[start_time, end_time]` into a new channel
    pub fn subchannel_by_time(&self, name: &str, start_time: f32, end_time: f32) -> Result<Self> {
        let (start, end) = sample_range_for_time(&self.times, start_time, end_time)?;
        self.subchannel_by_sample(name, start, end)
    }
}
