//! Animation clips and per-playback clip state

use std::collections::BTreeMap;
use std::fmt;

use crate::channel::{Channel, StateData};
use crate::error::{Result, SkeletalError};

/// Named map of sampled channel values, the currency of the blend tree
pub type SourceData = BTreeMap<String, StateData>;

/// Callback invoked with the clip name when a non-looping clip runs past its end
pub type ClipFinishedListener = Box<dyn FnMut(&str) + Send>;

/// A set of channels sharing one clock
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(from = "AnimationClipFields"))]
pub struct AnimationClip {
    name: String,
    channels: Vec<Channel>,
    /// Largest channel max time, kept current on every channel change
    #[cfg_attr(feature = "serde-support", serde(skip))]
    max_time: f32,
}

#[cfg(feature = "serde-support")]
#[derive(Default, serde::Deserialize)]
#[serde(default)]
struct AnimationClipFields {
    name: String,
    channels: Vec<Channel>,
}

#[cfg(feature = "serde-support")]
impl From<AnimationClipFields> for AnimationClip {
    fn from(fields: AnimationClipFields) -> Self {
        Self::new(fields.name, fields.channels)
    }
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let mut clip = Self {
            name: name.into(),
            channels,
            max_time: 0.0,
        };
        clip.update_max_time();
        clip
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Time of the last sample across all channels
    pub fn max_time(&self) -> f32 {
        self.max_time
    }

    pub fn add_channel(&mut self, channel: impl Into<Channel>) {
        self.channels.push(channel.into());
        self.update_max_time();
    }

    /// Remove a channel by name, returning it
    pub fn remove_channel(&mut self, name: &str) -> Result<Channel> {
        let index = self
            .channels
            .iter()
            .position(|channel| channel.name() == name)
            .ok_or_else(|| SkeletalError::ChannelNotFound(name.to_string()))?;
        let channel = self.channels.remove(index);
        self.update_max_time();
        Ok(channel)
    }

    pub fn find_channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|channel| channel.name() == name)
    }

    /// Sample every channel at `clock_time` into the clip state
    pub fn update(&self, clock_time: f64, state: &mut AnimationClipState) {
        for channel in &self.channels {
            let data = state
                .channel_data
                .entry(channel.name().to_string())
                .or_insert_with(|| channel.create_state_data());
            channel.update_sample(clock_time, data);
        }
    }

    fn update_max_time(&mut self) {
        self.max_time = self
            .channels
            .iter()
            .map(Channel::max_time)
            .fold(0.0, f32::max);
    }
}

impl fmt::Display for AnimationClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnimationClip '{}' [channel count={}, max time={}]",
            self.name,
            self.channels.len(),
            self.max_time
        )
    }
}

/// Playback state of one clip instance
pub struct AnimationClipState {
    /// Inactive clips are not sampled
    pub active: bool,
    /// Number of passes to play, [`AnimationClipState::LOOP_FOREVER`] to loop indefinitely
    pub loop_count: u32,
    /// Multiplier applied to elapsed global time
    pub time_scale: f64,
    /// Global time at which playback started
    pub start_time: f64,
    channel_data: SourceData,
    finished_listeners: Vec<ClipFinishedListener>,
}

impl Default for AnimationClipState {
    fn default() -> Self {
        Self {
            active: true,
            loop_count: 1,
            time_scale: 1.0,
            start_time: 0.0,
            channel_data: SourceData::new(),
            finished_listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for AnimationClipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationClipState")
            .field("active", &self.active)
            .field("loop_count", &self.loop_count)
            .field("time_scale", &self.time_scale)
            .field("start_time", &self.start_time)
            .field("channel_data", &self.channel_data)
            .field("finished_listeners", &self.finished_listeners.len())
            .finish()
    }
}

impl AnimationClipState {
    pub const LOOP_FOREVER: u32 = u32::MAX;

    /// Sampled values of every channel, keyed by channel name
    pub fn channel_data(&self) -> &SourceData {
        &self.channel_data
    }

    pub fn add_finished_listener(&mut self, listener: impl FnMut(&str) + Send + 'static) {
        self.finished_listeners.push(Box::new(listener));
    }

    pub fn clear_finished_listeners(&mut self) {
        self.finished_listeners.clear();
    }

    pub(crate) fn fire_finished(&mut self, clip_name: &str) {
        for listener in &mut self.finished_listeners {
            listener(clip_name);
        }
    }
}
