use std::sync::Arc;

use log::debug;

use crate::channel::joint_channel_name;
use crate::clip::{AnimationClip, AnimationClipState, SourceData};

/// Plays one clip and exposes its sampled channels
#[derive(Debug)]
pub struct ClipSource {
    clip: Arc<AnimationClip>,
    state: AnimationClipState,
}

impl ClipSource {
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            state: AnimationClipState::default(),
        }
    }

    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    pub fn state(&self) -> &AnimationClipState {
        &self.state
    }

    /// Playback settings (loop count, time scale, listeners)
    pub fn state_mut(&mut self) -> &mut AnimationClipState {
        &mut self.state
    }

    /// Sampled channel values as of the last [`Self::set_time`]
    pub fn source_data(&self) -> SourceData {
        self.state.channel_data().clone()
    }

    /// Advance the clip clock to `global_time` and sample the clip
    ///
    /// Returns whether the clip is still active afterwards.
    pub fn set_time(&mut self, global_time: f64) -> bool {
        let state = &mut self.state;
        if !state.active {
            return false;
        }

        let mut clock_time = state.time_scale * (global_time - state.start_time);
        let max_time = f64::from(self.clip.max_time());

        if max_time > 0.0 {
            let loops = state.loop_count;
            if loops == AnimationClipState::LOOP_FOREVER
                || (loops > 1 && clock_time < max_time * f64::from(loops))
            {
                clock_time %= max_time;
            }

            if clock_time > max_time {
                clock_time = max_time;
                debug!("Clip '{}' finished", self.clip.name());
                state.fire_finished(self.clip.name());
                state.active = false;
            }
        }

        self.clip.update(clock_time, state);
        state.active
    }

    /// Restart the clip at `global_start_time`
    pub fn reset_clips(&mut self, global_start_time: f64) {
        self.state.start_time = global_start_time;
        self.state.active = true;
    }
}

/// A clip source that only passes through an allow-list of channels
#[derive(Debug)]
pub struct InclusiveClipSource {
    source: ClipSource,
    enabled_channels: Vec<String>,
}

impl InclusiveClipSource {
    /// Wrap a clip; nothing passes until channels are enabled
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            source: ClipSource::new(clip),
            enabled_channels: Vec::new(),
        }
    }

    pub fn clip_source(&self) -> &ClipSource {
        &self.source
    }

    pub fn clip_source_mut(&mut self) -> &mut ClipSource {
        &mut self.source
    }

    pub fn enabled_channels(&self) -> &[String] {
        &self.enabled_channels
    }

    pub fn set_enabled_channels<I, S>(&mut self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enabled_channels = channels.into_iter().map(Into::into).collect();
    }

    /// Enable the channels driving the given joints
    pub fn set_enabled_joints(&mut self, joints: &[usize]) {
        self.enabled_channels = joints.iter().copied().map(joint_channel_name).collect();
    }

    pub fn source_data(&self) -> SourceData {
        let data = self.source.state().channel_data();
        self.enabled_channels
            .iter()
            .filter_map(|key| data.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }
}

/// A clip source that passes through everything except a deny-list of channels
#[derive(Debug)]
pub struct ExclusiveClipSource {
    source: ClipSource,
    disabled_channels: Vec<String>,
}

impl ExclusiveClipSource {
    pub fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            source: ClipSource::new(clip),
            disabled_channels: Vec::new(),
        }
    }

    pub fn clip_source(&self) -> &ClipSource {
        &self.source
    }

    pub fn clip_source_mut(&mut self) -> &mut ClipSource {
        &mut self.source
    }

    pub fn disabled_channels(&self) -> &[String] {
        &self.disabled_channels
    }

    pub fn set_disabled_channels<I, S>(&mut self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_channels = channels.into_iter().map(Into::into).collect();
    }

    /// Disable the channels driving the given joints
    pub fn set_disabled_joints(&mut self, joints: &[usize]) {
        self.disabled_channels = joints.iter().copied().map(joint_channel_name).collect();
    }

    pub fn source_data(&self) -> SourceData {
        let mut data = self.source.source_data();
        for key in &self.disabled_channels {
            data.remove(key);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, TransformChannel};
    use glam::{Quat, Vec3};
    use std::sync::Mutex;
    use test_case::test_case;

    /// Two joint channels moving along X over two seconds
    fn clip() -> Arc<AnimationClip> {
        let channel = |joint: usize| -> Channel {
            TransformChannel::new(
                joint_channel_name(joint),
                vec![0.0, 2.0],
                vec![Quat::IDENTITY; 2],
                vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)],
                vec![Vec3::ONE; 2],
            )
            .unwrap()
            .into()
        };
        Arc::new(AnimationClip::new("slide", vec![channel(0), channel(1)]))
    }

    fn translation_x(data: &SourceData, key: &str) -> f32 {
        data[key].as_transform().unwrap().translation.x
    }

    #[test]
    fn test_single_pass_clip_finishes() {
        let finished = Arc::new(Mutex::new(0));
        let mut source = ClipSource::new(clip());
        let counter = Arc::clone(&finished);
        source
            .state_mut()
            .add_finished_listener(move |_| *counter.lock().unwrap() += 1);

        assert!(source.set_time(1.0));
        assert_eq!(translation_x(&source.source_data(), "_jnt0"), 1.0);

        assert!(!source.set_time(3.0));
        assert_eq!(translation_x(&source.source_data(), "_jnt0"), 2.0);
        assert_eq!(*finished.lock().unwrap(), 1);

        // Inactive clips are not sampled again
        assert!(!source.set_time(4.0));
        assert_eq!(*finished.lock().unwrap(), 1);
    }

    #[test_case(AnimationClipState::LOOP_FOREVER, 101.0 => (true, 1.0) ; "forever wraps")]
    #[test_case(3, 5.0 => (true, 1.0) ; "finite loop wraps inside its passes")]
    #[test_case(3, 7.0 => (false, 2.0) ; "finite loop clamps after its passes")]
    fn test_loop_rule(loop_count: u32, time: f64) -> (bool, f32) {
        let mut source = ClipSource::new(clip());
        source.state_mut().loop_count = loop_count;
        let active = source.set_time(time);
        (active, translation_x(&source.source_data(), "_jnt0"))
    }

    #[test]
    fn test_time_scale_and_reset() {
        let mut source = ClipSource::new(clip());
        source.state_mut().time_scale = 2.0;
        source.set_time(0.5);
        assert_eq!(translation_x(&source.source_data(), "_jnt0"), 1.0);

        source.set_time(5.0);
        assert!(!source.state().active);

        source.reset_clips(5.0);
        assert!(source.set_time(5.25));
        assert_eq!(translation_x(&source.source_data(), "_jnt0"), 0.5);
    }

    #[test]
    fn test_inclusive_filter() {
        let mut source = InclusiveClipSource::new(clip());
        source.clip_source_mut().set_time(1.0);
        assert!(source.source_data().is_empty());

        source.set_enabled_joints(&[1, 5]);
        let data = source.source_data();
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["_jnt1"]);
        assert_eq!(source.enabled_channels(), &["_jnt1", "_jnt5"]);
    }

    #[test]
    fn test_exclusive_filter_leaves_clip_untouched() {
        let mut source = ExclusiveClipSource::new(clip());
        source.clip_source_mut().set_time(1.0);
        source.set_disabled_channels(["_jnt0"]);

        let data = source.source_data();
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["_jnt1"]);
        assert_eq!(source.clip_source().source_data().len(), 2);
    }
}
