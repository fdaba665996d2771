//! Time-sampled animation channels
//!
//! A channel is a named track of strictly increasing time samples with a
//! parallel array of values. Sampling a channel at a clock time writes the
//! bracketing (or interpolated) value into a per-playback state object,
//! [`StateData`], which is also the value type that flows through the blend
//! tree.

mod transform;
mod trigger;

pub use transform::{TransformChannel, TransformData};
pub use trigger::{SharedTriggerData, TriggerChannel, TriggerData, TriggerState};

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::error::{Result, SkeletalError};

/// Name prefix of channels that drive a skeleton joint
pub const JOINT_CHANNEL_PREFIX: &str = "_jnt";

/// Channel name for the given joint index
pub fn joint_channel_name(joint_index: usize) -> String {
    format!("{JOINT_CHANNEL_PREFIX}{joint_index}")
}

/// Extract the joint index from a joint channel name
///
/// Returns `Ok(None)` for names without the joint prefix and an error for
/// prefixed names whose suffix is not a joint index in the form written by
/// [`joint_channel_name`] (no sign, no leading zeros).
pub fn parse_joint_channel(name: &str) -> Result<Option<usize>> {
    let Some(suffix) = name.strip_prefix(JOINT_CHANNEL_PREFIX) else {
        return Ok(None);
    };
    match suffix.parse::<usize>() {
        Ok(index) if joint_channel_name(index) == name => Ok(Some(index)),
        _ => Err(SkeletalError::InvalidJointChannel(name.to_string())),
    }
}

/// Locate the sample bracketing `clock_time`
///
/// Returns the sample index and the progress (0..1) towards the next sample.
/// Times before zero or at or before the first sample, or a single-sample
/// track, select sample 0; times at or past the last sample clamp to the last
/// sample. Otherwise the index is the
/// greatest `i` with `times[i] < clock_time`.
pub fn sample_at(times: &[f32], clock_time: f64) -> (usize, f64) {
    let Some(last) = times.len().checked_sub(1) else {
        return (0, 0.0);
    };

    if clock_time < 0.0 || clock_time <= f64::from(times[0]) || last == 0 {
        return (0, 0.0);
    }
    if clock_time >= f64::from(times[last]) {
        return (last, 0.0);
    }

    // Times are strictly increasing, so the predicate is partitioned
    let index = times[..last]
        .partition_point(|&t| f64::from(t) < clock_time)
        .saturating_sub(1);

    let start = f64::from(times[index]);
    let end = f64::from(times[index + 1]);
    (index, (clock_time - start) / (end - start))
}

/// Check a channel's time samples against its value array lengths
pub(crate) fn validate_samples(name: &str, times: &[f32], value_lengths: &[usize]) -> Result<()> {
    if times.is_empty() {
        return Err(SkeletalError::EmptyChannel(name.to_string()));
    }

    for &values in value_lengths {
        if values != times.len() {
            return Err(SkeletalError::MismatchedSamples {
                channel: name.to_string(),
                times: times.len(),
                values,
            });
        }
    }

    if let Some(index) = times.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(SkeletalError::NonIncreasingTimes {
            channel: name.to_string(),
            index: index + 1,
        });
    }

    Ok(())
}

/// Resolve an inclusive sample range against a sample count
pub(crate) fn check_sample_range(start: usize, end: usize, count: usize) -> Result<()> {
    if start > end || end >= count {
        return Err(SkeletalError::InvalidSampleRange { start, end, count });
    }
    Ok(())
}

/// Sample indices covering `[start_time, end_time]`
pub(crate) fn sample_range_for_time(
    times: &[f32],
    start_time: f32,
    end_time: f32,
) -> Result<(usize, usize)> {
    let start = times.partition_point(|&t| t < start_time);
    let end = times.partition_point(|&t| t <= end_time);
    if start >= end {
        return Err(SkeletalError::InvalidSampleRange {
            start,
            end,
            count: times.len(),
        });
    }
    Ok((start, end - 1))
}

/// Rebase a slice of times so the first one is zero
pub(crate) fn rebased_times(times: &[f32]) -> Vec<f32> {
    let base = times.first().copied().unwrap_or_default();
    times.iter().map(|t| t - base).collect()
}

/// A value produced by sampling a channel, and the unit of the blend tree maps
#[derive(Clone)]
pub enum StateData {
    /// Joint (or generic) transform
    Transform(TransformData),
    /// Trigger state, shared between the clip that samples it and whoever
    /// dispatches it
    Trigger(SharedTriggerData),
    /// Any other user value; passed through blending untouched
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl StateData {
    pub fn as_transform(&self) -> Option<&TransformData> {
        match self {
            Self::Transform(data) => Some(data),
            _ => None,
        }
    }

    pub fn as_trigger(&self) -> Option<&SharedTriggerData> {
        match self {
            Self::Trigger(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform(_))
    }
}

impl fmt::Debug for StateData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transform(data) => f.debug_tuple("Transform").field(data).finish(),
            Self::Trigger(data) => f.debug_tuple("Trigger").field(data).finish(),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

/// A time-sampled track of either transforms or trigger keywords
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-support", serde(tag = "type", rename_all = "camelCase"))]
pub enum Channel {
    Transform(TransformChannel),
    Trigger(TriggerChannel),
}

impl Channel {
    pub fn name(&self) -> &str {
        match self {
            Self::Transform(channel) => channel.name(),
            Self::Trigger(channel) => channel.name(),
        }
    }

    pub fn times(&self) -> &[f32] {
        match self {
            Self::Transform(channel) => channel.times(),
            Self::Trigger(channel) => channel.times(),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.times().len()
    }

    /// Time of the last sample
    pub fn max_time(&self) -> f32 {
        self.times().last().copied().unwrap_or_default()
    }

    /// Create a fresh state object suited to this channel
    pub fn create_state_data(&self) -> StateData {
        match self {
            Self::Transform(_) => StateData::Transform(TransformData::default()),
            Self::Trigger(_) => StateData::Trigger(Arc::new(Mutex::new(TriggerData::default()))),
        }
    }

    /// Sample the channel at `clock_time` into `state`
    ///
    /// A state object of the wrong kind is replaced with a fresh one.
    pub fn update_sample(&self, clock_time: f64, state: &mut StateData) {
        let (index, progress) = sample_at(self.times(), clock_time);
        match (self, &mut *state) {
            (Self::Transform(channel), StateData::Transform(data)) => {
                channel.set_current_sample(index, progress, data);
            }
            (Self::Trigger(channel), StateData::Trigger(data)) => {
                channel.set_current_sample(index, progress, data);
            }
            _ => {
                *state = self.create_state_data();
                self.update_sample(clock_time, state);
            }
        }
    }

    /// Copy an inclusive range of samples into a new channel
    pub fn subchannel_by_sample(&self, name: &str, start: usize, end: usize) -> Result<Self> {
        Ok(match self {
            Self::Transform(channel) => {
                Self::Transform(channel.subchannel_by_sample(name, start, end)?)
            }
            Self::Trigger(channel) => Self::Trigger(channel.subchannel_by_sample(name, start, end)?),
        })
    }

    /// Copy the samples within `[start_time, end_time]` into a new channel
    pub fn subchannel_by_time(&self, name: &str, start_time: f32, end_time: f32) -> Result<Self> {
        let (start, end) = sample_range_for_time(self.times(), start_time, end_time)?;
        self.subchannel_by_sample(name, start, end)
    }
}

impl From<TransformChannel> for Channel {
    fn from(channel: TransformChannel) -> Self {
        Self::Transform(channel)
    }
}

impl From<TriggerChannel> for Channel {
    fn from(channel: TriggerChannel) -> Self {
        Self::Trigger(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const TIMES: [f32; 4] = [0.0, 1.0, 2.0, 4.0];

    #[test_case(-1.0 => (0, 0.0) ; "negative clock selects first sample")]
    #[test_case(0.0 => (0, 0.0) ; "start")]
    #[test_case(0.5 => (0, 0.5) ; "first interval")]
    #[test_case(1.0 => (0, 1.0) ; "exact interior sample reached from below")]
    #[test_case(3.0 => (2, 0.5) ; "last interval")]
    #[test_case(4.0 => (3, 0.0) ; "exact last sample")]
    #[test_case(9.0 => (3, 0.0) ; "past end clamps")]
    fn test_sample_at(clock: f64) -> (usize, f64) {
        sample_at(&TIMES, clock)
    }

    #[test_case(0.5 => (0, 0.0) ; "before first sample")]
    #[test_case(1.0 => (0, 0.0) ; "exact first sample")]
    #[test_case(1.5 => (0, 0.5) ; "between samples")]
    #[test_case(2.5 => (1, 0.0) ; "past end")]
    fn test_sample_at_late_start(clock: f64) -> (usize, f64) {
        sample_at(&[1.0, 2.0], clock)
    }

    #[test]
    fn test_sample_at_single_sample() {
        assert_eq!(sample_at(&[2.0], 5.0), (0, 0.0));
        assert_eq!(sample_at(&[2.0], 1.0), (0, 0.0));
    }

    #[test]
    fn test_joint_channel_names() {
        assert_eq!(joint_channel_name(3), "_jnt3");
        assert_eq!(parse_joint_channel("_jnt12"), Ok(Some(12)));
        assert_eq!(parse_joint_channel("footstep"), Ok(None));
        assert_eq!(
            parse_joint_channel("_jntx"),
            Err(SkeletalError::InvalidJointChannel("_jntx".to_string()))
        );
    }

    #[test_case("_jnt+3" ; "explicit sign")]
    #[test_case("_jnt03" ; "leading zero")]
    #[test_case("_jnt" ; "missing index")]
    #[test_case("_jnt-1" ; "negative")]
    fn test_non_canonical_joint_channel_rejected(name: &str) {
        assert_eq!(
            parse_joint_channel(name),
            Err(SkeletalError::InvalidJointChannel(name.to_string()))
        );
    }

    #[test]
    fn test_validate_samples() {
        assert!(validate_samples("ok", &TIMES, &[4, 4]).is_ok());
        assert_eq!(
            validate_samples("empty", &[], &[]),
            Err(SkeletalError::EmptyChannel("empty".to_string()))
        );
        assert!(matches!(
            validate_samples("short", &TIMES, &[4, 3]),
            Err(SkeletalError::MismatchedSamples { values: 3, .. })
        ));
        assert!(matches!(
            validate_samples("dup", &[0.0, 1.0, 1.0], &[3]),
            Err(SkeletalError::NonIncreasingTimes { index: 2, .. })
        ));
    }

    #[test]
    fn test_sample_range_for_time() {
        assert_eq!(sample_range_for_time(&TIMES, 0.5, 2.0), Ok((1, 2)));
        assert_eq!(sample_range_for_time(&TIMES, 0.0, 10.0), Ok((0, 3)));
        assert!(sample_range_for_time(&TIMES, 2.5, 3.5).is_err());
    }
}
