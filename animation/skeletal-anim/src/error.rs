use thiserror::Error;

/// Error types for skeleton construction, channel sampling and pose application
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkeletalError {
    /// Parallel sample arrays of a channel do not have the same length
    #[error(
        "Channel '{channel}' has mismatched sample arrays: {times} times but {values} values"
    )]
    MismatchedSamples {
        channel: String,
        times: usize,
        values: usize,
    },

    /// A channel was constructed without any samples
    #[error("Channel '{0}' has no samples")]
    EmptyChannel(String),

    /// Time samples must be strictly increasing
    #[error("Channel '{channel}' time samples are not strictly increasing at index {index}")]
    NonIncreasingTimes { channel: String, index: usize },

    /// A joint references a parent that is not processed before it
    #[error("Joint '{joint}' at index {index} has parent {parent}, which does not precede it")]
    ParentOutOfOrder {
        joint: String,
        index: usize,
        parent: usize,
    },

    /// A skeleton has more joints than the root sentinel allows
    #[error("Skeleton '{name}' has {count} joints, more than the supported maximum")]
    TooManyJoints { name: String, count: usize },

    /// A channel name carries the joint prefix but no joint index
    #[error("Invalid joint channel name: '{0}'")]
    InvalidJointChannel(String),

    /// A joint index does not exist in the skeleton/pose it is applied to
    #[error("Joint index {index} out of range (joint count: {joint_count})")]
    JointIndexOutOfRange { index: usize, joint_count: usize },

    /// A joint looked up by name does not exist
    #[error("Joint not found: '{0}'")]
    JointNotFound(String),

    /// A channel looked up by name does not exist in a clip
    #[error("Channel not found: '{0}'")]
    ChannelNotFound(String),

    /// A sub-channel request used an invalid sample range
    #[error("Invalid sample range {start}..={end} for channel with {count} samples")]
    InvalidSampleRange {
        start: usize,
        end: usize,
        count: usize,
    },

    /// Skinning buffers do not agree with each other
    #[error("Skinning buffer error: {0}")]
    InvalidSkinBuffers(String),

    /// A layer or transition referenced an animation state that does not exist
    #[error("Unknown animation state: '{0}'")]
    UnknownState(String),

    /// A layer index does not exist in the manager
    #[error("Layer index {0} out of range")]
    LayerOutOfRange(usize),

    /// A trigger callback reported a failure
    #[error("Trigger callback for '{trigger}' failed: {message}")]
    TriggerCallback { trigger: String, message: String },
}

/// Result type using SkeletalError
pub type Result<T> = std::result::Result<T, SkeletalError>;
