//! Loading skeletons and clips from JSON
#![cfg(feature = "serde-support")]

use glam::{Quat, Vec3};
use pretty_assertions::assert_eq;
use skeletal_anim::{AnimationClip, Channel, Joint, Skeleton, TransformChannel, TriggerChannel};

#[test]
fn test_skeleton_from_json() {
    let json = r#"{
        "name": "arm",
        "joints": [
            { "name": "shoulder" },
            { "name": "elbow", "parentIndex": 0 },
            { "name": "wrist", "parentIndex": 1 }
        ]
    }"#;

    let skeleton: Skeleton = serde_json::from_str(json).unwrap();
    assert_eq!(skeleton.name(), "arm");
    assert_eq!(skeleton.joint_count(), 3);
    assert_eq!(skeleton.joints()[0].parent(), None);
    assert_eq!(skeleton.joints()[2].parent(), Some(1));

    let written = serde_json::to_string(&skeleton).unwrap();
    let reread: Skeleton = serde_json::from_str(&written).unwrap();
    assert_eq!(reread, skeleton);
}

#[test]
fn test_skeleton_json_is_validated() {
    let json = r#"{
        "name": "broken",
        "joints": [
            { "name": "child", "parentIndex": 1 },
            { "name": "parent" }
        ]
    }"#;

    let err = serde_json::from_str::<Skeleton>(json).unwrap_err();
    assert!(err.to_string().contains("does not precede it"), "{err}");
}

#[test]
fn test_transform_channel_from_json() {
    let json = r#"{
        "type": "transform",
        "name": "_jnt1",
        "jointName": "elbow",
        "times": [0.0, 0.5],
        "rotations": [[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]],
        "translations": [[0.0, 0.0, 0.0], [1.0, 2.0, 3.0]],
        "scales": [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]]
    }"#;

    let channel: Channel = serde_json::from_str(json).unwrap();
    let Channel::Transform(transform) = &channel else {
        panic!("expected a transform channel, got {channel:?}");
    };
    assert_eq!(transform.joint_name(), Some("elbow"));
    assert_eq!(transform.translations()[1], Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(channel.max_time(), 0.5);
}

#[test]
fn test_mismatched_channel_json_rejected() {
    let json = r#"{
        "type": "transform",
        "name": "_jnt0",
        "times": [0.0, 1.0],
        "rotations": [[0.0, 0.0, 0.0, 1.0]],
        "translations": [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
        "scales": [[1.0, 1.0, 1.0], [1.0, 1.0, 1.0]]
    }"#;

    let err = serde_json::from_str::<Channel>(json).unwrap_err();
    assert!(err.to_string().contains("mismatched sample arrays"), "{err}");
}

#[test]
fn test_clip_round_trip_recomputes_length() {
    let transform = TransformChannel::new(
        "_jnt0",
        vec![0.0, 1.5],
        vec![Quat::IDENTITY, Quat::from_rotation_x(1.0)],
        vec![Vec3::ZERO, Vec3::X],
        vec![Vec3::ONE; 2],
    )
    .unwrap();
    let trigger = TriggerChannel::new(
        "events",
        vec![0.0, 2.0],
        vec![Some("start".to_string()), None],
    )
    .unwrap();
    let clip = AnimationClip::new("swing", vec![transform.into(), trigger.into()]);

    let json = serde_json::to_string_pretty(&clip).unwrap();
    assert!(!json.contains("max_time"));

    let reread: AnimationClip = serde_json::from_str(&json).unwrap();
    assert_eq!(reread.max_time(), 2.0);
    assert_eq!(reread, clip);
}

#[test]
fn test_joint_defaults_to_root() {
    let joint: Joint = serde_json::from_str(r#"{ "name": "pelvis" }"#).unwrap();
    assert_eq!(joint, Joint::new("pelvis"));
}
