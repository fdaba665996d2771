use std::collections::HashMap;
use std::fmt;
use std::sync::PoisonError;

use log::{trace, warn};

use super::SourceData;
use crate::channel::{SharedTriggerData, StateData, TransformData, parse_joint_channel};
use crate::error::{Result, SkeletalError};
use crate::pose::SkeletonPose;

/// Outcome of a trigger callback
pub type CallbackResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Callback run when a trigger fires, with the freshly updated pose and the trigger name
pub type TriggerCallback = Box<dyn FnMut(&SkeletonPose, &str) -> CallbackResult + Send>;

/// What happened during one [`AnimationApplier::apply_to`]
#[derive(Debug, Default, PartialEq)]
pub struct ApplyReport {
    /// Number of joint transforms written
    pub joints_written: usize,
    /// Names of triggers dispatched, in dispatch order
    pub fired_triggers: Vec<String>,
    /// Failures reported by trigger callbacks
    pub callback_errors: Vec<SkeletalError>,
}

/// Writes blended source data into a pose and dispatches armed triggers
#[derive(Default)]
pub struct AnimationApplier {
    trigger_callbacks: HashMap<String, Vec<TriggerCallback>>,
}

impl fmt::Debug for AnimationApplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.trigger_callbacks.keys().collect();
        keys.sort();
        f.debug_struct("AnimationApplier")
            .field("trigger_callbacks", &keys)
            .finish()
    }
}

/// Marks a trigger as dispatched when dropped, including during unwinding
struct DisarmGuard<'a>(&'a SharedTriggerData);

impl Drop for DisarmGuard<'_> {
    fn drop(&mut self) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .disarm();
    }
}

impl AnimationApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for the trigger `key`
    pub fn add_trigger_callback<F>(&mut self, key: impl Into<String>, callback: F)
    where
        F: FnMut(&SkeletonPose, &str) -> CallbackResult + Send + 'static,
    {
        self.trigger_callbacks
            .entry(key.into())
            .or_default()
            .push(Box::new(callback));
    }

    /// Remove every callback registered for `key`, returning how many there were
    pub fn clear_trigger_callbacks(&mut self, key: &str) -> usize {
        self.trigger_callbacks
            .remove(key)
            .map_or(0, |callbacks| callbacks.len())
    }

    pub fn callback_count(&self, key: &str) -> usize {
        self.trigger_callbacks.get(key).map_or(0, Vec::len)
    }

    /// Apply `data` to `pose`
    ///
    /// Joint channel entries overwrite the matching local transforms, then the
    /// pose is updated once and armed triggers are dispatched. Joint keys are
    /// validated up front; on error the pose is left untouched. An empty map
    /// does nothing.
    pub fn apply_to(&mut self, pose: &mut SkeletonPose, data: &SourceData) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        if data.is_empty() {
            return Ok(report);
        }

        let joint_count = pose.joint_count();
        let mut writes: Vec<(usize, &TransformData)> = Vec::new();
        let mut triggers: Vec<&SharedTriggerData> = Vec::new();

        for (name, value) in data {
            match (parse_joint_channel(name)?, value) {
                (Some(index), StateData::Transform(transform)) => {
                    if index >= joint_count {
                        return Err(SkeletalError::JointIndexOutOfRange { index, joint_count });
                    }
                    writes.push((index, transform));
                }
                (Some(_), _) => {
                    warn!("Joint channel '{name}' does not carry transform data, skipping");
                }
                (None, StateData::Trigger(trigger)) => triggers.push(trigger),
                (None, _) => {}
            }
        }

        let locals = pose.local_transforms_mut();
        for &(index, transform) in &writes {
            transform.apply_to(&mut locals[index]);
        }
        report.joints_written = writes.len();
        pose.update_transforms();

        for trigger in triggers {
            self.dispatch(pose, trigger, &mut report);
        }

        Ok(report)
    }

    fn dispatch(&mut self, pose: &SkeletonPose, trigger: &SharedTriggerData, report: &mut ApplyReport) {
        let name = {
            let data = trigger.lock().unwrap_or_else(PoisonError::into_inner);
            if !data.is_armed() {
                return;
            }
            data.current_trigger().map(str::to_string)
        };
        let _guard = DisarmGuard(trigger);
        let Some(name) = name else {
            return;
        };

        trace!("Dispatching trigger '{name}'");
        if let Some(callbacks) = self.trigger_callbacks.get_mut(&name) {
            for callback in callbacks.iter_mut() {
                if let Err(err) = callback(pose, &name) {
                    warn!("Trigger callback for '{name}' failed: {err}");
                    report.callback_errors.push(SkeletalError::TriggerCallback {
                        trigger: name.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
        report.fired_triggers.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::TriggerData;
    use crate::joint::Joint;
    use crate::skeleton::Skeleton;
    use glam::{Affine3A, Quat, Vec3};
    use std::sync::{Arc, Mutex};

    fn pose() -> SkeletonPose {
        let joints = vec![Joint::new("root"), Joint::new("tip").with_parent(0)];
        SkeletonPose::new(Arc::new(Skeleton::new("rig", joints).unwrap()))
    }

    fn moved(x: f32) -> StateData {
        StateData::Transform(TransformData::new(
            Quat::IDENTITY,
            Vec3::new(x, 0.0, 0.0),
            Vec3::ONE,
        ))
    }

    fn armed(name: &str, index: usize) -> SharedTriggerData {
        let mut data = TriggerData::default();
        data.arm(Some(name), index);
        Arc::new(Mutex::new(data))
    }

    #[test]
    fn test_writes_joints_and_updates_once() {
        let mut pose = pose();
        let mut applier = AnimationApplier::new();
        let data: SourceData = [("_jnt0".to_string(), moved(1.0)), ("_jnt1".to_string(), moved(2.0))]
            .into_iter()
            .collect();

        let report = applier.apply_to(&mut pose, &data).unwrap();
        assert_eq!(report.joints_written, 2);
        let tip = pose.global_transforms()[1].transform_point3(Vec3::ZERO);
        assert_eq!(tip, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_empty_map_is_noop() {
        let mut pose = pose();
        pose.local_transforms_mut()[0] = Affine3A::from_translation(Vec3::Y);
        let mut applier = AnimationApplier::new();
        let report = applier.apply_to(&mut pose, &SourceData::new()).unwrap();
        assert_eq!(report, ApplyReport::default());
        // Not recomputed
        assert_eq!(pose.global_transforms()[0], Affine3A::IDENTITY);
    }

    #[test]
    fn test_bad_joint_keys_write_nothing() {
        let mut pose = pose();
        let mut applier = AnimationApplier::new();

        let data: SourceData = [("_jnt0".to_string(), moved(1.0)), ("_jnt9".to_string(), moved(1.0))]
            .into_iter()
            .collect();
        assert_eq!(
            applier.apply_to(&mut pose, &data),
            Err(SkeletalError::JointIndexOutOfRange {
                index: 9,
                joint_count: 2,
            })
        );

        let data: SourceData = [("_jnt0".to_string(), moved(1.0)), ("_jntx".to_string(), moved(1.0))]
            .into_iter()
            .collect();
        assert!(matches!(
            applier.apply_to(&mut pose, &data),
            Err(SkeletalError::InvalidJointChannel(_))
        ));
        assert_eq!(pose.local_transforms()[0], Affine3A::IDENTITY);

        // An alias of joint 1 must not write joint 1 a second time
        let data: SourceData = [("_jnt1".to_string(), moved(1.0)), ("_jnt01".to_string(), moved(2.0))]
            .into_iter()
            .collect();
        assert_eq!(
            applier.apply_to(&mut pose, &data),
            Err(SkeletalError::InvalidJointChannel("_jnt01".to_string()))
        );
        assert_eq!(pose.local_transforms()[1], Affine3A::IDENTITY);
    }

    #[test]
    fn test_all_callbacks_run_and_trigger_disarms() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut applier = AnimationApplier::new();

        let sink = Arc::clone(&calls);
        applier.add_trigger_callback("step", move |_: &SkeletonPose, name: &str| -> CallbackResult {
            sink.lock().unwrap().push(format!("first:{name}"));
            Err("boom".into())
        });
        let sink = Arc::clone(&calls);
        applier.add_trigger_callback("step", move |_: &SkeletonPose, name: &str| -> CallbackResult {
            sink.lock().unwrap().push(format!("second:{name}"));
            Ok(())
        });

        let trigger = armed("step", 3);
        let data: SourceData = [("events".to_string(), StateData::Trigger(Arc::clone(&trigger)))]
            .into_iter()
            .collect();

        let mut pose = pose();
        let report = applier.apply_to(&mut pose, &data).unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["first:step", "second:step"]);
        assert_eq!(report.fired_triggers, vec!["step".to_string()]);
        assert_eq!(
            report.callback_errors,
            vec![SkeletalError::TriggerCallback {
                trigger: "step".to_string(),
                message: "boom".to_string(),
            }]
        );
        assert!(!trigger.lock().unwrap().is_armed());

        // Already dispatched: nothing fires on the next frame
        let report = applier.apply_to(&mut pose, &data).unwrap();
        assert!(report.fired_triggers.is_empty());
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_panicking_callback_still_disarms() {
        let mut applier = AnimationApplier::new();
        applier.add_trigger_callback("explode", |_: &SkeletonPose, _: &str| -> CallbackResult {
            panic!("callback panic")
        });

        let trigger = armed("explode", 0);
        let data: SourceData = [("events".to_string(), StateData::Trigger(Arc::clone(&trigger)))]
            .into_iter()
            .collect();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut pose = pose();
            let _ = applier.apply_to(&mut pose, &data);
        }));
        assert!(result.is_err());
        assert!(!trigger.lock().unwrap_or_else(PoisonError::into_inner).is_armed());
    }

    #[test]
    fn test_clear_callbacks() {
        let mut applier = AnimationApplier::new();
        applier.add_trigger_callback("a", |_: &SkeletonPose, _: &str| -> CallbackResult { Ok(()) });
        assert_eq!(applier.callback_count("a"), 1);
        assert_eq!(applier.clear_trigger_callbacks("a"), 1);
        assert_eq!(applier.clear_trigger_callbacks("a"), 0);
    }
}
