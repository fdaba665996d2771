//! Finite animation states and the transitions between them

use std::collections::HashMap;

use crate::blendtree::BlendTreeSource;

/// Easing curve applied to a cross-fade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendType {
    #[default]
    Linear,
    /// `3t^2 - 2t^3`
    SCurve3,
    /// `6t^5 - 15t^4 + 10t^3`
    SCurve5,
}

impl BlendType {
    /// Map fade progress in `[0, 1]` to a blend weight
    pub fn weight(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::SCurve3 => t * t * (3.0 - 2.0 * t),
            Self::SCurve5 => t * t * t * (t * (6.0 * t - 15.0) + 10.0),
        }
    }
}

/// How a layer moves from its current state to another
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Switch to `target` at once, restarting its clips
    Immediate { target: String },
    /// Cross-fade into `target` over `fade_time` seconds
    Fade {
        target: String,
        fade_time: f64,
        blend: BlendType,
    },
}

impl Transition {
    pub fn immediate(target: impl Into<String>) -> Self {
        Self::Immediate {
            target: target.into(),
        }
    }

    pub fn fade(target: impl Into<String>, fade_time: f64, blend: BlendType) -> Self {
        Self::Fade {
            target: target.into(),
            fade_time,
            blend,
        }
    }

    /// Name of the state this transition leads to
    pub fn target(&self) -> &str {
        match self {
            Self::Immediate { target } | Self::Fade { target, .. } => target,
        }
    }
}

/// A named state playing one blend tree
#[derive(Debug)]
pub struct SteadyState {
    name: String,
    source_tree: BlendTreeSource,
    transitions: HashMap<String, Transition>,
    /// Taken when the source tree has no active clips left
    pub end_transition: Option<Transition>,
}

impl SteadyState {
    pub fn new(name: impl Into<String>, source_tree: impl Into<BlendTreeSource>) -> Self {
        Self {
            name: name.into(),
            source_tree: source_tree.into(),
            transitions: HashMap::new(),
            end_transition: None,
        }
    }

    /// Builder: set the transition taken when playback ends
    pub fn with_end_transition(mut self, transition: Transition) -> Self {
        self.end_transition = Some(transition);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_tree(&self) -> &BlendTreeSource {
        &self.source_tree
    }

    pub fn source_tree_mut(&mut self) -> &mut BlendTreeSource {
        &mut self.source_tree
    }

    /// Register a transition under `keyword`, replacing any previous one
    pub fn add_transition(&mut self, keyword: impl Into<String>, transition: Transition) {
        self.transitions.insert(keyword.into(), transition);
    }

    pub fn transition(&self, keyword: &str) -> Option<&Transition> {
        self.transitions.get(keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(BlendType::Linear ; "linear")]
    #[test_case(BlendType::SCurve3 ; "s curve 3")]
    #[test_case(BlendType::SCurve5 ; "s curve 5")]
    fn test_blend_curve_endpoints(blend: BlendType) {
        assert_eq!(blend.weight(0.0), 0.0);
        assert_eq!(blend.weight(0.5), 0.5);
        assert_eq!(blend.weight(1.0), 1.0);
        assert_eq!(blend.weight(2.0), 1.0);
    }

    #[test]
    fn test_s_curves_ease() {
        assert!(BlendType::SCurve3.weight(0.25) < 0.25);
        assert!(BlendType::SCurve5.weight(0.25) < BlendType::SCurve3.weight(0.25));
    }

    #[test]
    fn test_transition_target() {
        assert_eq!(Transition::immediate("idle").target(), "idle");
        assert_eq!(
            Transition::fade("run", 0.5, BlendType::SCurve3).target(),
            "run"
        );
    }
}
