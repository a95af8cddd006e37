//! Engine configuration.
//!
//! [`EngineConfig`] is plain serde data; every field has a default so a host
//! can supply a partial JSON document:
//!
//! ```
//! use ember_engine::config::{EngineConfig, InputEdges};
//!
//! let config = EngineConfig::from_json(r#"{ "fixed_dt": 0.02, "input_edges": "per_step" }"#).unwrap();
//! assert_eq!(config.fixed_dt, 0.02);
//! assert_eq!(config.input_edges, InputEdges::PerStep);
//! assert_eq!(config.quadtree_capacity, 10);
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::layers::LayerRule;
use crate::EngineError;

// ---------------------------------------------------------------------------
// InputEdges
// ---------------------------------------------------------------------------

/// When the input collaborator's pressed/released edges move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputEdges {
    /// Once per host callback, after all of the callback's steps. A press is
    /// visible to every step of the callback that observed it. A callback
    /// that runs zero steps still advances the edges, so a press it observed
    /// is never seen by any step. Displays refreshing faster than the fixed
    /// rate hit this regularly; use `PerStep` when no press may be dropped.
    #[default]
    PerFrame,
    /// After every fixed step. A press is visible to exactly one step.
    PerStep,
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Tunables for the loop, the broad-phase and collision resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Simulated seconds per fixed step. Must be positive and finite.
    pub fixed_dt: f64,
    /// Upper bound on one callback's wall-clock delta, in seconds.
    pub max_frame_delta: f64,
    /// Items a quad-tree node holds before it subdivides.
    pub quadtree_capacity: usize,
    /// Maximum quad-tree subdivision depth.
    pub quadtree_max_depth: usize,
    /// Overlap (px) a solid pair must exceed before it is pushed apart.
    pub resolution_epsilon: f64,
    /// Height (px) of the ground sensor under each player controller.
    pub ground_sensor: f64,
    /// Input edge advance policy.
    pub input_edges: InputEdges,
    /// Per-tick collision diagnostics at `trace` level.
    pub debug: bool,
    /// Rule overrides applied on top of the seeded layer matrix.
    pub layer_rules: Vec<LayerRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_frame_delta: 0.25,
            quadtree_capacity: 10,
            quadtree_max_depth: 5,
            resolution_epsilon: 2.0,
            ground_sensor: 1.0,
            input_edges: InputEdges::PerFrame,
            debug: false,
            layer_rules: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = serde_json::from_str(json).map_err(|e| {
            warn!(error = %e, "engine config rejected");
            EngineError::Config(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check numeric fields the loop and physics depend on.
    pub fn validate(&self) -> Result<(), EngineError> {
        let check = |field: &'static str, value: f64, allow_zero: bool| {
            let ok = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
            if ok {
                Ok(())
            } else {
                let reason = format!("must be a positive finite number, got {value}");
                warn!(field, %reason, "engine config rejected");
                Err(EngineError::InvalidConfig { field, reason })
            }
        };
        check("fixed_dt", self.fixed_dt, false)?;
        check("max_frame_delta", self.max_frame_delta, false)?;
        check("resolution_epsilon", self.resolution_epsilon, true)?;
        check("ground_sensor", self.ground_sensor, true)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::LayerRef;

    #[test]
    fn defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert!((config.fixed_dt - 1.0 / 60.0).abs() < f64::EPSILON);
        assert_eq!(config.max_frame_delta, 0.25);
        assert_eq!(config.quadtree_capacity, 10);
        assert_eq!(config.quadtree_max_depth, 5);
        assert_eq!(config.resolution_epsilon, 2.0);
        assert_eq!(config.input_edges, InputEdges::PerFrame);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_document_gives_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn layer_rules_accept_names_and_indices() {
        let config = EngineConfig::from_json(
            r#"{ "layer_rules": [ { "a": "enemy", "b": 2, "allowed": true } ] }"#,
        )
        .unwrap();
        assert_eq!(config.layer_rules.len(), 1);
        assert_eq!(config.layer_rules[0].a, LayerRef::Name("enemy".to_owned()));
        assert_eq!(config.layer_rules[0].b, LayerRef::Index(2));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let err = EngineConfig::from_json("{ fixed_dt: }").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn non_positive_step_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "fixed_dt": 0.0 }"#).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfig {
                field: "fixed_dt",
                ..
            }
        ));
    }
}
