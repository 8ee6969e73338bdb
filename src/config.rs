use crate::error::ModelError;
use crate::schema::ModelSchema;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default prior specification for one attribute: a kind tag plus two
/// parameters
///
/// Tags follow the configuration convention: `u` for uniform (p1 = lower,
/// p2 = upper), `g` for Gaussian (p1 = mean, p2 = sigma), `c` for a constant
/// (p1 = value, p2 ignored). Unrecognized tags are rejected when the spec is
/// turned into a prior, naming the offending attribute.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PriorSpec {
    pub tag: String,
    pub p1: f64,
    pub p2: f64,
}

impl PriorSpec {
    pub fn uniform(lower_limit: f64, upper_limit: f64) -> Self {
        Self {
            tag: "u".into(),
            p1: lower_limit,
            p2: upper_limit,
        }
    }

    pub fn gaussian(mean: f64, sigma: f64) -> Self {
        Self {
            tag: "g".into(),
            p1: mean,
            p2: sigma,
        }
    }

    pub fn constant(value: f64) -> Self {
        Self {
            tag: "c".into(),
            p1: value,
            p2: 0.0,
        }
    }
}

/// Per-component default prior configuration
///
/// Lookups walk the component's ancestry chain front-to-back until an entry
/// matches, mirroring inheritance-based configuration: a `Sersic` component
/// without its own `phi` entry inherits the one declared for
/// `EllipticalProfile`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(transparent)]
pub struct PriorConfig {
    defaults: BTreeMap<String, BTreeMap<String, PriorSpec>>,
}

impl PriorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: impl Into<String>, attribute: impl Into<String>, spec: PriorSpec) {
        self.defaults
            .entry(component.into())
            .or_default()
            .insert(attribute.into(), spec);
    }

    /// Resolve the default prior spec for `(schema, attribute)` by walking the
    /// schema's ancestry until a configured entry is found
    pub fn get_for_nearest_ancestor(
        &self,
        schema: &ModelSchema,
        attribute: &str,
    ) -> Result<&PriorSpec, ModelError> {
        schema
            .ancestry()
            .find_map(|component| self.defaults.get(component)?.get(attribute))
            .ok_or_else(|| ModelError::MissingPriorDefault {
                component: schema.name().into(),
                attribute: attribute.into(),
            })
    }
}

/// Minimum Gaussian sigma per `(component, attribute)`, resolved like
/// [PriorConfig]
///
/// Used when narrowing a mapper around a previous result: a sampler-estimated
/// width is floored against this value so the next search cannot collapse too
/// aggressively.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(transparent)]
pub struct WidthConfig {
    widths: BTreeMap<String, BTreeMap<String, f64>>,
}

impl WidthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, component: impl Into<String>, attribute: impl Into<String>, width: f64) {
        self.widths
            .entry(component.into())
            .or_default()
            .insert(attribute.into(), width);
    }

    pub fn get_for_nearest_ancestor(
        &self,
        schema: &ModelSchema,
        attribute: &str,
    ) -> Result<f64, ModelError> {
        schema
            .ancestry()
            .find_map(|component| self.widths.get(component)?.get(attribute))
            .copied()
            .ok_or_else(|| ModelError::MissingWidth {
                component: schema.name().into(),
                attribute: attribute.into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ModelSchema;

    fn schema() -> ModelSchema {
        ModelSchema::builder("Sersic")
            .ancestor("EllipticalProfile")
            .scalar("phi")
            .finish()
    }

    #[test]
    fn own_entry_wins_over_ancestor() {
        let mut config = PriorConfig::new();
        config.insert("EllipticalProfile", "phi", PriorSpec::uniform(0.0, 180.0));
        config.insert("Sersic", "phi", PriorSpec::gaussian(90.0, 10.0));
        let spec = config.get_for_nearest_ancestor(&schema(), "phi").unwrap();
        assert_eq!(spec, &PriorSpec::gaussian(90.0, 10.0));
    }

    #[test]
    fn falls_back_to_the_nearest_ancestor() {
        let mut config = PriorConfig::new();
        config.insert("EllipticalProfile", "phi", PriorSpec::uniform(0.0, 180.0));
        let spec = config.get_for_nearest_ancestor(&schema(), "phi").unwrap();
        assert_eq!(spec, &PriorSpec::uniform(0.0, 180.0));
    }

    #[test]
    fn missing_entry_names_component_and_attribute() {
        let config = PriorConfig::new();
        assert_eq!(
            config.get_for_nearest_ancestor(&schema(), "phi").unwrap_err(),
            ModelError::MissingPriorDefault {
                component: "Sersic".into(),
                attribute: "phi".into(),
            },
        );
    }

    #[test]
    fn width_resolution_mirrors_prior_resolution() {
        let mut widths = WidthConfig::new();
        widths.insert("EllipticalProfile", "phi", 20.0);
        assert_eq!(
            widths.get_for_nearest_ancestor(&schema(), "phi").unwrap(),
            20.0
        );
        assert_eq!(
            widths.get_for_nearest_ancestor(&schema(), "missing").unwrap_err(),
            ModelError::MissingWidth {
                component: "Sersic".into(),
                attribute: "missing".into(),
            },
        );
    }

    #[test]
    fn config_serde_round_trip() {
        let mut config = PriorConfig::new();
        config.insert("Sersic", "phi", PriorSpec::uniform(0.0, 180.0));
        config.insert("Sersic", "intensity", PriorSpec::constant(1.0));
        let json = serde_json::to_string(&config).unwrap();
        let restored: PriorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
