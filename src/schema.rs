use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shape of one declared constructor parameter
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ParamKind {
    /// A single float, sampled through one prior
    Scalar,
    /// A fixed-arity tuple of floats, decomposed into one prior per element
    Tuple(usize),
}

/// One constructor parameter: name plus declared shape
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ParamSchema {
    name: String,
    kind: ParamKind,
}

impl ParamSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }
}

/// Declared parameter layout of one model component type
///
/// This replaces runtime constructor reflection: each wrapped type declares
/// its sampled parameters once, in constructor order. Arguments the engine
/// must pass through untouched are simply not declared here. The ancestry
/// chain (the type itself first, then its conceptual base types) drives
/// nearest-ancestor configuration lookups.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ModelSchema {
    name: String,
    ancestry: Vec<String>,
    params: Vec<ParamSchema>,
}

impl ModelSchema {
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            name: name.into(),
            ancestors: Vec::new(),
            params: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The component type name followed by its ancestors, nearest first
    pub fn ancestry(&self) -> impl Iterator<Item = &str> {
        self.ancestry.iter().map(String::as_str)
    }

    pub fn params(&self) -> &[ParamSchema] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&ParamSchema> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Total sampled-parameter slots, tuple parameters counted by arity
    pub fn decomposed_len(&self) -> usize {
        self.params
            .iter()
            .map(|param| match param.kind {
                ParamKind::Scalar => 1,
                ParamKind::Tuple(arity) => arity,
            })
            .sum()
    }
}

/// Assembles a [ModelSchema] next to the model type it describes
pub struct ModelSchemaBuilder {
    name: String,
    ancestors: Vec<String>,
    params: Vec<ParamSchema>,
}

impl ModelSchemaBuilder {
    /// Append a base type to the ancestry chain, nearest first
    pub fn ancestor(mut self, name: impl Into<String>) -> Self {
        self.ancestors.push(name.into());
        self
    }

    pub fn scalar(self, name: impl Into<String>) -> Self {
        self.param(name, ParamKind::Scalar)
    }

    pub fn tuple(self, name: impl Into<String>, arity: usize) -> Self {
        assert!(arity > 0, "tuple parameters must have at least one element");
        self.param(name, ParamKind::Tuple(arity))
    }

    fn param(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        let name = name.into();
        assert!(
            !self.params.iter().any(|param| param.name == name),
            "duplicate parameter name '{name}'",
        );
        self.params.push(ParamSchema { name, kind });
        self
    }

    pub fn finish(self) -> ModelSchema {
        let mut ancestry = Vec::with_capacity(self.ancestors.len() + 1);
        ancestry.push(self.name.clone());
        ancestry.extend(self.ancestors);
        ModelSchema {
            name: self.name,
            ancestry,
            params: self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_declaration_order() {
        let schema = ModelSchema::builder("Gaussian")
            .ancestor("EllipticalProfile")
            .ancestor("Profile")
            .tuple("centre", 2)
            .scalar("intensity")
            .scalar("sigma")
            .finish();

        assert_eq!(schema.name(), "Gaussian");
        assert_eq!(
            schema.ancestry().collect::<Vec<_>>(),
            vec!["Gaussian", "EllipticalProfile", "Profile"],
        );
        let names: Vec<_> = schema.params().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["centre", "intensity", "sigma"]);
        assert_eq!(schema.param("centre").unwrap().kind(), ParamKind::Tuple(2));
        assert_eq!(schema.param("sigma").unwrap().kind(), ParamKind::Scalar);
        assert!(schema.param("missing").is_none());
    }

    #[test]
    fn decomposed_len_counts_tuple_arity() {
        let schema = ModelSchema::builder("Gaussian")
            .tuple("centre", 2)
            .scalar("intensity")
            .finish();
        assert_eq!(schema.decomposed_len(), 3);
    }

    #[test]
    #[should_panic(expected = "duplicate parameter name")]
    fn duplicate_parameter_names_panic() {
        let _ = ModelSchema::builder("Gaussian")
            .scalar("sigma")
            .scalar("sigma");
    }
}
