use crate::arena::{PriorArena, PriorId};
use crate::arguments::{ArgValue, ConstructorArgs};
use crate::config::PriorConfig;
use crate::error::ModelError;
use crate::prior::{Constant, ConstantValue};
use crate::schema::{ModelSchema, ParamKind};
use crate::tuple_prior::TuplePrior;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A wrapped component type: its declared parameter schema plus the
/// constructor function turning resolved arguments into an instance
///
/// The constructor is a plain function pointer, so a descriptor is cheap to
/// copy around and carries no state of its own.
pub struct ModelDescriptor<M> {
    schema: Arc<ModelSchema>,
    construct: fn(&ConstructorArgs<M>) -> Result<M, ModelError>,
}

impl<M> ModelDescriptor<M> {
    pub fn new(
        schema: impl Into<Arc<ModelSchema>>,
        construct: fn(&ConstructorArgs<M>) -> Result<M, ModelError>,
    ) -> Self {
        Self {
            schema: schema.into(),
            construct,
        }
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub(crate) fn schema_arc(&self) -> Arc<ModelSchema> {
        Arc::clone(&self.schema)
    }

    pub fn construct(&self, args: &ConstructorArgs<M>) -> Result<M, ModelError> {
        (self.construct)(args)
    }
}

impl<M> Clone for ModelDescriptor<M> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            construct: self.construct,
        }
    }
}

impl<M> fmt::Debug for ModelDescriptor<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("schema", &self.schema.name())
            .finish_non_exhaustive()
    }
}

/// Value held by one named attribute of a [PriorModel]
#[derive(Debug)]
pub enum Attribute<M> {
    Prior(PriorId),
    Constant(Constant),
    Tuple(TuplePrior),
    Model(PriorModel<M>),
}

impl<M> Clone for Attribute<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Prior(id) => Self::Prior(*id),
            Self::Constant(constant) => Self::Constant(constant.clone()),
            Self::Tuple(tuple) => Self::Tuple(tuple.clone()),
            Self::Model(model) => Self::Model(model.clone()),
        }
    }
}

/// One wrapped component type with a prior, constant, tuple prior or nested
/// model per declared constructor parameter
///
/// The attribute set always covers the schema's parameter list exactly:
/// setters replace values in place and reject names the schema does not
/// declare.
#[derive(Debug)]
pub struct PriorModel<M> {
    descriptor: ModelDescriptor<M>,
    attributes: Vec<(String, Attribute<M>)>,
}

impl<M> Clone for PriorModel<M> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

enum Slot {
    Direct(usize),
    TupleElement { position: usize, element: usize },
}

impl<M> PriorModel<M> {
    /// Build a model with one prior/constant per declared parameter, resolved
    /// through the configuration's nearest-ancestor lookup
    pub fn from_config(
        descriptor: ModelDescriptor<M>,
        config: &PriorConfig,
        arena: &mut PriorArena,
    ) -> Result<Self, ModelError> {
        let schema = descriptor.schema_arc();
        let mut attributes = Vec::with_capacity(schema.params().len());
        for param in schema.params() {
            let attribute = match param.kind() {
                ParamKind::Scalar => Self::make_prior(&schema, config, arena, param.name())?,
                ParamKind::Tuple(arity) => {
                    let elements = (0..arity)
                        .map(|index| {
                            let sub_name = format!("{}_{}", param.name(), index);
                            match Self::make_prior(&schema, config, arena, &sub_name)? {
                                Attribute::Prior(id) => Ok(id),
                                _ => Err(ModelError::AttributeKindMismatch {
                                    component: schema.name().into(),
                                    attribute: sub_name,
                                    assigned: "constant",
                                }),
                            }
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    Attribute::Tuple(TuplePrior::new(param.name(), elements))
                }
            };
            attributes.push((param.name().to_owned(), attribute));
        }
        Ok(Self {
            descriptor,
            attributes,
        })
    }

    fn make_prior(
        schema: &ModelSchema,
        config: &PriorConfig,
        arena: &mut PriorArena,
        attribute: &str,
    ) -> Result<Attribute<M>, ModelError> {
        let spec = config.get_for_nearest_ancestor(schema, attribute)?;
        match spec.tag.as_str() {
            "u" => Ok(Attribute::Prior(arena.uniform(spec.p1, spec.p2)?)),
            "g" => Ok(Attribute::Prior(arena.gaussian(spec.p1, spec.p2))),
            "c" => Ok(Attribute::Constant(arena.constant(spec.p1))),
            tag => Err(ModelError::UnknownPriorKind {
                component: schema.name().into(),
                attribute: attribute.into(),
                tag: tag.into(),
            }),
        }
    }

    pub fn descriptor(&self) -> &ModelDescriptor<M> {
        &self.descriptor
    }

    pub fn schema(&self) -> &ModelSchema {
        self.descriptor.schema()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute<M>> {
        self.attributes
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute<M>)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Resolve an attribute name to a slot, routing `<attr>_<index>` names
    /// into the matching tuple parameter
    fn resolve_slot(&self, name: &str) -> Result<Slot, ModelError> {
        if let Some(position) = self.attributes.iter().position(|(key, _)| key == name) {
            return Ok(Slot::Direct(position));
        }
        if let Some((base, index)) = name.rsplit_once('_') {
            if let Ok(element) = index.parse::<usize>() {
                if let Some(ParamKind::Tuple(arity)) =
                    self.schema().param(base).map(|param| param.kind())
                {
                    if element < arity {
                        let position = self
                            .attributes
                            .iter()
                            .position(|(key, _)| key == base)
                            .expect("attributes cover every schema parameter");
                        return Ok(Slot::TupleElement { position, element });
                    }
                }
            }
        }
        Err(ModelError::UnknownAttribute {
            component: self.schema().name().into(),
            attribute: name.into(),
        })
    }

    fn kind_mismatch(&self, attribute: &str, assigned: &'static str) -> ModelError {
        ModelError::AttributeKindMismatch {
            component: self.schema().name().into(),
            attribute: attribute.into(),
            assigned,
        }
    }

    /// Point a named attribute (or a `<attr>_<index>` tuple sub-attribute) at
    /// an existing prior handle
    ///
    /// Storing a handle already used by another attribute ties the two: they
    /// are always resolved from the same sampled coordinate.
    pub fn set_prior(&mut self, name: &str, id: PriorId) -> Result<(), ModelError> {
        match self.resolve_slot(name)? {
            Slot::Direct(position) => match self.schema().params()[position].kind() {
                ParamKind::Scalar => {
                    self.attributes[position].1 = Attribute::Prior(id);
                    Ok(())
                }
                ParamKind::Tuple(_) => Err(self.kind_mismatch(name, "scalar prior")),
            },
            Slot::TupleElement { position, element } => {
                match &mut self.attributes[position].1 {
                    Attribute::Tuple(tuple) => {
                        tuple.set_element(element, id);
                        Ok(())
                    }
                    _ => Err(self.kind_mismatch(name, "scalar prior")),
                }
            }
        }
    }

    /// Replace a named attribute with a fixed value, excluding it from the
    /// sampled parameter vector
    ///
    /// The constant's value shape must match the declared parameter kind;
    /// tuple sub-attributes cannot be made constant individually.
    pub fn set_constant(&mut self, name: &str, constant: Constant) -> Result<(), ModelError> {
        let Slot::Direct(position) = self.resolve_slot(name)? else {
            return Err(self.kind_mismatch(name, "constant"));
        };
        let matches = match (
            self.schema().params()[position].kind(),
            constant.value(),
        ) {
            (ParamKind::Scalar, ConstantValue::Float(_)) => true,
            (ParamKind::Tuple(arity), ConstantValue::Tuple(values)) => values.len() == arity,
            _ => false,
        };
        if !matches {
            return Err(self.kind_mismatch(name, "constant"));
        }
        self.attributes[position].1 = Attribute::Constant(constant);
        Ok(())
    }

    /// Replace a tuple-valued attribute with a prepared tuple prior of the
    /// declared arity; the stored tuple is renamed after the attribute
    pub fn set_tuple_prior(&mut self, name: &str, tuple: TuplePrior) -> Result<(), ModelError> {
        let Slot::Direct(position) = self.resolve_slot(name)? else {
            return Err(self.kind_mismatch(name, "tuple prior"));
        };
        match self.schema().params()[position].kind() {
            ParamKind::Tuple(arity) if arity == tuple.arity() => {
                self.attributes[position].1 =
                    Attribute::Tuple(TuplePrior::new(name, tuple.elements().to_vec()));
                Ok(())
            }
            _ => Err(self.kind_mismatch(name, "tuple prior")),
        }
    }

    /// Replace a named attribute with a nested model whose reconstructed
    /// instance is passed to the constructor in place of a float
    pub fn set_model(&mut self, name: &str, model: PriorModel<M>) -> Result<(), ModelError> {
        let Slot::Direct(position) = self.resolve_slot(name)? else {
            return Err(self.kind_mismatch(name, "nested model"));
        };
        self.attributes[position].1 = Attribute::Model(model);
        Ok(())
    }

    /// Every reachable prior handle tagged with its owning attribute name,
    /// tuple sub-priors as `<attr>_<index>`, in schema order
    pub fn priors(&self) -> Vec<(String, PriorId)> {
        let mut priors = Vec::new();
        for (name, attribute) in &self.attributes {
            match attribute {
                Attribute::Prior(id) => priors.push((name.clone(), *id)),
                Attribute::Tuple(tuple) => {
                    priors.extend(tuple.sub_attribute_names().zip(tuple.elements().iter().copied()))
                }
                Attribute::Constant(_) => {}
                Attribute::Model(model) => priors.extend(model.priors()),
            }
        }
        priors
    }

    /// Every constant-valued attribute, nested models included
    pub fn constants(&self) -> Vec<(String, &Constant)> {
        let mut constants = Vec::new();
        for (name, attribute) in &self.attributes {
            match attribute {
                Attribute::Constant(constant) => constants.push((name.clone(), constant)),
                Attribute::Model(model) => constants.extend(model.constants()),
                _ => {}
            }
        }
        constants
    }

    /// Maps every reachable prior to the schema and attribute tag it belongs
    /// to, for per-component width lookups
    pub fn prior_schemas(&self) -> Vec<(PriorId, Arc<ModelSchema>, String)> {
        let mut schemas = Vec::new();
        for (name, attribute) in &self.attributes {
            match attribute {
                Attribute::Prior(id) => {
                    schemas.push((*id, self.descriptor.schema_arc(), name.clone()))
                }
                Attribute::Tuple(tuple) => schemas.extend(
                    tuple
                        .sub_attribute_names()
                        .zip(tuple.elements().iter().copied())
                        .map(|(sub_name, id)| (id, self.descriptor.schema_arc(), sub_name)),
                ),
                Attribute::Constant(_) => {}
                Attribute::Model(model) => schemas.extend(model.prior_schemas()),
            }
        }
        schemas
    }

    /// Construct one instance of the wrapped type from resolved prior values
    pub fn instance_for_arguments(
        &self,
        resolved: &BTreeMap<PriorId, f64>,
    ) -> Result<M, ModelError> {
        let mut args = ConstructorArgs::new();
        for (name, attribute) in &self.attributes {
            let value = match attribute {
                Attribute::Prior(id) => ArgValue::Float(
                    *resolved
                        .get(id)
                        .ok_or(ModelError::UnresolvedPrior { id: *id })?,
                ),
                Attribute::Tuple(tuple) => ArgValue::Tuple(tuple.value_for_arguments(resolved)?),
                Attribute::Constant(constant) => match constant.value() {
                    ConstantValue::Float(value) => ArgValue::Float(value.into_inner()),
                    ConstantValue::Tuple(values) => {
                        ArgValue::Tuple(values.iter().map(|x| x.into_inner()).collect())
                    }
                },
                Attribute::Model(model) => {
                    ArgValue::Instance(model.instance_for_arguments(resolved)?)
                }
            };
            args.push(name.clone(), value);
        }
        self.descriptor.construct(&args)
    }

    /// A new model of the same type with every prior handle substituted per
    /// the mapping; constants pass through unchanged
    ///
    /// Used to re-center and narrow priors between inference rounds.
    pub fn gaussian_prior_model_for_arguments(
        &self,
        mapping: &BTreeMap<PriorId, PriorId>,
    ) -> Result<Self, ModelError> {
        let attributes = self
            .attributes
            .iter()
            .map(|(name, attribute)| {
                let attribute = match attribute {
                    Attribute::Prior(id) => Attribute::Prior(
                        *mapping
                            .get(id)
                            .ok_or(ModelError::UnresolvedPrior { id: *id })?,
                    ),
                    Attribute::Tuple(tuple) => {
                        Attribute::Tuple(tuple.gaussian_tuple_prior_for_arguments(mapping)?)
                    }
                    Attribute::Constant(constant) => Attribute::Constant(constant.clone()),
                    Attribute::Model(model) => {
                        Attribute::Model(model.gaussian_prior_model_for_arguments(mapping)?)
                    }
                };
                Ok((name.clone(), attribute))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        Ok(Self {
            descriptor: self.descriptor.clone(),
            attributes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::*;

    #[test]
    fn from_config_decomposes_every_parameter() {
        let mut arena = PriorArena::new();
        let model = PriorModel::from_config(gaussian_descriptor(), &test_config(), &mut arena)
            .unwrap();
        // centre decomposes into two sub-priors
        assert_eq!(model.priors().len() + model.constants().len(), 4);
        let tags: Vec<_> = model.priors().into_iter().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec!["centre_0", "centre_1", "intensity", "sigma"]);
    }

    #[test]
    fn constant_tag_in_config_is_excluded_from_priors() {
        let mut arena = PriorArena::new();
        let model =
            PriorModel::from_config(point_descriptor(), &test_config(), &mut arena).unwrap();
        assert_eq!(model.priors().len(), 1);
        assert_eq!(model.constants().len(), 1);
        assert_eq!(model.constants()[0].0, "y");
    }

    #[test]
    fn unknown_kind_tag_names_the_attribute() {
        let mut config = test_config();
        config.insert("Point", "x", PriorSpec {
            tag: "q".into(),
            p1: 0.0,
            p2: 1.0,
        });
        let mut arena = PriorArena::new();
        assert_eq!(
            PriorModel::from_config(point_descriptor(), &config, &mut arena).unwrap_err(),
            ModelError::UnknownPriorKind {
                component: "Point".into(),
                attribute: "x".into(),
                tag: "q".into(),
            },
        );
    }

    #[test]
    fn set_constant_promotes_and_excludes() {
        let mut arena = PriorArena::new();
        let mut model =
            PriorModel::from_config(gaussian_descriptor(), &test_config(), &mut arena).unwrap();
        let before = model.priors().len();
        let constant = arena.constant(2.5);
        model.set_constant("sigma", constant).unwrap();
        assert_eq!(model.priors().len(), before - 1);
        assert_eq!(model.constants().len(), 1);
    }

    #[test]
    fn set_prior_routes_tuple_sub_attributes() {
        let mut arena = PriorArena::new();
        let mut model =
            PriorModel::from_config(gaussian_descriptor(), &test_config(), &mut arena).unwrap();
        let replacement = arena.gaussian(0.5, 0.1);
        model.set_prior("centre_1", replacement).unwrap();
        let priors = model.priors();
        assert_eq!(priors[1], ("centre_1".to_owned(), replacement));
        // the other element is untouched
        assert_ne!(priors[0].1, replacement);
    }

    #[test]
    fn unknown_attribute_is_rejected() {
        let mut arena = PriorArena::new();
        let mut model =
            PriorModel::from_config(gaussian_descriptor(), &test_config(), &mut arena).unwrap();
        let id = arena.gaussian(0.0, 1.0);
        assert_eq!(
            model.set_prior("radius", id).unwrap_err(),
            ModelError::UnknownAttribute {
                component: "Gaussian".into(),
                attribute: "radius".into(),
            },
        );
        // out-of-range tuple index does not route
        assert!(model.set_prior("centre_2", id).is_err());
    }

    #[test]
    fn constant_shape_must_match_the_declared_kind() {
        let mut arena = PriorArena::new();
        let mut model =
            PriorModel::from_config(gaussian_descriptor(), &test_config(), &mut arena).unwrap();
        let scalar = arena.constant(1.0);
        assert!(model.set_constant("centre", scalar).is_err());
        let pair = arena.constant((0.0, 1.0));
        model.set_constant("centre", pair).unwrap();
        assert_eq!(model.priors().len(), 2);
    }

    #[test]
    fn instance_for_arguments_reassembles_tuples() {
        let mut arena = PriorArena::new();
        let model =
            PriorModel::from_config(gaussian_descriptor(), &test_config(), &mut arena).unwrap();
        let resolved: BTreeMap<_, _> = model
            .priors()
            .into_iter()
            .enumerate()
            .map(|(index, (_, id))| (id, index as f64))
            .collect();
        let instance = model.instance_for_arguments(&resolved).unwrap();
        let gaussian = instance.as_gaussian();
        assert_eq!(gaussian.centre, (0.0, 1.0));
        assert_eq!(gaussian.intensity, 2.0);
        assert_eq!(gaussian.sigma, 3.0);
    }

    #[test]
    fn missing_resolution_fails_with_the_prior_identity() {
        let mut arena = PriorArena::new();
        let model =
            PriorModel::from_config(point_descriptor(), &test_config(), &mut arena).unwrap();
        let (_, id) = model.priors()[0];
        assert_eq!(
            model.instance_for_arguments(&BTreeMap::new()).unwrap_err(),
            ModelError::UnresolvedPrior { id },
        );
    }

    #[test]
    fn substitution_replaces_priors_and_keeps_constants() {
        let mut arena = PriorArena::new();
        let model =
            PriorModel::from_config(point_descriptor(), &test_config(), &mut arena).unwrap();
        let (_, old) = model.priors()[0];
        let new = arena.gaussian(1.0, 0.5);
        let mapping: BTreeMap<_, _> = [(old, new)].into();
        let narrowed = model.gaussian_prior_model_for_arguments(&mapping).unwrap();
        assert_eq!(narrowed.priors()[0].1, new);
        assert_eq!(narrowed.constants().len(), 1);
        assert_eq!(narrowed.constants()[0].1, model.constants()[0].1);
    }

    #[test]
    fn nested_model_joins_the_prior_set_and_reconstructs() {
        let mut arena = PriorArena::new();
        let config = test_config();
        let mut outer =
            PriorModel::from_config(lensed_descriptor(), &config, &mut arena).unwrap();
        let inner = PriorModel::from_config(point_descriptor(), &config, &mut arena).unwrap();
        outer.set_model("source", inner).unwrap();

        // outer's own scalar plus the nested point's free parameter
        assert_eq!(outer.priors().len(), 2);
        let resolved: BTreeMap<_, _> = outer
            .priors()
            .into_iter()
            .map(|(_, id)| (id, 0.5))
            .collect();
        let instance = outer.instance_for_arguments(&resolved).unwrap();
        let lensed = instance.as_lensed();
        assert_eq!(lensed.scale, 0.5);
        assert_eq!(lensed.source.x, 0.5);
        assert_eq!(lensed.source.y, 5.0);
    }
}
