use crate::arena::{PriorArena, PriorId};
use crate::config::{PriorConfig, WidthConfig};
use crate::error::{ModelError, ModelInfoError};
use crate::instance::{InstanceValue, ModelInstance};
use crate::list_model::ListPriorModel;
use crate::prior::{Constant, ConstantValue, Prior};
use crate::prior_model::{Attribute, ModelDescriptor, PriorModel};
use crate::schema::ModelSchema;

use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const MODEL_INFO_PADDING: usize = 40;

/// One registered entity: a single prior model or an ordered list of them
#[derive(Debug)]
pub enum ModelComponent<M> {
    Model(PriorModel<M>),
    List(ListPriorModel<M>),
}

impl<M> Clone for ModelComponent<M> {
    fn clone(&self) -> Self {
        match self {
            Self::Model(model) => Self::Model(model.clone()),
            Self::List(list) => Self::List(list.clone()),
        }
    }
}

impl<M> ModelComponent<M> {
    fn kind_name(&self) -> &'static str {
        match self {
            Self::Model(_) => "model",
            Self::List(_) => "list",
        }
    }

    pub fn priors(&self) -> Vec<(String, PriorId)> {
        match self {
            Self::Model(model) => model.priors(),
            Self::List(list) => list.priors(),
        }
    }

    pub fn constants(&self) -> Vec<(String, &Constant)> {
        match self {
            Self::Model(model) => model.constants(),
            Self::List(list) => list.constants(),
        }
    }

    fn prior_schemas(&self) -> Vec<(PriorId, Arc<ModelSchema>, String)> {
        match self {
            Self::Model(model) => model.prior_schemas(),
            Self::List(list) => list.prior_schemas(),
        }
    }

    fn instance_for_arguments(
        &self,
        resolved: &BTreeMap<PriorId, f64>,
    ) -> Result<InstanceValue<M>, ModelError> {
        match self {
            Self::Model(model) => Ok(InstanceValue::Single(model.instance_for_arguments(resolved)?)),
            Self::List(list) => Ok(InstanceValue::List(list.instance_for_arguments(resolved)?)),
        }
    }

    fn gaussian_prior_model_for_arguments(
        &self,
        mapping: &BTreeMap<PriorId, PriorId>,
    ) -> Result<Self, ModelError> {
        match self {
            Self::Model(model) => Ok(Self::Model(model.gaussian_prior_model_for_arguments(mapping)?)),
            Self::List(list) => Ok(Self::List(list.gaussian_prior_model_for_arguments(mapping)?)),
        }
    }
}

impl<M> From<PriorModel<M>> for ModelComponent<M> {
    fn from(model: PriorModel<M>) -> Self {
        Self::Model(model)
    }
}

impl<M> From<ListPriorModel<M>> for ModelComponent<M> {
    fn from(list: ListPriorModel<M>) -> Self {
        Self::List(list)
    }
}

/// Top-level named registry of prior models owning the canonical parameter
/// ordering and all vector/instance conversions
///
/// The deduplicated union of every reachable prior, sorted by creation
/// handle, is the canonical parameter-vector layout: position k denotes the
/// same prior for the mapper's entire lifetime. Narrowing operations
/// (`mapper_from_*`) never mutate a mapper; they return a new one with a
/// freshly computed ordering, so any mapper handed to a search loop stays
/// frozen and conversion calls may run concurrently over `&self`.
#[derive(Debug)]
pub struct ModelMapper<M> {
    arena: PriorArena,
    config: Arc<PriorConfig>,
    width_config: Arc<WidthConfig>,
    components: Vec<(String, ModelComponent<M>)>,
}

impl<M> Clone for ModelMapper<M> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            config: Arc::clone(&self.config),
            width_config: Arc::clone(&self.width_config),
            components: self.components.clone(),
        }
    }
}

impl<M> ModelMapper<M> {
    pub fn new(config: Arc<PriorConfig>, width_config: Arc<WidthConfig>) -> Self {
        Self {
            arena: PriorArena::new(),
            config,
            width_config,
            components: Vec::new(),
        }
    }

    pub fn arena(&self) -> &PriorArena {
        &self.arena
    }

    /// Setup-time access to the arena, e.g. for building replacement priors
    pub fn arena_mut(&mut self) -> &mut PriorArena {
        &mut self.arena
    }

    fn store(&mut self, name: &str, component: ModelComponent<M>) {
        match self
            .components
            .iter_mut()
            .find(|(key, _)| key == name)
        {
            Some((_, slot)) => *slot = component,
            None => self.components.push((name.to_owned(), component)),
        }
    }

    /// Register a component type under a name, building one prior per
    /// declared parameter from the configuration defaults
    pub fn register(&mut self, name: &str, descriptor: ModelDescriptor<M>) -> Result<(), ModelError> {
        let model = PriorModel::from_config(descriptor, &self.config, &mut self.arena)?;
        self.store(name, model.into());
        Ok(())
    }

    /// Build a prior model from the configuration defaults without
    /// registering it, e.g. to assemble a list component
    pub fn prior_model(
        &mut self,
        descriptor: ModelDescriptor<M>,
    ) -> Result<PriorModel<M>, ModelError> {
        PriorModel::from_config(descriptor, &self.config, &mut self.arena)
    }

    /// Register a prepared prior model as-is
    pub fn register_model(&mut self, name: &str, model: PriorModel<M>) {
        self.store(name, model.into());
    }

    /// Register an ordered list of prepared prior models as one entity
    pub fn register_list(&mut self, name: &str, models: Vec<PriorModel<M>>) {
        self.store(name, ListPriorModel::new(models).into());
    }

    pub fn component(&self, name: &str) -> Result<&ModelComponent<M>, ModelError> {
        self.components
            .iter()
            .find_map(|(key, component)| (key == name).then_some(component))
            .ok_or_else(|| ModelError::UnknownComponent { name: name.into() })
    }

    fn component_mut(&mut self, name: &str) -> Result<&mut ModelComponent<M>, ModelError> {
        self.components
            .iter_mut()
            .find_map(|(key, component)| (key == name).then_some(component))
            .ok_or_else(|| ModelError::UnknownComponent { name: name.into() })
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &ModelComponent<M>)> {
        self.components
            .iter()
            .map(|(name, component)| (name.as_str(), component))
    }

    pub fn model(&self, name: &str) -> Result<&PriorModel<M>, ModelError> {
        match self.component(name)? {
            ModelComponent::Model(model) => Ok(model),
            other => Err(ModelError::ComponentKindMismatch {
                name: name.into(),
                expected: "model",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn model_mut(&mut self, name: &str) -> Result<&mut PriorModel<M>, ModelError> {
        match self.component_mut(name)? {
            ModelComponent::Model(model) => Ok(model),
            other => Err(ModelError::ComponentKindMismatch {
                name: name.into(),
                expected: "model",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn list(&self, name: &str) -> Result<&ListPriorModel<M>, ModelError> {
        match self.component(name)? {
            ModelComponent::List(list) => Ok(list),
            other => Err(ModelError::ComponentKindMismatch {
                name: name.into(),
                expected: "list",
                actual: other.kind_name(),
            }),
        }
    }

    pub fn list_mut(&mut self, name: &str) -> Result<&mut ListPriorModel<M>, ModelError> {
        match self.component_mut(name)? {
            ModelComponent::List(list) => Ok(list),
            other => Err(ModelError::ComponentKindMismatch {
                name: name.into(),
                expected: "list",
                actual: other.kind_name(),
            }),
        }
    }

    /// Replace an attribute of a registered model with a fixed value
    pub fn set_constant(
        &mut self,
        model: &str,
        attribute: &str,
        value: impl Into<ConstantValue>,
    ) -> Result<(), ModelError> {
        let constant = self.arena.constant(value);
        self.model_mut(model)?.set_constant(attribute, constant)
    }

    /// The prior handle behind an attribute (or `<attr>_<index>` tuple
    /// sub-attribute) of a registered model
    pub fn prior_of(&self, model: &str, attribute: &str) -> Result<PriorId, ModelError> {
        let model_ref = self.model(model)?;
        model_ref
            .priors()
            .into_iter()
            .find_map(|(tag, id)| (tag == attribute).then_some(id))
            .ok_or_else(|| ModelError::UnknownAttribute {
                component: model_ref.schema().name().into(),
                attribute: attribute.into(),
            })
    }

    /// Tie two attributes to one sampled dimension by storing the source
    /// attribute's handle in the target slot
    pub fn tie(
        &mut self,
        source_model: &str,
        source_attribute: &str,
        target_model: &str,
        target_attribute: &str,
    ) -> Result<(), ModelError> {
        let id = self.prior_of(source_model, source_attribute)?;
        self.model_mut(target_model)?.set_prior(target_attribute, id)
    }

    /// The canonical parameter layout: deduplicated reachable priors in
    /// ascending handle order
    pub fn priors_ordered_by_id(&self) -> Vec<PriorId> {
        self.components
            .iter()
            .flat_map(|(_, component)| component.priors())
            .map(|(_, id)| id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Number of free parameters, ties and constants excluded
    pub fn total_parameters(&self) -> usize {
        self.priors_ordered_by_id().len()
    }

    pub fn total_constants(&self) -> usize {
        self.components
            .iter()
            .flat_map(|(_, component)| component.constants())
            .map(|(_, constant)| constant.id())
            .collect::<BTreeSet<_>>()
            .len()
    }

    fn prior_schema_map(&self) -> BTreeMap<PriorId, (Arc<ModelSchema>, String)> {
        let mut map = BTreeMap::new();
        for (_, component) in &self.components {
            for (id, schema, tag) in component.prior_schemas() {
                map.entry(id).or_insert((schema, tag));
            }
        }
        map
    }

    fn check_length(&self, actual: usize) -> Result<Vec<PriorId>, ModelError> {
        let canonical = self.priors_ordered_by_id();
        if canonical.len() != actual {
            return Err(ModelError::VectorLengthMismatch {
                expected: canonical.len(),
                actual,
            });
        }
        Ok(canonical)
    }

    fn resolved_from_unit_vector(
        &self,
        unit_vector: &[f64],
    ) -> Result<BTreeMap<PriorId, f64>, ModelError> {
        let canonical = self.check_length(unit_vector.len())?;
        canonical
            .into_iter()
            .zip(unit_vector)
            .map(|(id, &unit)| Ok((id, self.arena.value_for(id, unit)?)))
            .collect()
    }

    /// Canonical-order physical values for a unit hypercube vector, without
    /// constructing instances
    pub fn physical_vector_from_hypercube_vector(
        &self,
        unit_vector: &[f64],
    ) -> Result<Vec<f64>, ModelError> {
        let canonical = self.check_length(unit_vector.len())?;
        canonical
            .into_iter()
            .zip(unit_vector)
            .map(|(id, &unit)| self.arena.value_for(id, unit))
            .collect()
    }

    pub fn physical_values_from_prior_medians(&self) -> Result<Vec<f64>, ModelError> {
        self.physical_vector_from_hypercube_vector(&vec![0.5; self.total_parameters()])
    }

    /// Reconstruct every registered component from already-resolved prior
    /// values
    pub fn instance_from_arguments(
        &self,
        resolved: &BTreeMap<PriorId, f64>,
    ) -> Result<ModelInstance<M>, ModelError> {
        let attributes = self
            .components
            .iter()
            .map(|(name, component)| {
                Ok((name.clone(), component.instance_for_arguments(resolved)?))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        Ok(ModelInstance::new(attributes))
    }

    /// Reconstruct every registered component from a unit hypercube vector in
    /// canonical order
    pub fn instance_from_unit_vector(
        &self,
        unit_vector: &[f64],
    ) -> Result<ModelInstance<M>, ModelError> {
        let resolved = self.resolved_from_unit_vector(unit_vector)?;
        self.instance_from_arguments(&resolved)
    }

    /// Reconstruct from already-physical values in canonical order, bypassing
    /// the prior transforms
    pub fn instance_from_physical_vector(
        &self,
        physical_vector: &[f64],
    ) -> Result<ModelInstance<M>, ModelError> {
        let canonical = self.check_length(physical_vector.len())?;
        let resolved = canonical
            .into_iter()
            .zip(physical_vector.iter().copied())
            .collect();
        self.instance_from_arguments(&resolved)
    }

    pub fn instance_from_prior_medians(&self) -> Result<ModelInstance<M>, ModelError> {
        self.instance_from_unit_vector(&vec![0.5; self.total_parameters()])
    }

    /// Legacy flattening of a reconstructed point: components and attributes
    /// are visited in lexical name order rather than the canonical handle
    /// order, tuple elements in index order, list members in member order
    ///
    /// Best-effort utility kept for compatibility with downstream tabulation;
    /// not a stable contract.
    pub fn physical_values_ordered_by_class(
        &self,
        unit_vector: &[f64],
    ) -> Result<Vec<f64>, ModelError> {
        fn flatten_model<M>(
            model: &PriorModel<M>,
            resolved: &BTreeMap<PriorId, f64>,
            values: &mut Vec<f64>,
        ) -> Result<(), ModelError> {
            for (_, attribute) in model.attributes().sorted_by_key(|(name, _)| name.to_owned()) {
                match attribute {
                    Attribute::Prior(id) => values.push(
                        *resolved
                            .get(id)
                            .ok_or(ModelError::UnresolvedPrior { id: *id })?,
                    ),
                    Attribute::Tuple(tuple) => {
                        values.extend(tuple.value_for_arguments(resolved)?)
                    }
                    Attribute::Constant(constant) => match constant.value() {
                        ConstantValue::Float(value) => values.push(value.into_inner()),
                        ConstantValue::Tuple(elements) => {
                            values.extend(elements.iter().map(|x| x.into_inner()))
                        }
                    },
                    Attribute::Model(nested) => flatten_model(nested, resolved, values)?,
                }
            }
            Ok(())
        }

        let resolved = self.resolved_from_unit_vector(unit_vector)?;
        let mut values = Vec::new();
        for (_, component) in self
            .components
            .iter()
            .sorted_by_key(|(name, _)| name.clone())
        {
            match component {
                ModelComponent::Model(model) => flatten_model(model, &resolved, &mut values)?,
                ModelComponent::List(list) => {
                    for model in list.iter() {
                        flatten_model(model, &resolved, &mut values)?;
                    }
                }
            }
        }
        Ok(values)
    }

    /// A new mapper with every reachable prior replaced per the mapping
    ///
    /// Replacement priors receive fresh handles from a clone of this mapper's
    /// arena, so handle order stays monotonic across inference rounds. One
    /// old handle maps to exactly one new handle: tied attributes stay tied.
    pub fn mapper_from_prior_arguments(
        &self,
        mapping: &BTreeMap<PriorId, Prior>,
    ) -> Result<Self, ModelError> {
        debug!(replaced = mapping.len(), "rebuilding mapper with substituted priors");
        let mut arena = self.arena.clone();
        let handle_mapping: BTreeMap<PriorId, PriorId> = mapping
            .iter()
            .map(|(&old, prior)| (old, arena.insert(prior.clone())))
            .collect();
        let components = self
            .components
            .iter()
            .map(|(name, component)| {
                Ok((
                    name.clone(),
                    component.gaussian_prior_model_for_arguments(&handle_mapping)?,
                ))
            })
            .collect::<Result<Vec<_>, ModelError>>()?;
        Ok(Self {
            arena,
            config: Arc::clone(&self.config),
            width_config: Arc::clone(&self.width_config),
            components,
        })
    }

    /// Narrow the search around `(mean, sigma)` estimates supplied in
    /// canonical order, flooring each sigma against the configured minimum
    /// width for its component attribute
    pub fn mapper_from_gaussian_tuples(&self, tuples: &[(f64, f64)]) -> Result<Self, ModelError> {
        let canonical = self.check_length(tuples.len())?;
        let schemas = self.prior_schema_map();
        let mapping = canonical
            .into_iter()
            .zip(tuples)
            .map(|(id, &(mean, sigma))| {
                let (schema, tag) = &schemas[&id];
                let width = self.width_config.get_for_nearest_ancestor(schema, tag)?;
                Ok((id, Prior::gaussian(mean, sigma.max(width))))
            })
            .collect::<Result<BTreeMap<_, _>, ModelError>>()?;
        self.mapper_from_prior_arguments(&mapping)
    }

    /// Narrow the search around mean estimates supplied in canonical order,
    /// taking each sigma from the configured width
    pub fn mapper_from_gaussian_means(&self, means: &[f64]) -> Result<Self, ModelError> {
        let canonical = self.check_length(means.len())?;
        let schemas = self.prior_schema_map();
        let mapping = canonical
            .into_iter()
            .zip(means)
            .map(|(id, &mean)| {
                let (schema, tag) = &schemas[&id];
                let width = self.width_config.get_for_nearest_ancestor(schema, tag)?;
                Ok((id, Prior::gaussian(mean, width)))
            })
            .collect::<Result<BTreeMap<_, _>, ModelError>>()?;
        self.mapper_from_prior_arguments(&mapping)
    }

    fn flat_models(&self) -> Vec<(String, &PriorModel<M>)> {
        fn push_nested<'a, M>(
            qualified: &str,
            model: &'a PriorModel<M>,
            flat: &mut Vec<(String, &'a PriorModel<M>)>,
        ) {
            flat.push((qualified.to_owned(), model));
            for (name, attribute) in model.attributes() {
                if let Attribute::Model(nested) = attribute {
                    push_nested(&format!("{qualified}_{name}"), nested, flat);
                }
            }
        }

        let mut flat = Vec::new();
        for (name, component) in &self.components {
            match component {
                ModelComponent::Model(model) => push_nested(name, model, &mut flat),
                ModelComponent::List(list) => {
                    for (index, model) in list.iter().enumerate() {
                        push_nested(&format!("{name}_{index}"), model, &mut flat);
                    }
                }
            }
        }
        flat
    }

    /// Deterministic text enumeration of every flattened component and its
    /// prior/constant description, the audit artifact persisted next to a
    /// non-linear search
    pub fn model_info(&self) -> Result<String, ModelError> {
        let mut blocks = Vec::new();
        for (qualified, model) in self.flat_models() {
            let mut lines = vec![model.schema().name().to_owned()];
            for (name, attribute) in model.attributes() {
                match attribute {
                    Attribute::Prior(id) => lines.push(info_line(
                        &format!("{qualified}_{name}"),
                        &self.arena.get(*id)?.to_string(),
                    )),
                    Attribute::Tuple(tuple) => {
                        for (sub_name, &id) in
                            tuple.sub_attribute_names().zip(tuple.elements())
                        {
                            lines.push(info_line(
                                &format!("{qualified}_{sub_name}"),
                                &self.arena.get(id)?.to_string(),
                            ));
                        }
                    }
                    Attribute::Constant(constant) => lines.push(info_line(
                        &format!("{qualified}_{name}"),
                        &constant.to_string(),
                    )),
                    // nested models get their own block via flat_models
                    Attribute::Model(_) => {}
                }
            }
            blocks.push(lines.join("\n"));
        }
        Ok(blocks.iter().join("\n\n"))
    }

    /// Persist the model description once; an existing file is never
    /// overwritten
    pub fn output_model_info(&self, path: &Path) -> Result<(), ModelInfoError> {
        if path.exists() {
            debug!(path = %path.display(), "model description already persisted");
            return Ok(());
        }
        fs::write(path, self.model_info()?)?;
        info!(path = %path.display(), "persisted model description");
        Ok(())
    }

    /// Compare the live model description byte-for-byte against the persisted
    /// one, failing with [ModelInfoError::Mismatch] on any difference
    pub fn check_model_info(&self, path: &Path) -> Result<(), ModelInfoError> {
        let persisted = fs::read_to_string(path)?;
        if persisted != self.model_info()? {
            return Err(ModelInfoError::Mismatch { path: path.into() });
        }
        debug!(path = %path.display(), "model description matches");
        Ok(())
    }
}

fn info_line(name: &str, description: &str) -> String {
    let padding = MODEL_INFO_PADDING.saturating_sub(name.len());
    format!("{name}{}{description}", " ".repeat(padding))
}
