use crate::arena::PriorId;
use crate::error::ModelError;
use crate::prior::Constant;
use crate::prior_model::PriorModel;
use crate::schema::ModelSchema;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

/// An ordered sequence of prior models treated as one named model entity
///
/// Member order matters for instance reconstruction only; prior aggregation
/// deduplicates by handle, so a prior tied across members counts once.
#[derive(Debug)]
pub struct ListPriorModel<M> {
    models: Vec<PriorModel<M>>,
}

impl<M> Clone for ListPriorModel<M> {
    fn clone(&self) -> Self {
        Self {
            models: self.models.clone(),
        }
    }
}

impl<M> ListPriorModel<M> {
    pub fn new(models: Vec<PriorModel<M>>) -> Self {
        Self { models }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PriorModel<M>> {
        self.models.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PriorModel<M>> {
        self.models.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PriorModel<M>> {
        self.models.iter()
    }

    /// Tagged prior handles across all members, deduplicated by handle
    pub fn priors(&self) -> Vec<(String, PriorId)> {
        let mut seen = BTreeSet::new();
        self.models
            .iter()
            .flat_map(|model| model.priors())
            .filter(|(_, id)| seen.insert(*id))
            .collect()
    }

    /// Named constants across all members, deduplicated by id
    pub fn constants(&self) -> Vec<(String, &Constant)> {
        let mut seen = BTreeSet::new();
        self.models
            .iter()
            .flat_map(|model| model.constants())
            .filter(|(_, constant)| seen.insert(constant.id()))
            .collect()
    }

    pub fn prior_schemas(&self) -> Vec<(PriorId, Arc<ModelSchema>, String)> {
        self.models
            .iter()
            .flat_map(|model| model.prior_schemas())
            .collect()
    }

    /// Reconstructed instances in member order
    pub fn instance_for_arguments(
        &self,
        resolved: &BTreeMap<PriorId, f64>,
    ) -> Result<Vec<M>, ModelError> {
        self.models
            .iter()
            .map(|model| model.instance_for_arguments(resolved))
            .collect()
    }

    /// Element-wise substitution, member order preserved
    pub fn gaussian_prior_model_for_arguments(
        &self,
        mapping: &BTreeMap<PriorId, PriorId>,
    ) -> Result<Self, ModelError> {
        let models = self
            .models
            .iter()
            .map(|model| model.gaussian_prior_model_for_arguments(mapping))
            .collect::<Result<_, _>>()?;
        Ok(Self { models })
    }
}
