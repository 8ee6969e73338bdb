use crate::error::ModelError;
use crate::prior::{Constant, ConstantValue, GaussianPrior, Prior, PriorTrait, UniformPrior};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Handle to a prior owned by a [PriorArena]
///
/// Handles are issued in strictly increasing order and never reused, so their
/// `Ord` is the creation order used for the canonical parameter layout.
/// Equality and hashing are structural on the handle value: storing the same
/// handle in two attribute slots ties those attributes to one sampled
/// dimension.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct PriorId(u64);

impl fmt::Display for PriorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry issuing monotonically increasing identities for priors and
/// constants
///
/// One counter serves both kinds, so a mixed creation sequence stays totally
/// ordered. The counter is append-only: cloning an arena (done when a mapper
/// is narrowed into a new one) keeps its high-water mark, so no handle is
/// ever reissued within a lineage.
#[derive(Clone, Debug, Default)]
pub struct PriorArena {
    next_id: u64,
    priors: BTreeMap<PriorId, Prior>,
}

impl PriorArena {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_handle(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Store a prior and return its freshly issued handle
    pub fn insert(&mut self, prior: Prior) -> PriorId {
        let id = PriorId(self.next_handle());
        self.priors.insert(id, prior);
        id
    }

    pub fn uniform(&mut self, lower_limit: f64, upper_limit: f64) -> Result<PriorId, ModelError> {
        Ok(self.insert(UniformPrior::new(lower_limit, upper_limit)?.into()))
    }

    pub fn gaussian(&mut self, mean: f64, sigma: f64) -> PriorId {
        self.insert(GaussianPrior::new(mean, sigma).into())
    }

    /// Build a constant whose id comes from the same counter as priors
    pub fn constant(&mut self, value: impl Into<ConstantValue>) -> Constant {
        Constant::new(self.next_handle(), value.into())
    }

    pub fn get(&self, id: PriorId) -> Result<&Prior, ModelError> {
        self.priors.get(&id).ok_or(ModelError::UnknownPrior { id })
    }

    /// Resolve a unit hypercube draw through the prior behind `id`
    pub fn value_for(&self, id: PriorId, unit: f64) -> Result<f64, ModelError> {
        Ok(self.get(id)?.value_for(unit))
    }

    pub fn len(&self) -> usize {
        self.priors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priors.is_empty()
    }

    /// Priors in ascending handle order
    pub fn iter(&self) -> impl Iterator<Item = (PriorId, &Prior)> {
        self.priors.iter().map(|(&id, prior)| (id, prior))
    }
}
