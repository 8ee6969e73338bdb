use crate::arena::PriorId;
use crate::error::ModelError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A fixed-arity group of sub-priors representing one tuple-valued parameter
///
/// Sub-attributes are addressed as `<attr>_<index>`; their index order is the
/// element order of the reconstructed tuple.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct TuplePrior {
    attr: String,
    elements: Vec<PriorId>,
}

impl TuplePrior {
    pub fn new(attr: impl Into<String>, elements: Vec<PriorId>) -> Self {
        let attr = attr.into();
        assert!(
            !elements.is_empty(),
            "tuple prior '{attr}' must have at least one element",
        );
        Self { attr, elements }
    }

    pub fn attr(&self) -> &str {
        &self.attr
    }

    pub fn arity(&self) -> usize {
        self.elements.len()
    }

    pub fn elements(&self) -> &[PriorId] {
        &self.elements
    }

    pub fn sub_attribute_names(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.elements.len()).map(|index| format!("{}_{}", self.attr, index))
    }

    pub(crate) fn set_element(&mut self, index: usize, id: PriorId) {
        assert!(
            index < self.elements.len(),
            "tuple prior '{}' has no element {index}",
            self.attr,
        );
        self.elements[index] = id;
    }

    /// Tuple of resolved physical values in ascending sub-attribute order
    pub fn value_for_arguments(
        &self,
        resolved: &BTreeMap<PriorId, f64>,
    ) -> Result<Vec<f64>, ModelError> {
        self.elements
            .iter()
            .map(|&id| {
                resolved
                    .get(&id)
                    .copied()
                    .ok_or(ModelError::UnresolvedPrior { id })
            })
            .collect()
    }

    /// A new tuple prior with every element substituted per the handle mapping
    pub fn gaussian_tuple_prior_for_arguments(
        &self,
        mapping: &BTreeMap<PriorId, PriorId>,
    ) -> Result<Self, ModelError> {
        let elements = self
            .elements
            .iter()
            .map(|&id| {
                mapping
                    .get(&id)
                    .copied()
                    .ok_or(ModelError::UnresolvedPrior { id })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            attr: self.attr.clone(),
            elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::PriorArena;

    #[test]
    fn values_come_out_in_sub_attribute_order() {
        let mut arena = PriorArena::new();
        let first = arena.uniform(0.0, 1.0).unwrap();
        let second = arena.uniform(0.0, 1.0).unwrap();
        let tuple = TuplePrior::new("centre", vec![first, second]);

        let resolved: BTreeMap<_, _> = [(first, 0.25), (second, 0.75)].into();
        assert_eq!(tuple.value_for_arguments(&resolved).unwrap(), vec![0.25, 0.75]);

        assert_eq!(
            tuple.sub_attribute_names().collect::<Vec<_>>(),
            vec!["centre_0", "centre_1"],
        );
    }

    #[test]
    fn missing_resolution_names_the_prior() {
        let mut arena = PriorArena::new();
        let first = arena.uniform(0.0, 1.0).unwrap();
        let second = arena.uniform(0.0, 1.0).unwrap();
        let tuple = TuplePrior::new("centre", vec![first, second]);

        let resolved: BTreeMap<_, _> = [(first, 0.25)].into();
        assert_eq!(
            tuple.value_for_arguments(&resolved).unwrap_err(),
            ModelError::UnresolvedPrior { id: second },
        );
    }

    #[test]
    fn substitution_is_element_wise() {
        let mut arena = PriorArena::new();
        let first = arena.uniform(0.0, 1.0).unwrap();
        let second = arena.uniform(0.0, 1.0).unwrap();
        let tuple = TuplePrior::new("centre", vec![first, second]);

        let new_first = arena.gaussian(0.5, 0.1);
        let new_second = arena.gaussian(0.7, 0.1);
        let mapping: BTreeMap<_, _> = [(first, new_first), (second, new_second)].into();
        let narrowed = tuple.gaussian_tuple_prior_for_arguments(&mapping).unwrap();
        assert_eq!(narrowed.elements(), &[new_first, new_second]);
        assert_eq!(narrowed.attr(), "centre");
    }
}
