use crate::error::ModelError;

/// One reconstructed value: a single instance or an ordered list of them
#[derive(Clone, Debug, PartialEq)]
pub enum InstanceValue<M> {
    Single(M),
    List(Vec<M>),
}

/// The reconstructed object graph for one point in parameter space
///
/// Exposes exactly the names registered on the mapper that produced it, in
/// registration order. Instances are produced per evaluation call and never
/// retained by the mapper.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelInstance<M> {
    attributes: Vec<(String, InstanceValue<M>)>,
}

impl<M> ModelInstance<M> {
    pub(crate) fn new(attributes: Vec<(String, InstanceValue<M>)>) -> Self {
        Self { attributes }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&InstanceValue<M>> {
        self.attributes
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// The single instance registered under `name`
    pub fn single(&self, name: &str) -> Result<&M, ModelError> {
        match self.get(name) {
            Some(InstanceValue::Single(instance)) => Ok(instance),
            Some(InstanceValue::List(_)) => Err(ModelError::ComponentKindMismatch {
                name: name.into(),
                expected: "model",
                actual: "list",
            }),
            None => Err(ModelError::UnknownComponent { name: name.into() }),
        }
    }

    /// The instance list registered under `name`
    pub fn list(&self, name: &str) -> Result<&[M], ModelError> {
        match self.get(name) {
            Some(InstanceValue::List(instances)) => Ok(instances),
            Some(InstanceValue::Single(_)) => Err(ModelError::ComponentKindMismatch {
                name: name.into(),
                expected: "list",
                actual: "model",
            }),
            None => Err(ModelError::UnknownComponent { name: name.into() }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InstanceValue<M>)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Flat iterator over every reconstructed instance, list members included
    pub fn instances(&self) -> impl Iterator<Item = &M> {
        self.attributes.iter().flat_map(|(_, value)| match value {
            InstanceValue::Single(instance) => std::slice::from_ref(instance).iter(),
            InstanceValue::List(instances) => instances.iter(),
        })
    }
}
