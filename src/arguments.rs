use crate::error::ModelError;

/// One resolved constructor argument
#[derive(Clone, Debug)]
pub enum ArgValue<M> {
    Float(f64),
    Tuple(Vec<f64>),
    /// A fully reconstructed nested component
    Instance(M),
}

/// Resolved keyword arguments handed to a component constructor function
///
/// Accessors fail fast on a missing name or a shape mismatch; the engine
/// guarantees one entry per declared schema parameter.
#[derive(Clone, Debug, Default)]
pub struct ConstructorArgs<M> {
    values: Vec<(String, ArgValue<M>)>,
}

impl<M> ConstructorArgs<M> {
    pub(crate) fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: ArgValue<M>) {
        self.values.push((name.into(), value));
    }

    fn get(&self, name: &str) -> Result<&ArgValue<M>, ModelError> {
        self.values
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
            .ok_or_else(|| ModelError::MissingArgument { name: name.into() })
    }

    pub fn float(&self, name: &str) -> Result<f64, ModelError> {
        match self.get(name)? {
            ArgValue::Float(value) => Ok(*value),
            _ => Err(ModelError::ArgumentKindMismatch {
                name: name.into(),
                expected: "float",
            }),
        }
    }

    pub fn tuple(&self, name: &str) -> Result<&[f64], ModelError> {
        match self.get(name)? {
            ArgValue::Tuple(values) => Ok(values),
            _ => Err(ModelError::ArgumentKindMismatch {
                name: name.into(),
                expected: "tuple",
            }),
        }
    }

    /// Convenience accessor for the common 2-D tuple parameter
    pub fn pair(&self, name: &str) -> Result<(f64, f64), ModelError> {
        match self.tuple(name)? {
            [first, second] => Ok((*first, *second)),
            _ => Err(ModelError::ArgumentKindMismatch {
                name: name.into(),
                expected: "pair",
            }),
        }
    }

    pub fn instance(&self, name: &str) -> Result<&M, ModelError> {
        match self.get(name)? {
            ArgValue::Instance(instance) => Ok(instance),
            _ => Err(ModelError::ArgumentKindMismatch {
                name: name.into(),
                expected: "instance",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors() {
        let mut args: ConstructorArgs<()> = ConstructorArgs::new();
        args.push("x", ArgValue::Float(1.5));
        args.push("centre", ArgValue::Tuple(vec![0.0, 2.0]));

        assert_eq!(args.float("x").unwrap(), 1.5);
        assert_eq!(args.tuple("centre").unwrap(), &[0.0, 2.0]);
        assert_eq!(args.pair("centre").unwrap(), (0.0, 2.0));
    }

    #[test]
    fn missing_argument_fails() {
        let args: ConstructorArgs<()> = ConstructorArgs::new();
        assert_eq!(
            args.float("x").unwrap_err(),
            ModelError::MissingArgument { name: "x".into() },
        );
    }

    #[test]
    fn kind_mismatch_fails() {
        let mut args: ConstructorArgs<()> = ConstructorArgs::new();
        args.push("x", ArgValue::Float(1.0));
        assert_eq!(
            args.tuple("x").unwrap_err(),
            ModelError::ArgumentKindMismatch {
                name: "x".into(),
                expected: "tuple",
            },
        );
        args.push("triple", ArgValue::Tuple(vec![1.0, 2.0, 3.0]));
        assert_eq!(
            args.pair("triple").unwrap_err(),
            ModelError::ArgumentKindMismatch {
                name: "triple".into(),
                expected: "pair",
            },
        );
    }
}
