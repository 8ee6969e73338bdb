use crate::arena::PriorId;

use std::path::PathBuf;

/// Error raised while constructing or using a model mapping
///
/// Every variant is fatal: the engine never retries, the caller is expected
/// to halt model construction or the current inference round.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ModelError {
    #[error("uniform prior bounds must differ, got lower == upper == {value}")]
    EqualUniformBounds { value: f64 },

    #[error(
        "default prior for attribute '{attribute}' of component '{component}' has an \
        unrecognized kind tag '{tag}' (u - Uniform, g - Gaussian, c - Constant)"
    )]
    UnknownPriorKind {
        component: String,
        attribute: String,
        tag: String,
    },

    #[error("no default prior configured for attribute '{attribute}' of component '{component}'")]
    MissingPriorDefault {
        component: String,
        attribute: String,
    },

    #[error("no prior width configured for attribute '{attribute}' of component '{component}'")]
    MissingWidth {
        component: String,
        attribute: String,
    },

    #[error("component '{component}' has no attribute '{attribute}'")]
    UnknownAttribute {
        component: String,
        attribute: String,
    },

    #[error("attribute '{attribute}' of component '{component}' cannot hold a {assigned} value")]
    AttributeKindMismatch {
        component: String,
        attribute: String,
        assigned: &'static str,
    },

    #[error("parameter vector length {actual} does not match the {expected} free parameters")]
    VectorLengthMismatch { expected: usize, actual: usize },

    #[error("no value resolved for prior {id}")]
    UnresolvedPrior { id: PriorId },

    #[error("prior {id} is not registered in this arena")]
    UnknownPrior { id: PriorId },

    #[error("constructor argument '{name}' is missing")]
    MissingArgument { name: String },

    #[error("constructor argument '{name}' is not a {expected}")]
    ArgumentKindMismatch {
        name: String,
        expected: &'static str,
    },

    #[error("no component registered under the name '{name}'")]
    UnknownComponent { name: String },

    #[error("component '{name}' is registered as a {actual}, not a {expected}")]
    ComponentKindMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Error raised by the model-description audit file operations
///
/// Kept separate from [ModelError] so a caller resuming a non-linear search
/// can match on [ModelInfoError::Mismatch] and abort instead of silently
/// continuing against a changed model.
#[derive(Debug, thiserror::Error)]
pub enum ModelInfoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("model description at {path} differs from the live model")]
    Mismatch { path: PathBuf },
}
