//! Convenience re-exports for the common model-mapping workflow

pub use crate::arena::{PriorArena, PriorId};
pub use crate::arguments::ConstructorArgs;
pub use crate::config::{PriorConfig, PriorSpec, WidthConfig};
pub use crate::error::{ModelError, ModelInfoError};
pub use crate::instance::{InstanceValue, ModelInstance};
pub use crate::mapper::ModelMapper;
pub use crate::prior::{GaussianPrior, Prior, PriorTrait, UniformPrior};
pub use crate::prior_model::{ModelDescriptor, PriorModel};
pub use crate::schema::ModelSchema;
