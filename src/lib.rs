#![doc = include_str!("../README.md")]


mod arena;
pub use arena::{PriorArena, PriorId};

mod arguments;
pub use arguments::{ArgValue, ConstructorArgs};

mod config;
pub use config::{PriorConfig, PriorSpec, WidthConfig};

mod error;
pub use error::{ModelError, ModelInfoError};

mod instance;
pub use instance::{InstanceValue, ModelInstance};

mod list_model;
pub use list_model::ListPriorModel;

mod mapper;
pub use mapper::{ModelComponent, ModelMapper};

mod prior;
pub use prior::{Constant, ConstantValue, GaussianPrior, Prior, PriorTrait, UniformPrior};

mod prior_model;
pub use prior_model::{Attribute, ModelDescriptor, PriorModel};

mod schema;
pub use schema::{ModelSchema, ModelSchemaBuilder, ParamKind, ParamSchema};

mod tuple_prior;
pub use tuple_prior::TuplePrior;

pub mod prelude;
