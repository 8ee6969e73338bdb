use crate::error::ModelError;

use enum_dispatch::enum_dispatch;
use ordered_float::NotNan;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erf_inv;
use std::fmt;

/// Maps a unit hypercube draw to a physical parameter value
#[enum_dispatch]
pub trait PriorTrait: Clone + fmt::Debug {
    /// Physical value for a unit draw in [0, 1]
    fn value_for(&self, unit: f64) -> f64;
}

/// All prior distributions are available as variants of this enum
#[enum_dispatch(PriorTrait)]
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Prior {
    Uniform(UniformPrior),
    Gaussian(GaussianPrior),
}

impl Prior {
    pub fn uniform(lower_limit: f64, upper_limit: f64) -> Result<Self, ModelError> {
        Ok(UniformPrior::new(lower_limit, upper_limit)?.into())
    }

    pub fn gaussian(mean: f64, sigma: f64) -> Self {
        GaussianPrior::new(mean, sigma).into()
    }
}

impl fmt::Display for Prior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prior::Uniform(prior) => fmt::Display::fmt(prior, f),
            Prior::Gaussian(prior) => fmt::Display::fmt(prior, f),
        }
    }
}

/// A prior with a uniform distribution between a lower and an upper limit
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "UniformPriorParameters",
    try_from = "UniformPriorParameters"
)]
pub struct UniformPrior {
    lower_limit: NotNan<f64>,
    upper_limit: NotNan<f64>,
}

impl UniformPrior {
    /// Fails with [ModelError::EqualUniformBounds] when both limits coincide
    pub fn new(lower_limit: f64, upper_limit: f64) -> Result<Self, ModelError> {
        if lower_limit == upper_limit {
            return Err(ModelError::EqualUniformBounds { value: lower_limit });
        }
        Ok(Self {
            lower_limit: NotNan::new(lower_limit).expect("lower_limit must be not NaN"),
            upper_limit: NotNan::new(upper_limit).expect("upper_limit must be not NaN"),
        })
    }

    pub fn lower_limit(&self) -> f64 {
        self.lower_limit.into_inner()
    }

    pub fn upper_limit(&self) -> f64 {
        self.upper_limit.into_inner()
    }
}

impl PriorTrait for UniformPrior {
    fn value_for(&self, unit: f64) -> f64 {
        self.lower_limit() + unit * (self.upper_limit() - self.lower_limit())
    }
}

impl fmt::Display for UniformPrior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UniformPrior, lower_limit = {}, upper_limit = {}",
            self.lower_limit(),
            self.upper_limit()
        )
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "UniformPrior")]
struct UniformPriorParameters {
    lower_limit: f64,
    upper_limit: f64,
}

impl From<UniformPrior> for UniformPriorParameters {
    fn from(prior: UniformPrior) -> Self {
        Self {
            lower_limit: prior.lower_limit(),
            upper_limit: prior.upper_limit(),
        }
    }
}

impl TryFrom<UniformPriorParameters> for UniformPrior {
    type Error = ModelError;

    fn try_from(parameters: UniformPriorParameters) -> Result<Self, Self::Error> {
        Self::new(parameters.lower_limit, parameters.upper_limit)
    }
}

/// A prior with a Gaussian distribution
///
/// The unit draw goes through the standard inverse-CDF (probit) transform, so
/// `value_for(0.5)` is exactly the mean.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(
    into = "GaussianPriorParameters",
    from = "GaussianPriorParameters"
)]
pub struct GaussianPrior {
    mean: NotNan<f64>,
    sigma: NotNan<f64>,
}

impl GaussianPrior {
    pub fn new(mean: f64, sigma: f64) -> Self {
        Self {
            mean: NotNan::new(mean).expect("mean must be not NaN"),
            sigma: NotNan::new(sigma).expect("sigma must be not NaN"),
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean.into_inner()
    }

    pub fn sigma(&self) -> f64 {
        self.sigma.into_inner()
    }
}

impl PriorTrait for GaussianPrior {
    fn value_for(&self, unit: f64) -> f64 {
        self.mean() + self.sigma() * f64::sqrt(2.0) * erf_inv(2.0 * unit - 1.0)
    }
}

impl fmt::Display for GaussianPrior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GaussianPrior, mean = {}, sigma = {}",
            self.mean(),
            self.sigma()
        )
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "GaussianPrior")]
struct GaussianPriorParameters {
    mean: f64,
    sigma: f64,
}

impl From<GaussianPrior> for GaussianPriorParameters {
    fn from(prior: GaussianPrior) -> Self {
        Self {
            mean: prior.mean(),
            sigma: prior.sigma(),
        }
    }
}

impl From<GaussianPriorParameters> for GaussianPrior {
    fn from(parameters: GaussianPriorParameters) -> Self {
        Self::new(parameters.mean, parameters.sigma)
    }
}

/// A fixed parameter value excluded from the sampled parameter vector
///
/// Constants compare, hash and order by their wrapped value; the id issued by
/// the arena is kept for bookkeeping only.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema)]
pub struct Constant {
    id: u64,
    value: ConstantValue,
}

impl Constant {
    pub(crate) fn new(id: u64, value: ConstantValue) -> Self {
        Self { id, value }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn value(&self) -> &ConstantValue {
        &self.value
    }
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Constant {}

impl PartialOrd for Constant {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Constant {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl std::hash::Hash for Constant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constant, value = {}", self.value)
    }
}

/// Value wrapped by a [Constant]: a single float or a tuple of floats
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(untagged)]
pub enum ConstantValue {
    Float(NotNan<f64>),
    Tuple(Vec<NotNan<f64>>),
}

impl From<f64> for ConstantValue {
    fn from(value: f64) -> Self {
        Self::Float(NotNan::new(value).expect("constant value must be not NaN"))
    }
}

impl From<(f64, f64)> for ConstantValue {
    fn from(value: (f64, f64)) -> Self {
        Self::Tuple(vec![
            NotNan::new(value.0).expect("constant value must be not NaN"),
            NotNan::new(value.1).expect("constant value must be not NaN"),
        ])
    }
}

impl From<Vec<f64>> for ConstantValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Tuple(
            values
                .into_iter()
                .map(|x| NotNan::new(x).expect("constant value must be not NaN"))
                .collect(),
        )
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(value) => write!(f, "{value}"),
            Self::Tuple(values) => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use serde_test::{Token, assert_tokens};

    #[test]
    fn uniform_value_for_is_linear_between_limits() {
        let prior = UniformPrior::new(0.0, 1.0).unwrap();
        assert_eq!(prior.value_for(0.0), 0.0);
        assert_eq!(prior.value_for(1.0), 1.0);

        let prior = UniformPrior::new(-2.0, 6.0).unwrap();
        assert_eq!(prior.value_for(0.5), 2.0);
        assert_eq!(prior.value_for(0.25), 0.0);
    }

    #[test]
    fn uniform_equal_limits_is_an_error() {
        assert_eq!(
            UniformPrior::new(3.0, 3.0).unwrap_err(),
            ModelError::EqualUniformBounds { value: 3.0 },
        );
    }

    #[test]
    fn gaussian_median_is_the_mean() {
        let prior = GaussianPrior::new(1.5, 2.0);
        assert_eq!(prior.value_for(0.5), 1.5);
    }

    #[test]
    fn gaussian_value_for_matches_probit_quantiles() {
        let prior = GaussianPrior::new(0.0, 1.0);
        // standard normal CDF at +/-1 sigma
        assert_relative_eq!(prior.value_for(0.841344746068543), 1.0, epsilon = 1e-7);
        assert_relative_eq!(prior.value_for(0.158655253931457), -1.0, epsilon = 1e-7);

        let prior = GaussianPrior::new(10.0, 3.0);
        assert_relative_eq!(prior.value_for(0.841344746068543), 13.0, epsilon = 1e-6);
    }

    #[test]
    fn prior_enum_dispatches_value_for() {
        let uniform = Prior::uniform(0.0, 2.0).unwrap();
        let gaussian = Prior::gaussian(5.0, 1.0);
        assert_eq!(uniform.value_for(0.5), 1.0);
        assert_eq!(gaussian.value_for(0.5), 5.0);
    }

    #[test]
    fn display_matches_audit_format() {
        assert_eq!(
            UniformPrior::new(0.0, 2.0).unwrap().to_string(),
            "UniformPrior, lower_limit = 0, upper_limit = 2",
        );
        assert_eq!(
            GaussianPrior::new(1.5, 0.25).to_string(),
            "GaussianPrior, mean = 1.5, sigma = 0.25",
        );
    }

    #[test]
    fn constant_compares_by_value() {
        let a = Constant::new(0, 5.0.into());
        let b = Constant::new(1, 5.0.into());
        let c = Constant::new(2, 7.0.into());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
        assert_eq!(a.to_string(), "Constant, value = 5");
    }

    #[test]
    fn tuple_constant_display() {
        let c = Constant::new(0, (1.0, 2.5).into());
        assert_eq!(c.to_string(), "Constant, value = (1, 2.5)");
    }

    #[test]
    fn uniform_serialization() {
        let prior = UniformPrior::new(-1.0, 4.0).unwrap();
        assert_tokens(
            &prior,
            &[
                Token::Struct {
                    len: 2,
                    name: "UniformPrior",
                },
                Token::String("lower_limit"),
                Token::F64(-1.0),
                Token::String("upper_limit"),
                Token::F64(4.0),
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn gaussian_serialization() {
        let prior = GaussianPrior::new(2.0, 0.5);
        assert_tokens(
            &prior,
            &[
                Token::Struct {
                    len: 2,
                    name: "GaussianPrior",
                },
                Token::String("mean"),
                Token::F64(2.0),
                Token::String("sigma"),
                Token::F64(0.5),
                Token::StructEnd,
            ],
        );
    }

    #[test]
    fn uniform_deserialization_rejects_equal_limits() {
        let result: Result<UniformPrior, _> =
            serde_json::from_str(r#"{"lower_limit": 1.0, "upper_limit": 1.0}"#);
        assert!(result.is_err());
    }
}
