//Copyright 2024 Felix Engl
//
//Licensed under the Apache License, Version 2.0 (the "License");
//you may not use this file except in compliance with the License.
//You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
//Unless required by applicable law or agreed to in writing, software
//distributed under the License is distributed on an "AS IS" BASIS,
//WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//See the License for the specific language governing permissions and
//limitations under the License.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use ldagibbs_toolkit::normal_number::IsNormalNumber;
use ldagibbs_toolkit::variates::DEFAULT_POOL_SIZE;
use crate::enums::LdaError;

/// The settings of a collapsed Gibbs sampling run.
///
/// ```
/// use ldagibbs_topicmodel::model::LdaConfigBuilder;
/// let config = LdaConfigBuilder::default()
///     .n_topics(2)
///     .n_iter(100)
///     .random_state(0)
///     .build()
///     .unwrap();
/// assert_eq!(config.alpha, 0.1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct LdaConfig {
    /// Number of topics
    pub n_topics: usize,
    /// Number of sampling sweeps
    #[builder(default = "2000")]
    pub n_iter: usize,
    /// Dirichlet parameter for the distribution over topics
    #[builder(default = "0.1")]
    pub alpha: f64,
    /// Dirichlet parameter for the distribution over words
    #[builder(default = "0.01")]
    pub eta: f64,
    /// Number of sweeps between two log likelihood checkpoints
    #[builder(default = "10")]
    pub refresh: usize,
    /// The seed for the variate pool, an os seeded generator is used if it is none.
    #[builder(default, setter(strip_option))]
    pub random_state: Option<u32>,
    /// Number of uniform variates kept in the pool.
    #[builder(default = "DEFAULT_POOL_SIZE")]
    pub pool_size: usize,
}

impl LdaConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(alpha) = self.alpha {
            if !alpha.is_positive_normal_number() {
                return Err(format!("alpha must be greater than zero, but was {alpha}"))
            }
        }
        if let Some(eta) = self.eta {
            if !eta.is_positive_normal_number() {
                return Err(format!("eta must be greater than zero, but was {eta}"))
            }
        }
        if self.n_topics == Some(0) {
            return Err("n_topics must be greater than zero".to_string())
        }
        if self.refresh == Some(0) {
            return Err("refresh must be greater than zero".to_string())
        }
        if self.pool_size == Some(0) {
            return Err("pool_size must be greater than zero".to_string())
        }
        Ok(())
    }
}

impl LdaConfig {
    /// A config with `n_topics` and the default values for everything else.
    pub fn new(n_topics: usize) -> Self {
        Self {
            n_topics,
            n_iter: 2000,
            alpha: 0.1,
            eta: 0.01,
            refresh: 10,
            random_state: None,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// The fields are public, so this check runs again before a model is built.
    pub fn validate(&self) -> Result<(), LdaError> {
        if !self.alpha.is_positive_normal_number() {
            return Err(LdaError::InvalidHyperparameter { name: "alpha", value: self.alpha })
        }
        if !self.eta.is_positive_normal_number() {
            return Err(LdaError::InvalidHyperparameter { name: "eta", value: self.eta })
        }
        if self.n_topics == 0 {
            return Err(LdaError::InvalidSetting { name: "n_topics" })
        }
        if self.refresh == 0 {
            return Err(LdaError::InvalidSetting { name: "refresh" })
        }
        if self.pool_size == 0 {
            return Err(LdaError::InvalidSetting { name: "pool_size" })
        }
        Ok(())
    }
}
