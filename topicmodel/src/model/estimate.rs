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

//! Posterior mean point estimates from the count tables.
//! These are recomputed on every call, the counts change with every sweep.

use crate::math::normalize_rows_with_prior;
use crate::model::state::CountState;
use crate::model::{DocumentTo, Probability, TopicTo, WordTo};

/// `phi[z][w] = (topic_word[z][w] + eta) / Σ_w' (topic_word[z][w'] + eta)`
pub fn topic_word_distribution(counts: &CountState, eta: f64) -> TopicTo<WordTo<Probability>> {
    normalize_rows_with_prior(counts.topic_word_flat(), counts.vocabulary_size(), eta)
}

/// `theta[d][z] = (doc_topic[d][z] + alpha) / Σ_z' (doc_topic[d][z'] + alpha)`
pub fn doc_topic_distribution(counts: &CountState, alpha: f64) -> DocumentTo<TopicTo<Probability>> {
    normalize_rows_with_prior(counts.doc_topic_flat(), counts.n_topics(), alpha)
}
