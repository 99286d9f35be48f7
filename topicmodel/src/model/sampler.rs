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

//! One collapsed Gibbs sweep over every token.
//!
//! Tokens are visited strictly in order. The conditional of a token always sees
//! the counts already updated by the tokens before it in the same sweep.

use ldagibbs_toolkit::variates::VariateSource;
use crate::model::state::{CountState, TokenStore};
use crate::model::{DocumentId, Priors, TopicId, WordId};

/// Fills `masses` with the unnormalized conditional of a token of `word_id`
/// in `document` and returns their sum.
///
/// The token itself has to be excluded from `counts` before this is called.
#[inline]
pub(crate) fn conditional_masses(
    counts: &CountState,
    word_id: WordId,
    document: DocumentId,
    priors: Priors,
    masses: &mut [f64]
) -> f64 {
    let eta_sum = priors.eta * counts.vocabulary_size() as f64;
    let mut total = 0.0;
    for (topic_id, mass) in masses.iter_mut().enumerate() {
        *mass = (counts.topic_word(topic_id, word_id) as f64 + priors.eta)
            / (counts.topic_total(topic_id) as f64 + eta_sum)
            * (counts.doc_topic(document, topic_id) as f64 + priors.alpha);
        total += *mass;
    }
    total
}

/// Turns masses into their running sum.
#[inline]
pub(crate) fn cumulate_in_place(masses: &mut [f64]) {
    let mut running = 0.0;
    for mass in masses.iter_mut() {
        running += *mass;
        *mass = running;
    }
}

/// The smallest index whose cumulative mass reaches `r`.
///
/// Rounding can leave the last cumulative value marginally below `r`,
/// the result is clamped to the last topic in that case.
#[inline]
pub(crate) fn search_cumulative(cumulative: &[f64], r: f64) -> TopicId {
    cumulative.partition_point(|&value| value < r).min(cumulative.len() - 1)
}

/// Resamples the topic of every token once.
///
/// `counts` has to be the count of `tokens`, as built by [TokenStore::count].
/// `masses` is a scratch buffer, it is resized to the number of topics.
pub fn sample_sweep<S>(
    tokens: &mut TokenStore,
    counts: &mut CountState,
    priors: Priors,
    variates: &mut S,
    masses: &mut Vec<f64>
) where S: VariateSource + ?Sized {
    debug_assert!(
        tokens.count(counts.n_topics(), counts.n_documents(), counts.vocabulary_size()).is_ok_and(|expected| expected == *counts),
        "The count state does not belong to the token store!"
    );
    masses.resize(counts.n_topics(), 0.0);
    variates.begin_sweep();
    for i in 0..tokens.len() {
        let (word_id, document, old_topic) = tokens.token(i);
        counts.exclude(word_id, document, old_topic);
        conditional_masses(counts, word_id, document, priors, masses);
        cumulate_in_place(masses);
        let r = variates.next_variate() * masses[masses.len() - 1];
        let new_topic = search_cumulative(masses, r);
        counts.include(word_id, document, new_topic);
        tokens.set_topic(i, new_topic);
    }
}
