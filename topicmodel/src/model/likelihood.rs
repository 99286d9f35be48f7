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

use crate::math::{ln_dirichlet_multinomial, ln_gamma};
use crate::model::state::CountState;
use crate::model::Priors;

/// The complete log likelihood `log p(w, z) = log p(w|z) + log p(z)` of the
/// current assignments.
///
/// Works in log-gamma space only, large counts cannot overflow.
pub fn log_likelihood(counts: &CountState, priors: Priors) -> f64 {
    let ln_gamma_eta = ln_gamma(priors.eta);
    let ln_gamma_alpha = ln_gamma(priors.alpha);

    let words_given_topics: f64 = (0..counts.n_topics())
        .map(|topic_id| ln_dirichlet_multinomial(
            counts.topic_word_row(topic_id),
            counts.topic_total(topic_id),
            priors.eta,
            ln_gamma_eta
        ))
        .sum();

    let topics: f64 = (0..counts.n_documents())
        .map(|document| {
            let row = counts.doc_topic_row(document);
            ln_dirichlet_multinomial(row, row.iter().sum(), priors.alpha, ln_gamma_alpha)
        })
        .sum();

    words_given_topics + topics
}

#[cfg(test)]
pub(crate) mod test {
    use approx::assert_relative_eq;
    use crate::corpus::matrix_to_lists;
    use crate::corpus::test::reference_matrix;
    use crate::math::ln_gamma;
    use crate::model::state::{initialize_state, CountState};
    use crate::model::Priors;
    use super::log_likelihood;

    const PRIORS: Priors = Priors { alpha: 0.1, eta: 0.01 };

    /// A well separated assignment of the reference corpus.
    pub fn reference_state() -> CountState {
        CountState::from_tables(
            &[[12u64, 2], [9, 11]],
            &[[1u64, 1], [0, 3], [1, 3], [5, 0], [0, 13], [7, 0]]
        ).unwrap()
    }

    #[test]
    fn reference_state_has_the_known_likelihood() {
        assert_relative_eq!(log_likelihood(&reference_state(), PRIORS), -40.39521897020842, epsilon = 1e-9);
    }

    #[test]
    fn the_prior_alone_splits_a_lone_token() {
        let state = CountState::from_tables(&[[1u64], [0]], &[[1u64, 0]]).unwrap();
        assert_relative_eq!(log_likelihood(&state, PRIORS), 0.5f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn matches_the_textbook_formula() {
        let stream = matrix_to_lists(&reference_matrix());
        let (_, counts) = initialize_state(stream, 2, 6, 2).unwrap();
        let (alpha, eta) = (PRIORS.alpha, PRIORS.eta);
        let (k, v) = (2.0, 2.0);
        let mut expected = 0.0;
        for topic in counts.topic_word_table() {
            expected += ln_gamma(v * eta) - v * ln_gamma(eta) - ln_gamma(topic.iter().sum::<u64>() as f64 + v * eta);
            expected += topic.iter().map(|&c| ln_gamma(c as f64 + eta)).sum::<f64>();
        }
        for doc in counts.doc_topic_table() {
            expected += ln_gamma(k * alpha) - k * ln_gamma(alpha) - ln_gamma(doc.iter().sum::<u64>() as f64 + k * alpha);
            expected += doc.iter().map(|&c| ln_gamma(c as f64 + alpha)).sum::<f64>();
        }
        assert_relative_eq!(log_likelihood(&counts, PRIORS), expected, epsilon = 1e-8);
    }

    #[test]
    fn large_counts_stay_finite() {
        let state = CountState::from_tables(&[[5_000_000u64, 1]], &[[5_000_001u64]]).unwrap();
        assert!(log_likelihood(&state, PRIORS).is_finite());
    }
}
