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

use itertools::Itertools;
use rayon::prelude::*;
use crate::corpus::{matrix_to_lists, DocumentWordMatrix};
use crate::enums::LdaError;
use crate::math::{l1_distance, normalize_in_place};
use crate::model::{DocumentTo, Probability, TopicTo, WordId, WordTo};

/// Infers the topic mixture of unseen documents against frozen topics with
/// iterated pseudo-counts (Wallach et al. 2009, Buntine 2009).
///
/// Only reads the topics, any number of documents can be inferred in parallel.
#[derive(Debug, Clone, Copy)]
pub struct TopicModelInferencer<'a> {
    topics: &'a [WordTo<Probability>],
    alpha: f64,
    max_iter: usize,
    tol: f64,
}

impl<'a> TopicModelInferencer<'a> {
    pub const DEFAULT_MAX_ITER: usize = 20;
    pub const DEFAULT_TOL: f64 = 1e-16;

    pub fn new(topics: &'a [WordTo<Probability>], alpha: f64, max_iter: usize, tol: f64) -> Self {
        Self { topics, alpha, max_iter, tol }
    }

    pub fn with_defaults(topics: &'a [WordTo<Probability>], alpha: f64) -> Self {
        Self::new(topics, alpha, Self::DEFAULT_MAX_ITER, Self::DEFAULT_TOL)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.topics.first().map_or(0, |topic| topic.len())
    }

    /// The topic mixture of one document given as its word ids.
    ///
    /// A document without any token gets the uniform mixture.
    pub fn infer_document(&self, words: &[WordId]) -> Result<TopicTo<Probability>, LdaError> {
        let n_topics = self.topic_count();
        let vocabulary_size = self.vocabulary_size();
        if let Some(&word_id) = words.iter().find(|&&word_id| word_id >= vocabulary_size) {
            return Err(LdaError::WordOutOfRange { word_id, vocabulary_size })
        }
        if n_topics == 0 {
            return Ok(Vec::new())
        }
        if words.is_empty() {
            return Ok(vec![1.0 / n_topics as f64; n_topics])
        }

        // Row = Token, Col = Topic
        let mut pzs = words
            .iter()
            .flat_map(|&word_id| self.topics.iter().map(move |topic| topic[word_id] * self.alpha))
            .collect_vec();
        pzs.chunks_exact_mut(n_topics).for_each(normalize_in_place);
        let mut pzs_new = vec![0.0; pzs.len()];
        let mut pzs_sum = vec![0.0; n_topics];

        for iteration in 0..self.max_iter {
            pzs_sum.iter_mut().for_each(|value| *value = 0.0);
            for row in pzs.chunks_exact(n_topics) {
                pzs_sum.iter_mut().zip_eq(row).for_each(|(sum, value)| *sum += value);
            }
            for ((&word_id, row), new_row) in words.iter().zip_eq(pzs.chunks_exact(n_topics)).zip_eq(pzs_new.chunks_exact_mut(n_topics)) {
                for (topic_id, new_value) in new_row.iter_mut().enumerate() {
                    // the pseudo counts of every other token of the document
                    let others = pzs_sum[topic_id] - row[topic_id];
                    *new_value = self.topics[topic_id][word_id] * (others + self.alpha);
                }
                normalize_in_place(new_row);
            }
            let delta = l1_distance(&pzs_new, &pzs);
            log::debug!("transform iter {iteration}, delta {delta}");
            std::mem::swap(&mut pzs, &mut pzs_new);
            if delta < self.tol {
                break
            }
        }

        let mut theta = vec![0.0; n_topics];
        for row in pzs.chunks_exact(n_topics) {
            theta.iter_mut().zip_eq(row).for_each(|(sum, value)| *sum += value);
        }
        normalize_in_place(&mut theta);
        Ok(theta)
    }

    /// The topic mixtures of every document in `matrix`, computed in parallel.
    pub fn infer_matrix(&self, matrix: &impl DocumentWordMatrix) -> Result<DocumentTo<TopicTo<Probability>>, LdaError> {
        if matrix.vocabulary_size() != self.vocabulary_size() {
            return Err(LdaError::VocabularyMismatch { expected: self.vocabulary_size(), actual: matrix.vocabulary_size() })
        }
        let documents = matrix_to_lists(matrix).split_by_document(matrix.n_documents());
        documents.par_iter().map(|words| self.infer_document(words)).collect()
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;
    use crate::corpus::DenseMatrix;
    use crate::enums::LdaError;
    use super::TopicModelInferencer;

    fn separated_topics() -> Vec<Vec<f64>> {
        vec![
            vec![0.49, 0.49, 0.01, 0.01],
            vec![0.01, 0.01, 0.49, 0.49],
        ]
    }

    #[test]
    fn picks_the_topic_that_explains_the_words() {
        let topics = separated_topics();
        let inferencer = TopicModelInferencer::with_defaults(&topics, 0.1);
        let theta = inferencer.infer_document(&[0, 1, 1, 0, 0]).unwrap();
        assert_abs_diff_eq!(theta.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(theta[0] > 0.9);

        let theta = inferencer.infer_document(&[2, 3, 0, 3]).unwrap();
        assert!(theta[1] > theta[0]);
    }

    #[test]
    fn a_single_token_follows_its_word() {
        let topics = separated_topics();
        let inferencer = TopicModelInferencer::with_defaults(&topics, 0.1);
        // without other tokens every round is the normalized column of phi
        let theta = inferencer.infer_document(&[2]).unwrap();
        assert_abs_diff_eq!(theta[0], 0.01 / 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(theta[1], 0.49 / 0.5, epsilon = 1e-12);
    }

    #[test]
    fn empty_documents_are_uniform() {
        let topics = separated_topics();
        let theta = TopicModelInferencer::with_defaults(&topics, 0.1).infer_document(&[]).unwrap();
        assert_eq!(theta, vec![0.5, 0.5]);
    }

    #[test]
    fn unknown_words_are_rejected() {
        let topics = separated_topics();
        let inferencer = TopicModelInferencer::with_defaults(&topics, 0.1);
        assert!(matches!(
            inferencer.infer_document(&[1, 4]),
            Err(LdaError::WordOutOfRange { word_id: 4, vocabulary_size: 4 })
        ));
        let matrix = DenseMatrix::from_rows([[1u64, 2, 3]]).unwrap();
        assert!(matches!(
            inferencer.infer_matrix(&matrix),
            Err(LdaError::VocabularyMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn matrix_inference_matches_single_documents() {
        let topics = separated_topics();
        let inferencer = TopicModelInferencer::with_defaults(&topics, 0.1);
        let matrix = DenseMatrix::from_rows([[2u64, 1, 0, 0], [0, 0, 0, 0], [0, 1, 0, 3]]).unwrap();
        let thetas = inferencer.infer_matrix(&matrix).unwrap();
        assert_eq!(thetas.len(), 3);
        assert_eq!(thetas[0], inferencer.infer_document(&[0, 0, 1]).unwrap());
        assert_eq!(thetas[1], vec![0.5, 0.5]);
        assert_eq!(thetas[2], inferencer.infer_document(&[1, 3, 3, 3]).unwrap());
    }
}
