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

mod config;
mod estimate;
mod inferencer;
mod lda;
mod likelihood;
mod sampler;
mod state;

pub use config::*;
pub use estimate::*;
pub use inferencer::*;
pub use lda::*;
pub use likelihood::*;
pub use sampler::sample_sweep;
pub use state::*;

use std::fmt::{Display, Formatter};
use std::io;
use std::io::Write;
use std::ops::Range;
use approx::relative_eq;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use crate::corpus::DocumentWordMatrix;
use crate::enums::LdaError;

pub type TopicTo<T> = Vec<T>;
pub type WordTo<T> = Vec<T>;
pub type PositionTo<T> = Vec<T>;
pub type DocumentTo<T> = Vec<T>;
pub type Probability = f64;

pub type WordId = usize;
pub type TopicId = usize;
pub type DocumentId = usize;
pub type WordFrequency = u64;
pub type DocumentLength = u64;

/// The two symmetric Dirichlet concentrations.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priors {
    /// Document-topic concentration
    pub alpha: f64,
    /// Topic-word concentration
    pub eta: f64,
}

/// A fitted topic model, frozen after training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicModel {
    // topic to word
    // Row = Topic
    // Col = Word
    topics: TopicTo<WordTo<Probability>>,
    used_vocab_frequency: WordTo<WordFrequency>,
    doc_topic_distributions: DocumentTo<TopicTo<Probability>>,
    document_lengths: DocumentTo<DocumentLength>,
    config: LdaConfig,
    loglikelihoods: Vec<f64>,
}

impl TopicModel {
    pub fn new(
        topics: TopicTo<WordTo<Probability>>,
        used_vocab_frequency: WordTo<WordFrequency>,
        doc_topic_distributions: DocumentTo<TopicTo<Probability>>,
        document_lengths: DocumentTo<DocumentLength>,
        config: LdaConfig,
        loglikelihoods: Vec<f64>,
    ) -> Result<Self, LdaError> {
        let new = Self {
            topics,
            used_vocab_frequency,
            doc_topic_distributions,
            document_lengths,
            config,
            loglikelihoods
        };
        new.check_shape()?;
        Ok(new)
    }

    /// Fails if the tables disagree about the number of topics, words or documents.
    pub fn check_shape(&self) -> Result<(), LdaError> {
        let vocabulary_size = self.vocabulary_size();
        if let Some(topic) = self.topics.iter().find(|topic| topic.len() != vocabulary_size) {
            return Err(LdaError::MalformedModel { what: "the words of a topic", expected: vocabulary_size, actual: topic.len() })
        }
        if self.doc_topic_distributions.len() != self.document_lengths.len() {
            return Err(LdaError::MalformedModel {
                what: "the document-topic distributions",
                expected: self.document_lengths.len(),
                actual: self.doc_topic_distributions.len()
            })
        }
        let topic_count = self.topic_count();
        if let Some(distribution) = self.doc_topic_distributions.iter().find(|distribution| distribution.len() != topic_count) {
            return Err(LdaError::MalformedModel { what: "the topics of a document", expected: topic_count, actual: distribution.len() })
        }
        Ok(())
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.used_vocab_frequency.len()
    }

    pub fn document_count(&self) -> usize {
        self.document_lengths.len()
    }

    pub fn topic_ids(&self) -> Range<TopicId> {
        0..self.topics.len()
    }

    pub fn word_ids(&self) -> Range<WordId> {
        0..self.used_vocab_frequency.len()
    }

    pub fn topics(&self) -> &[WordTo<Probability>] {
        &self.topics
    }

    pub fn get_topic(&self, topic_id: TopicId) -> Option<&[Probability]> {
        self.topics.get(topic_id).map(|topic| topic.as_slice())
    }

    pub fn get_probability(&self, topic_id: TopicId, word_id: WordId) -> Option<Probability> {
        self.topics.get(topic_id)?.get(word_id).copied()
    }

    pub fn get_topic_probabilities_for(&self, word_id: WordId) -> Option<TopicTo<Probability>> {
        (word_id < self.vocabulary_size()).then(|| self.topics.iter().map(|topic| topic[word_id]).collect())
    }

    pub fn doc_topic_distributions(&self) -> &[TopicTo<Probability>] {
        &self.doc_topic_distributions
    }

    pub fn document_lengths(&self) -> &[DocumentLength] {
        &self.document_lengths
    }

    pub fn used_vocab_frequency(&self) -> &[WordFrequency] {
        &self.used_vocab_frequency
    }

    pub fn config(&self) -> &LdaConfig {
        &self.config
    }

    pub fn priors(&self) -> Priors {
        Priors { alpha: self.config.alpha, eta: self.config.eta }
    }

    pub fn loglikelihoods(&self) -> &[f64] {
        &self.loglikelihoods
    }

    /// The `n` most probable words of a topic. Ties are ordered by word id.
    pub fn get_n_best_for_topic(&self, topic_id: TopicId, n: usize) -> Option<PositionTo<WordId>> {
        let topic = self.topics.get(topic_id)?;
        Some(
            topic
                .iter()
                .enumerate()
                .sorted_by(|(a_id, a), (b_id, b)| b.total_cmp(a).then(a_id.cmp(b_id)))
                .take(n)
                .map(|(word_id, _)| word_id)
                .collect()
        )
    }

    pub fn get_n_best_for_topics(&self, n: usize) -> TopicTo<PositionTo<WordId>> {
        self.topic_ids().filter_map(|topic_id| self.get_n_best_for_topic(topic_id, n)).collect()
    }

    /// The topic that explains most of a document.
    pub fn dominant_topic(&self, document: DocumentId) -> Option<TopicId> {
        self.doc_topic_distributions
            .get(document)?
            .iter()
            .position_max_by(|a, b| a.total_cmp(b))
    }

    /// Topics ordered by the number of tokens expected to be generated by them.
    pub fn topics_by_prevalence(&self) -> PositionTo<(TopicId, f64)> {
        let mut prevalence = vec![0.0; self.topic_count()];
        for (distribution, &length) in self.doc_topic_distributions.iter().zip_eq(self.document_lengths.iter()) {
            for (value, probability) in prevalence.iter_mut().zip_eq(distribution) {
                *value += probability * length as f64;
            }
        }
        let total: f64 = prevalence.iter().sum();
        prevalence
            .into_iter()
            .map(|value| if total > 0.0 { value / total } else { 0.0 })
            .enumerate()
            .sorted_by(|(_, a), (_, b)| b.total_cmp(a))
            .collect()
    }

    /// An inferencer over the frozen topics.
    pub fn inferencer(&self, max_iter: usize, tol: f64) -> TopicModelInferencer<'_> {
        TopicModelInferencer::new(&self.topics, self.config.alpha, max_iter, tol)
    }

    /// Infers the topic mixtures of new documents with the default settings.
    pub fn transform(&self, x: &impl DocumentWordMatrix) -> Result<DocumentTo<TopicTo<Probability>>, LdaError> {
        self.inferencer(TopicModelInferencer::DEFAULT_MAX_ITER, TopicModelInferencer::DEFAULT_TOL).infer_matrix(x)
    }

    /// Same shapes and approximately the same probabilities.
    pub fn seems_equal_to(&self, other: &TopicModel) -> bool {
        self.topic_count() == other.topic_count()
            && self.vocabulary_size() == other.vocabulary_size()
            && self.used_vocab_frequency == other.used_vocab_frequency
            && self.document_lengths == other.document_lengths
            && self.topics.iter().flatten().zip_eq(other.topics.iter().flatten()).all(|(a, b)| relative_eq!(*a, *b))
            && self.doc_topic_distributions.len() == other.doc_topic_distributions.len()
            && self.doc_topic_distributions.iter().zip(other.doc_topic_distributions.iter()).all(|(a, b)| {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| relative_eq!(*a, *b))
            })
    }

    /// Writes the `n` best words of every topic, `labels` maps word ids to words.
    pub fn show_to<L: Display, W: Write>(&self, n: usize, labels: Option<&[L]>, out: &mut W) -> io::Result<()> {
        for (topic_id, topic_entries) in self.get_n_best_for_topics(n).iter().enumerate() {
            if topic_id != 0 {
                out.write_all(b"\n")?;
            }
            write!(out, "Topic({topic_id}):")?;
            for (position, &word_id) in topic_entries.iter().enumerate() {
                out.write_all(b"\n")?;
                let probability = self.topics[topic_id][word_id];
                match labels.and_then(|labels| labels.get(word_id)) {
                    Some(label) => write!(out, "    {}: {} ({})", label, probability, position + 1)?,
                    None => write!(out, "    {}: {} ({})", word_id, probability, position + 1)?,
                }
            }
        }
        Ok(())
    }

    pub fn show(&self, n: usize) -> io::Result<()> {
        let mut str = Vec::new();
        self.show_to::<WordId, _>(n, None, &mut str)?;
        log::info!("{}", String::from_utf8_lossy(&str));
        Ok(())
    }
}

impl Display for TopicModel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Topic Model:")?;
        for (topic_id, topic) in self.topics.iter().enumerate() {
            write!(f, "\n    Topic({topic_id})")?;
            for (word_id, probability) in topic.iter().enumerate() {
                write!(f, "\n        {}: {}", word_id, probability)?;
            }
        }
        Ok(())
    }
}
