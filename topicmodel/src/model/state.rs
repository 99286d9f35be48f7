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

//! The token store and the count tables the sampler works on.

use itertools::Itertools;
use crate::corpus::{Count, TokenStream};
use crate::enums::LdaError;
use crate::model::{DocumentId, DocumentTo, TopicId, TopicTo, WordId, WordTo};

/// Every token of the corpus with its current topic.
/// Only the topics change after initialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenStore {
    words: Vec<WordId>,
    docs: Vec<DocumentId>,
    topics: Vec<TopicId>,
}

impl TokenStore {
    /// Assigns token `i` to topic `i mod n_topics`.
    pub fn round_robin(stream: TokenStream, n_topics: usize) -> Self {
        let topics = (0..stream.len()).map(|i| i % n_topics).collect_vec();
        Self { words: stream.words, docs: stream.docs, topics }
    }

    /// A store with explicit topic assignments.
    pub fn with_topics(stream: TokenStream, topics: Vec<TopicId>) -> Result<Self, LdaError> {
        if topics.len() != stream.len() {
            return Err(crate::enums::CorpusError::UnequalStream { words: stream.len(), docs: topics.len() }.into())
        }
        Ok(Self { words: stream.words, docs: stream.docs, topics })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[WordId] {
        &self.words
    }

    pub fn docs(&self) -> &[DocumentId] {
        &self.docs
    }

    pub fn topics(&self) -> &[TopicId] {
        &self.topics
    }

    #[inline(always)]
    pub(crate) fn token(&self, i: usize) -> (WordId, DocumentId, TopicId) {
        (self.words[i], self.docs[i], self.topics[i])
    }

    #[inline(always)]
    pub(crate) fn set_topic(&mut self, i: usize, topic_id: TopicId) {
        self.topics[i] = topic_id;
    }

    /// Count tables that reflect the current assignments.
    pub fn count(&self, n_topics: usize, n_documents: usize, vocabulary_size: usize) -> Result<CountState, LdaError> {
        let mut counts = CountState::zeros(n_topics, n_documents, vocabulary_size);
        for i in 0..self.len() {
            let (word_id, document, topic_id) = self.token(i);
            if word_id >= vocabulary_size {
                return Err(LdaError::WordOutOfRange { word_id, vocabulary_size })
            }
            if topic_id >= n_topics {
                return Err(LdaError::TopicOutOfRange(topic_id))
            }
            if document >= n_documents {
                return Err(crate::enums::CorpusError::DocumentOutOfRange { document, n_documents }.into())
            }
            counts.include(word_id, document, topic_id);
        }
        Ok(counts)
    }
}

/// The sufficient statistics of the current assignments.
///
/// Between two tokens of a sweep, and therefore at every point visible from the
/// outside, `Σ_w topic_word[z][w] == topic_total[z] == Σ_d doc_topic[d][z]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountState {
    n_topics: usize,
    n_documents: usize,
    vocabulary_size: usize,
    // Row = Topic, Col = Word
    topic_word: Vec<Count>,
    // Row = Document, Col = Topic
    doc_topic: Vec<Count>,
    topic_total: TopicTo<Count>,
}

impl CountState {
    pub fn zeros(n_topics: usize, n_documents: usize, vocabulary_size: usize) -> Self {
        Self {
            n_topics,
            n_documents,
            vocabulary_size,
            topic_word: vec![0; n_topics * vocabulary_size],
            doc_topic: vec![0; n_documents * n_topics],
            topic_total: vec![0; n_topics],
        }
    }

    /// Rebuilds the state from a topic-word and a document-topic table.
    /// Fails if both tables disagree about the size of a topic.
    pub fn from_tables(
        topic_word: &[impl AsRef<[Count]>],
        doc_topic: &[impl AsRef<[Count]>]
    ) -> Result<Self, LdaError> {
        let n_topics = topic_word.len();
        let vocabulary_size = topic_word.first().map_or(0, |row| row.as_ref().len());
        let n_documents = doc_topic.len();
        let mut state = Self::zeros(n_topics, n_documents, vocabulary_size);
        for (topic_id, row) in topic_word.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != vocabulary_size {
                return Err(crate::enums::CorpusError::RaggedRow { document: topic_id, expected: vocabulary_size, actual: row.len() }.into())
            }
            state.topic_word[topic_id * vocabulary_size..(topic_id + 1) * vocabulary_size].copy_from_slice(row);
            state.topic_total[topic_id] = row.iter().sum();
        }
        for (document, row) in doc_topic.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_topics {
                return Err(crate::enums::CorpusError::RaggedRow { document, expected: n_topics, actual: row.len() }.into())
            }
            state.doc_topic[document * n_topics..(document + 1) * n_topics].copy_from_slice(row);
        }
        for topic_id in 0..n_topics {
            let by_documents = state.doc_topic.iter().skip(topic_id).step_by(n_topics).sum::<Count>();
            if by_documents != state.topic_total[topic_id] {
                return Err(LdaError::InconsistentCounts { topic_id, by_words: state.topic_total[topic_id], by_documents })
            }
        }
        Ok(state)
    }

    pub fn n_topics(&self) -> usize {
        self.n_topics
    }

    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary_size
    }

    #[inline(always)]
    pub fn topic_word(&self, topic_id: TopicId, word_id: WordId) -> Count {
        self.topic_word[topic_id * self.vocabulary_size + word_id]
    }

    #[inline(always)]
    pub fn doc_topic(&self, document: DocumentId, topic_id: TopicId) -> Count {
        self.doc_topic[document * self.n_topics + topic_id]
    }

    #[inline(always)]
    pub fn topic_total(&self, topic_id: TopicId) -> Count {
        self.topic_total[topic_id]
    }

    pub fn topic_word_row(&self, topic_id: TopicId) -> &[Count] {
        &self.topic_word[topic_id * self.vocabulary_size..(topic_id + 1) * self.vocabulary_size]
    }

    pub fn doc_topic_row(&self, document: DocumentId) -> &[Count] {
        &self.doc_topic[document * self.n_topics..(document + 1) * self.n_topics]
    }

    pub fn topic_totals(&self) -> &[Count] {
        &self.topic_total
    }

    pub(crate) fn topic_word_flat(&self) -> &[Count] {
        &self.topic_word
    }

    pub(crate) fn doc_topic_flat(&self) -> &[Count] {
        &self.doc_topic
    }

    /// Removes one token of `word_id` in `document` from `topic_id`.
    #[inline(always)]
    pub fn exclude(&mut self, word_id: WordId, document: DocumentId, topic_id: TopicId) {
        self.topic_word[topic_id * self.vocabulary_size + word_id] -= 1;
        self.doc_topic[document * self.n_topics + topic_id] -= 1;
        self.topic_total[topic_id] -= 1;
    }

    /// Adds one token of `word_id` in `document` to `topic_id`.
    #[inline(always)]
    pub fn include(&mut self, word_id: WordId, document: DocumentId, topic_id: TopicId) {
        self.topic_word[topic_id * self.vocabulary_size + word_id] += 1;
        self.doc_topic[document * self.n_topics + topic_id] += 1;
        self.topic_total[topic_id] += 1;
    }

    /// The number of tokens in every document.
    pub fn document_lengths(&self) -> DocumentTo<Count> {
        (0..self.n_documents).map(|document| self.doc_topic_row(document).iter().sum()).collect()
    }

    /// How often every word occurs in the corpus.
    pub fn word_frequencies(&self) -> WordTo<Count> {
        let mut frequencies = vec![0; self.vocabulary_size];
        for topic_id in 0..self.n_topics {
            for (frequency, count) in frequencies.iter_mut().zip_eq(self.topic_word_row(topic_id)) {
                *frequency += count;
            }
        }
        frequencies
    }

    pub fn n_tokens(&self) -> Count {
        self.topic_total.iter().sum()
    }

    /// Checks the marginals of all three tables against each other and against `n_tokens`.
    pub fn satisfies_invariants(&self, n_tokens: Count) -> bool {
        (0..self.n_topics).all(|topic_id| {
            let by_words: Count = self.topic_word_row(topic_id).iter().sum();
            let by_documents: Count = (0..self.n_documents).map(|document| self.doc_topic(document, topic_id)).sum();
            by_words == self.topic_total[topic_id] && by_documents == self.topic_total[topic_id]
        }) && self.n_tokens() == n_tokens
    }

    /// The topic-word counts as rows.
    pub fn topic_word_table(&self) -> TopicTo<WordTo<Count>> {
        (0..self.n_topics).map(|topic_id| self.topic_word_row(topic_id).to_vec()).collect()
    }

    /// The document-topic counts as rows.
    pub fn doc_topic_table(&self) -> DocumentTo<TopicTo<Count>> {
        (0..self.n_documents).map(|document| self.doc_topic_row(document).to_vec()).collect()
    }
}

/// Expands the stream into a round robin assigned [TokenStore] and its [CountState].
pub fn initialize_state(stream: TokenStream, n_topics: usize, n_documents: usize, vocabulary_size: usize) -> Result<(TokenStore, CountState), LdaError> {
    let tokens = TokenStore::round_robin(stream, n_topics);
    let counts = tokens.count(n_topics, n_documents, vocabulary_size)?;
    Ok((tokens, counts))
}

#[cfg(test)]
mod test {
    use crate::corpus::matrix_to_lists;
    use crate::corpus::test::reference_matrix;
    use crate::enums::LdaError;
    use super::{initialize_state, CountState};

    #[test]
    fn round_robin_spreads_the_tokens() {
        let stream = matrix_to_lists(&reference_matrix());
        let (tokens, counts) = initialize_state(stream, 3, 6, 2).unwrap();
        assert_eq!(&tokens.topics()[..7], &[0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(counts.topic_totals(), &[12, 11, 11]);
        assert!(counts.satisfies_invariants(34));
        assert_eq!(counts.document_lengths(), vec![2, 3, 4, 5, 13, 7]);
        assert_eq!(counts.word_frequencies(), vec![21, 13]);
    }

    #[test]
    fn exclude_and_include_are_inverse() {
        let stream = matrix_to_lists(&reference_matrix());
        let (_, mut counts) = initialize_state(stream, 2, 6, 2).unwrap();
        let before = counts.clone();
        counts.exclude(1, 4, 1);
        assert!(!counts.satisfies_invariants(34));
        assert!(counts.satisfies_invariants(33));
        counts.include(1, 4, 1);
        assert_eq!(before, counts);
    }

    #[test]
    fn tables_have_to_agree() {
        let state = CountState::from_tables(&[[2u64, 1], [0, 3]], &[[1u64, 2], [2, 1]]).unwrap();
        assert_eq!(state.topic_totals(), &[3, 3]);
        assert_eq!(state.topic_word_table(), vec![vec![2, 1], vec![0, 3]]);
        assert!(matches!(
            CountState::from_tables(&[[2u64, 1], [0, 3]], &[[1u64, 2], [1, 1]]),
            Err(LdaError::InconsistentCounts { topic_id: 0, by_words: 3, by_documents: 2 })
        ));
    }
}
