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

use std::path::PathBuf;
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;
use crate::model::{DocumentId, TopicId, WordId};

/// The format used to store a [crate::model::TopicModel].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display, AsRefStr, EnumString)]
pub enum ModelFormat {
    Json,
    Binary
}

/// The errors while building or using an [crate::model::Lda].
#[derive(Debug, Error)]
pub enum LdaError {
    #[error("{name} must be greater than zero and finite, but was {value}!")]
    InvalidHyperparameter {
        name: &'static str,
        value: f64
    },
    #[error("{name} must be greater than zero!")]
    InvalidSetting {
        name: &'static str
    },
    #[error(transparent)]
    Config(#[from] crate::model::LdaConfigBuilderError),
    #[error("The model has not been initialized with a corpus yet!")]
    NotFitted,
    #[error("The token store was already released by clean_up!")]
    TokensReleased,
    #[error("The corpus does not contain a single token!")]
    EmptyCorpus,
    #[error("The model knows {expected} words, but the data has {actual} columns!")]
    VocabularyMismatch {
        expected: usize,
        actual: usize
    },
    #[error("The word id {word_id} is out of range for a vocabulary of {vocabulary_size} words!")]
    WordOutOfRange {
        word_id: WordId,
        vocabulary_size: usize
    },
    #[error("The topic id {0} is unknown!")]
    TopicOutOfRange(TopicId),
    #[error("The counts of topic {topic_id} disagree: {by_words} by words, {by_documents} by documents!")]
    InconsistentCounts {
        topic_id: TopicId,
        by_words: u64,
        by_documents: u64
    },
    #[error("The model expects {expected} entries for {what}, but got {actual}!")]
    MalformedModel {
        what: &'static str,
        expected: usize,
        actual: usize
    },
    #[error(transparent)]
    Corpus(#[from] CorpusError),
}

/// The errors while handling a document-word matrix.
#[derive(Debug, Error)]
pub enum CorpusError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("Expected {expected} values for a {rows}x{columns} matrix, but got {actual}!")]
    ShapeMismatch {
        rows: usize,
        columns: usize,
        expected: usize,
        actual: usize
    },
    #[error("The row {document} has {actual} columns, expected {expected}!")]
    RaggedRow {
        document: DocumentId,
        expected: usize,
        actual: usize
    },
    #[error("The word id {word_id} in document {document} exceeds the vocabulary size {vocabulary_size}!")]
    WordOutOfRange {
        document: DocumentId,
        word_id: WordId,
        vocabulary_size: usize
    },
    #[error("The document id {document} exceeds the number of documents {n_documents}!")]
    DocumentOutOfRange {
        document: DocumentId,
        n_documents: usize
    },
    #[error("The compressed row pointer is malformed: {0}")]
    MalformedIndptr(&'static str),
    #[error("The token stream has {words} words but {docs} document ids!")]
    UnequalStream {
        words: usize,
        docs: usize
    },
    #[error("Failed at line {line}: {message}")]
    Parse {
        line: usize,
        message: String
    },
}

/// The errors while writing
#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Binary(#[from] bincode::Error),
    #[error("The path {0} already exists!")]
    AlreadyExists(PathBuf),
}

/// The errors while reading
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Binary(#[from] bincode::Error),
    #[error(transparent)]
    StrumParse(#[from] strum::ParseError),
    #[error("The header {0:?} is not a valid model header!")]
    IllegalHeader(String),
    #[error("The path {0} was not found!")]
    PathNotFound(PathBuf),
    #[error(transparent)]
    Model(#[from] LdaError),
}
