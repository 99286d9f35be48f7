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

//! Document-word count matrices and their expansion into token streams.
//!
//! The sampler only ever sees a [TokenStream]. Whether the counts came from a
//! [DenseMatrix] or a [SparseMatrix] is decided here.

mod ldac;

pub use ldac::*;

use itertools::Itertools;
use crate::enums::CorpusError;
use crate::model::{DocumentId, DocumentTo, WordId, WordTo};

pub type Count = u64;

/// A matrix with documents as rows and vocabulary words as columns.
pub trait DocumentWordMatrix {
    fn n_documents(&self) -> usize;

    fn vocabulary_size(&self) -> usize;

    /// Visits every non-zero entry row-major, in a stable order.
    fn for_each_entry<F>(&self, f: F) where F: FnMut(DocumentId, WordId, Count);

    /// The number of tokens in the matrix.
    fn total_count(&self) -> Count {
        let mut total = 0;
        self.for_each_entry(|_, _, count| total += count);
        total
    }

    fn document_lengths(&self) -> DocumentTo<Count> {
        let mut lengths = vec![0; self.n_documents()];
        self.for_each_entry(|document, _, count| lengths[document] += count);
        lengths
    }

    fn word_frequencies(&self) -> WordTo<Count> {
        let mut frequencies = vec![0; self.vocabulary_size()];
        self.for_each_entry(|_, word_id, count| frequencies[word_id] += count);
        frequencies
    }
}

impl<M> DocumentWordMatrix for &M where M: DocumentWordMatrix + ?Sized {
    fn n_documents(&self) -> usize {
        (**self).n_documents()
    }

    fn vocabulary_size(&self) -> usize {
        (**self).vocabulary_size()
    }

    fn for_each_entry<F>(&self, f: F) where F: FnMut(DocumentId, WordId, Count) {
        (**self).for_each_entry(f)
    }
}

/// A dense row-major count matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DenseMatrix {
    rows: usize,
    columns: usize,
    data: Vec<Count>,
}

impl DenseMatrix {
    pub fn new(rows: usize, columns: usize, data: Vec<Count>) -> Result<Self, CorpusError> {
        match rows.checked_mul(columns) {
            Some(expected) if expected == data.len() => {}
            expected => return Err(CorpusError::ShapeMismatch {
                rows,
                columns,
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len()
            })
        }
        Ok(Self { rows, columns, data })
    }

    pub fn zeros(rows: usize, columns: usize) -> Result<Self, CorpusError> {
        let len = rows.checked_mul(columns).ok_or(CorpusError::ShapeMismatch {
            rows,
            columns,
            expected: usize::MAX,
            actual: 0
        })?;
        Self::new(rows, columns, vec![0; len])
    }

    /// Builds the matrix from equally long rows.
    pub fn from_rows<R, I>(rows: I) -> Result<Self, CorpusError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[Count]>
    {
        let mut columns = None;
        let mut data = Vec::new();
        let mut n_rows = 0;
        for (document, row) in rows.into_iter().enumerate() {
            let row = row.as_ref();
            match columns {
                None => columns = Some(row.len()),
                Some(expected) if expected != row.len() => {
                    return Err(CorpusError::RaggedRow { document, expected, actual: row.len() })
                }
                _ => {}
            }
            data.extend_from_slice(row);
            n_rows += 1;
        }
        Self::new(n_rows, columns.unwrap_or(0), data)
    }

    #[inline]
    pub fn get(&self, document: DocumentId, word_id: WordId) -> Option<Count> {
        (document < self.rows && word_id < self.columns).then(|| self.data[document * self.columns + word_id])
    }

    pub fn row(&self, document: DocumentId) -> Option<&[Count]> {
        (document < self.rows).then(|| &self.data[document * self.columns..(document + 1) * self.columns])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Count]> + '_ {
        (0..self.rows).map(move |document| &self.data[document * self.columns..(document + 1) * self.columns])
    }

    pub fn to_sparse(&self) -> SparseMatrix {
        let mut sparse = SparseMatrix::empty(self.columns);
        for row in self.rows() {
            sparse.push_row_unchecked(row.iter().copied().enumerate().filter(|(_, count)| *count > 0));
        }
        sparse
    }
}

impl DocumentWordMatrix for DenseMatrix {
    fn n_documents(&self) -> usize {
        self.rows
    }

    fn vocabulary_size(&self) -> usize {
        self.columns
    }

    fn for_each_entry<F>(&self, mut f: F) where F: FnMut(DocumentId, WordId, Count) {
        for (document, row) in self.rows().enumerate() {
            for (word_id, &count) in row.iter().enumerate() {
                if count > 0 {
                    f(document, word_id, count)
                }
            }
        }
    }
}

/// A compressed sparse row count matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseMatrix {
    columns: usize,
    indptr: Vec<usize>,
    indices: Vec<WordId>,
    values: Vec<Count>,
}

impl SparseMatrix {
    /// A matrix without any document.
    pub fn empty(columns: usize) -> Self {
        Self { columns, indptr: vec![0], indices: Vec::new(), values: Vec::new() }
    }

    /// Builds a matrix from its compressed row representation. The column indices
    /// of a row have to be strictly increasing.
    pub fn new(columns: usize, indptr: Vec<usize>, indices: Vec<WordId>, values: Vec<Count>) -> Result<Self, CorpusError> {
        if indptr.first() != Some(&0) {
            return Err(CorpusError::MalformedIndptr("it has to start with 0"))
        }
        if indices.len() != values.len() || indptr.last().copied() != Some(indices.len()) {
            return Err(CorpusError::MalformedIndptr("it does not cover the stored entries"))
        }
        for (document, (&start, &end)) in indptr.iter().tuple_windows().enumerate() {
            if start > end {
                return Err(CorpusError::MalformedIndptr("it has to be non decreasing"))
            }
            let row = &indices[start..end];
            if let Some(&word_id) = row.iter().find(|&&word_id| word_id >= columns) {
                return Err(CorpusError::WordOutOfRange { document, word_id, vocabulary_size: columns })
            }
            if !row.iter().tuple_windows().all(|(a, b)| a < b) {
                return Err(CorpusError::MalformedIndptr("the column indices of a row have to be increasing"))
            }
        }
        Ok(Self { columns, indptr, indices, values })
    }

    /// Appends a document. Entries are sorted by word id, duplicates are summed
    /// up and zero counts are dropped.
    pub fn push_row(&mut self, entries: impl IntoIterator<Item = (WordId, Count)>) -> Result<(), CorpusError> {
        let document = self.n_documents();
        let entries = entries.into_iter().collect_vec();
        if let Some(&(word_id, _)) = entries.iter().find(|(word_id, _)| *word_id >= self.columns) {
            return Err(CorpusError::WordOutOfRange { document, word_id, vocabulary_size: self.columns })
        }
        let merged = entries
            .into_iter()
            .sorted_by_key(|(word_id, _)| *word_id)
            .coalesce(|a, b| if a.0 == b.0 { Ok((a.0, a.1 + b.1)) } else { Err((a, b)) })
            .filter(|(_, count)| *count > 0);
        self.push_row_unchecked(merged);
        Ok(())
    }

    fn push_row_unchecked(&mut self, entries: impl IntoIterator<Item = (WordId, Count)>) {
        for (word_id, count) in entries {
            self.indices.push(word_id);
            self.values.push(count);
        }
        self.indptr.push(self.indices.len());
    }

    /// The stored `(word id, count)` pairs of a document.
    pub fn row(&self, document: DocumentId) -> Option<impl Iterator<Item = (WordId, Count)> + '_> {
        let start = *self.indptr.get(document)?;
        let end = *self.indptr.get(document + 1)?;
        Some(self.indices[start..end].iter().copied().zip(self.values[start..end].iter().copied()))
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    pub fn to_dense(&self) -> Result<DenseMatrix, CorpusError> {
        let mut dense = DenseMatrix::zeros(self.n_documents(), self.columns)?;
        self.for_each_entry(|document, word_id, count| {
            dense.data[document * self.columns + word_id] = count;
        });
        Ok(dense)
    }
}

impl DocumentWordMatrix for SparseMatrix {
    fn n_documents(&self) -> usize {
        self.indptr.len() - 1
    }

    fn vocabulary_size(&self) -> usize {
        self.columns
    }

    fn for_each_entry<F>(&self, mut f: F) where F: FnMut(DocumentId, WordId, Count) {
        for (document, (&start, &end)) in self.indptr.iter().tuple_windows().enumerate() {
            for pos in start..end {
                if self.values[pos] > 0 {
                    f(document, self.indices[pos], self.values[pos])
                }
            }
        }
    }
}

/// Every occurrence of a word in a document as one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStream {
    pub words: Vec<WordId>,
    pub docs: Vec<DocumentId>,
}

impl TokenStream {
    pub fn new(words: Vec<WordId>, docs: Vec<DocumentId>) -> Result<Self, CorpusError> {
        if words.len() != docs.len() {
            return Err(CorpusError::UnequalStream { words: words.len(), docs: docs.len() })
        }
        Ok(Self { words, docs })
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The word ids of every document, the stream has to be grouped by document.
    pub fn split_by_document(&self, n_documents: usize) -> DocumentTo<Vec<WordId>> {
        let mut documents = vec![Vec::new(); n_documents];
        for (&word_id, &document) in self.words.iter().zip_eq(self.docs.iter()) {
            documents[document].push(word_id);
        }
        documents
    }
}

/// Expands a count matrix into parallel word and document ids.
///
/// An entry `(d, w)` with count `c` becomes `c` consecutive tokens, documents
/// are visited in order and the words of a document by increasing id.
pub fn matrix_to_lists(matrix: &impl DocumentWordMatrix) -> TokenStream {
    let total = matrix.total_count() as usize;
    let mut words = Vec::with_capacity(total);
    let mut docs = Vec::with_capacity(total);
    matrix.for_each_entry(|document, word_id, count| {
        for _ in 0..count {
            words.push(word_id);
            docs.push(document);
        }
    });
    TokenStream { words, docs }
}

/// Collapses a token stream back into a dense count matrix.
pub fn lists_to_matrix(stream: &TokenStream, n_documents: usize, vocabulary_size: usize) -> Result<DenseMatrix, CorpusError> {
    let mut matrix = DenseMatrix::zeros(n_documents, vocabulary_size)?;
    for (&word_id, &document) in stream.words.iter().zip_eq(stream.docs.iter()) {
        if document >= n_documents {
            return Err(CorpusError::DocumentOutOfRange { document, n_documents })
        }
        if word_id >= vocabulary_size {
            return Err(CorpusError::WordOutOfRange { document, word_id, vocabulary_size })
        }
        matrix.data[document * vocabulary_size + word_id] += 1;
    }
    Ok(matrix)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    pub fn reference_matrix() -> DenseMatrix {
        DenseMatrix::from_rows([[1u64, 1], [2, 1], [3, 1], [4, 1], [5, 8], [6, 1]]).unwrap()
    }

    #[test]
    fn expansion_is_row_major_and_contiguous() {
        let matrix = DenseMatrix::from_rows([[2u64, 0, 1], [0, 3, 0]]).unwrap();
        let stream = matrix_to_lists(&matrix);
        assert_eq!(stream.words, vec![0, 0, 2, 1, 1, 1]);
        assert_eq!(stream.docs, vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn dense_and_sparse_expand_identically() {
        let dense = reference_matrix();
        let sparse = dense.to_sparse();
        assert_eq!(matrix_to_lists(&dense), matrix_to_lists(&sparse));
        assert_eq!(sparse.to_dense().unwrap(), dense);
        assert_eq!(dense.total_count(), 34);
        assert_eq!(sparse.word_frequencies(), vec![21, 13]);
        assert_eq!(sparse.document_lengths(), vec![2, 3, 4, 5, 13, 7]);
    }

    #[test]
    fn lists_round_back_to_the_matrix() {
        let dense = reference_matrix();
        let stream = matrix_to_lists(&dense);
        assert_eq!(lists_to_matrix(&stream, 6, 2).unwrap(), dense);
        assert!(matches!(
            lists_to_matrix(&stream, 6, 1),
            Err(CorpusError::WordOutOfRange { word_id: 1, .. })
        ));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows: Vec<Vec<Count>> = vec![vec![1, 2], vec![1]];
        assert!(matches!(DenseMatrix::from_rows(rows), Err(CorpusError::RaggedRow { document: 1, .. })));
    }

    #[test]
    fn shapes_have_to_fit_the_data() {
        assert!(matches!(
            DenseMatrix::new(2, 3, vec![1; 5]),
            Err(CorpusError::ShapeMismatch { expected: 6, actual: 5, .. })
        ));
        assert!(matches!(
            DenseMatrix::new(usize::MAX, 2, vec![]),
            Err(CorpusError::ShapeMismatch { expected: usize::MAX, actual: 0, .. })
        ));
        assert!(matches!(
            DenseMatrix::zeros(usize::MAX, 2),
            Err(CorpusError::ShapeMismatch { rows: usize::MAX, columns: 2, .. })
        ));
        assert!(matches!(
            lists_to_matrix(&TokenStream::new(vec![], vec![]).unwrap(), usize::MAX, 3),
            Err(CorpusError::ShapeMismatch { .. })
        ));
        assert_eq!(DenseMatrix::zeros(2, 3).unwrap().n_documents(), 2);
    }

    #[test]
    fn push_row_merges_duplicates() {
        let mut sparse = SparseMatrix::empty(4);
        sparse.push_row([(3usize, 1u64), (1, 2), (3, 4), (0, 0)]).unwrap();
        assert_eq!(sparse.row(0).unwrap().collect_vec(), vec![(1, 2), (3, 5)]);
        assert!(sparse.push_row([(4usize, 1u64)]).is_err());
        assert_eq!(sparse.n_documents(), 1);
    }

    #[test]
    fn malformed_csr_is_rejected() {
        assert!(SparseMatrix::new(2, vec![0, 2], vec![1, 0], vec![1, 1]).is_err());
        assert!(SparseMatrix::new(2, vec![0, 1], vec![2], vec![1]).is_err());
        assert!(SparseMatrix::new(2, vec![1, 1], vec![0], vec![1]).is_err());
        assert!(SparseMatrix::new(2, vec![0, 1, 2], vec![1, 0], vec![1, 1]).is_ok());
    }
}
