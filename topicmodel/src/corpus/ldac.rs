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

//! Reading and writing the LDA-C corpus format.
//!
//! Every line is one document: `<unique terms> <word id>:<count> ...`.

use std::io::{BufRead, Write};
use itertools::Itertools;
use crate::corpus::{Count, DocumentWordMatrix, SparseMatrix};
use crate::enums::CorpusError;
use crate::model::WordId;

/// Reads an LDA-C corpus. Word ids in the file start at `offset`, blank lines are skipped.
///
/// If `vocabulary_size` is `None` the largest word id decides the width of the matrix.
pub fn read_ldac(reader: impl BufRead, offset: usize, vocabulary_size: Option<usize>) -> Result<SparseMatrix, CorpusError> {
    let mut documents: Vec<Vec<(WordId, Count)>> = Vec::new();
    let mut max_word_id: Option<WordId> = None;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue
        }
        let line_no = line_no + 1;
        let mut parts = line.split_whitespace();
        let unique_terms: usize = parts
            .next()
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| CorpusError::Parse { line: line_no, message: "missing the number of unique terms".to_string() })?;
        let pairs = parts.map(|pair| parse_pair(pair, offset, line_no)).collect::<Result<Vec<_>, _>>()?;
        if pairs.len() != unique_terms {
            return Err(CorpusError::Parse {
                line: line_no,
                message: format!("announced {unique_terms} unique terms, but found {}", pairs.len())
            })
        }
        max_word_id = pairs.iter().map(|(word_id, _)| *word_id).chain(max_word_id).max();
        documents.push(pairs);
    }

    let columns = match vocabulary_size {
        Some(value) => value,
        None => max_word_id.map_or(0, |value| value + 1)
    };
    let mut matrix = SparseMatrix::empty(columns);
    for document in documents {
        matrix.push_row(document)?;
    }
    log::debug!("Read {} documents with a vocabulary of {} words.", matrix.n_documents(), columns);
    Ok(matrix)
}

fn parse_pair(pair: &str, offset: usize, line: usize) -> Result<(WordId, Count), CorpusError> {
    let (word_id, count) = pair
        .split_once(':')
        .ok_or_else(|| CorpusError::Parse { line, message: format!("{pair:?} is not a <word>:<count> pair") })?;
    let word_id: usize = word_id
        .parse()
        .map_err(|err| CorpusError::Parse { line, message: format!("illegal word id {word_id:?}: {err}") })?;
    let count: Count = count
        .parse()
        .map_err(|err| CorpusError::Parse { line, message: format!("illegal count {count:?}: {err}") })?;
    let word_id = word_id
        .checked_sub(offset)
        .ok_or_else(|| CorpusError::Parse { line, message: format!("word id {word_id} is below the offset {offset}") })?;
    Ok((word_id, count))
}

/// Writes a count matrix in the LDA-C format, shifting every word id by `offset`.
pub fn write_ldac(matrix: &impl DocumentWordMatrix, offset: usize, out: &mut impl Write) -> Result<usize, CorpusError> {
    let mut rows = vec![Vec::new(); matrix.n_documents()];
    matrix.for_each_entry(|document, word_id, count| rows[document].push((word_id, count)));
    let mut bytes = 0usize;
    for row in rows {
        let line = std::iter::once(row.len().to_string())
            .chain(row.into_iter().map(|(word_id, count)| format!("{}:{}", word_id + offset, count)))
            .join(" ");
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        bytes += line.len() + 1;
    }
    Ok(bytes)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use crate::corpus::test::reference_matrix;
    use crate::corpus::{read_ldac, write_ldac, DocumentWordMatrix};
    use crate::enums::CorpusError;

    #[test]
    fn can_write_and_read_ldac() {
        let dense = reference_matrix();
        let mut out = Vec::new();
        write_ldac(&dense, 1, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("2 1:1 2:1\n2 1:2 2:1\n"));

        let read = read_ldac(Cursor::new(text), 1, None).unwrap();
        assert_eq!(read.to_dense().unwrap(), dense);
    }

    #[test]
    fn blank_lines_are_skipped_and_width_is_respected() {
        let read = read_ldac(Cursor::new("1 0:3\n\n2 1:1 4:2\n"), 0, Some(10)).unwrap();
        assert_eq!(read.n_documents(), 2);
        assert_eq!(read.vocabulary_size(), 10);
        assert_eq!(read.total_count(), 6);
    }

    #[test]
    fn reports_the_broken_line() {
        let err = read_ldac(Cursor::new("1 0:3\n2 1:1\n"), 0, None).unwrap_err();
        assert!(matches!(err, CorpusError::Parse { line: 2, .. }));
        let err = read_ldac(Cursor::new("1 0:3\n"), 1, None).unwrap_err();
        assert!(matches!(err, CorpusError::Parse { line: 1, .. }));
        let err = read_ldac(Cursor::new("1 5:3\n"), 0, Some(3)).unwrap_err();
        assert!(matches!(err, CorpusError::WordOutOfRange { word_id: 5, .. }));
    }
}
