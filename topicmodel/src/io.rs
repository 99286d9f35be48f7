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

//! Storing and loading a frozen [TopicModel].
//!
//! A stored model starts with a header line `ldagibbs <format> <deflated|plain>`
//! followed by the serialized payload.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use crate::enums::{ModelFormat, ReadError, WriteError};
use crate::model::TopicModel;

const MAGIC: &str = "ldagibbs";
const DEFLATED: &str = "deflated";
const PLAIN: &str = "plain";

impl TopicModel {
    /// Saves the model to `path`. Fails if the file exists and `replace` is false.
    pub fn save(&self, path: impl AsRef<Path>, format: ModelFormat, deflate: bool, replace: bool) -> Result<usize, WriteError> {
        let path = path.as_ref();
        if path.exists() && !replace {
            return Err(WriteError::AlreadyExists(path.to_path_buf()))
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut out = BufWriter::new(File::create(path)?);
        let bytes = self.save_to(&mut out, format, deflate)?;
        out.flush()?;
        log::info!("Saved the topic model as {format} to {}", path.display());
        Ok(bytes)
    }

    /// Writes header and payload to `out`, returns the number of payload bytes before compression.
    pub fn save_to(&self, out: &mut impl Write, format: ModelFormat, deflate: bool) -> Result<usize, WriteError> {
        writeln!(out, "{MAGIC} {format} {}", if deflate { DEFLATED } else { PLAIN })?;
        let payload = match format {
            ModelFormat::Json => serde_json::to_vec(self)?,
            ModelFormat::Binary => bincode::serialize(self)?,
        };
        if deflate {
            let mut encoder = DeflateEncoder::new(out, Compression::default());
            encoder.write_all(&payload)?;
            encoder.finish()?;
        } else {
            out.write_all(&payload)?;
        }
        Ok(payload.len())
    }

    /// Loads a model stored by [TopicModel::save].
    pub fn load(path: impl AsRef<Path>) -> Result<(TopicModel, ModelFormat), ReadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReadError::PathNotFound(path.to_path_buf()))
        }
        Self::load_from(BufReader::new(File::open(path)?))
    }

    pub fn load_from(mut reader: impl BufRead) -> Result<(TopicModel, ModelFormat), ReadError> {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let (format, deflated) = match header.split_whitespace().collect::<Vec<_>>().as_slice() {
            [MAGIC, format, compression] => {
                let deflated = match *compression {
                    DEFLATED => true,
                    PLAIN => false,
                    _ => return Err(ReadError::IllegalHeader(header.trim_end().to_string()))
                };
                (format.parse::<ModelFormat>()?, deflated)
            }
            _ => return Err(ReadError::IllegalHeader(header.trim_end().to_string()))
        };

        let mut payload = Vec::new();
        if deflated {
            DeflateDecoder::new(reader).read_to_end(&mut payload)?;
        } else {
            reader.read_to_end(&mut payload)?;
        }
        let model: TopicModel = match format {
            ModelFormat::Json => serde_json::from_slice(&payload)?,
            ModelFormat::Binary => bincode::deserialize(&payload)?,
        };
        model.check_shape()?;
        Ok((model, format))
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use crate::enums::{ModelFormat, ReadError, WriteError};
    use crate::model::test::create_test_data;
    use crate::model::TopicModel;

    #[test]
    fn can_save_and_load_every_format() {
        let model = create_test_data();
        let dir = tempfile::tempdir().unwrap();
        for format in [ModelFormat::Json, ModelFormat::Binary] {
            for deflate in [true, false] {
                let path = dir.path().join(format!("{format}-{deflate}.model"));
                model.save(&path, format, deflate, false).unwrap();
                let (loaded, loaded_format) = TopicModel::load(&path).unwrap();
                assert_eq!(loaded_format, format);
                assert!(model.seems_equal_to(&loaded));
                assert_eq!(model.config(), loaded.config());
            }
        }
    }

    #[test]
    fn does_not_replace_without_permission() {
        let model = create_test_data();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.bin");
        model.save(&path, ModelFormat::Binary, true, false).unwrap();
        assert!(matches!(model.save(&path, ModelFormat::Binary, true, false), Err(WriteError::AlreadyExists(_))));
        model.save(&path, ModelFormat::Json, false, true).unwrap();
        assert_eq!(TopicModel::load(&path).unwrap().1, ModelFormat::Json);
    }

    #[test]
    fn rejects_foreign_files() {
        assert!(matches!(
            TopicModel::load_from(Cursor::new("something else\n{}")),
            Err(ReadError::IllegalHeader(_))
        ));
        assert!(matches!(
            TopicModel::load_from(Cursor::new("ldagibbs Yaml plain\n{}")),
            Err(ReadError::StrumParse(_))
        ));
        assert!(matches!(
            TopicModel::load_from(Cursor::new(concat!(
                "ldagibbs Json plain\n",
                r#"{"topics":[[0.5,0.5]],"used_vocab_frequency":[1,2,3],"doc_topic_distributions":[],"#,
                r#""document_lengths":[],"config":{"n_topics":1,"n_iter":1,"alpha":0.1,"eta":0.01,"#,
                r#""refresh":1,"random_state":null,"pool_size":8},"loglikelihoods":[]}"#
            ))),
            Err(ReadError::Model(_))
        ));
        assert!(matches!(
            TopicModel::load("does/not/exist.model"),
            Err(ReadError::PathNotFound(_))
        ));
    }
}
