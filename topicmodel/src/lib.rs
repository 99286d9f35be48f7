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

//! Latent Dirichlet allocation fitted with collapsed Gibbs sampling.
//!
//! A document-word count matrix ([corpus::DenseMatrix] or [corpus::SparseMatrix])
//! is expanded into tokens, [model::Lda] resamples their topics sweep by sweep
//! and freezes the result into a [model::TopicModel], which can infer the topic
//! mixtures of unseen documents.

pub mod corpus;
pub mod enums;
pub mod model;
mod io;
mod math;
