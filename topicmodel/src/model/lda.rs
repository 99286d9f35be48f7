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

use ldagibbs_toolkit::variates::{ReshuffledPool, VariateSource};
use crate::corpus::{matrix_to_lists, Count, DocumentWordMatrix};
use crate::enums::LdaError;
use crate::model::estimate::{doc_topic_distribution, topic_word_distribution};
use crate::model::likelihood::log_likelihood;
use crate::model::sampler::sample_sweep;
use crate::model::state::{initialize_state, CountState, TokenStore};
use crate::model::{DocumentTo, LdaConfig, Priors, Probability, TopicId, TopicModel, TopicModelInferencer, TopicTo, WordTo};

/// Latent Dirichlet allocation using collapsed Gibbs sampling.
///
/// ```
/// use ldagibbs_topicmodel::corpus::DenseMatrix;
/// use ldagibbs_topicmodel::model::{Lda, LdaConfigBuilder};
///
/// let x = DenseMatrix::from_rows([[1u64, 1], [2, 1], [3, 1], [4, 1], [5, 8], [6, 1]]).unwrap();
/// let config = LdaConfigBuilder::default().n_topics(2).n_iter(100).random_state(0).build().unwrap();
/// let mut model = Lda::new(config).unwrap();
/// model.fit(&x).unwrap();
/// assert_eq!(model.components().unwrap().len(), 2);
/// assert_eq!(model.loglikelihoods().len(), 11);
/// ```
///
/// References:
/// Griffiths, Thomas L., and Mark Steyvers. "Finding Scientific Topics." PNAS 101 (2004): 5228–5235.
pub struct Lda<S = ReshuffledPool> {
    config: LdaConfig,
    variates: S,
    tokens: Option<TokenStore>,
    counts: Option<CountState>,
    loglikelihoods: Vec<f64>,
    masses: Vec<f64>,
}

impl Lda<ReshuffledPool> {
    /// Draws the variate pool and validates the config.
    pub fn new(config: LdaConfig) -> Result<Self, LdaError> {
        let variates = match config.random_state {
            Some(seed) => ReshuffledPool::seeded(seed, config.pool_size),
            None => ReshuffledPool::from_entropy(config.pool_size),
        };
        Self::with_variates(config, variates)
    }
}

impl<S> Lda<S> where S: VariateSource {
    /// Uses `variates` instead of the pool described by the config.
    pub fn with_variates(config: LdaConfig, variates: S) -> Result<Self, LdaError> {
        config.validate()?;
        Ok(Self {
            masses: Vec::with_capacity(config.n_topics),
            config,
            variates,
            tokens: None,
            counts: None,
            loglikelihoods: Vec::new(),
        })
    }

    pub fn config(&self) -> &LdaConfig {
        &self.config
    }

    pub fn variates(&self) -> &S {
        &self.variates
    }

    pub fn variates_mut(&mut self) -> &mut S {
        &mut self.variates
    }

    #[inline]
    fn priors(&self) -> Priors {
        Priors { alpha: self.config.alpha, eta: self.config.eta }
    }

    /// Expands `x` into tokens, assigns them round robin and fills the count tables.
    pub fn initialize(&mut self, x: &impl DocumentWordMatrix) -> Result<&mut Self, LdaError> {
        let n_documents = x.n_documents();
        let vocabulary_size = x.vocabulary_size();
        let stream = matrix_to_lists(x);
        log::info!("n_documents: {}", n_documents);
        log::info!("vocab_size: {}", vocabulary_size);
        log::info!("n_words: {}", stream.len());
        log::info!("n_topics: {}", self.config.n_topics);
        log::info!("n_iter: {}", self.config.n_iter);
        if stream.is_empty() {
            return Err(LdaError::EmptyCorpus)
        }
        let (tokens, counts) = initialize_state(stream, self.config.n_topics, n_documents, vocabulary_size)?;
        self.tokens = Some(tokens);
        self.counts = Some(counts);
        self.loglikelihoods.clear();
        Ok(self)
    }

    /// Fits the model to `x`, recording the log likelihood every `refresh` sweeps.
    /// The token store is released afterwards, the count tables stay.
    pub fn fit(&mut self, x: &impl DocumentWordMatrix) -> Result<&mut Self, LdaError> {
        self.initialize(x)?;
        let n_iter = self.config.n_iter;
        if n_iter == 0 {
            log::warn!("n_iter is 0, the model keeps the round robin assignment.");
        }
        for it in (0..n_iter).step_by(self.config.refresh) {
            let ll = self.loglikelihood()?;
            self.loglikelihoods.push(ll);
            log::info!("<{}> log likelihood: {:.0}", it, ll);
            self.sample_topics(self.config.refresh.min(n_iter - it))?;
        }
        let ll = self.loglikelihood()?;
        self.loglikelihoods.push(ll);
        log::info!("<{}> log likelihood: {:.0}", n_iter, ll);
        self.clean_up();
        Ok(self)
    }

    /// Fits the model and returns the document-topic distribution of `x`.
    pub fn fit_transform(&mut self, x: &impl DocumentWordMatrix) -> Result<DocumentTo<TopicTo<Probability>>, LdaError> {
        self.fit(x)?;
        self.doc_topic()
    }

    /// Runs `iterations` sweeps on the initialized state.
    ///
    /// The variates are restarted first. With a seed, every call therefore
    /// draws the same permutations of the pool and a refit reproduces the last fit.
    pub fn sample_topics(&mut self, iterations: usize) -> Result<(), LdaError> {
        let priors = self.priors();
        let Self { tokens, counts, variates, masses, .. } = self;
        let counts = counts.as_mut().ok_or(LdaError::NotFitted)?;
        let tokens = tokens.as_mut().ok_or(LdaError::TokensReleased)?;
        variates.restart();
        for _ in 0..iterations {
            sample_sweep(tokens, counts, priors, variates, masses);
        }
        Ok(())
    }

    /// The complete log likelihood of the current assignments.
    pub fn loglikelihood(&self) -> Result<f64, LdaError> {
        Ok(log_likelihood(self.count_state()?, self.priors()))
    }

    /// One value per checkpoint of the last fit.
    pub fn loglikelihoods(&self) -> &[f64] {
        &self.loglikelihoods
    }

    /// Drops the token store, it is not needed for estimates or the likelihood.
    pub fn clean_up(&mut self) {
        self.tokens = None;
    }

    pub fn count_state(&self) -> Result<&CountState, LdaError> {
        self.counts.as_ref().ok_or(LdaError::NotFitted)
    }

    pub fn token_store(&self) -> Result<&TokenStore, LdaError> {
        if self.counts.is_none() {
            return Err(LdaError::NotFitted)
        }
        self.tokens.as_ref().ok_or(LdaError::TokensReleased)
    }

    /// The current topic of every token, available until [Self::clean_up].
    pub fn topic_assignments(&self) -> Result<&[TopicId], LdaError> {
        Ok(self.token_store()?.topics())
    }

    /// Topic-word counts of the current assignments.
    pub fn nzw(&self) -> Result<TopicTo<WordTo<Count>>, LdaError> {
        Ok(self.count_state()?.topic_word_table())
    }

    /// Document-topic counts of the current assignments.
    pub fn ndz(&self) -> Result<DocumentTo<TopicTo<Count>>, LdaError> {
        Ok(self.count_state()?.doc_topic_table())
    }

    /// Tokens per topic of the current assignments.
    pub fn nz(&self) -> Result<&[Count], LdaError> {
        Ok(self.count_state()?.topic_totals())
    }

    /// Point estimate of the topic-word distributions (phi).
    pub fn components(&self) -> Result<TopicTo<WordTo<Probability>>, LdaError> {
        Ok(topic_word_distribution(self.count_state()?, self.config.eta))
    }

    /// Alias for [Self::components].
    pub fn topic_word(&self) -> Result<TopicTo<WordTo<Probability>>, LdaError> {
        self.components()
    }

    /// Point estimate of the document-topic distributions (theta).
    pub fn doc_topic(&self) -> Result<DocumentTo<TopicTo<Probability>>, LdaError> {
        Ok(doc_topic_distribution(self.count_state()?, self.config.alpha))
    }

    /// Infers the document-topic distributions of new documents against the
    /// current topics, see [TopicModelInferencer].
    pub fn transform(&self, x: &impl DocumentWordMatrix, max_iter: usize, tol: f64) -> Result<DocumentTo<TopicTo<Probability>>, LdaError> {
        let phi = self.components()?;
        TopicModelInferencer::new(&phi, self.config.alpha, max_iter, tol).infer_matrix(x)
    }

    /// [Self::transform] with 20 rounds and a tolerance of 1e-16.
    pub fn transform_default(&self, x: &impl DocumentWordMatrix) -> Result<DocumentTo<TopicTo<Probability>>, LdaError> {
        self.transform(x, TopicModelInferencer::DEFAULT_MAX_ITER, TopicModelInferencer::DEFAULT_TOL)
    }

    /// Freezes the current estimates.
    pub fn to_topic_model(&self) -> Result<TopicModel, LdaError> {
        let counts = self.count_state()?;
        TopicModel::new(
            self.components()?,
            counts.word_frequencies(),
            self.doc_topic()?,
            counts.document_lengths(),
            self.config.clone(),
            self.loglikelihoods.clone(),
        )
    }
}

#[cfg(test)]
mod test {
    use approx::assert_abs_diff_eq;
    use ldagibbs_toolkit::variates::IidVariates;
    use crate::corpus::test::reference_matrix;
    use crate::corpus::{DenseMatrix, DocumentWordMatrix};
    use crate::enums::LdaError;
    use crate::model::{LdaConfig, LdaConfigBuilder};
    use super::Lda;

    fn config(n_iter: usize) -> LdaConfig {
        LdaConfigBuilder::default().n_topics(2).n_iter(n_iter).random_state(0).build().unwrap()
    }

    #[test]
    fn rejects_bad_priors_before_touching_data() {
        let mut config = config(10);
        config.alpha = -0.1;
        assert!(matches!(Lda::new(config), Err(LdaError::InvalidHyperparameter { name: "alpha", .. })));
    }

    #[test]
    fn accessors_need_a_corpus() {
        let model = Lda::new(config(10)).unwrap();
        assert!(matches!(model.components(), Err(LdaError::NotFitted)));
        assert!(matches!(model.loglikelihood(), Err(LdaError::NotFitted)));
        assert!(matches!(model.topic_assignments(), Err(LdaError::NotFitted)));
    }

    #[test]
    fn empty_corpora_are_rejected() {
        let mut model = Lda::new(config(10)).unwrap();
        let x = DenseMatrix::zeros(3, 4).unwrap();
        assert!(matches!(model.fit(&x), Err(LdaError::EmptyCorpus)));
    }

    #[test]
    fn fit_records_every_checkpoint_and_releases_tokens() {
        let mut model = Lda::new(config(25)).unwrap();
        model.fit(&reference_matrix()).unwrap();
        // 0, 10, 20 and the final value
        assert_eq!(model.loglikelihoods().len(), 4);
        assert!(model.loglikelihoods().iter().all(|value| value.is_finite() && *value < 0.0));
        assert!(matches!(model.topic_assignments(), Err(LdaError::TokensReleased)));
        assert!(matches!(model.sample_topics(1), Err(LdaError::TokensReleased)));
        assert!(model.count_state().unwrap().satisfies_invariants(34));
        assert_eq!(model.nz().unwrap().iter().sum::<u64>(), 34);
    }

    #[test]
    fn zero_sweeps_keep_the_initial_state() {
        let mut model = Lda::new(config(0)).unwrap();
        model.fit(&reference_matrix()).unwrap();
        assert_eq!(model.loglikelihoods().len(), 1);
        assert_eq!(model.nz().unwrap(), &[17, 17]);
    }

    #[test]
    fn initialize_and_manual_sweeps_match_fit() {
        let x = reference_matrix();
        let mut fitted = Lda::new(config(30)).unwrap();
        fitted.fit(&x).unwrap();

        let mut manual = Lda::new(config(30)).unwrap();
        manual.initialize(&x).unwrap();
        assert_eq!(manual.topic_assignments().unwrap().len(), 34);
        // fit samples in blocks of `refresh` sweeps
        for _ in 0..3 {
            manual.sample_topics(10).unwrap();
        }
        assert_eq!(manual.nzw().unwrap(), fitted.nzw().unwrap());
        assert_eq!(manual.ndz().unwrap(), fitted.ndz().unwrap());
    }

    #[test]
    fn refitting_a_seeded_model_reproduces_it() {
        let x = reference_matrix();
        let mut model = Lda::new(config(40)).unwrap();
        model.fit(&x).unwrap();
        let (nzw, history) = (model.nzw().unwrap(), model.loglikelihoods().to_vec());
        model.fit(&x).unwrap();
        assert_eq!(model.nzw().unwrap(), nzw);
        assert_eq!(model.loglikelihoods(), history.as_slice());
    }

    #[test]
    fn estimates_are_stochastic_matrices() {
        let x = reference_matrix();
        let mut model = Lda::with_variates(config(50), IidVariates::seeded(9)).unwrap();
        let theta = model.fit_transform(&x).unwrap();
        assert_eq!(theta.len(), x.n_documents());
        for row in model.components().unwrap().iter().chain(theta.iter()) {
            assert_abs_diff_eq!(row.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
        assert_eq!(model.topic_word().unwrap(), model.components().unwrap());
    }

    #[test]
    fn transform_checks_the_vocabulary() {
        let mut model = Lda::new(config(5)).unwrap();
        model.fit(&reference_matrix()).unwrap();
        let x = DenseMatrix::from_rows([[1u64, 2, 3]]).unwrap();
        assert!(matches!(model.transform_default(&x), Err(LdaError::VocabularyMismatch { expected: 2, actual: 3 })));
        let x = DenseMatrix::from_rows([[4u64, 1]]).unwrap();
        let theta = model.transform_default(&x).unwrap();
        assert_abs_diff_eq!(theta[0].iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn frozen_model_carries_the_estimates() {
        let mut model = Lda::new(config(20)).unwrap();
        model.fit(&reference_matrix()).unwrap();
        let frozen = model.to_topic_model().unwrap();
        assert_eq!(frozen.topics(), model.components().unwrap().as_slice());
        assert_eq!(frozen.used_vocab_frequency(), &[21, 13]);
        assert_eq!(frozen.document_lengths(), &[2, 3, 4, 5, 13, 7]);
        assert_eq!(frozen.loglikelihoods(), model.loglikelihoods());
    }
}
