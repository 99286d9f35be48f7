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

//! Sources of uniform(0,1) variates for the Gibbs sampler.
//!
//! The default source is a [ReshuffledPool]: a fixed buffer of draws that is
//! generated once and put into a new order before every sweep. Within one
//! sweep the draws stay independent of each other, across sweeps they are
//! permutations of the same finite pool. This is an approximation of fresh
//! iid draws. Use [IidVariates] where that matters.
//!
//! The pool is driven by a 32 bit Mersenne Twister and draws and shuffles the
//! same way numpy's legacy `RandomState` does, a seed therefore yields the
//! same chain as `RandomState(seed)` would.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_mt::Mt;

/// 1 MiB worth of f64 variates.
pub const DEFAULT_POOL_SIZE: usize = 1024 * 1024 / 8;

/// Something that hands out uniform(0,1) draws to a sampler.
pub trait VariateSource {
    /// Called once at the start of every block of sweeps.
    /// Seeded sources go back to the state they had when they were created.
    fn restart(&mut self) {}

    /// Called exactly once before each sweep.
    fn begin_sweep(&mut self);

    /// The next draw in `[0, 1)`.
    fn next_variate(&mut self) -> f64;
}

impl<S> VariateSource for &mut S where S: VariateSource + ?Sized {
    #[inline(always)]
    fn restart(&mut self) {
        (**self).restart()
    }

    #[inline(always)]
    fn begin_sweep(&mut self) {
        (**self).begin_sweep()
    }

    #[inline(always)]
    fn next_variate(&mut self) -> f64 {
        (**self).next_variate()
    }
}

/// A double in `[0, 1)` with 53 random bits, built from two 32 bit outputs.
#[inline]
pub fn uniform53(rng: &mut Mt) -> f64 {
    let a = (rng.next_u32() >> 5) as f64;
    let b = (rng.next_u32() >> 6) as f64;
    (a * 67108864.0 + b) / 9007199254740992.0
}

/// A uniform integer in `[0, max]` by masked rejection.
#[inline]
pub fn bounded(rng: &mut Mt, max: u64) -> u64 {
    if max == 0 {
        return 0
    }
    let mut mask = max;
    for shift in [1, 2, 4, 8, 16, 32] {
        mask |= mask >> shift;
    }
    if max <= u32::MAX as u64 {
        loop {
            let value = rng.next_u32() as u64 & mask;
            if value <= max {
                return value
            }
        }
    } else {
        loop {
            let value = ((rng.next_u32() as u64) << 32 | rng.next_u32() as u64) & mask;
            if value <= max {
                return value
            }
        }
    }
}

/// Fisher-Yates from the back, swapping `i` with a draw from `[0, i]`.
pub fn shuffle<T>(rng: &mut Mt, values: &mut [T]) {
    for i in (1..values.len()).rev() {
        let j = bounded(rng, i as u64) as usize;
        values.swap(i, j);
    }
}

/// A fixed pool of variates, reshuffled in place before every sweep.
///
/// [VariateSource::restart] puts the pool back into the order it was drawn in.
/// A seeded pool also restarts its generator, so every block of sweeps sees
/// the same sequence of permutations.
#[derive(Debug, Clone)]
pub struct ReshuffledPool {
    seed: Option<u32>,
    rng: Mt,
    drawn: Vec<f64>,
    pool: Vec<f64>,
    cursor: usize,
}

impl ReshuffledPool {
    /// A pool drawn from a generator seeded with `seed`.
    pub fn seeded(seed: u32, len: usize) -> Self {
        Self::new(Some(seed), len)
    }

    /// A pool drawn from a generator with a random seed. Its generator keeps
    /// running on [VariateSource::restart].
    pub fn from_entropy(len: usize) -> Self {
        Self::new(None, len)
    }

    /// Creates a pool of `len` variates. A `len` of zero is bumped to one.
    ///
    /// A seeded pool shuffles with a fresh generator from the seed, the same
    /// state [VariateSource::restart] returns to.
    fn new(seed: Option<u32>, len: usize) -> Self {
        let mut rng = Mt::new(seed.unwrap_or_else(rand::random));
        let drawn: Vec<f64> = (0..len.max(1)).map(|_| uniform53(&mut rng)).collect();
        if let Some(seed) = seed {
            rng = Mt::new(seed);
        }
        Self {
            seed,
            rng,
            pool: drawn.clone(),
            drawn,
            cursor: 0,
        }
    }

    /// Restarts with `seed` and draws a new pool.
    pub fn reseed(&mut self, seed: u32) {
        *self = Self::new(Some(seed), self.drawn.len());
    }

    pub fn seed(&self) -> Option<u32> {
        self.seed
    }

    /// The current order of the pool.
    pub fn pool(&self) -> &[f64] {
        &self.pool
    }

    pub fn len(&self) -> usize {
        self.pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }
}

impl VariateSource for ReshuffledPool {
    fn restart(&mut self) {
        if let Some(seed) = self.seed {
            self.rng = Mt::new(seed);
        }
        self.pool.copy_from_slice(&self.drawn);
        self.cursor = 0;
    }

    fn begin_sweep(&mut self) {
        shuffle(&mut self.rng, &mut self.pool);
        self.cursor = 0;
    }

    #[inline]
    fn next_variate(&mut self) -> f64 {
        // the pool wraps around if a sweep has more tokens than variates
        let value = self.pool[self.cursor];
        self.cursor += 1;
        if self.cursor == self.pool.len() {
            self.cursor = 0;
        }
        value
    }
}

/// Fresh independent draws for every call.
#[derive(Debug, Clone)]
pub struct IidVariates<R = StdRng> {
    rng: R,
}

impl IidVariates<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl<R: Rng> IidVariates<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> VariateSource for IidVariates<R> {
    fn begin_sweep(&mut self) {}

    #[inline]
    fn next_variate(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}
