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
pub(crate) use statrs::function::gamma::ln_gamma;

/// The part of a log multivariate beta over `priors + counts` that depends on
/// the counts, for a symmetric prior of dimension `dim`:
///
/// `lgamma(dim·prior) - dim·lgamma(prior) - lgamma(total + dim·prior) + Σ lgamma(count + prior)`
///
/// Zero counts contribute nothing, `lgamma(prior)` cancels for them.
pub(crate) fn ln_dirichlet_multinomial(counts: &[u64], total: u64, prior: f64, ln_gamma_prior: f64) -> f64 {
    let prior_sum = prior * counts.len() as f64;
    let mut value = ln_gamma(prior_sum) - ln_gamma(total as f64 + prior_sum);
    for &count in counts {
        if count > 0 {
            value += ln_gamma(count as f64 + prior) - ln_gamma_prior;
        }
    }
    value
}

/// Every row of a flat row-major count table smoothed by `prior` and scaled to sum to one.
pub(crate) fn normalize_rows_with_prior(table: &[u64], columns: usize, prior: f64) -> Vec<Vec<f64>> {
    if columns == 0 {
        return Vec::new()
    }
    table.chunks_exact(columns).map(|row| {
        let mut row = row.iter().map(|&count| count as f64 + prior).collect_vec();
        normalize_in_place(&mut row);
        row
    }).collect()
}

/// Scales `values` to sum to one. Rows without any mass stay untouched.
#[inline]
pub(crate) fn normalize_in_place(values: &mut [f64]) {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter_mut().for_each(|value| *value /= sum);
    }
}

#[inline]
pub(crate) fn l1_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip_eq(b.iter()).map(|(a, b)| f64::abs(a - b)).sum()
}
