//! Sampling and normalisation helpers shared by the sampler and evaluator.

use rand::{Rng, distr::StandardUniform, prelude::IndexedRandom};

/// Normalize non-negative weights into probabilities that sum to 1.0.
///
/// Returns `None` when the total weight is zero, negative, or non-finite;
/// callers decide whether that means "forbidden" (likelihood tree) or
/// "fall back to uniform" (posterior weights).
pub fn normalize_weights<I>(weights: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = f64>,
{
    let weights: Vec<f64> = weights.into_iter().collect();
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    Some(weights.into_iter().map(|w| w / total).collect())
}

/// Pick an index by weighted sampling.
///
/// Draws a threshold in `[0, total)` and walks the weights until it crosses
/// zero. All-zero weights fall back to a uniform draw so a node whose every
/// candidate was rollout-valued at 0 still yields a choice.
pub fn weighted_index<R, W>(rng: &mut R, weights: &[W]) -> Option<usize>
where
    R: Rng,
    W: Into<f64> + Copy,
{
    if weights.is_empty() {
        return None;
    }

    let total: f64 = weights.iter().map(|&w| w.into()).sum();
    if total <= 0.0 {
        let indices: Vec<usize> = (0..weights.len()).collect();
        return indices.choose(rng).copied();
    }

    let mut threshold = rng.sample::<f64, _>(StandardUniform) * total;
    for (index, &weight) in weights.iter().enumerate() {
        let w = weight.into();
        if threshold < w {
            return Some(index);
        }
        threshold -= w;
    }

    // Numerical fallback when rounding pushes the threshold past the end.
    Some(weights.len() - 1)
}

/// Weighted sampling over `(item, weight)` pairs, returning the item.
pub fn weighted_sample<'a, R, T>(rng: &mut R, items: &'a [(T, f64)]) -> Option<&'a T>
where
    R: Rng,
{
    let weights: Vec<f64> = items.iter().map(|(_, w)| *w).collect();
    weighted_index(rng, &weights).map(|i| &items[i].0)
}
