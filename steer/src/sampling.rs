//! Sampling parameters and host-side token sampling

use rand::Rng;

use crate::logits::argmax;

/// Parameters for nucleus (top-p) sampling
#[derive(Debug, Clone)]
pub struct SamplingParams {
    /// Temperature for logit scaling (higher = more random). Values at or
    /// below zero select greedily.
    pub temperature: f32,
    /// Nucleus probability threshold in (0, 1]. Only tokens within the top-p
    /// cumulative probability mass are considered.
    pub top_p: f32,
    /// Seed for the PRNG. Same seed + same input → same output.
    pub seed: u64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            seed: 42,
        }
    }
}

/// Options for local text generation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Maximum number of new tokens to generate.
    pub max_new_tokens: usize,
    /// EOS token ID that stops generation. `None` uses the model's own.
    pub eos_token_id: Option<u32>,
    /// Sampling parameters. `None` means greedy (argmax) decoding.
    pub sampling: Option<SamplingParams>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 500,
            eos_token_id: None,
            sampling: None,
        }
    }
}

/// Nucleus (top-p) sampling with temperature.
///
/// Falls back to argmax when `temperature <= 0`. Returns `None` only for an
/// empty logit vector.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn sample_top_p<R: Rng>(
    logits: &[f32],
    temperature: f32,
    top_p: f32,
    rng: &mut R,
) -> Option<u32> {
    if temperature <= 0.0 {
        return argmax(logits);
    }
    if logits.is_empty() {
        return None;
    }

    // Softmax over temperature-scaled logits
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut probs: Vec<f32> = logits
        .iter()
        .map(|l| ((l - max_logit) / temperature).exp())
        .collect();
    let sum: f32 = probs.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return argmax(logits);
    }
    for p in &mut probs {
        *p /= sum;
    }

    // Sort by probability descending
    let mut indexed: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    // Top-p nucleus
    let mut cumulative = 0.0f32;
    let mut cutoff = indexed.len();
    for (i, &(_, p)) in indexed.iter().enumerate() {
        cumulative += p;
        if cumulative >= top_p {
            cutoff = i + 1;
            break;
        }
    }
    let nucleus = &indexed[..cutoff];

    // Renormalize
    let nucleus_sum: f32 = nucleus.iter().map(|(_, p)| p).sum();
    let r: f32 = rng.gen();
    let mut cumul = 0.0;
    for &(idx, p) in nucleus {
        cumul += p / nucleus_sum;
        if cumul >= r {
            return Some(idx as u32);
        }
    }

    // Fallback: most probable
    Some(nucleus[0].0 as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn zero_temperature_is_greedy() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(sample_top_p(&[0.1, 3.0, 0.2], 0.0, 0.9, &mut rng), Some(1));
    }

    #[test]
    fn tiny_top_p_keeps_only_best_token() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(
                sample_top_p(&[1.0, 5.0, 4.9], 1.0, 1e-6, &mut rng),
                Some(1)
            );
        }
    }

    #[test]
    fn same_seed_same_choice() {
        let logits = [0.3, 0.1, 0.2, 0.25, 0.15];
        let a = sample_top_p(&logits, 1.5, 1.0, &mut StdRng::seed_from_u64(42));
        let b = sample_top_p(&logits, 1.5, 1.0, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        assert!(a.is_some_and(|t| t < 5));
    }

    #[test]
    fn empty_logits() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sample_top_p(&[], 1.0, 1.0, &mut rng), None);
    }
}
