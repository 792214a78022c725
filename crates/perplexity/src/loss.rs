#![forbid(unsafe_code)]

use crate::error::ModelError;

/// Numerically stable `ln(sum(exp(row)))`, accumulated in f64.
pub fn log_sum_exp(row: &[f32]) -> f64 {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max) as f64;
    if !max.is_finite() {
        return max;
    }
    let sum: f64 = row.iter().map(|&v| (v as f64 - max).exp()).sum();
    max + sum.ln()
}

/// Cross-entropy of one logits row against the `target` token:
/// `-log_softmax(row)[target]`.
pub fn cross_entropy(row: &[f32], target: u32) -> Result<f64, ModelError> {
    let logit = row
        .get(target as usize)
        .copied()
        .ok_or(ModelError::TokenOutOfVocab { token: target, vocab: row.len() })?;
    Ok(log_sum_exp(row) - logit as f64)
}

/// Mean next-token cross-entropy with targets shifted one position left.
///
/// `logits[i]` is the model's prediction after seeing `tokens[..=i]`, so row
/// `i` is scored against `tokens[i + 1]`. The last row predicts past the end
/// of the input and is not used. Averaged uniformly over `n - 1` positions.
pub fn mean_next_token_loss(logits: &[Vec<f32>], tokens: &[u32]) -> Result<f64, ModelError> {
    let n = tokens.len();
    if n < 2 {
        return Err(ModelError::TooFewTokens(n));
    }
    if logits.len() != n {
        return Err(ModelError::LogitsShape { rows: logits.len(), tokens: n });
    }
    let mut total = 0.0_f64;
    for (row, &next) in logits.iter().zip(tokens.iter().skip(1)) {
        total += cross_entropy(row, next)?;
    }
    let mean = total / (n - 1) as f64;
    if mean.is_nan() {
        return Err(ModelError::Inference("loss is NaN".to_string()));
    }
    Ok(mean)
}

/// Perplexity = exp(mean next-token cross-entropy).
pub fn perplexity_from_logits(logits: &[Vec<f32>], tokens: &[u32]) -> Result<f64, ModelError> {
    mean_next_token_loss(logits, tokens).map(f64::exp)
}
