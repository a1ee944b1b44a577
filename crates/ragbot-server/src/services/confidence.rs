use super::providers::{ScoreKind, TokenScores};

/// Softmax weight of the chosen token among the candidates of its step.
///
/// Only meaningful for raw logits over the full vocabulary. The max is
/// subtracted before exponentiating so large logits do not overflow.
pub fn step_probability(step: &TokenScores) -> f32 {
    let max = step
        .candidates
        .iter()
        .copied()
        .fold(step.chosen, f32::max);

    let total: f32 = step.candidates.iter().map(|s| (s - max).exp()).sum();
    if total == 0.0 || !total.is_finite() {
        return 0.0;
    }

    (step.chosen - max).exp() / total
}

/// Probability of the chosen token at one step.
///
/// Log-probabilities are already normalized over the vocabulary, so the
/// reported top-n candidates must not be renormalized among themselves.
pub fn chosen_probability(step: &TokenScores, kind: ScoreKind) -> f32 {
    match kind {
        ScoreKind::Logits => step_probability(step),
        ScoreKind::LogProbs => {
            let p = step.chosen.exp();
            if p.is_finite() {
                p.clamp(0.0, 1.0)
            } else {
                0.0
            }
        }
    }
}

/// Mean chosen-token probability over the generated tokens.
/// Nothing generated means nothing to be confident about: 0.0.
pub fn mean_confidence(steps: &[TokenScores], kind: ScoreKind) -> f32 {
    if steps.is_empty() {
        return 0.0;
    }

    steps.iter().map(|s| chosen_probability(s, kind)).sum::<f32>() / steps.len() as f32
}
