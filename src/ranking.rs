//! Turns a full emotion distribution into the primary label plus the ranked, filtered list
//! returned to clients.

use crate::classifier::{Emotion, EmotionDistribution, EmotionScore};
use serde::Serialize;

/// Labels at or below this percentage are dropped from the ranked list.
pub const MIN_REPORTED_PERCENTAGE: f64 = 1.0;

/// Primary label and the scores worth reporting, most likely first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    /// Label with the highest percentage; earliest in schema order on ties.
    pub primary: Emotion,
    /// Percentage of the primary label.
    pub primary_score: f64,
    /// Scores strictly above [`MIN_REPORTED_PERCENTAGE`], descending, ties in schema order.
    pub filtered: Vec<EmotionScore>,
}

/// Rank a distribution.
pub fn rank(distribution: &EmotionDistribution) -> RankedResult {
    let scores = distribution.scores();

    // Strict comparison keeps the first label on ties.
    let top = scores
        .iter()
        .copied()
        .reduce(|best, candidate| {
            if candidate.percentage > best.percentage {
                candidate
            } else {
                best
            }
        })
        .unwrap_or(EmotionScore {
            emotion: Emotion::Neutral,
            percentage: 0.0,
        });

    let mut filtered: Vec<EmotionScore> = scores
        .iter()
        .copied()
        .filter(|score| score.percentage > MIN_REPORTED_PERCENTAGE)
        .collect();
    // `sort_by` is stable, so equal percentages stay in schema order.
    filtered.sort_by(|left, right| right.percentage.total_cmp(&left.percentage));

    RankedResult {
        primary: top.emotion,
        primary_score: top.percentage,
        filtered,
    }
}
