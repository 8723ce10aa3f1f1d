//! Emotion score distributions
//!
//! EVI attaches ~50 prosody scores to each utterance; only the strongest few
//! are kept per message.

use serde::{Deserialize, Serialize};

/// How many scores survive per message
pub const TOP_EMOTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub emotion: String,
    pub score: f64,
}

/// Emotion scores ordered strongest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmotionDistribution(Vec<EmotionScore>);

impl EmotionDistribution {
    /// Keep the `n` highest scores.
    ///
    /// The sort is stable, so equal scores keep the order in which they
    /// appear in `scores`. NaN scores are dropped.
    pub fn top_n<I>(scores: I, n: usize) -> Self
    where
        I: IntoIterator<Item = (String, f64)>,
    {
        let mut ranked: Vec<EmotionScore> = scores
            .into_iter()
            .filter(|(_, score)| !score.is_nan())
            .map(|(emotion, score)| EmotionScore { emotion, score })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(n);

        Self(ranked)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmotionScore> {
        self.0.iter()
    }

    pub fn get(&self, emotion: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|entry| entry.emotion == emotion)
            .map(|entry| entry.score)
    }

    /// `"joy: 0.90 | sad: 0.30"`
    pub fn caption(&self) -> String {
        self.0
            .iter()
            .map(|entry| format!("{}: {:.2}", entry.emotion, entry.score))
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
