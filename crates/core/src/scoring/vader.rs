use crate::scoring::{SentimentScore, SentimentScorer};
use vader_sentiment::SentimentIntensityAnalyzer;

/// Headline scorer backed by the VADER lexicon.
///
/// Polarity is VADER's compound score; subjectivity is the non-neutral share of the
/// text (`1 - neu`).
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for VaderScorer {
    fn scorer_name(&self) -> &'static str {
        "vader"
    }

    fn score(&self, text: &str) -> SentimentScore {
        if text.trim().is_empty() {
            return SentimentScore::NEUTRAL;
        }

        let scores = self.analyzer.polarity_scores(text);
        let compound = scores.get("compound").copied().unwrap_or(0.0);
        let neutral = scores.get("neu").copied().unwrap_or(1.0);

        SentimentScore {
            polarity: compound.clamp(-1.0, 1.0),
            subjectivity: (1.0 - neutral).clamp(0.0, 1.0),
        }
    }
}
