use analysis_core::{AnalysisError, NewsSentimentProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Score used when no news is available
pub const NEUTRAL_NEWS_SCORE: f64 = 50.0;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

// Per-article raw score at which the 0-100 mapping reaches 75 (or 25)
const HALF_SATURATION: f64 = 2.0;

/// A news item as delivered by the news collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Headline {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Headline {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), description: None }
    }
}

/// Clamp an externally supplied news score into [0, 100]; missing or
/// non-finite scores become neutral.
pub fn normalize_news_score(score: Option<f64>) -> f64 {
    match score {
        Some(s) if s.is_finite() => s.clamp(0.0, 100.0),
        Some(s) => {
            tracing::warn!("Discarding non-finite news score {}", s);
            NEUTRAL_NEWS_SCORE
        }
        None => NEUTRAL_NEWS_SCORE,
    }
}

/// Word-list headline scorer with short-range negation handling
pub struct SentimentAnalysisEngine {
    positive_words: HashSet<&'static str>,
    negative_words: HashSet<&'static str>,
    negation_words: HashSet<&'static str>,
}

impl SentimentAnalysisEngine {
    pub fn new() -> Self {
        Self {
            positive_words: [
                "bullish", "rally", "surge", "gain", "gains", "profit", "growth", "beat",
                "beats", "upgrade", "outperform", "strong", "positive", "rise", "increase",
                "breakthrough", "success", "exceed", "momentum", "optimistic", "record",
                "advance", "dividend", "buyback", "repurchase", "upside", "recovery",
                "rebound", "expansion", "robust", "accelerating", "overweight", "raised",
                "upgraded", "tailwind",
            ]
            .into_iter()
            .collect(),
            negative_words: [
                "bearish", "decline", "loss", "losses", "fall", "plunge", "crash", "miss",
                "misses", "downgrade", "underperform", "weak", "negative", "drop",
                "decrease", "concern", "fail", "disappoint", "slump", "warning",
                "pessimistic", "retreat", "fear", "trouble", "dilution", "headwind",
                "lawsuit", "litigation", "recall", "investigation", "probe", "default",
                "bankruptcy", "layoff", "layoffs", "downside", "overvalued", "bubble",
                "underweight", "lowered", "suspended", "downgraded",
            ]
            .into_iter()
            .collect(),
            negation_words: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    /// Net count of positive minus negative words, flipping words that follow
    /// a negation within [`NEGATION_WINDOW`] tokens.
    fn analyze_text(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        let words: Vec<&str> = text_lower
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '.' || c == '!' || c == '?' || c == ':')
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation_words.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut score: i32 = 0;

        for (i, word) in words.iter().enumerate() {
            let is_positive = self.positive_words.contains(*word);
            let is_negative = self.negative_words.contains(*word);

            if !is_positive && !is_negative {
                continue;
            }

            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            if is_positive {
                score += if negated { -1 } else { 1 };
            } else {
                score += if negated { 1 } else { -1 };
            }
        }

        score as f64
    }

    fn analyze_headline(&self, headline: &Headline) -> f64 {
        // Titles count double
        let mut total = self.analyze_text(&headline.title) * 2.0;
        if let Some(desc) = &headline.description {
            total += self.analyze_text(desc);
        }
        total
    }

    /// Average headline sentiment mapped onto [0, 100], 50 when there is no news.
    pub fn score_headlines(&self, headlines: &[Headline]) -> f64 {
        if headlines.is_empty() {
            return NEUTRAL_NEWS_SCORE;
        }

        let avg = headlines.iter().map(|h| self.analyze_headline(h)).sum::<f64>()
            / headlines.len() as f64;

        // Smooth saturation keeps the result strictly inside (0, 100)
        let squashed = avg / (avg.abs() + HALF_SATURATION);
        NEUTRAL_NEWS_SCORE + 50.0 * squashed
    }
}

impl Default for SentimentAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Supplies raw headlines for a ticker (scraper, news API, fixture, ...)
#[async_trait]
pub trait HeadlineSource: Send + Sync {
    async fn headlines(&self, ticker: &str) -> Result<Vec<Headline>, AnalysisError>;
}

/// Adapts a [`HeadlineSource`] into a [`NewsSentimentProvider`]
pub struct HeadlineNewsProvider<S> {
    source: S,
    engine: SentimentAnalysisEngine,
}

impl<S: HeadlineSource> HeadlineNewsProvider<S> {
    pub fn new(source: S) -> Self {
        Self { source, engine: SentimentAnalysisEngine::new() }
    }
}

#[async_trait]
impl<S: HeadlineSource> NewsSentimentProvider for HeadlineNewsProvider<S> {
    async fn news_score(&self, ticker: &str) -> Result<f64, AnalysisError> {
        let headlines = self.source.headlines(ticker).await?;
        let score = self.engine.score_headlines(&headlines);
        tracing::debug!("News score for {} from {} headlines: {:.1}", ticker, headlines.len(), score);
        Ok(score)
    }
}

/// In-memory headlines keyed by upper-case ticker. A ticker without an
/// entry has no news, which scores neutral.
#[derive(Debug, Clone, Default)]
pub struct StaticHeadlineSource {
    headlines: HashMap<String, Vec<Headline>>,
}

impl StaticHeadlineSource {
    pub fn new(headlines: HashMap<String, Vec<Headline>>) -> Self {
        let headlines = headlines
            .into_iter()
            .map(|(ticker, items)| (ticker.trim().to_uppercase(), items))
            .collect();
        Self { headlines }
    }

    /// Parse a JSON object of `{"TICKER": [{"title": .., "description": ..}]}`
    pub fn from_json_str(raw: &str) -> Result<Self, AnalysisError> {
        let headlines: HashMap<String, Vec<Headline>> = serde_json::from_str(raw)
            .map_err(|e| AnalysisError::InvalidData(format!("news file: {}", e)))?;
        Ok(Self::new(headlines))
    }

    pub fn len(&self) -> usize {
        self.headlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headlines.is_empty()
    }
}

#[async_trait]
impl HeadlineSource for StaticHeadlineSource {
    async fn headlines(&self, ticker: &str) -> Result<Vec<Headline>, AnalysisError> {
        Ok(self
            .headlines
            .get(&ticker.trim().to_uppercase())
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_news_score() {
        assert_eq!(normalize_news_score(None), 50.0);
        assert_eq!(normalize_news_score(Some(140.0)), 100.0);
        assert_eq!(normalize_news_score(Some(-3.0)), 0.0);
        assert_eq!(normalize_news_score(Some(f64::NAN)), 50.0);
        assert_eq!(normalize_news_score(Some(65.0)), 65.0);
    }

    #[test]
    fn test_no_headlines_is_neutral() {
        let engine = SentimentAnalysisEngine::new();
        assert_eq!(engine.score_headlines(&[]), 50.0);
    }

    #[test]
    fn test_positive_and_negative_headlines() {
        let engine = SentimentAnalysisEngine::new();

        let good = engine.score_headlines(&[Headline::new("Shares surge after record profit, analysts upgrade")]);
        assert!(good > 75.0);
        assert!(good < 100.0);

        let bad = engine.score_headlines(&[Headline::new("Stock plunge deepens as lawsuit and investigation weigh")]);
        assert!(bad < 25.0);
        assert!(bad > 0.0);
    }

    #[test]
    fn test_negation_flips_polarity() {
        let engine = SentimentAnalysisEngine::new();
        assert_eq!(engine.analyze_text("results were not strong"), -1.0);
        assert_eq!(engine.analyze_text("results were strong"), 1.0);
    }

    #[test]
    fn test_description_counts_once() {
        let engine = SentimentAnalysisEngine::new();
        let headline = Headline {
            title: "Quarterly update".to_string(),
            description: Some("Guidance raised on robust demand".to_string()),
        };
        assert_eq!(engine.analyze_headline(&headline), 2.0);
    }

    struct FixedSource(Vec<Headline>);

    #[async_trait]
    impl HeadlineSource for FixedSource {
        async fn headlines(&self, _ticker: &str) -> Result<Vec<Headline>, AnalysisError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_headline_provider_scores() {
        let provider = HeadlineNewsProvider::new(FixedSource(vec![Headline::new("Strong rebound")]));
        let score = provider.news_score("ACME").await.unwrap();
        assert!(score > 50.0);
    }

    #[tokio::test]
    async fn test_static_source_from_json() {
        let source = StaticHeadlineSource::from_json_str(
            r#"{"acme": [{"title": "Acme shares surge on record profit"}, {"title": "Upgrade", "description": "Analysts bullish"}]}"#,
        )
        .unwrap();
        assert_eq!(source.len(), 1);

        let headlines = source.headlines("ACME").await.unwrap();
        assert_eq!(headlines.len(), 2);
        assert_eq!(headlines[1].description.as_deref(), Some("Analysts bullish"));

        let provider = HeadlineNewsProvider::new(source);
        assert!(provider.news_score("acme").await.unwrap() > 50.0);
        assert_eq!(provider.news_score("IBM").await.unwrap(), 50.0);
    }

    #[test]
    fn test_static_source_rejects_bad_json() {
        assert!(matches!(
            StaticHeadlineSource::from_json_str("[1, 2"),
            Err(AnalysisError::InvalidData(_))
        ));
    }
}
