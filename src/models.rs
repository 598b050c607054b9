use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AnalysisError, Result};

/// A mood rating on the 1-10 scale. Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct MoodScore(u8);

impl MoodScore {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 10;

    pub fn new(value: i32) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(AnalysisError::ScoreOutOfRange(value))
        }
    }

    pub fn value(self) -> i32 {
        i32::from(self.0)
    }
}

impl TryFrom<i32> for MoodScore {
    type Error = AnalysisError;

    fn try_from(value: i32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<MoodScore> for i32 {
    fn from(score: MoodScore) -> Self {
        score.value()
    }
}

impl fmt::Display for MoodScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Minimal => "MINIMAL",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = AnalysisError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "MINIMAL" => Ok(RiskLevel::Minimal),
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            _ => Err(AnalysisError::InvalidRiskLevel(value.to_string())),
        }
    }
}

/// A stored mood submission. Rows are written once and never updated.
#[derive(Debug, Clone, Serialize)]
pub struct MoodEntry {
    pub id: Uuid,
    pub user_commitment: String,
    pub score: MoodScore,
    pub description: String,
    pub triggers: Option<String>,
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub crisis_flag: bool,
    pub risk_level: RiskLevel,
}

/// A normalized and assessed submission, ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewMoodEntry {
    pub user_commitment: String,
    pub score: MoodScore,
    pub description: String,
    pub triggers: Option<String>,
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub crisis_flag: bool,
    pub risk_level: RiskLevel,
    pub source_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordMatch {
    pub category: String,
    pub phrase: String,
    /// Whether the category counts as crisis language rather than general distress.
    pub crisis: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SentimentPolarity {
    /// Normalized sum of valences, in [-1, 1].
    pub compound: f64,
    /// Mean valence of the matched terms, in [-1, 1].
    pub mean: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub needs_intervention: bool,
    pub matched_keywords: Vec<KeywordMatch>,
    pub sentiment_polarity: SentimentPolarity,
    pub recommendations: Vec<String>,
    pub crisis_resources: Vec<String>,
}

impl RiskAssessment {
    pub fn crisis_match_count(&self) -> usize {
        self.matched_keywords.iter().filter(|m| m.crisis).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

impl TrendDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendDirection::Improving => "improving",
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl VolatilityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            VolatilityLevel::Low => "low",
            VolatilityLevel::Medium => "medium",
            VolatilityLevel::High => "high",
            VolatilityLevel::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayAverage {
    pub day: Weekday,
    pub average: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DayPatterns {
    pub best_day: Option<Weekday>,
    pub worst_day: Option<Weekday>,
    pub day_averages: Vec<WeekdayAverage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HourPatterns {
    pub best_hour: Option<u32>,
    pub worst_hour: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrisisTrend {
    Increasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub level: RiskLevel,
    pub crisis_rate: f64,
    pub low_mood_rate: f64,
    pub recent_crisis_rate: f64,
    pub earlier_crisis_rate: f64,
    pub recent_trend: CrisisTrend,
    pub total_crisis_episodes: usize,
    pub peak_entry_risk: Option<RiskLevel>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressMetrics {
    pub improvement_score: f64,
    pub early_period_avg: f64,
    pub recent_period_avg: f64,
    pub consistency_score: f64,
    pub engagement_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendSummary {
    pub period_days: i64,
    pub entries_count: usize,
    pub sufficient_data: bool,
    pub average_mood: Option<f64>,
    pub min_score: Option<i32>,
    pub max_score: Option<i32>,
    pub direction: TrendDirection,
    pub slope: f64,
    pub correlation: f64,
    pub volatility_level: VolatilityLevel,
    pub standard_deviation: f64,
    pub day_patterns: DayPatterns,
    pub hour_patterns: HourPatterns,
    pub risk: RiskSummary,
    pub progress: Option<ProgressMetrics>,
    pub recommendations: Vec<String>,
}

/// Entry counts and mean score per stored risk level.
#[derive(Debug, Clone)]
pub struct RiskLevelSummary {
    pub risk_level: RiskLevel,
    pub count: usize,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodBucket {
    Crisis,
    Low,
    Moderate,
    Good,
    Excellent,
}

impl MoodBucket {
    pub fn for_score(score: MoodScore) -> Self {
        match score.value() {
            8..=10 => MoodBucket::Excellent,
            6..=7 => MoodBucket::Good,
            4..=5 => MoodBucket::Moderate,
            2..=3 => MoodBucket::Low,
            _ => MoodBucket::Crisis,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MoodDistribution {
    pub crisis: usize,
    pub low: usize,
    pub moderate: usize,
    pub good: usize,
    pub excellent: usize,
}

impl MoodDistribution {
    pub fn record(&mut self, score: MoodScore) {
        match MoodBucket::for_score(score) {
            MoodBucket::Crisis => self.crisis += 1,
            MoodBucket::Low => self.low += 1,
            MoodBucket::Moderate => self.moderate += 1,
            MoodBucket::Good => self.good += 1,
            MoodBucket::Excellent => self.excellent += 1,
        }
    }

    pub fn count(&self, bucket: MoodBucket) -> usize {
        match bucket {
            MoodBucket::Crisis => self.crisis,
            MoodBucket::Low => self.low,
            MoodBucket::Moderate => self.moderate,
            MoodBucket::Good => self.good,
            MoodBucket::Excellent => self.excellent,
        }
    }

    /// Total entries reconstructed from the bucket counts.
    pub fn total(&self) -> usize {
        self.crisis + self.low + self.moderate + self.good + self.excellent
    }

    pub fn rate(&self, bucket: MoodBucket) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.count(bucket) as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommunityInsight {
    pub active_user_count: usize,
    pub total_entries: usize,
    pub sufficient_data: bool,
    pub average_mood: Option<f64>,
    pub mood_distribution: MoodDistribution,
    pub crisis_rate: f64,
    pub flagged_rate: f64,
    pub insights: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_score_rejects_out_of_range_values() {
        assert_eq!(MoodScore::new(0), Err(AnalysisError::ScoreOutOfRange(0)));
        assert_eq!(MoodScore::new(11), Err(AnalysisError::ScoreOutOfRange(11)));
        assert_eq!(MoodScore::new(1).map(MoodScore::value), Ok(1));
        assert_eq!(MoodScore::new(10).map(MoodScore::value), Ok(10));
    }

    #[test]
    fn mood_score_deserializes_through_validation() {
        let score: MoodScore = serde_json::from_str("7").unwrap();
        assert_eq!(score.value(), 7);
        assert!(serde_json::from_str::<MoodScore>("12").is_err());
    }

    #[test]
    fn risk_levels_order_by_severity() {
        assert!(RiskLevel::Minimal < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert_eq!("high".parse::<RiskLevel>().unwrap(), RiskLevel::High);
        assert!("UNKNOWN".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn buckets_cover_the_whole_scale() {
        let mut distribution = MoodDistribution::default();
        for value in 1..=10 {
            distribution.record(MoodScore::new(value).unwrap());
        }
        assert_eq!(distribution.crisis, 1);
        assert_eq!(distribution.low, 2);
        assert_eq!(distribution.moderate, 2);
        assert_eq!(distribution.good, 2);
        assert_eq!(distribution.excellent, 3);
        assert_eq!(distribution.total(), 10);
        assert!((distribution.rate(MoodBucket::Excellent) - 0.3).abs() < 1e-9);
    }
}
