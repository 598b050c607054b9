//! Analysis configuration.
//!
//! Every keyword list, weight, threshold and canned text table used by the
//! pipeline lives here. The value is built once at startup (defaults, or a
//! TOML file overriding any subset of fields) and borrowed by each call.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::models::{MoodScore, RiskLevel};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub crisis: CrisisConfig,
    pub sentiment: SentimentConfig,
    pub trend: TrendConfig,
    pub community: CommunityConfig,
}

impl AnalysisConfig {
    /// Load from a TOML file, or fall back to the built-in defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                let parsed: AnalysisConfig = toml::from_str(&raw)
                    .with_context(|| format!("failed to parse config {}", path.display()))?;
                tracing::info!("Loaded analysis config from {}", path.display());
                parsed
            }
            None => AnalysisConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.crisis.validate()?;
        self.trend.validate()?;
        self.community.validate()
    }
}

/// A named group of phrases matched against free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordCategory {
    pub name: String,
    pub weight: f64,
    /// Crisis categories force at least MEDIUM risk; the rest only add weight.
    pub crisis: bool,
    pub phrases: Vec<String>,
}

impl KeywordCategory {
    fn new(name: &str, weight: f64, crisis: bool, phrases: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            weight,
            crisis,
            phrases: strings(phrases),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierTable {
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub low: Vec<String>,
    pub minimal: Vec<String>,
}

impl TierTable {
    pub fn for_level(&self, level: RiskLevel) -> &[String] {
        match level {
            RiskLevel::High => &self.high,
            RiskLevel::Medium => &self.medium,
            RiskLevel::Low => &self.low,
            RiskLevel::Minimal => &self.minimal,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrisisConfig {
    pub categories: Vec<KeywordCategory>,
    /// Added once per sentence holding two or more keyword matches.
    pub sentence_bonus: f64,
    pub compound_weight: f64,
    pub polarity_weight: f64,
    /// Scores below the pivot add `score_weight` per point to the composite.
    pub score_pivot: i32,
    pub score_weight: f64,
    pub high_threshold: f64,
    pub medium_threshold: f64,
    pub low_threshold: f64,
    /// Scores at or below this are at least MEDIUM.
    pub low_score_floor: i32,
    /// Crisis language together with a score at or below this is HIGH.
    pub escalation_score: i32,
    /// MEDIUM assessments need this many crisis matches to require intervention.
    pub intervention_match_count: usize,
    pub recommendations: TierTable,
    pub crisis_resources: Vec<String>,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            categories: vec![
                KeywordCategory::new(
                    "self_harm",
                    1.0,
                    true,
                    &[
                        "suicide",
                        "kill myself",
                        "end it all",
                        "take my life",
                        "better off dead",
                        "no reason to live",
                        "hurt myself",
                        "self harm",
                        "cut myself",
                        "want to die",
                    ],
                ),
                KeywordCategory::new(
                    "hopelessness",
                    0.6,
                    true,
                    &[
                        "hopeless",
                        "worthless",
                        "give up",
                        "can't go on",
                        "no way out",
                        "nobody cares",
                        "dark thoughts",
                        "pointless",
                        "i'm a burden",
                    ],
                ),
                KeywordCategory::new(
                    "substance",
                    0.6,
                    true,
                    &[
                        "overdose",
                        "overdosing",
                        "relapsed",
                        "using again",
                        "drinking to forget",
                        "drink myself to sleep",
                        "numb the pain",
                        "getting high to cope",
                    ],
                ),
                KeywordCategory::new(
                    "distress",
                    0.3,
                    false,
                    &[
                        "sad",
                        "depressed",
                        "down",
                        "anxious",
                        "worried",
                        "stressed",
                        "overwhelmed",
                        "tired of everything",
                    ],
                ),
            ],
            sentence_bonus: 0.5,
            compound_weight: 0.4,
            polarity_weight: 0.2,
            score_pivot: 5,
            score_weight: 0.1,
            high_threshold: 0.75,
            medium_threshold: 0.45,
            low_threshold: 0.25,
            low_score_floor: 2,
            escalation_score: 3,
            intervention_match_count: 2,
            recommendations: TierTable {
                high: strings(&[
                    "Immediate professional intervention recommended",
                    "Contact a crisis helpline now",
                    "Reach out to a trusted person right now",
                ]),
                medium: strings(&[
                    "Consider scheduling time with a counsellor",
                    "Connect with supportive peers",
                    "Use grounding or mindfulness techniques",
                ]),
                low: strings(&[
                    "Maintain self-care habits",
                    "Track your mood regularly",
                    "Stay connected with friends or support groups",
                ]),
                minimal: strings(&[
                    "Keep up your positive routines",
                    "Continue monitoring your wellbeing",
                ]),
            },
            crisis_resources: strings(&[
                "988 Suicide & Crisis Lifeline (US): call or text 988",
                "Crisis Text Line (US): text HOME to 741741",
                "AASRA (India): 022-27546669",
                "iCall (India): 9152987821",
                "Emergency services: 911 (US) / 112 (EU, India)",
            ]),
        }
    }
}

impl CrisisConfig {
    fn validate(&self) -> Result<()> {
        if !self.categories.iter().any(|c| c.crisis) {
            return Err(config_error(
                "at least one crisis keyword category is required",
            ));
        }
        let blank = |phrase: &String| phrase.trim().is_empty();
        if let Some(category) = self
            .categories
            .iter()
            .find(|c| c.phrases.is_empty() || c.phrases.iter().any(blank))
        {
            return Err(config_error(format!(
                "keyword category '{}' has no phrases or a blank phrase",
                category.name
            )));
        }
        if !(0.0 < self.low_threshold
            && self.low_threshold < self.medium_threshold
            && self.medium_threshold < self.high_threshold
            && self.high_threshold <= 1.0)
        {
            return Err(config_error(
                "crisis thresholds must satisfy 0 < low < medium < high <= 1",
            ));
        }
        let score_cutoffs = [
            ("low_score_floor", self.low_score_floor),
            ("escalation_score", self.escalation_score),
        ];
        for (name, value) in score_cutoffs {
            if MoodScore::new(value).is_err() {
                return Err(config_error(format!("{name} must be within 1-10")));
            }
        }
        let levels = [
            RiskLevel::Minimal,
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
        ];
        for level in levels {
            if self.recommendations.for_level(level).is_empty() {
                return Err(config_error(format!("no recommendations for {level} risk")));
            }
        }
        if self.crisis_resources.is_empty() {
            return Err(config_error("crisis_resources must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Extra or overriding valences (-4 to 4) keyed by lower-case token.
    pub valence: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendRecommendations {
    pub improving: Vec<String>,
    pub declining: Vec<String>,
    pub stable: Vec<String>,
    pub high_risk: Vec<String>,
    pub medium_risk: Vec<String>,
    pub high_volatility: Vec<String>,
    pub insufficient_data: Vec<String>,
}

/// Upper bound for any configured day window, well inside chrono's range.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub max_period_days: i64,
    /// Score points per entry before a trend counts as improving or declining.
    pub slope_threshold: f64,
    pub volatility_medium: f64,
    pub volatility_high: f64,
    pub low_mood_score: i32,
    pub recent_window_days: i64,
    pub high_crisis_rate: f64,
    pub high_recent_crisis_rate: f64,
    pub medium_crisis_rate: f64,
    pub medium_low_mood_rate: f64,
    pub low_low_mood_rate: f64,
    pub engagement_target_entries: usize,
    pub recommendations: TrendRecommendations,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            max_period_days: 365,
            slope_threshold: 0.1,
            volatility_medium: 1.0,
            volatility_high: 2.0,
            low_mood_score: 3,
            recent_window_days: 7,
            high_crisis_rate: 0.3,
            high_recent_crisis_rate: 0.4,
            medium_crisis_rate: 0.1,
            medium_low_mood_rate: 0.4,
            low_low_mood_rate: 0.2,
            engagement_target_entries: 30,
            recommendations: TrendRecommendations {
                improving: strings(&[
                    "Great progress! Continue with current strategies",
                    "Consider sharing your success with the community",
                ]),
                declining: strings(&[
                    "Consider reaching out for additional support",
                    "Review recent changes that might be affecting your mood",
                ]),
                stable: strings(&["Your mood appears stable - maintain current routine"]),
                high_risk: strings(&[
                    "High risk detected - please consider professional support",
                    "Crisis resources: 988 (US) or local emergency services",
                ]),
                medium_risk: strings(&[
                    "Increased support recommended - engage with community",
                    "Consider scheduling regular check-ins with support network",
                ]),
                high_volatility: strings(&[
                    "Your mood has been swinging a lot - note triggers alongside each entry",
                ]),
                insufficient_data: strings(&["Please log more mood entries for detailed analysis"]),
            },
        }
    }
}

impl TrendConfig {
    fn validate(&self) -> Result<()> {
        if !(1..=MAX_WINDOW_DAYS).contains(&self.max_period_days) {
            return Err(config_error(format!(
                "max_period_days must be within 1-{MAX_WINDOW_DAYS}"
            )));
        }
        if self.slope_threshold < 0.0 {
            return Err(config_error("slope_threshold must not be negative"));
        }
        if !(0.0 <= self.volatility_medium && self.volatility_medium < self.volatility_high) {
            return Err(config_error(
                "volatility cutoffs must satisfy 0 <= medium < high",
            ));
        }
        if !(1..=MAX_WINDOW_DAYS).contains(&self.recent_window_days) {
            return Err(config_error(format!(
                "recent_window_days must be within 1-{MAX_WINDOW_DAYS}"
            )));
        }
        if self.engagement_target_entries == 0 {
            return Err(config_error("engagement_target_entries must be at least 1"));
        }
        let table = &self.recommendations;
        if table.improving.is_empty()
            || table.declining.is_empty()
            || table.stable.is_empty()
            || table.insufficient_data.is_empty()
        {
            return Err(config_error(
                "every trend direction needs at least one recommendation",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityConfig {
    pub min_entries: usize,
    pub positive_average: f64,
    pub supportive_average: f64,
    pub elevated_flagged_rate: f64,
    pub stable_flagged_rate: f64,
    pub positive_text: String,
    pub supportive_text: String,
    pub mixed_text: String,
    pub elevated_text: String,
    pub stable_text: String,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            min_entries: 10,
            positive_average: 6.0,
            supportive_average: 4.0,
            elevated_flagged_rate: 0.15,
            stable_flagged_rate: 0.05,
            positive_text: "Community mood is generally positive this week".to_string(),
            supportive_text: "Community may benefit from additional support resources".to_string(),
            mixed_text: "Community mood is moderate - mixed experiences reported".to_string(),
            elevated_text: "Higher than usual crisis indicators - community support is important"
                .to_string(),
            stable_text: "Low crisis indicators - community appears stable".to_string(),
        }
    }
}

impl CommunityConfig {
    fn validate(&self) -> Result<()> {
        if self.supportive_average >= self.positive_average {
            return Err(config_error(
                "supportive_average must be below positive_average",
            ));
        }
        if self.stable_flagged_rate >= self.elevated_flagged_rate {
            return Err(config_error(
                "stable_flagged_rate must be below elevated_flagged_rate",
            ));
        }
        Ok(())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn config_error(message: impl Into<String>) -> AnalysisError {
    AnalysisError::Config(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn load_without_path_uses_defaults() {
        let config = AnalysisConfig::load(None).unwrap();
        assert_eq!(config.trend.max_period_days, 365);
        assert_eq!(config.crisis.categories.len(), 4);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[trend]\nslope_threshold = 0.25\n\n[community]\nmin_entries = 3\n\n\
             [sentiment.valence]\nmeh = -0.5"
        )
        .unwrap();

        let config = AnalysisConfig::load(Some(file.path())).unwrap();
        assert!((config.trend.slope_threshold - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.trend.low_mood_score, 3);
        assert_eq!(config.community.min_entries, 3);
        assert_eq!(config.sentiment.valence.get("meh"), Some(&-0.5));
        assert_eq!(config.crisis.low_score_floor, 2);
    }

    #[test]
    fn example_config_parses_and_validates() {
        let config: AnalysisConfig =
            toml::from_str(include_str!("../mood-pulse.example.toml")).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.crisis.crisis_resources.len(), 3);
        assert_eq!(config.crisis.categories.len(), 4);
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let mut config = AnalysisConfig::default();
        config.crisis.medium_threshold = 0.9;
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));
    }

    #[test]
    fn rejects_blank_keyword_phrases() {
        let mut config = AnalysisConfig::default();
        config.crisis.categories.push(KeywordCategory {
            name: "blank".to_string(),
            weight: 1.0,
            crisis: true,
            phrases: vec!["  ".to_string()],
        });
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        let mut config = AnalysisConfig::default();
        config.crisis.categories[0].phrases.push(String::new());
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));
    }

    #[test]
    fn rejects_day_windows_beyond_bound() {
        let mut config = AnalysisConfig::default();
        config.trend.max_period_days = MAX_WINDOW_DAYS + 1;
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        let mut config = AnalysisConfig::default();
        config.trend.recent_window_days = i64::MAX;
        assert!(matches!(config.validate(), Err(AnalysisError::Config(_))));

        let mut config = AnalysisConfig::default();
        config.trend.max_period_days = MAX_WINDOW_DAYS;
        config.trend.recent_window_days = MAX_WINDOW_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_missing_crisis_resources() {
        let mut config = AnalysisConfig::default();
        config.crisis.crisis_resources.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = AnalysisConfig::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
