use regex::{Regex, RegexBuilder};

use crate::config::{AnalysisConfig, CrisisConfig};
use crate::error::{AnalysisError, Result};
use crate::models::{KeywordMatch, MoodScore, RiskAssessment, RiskLevel, SentimentPolarity};
use crate::sentiment::SentimentScorer;

struct CompiledCategory {
    name: String,
    weight: f64,
    crisis: bool,
    pattern: Regex,
}

/// Classifies the crisis risk of a single mood submission.
///
/// Keyword patterns are compiled once from the borrowed config; `assess` is
/// then a pure function of its inputs.
pub struct CrisisDetector<'a> {
    config: &'a CrisisConfig,
    categories: Vec<CompiledCategory>,
    sentiment: SentimentScorer,
}

impl<'a> CrisisDetector<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Result<Self> {
        let categories = config
            .crisis
            .categories
            .iter()
            .map(|category| -> Result<CompiledCategory> {
                Ok(CompiledCategory {
                    name: category.name.clone(),
                    weight: category.weight,
                    crisis: category.crisis,
                    pattern: compile(&category.name, &category.phrases)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config: &config.crisis,
            categories,
            sentiment: SentimentScorer::new(&config.sentiment),
        })
    }

    /// Assess free text together with a raw 1-10 score.
    pub fn assess(&self, text: &str, score: i32) -> Result<RiskAssessment> {
        let score = MoodScore::new(score)?;
        Ok(self.assess_score(text, score))
    }

    pub fn assess_score(&self, text: &str, score: MoodScore) -> RiskAssessment {
        let cleaned = clean(text);
        let (keyword_score, matched_keywords) = self.scan(&cleaned);
        let polarity = self.sentiment.score(&cleaned);
        let composite = self.composite(keyword_score, polarity, score);

        let crisis_matches = matched_keywords.iter().filter(|m| m.crisis).count();
        let risk_level = self.tier(composite, crisis_matches, score);
        let needs_intervention = risk_level == RiskLevel::High
            || (risk_level == RiskLevel::Medium
                && crisis_matches >= self.config.intervention_match_count);

        let crisis_resources = if risk_level == RiskLevel::High {
            self.config.crisis_resources.clone()
        } else {
            Vec::new()
        };

        tracing::debug!(
            "Assessed score {} with {} keyword matches: {} ({:.3})",
            score,
            matched_keywords.len(),
            risk_level,
            composite
        );

        RiskAssessment {
            risk_level,
            risk_score: round3(composite),
            needs_intervention,
            matched_keywords,
            sentiment_polarity: polarity,
            recommendations: self.config.recommendations.for_level(risk_level).to_vec(),
            crisis_resources,
        }
    }

    fn scan(&self, text: &str) -> (f64, Vec<KeywordMatch>) {
        let mut matches = Vec::new();
        let mut base = 0.0;

        for category in &self.categories {
            for found in category.pattern.find_iter(text) {
                base += category.weight;
                matches.push(KeywordMatch {
                    category: category.name.clone(),
                    phrase: found.as_str().split_whitespace().collect::<Vec<_>>().join(" "),
                    crisis: category.crisis,
                });
            }
        }

        let dense_sentences = text
            .split(['.', '!', '?'])
            .map(str::trim)
            .filter(|sentence| !sentence.is_empty())
            .filter(|sentence| self.count_crisis_matches(sentence) >= 2)
            .count();
        let bonus = dense_sentences as f64 * self.config.sentence_bonus;

        ((base + bonus).min(1.0), matches)
    }

    fn count_crisis_matches(&self, sentence: &str) -> usize {
        self.categories
            .iter()
            .filter(|category| category.crisis)
            .map(|category| category.pattern.find_iter(sentence).count())
            .sum()
    }

    fn composite(&self, keyword_score: f64, polarity: SentimentPolarity, score: MoodScore) -> f64 {
        let compound_part = (-polarity.compound).max(0.0) * self.config.compound_weight;
        let polarity_part = (-polarity.mean).max(0.0) * self.config.polarity_weight;
        let score_part =
            f64::from((self.config.score_pivot - score.value()).max(0)) * self.config.score_weight;

        (keyword_score + compound_part + polarity_part + score_part).min(1.0)
    }

    fn tier(&self, composite: f64, crisis_matches: usize, score: MoodScore) -> RiskLevel {
        let mut level = if composite >= self.config.high_threshold {
            RiskLevel::High
        } else if composite >= self.config.medium_threshold {
            RiskLevel::Medium
        } else if composite >= self.config.low_threshold {
            RiskLevel::Low
        } else {
            RiskLevel::Minimal
        };

        // Only crisis language can reach HIGH.
        if crisis_matches == 0 {
            level = level.min(RiskLevel::Medium);
        }
        if crisis_matches > 0 || score.value() <= self.config.low_score_floor {
            level = level.max(RiskLevel::Medium);
        }
        if crisis_matches > 0 && score.value() <= self.config.escalation_score {
            level = RiskLevel::High;
        }
        level
    }
}

/// Lower-case, normalize apostrophes and collapse runs of whitespace.
fn clean(text: &str) -> String {
    text.to_lowercase()
        .replace('\u{2019}', "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// One case-insensitive alternation per category. Phrase tokens may be
/// separated by one to three whitespace characters.
fn compile(name: &str, phrases: &[String]) -> Result<Regex> {
    let alternatives: Vec<String> = phrases
        .iter()
        .map(|phrase| clean(phrase))
        .filter(|phrase| !phrase.is_empty())
        .map(|phrase| regex::escape(&phrase).replace(' ', r"\s{1,3}"))
        .collect();
    if alternatives.is_empty() {
        return Err(AnalysisError::Config(format!(
            "keyword category '{name}' has no usable phrases"
        )));
    }

    let pattern = format!(r"\b(?:{})\b", alternatives.join("|"));
    Ok(RegexBuilder::new(&pattern).case_insensitive(true).build()?)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeywordCategory;

    fn assess(text: &str, score: i32) -> RiskAssessment {
        let config = AnalysisConfig::default();
        let detector = CrisisDetector::new(&config).unwrap();
        detector.assess(text, score).unwrap()
    }

    #[test]
    fn self_harm_language_is_high_risk() {
        let assessment = assess("I want to end it all", 4);
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert!(assessment.needs_intervention);
        assert!(!assessment.crisis_resources.is_empty());
        assert_eq!(assessment.matched_keywords[0].category, "self_harm");
        assert_eq!(assessment.matched_keywords[0].phrase, "end it all");
    }

    #[test]
    fn rejects_scores_outside_scale() {
        let config = AnalysisConfig::default();
        let detector = CrisisDetector::new(&config).unwrap();
        assert_eq!(
            detector.assess("fine", 0).unwrap_err(),
            AnalysisError::ScoreOutOfRange(0)
        );
        assert_eq!(
            detector.assess("fine", 11).unwrap_err(),
            AnalysisError::ScoreOutOfRange(11)
        );
    }

    #[test]
    fn empty_text_only_intervenes_on_very_low_scores() {
        for score in 1..=10 {
            let assessment = assess("", score);
            if assessment.needs_intervention {
                assert!(score <= 2, "score {score} should not need intervention");
            }
            assert!(!assessment.recommendations.is_empty());
            assert!(assessment.matched_keywords.is_empty());
        }
    }

    #[test]
    fn very_low_score_alone_is_at_least_medium() {
        assert!(assess("", 1).risk_level >= RiskLevel::Medium);
        assert!(assess("", 2).risk_level >= RiskLevel::Medium);
        assert!(assess("", 3).risk_level < RiskLevel::Medium);
        assert_eq!(assess("", 9).risk_level, RiskLevel::Minimal);
    }

    #[test]
    fn crisis_keywords_force_medium_for_every_score() {
        let config = AnalysisConfig::default();
        let detector = CrisisDetector::new(&config).unwrap();
        for category in config.crisis.categories.iter().filter(|c| c.crisis) {
            for phrase in &category.phrases {
                for score in 1..=10 {
                    let text = format!("Today {phrase} came up in my head.");
                    let assessment = detector.assess(&text, score).unwrap();
                    assert!(
                        assessment.risk_level >= RiskLevel::Medium,
                        "'{phrase}' at score {score} was {}",
                        assessment.risk_level
                    );
                }
            }
        }
    }

    #[test]
    fn crisis_language_with_low_score_escalates_to_high() {
        let assessment = assess("I relapsed last week", 3);
        assert_eq!(assessment.risk_level, RiskLevel::High);
        assert!(assessment.needs_intervention);
    }

    #[test]
    fn single_crisis_match_at_medium_does_not_intervene() {
        let assessment = assess("I relapsed last week", 10);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert!(!assessment.needs_intervention);
        assert!(assessment.crisis_resources.is_empty());
    }

    #[test]
    fn multiple_crisis_matches_at_medium_intervene() {
        let mut config = AnalysisConfig::default();
        config.crisis.categories = vec![KeywordCategory {
            name: "substance".to_string(),
            weight: 0.2,
            crisis: true,
            phrases: vec!["relapsed".to_string(), "using again".to_string()],
        }];
        let detector = CrisisDetector::new(&config).unwrap();

        let assessment = detector.assess("I relapsed. Using again.", 9).unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.crisis_match_count(), 2);
        assert!(assessment.needs_intervention);
    }

    #[test]
    fn distress_terms_are_not_crisis_keywords() {
        let assessment = assess("Feeling a bit sad and stressed", 6);
        assert_eq!(assessment.crisis_match_count(), 0);
        assert_eq!(assessment.matched_keywords.len(), 2);
        assert!(!assessment.needs_intervention);
    }

    #[test]
    fn distress_words_alone_never_reach_high() {
        let texts = [
            "sad and anxious",
            "Sad, anxious, stressed and lonely. So sad and depressed.",
        ];
        for text in texts {
            for score in 1..=10 {
                let assessment = assess(text, score);
                assert!(
                    assessment.risk_level <= RiskLevel::Medium,
                    "'{text}' at score {score} was {}",
                    assessment.risk_level
                );
                assert!(!assessment.needs_intervention);
                assert!(assessment.crisis_resources.is_empty());
            }
        }
    }

    #[test]
    fn crisis_language_outranks_distress_language() {
        for score in 1..=10 {
            let crisis = assess("hopeless", score).risk_level;
            assert!(crisis >= assess("sad and anxious", score).risk_level);
            assert!(crisis >= RiskLevel::Medium);
        }
    }

    #[test]
    fn blank_keyword_category_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.crisis.categories.push(KeywordCategory {
            name: "blank".to_string(),
            weight: 1.0,
            crisis: true,
            phrases: vec!["  ".to_string()],
        });
        assert!(matches!(
            CrisisDetector::new(&config),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn matching_ignores_case_and_extra_spacing() {
        let assessment = assess("i  WANT   to die", 7);
        assert_eq!(assessment.matched_keywords.len(), 1);
        assert_eq!(assessment.matched_keywords[0].phrase, "want to die");
        assert!(assess("I can\u{2019}t go on", 7).crisis_match_count() == 1);
    }

    #[test]
    fn matching_respects_word_boundaries() {
        let assessment = assess("Finished the download, feeling okay", 7);
        assert!(assessment.matched_keywords.is_empty());
    }

    #[test]
    fn combined_signals_never_lower_the_tier() {
        let text = "everything feels pointless";
        for score in 1..=10 {
            let combined = assess(text, score).risk_level;
            assert!(combined >= assess("", score).risk_level);
            assert!(combined >= assess(text, 10).risk_level);
        }
    }

    #[test]
    fn lower_scores_never_lower_the_tier() {
        let text = "tired and worried about work";
        let mut previous = assess(text, 10).risk_level;
        for score in (1..=9).rev() {
            let current = assess(text, score).risk_level;
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn positive_entry_is_minimal() {
        let assessment = assess("Had a great day with friends, feeling grateful", 9);
        assert_eq!(assessment.risk_level, RiskLevel::Minimal);
        assert!(assessment.sentiment_polarity.compound > 0.0);
        assert_eq!(
            assessment.recommendations,
            AnalysisConfig::default().crisis.recommendations.minimal
        );
    }
}
