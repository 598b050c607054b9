use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{AnalysisError, Result};
use crate::models::{MoodScore, NewMoodEntry, RiskAssessment};
use crate::risk::CrisisDetector;

/// Width of the `user_commitment` column.
pub const MAX_COMMITMENT_LEN: usize = 64;

/// A raw mood check-in as submitted by a user.
#[derive(Debug, Clone, Deserialize)]
pub struct MoodSubmission {
    pub score: i32,
    #[serde(default)]
    pub description: String,
    pub triggers: Option<String>,
    pub notes: Option<String>,
}

/// Validate and normalize a submission, run crisis detection over its text
/// and return the record to persist alongside the assessment.
pub fn prepare_entry(
    detector: &CrisisDetector<'_>,
    user_commitment: &str,
    submission: MoodSubmission,
    timestamp: DateTime<Utc>,
    source_key: Option<String>,
) -> Result<(NewMoodEntry, RiskAssessment)> {
    let user_commitment = user_commitment.trim();
    if user_commitment.is_empty() {
        return Err(AnalysisError::EmptyCommitment);
    }
    let len = user_commitment.chars().count();
    if len > MAX_COMMITMENT_LEN {
        return Err(AnalysisError::CommitmentTooLong {
            len,
            max: MAX_COMMITMENT_LEN,
        });
    }

    let score = MoodScore::new(submission.score)?;
    let description = normalize_text(&submission.description);
    let triggers = optional_text(submission.triggers.as_deref());
    let notes = optional_text(submission.notes.as_deref());

    let text = analysis_text(&description, triggers.as_deref(), notes.as_deref());
    let assessment = detector.assess_score(&text, score);

    if assessment.needs_intervention {
        tracing::warn!(
            "Crisis intervention needed for user {}: risk level {}",
            short_commitment(user_commitment),
            assessment.risk_level
        );
    }

    let entry = NewMoodEntry {
        user_commitment: user_commitment.to_string(),
        score,
        description,
        triggers,
        notes,
        timestamp,
        crisis_flag: assessment.needs_intervention,
        risk_level: assessment.risk_level,
        source_key,
    };

    Ok((entry, assessment))
}

pub fn analysis_text(description: &str, triggers: Option<&str>, notes: Option<&str>) -> String {
    [Some(description), triggers, notes]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_text).filter(|value| !value.is_empty())
}

/// First eight characters of a commitment, for logs and reports.
pub fn short_commitment(commitment: &str) -> String {
    let prefix: String = commitment.chars().take(8).collect();
    if commitment.chars().count() > 8 {
        format!("{prefix}...")
    } else {
        prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::models::RiskLevel;

    fn submission(score: i32, description: &str) -> MoodSubmission {
        MoodSubmission {
            score,
            description: description.to_string(),
            triggers: None,
            notes: None,
        }
    }

    #[test]
    fn normalizes_text_fields() {
        let config = AnalysisConfig::default();
        let detector = CrisisDetector::new(&config).unwrap();
        let raw = MoodSubmission {
            score: 6,
            description: "  long   day\n at work ".to_string(),
            triggers: Some("   ".to_string()),
            notes: Some(" slept  badly ".to_string()),
        };

        let (entry, _) = prepare_entry(&detector, " abc123 ", raw, Utc::now(), None).unwrap();
        assert_eq!(entry.user_commitment, "abc123");
        assert_eq!(entry.description, "long day at work");
        assert_eq!(entry.triggers, None);
        assert_eq!(entry.notes.as_deref(), Some("slept badly"));
        assert_eq!(entry.score.value(), 6);
    }

    #[test]
    fn flags_entries_that_need_intervention() {
        let config = AnalysisConfig::default();
        let detector = CrisisDetector::new(&config).unwrap();
        let raw = MoodSubmission {
            score: 5,
            description: "rough week".to_string(),
            triggers: Some("exams".to_string()),
            notes: Some("sometimes I want to die".to_string()),
        };

        let (entry, assessment) =
            prepare_entry(&detector, "commitment", raw, Utc::now(), None).unwrap();
        assert!(assessment.needs_intervention);
        assert!(entry.crisis_flag);
        assert_eq!(entry.risk_level, RiskLevel::High);
    }

    #[test]
    fn rejects_invalid_submissions() {
        let config = AnalysisConfig::default();
        let detector = CrisisDetector::new(&config).unwrap();

        let err = prepare_entry(&detector, "c", submission(0, "x"), Utc::now(), None).unwrap_err();
        assert_eq!(err, AnalysisError::ScoreOutOfRange(0));

        let err =
            prepare_entry(&detector, "  ", submission(5, "x"), Utc::now(), None).unwrap_err();
        assert_eq!(err, AnalysisError::EmptyCommitment);
    }

    #[test]
    fn rejects_commitments_wider_than_column() {
        let config = AnalysisConfig::default();
        let detector = CrisisDetector::new(&config).unwrap();

        let fits = "a".repeat(MAX_COMMITMENT_LEN);
        assert!(prepare_entry(&detector, &fits, submission(5, "x"), Utc::now(), None).is_ok());

        let oversized = "a".repeat(MAX_COMMITMENT_LEN + 1);
        let err = prepare_entry(&detector, &oversized, submission(5, "x"), Utc::now(), None)
            .unwrap_err();
        assert_eq!(
            err,
            AnalysisError::CommitmentTooLong {
                len: 65,
                max: MAX_COMMITMENT_LEN
            }
        );
    }

    #[test]
    fn analysis_text_skips_missing_parts() {
        assert_eq!(analysis_text("calm", None, Some("walked")), "calm walked");
        assert_eq!(analysis_text("", Some("noise"), None), "noise");
        assert_eq!(analysis_text("", None, None), "");
    }

    #[test]
    fn short_commitment_truncates() {
        assert_eq!(short_commitment("0123456789abcdef"), "01234567...");
        assert_eq!(short_commitment("abc"), "abc");
    }
}
