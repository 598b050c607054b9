use std::collections::HashSet;

use crate::config::CommunityConfig;
use crate::models::{CommunityInsight, MoodBucket, MoodDistribution, MoodEntry};

/// Population-level statistics over every user's entries in a window.
///
/// Only counts and rates leave this function; commitments are used to count
/// distinct users and are never copied into the result.
pub fn aggregate(entries: &[MoodEntry], config: &CommunityConfig) -> CommunityInsight {
    let mut distribution = MoodDistribution::default();
    let mut users: HashSet<&str> = HashSet::new();
    let mut total_score = 0i64;
    let mut flagged = 0usize;

    for entry in entries {
        distribution.record(entry.score);
        users.insert(entry.user_commitment.as_str());
        total_score += i64::from(entry.score.value());
        if entry.crisis_flag {
            flagged += 1;
        }
    }

    let total_entries = entries.len();
    let average_mood = if total_entries == 0 {
        None
    } else {
        Some(total_score as f64 / total_entries as f64)
    };
    let flagged_rate = if total_entries == 0 {
        0.0
    } else {
        flagged as f64 / total_entries as f64
    };

    let sufficient_data = total_entries >= config.min_entries;
    let insights = match average_mood {
        Some(average) if sufficient_data => insight_text(average, flagged_rate, config),
        _ => Vec::new(),
    };

    tracing::debug!(
        "Aggregated {} community entries from {} users",
        total_entries,
        users.len()
    );

    CommunityInsight {
        active_user_count: users.len(),
        total_entries,
        sufficient_data,
        average_mood,
        mood_distribution: distribution,
        crisis_rate: distribution.rate(MoodBucket::Crisis),
        flagged_rate,
        insights,
    }
}

fn insight_text(average: f64, flagged_rate: f64, config: &CommunityConfig) -> Vec<String> {
    let mut insights = Vec::new();

    if average >= config.positive_average {
        insights.push(config.positive_text.clone());
    } else if average <= config.supportive_average {
        insights.push(config.supportive_text.clone());
    } else {
        insights.push(config.mixed_text.clone());
    }

    if flagged_rate > config.elevated_flagged_rate {
        insights.push(config.elevated_text.clone());
    } else if flagged_rate < config.stable_flagged_rate {
        insights.push(config.stable_text.clone());
    }

    insights
}
