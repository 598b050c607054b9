use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::ingest::short_commitment;
use crate::models::{CommunityInsight, MoodEntry, RiskLevel, RiskLevelSummary, TrendSummary};

pub fn summarize_by_risk(entries: &[MoodEntry]) -> Vec<RiskLevelSummary> {
    let mut map: std::collections::BTreeMap<RiskLevel, (usize, i32)> =
        std::collections::BTreeMap::new();

    for entry in entries {
        let slot = map.entry(entry.risk_level).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += entry.score.value();
    }

    // Highest risk first.
    map.into_iter()
        .rev()
        .map(|(risk_level, (count, total_score))| RiskLevelSummary {
            risk_level,
            count,
            avg_score: if count == 0 {
                0.0
            } else {
                total_score as f64 / count as f64
            },
        })
        .collect()
}

pub fn build_report(
    user_commitment: &str,
    since: DateTime<Utc>,
    summary: &TrendSummary,
    entries: &[MoodEntry],
    community: Option<&CommunityInsight>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Mood Trend Report");
    let _ = writeln!(
        output,
        "Generated for {} over {} days (entries since {})",
        short_commitment(user_commitment),
        summary.period_days,
        since.date_naive()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Trend");

    if !summary.sufficient_data {
        let _ = writeln!(
            output,
            "Only {} entries in this window; trend and volatility need at least two.",
            summary.entries_count
        );
    } else {
        let _ = writeln!(
            output,
            "- Direction: {} (slope {:+.2} per entry)",
            summary.direction.as_str(),
            summary.slope
        );
        if let Some(average) = summary.average_mood {
            let _ = writeln!(
                output,
                "- Average mood: {:.1} across {} entries",
                average, summary.entries_count
            );
        }
        let _ = writeln!(
            output,
            "- Volatility: {} (std dev {:.2})",
            summary.volatility_level.as_str(),
            summary.standard_deviation
        );
        if let (Some(best), Some(worst)) =
            (summary.day_patterns.best_day, summary.day_patterns.worst_day)
        {
            let _ = writeln!(output, "- Best day: {best}, hardest day: {worst}");
        }
        if let (Some(best), Some(worst)) = (
            summary.hour_patterns.best_hour,
            summary.hour_patterns.worst_hour,
        ) {
            let _ = writeln!(
                output,
                "- Best hour: {best:02}:00 UTC, hardest hour: {worst:02}:00 UTC"
            );
        }
        if let Some(progress) = &summary.progress {
            let _ = writeln!(
                output,
                "- Change between halves of the window: {:+.1}",
                progress.improvement_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Risk");
    let _ = writeln!(
        output,
        "- Level: {} ({} flagged entries, low mood rate {:.0}%)",
        summary.risk.level,
        summary.risk.total_crisis_episodes,
        summary.risk.low_mood_rate * 100.0
    );

    for level in summarize_by_risk(entries) {
        let _ = writeln!(
            output,
            "- {}: {} entries (avg score {:.1})",
            level.risk_level, level.count, level.avg_score
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recommendations");
    for recommendation in &summary.recommendations {
        let _ = writeln!(output, "- {recommendation}");
    }

    let mut recent_entries = entries.to_vec();
    recent_entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Entries");

    if recent_entries.is_empty() {
        let _ = writeln!(output, "No entries recorded for this window.");
    } else {
        for entry in recent_entries.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} score {} ({}): {}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.score,
                entry.risk_level,
                entry.description
            );
        }
    }

    if let Some(community) = community {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Community Snapshot");
        if community.sufficient_data {
            if let Some(average) = community.average_mood {
                let _ = writeln!(
                    output,
                    "- {} active users, average mood {:.1}",
                    community.active_user_count, average
                );
            }
            for insight in &community.insights {
                let _ = writeln!(output, "- {insight}");
            }
        } else {
            let _ = writeln!(output, "Not enough community data for this window.");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, CommunityConfig};
    use crate::models::MoodScore;
    use crate::{community, trends};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn entries(scores: &[(i32, RiskLevel)]) -> Vec<MoodEntry> {
        let start = Utc.with_ymd_and_hms(2026, 2, 2, 18, 0, 0).unwrap();
        scores
            .iter()
            .enumerate()
            .map(|(day, (score, risk_level))| MoodEntry {
                id: Uuid::new_v4(),
                user_commitment: "9f2c4e81d0b7a3c6".to_string(),
                score: MoodScore::new(*score).unwrap(),
                description: format!("day {day}"),
                triggers: None,
                notes: None,
                timestamp: start + Duration::days(day as i64),
                crisis_flag: *risk_level == RiskLevel::High,
                risk_level: *risk_level,
            })
            .collect()
    }

    #[test]
    fn risk_summary_lists_highest_first() {
        let entries = entries(&[
            (6, RiskLevel::Minimal),
            (2, RiskLevel::High),
            (4, RiskLevel::Medium),
            (8, RiskLevel::Minimal),
        ]);
        let summaries = summarize_by_risk(&entries);
        assert_eq!(summaries[0].risk_level, RiskLevel::High);
        assert_eq!(summaries.last().unwrap().risk_level, RiskLevel::Minimal);
        assert_eq!(summaries.last().unwrap().count, 2);
        assert!((summaries.last().unwrap().avg_score - 7.0).abs() < 1e-9);
    }

    #[test]
    fn report_includes_trend_and_recent_entries() {
        let config = AnalysisConfig::default();
        let entries = entries(&[
            (3, RiskLevel::Low),
            (4, RiskLevel::Low),
            (6, RiskLevel::Minimal),
            (7, RiskLevel::Minimal),
        ]);
        let summary = trends::analyze(&entries, 30, &config.trend).unwrap();
        let insight = community::aggregate(&entries, &CommunityConfig::default());
        let since = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();

        let report = build_report("9f2c4e81d0b7a3c6", since, &summary, &entries, Some(&insight));
        assert!(report.starts_with("# Mood Trend Report"));
        assert!(report
            .contains("Generated for 9f2c4e81... over 30 days (entries since 2026-01-10)"));
        assert!(report.contains("- Direction: improving"));
        assert!(report.contains("## Recent Entries"));
        assert!(report.contains("score 7 (MINIMAL): day 3"));
        assert!(report.contains("Not enough community data for this window."));
        assert!(!report.contains("9f2c4e81d0b7a3c6"));
    }

    #[test]
    fn report_handles_empty_window() {
        let config = AnalysisConfig::default();
        let summary = trends::analyze(&[], 7, &config.trend).unwrap();
        let since = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();

        let report = build_report("abc", since, &summary, &[], None);
        assert!(report.contains("Only 0 entries in this window"));
        assert!(report.contains("No entries recorded for this window."));
        assert!(report.contains("Please log more mood entries"));
        assert!(!report.contains("## Community Snapshot"));
    }
}
