use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};

use crate::config::TrendConfig;
use crate::error::{AnalysisError, Result};
use crate::models::{
    CrisisTrend, DayPatterns, HourPatterns, MoodEntry, ProgressMetrics, RiskLevel, RiskSummary,
    TrendDirection, TrendSummary, VolatilityLevel, WeekdayAverage,
};

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn validate_period(period_days: i64, config: &TrendConfig) -> Result<()> {
    if (1..=config.max_period_days).contains(&period_days) {
        Ok(())
    } else {
        Err(AnalysisError::InvalidPeriod {
            days: period_days,
            max: config.max_period_days,
        })
    }
}

/// Start of the `[now - period_days, now]` window.
pub fn window_start(
    now: DateTime<Utc>,
    period_days: i64,
    config: &TrendConfig,
) -> Result<DateTime<Utc>> {
    validate_period(period_days, config)?;
    Ok(now - Duration::days(period_days))
}

/// Summarize one user's entries from a single window.
///
/// Fewer than two entries yields a degraded summary: stable direction, zero
/// slope, unknown volatility and `sufficient_data = false`.
pub fn analyze(
    entries: &[MoodEntry],
    period_days: i64,
    config: &TrendConfig,
) -> Result<TrendSummary> {
    validate_period(period_days, config)?;

    let mut ordered: Vec<&MoodEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.timestamp);

    let scores: Vec<f64> = ordered.iter().map(|e| f64::from(e.score.value())).collect();
    let sufficient_data = scores.len() >= 2;

    let (direction, slope, correlation) = if sufficient_data {
        let (slope, correlation) = regression(&scores);
        (classify_slope(slope, config), slope, correlation)
    } else {
        (TrendDirection::Stable, 0.0, 0.0)
    };

    let standard_deviation = if sufficient_data {
        sample_std_dev(&scores)
    } else {
        0.0
    };
    let volatility_level = if sufficient_data {
        classify_volatility(standard_deviation, config)
    } else {
        VolatilityLevel::Unknown
    };

    let risk = risk_summary(&ordered, config);
    let progress = sufficient_data.then(|| progress(&scores, standard_deviation, config));
    let recommendations = if sufficient_data {
        recommendations(direction, risk.level, volatility_level, config)
    } else {
        config.recommendations.insufficient_data.clone()
    };

    tracing::debug!(
        "Analyzed {} entries over {} days: {} (slope {:.3})",
        scores.len(),
        period_days,
        direction.as_str(),
        slope
    );

    Ok(TrendSummary {
        period_days,
        entries_count: scores.len(),
        sufficient_data,
        average_mood: mean(&scores),
        min_score: ordered.iter().map(|e| e.score.value()).min(),
        max_score: ordered.iter().map(|e| e.score.value()).max(),
        direction,
        slope,
        correlation,
        volatility_level,
        standard_deviation,
        day_patterns: day_patterns(&ordered),
        hour_patterns: hour_patterns(&ordered),
        risk,
        progress,
        recommendations,
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Least-squares slope of score against entry index, plus Pearson correlation.
fn regression(scores: &[f64]) -> (f64, f64) {
    let n = scores.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = scores.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (index, score) in scores.iter().enumerate() {
        let dx = index as f64 - mean_x;
        let dy = score - mean_y;
        covariance += dx * dy;
        variance_x += dx * dx;
        variance_y += dy * dy;
    }

    if variance_x == 0.0 {
        return (0.0, 0.0);
    }
    let slope = covariance / variance_x;
    let correlation = if variance_y == 0.0 {
        0.0
    } else {
        covariance / (variance_x * variance_y).sqrt()
    };
    (slope, correlation)
}

fn classify_slope(slope: f64, config: &TrendConfig) -> TrendDirection {
    if slope > config.slope_threshold {
        TrendDirection::Improving
    } else if slope < -config.slope_threshold {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

fn sample_std_dev(scores: &[f64]) -> f64 {
    if scores.len() < 2 {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance =
        scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (scores.len() - 1) as f64;
    variance.sqrt()
}

fn classify_volatility(std_dev: f64, config: &TrendConfig) -> VolatilityLevel {
    if std_dev > config.volatility_high {
        VolatilityLevel::High
    } else if std_dev > config.volatility_medium {
        VolatilityLevel::Medium
    } else {
        VolatilityLevel::Low
    }
}

/// Index and mean of the highest and lowest groups. Ties keep the lowest index.
fn extremes(groups: &[(f64, usize)]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, f64)> = None;
    let mut worst: Option<(usize, f64)> = None;

    for (index, (total, count)) in groups.iter().enumerate() {
        if *count == 0 {
            continue;
        }
        let average = total / *count as f64;
        if best.map_or(true, |(_, value)| average > value) {
            best = Some((index, average));
        }
        if worst.map_or(true, |(_, value)| average < value) {
            worst = Some((index, average));
        }
    }

    Some((best?.0, worst?.0))
}

fn day_patterns(entries: &[&MoodEntry]) -> DayPatterns {
    let mut groups = [(0.0, 0usize); 7];
    for entry in entries {
        let slot = &mut groups[entry.timestamp.weekday().num_days_from_monday() as usize];
        slot.0 += f64::from(entry.score.value());
        slot.1 += 1;
    }

    let day_averages = groups
        .iter()
        .enumerate()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(index, (total, count))| WeekdayAverage {
            day: WEEKDAYS[index],
            average: total / *count as f64,
            count: *count,
        })
        .collect();

    let extremes = extremes(&groups);
    DayPatterns {
        best_day: extremes.map(|(best, _)| WEEKDAYS[best]),
        worst_day: extremes.map(|(_, worst)| WEEKDAYS[worst]),
        day_averages,
    }
}

fn hour_patterns(entries: &[&MoodEntry]) -> HourPatterns {
    let mut groups = [(0.0, 0usize); 24];
    for entry in entries {
        let slot = &mut groups[entry.timestamp.hour() as usize];
        slot.0 += f64::from(entry.score.value());
        slot.1 += 1;
    }

    let extremes = extremes(&groups);
    HourPatterns {
        best_hour: extremes.map(|(best, _)| best as u32),
        worst_hour: extremes.map(|(_, worst)| worst as u32),
    }
}

fn rate(matching: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        matching as f64 / total as f64
    }
}

fn risk_summary(entries: &[&MoodEntry], config: &TrendConfig) -> RiskSummary {
    let total = entries.len();
    let flagged = entries.iter().filter(|e| e.crisis_flag).count();
    let low_mood = entries
        .iter()
        .filter(|e| e.score.value() <= config.low_mood_score)
        .count();

    let crisis_rate = rate(flagged, total);
    let low_mood_rate = rate(low_mood, total);

    let (recent_crisis_rate, earlier_crisis_rate) = match entries.last() {
        Some(latest) => {
            let cutoff = latest.timestamp - Duration::days(config.recent_window_days);
            let (recent, earlier): (Vec<&&MoodEntry>, Vec<&&MoodEntry>) =
                entries.iter().partition(|e| e.timestamp >= cutoff);
            (
                rate(recent.iter().filter(|e| e.crisis_flag).count(), recent.len()),
                rate(earlier.iter().filter(|e| e.crisis_flag).count(), earlier.len()),
            )
        }
        None => (0.0, 0.0),
    };

    let level = if crisis_rate > config.high_crisis_rate
        || recent_crisis_rate > config.high_recent_crisis_rate
    {
        RiskLevel::High
    } else if crisis_rate > config.medium_crisis_rate
        || low_mood_rate > config.medium_low_mood_rate
    {
        RiskLevel::Medium
    } else if low_mood_rate > config.low_low_mood_rate {
        RiskLevel::Low
    } else {
        RiskLevel::Minimal
    };

    RiskSummary {
        level,
        crisis_rate,
        low_mood_rate,
        recent_crisis_rate,
        earlier_crisis_rate,
        recent_trend: if recent_crisis_rate > earlier_crisis_rate {
            CrisisTrend::Increasing
        } else {
            CrisisTrend::Stable
        },
        total_crisis_episodes: flagged,
        peak_entry_risk: entries.iter().map(|e| e.risk_level).max(),
    }
}

fn progress(scores: &[f64], std_dev: f64, config: &TrendConfig) -> ProgressMetrics {
    let midpoint = scores.len() / 2;
    let early_period_avg = mean(&scores[..midpoint]).unwrap_or(0.0);
    let recent_period_avg = mean(&scores[midpoint..]).unwrap_or(0.0);

    ProgressMetrics {
        improvement_score: recent_period_avg - early_period_avg,
        early_period_avg,
        recent_period_avg,
        consistency_score: 1.0 / (std_dev + 1.0),
        engagement_score: (scores.len() as f64 / config.engagement_target_entries as f64).min(1.0),
    }
}

/// Table lookup over direction, risk level and volatility.
fn recommendations(
    direction: TrendDirection,
    risk: RiskLevel,
    volatility: VolatilityLevel,
    config: &TrendConfig,
) -> Vec<String> {
    let table = &config.recommendations;
    let mut picked = match direction {
        TrendDirection::Improving => table.improving.clone(),
        TrendDirection::Declining => table.declining.clone(),
        TrendDirection::Stable => table.stable.clone(),
    };

    match risk {
        RiskLevel::High => picked.extend(table.high_risk.iter().cloned()),
        RiskLevel::Medium => picked.extend(table.medium_risk.iter().cloned()),
        RiskLevel::Low | RiskLevel::Minimal => {}
    }

    if volatility == VolatilityLevel::High {
        picked.extend(table.high_volatility.iter().cloned());
    }

    picked
}
