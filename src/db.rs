use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::ingest::{self, MoodSubmission};
use crate::models::{MoodEntry, MoodScore, NewMoodEntry};
use crate::risk::CrisisDetector;

const ENTRY_COLUMNS: &str = "id, user_commitment, score, description, triggers, notes, \
     recorded_at, crisis_flag, risk_level";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Insert an assessed entry. Returns false when its source key was already imported.
pub async fn insert_entry(pool: &PgPool, entry: &NewMoodEntry) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO mood_pulse.mood_entries
        (id, user_commitment, score, description, triggers, notes,
         recorded_at, crisis_flag, risk_level, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&entry.user_commitment)
    .bind(entry.score.value())
    .bind(&entry.description)
    .bind(&entry.triggers)
    .bind(&entry.notes)
    .bind(entry.timestamp)
    .bind(entry.crisis_flag)
    .bind(entry.risk_level.as_str())
    .bind(&entry.source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// One user's entries within `[since, until]`, oldest first.
pub async fn fetch_entries(
    pool: &PgPool,
    user_commitment: &str,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> anyhow::Result<Vec<MoodEntry>> {
    let query = format!(
        "SELECT {ENTRY_COLUMNS} FROM mood_pulse.mood_entries \
         WHERE user_commitment = $1 AND recorded_at >= $2 AND recorded_at <= $3 \
         ORDER BY recorded_at ASC"
    );

    let rows = sqlx::query(&query)
        .bind(user_commitment)
        .bind(since)
        .bind(until)
        .fetch_all(pool)
        .await?;

    let entries = rows.iter().map(entry_from_row).collect::<anyhow::Result<Vec<_>>>()?;
    tracing::debug!("Fetched {} entries for one user", entries.len());
    Ok(entries)
}

/// Every user's entries within `[since, until]`, oldest first.
pub async fn fetch_all_entries(
    pool: &PgPool,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> anyhow::Result<Vec<MoodEntry>> {
    let query = format!(
        "SELECT {ENTRY_COLUMNS} FROM mood_pulse.mood_entries \
         WHERE recorded_at >= $1 AND recorded_at <= $2 \
         ORDER BY recorded_at ASC"
    );

    let rows = sqlx::query(&query)
        .bind(since)
        .bind(until)
        .fetch_all(pool)
        .await?;

    let entries = rows.iter().map(entry_from_row).collect::<anyhow::Result<Vec<_>>>()?;
    tracing::debug!("Fetched {} community entries", entries.len());
    Ok(entries)
}

fn entry_from_row(row: &PgRow) -> anyhow::Result<MoodEntry> {
    let score: i32 = row.try_get("score")?;
    let risk_level: String = row.try_get("risk_level")?;

    Ok(MoodEntry {
        id: row.try_get("id")?,
        user_commitment: row.try_get("user_commitment")?,
        score: MoodScore::new(score)?,
        description: row.try_get("description")?,
        triggers: row.try_get("triggers")?,
        notes: row.try_get("notes")?,
        timestamp: row.try_get("recorded_at")?,
        crisis_flag: row.try_get("crisis_flag")?,
        risk_level: risk_level.parse()?,
    })
}

pub async fn seed(pool: &PgPool, detector: &CrisisDetector<'_>) -> anyhow::Result<usize> {
    let users: [(&str, &str, &[(i32, &str)]); 3] = [
        (
            "improving",
            "9f2c4e81d0b7a3c65e18f4d2b9a07c3e5d6f1a2b8c4e9d0f7a3b5c1e2d4f6a8b",
            &[
                (3, "Couldn't get out of bed, feeling down"),
                (4, "A little better after a walk"),
                (4, "Stressed about the deadline"),
                (5, "Talked to a friend, felt calmer"),
                (6, "Good session with my counsellor"),
                (6, "Slept well for once"),
                (7, "Productive day and relaxed evening"),
                (8, "Feeling hopeful about next week"),
            ],
        ),
        (
            "declining",
            "4b8e2d6f0a1c3e5b7d9f2a4c6e8b0d1f3a5c7e9b2d4f6a8c0e1b3d5f7a9c2e4d",
            &[
                (7, "Nice weekend with family"),
                (6, "Work was fine"),
                (6, "A bit tired"),
                (5, "Worried about money"),
                (4, "Anxious and not sleeping"),
                (3, "Feeling worthless at work"),
                (3, "Everything feels pointless lately"),
                (2, "Hopeless, I can't go on like this"),
            ],
        ),
        (
            "steady",
            "c7a1e3b5d9f2a4c6e8b0d2f4a6c8e0b1d3f5a7c9e2b4d6f8a0c1e3b5d7f9a2c4",
            &[
                (6, "Regular day"),
                (7, "Went to the gym"),
                (6, "Quiet evening"),
                (6, "Okay, nothing special"),
                (7, "Coffee with a colleague"),
                (6, "Fine overall"),
            ],
        ),
    ];

    let now = Utc::now();
    let mut inserted = 0usize;

    for (label, commitment, check_ins) in users {
        let count = check_ins.len() as i64;
        for (index, (score, description)) in check_ins.iter().enumerate() {
            let offset = count - index as i64;
            let timestamp = now - Duration::days(offset) - Duration::hours((index % 3) as i64 * 4);
            let submission = MoodSubmission {
                score: *score,
                description: description.to_string(),
                triggers: None,
                notes: None,
            };
            let (entry, _) = ingest::prepare_entry(
                detector,
                commitment,
                submission,
                timestamp,
                Some(format!("seed-{label}-{index:02}")),
            )?;

            if insert_entry(pool, &entry).await? {
                inserted += 1;
            }
        }
    }

    Ok(inserted)
}

pub async fn import_csv(
    pool: &PgPool,
    detector: &CrisisDetector<'_>,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        user_commitment: String,
        score: i32,
        description: String,
        triggers: Option<String>,
        notes: Option<String>,
        recorded_at: DateTime<Utc>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("malformed CSV row on line {line}"))?;

        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let submission = MoodSubmission {
            score: row.score,
            description: row.description,
            triggers: row.triggers,
            notes: row.notes,
        };
        let (entry, _) = ingest::prepare_entry(
            detector,
            &row.user_commitment,
            submission,
            row.recorded_at,
            Some(source_key),
        )
        .with_context(|| format!("invalid mood entry on line {line}"))?;

        if insert_entry(pool, &entry).await? {
            inserted += 1;
        }
    }

    tracing::info!("Imported {} entries from {}", inserted, csv_path.display());
    Ok(inserted)
}
