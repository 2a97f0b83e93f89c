//! Voice record store
//!
//! Records are never hard-deleted. Soft-deleting clears the audio reference,
//! transcript and word timings and stamps `deleted_at`; every read used by the
//! API filters on `deleted_at IS NULL`.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{NewVoice, VoiceRecord, VoiceState};
use crate::db::{StoreError, StoreResult};

const SELECT_COLUMNS: &str = "SELECT id, duration_s, file, language, text, words, request_country, \
                              analysis, created_at, deleted_at FROM voices";

/// Result of a successful soft-delete
#[derive(Debug, Clone)]
pub struct SoftDeleted {
    /// The record after redaction
    pub record: VoiceRecord,
    /// Blob reference the record held before it was cleared
    pub released_blob: Option<String>,
}

#[derive(sqlx::FromRow)]
struct VoiceRow {
    id: String,
    duration_s: i64,
    file: Option<String>,
    language: Option<String>,
    text: Option<String>,
    words: Option<String>,
    request_country: Option<String>,
    analysis: Option<String>,
    created_at: String,
    deleted_at: Option<String>,
}

impl TryFrom<VoiceRow> for VoiceRecord {
    type Error = StoreError;

    fn try_from(row: VoiceRow) -> StoreResult<Self> {
        let corrupt = |column: &'static str, reason: String| StoreError::Corrupt {
            id: row.id.clone(),
            column,
            reason,
        };

        let id = Uuid::parse_str(&row.id).map_err(|e| corrupt("id", e.to_string()))?;
        let duration_seconds =
            u64::try_from(row.duration_s).map_err(|e| corrupt("duration_s", e.to_string()))?;
        let word_timings = decode_json(row.words.as_deref()).map_err(|e| corrupt("words", e))?;
        let analysis = decode_json(row.analysis.as_deref()).map_err(|e| corrupt("analysis", e))?;
        let created_at = parse_timestamp(&row.created_at).map_err(|e| corrupt("created_at", e))?;
        let deleted_at = row
            .deleted_at
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(|e| corrupt("deleted_at", e))?;

        Ok(VoiceRecord {
            id,
            duration_seconds,
            audio_blob_ref: row.file,
            language: row.language,
            transcript_text: row.text,
            word_timings,
            request_country: row.request_country,
            analysis,
            created_at,
            state: VoiceState::from_column(deleted_at),
        })
    }
}

fn decode_json<T: DeserializeOwned>(raw: Option<&str>) -> Result<Option<T>, String> {
    raw.map(serde_json::from_str).transpose().map_err(|e| e.to_string())
}

fn encode_json<T: Serialize>(value: Option<&T>) -> StoreResult<Option<String>> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StoreError::Corrupt {
            id: String::new(),
            column: "json",
            reason: e.to_string(),
        })
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| e.to_string())
}

/// Repository for the `voices` table
#[derive(Clone, Debug)]
pub struct VoiceRepository {
    pool: SqlitePool,
}

impl VoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new active record. Id and `created_at` are assigned here.
    pub async fn create(&self, voice: NewVoice) -> StoreResult<VoiceRecord> {
        let id = Uuid::new_v4();
        // Stored at microsecond precision; keep the returned value identical to a re-read
        let created_at = Utc::now().trunc_subsecs(6);
        let duration = i64::try_from(voice.duration_seconds).map_err(|e| StoreError::Corrupt {
            id: id.to_string(),
            column: "duration_s",
            reason: e.to_string(),
        })?;

        sqlx::query(
            "INSERT INTO voices (id, duration_s, file, language, text, words, request_country, \
             analysis, created_at, deleted_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(id.to_string())
        .bind(duration)
        .bind(voice.audio_blob_ref.as_deref())
        .bind(voice.language.as_deref())
        .bind(voice.transcript_text.as_deref())
        .bind(encode_json(voice.word_timings.as_ref())?)
        .bind(voice.request_country.as_deref())
        .bind(encode_json(voice.analysis.as_ref())?)
        .bind(format_timestamp(created_at))
        .execute(&self.pool)
        .await?;

        tracing::debug!("Inserted voice {}", id);
        Ok(VoiceRecord {
            id,
            duration_seconds: voice.duration_seconds,
            audio_blob_ref: voice.audio_blob_ref,
            language: voice.language,
            transcript_text: voice.transcript_text,
            word_timings: voice.word_timings,
            request_country: voice.request_country,
            analysis: voice.analysis,
            created_at,
            state: VoiceState::Active,
        })
    }

    /// Active record by id; `None` when absent or soft-deleted.
    pub async fn get_active(&self, id: Uuid) -> StoreResult<Option<VoiceRecord>> {
        let row: Option<VoiceRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ? AND deleted_at IS NULL"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        row.map(VoiceRecord::try_from).transpose()
    }

    /// Record by id regardless of state. Not used by API reads.
    pub async fn find(&self, id: Uuid) -> StoreResult<Option<VoiceRecord>> {
        let row: Option<VoiceRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(VoiceRecord::try_from).transpose()
    }

    /// Move an active record to `Deleted`, clearing audio, transcript and words.
    ///
    /// Returns `None` without touching anything when the id is unknown or already deleted.
    /// The conditional update makes the Active -> Deleted transition happen at most once.
    /// It is the first statement of the transaction so the write lock is taken before any
    /// read; a read-first transaction can fail to upgrade under WAL with `SQLITE_BUSY`.
    pub async fn soft_delete(&self, id: Uuid) -> StoreResult<Option<SoftDeleted>> {
        let mut tx = self.pool.begin().await?;
        let key = id.to_string();

        // RETURNING yields `file` as written by this statement, which leaves it untouched
        let stamped: Option<(Option<String>,)> = sqlx::query_as(
            "UPDATE voices SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL RETURNING file",
        )
        .bind(format_timestamp(Utc::now()))
        .bind(&key)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((released_blob,)) = stamped else {
            return Ok(None);
        };

        sqlx::query("UPDATE voices SET file = NULL, text = NULL, words = NULL WHERE id = ?")
            .bind(&key)
            .execute(&mut *tx)
            .await?;

        let row: VoiceRow = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(&key)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!("Soft-deleted voice {}", id);
        Ok(Some(SoftDeleted {
            record: VoiceRecord::try_from(row)?,
            released_blob,
        }))
    }

    /// Sum of `duration_seconds` over active records; 0 when there are none.
    pub async fn sum_active_durations(&self) -> StoreResult<u64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(duration_s), 0) FROM voices WHERE deleted_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    pub async fn count_active(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM voices WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn count_all(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM voices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
