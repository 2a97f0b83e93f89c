use axum::Json;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use uuid::Uuid;

use super::AppState;
use super::dto::{StatsResponse, VoiceResponse};
use crate::db::Question;
use crate::error::{LangomineError, Result};
use crate::services::VoiceUpload;

const UPLOAD_FIELD: &str = "file";
const DEFAULT_FILENAME: &str = "upload";

/// Malformed ids can never match a record, so they get the same 404 as unknown ones
fn parse_voice_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| LangomineError::voice_not_found(raw))
}

fn request_country(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Body-limit overruns keep their 413; every other multipart failure is a bad request
fn upload_error(status: StatusCode, detail: String) -> LangomineError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        LangomineError::PayloadTooLarge(detail)
    } else {
        LangomineError::Validation(detail)
    }
}

/// Pull the `file` part out of the form; other parts are ignored
async fn read_upload(mut multipart: Multipart) -> Result<VoiceUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| upload_error(e.status(), e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| upload_error(e.status(), e.body_text()))?;
        return Ok(VoiceUpload::new(bytes, filename));
    }

    Err(LangomineError::Validation(format!(
        "multipart field '{}' is required",
        UPLOAD_FIELD
    )))
}

pub async fn create_voice(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<VoiceResponse>)> {
    let multipart = multipart.map_err(|e| LangomineError::Validation(e.body_text()))?;
    let upload = read_upload(multipart).await?;
    let country = request_country(&headers, &state.country_header);

    let record = state.voices.submit(upload, country).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

pub async fn get_voice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<VoiceResponse>> {
    let record = state.voices.fetch(parse_voice_id(&id)?).await?;
    Ok(Json(record.into()))
}

pub async fn delete_voice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.voices.remove(parse_voice_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let total_duration_s = state.stats.total_active_duration().await?;
    Ok(Json(StatsResponse { total_duration_s }))
}

pub async fn list_questions(State(state): State<AppState>) -> Result<Json<Vec<Question>>> {
    Ok(Json(state.questions.list().await?))
}
