//! Typing Job Handlers

use axum::{
    extract::{Multipart, Path, State},
    Json,
};

use crate::application::dto::request::StartTypingForm;
use crate::application::dto::response::{StartJobResponse, StopJobResponse};
use crate::application::services::{CreateJobDto, TypingError};
use crate::domain::TypingJob;
use crate::shared::error::AppError;
use crate::shared::validation::parse_lines;
use crate::startup::AppState;

fn map_typing_error(e: TypingError) -> AppError {
    match e {
        TypingError::NotFound => AppError::NotFound("Job not found".into()),
        e => AppError::BadRequest(e.to_string()),
    }
}

/// Read the multipart form fields this endpoint understands
async fn read_form(mut multipart: Multipart) -> Result<StartTypingForm, AppError> {
    let invalid = |e: axum::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("Invalid form data: {}", e.body_text()))
    };

    let mut form = StartTypingForm::default();
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "token" => form.token = Some(field.text().await.map_err(invalid)?),
            "channel_id" => form.channel_id = Some(field.text().await.map_err(invalid)?),
            "delay" => form.delay = Some(field.text().await.map_err(invalid)?),
            "file" => form.file = Some(field.bytes().await.map_err(invalid)?.to_vec()),
            _ => {}
        }
    }
    Ok(form)
}

/// Start a typing job from an uploaded text file
pub async fn start_typing(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<StartJobResponse>, AppError> {
    let form = read_form(multipart).await?;

    let file = form
        .file
        .ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;
    let content = String::from_utf8(file)
        .map_err(|_| AppError::BadRequest("File must be UTF-8 text".into()))?;
    let lines = parse_lines(&content);
    if lines.is_empty() {
        return Err(AppError::BadRequest("File is empty".into()));
    }

    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let (Some(token), Some(channel_id)) = (non_empty(form.token), non_empty(form.channel_id)) else {
        return Err(AppError::BadRequest("Missing token or channel_id".into()));
    };

    let delay = match non_empty(form.delay) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|_| AppError::BadRequest("Invalid delay".into()))?,
        None => state.settings.typing.default_delay_secs,
    };

    let job = state
        .typing
        .start_job(CreateJobDto {
            token,
            channel_id,
            lines,
            delay,
        })
        .map_err(map_typing_error)?;

    Ok(Json(StartJobResponse {
        job_id: job.job_id,
        total_lines: job.total,
    }))
}

/// Poll a typing job
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<TypingJob>, AppError> {
    let job = state.typing.get_job(&job_id).map_err(map_typing_error)?;
    Ok(Json(job))
}

/// Stop a typing job
pub async fn stop_typing(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<StopJobResponse>, AppError> {
    let job = state.typing.stop_job(&job_id).map_err(map_typing_error)?;
    Ok(Json(StopJobResponse {
        message: "Stopped",
        status: job.status,
    }))
}
