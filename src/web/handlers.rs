use super::templates::render;
use crate::app::App;
use crate::exchange::SessionStatus;
use crate::models::FeedbackRequest;
use crate::{Error, Result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::FormRejection;
use axum::extract::{Multipart, Query, State};
use axum::response::Html;
use axum::{Form, Json};
use minijinja::context;
use serde::{Deserialize, Serialize};

const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct UidQuery {
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub uid: String,
    pub status: SessionStatus,
}

#[derive(Debug, Deserialize)]
pub struct CaptionForm {
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tone: String,
    #[serde(default)]
    pub additional_context: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackForm {
    #[serde(default)]
    pub final_caption: String,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub direction: String,
}

fn require_uid(uid: &str) -> Result<&str> {
    let uid = uid.trim();
    if uid.is_empty() {
        return Err(Error::BadRequest("Missing upload id.".to_string()));
    }
    Ok(uid)
}

pub async fn index() -> Result<Html<String>> {
    render("index.html", context! {})
}

/// Accept the `file` field, start describing it, and show the processing page.
pub async fn upload_image(
    State(app): State<App>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Html<String>> {
    let mut multipart =
        multipart.map_err(|e| Error::Upload(format!("Expected a multipart upload: {}", e)))?;

    let mut bytes = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Upload(format!("Could not read the upload: {}", e.body_text())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::Upload(format!("Could not read the upload: {}", e.body_text())))?;
        bytes = Some(data.to_vec());
        break;
    }

    let bytes = bytes.ok_or_else(|| Error::Upload("No file was uploaded.".to_string()))?;
    let ticket = app.accept_upload(bytes).await?;

    let settings = app.settings();
    render(
        "processing.html",
        context! {
            uid => ticket.uid,
            poll_ms => settings.result_poll.as_millis() as u64,
            max_wait_ms => settings.result_wait.as_millis() as u64,
        },
    )
}

/// Polled by the processing page until the description is no longer pending.
pub async fn status(State(app): State<App>, Query(query): Query<UidQuery>) -> Json<StatusResponse> {
    let status = app.status(query.uid.trim());
    Json(StatusResponse {
        uid: query.uid,
        status,
    })
}

pub async fn context_form(Query(query): Query<UidQuery>) -> Result<Html<String>> {
    let uid = require_uid(&query.uid)?;
    render("context.html", context! { uid => uid })
}

/// Join on the background description and render the caption page.
pub async fn generate_caption(
    State(app): State<App>,
    form: std::result::Result<Form<CaptionForm>, FormRejection>,
) -> Result<Html<String>> {
    let Form(form) = form.map_err(|e| Error::BadRequest(e.body_text()))?;
    let uid = require_uid(&form.uid)?;

    let caption = app
        .generate_caption(uid, &form.location, &form.tone, &form.additional_context)
        .await;

    render("final.html", context! { caption => caption })
}

pub async fn feedback(
    State(app): State<App>,
    form: std::result::Result<Form<FeedbackForm>, FormRejection>,
) -> Result<Html<String>> {
    let Form(form) = form.map_err(|e| Error::BadRequest(e.body_text()))?;
    if form.final_caption.trim().is_empty() {
        return Err(Error::BadRequest("Missing caption.".to_string()));
    }
    if form.feedback.trim().is_empty() {
        return Err(Error::BadRequest("Please tell us what to change.".to_string()));
    }

    let request = FeedbackRequest {
        final_caption: form.final_caption,
        feedback: form.feedback,
        direction: form.direction,
    };
    let alternatives = app.alternatives(&request).await;

    render(
        "feedback_result.html",
        context! {
            final_caption => request.final_caption,
            alternatives => alternatives,
        },
    )
}
