//! Route handlers for the applet lifecycle.
//!
//! Error taxonomy: client input errors and not-found conditions surface as
//! 4xx with a short `error` string; provider/filesystem failures are logged
//! with full detail and surfaced as generic 500s. Partial state written
//! before a failure (audio, transcript) is not rolled back.

use axum::body::Bytes;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use super::types::{ChangeAppletResponse, CreateAppletResponse, ErrorResponse, MessageResponse};
use super::{AppState, MAX_STORAGE_BYTES};
use crate::ai::{markers, AiProvider};
use crate::store::AudioKind;

const ALLOWED_AUDIO_TYPES: &[&str] = &[
    "audio/webm",
    "audio/ogg",
    "audio/wav",
    "audio/mpeg",
    "audio/mp3",
];

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn message_response(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(MessageResponse {
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Pull the `audio` field out of a multipart body. `None` covers a missing
/// field and a malformed body alike; both map to the same client error.
async fn read_audio_field(multipart: &mut Multipart) -> Option<(Vec<u8>, String)> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Malformed multipart body: {}", e);
                return None;
            }
        };

        if field.name() != Some("audio") {
            continue;
        }

        let mime_type = field.content_type().unwrap_or("").to_string();
        match field.bytes().await {
            Ok(bytes) => return Some((bytes.to_vec(), mime_type)),
            Err(e) => {
                log::warn!("Failed to read audio field: {}", e);
                return None;
            }
        }
    }
}

fn last_modified_value(path: &Path) -> Option<HeaderValue> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let formatted = DateTime::<Utc>::from(modified)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();
    HeaderValue::from_str(&formatted).ok()
}

/// POST /applet — create an applet from an audio recording.
pub async fn create_applet<P: AiProvider>(
    State(state): State<Arc<AppState<P>>>,
    mut multipart: Multipart,
) -> Response {
    let (audio, mime_type) = match read_audio_field(&mut multipart).await {
        Some(parts) => parts,
        None => return error_response(StatusCode::BAD_REQUEST, "No audio file provided"),
    };

    if !ALLOWED_AUDIO_TYPES.contains(&mime_type.as_str()) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid audio file type");
    }

    let id = Uuid::new_v4();
    if let Err(e) = state.store.create_applet_dir(&id) {
        log::error!("Failed to create applet directory for {}: {}", id, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process audio");
    }

    let file_name = match state.store.save_audio(&id, AudioKind::Initial, &audio) {
        Ok(name) => name,
        Err(e) => {
            log::error!("Failed to save audio for {}: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process audio");
        }
    };

    match run_create_pipeline(&state, &id, &file_name, audio, mime_type).await {
        Ok((index_file, index_timestamp_file)) => (
            StatusCode::OK,
            Json(CreateAppletResponse {
                message: "Audio file uploaded and processed successfully".to_string(),
                uuid: id.to_string(),
                file_name,
                index_file,
                index_timestamp_file,
            }),
        )
            .into_response(),
        Err(e) => {
            log::error!("Error processing audio for {}: {}", id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process audio")
        }
    }
}

/// Transcribe, format the initial prompt, generate, and persist. Returns the
/// (current, snapshot) HTML paths for the response body.
async fn run_create_pipeline<P: AiProvider>(
    state: &AppState<P>,
    id: &Uuid,
    file_name: &str,
    audio: Vec<u8>,
    mime_type: String,
) -> Result<(String, String), String> {
    let transcription = state
        .ai
        .transcribe(audio, file_name.to_string(), mime_type)
        .await
        .map_err(|e| format!("transcription failed: {}", e))?;

    state
        .store
        .write_transcript(id, file_name, &transcription)
        .map_err(|e| format!("failed to write transcript: {}", e))?;

    let prompt = state.templates.format_initial(&transcription);
    let raw = state
        .ai
        .generate(prompt)
        .await
        .map_err(|e| format!("generation failed: {}", e))?;

    let generated = markers::split_generated(&raw);

    // HTML is persisted even when the model returned none; storage only
    // when the model produced non-empty content.
    let html = generated.html.unwrap_or_default();
    let (index_path, snapshot_path) = state
        .store
        .write_html(id, &html)
        .map_err(|e| format!("failed to write HTML: {}", e))?;

    if let Some(storage) = generated.storage.filter(|s| !s.is_empty()) {
        state
            .store
            .write_storage(id, &storage)
            .map_err(|e| format!("failed to write storage: {}", e))?;
    }

    Ok((
        index_path.display().to_string(),
        snapshot_path.display().to_string(),
    ))
}

/// POST /applet/{id} — change an existing applet from an audio recording.
pub async fn change_applet<P: AiProvider>(
    State(state): State<Arc<AppState<P>>>,
    UrlPath(id): UrlPath<Uuid>,
    mut multipart: Multipart,
) -> Response {
    let (audio, mime_type) = match read_audio_field(&mut multipart).await {
        Some(parts) => parts,
        None => return error_response(StatusCode::BAD_REQUEST, "No audio file provided"),
    };

    if !state.store.exists(&id) {
        return error_response(StatusCode::NOT_FOUND, "Applet not found");
    }

    if !ALLOWED_AUDIO_TYPES.contains(&mime_type.as_str()) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid audio file type");
    }

    let file_name = match state.store.save_audio(&id, AudioKind::Change, &audio) {
        Ok(name) => name,
        Err(e) => {
            log::error!("Failed to save audio for {}: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change applet");
        }
    };

    let transcription = match state
        .ai
        .transcribe(audio, file_name.clone(), mime_type)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            log::error!("Error changing applet {}: transcription failed: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change applet");
        }
    };

    if let Err(e) = state.store.write_transcript(&id, &file_name, &transcription) {
        log::error!("Error changing applet {}: failed to write transcript: {}", id, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change applet");
    }

    let current_html = match state.store.read_html(&id) {
        Ok(Some(html)) => html,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Current index.html not found"),
        Err(e) => {
            log::error!("Error changing applet {}: failed to read HTML: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change applet");
        }
    };

    let current_storage = match state.store.read_storage(&id) {
        Ok(value) => value,
        Err(e) => {
            log::error!("Error changing applet {}: failed to read storage: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change applet");
        }
    };
    let storage_json =
        serde_json::to_string(&current_storage).unwrap_or_else(|_| "{}".to_string());

    let prompt = state
        .templates
        .format_change(&transcription, &current_html, &storage_json);

    let raw = match state.ai.generate(prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            log::error!("Error changing applet {}: generation failed: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change applet");
        }
    };

    let generated = markers::split_generated(&raw);

    // Empty HTML silently keeps the previous version; same for storage.
    if let Some(html) = generated.html.filter(|h| !h.is_empty()) {
        if let Err(e) = state.store.write_html(&id, &html) {
            log::error!("Error changing applet {}: failed to write HTML: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change applet");
        }
    }
    if let Some(storage) = generated.storage.filter(|s| !s.is_empty()) {
        if let Err(e) = state.store.write_storage(&id, &storage) {
            log::error!("Error changing applet {}: failed to write storage: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to change applet");
        }
    }

    (
        StatusCode::OK,
        Json(ChangeAppletResponse {
            message: "Applet changed successfully".to_string(),
            uuid: id.to_string(),
            file_name,
        }),
    )
        .into_response()
}

/// GET /applet/{id} — page listing the applet's prompt history.
pub async fn show_applet<P: AiProvider>(
    State(state): State<Arc<AppState<P>>>,
    UrlPath(id): UrlPath<Uuid>,
) -> Response {
    if !state.store.exists(&id) {
        return error_response(StatusCode::NOT_FOUND, "Applet not found");
    }

    let prompts = match state.store.list_prompts(&id) {
        Ok(prompts) => prompts,
        Err(e) => {
            log::error!("Error reading prompts for {}: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    Html(render_applet_page(&id, &prompts)).into_response()
}

fn render_applet_page(id: &Uuid, prompts: &[String]) -> String {
    let items: String = prompts
        .iter()
        .map(|prompt| format!("    <li>{}</li>\n", html_escape(prompt)))
        .collect();

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n  <title>Applet {id}</title>\n  \
         <link rel=\"stylesheet\" href=\"/static/css/applet.css\">\n</head>\n<body>\n  \
         <h1>Applet {id}</h1>\n  \
         <p><a href=\"/applet/{id}/html\">Open applet</a></p>\n  \
         <h2>Prompt history</h2>\n  <ol>\n{items}  </ol>\n</body>\n</html>\n"
    )
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// GET|HEAD /applet/{id}/html — the applet document itself.
pub async fn get_applet_html<P: AiProvider>(
    State(state): State<Arc<AppState<P>>>,
    UrlPath(id): UrlPath<Uuid>,
) -> Response {
    let html = match state.store.read_html(&id) {
        Ok(Some(html)) => html,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "HTML file not found"),
        Err(e) => {
            log::error!("Error reading HTML for {}: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let mut response = Html(html).into_response();
    if let Some(value) = last_modified_value(&state.store.html_path(&id)) {
        response.headers_mut().insert(header::LAST_MODIFIED, value);
    }
    response
}

/// GET|HEAD /applet/{id}/storage — never errors on a missing or corrupt
/// file; both read as an empty object.
pub async fn get_storage<P: AiProvider>(
    State(state): State<Arc<AppState<P>>>,
    UrlPath(id): UrlPath<Uuid>,
) -> Response {
    let value = match state.store.read_storage(&id) {
        Ok(value) => value,
        Err(e) => {
            log::error!("Error reading storage for {}: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read storage");
        }
    };

    let mut response = Json(value).into_response();
    if let Some(value) = last_modified_value(&state.store.storage_path(&id)) {
        response.headers_mut().insert(header::LAST_MODIFIED, value);
    }
    response
}

/// PUT /applet/{id}/storage — wholesale overwrite with a JSON body.
pub async fn put_storage<P: AiProvider>(
    State(state): State<Arc<AppState<P>>>,
    UrlPath(id): UrlPath<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !state.store.exists(&id) {
        return error_response(StatusCode::NOT_FOUND, "Applet not found");
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false);
    if !is_json {
        return error_response(StatusCode::BAD_REQUEST, "Request must be JSON");
    }

    let storage_data: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("JSON decoding error for {}: {}", id, e);
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    let serialized = match serde_json::to_string(&storage_data) {
        Ok(text) => text,
        Err(e) => {
            log::error!("Error serializing storage for {}: {}", id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update storage");
        }
    };

    if serialized.len() > MAX_STORAGE_BYTES {
        return error_response(StatusCode::BAD_REQUEST, "Storage data too large");
    }

    log::info!("Updating storage for {} ({} bytes)", id, serialized.len());
    if let Err(e) = state.store.write_storage(&id, &serialized) {
        log::error!("Error updating storage for {}: {}", id, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to update storage");
    }

    message_response("Storage updated successfully")
}

/// DELETE /applet/{id}/storage — reset an existing storage file to `{}`.
pub async fn delete_storage<P: AiProvider>(
    State(state): State<Arc<AppState<P>>>,
    UrlPath(id): UrlPath<Uuid>,
) -> Response {
    if !state.store.storage_path(&id).is_file() {
        return error_response(StatusCode::NOT_FOUND, "Storage file not found");
    }

    if let Err(e) = state.store.write_storage(&id, "{}") {
        log::error!("Error emptying storage for {}: {}", id, e);
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to empty storage");
    }

    message_response("Storage emptied successfully")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape("<script>alert(\"x\") & more</script>"),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; more&lt;/script&gt;"
        );
    }

    #[test]
    fn test_render_applet_page_escapes_prompts() {
        let id = Uuid::new_v4();
        let page = render_applet_page(&id, &["make a <b>bold</b> app".to_string()]);
        assert!(page.contains(&id.to_string()));
        assert!(page.contains("make a &lt;b&gt;bold&lt;/b&gt; app"));
        assert!(!page.contains("<b>bold</b>"));
    }
}
