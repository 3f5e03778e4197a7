use crate::{error::DispatchError, AppState};
use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Interstitial page shown while the browser is sent to WhatsApp.
#[derive(Template)]
#[template(path = "redirect.html")]
struct RedirectTemplate {
    title: String,
    image_url: Option<String>,
    destination: String,
    delay_ms: i64,
}

/// GET /:slug
///
/// 1. Dispatch the slug: pick the next number in rotation and persist the
///    advanced cursor (the click is logged in the background).
/// 2. Build the `wa.me` link with the slug's pre-filled message.
/// 3. Render the interstitial page, which navigates after `delay_ms`.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    let dispatched = match state.engine.dispatch(&code).await {
        Ok(d) => d,
        Err(e) => {
            match &e {
                DispatchError::SlugNotFoundOrInactive | DispatchError::NoActiveTargets => {
                    tracing::debug!("Slug '{}' not available: {}", code, e);
                }
                _ => tracing::error!("Dispatch failed for slug '{}': {}", code, e),
            }
            return e.into_response();
        }
    };

    tracing::debug!(
        "Slug '{}' -> {} (position {})",
        code,
        dispatched.address,
        dispatched.position
    );

    let destination = match whatsapp_url(&dispatched.address, &dispatched.slug.message) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!("Failed to encode message for slug '{}': {}", code, e);
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                crate::error::NOT_AVAILABLE,
            )
                .into_response();
        }
    };

    RedirectTemplate {
        title: dispatched.slug.title,
        image_url: dispatched.slug.image_url,
        destination,
        delay_ms: dispatched.slug.delay_ms.max(0),
    }
    .into_response()
}

/// GET /healthz
pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the WhatsApp deep link for `phone` (digits only), pre-filling
/// `message` when it is not blank.
///
/// The message is percent-encoded with the strict set (everything except
/// ASCII alphanumerics and `-_.~`), so the result is safe to embed in a
/// script string.
pub fn whatsapp_url(phone: &str, message: &str) -> Result<String, askama::Error> {
    if message.trim().is_empty() {
        return Ok(format!("https://wa.me/{phone}"));
    }
    let text = askama::filters::urlencode_strict(message)?;
    Ok(format!("https://wa.me/{phone}?text={text}"))
}
