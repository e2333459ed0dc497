//! Preview generation handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use kata_preview_core::{GenerationRequest, PreviewError, PreviewResult};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Generate a kata preview.
///
/// POST /v1/previews
///
/// The generation runs on its own task: once the provider call is issued it
/// completes and commits even if the client disconnects or the request
/// times out. The task owns its generation slot, so a dropped request does
/// not free capacity while its provider call is still running.
pub async fn create_preview(
    State(state): State<Arc<AppState>>,
    auth: Option<AuthUser>,
    body: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<PreviewResult>, ApiError> {
    let caller = auth.map(AuthUser::into_identity);

    let request = match body {
        Ok(Json(request)) => request,
        Err(_) if caller.is_none() => return Err(PreviewError::Unauthenticated.into()),
        Err(rejection) => return Err(ApiError::BadRequest(rejection.body_text())),
    };

    let slot = Arc::clone(&state.preview_slots)
        .acquire_owned()
        .await
        .map_err(|e| ApiError::Internal(format!("preview slots closed: {e}")))?;

    let generator = Arc::clone(&state.generator);
    let task = tokio::spawn(async move {
        let result = generator.generate_preview(&request, caller.as_ref()).await;
        drop(slot);
        result
    });

    let result = task
        .await
        .map_err(|e| ApiError::Internal(format!("preview task failed: {e}")))??;

    Ok(Json(result))
}
