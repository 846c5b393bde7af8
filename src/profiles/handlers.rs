use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{error, info, instrument, warn};

use super::dto::{CreateProfileRequest, ProfileResponse};
use super::repo;
use crate::auth::jwt::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/profile", post(create_profile).get(get_profile))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[instrument(skip(state, payload))]
pub async fn create_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), (StatusCode, String)> {
    if payload.full_name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "full_name is required".into()));
    }
    if payload.age <= 0 || payload.weight_kg <= 0.0 || payload.height_cm <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "age, weight_kg and height_cm must be positive".into(),
        ));
    }

    if repo::exists(&state.db, user_id).await.map_err(internal)? {
        warn!(%user_id, "profile already exists");
        return Err((StatusCode::CONFLICT, "Profile already exists".into()));
    }

    let profile = repo::create(
        &state.db,
        user_id,
        payload.full_name.trim(),
        payload.age,
        payload.weight_kg,
        payload.height_cm,
        &payload.gender,
        &payload.goal,
        &payload.activity_level,
    )
    .await
    .map_err(|e| {
        error!(error = %e, %user_id, "create profile failed");
        internal(e)
    })?;

    info!(%user_id, "profile created");
    Ok((StatusCode::CREATED, Json(profile.into())))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    let profile = repo::find_by_user(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Profile not found".to_string()))?;
    Ok(Json(profile.into()))
}
