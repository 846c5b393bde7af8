use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument};
use uuid::Uuid;

use super::dto::{MealDetails, MealListItem, Pagination};
use super::repo;
use crate::auth::jwt::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals", get(list_meals))
        .route("/meals/:id", get(get_meal))
}

#[instrument(skip(state))]
pub async fn list_meals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<MealListItem>>, (StatusCode, String)> {
    let limit = p.limit.clamp(1, 100);
    let offset = p.offset.max(0);
    let meals = repo::list_by_owner(&state.db, user_id, limit, offset)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "list_meals failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    let items = meals
        .into_iter()
        .map(|m| MealListItem {
            id: m.id,
            dish_name: m.dish_name,
            calories_kcal: m.calories_kcal,
            created_at: m.created_at,
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MealDetails>, (StatusCode, String)> {
    let meal = repo::get_by_id(&state.db, user_id, id)
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, %id, "get_meal failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Meal not found".to_string()))?;
    Ok(Json(meal.into()))
}
