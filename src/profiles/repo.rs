use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Biometric profile, one per user. Written once at onboarding and read by
/// the prompt builder to tailor advice; the analysis core never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub full_name: String,
    pub age: i32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub gender: String,
    pub goal: String,
    pub activity_level: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT user_id, full_name, age, weight_kg, height_cm, gender, goal, activity_level, created_at
        FROM profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(profile)
}

pub async fn exists(db: &PgPool, user_id: Uuid) -> anyhow::Result<bool> {
    let row: Option<(i32,)> = sqlx::query_as(
        r#"
        SELECT 1
        FROM profiles
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

#[allow(clippy::too_many_arguments)]
pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    full_name: &str,
    age: i32,
    weight_kg: f64,
    height_cm: f64,
    gender: &str,
    goal: &str,
    activity_level: &str,
) -> anyhow::Result<Profile> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (user_id, full_name, age, weight_kg, height_cm, gender, goal, activity_level)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING user_id, full_name, age, weight_kg, height_cm, gender, goal, activity_level, created_at
        "#,
    )
    .bind(user_id)
    .bind(full_name)
    .bind(age)
    .bind(weight_kg)
    .bind(height_cm)
    .bind(gender)
    .bind(goal)
    .bind(activity_level)
    .fetch_one(db)
    .await?;
    Ok(profile)
}
