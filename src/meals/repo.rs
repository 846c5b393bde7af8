use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::analysis::NutritionRecord;

/// Persisted meal-history row. Append-only: never updated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dish_name: String,
    pub calories_kcal: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub advice_text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Appends one assembled record for its owner. Anonymous records must not
/// reach this point.
pub async fn append(db: &PgPool, record: &NutritionRecord) -> anyhow::Result<()> {
    let owner_id = record
        .owner_id
        .ok_or_else(|| anyhow::anyhow!("record has no owner"))?;
    sqlx::query(
        r#"
        INSERT INTO meals (id, user_id, dish_name, calories_kcal, protein_g, carbs_g, fat_g, advice_text, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(record.id)
    .bind(owner_id)
    .bind(&record.dish_name)
    .bind(record.calories_kcal)
    .bind(record.protein_g)
    .bind(record.carbs_g)
    .bind(record.fat_g)
    .bind(&record.advice_text)
    .bind(record.created_at)
    .execute(db)
    .await?;
    Ok(())
}

/// History for one owner, newest first.
pub async fn list_by_owner(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Meal>> {
    let rows = sqlx::query_as::<_, Meal>(
        r#"
        SELECT id, user_id, dish_name, calories_kcal, protein_g, carbs_g, fat_g, advice_text, created_at
        FROM meals
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn get_by_id(db: &PgPool, user_id: Uuid, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
    let meal = sqlx::query_as::<_, Meal>(
        r#"
        SELECT id, user_id, dish_name, calories_kcal, protein_g, carbs_g, fat_g, advice_text, created_at
        FROM meals
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(meal_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(meal)
}
