use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::profiles::repo::Profile;

/// Request body for creating the biometric profile.
#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub full_name: String,
    pub age: i32,
    pub weight_kg: f64,
    pub height_cm: f64,
    pub gender: String,
    pub goal: String,
    pub activity_level: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
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

impl From<Profile> for ProfileResponse {
    fn from(p: Profile) -> Self {
        Self {
            user_id: p.user_id,
            full_name: p.full_name,
            age: p.age,
            weight_kg: p.weight_kg,
            height_cm: p.height_cm,
            gender: p.gender,
            goal: p.goal,
            activity_level: p.activity_level,
            created_at: p.created_at,
        }
    }
}
