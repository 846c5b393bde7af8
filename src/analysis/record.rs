use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::normalize::NutritionFacts;

/// A fully-normalized analysis result, ready for display or storage.
/// Immutable once assembled; the history table only ever appends these.
#[derive(Debug, Clone, Serialize)]
pub struct NutritionRecord {
    pub id: Uuid,
    /// Absent for anonymous/demo analyses; required for persisted records.
    pub owner_id: Option<Uuid>,
    pub dish_name: String,
    pub calories_kcal: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub advice_text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Merges normalized fields with caller-supplied identity metadata. Pure
/// construction, no failure path. The timestamp comes from the clock here,
/// never from the model.
pub fn assemble(
    facts: NutritionFacts,
    owner_id: Option<Uuid>,
    now: OffsetDateTime,
) -> NutritionRecord {
    NutritionRecord {
        id: Uuid::new_v4(),
        owner_id,
        dish_name: facts.dish_name,
        calories_kcal: facts.calories_kcal,
        protein_g: facts.protein_g,
        carbs_g: facts.carbs_g,
        fat_g: facts.fat_g,
        advice_text: facts.advice_text,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> NutritionFacts {
        NutritionFacts {
            dish_name: "Oats".into(),
            calories_kcal: 210,
            protein_g: 7.0,
            carbs_g: 35.0,
            fat_g: 4.5,
            advice_text: "Good breakfast.".into(),
        }
    }

    #[test]
    fn assemble_carries_fields_and_identity() {
        let owner = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let record = assemble(facts(), Some(owner), now);
        assert_eq!(record.owner_id, Some(owner));
        assert_eq!(record.dish_name, "Oats");
        assert_eq!(record.calories_kcal, 210);
        assert_eq!(record.created_at, now);
    }

    #[test]
    fn anonymous_record_has_no_owner() {
        let record = assemble(facts(), None, OffsetDateTime::now_utc());
        assert!(record.owner_id.is_none());
    }

    #[test]
    fn record_serializes_created_at_as_rfc3339() {
        let record = assemble(facts(), None, OffsetDateTime::UNIX_EPOCH);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["created_at"], "1970-01-01T00:00:00Z");
        assert_eq!(json["dish_name"], "Oats");
    }
}
