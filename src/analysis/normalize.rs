use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::error::AnalysisError;

/// Dish name used when the model omits one or sends the wrong type.
pub const DISH_NAME_PLACEHOLDER: &str = "unidentified";

/// Schema-conformant output of normalization. Every field is always present:
/// either the model's value or the documented default, never a partial record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionFacts {
    pub dish_name: String,
    pub calories_kcal: i32,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub advice_text: String,
}

/// Turns a free-text model reply into a `NutritionFacts`. The model is told to
/// send bare JSON but is observed to wrap it in prose or markdown fencing
/// anyway, so: strip fences, slice to the outermost braces, parse, coerce.
/// Pure function; the same input always yields the same output.
pub fn normalize(raw: &str) -> Result<NutritionFacts, AnalysisError> {
    let stripped = strip_code_fences(raw);
    let sliced = slice_object(stripped)?;
    let value: Value =
        serde_json::from_str(sliced).map_err(|e| AnalysisError::InvalidJson(e.to_string()))?;
    Ok(coerce(&value))
}

/// Removes a leading ``` fence (with optional language tag) and a trailing
/// ``` fence, plus surrounding whitespace.
fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = s.trim_end().strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Slices to the span between the first `{` and the last `}` so leading or
/// trailing prose is discarded. No `{` at all means the reply holds no JSON.
fn slice_object(s: &str) -> Result<&str, AnalysisError> {
    let start = s.find('{').ok_or(AnalysisError::NoJsonFound)?;
    match s.rfind('}') {
        Some(end) if end > start => Ok(&s[start..=end]),
        // unbalanced reply; let the parser report it
        _ => Ok(&s[start..]),
    }
}

/// Field-level coercion never fails: wrong types and omissions default
/// silently, trading strictness for availability.
fn coerce(value: &Value) -> NutritionFacts {
    let dish_name = value
        .get("dish_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DISH_NAME_PLACEHOLDER)
        .to_string();
    let advice_text = value
        .get("advice_text")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    NutritionFacts {
        dish_name,
        calories_kcal: int_field(value, "calories_kcal"),
        protein_g: float_field(value, "protein_g"),
        carbs_g: float_field(value, "carbs_g"),
        fat_g: float_field(value, "fat_g"),
        advice_text,
    }
}

fn int_field(value: &Value, key: &str) -> i32 {
    let n = value
        .get(key)
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));
    match n {
        Some(n) => n.clamp(0, i64::from(i32::MAX)) as i32,
        None => {
            debug!(field = key, "missing or non-numeric field, defaulting to 0");
            0
        }
    }
}

fn float_field(value: &Value, key: &str) -> f64 {
    match value.get(key).and_then(Value::as_f64) {
        Some(f) if f.is_finite() && f >= 0.0 => f,
        Some(_) => 0.0,
        None => {
            debug!(field = key, "missing or non-numeric field, defaulting to 0.0");
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_REPLY: &str = r#"{"dish_name": "Salad", "calories_kcal": 120, "protein_g": 3.5, "carbs_g": 10.2, "fat_g": 4.0, "advice_text": "Add protein."}"#;

    fn full_facts() -> NutritionFacts {
        NutritionFacts {
            dish_name: "Salad".into(),
            calories_kcal: 120,
            protein_g: 3.5,
            carbs_g: 10.2,
            fat_g: 4.0,
            advice_text: "Add protein.".into(),
        }
    }

    #[test]
    fn bare_json_parses() {
        assert_eq!(normalize(FULL_REPLY).unwrap(), full_facts());
    }

    #[test]
    fn fenced_json_equals_unfenced() {
        let fenced = format!("```json\n{FULL_REPLY}\n```");
        assert_eq!(normalize(&fenced).unwrap(), normalize(FULL_REPLY).unwrap());

        let fenced_no_tag = format!("```\n{FULL_REPLY}\n```");
        assert_eq!(
            normalize(&fenced_no_tag).unwrap(),
            normalize(FULL_REPLY).unwrap()
        );
    }

    #[test]
    fn prose_prefix_is_discarded() {
        let wrapped = format!("Sure! Here is the analysis: {FULL_REPLY}");
        assert_eq!(normalize(&wrapped).unwrap(), full_facts());
    }

    #[test]
    fn refusal_text_fails_with_no_json_found() {
        let err = normalize("I cannot analyze this image.").unwrap_err();
        assert!(matches!(err, AnalysisError::NoJsonFound));
        assert_eq!(err.reason(), "no_json_found");
    }

    #[test]
    fn garbage_between_braces_fails_with_invalid_json() {
        let err = normalize("{not json at all}").unwrap_err();
        match err {
            AnalysisError::InvalidJson(msg) => assert!(!msg.is_empty()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_numeric_fields_default_to_zero() {
        let facts = normalize(r#"{"dish_name": "Rice"}"#).unwrap();
        assert_eq!(facts.dish_name, "Rice");
        assert_eq!(facts.calories_kcal, 0);
        assert_eq!(facts.protein_g, 0.0);
        assert_eq!(facts.carbs_g, 0.0);
        assert_eq!(facts.fat_g, 0.0);
        assert_eq!(facts.advice_text, "");
    }

    #[test]
    fn unrecognized_keys_are_ignored_field_names_match_strictly() {
        // "calories_aprox" is not "calories_kcal", so calories default to 0.
        let raw = "```json\n{\"dish_name\":\"Grilled chicken\",\"calories_aprox\":350}\n```";
        let facts = normalize(raw).unwrap();
        assert_eq!(
            facts,
            NutritionFacts {
                dish_name: "Grilled chicken".into(),
                calories_kcal: 0,
                protein_g: 0.0,
                carbs_g: 0.0,
                fat_g: 0.0,
                advice_text: String::new(),
            }
        );
    }

    #[test]
    fn wrong_typed_fields_default_silently() {
        let raw = r#"{"dish_name": 42, "calories_kcal": "lots", "protein_g": null, "advice_text": ["a"]}"#;
        let facts = normalize(raw).unwrap();
        assert_eq!(facts.dish_name, DISH_NAME_PLACEHOLDER);
        assert_eq!(facts.calories_kcal, 0);
        assert_eq!(facts.protein_g, 0.0);
        assert_eq!(facts.advice_text, "");
    }

    #[test]
    fn empty_dish_name_gets_placeholder() {
        let facts = normalize(r#"{"dish_name": "  "}"#).unwrap();
        assert_eq!(facts.dish_name, DISH_NAME_PLACEHOLDER);
    }

    #[test]
    fn negative_values_clamp_to_zero() {
        let raw = r#"{"dish_name": "Odd", "calories_kcal": -50, "protein_g": -1.5}"#;
        let facts = normalize(raw).unwrap();
        assert_eq!(facts.calories_kcal, 0);
        assert_eq!(facts.protein_g, 0.0);
    }

    #[test]
    fn float_calories_truncate() {
        let facts = normalize(r#"{"calories_kcal": 350.9}"#).unwrap();
        assert_eq!(facts.calories_kcal, 350);
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = format!("Here you go:\n```json\n{FULL_REPLY}\n```\nEnjoy!");
        assert_eq!(normalize(&raw).unwrap(), normalize(&raw).unwrap());
    }

    #[test]
    fn unbalanced_braces_report_invalid_json() {
        assert!(matches!(
            normalize(r#"{"dish_name": "Soup""#).unwrap_err(),
            AnalysisError::InvalidJson(_)
        ));
    }
}
