use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bytes::Bytes;

use crate::profiles::repo::Profile;

/// Instruction sent with every request. The model is told to reply with the
/// bare JSON object and nothing else; `normalize` tolerates it ignoring that.
pub const SYSTEM_INSTRUCTION: &str = "You are a nutritionist. Analyze the meal in the \
attached photo and/or description. Reply with a single JSON object and nothing else: \
no markdown, no code fences, no commentary. Schema: {\"dish_name\": string, \
\"calories_kcal\": integer, \"protein_g\": number, \"carbs_g\": number, \
\"fat_g\": number, \"advice_text\": string}.";

/// One unit of a multimodal request: plain text, or an inlined image with a
/// declared MIME type. Image data is already base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    InlineImage { mime_type: String, data: String },
}

/// Raw image bytes as supplied by the caller.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub body: Bytes,
    pub mime_type: String,
}

/// Assembles the ordered content segments for one analysis request. Cannot
/// fail: absent inputs simply omit the corresponding segment. The caller is
/// responsible for ensuring at least one of note/image is present.
pub fn build_prompt(
    note: Option<&str>,
    image: Option<&ImageInput>,
    profile: Option<&Profile>,
) -> Vec<Segment> {
    let mut segments = Vec::new();
    if let Some(note) = note {
        segments.push(Segment::Text(format!("Meal description: {note}")));
    }
    if let Some(img) = image {
        segments.push(Segment::InlineImage {
            mime_type: img.mime_type.clone(),
            data: BASE64.encode(&img.body),
        });
    }
    if let Some(p) = profile {
        segments.push(Segment::Text(format!(
            "Tailor the advice to the user: gender {}, goal {}, weight {} kg.",
            p.gender, p.goal, p.weight_kg
        )));
    }
    segments
}
