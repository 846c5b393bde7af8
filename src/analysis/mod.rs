mod error;
pub mod handlers;
mod normalize;
pub mod prompt;
pub mod record;
pub mod transport;

pub use error::AnalysisError;
pub use normalize::{normalize, NutritionFacts, DISH_NAME_PLACEHOLDER};
pub use record::{assemble, NutritionRecord};

use axum::Router;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::profiles::repo::Profile;
use crate::state::AppState;
use prompt::ImageInput;
use transport::ModelClient;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::routes())
}

/// Inputs for one analysis invocation. At least one of note/image must be
/// present; the HTTP handler enforces that before calling `run`.
pub struct AnalyzeInput<'a> {
    pub note: Option<&'a str>,
    pub image: Option<ImageInput>,
    pub profile: Option<&'a Profile>,
    pub owner_id: Option<Uuid>,
}

/// Runs the pipeline once, sequentially: prompt → transport → normalize →
/// assemble. Stateless; a failed invocation leaves nothing behind.
pub async fn run(
    model: &dyn ModelClient,
    input: AnalyzeInput<'_>,
) -> Result<NutritionRecord, AnalysisError> {
    let segments = prompt::build_prompt(input.note, input.image.as_ref(), input.profile);
    let raw = model.generate(&segments).await?;
    let facts = normalize(&raw)?;
    Ok(assemble(facts, input.owner_id, OffsetDateTime::now_utc()))
}
