pub mod config;
pub mod engine;
pub mod error;
pub mod fields;
pub mod guard;
pub mod model;
pub mod normalizer;
pub mod request;
pub mod source;

pub use engine::{ExtractionEngine, JsonLdEngine};
pub use error::{AccessorError, EngineError, NormalizeError};
pub use fields::{Field, FieldExtractor, Shape};
pub use guard::{ContentGuard, Inspection};
pub use model::{CanonicalRecipe, IngredientGroup, Link};
pub use normalizer::{
    map_extraction, normalize_result, ExtractionOutcome, RecipeInput, RecipeNormalizer,
    Rejection, RejectionKind,
};
pub use request::{HtmlRequest, Response, UrlRequest};
pub use source::{MapExtraction, RawExtractionResult};

use crate::config::Settings;

/// Fetch `url` and normalize the recipe found there.
///
/// Uses configuration from `config.toml` / `RECIPE__*` environment variables.
///
/// # Example
/// ```no_run
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let recipe = recipe_normalizer::normalize_url("https://example.com/recipe").await?;
/// println!("{}", recipe.author);
/// # Ok(())
/// # }
/// ```
pub async fn normalize_url(url: &str) -> Result<CanonicalRecipe, NormalizeError> {
    let input = UrlRequest {
        url: url.to_string(),
    }
    .validate()?;
    let normalizer = Settings::load()?.normalizer()?;
    normalizer.normalize(&input).await.into_result()
}

/// Normalize a recipe from page content that was fetched from `url`
pub async fn normalize_html(url: &str, html: &str) -> Result<CanonicalRecipe, NormalizeError> {
    let input = HtmlRequest {
        url: url.to_string(),
        html: html.to_string(),
    }
    .validate()?;
    let normalizer = Settings::load()?.normalizer()?;
    normalizer.normalize(&input).await.into_result()
}
