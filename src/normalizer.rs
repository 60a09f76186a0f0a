use log::{debug, info, warn};

use crate::engine::ExtractionEngine;
use crate::error::NormalizeError;
use crate::fields::{Field, FieldExtractor};
use crate::guard::{ContentGuard, Inspection};
use crate::model::{CanonicalRecipe, IngredientGroup};
use crate::source::RawExtractionResult;

pub const PARSING_FAILED: &str = "parsing recipe data failed";

/// What the caller asks to normalize
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeInput {
    /// Fetch the page at this URL
    Url(String),
    /// Use already-fetched page content that originated from `url`
    Html { url: String, html: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    ExtractionFailure,
    SchemaValidation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub reason: String,
}

/// Result of one normalization attempt.
///
/// A `Success` always carries a recipe whose required fields are filled.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Success(CanonicalRecipe),
    /// Content was recognized as a bot-protection page served by `provider`
    Guarded { provider: String, reason: String },
    Rejected(Rejection),
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success(_))
    }

    /// Human-readable reason for a non-successful outcome
    pub fn reason(&self) -> Option<&str> {
        match self {
            ExtractionOutcome::Success(_) => None,
            ExtractionOutcome::Guarded { reason, .. } => Some(reason),
            ExtractionOutcome::Rejected(rejection) => Some(&rejection.reason),
        }
    }

    pub fn into_result(self) -> Result<CanonicalRecipe, NormalizeError> {
        match self {
            ExtractionOutcome::Success(recipe) => Ok(recipe),
            ExtractionOutcome::Guarded { provider, .. } => {
                Err(NormalizeError::BlockedContent { provider })
            }
            ExtractionOutcome::Rejected(Rejection {
                kind: RejectionKind::ExtractionFailure,
                reason,
            }) => Err(NormalizeError::ExtractionFailure(reason)),
            ExtractionOutcome::Rejected(Rejection {
                kind: RejectionKind::SchemaValidation,
                reason,
            }) => Err(NormalizeError::SchemaValidation(reason)),
        }
    }

    fn guarded(provider: String) -> Self {
        let reason = NormalizeError::BlockedContent {
            provider: provider.clone(),
        }
        .to_string();
        ExtractionOutcome::Guarded { provider, reason }
    }

    fn rejected(kind: RejectionKind, reason: impl Into<String>) -> Self {
        ExtractionOutcome::Rejected(Rejection {
            kind,
            reason: reason.into(),
        })
    }
}

impl From<Result<CanonicalRecipe, NormalizeError>> for ExtractionOutcome {
    fn from(result: Result<CanonicalRecipe, NormalizeError>) -> Self {
        match result {
            Ok(recipe) => ExtractionOutcome::Success(recipe),
            Err(NormalizeError::BlockedContent { provider }) => {
                ExtractionOutcome::guarded(provider)
            }
            Err(NormalizeError::SchemaValidation(reason)) => {
                ExtractionOutcome::rejected(RejectionKind::SchemaValidation, reason)
            }
            Err(e) => ExtractionOutcome::rejected(RejectionKind::ExtractionFailure, e.to_string()),
        }
    }
}

/// Turns a URL or page content into an [`ExtractionOutcome`].
///
/// Holds no per-request state; one instance can serve any number of
/// concurrent requests.
pub struct RecipeNormalizer {
    engine: Box<dyn ExtractionEngine>,
    guard: ContentGuard,
}

impl RecipeNormalizer {
    pub fn new(engine: impl ExtractionEngine + 'static) -> Self {
        Self {
            engine: Box::new(engine),
            guard: ContentGuard::default(),
        }
    }

    pub fn with_guard(mut self, guard: ContentGuard) -> Self {
        self.guard = guard;
        self
    }

    pub async fn normalize(&self, input: &RecipeInput) -> ExtractionOutcome {
        let outcome = self.run(input).await;
        match &outcome {
            ExtractionOutcome::Success(recipe) => {
                info!("Normalized recipe from {}", recipe.canonical_url)
            }
            ExtractionOutcome::Guarded { reason, .. } => warn!("Guarded: {}", reason),
            ExtractionOutcome::Rejected(rejection) => {
                warn!("Rejected ({:?}): {}", rejection.kind, rejection.reason)
            }
        }
        outcome
    }

    async fn run(&self, input: &RecipeInput) -> ExtractionOutcome {
        let extracted = match input {
            RecipeInput::Url(url) => {
                debug!("Extracting recipe from URL {}", url);
                self.engine
                    .fetch_and_extract(url)
                    .await
                    .map_err(|e| format!("Error scraping URL: {e}"))
            }
            RecipeInput::Html { url, html } => {
                if let Inspection::Blocked { provider } = self.guard.inspect(html) {
                    return ExtractionOutcome::guarded(provider);
                }
                debug!("Extracting recipe from {} bytes of HTML ({})", html.len(), url);
                self.engine
                    .extract_from_content(html, url, true)
                    .await
                    .map_err(|e| format!("Error scraping HTML: {e}"))
            }
        };

        match extracted {
            Ok(result) => normalize_result(result.as_ref()),
            Err(reason) => ExtractionOutcome::rejected(RejectionKind::ExtractionFailure, reason),
        }
    }
}

/// Validate and map an extraction result that is already in hand
pub fn normalize_result(result: &dyn RawExtractionResult) -> ExtractionOutcome {
    map_extraction(result).into()
}

/// Field-by-field mapping of an extraction result into a canonical recipe
pub fn map_extraction(result: &dyn RawExtractionResult) -> Result<CanonicalRecipe, NormalizeError> {
    let fields = FieldExtractor::new(result);

    // cheap proxy for "this page is a recipe at all"
    let author = fields
        .string(Field::Author)
        .filter(|author| !author.trim().is_empty())
        .ok_or_else(|| NormalizeError::ExtractionFailure(PARSING_FAILED.to_string()))?;

    let ingredients = fields.strings(Field::Ingredients);
    let ingredient_groups = match fields.objects::<IngredientGroup>(Field::IngredientGroups) {
        Some(groups) => groups,
        None => IngredientGroup::ungrouped(ingredients.as_deref()),
    };

    let recipe = CanonicalRecipe {
        author,
        canonical_url: fields.string(Field::CanonicalUrl).unwrap_or_default(),
        category: fields.string(Field::Category),
        cook_time: fields.int(Field::CookTime),
        cooking_method: fields.string(Field::CookingMethod),
        cuisine: fields.string(Field::Cuisine),
        description: fields.string(Field::Description),
        dietary_restrictions: fields.strings(Field::DietaryRestrictions),
        equipment: fields.strings(Field::Equipment),
        host: fields.string(Field::Host).unwrap_or_default(),
        image: fields.string(Field::Image),
        ingredient_groups,
        ingredients,
        instructions: fields.string(Field::Instructions).unwrap_or_default(),
        instructions_list: fields.strings(Field::InstructionsList).unwrap_or_default(),
        keywords: fields.strings(Field::Keywords),
        language: fields.string(Field::Language),
        links: fields.objects(Field::Links).unwrap_or_default(),
        nutrients: fields.string_map(Field::Nutrients).unwrap_or_default(),
        prep_time: fields.int(Field::PrepTime),
        ratings: fields.float(Field::Ratings),
        ratings_count: fields.int(Field::RatingsCount),
        site_name: fields.string(Field::SiteName),
        title: fields.string(Field::Title),
        total_time: fields.int(Field::TotalTime),
        yields: fields.string(Field::Yields),
    };

    recipe.validate()?;
    Ok(recipe)
}
