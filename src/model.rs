use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::NormalizeError;
use crate::fields::Field;
use crate::normalizer::map_extraction;
use crate::source::MapExtraction;

/// A link found on the recipe page, e.g. `{"href": "...", "text": "..."}`
pub type Link = BTreeMap<String, String>;

/// One labeled cluster of ingredients (e.g. "For the cake")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientGroup {
    /// The purpose or name of this ingredient group
    #[serde(default)]
    pub purpose: Option<String>,
    /// Ingredients in this group
    #[serde(default)]
    pub ingredients: Vec<String>,
}

impl IngredientGroup {
    /// Groups used when the source exposes ingredients but no grouping:
    /// a single unnamed group with every ingredient, or nothing at all.
    pub fn ungrouped(ingredients: Option<&[String]>) -> Vec<IngredientGroup> {
        match ingredients {
            Some(ingredients) if !ingredients.is_empty() => vec![IngredientGroup {
                purpose: None,
                ingredients: ingredients.to_vec(),
            }],
            _ => Vec::new(),
        }
    }
}

/// The canonical recipe record returned for a successful extraction.
///
/// Serialized with camelCase names (`cookTime`, `ingredientGroups`, ...).
/// Deserialization also accepts the snake_case names used by extraction
/// engines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecipe {
    /// Recipe author name
    #[serde(default)]
    pub author: String,
    /// Canonical URL of the recipe
    #[serde(default, alias = "canonical_url")]
    pub canonical_url: String,
    /// Recipe category (e.g., Dessert, Main Course)
    pub category: Option<String>,
    /// Cooking time in minutes
    #[serde(alias = "cook_time")]
    pub cook_time: Option<u32>,
    #[serde(alias = "cooking_method")]
    pub cooking_method: Option<String>,
    /// Cuisine type (e.g., Italian, French)
    pub cuisine: Option<String>,
    pub description: Option<String>,
    /// e.g. Vegan, Gluten-Free
    #[serde(alias = "dietary_restrictions")]
    pub dietary_restrictions: Option<Vec<String>>,
    pub equipment: Option<Vec<String>>,
    /// Host domain of the recipe
    #[serde(default)]
    pub host: String,
    /// URL of the recipe image
    pub image: Option<String>,
    #[serde(default, alias = "ingredient_groups")]
    pub ingredient_groups: Vec<IngredientGroup>,
    pub ingredients: Option<Vec<String>>,
    /// Recipe instructions as a single string
    #[serde(default)]
    pub instructions: String,
    /// Recipe instructions as a list of steps
    #[serde(default, alias = "instructions_list")]
    pub instructions_list: Vec<String>,
    pub keywords: Option<Vec<String>>,
    /// Language code (e.g., 'en', 'fr')
    pub language: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub nutrients: BTreeMap<String, String>,
    /// Preparation time in minutes
    #[serde(alias = "prep_time")]
    pub prep_time: Option<u32>,
    /// Average rating score
    pub ratings: Option<f64>,
    #[serde(alias = "ratings_count")]
    pub ratings_count: Option<u32>,
    #[serde(alias = "site_name")]
    pub site_name: Option<String>,
    pub title: Option<String>,
    /// Total time in minutes
    #[serde(alias = "total_time")]
    pub total_time: Option<u32>,
    /// Recipe yield (e.g., '4 servings', '1 cake')
    pub yields: Option<String>,
}

impl CanonicalRecipe {
    /// Build a recipe straight from an engine's bulk snapshot.
    ///
    /// The snapshot must use internal field names. Values go through the
    /// same field mapping as a per-field extraction result, so the author
    /// rule, shape checks and grouping behave identically.
    pub fn from_snapshot(snapshot: Map<String, Value>) -> Result<Self, NormalizeError> {
        map_extraction(&MapExtraction::from_snapshot(snapshot))
    }

    /// Required fields that are missing, blank or empty
    pub fn missing_required_fields(&self) -> Vec<Field> {
        let mut missing = Vec::new();
        if self.author.trim().is_empty() {
            missing.push(Field::Author);
        }
        if self.canonical_url.trim().is_empty() {
            missing.push(Field::CanonicalUrl);
        }
        if self.host.trim().is_empty() {
            missing.push(Field::Host);
        }
        if self.instructions.trim().is_empty() {
            missing.push(Field::Instructions);
        }
        if self.instructions_list.is_empty() {
            missing.push(Field::InstructionsList);
        }
        missing
    }

    pub fn validate(&self) -> Result<(), NormalizeError> {
        let missing = self.missing_required_fields();
        if missing.is_empty() {
            return Ok(());
        }

        let names: Vec<&str> = missing.iter().map(|f| f.external_name()).collect();
        Err(NormalizeError::SchemaValidation(format!(
            "missing required field(s): {}",
            names.join(", ")
        )))
    }
}
