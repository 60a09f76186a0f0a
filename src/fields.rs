use std::collections::BTreeMap;

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::source::RawExtractionResult;

/// Every field the canonical recipe schema knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Author,
    CanonicalUrl,
    Category,
    CookTime,
    CookingMethod,
    Cuisine,
    Description,
    DietaryRestrictions,
    Equipment,
    Host,
    Image,
    IngredientGroups,
    Ingredients,
    Instructions,
    InstructionsList,
    Keywords,
    Language,
    Links,
    Nutrients,
    PrepTime,
    Ratings,
    RatingsCount,
    SiteName,
    Title,
    TotalTime,
    Yields,
}

/// Expected JSON shape of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    String,
    Int,
    Float,
    StringList,
    ObjectList,
    StringMap,
}

impl Field {
    pub const ALL: [Field; 26] = [
        Field::Author,
        Field::CanonicalUrl,
        Field::Category,
        Field::CookTime,
        Field::CookingMethod,
        Field::Cuisine,
        Field::Description,
        Field::DietaryRestrictions,
        Field::Equipment,
        Field::Host,
        Field::Image,
        Field::IngredientGroups,
        Field::Ingredients,
        Field::Instructions,
        Field::InstructionsList,
        Field::Keywords,
        Field::Language,
        Field::Links,
        Field::Nutrients,
        Field::PrepTime,
        Field::Ratings,
        Field::RatingsCount,
        Field::SiteName,
        Field::Title,
        Field::TotalTime,
        Field::Yields,
    ];

    /// Name used by extraction engines (snake_case)
    pub fn internal_name(self) -> &'static str {
        match self {
            Field::Author => "author",
            Field::CanonicalUrl => "canonical_url",
            Field::Category => "category",
            Field::CookTime => "cook_time",
            Field::CookingMethod => "cooking_method",
            Field::Cuisine => "cuisine",
            Field::Description => "description",
            Field::DietaryRestrictions => "dietary_restrictions",
            Field::Equipment => "equipment",
            Field::Host => "host",
            Field::Image => "image",
            Field::IngredientGroups => "ingredient_groups",
            Field::Ingredients => "ingredients",
            Field::Instructions => "instructions",
            Field::InstructionsList => "instructions_list",
            Field::Keywords => "keywords",
            Field::Language => "language",
            Field::Links => "links",
            Field::Nutrients => "nutrients",
            Field::PrepTime => "prep_time",
            Field::Ratings => "ratings",
            Field::RatingsCount => "ratings_count",
            Field::SiteName => "site_name",
            Field::Title => "title",
            Field::TotalTime => "total_time",
            Field::Yields => "yields",
        }
    }

    /// Name used in the serialized canonical recipe (camelCase)
    pub fn external_name(self) -> &'static str {
        match self {
            Field::CanonicalUrl => "canonicalUrl",
            Field::CookTime => "cookTime",
            Field::CookingMethod => "cookingMethod",
            Field::DietaryRestrictions => "dietaryRestrictions",
            Field::IngredientGroups => "ingredientGroups",
            Field::InstructionsList => "instructionsList",
            Field::PrepTime => "prepTime",
            Field::RatingsCount => "ratingsCount",
            Field::SiteName => "siteName",
            Field::TotalTime => "totalTime",
            other => other.internal_name(),
        }
    }

    pub fn from_internal_name(name: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|field| field.internal_name() == name)
    }

    pub fn shape(self) -> Shape {
        match self {
            Field::CookTime | Field::PrepTime | Field::TotalTime | Field::RatingsCount => {
                Shape::Int
            }
            Field::Ratings => Shape::Float,
            Field::DietaryRestrictions
            | Field::Equipment
            | Field::Ingredients
            | Field::InstructionsList
            | Field::Keywords => Shape::StringList,
            Field::IngredientGroups | Field::Links => Shape::ObjectList,
            Field::Nutrients => Shape::StringMap,
            _ => Shape::String,
        }
    }

    /// Fields that must be present (and non-empty) in a successful result
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Field::Author
                | Field::CanonicalUrl
                | Field::Host
                | Field::IngredientGroups
                | Field::Instructions
                | Field::InstructionsList
        )
    }
}

impl Shape {
    /// Tag check only, values are never rewritten.
    /// Integers are accepted where a float is expected.
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Shape::String => value.is_string(),
            Shape::Int => value.is_i64() || value.is_u64(),
            Shape::Float => value.is_number(),
            Shape::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Shape::ObjectList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object)),
            Shape::StringMap => value
                .as_object()
                .is_some_and(|map| map.values().all(Value::is_string)),
        }
    }
}

/// Reads fields from an extraction result, turning every kind of failure
/// into an absent value.
pub struct FieldExtractor<'a> {
    result: &'a dyn RawExtractionResult,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(result: &'a dyn RawExtractionResult) -> Self {
        Self { result }
    }

    /// Read `field` expecting `shape`.
    ///
    /// Returns `None` when the accessor is missing, when it fails, when it
    /// yields `null` and when the value has a different shape. Accessor
    /// failures stop here and never reach the caller.
    pub fn read(&self, field: Field, shape: Shape) -> Option<Value> {
        let value = match self.result.field(field) {
            Ok(Some(Value::Null)) | Ok(None) => return None,
            Ok(Some(value)) => value,
            Err(e) => {
                debug!("Field {} treated as absent: {}", field.internal_name(), e);
                return None;
            }
        };

        if shape.matches(&value) {
            Some(value)
        } else {
            debug!(
                "Field {} has unexpected shape (expected {:?}): {}",
                field.internal_name(),
                shape,
                value
            );
            None
        }
    }

    fn typed<T: DeserializeOwned>(&self, field: Field) -> Option<T> {
        let value = self.read(field, field.shape())?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                debug!("Field {} could not be typed: {}", field.internal_name(), e);
                None
            }
        }
    }

    pub fn string(&self, field: Field) -> Option<String> {
        self.typed(field)
    }

    pub fn int(&self, field: Field) -> Option<u32> {
        self.typed(field)
    }

    pub fn float(&self, field: Field) -> Option<f64> {
        self.typed(field)
    }

    pub fn strings(&self, field: Field) -> Option<Vec<String>> {
        self.typed(field)
    }

    pub fn string_map(&self, field: Field) -> Option<BTreeMap<String, String>> {
        self.typed(field)
    }

    pub fn objects<T: DeserializeOwned>(&self, field: Field) -> Option<Vec<T>> {
        self.typed(field)
    }
}
