use std::time::Duration;

use async_trait::async_trait;
use html_escape::decode_html_entities;
use log::debug;
use reqwest::Url;
use scraper::Html;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::fetcher::RequestFetcher;
use super::page::{read_metadata, selector};
use super::ExtractionEngine;
use crate::error::EngineError;
use crate::fields::Field;
use crate::source::{MapExtraction, RawExtractionResult};

/// Extraction engine reading schema.org `Recipe` data from JSON-LD scripts
pub struct JsonLdEngine {
    fetcher: RequestFetcher,
    supported_hosts: Vec<String>,
}

impl JsonLdEngine {
    pub fn new(timeout: Option<Duration>) -> Result<Self, EngineError> {
        Ok(Self {
            fetcher: RequestFetcher::new(timeout, None)?,
            supported_hosts: Vec::new(),
        })
    }

    pub fn with_fetcher(fetcher: RequestFetcher) -> Self {
        Self {
            fetcher,
            supported_hosts: Vec::new(),
        }
    }

    /// Hosts accepted when extraction runs in non-permissive mode
    pub fn with_supported_hosts(mut self, hosts: Vec<String>) -> Self {
        self.supported_hosts = hosts;
        self
    }

    fn is_supported(&self, host: &str) -> bool {
        self.supported_hosts
            .iter()
            .any(|known| host == known || host.ends_with(&format!(".{known}")))
    }

    /// Synchronous core of both engine operations
    pub fn extract(
        &self,
        html: &str,
        originating_url: &str,
        permissive: bool,
    ) -> Result<MapExtraction, EngineError> {
        let url = Url::parse(originating_url)
            .map_err(|e| EngineError::InvalidUrl(format!("{originating_url}: {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| EngineError::InvalidUrl(originating_url.to_string()))?
            .to_string();

        if !permissive && !self.is_supported(&host) {
            return Err(EngineError::UnsupportedHost(host));
        }

        let document = Html::parse_document(html);
        let recipe = find_recipe(&document).ok_or(EngineError::NoRecipe)?;
        let recipe: JsonLdRecipe =
            serde_json::from_value(recipe).map_err(|e| EngineError::Parse(e.to_string()))?;

        let metadata = read_metadata(&document);
        let mut result = recipe.into_extraction();

        result.insert(Field::Host, host);
        let canonical_url = metadata
            .canonical_url
            .and_then(|href| url.join(href.trim()).ok())
            .map(|canonical| canonical.to_string())
            .unwrap_or_else(|| originating_url.to_string());
        result.insert(Field::CanonicalUrl, canonical_url);
        if let Some(site_name) = metadata.site_name {
            result.insert(Field::SiteName, decode_html_symbols(&site_name));
        }
        if !result.contains(Field::Language) {
            if let Some(language) = metadata.language {
                result.insert(Field::Language, language);
            }
        }
        let links = serde_json::to_value(metadata.links)
            .map_err(|e| EngineError::Parse(e.to_string()))?;
        result.insert(Field::Links, links);

        Ok(result)
    }
}

#[async_trait]
impl ExtractionEngine for JsonLdEngine {
    async fn fetch_and_extract(
        &self,
        url: &str,
    ) -> Result<Box<dyn RawExtractionResult>, EngineError> {
        let html = self.fetcher.fetch(url).await?;
        Ok(Box::new(self.extract(&html, url, true)?))
    }

    async fn extract_from_content(
        &self,
        html: &str,
        originating_url: &str,
        permissive: bool,
    ) -> Result<Box<dyn RawExtractionResult>, EngineError> {
        Ok(Box::new(self.extract(html, originating_url, permissive)?))
    }
}

/// Drops values that do not fit the expected type instead of failing the
/// whole recipe.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match serde_json::from_value(value) {
        Ok(typed) => Ok(Some(typed)),
        Err(e) => {
            debug!("JsonLdEngine: ignoring malformed property: {}", e);
            Ok(None)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonLdRecipe {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    description: Option<DescriptionType>,
    #[serde(default, deserialize_with = "lenient")]
    image: Option<ImageType>,
    #[serde(default, deserialize_with = "lenient")]
    author: Option<Author>,
    #[serde(default, deserialize_with = "lenient")]
    recipe_ingredient: Option<RecipeIngredients>,
    #[serde(default, deserialize_with = "lenient")]
    recipe_instructions: Option<RecipeInstructions>,
    #[serde(default, deserialize_with = "lenient")]
    recipe_yield: Option<RecipeYield>,
    #[serde(default, deserialize_with = "lenient")]
    prep_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    cook_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    total_time: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    suitable_for_diet: Option<StringOrList>,
    #[serde(default, deserialize_with = "lenient")]
    recipe_category: Option<StringOrList>,
    #[serde(default, deserialize_with = "lenient")]
    recipe_cuisine: Option<StringOrList>,
    #[serde(default, deserialize_with = "lenient")]
    cooking_method: Option<StringOrList>,
    #[serde(default, deserialize_with = "lenient")]
    keywords: Option<StringOrList>,
    #[serde(default, deserialize_with = "lenient")]
    tool: Option<Tools>,
    #[serde(default, deserialize_with = "lenient")]
    nutrition: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient")]
    aggregate_rating: Option<AggregateRating>,
    #[serde(default, deserialize_with = "lenient")]
    in_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImageObject {
    url: String,
}

#[derive(Debug, Deserialize)]
struct TextObject {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DescriptionType {
    String(String),
    Object(TextObject),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ImageType {
    String(String),
    Object(ImageObject),
    MultipleStrings(Vec<String>),
    MultipleObjects(Vec<ImageObject>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Author {
    String(String),
    Object(AuthorObject),
    MultipleStrings(Vec<String>),
    Multiple(Vec<AuthorObject>),
}

#[derive(Debug, Deserialize)]
struct AuthorObject {
    name: Option<String>,
}

/// Step object without an `@type` tag
#[derive(Debug, Deserialize)]
struct RecipeInstructionObject {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeIngredients {
    Strings(Vec<String>),
    Objects(Vec<IngredientObject>),
}

#[derive(Debug, Deserialize)]
struct IngredientObject {
    name: String,
    amount: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeInstructions {
    String(String),
    Multiple(Vec<String>),
    MultipleObject(Vec<RecipeInstructionObject>),
    HowTo(Vec<HowTo>),
    NestedSections(Vec<Vec<HowTo>>),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "@type")]
enum HowTo {
    HowToStep(HowToStep),
    HowToSection(HowToSection),
}

#[derive(Debug, Deserialize)]
struct HowToStep {
    text: Option<String>,
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HowToSection {
    #[serde(rename = "itemListElement", default)]
    item_list_element: Vec<HowToStep>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeYield {
    String(String),
    Number(i64),
    Array(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    String(String),
    Multiple(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Tools {
    String(String),
    Multiple(Vec<String>),
    Objects(Vec<ToolObject>),
}

#[derive(Debug, Deserialize)]
struct ToolObject {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRating {
    rating_value: Option<Value>,
    rating_count: Option<Value>,
    review_count: Option<Value>,
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        let items = match self {
            StringOrList::String(s) => vec![s],
            StringOrList::Multiple(v) => v,
        };
        items
            .iter()
            .map(|item| decode_html_symbols(item).trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }

    fn joined(self) -> Option<String> {
        non_empty(self.into_vec().join(", "))
    }
}

impl HowToStep {
    fn into_text(self) -> Option<String> {
        self.text.or(self.name).or(self.description)
    }
}

impl HowTo {
    fn into_steps(self) -> Vec<String> {
        match self {
            HowTo::HowToStep(step) => step.into_text().into_iter().collect(),
            HowTo::HowToSection(section) => section
                .item_list_element
                .into_iter()
                .filter_map(HowToStep::into_text)
                .collect(),
        }
    }
}

impl RecipeInstructions {
    fn into_steps(self) -> Vec<String> {
        let steps: Vec<String> = match self {
            RecipeInstructions::String(text) => text.lines().map(str::to_string).collect(),
            RecipeInstructions::Multiple(steps) => steps,
            RecipeInstructions::MultipleObject(steps) => {
                steps.into_iter().map(|step| step.text).collect()
            }
            RecipeInstructions::HowTo(items) => {
                items.into_iter().flat_map(HowTo::into_steps).collect()
            }
            RecipeInstructions::NestedSections(sections) => sections
                .into_iter()
                .flatten()
                .flat_map(HowTo::into_steps)
                .collect(),
        };

        steps
            .iter()
            .map(|step| decode_html_symbols(step).trim().to_string())
            .filter(|step| !step.is_empty())
            .collect()
    }
}

impl JsonLdRecipe {
    fn into_extraction(self) -> MapExtraction {
        let mut result = MapExtraction::new();

        if let Some(author) = self.author.and_then(author_name) {
            result.insert(Field::Author, author);
        }

        if let Some(title) = self.name.and_then(|n| non_empty(decode_html_symbols(&n))) {
            result.insert(Field::Title, title);
        }

        let description = self.description.map(|desc| match desc {
            DescriptionType::String(d) => d,
            DescriptionType::Object(d) => d.text,
        });
        if let Some(description) = description.and_then(|d| non_empty(decode_html_symbols(&d))) {
            result.insert(Field::Description, description);
        }

        if let Some(image) = self.image.and_then(first_image) {
            result.insert(Field::Image, image);
        }

        if let Some(ingredients) = self.recipe_ingredient {
            result.insert(Field::Ingredients, ingredient_lines(ingredients));
        }

        if let Some(instructions) = self.recipe_instructions {
            let steps = instructions.into_steps();
            result.insert(Field::Instructions, steps.join("\n"));
            result.insert(Field::InstructionsList, steps);
        }

        if let Some(yields) = self.recipe_yield.and_then(format_yields) {
            result.insert(Field::Yields, yields);
        }

        let times = [
            (Field::PrepTime, self.prep_time),
            (Field::CookTime, self.cook_time),
            (Field::TotalTime, self.total_time),
        ];
        for (field, duration) in times {
            if let Some(minutes) = duration.as_deref().and_then(parse_minutes) {
                result.insert(field, minutes);
            }
        }

        if let Some(category) = self.recipe_category.and_then(StringOrList::joined) {
            result.insert(Field::Category, category);
        }
        if let Some(cuisine) = self.recipe_cuisine.and_then(StringOrList::joined) {
            result.insert(Field::Cuisine, cuisine);
        }
        if let Some(method) = self.cooking_method.and_then(StringOrList::joined) {
            result.insert(Field::CookingMethod, method);
        }

        if let Some(keywords) = self.keywords {
            let keywords: Vec<String> = keywords
                .into_vec()
                .iter()
                .flat_map(|k| k.split(','))
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
            result.insert(Field::Keywords, keywords);
        }

        if let Some(diet) = self.suitable_for_diet {
            let diet: Vec<String> = diet
                .into_vec()
                .iter()
                .map(|d| clean_diet_value(d))
                .filter(|d| !d.is_empty())
                .collect();
            result.insert(Field::DietaryRestrictions, diet);
        }

        if let Some(tools) = self.tool {
            let tools: Vec<String> = match tools {
                Tools::String(s) => vec![s],
                Tools::Multiple(v) => v,
                Tools::Objects(v) => v.into_iter().map(|t| t.name).collect(),
            };
            let tools: Vec<String> = tools
                .iter()
                .map(|t| decode_html_symbols(t).trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            result.insert(Field::Equipment, tools);
        }

        if let Some(nutrition) = self.nutrition {
            result.insert(Field::Nutrients, nutrients(nutrition));
        }

        if let Some(rating) = self.aggregate_rating {
            if let Some(value) = rating.rating_value.as_ref().and_then(number) {
                result.insert(Field::Ratings, value);
            }
            let count = rating
                .rating_count
                .as_ref()
                .or(rating.review_count.as_ref())
                .and_then(number);
            if let Some(count) = count {
                if count >= 0.0 {
                    result.insert(Field::RatingsCount, count.round() as u64);
                }
            }
        }

        if let Some(language) = self.in_language.and_then(non_empty) {
            result.insert(Field::Language, language);
        }

        result
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn decode_html_symbols(text: &str) -> String {
    // some sites double-encode entities
    decode_html_entities(&decode_html_entities(text)).into_owned()
}

fn author_name(author: Author) -> Option<String> {
    let names = match author {
        Author::String(name) => vec![name],
        Author::Object(obj) => obj.name.into_iter().collect(),
        Author::MultipleStrings(names) => names,
        Author::Multiple(authors) => authors.into_iter().filter_map(|a| a.name).collect(),
    };
    let names: Vec<String> = names
        .iter()
        .map(|n| decode_html_symbols(n).trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    non_empty(names.join(", "))
}

fn first_image(image: ImageType) -> Option<String> {
    let url = match image {
        ImageType::String(url) => Some(url),
        ImageType::Object(obj) => Some(obj.url),
        ImageType::MultipleStrings(urls) => urls.into_iter().next(),
        ImageType::MultipleObjects(objs) => objs.into_iter().next().map(|o| o.url),
    };
    url.and_then(|u| non_empty(decode_html_symbols(&u)))
}

fn ingredient_lines(ingredients: RecipeIngredients) -> Vec<String> {
    match ingredients {
        RecipeIngredients::Strings(lines) => lines
            .iter()
            .map(|line| decode_html_symbols(line).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
        RecipeIngredients::Objects(objects) => objects
            .into_iter()
            .filter(|ing| !ing.name.trim().is_empty())
            .map(|ing| {
                let amount = ing.amount.as_deref().unwrap_or("").trim();
                let name = decode_html_symbols(ing.name.trim());
                if amount.is_empty() {
                    name
                } else {
                    format!("{amount} {name}")
                }
            })
            .collect(),
    }
}

fn servings(count: i64) -> String {
    if count == 1 {
        "1 serving".to_string()
    } else {
        format!("{count} servings")
    }
}

fn format_yields(yields: RecipeYield) -> Option<String> {
    let text = match yields {
        RecipeYield::Number(n) => return Some(servings(n)),
        RecipeYield::String(s) => s,
        // prefer the descriptive entry (e.g. "15 Stück") over the bare number
        RecipeYield::Array(items) => items
            .iter()
            .find(|s| s.contains(char::is_alphabetic))
            .or_else(|| items.first())
            .cloned()?,
    };
    let text = decode_html_symbols(text.trim());
    match text.parse::<i64>() {
        Ok(n) => Some(servings(n)),
        Err(_) => non_empty(text),
    }
}

fn clean_diet_value(diet: &str) -> String {
    diet.trim_start_matches("https://schema.org/")
        .trim_start_matches("http://schema.org/")
        .replace("Diet", "")
        .trim()
        .to_string()
}

/// ISO 8601 duration (`PT1H30M`, `P0DT45M`, `PT5400.0S`, `PT15-20M`) or a
/// bare number of minutes, converted to whole minutes. Ranges resolve to
/// their upper bound.
fn parse_minutes(duration: &str) -> Option<u32> {
    let duration = duration.trim();
    if let Ok(minutes) = duration.parse::<f64>() {
        return (minutes >= 0.0).then(|| minutes.round() as u32);
    }

    let rest = duration
        .strip_prefix('P')
        .or_else(|| duration.strip_prefix('p'))?;
    let mut seconds = 0.0_f64;
    let mut number = String::new();
    let mut in_time = false;
    let mut matched = false;

    for c in rest.chars() {
        match c.to_ascii_uppercase() {
            'T' => in_time = true,
            '0'..='9' | '.' => number.push(c),
            '-' => number.clear(),
            unit => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                seconds += match (unit, in_time) {
                    ('D', false) => value * 86_400.0,
                    ('W', false) => value * 604_800.0,
                    ('H', true) => value * 3_600.0,
                    ('M', true) => value * 60.0,
                    ('S', true) => value,
                    _ => return None,
                };
                matched = true;
            }
        }
    }

    matched.then(|| (seconds / 60.0).round() as u32)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn nutrients(nutrition: Map<String, Value>) -> Map<String, Value> {
    nutrition
        .into_iter()
        .filter(|(key, _)| !key.starts_with('@'))
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            (!text.is_empty()).then(|| (key, Value::String(text)))
        })
        .collect()
}

fn is_recipe_type(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t.eq_ignore_ascii_case("recipe"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.eq_ignore_ascii_case("recipe")),
        _ => false,
    }
}

fn recipe_in(json_ld: &Value) -> Option<&Value> {
    if is_recipe_type(json_ld) {
        return Some(json_ld);
    }
    if let Some(items) = json_ld.as_array() {
        return items.iter().find_map(recipe_in);
    }
    json_ld
        .get("@graph")
        .and_then(Value::as_array)
        .and_then(|items| items.iter().find_map(recipe_in))
}

/// Every node of a JSON-LD document: the root, array items and `@graph` entries
fn graph_nodes(json_ld: &Value) -> Vec<&Value> {
    let mut nodes = Vec::new();
    match json_ld {
        Value::Array(items) => items.iter().for_each(|item| nodes.extend(graph_nodes(item))),
        node => {
            nodes.push(node);
            if let Some(graph) = node.get("@graph").and_then(Value::as_array) {
                nodes.extend(graph.iter().flat_map(graph_nodes));
            }
        }
    }
    nodes
}

/// Swap a nameless `{"@id": ..}` reference for the node it points to
fn resolve_reference(nodes: &[&Value], value: &mut Value) {
    if value.get("name").is_some() {
        return;
    }
    let target = match value.get("@id").and_then(Value::as_str) {
        Some(id) => nodes
            .iter()
            .find(|node| node.get("@id").and_then(Value::as_str) == Some(id))
            .map(|node| (*node).clone()),
        None => return,
    };
    if let Some(node) = target {
        *value = node;
    }
}

/// Authors in `@graph` documents are often references to a `Person` node
fn resolve_author(json_ld: &Value, recipe: &mut Value) {
    let nodes = graph_nodes(json_ld);
    match recipe.get_mut("author") {
        Some(Value::Array(authors)) => authors
            .iter_mut()
            .for_each(|author| resolve_reference(&nodes, author)),
        Some(author) => resolve_reference(&nodes, author),
        None => {}
    }
}

fn find_recipe(document: &Html) -> Option<Value> {
    let selector = selector("script[type='application/ld+json']")?;

    for (index, script) in document.select(&selector).enumerate() {
        let raw_json: String = script.text().collect();
        match serde_json::from_str::<Value>(&sanitize_json(&raw_json)) {
            Ok(json_ld) => {
                if let Some(recipe) = recipe_in(&json_ld) {
                    debug!("JsonLdEngine: found recipe in script {}", index);
                    let mut recipe = recipe.clone();
                    resolve_author(&json_ld, &mut recipe);
                    return Some(recipe);
                }
                debug!("JsonLdEngine: no recipe in script {}", index);
            }
            Err(e) => {
                debug!("JsonLdEngine: failed to parse script {}: {}", index, e);
            }
        }
    }
    None
}

/// Strip HTML comment markers and trailing commas that break strict JSON
/// parsing. String contents are left untouched.
fn sanitize_json(json_str: &str) -> String {
    let chars: Vec<char> = json_str.trim().chars().collect();
    let mut output = String::with_capacity(chars.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;

        if in_string {
            output.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                output.push(c);
            }
            '<' if chars[i..].starts_with(&['!', '-', '-']) => i += 3,
            '-' if chars[i..].starts_with(&['-', '>']) => i += 2,
            ',' => {
                let next = chars[i..].iter().find(|c| !c.is_whitespace());
                if !matches!(next, Some(']') | Some('}')) {
                    output.push(c);
                }
            }
            _ => output.push(c),
        }
    }
    output
}
