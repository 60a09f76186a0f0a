use recipe_normalizer::config::Settings;
use recipe_normalizer::{
    ExtractionOutcome, HtmlRequest, JsonLdEngine, RecipeInput, RecipeNormalizer, RejectionKind,
    UrlRequest,
};

fn create_recipe_html(json_ld: &str) -> String {
    format!(
        r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <title>Recipe Page</title>
            <link rel="canonical" href="https://www.example.com/recipes/shahi-paneer" />
            <meta property="og:site_name" content="Amateur Pro Chef" />
            <script type="application/ld+json">
                {json_ld}
            </script>
        </head>
        <body>
            <h1>Recipe</h1>
            <a href="https://www.example.com/category/indian">All Things Indian</a>
        </body>
        </html>
        "#
    )
}

const SHAHI_PANEER: &str = r#"
{
    "@context": "https://schema.org",
    "@graph": [
        {"@type": "WebSite", "name": "Amateur Pro Chef"},
        {
            "@type": "Recipe",
            "name": "Shahi Paneer",
            "author": {"@type": "Person", "name": "amateurprochef"},
            "recipeIngredient": ["200 g paneer", "2 tbsp cream", "1 tsp garam masala"],
            "recipeInstructions": [
                {"@type": "HowToStep", "text": "Cube the paneer."},
                {"@type": "HowToStep", "text": "Simmer in the gravy."}
            ],
            "cookTime": "PT30M",
            "recipeCategory": ["All", "All Things Indian"],
            "recipeYield": ["4", "4 servings"],
        }
    ]
}
"#;

fn normalizer() -> RecipeNormalizer {
    RecipeNormalizer::new(JsonLdEngine::new(None).unwrap())
}

#[tokio::test]
async fn test_url_mode_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/recipe")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(create_recipe_html(SHAHI_PANEER))
        .create_async()
        .await;

    let url = format!("{}/recipe", server.url());
    let input = UrlRequest { url }.validate().unwrap();
    let outcome = normalizer().normalize(&input).await;
    mock.assert_async().await;

    let recipe = match outcome {
        ExtractionOutcome::Success(recipe) => recipe,
        other => panic!("expected success, got {other:?}"),
    };

    assert_eq!(recipe.author, "amateurprochef");
    assert_eq!(recipe.title.as_deref(), Some("Shahi Paneer"));
    assert_eq!(recipe.host, "127.0.0.1");
    assert_eq!(
        recipe.canonical_url,
        "https://www.example.com/recipes/shahi-paneer"
    );
    assert_eq!(recipe.site_name.as_deref(), Some("Amateur Pro Chef"));
    assert_eq!(recipe.language.as_deref(), Some("en"));
    assert_eq!(recipe.cook_time, Some(30));
    assert_eq!(recipe.category.as_deref(), Some("All, All Things Indian"));
    assert_eq!(recipe.yields.as_deref(), Some("4 servings"));
    assert_eq!(
        recipe.instructions_list,
        vec!["Cube the paneer.", "Simmer in the gravy."]
    );
    assert_eq!(recipe.instructions, "Cube the paneer.\nSimmer in the gravy.");
    assert_eq!(recipe.ingredient_groups.len(), 1);
    assert_eq!(recipe.ingredient_groups[0].purpose, None);
    assert_eq!(recipe.ingredient_groups[0].ingredients.len(), 3);
    assert_eq!(recipe.links.len(), 1);
    assert_eq!(recipe.links[0]["text"], "All Things Indian");
    assert!(recipe.nutrients.is_empty());
}

#[tokio::test]
async fn test_url_mode_http_error_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/missing")
        .with_status(404)
        .with_body("not found")
        .create_async()
        .await;

    let input = RecipeInput::Url(format!("{}/missing", server.url()));
    let outcome = normalizer().normalize(&input).await;

    match &outcome {
        ExtractionOutcome::Rejected(rejection) => {
            assert_eq!(rejection.kind, RejectionKind::ExtractionFailure);
            assert!(rejection.reason.starts_with("Error scraping URL:"));
            assert!(rejection.reason.contains("404"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(outcome.status().as_u16(), 422);
}

#[tokio::test]
async fn test_html_mode_end_to_end() {
    let input = HtmlRequest {
        url: "https://www.example.com/recipes/shahi-paneer".to_string(),
        html: create_recipe_html(SHAHI_PANEER),
    }
    .validate()
    .unwrap();

    let response = normalizer().normalize(&input).await.into_response();
    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.body["author"], "amateurprochef");
    assert_eq!(response.body["host"], "www.example.com");
    assert_eq!(response.body["cookTime"], 30);
    assert_eq!(response.body["siteName"], "Amateur Pro Chef");
    assert!(response.body["ingredientGroups"].is_array());
}

#[tokio::test]
async fn test_html_without_author_is_parsing_failure() {
    let json_ld = r#"
    {
        "@type": "Recipe",
        "name": "Anonymous Soup",
        "recipeIngredient": ["water"],
        "recipeInstructions": "Boil."
    }
    "#;
    let input = RecipeInput::Html {
        url: "https://www.example.com/soup".to_string(),
        html: create_recipe_html(json_ld),
    };

    let outcome = normalizer().normalize(&input).await;
    assert_eq!(outcome.reason(), Some("parsing recipe data failed"));
}

#[tokio::test]
async fn test_html_without_instructions_fails_validation() {
    let json_ld = r#"
    {
        "@type": "Recipe",
        "name": "Recipe Without Steps",
        "author": "Jane",
        "recipeIngredient": ["1 apple"]
    }
    "#;
    let input = RecipeInput::Html {
        url: "https://www.example.com/apple".to_string(),
        html: create_recipe_html(json_ld),
    };

    match normalizer().normalize(&input).await {
        ExtractionOutcome::Rejected(rejection) => {
            assert_eq!(rejection.kind, RejectionKind::SchemaValidation);
            assert_eq!(
                rejection.reason,
                "missing required field(s): instructions, instructionsList"
            );
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_page_without_recipe_is_rejected() {
    let input = RecipeInput::Html {
        url: "https://www.example.com/about".to_string(),
        html: "<html><body><p>About us</p></body></html>".to_string(),
    };

    let outcome = normalizer().normalize(&input).await;
    assert_eq!(
        outcome.reason(),
        Some("Error scraping HTML: No recipe data found on this webpage")
    );
}

#[tokio::test]
async fn test_cloudflare_challenge_is_guarded() {
    let mut server = mockito::Server::new_async().await;
    // content-mode must never touch the network
    let mock = server
        .mock("GET", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let html = r#"<html><head><title>Just a moment...</title></head><body>
        <a href="https://www.cloudflare.com/privacypolicy/">Privacy</a></body></html>"#;
    let input = RecipeInput::Html {
        url: format!("{}/recipe", server.url()),
        html: html.to_string(),
    };

    let response = normalizer().normalize(&input).await.into_response();
    assert_eq!(response.status.as_u16(), 403);
    assert_eq!(
        response.body["detail"],
        "bot-protection content detected (cloudflare)"
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_configured_signature_is_guarded() {
    let mut settings = Settings::default();
    settings
        .guard
        .signatures
        .insert("datadome".to_string(), "geo.captcha-delivery.com".to_string());

    let input = RecipeInput::Html {
        url: "https://www.example.com/recipe".to_string(),
        html: r#"<script src="https://geo.captcha-delivery.com/captcha/"></script>"#.to_string(),
    };

    let outcome = settings.normalizer().unwrap().normalize(&input).await;
    assert!(matches!(
        outcome,
        ExtractionOutcome::Guarded { ref provider, .. } if provider == "datadome"
    ));
}

#[tokio::test]
#[ignore] // This test requires network access and is subject to external site changes
async fn test_real_world_recipe() {
    let _ = env_logger::try_init();

    let url = "https://amateurprochef.com/2024/09/07/shahi-paneer-2/";
    match recipe_normalizer::normalize_url(url).await {
        Ok(recipe) => {
            assert!(recipe.title.unwrap_or_default().contains("Shahi Paneer"));
            assert!(!recipe.instructions_list.is_empty());
        }
        Err(e) => panic!("Failed to normalize recipe: {e}"),
    }
}
