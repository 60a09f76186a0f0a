//! Request and response shapes for a transport sitting in front of the
//! normalizer.

use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::NormalizeError;
use crate::normalizer::{ExtractionOutcome, RecipeInput};

/// Body of a URL-mode request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlRequest {
    pub url: String,
}

/// Body of a content-mode request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlRequest {
    pub url: String,
    pub html: String,
}

fn parse_http_url(raw: &str) -> Result<Url, NormalizeError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| NormalizeError::MalformedRequest(format!("invalid url `{raw}`: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(NormalizeError::MalformedRequest(format!(
            "url `{raw}` must be an absolute http(s) URL"
        )));
    }
    Ok(url)
}

impl UrlRequest {
    pub fn validate(self) -> Result<RecipeInput, NormalizeError> {
        let url = parse_http_url(&self.url)?;
        Ok(RecipeInput::Url(url.to_string()))
    }
}

impl HtmlRequest {
    pub fn validate(self) -> Result<RecipeInput, NormalizeError> {
        let url = parse_http_url(&self.url)?;
        if self.html.trim().is_empty() {
            return Err(NormalizeError::MalformedRequest(
                "html must not be empty".to_string(),
            ));
        }
        Ok(RecipeInput::Html {
            url: url.to_string(),
            html: self.html,
        })
    }
}

/// Status code and JSON body ready to be written by a transport
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub body: Value,
}

impl Response {
    fn detail(status: StatusCode, reason: &str) -> Self {
        Self {
            status,
            body: json!({ "detail": reason }),
        }
    }
}

impl ExtractionOutcome {
    pub fn status(&self) -> StatusCode {
        match self {
            ExtractionOutcome::Success(_) => StatusCode::OK,
            ExtractionOutcome::Guarded { .. } => StatusCode::FORBIDDEN,
            ExtractionOutcome::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ExtractionOutcome::Success(recipe) => match serde_json::to_value(&recipe) {
                Ok(body) => Response { status, body },
                Err(e) => Response::detail(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string()),
            },
            other => Response::detail(status, other.reason().unwrap_or_default()),
        }
    }
}

impl NormalizeError {
    pub fn status(&self) -> StatusCode {
        match self {
            NormalizeError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            NormalizeError::BlockedContent { .. } => StatusCode::FORBIDDEN,
            NormalizeError::ExtractionFailure(_) | NormalizeError::SchemaValidation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            NormalizeError::ConfigError(_) | NormalizeError::EngineSetup(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn into_response(self) -> Response {
        Response::detail(self.status(), &self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalRecipe;

    #[test]
    fn test_url_request_validation() {
        let input = UrlRequest {
            url: "https://www.example.com/recipe/123".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(
            input,
            RecipeInput::Url("https://www.example.com/recipe/123".to_string())
        );

        for bad in ["not a url", "ftp://example.com/file", "/relative/path", ""] {
            let err = UrlRequest {
                url: bad.to_string(),
            }
            .validate()
            .unwrap_err();
            assert!(matches!(err, NormalizeError::MalformedRequest(_)), "{bad}");
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_html_request_validation() {
        let err = HtmlRequest {
            url: "https://www.example.com/".to_string(),
            html: "   ".to_string(),
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, NormalizeError::MalformedRequest(_)));

        let input = HtmlRequest {
            url: "https://www.example.com/".to_string(),
            html: "<html></html>".to_string(),
        }
        .validate()
        .unwrap();
        assert!(matches!(input, RecipeInput::Html { .. }));
    }

    #[test]
    fn test_request_deserialization() {
        let request: HtmlRequest =
            serde_json::from_str(r#"{"url": "https://a.example/", "html": "<p></p>"}"#).unwrap();
        assert_eq!(request.html, "<p></p>");
    }

    #[test]
    fn test_non_success_responses_carry_reason() {
        let response = NormalizeError::SchemaValidation("missing required field(s): host".into())
            .into_response();
        assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response.body,
            json!({"detail": "missing required field(s): host"})
        );

        let blocked: Result<CanonicalRecipe, NormalizeError> = Err(NormalizeError::BlockedContent {
            provider: "cloudflare".to_string(),
        });
        let response = ExtractionOutcome::from(blocked).into_response();
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(
            response.body,
            json!({"detail": "bot-protection content detected (cloudflare)"})
        );
    }
}
