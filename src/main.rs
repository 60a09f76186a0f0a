use std::env;
use std::process::ExitCode;

use log::error;
use recipe_normalizer::config::Settings;
use recipe_normalizer::{HtmlRequest, NormalizeError, Response, UrlRequest};

async fn run(args: &[String]) -> Result<Response, NormalizeError> {
    let url = args.get(1).ok_or_else(|| {
        NormalizeError::MalformedRequest(
            "Usage: recipe-normalizer <url> [html-file]".to_string(),
        )
    })?;

    let input = match args.get(2) {
        Some(path) => {
            let html = tokio::fs::read_to_string(path).await.map_err(|e| {
                NormalizeError::MalformedRequest(format!("Cannot read {path}: {e}"))
            })?;
            HtmlRequest {
                url: url.clone(),
                html,
            }
            .validate()?
        }
        None => UrlRequest { url: url.clone() }.validate()?,
    };

    let normalizer = Settings::load()?.normalizer()?;
    Ok(normalizer.normalize(&input).await.into_response())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let response = match run(&args).await {
        Ok(response) => response,
        Err(e) => {
            error!("{}", e);
            e.into_response()
        }
    };

    match serde_json::to_string_pretty(&response.body) {
        Ok(body) => println!("{}", body),
        Err(e) => error!("Failed to serialize response: {}", e),
    }

    if response.status.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
