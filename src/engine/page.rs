use scraper::{Html, Selector};

use crate::model::Link;

/// Page-level data that lives outside the recipe JSON-LD
#[derive(Debug, Default)]
pub(crate) struct PageMetadata {
    pub canonical_url: Option<String>,
    pub site_name: Option<String>,
    pub language: Option<String>,
    pub links: Vec<Link>,
}

pub(crate) fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let selector = selector(css)?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) fn read_metadata(document: &Html) -> PageMetadata {
    PageMetadata {
        canonical_url: first_attr(document, "link[rel='canonical']", "href"),
        site_name: first_attr(document, "meta[property='og:site_name']", "content"),
        language: first_attr(document, "html", "lang"),
        links: read_links(document),
    }
}

fn read_links(document: &Html) -> Vec<Link> {
    let Some(selector) = selector("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?.trim();
            if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
                return None;
            }

            let mut link = Link::new();
            link.insert("href".to_string(), href.to_string());
            let text = el.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                link.insert("text".to_string(), text);
            }
            Some(link)
        })
        .collect()
}
