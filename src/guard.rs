use std::collections::BTreeMap;

use log::debug;

/// Privacy-policy link rendered on Cloudflare challenge pages
pub const CLOUDFLARE_SIGNATURE: &str = "https://www.cloudflare.com/privacypolicy/";

/// Result of inspecting raw page content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inspection {
    Clean,
    /// Content is a bot-protection interstitial served by `provider`
    Blocked { provider: String },
}

/// Rejects bot-protection interstitials before any extraction runs.
///
/// Detection is a literal, case-sensitive substring match against a set of
/// provider signatures.
#[derive(Debug, Clone)]
pub struct ContentGuard {
    signatures: BTreeMap<String, String>,
}

impl Default for ContentGuard {
    fn default() -> Self {
        Self::empty().with_signature("cloudflare", CLOUDFLARE_SIGNATURE)
    }
}

impl ContentGuard {
    /// A guard with no signatures; every input is clean
    pub fn empty() -> Self {
        Self {
            signatures: BTreeMap::new(),
        }
    }

    /// Add or replace the signature for `provider`
    pub fn with_signature(mut self, provider: impl Into<String>, signature: impl Into<String>) -> Self {
        let signature = signature.into();
        if !signature.is_empty() {
            self.signatures.insert(provider.into(), signature);
        }
        self
    }

    pub fn signatures(&self) -> &BTreeMap<String, String> {
        &self.signatures
    }

    pub fn inspect(&self, raw_content: &str) -> Inspection {
        for (provider, signature) in &self.signatures {
            if raw_content.contains(signature.as_str()) {
                debug!("ContentGuard: {} signature found", provider);
                return Inspection::Blocked {
                    provider: provider.clone(),
                };
            }
        }
        Inspection::Clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE_PAGE: &str = r#"
        <html><head><title>Just a moment...</title></head>
        <body>
            <div id="challenge-body-text">Checking if the site connection is secure</div>
            <a rel="noopener noreferrer" href="https://www.cloudflare.com/privacypolicy/" target="_blank">Privacy</a>
        </body></html>
    "#;

    #[test]
    fn test_cloudflare_challenge_is_blocked() {
        let guard = ContentGuard::default();
        assert_eq!(
            guard.inspect(CHALLENGE_PAGE),
            Inspection::Blocked {
                provider: "cloudflare".to_string()
            }
        );
    }

    #[test]
    fn test_recipe_page_is_clean() {
        let guard = ContentGuard::default();
        let html = r#"<html><body><h1>Chocolate Cake</h1><p>Served via cloudflare CDN</p></body></html>"#;
        assert_eq!(guard.inspect(html), Inspection::Clean);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let guard = ContentGuard::default();
        let html = "<a href=\"HTTPS://WWW.CLOUDFLARE.COM/PRIVACYPOLICY/\">Privacy</a>";
        assert_eq!(guard.inspect(html), Inspection::Clean);
    }

    #[test]
    fn test_custom_signature() {
        let guard = ContentGuard::default().with_signature("datadome", "geo.captcha-delivery.com");
        let html = "<script src=\"https://geo.captcha-delivery.com/captcha/\"></script>";
        assert_eq!(
            guard.inspect(html),
            Inspection::Blocked {
                provider: "datadome".to_string()
            }
        );
        assert_eq!(guard.signatures().len(), 2);
    }

    #[test]
    fn test_empty_guard_and_empty_signature() {
        let guard = ContentGuard::empty().with_signature("nothing", "");
        assert!(guard.signatures().is_empty());
        assert_eq!(guard.inspect(CHALLENGE_PAGE), Inspection::Clean);
    }
}
