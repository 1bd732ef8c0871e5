use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static PRODUCTION_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)deployed to production (?:site )?url:\s*(https?://[^\s\x1b"'<>]+)"#)
        .expect("production URL pattern is valid")
});

static UNIQUE_DEPLOY_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)unique deploy url:\s*(https?://[^\s\x1b"'<>]+)"#)
        .expect("unique deploy URL pattern is valid")
});

/// Deploy URLs announced in a log, latest occurrence of each label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentUrls {
    pub production: Option<String>,
    pub unique: Option<String>,
}

impl DeploymentUrls {
    /// The production URL when one was announced, otherwise the unique deploy URL.
    pub fn preferred(&self) -> Option<&str> {
        self.production.as_deref().or(self.unique.as_deref())
    }
}

/// Scans lines top to bottom; a later announcement replaces an earlier one.
pub fn extract_deployment_urls<S: AsRef<str>>(lines: &[S]) -> DeploymentUrls {
    let mut urls = DeploymentUrls::default();

    for line in lines {
        let line = line.as_ref();
        if let Some(captures) = PRODUCTION_URL.captures(line) {
            urls.production = Some(captures[1].to_string());
        }
        if let Some(captures) = UNIQUE_DEPLOY_URL.captures(line) {
            urls.unique = Some(captures[1].to_string());
        }
    }

    urls
}

/// Shorthand for `extract_deployment_urls(lines).preferred()`.
pub fn extract_deployment_url<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    extract_deployment_urls(lines).preferred().map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_production_url_wins() {
        let lines = [
            "Deployed to production URL: https://a.example",
            "some other output",
            "Deployed to production URL: https://b.example",
        ];
        assert_eq!(extract_deployment_url(&lines), Some("https://b.example".to_string()));
    }

    #[test]
    fn test_production_preferred_over_unique() {
        let lines = [
            "Unique deploy URL: https://65f0--site.example",
            "Deployed to production URL: https://site.example",
            "Unique deploy URL: https://65f1--site.example",
        ];
        let urls = extract_deployment_urls(&lines);
        assert_eq!(urls.production.as_deref(), Some("https://site.example"));
        assert_eq!(urls.unique.as_deref(), Some("https://65f1--site.example"));
        assert_eq!(urls.preferred(), Some("https://site.example"));
    }

    #[test]
    fn test_unique_url_used_without_production() {
        let lines = vec!["Unique deploy URL: https://site-42.example".to_string()];
        assert_eq!(extract_deployment_url(&lines), Some("https://site-42.example".to_string()));
    }

    #[test]
    fn test_url_stops_at_ansi_and_quotes() {
        let lines = [
            "│ Deployed to production site URL: https://x.example/path\u{1b}[39m",
            r#"{"msg":"Unique deploy URL: https://y.example"}"#,
        ];
        let urls = extract_deployment_urls(&lines);
        assert_eq!(urls.production.as_deref(), Some("https://x.example/path"));
        assert_eq!(urls.unique.as_deref(), Some("https://y.example"));
    }

    #[test]
    fn test_no_match() {
        let lines = ["Deployed to production URL:", "URL: https://nope.example"];
        assert_eq!(extract_deployment_urls(&lines), DeploymentUrls::default());
        assert_eq!(extract_deployment_url::<&str>(&[]), None);
    }

    #[test]
    fn test_repeated_calls_do_not_share_state() {
        let first = ["Deployed to production URL: https://a.example"];
        let second = ["nothing here"];
        assert!(extract_deployment_url(&first).is_some());
        assert!(extract_deployment_url(&second).is_none());
    }
}
