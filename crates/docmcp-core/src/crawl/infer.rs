//! Result-level inference: authentication style and API base URL.

use crate::types::AuthType;
use std::collections::HashMap;

const OAUTH_TERMS: &[&str] = &[
    "oauth",
    "authorization_code",
    "client_credentials",
    "refresh_token",
    "openid",
];
const API_KEY_TERMS: &[&str] = &["api key", "api-key", "apikey", "api_key", "x-api-key"];
const BEARER_TERMS: &[&str] = &["bearer", "jwt"];

/// Keyword tallies from documentation text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AuthScores {
    /// Bearer-token mentions.
    pub bearer: usize,
    /// API-key mentions.
    pub api_key: usize,
    /// OAuth mentions.
    pub oauth: usize,
}

impl AuthScores {
    /// Count auth keywords in `text`, case-insensitively.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let lower = text.to_lowercase();
        let count = |terms: &[&str]| terms.iter().map(|t| lower.matches(t).count()).sum();
        Self {
            bearer: count(BEARER_TERMS),
            api_key: count(API_KEY_TERMS),
            oauth: count(OAUTH_TERMS),
        }
    }

    /// Accumulate another page's tallies.
    pub const fn add(&mut self, other: Self) {
        self.bearer += other.bearer;
        self.api_key += other.api_key;
        self.oauth += other.oauth;
    }

    /// Highest-scoring style. Ties go to bearer, then API key. `None` when nothing matched.
    #[must_use]
    pub fn best(&self) -> Option<AuthType> {
        let ranked = [
            (self.bearer, AuthType::Bearer),
            (self.api_key, AuthType::ApiKey),
            (self.oauth, AuthType::OAuth),
        ];
        let (score, auth) = ranked
            .iter()
            .copied()
            .fold((0, AuthType::Bearer), |best, next| if next.0 > best.0 { next } else { best });
        (score > 0).then_some(auth)
    }
}

/// Most frequent origin; ties go to the one seen first.
#[must_use]
pub fn most_frequent_origin(origins: &[String]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for origin in origins {
        *counts.entry(origin.as_str()).or_default() += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for origin in origins {
        let count = counts[origin.as_str()];
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((origin.as_str(), count));
        }
    }
    best.map(|(origin, _)| origin.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_scoring() {
        let scores = AuthScores::from_text(
            "Authenticate with OAuth 2.0. Use the client_credentials grant, then send Bearer tokens.",
        );
        assert_eq!(scores.oauth, 2);
        assert_eq!(scores.bearer, 1);
        assert_eq!(scores.best(), Some(AuthType::OAuth));
    }

    #[test]
    fn test_api_key_wins_when_dominant() {
        let scores = AuthScores::from_text("Pass your API key in the X-API-Key header.");
        assert_eq!(scores.best(), Some(AuthType::ApiKey));
    }

    #[test]
    fn test_no_mentions_and_ties() {
        assert_eq!(AuthScores::from_text("Nothing about auth here").best(), None);
        let tie = AuthScores {
            bearer: 1,
            api_key: 1,
            oauth: 0,
        };
        assert_eq!(tie.best(), Some(AuthType::Bearer));
    }

    #[test]
    fn test_add_accumulates() {
        let mut total = AuthScores::default();
        total.add(AuthScores::from_text("apikey"));
        total.add(AuthScores::from_text("apikey oauth"));
        assert_eq!(total.api_key, 2);
        assert_eq!(total.oauth, 1);
    }

    #[test]
    fn test_most_frequent_origin() {
        let origins: Vec<String> = ["https://a.com", "https://b.com", "https://b.com", "https://a.com", "https://c.com"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(most_frequent_origin(&origins).unwrap(), "https://a.com");
        assert!(most_frequent_origin(&[]).is_none());
    }
}
